//! Shared utilities for the extraction commands

use console::style;
use dialoguer::{theme::ColorfulTheme, Password};
use miette::{IntoDiagnostic, Result};

use crate::cli::table::{TableConfig, TableFormatter};
use crate::cli::OutputFormat;
use crate::core::credential::API_KEY_URL;
use crate::core::{
    BomError, Config, Credential, CredentialProvider, Extraction, Extractor, GeminiClient,
    Project, UploadedImage, Variant,
};

/// Credential chain for this build, searching project then global secrets
pub fn provider_for(project: Option<&Project>) -> CredentialProvider {
    CredentialProvider::for_variant(Variant::current(), Config::secrets_paths(project))
}

/// Prints a status line while the model call runs
pub struct Announced<E> {
    inner: E,
    quiet: bool,
}

impl<E: Extractor> Extractor for Announced<E> {
    fn extract(&self, image: &UploadedImage, prompt: &str) -> std::result::Result<String, BomError> {
        if !self.quiet {
            eprintln!("{} Analyzing image...", style("⋯").cyan());
        }
        self.inner.extract(image, prompt)
    }
}

/// Build a Gemini client from the resolved key
pub fn connect(
    config: &Config,
    quiet: bool,
) -> impl FnOnce(Credential) -> std::result::Result<Announced<GeminiClient>, BomError> + '_ {
    move |credential| {
        Ok(Announced {
            inner: GeminiClient::new(config, credential)?,
            quiet,
        })
    }
}

/// Whether it is fine to ask the user something
pub fn can_prompt(no_input: bool) -> bool {
    !no_input && console::user_attended() && console::user_attended_stderr()
}

/// Ask for an API key with hidden input; `None` if left blank
pub fn prompt_for_key() -> Result<Option<String>> {
    eprintln!(
        "{} No API key configured. Get one at {}",
        style("!").yellow(),
        style(API_KEY_URL).cyan().underlined()
    );
    let key: String = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter your Google API Key")
        .allow_empty_password(true)
        .interact()
        .into_diagnostic()?;
    let key = key.trim().to_string();
    Ok((!key.is_empty()).then_some(key))
}

/// Print the preview caption for an upload
pub fn print_preview(image: &UploadedImage) {
    eprintln!("{} Uploaded {}", style("✓").green(), style(image.caption()).cyan());
}

/// Formatter configured from the loaded config and output mode
pub fn formatter_for(config: &Config, quiet: bool) -> TableFormatter {
    let table_config = if quiet || !console::Term::stdout().is_term() {
        TableConfig::for_pipe()
    } else {
        match config.wrap_width {
            Some(width) => TableConfig::with_wrap(width),
            None => TableConfig::default(),
        }
    };
    TableFormatter::new(table_config)
}

/// Print the model's reply in full under a "Raw Response" heading
pub fn print_raw_response(raw: &str) {
    eprintln!("{}", style("Raw Response").bold());
    eprintln!("{}", raw);
}

/// Print the success message and table, or the empty-result warning
pub fn report_extraction(extraction: &Extraction, formatter: &TableFormatter, format: OutputFormat) {
    if extraction.is_empty() {
        eprintln!("{} No data found in the response.", style("!").yellow());
        return;
    }
    eprintln!("{} BOM Generated Successfully!", style("✓").green());
    formatter.output(extraction, format);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Extractor for Echo {
        fn extract(&self, _image: &UploadedImage, prompt: &str) -> std::result::Result<String, BomError> {
            Ok(prompt.to_string())
        }
    }

    #[test]
    fn test_announced_passes_through() {
        let img = image::DynamicImage::new_rgb8(4, 4);
        let mut buffer = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        let upload = crate::core::upload::load("a.png", buffer.into_inner(), "png").unwrap();

        let announced = Announced {
            inner: Echo,
            quiet: true,
        };
        assert_eq!(announced.extract(&upload, "list parts").unwrap(), "list parts");
    }

    #[test]
    fn test_no_input_never_prompts() {
        assert!(!can_prompt(true));
    }
}
