//! Error taxonomy for the extraction pipeline
//!
//! Every variant is a user-facing diagnostic. Parse failures carry the raw
//! model reply as their source code so it is always shown to the user.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Errors surfaced by a BOM extraction action
#[derive(Debug, Error, Diagnostic)]
pub enum BomError {
    /// No credential could be resolved from any configured source
    #[error("No Google API key is configured")]
    #[diagnostic(code(bomx::credential::missing), help("{hint}"))]
    MissingCredential { hint: String },

    /// Upload is not a PNG/JPEG image or could not be decoded
    #[error("Invalid image '{name}': {reason}")]
    #[diagnostic(
        code(bomx::image::invalid),
        help("Upload an image (PNG, JPG, JPEG)")
    )]
    InvalidImage { name: String, reason: String },

    /// "Generate" was asked for before any upload
    #[error("No image has been uploaded")]
    #[diagnostic(
        code(bomx::image::missing),
        help("Upload an image (PNG, JPG, JPEG)")
    )]
    NoImage,

    /// Any failure of the remote model call, message kept verbatim
    #[error("An error occurred: {0}")]
    #[diagnostic(
        code(bomx::inference),
        help("Check the API key, network connection and quota, then try again")
    )]
    Inference(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    /// CSV/JSON export could not be produced or written
    #[error("Export failed: {0}")]
    #[diagnostic(code(bomx::export))]
    Export(String),
}

/// The model reply could not be interpreted as a parts list
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("Failed to parse JSON response.")]
    #[diagnostic(
        code(bomx::parse::malformed_json),
        help("The raw model reply is shown above. Try generating again.")
    )]
    MalformedJson {
        message: String,
        raw: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: SourceSpan,
    },

    #[error("Model returned invalid JSON format (not a list).")]
    #[diagnostic(
        code(bomx::parse::not_a_list),
        help("The raw model reply is shown above. Expected a JSON array of parts.")
    )]
    NotAList {
        found: &'static str,
        raw: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("expected an array, found {found}")]
        span: SourceSpan,
    },
}

/// Name shown above the raw reply in diagnostics
const RAW_SOURCE_NAME: &str = "Raw Response";

impl ParseError {
    /// Build a malformed-JSON error.
    ///
    /// `offset` is the byte offset of the parsed slice within `raw`, so the
    /// serde location can be pointed at in the original reply.
    pub fn malformed(raw: &str, offset: usize, parsed: &str, err: &serde_json::Error) -> Self {
        let at = offset + line_col_to_offset(parsed, err.line(), err.column());
        Self::MalformedJson {
            message: err.to_string(),
            raw: raw.to_string(),
            src: NamedSource::new(RAW_SOURCE_NAME, raw.to_string()),
            span: point_span(raw, at),
        }
    }

    /// Build a not-a-list error spanning the parsed value
    pub fn not_a_list(raw: &str, range: std::ops::Range<usize>, value: &serde_json::Value) -> Self {
        Self::NotAList {
            found: json_kind(value),
            raw: raw.to_string(),
            src: NamedSource::new(RAW_SOURCE_NAME, raw.to_string()),
            span: SourceSpan::from(range),
        }
    }

    /// The model reply exactly as received
    pub fn raw_text(&self) -> &str {
        match self {
            ParseError::MalformedJson { raw, .. } | ParseError::NotAList { raw, .. } => raw,
        }
    }

    pub fn is_not_a_list(&self) -> bool {
        matches!(self, ParseError::NotAList { .. })
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Single-character span at `at`, empty at end of input
fn point_span(source: &str, at: usize) -> SourceSpan {
    let at = at.min(source.len());
    let len = source[at..].chars().next().map_or(0, char::len_utf8);
    SourceSpan::new(at.into(), len)
}

/// Convert a 1-based line/column to a byte offset, clamped to the source
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut line_start = 0;
    for (current_line, text) in source.split_inclusive('\n').enumerate() {
        if current_line + 1 == line {
            let col_offset = text
                .char_indices()
                .nth(column.saturating_sub(1))
                .map_or(text.len(), |(i, _)| i);
            return line_start + col_offset;
        }
        line_start += text.len();
    }
    source.len()
}
