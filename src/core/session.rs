//! Session state and the extraction pipeline
//!
//! A [`Session`] is the explicit context for one interactive run: the
//! session credential, the current upload and the current result. Each
//! method is one user action and returns its error instead of panicking;
//! the caller decides how to show it.

use std::path::Path;

use tracing::{info, warn};

use crate::core::bom::BomResult;
use crate::core::credential::{
    Credential, CredentialProvider, CredentialSource, ResolvedCredential, SessionCredential,
};
use crate::core::error::BomError;
use crate::core::inference::Extractor;
use crate::core::normalize::normalize;
use crate::core::present::{present, ExportArtifact, Presentation};
use crate::core::prompt::BOM_PROMPT;
use crate::core::upload::{self, UploadedImage};

/// Result of one successful "Generate"
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Model reply as received
    pub raw: String,
    pub result: BomResult,
    pub presentation: Presentation,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }

    /// Export by kind; `None` for an empty result
    pub fn export(&self, kind: ExportKind) -> Option<&ExportArtifact> {
        match &self.presentation {
            Presentation::NoData => None,
            Presentation::Table { csv, json, .. } => Some(match kind {
                ExportKind::Csv => csv,
                ExportKind::Json => json,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Csv,
    Json,
}

/// Run the pipeline for one image: model call, normalization, presentation
pub fn extract_bom<E: Extractor + ?Sized>(
    extractor: &E,
    image: &UploadedImage,
) -> Result<Extraction, BomError> {
    let raw = extractor.extract(image, BOM_PROMPT)?;
    let result = normalize(&raw).inspect_err(|e| {
        warn!(raw_len = raw.len(), "Model reply rejected: {}", e);
    })?;
    let presentation = present(&result)?;
    info!(parts = result.len(), "Extraction complete");
    Ok(Extraction {
        raw,
        result,
        presentation,
    })
}

/// What the user currently sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Preview,
    Success,
    EmptyResult,
}

/// Interactive session context
pub struct Session {
    provider: CredentialProvider,
    credential: SessionCredential,
    image: Option<UploadedImage>,
    extraction: Option<Extraction>,
}

impl Session {
    pub fn new(provider: CredentialProvider) -> Self {
        Self {
            provider,
            credential: SessionCredential::default(),
            image: None,
            extraction: None,
        }
    }

    pub fn state(&self) -> ViewState {
        match (&self.image, &self.extraction) {
            (None, _) => ViewState::Idle,
            (Some(_), None) => ViewState::Preview,
            (Some(_), Some(e)) if e.is_empty() => ViewState::EmptyResult,
            (Some(_), Some(_)) => ViewState::Success,
        }
    }

    /// Replace the current upload; any previous result is discarded
    pub fn upload(&mut self, path: &Path) -> Result<&UploadedImage, BomError> {
        self.extraction = None;
        self.image = None;
        let image = upload::load_path(path)?;
        Ok(self.image.insert(image))
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    pub fn extraction(&self) -> Option<&Extraction> {
        self.extraction.as_ref()
    }

    /// Save a key for this session only
    pub fn set_credential(&mut self, key: impl Into<String>) -> bool {
        self.credential.set(key)
    }

    pub fn clear_credential(&mut self) {
        self.credential.clear();
    }

    pub fn has_session_credential(&self) -> bool {
        self.credential.is_set()
    }

    /// Key that a "Generate" would use right now, with its source
    pub fn credential_source(&self) -> Option<CredentialSource> {
        self.resolve().map(|r| r.source)
    }

    fn resolve(&self) -> Option<ResolvedCredential> {
        self.provider.resolve(&self.credential)
    }

    /// "Generate BOM": resolve the key, call the model, keep the result.
    ///
    /// `connect` builds the extractor from the resolved key. It is never
    /// called when no image is loaded or no key resolves.
    pub fn generate<F, E>(&mut self, connect: F) -> Result<&Extraction, BomError>
    where
        F: FnOnce(Credential) -> Result<E, BomError>,
        E: Extractor,
    {
        self.extraction = None;

        let image = self.image.as_ref().ok_or(BomError::NoImage)?;

        let resolved = self.resolve().ok_or_else(|| BomError::MissingCredential {
            hint: self.provider.missing_hint(),
        })?;
        info!(source = %resolved.source, key = %resolved.credential.masked(), "Using API key");

        let extractor = connect(resolved.credential)?;
        let extraction = extract_bom(&extractor, image)?;
        Ok(self.extraction.insert(extraction))
    }

    /// Export of the current result, if there is a non-empty one
    pub fn export(&self, kind: ExportKind) -> Option<&ExportArtifact> {
        self.extraction.as_ref().and_then(|e| e.export(kind))
    }
}
