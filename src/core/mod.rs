//! Core module - extraction pipeline and configuration

pub mod bom;
pub mod config;
pub mod credential;
pub mod error;
pub mod inference;
pub mod normalize;
pub mod present;
pub mod project;
pub mod prompt;
pub mod session;
pub mod upload;

pub use bom::{BomResult, PartRecord};
pub use config::Config;
pub use credential::{Credential, CredentialProvider, CredentialSource, SessionCredential, Variant};
pub use error::{BomError, ParseError};
pub use inference::{Extractor, GeminiClient};
pub use normalize::normalize;
pub use present::{present, BomTable, Cell, ExportArtifact, Presentation};
pub use project::{Project, ProjectError};
pub use session::{extract_bom, ExportKind, Extraction, Session, ViewState};
pub use upload::{ImageKind, UploadedImage};
