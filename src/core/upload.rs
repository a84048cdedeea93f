//! Image upload handling
//!
//! Only PNG and JPEG uploads are accepted. The decoded image is kept for the
//! preview; the original bytes are what gets sent to the model, with no
//! resizing or re-encoding.

use std::fmt;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat};
use tracing::info;

use crate::core::error::BomError;

/// Accepted upload kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Extensions offered by the upload surface
    pub const EXTENSIONS: &'static [&'static str] = &["png", "jpg", "jpeg"];

    /// Parse a declared kind: a file extension or a MIME type
    pub fn from_declared(declared: &str) -> Option<Self> {
        match declared.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" | "image/png" => Some(ImageKind::Png),
            "jpg" | "jpeg" | "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }

    fn format(self) -> ImageFormat {
        match self {
            ImageKind::Png => ImageFormat::Png,
            ImageKind::Jpeg => ImageFormat::Jpeg,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Png => write!(f, "PNG"),
            ImageKind::Jpeg => write!(f, "JPEG"),
        }
    }
}

/// A validated, decoded upload
#[derive(Debug, Clone)]
pub struct UploadedImage {
    name: String,
    kind: ImageKind,
    bytes: Vec<u8>,
    decoded: DynamicImage,
}

impl UploadedImage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    /// Original upload bytes, forwarded unchanged to the model
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn decoded(&self) -> &DynamicImage {
        &self.decoded
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.decoded.width(), self.decoded.height())
    }

    /// Base64 payload for the inference request
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// One-line preview caption, e.g. `diagram.png (PNG, 800x600, Rgb8)`
    pub fn caption(&self) -> String {
        let (w, h) = self.dimensions();
        format!(
            "{} ({}, {}x{}, {:?})",
            self.name,
            self.kind,
            w,
            h,
            self.decoded.color()
        )
    }
}

/// Validate and decode an upload.
///
/// Fails with [`BomError::InvalidImage`] for any kind other than PNG/JPEG,
/// and for bytes that do not decode as the declared kind.
pub fn load(name: &str, bytes: Vec<u8>, declared_kind: &str) -> Result<UploadedImage, BomError> {
    let kind = ImageKind::from_declared(declared_kind).ok_or_else(|| BomError::InvalidImage {
        name: name.to_string(),
        reason: format!(
            "unsupported type '{}' (allowed: {})",
            declared_kind,
            ImageKind::EXTENSIONS.join(", ")
        ),
    })?;

    let decoded = image::load_from_memory_with_format(&bytes, kind.format()).map_err(|e| {
        BomError::InvalidImage {
            name: name.to_string(),
            reason: format!("not a valid {} image: {}", kind, e),
        }
    })?;

    info!(
        name,
        kind = %kind,
        width = decoded.width(),
        height = decoded.height(),
        bytes = bytes.len(),
        "Loaded image"
    );

    Ok(UploadedImage {
        name: name.to_string(),
        kind,
        bytes,
        decoded,
    })
}

/// Read an image file, taking the declared kind from its extension
pub fn load_path(path: &Path) -> Result<UploadedImage, BomError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Reject by type before touching the file contents
    if ImageKind::from_declared(&extension).is_none() {
        return load(&name, Vec::new(), &extension);
    }

    let bytes = std::fs::read(path).map_err(|e| BomError::InvalidImage {
        name: name.clone(),
        reason: format!("cannot read {}: {}", path.display(), e),
    })?;
    load(&name, bytes, &extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encoded(format: ImageFormat, w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(w, h);
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_from_declared() {
        assert_eq!(ImageKind::from_declared("png"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_declared("PNG"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_declared(".jpg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_declared("jpeg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_declared("image/jpeg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_declared("gif"), None);
        assert_eq!(ImageKind::from_declared("webp"), None);
        assert_eq!(ImageKind::from_declared(""), None);
    }

    #[test]
    fn test_load_png() {
        let bytes = encoded(ImageFormat::Png, 64, 32);
        let img = load("diagram.png", bytes.clone(), "png").unwrap();
        assert_eq!(img.kind(), ImageKind::Png);
        assert_eq!(img.dimensions(), (64, 32));
        assert_eq!(img.bytes(), bytes.as_slice());
        assert!(img.caption().starts_with("diagram.png (PNG, 64x32"));
    }

    #[test]
    fn test_load_jpeg_bytes_forwarded_unchanged() {
        let bytes = encoded(ImageFormat::Jpeg, 20, 20);
        let img = load("photo.JPG", bytes.clone(), "JPG").unwrap();
        assert_eq!(img.kind().mime_type(), "image/jpeg");
        let decoded = STANDARD.decode(img.to_base64()).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_load_rejects_unsupported_kind() {
        let bytes = encoded(ImageFormat::Png, 8, 8);
        let err = load("diagram.gif", bytes, "gif").unwrap_err();
        match err {
            BomError::InvalidImage { name, reason } => {
                assert_eq!(name, "diagram.gif");
                assert!(reason.contains("unsupported type 'gif'"));
            }
            other => panic!("expected InvalidImage, got {other:?}"),
        }
    }

    #[test]
    fn test_load_rejects_undecodable_bytes() {
        let err = load("diagram.png", b"not an image".to_vec(), "png").unwrap_err();
        assert!(matches!(err, BomError::InvalidImage { .. }));
    }

    #[test]
    fn test_load_rejects_mismatched_kind() {
        let bytes = encoded(ImageFormat::Png, 8, 8);
        assert!(load("diagram.jpg", bytes, "jpg").is_err());
    }

    #[test]
    fn test_load_path_rejects_extension_without_reading() {
        let err = load_path(Path::new("/nonexistent/diagram.bmp")).unwrap_err();
        match err {
            BomError::InvalidImage { reason, .. } => assert!(reason.contains("unsupported type")),
            other => panic!("expected InvalidImage, got {other:?}"),
        }
    }

    #[test]
    fn test_load_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts.png");
        std::fs::write(&path, encoded(ImageFormat::Png, 10, 12)).unwrap();
        let img = load_path(&path).unwrap();
        assert_eq!(img.name(), "parts.png");
        assert_eq!(img.dimensions(), (10, 12));
    }
}
