//! Core types for image operations.

use crate::codec;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Media type assumed when nothing better is known.
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Image formats recognized when sniffing a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// An image supplied by the user, held in memory with its declared media type.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage {
    data: Vec<u8>,
    mime_type: String,
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("len", &self.data.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl SourceImage {
    /// Wraps bytes with an explicit media type. No validation is applied.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Wraps bytes, sniffing the media type from magic bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let mime_type = ImageFormat::from_magic_bytes(&data)
            .map(|f| f.mime_type())
            .unwrap_or(DEFAULT_MIME_TYPE);
        Self::new(data, mime_type)
    }

    /// Reads an image from disk.
    ///
    /// The media type comes from the file extension, then the magic bytes,
    /// then falls back to `image/png`.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let from_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension);
        let mime_type = from_ext
            .or_else(|| ImageFormat::from_magic_bytes(&data))
            .map(|f| f.mime_type())
            .unwrap_or(DEFAULT_MIME_TYPE);
        Ok(Self::new(data, mime_type))
    }

    /// Raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Declared media type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A natural-language directive sent alongside an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instruction(String);

impl Instruction {
    /// Creates an instruction from any string.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The instruction text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Instruction {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Instruction {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a single successful provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "generation result should be rendered or saved"]
pub enum GenerationResult {
    /// Base64-encoded image data.
    Image(String),
    /// Plain text answer.
    Text(String),
}

impl GenerationResult {
    /// Renders the result for display: images as a PNG data URI, text verbatim.
    pub fn render(&self) -> String {
        match self {
            Self::Image(payload) => codec::to_data_uri(DEFAULT_MIME_TYPE, payload),
            Self::Text(text) => text.clone(),
        }
    }

    /// Returns the decoded image bytes, or `None` for text results.
    pub fn image_bytes(&self) -> Option<Result<Vec<u8>>> {
        match self {
            Self::Image(payload) => Some(codec::decode(payload)),
            Self::Text(_) => None,
        }
    }

    /// Returns the text, or `None` for image results.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Image(_) => None,
        }
    }
}
