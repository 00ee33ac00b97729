//! Binary-to-text conversion for image payloads.

use crate::error::{MagicError, Result};
use crate::image::SourceImage;
use base64::Engine;
use std::path::Path;

/// A base64 view of a [`SourceImage`], built fresh for each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Standard base64, without any data-URI prefix.
    pub data: String,
    /// Declared media type of the source.
    pub mime_type: String,
}

/// Encodes an image as standard base64.
pub fn encode(image: &SourceImage) -> EncodedPayload {
    EncodedPayload {
        data: base64::engine::general_purpose::STANDARD.encode(image.data()),
        mime_type: image.mime_type().to_string(),
    }
}

/// Reads a file and encodes it. Read failures are returned unchanged.
pub async fn encode_file(path: impl AsRef<Path>) -> Result<EncodedPayload> {
    let image = SourceImage::from_path(path).await?;
    Ok(encode(&image))
}

/// Decodes a base64 string that may be imperfectly formatted.
///
/// Accepts a data-URI prefix (`data:image/png;base64,...`), embedded
/// whitespace, and missing `=` padding.
pub fn decode(input: &str) -> Result<Vec<u8>> {
    let cleaned: String = strip_data_uri_prefix(input)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }

    base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(&cleaned)
        .map_err(|e| MagicError::Decode(e.to_string()))
}

/// Returns the payload after a `;base64,` marker, or the input unchanged.
pub fn strip_data_uri_prefix(input: &str) -> &str {
    match input.find(";base64,") {
        Some(pos) => &input[pos + 8..],
        None => input,
    }
}

/// Builds a `data:` URI around an already-encoded payload.
pub fn to_data_uri(mime_type: &str, payload: &str) -> String {
    format!("data:{mime_type};base64,{payload}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_bytes() {
        // Every length through 64 covers each padding case many times over.
        let mut samples: Vec<Vec<u8>> = (1..=64usize)
            .map(|len| (0..len).map(|i| ((i * 37 + len * 11) % 256) as u8).collect())
            .collect();
        samples.push((0..=255u8).collect());
        samples.push((0..=255u8).rev().cycle().take(1000).collect());

        for bytes in samples {
            let image = SourceImage::new(bytes.clone(), "image/png");
            let encoded = encode(&image);
            assert_eq!(decode(&encoded.data).unwrap(), bytes, "len {}", bytes.len());
        }
    }

    #[test]
    fn test_encode_has_no_prefix_and_keeps_mime() {
        let image = SourceImage::new(b"abc".to_vec(), "image/webp");
        let encoded = encode(&image);
        assert_eq!(encoded.data, "YWJj");
        assert_eq!(encoded.mime_type, "image/webp");
    }

    #[test]
    fn test_encode_accepts_any_declared_type() {
        let image = SourceImage::new(b"not an image".to_vec(), "text/plain");
        assert_eq!(encode(&image).mime_type, "text/plain");
    }

    #[test]
    fn test_decode_lenient_inputs() {
        assert_eq!(decode("data:image/png;base64,YWJj").unwrap(), b"abc");
        assert_eq!(decode("YW\nJj").unwrap(), b"abc");
        assert_eq!(decode("YQ").unwrap(), b"a");
        assert!(matches!(decode("!!!"), Err(MagicError::Decode(_))));
    }

    #[test]
    fn test_data_uri_helpers() {
        let uri = to_data_uri("image/png", "YWJj");
        assert_eq!(uri, "data:image/png;base64,YWJj");
        assert_eq!(strip_data_uri_prefix(&uri), "YWJj");
        assert_eq!(strip_data_uri_prefix("YWJj"), "YWJj");
    }

    #[tokio::test]
    async fn test_encode_file_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"jpeg bytes").unwrap();

        let encoded = encode_file(&path).await.unwrap();
        assert_eq!(encoded.mime_type, "image/jpeg");
        assert_eq!(decode(&encoded.data).unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_encode_file_missing_propagates_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = encode_file(dir.path().join("missing.png")).await.unwrap_err();
        assert!(matches!(err, MagicError::Io(_)));
    }
}
