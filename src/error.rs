//! Error types for image operations.

use std::time::Duration;

/// Broad classification of a [`MagicError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential or other configuration missing. Raised before any call.
    Configuration,
    /// The service call failed or was rejected.
    Transport,
    /// The response was well-formed but lacked the expected payload.
    Content,
    /// Required user input was absent. Raised before any call.
    Validation,
    /// Local read or decoding failure.
    Io,
}

/// Errors that can occur while editing or analyzing an image.
#[derive(Debug, thiserror::Error)]
pub enum MagicError {
    /// Credential missing or configuration incomplete.
    #[error("{0}")]
    Config(String),

    /// API key rejected by the service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Suggested delay from the `Retry-After` header.
        retry_after: Option<Duration>,
        /// Message reported by the service.
        message: String,
    },

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// An edit response carried no inline image part.
    #[error("No image found in the response")]
    NoImage,

    /// An analysis response carried no text part.
    #[error("No text found in the response")]
    NoText,

    /// Response shape was not what the service documents.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Required input missing.
    #[error("{0}")]
    Validation(String),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., reading the source image).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MagicError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Auth(_) | Self::Api { .. } | Self::RateLimited { .. } | Self::Network(_) => {
                ErrorKind::Transport
            }
            Self::ContentBlocked(_)
            | Self::NoImage
            | Self::NoText
            | Self::UnexpectedResponse(_) => ErrorKind::Content,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Decode(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Io,
        }
    }

    /// The text to show a user, or `fallback` when the error carries none.
    ///
    /// Services sometimes answer with an empty message, which would otherwise
    /// render as a bare prefix like "API error: 500 - ".
    pub fn message_or(&self, fallback: &str) -> String {
        let detail = match self {
            Self::Config(m)
            | Self::Auth(m)
            | Self::ContentBlocked(m)
            | Self::UnexpectedResponse(m)
            | Self::Validation(m)
            | Self::Decode(m) => Some(m.as_str()),
            Self::Api { message, .. } | Self::RateLimited { message, .. } => Some(message.as_str()),
            _ => None,
        };
        let rendered = self.to_string();
        if detail.is_some_and(|m| m.trim().is_empty()) || rendered.trim().is_empty() {
            return fallback.to_string();
        }
        rendered
    }

    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type alias for image operations.
pub type Result<T> = std::result::Result<T, MagicError>;

const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Extracts a readable message from a service error body.
///
/// Google APIs wrap errors as `{"error": {"message": "..."}}`; when the body
/// has that shape the inner message is returned verbatim. Anything else is
/// trimmed and capped so an HTML error page does not flood the caller.
pub(crate) fn sanitize_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return trimmed.to_string();
    }
    let mut capped: String = trimmed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    capped.push_str("...");
    capped
}

/// Reads `Retry-After` as whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
