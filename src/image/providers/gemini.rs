//! Gemini (Google) edit and analysis provider.

use crate::codec::{self, EncodedPayload};
use crate::config::Config;
use crate::error::{parse_retry_after, sanitize_error_message, MagicError, Result};
use crate::image::provider::{ImageProvider, Operation};
use crate::image::types::{Instruction, SourceImage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Gemini model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiModel {
    /// Gemini 2.5 Flash Image. Used for edits.
    FlashImage,
    /// Gemini 2.5 Flash. Used for analysis.
    Flash,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlashImage => "gemini-2.5-flash-image",
            Self::Flash => "gemini-2.5-flash",
        }
    }
}

/// Builder for GeminiProvider.
#[derive(Debug, Default)]
pub struct GeminiProviderBuilder {
    config: Config,
    client: Option<reqwest::Client>,
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings and no credential.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Sets the endpoint root (useful for proxies and tests).
    pub fn base_url(mut self, url: impl AsRef<str>) -> Self {
        self.config = self.config.with_base_url(url);
        self
    }

    /// Sets the model used for edits.
    pub fn edit_model(mut self, model: GeminiModel) -> Self {
        self.config.edit_model = model;
        self
    }

    /// Sets the model used for analysis.
    pub fn analysis_model(mut self, model: GeminiModel) -> Self {
        self.config.analysis_model = model;
        self
    }

    /// Uses an existing HTTP client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the provider.
    ///
    /// A missing credential is not an error here; each operation reports it
    /// before touching the network.
    pub fn build(self) -> Result<GeminiProvider> {
        let client = match self.client {
            Some(client) => client,
            None => reqwest::Client::builder().build()?,
        };
        Ok(GeminiProvider {
            client,
            config: self.config,
        })
    }
}

/// Gemini edit and analysis provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    config: Config,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// Builds a provider from [`Config::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::builder().config(Config::from_env()).build()
    }

    /// The configuration this provider was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| MagicError::Config("API_KEY environment variable not set".into()))
    }

    fn model_for(&self, operation: Operation) -> GeminiModel {
        match operation {
            Operation::Edit => self.config.edit_model,
            Operation::Analyze => self.config.analysis_model,
        }
    }

    async fn generate_content(
        &self,
        operation: Operation,
        image: &SourceImage,
        instruction: &Instruction,
    ) -> Result<GeminiResponse> {
        let api_key = self.api_key()?;
        let start = Instant::now();
        let model = self.model_for(operation);

        let payload = codec::encode(image);
        let body = GeminiRequest::new(&payload, instruction, operation);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url,
            model.as_str(),
        );

        tracing::debug!(
            %operation,
            model = model.as_str(),
            mime_type = %payload.mime_type,
            bytes = image.size(),
            "sending Gemini request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let parsed: GeminiResponse = response.json().await?;
        tracing::debug!(
            %operation,
            duration_ms = start.elapsed().as_millis() as u64,
            candidates = parsed.candidates.len(),
            "Gemini request complete"
        );
        Ok(parsed)
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> MagicError {
    let message = sanitize_error_message(text);
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
        return MagicError::RateLimited {
            retry_after,
            message,
        };
    }
    if status == 401 || status == 403 {
        return MagicError::Auth(message);
    }
    MagicError::Api { status, message }
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    async fn edit(&self, image: &SourceImage, instruction: &Instruction) -> Result<String> {
        let response = self
            .generate_content(Operation::Edit, image, instruction)
            .await?;
        extract_image(response)
    }

    async fn analyze(&self, image: &SourceImage, instruction: &Instruction) -> Result<String> {
        let response = self
            .generate_content(Operation::Analyze, image, instruction)
            .await?;
        extract_text(response)
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }
}

/// Returns the data of the first inline-binary part of the first candidate.
///
/// Parts are scanned in order; the image may sit at any position. A blocking
/// finish reason only matters when no image came back.
pub fn extract_image(response: GeminiResponse) -> Result<String> {
    let Some(candidate) = first_candidate(response)? else {
        return Err(MagicError::NoImage);
    };
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    if let Some(inline) = parts.into_iter().find_map(|p| p.inline_data) {
        return Ok(inline.data);
    }
    Err(blocked(candidate.finish_reason.as_deref()).unwrap_or(MagicError::NoImage))
}

/// Returns the concatenated text parts of the first candidate.
///
/// Thought summaries are skipped. A candidate without any text part is an
/// error rather than an empty answer.
pub fn extract_text(response: GeminiResponse) -> Result<String> {
    let Some(candidate) = first_candidate(response)? else {
        return Err(MagicError::NoText);
    };
    let texts: Vec<String> = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.thought.unwrap_or(false))
        .filter_map(|p| p.text)
        .collect();
    if texts.is_empty() {
        return Err(blocked(candidate.finish_reason.as_deref()).unwrap_or(MagicError::NoText));
    }
    Ok(texts.concat())
}

const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "IMAGE_SAFETY",
    "IMAGE_PROHIBITED_CONTENT",
    "IMAGE_RECITATION",
    "RECITATION",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
];

fn first_candidate(response: GeminiResponse) -> Result<Option<GeminiCandidate>> {
    // Prompt blocks arrive as HTTP 200 with no candidates.
    if let Some(feedback) = response.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .unwrap_or_else(|| format!("Prompt blocked: {reason}"));
            return Err(MagicError::ContentBlocked(msg));
        }
    }

    Ok(response.candidates.into_iter().next())
}

fn blocked(finish_reason: Option<&str>) -> Option<MagicError> {
    finish_reason
        .filter(|reason| BLOCKING_FINISH_REASONS.contains(reason))
        .map(|reason| {
            MagicError::ContentBlocked(format!(
                "Content blocked by Gemini safety filter: {reason}"
            ))
        })
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn new(payload: &EncodedPayload, instruction: &Instruction, operation: Operation) -> Self {
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: payload.mime_type.clone(),
                    data: payload.data.clone(),
                },
            },
            GeminiRequestPart::Text {
                text: instruction.as_str().to_string(),
            },
        ];

        let generation_config = match operation {
            Operation::Edit => Some(GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
            }),
            Operation::Analyze => None,
        };

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config,
        }
    }
}

/// A `generateContent` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    #[allow(dead_code)]
    mime_type: Option<String>,
    data: String,
}
