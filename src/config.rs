//! Service configuration.
//!
//! The credential and endpoints live in a [`Config`] value that is handed to
//! the provider when it is built. Nothing reads the process environment at
//! call time; [`Config::from_env`] exists for binaries that want it.

use crate::image::providers::GeminiModel;
use std::env;

/// Default Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Environment variables consulted for the credential, in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

/// Environment variable that overrides the API endpoint.
pub const BASE_URL_ENV_VAR: &str = "GEMINI_BASE_URL";

/// Configuration for the Gemini provider.
#[derive(Clone)]
pub struct Config {
    /// API credential. `None` makes every operation fail before dispatch.
    pub api_key: Option<String>,
    /// Endpoint root, without trailing slash.
    pub base_url: String,
    /// Model used for image edits.
    pub edit_model: GeminiModel,
    /// Model used for image analysis.
    pub analysis_model: GeminiModel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            edit_model: GeminiModel::FlashImage,
            analysis_model: GeminiModel::Flash,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("edit_model", &self.edit_model)
            .field("analysis_model", &self.analysis_model)
            .finish()
    }
}

impl Config {
    /// Creates a configuration with defaults and no credential.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the credential and endpoint override from the environment.
    pub fn from_env() -> Self {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| env::var(name).ok())
            .find(|value| !value.trim().is_empty());
        let base_url = env::var(BASE_URL_ENV_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            api_key,
            base_url: normalize_base_url(&base_url),
            ..Self::default()
        }
    }

    /// Sets the API credential.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the endpoint root.
    pub fn with_base_url(mut self, url: impl AsRef<str>) -> Self {
        self.base_url = normalize_base_url(url.as_ref());
        self
    }

    /// Sets the model used for edits.
    pub fn with_edit_model(mut self, model: GeminiModel) -> Self {
        self.edit_model = model;
        self
    }

    /// Sets the model used for analysis.
    pub fn with_analysis_model(mut self, model: GeminiModel) -> Self {
        self.analysis_model = model;
        self
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
