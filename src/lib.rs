#![warn(missing_docs)]
//! Photomagic - edit, analyze, and restyle photos with Gemini.
//!
//! The crate wraps Gemini's `generateContent` endpoint in two operations,
//! [`ImageProvider::edit`] and [`ImageProvider::analyze`], and builds four
//! flows on top of them: free-form edits, image analysis, era restyling, and
//! style suggestions.
//!
//! # Quick Start
//!
//! ```no_run
//! use photomagic::{Config, EditFlow, GeminiProvider, SourceImage};
//!
//! #[tokio::main]
//! async fn main() -> photomagic::Result<()> {
//!     let provider = GeminiProvider::builder()
//!         .config(Config::from_env())
//!         .build()?;
//!
//!     let mut flow = EditFlow::new();
//!     flow.set_image(SourceImage::from_path("photo.jpg").await?);
//!     flow.set_prompt("Add a retro filter");
//!
//!     if let Some(result) = flow.submit(&provider).await.success() {
//!         println!("{}", result.render());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli` (default): the `photomagic` command-line tool.

pub mod codec;
mod config;
mod error;
pub mod flows;
pub mod image;

pub use config::{Config, API_KEY_ENV_VARS, BASE_URL_ENV_VAR, DEFAULT_BASE_URL};
pub use error::{ErrorKind, MagicError, Result};

pub use codec::EncodedPayload;
pub use flows::{
    AnalyzeFlow, EditFlow, Era, EraFlow, FlowState, StyleFeature, StyleFlow, Submission, Ticket,
};
pub use image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};
pub use image::{GenerationResult, ImageProvider, Instruction, Operation, SourceImage};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{MagicError, Result};
    pub use crate::flows::{AnalyzeFlow, EditFlow, Era, EraFlow, StyleFeature, StyleFlow};
    pub use crate::image::providers::GeminiProvider;
    pub use crate::image::{GenerationResult, ImageProvider, Instruction, SourceImage};
}
