//! Image operations: types, the provider seam, and the Gemini adapter.

mod provider;
pub mod providers;
mod types;

pub use provider::{ImageProvider, Operation};
pub use types::{GenerationResult, ImageFormat, Instruction, SourceImage, DEFAULT_MIME_TYPE};
