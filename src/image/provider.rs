//! Image provider trait.

use crate::error::Result;
use crate::image::types::{GenerationResult, Instruction, SourceImage};
use async_trait::async_trait;

/// The two request shapes a provider serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Generative edit; the response must carry an image.
    Edit,
    /// Descriptive analysis; the response must carry text.
    Analyze,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edit => write!(f, "edit"),
            Self::Analyze => write!(f, "analyze"),
        }
    }
}

/// Trait for services that edit and describe images.
///
/// Flow controllers only talk to this trait, so tests can substitute an
/// in-memory implementation for the network.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Applies `instruction` to `image` and returns the base64 result image.
    async fn edit(&self, image: &SourceImage, instruction: &Instruction) -> Result<String>;

    /// Answers `instruction` about `image` and returns the text verbatim.
    async fn analyze(&self, image: &SourceImage, instruction: &Instruction) -> Result<String>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;

    /// Runs either operation and wraps the payload in a [`GenerationResult`].
    async fn run(
        &self,
        operation: Operation,
        image: &SourceImage,
        instruction: &Instruction,
    ) -> Result<GenerationResult> {
        match operation {
            Operation::Edit => self.edit(image, instruction).await.map(GenerationResult::Image),
            Operation::Analyze => self
                .analyze(image, instruction)
                .await
                .map(GenerationResult::Text),
        }
    }
}
