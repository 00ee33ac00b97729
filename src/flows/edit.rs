//! Free-form edit flow: the user's text is the instruction.

use super::{prepare_with, single, FlowState, FlowTracker, Prompts, Submission, Ticket};
use crate::error::{MagicError, Result};
use crate::image::{GenerationResult, ImageProvider, Instruction, Operation, SourceImage};

const MISSING_INPUT: &str = "Please upload an image and enter a prompt.";
const FAILED: &str = "An error occurred while generating the image.";

/// Edits an image with a user-typed instruction.
#[derive(Debug)]
pub struct EditFlow {
    image: Option<SourceImage>,
    prompt: String,
    tracker: FlowTracker<GenerationResult>,
}

impl Default for EditFlow {
    fn default() -> Self {
        Self {
            image: None,
            prompt: String::new(),
            tracker: FlowTracker::with_fallback(FAILED),
        }
    }
}

impl EditFlow {
    /// Creates an empty flow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the source image and returns to idle.
    pub fn set_image(&mut self, image: SourceImage) {
        self.image = Some(image);
        self.tracker.reset();
    }

    /// Sets the instruction text and returns to idle.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
        self.tracker.reset();
    }

    /// Current state.
    pub fn state(&self) -> &FlowState<GenerationResult> {
        self.tracker.state()
    }

    /// Validates inputs and builds the submission.
    pub fn prepare(&mut self) -> Result<Submission> {
        let image = self.image.clone();
        let prompt = self.prompt.clone();
        prepare_with(&mut self.tracker, Operation::Edit, move || {
            match image {
                Some(image) if !prompt.is_empty() => {
                    Ok((image, Prompts::Single(Instruction::new(prompt))))
                }
                _ => Err(MagicError::validation(MISSING_INPUT)),
            }
        })
    }

    /// Stores the outcome of a submission. Returns false if it was stale.
    pub fn apply(&mut self, ticket: Ticket, outcome: Result<Vec<GenerationResult>>) -> bool {
        self.tracker.complete(ticket, outcome.and_then(single))
    }

    /// Validates, runs, and stores the outcome.
    pub async fn submit<P>(&mut self, provider: &P) -> &FlowState<GenerationResult>
    where
        P: ImageProvider + ?Sized,
    {
        if let Ok(submission) = self.prepare() {
            let outcome = submission.run(provider).await;
            self.apply(submission.ticket(), outcome);
        }
        self.state()
    }
}
