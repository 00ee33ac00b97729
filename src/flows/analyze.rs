//! Analysis flow: ask a question about an image and get text back.

use super::{prepare_with, single, FlowState, FlowTracker, Prompts, Submission, Ticket};
use crate::error::{MagicError, Result};
use crate::image::{GenerationResult, ImageProvider, Instruction, Operation, SourceImage};

/// Question used until the user types their own.
pub const DEFAULT_ANALYSIS_PROMPT: &str = "Describe this image in detail.";

const MISSING_IMAGE: &str = "Please upload an image to analyze.";
const FAILED: &str = "An error occurred while analyzing the image.";

/// Describes an image or answers a question about it.
#[derive(Debug)]
pub struct AnalyzeFlow {
    image: Option<SourceImage>,
    prompt: String,
    tracker: FlowTracker<GenerationResult>,
}

impl Default for AnalyzeFlow {
    fn default() -> Self {
        Self {
            image: None,
            prompt: DEFAULT_ANALYSIS_PROMPT.to_string(),
            tracker: FlowTracker::with_fallback(FAILED),
        }
    }
}

impl AnalyzeFlow {
    /// Creates a flow with the default question.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the source image and returns to idle.
    pub fn set_image(&mut self, image: SourceImage) {
        self.image = Some(image);
        self.tracker.reset();
    }

    /// Sets the question and returns to idle.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
        self.tracker.reset();
    }

    /// The question that will be sent.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Current state.
    pub fn state(&self) -> &FlowState<GenerationResult> {
        self.tracker.state()
    }

    /// Validates inputs and builds the submission. Only the image is required.
    pub fn prepare(&mut self) -> Result<Submission> {
        let image = self.image.clone();
        let prompt = Instruction::new(self.prompt.clone());
        prepare_with(&mut self.tracker, Operation::Analyze, move || {
            let image = image.ok_or_else(|| MagicError::validation(MISSING_IMAGE))?;
            Ok((image, Prompts::Single(prompt)))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testing::{sample_image, RecordingProvider};

    #[tokio::test]
    async fn test_default_prompt_is_sent() {
        let provider = RecordingProvider::new();
        let mut flow = AnalyzeFlow::new();
        flow.set_image(sample_image());

        let state = flow.submit(&provider).await;
        assert_eq!(
            state.success(),
            Some(&GenerationResult::Text(format!(
                "result for {DEFAULT_ANALYSIS_PROMPT}"
            )))
        );
        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Operation::Analyze);
    }

    #[tokio::test]
    async fn test_custom_question_rendered_verbatim() {
        let provider = RecordingProvider::new();
        let mut flow = AnalyzeFlow::new();
        flow.set_image(sample_image());
        flow.set_prompt("How many dogs?");

        let state = flow.submit(&provider).await;
        assert_eq!(
            state.success().map(|r| r.render()),
            Some("result for How many dogs?".to_string())
        );
    }

    #[tokio::test]
    async fn test_blank_service_message_uses_flow_fallback() {
        let provider = RecordingProvider {
            fail_on: Some("dogs".into()),
            fail_message: Some(" ".into()),
            ..RecordingProvider::new()
        };
        let mut flow = AnalyzeFlow::new();
        flow.set_image(sample_image());
        flow.set_prompt("How many dogs?");

        assert_eq!(flow.submit(&provider).await.error(), Some(FAILED));
    }

    #[tokio::test]
    async fn test_missing_image() {
        let provider = RecordingProvider::new();
        let mut flow = AnalyzeFlow::new();

        let state = flow.submit(&provider).await;
        assert_eq!(state.error(), Some(MISSING_IMAGE));
        assert!(provider.instructions().is_empty());
    }
}
