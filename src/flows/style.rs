//! Style suggestion flow.
//!
//! Either a custom request (one call) or a feature category, which expands
//! into two canned instructions sent as two parallel calls.

use super::{prepare_with, FlowState, FlowTracker, Prompts, Submission, Ticket};
use crate::error::{MagicError, Result};
use crate::image::{GenerationResult, ImageProvider, Instruction, Operation, SourceImage};
use std::str::FromStr;

const MISSING_INPUT: &str = "Please upload a photo and select a feature or enter a custom request.";
const FAILED: &str = "An error occurred while generating suggestions.";

/// Feature categories with canned suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleFeature {
    /// Haircut suggestions.
    Hairstyle,
    /// Shirt suggestions.
    Shirt,
    /// Beard suggestions.
    Beard,
    /// Trouser suggestions.
    Jeans,
}

impl StyleFeature {
    /// Every feature, in display order.
    pub const ALL: [StyleFeature; 4] = [
        StyleFeature::Hairstyle,
        StyleFeature::Shirt,
        StyleFeature::Beard,
        StyleFeature::Jeans,
    ];

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hairstyle => "hairstyle",
            Self::Shirt => "shirt",
            Self::Beard => "beard",
            Self::Jeans => "jeans",
        }
    }

    /// The two fixed instructions for this feature, in dispatch order.
    pub fn instructions(&self) -> [&'static str; 2] {
        match self {
            Self::Hairstyle => [
                "Keeping the person's face and facial features exactly the same, change their \
                 hairstyle to a modern, trendy haircut that is flattering for their face shape.",
                "Keeping the person's face and facial features exactly the same, change their \
                 hairstyle to a classic, elegant hairstyle that suits them.",
            ],
            Self::Shirt => [
                "Keeping the person's face, hair, and body shape the same, change their shirt to a \
                 stylish casual button-down shirt that complements their appearance.",
                "Keeping the person's face, hair, and body shape the same, change their shirt to a \
                 high-quality, well-fitting plain t-shirt in a color that suits them.",
            ],
            Self::Beard => [
                "Keeping the person's face and facial features exactly the same, add a \
                 well-groomed, full beard that suits their face shape.",
                "Keeping the person's face and facial features exactly the same, add a stylish, \
                 short stubble beard.",
            ],
            Self::Jeans => [
                "Keeping the person's upper body (shirt, face, hair) the same, change their pants \
                 to a pair of classic, well-fitting blue jeans.",
                "Keeping the person's upper body (shirt, face, hair) the same, change their pants \
                 to a pair of modern, slim-fit black jeans.",
            ],
        }
    }
}

impl std::fmt::Display for StyleFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StyleFeature {
    type Err = MagicError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MagicError::validation(format!("Unknown style feature: {wanted}")))
    }
}

/// Chooses the prompts for a style submission.
///
/// Non-blank custom text wins and is sent trimmed as a single call, whatever
/// feature is selected. Otherwise a selected feature yields its two canned
/// instructions. `None` means there is nothing to send.
pub fn style_prompts(feature: Option<StyleFeature>, custom: &str) -> Option<Prompts> {
    let custom = custom.trim();
    if !custom.is_empty() {
        return Some(Prompts::Single(Instruction::new(custom)));
    }
    feature.map(|f| {
        let [first, second] = f.instructions();
        Prompts::Pair(Instruction::new(first), Instruction::new(second))
    })
}

/// Suggests grooming and clothing changes for a photo.
#[derive(Debug)]
pub struct StyleFlow {
    image: Option<SourceImage>,
    feature: Option<StyleFeature>,
    custom: String,
    tracker: FlowTracker<Vec<GenerationResult>>,
}

impl Default for StyleFlow {
    fn default() -> Self {
        Self {
            image: None,
            feature: None,
            custom: String::new(),
            tracker: FlowTracker::with_fallback(FAILED),
        }
    }
}

impl StyleFlow {
    /// Creates an empty flow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the source image and returns to idle.
    pub fn set_image(&mut self, image: SourceImage) {
        self.image = Some(image);
        self.tracker.reset();
    }

    /// Selects a feature. Clears any custom request.
    pub fn select_feature(&mut self, feature: StyleFeature) {
        self.feature = Some(feature);
        self.custom.clear();
        self.tracker.reset();
    }

    /// Sets a custom request. Clears the selected feature.
    pub fn set_custom_prompt(&mut self, prompt: impl Into<String>) {
        self.custom = prompt.into();
        self.feature = None;
        self.tracker.reset();
    }

    /// Selected feature, if any.
    pub fn feature(&self) -> Option<StyleFeature> {
        self.feature
    }

    /// True when the current inputs produce a custom (single) request.
    pub fn is_custom(&self) -> bool {
        !self.custom.trim().is_empty()
    }

    /// Current state.
    pub fn state(&self) -> &FlowState<Vec<GenerationResult>> {
        self.tracker.state()
    }

    /// Validates inputs and builds the submission.
    pub fn prepare(&mut self) -> Result<Submission> {
        let image = self.image.clone();
        let prompts = style_prompts(self.feature, &self.custom);
        prepare_with(&mut self.tracker, Operation::Edit, move || match (image, prompts) {
            (Some(image), Some(prompts)) => Ok((image, prompts)),
            _ => Err(MagicError::validation(MISSING_INPUT)),
        })
    }

    /// Stores the outcome of a submission. Returns false if it was stale.
    pub fn apply(&mut self, ticket: Ticket, outcome: Result<Vec<GenerationResult>>) -> bool {
        self.tracker.complete(ticket, outcome)
    }

    /// Validates, runs, and stores the outcome.
    pub async fn submit<P>(&mut self, provider: &P) -> &FlowState<Vec<GenerationResult>>
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
    use std::time::Duration;

    #[test]
    fn test_every_feature_has_two_distinct_instructions() {
        for feature in StyleFeature::ALL {
            let [a, b] = feature.instructions();
            assert_ne!(a, b, "{feature}");
            assert!(a.starts_with("Keeping the person's"));
        }
    }

    #[test]
    fn test_custom_text_wins_over_feature() {
        let prompts = style_prompts(Some(StyleFeature::Beard), "  Add a stylish hat ");
        assert_eq!(prompts, Some(Prompts::Single("Add a stylish hat".into())));
    }

    #[test]
    fn test_feature_expands_to_pair_in_order() {
        let prompts = style_prompts(Some(StyleFeature::Jeans), "   ").unwrap();
        let [first, second] = StyleFeature::Jeans.instructions();
        assert_eq!(prompts, Prompts::Pair(first.into(), second.into()));
    }

    #[test]
    fn test_nothing_selected() {
        assert_eq!(style_prompts(None, ""), None);
    }

    #[test]
    fn test_selection_is_mutually_exclusive() {
        let mut flow = StyleFlow::new();
        flow.set_custom_prompt("Add a hat");
        flow.select_feature(StyleFeature::Shirt);
        assert!(!flow.is_custom());
        flow.set_custom_prompt("Add a scarf");
        assert_eq!(flow.feature(), None);
    }

    #[tokio::test]
    async fn test_feature_issues_two_calls_and_keeps_order() {
        let [first, second] = StyleFeature::Hairstyle.instructions();
        let provider = RecordingProvider {
            // The first call finishes last.
            slow_on: Some(("modern, trendy".into(), Duration::from_millis(30))),
            ..RecordingProvider::new()
        };
        let mut flow = StyleFlow::new();
        flow.set_image(sample_image());
        flow.select_feature(StyleFeature::Hairstyle);

        let state = flow.submit(&provider).await;
        let results = state.success().unwrap();
        assert_eq!(
            results,
            &vec![
                GenerationResult::Image(format!("result for {first}")),
                GenerationResult::Image(format!("result for {second}")),
            ]
        );
        let mut sent = provider.instructions();
        sent.sort();
        let mut expected = vec![first.to_string(), second.to_string()];
        expected.sort();
        assert_eq!(sent, expected);

        // Dispatched together: the second finished before the first did.
        let first_finished = provider.event_index(&format!("finish:{first}")).unwrap();
        let second_started = provider.event_index(&format!("start:{second}")).unwrap();
        let second_finished = provider.event_index(&format!("finish:{second}")).unwrap();
        assert!(second_started < first_finished);
        assert!(second_finished < first_finished);
    }

    #[tokio::test]
    async fn test_custom_issues_one_call() {
        let provider = RecordingProvider::new();
        let mut flow = StyleFlow::new();
        flow.set_image(sample_image());
        flow.set_custom_prompt("Change the background to a cityscape at night");

        let state = flow.submit(&provider).await;
        assert_eq!(state.success().map(Vec::len), Some(1));
        assert_eq!(
            provider.instructions(),
            vec!["Change the background to a cityscape at night".to_string()]
        );
    }

    #[tokio::test]
    async fn test_one_failure_fails_whole_submission() {
        let provider = RecordingProvider {
            fail_on: Some("stubble".into()),
            ..RecordingProvider::new()
        };
        let mut flow = StyleFlow::new();
        flow.set_image(sample_image());
        flow.select_feature(StyleFeature::Beard);

        let state = flow.submit(&provider).await;
        assert!(state.success().is_none());
        assert!(state.error().unwrap().contains("stubble"));
    }

    #[tokio::test]
    async fn test_empty_service_message_uses_flow_fallback() {
        let provider = RecordingProvider {
            fail_on: Some("stubble".into()),
            fail_message: Some(String::new()),
            ..RecordingProvider::new()
        };
        let mut flow = StyleFlow::new();
        flow.set_image(sample_image());
        flow.select_feature(StyleFeature::Beard);

        assert_eq!(flow.submit(&provider).await.error(), Some(FAILED));
    }

    #[tokio::test]
    async fn test_validation_without_selection() {
        let provider = RecordingProvider::new();
        let mut flow = StyleFlow::new();
        flow.set_image(sample_image());

        assert_eq!(flow.submit(&provider).await.error(), Some(MISSING_INPUT));
        assert!(provider.instructions().is_empty());
    }
}
