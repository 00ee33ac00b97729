//! Flow controllers.
//!
//! Each flow owns its inputs and a [`FlowTracker`] holding the outcome of the
//! latest submission. Submitting goes through three steps:
//!
//! 1. `prepare()` validates the inputs, builds the prompts, and issues a
//!    [`Ticket`]. Validation failures land in the tracker without any call.
//! 2. [`Submission::run`] performs the provider calls. It borrows only the
//!    provider, so several submissions may be in flight at once.
//! 3. `apply()` stores the outcome, unless a newer ticket has been issued
//!    since, in which case the outcome is dropped.
//!
//! `submit()` chains the three for callers that never overlap submissions.

mod analyze;
mod edit;
mod era;
mod style;

pub use analyze::{AnalyzeFlow, DEFAULT_ANALYSIS_PROMPT};
pub use edit::EditFlow;
pub use era::{era_instruction, Era, EraFlow};
pub use style::{style_prompts, StyleFeature, StyleFlow};

use crate::error::{MagicError, Result};
use crate::image::{GenerationResult, ImageProvider, Instruction, Operation, SourceImage};

/// Identifies one submission. Later submissions get larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    /// The raw sequence number.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Lifecycle of a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState<T> {
    /// Nothing submitted since the inputs last changed.
    Idle,
    /// A submission is being checked.
    Validating(Ticket),
    /// Provider calls are outstanding.
    InFlight(Ticket),
    /// The latest submission succeeded.
    Succeeded(T),
    /// The latest submission failed with this message.
    Failed(String),
}

impl<T> Default for FlowState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> FlowState<T> {
    /// True while a submission is being validated or is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Validating(_) | Self::InFlight(_))
    }

    /// The success payload, if any.
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    /// The failure message, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Failure text used when an error has no message of its own.
pub const DEFAULT_FAILURE_MESSAGE: &str = "An unexpected error occurred.";

/// Holds a flow's state and decides which outcomes are still current.
#[derive(Debug)]
pub struct FlowTracker<T> {
    state: FlowState<T>,
    issued: u64,
    latest: Option<Ticket>,
    fallback: &'static str,
}

impl<T> Default for FlowTracker<T> {
    fn default() -> Self {
        Self::with_fallback(DEFAULT_FAILURE_MESSAGE)
    }
}

impl<T> FlowTracker<T> {
    /// Creates an idle tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an idle tracker that reports `fallback` for failures without
    /// a message.
    pub fn with_fallback(fallback: &'static str) -> Self {
        Self {
            state: FlowState::Idle,
            issued: 0,
            latest: None,
            fallback,
        }
    }

    /// Current state.
    pub fn state(&self) -> &FlowState<T> {
        &self.state
    }

    /// Starts a submission: issues a fresh ticket and moves to `Validating`.
    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        let ticket = Ticket(self.issued);
        self.latest = Some(ticket);
        self.state = FlowState::Validating(ticket);
        ticket
    }

    /// Moves a validated submission to `InFlight`.
    pub fn dispatch(&mut self, ticket: Ticket) {
        if self.is_current(ticket) {
            self.state = FlowState::InFlight(ticket);
        }
    }

    /// Records an outcome. Returns false when the ticket is stale and the
    /// outcome was dropped.
    pub fn complete(&mut self, ticket: Ticket, outcome: Result<T>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(ticket = ticket.id(), "discarding stale outcome");
            return false;
        }
        self.state = match outcome {
            Ok(value) => FlowState::Succeeded(value),
            Err(err) => {
                tracing::warn!(ticket = ticket.id(), kind = ?err.kind(), "flow failed: {err}");
                FlowState::Failed(err.message_or(self.fallback))
            }
        };
        true
    }

    /// Returns to `Idle` after an input change. Outstanding tickets go stale.
    pub fn reset(&mut self) {
        self.latest = None;
        self.state = FlowState::Idle;
    }

    /// True when `ticket` is the most recently issued one.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest == Some(ticket)
    }
}

/// One or two instructions, sent as one call or two parallel calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompts {
    /// A single call.
    Single(Instruction),
    /// Two calls dispatched together; results keep this order.
    Pair(Instruction, Instruction),
}

impl Prompts {
    /// The instructions in dispatch order.
    pub fn instructions(&self) -> Vec<&Instruction> {
        match self {
            Self::Single(only) => vec![only],
            Self::Pair(first, second) => vec![first, second],
        }
    }
}

/// A validated submission, ready to run against a provider.
#[derive(Debug, Clone)]
pub struct Submission {
    ticket: Ticket,
    operation: Operation,
    image: SourceImage,
    prompts: Prompts,
}

impl Submission {
    fn new(ticket: Ticket, operation: Operation, image: SourceImage, prompts: Prompts) -> Self {
        Self {
            ticket,
            operation,
            image,
            prompts,
        }
    }

    /// Ticket to hand back to the flow's `apply`.
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// The prompts this submission will send.
    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    /// Performs the provider calls.
    ///
    /// For a pair, both calls are issued before either is awaited and the
    /// results are returned in prompt order. The first failure is returned
    /// and the other call's result is dropped.
    pub async fn run<P>(&self, provider: &P) -> Result<Vec<GenerationResult>>
    where
        P: ImageProvider + ?Sized,
    {
        tracing::debug!(
            ticket = self.ticket.id(),
            operation = %self.operation,
            provider = provider.name(),
            calls = self.prompts.instructions().len(),
            "dispatching submission"
        );
        match &self.prompts {
            Prompts::Single(instruction) => {
                let result = provider.run(self.operation, &self.image, instruction).await?;
                Ok(vec![result])
            }
            Prompts::Pair(first, second) => {
                let (a, b) = tokio::try_join!(
                    provider.run(self.operation, &self.image, first),
                    provider.run(self.operation, &self.image, second),
                )?;
                Ok(vec![a, b])
            }
        }
    }
}

/// Runs the validation step shared by every flow.
///
/// On success the tracker is `InFlight`; on failure it is `Failed` with the
/// validation message and the error is returned.
fn prepare_with<T>(
    tracker: &mut FlowTracker<T>,
    operation: Operation,
    build: impl FnOnce() -> Result<(SourceImage, Prompts)>,
) -> Result<Submission> {
    let ticket = tracker.begin();
    match build() {
        Ok((image, prompts)) => {
            tracker.dispatch(ticket);
            Ok(Submission::new(ticket, operation, image, prompts))
        }
        Err(err) => {
            let message = err.to_string();
            tracker.complete(ticket, Err(err));
            Err(MagicError::Validation(message))
        }
    }
}

/// Takes the only result of a single-call submission.
fn single(results: Vec<GenerationResult>) -> Result<GenerationResult> {
    results
        .into_iter()
        .next()
        .ok_or_else(|| MagicError::UnexpectedResponse("submission produced no result".into()))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every call and answers from a script.
    #[derive(Default)]
    pub struct RecordingProvider {
        pub calls: Mutex<Vec<(Operation, String)>>,
        /// `start:` and `finish:` entries per call, in the order they happened.
        pub events: Mutex<Vec<String>>,
        /// Instructions containing this text fail with an API error.
        pub fail_on: Option<String>,
        /// Service message carried by those failures instead of the default.
        pub fail_message: Option<String>,
        /// Delay applied to calls whose instruction contains this text.
        pub slow_on: Option<(String, Duration)>,
    }

    impl RecordingProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn instructions(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, text)| text.clone())
                .collect()
        }

        /// Index of `event` in the call log.
        pub fn event_index(&self, event: &str) -> Option<usize> {
            self.events.lock().unwrap().iter().position(|e| e == event)
        }

        async fn answer(&self, operation: Operation, instruction: &Instruction) -> Result<String> {
            let text = instruction.as_str().to_string();
            self.calls.lock().unwrap().push((operation, text.clone()));
            self.events.lock().unwrap().push(format!("start:{text}"));
            if let Some((needle, delay)) = &self.slow_on {
                if text.contains(needle.as_str()) {
                    tokio::time::sleep(*delay).await;
                }
            }
            self.events.lock().unwrap().push(format!("finish:{text}"));
            if let Some(needle) = &self.fail_on {
                if text.contains(needle.as_str()) {
                    return Err(MagicError::Api {
                        status: 500,
                        message: self
                            .fail_message
                            .clone()
                            .unwrap_or_else(|| format!("failed: {text}")),
                    });
                }
            }
            Ok(format!("result for {text}"))
        }
    }

    #[async_trait]
    impl ImageProvider for RecordingProvider {
        async fn edit(&self, _image: &SourceImage, instruction: &Instruction) -> Result<String> {
            self.answer(Operation::Edit, instruction).await
        }

        async fn analyze(&self, _image: &SourceImage, instruction: &Instruction) -> Result<String> {
            self.answer(Operation::Analyze, instruction).await
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    pub fn sample_image() -> SourceImage {
        SourceImage::new(vec![0x89, 0x50, 0x4E, 0x47], "image/png")
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_tracker_happy_path() {
        let mut tracker: FlowTracker<u32> = FlowTracker::new();
        assert_eq!(tracker.state(), &FlowState::Idle);

        let ticket = tracker.begin();
        assert_eq!(tracker.state(), &FlowState::Validating(ticket));
        tracker.dispatch(ticket);
        assert!(tracker.state().is_busy());
        assert!(tracker.complete(ticket, Ok(7)));
        assert_eq!(tracker.state().success(), Some(&7));
    }

    #[test]
    fn test_tracker_discards_stale_outcome() {
        let mut tracker: FlowTracker<&str> = FlowTracker::new();
        let first = tracker.begin();
        tracker.dispatch(first);
        let second = tracker.begin();
        tracker.dispatch(second);
        assert!(second > first);

        assert!(tracker.complete(second, Ok("new")));
        assert!(!tracker.complete(first, Ok("old")));
        assert_eq!(tracker.state().success(), Some(&"new"));

        // A late failure from the old submission is ignored as well.
        assert!(!tracker.complete(first, Err(MagicError::NoImage)));
        assert_eq!(tracker.state().success(), Some(&"new"));
    }

    #[test]
    fn test_tracker_reset_invalidates_in_flight() {
        let mut tracker: FlowTracker<u8> = FlowTracker::new();
        let ticket = tracker.begin();
        tracker.dispatch(ticket);
        tracker.reset();

        assert!(!tracker.complete(ticket, Ok(1)));
        assert_eq!(tracker.state(), &FlowState::Idle);
    }

    #[test]
    fn test_resubmission_overwrites_failure() {
        let mut tracker: FlowTracker<u8> = FlowTracker::new();
        let ticket = tracker.begin();
        tracker.complete(ticket, Err(MagicError::NoImage));
        assert_eq!(tracker.state().error(), Some("No image found in the response"));

        let ticket = tracker.begin();
        tracker.complete(ticket, Ok(2));
        assert_eq!(tracker.state().success(), Some(&2));
    }

    #[test]
    fn test_failure_without_message_uses_fallback() {
        let empty = || MagicError::Api {
            status: 500,
            message: String::new(),
        };

        let mut tracker: FlowTracker<u8> = FlowTracker::new();
        let ticket = tracker.begin();
        tracker.complete(ticket, Err(empty()));
        assert_eq!(tracker.state().error(), Some(DEFAULT_FAILURE_MESSAGE));

        let mut tracker: FlowTracker<u8> = FlowTracker::with_fallback("Edit failed.");
        let ticket = tracker.begin();
        tracker.complete(ticket, Err(empty()));
        assert_eq!(tracker.state().error(), Some("Edit failed."));
    }

    #[tokio::test]
    async fn test_pair_results_keep_prompt_order() {
        let provider = RecordingProvider {
            slow_on: Some(("first".into(), Duration::from_millis(50))),
            ..RecordingProvider::new()
        };
        let submission = Submission::new(
            Ticket(1),
            Operation::Edit,
            sample_image(),
            Prompts::Pair("first".into(), "second".into()),
        );

        let results = submission.run(&provider).await.unwrap();
        assert_eq!(
            results,
            vec![
                GenerationResult::Image("result for first".into()),
                GenerationResult::Image("result for second".into()),
            ]
        );
        // The second call started, and finished, while the first was still sleeping.
        let second_started = provider.event_index("start:second").unwrap();
        let second_finished = provider.event_index("finish:second").unwrap();
        let first_finished = provider.event_index("finish:first").unwrap();
        assert!(second_started < first_finished);
        assert!(second_finished < first_finished);
    }

    #[tokio::test]
    async fn test_pair_fails_when_either_fails() {
        let provider = RecordingProvider {
            fail_on: Some("second".into()),
            ..RecordingProvider::new()
        };
        let submission = Submission::new(
            Ticket(1),
            Operation::Edit,
            sample_image(),
            Prompts::Pair("first".into(), "second".into()),
        );

        let err = submission.run(&provider).await.unwrap_err();
        assert_eq!(err.to_string(), "API error: 500 - failed: second");
    }
}
