//! Era transformation flow ("time travel").

use super::{prepare_with, single, FlowState, FlowTracker, Prompts, Submission, Ticket};
use crate::error::{MagicError, Result};
use crate::image::{GenerationResult, ImageProvider, Instruction, Operation, SourceImage};
use std::str::FromStr;

const MISSING_IMAGE: &str = "Please upload a photo to begin your journey.";
const FAILED: &str = "An error occurred during time travel.";

/// Destinations offered by the era flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Era {
    /// Ancient Egypt.
    AncientEgypt,
    /// The Roman Empire.
    RomanEmpire,
    /// The age of the Mahabharata.
    Mahabharat,
    /// The age of the Ramayana.
    Ramayan,
    /// The Maurya empire under Chandragupta.
    ChandraguptaMaurya,
    /// Medieval Europe.
    MedievalEurope,
    /// Renaissance Italy.
    Renaissance,
    /// Victorian Britain.
    Victorian,
    /// The American frontier.
    WildWest,
    /// The 1920s.
    Twenties,
    /// The 1950s.
    Fifties,
    /// The 1980s.
    Eighties,
}

impl Era {
    /// Every era, in display order. The first is the default selection.
    pub const ALL: [Era; 12] = [
        Era::AncientEgypt,
        Era::RomanEmpire,
        Era::Mahabharat,
        Era::Ramayan,
        Era::ChandraguptaMaurya,
        Era::MedievalEurope,
        Era::Renaissance,
        Era::Victorian,
        Era::WildWest,
        Era::Twenties,
        Era::Fifties,
        Era::Eighties,
    ];

    /// Display label, also embedded in the prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AncientEgypt => "Ancient Egypt",
            Self::RomanEmpire => "Roman Empire",
            Self::Mahabharat => "Time of Mahabharat",
            Self::Ramayan => "Time of Ramayan",
            Self::ChandraguptaMaurya => "Kingdom of Chandragupta Maurya",
            Self::MedievalEurope => "Medieval Europe",
            Self::Renaissance => "Renaissance Italy",
            Self::Victorian => "Victorian Era",
            Self::WildWest => "Wild West",
            Self::Twenties => "1920s",
            Self::Fifties => "1950s",
            Self::Eighties => "1980s",
        }
    }

    /// Ancient-Indian eras get the painted-manuscript template.
    pub fn is_ancient_indian(&self) -> bool {
        matches!(self, Self::Mahabharat | Self::Ramayan | Self::ChandraguptaMaurya)
    }
}

impl Default for Era {
    fn default() -> Self {
        Self::ALL[0]
    }
}

impl std::fmt::Display for Era {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Era {
    type Err = MagicError;

    /// Matches labels case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|era| era.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MagicError::validation(format!("Unknown era: {wanted}")))
    }
}

/// Builds the transformation instruction for an era.
pub fn era_instruction(era: Era) -> Instruction {
    let label = era.label();
    let text = if era.is_ancient_indian() {
        format!(
            "Recreate this photo, transforming the person and scene into an ancient Indian-style \
             painting or a detailed, aged sketch depicting the '{label}' era. Match the traditional \
             clothing, hairstyles, and environment of that specific period in ancient India. The \
             final image should have an artistic, hand-drawn, or aged manuscript/scroll appearance. \
             Crucially, remove any modern items like eyeglasses, watches, or modern jewelry."
        )
    } else {
        format!(
            "Recreate this photo, transforming the person and scene to look like it was genuinely \
             taken in the '{label}' era. Match the clothing, style, lighting, and photo quality of \
             that time period. Ensure historical accuracy by removing any anachronistic items like \
             modern gadgets, logos, or accessories (for example, modern eyeglasses should be \
             removed for ancient or medieval periods)."
        )
    };
    Instruction::new(text)
}

/// Restyles a photo as if taken in a chosen era.
#[derive(Debug)]
pub struct EraFlow {
    image: Option<SourceImage>,
    era: Era,
    tracker: FlowTracker<GenerationResult>,
}

impl Default for EraFlow {
    fn default() -> Self {
        Self {
            image: None,
            era: Era::default(),
            tracker: FlowTracker::with_fallback(FAILED),
        }
    }
}

impl EraFlow {
    /// Creates a flow with the default era selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the source image and returns to idle.
    pub fn set_image(&mut self, image: SourceImage) {
        self.image = Some(image);
        self.tracker.reset();
    }

    /// Selects an era and returns to idle.
    pub fn select_era(&mut self, era: Era) {
        self.era = era;
        self.tracker.reset();
    }

    /// Currently selected era.
    pub fn era(&self) -> Era {
        self.era
    }

    /// Current state.
    pub fn state(&self) -> &FlowState<GenerationResult> {
        self.tracker.state()
    }

    /// Validates inputs and builds the submission.
    pub fn prepare(&mut self) -> Result<Submission> {
        let image = self.image.clone();
        let era = self.era;
        prepare_with(&mut self.tracker, Operation::Edit, move || {
            let image = image.ok_or_else(|| MagicError::validation(MISSING_IMAGE))?;
            Ok((image, Prompts::Single(era_instruction(era))))
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
