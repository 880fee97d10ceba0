//! Notifications the controller publishes to the UI layer.

use super::transcript::{Turn, TurnId};
use crate::error::GatewayError;

/// Lifecycle of one submission.
///
/// `Idle → Submitting → {Resolved | Failed} → Idle`. `Cancelled` is the
/// terminal state for submissions cut off by teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Resolved,
    Failed,
    Cancelled,
}

impl SubmissionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed | Self::Cancelled)
    }
}

/// Events broadcast by the controller.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// A turn was added to the transcript.
    TurnAppended(Turn),
    /// A submission moved to a new state.
    SubmissionStateChanged { turn: TurnId, state: SubmissionState },
    /// The gateway failed; the user turn stays unanswered.
    SubmissionFailed { turn: TurnId, error: GatewayError },
    /// The recent-question list changed.
    HistoryChanged(Vec<String>),
    /// The session was cleared; the UI should navigate to `redirect_to`.
    LoggedOut { redirect_to: String },
}

/// Result of [`ConversationController::submit`](super::ConversationController::submit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, or the controller was shut down. Nothing changed.
    Skipped,
    Resolved { question: TurnId, answer: TurnId },
    Failed { question: TurnId, error: GatewayError },
    /// Teardown happened before the answer was applied.
    Cancelled { question: TurnId },
}

impl SubmitOutcome {
    /// State the submission ended in.
    #[must_use]
    pub fn state(&self) -> SubmissionState {
        match self {
            Self::Skipped => SubmissionState::Idle,
            Self::Resolved { .. } => SubmissionState::Resolved,
            Self::Failed { .. } => SubmissionState::Failed,
            Self::Cancelled { .. } => SubmissionState::Cancelled,
        }
    }
}
