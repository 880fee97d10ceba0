//! Conversation controller.
//!
//! Reconciles the optimistic transcript with gateway responses. Each
//! submission appends its user turn synchronously, then awaits the
//! gateway without holding any lock, so several submissions can be in
//! flight at once. Bot turns land in completion order and carry
//! `reply_to` so the UI can pair them with their questions.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::event::{ControllerEvent, SubmissionState, SubmitOutcome};
use super::history::HistoryTracker;
use super::transcript::{Speaker, Transcript, Turn, TurnId};
use crate::config::{ClientConfig, DEFAULT_ENTRY_ROUTE, DEFAULT_HISTORY_CAPACITY};
use crate::gateway::QueryGateway;
use crate::session::SessionStore;

const EVENT_BUFFER: usize = 64;

/// Whether the authenticated view may be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAccess {
    Granted,
    /// Navigate to this route instead.
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub history_capacity: usize,
    /// Redirect instead of granting the view when no credential is stored.
    pub require_session: bool,
    pub entry_route: String,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            require_session: false,
            entry_route: DEFAULT_ENTRY_ROUTE.to_string(),
        }
    }
}

impl From<&ClientConfig> for ControllerOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            history_capacity: config.history.capacity,
            require_session: config.session.require_session,
            entry_route: config.session.entry_route.clone(),
        }
    }
}

/// A submitted question whose gateway call has not been applied yet.
///
/// Produced by [`ConversationController::begin`] and consumed by
/// [`ConversationController::resolve`]. Dropping it unresolved, or dropping
/// the `resolve` future mid-call, settles the submission as `Cancelled`.
#[derive(Debug)]
#[must_use]
pub struct PendingQuery {
    turn: TurnId,
    question: String,
    guard: InFlightGuard,
}

impl PendingQuery {
    #[must_use]
    pub fn turn(&self) -> TurnId {
        self.turn
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }
}

#[derive(Debug)]
struct ConversationState {
    transcript: Transcript,
    history: HistoryTracker,
    draft: String,
    in_flight: usize,
}

/// Holds one `in_flight` slot until the submission settles.
#[derive(Debug)]
struct InFlightGuard {
    turn: TurnId,
    state: Arc<RwLock<ConversationState>>,
    events: broadcast::Sender<ControllerEvent>,
    settled: bool,
}

impl InFlightGuard {
    fn settle(mut self, outcome: SubmissionState) {
        self.release(outcome);
    }

    fn release(&mut self, outcome: SubmissionState) {
        if self.settled {
            return;
        }
        self.settled = true;
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        let _ = self.events.send(ControllerEvent::SubmissionStateChanged {
            turn: self.turn,
            state: outcome,
        });
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(
                name: "chat.submit.abandoned",
                turn = %self.turn,
                "Submission dropped before it resolved"
            );
            self.release(SubmissionState::Cancelled);
        }
    }
}

#[derive(Debug)]
pub struct ConversationController {
    gateway: Arc<dyn QueryGateway>,
    session: SessionStore,
    options: ControllerOptions,
    state: Arc<RwLock<ConversationState>>,
    events: broadcast::Sender<ControllerEvent>,
    shutdown: CancellationToken,
}

impl ConversationController {
    pub fn new(gateway: Arc<dyn QueryGateway>, session: SessionStore) -> Self {
        Self::with_options(gateway, session, ControllerOptions::default())
    }

    pub fn with_options(
        gateway: Arc<dyn QueryGateway>,
        session: SessionStore,
        options: ControllerOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        if session.credential().is_none() {
            tracing::debug!(
                name: "chat.session.absent",
                placeholder = %session.identity(),
                "No stored session, using placeholder identity"
            );
        }
        Self {
            gateway,
            session,
            state: Arc::new(RwLock::new(ConversationState {
                transcript: Transcript::new(),
                history: HistoryTracker::with_capacity(options.history_capacity),
                draft: String::new(),
                in_flight: 0,
            })),
            options,
            events,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn from_config(
        config: &ClientConfig,
        gateway: Arc<dyn QueryGateway>,
        session: SessionStore,
    ) -> Self {
        Self::with_options(gateway, session, ControllerOptions::from(config))
    }

    /// Subscribe to controller events.
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ControllerEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ConversationState) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    fn read_state<R>(&self, f: impl FnOnce(&ConversationState) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Submission
    // ─────────────────────────────────────────────────────────────────────

    /// Submit a question and await its resolution.
    ///
    /// Gateway failures are reported in the outcome and as events; they are
    /// never returned as errors.
    pub async fn submit(&self, raw_input: &str) -> SubmitOutcome {
        match self.begin(raw_input) {
            Some(pending) => self.resolve(pending).await,
            None => SubmitOutcome::Skipped,
        }
    }

    /// Submit whatever is in the draft input.
    pub async fn submit_draft(&self) -> SubmitOutcome {
        let draft = self.draft();
        self.submit(&draft).await
    }

    /// Validate and optimistically append the user turn.
    ///
    /// Returns `None` for blank input or after [`shutdown`](Self::shutdown).
    pub fn begin(&self, raw_input: &str) -> Option<PendingQuery> {
        let question = raw_input.trim();
        if question.is_empty() {
            tracing::debug!(name: "chat.submit.skipped", "Ignoring blank submission");
            return None;
        }
        if self.shutdown.is_cancelled() {
            tracing::debug!(name: "chat.submit.rejected", "Controller is shut down");
            return None;
        }

        let turn = self.with_state(|state| {
            state.draft.clear();
            state.in_flight += 1;
            state
                .transcript
                .push(Speaker::User, question.to_string(), None)
                .clone()
        });

        tracing::info!(name: "chat.submit.accepted", turn = %turn.id, "Question submitted");
        let id = turn.id;
        self.emit(ControllerEvent::TurnAppended(turn));
        self.emit(ControllerEvent::SubmissionStateChanged {
            turn: id,
            state: SubmissionState::Submitting,
        });

        Some(PendingQuery {
            turn: id,
            question: question.to_string(),
            guard: InFlightGuard {
                turn: id,
                state: Arc::clone(&self.state),
                events: self.events.clone(),
                settled: false,
            },
        })
    }

    /// Call the gateway for a pending query and apply the result.
    pub async fn resolve(&self, pending: PendingQuery) -> SubmitOutcome {
        let span = tracing::info_span!("chat.submit", turn = %pending.turn);
        self.resolve_inner(pending).instrument(span).await
    }

    async fn resolve_inner(&self, pending: PendingQuery) -> SubmitOutcome {
        let result = tokio::select! {
            () = self.shutdown.cancelled() => None,
            result = self.gateway.ask(&pending.question) => Some(result),
        };

        // Late answers after teardown are discarded.
        if self.shutdown.is_cancelled() {
            tracing::debug!(name: "chat.submit.cancelled", "Discarding response after shutdown");
            pending.guard.settle(SubmissionState::Cancelled);
            return SubmitOutcome::Cancelled {
                question: pending.turn,
            };
        }

        let outcome = match result {
            Some(Ok(answer)) => self.apply_answer(&pending, answer),
            Some(Err(error)) => {
                tracing::warn!(
                    name: "chat.submit.failed",
                    kind = ?error.kind,
                    error = %error,
                    "Gateway call failed"
                );
                self.emit(ControllerEvent::SubmissionFailed {
                    turn: pending.turn,
                    error: error.clone(),
                });
                SubmitOutcome::Failed {
                    question: pending.turn,
                    error,
                }
            }
            None => SubmitOutcome::Cancelled {
                question: pending.turn,
            },
        };

        pending.guard.settle(outcome.state());
        outcome
    }

    fn apply_answer(&self, pending: &PendingQuery, answer: String) -> SubmitOutcome {
        let (reply, history) = self.with_state(|state| {
            let reply = state
                .transcript
                .push(Speaker::Bot, answer, Some(pending.turn))
                .clone();
            state.history.record(pending.question.clone());
            (reply, state.history.list())
        });

        tracing::info!(name: "chat.submit.resolved", answer = %reply.id, "Answer received");

        let answer = reply.id;
        self.emit(ControllerEvent::TurnAppended(reply));
        self.emit(ControllerEvent::HistoryChanged(history));
        SubmitOutcome::Resolved {
            question: pending.turn,
            answer,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Input and read access
    // ─────────────────────────────────────────────────────────────────────

    pub fn set_draft(&self, text: impl Into<String>) {
        let text = text.into();
        self.with_state(|state| state.draft = text);
    }

    #[must_use]
    pub fn draft(&self) -> String {
        self.read_state(|state| state.draft.clone())
    }

    #[must_use]
    pub fn transcript(&self) -> Vec<Turn> {
        self.read_state(|state| state.transcript.snapshot())
    }

    /// User turns still waiting for, or abandoned without, an answer.
    #[must_use]
    pub fn unanswered(&self) -> Vec<TurnId> {
        self.read_state(|state| state.transcript.unanswered())
    }

    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.read_state(|state| state.history.list())
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.read_state(|state| state.in_flight)
    }

    /// `Submitting` while any submission is in flight, else `Idle`.
    #[must_use]
    pub fn phase(&self) -> SubmissionState {
        if self.in_flight() > 0 {
            SubmissionState::Submitting
        } else {
            SubmissionState::Idle
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn current_identity(&self) -> String {
        self.session.identity()
    }

    /// First character of the identity, uppercased.
    #[must_use]
    pub fn avatar_label(&self) -> String {
        self.current_identity()
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn greeting(&self) -> String {
        format!("Welcome, {}", self.current_identity())
    }

    #[must_use]
    pub fn view_access(&self) -> ViewAccess {
        if self.options.require_session && self.session.credential().is_none() {
            ViewAccess::Redirect(self.options.entry_route.clone())
        } else {
            ViewAccess::Granted
        }
    }

    /// Clear the session and tell the UI where to navigate.
    ///
    /// Returns the entry route. No network call is made.
    pub fn logout(&self) -> String {
        self.session.clear();
        let redirect_to = self.options.entry_route.clone();
        tracing::info!(name: "session.logout", redirect_to = %redirect_to, "Logged out");
        self.emit(ControllerEvent::LoggedOut {
            redirect_to: redirect_to.clone(),
        });
        redirect_to
    }

    /// Tear down: in-flight submissions resolve as `Cancelled` and no
    /// further turns are appended.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
