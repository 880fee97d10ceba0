//! Ordered record of conversation turns.

use serde::Serialize;

/// Position of a turn in its transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TurnId(usize);

impl TurnId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

/// One utterance. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub id: TurnId,
    pub speaker: Speaker,
    pub text: String,
    /// For bot turns, the user turn being answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<TurnId>,
}

/// Append-only sequence of turns.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn and return its id.
    pub fn append_user(&mut self, text: impl Into<String>) -> TurnId {
        self.push(Speaker::User, text.into(), None).id
    }

    /// Append an uncorrelated bot turn at the current end.
    pub fn append_bot(&mut self, text: impl Into<String>) -> TurnId {
        self.push(Speaker::Bot, text.into(), None).id
    }

    /// Append a bot turn answering `question`.
    pub fn append_reply(&mut self, question: TurnId, text: impl Into<String>) -> TurnId {
        self.push(Speaker::Bot, text.into(), Some(question)).id
    }

    pub(crate) fn push(
        &mut self,
        speaker: Speaker,
        text: String,
        reply_to: Option<TurnId>,
    ) -> &Turn {
        let id = TurnId(self.turns.len());
        self.turns.push(Turn {
            id,
            speaker,
            text,
            reply_to,
        });
        &self.turns[id.0]
    }

    #[must_use]
    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.get(id.0)
    }

    /// All turns in append order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// User turns that have no correlated bot reply yet.
    ///
    /// Covers both in-flight and failed submissions.
    #[must_use]
    pub fn unanswered(&self) -> Vec<TurnId> {
        self.turns
            .iter()
            .filter(|t| t.speaker == Speaker::User)
            .filter(|t| {
                !self
                    .turns
                    .iter()
                    .any(|other| other.reply_to == Some(t.id))
            })
            .map(|t| t.id)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_order_preserved() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());

        let q = transcript.append_user("What is 2+2?");
        let a = transcript.append_reply(q, "4");

        let turns = transcript.snapshot();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker, Speaker::User);
        assert_eq!(turns[0].text, "What is 2+2?");
        assert_eq!(turns[1].speaker, Speaker::Bot);
        assert_eq!(turns[1].reply_to, Some(q));
        assert_eq!(transcript.get(a).unwrap().text, "4");
    }

    #[test]
    fn test_ids_are_positions() {
        let mut transcript = Transcript::new();
        let a = transcript.append_user("a");
        let b = transcript.append_bot("b");
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert!(transcript.get(b).unwrap().reply_to.is_none());
    }

    #[test]
    fn test_unanswered_tracks_pending_turns() {
        let mut transcript = Transcript::new();
        let q1 = transcript.append_user("first");
        let q2 = transcript.append_user("second");
        assert_eq!(transcript.unanswered(), vec![q1, q2]);

        transcript.append_reply(q2, "answer two");
        assert_eq!(transcript.unanswered(), vec![q1]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut transcript = Transcript::new();
        transcript.append_user("one");
        let snap = transcript.snapshot();
        transcript.append_user("two");
        assert_eq!(snap.len(), 1);
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_turn_serializes_lowercase_speaker() {
        let mut transcript = Transcript::new();
        let q = transcript.append_user("hi");
        transcript.append_reply(q, "hello");

        let json = serde_json::to_value(transcript.turns()).unwrap();
        assert_eq!(json[0]["speaker"], "user");
        assert!(json[0].get("reply_to").is_none());
        assert_eq!(json[1]["speaker"], "bot");
        assert_eq!(json[1]["reply_to"], 0);
    }
}
