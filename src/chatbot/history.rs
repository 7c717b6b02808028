//! Per-user conversation memory.
//!
//! Stores an append-only turn log per user. The stored log is unbounded;
//! only the outbound slice sent to the model is capped. State lives for the
//! process lifetime only - `/reset` is the single way to drop it.

use std::collections::HashMap;

use crate::chatbot::persona::{Persona, PRIMING_ACK};

/// Stored turns are unbounded; at most this many are sent per request,
/// plus the one new turn (so the outbound sequence never exceeds 21).
pub const WINDOW: usize = 20;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// Turn content: plain text, or an inline voice recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPayload {
    Text(String),
    /// Base64-encoded audio with its mime type (Telegram voice is OGG Opus).
    Audio { mime_type: String, data: String },
}

/// One message in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub payload: TurnPayload,
}

impl Turn {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            payload: TurnPayload::Text(text.into()),
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            payload: TurnPayload::Text(text.into()),
        }
    }

    pub fn user_audio(mime_type: impl Into<String>, base64_data: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            payload: TurnPayload::Audio {
                mime_type: mime_type.into(),
                data: base64_data.into(),
            },
        }
    }
}

/// Result of a `/reset` - the two cases get different user-facing replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Cleared,
    AlreadyEmpty,
}

/// In-memory conversation store, keyed by Telegram user ID.
#[derive(Default)]
pub struct ConversationStore {
    histories: HashMap<i64, Vec<Turn>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the outbound sequence for one invocation: the most recent
    /// [`WINDOW`] stored turns followed by `new_turn`.
    ///
    /// Seeds the priming pair (persona instruction + canned acknowledgment)
    /// if this user has no history yet. The new turn is NOT stored here;
    /// call [`commit`](Self::commit) after a successful reply.
    pub fn window(&mut self, user_id: i64, persona: Persona, new_turn: &Turn) -> Vec<Turn> {
        let history = self.histories.entry(user_id).or_insert_with(|| {
            vec![
                Turn::user_text(persona.instruction()),
                Turn::model_text(PRIMING_ACK),
            ]
        });

        let start = history.len().saturating_sub(WINDOW);
        let mut outbound: Vec<Turn> = history[start..].to_vec();
        outbound.push(new_turn.clone());
        outbound
    }

    /// Append the exchanged pair to the stored (unbounded) history.
    pub fn commit(&mut self, user_id: i64, new_turn: Turn, reply_turn: Turn) {
        let history = self.histories.entry(user_id).or_default();
        history.push(new_turn);
        history.push(reply_turn);
    }

    /// Drop all stored state for a user.
    pub fn reset(&mut self, user_id: i64) -> ResetOutcome {
        match self.histories.remove(&user_id) {
            Some(_) => ResetOutcome::Cleared,
            None => ResetOutcome::AlreadyEmpty,
        }
    }

    /// Number of stored turns for a user (0 if unknown).
    pub fn len(&self, user_id: i64) -> usize {
        self.histories.get(&user_id).map_or(0, Vec::len)
    }

    /// Stored turns for a user, oldest first.
    pub fn turns(&self, user_id: i64) -> &[Turn] {
        self.histories.get(&user_id).map_or(&[], Vec::as_slice)
    }
}
