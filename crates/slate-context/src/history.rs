//! The ordered turn history fed to each inference call.

use serde::{Deserialize, Serialize};
use slate_media::VisualObservation;

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Payload of a single turn: plain text or one-or-more captured frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnContent {
    Text(String),
    Frames(Vec<VisualObservation>),
}

/// One role-tagged entry in the dialogue. Immutable once appended; removed
/// only by bulk eviction during truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

impl Turn {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn frames(frames: Vec<VisualObservation>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Frames(frames),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

/// Ordered sequence of turns, insertion order significant.
///
/// Constructed around a system prompt that is pinned at position 0 for the
/// life of the history. Each conversation session owns exactly one
/// `ChatHistory`; mutation happens through `&mut` access, so the
/// single-writer rule is enforced by the borrow checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistory {
    turns: Vec<Turn>,
}

impl ChatHistory {
    /// Creates a history seeded with the given system prompt.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::text(Role::System, prompt)],
        }
    }

    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::text(Role::User, text));
    }

    pub fn push_assistant_text(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::text(Role::Assistant, text));
    }

    /// Appends a user turn carrying captured frames.
    pub fn push_frames(&mut self, frames: Vec<VisualObservation>) {
        self.turns.push(Turn::frames(frames));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of turns excluding the pinned system prompt.
    pub fn non_system_len(&self) -> usize {
        self.turns.iter().filter(|t| !t.is_system()).count()
    }

    /// Evicts the oldest non-system turns until at most `max_turns` remain.
    ///
    /// The system turn at position 0 is always preserved. Surviving turns
    /// keep their original relative order.
    pub fn truncate_to(&mut self, max_turns: usize) {
        let non_system = self.non_system_len();
        if non_system <= max_turns {
            return;
        }
        let evict = non_system - max_turns;
        // Non-system turns start at index 1: the system prompt is pinned at 0
        // and never appended again.
        self.turns.drain(1..1 + evict);
    }
}
