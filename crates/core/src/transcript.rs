//! Conversation transcript types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Agent,
    Patient,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::Agent => write!(f, "agent"),
            TurnRole::Patient => write!(f, "patient"),
        }
    }
}

/// A single conversation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptTurn {
    /// Create a turn stamped with the current time
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered sequence of turns for one call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<TranscriptTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<TranscriptTurn>) -> Self {
        Self { turns }
    }

    pub fn push(&mut self, turn: TranscriptTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[TranscriptTurn] {
        &self.turns
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Flattened, role-prefixed text rendering.
    ///
    /// Used only as an observability attribute, never as the primary store.
    pub fn flatten(&self) -> String {
        let lines: Vec<String> = self
            .turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .collect();
        lines.join("\n")
    }

    /// JSON value written to the record store.
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "turns": self.turns })
    }
}
