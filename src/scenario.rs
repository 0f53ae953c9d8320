use crate::outcome::{Difficulty, Outcome, OutcomeLabel};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One playable (security, as-of date) instance with its precomputed outcome.
///
/// Scenarios are generated in batch from frozen price history and are
/// immutable once stored, except for the play counters, which increment on
/// each reveal, and the narrative, which can be attached later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Database row id, `None` until persisted
    pub id: Option<i64>,
    pub security_id: i64,
    pub as_of: NaiveDate,
    pub price_at_as_of: f64,
    pub price_at_6mo: Option<f64>,
    pub price_at_12mo: Option<f64>,
    pub price_at_24mo: f64,
    pub return_6mo: Option<f64>,
    pub return_12mo: Option<f64>,
    pub return_24mo: f64,
    pub label: OutcomeLabel,
    pub difficulty: Difficulty,
    /// LLM-generated flavor text shown during the guessing phase. Built
    /// externally from the filtered statement window only.
    pub narrative: Option<String>,
    pub times_played: i64,
    pub correct_guesses: i64,
}

impl Scenario {
    /// Wraps a computed outcome into an unpersisted scenario record.
    pub fn from_outcome(security_id: i64, as_of: NaiveDate, outcome: Outcome) -> Self {
        Scenario {
            id: None,
            security_id,
            as_of,
            price_at_as_of: outcome.price_at_as_of,
            price_at_6mo: outcome.price_at_6mo,
            price_at_12mo: outcome.price_at_12mo,
            price_at_24mo: outcome.price_at_24mo,
            return_6mo: outcome.return_6mo,
            return_12mo: outcome.return_12mo,
            return_24mo: outcome.return_24mo,
            label: outcome.label,
            difficulty: outcome.difficulty,
            narrative: None,
            times_played: 0,
            correct_guesses: 0,
        }
    }
}

/// The guess a player commits to before the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerChoice {
    Value,
    Trap,
}

impl PlayerChoice {
    /// Storage representation of the choice.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerChoice::Value => "value",
            PlayerChoice::Trap => "trap",
        }
    }

    /// Parses the storage representation back into a choice.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "value" => Some(PlayerChoice::Value),
            "trap" => Some(PlayerChoice::Trap),
            _ => None,
        }
    }

    /// Whether this choice matches the scenario's actual label.
    pub fn matches(&self, label: OutcomeLabel) -> bool {
        match (self, label) {
            (PlayerChoice::Value, OutcomeLabel::Value) => true,
            (PlayerChoice::Trap, OutcomeLabel::Trap) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PlayerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only telemetry row for one reveal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub session_id: String,
    pub scenario_id: i64,
    pub choice: PlayerChoice,
    pub is_correct: bool,
    pub played_at: DateTime<Utc>,
}
