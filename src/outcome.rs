use crate::config::PipelineConfig;
use crate::price::{price_on_or_after, PricePoint};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a scenario's primary-horizon return.
///
/// `Neutral` scenarios are stored but excluded from the playable pool: there
/// is no satisfying reveal for a stock that went sideways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeLabel {
    /// Primary-horizon return at or above the value threshold
    Value,
    /// Primary-horizon return at or below the trap threshold
    Trap,
    /// Everything in between
    Neutral,
}

impl OutcomeLabel {
    /// Storage representation of the label.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeLabel::Value => "value",
            OutcomeLabel::Trap => "trap",
            OutcomeLabel::Neutral => "neutral",
        }
    }

    /// Parses the storage representation back into a label.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "value" => Some(OutcomeLabel::Value),
            "trap" => Some(OutcomeLabel::Trap),
            "neutral" => Some(OutcomeLabel::Neutral),
            _ => None,
        }
    }

    /// Whether a scenario with this label can be served to players.
    pub fn is_playable(&self) -> bool {
        match self {
            OutcomeLabel::Value | OutcomeLabel::Trap => true,
            OutcomeLabel::Neutral => false,
        }
    }
}

impl fmt::Display for OutcomeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How obvious the outcome is in hindsight, from the magnitude of the
/// primary-horizon return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Extreme move, obvious call
    Easy,
    Medium,
    /// Small move, could have gone either way
    Hard,
}

impl Difficulty {
    /// Storage representation of the difficulty.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parses the storage representation back into a difficulty.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Forward prices, returns, and classification for one as-of date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub price_at_as_of: f64,
    pub price_at_6mo: Option<f64>,
    pub price_at_12mo: Option<f64>,
    pub price_at_24mo: f64,
    pub return_6mo: Option<f64>,
    pub return_12mo: Option<f64>,
    /// Signed ratio at the primary horizon, e.g. -0.77 for a 77% loss
    pub return_24mo: f64,
    pub label: OutcomeLabel,
    pub difficulty: Difficulty,
}

/// Classifies a primary-horizon return as value, trap, or neutral.
pub fn classify_outcome(return_24mo: f64, config: &PipelineConfig) -> OutcomeLabel {
    if return_24mo >= config.value_threshold {
        OutcomeLabel::Value
    } else if return_24mo <= config.trap_threshold {
        OutcomeLabel::Trap
    } else {
        OutcomeLabel::Neutral
    }
}

/// Classifies how obvious a primary-horizon return is.
pub fn classify_difficulty(return_24mo: f64, config: &PipelineConfig) -> Difficulty {
    let magnitude = return_24mo.abs();
    if magnitude >= config.easy_threshold {
        Difficulty::Easy
    } else if magnitude <= config.hard_threshold {
        Difficulty::Hard
    } else {
        Difficulty::Medium
    }
}

/// Computes forward returns and classification for one as-of date.
///
/// The price at a checkpoint is the first bar dated on or after the
/// checkpoint date, so weekends and holidays resolve to the next trading
/// day. A zero or non-finite close is bad upstream data and is treated the
/// same as a missing bar: dividing by it would classify an infinite or NaN
/// return. The 6- and 12-month checkpoints may be absent; a missing as-of
/// price or missing primary checkpoint makes the whole computation
/// not-computable.
///
/// # Arguments
/// * `prices` - Price series sorted ascending by date
/// * `as_of` - The candidate as-of date
/// * `config` - Horizon offsets and classification thresholds
///
/// # Returns
/// Returns `Some(Outcome)` when the as-of and primary-horizon prices exist
/// and are positive, `None` otherwise.
pub fn compute_outcome(
    prices: &[PricePoint],
    as_of: NaiveDate,
    config: &PipelineConfig,
) -> Option<Outcome> {
    let checkpoint = |offset: i64| {
        price_on_or_after(prices, as_of + Duration::days(offset))
            .filter(|p| p.is_finite() && *p > 0.0)
    };

    let price_at_as_of =
        price_on_or_after(prices, as_of).filter(|p| p.is_finite() && *p > 0.0)?;
    let price_at_24mo = checkpoint(config.horizons.primary)?;
    let price_at_6mo = checkpoint(config.horizons.six_months);
    let price_at_12mo = checkpoint(config.horizons.twelve_months);

    let return_24mo = price_at_24mo / price_at_as_of - 1.0;

    Some(Outcome {
        price_at_as_of,
        price_at_6mo,
        price_at_12mo,
        price_at_24mo,
        return_6mo: price_at_6mo.map(|p| p / price_at_as_of - 1.0),
        return_12mo: price_at_12mo.map(|p| p / price_at_as_of - 1.0),
        return_24mo,
        label: classify_outcome(return_24mo, config),
        difficulty: classify_difficulty(return_24mo, config),
    })
}
