use chrono::NaiveDate;
use std::fmt;

/// Forward checkpoint offsets, in calendar days from the as-of date.
///
/// The primary checkpoint is the one outcome classification is based on;
/// a scenario cannot be computed without a price at the primary checkpoint.
/// The intermediate checkpoints are optional context for the reveal screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizons {
    /// Offset of the 6-month checkpoint (default: 182 days)
    pub six_months: i64,
    /// Offset of the 12-month checkpoint (default: 365 days)
    pub twelve_months: i64,
    /// Offset of the mandatory primary checkpoint (default: 24 * 30 days)
    pub primary: i64,
}

impl Default for Horizons {
    fn default() -> Self {
        Horizons {
            six_months: 182,
            twelve_months: 365,
            primary: 24 * 30,
        }
    }
}

/// Policy constants for the snapshot pipeline.
///
/// Every threshold and window the pipeline depends on lives here and is
/// passed explicitly into the filter, outcome calculator, and generator.
/// Nothing in the pipeline reads module-level globals, so tests can vary
/// policy without process-wide side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Days between a fiscal period's end and when its financials become
    /// publicly knowable. Models the legal filing deadline. Must be > 0.
    pub filing_lag_days: i64,
    /// Maximum number of trailing statements shown to the player (default: 5)
    pub statement_window: usize,
    /// Minimum eligible statements for a (security, date) pair to be
    /// playable. Below this the pair fails closed (default: 5).
    pub min_statements: usize,
    /// Forward checkpoint offsets
    pub horizons: Horizons,
    /// Primary-horizon return at or above which the outcome is "value"
    /// (default: 0.30)
    pub value_threshold: f64,
    /// Primary-horizon return at or below which the outcome is "trap"
    /// (default: -0.20)
    pub trap_threshold: f64,
    /// Absolute return at or above which the call is "easy" (default: 0.50)
    pub easy_threshold: f64,
    /// Absolute return at or below which the call is "hard" (default: 0.10)
    pub hard_threshold: f64,
    /// Years of price history required before the first candidate as-of date
    /// (default: 5)
    pub min_history_years: i64,
    /// Months of forward price data required after the last candidate as-of
    /// date (default: 24)
    pub forward_months: i64,
    /// Stride between candidate as-of dates, in days (default: 90)
    pub stride_days: i64,
    /// Optional floor on generated as-of dates. Useful when the upstream
    /// source only carries a few years of statement history, so earlier
    /// as-of dates would never have a playable statement window.
    pub earliest_as_of: Option<NaiveDate>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            filing_lag_days: 90,
            statement_window: 5,
            min_statements: 5,
            horizons: Horizons::default(),
            value_threshold: 0.30,
            trap_threshold: -0.20,
            easy_threshold: 0.50,
            hard_threshold: 0.10,
            min_history_years: 5,
            forward_months: 24,
            stride_days: 90,
            earliest_as_of: None,
        }
    }
}

impl PipelineConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the filing lag is zero or negative (a zero lag
    /// would leak not-yet-filed statements into the guessing phase), or if
    /// the stride or statement window is non-positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filing_lag_days <= 0 {
            return Err(ConfigError::NonPositiveFilingLag(self.filing_lag_days));
        }
        if self.stride_days <= 0 {
            return Err(ConfigError::NonPositiveStride(self.stride_days));
        }
        if self.statement_window == 0 {
            return Err(ConfigError::EmptyStatementWindow);
        }
        Ok(())
    }
}

/// Errors produced when validating a pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Filing lag must be strictly positive
    NonPositiveFilingLag(i64),
    /// Candidate stride must be strictly positive
    NonPositiveStride(i64),
    /// Statement window must hold at least one statement
    EmptyStatementWindow,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveFilingLag(days) => {
                write!(f, "Filing lag must be positive, got {} days", days)
            }
            ConfigError::NonPositiveStride(days) => {
                write!(f, "Candidate stride must be positive, got {} days", days)
            }
            ConfigError::EmptyStatementWindow => {
                write!(f, "Statement window must hold at least one statement")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.filing_lag_days, 90);
        assert_eq!(config.statement_window, 5);
        assert_eq!(config.min_statements, 5);
        assert_eq!(config.horizons.primary, 720);
        assert_eq!(config.stride_days, 90);
    }

    #[test]
    fn test_zero_filing_lag_rejected() {
        let config = PipelineConfig {
            filing_lag_days: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::NonPositiveFilingLag(0)
        );
    }

    #[test]
    fn test_negative_filing_lag_rejected() {
        let config = PipelineConfig {
            filing_lag_days: -30,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_stride_rejected() {
        let config = PipelineConfig {
            stride_days: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::NonPositiveStride(0)
        );
    }

    #[test]
    fn test_empty_statement_window_rejected() {
        let config = PipelineConfig {
            statement_window: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::EmptyStatementWindow
        );
    }

    #[test]
    fn test_thresholds_are_overridable() {
        let config = PipelineConfig {
            value_threshold: 0.50,
            trap_threshold: -0.40,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.value_threshold, 0.50);
    }
}
