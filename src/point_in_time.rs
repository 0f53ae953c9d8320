use crate::config::PipelineConfig;
use crate::statement::StatementPeriod;
use chrono::{Duration, NaiveDate};
use std::fmt;

/// The statement window legitimately knowable at one as-of date.
///
/// This is the only type presentation-facing code can obtain statements
/// through: the store exposes no raw all-statements accessor, so every
/// display path provably applies the filing-lag filter. The inner vector is
/// private; callers read through `statements()` or iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct PointInTimeView {
    as_of: NaiveDate,
    statements: Vec<StatementPeriod>,
}

impl PointInTimeView {
    /// Builds the trailing statement window for one as-of date.
    ///
    /// A statement is eligible iff `period_end + filing_lag_days < as_of`.
    /// Eligible statements are ordered ascending by period end and capped to
    /// the most recent `statement_window`.
    ///
    /// # Arguments
    /// * `statements` - Full statement history for the security, any order
    /// * `as_of` - The date the scenario is frozen at
    /// * `config` - Filing lag and window policy
    ///
    /// # Errors
    /// Returns `PointInTimeError::InsufficientHistory` when fewer than
    /// `min_statements` statements are eligible: the (security, as-of) pair
    /// fails closed rather than showing a thin window.
    pub fn build(
        statements: &[StatementPeriod],
        as_of: NaiveDate,
        config: &PipelineConfig,
    ) -> Result<Self, PointInTimeError> {
        let lag = Duration::days(config.filing_lag_days);

        let mut eligible: Vec<StatementPeriod> = statements
            .iter()
            .filter(|s| s.period_end + lag < as_of)
            .cloned()
            .collect();
        eligible.sort_by_key(|s| s.period_end);

        if eligible.len() < config.min_statements {
            return Err(PointInTimeError::InsufficientHistory {
                as_of,
                eligible: eligible.len(),
                required: config.min_statements,
            });
        }

        if eligible.len() > config.statement_window {
            eligible.drain(..eligible.len() - config.statement_window);
        }

        // A view holding a statement knowable only on or after its as-of
        // date is a logic bug, not a recoverable condition.
        debug_assert!(
            eligible.iter().all(|s| s.period_end + lag < as_of),
            "point-in-time violation: statement window leaks past as-of date {}",
            as_of
        );

        Ok(PointInTimeView {
            as_of,
            statements: eligible,
        })
    }

    /// The as-of date this view is frozen at.
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// The eligible statements, ascending by period end.
    pub fn statements(&self) -> &[StatementPeriod] {
        &self.statements
    }

    /// Number of statements in the window.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the window is empty. Cannot occur for views built with a
    /// positive `min_statements`, but required alongside `len`.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StatementPeriod> {
        self.statements.iter()
    }
}

impl<'a> IntoIterator for &'a PointInTimeView {
    type Item = &'a StatementPeriod;
    type IntoIter = std::slice::Iter<'a, StatementPeriod>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

/// Errors produced when building a point-in-time view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointInTimeError {
    /// Too few statements were knowable at the as-of date
    InsufficientHistory {
        as_of: NaiveDate,
        eligible: usize,
        required: usize,
    },
}

impl fmt::Display for PointInTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointInTimeError::InsufficientHistory {
                as_of,
                eligible,
                required,
            } => write!(
                f,
                "Only {} of {} required statements knowable at {}",
                eligible, required, as_of
            ),
        }
    }
}

impl std::error::Error for PointInTimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn year_end_statement(fiscal_year: i32) -> StatementPeriod {
        let period_end = day(fiscal_year, 12, 31);
        StatementPeriod::new(
            fiscal_year,
            period_end,
            period_end + Duration::days(90),
            1000.0 + fiscal_year as f64,
        )
    }

    fn history(years: std::ops::RangeInclusive<i32>) -> Vec<StatementPeriod> {
        years.map(year_end_statement).collect()
    }

    #[test]
    fn test_filing_lag_excludes_recent_period() {
        // period_end 2017-12-31 + 90 days = 2018-03-31, not knowable on
        // 2018-01-01
        let statements = history(2012..=2017);
        let view =
            PointInTimeView::build(&statements, day(2018, 1, 1), &PipelineConfig::default())
                .unwrap();
        assert!(view.statements().iter().all(|s| s.fiscal_year <= 2016));
    }

    #[test]
    fn test_filing_lag_includes_after_availability() {
        let statements = history(2012..=2017);
        let view =
            PointInTimeView::build(&statements, day(2018, 6, 1), &PipelineConfig::default())
                .unwrap();
        assert!(view.statements().iter().any(|s| s.fiscal_year == 2017));
    }

    #[test]
    fn test_availability_boundary_is_strict() {
        // available_from == as_of must still be excluded: strict inequality
        let statements = history(2012..=2017);
        let config = PipelineConfig {
            min_statements: 1,
            ..PipelineConfig::default()
        };
        let view = PointInTimeView::build(&statements, day(2018, 3, 31), &config).unwrap();
        assert!(view.statements().iter().all(|s| s.fiscal_year <= 2016));

        let view = PointInTimeView::build(&statements, day(2018, 4, 1), &config).unwrap();
        assert!(view.statements().iter().any(|s| s.fiscal_year == 2017));
    }

    #[test]
    fn test_window_capped_to_most_recent() {
        let statements = history(2005..=2017);
        let view =
            PointInTimeView::build(&statements, day(2019, 1, 1), &PipelineConfig::default())
                .unwrap();
        assert_eq!(view.len(), 5);
        let years: Vec<i32> = view.iter().map(|s| s.fiscal_year).collect();
        assert_eq!(years, vec![2013, 2014, 2015, 2016, 2017]);
    }

    #[test]
    fn test_output_sorted_ascending() {
        let mut statements = history(2010..=2017);
        statements.reverse();
        let view =
            PointInTimeView::build(&statements, day(2019, 1, 1), &PipelineConfig::default())
                .unwrap();
        let ends: Vec<NaiveDate> = view.iter().map(|s| s.period_end).collect();
        let mut sorted = ends.clone();
        sorted.sort();
        assert_eq!(ends, sorted);
    }

    #[test]
    fn test_insufficient_history_fails_closed() {
        let statements = history(2015..=2017);
        let result =
            PointInTimeView::build(&statements, day(2019, 1, 1), &PipelineConfig::default());
        assert_eq!(
            result.unwrap_err(),
            PointInTimeError::InsufficientHistory {
                as_of: day(2019, 1, 1),
                eligible: 3,
                required: 5,
            }
        );
    }

    #[test]
    fn test_every_statement_respects_invariant() {
        let statements = history(2008..=2020);
        let config = PipelineConfig::default();
        for as_of in [day(2015, 6, 1), day(2018, 2, 14), day(2021, 3, 31)] {
            if let Ok(view) = PointInTimeView::build(&statements, as_of, &config) {
                for statement in &view {
                    assert!(
                        statement.period_end + Duration::days(config.filing_lag_days) < as_of,
                        "statement for FY{} leaked into as-of {}",
                        statement.fiscal_year,
                        as_of
                    );
                }
            }
        }
    }

    #[test]
    fn test_custom_lag_is_honored() {
        let statements = history(2012..=2017);
        let config = PipelineConfig {
            filing_lag_days: 180,
            min_statements: 1,
            ..PipelineConfig::default()
        };
        let view = PointInTimeView::build(&statements, day(2018, 6, 1), &config).unwrap();
        // 2017-12-31 + 180d = 2018-06-29, so FY2017 is still unknowable
        assert!(view.statements().iter().all(|s| s.fiscal_year <= 2016));
    }
}
