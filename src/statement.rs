use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One fiscal year of normalized financial statement data.
///
/// All monetary fields are in millions of the reporting currency, already
/// normalized by the extractor. `available_from` is the date on which the
/// figures are assumed to be publicly knowable: the period end plus the
/// configured filing lag. The point-in-time filter compares `available_from`
/// against the as-of date, so a statement ingested with the wrong lag can
/// never silently leak into a scenario generated under a different config.
///
/// A statement is immutable once ingested for a given (security, fiscal_year)
/// pair; re-ingestion replaces the whole row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub fiscal_year: i32,
    /// Last day of the fiscal period
    pub period_end: NaiveDate,
    /// First date on which these figures are publicly knowable
    pub available_from: NaiveDate,
    /// Total revenue, in millions. Required: rows without revenue are
    /// dropped during normalization.
    pub revenue: f64,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub ebitda: Option<f64>,
    pub net_income: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash_and_equivalents: Option<f64>,
    pub total_equity: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub capital_expenditures: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub shares_outstanding: Option<f64>,
}

impl StatementPeriod {
    /// Creates a statement with only the required fields populated.
    ///
    /// The optional metrics default to `None`; callers fill in whatever the
    /// upstream source provided.
    pub fn new(
        fiscal_year: i32,
        period_end: NaiveDate,
        available_from: NaiveDate,
        revenue: f64,
    ) -> Self {
        StatementPeriod {
            fiscal_year,
            period_end,
            available_from,
            revenue,
            gross_profit: None,
            operating_income: None,
            ebitda: None,
            net_income: None,
            gross_margin: None,
            operating_margin: None,
            net_margin: None,
            total_assets: None,
            total_debt: None,
            cash_and_equivalents: None,
            total_equity: None,
            operating_cash_flow: None,
            capital_expenditures: None,
            free_cash_flow: None,
            shares_outstanding: None,
        }
    }
}
