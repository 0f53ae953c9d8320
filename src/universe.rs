//! Default symbol universe for seeding.

/// Large-cap sample used when no explicit symbol list is provided.
///
/// Symbols use the upstream source's convention (dots replaced by hyphens,
/// e.g. BRK.B is "BRK-B").
pub const DEFAULT_UNIVERSE: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA", "BRK-B", "UNH", "JNJ", "JPM", "V",
    "PG", "XOM", "HD", "CVX", "MA", "ABBV", "MRK", "LLY", "PEP", "KO", "COST", "AVGO", "TMO",
    "WMT", "MCD", "CSCO", "ACN", "ABT", "DHR", "VZ", "NEE", "ADBE", "CMCSA", "TXN", "PM", "NKE",
    "WFC", "BMY", "UPS", "RTX", "ORCL", "HON", "QCOM", "COP", "LOW", "SPGI", "MS", "BA",
];
