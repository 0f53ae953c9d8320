use serde::{Deserialize, Serialize};
use std::fmt;

/// Market capitalization tier of a security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapTier {
    /// Market cap >= $10B
    Large,
    /// Market cap >= $2B
    Mid,
    /// Everything below
    Small,
}

impl CapTier {
    const LARGE_CAP_FLOOR: i64 = 10_000_000_000;
    const MID_CAP_FLOOR: i64 = 2_000_000_000;

    /// Classifies a raw market capitalization (in currency units) into a tier.
    pub fn from_market_cap(market_cap: i64) -> Self {
        if market_cap >= Self::LARGE_CAP_FLOOR {
            CapTier::Large
        } else if market_cap >= Self::MID_CAP_FLOOR {
            CapTier::Mid
        } else {
            CapTier::Small
        }
    }

    /// Storage representation of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            CapTier::Large => "large",
            CapTier::Mid => "mid",
            CapTier::Small => "small",
        }
    }

    /// Parses the storage representation back into a tier.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "large" => Some(CapTier::Large),
            "mid" => Some(CapTier::Mid),
            "small" => Some(CapTier::Small),
            _ => None,
        }
    }
}

impl fmt::Display for CapTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity record for one playable security.
///
/// `masked_name` is what the player sees during the guessing phase; the real
/// `symbol` and `company_name` are only surfaced at reveal. Securities are
/// never hard-deleted: retiring one clears `is_active` so existing scenarios
/// stay resolvable for players mid-game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Security {
    /// Database row id, `None` until persisted
    pub id: Option<i64>,
    /// External ticker symbol, uppercase
    pub symbol: String,
    /// Real company name
    pub company_name: String,
    /// Obfuscated display name, unique across all securities
    pub masked_name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub cap_tier: CapTier,
    pub is_active: bool,
}

impl Security {
    /// Creates a new active security with the given identity fields.
    pub fn new(
        symbol: impl Into<String>,
        company_name: impl Into<String>,
        masked_name: impl Into<String>,
        sector: Option<String>,
        industry: Option<String>,
        cap_tier: CapTier,
    ) -> Self {
        Security {
            id: None,
            symbol: symbol.into().to_uppercase(),
            company_name: company_name.into(),
            masked_name: masked_name.into(),
            sector,
            industry,
            cap_tier,
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_tier_classification() {
        assert_eq!(CapTier::from_market_cap(50_000_000_000), CapTier::Large);
        assert_eq!(CapTier::from_market_cap(10_000_000_000), CapTier::Large);
        assert_eq!(CapTier::from_market_cap(9_999_999_999), CapTier::Mid);
        assert_eq!(CapTier::from_market_cap(2_000_000_000), CapTier::Mid);
        assert_eq!(CapTier::from_market_cap(1_999_999_999), CapTier::Small);
        assert_eq!(CapTier::from_market_cap(0), CapTier::Small);
    }

    #[test]
    fn test_cap_tier_round_trip() {
        for tier in [CapTier::Large, CapTier::Mid, CapTier::Small] {
            assert_eq!(CapTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(CapTier::parse("mega"), None);
    }

    #[test]
    fn test_security_symbol_uppercased() {
        let security = Security::new(
            "aapl",
            "Apple Inc.",
            "Logic Prime",
            Some("Technology".to_string()),
            None,
            CapTier::Large,
        );
        assert_eq!(security.symbol, "AAPL");
        assert!(security.is_active);
        assert_eq!(security.id, None);
    }
}
