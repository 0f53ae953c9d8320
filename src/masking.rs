use rand::Rng;
use std::collections::HashSet;
use uuid::Uuid;

/// Sector-flavored prefixes for masked company names.
fn sector_prefixes(sector: Option<&str>) -> &'static [&'static str] {
    match sector {
        Some("Technology") => &["Tech", "Digital", "Cyber", "Cloud", "Data", "Logic", "Sync", "Net"],
        Some("Healthcare") => &["Med", "Health", "Bio", "Pharma", "Care", "Vital", "Life", "Cure"],
        Some("Consumer Discretionary") => {
            &["Retail", "Consumer", "Lifestyle", "Brand", "Choice", "Style"]
        }
        Some("Financials") => &["Capital", "Finance", "Asset", "Trust", "Wealth", "Fund", "Equity"],
        Some("Energy") => &["Power", "Energy", "Fuel", "Resource", "Solar", "Grid", "Volt"],
        Some("Industrials") => {
            &["Industrial", "Manufacturing", "Engineering", "Build", "Steel", "Forge"]
        }
        Some("Materials") => &["Material", "Chemical", "Mining", "Alloy", "Mineral", "Element"],
        Some("Utilities") => &["Utility", "Grid", "Service", "Power", "Supply", "Electric"],
        Some("Real Estate") => &["Property", "Realty", "Estate", "Land", "Space", "Tower"],
        Some("Communication Services") => {
            &["Media", "Telecom", "Network", "Stream", "Connect", "Signal"]
        }
        Some("Consumer Staples") => &["Staple", "Essential", "Daily", "Basic", "Home", "Fresh"],
        _ => &["Company", "Business", "Enterprise"],
    }
}

const SUFFIXES: &[&str] = &[
    "Alpha", "Beta", "Delta", "Gamma", "Omega", "Prime", "Core", "One", "X", "Plus", "Pro", "Max",
    "Global", "United", "First", "Pacific", "Atlantic", "Apex", "Nova",
];

const GENERICS: &[&str] = &[
    "Corp", "Co", "Inc", "Group", "Holdings", "Enterprises", "Industries", "Solutions",
];

const MAX_ATTEMPTS: usize = 100;

/// Generates a unique masked company name flavored by sector.
///
/// The name must not collide with any name in `used`: the masked name is the
/// player-facing identity, so a duplicate would conflate two securities (the
/// store additionally enforces this with a UNIQUE constraint). After a
/// bounded number of random attempts the generator falls back to
/// uuid-derived names, re-checked against `used` like any other candidate.
pub fn masked_name<R: Rng>(rng: &mut R, sector: Option<&str>, used: &HashSet<String>) -> String {
    let prefixes = sector_prefixes(sector);

    for _ in 0..MAX_ATTEMPTS {
        let prefix = prefixes[rng.gen_range(0..prefixes.len())];
        let suffix = SUFFIXES[rng.gen_range(0..SUFFIXES.len())];
        let generic = GENERICS[rng.gen_range(0..GENERICS.len())];

        let name = match rng.gen_range(0..6) {
            0 => format!("{} {}", prefix, suffix),
            1 => format!("{} {} {}", prefix, suffix, generic),
            2 => format!("The {} {}", prefix, generic),
            3 => format!("{} {}", suffix, prefix),
            4 => format!("{}{}", prefix, suffix),
            _ => format!("{} {}", suffix, generic),
        };

        if !used.contains(&name) {
            return name;
        }
    }

    loop {
        let name = format!(
            "Company {}",
            Uuid::new_v4().simple().to_string()[..8].to_uppercase()
        );
        if !used.contains(&name) {
            return name;
        }
    }
}
