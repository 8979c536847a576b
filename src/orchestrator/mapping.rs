//! Translation of stored categories and regions into provider hints

use std::collections::HashMap;

use lazy_static::lazy_static;

lazy_static! {
    /// Stored category name -> provider category
    static ref PROVIDER_CATEGORIES: HashMap<&'static str, &'static str> = HashMap::from([
        ("technology", "technology"),
        ("sports", "sports"),
        ("business", "business"),
        ("health", "health"),
        ("entertainment", "entertainment"),
        ("science", "science"),
    ]);

    /// 3-letter country code -> provider 2-letter code
    static ref PROVIDER_REGIONS: HashMap<&'static str, &'static str> = HashMap::from([
        ("USA", "us"),
        ("GBR", "gb"),
        ("CAN", "ca"),
        ("AUS", "au"),
        ("IND", "in"),
        ("DEU", "de"),
        ("FRA", "fr"),
        ("JPN", "jp"),
        ("BRA", "br"),
        ("CHN", "cn"),
    ]);
}

/// Provider category for a stored category name.
///
/// Names outside the provider's vocabulary (e.g. "politics") give `None`.
pub fn provider_category(name: &str) -> Option<&'static str> {
    PROVIDER_CATEGORIES
        .get(name.trim().to_lowercase().as_str())
        .copied()
}

/// Provider region code for a stored country code.
///
/// Two-letter codes pass through lowercased; three-letter codes go through
/// the table, falling back to their first two letters. Anything else gives
/// `None`.
pub fn provider_region(code: &str) -> Option<String> {
    let code = code.trim();
    if !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    match code.len() {
        2 => Some(code.to_ascii_lowercase()),
        3 => {
            let upper = code.to_ascii_uppercase();
            Some(
                PROVIDER_REGIONS
                    .get(upper.as_str())
                    .map(|c| (*c).to_string())
                    .unwrap_or_else(|| upper[..2].to_ascii_lowercase()),
            )
        }
        _ => None,
    }
}
