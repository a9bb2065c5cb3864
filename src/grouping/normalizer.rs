// src/grouping/normalizer.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::models::core::PropertyRecord;
use crate::models::grouping::GroupTier;

/// Bucket key for records with no usable location text.
pub const UNKNOWN_KEY: &str = "unknown";

/// Determiners and conjunctions dropped from location names. The catalogs
/// mix Spanish and English spellings of the same places.
pub const STOPWORDS: [&str; 22] = [
    "el", "la", "los", "las", "un", "una", "de", "del", "al", "y", "e", "o", "u", "en",
    "the", "a", "an", "of", "and", "or", "in", "on",
];

static STOPWORD_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| STOPWORDS.iter().copied().collect());

// Everything that is not a letter (accents included), digit, hyphen or
// whitespace. Replaced with a space rather than removed, so "golf(east)"
// splits into two tokens instead of fusing.
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s-]").unwrap());

/// Canonicalize one location name: lowercase, keep letters (accents
/// included), digits and hyphens, drop stopwords, collapse whitespace.
/// Empty input or pure-noise input yields the empty string.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let cleaned = PUNCTUATION.replace_all(&lowered, " ");

    cleaned
        .split_whitespace()
        .filter(|token| !STOPWORD_SET.contains(*token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A record's three hierarchy tiers after normalization, blank tiers dropped.
/// Precomputed once per record so bucketing, tier assignment and the scorer's
/// hierarchy fallback all read the same view.
#[derive(Debug, Clone)]
pub struct NormalizedLocation {
    pub urbanization: Option<String>,
    pub suburb: Option<String>,
    pub city: Option<String>,
}

impl NormalizedLocation {
    pub fn of(record: &PropertyRecord) -> Self {
        Self {
            urbanization: normalize_tier(&record.urbanization),
            suburb: normalize_tier(&record.suburb),
            city: normalize_tier(&record.city),
        }
    }

    /// Canonical bucket key: non-empty tiers joined most specific first,
    /// `urb:<k>||sub:<k>||city:<k>`. All tiers empty yields the unknown key.
    pub fn bucket_key(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(3);
        if let Some(urb) = &self.urbanization {
            parts.push(format!("urb:{}", urb));
        }
        if let Some(sub) = &self.suburb {
            parts.push(format!("sub:{}", sub));
        }
        if let Some(city) = &self.city {
            parts.push(format!("city:{}", city));
        }
        if parts.is_empty() {
            UNKNOWN_KEY.to_string()
        } else {
            parts.join("||")
        }
    }

    /// Highest-specificity tier present.
    pub fn tier(&self) -> GroupTier {
        if self.urbanization.is_some() {
            GroupTier::Urbanization
        } else if self.suburb.is_some() {
            GroupTier::Suburb
        } else if self.city.is_some() {
            GroupTier::City
        } else {
            GroupTier::Unknown
        }
    }

    /// Normalized name of the tier this location is keyed on, used for
    /// fuzzy bucket comparison. Empty for unknown locations.
    pub fn primary_name(&self) -> &str {
        self.urbanization
            .as_deref()
            .or(self.suburb.as_deref())
            .or(self.city.as_deref())
            .unwrap_or("")
    }
}

/// Normalize an optional tier, mapping blank or noise-only text to missing.
fn normalize_tier(field: &Option<String>) -> Option<String> {
    field.as_deref().map(normalize).filter(|k| !k.is_empty())
}
