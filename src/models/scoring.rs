// src/models/scoring.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::core::PropertyRecord;

/// Component deltas and their percentile transforms for one
/// subject/candidate pair.
///
/// The total score mixes raw units (km, relative fractions, bedroom count)
/// on purpose; it is a ranking key, not a distance in any single unit.
/// Lower total means a closer match. The percentage fields are the
/// human-facing view, each on a 0 to 100 scale where 100 means identical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Kilometers between subject and candidate, or the hierarchy
    /// fallback distance when either side lacks coordinates.
    pub distance_km: f64,
    /// |candidate - subject| / subject over build area.
    pub size_delta: f64,
    /// |candidate - subject| / subject over price.
    pub price_delta: f64,
    /// Absolute bedroom count difference.
    pub bedroom_delta: f64,

    pub distance_percent: f64,
    pub size_percent: f64,
    pub price_percent: f64,
    pub bedroom_percent: f64,
    /// Feature overlap as Jaccard similarity scaled to 0..=100.
    pub feature_percent: f64,
    /// Arithmetic mean of the five component percentages, rounded.
    pub overall_percent: f64,

    /// Weighted composite the ranking sorts on, ascending.
    pub total_score: f64,
}

/// A candidate together with its score against the subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredComparable {
    pub property: PropertyRecord,
    pub score: SimilarityScore,
}

/// Aggregates over the returned comparable set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparableSummary {
    pub count: usize,
    pub avg_price: Option<f64>,
    pub median_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Mean of the comparables' overall match percentages.
    pub avg_match_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketBand {
    BelowMarket,
    AtMarket,
    AboveMarket,
}

impl MarketBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketBand::BelowMarket => "below_market",
            MarketBand::AtMarket => "at_market",
            MarketBand::AboveMarket => "above_market",
        }
    }

    /// Tercile banding over the subject's price percentile.
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile <= 33.0 {
            MarketBand::BelowMarket
        } else if percentile <= 66.0 {
            MarketBand::AtMarket
        } else {
            MarketBand::AboveMarket
        }
    }
}

/// Where the subject's asking price sits inside its comparable set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPosition {
    /// Share of priced comparables at or below the subject's price, 0..=100.
    pub percentile: f64,
    pub band: MarketBand,
}

/// Everything a comparables search returns. This is the value the result
/// cache stores and replays, including its original timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparableResult {
    pub subject_reference: String,
    pub comparables: Vec<ScoredComparable>,
    pub summary: ComparableSummary,
    /// Present only when the subject and at least one comparable are priced.
    pub market_position: Option<MarketPosition>,
    /// Set when the result is empty, explaining why.
    pub message: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl ComparableResult {
    /// An empty result carrying an explanation instead of matches.
    pub fn empty(subject_reference: &str, message: String) -> Self {
        Self {
            subject_reference: subject_reference.to_string(),
            comparables: Vec::new(),
            summary: ComparableSummary::default(),
            market_position: None,
            message: Some(message),
            cached_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.comparables.is_empty()
    }
}
