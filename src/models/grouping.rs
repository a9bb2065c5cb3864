// src/models/grouping.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::core::{PropertyId, PropertyRecord};

/// Most specific location tier a group was keyed on. Declaration order is
/// specificity order, so the derived `Ord` ranks Urbanization highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupTier {
    Urbanization,
    Suburb,
    City,
    Unknown,
}

impl GroupTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupTier::Urbanization => "urbanization",
            GroupTier::Suburb => "suburb",
            GroupTier::City => "city",
            GroupTier::Unknown => "unknown",
        }
    }

    /// Numeric rank, 1 is most specific.
    pub fn rank(&self) -> u8 {
        match self {
            GroupTier::Urbanization => 1,
            GroupTier::Suburb => 2,
            GroupTier::City => 3,
            GroupTier::Unknown => 4,
        }
    }
}

/// A deduplicated location: the set of properties sharing one (possibly
/// fuzzy-merged) place, plus the member chosen to stand for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationGroup {
    /// Canonical bucket key, `urb:<k>||sub:<k>||city:<k>` over the tiers
    /// present, or `unknown`.
    pub key: String,
    pub tier: GroupTier,
    pub member_ids: Vec<PropertyId>,
    /// The most location-complete member; ties keep the first seen.
    pub representative: PropertyRecord,
    /// Keys of buckets fuzzy-merged into this one.
    pub merged_from: Vec<String>,
}

impl LocationGroup {
    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_singleton(&self) -> bool {
        self.member_ids.len() == 1
    }
}

/// Counters for one grouping run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupingStats {
    pub properties_grouped: usize,
    pub buckets_created: usize,
    pub groups_after_merge: usize,
    pub fuzzy_merges: usize,
    /// Name comparisons answered 0.0 because the similarity backend failed.
    pub degraded_comparisons: usize,
    /// Properties with no usable location text at all.
    pub unlocated_properties: usize,
}

/// Groups plus run counters, as returned by one grouping pass.
#[derive(Debug, Clone)]
pub struct GroupingOutcome {
    pub groups: Vec<LocationGroup>,
    pub stats: GroupingStats,
}

/// One geocoding request the optimizer recommends issuing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingQueueEntry {
    pub group_key: String,
    pub member_ids: Vec<PropertyId>,
    /// Human-readable place query built from the representative's raw fields.
    pub query: String,
    /// Higher runs first.
    pub priority: i64,
}

impl GeocodingQueueEntry {
    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }
}

/// Group counts per tier after optimization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierBreakdown {
    pub urbanization: usize,
    pub suburb: usize,
    pub city: usize,
    pub unknown: usize,
}

impl TierBreakdown {
    pub fn record(&mut self, tier: GroupTier) {
        match tier {
            GroupTier::Urbanization => self.urbanization += 1,
            GroupTier::Suburb => self.suburb += 1,
            GroupTier::City => self.city += 1,
            GroupTier::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.urbanization + self.suburb + self.city + self.unknown
    }
}

/// What grouping saves against geocoding every property individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub total_properties: usize,
    pub group_count: usize,
    pub tiers: TierBreakdown,
    pub singletons_folded: usize,
    /// Cost of one geocoding request per property.
    pub original_cost: f64,
    /// Cost of one geocoding request per group.
    pub optimized_cost: f64,
    pub savings: f64,
    pub savings_percent: f64,
}
