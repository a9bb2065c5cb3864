// src/config.rs
use log::debug;
use std::env;

// Comparable matcher defaults. Cache size and TTL can be overridden via
// environment variables for load testing.
const DEFAULT_MAX_COMPARABLES: usize = 12;
const MIN_COMPARABLE_CAP: usize = 10;
const MAX_COMPARABLE_CAP: usize = 12;
const DEFAULT_CACHE_CAPACITY: usize = 100;
const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;
const DEFAULT_SEARCH_RADIUS_KM: f64 = 5.0;

// Location grouper defaults.
const DEFAULT_TRIGRAM_MERGE_THRESHOLD: f64 = 0.9;
const DEFAULT_LEVENSHTEIN_MAX_DISTANCE: usize = 3;
const DEFAULT_LEVENSHTEIN_MAX_LEN: usize = 15;

// Group optimizer defaults. Unit price is per geocoding request, in USD.
const DEFAULT_FOLD_MIN_MEMBERS: usize = 5;
const DEFAULT_GEOCODE_UNIT_PRICE: f64 = 0.005;

#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Requested number of comparables per search. Clamped to 10..=12 at use.
    pub max_comparables: usize,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
    /// Radius attached to criteria built from a subject property.
    pub default_radius_km: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_comparables: DEFAULT_MAX_COMPARABLES,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            default_radius_km: DEFAULT_SEARCH_RADIUS_KM,
        }
    }
}

impl MatcherConfig {
    /// Create configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.max_comparables = env::var("COMPARABLE_RESULT_CAP")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(config.max_comparables);

        config.cache_capacity = env::var("COMPARABLE_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(config.cache_capacity);

        config.cache_ttl_secs = env::var("COMPARABLE_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(config.cache_ttl_secs);

        debug!(
            "Matcher config: cap={}, cache_capacity={}, cache_ttl_secs={}",
            config.max_comparables, config.cache_capacity, config.cache_ttl_secs
        );

        config
    }

    /// Result cap with the 10..=12 bound applied.
    pub fn comparable_cap(&self) -> usize {
        self.max_comparables
            .clamp(MIN_COMPARABLE_CAP, MAX_COMPARABLE_CAP)
    }
}

#[derive(Debug, Clone)]
pub struct GrouperConfig {
    /// Trigram similarity at or above this merges two buckets.
    pub trigram_merge_threshold: f64,
    /// Levenshtein distance at or below this merges two short names.
    pub levenshtein_max_distance: usize,
    /// Levenshtein trigger only applies to names this long or shorter.
    pub levenshtein_max_len: usize,
}

impl Default for GrouperConfig {
    fn default() -> Self {
        Self {
            trigram_merge_threshold: DEFAULT_TRIGRAM_MERGE_THRESHOLD,
            levenshtein_max_distance: DEFAULT_LEVENSHTEIN_MAX_DISTANCE,
            levenshtein_max_len: DEFAULT_LEVENSHTEIN_MAX_LEN,
        }
    }
}

impl GrouperConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.trigram_merge_threshold = env::var("TRIGRAM_MERGE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(config.trigram_merge_threshold);

        config.levenshtein_max_distance = env::var("LEVENSHTEIN_MAX_DISTANCE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(config.levenshtein_max_distance);

        debug!(
            "Grouper config: trigram_threshold={}, levenshtein_max={}",
            config.trigram_merge_threshold, config.levenshtein_max_distance
        );

        config
    }
}

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// A singleton folds into a same-city group only when the target has
    /// strictly more members than this.
    pub fold_min_members: usize,
    pub geocode_unit_price: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            fold_min_members: DEFAULT_FOLD_MIN_MEMBERS,
            geocode_unit_price: DEFAULT_GEOCODE_UNIT_PRICE,
        }
    }
}

impl OptimizerConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.geocode_unit_price = env::var("GEOCODE_UNIT_PRICE")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(config.geocode_unit_price);

        config
    }
}
