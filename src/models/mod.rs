// src/models/mod.rs
pub mod core;
pub mod criteria;
pub mod grouping;
pub mod scoring;

// Re-export the domain types for clean API
pub use self::core::{Coordinates, ListingType, PropertyId, PropertyRecord, RawProperty};
pub use criteria::SearchCriteria;
pub use grouping::{
    CostAnalysis, GeocodingQueueEntry, GroupTier, GroupingOutcome, GroupingStats, LocationGroup,
    TierBreakdown,
};
pub use scoring::{
    ComparableResult, ComparableSummary, MarketBand, MarketPosition, ScoredComparable,
    SimilarityScore,
};
