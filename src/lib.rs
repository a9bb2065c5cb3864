// src/lib.rs

//! Property-location matching and deduplication.
//!
//! Two pipelines over one location data model:
//! - `matching`: ranks a candidate pool against a subject property with
//!   multi-factor similarity scoring, behind a bounded TTL result cache.
//! - `grouping`: partitions a property catalog into canonical location
//!   groups, fuzzy-merges near-duplicates and prioritizes the geocoding
//!   queue.
//!
//! Everything is synchronous, in-process and CPU-bound; fetching catalogs
//! and persisting geocoding results belong to the callers.

pub mod config;
pub mod error;
pub mod grouping;
pub mod matching;
pub mod models;

pub use config::{GrouperConfig, MatcherConfig, OptimizerConfig};
pub use error::MatchError;
pub use grouping::{GroupOptimizer, LocationGrouper};
pub use matching::{ComparableMatcher, SimilarityScorer};
