// src/matching/mod.rs
pub mod cache;
pub mod comparables;
pub mod similarity;

// Re-export the matching pipeline pieces for clean API
pub use cache::{fingerprint, ResultCache};
pub use comparables::ComparableMatcher;
pub use similarity::{haversine_km, Scorer, SimilarityScorer};
