// src/grouping/mod.rs
pub mod grouper;
pub mod normalizer;
pub mod optimizer;
pub mod trigram;

// Re-export the grouping pipeline pieces for clean API
pub use grouper::LocationGrouper;
pub use normalizer::{normalize, NormalizedLocation, UNKNOWN_KEY};
pub use optimizer::GroupOptimizer;
pub use trigram::{trigram_similarity, NameSimilarity, TrigramSimilarity};
