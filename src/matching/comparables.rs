// src/matching/comparables.rs

//! Comparable-property search: scores a candidate pool against a subject,
//! ranks it, caps it and serves repeats from the result cache.

use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::config::MatcherConfig;
use crate::matching::cache::{fingerprint, ResultCache};
use crate::matching::similarity::{Scorer, SimilarityScorer};
use crate::models::core::{PropertyId, PropertyRecord};
use crate::models::criteria::SearchCriteria;
use crate::models::scoring::{
    ComparableResult, ComparableSummary, MarketBand, MarketPosition, ScoredComparable,
};

/// Finds comparables for a subject property. Owns the result cache; create
/// one matcher per session scope and share it, the cache is thread-safe.
///
/// The search never returns an error: invalid criteria and wholesale
/// scoring failure both surface as an empty result with a message.
pub struct ComparableMatcher {
    config: MatcherConfig,
    scorer: Arc<dyn Scorer>,
    cache: ResultCache,
}

impl ComparableMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self::with_scorer(config, Arc::new(SimilarityScorer))
    }

    /// Use an injected scorer instead of the default. Tests pass counting
    /// or failing stubs through here.
    pub fn with_scorer(config: MatcherConfig, scorer: Arc<dyn Scorer>) -> Self {
        let cache = ResultCache::new(
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        );
        Self {
            config,
            scorer,
            cache,
        }
    }

    /// Rank `candidates` against `subject` and return the best matches.
    /// A repeat search with the same fingerprint inside the TTL window
    /// replays the cached result without rescoring.
    pub fn find_comparables(
        &self,
        session_id: &str,
        subject: &PropertyRecord,
        candidates: &[PropertyRecord],
    ) -> ComparableResult {
        let criteria = SearchCriteria::from_property(subject, self.config.default_radius_km);
        if let Err(reason) = criteria.validate() {
            warn!(
                "Comparable search for {} rejected: {}",
                criteria.reference, reason
            );
            return ComparableResult::empty(&criteria.reference, reason.to_string());
        }

        let key = fingerprint(session_id, &criteria);
        self.cache
            .get_or_compute(&key, || self.score_pool(&criteria, &subject.id, candidates))
    }

    fn score_pool(
        &self,
        criteria: &SearchCriteria,
        subject_id: &PropertyId,
        candidates: &[PropertyRecord],
    ) -> ComparableResult {
        let pool: Vec<&PropertyRecord> =
            candidates.iter().filter(|c| &c.id != subject_id).collect();
        if pool.is_empty() {
            return ComparableResult::empty(
                &criteria.reference,
                "no candidate properties in the search pool".to_string(),
            );
        }

        let mut faults = 0usize;
        let mut scored: Vec<ScoredComparable> = Vec::with_capacity(pool.len());
        for candidate in &pool {
            match self.scorer.score(criteria, candidate) {
                Ok(score) => scored.push(ScoredComparable {
                    property: (*candidate).clone(),
                    score,
                }),
                Err(e) => {
                    faults += 1;
                    warn!("Skipping candidate {}: scoring failed: {}", candidate.id, e);
                }
            }
        }

        if scored.is_empty() {
            return ComparableResult::empty(
                &criteria.reference,
                format!("scoring failed for all {} candidates", faults),
            );
        }

        // Ascending total score; candidate id breaks ties so reruns over
        // the same pool rank identically.
        scored.sort_by(|a, b| {
            a.score
                .total_score
                .partial_cmp(&b.score.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.property.id.cmp(&b.property.id))
        });
        scored.truncate(self.config.comparable_cap());

        let summary = summarize(&scored);
        let market_position = market_position(criteria.price, &scored);

        info!(
            "🏠 Comparables for {}: {} of {} candidates retained ({} scoring faults), avg match {:.0}%",
            criteria.reference,
            scored.len(),
            pool.len(),
            faults,
            summary.avg_match_percent
        );

        ComparableResult {
            subject_reference: criteria.reference.clone(),
            comparables: scored,
            summary,
            market_position,
            message: None,
            cached_at: Utc::now(),
        }
    }

    /// (hits, misses, expirations) of the underlying result cache.
    pub fn cache_stats(&self) -> (usize, usize, usize) {
        self.cache.stats()
    }
}

fn summarize(comparables: &[ScoredComparable]) -> ComparableSummary {
    let mut prices: Vec<f64> = comparables
        .iter()
        .filter_map(|c| c.property.price)
        .collect();
    prices.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let (avg_price, median_price, min_price, max_price) = if prices.is_empty() {
        (None, None, None, None)
    } else {
        let avg = prices.iter().sum::<f64>() / prices.len() as f64;
        let mid = prices.len() / 2;
        let median = if prices.len() % 2 == 0 {
            (prices[mid - 1] + prices[mid]) / 2.0
        } else {
            prices[mid]
        };
        (
            Some(avg),
            Some(median),
            Some(prices[0]),
            Some(prices[prices.len() - 1]),
        )
    };

    let avg_match_percent = if comparables.is_empty() {
        0.0
    } else {
        comparables
            .iter()
            .map(|c| c.score.overall_percent)
            .sum::<f64>()
            / comparables.len() as f64
    };

    ComparableSummary {
        count: comparables.len(),
        avg_price,
        median_price,
        min_price,
        max_price,
        avg_match_percent,
    }
}

/// Percentile of the subject price inside the priced comparables: the share
/// priced at or below the subject, rounded. None when either side is
/// unpriced.
fn market_position(
    subject_price: Option<f64>,
    comparables: &[ScoredComparable],
) -> Option<MarketPosition> {
    let subject_price = subject_price?;
    let priced: Vec<f64> = comparables
        .iter()
        .filter_map(|c| c.property.price)
        .collect();
    if priced.is_empty() {
        debug!("No priced comparables, market position unavailable");
        return None;
    }

    let at_or_below = priced.iter().filter(|&&p| p <= subject_price).count();
    let percentile = (at_or_below as f64 / priced.len() as f64 * 100.0).round();
    Some(MarketPosition {
        percentile,
        band: MarketBand::from_percentile(percentile),
    })
}
