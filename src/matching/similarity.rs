// src/matching/similarity.rs

//! Multi-factor similarity between a search subject and one candidate:
//! geospatial distance (or a hierarchy fallback when coordinates are
//! missing), relative size and price deltas, bedroom difference and
//! feature-tag overlap.

use anyhow::{bail, Result};
use std::collections::HashSet;

use crate::grouping::normalizer::normalize;
use crate::models::core::{Coordinates, PropertyRecord};
use crate::models::criteria::SearchCriteria;
use crate::models::scoring::SimilarityScore;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

// Kilometer-equivalents when either side lacks coordinates: the deeper the
// hierarchy match, the closer the pair is assumed to be. Never infinite so
// the composite stays comparable across candidates.
const URBANIZATION_FALLBACK_KM: f64 = 1.0;
const SUBURB_FALLBACK_KM: f64 = 5.0;
const CITY_FALLBACK_KM: f64 = 15.0;
const NO_MATCH_FALLBACK_KM: f64 = 50.0;

// Composite weights. Distance is in kilometers while the deltas are
// fractions, so the terms are deliberately not on one scale; the composite
// is a ranking key only. Changing these reorders existing rankings.
const DISTANCE_WEIGHT: f64 = 0.4;
const SIZE_WEIGHT: f64 = 0.3;
const PRICE_WEIGHT: f64 = 0.2;
const BEDROOM_WEIGHT: f64 = 0.1;

/// Scores one candidate against the search subject. The matcher only
/// depends on this seam, so tests can count or fail scoring calls.
pub trait Scorer: Send + Sync {
    fn score(&self, subject: &SearchCriteria, candidate: &PropertyRecord)
        -> Result<SimilarityScore>;
}

/// The production scorer. Stateless; all branches are total over missing
/// fields, so errors only arise from non-finite input values.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimilarityScorer;

impl Scorer for SimilarityScorer {
    fn score(
        &self,
        subject: &SearchCriteria,
        candidate: &PropertyRecord,
    ) -> Result<SimilarityScore> {
        let distance_km = match (subject.coordinates, candidate.coordinates) {
            (Some(s), Some(c)) => haversine_km(&s, &c),
            _ => hierarchy_fallback_km(subject, candidate),
        };

        let size_delta = relative_delta(subject.build_area, candidate.build_area);
        let price_delta = relative_delta(subject.price, candidate.price);
        let bedroom_delta = match (subject.bedrooms, candidate.bedrooms) {
            (Some(s), Some(c)) => s.abs_diff(c) as f64,
            _ => 0.0,
        };
        let feature_percent = feature_similarity(&subject.features, &candidate.features);

        let total_score = DISTANCE_WEIGHT * distance_km
            + SIZE_WEIGHT * size_delta
            + PRICE_WEIGHT * price_delta
            + BEDROOM_WEIGHT * bedroom_delta;

        if !total_score.is_finite() {
            bail!(
                "non-finite total score for candidate {} (distance={}, size={}, price={}, bedrooms={})",
                candidate.id,
                distance_km,
                size_delta,
                price_delta,
                bedroom_delta
            );
        }

        let distance_percent = percentile(distance_km);
        let size_percent = percentile(size_delta);
        let price_percent = percentile(price_delta);
        let bedroom_percent = if bedroom_delta == 0.0 {
            100.0
        } else {
            percentile(bedroom_delta)
        };
        let overall_percent = ((distance_percent
            + size_percent
            + price_percent
            + bedroom_percent
            + feature_percent)
            / 5.0)
            .round();

        Ok(SimilarityScore {
            distance_km,
            size_delta,
            price_delta,
            bedroom_delta,
            distance_percent,
            size_percent,
            price_percent,
            bedroom_percent,
            feature_percent,
            overall_percent,
            total_score,
        })
    }
}

/// Great-circle distance in kilometers.
pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

fn hierarchy_fallback_km(subject: &SearchCriteria, candidate: &PropertyRecord) -> f64 {
    if tier_matches(&subject.urbanization, &candidate.urbanization) {
        URBANIZATION_FALLBACK_KM
    } else if tier_matches(&subject.suburb, &candidate.suburb) {
        SUBURB_FALLBACK_KM
    } else if tier_matches(&subject.city, &candidate.city) {
        CITY_FALLBACK_KM
    } else {
        NO_MATCH_FALLBACK_KM
    }
}

/// Exact match on the normalized tier names; blank tiers never match.
fn tier_matches(subject: &Option<String>, candidate: &Option<String>) -> bool {
    let s = subject.as_deref().map(normalize).unwrap_or_default();
    let c = candidate.as_deref().map(normalize).unwrap_or_default();
    !s.is_empty() && s == c
}

/// |candidate - subject| / subject, or 0 when either side is missing or the
/// subject value cannot anchor a ratio.
fn relative_delta(subject: Option<f64>, candidate: Option<f64>) -> f64 {
    match (subject, candidate) {
        (Some(s), Some(c)) if s > 0.0 => (c - s).abs() / s,
        _ => 0.0,
    }
}

/// Jaccard overlap of case-folded feature tags, scaled to 0..=100. Two
/// empty sets are identical absence, one-sided absence is no overlap.
pub fn feature_similarity(subject: &[String], candidate: &[String]) -> f64 {
    let subject_set = fold_tags(subject);
    let candidate_set = fold_tags(candidate);

    if subject_set.is_empty() && candidate_set.is_empty() {
        return 100.0;
    }
    if subject_set.is_empty() || candidate_set.is_empty() {
        return 0.0;
    }

    let intersection = subject_set.intersection(&candidate_set).count();
    let union = subject_set.len() + candidate_set.len() - intersection;
    (intersection as f64 / union as f64) * 100.0
}

fn fold_tags(tags: &[String]) -> HashSet<String> {
    tags.iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// `round(100 / (1 + value))`: zero difference reads 100, large differences
/// approach 0.
fn percentile(value: f64) -> f64 {
    (100.0 / (1.0 + value)).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::{ListingType, PropertyId};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn candidate(id: &str) -> PropertyRecord {
        PropertyRecord {
            id: PropertyId(id.to_string()),
            reference: id.to_string(),
            urbanization: None,
            suburb: None,
            city: None,
            street_address: None,
            coordinates: None,
            build_area: None,
            plot_area: None,
            bedrooms: None,
            bathrooms: None,
            price: None,
            property_type: Some("apartment".to_string()),
            features: Vec::new(),
            listing_type: ListingType::Sale,
        }
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            reference: "R-1".to_string(),
            property_type: Some("apartment".to_string()),
            coordinates: None,
            urbanization: None,
            suburb: None,
            city: None,
            build_area: None,
            bedrooms: None,
            price: None,
            features: Vec::new(),
            listing_type: ListingType::Sale,
            radius_km: 5.0,
        }
    }

    #[test]
    fn test_haversine_identity_is_zero() {
        let p = Coordinates { latitude: 36.51, longitude: -4.88 };
        assert!(haversine_km(&p, &p).abs() < 1e-12);
    }

    #[test]
    fn test_haversine_symmetric_and_positive() {
        let marbella = Coordinates { latitude: 36.51, longitude: -4.88 };
        let malaga = Coordinates { latitude: 36.72, longitude: -4.42 };

        let there = haversine_km(&marbella, &malaga);
        let back = haversine_km(&malaga, &marbella);

        assert!(there > 0.0);
        assert!((there - back).abs() < 1e-9);
        // Marbella to Málaga is roughly 47 km as the crow flies.
        assert!(there > 40.0 && there < 55.0, "got {} km", there);
    }

    #[test]
    fn test_hierarchy_fallback_when_coordinates_missing() {
        let mut subject = criteria();
        subject.coordinates = Some(Coordinates { latitude: 36.50, longitude: -4.88 });
        subject.urbanization = Some("Nueva Andalucía".to_string());
        subject.price = Some(500_000.0);

        // Candidate in the same urbanization but without coordinates.
        let mut c = candidate("c1");
        c.urbanization = Some("nueva andalucía".to_string());

        let score = SimilarityScorer.score(&subject, &c).unwrap();
        assert!((score.distance_km - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hierarchy_fallback_tiers() {
        let mut subject = criteria();
        subject.urbanization = Some("Los Naranjos".to_string());
        subject.suburb = Some("Golf Valley".to_string());
        subject.city = Some("Marbella".to_string());
        subject.price = Some(100.0);

        let mut suburb_match = candidate("c1");
        suburb_match.suburb = Some("golf valley".to_string());
        let score = SimilarityScorer.score(&subject, &suburb_match).unwrap();
        assert!((score.distance_km - 5.0).abs() < f64::EPSILON);

        let mut city_match = candidate("c2");
        city_match.city = Some("MARBELLA".to_string());
        let score = SimilarityScorer.score(&subject, &city_match).unwrap();
        assert!((score.distance_km - 15.0).abs() < f64::EPSILON);

        let stranger = candidate("c3");
        let score = SimilarityScorer.score(&subject, &stranger).unwrap();
        assert!((score.distance_km - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_blank_tiers_never_match() {
        let mut subject = criteria();
        subject.urbanization = Some("   ".to_string());
        subject.city = Some("Marbella".to_string());

        let mut c = candidate("c1");
        c.urbanization = Some("  ".to_string());
        c.city = Some("Estepona".to_string());

        let score = SimilarityScorer.score(&subject, &c).unwrap();
        assert!((score.distance_km - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_identical_size_and_price_score_full() {
        // Same price and build area: the total collapses to the distance term.
        let mut subject = criteria();
        subject.coordinates = Some(Coordinates { latitude: 36.50, longitude: -4.88 });
        subject.build_area = Some(100.0);
        subject.price = Some(500_000.0);
        subject.bedrooms = Some(3);

        let mut c = candidate("c1");
        c.coordinates = Some(Coordinates { latitude: 36.52, longitude: -4.90 });
        c.build_area = Some(100.0);
        c.price = Some(500_000.0);
        c.bedrooms = Some(3);

        let score = SimilarityScorer.score(&subject, &c).unwrap();
        assert!((score.size_percent - 100.0).abs() < f64::EPSILON);
        assert!((score.price_percent - 100.0).abs() < f64::EPSILON);
        assert!((score.bedroom_percent - 100.0).abs() < f64::EPSILON);
        assert!((score.total_score - 0.4 * score.distance_km).abs() < 1e-9);
    }

    #[test]
    fn test_relative_deltas() {
        let mut subject = criteria();
        subject.city = Some("Marbella".to_string());
        subject.build_area = Some(100.0);
        subject.price = Some(400_000.0);

        let mut c = candidate("c1");
        c.build_area = Some(150.0);
        c.price = Some(300_000.0);

        let score = SimilarityScorer.score(&subject, &c).unwrap();
        assert!((score.size_delta - 0.5).abs() < 1e-9);
        assert!((score.price_delta - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_missing_attributes_contribute_zero() {
        let mut subject = criteria();
        subject.city = Some("Marbella".to_string());
        subject.price = Some(400_000.0);

        let c = candidate("c1");
        let score = SimilarityScorer.score(&subject, &c).unwrap();
        assert_eq!(score.size_delta, 0.0);
        assert_eq!(score.price_delta, 0.0);
        assert_eq!(score.bedroom_delta, 0.0);
        // Only the no-match hierarchy distance remains.
        assert!((score.total_score - 0.4 * 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_feature_jaccard_edges() {
        assert_eq!(feature_similarity(&[], &[]), 100.0);
        assert_eq!(
            feature_similarity(&[], &["pool".to_string()]),
            0.0
        );
        assert_eq!(
            feature_similarity(&["pool".to_string()], &[]),
            0.0
        );

        let tags = vec!["Pool".to_string(), "garden".to_string()];
        assert_eq!(feature_similarity(&tags, &tags), 100.0);

        // Case-folded comparison.
        let upper = vec!["POOL".to_string()];
        let lower = vec!["pool".to_string()];
        assert_eq!(feature_similarity(&upper, &lower), 100.0);

        // {pool, garden} vs {pool, terrace}: 1 shared of 3 distinct.
        let a = vec!["pool".to_string(), "garden".to_string()];
        let b = vec!["pool".to_string(), "terrace".to_string()];
        let sim = feature_similarity(&a, &b);
        assert!((sim - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentages_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut subject = criteria();
        subject.coordinates = Some(Coordinates { latitude: 36.5, longitude: -4.9 });
        subject.build_area = Some(120.0);
        subject.price = Some(350_000.0);
        subject.bedrooms = Some(3);
        subject.features = vec!["pool".to_string(), "garage".to_string()];

        for i in 0..200 {
            let mut c = candidate(&format!("c{}", i));
            c.coordinates = Some(Coordinates {
                latitude: rng.gen_range(35.0..38.0),
                longitude: rng.gen_range(-6.0..-3.0),
            });
            c.build_area = Some(rng.gen_range(20.0..1_000.0));
            c.price = Some(rng.gen_range(50_000.0..5_000_000.0));
            c.bedrooms = Some(rng.gen_range(0..12));
            if rng.gen_bool(0.5) {
                c.features = vec!["pool".to_string()];
            }

            let score = SimilarityScorer.score(&subject, &c).unwrap();
            for (name, value) in [
                ("distance", score.distance_percent),
                ("size", score.size_percent),
                ("price", score.price_percent),
                ("bedrooms", score.bedroom_percent),
                ("features", score.feature_percent),
                ("overall", score.overall_percent),
            ] {
                assert!(
                    (0.0..=100.0).contains(&value),
                    "{} percent out of bounds: {}",
                    name,
                    value
                );
            }
            assert!(score.total_score >= 0.0);
        }
    }

    #[test]
    fn test_non_finite_input_is_an_error() {
        let mut subject = criteria();
        subject.city = Some("Marbella".to_string());
        subject.build_area = Some(100.0);

        let mut c = candidate("c1");
        c.build_area = Some(f64::NAN);

        assert!(SimilarityScorer.score(&subject, &c).is_err());
    }

    #[test]
    fn test_scorer_as_trait_object() {
        let scorer: Box<dyn Scorer> = Box::new(SimilarityScorer);
        let mut subject = criteria();
        subject.city = Some("Marbella".to_string());
        subject.price = Some(100.0);
        let score = scorer.score(&subject, &candidate("c1")).unwrap();
        assert!(score.total_score > 0.0);
    }
}
