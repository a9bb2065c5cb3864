// src/grouping/optimizer.rs

use chrono::Utc;
use log::{debug, info};
use uuid::Uuid;

use crate::config::OptimizerConfig;
use crate::grouping::normalizer::NormalizedLocation;
use crate::models::core::{field_has_text, PropertyRecord};
use crate::models::grouping::{
    CostAnalysis, GeocodingQueueEntry, GroupTier, LocationGroup, TierBreakdown,
};

// Queue priority bonuses on top of member count, read off the
// representative. Groups that already carry coordinates rank highest
// since their geocode doubles as verification.
const URBANIZATION_BONUS: i64 = 10;
const ADDRESS_BONUS: i64 = 5;
const COORDS_BONUS: i64 = 20;

/// Post-processes location groups: folds stray city-level singletons into
/// larger same-city groups, orders the geocoding queue and prices the run.
pub struct GroupOptimizer {
    config: OptimizerConfig,
}

impl GroupOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Fold eligible singletons and produce the cost analysis. Folding never
    /// changes which properties are grouped, only how finely.
    pub fn optimize(&self, groups: Vec<LocationGroup>) -> (Vec<LocationGroup>, CostAnalysis) {
        let total_properties: usize = groups.iter().map(|g| g.member_count()).sum();

        let (fold_candidates, mut retained): (Vec<LocationGroup>, Vec<LocationGroup>) = groups
            .into_iter()
            .partition(|g| g.is_singleton() && g.tier >= GroupTier::City);

        // Deterministic fold order regardless of input order.
        let mut fold_candidates = fold_candidates;
        fold_candidates.sort_by(|a, b| a.key.cmp(&b.key));

        let mut singletons_folded = 0usize;
        for mut singleton in fold_candidates {
            let target_index = group_city(&singleton).and_then(|city| {
                find_fold_target(&retained, &city, self.config.fold_min_members)
            });
            match target_index {
                Some(index) => {
                    let target = &mut retained[index];
                    debug!("Folding singleton '{}' into '{}'", singleton.key, target.key);
                    target.member_ids.append(&mut singleton.member_ids);
                    target.merged_from.push(singleton.key);
                    target.merged_from.append(&mut singleton.merged_from);
                    singletons_folded += 1;
                }
                None => retained.push(singleton),
            }
        }

        retained.sort_by(|a, b| a.key.cmp(&b.key));

        let mut tiers = TierBreakdown::default();
        for group in &retained {
            tiers.record(group.tier);
        }

        let unit_price = self.config.geocode_unit_price;
        let original_cost = total_properties as f64 * unit_price;
        let optimized_cost = retained.len() as f64 * unit_price;
        let savings = original_cost - optimized_cost;
        let savings_percent = if original_cost > 0.0 {
            savings / original_cost * 100.0
        } else {
            0.0
        };

        let analysis = CostAnalysis {
            run_id: Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            total_properties,
            group_count: retained.len(),
            tiers,
            singletons_folded,
            original_cost,
            optimized_cost,
            savings,
            savings_percent,
        };

        info!(
            "💰 Geocoding plan: {} properties -> {} groups, {} singletons folded, {:.2} -> {:.2} ({:.1}% savings)",
            total_properties,
            analysis.group_count,
            singletons_folded,
            original_cost,
            optimized_cost,
            savings_percent
        );

        (retained, analysis)
    }

    /// Build the geocoding queue, highest priority first. Groups with no
    /// queryable text (unknown locations without a street address) are
    /// skipped; there is nothing to send a geocoder.
    pub fn build_queue(&self, groups: &[LocationGroup]) -> Vec<GeocodingQueueEntry> {
        let mut entries: Vec<GeocodingQueueEntry> = groups
            .iter()
            .filter_map(|group| {
                let query = geocoding_query(&group.representative);
                if query.is_empty() {
                    debug!("Skipping group '{}': no queryable location text", group.key);
                    return None;
                }
                Some(GeocodingQueueEntry {
                    group_key: group.key.clone(),
                    member_ids: group.member_ids.clone(),
                    query,
                    priority: queue_priority(group),
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.group_key.cmp(&b.group_key))
        });
        entries
    }
}

/// Normalized city of a group, read off its representative.
fn group_city(group: &LocationGroup) -> Option<String> {
    NormalizedLocation::of(&group.representative).city
}

/// Index of the best fold target: a city-tier group in the same city with
/// strictly more than `min_members` members. Largest wins, ties keep the
/// smaller key.
fn find_fold_target(groups: &[LocationGroup], city: &str, min_members: usize) -> Option<usize> {
    groups
        .iter()
        .enumerate()
        .filter(|(_, g)| {
            g.tier == GroupTier::City
                && g.member_count() > min_members
                && group_city(g).as_deref() == Some(city)
        })
        .max_by(|(_, a), (_, b)| {
            a.member_count()
                .cmp(&b.member_count())
                .then_with(|| b.key.cmp(&a.key))
        })
        .map(|(index, _)| index)
}

fn queue_priority(group: &LocationGroup) -> i64 {
    let rep = &group.representative;
    let mut priority = group.member_count() as i64;
    if field_has_text(&rep.urbanization) {
        priority += URBANIZATION_BONUS;
    }
    if field_has_text(&rep.street_address) {
        priority += ADDRESS_BONUS;
    }
    if rep.coordinates.is_some() {
        priority += COORDS_BONUS;
    }
    priority
}

/// Human-readable geocoder query from the representative's raw fields,
/// most specific first.
fn geocoding_query(rep: &PropertyRecord) -> String {
    [
        rep.street_address.as_deref(),
        rep.urbanization.as_deref(),
        rep.suburb.as_deref(),
        rep.city.as_deref(),
    ]
    .iter()
    .flatten()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}
