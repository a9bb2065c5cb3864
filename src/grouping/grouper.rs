// src/grouping/grouper.rs

use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use strsim::levenshtein;

use crate::config::GrouperConfig;
use crate::grouping::normalizer::{NormalizedLocation, UNKNOWN_KEY};
use crate::grouping::trigram::{NameSimilarity, TrigramSimilarity};
use crate::models::core::{field_has_text, PropertyRecord};
use crate::models::grouping::{GroupingOutcome, GroupingStats, LocationGroup};

// Representative completeness weights. Urbanization counts most since it
// pins the listing to a named development.
const URBANIZATION_WEIGHT: u32 = 4;
const ADDRESS_WEIGHT: u32 = 3;
const SUBURB_WEIGHT: u32 = 2;
const CITY_WEIGHT: u32 = 1;
const COORDS_WEIGHT: u32 = 2;

/// How much location data a record carries, for representative selection.
pub fn completeness_score(record: &PropertyRecord) -> u32 {
    let mut score = 0;
    if field_has_text(&record.urbanization) {
        score += URBANIZATION_WEIGHT;
    }
    if field_has_text(&record.street_address) {
        score += ADDRESS_WEIGHT;
    }
    if field_has_text(&record.suburb) {
        score += SUBURB_WEIGHT;
    }
    if field_has_text(&record.city) {
        score += CITY_WEIGHT;
    }
    if record.coordinates.is_some() {
        score += COORDS_WEIGHT;
    }
    score
}

/// A location bucket while grouping is in flight. Becomes a
/// `LocationGroup` once the merge pass settles.
struct Bucket {
    key: String,
    tier: crate::models::grouping::GroupTier,
    /// Normalized name of the bucket's own tier, what fuzzy merging compares.
    primary_name: String,
    /// Normalized city, empty when the bucket's records carry none.
    city_key: String,
    member_ids: Vec<crate::models::core::PropertyId>,
    representative: PropertyRecord,
    representative_score: u32,
    /// Catalog position of the record that opened the bucket, for
    /// deterministic comparison order inside a partition.
    first_seen: usize,
    merged_from: Vec<String>,
}

impl Bucket {
    fn into_group(self) -> LocationGroup {
        LocationGroup {
            key: self.key,
            tier: self.tier,
            member_ids: self.member_ids,
            representative: self.representative,
            merged_from: self.merged_from,
        }
    }
}

/// Partitions a property catalog into canonical location groups: exact
/// bucketing on normalized hierarchy keys, then a fuzzy merge of
/// near-duplicate buckets within each city.
pub struct LocationGrouper {
    config: GrouperConfig,
    similarity: Arc<dyn NameSimilarity>,
}

impl LocationGrouper {
    pub fn new(config: GrouperConfig) -> Self {
        Self {
            config,
            similarity: Arc::new(TrigramSimilarity),
        }
    }

    /// Use a different name-similarity backend than the in-process default.
    pub fn with_similarity(config: GrouperConfig, similarity: Arc<dyn NameSimilarity>) -> Self {
        Self { config, similarity }
    }

    /// Group the catalog snapshot. Every property lands in exactly one
    /// group; records without location text share the single unknown group.
    pub fn group(&self, catalog: &[PropertyRecord]) -> GroupingOutcome {
        let start = Instant::now();
        let mut stats = GroupingStats {
            properties_grouped: catalog.len(),
            ..Default::default()
        };

        // Pass 1: exact bucketing on the normalized hierarchy key.
        let mut buckets: HashMap<String, Bucket> = HashMap::new();
        for (position, record) in catalog.iter().enumerate() {
            let location = NormalizedLocation::of(record);
            let key = location.bucket_key();
            if key == UNKNOWN_KEY {
                stats.unlocated_properties += 1;
            }

            let score = completeness_score(record);
            match buckets.get_mut(&key) {
                Some(bucket) => {
                    bucket.member_ids.push(record.id.clone());
                    // Strictly greater keeps the first-seen member on ties.
                    if score > bucket.representative_score {
                        bucket.representative = record.clone();
                        bucket.representative_score = score;
                    }
                }
                None => {
                    buckets.insert(
                        key.clone(),
                        Bucket {
                            tier: location.tier(),
                            primary_name: location.primary_name().to_string(),
                            city_key: location.city.clone().unwrap_or_default(),
                            member_ids: vec![record.id.clone()],
                            representative: record.clone(),
                            representative_score: score,
                            first_seen: position,
                            merged_from: Vec::new(),
                            key,
                        },
                    );
                }
            }
        }
        stats.buckets_created = buckets.len();
        debug!(
            "Bucketing pass: {} properties into {} buckets",
            catalog.len(),
            buckets.len()
        );

        // Pass 2: fuzzy merge, cities in parallel. Merges never cross a city
        // boundary, so partitions share no mutable state.
        let mut partitions: HashMap<String, Vec<Bucket>> = HashMap::new();
        for (_, bucket) in buckets {
            partitions
                .entry(bucket.city_key.clone())
                .or_default()
                .push(bucket);
        }

        let merged: Vec<(Vec<Bucket>, usize, usize)> = partitions
            .into_par_iter()
            .map(|(city, partition)| {
                if city.is_empty() {
                    // No recorded city means no shared city to anchor a
                    // merge on; these buckets pass through unmerged.
                    (partition, 0, 0)
                } else {
                    merge_partition(partition, self.similarity.as_ref(), &self.config)
                }
            })
            .collect();

        let mut groups = Vec::new();
        for (survivors, merges, degraded) in merged {
            stats.fuzzy_merges += merges;
            stats.degraded_comparisons += degraded;
            groups.extend(survivors.into_iter().map(Bucket::into_group));
        }
        stats.groups_after_merge = groups.len();

        if stats.degraded_comparisons > 0 {
            warn!(
                "⚠️ Name similarity backend failed for {} comparisons, merges fell back to edit distance",
                stats.degraded_comparisons
            );
        }

        // Stable output order regardless of partition scheduling.
        groups.sort_by(|a, b| a.key.cmp(&b.key));

        info!(
            "📍 Location grouping: {} properties -> {} groups ({} buckets, {} fuzzy merges, {} unlocated) in {:.2?}",
            catalog.len(),
            groups.len(),
            stats.buckets_created,
            stats.fuzzy_merges,
            stats.unlocated_properties,
            start.elapsed()
        );

        GroupingOutcome { groups, stats }
    }
}

/// Merge near-duplicate buckets inside one city partition. Sequential on
/// purpose: each merge changes the candidate set for later comparisons.
/// Returns the surviving buckets plus (merges, degraded comparison) counts.
fn merge_partition(
    mut buckets: Vec<Bucket>,
    similarity: &dyn NameSimilarity,
    config: &GrouperConfig,
) -> (Vec<Bucket>, usize, usize) {
    // Deterministic comparison order regardless of hash iteration.
    buckets.sort_by_key(|b| b.first_seen);

    let mut merges = 0usize;
    let mut degraded = 0usize;
    let mut absorbed = vec![false; buckets.len()];

    for i in 0..buckets.len() {
        if absorbed[i] {
            continue;
        }
        for j in (i + 1)..buckets.len() {
            if absorbed[j] {
                continue;
            }
            {
                let a = &buckets[i];
                let b = &buckets[j];
                if a.tier != b.tier || a.primary_name.is_empty() || b.primary_name.is_empty() {
                    continue;
                }
                let (should_merge, used_fallback) = merge_trigger(a, b, similarity, config);
                if used_fallback {
                    degraded += 1;
                }
                if !should_merge {
                    continue;
                }
            }
            let (head, tail) = buckets.split_at_mut(j);
            absorb(&mut head[i], &mut tail[0]);
            absorbed[j] = true;
            merges += 1;
        }
    }

    let survivors = buckets
        .into_iter()
        .zip(absorbed)
        .filter(|(_, dead)| !dead)
        .map(|(bucket, _)| bucket)
        .collect();
    (survivors, merges, degraded)
}

/// Whether two same-tier buckets should merge. Trigram similarity decides
/// first; short names also get an edit-distance trigger. Returns
/// (merge, degraded) where degraded means the backend failed and only the
/// edit-distance trigger was consulted.
fn merge_trigger(
    a: &Bucket,
    b: &Bucket,
    similarity: &dyn NameSimilarity,
    config: &GrouperConfig,
) -> (bool, bool) {
    match similarity.similarity(&a.primary_name, &b.primary_name) {
        Ok(score) if score >= config.trigram_merge_threshold => (true, false),
        Ok(_) => (levenshtein_trigger(a, b, config), false),
        Err(e) => {
            debug!(
                "Name similarity failed for ('{}', '{}'): {}",
                a.primary_name, b.primary_name, e
            );
            (levenshtein_trigger(a, b, config), true)
        }
    }
}

fn levenshtein_trigger(a: &Bucket, b: &Bucket, config: &GrouperConfig) -> bool {
    let len_a = a.primary_name.chars().count();
    let len_b = b.primary_name.chars().count();
    if len_a > config.levenshtein_max_len || len_b > config.levenshtein_max_len {
        return false;
    }
    levenshtein(&a.primary_name, &b.primary_name) <= config.levenshtein_max_distance
}

/// Union `source` into `target`: members, provenance, and the more complete
/// of the two representatives. Tiers are identical by the merge guard, so
/// the target's tier already is the minimum.
fn absorb(target: &mut Bucket, source: &mut Bucket) {
    target.member_ids.append(&mut source.member_ids);
    target.merged_from.push(source.key.clone());
    target.merged_from.append(&mut source.merged_from);
    if source.representative_score > target.representative_score {
        target.representative = source.representative.clone();
        target.representative_score = source.representative_score;
    }
}
