// src/grouping/trigram.rs

use anyhow::Result;
use std::collections::HashSet;

/// Similarity between two normalized location names on a 0.0 to 1.0 scale.
///
/// The default backend is the in-process comparator below; deployments with
/// a database extension for trigram matching can plug one in instead. A
/// failing backend is recoverable: the grouper falls back to edit-distance
/// comparison for that pair.
pub trait NameSimilarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> Result<f64>;
}

/// Accent substitutions applied before trigram extraction. The catalogs mix
/// accented and unaccented spellings of the same place, and those must land
/// on the same trigrams.
const CHAR_SUBSTITUTIONS: [(char, char); 22] = [
    ('á', 'a'),
    ('à', 'a'),
    ('â', 'a'),
    ('ä', 'a'),
    ('é', 'e'),
    ('è', 'e'),
    ('ê', 'e'),
    ('ë', 'e'),
    ('í', 'i'),
    ('ì', 'i'),
    ('î', 'i'),
    ('ï', 'i'),
    ('ó', 'o'),
    ('ò', 'o'),
    ('ô', 'o'),
    ('ö', 'o'),
    ('ú', 'u'),
    ('ù', 'u'),
    ('û', 'u'),
    ('ü', 'u'),
    ('ñ', 'n'),
    ('ç', 'c'),
];

pub fn fold_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| {
            CHAR_SUBSTITUTIONS
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

/// Word-padded trigram extraction: each word is padded with two leading
/// spaces and one trailing space before windows are taken, so word
/// boundaries contribute their own trigrams.
fn trigrams(text: &str) -> HashSet<String> {
    let mut grams = HashSet::new();
    for word in text.split_whitespace() {
        let padded: Vec<char> = format!("  {} ", word).chars().collect();
        for window in padded.windows(3) {
            grams.insert(window.iter().collect());
        }
    }
    grams
}

/// Trigram similarity over diacritic-folded names: Jaccard over the two
/// trigram sets. Empty names never match anything, including each other.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let a_folded = fold_diacritics(a);
    let b_folded = fold_diacritics(b);

    if a_folded.trim().is_empty() || b_folded.trim().is_empty() {
        return 0.0;
    }
    if a_folded == b_folded {
        return 1.0;
    }

    let a_grams = trigrams(&a_folded);
    let b_grams = trigrams(&b_folded);
    if a_grams.is_empty() || b_grams.is_empty() {
        return 0.0;
    }

    let intersection = a_grams.intersection(&b_grams).count();
    let union = a_grams.len() + b_grams.len() - intersection;
    intersection as f64 / union as f64
}

/// Pure in-process trigram backend.
#[derive(Debug, Default, Clone)]
pub struct TrigramSimilarity;

impl NameSimilarity for TrigramSimilarity {
    fn similarity(&self, a: &str, b: &str) -> Result<f64> {
        Ok(trigram_similarity(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_names_score_one() {
        assert!((trigram_similarity("marbella", "marbella") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_accent_variants_score_one() {
        assert!((trigram_similarity("nueva andalucía", "nueva andalucia") - 1.0).abs() < f64::EPSILON);
        assert!((trigram_similarity("señorío", "senorio") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_names_never_match() {
        assert_eq!(trigram_similarity("", ""), 0.0);
        assert_eq!(trigram_similarity("", "marbella"), 0.0);
    }

    #[test]
    fn test_word_padding() {
        // "cat" yields 4 trigrams, "cats" 5, sharing 3 of them.
        let sim = trigram_similarity("cat", "cats");
        assert!((sim - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_close_names_score_high() {
        let sim = trigram_similarity("puerto banus", "puerto banús marina");
        assert!(sim > 0.5, "got {}", sim);
        assert!(sim < 1.0);
    }

    #[test]
    fn test_unrelated_names_score_low() {
        let sim = trigram_similarity("marbella", "estepona");
        assert!(sim < 0.2, "got {}", sim);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let ab = trigram_similarity("los naranjos", "los naranjos golf");
        let ba = trigram_similarity("los naranjos golf", "los naranjos");
        assert!((ab - ba).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_backend_through_trait() {
        let backend: &dyn NameSimilarity = &TrigramSimilarity;
        let sim = backend.similarity("marbella", "marbella").unwrap();
        assert!((sim - 1.0).abs() < f64::EPSILON);
    }
}
