//! Approximate file-name matching for workbook resolution.
use crate::spreadsheet::NameResolver;
use anyhow::Context;
use std::path::Path;
use strsim::jaro_winkler;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Jaro-Winkler similarity over NFC-normalized, lowercased names.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimilarityResolver {
    pub threshold: f64,
}

impl Default for SimilarityResolver {
    fn default() -> Self {
        SimilarityResolver { threshold: 0.8 }
    }
}

impl SimilarityResolver {
    pub fn new(threshold: f64) -> Self {
        SimilarityResolver { threshold }
    }
}

fn normalized(name: &str) -> String {
    name.nfc().collect::<String>().to_lowercase()
}

impl NameResolver for SimilarityResolver {
    fn best_match(&self, target: &str, candidates: &[String]) -> Option<String> {
        let target = normalized(target);
        let mut best: Option<(&String, f64)> = None;
        let mut tied = false;

        for candidate in candidates {
            let similarity = jaro_winkler(&target, &normalized(candidate));
            if similarity < self.threshold {
                continue;
            }
            match best {
                Some((_, score)) if similarity < score => (),
                Some((current, score)) if similarity == score => tied |= normalized(current) != normalized(candidate),
                _ => {
                    best = Some((candidate, similarity));
                    tied = false;
                }
            }
        }

        match best {
            Some((candidate, score)) if !tied => {
                debug!(name = %target, candidate = %candidate, score, "fuzzy match accepted");
                Some(candidate.to_owned())
            }
            Some((_, score)) => {
                debug!(name = %target, score, "fuzzy match rejected: tie");
                None
            }
            None => None,
        }
    }
}

/// File names of the spreadsheet files (`*.xls*`) in `directory`.
pub fn directory_candidates(directory: &Path) -> anyhow::Result<Vec<String>> {
    let pattern = format!("{}/*.xls*", glob::Pattern::escape(&directory.to_string_lossy()));
    let matches = glob::glob(&pattern).with_context(|| format!("Invalid glob pattern: {pattern}"))?;

    let mut names = Vec::new();
    for entry in matches {
        let path = entry.with_context(|| "Failed to read glob entry")?;
        if path.is_file() {
            if let Some(name) = path.file_name() {
                names.push(name.to_string_lossy().to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
