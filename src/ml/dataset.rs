//! Labeled URL dataset loading and cleaning
//!
//! Cleaning order: drop incomplete rows, de-duplicate on the raw URL (first
//! occurrence wins), extract features. Rows whose extraction fails are
//! skipped and counted, never fatal.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::features::{FeatureExtractor, FeatureVector};
use crate::error::{PipelineError, Result};

const URL_COLUMN: &str = "url";
const LABEL_COLUMN: &str = "label";

/// Row counts collected while cleaning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    /// Data rows read (header excluded)
    pub total_rows: usize,
    /// Rows with an empty URL or label
    pub dropped_incomplete: usize,
    pub duplicates_removed: usize,
    /// Rows rejected by feature extraction
    pub skipped_rows: usize,
    /// Label distribution of labeled rows before cleaning
    pub before: BTreeMap<u8, usize>,
    /// Label distribution of the prepared rows
    pub after: BTreeMap<u8, usize>,
}

impl DatasetStats {
    pub fn kept(&self) -> usize {
        self.after.values().sum()
    }
}

/// Cleaned feature matrix with labels
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<u8>,
    pub stats: DatasetStats,
}

impl PreparedDataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Loads and cleans labeled URL rows using a shared feature extractor
pub struct DatasetPreparer<'a> {
    extractor: &'a FeatureExtractor,
}

impl<'a> DatasetPreparer<'a> {
    pub fn new(extractor: &'a FeatureExtractor) -> Self {
        Self { extractor }
    }

    /// Load a CSV file with `url` and `label` columns (extra columns ignored)
    pub fn load(&self, path: impl AsRef<Path>) -> Result<PreparedDataset> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::DatasetNotFound(path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PipelineError::Schema(format!("CSV must contain '{}' column", name)))
        };
        let url_idx = column(URL_COLUMN)?;
        let label_idx = column(LABEL_COLUMN)?;

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let url = record.get(url_idx).unwrap_or_default().to_string();
            let label = parse_label(record.get(label_idx).unwrap_or_default())
                .map_err(|e| PipelineError::Schema(format!("data row {}: {}", line + 1, e)))?;
            rows.push((url, label));
        }

        info!("Loaded {} rows from {}", rows.len(), path.display());
        Ok(self.clean(rows))
    }

    /// Prepare in-memory samples with the same cleaning rules as [`load`](Self::load)
    pub fn from_samples<I, S>(&self, samples: I) -> Result<PreparedDataset>
    where
        I: IntoIterator<Item = (S, u8)>,
        S: Into<String>,
    {
        let mut rows = Vec::new();
        for (url, label) in samples {
            if label > 1 {
                return Err(PipelineError::Schema(format!("label must be 0 or 1, got {}", label)));
            }
            rows.push((url.into(), Some(label)));
        }
        Ok(self.clean(rows))
    }

    fn clean(&self, rows: Vec<(String, Option<u8>)>) -> PreparedDataset {
        let mut stats = DatasetStats {
            total_rows: rows.len(),
            ..Default::default()
        };
        for label in rows.iter().filter_map(|(_, l)| *l) {
            *stats.before.entry(label).or_default() += 1;
        }
        info!("Dataset stats (before cleaning): {}", format_counts(&stats.before));

        let mut seen: HashSet<String> = HashSet::with_capacity(rows.len());
        let mut features = Vec::with_capacity(rows.len());
        let mut labels = Vec::with_capacity(rows.len());

        for (url, label) in rows {
            let Some(label) = label else {
                stats.dropped_incomplete += 1;
                continue;
            };
            if url.trim().is_empty() {
                stats.dropped_incomplete += 1;
                continue;
            }
            if !seen.insert(url.clone()) {
                stats.duplicates_removed += 1;
                continue;
            }

            match self.extractor.try_extract(&url) {
                Ok(fv) => {
                    features.push(fv);
                    labels.push(label);
                    *stats.after.entry(label).or_default() += 1;
                }
                Err(e) => {
                    debug!("Skipping row: {}", e);
                    stats.skipped_rows += 1;
                }
            }
        }

        info!("Dataset stats (after cleaning): {}", format_counts(&stats.after));
        info!(
            "Dropped {} incomplete, {} duplicate, {} unextractable rows",
            stats.dropped_incomplete, stats.duplicates_removed, stats.skipped_rows
        );

        PreparedDataset {
            features,
            labels,
            stats,
        }
    }
}

/// Parse a label cell. Empty means missing; anything else must be a 0/1 value.
fn parse_label(raw: &str) -> std::result::Result<Option<u8>, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "0" | "0.0" | "false" => Ok(Some(0)),
        "1" | "1.0" | "true" => Ok(Some(1)),
        other => Err(format!("invalid label '{}'", other)),
    }
}

fn format_counts(counts: &BTreeMap<u8, usize>) -> String {
    if counts.is_empty() {
        return "no labeled rows".to_string();
    }
    counts
        .iter()
        .map(|(class, n)| format!("class {}: {}", class, n))
        .collect::<Vec<_>>()
        .join(", ")
}
