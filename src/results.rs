//! Persistent style-pair similarity results.
//!
//! Layout on disk: `{style1: {style2: {query_id: [similarity]}}}`, pretty-printed
//! with 4-space indentation. Each similarity is stored as a one-element list.

use crate::error::{HydeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of the checkpoint inside the run directory
pub const RESULTS_FILE: &str = "cosine_similarity_results.json";

type QueryScores = BTreeMap<String, Vec<f64>>;

/// style1 -> style2 -> query id -> similarity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityResults {
    pairs: BTreeMap<String, BTreeMap<String, QueryScores>>,
}

impl SimilarityResults {
    pub fn path_in(run_directory: &Path) -> PathBuf {
        run_directory.join(RESULTS_FILE)
    }

    /// Load results from `path`, or start empty if the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let results: Self = serde_json::from_str(&text).map_err(|e| {
            HydeError::Parse(format!("Failed to parse results {}: {}", path.display(), e))
        })?;
        log::info!(
            "Resuming from {} ({} style pairs)",
            path.display(),
            results.pair_count()
        );
        Ok(results)
    }

    /// Write the whole mapping, replacing `path` atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &buf)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Drop every entry for (style1, style2) so the pair can be recomputed from scratch
    pub fn clear_pair(&mut self, style1: &str, style2: &str) {
        if let Some(inner) = self.pairs.get_mut(style1) {
            inner.remove(style2);
        }
    }

    pub fn insert(&mut self, style1: &str, style2: &str, query_id: &str, similarity: f64) {
        self.pairs
            .entry(style1.to_string())
            .or_default()
            .entry(style2.to_string())
            .or_default()
            .insert(query_id.to_string(), vec![similarity]);
    }

    pub fn has_pair(&self, style1: &str, style2: &str) -> bool {
        self.pair(style1, style2).is_some_and(|scores| !scores.is_empty())
    }

    pub fn pair(&self, style1: &str, style2: &str) -> Option<&QueryScores> {
        self.pairs.get(style1).and_then(|inner| inner.get(style2))
    }

    pub fn get(&self, style1: &str, style2: &str, query_id: &str) -> Option<f64> {
        self.pair(style1, style2)
            .and_then(|scores| scores.get(query_id))
            .and_then(|v| v.first().copied())
    }

    /// Every populated (style1, style2, scores) triple, sorted by style labels
    pub fn iter_pairs(&self) -> impl Iterator<Item = (&str, &str, &QueryScores)> {
        self.pairs.iter().flat_map(|(s1, inner)| {
            inner
                .iter()
                .map(move |(s2, scores)| (s1.as_str(), s2.as_str(), scores))
        })
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.values().map(|inner| inner.len()).sum()
    }
}
