//! Summaries of similarity results and small output helpers.

use crate::error::Result;
use crate::results::SimilarityResults;
use std::collections::BTreeMap;
use std::path::Path;

/// "web search expert" -> "web_search_expert", for file names
pub fn replace_spaces_with_underscores(s: &str) -> String {
    s.replace(' ', "_")
}

/// Write `query_id,std` followed by one row per pair, in the given order
pub fn write_std_csv(path: &Path, rows: &[(String, f64)]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["query_id", "std"])?;
    for (query_id, value) in rows {
        writer.write_record([query_id.as_str(), value.to_string().as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Aggregate similarity of one style pair over its queries
#[derive(Debug, Clone, PartialEq)]
pub struct PairSummary {
    pub style1: String,
    pub style2: String,
    pub queries: usize,
    pub mean: f64,
    pub std: f64,
}

/// Population mean and standard deviation; None for an empty slice
fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}

/// One summary per populated style pair, sorted by labels
pub fn pair_summaries(results: &SimilarityResults) -> Vec<PairSummary> {
    results
        .iter_pairs()
        .filter_map(|(s1, s2, scores)| {
            let values: Vec<f64> = scores.values().filter_map(|v| v.first().copied()).collect();
            let (mean, std) = mean_std(&values)?;
            Some(PairSummary {
                style1: s1.to_string(),
                style2: s2.to_string(),
                queries: values.len(),
                mean,
                std,
            })
        })
        .collect()
}

/// Per query, the standard deviation of its similarity across all
/// cross-style pairs (self-pairs excluded). Sorted by query id.
pub fn per_query_std(results: &SimilarityResults) -> Vec<(String, f64)> {
    let mut by_query: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (s1, s2, scores) in results.iter_pairs() {
        if s1 == s2 {
            continue;
        }
        for (qid, v) in scores {
            if let Some(value) = v.first() {
                by_query.entry(qid.as_str()).or_default().push(*value);
            }
        }
    }
    by_query
        .into_iter()
        .filter_map(|(qid, values)| mean_std(&values).map(|(_, std)| (qid.to_string(), std)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_replace_spaces_with_underscores() {
        assert_eq!(replace_spaces_with_underscores("web search expert"), "web_search_expert");
        assert_eq!(replace_spaces_with_underscores("scifact"), "scifact");
    }

    #[test]
    fn test_write_std_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("std.csv");
        let rows = vec![("q1".to_string(), 0.12), ("q2".to_string(), 0.08)];
        write_std_csv(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["query_id,std", "q1,0.12", "q2,0.08"]);
    }

    fn sample_results() -> SimilarityResults {
        let mut r = SimilarityResults::default();
        r.insert("a", "a", "q1", 1.0);
        r.insert("a", "b", "q1", 0.8);
        r.insert("a", "b", "q2", 0.6);
        r.insert("a", "c", "q1", 0.4);
        r.insert("a", "c", "q2", 0.6);
        r
    }

    #[test]
    fn test_pair_summaries() {
        let summaries = pair_summaries(&sample_results());
        assert_eq!(summaries.len(), 3);
        let ab = &summaries[1];
        assert_eq!((ab.style1.as_str(), ab.style2.as_str()), ("a", "b"));
        assert_eq!(ab.queries, 2);
        assert!((ab.mean - 0.7).abs() < 1e-12);
        assert!((ab.std - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_per_query_std_skips_self_pairs() {
        let rows = per_query_std(&sample_results());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "q1");
        // q1 cross-pair values: 0.8, 0.4
        assert!((rows[0].1 - 0.2).abs() < 1e-12);
        assert_eq!(rows[1].0, "q2");
        assert!(rows[1].1.abs() < 1e-12);
    }
}
