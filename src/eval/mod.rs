//! Retrieval metrics through an external TREC evaluation tool, plus report helpers.

pub mod report;
pub mod trec;

pub use report::{
    pair_summaries, per_query_std, replace_spaces_with_underscores, write_std_csv, PairSummary,
};
pub use trec::{evaluate_metrics, parse_metric, CommandEvalRunner, EvalRunner, MetricReport};

/// MAP, NDCG@10 and Recall@1000, in reporting order
pub const DEFAULT_METRICS: &[&str] = &["map", "ndcg_cut.10", "recall.1000"];
