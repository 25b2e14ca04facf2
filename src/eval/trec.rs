//! TREC evaluation through an external command.
//!
//! The tool prints one line per metric, `<metric>  all  <value>`; that line
//! format is the whole contract between this module and the tool.

use crate::error::{HydeError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use tokio::process::Command;

/// Runs the evaluation tool for one metric and returns its stdout.
#[async_trait]
pub trait EvalRunner: Send + Sync {
    async fn run(&self, metric: &str, topics_name: &str, run_file: &Path) -> Result<String>;
}

/// Invokes `<program> <args...> -c -l 2 -m <metric> <topics_name> <run_file>`
#[derive(Debug, Clone)]
pub struct CommandEvalRunner {
    program: String,
    args: Vec<String>,
}

impl CommandEvalRunner {
    /// `command` is the program followed by its leading arguments
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| HydeError::Config("Empty evaluation command".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn command_line(&self, metric: &str, topics_name: &str, run_file: &Path) -> Vec<String> {
        let mut line = self.args.clone();
        line.extend(
            ["-c", "-l", "2", "-m", metric, topics_name]
                .iter()
                .map(|s| s.to_string()),
        );
        line.push(run_file.display().to_string());
        line
    }
}

#[async_trait]
impl EvalRunner for CommandEvalRunner {
    async fn run(&self, metric: &str, topics_name: &str, run_file: &Path) -> Result<String> {
        let args = self.command_line(metric, topics_name, run_file);
        log::debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                HydeError::Evaluation(format!("Failed to execute {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!(
                "{} exited with {} for {}: {}",
                self.program,
                output.status,
                metric,
                stderr.trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Value of `metric` from evaluation output, or None if no `<metric> all <value>` line.
///
/// The tool reports `ndcg_cut.10` as `ndcg_cut_10`, so a dot in the metric
/// name matches either a dot or an underscore.
pub fn parse_metric(output: &str, metric: &str) -> Option<f64> {
    let name = regex::escape(metric).replace(r"\.", "[._]");
    let pattern = format!(r"{}\s+all\s+([0-9.]+)", name);
    let re = Regex::new(&pattern).ok()?;
    re.captures(output)?.get(1)?.as_str().parse().ok()
}

/// Parsed metric values plus the metrics the tool output did not report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricReport {
    pub values: Vec<(String, f64)>,
    pub unparsed: Vec<String>,
}

impl MetricReport {
    pub fn is_complete(&self) -> bool {
        self.unparsed.is_empty()
    }
}

/// Evaluate `run_file` for each metric. Metrics whose value cannot be parsed
/// are logged and listed in `unparsed`; only a runner failure is an error.
pub async fn evaluate_metrics(
    runner: &dyn EvalRunner,
    metrics: &[String],
    run_file: &Path,
    topics_name: &str,
) -> Result<MetricReport> {
    let mut report = MetricReport::default();
    for metric in metrics {
        let output = runner.run(metric, topics_name, run_file).await?;
        match parse_metric(&output, metric) {
            Some(value) => report.values.push((metric.clone(), value)),
            None => {
                log::warn!("Error parsing result for {}", metric);
                report.unparsed.push(metric.clone());
            }
        }
    }
    Ok(report)
}
