use crate::prompts::PromptStyle;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "HYDEBENCH_CONFIG";

/// Main configuration structure
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hydebench: HydebenchConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub experiment: ExperimentConfig,
}

/// General run settings
#[derive(Debug, Clone, Deserialize)]
pub struct HydebenchConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for results JSON, run files and CSV outputs
    #[serde(default = "default_run_directory")]
    pub run_directory: PathBuf,
    /// Directory holding `topics.<name>.tsv` and `qrels.<name>.txt`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for HydebenchConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            run_directory: default_run_directory(),
            data_dir: default_data_dir(),
        }
    }
}

/// Text generation backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// "ollama" or "openai"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Defaults per backend when unset
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Hypothesis documents generated per query
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Only read for the openai backend
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            base_url: None,
            model: default_generation_model(),
            temperature: default_temperature(),
            samples: default_samples(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_generation_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl GenerationConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| default_base_url(&self.backend))
    }
}

/// Retry settings for generation calls
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// 0 retries forever
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
    /// "fixed" or "exponential"
    #[serde(default = "default_backoff")]
    pub backoff: String,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
            backoff: default_backoff(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Embedding backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    /// "ollama" or "openai"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Defaults per backend when unset
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_encoder_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 0 disables the query embedding cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Average the raw query vector in with the hypothesis vectors
    #[serde(default = "default_include_query")]
    pub include_query: bool,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_embedding_retries")]
    pub max_retries: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            base_url: None,
            model: default_encoder_model(),
            api_key_env: default_api_key_env(),
            batch_size: default_batch_size(),
            cache_capacity: default_cache_capacity(),
            include_query: default_include_query(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
        }
    }
}

impl EmbeddingsConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| default_base_url(&self.backend))
    }
}

/// Dense passage index configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    #[serde(default = "default_k")]
    pub default_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            default_k: default_k(),
        }
    }
}

/// External TREC evaluation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    /// Program followed by its leading arguments
    #[serde(default = "default_eval_command")]
    pub command: Vec<String>,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            command: default_eval_command(),
            metrics: default_metrics(),
        }
    }
}

/// Similarity experiment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default = "default_styles")]
    pub styles: Vec<String>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            styles: default_styles(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_run_directory() -> PathBuf {
    PathBuf::from("./runs/")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_backend() -> String {
    "ollama".to_string()
}

/// Base URL used when `base_url` is not set for a backend
pub fn default_base_url(backend: &str) -> &'static str {
    match backend {
        "openai" => "https://api.openai.com",
        _ => "http://localhost:11434",
    }
}

fn default_generation_model() -> String {
    "llama3.1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_samples() -> usize {
    8
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_generation_timeout() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    10
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_backoff() -> String {
    "fixed".to_string()
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_encoder_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_include_query() -> bool {
    true
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_embedding_retries() -> usize {
    3
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./indexes/contriever_msmarco.db")
}

fn default_k() -> usize {
    1000
}

fn default_eval_command() -> Vec<String> {
    vec![
        "python".to_string(),
        "-m".to_string(),
        "pyserini.eval.trec_eval".to_string(),
    ]
}

fn default_metrics() -> Vec<String> {
    crate::eval::DEFAULT_METRICS
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_styles() -> Vec<String> {
    PromptStyle::WEB_SEARCH_LEVELS
        .iter()
        .map(|s| s.label().to_string())
        .collect()
}

const BACKENDS: &[&str] = &["ollama", "openai"];

impl Config {
    /// Config file to read: `HYDEBENCH_CONFIG` when set (the file must then
    /// exist), else ./config.toml if present, else none (built-in defaults).
    pub fn config_path() -> Option<PathBuf> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => {
                let path = PathBuf::from("config.toml");
                path.exists().then_some(path)
            }
        }
    }

    /// Load .env and the config file without validating, so command-line
    /// overrides can be applied before [`Config::validate`].
    pub fn load_unvalidated() -> Result<Self> {
        // Optional .env file; missing file is fine
        let _ = dotenv::dotenv();

        match Self::config_path() {
            Some(path) => Self::from_file(&path),
            None => Ok(Config::default()),
        }
    }

    /// Load and validate configuration
    pub fn load() -> Result<Self> {
        let config = Self::load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file without validating it
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse config from TOML text
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !BACKENDS.contains(&self.generation.backend.as_str()) {
            anyhow::bail!(
                "generation.backend must be one of {:?}, got {:?}",
                BACKENDS,
                self.generation.backend
            );
        }

        if !BACKENDS.contains(&self.embeddings.backend.as_str()) {
            anyhow::bail!(
                "embeddings.backend must be one of {:?}, got {:?}",
                BACKENDS,
                self.embeddings.backend
            );
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            anyhow::bail!("generation.temperature must be between 0.0 and 2.0");
        }

        if self.generation.samples == 0 {
            anyhow::bail!("generation.samples must be greater than 0");
        }

        if !matches!(self.generation.retry.backoff.as_str(), "fixed" | "exponential") {
            anyhow::bail!(
                "generation.retry.backoff must be \"fixed\" or \"exponential\", got {:?}",
                self.generation.retry.backoff
            );
        }

        if self.embeddings.batch_size == 0 {
            anyhow::bail!("embeddings.batch_size must be greater than 0");
        }

        if self.index.default_k == 0 {
            anyhow::bail!("index.default_k must be greater than 0");
        }

        if self.evaluation.command.is_empty() {
            anyhow::bail!("evaluation.command must name a program");
        }

        self.prompt_styles()?;

        for (section, backend, key_env) in [
            ("generation", &self.generation.backend, &self.generation.api_key_env),
            ("embeddings", &self.embeddings.backend, &self.embeddings.api_key_env),
        ] {
            if backend == "openai" {
                std::env::var(key_env).with_context(|| {
                    format!(
                        "Environment variable {} not set (required by {}.backend = \"openai\"). Set it in your .env file or as an environment variable.",
                        key_env, section
                    )
                })?;
            }
        }

        Ok(())
    }

    /// Parse the configured experiment styles, preserving order
    pub fn prompt_styles(&self) -> Result<Vec<PromptStyle>> {
        if self.experiment.styles.is_empty() {
            anyhow::bail!("experiment.styles must not be empty");
        }
        self.experiment
            .styles
            .iter()
            .map(|s| s.parse::<PromptStyle>().map_err(anyhow::Error::from))
            .collect()
    }

    /// Get run directory
    pub fn run_directory(&self) -> &Path {
        &self.hydebench.run_directory
    }

    /// Get topics/qrels directory
    pub fn data_dir(&self) -> &Path {
        &self.hydebench.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const TEST_CONFIG: &str = r#"
[hydebench]
log_level = "debug"
run_directory = "./out"

[generation]
model = "mistral"
temperature = 0.5
samples = 4

[generation.retry]
max_attempts = 0
backoff = "exponential"

[embeddings]
model = "bge-m3"
include_query = false

[experiment]
styles = ["web search", "web search expert"]
"#;

    fn with_config_env(config_path: &std::path::Path, f: impl FnOnce()) {
        let original = std::env::var(CONFIG_ENV).ok();
        std::env::set_var(CONFIG_ENV, config_path.to_str().unwrap());
        f();
        std::env::remove_var(CONFIG_ENV);
        if let Some(val) = original {
            std::env::set_var(CONFIG_ENV, val);
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generation.model, "llama3.1");
        assert_eq!(config.generation.samples, 8);
        assert_eq!(config.run_directory(), Path::new("./runs/"));
        assert_eq!(config.experiment.styles.len(), 5);
        assert_eq!(config.experiment.styles[0], "web search");
        assert_eq!(config.evaluation.metrics, vec!["map", "ndcg_cut.10", "recall.1000"]);
        assert_eq!(config.generation.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_parse_partial_config() {
        let config = Config::from_toml_str(TEST_CONFIG).unwrap();
        assert_eq!(config.hydebench.log_level, "debug");
        assert_eq!(config.generation.model, "mistral");
        assert_eq!(config.generation.samples, 4);
        assert_eq!(config.generation.retry.max_attempts, 0);
        assert_eq!(config.generation.retry.delay_ms, 1000);
        assert!(!config.embeddings.include_query);
        assert_eq!(config.embeddings.batch_size, 32);
        assert_eq!(config.index.default_k, 1000);

        let mut openai = config.embeddings.clone();
        openai.backend = "openai".to_string();
        assert_eq!(openai.base_url(), "https://api.openai.com");
        openai.base_url = Some("http://proxy:8080".to_string());
        assert_eq!(openai.base_url(), "http://proxy:8080");

        let styles = config.prompt_styles().unwrap();
        assert_eq!(styles, vec![PromptStyle::WebSearch, PromptStyle::WebSearchExpert]);
    }

    #[test]
    fn test_validate_rejects_unknown_style() {
        let mut config = Config::default();
        config.experiment.styles.push("web search wizard".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("web search wizard"));
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut config = Config::default();
        config.generation.temperature = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generation.samples = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.embeddings.backend = "sentence-transformers".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.experiment.styles.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_load_from_env_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("hydebench.toml");
        fs::write(&config_path, TEST_CONFIG).unwrap();
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            assert_eq!(config.unwrap().generation.model, "mistral");
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_config_env(Path::new("nonexistent.toml"), || {
            assert!(Config::load().is_err());
        });
    }

    #[test]
    fn test_overrides_applied_before_validation() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("hydebench.toml");
        fs::write(&config_path, "[experiment]\nstyles = [\"web search wizard\"]\n").unwrap();
        with_config_env(&config_path, || {
            assert!(Config::load().is_err());
            assert_eq!(Config::config_path().as_deref(), Some(config_path.as_path()));

            let mut config = Config::load_unvalidated().unwrap();
            assert!(config.validate().is_err());
            config.experiment.styles = vec!["web search expert".to_string()];
            assert!(config.validate().is_ok());
        });
    }
}
