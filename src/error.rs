use thiserror::Error;

/// Main error type for hydebench
#[derive(Error, Debug)]
pub enum HydeError {
    /// Dense index (SQLite) errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Results file (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV output errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Text generation backend errors
    #[error("Generation error: {0}")]
    Generation(String),

    /// Embedding backend errors
    #[error("Embedding API error: {0}")]
    Embedding(String),

    /// Dense search errors
    #[error("Search error: {0}")]
    Search(String),

    /// Prompt style label not in the recognized set
    #[error("Invalid prompt style: {0:?}")]
    InvalidStyle(String),

    /// Retry ceiling reached on a backend call
    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// External evaluation command errors
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Parse errors (topics, qrels, collections)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using HydeError
pub type Result<T> = std::result::Result<T, HydeError>;
