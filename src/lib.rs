pub mod cache;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod eval;
pub mod experiment;
pub mod generation;
pub mod hyde;
pub mod index;
pub mod prompts;
pub mod results;
pub mod run;
pub mod topics;
pub mod vector;

pub use config::Config;
pub use error::{HydeError, Result};
pub use hyde::Hyde;
pub use prompts::{PromptStyle, Promptor};
