//! Topic sets and relevance judgments, loaded by dataset name.
//!
//! Files live under the data directory as `topics.<name>.tsv` (`qid<TAB>title`)
//! and `qrels.<name>.txt` (`qid iter docid rel`), the layout pyserini ships.

use crate::error::{HydeError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One query of a topic set
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub id: String,
    pub title: String,
}

/// Ordered topic set; iteration follows file order.
#[derive(Debug, Clone, Default)]
pub struct TopicSet {
    topics: Vec<Topic>,
}

impl TopicSet {
    pub fn path_for(data_dir: &Path, topics_name: &str) -> PathBuf {
        data_dir.join(format!("topics.{}.tsv", topics_name))
    }

    /// Load `topics.<topics_name>.tsv` from `data_dir`
    pub fn load(data_dir: &Path, topics_name: &str) -> Result<Self> {
        let path = Self::path_for(data_dir, topics_name);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            HydeError::Parse(format!("Failed to read topics {}: {}", path.display(), e))
        })?;
        let set = Self::parse(&text)?;
        log::info!("Loaded {} topics from {}", set.len(), path.display());
        Ok(set)
    }

    /// Parse `qid<TAB>title` lines. Blank lines are skipped; a repeated qid is an error.
    pub fn parse(text: &str) -> Result<Self> {
        let mut topics = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let (id, title) = line.split_once('\t').ok_or_else(|| {
                HydeError::Parse(format!("topics line {}: expected qid<TAB>title", lineno + 1))
            })?;
            let id = id.trim().to_string();
            if !seen.insert(id.clone()) {
                return Err(HydeError::Parse(format!(
                    "topics line {}: duplicate query id {}",
                    lineno + 1,
                    id
                )));
            }
            topics.push(Topic {
                id,
                title: title.trim().to_string(),
            });
        }
        Ok(Self { topics })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.topics.iter()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Topics with at least one judgment, in topic order, plus how many were dropped
    pub fn judged<'a>(&'a self, qrels: &Qrels) -> (Vec<&'a Topic>, usize) {
        let judged: Vec<&Topic> = self.iter().filter(|t| qrels.contains(&t.id)).collect();
        let skipped = self.topics.len() - judged.len();
        (judged, skipped)
    }
}

/// Relevance judgments: query id -> doc id -> grade
#[derive(Debug, Clone, Default)]
pub struct Qrels {
    judgments: HashMap<String, HashMap<String, i32>>,
}

impl Qrels {
    pub fn path_for(data_dir: &Path, topics_name: &str) -> PathBuf {
        data_dir.join(format!("qrels.{}.txt", topics_name))
    }

    /// Load `qrels.<topics_name>.txt` from `data_dir`
    pub fn load(data_dir: &Path, topics_name: &str) -> Result<Self> {
        let path = Self::path_for(data_dir, topics_name);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            HydeError::Parse(format!("Failed to read qrels {}: {}", path.display(), e))
        })?;
        let qrels = Self::parse(&text)?;
        log::info!(
            "Loaded judgments for {} queries from {}",
            qrels.len(),
            path.display()
        );
        Ok(qrels)
    }

    /// Parse TREC qrels lines: `qid iter docid rel`, whitespace separated
    pub fn parse(text: &str) -> Result<Self> {
        let mut judgments: HashMap<String, HashMap<String, i32>> = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            let [qid, _iter, docid, rel] = fields.as_slice() else {
                return Err(HydeError::Parse(format!(
                    "qrels line {}: expected 4 fields, got {}",
                    lineno + 1,
                    fields.len()
                )));
            };
            let rel: i32 = rel.parse().map_err(|_| {
                HydeError::Parse(format!("qrels line {}: bad relevance {:?}", lineno + 1, rel))
            })?;
            judgments
                .entry(qid.to_string())
                .or_default()
                .insert(docid.to_string(), rel);
        }
        Ok(Self { judgments })
    }

    pub fn contains(&self, query_id: &str) -> bool {
        self.judgments.contains_key(query_id)
    }

    /// Number of judged queries
    pub fn len(&self) -> usize {
        self.judgments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.judgments.is_empty()
    }
}
