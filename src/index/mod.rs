//! Flat dense passage index stored in SQLite.
//!
//! Passages and their embeddings (little-endian f32 blobs) live in one table.
//! The first search loads every embedding into memory; scoring is brute-force
//! cosine over that snapshot.

use crate::db::Db;
use crate::error::{HydeError, Result};
use crate::vector::cosine_similarity;
use async_trait::async_trait;
use rusqlite::params;
use std::path::Path;
use tokio::sync::OnceCell;

pub mod collection;

/// One ranked passage
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub docid: String,
    pub score: f32,
}

/// Nearest-neighbour search over passage embeddings.
#[async_trait]
pub trait DenseSearcher: Send + Sync {
    /// Top `k` passages by score, highest first
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>>;
}

/// Passage to be stored in the index
#[derive(Debug, Clone)]
pub struct Passage {
    pub docid: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

pub(crate) fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn parse_embedding_blob(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    blob.chunks(4)
        .map(|bytes| {
            let arr: [u8; 4] = bytes.try_into().ok()?;
            Some(f32::from_le_bytes(arr))
        })
        .collect()
}

/// Score `query` against every entry; keep the best `k`, ties broken by docid.
fn top_k(entries: &[(String, Vec<f32>)], query: &[f32], k: usize) -> Vec<SearchHit> {
    let mut scored: Vec<SearchHit> = entries
        .iter()
        .map(|(docid, emb)| SearchHit {
            docid: docid.clone(),
            score: cosine_similarity(query, emb),
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.docid.cmp(&b.docid))
    });
    scored.truncate(k);
    scored
}

/// SQLite-backed flat index
pub struct DenseIndex {
    db: Db,
    vectors: OnceCell<Vec<(String, Vec<f32>)>>,
}

impl DenseIndex {
    /// Open an existing index file
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(HydeError::Search(format!(
                "Index not found: {}",
                path.display()
            )));
        }
        let db = Db::new(path);
        db.ensure_schema().await?;
        Ok(Self {
            db,
            vectors: OnceCell::new(),
        })
    }

    /// Open an index for writing, creating the file and tables if needed
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Db::new(path);
        db.ensure_schema().await?;
        Ok(Self {
            db,
            vectors: OnceCell::new(),
        })
    }

    /// Insert or replace passages in one transaction; returns rows written.
    ///
    /// All embeddings must share the dimension already recorded for the index.
    pub async fn add_passages(&self, passages: Vec<Passage>) -> Result<usize> {
        if passages.is_empty() {
            return Ok(0);
        }
        let dim = passages[0].embedding.len();
        if let Some(bad) = passages.iter().find(|p| p.embedding.len() != dim) {
            return Err(HydeError::InvalidInput(format!(
                "Passage {} has dimension {}, expected {}",
                bad.docid,
                bad.embedding.len(),
                dim
            )));
        }
        if let Some(existing) = self.dimension().await? {
            if existing != dim {
                return Err(HydeError::InvalidInput(format!(
                    "Index dimension is {}, got {}",
                    existing, dim
                )));
            }
        }

        self.db
            .with_connection(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT OR REPLACE INTO passages (docid, text, embedding) VALUES (?1, ?2, ?3)",
                    )?;
                    for p in &passages {
                        stmt.execute(params![p.docid, p.text, embedding_to_blob(&p.embedding)])?;
                    }
                }
                tx.execute(
                    "INSERT OR REPLACE INTO index_meta (key, value) VALUES ('dimension', ?1)",
                    params![dim.to_string()],
                )?;
                tx.commit()?;
                Ok(passages.len())
            })
            .await
    }

    /// Record a metadata value (e.g. the encoder model used to build the index)
    pub async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.db
            .with_connection(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO index_meta (key, value) VALUES (?1, ?2)",
                    params![key, value],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn meta(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare("SELECT value FROM index_meta WHERE key = ?1")?;
                let mut rows = stmt.query(params![key])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row.get(0)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    /// Embedding dimension, if any passage has been stored
    pub async fn dimension(&self) -> Result<Option<usize>> {
        match self.meta("dimension").await? {
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| HydeError::Parse(format!("Bad index dimension: {}", v))),
            None => Ok(None),
        }
    }

    /// Number of stored passages
    pub async fn len(&self) -> Result<usize> {
        self.db
            .with_connection(|conn| {
                let n: i64 = conn.query_row("SELECT COUNT(*) FROM passages", [], |row| row.get(0))?;
                Ok(n as usize)
            })
            .await
    }

    async fn load_vectors(&self) -> Result<Vec<(String, Vec<f32>)>> {
        let vectors = self
            .db
            .with_connection(|conn| {
                let mut stmt = conn.prepare("SELECT docid, embedding FROM passages")?;
                let mut rows = stmt.query([])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    let docid: String = row.get(0)?;
                    let blob: Vec<u8> = row.get(1)?;
                    match parse_embedding_blob(&blob) {
                        Some(embedding) => out.push((docid, embedding)),
                        None => log::warn!("Skipping passage {} with malformed embedding", docid),
                    }
                }
                Ok(out)
            })
            .await?;
        log::info!(
            "Dense index loaded: {} embeddings from {}",
            vectors.len(),
            self.db.path().display()
        );
        Ok(vectors)
    }
}

#[async_trait]
impl DenseSearcher for DenseIndex {
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let entries = self
            .vectors
            .get_or_try_init(|| self.load_vectors())
            .await?;
        if let Some((docid, emb)) = entries.first() {
            if emb.len() != vector.len() {
                return Err(HydeError::Search(format!(
                    "Query dimension {} does not match index dimension {} (passage {})",
                    vector.len(),
                    emb.len(),
                    docid
                )));
            }
        }
        Ok(top_k(entries, vector, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn passage(docid: &str, embedding: Vec<f32>) -> Passage {
        Passage {
            docid: docid.to_string(),
            text: format!("text of {}", docid),
            embedding,
        }
    }

    #[test]
    fn test_blob_round_trip() {
        let v = vec![1.5f32, -2.0, 0.0, 3.25];
        assert_eq!(parse_embedding_blob(&embedding_to_blob(&v)).unwrap(), v);
        assert!(parse_embedding_blob(&[0u8; 5]).is_none());
    }

    #[test]
    fn test_top_k_orders_and_truncates() {
        let entries = vec![
            ("a".to_string(), vec![0.0, 1.0]),
            ("b".to_string(), vec![1.0, 0.0]),
            ("c".to_string(), vec![1.0, 1.0]),
            ("d".to_string(), vec![2.0, 0.0]),
        ];
        let hits = top_k(&entries, &[1.0, 0.0], 3);
        let ids: Vec<&str> = hits.iter().map(|h| h.docid.as_str()).collect();
        // b and d tie at 1.0, broken by docid
        assert_eq!(ids, vec!["b", "d", "c"]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("idx").join("passages.db");
        let index = DenseIndex::create(&path).await.unwrap();

        let written = index
            .add_passages(vec![
                passage("p1", vec![1.0, 0.0, 0.0]),
                passage("p2", vec![0.0, 1.0, 0.0]),
                passage("p3", vec![0.7, 0.7, 0.0]),
            ])
            .await
            .unwrap();
        assert_eq!(written, 3);
        assert_eq!(index.len().await.unwrap(), 3);
        assert_eq!(index.dimension().await.unwrap(), Some(3));

        let reopened = DenseIndex::open(&path).await.unwrap();
        let hits = reopened.search(&[0.9, 0.1, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].docid, "p1");
        assert_eq!(hits[1].docid, "p3");
        assert!(hits[0].score >= hits[1].score);

        assert!(matches!(
            reopened.search(&[1.0, 0.0], 2).await,
            Err(HydeError::Search(_))
        ));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let index = DenseIndex::create(dir.path().join("i.db")).await.unwrap();
        index.add_passages(vec![passage("p1", vec![1.0, 0.0])]).await.unwrap();

        let err = index.add_passages(vec![passage("p2", vec![1.0, 0.0, 0.0])]).await;
        assert!(matches!(err, Err(HydeError::InvalidInput(_))));

        let err = index
            .add_passages(vec![passage("p3", vec![1.0]), passage("p4", vec![1.0, 2.0])])
            .await;
        assert!(matches!(err, Err(HydeError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_open_missing_index() {
        let dir = TempDir::new().unwrap();
        assert!(DenseIndex::open(dir.path().join("missing.db")).await.is_err());
    }

    #[tokio::test]
    async fn test_meta() {
        let dir = TempDir::new().unwrap();
        let index = DenseIndex::create(dir.path().join("i.db")).await.unwrap();
        assert_eq!(index.meta("encoder").await.unwrap(), None);
        index.set_meta("encoder", "nomic-embed-text").await.unwrap();
        assert_eq!(
            index.meta("encoder").await.unwrap().as_deref(),
            Some("nomic-embed-text")
        );
    }
}
