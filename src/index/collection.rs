//! Passage collections in `docid<TAB>text` form, one passage per line.

use crate::error::{HydeError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Streaming reader over a collection file; blank lines are skipped.
pub struct CollectionReader {
    lines: Lines<BufReader<File>>,
    lineno: usize,
}

impl CollectionReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            HydeError::Parse(format!("Failed to open collection {}: {}", path.display(), e))
        })?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            lineno: 0,
        })
    }

    /// Up to `n` passages; an empty vec means the file is exhausted
    pub fn next_batch(&mut self, n: usize) -> Result<Vec<(String, String)>> {
        let mut batch = Vec::with_capacity(n);
        while batch.len() < n {
            match self.next() {
                Some(item) => batch.push(item?),
                None => break,
            }
        }
        Ok(batch)
    }
}

impl Iterator for CollectionReader {
    type Item = Result<(String, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.lineno += 1;
            match parse_line(self.lineno, &line) {
                Ok(Some(passage)) => return Some(Ok(passage)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// `docid<TAB>text`; None for a blank line
pub fn parse_line(lineno: usize, line: &str) -> Result<Option<(String, String)>> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Ok(None);
    }
    let (docid, text) = line.split_once('\t').ok_or_else(|| {
        HydeError::Parse(format!("collection line {}: expected docid<TAB>text", lineno))
    })?;
    let docid = docid.trim();
    if docid.is_empty() {
        return Err(HydeError::Parse(format!("collection line {}: empty docid", lineno)));
    }
    Ok(Some((docid.to_string(), text.trim().to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line(1, "0\tThe presence of communication amid scientific minds\r").unwrap(),
            Some((
                "0".to_string(),
                "The presence of communication amid scientific minds".to_string()
            ))
        );
        assert_eq!(parse_line(2, "   ").unwrap(), None);
        assert!(parse_line(3, "no tab").is_err());
        assert!(parse_line(4, "\ttext").is_err());
    }

    #[test]
    fn test_reader_batches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("collection.tsv");
        std::fs::write(&path, "a\tone\n\nb\ttwo\nc\tthree\n").unwrap();

        let mut reader = CollectionReader::open(&path).unwrap();
        let first = reader.next_batch(2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].0, "b");
        assert_eq!(reader.next_batch(2).unwrap().len(), 1);
        assert!(reader.next_batch(2).unwrap().is_empty());
    }
}
