//! TREC run file output: `qid Q0 docid rank score tag`, one line per hit.

use crate::error::Result;
use crate::eval::replace_spaces_with_underscores;
use crate::index::SearchHit;
use std::io::Write;
use std::path::{Path, PathBuf};

/// `<run_directory>/run.<topics_name>.<style_with_underscores>.txt`
pub fn run_file_path(run_directory: &Path, topics_name: &str, style_label: &str) -> PathBuf {
    run_directory.join(format!(
        "run.{}.{}.txt",
        topics_name,
        replace_spaces_with_underscores(style_label)
    ))
}

/// Append the ranked hits for one query; ranks start at 1
pub fn write_trec_run<W: Write>(
    writer: &mut W,
    query_id: &str,
    hits: &[SearchHit],
    tag: &str,
) -> Result<()> {
    for (rank, hit) in hits.iter().enumerate() {
        writeln!(
            writer,
            "{} Q0 {} {} {:.6} {}",
            query_id,
            hit.docid,
            rank + 1,
            hit.score,
            tag
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_trec_run() {
        let hits = vec![
            SearchHit {
                docid: "7067032".to_string(),
                score: 0.91,
            },
            SearchHit {
                docid: "12".to_string(),
                score: 0.5,
            },
        ];
        let mut buf = Vec::new();
        write_trec_run(&mut buf, "1037798", &hits, "hyde").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "1037798 Q0 7067032 1 0.910000 hyde\n1037798 Q0 12 2 0.500000 hyde\n"
        );
    }

    #[test]
    fn test_run_file_path() {
        let path = run_file_path(Path::new("runs"), "dl19-passage", "web search novice");
        assert_eq!(path, Path::new("runs/run.dl19-passage.web_search_novice.txt"));
    }
}
