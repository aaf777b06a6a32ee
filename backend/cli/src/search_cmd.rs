//! `ocrgrep search`: query a saved index.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use ocrgrep_core::{write_json, Document, DocumentIndex};

/// Print one `fileName<TAB>filePath` line per match and optionally write the
/// matches as JSON.
pub async fn run(index_file: &Path, query: &str, results_file: Option<&Path>) -> Result<()> {
    let index = DocumentIndex::load(index_file).await?;
    let matches = ocrgrep_query::search(index.documents(), query)
        .with_context(|| format!("Invalid query: {query}"))?;

    write_matches(&mut std::io::stdout().lock(), &matches)?;

    if let Some(path) = results_file {
        write_json(path, &matches).await?;
        info!(path = %path.display(), matched = matches.len(), "Query results saved");
    }
    Ok(())
}

fn write_matches<W: Write>(out: &mut W, matches: &[&Document]) -> std::io::Result<()> {
    for doc in matches {
        writeln!(out, "{}\t{}", doc.identifier, doc.source_path.display())?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> DocumentIndex {
        [
            Document::new("bread.png", "/site/docs/_images/bread.png", ["salt", "dough"]),
            Document::new("lake.jpg", "/site/docs/_images/lake.jpg", ["water"]),
            Document::new("brine.png", "/site/releasenotes/_images/brine.png", ["salt", "water"]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn prints_name_and_path_per_match() {
        let index = sample_index();
        let matches = ocrgrep_query::search(index.documents(), "salt & !water").unwrap();
        let mut out = Vec::new();
        write_matches(&mut out, &matches).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "bread.png\t/site/docs/_images/bread.png\n"
        );
    }

    #[tokio::test]
    async fn writes_results_file() {
        let dir = tempfile::tempdir().unwrap();
        let index_file = dir.path().join("ocr_results.json");
        let results_file = dir.path().join("out/query_results.json");
        sample_index().save(&index_file).await.unwrap();

        run(&index_file, "WATER", Some(&results_file)).await.unwrap();

        let saved = DocumentIndex::load(&results_file).await.unwrap();
        let names: Vec<_> = saved.documents().iter().map(|d| d.identifier.as_str()).collect();
        assert_eq!(names, vec!["lake.jpg", "brine.png"]);
    }

    #[tokio::test]
    async fn syntax_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let index_file = dir.path().join("ocr_results.json");
        sample_index().save(&index_file).await.unwrap();

        let err = run(&index_file, "salt &", None).await.unwrap_err();
        let text = format!("{err:#}");
        assert!(text.contains("Invalid query"));
        assert!(text.contains("unexpected end of query"));
    }

    #[tokio::test]
    async fn missing_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&dir.path().join("absent.json"), "salt", None).await.is_err());
    }
}
