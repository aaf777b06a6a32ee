//! `ocrgrep scan`: recognize every image and write the index.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use ocrgrep_config::OcrgrepConfig;
use ocrgrep_core::{write_json, Document, DocumentIndex, OcrResult, TextRecognizer};
use ocrgrep_query::Query;
use ocrgrep_worker::RecognitionClient;

use crate::config::worker_config;
use crate::discover::{find_image_folders, list_images};

/// Query run after a scan when `--demo-query` is given.
pub const DEMO_QUERY: &str = "water|(salt&dough)";

pub async fn run(config: &OcrgrepConfig, query: Option<&str>) -> Result<()> {
    let query = query
        .map(|q| Query::parse(q).with_context(|| format!("Invalid query: {q}")))
        .transpose()?;

    let folders = find_image_folders(&config.scan)?;
    if folders.is_empty() {
        bail!(
            "No '{}' folders found under {}",
            config.scan.folder_name,
            config.scan.base_dir.display()
        );
    }

    let images = list_images(&folders, &config.scan.extensions).await;
    if images.is_empty() {
        bail!("No images found in {} folder(s)", folders.len());
    }
    info!(folders = folders.len(), images = images.len(), "Discovered images");

    let mut recognizer = RecognitionClient::new(worker_config(config));
    let built = build_index(&mut recognizer, &config.worker.languages, &images).await;
    if let Err(e) = recognizer.shutdown().await {
        warn!(error = %e, "Worker did not shut down cleanly");
    }
    let index = built?;

    if index.is_empty() {
        bail!("No text recognized in any of {} image(s)", images.len());
    }
    index.save(&config.output.index_file).await?;
    info!(
        path = %config.output.index_file.display(),
        documents = index.len(),
        "OCR results saved"
    );

    if let Some(query) = query {
        let matches = query.filter(index.documents());
        info!(query = %query, matched = matches.len(), total = index.len(), "Search complete");
        if matches.is_empty() {
            info!(query = %query, "No documents matched; results file not written");
        } else {
            write_json(&config.output.results_file, &matches).await?;
            info!(path = %config.output.results_file.display(), matched = matches.len(), "Query results saved");
        }
    }
    Ok(())
}

/// Recognize `images` one at a time and collect a document per image with
/// text.
///
/// A failed image is logged and skipped. When the worker itself is lost the
/// next image starts a fresh one, which is initialized again first. If that
/// re-initialization fails the scan stops early and returns the documents
/// built so far; only a failed first initialization is an error.
pub async fn build_index<R>(recognizer: &mut R, languages: &[String], images: &[PathBuf]) -> OcrResult<DocumentIndex>
where
    R: TextRecognizer + ?Sized,
{
    recognizer.initialize(languages).await?;

    let mut index = DocumentIndex::new();
    let mut needs_init = false;
    for (n, path) in images.iter().enumerate() {
        if needs_init {
            if let Err(e) = recognizer.initialize(languages).await {
                warn!(
                    error = %e,
                    recognized = index.len(),
                    skipped = images.len() - n,
                    "Re-initialization failed; stopping scan early"
                );
                break;
            }
            needs_init = false;
        }

        info!(image = %path.display(), progress = %format!("{}/{}", n + 1, images.len()), "Processing image");
        match recognizer.recognize(path).await {
            Ok(items) => match Document::from_recognition(path, &items) {
                Some(document) => index.push(document),
                None => debug!(image = %path.display(), "No text found"),
            },
            Err(e) => {
                warn!(image = %path.display(), error = %e, "Error processing image");
                needs_init = e.is_worker_lost();
            }
        }
    }
    Ok(index)
}
