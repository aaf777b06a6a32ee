//! Locating image folders and the images inside them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info, warn};

use ocrgrep_config::ScanSettings;

/// Every folder named `folder_name` at any depth below each root, in root
/// order and sorted within a root. Roots that don't exist contribute nothing.
pub fn find_image_folders(scan: &ScanSettings) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for root in &scan.roots {
        let root_dir = scan.base_dir.join(root);
        info!(dir = %root_dir.display(), "Searching for image folders");

        let base = root_dir
            .to_str()
            .with_context(|| format!("Path is not valid UTF-8: {}", root_dir.display()))?;
        let pattern = format!(
            "{}/**/{}",
            glob::Pattern::escape(base),
            glob::Pattern::escape(&scan.folder_name)
        );

        let before = folders.len();
        let entries = glob::glob(&pattern).with_context(|| format!("Invalid glob pattern: {pattern}"))?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_dir() => folders.push(path),
                Ok(_) => {}
                Err(e) => warn!(path = %e.path().display(), error = %e.error(), "Skipping unreadable path"),
            }
        }
        folders[before..].sort();
        if folders.len() == before {
            warn!(dir = %root_dir.display(), folder = %scan.folder_name, "No image folders found");
        }
    }
    Ok(folders)
}

/// Image files directly inside each folder, sorted by name within a folder.
/// An unreadable folder is logged and skipped.
pub async fn list_images(folders: &[PathBuf], extensions: &[String]) -> Vec<PathBuf> {
    let extensions: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut images = Vec::new();
    for folder in folders {
        match images_in(folder, &extensions).await {
            Ok(mut found) => {
                found.sort();
                debug!(folder = %folder.display(), count = found.len(), "Listed images");
                images.extend(found);
            }
            Err(e) => warn!(folder = %folder.display(), error = %e, "Error reading image folder"),
        }
    }
    images
}

async fn images_in(folder: &Path, extensions: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut entries = fs::read_dir(folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if has_extension(&path, extensions) && fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            found.push(path);
        }
    }
    Ok(found)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}
