//! Documents built from recognition output, and the ordered index the search
//! engine runs over.
//!
//! A document's word set is normalised once at construction: lowercased,
//! punctuation stripped (hyphens kept), tokens of two characters or fewer
//! dropped. Queries are lowercased the same way, so matching never needs a
//! case-insensitive comparison.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::types::RecognizedText;

/// Everything that is not a word character, whitespace, or a hyphen.
static STRIP_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\-\w\s]").unwrap());

/// Tokens must be longer than this many characters to be indexed.
const MIN_WORD_CHARS: usize = 2;

/// Split free text into the normalised, deduplicated word list used for
/// matching. Order of first appearance is kept.
pub fn extract_words(text: &str) -> Vec<String> {
    let stripped = STRIP_PATTERN.replace_all(text, "");
    let lowered = stripped.to_lowercase();

    let mut seen = BTreeSet::new();
    lowered
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_WORD_CHARS)
        .filter(|w| seen.insert(*w))
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One searchable image: its name, where it lives, and the words found in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(rename = "fileName")]
    pub identifier: String,
    #[serde(rename = "filePath")]
    pub source_path: PathBuf,
    #[serde(deserialize_with = "lowercase_words")]
    words: BTreeSet<String>,
}

impl Document {
    pub fn new<I, S>(identifier: impl Into<String>, source_path: impl Into<PathBuf>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            identifier: identifier.into(),
            source_path: source_path.into(),
            words: words.into_iter().map(|w| w.as_ref().to_lowercase()).collect(),
        }
    }

    /// Build a document from the text runs recognized in `path`.
    ///
    /// Returns `None` when the image produced no text at all; such images are
    /// not indexed.
    pub fn from_recognition(path: &Path, items: &[RecognizedText]) -> Option<Self> {
        let full_text = items
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        if full_text.trim().is_empty() {
            debug!(path = %path.display(), "No text detected in image");
            return None;
        }

        let identifier = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Some(Self::new(identifier, path, extract_words(&full_text)))
    }

    pub fn words(&self) -> &BTreeSet<String> {
        &self.words
    }

    /// Membership test against an already-lowercased word.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }
}

fn lowercase_words<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|w| w.to_lowercase()).collect())
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// Ordered collection of documents. Order is the order images were
/// recognized in and is preserved by search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentIndex {
    documents: Vec<Document>,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, document: Document) {
        self.documents.push(document);
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Read an index previously written by [`DocumentIndex::save`].
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read index file: {}", path.display()))?;
        let index: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse index file: {}", path.display()))?;
        info!(path = %path.display(), documents = index.len(), "Loaded document index");
        Ok(index)
    }

    /// Write the index as pretty-printed JSON, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<()> {
        write_json(path, &self.documents).await?;
        info!(path = %path.display(), documents = self.len(), "Saved document index");
        Ok(())
    }
}

impl FromIterator<Document> for DocumentIndex {
    fn from_iter<T: IntoIterator<Item = Document>>(iter: T) -> Self {
        Self {
            documents: iter.into_iter().collect(),
        }
    }
}

/// Serialize `value` as pretty JSON to `path`.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    Ok(())
}
