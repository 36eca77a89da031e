//! Loading chat-log exports from disk.
//!
//! An export document is either a JSON array of message objects or a JSON
//! object holding that array under `messages` (or `Messages`). Every document
//! is normalized into [`ExportMessage`] values and concatenated in load order;
//! the final chronological order is decided later by the extractor.
//!
//! Loading is all-or-nothing: the first unreadable or malformed document
//! aborts with an [`ExportError`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{json_kind, ExportError};
use crate::model::export_message::ExportMessage;

/// Progress callback for multi-document loads.
/// Receives a message describing the current step and a progress fraction (0.0..1.0).
pub type ProgressCallback = Arc<dyn Fn(String, f32) + Send + Sync>;

/// Field names that may wrap the message list in object-shaped exports.
const MESSAGES_KEYS: [&str; 2] = ["messages", "Messages"];

/// Per-document load summary.
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    pub path: PathBuf,
    pub messages: usize,
}

/// All messages from a set of export documents, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub messages: Vec<ExportMessage>,
    pub documents: Vec<DocumentSummary>,
}

/// List every `*.json` file directly inside `dir`, sorted by file name.
///
/// Paths listed in `exclude` are skipped so the pair artifact written by a
/// previous run is never ingested as an export.
pub fn discover_exports(dir: &Path, exclude: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let excluded: Vec<PathBuf> = exclude
        .iter()
        .map(|p| fs::canonicalize(p).unwrap_or_else(|_| p.clone()))
        .collect();

    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() {
            continue;
        }
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if !is_json {
            continue;
        }
        let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if excluded.contains(&canonical) {
            debug!(path = %path.display(), "skipping excluded file");
            continue;
        }
        found.push(path);
    }
    found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(found)
}

/// Read and normalize a single export document.
pub fn load_document(path: &Path) -> Result<Vec<ExportMessage>, ExportError> {
    let raw = fs::read_to_string(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|source| ExportError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(path, &value)
}

/// Normalize an already-parsed export document.
///
/// `path` is only used to label errors.
pub fn parse_document(path: &Path, value: &Value) -> Result<Vec<ExportMessage>, ExportError> {
    let list: &[Value] = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => {
            let wrapped = MESSAGES_KEYS.iter().find_map(|k| obj.get(*k));
            match wrapped {
                None | Some(Value::Null) => &[],
                Some(Value::Array(items)) => items.as_slice(),
                Some(_) => {
                    return Err(ExportError::UnsupportedShape {
                        path: path.to_path_buf(),
                        found: "object with a non-list messages field",
                    })
                }
            }
        }
        other => {
            return Err(ExportError::UnsupportedShape {
                path: path.to_path_buf(),
                found: json_kind(other),
            })
        }
    };

    list.iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_object()
                .map(ExportMessage::from_json)
                .ok_or_else(|| ExportError::InvalidMessage {
                    path: path.to_path_buf(),
                    index,
                })
        })
        .collect()
}

/// Load every document in `paths` (in order) and concatenate their messages.
pub fn load_corpus(
    paths: &[PathBuf],
    progress: Option<ProgressCallback>,
) -> Result<Corpus, ExportError> {
    let mut corpus = Corpus::default();
    let total = paths.len().max(1) as f32;

    for (i, path) in paths.iter().enumerate() {
        if let Some(cb) = progress.as_ref() {
            cb(format!("Loading {}", path.display()), i as f32 / total);
        }
        let messages = load_document(path)?;
        debug!(path = %path.display(), messages = messages.len(), "loaded export");
        corpus.documents.push(DocumentSummary {
            path: path.clone(),
            messages: messages.len(),
        });
        corpus.messages.extend(messages);
    }

    if let Some(cb) = progress.as_ref() {
        cb(String::from("Loaded exports"), 1.0);
    }
    info!(
        documents = corpus.documents.len(),
        messages = corpus.messages.len(),
        "export corpus loaded"
    );
    Ok(corpus)
}
