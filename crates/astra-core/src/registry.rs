//! File registry: durable id → metadata index plus blob files on disk.
//!
//! Blobs live under the upload directory named by their id; the index is a
//! single JSON object document (`files_index.json`) in the same directory,
//! loaded at startup and rewritten on every mutation. All mutations serialize
//! through one async mutex, and the index is persisted via temp-file + rename
//! so a crash mid-write cannot truncate it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

const INDEX_FILE_NAME: &str = "files_index.json";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("file storage error: {0}")]
    Storage(String),
}

/// Metadata for one uploaded file. Field names on the wire match the
/// frontend contract (`type`, `size`, `uploadedAt`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FileRecord {
    pub fn is_text(&self) -> bool {
        self.mime_type.starts_with("text/")
    }
}

/// Registry over an upload directory. Single writer: every mutation takes
/// the index mutex for its whole read-modify-write-persist cycle, so
/// `list`/`get` always reflect the latest completed mutation.
pub struct FileRegistry {
    upload_dir: PathBuf,
    index_path: PathBuf,
    max_file_size: usize,
    index: Mutex<Vec<FileRecord>>,
}

impl FileRegistry {
    /// Open (or create) a registry rooted at `upload_dir`, loading any
    /// existing index document.
    pub async fn open(upload_dir: impl Into<PathBuf>, max_file_size: usize) -> Result<Self, RegistryError> {
        let upload_dir = upload_dir.into();
        fs::create_dir_all(&upload_dir).await.map_err(|e| {
            RegistryError::Storage(format!(
                "failed to create upload directory '{}': {}",
                upload_dir.display(),
                e
            ))
        })?;

        let index_path = upload_dir.join(INDEX_FILE_NAME);
        let records = load_index(&index_path).await?;

        info!(
            path = %upload_dir.display(),
            files = records.len(),
            "File registry initialized"
        );

        Ok(Self {
            upload_dir,
            index_path,
            max_file_size,
            index: Mutex::new(records),
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    fn blob_path(&self, id: &str) -> PathBuf {
        self.upload_dir.join(id)
    }

    /// Store a blob and register its metadata. Enforces the size limit
    /// before anything touches disk; an oversized upload leaves no trace.
    pub async fn put(
        &self,
        name: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<FileRecord, RegistryError> {
        if data.len() > self.max_file_size {
            return Err(RegistryError::TooLarge {
                size: data.len(),
                max: self.max_file_size,
            });
        }

        let record = FileRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: data.len() as u64,
            uploaded_at: Utc::now(),
            tags: Vec::new(),
        };

        let mut index = self.index.lock().await;

        fs::write(self.blob_path(&record.id), data)
            .await
            .map_err(|e| RegistryError::Storage(format!("failed to write blob {}: {}", record.id, e)))?;

        index.push(record.clone());
        if let Err(e) = persist_index(&self.index_path, &index).await {
            // Roll the in-memory entry back so the index never claims a
            // mutation that was not made durable.
            index.pop();
            let _ = fs::remove_file(self.blob_path(&record.id)).await;
            return Err(e);
        }

        debug!(id = %record.id, name = %record.name, size = record.size, "Stored file");
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<FileRecord, RegistryError> {
        let index = self.index.lock().await;
        index
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// All records in registration order.
    pub async fn list(&self) -> Vec<FileRecord> {
        self.index.lock().await.clone()
    }

    /// Raw blob bytes. Fails `NotFound` when the id is absent from the index
    /// or the blob is missing on disk.
    pub async fn read_content(&self, id: &str) -> Result<Vec<u8>, RegistryError> {
        let record = self.get(id).await?;
        let path = self.blob_path(&record.id);
        if !path.exists() {
            warn!(id = %id, "Registry entry has no blob on disk");
            return Err(RegistryError::NotFound(id.to_string()));
        }
        fs::read(&path)
            .await
            .map_err(|e| RegistryError::Storage(format!("failed to read blob {}: {}", id, e)))
    }

    /// File content prepared for prompt injection: inlined text (truncated to
    /// `max_chars`) for text mime types, a placeholder description otherwise.
    pub async fn content_for_prompt(
        &self,
        id: &str,
        max_chars: usize,
    ) -> Result<String, RegistryError> {
        let record = self.get(id).await?;
        if !record.is_text() {
            return Ok(format!(
                "File: {} (type: {}, {} bytes; content not inlined)",
                record.name, record.mime_type, record.size
            ));
        }

        let bytes = self.read_content(id).await?;
        let text = String::from_utf8_lossy(&bytes);
        if text.chars().count() > max_chars {
            let truncated: String = text.chars().take(max_chars).collect();
            Ok(format!("{}...", truncated))
        } else {
            Ok(text.into_owned())
        }
    }

    /// Remove the blob and its index entry.
    pub async fn delete(&self, id: &str) -> Result<(), RegistryError> {
        let mut index = self.index.lock().await;
        let position = index
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let blob = self.blob_path(id);
        if blob.exists() {
            fs::remove_file(&blob)
                .await
                .map_err(|e| RegistryError::Storage(format!("failed to delete blob {}: {}", id, e)))?;
        }

        let removed = index.remove(position);
        if let Err(e) = persist_index(&self.index_path, &index).await {
            index.insert(position, removed);
            return Err(e);
        }

        debug!(id = %id, "Deleted file");
        Ok(())
    }

    pub async fn count(&self) -> usize {
        self.index.lock().await.len()
    }

    pub async fn total_bytes(&self) -> u64 {
        self.index.lock().await.iter().map(|r| r.size).sum()
    }

    /// Files uploaded within the trailing `window`.
    pub async fn recent_uploads(&self, window: chrono::Duration) -> usize {
        let cutoff = Utc::now() - window;
        self.index
            .lock()
            .await
            .iter()
            .filter(|r| r.uploaded_at >= cutoff)
            .count()
    }
}

async fn load_index(path: &Path) -> Result<Vec<FileRecord>, RegistryError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| RegistryError::Storage(format!("failed to read index: {}", e)))?;

    // The document is a JSON object mapping id -> metadata; serde_json's
    // preserve_order keeps registration order across reloads.
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)
        .map_err(|e| RegistryError::Storage(format!("corrupt index document: {}", e)))?;

    let mut records = Vec::with_capacity(map.len());
    for (id, value) in map {
        let record: FileRecord = serde_json::from_value(value)
            .map_err(|e| RegistryError::Storage(format!("corrupt index entry {}: {}", id, e)))?;
        records.push(record);
    }
    Ok(records)
}

async fn persist_index(path: &Path, records: &[FileRecord]) -> Result<(), RegistryError> {
    let mut map = serde_json::Map::with_capacity(records.len());
    for record in records {
        let value = serde_json::to_value(record)
            .map_err(|e| RegistryError::Storage(format!("failed to serialize index: {}", e)))?;
        map.insert(record.id.clone(), value);
    }
    let body = serde_json::to_string_pretty(&serde_json::Value::Object(map))
        .map_err(|e| RegistryError::Storage(format!("failed to serialize index: {}", e)))?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body)
        .await
        .map_err(|e| RegistryError::Storage(format!("failed to write index: {}", e)))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| RegistryError::Storage(format!("failed to replace index: {}", e)))?;
    Ok(())
}
