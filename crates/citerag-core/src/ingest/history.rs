//! Append-only log of ingested documents

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Kind of source an entry was ingested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    #[serde(rename = "PDF")]
    Pdf,
    File,
    Text,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::File => "File",
            Self::Text => "Text",
        }
    }
}

/// One successful ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// RFC 3339 timestamp
    pub date: String,
    pub chunk_count: usize,
}

impl HistoryEntry {
    pub fn new(name: impl Into<String>, entry_type: EntryType, chunk_count: usize) -> Self {
        Self::at(Utc::now(), name, entry_type, chunk_count)
    }

    pub fn at(
        when: DateTime<Utc>,
        name: impl Into<String>,
        entry_type: EntryType,
        chunk_count: usize,
    ) -> Self {
        Self {
            id: when.timestamp_millis().to_string(),
            name: name.into(),
            entry_type,
            date: when.to_rfc3339(),
            chunk_count,
        }
    }
}

/// Ingestion history store
#[async_trait]
pub trait HistoryLog: Send + Sync {
    /// Record one entry; prior entries are never rewritten
    async fn append(&self, entry: HistoryEntry) -> Result<()>;

    /// All entries, newest first
    async fn list(&self) -> Result<Vec<HistoryEntry>>;
}

/// History kept as a JSON array on disk
pub struct JsonFileHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Vec<HistoryEntry>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl HistoryLog for JsonFileHistory {
    async fn append(&self, entry: HistoryEntry) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut entries = self.read_entries().await?;
        entries.insert(0, entry);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Write then rename so readers never observe a half-written file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!("History now holds {} entries", entries.len());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<HistoryEntry>> {
        let _guard = self.lock.lock().await;
        self.read_entries().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_entry_wire_format() {
        let when = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let entry = HistoryEntry::at(when, "paper.pdf", EntryType::Pdf, 7);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["id"], "1714564800000");
        assert_eq!(json["name"], "paper.pdf");
        assert_eq!(json["type"], "PDF");
        assert_eq!(json["chunkCount"], 7);
        assert!(json["date"].as_str().unwrap().starts_with("2024-05-01T12:00:00"));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let history = JsonFileHistory::new(dir.path().join("history.json"));
        assert!(history.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_newest_first_and_prior_entries_untouched() {
        let dir = TempDir::new().unwrap();
        let history = JsonFileHistory::new(dir.path().join("nested/history.json"));

        let first = HistoryEntry::new("a.txt", EntryType::File, 1);
        let second = HistoryEntry::new("Pasted notes", EntryType::Text, 2);
        history.append(first.clone()).await.unwrap();
        history.append(second.clone()).await.unwrap();

        let entries = history.list().await.unwrap();
        assert_eq!(entries, vec![second, first]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_all_kept() {
        let dir = TempDir::new().unwrap();
        let history = Arc::new(JsonFileHistory::new(dir.path().join("history.json")));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let history = Arc::clone(&history);
                tokio::spawn(async move {
                    history
                        .append(HistoryEntry::new(format!("doc-{}", i), EntryType::Text, i))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(history.list().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(JsonFileHistory::new(path).list().await.is_err());
    }
}
