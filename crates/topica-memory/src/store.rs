// SPDX-FileCopyrightText: 2026 Topica Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for long-term memory and per-session topic records.
//!
//! Layout under the data directory:
//!
//! ```text
//! longterm_memory/{user}/facts.json
//! longterm_memory/{user}/notepad.md
//! longterm_memory/{user}/all_session_topics.json
//! longterm_memory/{user}/all_session_topics.embeddings
//! sessions/{user}.{n}/topics.json
//! sessions/{user}.{n}/topics.embeddings
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use topica_core::TopicaError;
use topica_core::error::storage_err;
use tracing::{debug, info};

use crate::long_term::{ClearScope, UserMemorySnapshot};
use crate::types::{ArchivedTopic, Fact, Topic};

const FACTS_FILE: &str = "facts.json";
const NOTEPAD_FILE: &str = "notepad.md";
const ARCHIVE_FILE: &str = "all_session_topics.json";
const ARCHIVE_EMBEDDINGS_FILE: &str = "all_session_topics.embeddings";
const SESSION_TOPICS_FILE: &str = "topics.json";
const SESSION_EMBEDDINGS_FILE: &str = "topics.embeddings";

/// Topics produced by one session, kept for inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub session_number: u32,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub topics: Vec<Topic>,
}

impl SessionRecord {
    fn embeddings(&self) -> BTreeMap<String, Vec<f32>> {
        self.topics
            .iter()
            .filter_map(|t| Some((t.id.clone(), t.embedding.clone()?)))
            .collect()
    }
}

#[derive(Serialize, Deserialize)]
struct ArchiveFile {
    topics: Vec<ArchivedTopic>,
}

/// Storage backend for user memory.
#[async_trait]
pub trait MemoryStorage: Send + Sync {
    /// Load a user's long-term memory. Missing files load as empty.
    async fn load_user(&self, username: &str) -> Result<UserMemorySnapshot, TopicaError>;

    /// Replace a user's long-term memory on disk.
    async fn save_user(&self, username: &str, snapshot: &UserMemorySnapshot) -> Result<(), TopicaError>;

    /// Write the record of one finished session.
    async fn save_session(&self, username: &str, record: &SessionRecord) -> Result<(), TopicaError>;

    /// One more than the highest session number stored for the user.
    async fn next_session_number(&self, username: &str) -> Result<u32, TopicaError>;

    /// Delete the selected parts of a user's long-term memory.
    async fn clear_user(&self, username: &str, scope: ClearScope) -> Result<(), TopicaError>;
}

/// Reject usernames that would escape the data directory.
pub fn validate_username(username: &str) -> Result<(), TopicaError> {
    let valid = !username.is_empty()
        && username != "."
        && username != ".."
        && !username.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(TopicaError::Config(format!("invalid username `{username}`")))
    }
}

/// JSON and markdown files under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_dir(&self, username: &str) -> PathBuf {
        self.root.join("longterm_memory").join(username)
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }
}

async fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, TopicaError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => Ok(T::default()),
        Ok(content) => serde_json::from_str(&content).map_err(storage_err),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(storage_err(e)),
    }
}

async fn read_text(path: &Path) -> Result<String, TopicaError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(storage_err(e)),
    }
}

/// Write via a temporary sibling and rename, so readers never see a
/// partial file.
async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), TopicaError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(storage_err)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, content).await.map_err(storage_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(storage_err)
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), TopicaError> {
    let json = serde_json::to_vec_pretty(value).map_err(storage_err)?;
    write_atomic(path, &json).await
}

async fn remove_if_exists(path: &Path) -> Result<(), TopicaError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(storage_err(e)),
    }
}

#[async_trait]
impl MemoryStorage for FileStore {
    async fn load_user(&self, username: &str) -> Result<UserMemorySnapshot, TopicaError> {
        validate_username(username)?;
        let dir = self.user_dir(username);

        let facts: BTreeMap<String, Fact> = read_json(&dir.join(FACTS_FILE)).await?;
        let notepad = read_text(&dir.join(NOTEPAD_FILE)).await?;
        let archive: Option<ArchiveFile> = read_json(&dir.join(ARCHIVE_FILE)).await?;
        let embeddings: BTreeMap<String, Vec<f32>> = read_json(&dir.join(ARCHIVE_EMBEDDINGS_FILE)).await?;

        let snapshot = UserMemorySnapshot {
            facts,
            notepad,
            archive: archive.map(|a| a.topics).unwrap_or_default(),
            embeddings,
        };
        debug!(
            user = username,
            facts = snapshot.facts.len(),
            topics = snapshot.archive.len(),
            "loaded long-term memory"
        );
        Ok(snapshot)
    }

    async fn save_user(&self, username: &str, snapshot: &UserMemorySnapshot) -> Result<(), TopicaError> {
        validate_username(username)?;
        let dir = self.user_dir(username);

        write_json(&dir.join(FACTS_FILE), &snapshot.facts).await?;
        write_atomic(&dir.join(NOTEPAD_FILE), snapshot.notepad.as_bytes()).await?;
        write_json(
            &dir.join(ARCHIVE_FILE),
            &ArchiveFile {
                topics: snapshot.archive.clone(),
            },
        )
        .await?;
        write_json(&dir.join(ARCHIVE_EMBEDDINGS_FILE), &snapshot.embeddings).await?;

        info!(user = username, topics = snapshot.archive.len(), "saved long-term memory");
        Ok(())
    }

    async fn save_session(&self, username: &str, record: &SessionRecord) -> Result<(), TopicaError> {
        validate_username(username)?;
        let dir = self
            .sessions_dir()
            .join(format!("{username}.{}", record.session_number));

        write_json(&dir.join(SESSION_TOPICS_FILE), record).await?;
        write_json(&dir.join(SESSION_EMBEDDINGS_FILE), &record.embeddings()).await?;
        debug!(user = username, session = record.session_number, "saved session record");
        Ok(())
    }

    async fn next_session_number(&self, username: &str) -> Result<u32, TopicaError> {
        validate_username(username)?;
        let mut entries = match tokio::fs::read_dir(self.sessions_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(1),
            Err(e) => return Err(storage_err(e)),
        };

        let prefix = format!("{username}.");
        let mut highest = 0u32;
        while let Some(entry) = entries.next_entry().await.map_err(storage_err)? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(n) = name.strip_prefix(&prefix).and_then(|s| s.parse::<u32>().ok()) {
                highest = highest.max(n);
            }
        }
        Ok(highest + 1)
    }

    async fn clear_user(&self, username: &str, scope: ClearScope) -> Result<(), TopicaError> {
        validate_username(username)?;
        let dir = self.user_dir(username);
        if scope.facts {
            remove_if_exists(&dir.join(FACTS_FILE)).await?;
        }
        if scope.topics {
            remove_if_exists(&dir.join(ARCHIVE_FILE)).await?;
            remove_if_exists(&dir.join(ARCHIVE_EMBEDDINGS_FILE)).await?;
        }
        if scope.notepad {
            remove_if_exists(&dir.join(NOTEPAD_FILE)).await?;
        }
        info!(user = username, ?scope, "cleared stored memory");
        Ok(())
    }
}
