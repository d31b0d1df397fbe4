//! Durable per-thread checkpoints for the agent loop.
//!
//! A checkpoint is written after every node the loop runs, so a suspended
//! thread can be resumed by a later call (or a later process, with
//! [`FileCheckpointer`]) exactly where it stopped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::state::ConversationState;
use crate::error::CheckpointError;

/// Node of the plan/act/suspend state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopNode {
    Plan,
    Act,
    Suspend,
}

impl std::fmt::Display for LoopNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoopNode::Plan => "plan",
            LoopNode::Act => "act",
            LoopNode::Suspend => "suspend",
        };
        f.write_str(name)
    }
}

/// A pending request for external input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspensionPoint {
    pub id: String,
    /// Opaque payload; for the agent loop, a serialized assistant turn.
    pub payload: Value,
}

impl SuspensionPoint {
    pub fn new(payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            payload,
        }
    }
}

/// Everything needed to continue a thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub state: ConversationState,
    /// Node to run next; `None` once the loop has exited.
    #[serde(default)]
    pub next: Option<LoopNode>,
    #[serde(default)]
    pub pending: Vec<SuspensionPoint>,
    /// Nodes run in the current turn.
    #[serde(default)]
    pub step: usize,
}

impl Checkpoint {
    pub fn new(state: ConversationState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }
}

/// Storage for thread checkpoints.
///
/// At most one in-flight call may drive a given thread id.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    async fn save(&self, thread_id: &str, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    async fn list_pending_suspensions(
        &self,
        thread_id: &str,
    ) -> Result<Vec<SuspensionPoint>, CheckpointError> {
        Ok(self
            .load(thread_id)
            .await?
            .map(|c| c.pending)
            .unwrap_or_default())
    }
}

/// In-process checkpoints, kept for the lifetime of the store.
#[derive(Default)]
pub struct MemoryCheckpointer {
    threads: RwLock<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.threads.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.threads.read().await.is_empty()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn save(&self, thread_id: &str, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        self.threads
            .write()
            .await
            .insert(thread_id.to_string(), checkpoint.clone());
        Ok(())
    }
}

/// One pretty-printed JSON file per thread under a directory.
pub struct FileCheckpointer {
    dir: PathBuf,
}

impl FileCheckpointer {
    /// Create a checkpointer rooted at `dir`; the directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `thread_id`. Characters outside `[A-Za-z0-9_-]` map to `_`.
    pub fn path_for(&self, thread_id: &str) -> Result<PathBuf, CheckpointError> {
        if thread_id.trim().is_empty() {
            return Err(CheckpointError::InvalidThreadId(thread_id.to_string()));
        }
        let name: String = thread_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Ok(self.dir.join(format!("{}.json", name)))
    }
}

#[async_trait]
impl Checkpointer for FileCheckpointer {
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let path = self.path_for(thread_id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn save(&self, thread_id: &str, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let path = self.path_for(thread_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let content = serde_json::to_string_pretty(checkpoint)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(thread_id, path = %path.display(), "Saved checkpoint");
        Ok(())
    }
}
