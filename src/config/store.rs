//! Configuration store and change notification.
//!
//! # Responsibilities
//! - Load and save the configuration document
//! - Raise a change event when the document is replaced externally
//!
//! # Design Decisions
//! - The store is an abstract collaborator; the orchestrator depends
//!   only on the `ConfigStore` trait, not on a storage medium
//! - Change events carry no payload; the consumer re-loads through the
//!   store so there is a single source of truth for the document
//! - A failed reload never replaces a working document downstream

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{parse_config, serialize_config, ConfigError};
use crate::config::schema::GatewayConfig;

/// Abstract persistence for the configuration document.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the current document. `Ok(None)` means no document exists yet.
    async fn load(&self) -> Result<Option<GatewayConfig>, ConfigError>;

    /// Replace the document wholesale.
    async fn save(&self, config: &GatewayConfig) -> Result<(), ConfigError>;
}

/// File-backed configuration store holding a single JSON document.
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start watching the backing file for external changes.
    ///
    /// Returns the watcher (which must be kept alive) and a receiver
    /// that yields one event per observed modification. Events carry no
    /// document; consumers re-load through the store.
    pub fn watch(&self) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<()>), notify::Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Config file change detected");
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, "Config watcher started");
        Ok((watcher, rx))
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self) -> Result<Option<GatewayConfig>, ConfigError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        parse_config(&content).map(Some)
    }

    async fn save(&self, config: &GatewayConfig) -> Result<(), ConfigError> {
        let content = serialize_config(config)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}
