//! Single-slot state marker
//!
//! Holds the classification of the last completed cycle so that alerts fire
//! on transitions only. The marker is a plain text file with one token; an
//! operator can read it or delete it to force the next notification.
//!
//! Writes go to a sibling temp file which is synced and then renamed over the
//! marker, so a crash mid-write leaves either the old or the new token.

use crate::domain::StateToken;
use crate::error::{KeepaliveError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last persisted token.
    ///
    /// A missing or unparseable marker reads as `Unknown`. Only an IO
    /// failure that leaves the marker unusable is an error.
    pub async fn read_last(&self) -> Result<StateToken> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state marker at {}, first run", self.path.display());
                return Ok(StateToken::Unknown);
            }
            Err(e) => {
                return Err(KeepaliveError::StateStore(format!(
                    "cannot read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let raw = String::from_utf8_lossy(&bytes);
        match StateToken::parse(&raw) {
            Some(token) => Ok(token),
            None => {
                warn!(
                    "State marker {} is corrupt ({:?}), treating as unknown",
                    self.path.display(),
                    raw.chars().take(32).collect::<String>()
                );
                Ok(StateToken::Unknown)
            }
        }
    }

    /// Atomically replace the marker with `token`
    pub async fn write_last(&self, token: StateToken) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.temp_path();
        let result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(format!("{}\n", token.as_str()).as_bytes())
                .await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(KeepaliveError::StateStore(format!(
                "cannot write {}: {}",
                self.path.display(),
                e
            )));
        }

        debug!("State marker {} <- {}", self.path.display(), token);
        Ok(())
    }

    /// Delete the marker so the next cycle notifies again
    pub async fn reset(&self) -> Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(KeepaliveError::StateStore(format!(
                "cannot remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Temp file next to the marker; the pid keeps overlapping runs apart
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "gw_state".to_string());
        self.path
            .with_file_name(format!("{}.{}.tmp", name, std::process::id()))
    }
}
