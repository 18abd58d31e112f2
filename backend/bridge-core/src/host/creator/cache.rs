//! On-disk record of the last project-creating submission.
//!
//! Replacing the workspace folder restarts the editor host, so the submission
//! that triggered it is written to disk first and replayed on the next start.

use crate::error::HostError;
use crate::host::creator::CreatorModeState;
use crate::protocol::catalog::SubmitIdea;

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info};
use serde::{Deserialize, Serialize};

pub const CACHE_FILE_NAME: &str = "creator_submission.json";

/// What is written to [`CACHE_FILE_NAME`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSubmission {
    pub submission: SubmitIdea,
    pub creator_state: CreatorModeState,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl CachedSubmission {
    fn age(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.timestamp))
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionCache {
    path: PathBuf,
}

impl SubmissionCache {
    /// Cache stored as `creator_submission.json` inside `dir`.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(CACHE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `submission` with the current time, via temp file + rename.
    pub async fn store(&self, submission: &SubmitIdea, creator_state: CreatorModeState) -> Result<(), HostError> {
        let record = CachedSubmission {
            submission: submission.clone(),
            creator_state,
            timestamp: now_ms(),
        };
        self.write(&record).await
    }

    pub(crate) async fn write(&self, record: &CachedSubmission) -> Result<(), HostError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HostError::cache(parent, e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| HostError::cache(&self.path, e.to_string()))?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| HostError::cache(&temp_path, e.to_string()))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| HostError::cache(&self.path, e.to_string()))?;

        debug!("Cached creator submission at {}", self.path.display());
        Ok(())
    }

    /// Read the cached record, if any.
    pub async fn load(&self) -> Result<Option<CachedSubmission>, HostError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(HostError::cache(&self.path, e.to_string())),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| HostError::cache(&self.path, e.to_string()))
    }

    /// The cached record if it is younger than `max_age`.
    ///
    /// With `clear`, the file is removed afterwards whether or not it was fresh.
    pub async fn take_fresh(&self, max_age: Duration, clear: bool) -> Result<Option<CachedSubmission>, HostError> {
        let record = self.load().await?;

        let fresh = record.filter(|record| {
            let age = record.age(now_ms());
            if age < max_age {
                true
            } else {
                info!("Cached creator submission is stale ({age:?} old), not replaying");
                false
            }
        });

        if clear {
            self.clear().await?;
        }

        Ok(fresh)
    }

    pub async fn clear(&self) -> Result<(), HostError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Cleared creator submission cache");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HostError::cache(&self.path, e.to_string())),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
