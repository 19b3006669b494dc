use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::repository::{ProfileRecord, ProfileRepository, StorageError};

/// Profile store backed by a single JSON file.
///
/// Writes go to a sibling temp file followed by a rename, so a crash
/// mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

#[async_trait]
impl ProfileRepository for JsonFileRepository {
    async fn load_profile(&self) -> Result<ProfileRecord, StorageError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound);
            }
            Err(err) => return Err(StorageError::Io(err.to_string())),
        };
        serde_json::from_slice(&bytes).map_err(|err| StorageError::Corrupt(err.to_string()))
    }

    async fn save_profile(&self, record: &ProfileRecord) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|err| StorageError::Io(err.to_string()))?;
            }
        }

        let tmp = self.temp_path();
        fs::write(&tmp, &bytes)
            .await
            .map_err(|err| StorageError::Io(err.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| StorageError::Io(err.to_string()))?;
        Ok(())
    }
}
