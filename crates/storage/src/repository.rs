use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smartkids_core::model::{Profile, ProfileError, SchoolGrade, SetsCompleted};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::json_file::JsonFileRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("io error: {0}")]
    Io(String),

    #[error("corrupt data: {0}")]
    Corrupt(String),
}

/// Persisted shape for the learner profile.
///
/// This mirrors the domain `Profile` so repositories can serialize and
/// deserialize without leaking storage concerns into the domain layer. Field
/// names are part of the on-disk format and must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub name: String,
    pub grade: SchoolGrade,
    pub streak: u32,
    pub coins: u32,
    pub points: u32,
    pub trophies: u32,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub sets_completed: SetsCompleted,
}

impl ProfileRecord {
    #[must_use]
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            name: profile.name().to_owned(),
            grade: profile.grade(),
            streak: profile.streak(),
            coins: profile.coins(),
            points: profile.points(),
            trophies: profile.trophies(),
            avatar_url: profile.avatar_url().map(str::to_owned),
            sets_completed: profile.sets_completed(),
        }
    }

    /// Convert the record back into a domain `Profile`.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` if the persisted name or avatar fails
    /// validation.
    pub fn into_profile(self) -> Result<Profile, ProfileError> {
        Profile::from_parts(
            &self.name,
            self.grade,
            self.streak,
            self.coins,
            self.points,
            self.trophies,
            self.avatar_url.as_deref(),
            self.sets_completed,
        )
    }
}

/// Repository contract for the single learner profile.
///
/// The app keeps exactly one profile per installation, so the contract is a
/// whole-record load and save rather than keyed access.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch the stored profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when nothing has been saved yet, or
    /// other storage errors.
    async fn load_profile(&self) -> Result<ProfileRecord, StorageError>;

    /// Persist the profile, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn save_profile(&self, record: &ProfileRecord) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    profile: Arc<Mutex<Option<ProfileRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            profile: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn load_profile(&self) -> Result<ProfileRecord, StorageError> {
        let guard = self
            .profile
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        guard.clone().ok_or(StorageError::NotFound)
    }

    async fn save_profile(&self, record: &ProfileRecord) -> Result<(), StorageError> {
        let mut guard = self
            .profile
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        *guard = Some(record.clone());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            profiles: Arc::new(InMemoryRepository::new()),
        }
    }

    /// Storage backed by a JSON file at `path`.
    #[must_use]
    pub fn json_file(path: impl Into<PathBuf>) -> Self {
        Self {
            profiles: Arc::new(JsonFileRepository::new(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartkids_core::model::{Subject, Variant};

    fn build_record() -> ProfileRecord {
        let mut profile = Profile::new(
            "Lily",
            SchoolGrade::new(3).unwrap(),
            Some("https://api.dicebear.com/7.x/adventurer/svg?seed=Mimi"),
        )
        .unwrap();
        profile.apply_completed_set(Subject::Math, 40);
        ProfileRecord::from_profile(&profile)
    }

    #[tokio::test]
    async fn load_before_save_reports_not_found() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.load_profile().await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn round_trips_profile_with_counters() {
        let repo = InMemoryRepository::new();
        let record = build_record();
        repo.save_profile(&record).await.unwrap();

        let fetched = repo.load_profile().await.unwrap();
        assert_eq!(fetched, record);

        let profile = fetched.into_profile().unwrap();
        assert_eq!(profile.points(), 40);
        assert_eq!(profile.coins(), 20);
        assert_eq!(profile.trophies(), 1);
        assert_eq!(profile.sets_completed().get(Subject::Math), 1);
    }

    #[tokio::test]
    async fn save_replaces_previous_record() {
        let repo = InMemoryRepository::new();
        repo.save_profile(&build_record()).await.unwrap();

        let renamed = ProfileRecord {
            name: "Teo".to_string(),
            ..build_record()
        };
        repo.save_profile(&renamed).await.unwrap();

        assert_eq!(repo.load_profile().await.unwrap().name, "Teo");
    }

    #[test]
    fn record_rejects_invalid_persisted_profile() {
        let record = ProfileRecord {
            name: "   ".to_string(),
            ..ProfileRecord::from_profile(&Profile::default_for(Variant::Standard))
        };
        assert!(record.into_profile().is_err());
    }

    #[test]
    fn record_keeps_on_disk_field_names() {
        let record = build_record();
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("setsCompleted").is_some());
        assert!(json.get("avatarUrl").is_some());
        assert_eq!(json["grade"], 3);
    }
}
