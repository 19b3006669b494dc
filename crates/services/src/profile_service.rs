use std::sync::Arc;

use tracing::{info, warn};

use smartkids_core::model::{Profile, SchoolGrade, SessionOutcome, Subject, Variant};
use storage::repository::{ProfileRecord, ProfileRepository, StorageError};

use crate::error::ProfileServiceError;

/// Owns the learner profile for the lifetime of the process.
///
/// The profile is loaded once at startup; every mutation persists before
/// returning, so the stored blob never lags behind what the learner sees.
pub struct ProfileService {
    repository: Arc<dyn ProfileRepository>,
    variant: Variant,
    profile: Profile,
}

impl ProfileService {
    /// Loads the stored profile, or the edition default when nothing usable
    /// is stored yet.
    ///
    /// A missing or corrupt blob is not an error: the learner gets a fresh
    /// profile and the corrupt one is overwritten on the next mutation.
    ///
    /// # Errors
    ///
    /// Returns storage failures other than absence or corruption.
    pub async fn load(
        repository: Arc<dyn ProfileRepository>,
        variant: Variant,
    ) -> Result<Self, ProfileServiceError> {
        let profile = match repository.load_profile().await {
            Ok(record) => match record.into_profile() {
                Ok(profile) => profile,
                Err(err) => {
                    warn!(%err, "stored profile is unusable, starting fresh");
                    Profile::default_for(variant)
                }
            },
            Err(StorageError::NotFound) => Profile::default_for(variant),
            Err(StorageError::Corrupt(detail)) => {
                warn!(detail, "stored profile is corrupt, starting fresh");
                Profile::default_for(variant)
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            repository,
            variant,
            profile,
        })
    }

    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Whether the learner has already replaced the edition's placeholder
    /// name. Returning learners skip onboarding.
    #[must_use]
    pub fn is_returning(&self) -> bool {
        self.profile.has_custom_name(self.variant)
    }

    /// # Errors
    ///
    /// Rejects blank names; propagates persistence failures.
    pub async fn rename(&mut self, name: &str) -> Result<(), ProfileServiceError> {
        self.profile.rename(name)?;
        self.persist().await
    }

    /// # Errors
    ///
    /// Propagates persistence failures.
    pub async fn set_grade(&mut self, grade: SchoolGrade) -> Result<(), ProfileServiceError> {
        self.profile.set_grade(grade);
        self.persist().await
    }

    /// # Errors
    ///
    /// Rejects invalid URLs; propagates persistence failures.
    pub async fn set_avatar(&mut self, url: &str) -> Result<(), ProfileServiceError> {
        self.profile.set_avatar_url(url)?;
        self.persist().await
    }

    /// Applies a completed set's rewards to the profile and persists it.
    ///
    /// Only a completed set ever reaches this; an abandoned session leaves
    /// the profile untouched.
    ///
    /// # Errors
    ///
    /// Propagates persistence failures.
    pub async fn finalize_session(
        &mut self,
        subject: Subject,
        session_points: u32,
    ) -> Result<SessionOutcome, ProfileServiceError> {
        let outcome = self.profile.apply_completed_set(subject, session_points);
        self.persist().await?;
        info!(
            %subject,
            points = outcome.session_points,
            coins = outcome.coins_earned,
            trophy = outcome.trophy_earned,
            "set finalized"
        );
        Ok(outcome)
    }

    async fn persist(&self) -> Result<(), ProfileServiceError> {
        let record = ProfileRecord::from_profile(&self.profile);
        self.repository.save_profile(&record).await?;
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use storage::repository::InMemoryRepository;

    struct BrokenRepository {
        error: fn() -> StorageError,
    }

    #[async_trait]
    impl ProfileRepository for BrokenRepository {
        async fn load_profile(&self) -> Result<ProfileRecord, StorageError> {
            Err((self.error)())
        }

        async fn save_profile(&self, _record: &ProfileRecord) -> Result<(), StorageError> {
            Err((self.error)())
        }
    }

    #[tokio::test]
    async fn empty_storage_yields_the_edition_default() {
        let repository = Arc::new(InMemoryRepository::new());
        let service = ProfileService::load(repository, Variant::Standard)
            .await
            .unwrap();
        assert_eq!(service.profile().name(), "New Explorer");
        assert_eq!(service.profile().streak(), 1);
        assert!(!service.is_returning());
    }

    #[tokio::test]
    async fn junior_edition_has_its_own_default_name() {
        let repository = Arc::new(InMemoryRepository::new());
        let service = ProfileService::load(repository, Variant::Junior)
            .await
            .unwrap();
        assert_eq!(service.profile().name(), "Little Star");
    }

    #[tokio::test]
    async fn rename_persists_and_marks_returning() {
        let repository: Arc<dyn ProfileRepository> = Arc::new(InMemoryRepository::new());
        let mut service = ProfileService::load(Arc::clone(&repository), Variant::Standard)
            .await
            .unwrap();
        service.rename("Lily").await.unwrap();
        assert!(service.is_returning());

        let reloaded = ProfileService::load(repository, Variant::Standard)
            .await
            .unwrap();
        assert_eq!(reloaded.profile().name(), "Lily");
        assert!(reloaded.is_returning());
    }

    #[tokio::test]
    async fn blank_rename_is_rejected_and_not_persisted() {
        let repository: Arc<dyn ProfileRepository> = Arc::new(InMemoryRepository::new());
        let mut service = ProfileService::load(Arc::clone(&repository), Variant::Standard)
            .await
            .unwrap();
        assert!(service.rename("   ").await.is_err());

        let reloaded = ProfileService::load(repository, Variant::Standard)
            .await
            .unwrap();
        assert_eq!(reloaded.profile().name(), "New Explorer");
    }

    #[tokio::test]
    async fn finalize_session_applies_rewards_and_persists() {
        let repository: Arc<dyn ProfileRepository> = Arc::new(InMemoryRepository::new());
        let mut service = ProfileService::load(Arc::clone(&repository), Variant::Standard)
            .await
            .unwrap();

        let outcome = service.finalize_session(Subject::Math, 41).await.unwrap();
        assert_eq!(outcome.session_points, 41);
        assert_eq!(outcome.coins_earned, 20);
        assert!(outcome.trophy_earned);

        let reloaded = ProfileService::load(repository, Variant::Standard)
            .await
            .unwrap();
        assert_eq!(reloaded.profile().points(), 41);
        assert_eq!(reloaded.profile().coins(), 20);
        assert_eq!(reloaded.profile().trophies(), 1);
        assert_eq!(reloaded.profile().sets_completed().get(Subject::Math), 1);
    }

    #[tokio::test]
    async fn corrupt_blob_falls_back_to_default() {
        let repository = Arc::new(BrokenRepository {
            error: || StorageError::Corrupt("not json".into()),
        });
        let service = ProfileService::load(repository, Variant::Standard)
            .await
            .unwrap();
        assert_eq!(service.profile().name(), "New Explorer");
    }

    #[tokio::test]
    async fn io_failure_on_load_propagates() {
        let repository = Arc::new(BrokenRepository {
            error: || StorageError::Io("disk on fire".into()),
        });
        let err = ProfileService::load(repository, Variant::Standard).await;
        assert!(err.is_err());
    }
}
