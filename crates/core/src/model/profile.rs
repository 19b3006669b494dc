use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::grade::SchoolGrade;
use crate::model::subject::Subject;
use crate::model::variant::Variant;

/// Points a set must reach before it earns a trophy.
pub const TROPHY_POINTS: u32 = 30;

/// Stock avatar art, served by DiceBear. New profiles start on the first one.
pub const DEFAULT_AVATARS: [&str; 6] = [
    "https://api.dicebear.com/7.x/adventurer/svg?seed=Leo",
    "https://api.dicebear.com/7.x/adventurer/svg?seed=Mimi",
    "https://api.dicebear.com/7.x/adventurer/svg?seed=Coco",
    "https://api.dicebear.com/7.x/adventurer/svg?seed=Momo",
    "https://api.dicebear.com/7.x/adventurer/svg?seed=Tao",
    "https://api.dicebear.com/7.x/adventurer/svg?seed=Zuzu",
];

//
// ─── PROFILE TYPES ─────────────────────────────────────────────────────────────
//

/// Completed-set counters, one per subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetsCompleted {
    #[serde(rename = "Math", default)]
    math: u32,
    #[serde(rename = "Chinese", default)]
    chinese: u32,
    #[serde(rename = "English", default)]
    english: u32,
}

impl SetsCompleted {
    #[must_use]
    pub fn get(&self, subject: Subject) -> u32 {
        match subject {
            Subject::Math => self.math,
            Subject::Chinese => self.chinese,
            Subject::English => self.english,
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.math + self.chinese + self.english
    }

    fn bump(&mut self, subject: Subject) {
        let slot = match subject {
            Subject::Math => &mut self.math,
            Subject::Chinese => &mut self.chinese,
            Subject::English => &mut self.english,
        };
        *slot = slot.saturating_add(1);
    }
}

/// The learner's profile: identity plus every running reward counter.
///
/// Fields are private so the reward rule in [`Profile::apply_completed_set`]
/// stays the only way the counters move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    grade: SchoolGrade,
    streak: u32,
    coins: u32,
    points: u32,
    trophies: u32,
    avatar_url: Option<String>,
    sets_completed: SetsCompleted,
}

impl Profile {
    /// Creates a fresh profile with zeroed counters and a one-day streak.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::EmptyName`] for a blank name and
    /// [`ProfileError::InvalidAvatarUrl`] when the avatar is not an absolute
    /// URL.
    pub fn new(
        name: &str,
        grade: SchoolGrade,
        avatar_url: Option<&str>,
    ) -> Result<Self, ProfileError> {
        Ok(Self {
            name: validated_name(name)?,
            grade,
            streak: 1,
            coins: 0,
            points: 0,
            trophies: 0,
            avatar_url: validated_avatar(avatar_url)?,
            sets_completed: SetsCompleted::default(),
        })
    }

    /// Rehydrates a profile from persisted counters, re-running the same
    /// validation as [`Profile::new`].
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] if the persisted name or avatar URL is
    /// invalid.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        name: &str,
        grade: SchoolGrade,
        streak: u32,
        coins: u32,
        points: u32,
        trophies: u32,
        avatar_url: Option<&str>,
        sets_completed: SetsCompleted,
    ) -> Result<Self, ProfileError> {
        Ok(Self {
            name: validated_name(name)?,
            grade,
            streak,
            coins,
            points,
            trophies,
            avatar_url: validated_avatar(avatar_url)?,
            sets_completed,
        })
    }

    /// The starter profile an edition boots with before anyone signs in.
    #[must_use]
    pub fn default_for(variant: Variant) -> Self {
        Self {
            name: variant.default_name().to_string(),
            grade: SchoolGrade::ALL[0],
            streak: 1,
            coins: 0,
            points: 0,
            trophies: 0,
            avatar_url: Some(DEFAULT_AVATARS[0].to_string()),
            sets_completed: SetsCompleted::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn grade(&self) -> SchoolGrade {
        self.grade
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn coins(&self) -> u32 {
        self.coins
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn trophies(&self) -> u32 {
        self.trophies
    }

    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    #[must_use]
    pub fn sets_completed(&self) -> SetsCompleted {
        self.sets_completed
    }

    /// Whether the learner has replaced the edition's placeholder name.
    /// Returning visitors go straight to the dashboard.
    #[must_use]
    pub fn has_custom_name(&self, variant: Variant) -> bool {
        self.name != variant.default_name()
    }

    /// Renames the learner.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::EmptyName`] for a blank name.
    pub fn rename(&mut self, name: &str) -> Result<(), ProfileError> {
        self.name = validated_name(name)?;
        Ok(())
    }

    pub fn set_grade(&mut self, grade: SchoolGrade) {
        self.grade = grade;
    }

    /// Replaces the avatar.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::InvalidAvatarUrl`] when `url` is not an
    /// absolute URL.
    pub fn set_avatar_url(&mut self, url: &str) -> Result<(), ProfileError> {
        self.avatar_url = validated_avatar(Some(url))?;
        Ok(())
    }

    /// Applies the end-of-set reward rule and returns the outcome summary.
    ///
    /// Each completed set pays its points, half the points again in coins
    /// (rounded down), and one trophy when the set reached
    /// [`TROPHY_POINTS`]. The subject's completed-set counter moves by one.
    /// Callers invoke this exactly once per finished set.
    pub fn apply_completed_set(&mut self, subject: Subject, session_points: u32) -> SessionOutcome {
        let coins_earned = session_points / 2;
        let trophy_earned = session_points >= TROPHY_POINTS;

        self.points = self.points.saturating_add(session_points);
        self.coins = self.coins.saturating_add(coins_earned);
        if trophy_earned {
            self.trophies = self.trophies.saturating_add(1);
        }
        self.sets_completed.bump(subject);

        SessionOutcome {
            subject,
            session_points,
            coins_earned,
            trophy_earned,
            total_points: self.points,
            total_coins: self.coins,
        }
    }
}

fn validated_name(name: &str) -> Result<String, ProfileError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ProfileError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn validated_avatar(url: Option<&str>) -> Result<Option<String>, ProfileError> {
    match url {
        None => Ok(None),
        Some(raw) => {
            Url::parse(raw).map_err(|_| ProfileError::InvalidAvatarUrl)?;
            Ok(Some(raw.to_string()))
        }
    }
}

/// What one finished set changed, handed to the results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub subject: Subject,
    pub session_points: u32,
    pub coins_earned: u32,
    pub trophy_earned: bool,
    pub total_points: u32,
    pub total_coins: u32,
}

//
// ─── PROFILE ERRORS ────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile name cannot be empty")]
    EmptyName,

    #[error("avatar is not a valid URL")]
    InvalidAvatarUrl,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
