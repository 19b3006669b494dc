mod answer;
mod grade;
mod ids;
mod profile;
mod question;
mod subject;
mod variant;

pub use answer::{AnswerInput, AnswerRecord, AnswerReview};
pub use grade::{GradeError, SchoolGrade};
pub use ids::{ParseIdError, QuestionId};
pub use profile::{
    DEFAULT_AVATARS, Profile, ProfileError, SessionOutcome, SetsCompleted, TROPHY_POINTS,
};
pub use question::{
    Illustration, Question, QuestionDraft, QuestionKind, QuestionValidationError,
};
pub use subject::{ParseSubjectError, Subject};
pub use variant::{ParseVariantError, Variant};
