mod progress;
mod session;
mod workflow;

// Public API of the quiz subsystem.
pub use crate::error::SessionError;
pub use progress::QuizProgress;
pub use session::{QUESTIONS_PER_SET, QuizSession, RetryTarget, SessionPhase};
pub use workflow::{AdvanceOutcome, QuizLoopService};
