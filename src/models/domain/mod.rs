pub mod prerequisite;
pub mod question;
pub mod question_response;
pub mod quiz;
pub mod quiz_attempt;
pub use prerequisite::QuizPrerequisite;
pub use question::{Choice, Question, QuestionKind};
pub use question_response::{GradingStatus, QuestionResponse};
pub use quiz::Quiz;
pub use quiz_attempt::{AttemptStatus, QuizAttempt};
