pub mod attempt_locks;
pub mod collaborators;
pub mod grading_service;
pub mod ordering;
pub mod prerequisite_service;
pub mod question_strategies;
pub mod quiz_attempt_service;
pub mod quiz_service;
pub mod scoring;
pub mod time_control;

pub use collaborators::{EnrollmentDirectory, LoggingProgressSink, ProgressSink};
pub use grading_service::GradingService;
pub use prerequisite_service::PrerequisiteService;
pub use quiz_attempt_service::QuizAttemptService;
pub use quiz_service::QuizService;
