use mongodb::error::{ErrorKind, WriteFailure};
use serde::Serialize;
use thiserror::Error;

use crate::models::domain::quiz_attempt::AttemptStatus;
use crate::models::dto::response::PrerequisiteStatusItem;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("User '{user_id}' is not enrolled in course '{course_id}'")]
    NotEnrolled { user_id: String, course_id: String },

    #[error("Quiz unavailable: {0}")]
    QuizUnavailable(String),

    #[error("Invalid access code")]
    InvalidAccessCode,

    #[error("Prerequisites unsatisfied: {} outstanding", .0.len())]
    PrerequisitesUnsatisfied(Vec<PrerequisiteStatusItem>),

    #[error("Maximum number of attempts ({max_attempts}) reached")]
    MaxAttemptsReached { max_attempts: u32 },

    #[error("Attempt '{attempt_id}' is already {status}")]
    AttemptAlreadyTerminal {
        attempt_id: String,
        status: AttemptStatus,
    },

    #[error("Question '{question_id}' does not belong to quiz '{quiz_id}'")]
    QuestionNotInQuiz { question_id: String, quiz_id: String },

    #[error("Unsupported question kind: {0}")]
    UnsupportedQuestionKind(String),

    #[error("Invalid grade: {points} is outside [0, {max_points}]")]
    InvalidGradePoints { points: f64, max_points: f64 },

    #[error("Time extensions not allowed: {0}")]
    ExtensionsNotAllowed(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
            AppError::NotEnrolled { .. } => "NOT_ENROLLED",
            AppError::QuizUnavailable(_) => "QUIZ_UNAVAILABLE",
            AppError::InvalidAccessCode => "INVALID_ACCESS_CODE",
            AppError::PrerequisitesUnsatisfied(_) => "PREREQUISITES_UNSATISFIED",
            AppError::MaxAttemptsReached { .. } => "MAX_ATTEMPTS_REACHED",
            AppError::AttemptAlreadyTerminal { .. } => "ATTEMPT_ALREADY_TERMINAL",
            AppError::QuestionNotInQuiz { .. } => "QUESTION_NOT_IN_QUIZ",
            AppError::UnsupportedQuestionKind(_) => "UNSUPPORTED_QUESTION_KIND",
            AppError::InvalidGradePoints { .. } => "INVALID_GRADE_POINTS",
            AppError::ExtensionsNotAllowed(_) => "EXTENSIONS_NOT_ALLOWED",
            AppError::Conflict(_) => "CONFLICT",
        }
    }

    /// Only lock contention and lost optimistic updates are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

/// Body handed to collaborators that surface errors to end users.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unsatisfied_prerequisites: Vec<PrerequisiteStatusItem>,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let unsatisfied_prerequisites = match err {
            AppError::PrerequisitesUnsatisfied(items) => items.clone(),
            _ => Vec::new(),
        };
        ErrorResponse {
            error: err.to_string(),
            code: err.error_code(),
            unsatisfied_prerequisites,
        }
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = err.kind.as_ref() {
            if write_error.code == DUPLICATE_KEY_CODE {
                return AppError::Conflict(write_error.message.clone());
            }
        }
        AppError::DatabaseError(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalError(format!("BSON serialization error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NotFound("x".into()).error_code(), "NOT_FOUND");
        assert_eq!(AppError::InvalidAccessCode.error_code(), "INVALID_ACCESS_CODE");
        assert_eq!(
            AppError::MaxAttemptsReached { max_attempts: 3 }.error_code(),
            "MAX_ATTEMPTS_REACHED"
        );
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::NotFound("quiz".into());
        assert_eq!(err.to_string(), "Not found: quiz");

        let err = AppError::AttemptAlreadyTerminal {
            attempt_id: "a-1".into(),
            status: AttemptStatus::TimedOut,
        };
        assert_eq!(err.to_string(), "Attempt 'a-1' is already timed_out");
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(AppError::Conflict("locked".into()).is_retryable());
        assert!(!AppError::InvalidAccessCode.is_retryable());
        assert!(!AppError::DatabaseError("down".into()).is_retryable());
    }

    #[test]
    fn error_response_carries_unsatisfied_prerequisites() {
        let item = PrerequisiteStatusItem {
            prerequisite_quiz_id: "intro".into(),
            prerequisite_title: "Intro survey".into(),
            required_passing: false,
            is_survey: true,
            satisfied: false,
            bypassed: false,
        };
        let err = AppError::PrerequisitesUnsatisfied(vec![item]);
        let body = ErrorResponse::from(&err);

        assert_eq!(body.code, "PREREQUISITES_UNSATISFIED");
        assert_eq!(body.unsatisfied_prerequisites.len(), 1);
        assert!(body.unsatisfied_prerequisites[0].is_survey);
    }
}
