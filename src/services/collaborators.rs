//! Interfaces the engine consumes from the surrounding platform.

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::domain::{Quiz, QuizAttempt};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentDirectory: Send + Sync {
    async fn is_enrolled(&self, user_id: &str, course_id: &str) -> AppResult<bool>;
    async fn is_instructor(&self, user_id: &str) -> AppResult<bool>;
}

/// Receives one call per attempt that ends passed on a graded (non-survey) quiz.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn quiz_passed(&self, attempt: &QuizAttempt, quiz: &Quiz) -> AppResult<()>;
}

/// Sink that only records the event in the log.
pub struct LoggingProgressSink;

#[async_trait]
impl ProgressSink for LoggingProgressSink {
    async fn quiz_passed(&self, attempt: &QuizAttempt, quiz: &Quiz) -> AppResult<()> {
        log::info!(
            "User {} passed quiz {} (module {}) with attempt {}",
            attempt.user_id,
            quiz.id,
            quiz.module_id,
            attempt.attempt_number
        );
        Ok(())
    }
}

/// Finished, passed and not a survey: the only attempts the sink hears about.
pub(crate) fn qualifies_for_progress(quiz: &Quiz, attempt: &QuizAttempt) -> bool {
    !quiz.is_survey && attempt.status.is_finished() && attempt.is_passed
}

/// Sink failures are logged only; the attempt transition already happened.
pub(crate) async fn notify_progress(sink: &dyn ProgressSink, attempt: &QuizAttempt, quiz: &Quiz) {
    if let Err(e) = sink.quiz_passed(attempt, quiz).await {
        log::error!(
            "Progress sink failed for attempt {} on quiz {}: {}",
            attempt.id,
            quiz.id,
            e
        );
    }
}
