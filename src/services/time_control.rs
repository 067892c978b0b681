//! Deadline and extension bookkeeping. Pure functions over quiz and attempt.

use chrono::{DateTime, Duration, Utc};

use crate::errors::{AppError, AppResult};
use crate::models::domain::quiz_attempt::TimeExtension;
use crate::models::domain::{AttemptStatus, Quiz, QuizAttempt};

/// Hard deadline: start + limit + grace + extensions. `None` when untimed.
pub fn hard_deadline(quiz: &Quiz, attempt: &QuizAttempt) -> Option<DateTime<Utc>> {
    let limit = quiz.effective_time_limit_minutes()?;
    let total_minutes =
        i64::from(limit) + i64::from(quiz.grace_period_minutes) + i64::from(attempt.time_extension_minutes);
    Some(attempt.started_at + Duration::minutes(total_minutes))
}

pub fn is_past_deadline(quiz: &Quiz, attempt: &QuizAttempt, now: DateTime<Utc>) -> bool {
    hard_deadline(quiz, attempt)
        .map(|deadline| now > deadline)
        .unwrap_or(false)
}

/// Seconds left before the hard deadline, floored at zero.
pub fn time_remaining(quiz: &Quiz, attempt: &QuizAttempt, now: DateTime<Utc>) -> Option<i64> {
    hard_deadline(quiz, attempt).map(|deadline| (deadline - now).num_seconds().max(0))
}

pub fn check_extension_allowed(quiz: &Quiz, attempt: &QuizAttempt) -> AppResult<()> {
    if !quiz.allow_time_extension {
        return Err(AppError::ExtensionsNotAllowed(format!(
            "Quiz '{}' does not allow time extensions",
            quiz.id
        )));
    }
    if attempt.status != AttemptStatus::InProgress {
        return Err(AppError::AttemptAlreadyTerminal {
            attempt_id: attempt.id.clone(),
            status: attempt.status,
        });
    }
    Ok(())
}

/// Extensions are additive and kept as an audit trail on the attempt.
pub fn apply_extension(
    attempt: &mut QuizAttempt,
    minutes: u32,
    reason: &str,
    granted_by: &str,
    now: DateTime<Utc>,
) {
    attempt.time_extension_minutes += minutes;
    attempt.extensions.push(TimeExtension {
        minutes,
        reason: reason.to_string(),
        granted_by: granted_by.to_string(),
        granted_at: now,
    });
}
