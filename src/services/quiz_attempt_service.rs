use std::sync::Arc;

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{AttemptStatus, Question, QuestionResponse, Quiz, QuizAttempt},
        dto::{
            request::{GrantExtensionRequest, StartAttemptRequest, SubmitResponseRequest},
            response::{AttemptResult, AttemptStart},
        },
    },
    repositories::{QuizAttemptRepository, QuizRepository},
    services::{
        attempt_locks::AttemptLocks,
        collaborators::{self, EnrollmentDirectory, ProgressSink},
        ordering,
        prerequisite_service::PrerequisiteService,
        question_strategies, scoring, time_control,
    },
};

/// Attempt lifecycle: start, answer, finish, extend.
///
/// Every mutation runs under the per-(quiz, user) lock and re-reads the
/// attempt after acquiring it, so the stored snapshot is the one scored.
pub struct QuizAttemptService {
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    prerequisites: Arc<PrerequisiteService>,
    directory: Arc<dyn EnrollmentDirectory>,
    progress: Arc<dyn ProgressSink>,
    locks: Arc<AttemptLocks>,
}

impl QuizAttemptService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        prerequisites: Arc<PrerequisiteService>,
        directory: Arc<dyn EnrollmentDirectory>,
        progress: Arc<dyn ProgressSink>,
        locks: Arc<AttemptLocks>,
    ) -> Self {
        Self {
            quizzes,
            attempts,
            prerequisites,
            directory,
            progress,
            locks,
        }
    }

    pub async fn start_attempt(&self, request: StartAttemptRequest) -> AppResult<AttemptStart> {
        request.validate()?;
        let quiz = self.load_quiz(&request.quiz_id).await?;
        let user_id = request.user_id.as_str();

        let privileged = self.directory.is_instructor(user_id).await?;
        if !privileged && !self.directory.is_enrolled(user_id, &quiz.course_id).await? {
            log::warn!("User {} is not enrolled in course {}", user_id, quiz.course_id);
            return Err(AppError::NotEnrolled {
                user_id: user_id.to_string(),
                course_id: quiz.course_id.clone(),
            });
        }

        let _guard = self.locks.acquire(&quiz.id, user_id).await?;
        let now = Utc::now();

        if let Some(existing) = self.attempts.find_in_progress(user_id, &quiz.id).await? {
            if !time_control::is_past_deadline(&quiz, &existing, now) {
                log::info!(
                    "Resuming attempt {} (#{}) on quiz {} for user {}",
                    existing.id,
                    existing.attempt_number,
                    quiz.id,
                    user_id
                );
                return Ok(AttemptStart::Resumed(existing));
            }
            self.finish_locked(&quiz, existing, AttemptStatus::TimedOut, now)
                .await?;
        }

        if !quiz.is_available_at(now) {
            return Err(AppError::QuizUnavailable(format!(
                "Quiz '{}' is outside its access window",
                quiz.id
            )));
        }

        if !privileged && !quiz.access_code_matches(request.access_code.as_deref()) {
            log::warn!("Rejected access code for quiz {} from user {}", quiz.id, user_id);
            return Err(AppError::InvalidAccessCode);
        }

        let prerequisites = self
            .prerequisites
            .evaluate(&quiz.id, user_id, privileged)
            .await?;
        if !prerequisites.all_satisfied {
            let unsatisfied = prerequisites.unsatisfied();
            log::warn!(
                "User {} blocked from quiz {} by {} unsatisfied prerequisite(s)",
                user_id,
                quiz.id,
                unsatisfied.len()
            );
            return Err(AppError::PrerequisitesUnsatisfied(unsatisfied));
        }

        // Abandoned attempts count toward the limit.
        let previous = self.attempts.find_by_user_and_quiz(user_id, &quiz.id).await?;
        if let Some(limit) = quiz.attempt_limit() {
            if previous.len() >= limit as usize {
                return Err(AppError::MaxAttemptsReached {
                    max_attempts: limit,
                });
            }
        }

        let attempt_number = previous
            .iter()
            .map(|a| a.attempt_number)
            .max()
            .unwrap_or(0)
            + 1;
        let mut attempt = QuizAttempt::start(&quiz.id, user_id, attempt_number);
        attempt.max_score = quiz.max_score();

        let attempt = self.attempts.create(attempt).await?;
        log::info!(
            "Started attempt {} (#{}) on quiz {} for user {}",
            attempt.id,
            attempt.attempt_number,
            quiz.id,
            user_id
        );
        Ok(AttemptStart::Created(attempt))
    }

    /// Stores (or overwrites) the answer to one question and scores it immediately.
    pub async fn submit_response(
        &self,
        request: SubmitResponseRequest,
    ) -> AppResult<QuestionResponse> {
        request.validate()?;
        let attempt = self.load_attempt(&request.attempt_id).await?;
        let _guard = self.locks.acquire(&attempt.quiz_id, &attempt.user_id).await?;

        let mut attempt = self.load_attempt(&request.attempt_id).await?;
        ensure_in_progress(&attempt)?;
        let quiz = self.load_quiz(&attempt.quiz_id).await?;

        let question = quiz
            .question(&request.question_id)
            .ok_or_else(|| AppError::QuestionNotInQuiz {
                question_id: request.question_id.clone(),
                quiz_id: quiz.id.clone(),
            })?;

        let now = Utc::now();
        if time_control::is_past_deadline(&quiz, &attempt, now) {
            log::warn!("Late response on attempt {}; timing it out", attempt.id);
            let attempt = self
                .finish_locked(&quiz, attempt, AttemptStatus::TimedOut, now)
                .await?;
            return Err(AppError::AttemptAlreadyTerminal {
                attempt_id: attempt.id,
                status: attempt.status,
            });
        }

        let outcome = question_strategies::check_answer(question, &request.response_data);
        let mut response = QuestionResponse::new(
            &question.id,
            request.response_data,
            request.time_spent_seconds,
        );
        response.is_correct = outcome.is_correct;
        response.points_earned = outcome.points_earned;
        response.feedback = outcome.feedback;
        response.grading_status = outcome.grading_status;
        response.submitted_at = now;

        let response_id = attempt.upsert_response(response).id.clone();
        let attempt = self.attempts.update(attempt).await?;

        log::info!(
            "Recorded response {} to question {} on attempt {}",
            response_id,
            request.question_id,
            attempt.id
        );
        attempt
            .response(&response_id)
            .cloned()
            .ok_or_else(|| AppError::InternalError(format!("Response '{}' was not stored", response_id)))
    }

    /// Scores and closes the attempt. Past the hard deadline it closes as `timed_out`.
    pub async fn complete(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        self.transition(attempt_id, AttemptStatus::Completed).await
    }

    pub async fn timeout(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        self.transition(attempt_id, AttemptStatus::TimedOut).await
    }

    pub async fn abandon(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        self.transition(attempt_id, AttemptStatus::Abandoned).await
    }

    /// Sweeper entry point: times out the attempt if its deadline has passed,
    /// otherwise returns it untouched.
    pub async fn enforce_deadline(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        let attempt = self.load_attempt(attempt_id).await?;
        let _guard = self.locks.acquire(&attempt.quiz_id, &attempt.user_id).await?;

        let attempt = self.load_attempt(attempt_id).await?;
        if attempt.status.is_terminal() {
            return Ok(attempt);
        }
        let quiz = self.load_quiz(&attempt.quiz_id).await?;
        let now = Utc::now();
        if !time_control::is_past_deadline(&quiz, &attempt, now) {
            return Ok(attempt);
        }
        self.finish_locked(&quiz, attempt, AttemptStatus::TimedOut, now)
            .await
    }

    pub async fn grant_extension(&self, request: GrantExtensionRequest) -> AppResult<QuizAttempt> {
        request.validate()?;
        if !self.directory.is_instructor(&request.grantor_id).await? {
            log::warn!(
                "User {} tried to extend attempt {} without privileges",
                request.grantor_id,
                request.attempt_id
            );
            return Err(AppError::ExtensionsNotAllowed(format!(
                "User '{}' may not grant time extensions",
                request.grantor_id
            )));
        }

        let attempt = self.load_attempt(&request.attempt_id).await?;
        let _guard = self.locks.acquire(&attempt.quiz_id, &attempt.user_id).await?;

        let mut attempt = self.load_attempt(&request.attempt_id).await?;
        let quiz = self.load_quiz(&attempt.quiz_id).await?;
        time_control::check_extension_allowed(&quiz, &attempt)?;

        time_control::apply_extension(
            &mut attempt,
            request.minutes,
            &request.reason,
            &request.grantor_id,
            Utc::now(),
        );
        let attempt = self.attempts.update(attempt).await?;

        log::info!(
            "Granted {} extra minute(s) on attempt {} (total {}) by {}",
            request.minutes,
            attempt.id,
            attempt.time_extension_minutes,
            request.grantor_id
        );
        Ok(attempt)
    }

    /// Seconds left on an open attempt; `None` when the quiz is untimed.
    pub async fn time_remaining(&self, attempt_id: &str) -> AppResult<Option<i64>> {
        let attempt = self.load_attempt(attempt_id).await?;
        let quiz = self.load_quiz(&attempt.quiz_id).await?;

        if attempt.status.is_terminal() {
            return Ok(time_control::hard_deadline(&quiz, &attempt).map(|_| 0));
        }
        Ok(time_control::time_remaining(&quiz, &attempt, Utc::now()))
    }

    pub async fn attempt_result(&self, attempt_id: &str) -> AppResult<AttemptResult> {
        let attempt = self.load_attempt(attempt_id).await?;
        if attempt.status == AttemptStatus::InProgress {
            return Err(AppError::ValidationError(format!(
                "Attempt '{}' is still in progress",
                attempt_id
            )));
        }
        Ok(AttemptResult::from(attempt))
    }

    pub async fn list_attempts(&self, quiz_id: &str, user_id: &str) -> AppResult<Vec<QuizAttempt>> {
        self.attempts.find_by_user_and_quiz(user_id, quiz_id).await
    }

    /// Questions in the order this attempt presents them.
    pub async fn question_order(&self, attempt_id: &str) -> AppResult<Vec<Question>> {
        let attempt = self.load_attempt(attempt_id).await?;
        let quiz = self.load_quiz(&attempt.quiz_id).await?;
        Ok(ordering::presented_questions(&quiz, &attempt))
    }

    async fn transition(&self, attempt_id: &str, requested: AttemptStatus) -> AppResult<QuizAttempt> {
        let attempt = self.load_attempt(attempt_id).await?;
        let _guard = self.locks.acquire(&attempt.quiz_id, &attempt.user_id).await?;

        let attempt = self.load_attempt(attempt_id).await?;
        ensure_in_progress(&attempt)?;
        let quiz = self.load_quiz(&attempt.quiz_id).await?;

        let now = Utc::now();
        let status = if requested == AttemptStatus::Completed
            && time_control::is_past_deadline(&quiz, &attempt, now)
        {
            AttemptStatus::TimedOut
        } else {
            requested
        };
        self.finish_locked(&quiz, attempt, status, now).await
    }

    /// Caller must hold the attempt lock.
    async fn finish_locked(
        &self,
        quiz: &Quiz,
        mut attempt: QuizAttempt,
        status: AttemptStatus,
        now: DateTime<Utc>,
    ) -> AppResult<QuizAttempt> {
        attempt.finish(status, now);
        if status.is_finished() {
            scoring::apply(quiz, &mut attempt);
        }

        let notify = !attempt.progress_notified && collaborators::qualifies_for_progress(quiz, &attempt);
        if notify {
            attempt.progress_notified = true;
        }

        let attempt = self.attempts.update(attempt).await?;
        log::info!(
            "Attempt {} on quiz {} {}: score {}/{} passed={}",
            attempt.id,
            quiz.id,
            attempt.status,
            attempt.score,
            attempt.max_score,
            attempt.is_passed
        );

        if notify {
            collaborators::notify_progress(self.progress.as_ref(), &attempt, quiz).await;
        }
        Ok(attempt)
    }

    async fn load_quiz(&self, quiz_id: &str) -> AppResult<Quiz> {
        self.quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))
    }

    async fn load_attempt(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        self.attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt with id '{}' not found", attempt_id)))
    }
}

fn ensure_in_progress(attempt: &QuizAttempt) -> AppResult<()> {
    if attempt.status.is_terminal() {
        return Err(AppError::AttemptAlreadyTerminal {
            attempt_id: attempt.id.clone(),
            status: attempt.status,
        });
    }
    Ok(())
}
