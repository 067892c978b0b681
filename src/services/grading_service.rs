use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{GradingStatus, Quiz, QuizAttempt},
        dto::{
            request::GradeEssayRequest,
            response::{EssayGraded, PendingEssay},
        },
    },
    repositories::{QuizAttemptRepository, QuizRepository},
    services::{
        attempt_locks::AttemptLocks,
        collaborators::{self, ProgressSink},
        question_strategies, scoring,
    },
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum PointsPolicy {
    /// Out-of-range points are an error.
    Strict,
    /// Out-of-range points are pulled into `[0, question.points]`.
    Clamp,
}

pub struct GradingService {
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    progress: Arc<dyn ProgressSink>,
    locks: Arc<AttemptLocks>,
}

impl GradingService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        progress: Arc<dyn ProgressSink>,
        locks: Arc<AttemptLocks>,
    ) -> Self {
        Self {
            quizzes,
            attempts,
            progress,
            locks,
        }
    }

    /// Grades an essay. Points outside `[0, question.points]` are rejected.
    pub async fn grade_essay(&self, request: GradeEssayRequest) -> AppResult<EssayGraded> {
        request.validate()?;
        self.grade(
            &request.response_id,
            request.points,
            &request.feedback,
            &request.grader_id,
            PointsPolicy::Strict,
        )
        .await
    }

    /// Lenient variant of [`grade_essay`](Self::grade_essay) that clamps the points.
    pub async fn grade_response(
        &self,
        response_id: &str,
        points: f64,
        feedback: &str,
        grader_id: &str,
    ) -> AppResult<EssayGraded> {
        self.grade(response_id, points, feedback, grader_id, PointsPolicy::Clamp)
            .await
    }

    /// Ungraded essays on finished attempts of `quiz_id`, oldest attempt first.
    pub async fn pending_essays(&self, quiz_id: &str) -> AppResult<Vec<PendingEssay>> {
        let quiz = self.load_quiz(quiz_id).await?;
        let attempts = self.attempts.find_pending_grading(quiz_id).await?;

        let mut pending = Vec::new();
        for attempt in &attempts {
            for response in attempt.responses.iter().filter(|r| r.is_pending_grading()) {
                let essay_text = response.essay_text().unwrap_or_default().to_string();
                pending.push(PendingEssay {
                    attempt_id: attempt.id.clone(),
                    attempt_number: attempt.attempt_number,
                    user_id: attempt.user_id.clone(),
                    response_id: response.id.clone(),
                    question_id: response.question_id.clone(),
                    question_text: quiz
                        .question(&response.question_id)
                        .map(|q| q.text.clone())
                        .unwrap_or_default(),
                    word_count: question_strategies::word_count(&essay_text),
                    essay_text,
                    submitted_at: response.submitted_at,
                });
            }
        }
        Ok(pending)
    }

    pub async fn next_pending_essay(&self, quiz_id: &str) -> AppResult<Option<PendingEssay>> {
        Ok(self.pending_essays(quiz_id).await?.into_iter().next())
    }

    async fn grade(
        &self,
        response_id: &str,
        points: f64,
        feedback: &str,
        grader_id: &str,
        policy: PointsPolicy,
    ) -> AppResult<EssayGraded> {
        let attempt = self.attempt_for_response(response_id).await?;
        let _guard = self.locks.acquire(&attempt.quiz_id, &attempt.user_id).await?;

        let mut attempt = self.reload(&attempt.id).await?;
        if !attempt.status.is_finished() {
            return Err(AppError::ValidationError(format!(
                "Attempt '{}' is {}; only completed or timed out attempts can be graded",
                attempt.id, attempt.status
            )));
        }
        let quiz = self.load_quiz(&attempt.quiz_id).await?;

        let question_id = attempt
            .response(response_id)
            .map(|r| r.question_id.clone())
            .ok_or_else(|| not_found(response_id))?;
        let question = quiz
            .question(&question_id)
            .ok_or_else(|| AppError::QuestionNotInQuiz {
                question_id: question_id.clone(),
                quiz_id: quiz.id.clone(),
            })?;
        if !question.kind.requires_manual_grading() {
            return Err(AppError::UnsupportedQuestionKind(format!(
                "Question '{}' is {} and is graded automatically",
                question.id,
                question.kind.label()
            )));
        }
        let points = resolve_points(points, question.points, policy)?;

        let previous_score = attempt.score;
        let previous_passed = attempt.is_passed;

        let response = attempt
            .response_mut(response_id)
            .ok_or_else(|| not_found(response_id))?;
        response.points_earned = points;
        response.is_correct = points > 0.0;
        response.grading_status = GradingStatus::ManuallyGraded;
        response.graded_at = Some(Utc::now());
        response.graded_by = Some(grader_id.to_string());
        response.instructor_comment = Some(feedback.to_string());

        scoring::apply(&quiz, &mut attempt);
        let notify =
            !attempt.progress_notified && collaborators::qualifies_for_progress(&quiz, &attempt);
        if notify {
            attempt.progress_notified = true;
        }

        let attempt = self.attempts.update(attempt).await?;
        log::info!(
            "Graded response {} on attempt {} with {} point(s) by {}: score {} -> {} passed={}",
            response_id,
            attempt.id,
            points,
            grader_id,
            previous_score,
            attempt.score,
            attempt.is_passed
        );

        if notify {
            collaborators::notify_progress(self.progress.as_ref(), &attempt, &quiz).await;
        }

        let response = attempt
            .response(response_id)
            .cloned()
            .ok_or_else(|| not_found(response_id))?;
        Ok(EssayGraded {
            response,
            attempt,
            previous_score,
            previous_passed,
        })
    }

    async fn attempt_for_response(&self, response_id: &str) -> AppResult<QuizAttempt> {
        self.attempts
            .find_by_response_id(response_id)
            .await?
            .ok_or_else(|| not_found(response_id))
    }

    async fn reload(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        self.attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt with id '{}' not found", attempt_id)))
    }

    async fn load_quiz(&self, quiz_id: &str) -> AppResult<Quiz> {
        self.quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))
    }
}

fn not_found(response_id: &str) -> AppError {
    AppError::NotFound(format!("Response with id '{}' not found", response_id))
}

fn resolve_points(points: f64, max_points: f64, policy: PointsPolicy) -> AppResult<f64> {
    if points.is_nan() {
        return Err(AppError::InvalidGradePoints { points, max_points });
    }
    match policy {
        PointsPolicy::Clamp => Ok(points.clamp(0.0, max_points)),
        PointsPolicy::Strict if (0.0..=max_points).contains(&points) => Ok(points),
        PointsPolicy::Strict => Err(AppError::InvalidGradePoints { points, max_points }),
    }
}
