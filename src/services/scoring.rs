//! Attempt aggregate scoring, shared by completion, timeout and essay grading.

use crate::models::domain::{Quiz, QuizAttempt};

/// Absorbs float noise such as 0.7 * 100 landing just under 70.
const PASS_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub score: f64,
    pub max_score: f64,
    pub is_passed: bool,
}

/// Responses to questions no longer on the quiz earn nothing, so `score`
/// never exceeds `max_score`.
pub fn summarize(quiz: &Quiz, attempt: &QuizAttempt) -> ScoreSummary {
    let score: f64 = attempt
        .responses
        .iter()
        .filter(|r| quiz.question(&r.question_id).is_some())
        .map(|r| r.points_earned)
        .sum();
    let max_score = quiz.max_score();

    let is_passed = quiz.is_survey || meets_threshold(score, max_score, quiz.passing_score);

    ScoreSummary {
        score,
        max_score,
        is_passed,
    }
}

/// Boundary-inclusive: exactly `passing_score` percent passes.
pub fn meets_threshold(score: f64, max_score: f64, passing_score: f64) -> bool {
    if max_score <= 0.0 {
        return true;
    }
    score / max_score * 100.0 + PASS_TOLERANCE >= passing_score
}

/// Recomputes and stores the aggregate on `attempt`. Idempotent.
pub fn apply(quiz: &Quiz, attempt: &mut QuizAttempt) -> ScoreSummary {
    let summary = summarize(quiz, attempt);
    attempt.score = summary.score;
    attempt.max_score = summary.max_score;
    attempt.is_passed = summary.is_passed;
    summary
}
