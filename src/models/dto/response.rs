use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{QuestionResponse, QuizAttempt};

/// One prerequisite edge evaluated for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrerequisiteStatusItem {
    pub prerequisite_quiz_id: String,
    pub prerequisite_title: String,
    pub required_passing: bool,
    pub is_survey: bool,
    pub satisfied: bool,
    pub bypassed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrerequisitesStatus {
    pub all_satisfied: bool,
    pub items: Vec<PrerequisiteStatusItem>,
}

impl PrerequisitesStatus {
    pub fn unsatisfied(&self) -> Vec<PrerequisiteStatusItem> {
        self.items.iter().filter(|i| !i.satisfied).cloned().collect()
    }

    pub fn pending_surveys(&self) -> Vec<PrerequisiteStatusItem> {
        self.items
            .iter()
            .filter(|i| !i.satisfied && i.is_survey)
            .cloned()
            .collect()
    }
}

/// Outcome of `start_attempt`: a fresh attempt or the one already in progress.
#[derive(Debug, Clone)]
pub enum AttemptStart {
    Created(QuizAttempt),
    Resumed(QuizAttempt),
}

impl AttemptStart {
    pub fn attempt(&self) -> &QuizAttempt {
        match self {
            AttemptStart::Created(attempt) | AttemptStart::Resumed(attempt) => attempt,
        }
    }

    pub fn into_attempt(self) -> QuizAttempt {
        match self {
            AttemptStart::Created(attempt) | AttemptStart::Resumed(attempt) => attempt,
        }
    }

    pub fn is_resumed(&self) -> bool {
        matches!(self, AttemptStart::Resumed(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    pub attempt: QuizAttempt,
    pub percentage: f64,
    pub pending_grading: usize,
    /// True while essays remain ungraded: score and pass flag may still move.
    pub is_provisional: bool,
}

impl From<QuizAttempt> for AttemptResult {
    fn from(attempt: QuizAttempt) -> Self {
        let pending_grading = attempt.pending_grading_count();
        AttemptResult {
            percentage: attempt.percentage(),
            pending_grading,
            is_provisional: pending_grading > 0,
            attempt,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingEssay {
    pub attempt_id: String,
    pub attempt_number: u32,
    pub user_id: String,
    pub response_id: String,
    pub question_id: String,
    pub question_text: String,
    pub essay_text: String,
    pub word_count: usize,
    pub submitted_at: DateTime<Utc>,
}

/// Emitted by the grading workflow after the owning attempt was rescored.
#[derive(Debug, Clone)]
pub struct EssayGraded {
    pub response: QuestionResponse,
    pub attempt: QuizAttempt,
    pub previous_score: f64,
    pub previous_passed: bool,
}

impl EssayGraded {
    pub fn pass_state_changed(&self) -> bool {
        self.previous_passed != self.attempt.is_passed
    }
}
