use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, Validate)]
pub struct Question {
    pub id: String,
    pub quiz_id: String,
    #[validate(length(min = 1))]
    pub text: String,
    #[validate(range(min = 0.0))]
    pub points: f64,
    pub order: i32,
    pub kind: QuestionKind,
}

/// Closed set of question kinds. Documents written by a newer editor with a
/// kind this build does not know deserialize as `Unsupported` and score zero.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice(MultipleChoice),
    TrueFalse(TrueFalse),
    Essay(Essay),
    #[serde(other)]
    Unsupported,
}

impl QuestionKind {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice(_) => "multiple_choice",
            QuestionKind::TrueFalse(_) => "true_false",
            QuestionKind::Essay(_) => "essay",
            QuestionKind::Unsupported => "unsupported",
        }
    }

    pub fn requires_manual_grading(&self) -> bool {
        matches!(self, QuestionKind::Essay(_))
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MultipleChoice {
    pub allow_multiple: bool,
    pub use_partial_credit: bool,
    /// Floor for partial-credit totals; may be negative.
    pub minimum_score: f64,
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
    pub is_neutral: bool,
    pub points_value: f64,
    pub order: i32,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TrueFalse {
    pub correct_answer: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Essay {
    pub min_word_count: u32, // 0 means no bound
    pub max_word_count: u32, // 0 means no bound
}

impl Choice {
    pub fn new(text: &str, is_correct: bool) -> Self {
        Choice {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            is_correct,
            is_neutral: false,
            points_value: 0.0,
            order: 0,
        }
    }

    pub fn with_points(mut self, points_value: f64) -> Self {
        self.points_value = points_value;
        self
    }

    pub fn neutral(mut self) -> Self {
        self.is_neutral = true;
        self.is_correct = false;
        self
    }
}

impl MultipleChoice {
    pub fn correct_choice_ids(&self) -> impl Iterator<Item = &str> {
        self.choices
            .iter()
            .filter(|c| c.is_correct)
            .map(|c| c.id.as_str())
    }

    pub fn choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }

    pub fn check(&self, question_points: f64) -> AppResult<()> {
        if self.choices.is_empty() {
            return Err(AppError::ValidationError(
                "Multiple choice question has no choices".to_string(),
            ));
        }
        if self.correct_choice_ids().next().is_none() {
            return Err(AppError::ValidationError(
                "Multiple choice question has no correct choice".to_string(),
            ));
        }
        if !self.allow_multiple && self.correct_choice_ids().count() > 1 {
            return Err(AppError::ValidationError(
                "Single-answer question has more than one correct choice".to_string(),
            ));
        }
        if self.choices.iter().any(|c| c.is_correct && c.is_neutral) {
            return Err(AppError::ValidationError(
                "A choice cannot be both correct and neutral".to_string(),
            ));
        }
        if self.use_partial_credit && self.minimum_score > question_points {
            return Err(AppError::ValidationError(format!(
                "minimum_score {} exceeds question points {}",
                self.minimum_score, question_points
            )));
        }
        Ok(())
    }
}

impl Question {
    fn with_kind(text: &str, points: f64, kind: QuestionKind) -> Self {
        Question {
            id: Uuid::new_v4().to_string(),
            quiz_id: String::new(),
            text: text.to_string(),
            points,
            order: 0,
            kind,
        }
    }

    pub fn multiple_choice(text: &str, points: f64, choices: MultipleChoice) -> Self {
        Self::with_kind(text, points, QuestionKind::MultipleChoice(choices))
    }

    pub fn true_false(text: &str, points: f64, correct_answer: bool) -> Self {
        Self::with_kind(text, points, QuestionKind::TrueFalse(TrueFalse { correct_answer }))
    }

    pub fn essay(text: &str, points: f64, min_word_count: u32, max_word_count: u32) -> Self {
        Self::with_kind(
            text,
            points,
            QuestionKind::Essay(Essay {
                min_word_count,
                max_word_count,
            }),
        )
    }
}
