use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::domain::question::{Question, QuestionKind};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, Validate)]
pub struct Quiz {
    pub id: String,
    pub course_id: String,
    pub module_id: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub time_limit_minutes: Option<u32>, // None or 0 means unlimited
    pub grace_period_minutes: u32,
    #[validate(range(min = 0.0, max = 100.0))]
    pub passing_score: f64, // percentage
    pub randomize_questions: bool,
    pub randomize_choices: bool,
    pub allow_multiple_attempts: bool,
    pub max_attempts: u32, // 0 means unlimited
    pub available_from: Option<DateTime<Utc>>,
    pub available_until: Option<DateTime<Utc>>,
    pub access_code: Option<String>,
    pub is_survey: bool,
    pub allow_time_extension: bool,
    #[validate(nested)]
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn new(course_id: &str, module_id: &str, title: &str) -> Self {
        Quiz {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            module_id: module_id.to_string(),
            title: title.to_string(),
            description: None,
            time_limit_minutes: None,
            grace_period_minutes: 0,
            passing_score: 70.0,
            randomize_questions: false,
            randomize_choices: false,
            allow_multiple_attempts: true,
            max_attempts: 0,
            available_from: None,
            available_until: None,
            access_code: None,
            is_survey: false,
            allow_time_extension: false,
            questions: Vec::new(),
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    /// Appends a question, re-homing it onto this quiz.
    pub fn add_question(&mut self, mut question: Question) {
        question.quiz_id = self.id.clone();
        self.questions.push(question);
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Denominator of every attempt: all questions count, answered or not.
    pub fn max_score(&self) -> f64 {
        self.questions.iter().map(|q| q.points).sum()
    }

    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        let opened = self.available_from.map(|from| now >= from).unwrap_or(true);
        let not_closed = self.available_until.map(|until| now <= until).unwrap_or(true);
        opened && not_closed
    }

    pub fn requires_access_code(&self) -> bool {
        self.access_code
            .as_deref()
            .map(|code| !code.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn access_code_matches(&self, supplied: Option<&str>) -> bool {
        if !self.requires_access_code() {
            return true;
        }
        supplied.map(str::trim) == self.access_code.as_deref().map(str::trim)
    }

    /// `None` means unlimited attempts.
    pub fn attempt_limit(&self) -> Option<u32> {
        if !self.allow_multiple_attempts {
            Some(1)
        } else if self.max_attempts == 0 {
            None
        } else {
            Some(self.max_attempts)
        }
    }

    pub fn effective_time_limit_minutes(&self) -> Option<u32> {
        self.time_limit_minutes.filter(|minutes| *minutes > 0)
    }

    /// Field-level validation plus the structural rules the derive cannot express.
    pub fn check(&self) -> AppResult<()> {
        self.validate()?;

        if let (Some(from), Some(until)) = (self.available_from, self.available_until) {
            if from > until {
                return Err(AppError::ValidationError(
                    "available_from must not be after available_until".to_string(),
                ));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for question in &self.questions {
            if question.quiz_id != self.id {
                return Err(AppError::ValidationError(format!(
                    "Question '{}' belongs to quiz '{}', not '{}'",
                    question.id, question.quiz_id, self.id
                )));
            }
            if !seen.insert(question.id.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Duplicate question id '{}'",
                    question.id
                )));
            }
            if let QuestionKind::MultipleChoice(mc) = &question.kind {
                mc.check(question.points)?;
            }
        }
        Ok(())
    }
}
