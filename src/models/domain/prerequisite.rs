use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Directed edge: `quiz_id` is gated on `prerequisite_quiz_id`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizPrerequisite {
    pub id: String,
    pub quiz_id: String,
    pub prerequisite_quiz_id: String,
    pub required_passing: bool,
    pub bypass_for_instructors: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl QuizPrerequisite {
    pub fn new(
        quiz_id: &str,
        prerequisite_quiz_id: &str,
        required_passing: bool,
        bypass_for_instructors: bool,
    ) -> AppResult<Self> {
        if quiz_id == prerequisite_quiz_id {
            return Err(AppError::ValidationError(format!(
                "Quiz '{}' cannot be its own prerequisite",
                quiz_id
            )));
        }
        Ok(QuizPrerequisite {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            prerequisite_quiz_id: prerequisite_quiz_id.to_string(),
            required_passing,
            bypass_for_instructors,
            created_at: Some(Utc::now()),
        })
    }
}
