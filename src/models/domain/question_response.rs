use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingStatus {
    AutoGraded,
    PendingManual,
    ManuallyGraded,
    Unscorable,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuestionResponse {
    pub id: String,
    pub question_id: String,
    pub response_data: Value,
    pub is_correct: bool,
    pub points_earned: f64,
    pub feedback: String,
    pub time_spent_seconds: u32,
    pub grading_status: GradingStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graded_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_comment: Option<String>,
}

impl QuestionResponse {
    pub fn new(question_id: &str, response_data: Value, time_spent_seconds: u32) -> Self {
        QuestionResponse {
            id: Uuid::new_v4().to_string(),
            question_id: question_id.to_string(),
            response_data,
            is_correct: false,
            points_earned: 0.0,
            feedback: String::new(),
            time_spent_seconds,
            grading_status: GradingStatus::AutoGraded,
            submitted_at: Utc::now(),
            graded_at: None,
            graded_by: None,
            instructor_comment: None,
        }
    }

    pub fn is_pending_grading(&self) -> bool {
        self.grading_status == GradingStatus::PendingManual
    }

    pub fn essay_text(&self) -> Option<&str> {
        self.response_data
            .get("essay_text")
            .and_then(Value::as_str)
            .or_else(|| self.response_data.as_str())
    }
}
