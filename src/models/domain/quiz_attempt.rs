use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::question_response::QuestionResponse;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    TimedOut,
    Abandoned,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::TimedOut => "timed_out",
            AttemptStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }

    /// Terminal and scored: the states that can satisfy a prerequisite.
    pub fn is_finished(&self) -> bool {
        matches!(self, AttemptStatus::Completed | AttemptStatus::TimedOut)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TimeExtension {
    pub minutes: u32,
    pub reason: String,
    pub granted_by: String,
    pub granted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub attempt_number: u32,
    pub status: AttemptStatus,
    pub score: f64,
    pub max_score: f64,
    pub is_passed: bool,
    pub time_spent_seconds: i64,
    pub time_extension_minutes: u32,
    #[serde(default)]
    pub extensions: Vec<TimeExtension>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub responses: Vec<QuestionResponse>,
    #[serde(default)]
    pub progress_notified: bool,
    /// Optimistic concurrency token, bumped by every repository update.
    #[serde(default)]
    pub version: i64,
}

impl QuizAttempt {
    pub fn start(quiz_id: &str, user_id: &str, attempt_number: u32) -> Self {
        QuizAttempt {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            user_id: user_id.to_string(),
            attempt_number,
            status: AttemptStatus::InProgress,
            score: 0.0,
            max_score: 0.0,
            is_passed: false,
            time_spent_seconds: 0,
            time_extension_minutes: 0,
            extensions: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            responses: Vec::new(),
            progress_notified: false,
            version: 0,
        }
    }

    pub fn response_for_question(&self, question_id: &str) -> Option<&QuestionResponse> {
        self.responses.iter().find(|r| r.question_id == question_id)
    }

    pub fn response(&self, response_id: &str) -> Option<&QuestionResponse> {
        self.responses.iter().find(|r| r.id == response_id)
    }

    pub fn response_mut(&mut self, response_id: &str) -> Option<&mut QuestionResponse> {
        self.responses.iter_mut().find(|r| r.id == response_id)
    }

    /// Stores `response` as the answer to its question. An earlier answer to the
    /// same question is overwritten in place and keeps its id.
    pub fn upsert_response(&mut self, mut response: QuestionResponse) -> &QuestionResponse {
        match self
            .responses
            .iter()
            .position(|r| r.question_id == response.question_id)
        {
            Some(index) => {
                response.id = self.responses[index].id.clone();
                self.responses[index] = response;
                &self.responses[index]
            }
            None => {
                self.responses.push(response);
                let last = self.responses.len() - 1;
                &self.responses[last]
            }
        }
    }

    /// Moves an in-progress attempt into `status`, stamping the clock fields.
    pub fn finish(&mut self, status: AttemptStatus, now: DateTime<Utc>) {
        self.status = status;
        self.completed_at = Some(now);
        self.time_spent_seconds = (now - self.started_at).num_seconds().max(0);
    }

    pub fn percentage(&self) -> f64 {
        if self.max_score <= 0.0 {
            0.0
        } else {
            self.score / self.max_score * 100.0
        }
    }

    pub fn pending_grading_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_pending_grading()).count()
    }
}
