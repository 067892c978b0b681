use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartAttemptRequest {
    #[validate(length(min = 1))]
    pub quiz_id: String,

    #[validate(length(min = 1))]
    pub user_id: String,

    #[validate(length(max = 100))]
    pub access_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitResponseRequest {
    #[validate(length(min = 1))]
    pub attempt_id: String,

    #[validate(length(min = 1))]
    pub question_id: String,

    pub response_data: Value,

    #[serde(default)]
    pub time_spent_seconds: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GradeEssayRequest {
    #[validate(length(min = 1))]
    pub response_id: String,

    pub points: f64,

    #[validate(length(max = 5000))]
    pub feedback: String,

    #[validate(length(min = 1))]
    pub grader_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GrantExtensionRequest {
    #[validate(length(min = 1))]
    pub attempt_id: String,

    #[validate(range(min = 1, max = 1440))]
    pub minutes: u32,

    #[validate(length(min = 1, max = 500))]
    pub reason: String,

    #[validate(length(min = 1))]
    pub grantor_id: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePrerequisiteRequest {
    #[validate(length(min = 1))]
    pub quiz_id: String,

    #[validate(length(min = 1))]
    pub prerequisite_quiz_id: String,

    #[serde(default = "default_required_passing")]
    pub required_passing: bool,

    #[serde(default)]
    pub bypass_for_instructors: bool,
}

fn default_required_passing() -> bool {
    true
}
