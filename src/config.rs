use secrecy::SecretString;
use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: SecretString,
    pub mongo_db_name: String,
    pub quizzes_collection: String,
    pub attempts_collection: String,
    pub prerequisites_collection: String,
    pub attempt_lock_timeout_ms: u64,
    pub enforce_prerequisite_acyclic: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            mongo_conn_string: SecretString::from(
                env::var("MONGO_CONN_STRING")
                    .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            ),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "tento-assessment".to_string()),
            quizzes_collection: env::var("QUIZZES_COLLECTION")
                .unwrap_or_else(|_| "quizzes".to_string()),
            attempts_collection: env::var("ATTEMPTS_COLLECTION")
                .unwrap_or_else(|_| "quiz_attempts".to_string()),
            prerequisites_collection: env::var("PREREQUISITES_COLLECTION")
                .unwrap_or_else(|_| "quiz_prerequisites".to_string()),
            attempt_lock_timeout_ms: env::var("ATTEMPT_LOCK_TIMEOUT_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .unwrap_or(2000),
            enforce_prerequisite_acyclic: env::var("ENFORCE_PREREQUISITE_ACYCLIC")
                .ok()
                .and_then(|flag| parse_flag(&flag))
                .unwrap_or(true),
        }
    }

    pub fn attempt_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_lock_timeout_ms)
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: SecretString::from("mongodb://localhost:27017".to_string()),
            mongo_db_name: "tento-assessment-test".to_string(),
            quizzes_collection: "quizzes".to_string(),
            attempts_collection: "quiz_attempts".to_string(),
            prerequisites_collection: "quiz_prerequisites".to_string(),
            attempt_lock_timeout_ms: 200,
            enforce_prerequisite_acyclic: true,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
