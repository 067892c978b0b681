use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        InMemoryPrerequisiteRepository, InMemoryQuizAttemptRepository, InMemoryQuizRepository,
        MongoPrerequisiteRepository, MongoQuizAttemptRepository, MongoQuizRepository,
        PrerequisiteRepository, QuizAttemptRepository, QuizRepository,
    },
    services::{
        attempt_locks::AttemptLocks, EnrollmentDirectory, GradingService, PrerequisiteService,
        ProgressSink, QuizAttemptService, QuizService,
    },
};

/// The three stores the engine persists through.
#[derive(Clone)]
pub struct Repositories {
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn QuizAttemptRepository>,
    pub prerequisites: Arc<dyn PrerequisiteRepository>,
}

impl Repositories {
    /// Mongo-backed stores. Creates the indexes the uniqueness rules rely on.
    pub async fn mongo(db: &Database, config: &Config) -> AppResult<Self> {
        let quizzes = Arc::new(MongoQuizRepository::new(db, &config.quizzes_collection));
        quizzes.ensure_indexes().await?;

        let attempts = Arc::new(MongoQuizAttemptRepository::new(db, &config.attempts_collection));
        attempts.ensure_indexes().await?;

        let prerequisites = Arc::new(MongoPrerequisiteRepository::new(
            db,
            &config.prerequisites_collection,
        ));
        prerequisites.ensure_indexes().await?;

        Ok(Self {
            quizzes,
            attempts,
            prerequisites,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            quizzes: Arc::new(InMemoryQuizRepository::new()),
            attempts: Arc::new(InMemoryQuizAttemptRepository::new()),
            prerequisites: Arc::new(InMemoryPrerequisiteRepository::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: Arc<QuizService>,
    pub attempt_service: Arc<QuizAttemptService>,
    pub grading_service: Arc<GradingService>,
    pub prerequisite_service: Arc<PrerequisiteService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        repositories: Repositories,
        directory: Arc<dyn EnrollmentDirectory>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        let locks = Arc::new(AttemptLocks::new(config.attempt_lock_timeout()));

        let quiz_service = Arc::new(QuizService::new(repositories.quizzes.clone()));
        let prerequisite_service = Arc::new(PrerequisiteService::new(
            repositories.prerequisites.clone(),
            repositories.quizzes.clone(),
            repositories.attempts.clone(),
            directory.clone(),
            config.enforce_prerequisite_acyclic,
        ));
        let attempt_service = Arc::new(QuizAttemptService::new(
            repositories.quizzes.clone(),
            repositories.attempts.clone(),
            prerequisite_service.clone(),
            directory,
            progress.clone(),
            locks.clone(),
        ));
        let grading_service = Arc::new(GradingService::new(
            repositories.quizzes,
            repositories.attempts,
            progress,
            locks,
        ));

        Self {
            quiz_service,
            attempt_service,
            grading_service,
            prerequisite_service,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::Quiz;
    use crate::services::LoggingProgressSink;
    use crate::test_utils;

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn services_share_the_same_stores() {
        let state = AppState::new(
            Config::test_config(),
            Repositories::in_memory(),
            Arc::new(test_utils::directory(true, false)),
            Arc::new(LoggingProgressSink),
        );

        let quiz = state
            .quiz_service
            .save_quiz(Quiz::new("course", "module", "Wiring"))
            .await
            .expect("save");
        let status = state
            .prerequisite_service
            .status(&quiz.id, "alice")
            .await
            .expect("status");
        assert!(status.all_satisfied);
    }
}
