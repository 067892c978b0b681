use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{AttemptStatus, GradingStatus, QuizAttempt},
};

#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Fails with `Conflict` when `(quiz_id, user_id, attempt_number)` is taken
    /// or another attempt for the pair is already in progress.
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>>;
    /// Ordered by attempt number.
    async fn find_by_user_and_quiz(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>>;
    async fn find_in_progress(&self, user_id: &str, quiz_id: &str)
        -> AppResult<Option<QuizAttempt>>;
    async fn count_user_attempts(&self, user_id: &str, quiz_id: &str) -> AppResult<usize>;
    async fn find_by_response_id(&self, response_id: &str) -> AppResult<Option<QuizAttempt>>;
    /// Finished attempts of `quiz_id` holding at least one essay awaiting grading.
    async fn find_pending_grading(&self, quiz_id: &str) -> AppResult<Vec<QuizAttempt>>;
    /// Optimistic write: succeeds only if the stored version equals
    /// `attempt.version`, and returns the attempt with the bumped version.
    async fn update(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
}

pub struct MongoQuizAttemptRepository {
    collection: Collection<QuizAttempt>,
}

impl MongoQuizAttemptRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let attempt_number_index = IndexModel::builder()
            .keys(doc! { "quiz_id": 1, "user_id": 1, "attempt_number": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("quiz_user_attempt_number_unique".to_string())
                    .build(),
            )
            .build();

        let in_progress_index = IndexModel::builder()
            .keys(doc! { "quiz_id": 1, "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "status": AttemptStatus::InProgress.as_str() })
                    .name("single_in_progress".to_string())
                    .build(),
            )
            .build();

        let response_index = IndexModel::builder()
            .keys(doc! { "responses.id": 1 })
            .options(
                IndexOptions::builder()
                    .name("response_id".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(attempt_number_index).await?;
        self.collection.create_index(in_progress_index).await?;
        self.collection.create_index(response_index).await?;

        log::info!("Successfully created indexes for quiz_attempts collection");
        Ok(())
    }
}

#[async_trait]
impl QuizAttemptRepository for MongoQuizAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        self.collection.insert_one(&attempt).await?;
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self.collection.find_one(doc! { "id": id }).await?;
        Ok(attempt)
    }

    async fn find_by_user_and_quiz(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! {
                "user_id": user_id,
                "quiz_id": quiz_id
            })
            .sort(doc! { "attempt_number": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn find_in_progress(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! {
                "user_id": user_id,
                "quiz_id": quiz_id,
                "status": AttemptStatus::InProgress.as_str()
            })
            .await?;
        Ok(attempt)
    }

    async fn count_user_attempts(&self, user_id: &str, quiz_id: &str) -> AppResult<usize> {
        let count = self
            .collection
            .count_documents(doc! {
                "user_id": user_id,
                "quiz_id": quiz_id
            })
            .await?;
        Ok(count as usize)
    }

    async fn find_by_response_id(&self, response_id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! { "responses.id": response_id })
            .await?;
        Ok(attempt)
    }

    async fn find_pending_grading(&self, quiz_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let pending = mongodb::bson::to_bson(&GradingStatus::PendingManual)?;
        let mut attempts: Vec<QuizAttempt> = self
            .collection
            .find(doc! {
                "quiz_id": quiz_id,
                "status": {
                    "$in": [AttemptStatus::Completed.as_str(), AttemptStatus::TimedOut.as_str()]
                },
                "responses.grading_status": pending
            })
            .await?
            .try_collect()
            .await?;
        attempts.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(attempts)
    }

    async fn update(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let expected_version = attempt.version;
        let mut next = attempt;
        next.version = expected_version + 1;

        let result = self
            .collection
            .replace_one(doc! { "id": &next.id, "version": expected_version }, &next)
            .await?;

        if result.matched_count == 0 {
            if self.find_by_id(&next.id).await?.is_none() {
                return Err(AppError::NotFound(format!(
                    "Attempt with id '{}' not found",
                    next.id
                )));
            }
            return Err(AppError::Conflict(format!(
                "Attempt '{}' was modified concurrently",
                next.id
            )));
        }
        Ok(next)
    }
}
