use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::QuizPrerequisite,
};

#[async_trait]
pub trait PrerequisiteRepository: Send + Sync {
    async fn create(&self, edge: QuizPrerequisite) -> AppResult<QuizPrerequisite>;
    async fn find_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<QuizPrerequisite>>;
    async fn find_all(&self) -> AppResult<Vec<QuizPrerequisite>>;
    async fn delete(&self, id: &str) -> AppResult<()>;
}

pub struct MongoPrerequisiteRepository {
    collection: Collection<QuizPrerequisite>,
}

impl MongoPrerequisiteRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_prerequisites collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let edge_index = IndexModel::builder()
            .keys(doc! { "quiz_id": 1, "prerequisite_quiz_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("edge_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(edge_index).await?;

        log::info!("Successfully created indexes for quiz_prerequisites collection");
        Ok(())
    }
}

#[async_trait]
impl PrerequisiteRepository for MongoPrerequisiteRepository {
    async fn create(&self, edge: QuizPrerequisite) -> AppResult<QuizPrerequisite> {
        self.collection.insert_one(&edge).await.map_err(|err| match AppError::from(err) {
            AppError::Conflict(_) => AppError::AlreadyExists(format!(
                "Quiz '{}' already requires '{}'",
                edge.quiz_id, edge.prerequisite_quiz_id
            )),
            other => other,
        })?;
        Ok(edge)
    }

    async fn find_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<QuizPrerequisite>> {
        let edges = self
            .collection
            .find(doc! { "quiz_id": quiz_id })
            .await?
            .try_collect()
            .await?;
        Ok(edges)
    }

    async fn find_all(&self) -> AppResult<Vec<QuizPrerequisite>> {
        let edges = self.collection.find(doc! {}).await?.try_collect().await?;
        Ok(edges)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let result = self.collection.delete_one(doc! { "id": id }).await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound(format!(
                "Prerequisite with id '{}' not found",
                id
            )));
        }
        Ok(())
    }
}
