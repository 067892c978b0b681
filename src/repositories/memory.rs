//! In-process repositories backed by `RwLock<HashMap>`.
//!
//! They enforce the same uniqueness and optimistic-version rules as the
//! MongoDB implementations, which makes them usable for tests and for
//! embedding the engine without a database.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{AttemptStatus, Quiz, QuizAttempt, QuizPrerequisite},
    repositories::{PrerequisiteRepository, QuizAttemptRepository, QuizRepository},
};

#[derive(Default)]
pub struct InMemoryQuizRepository {
    quizzes: Arc<RwLock<HashMap<String, Quiz>>>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(quizzes.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        Ok(ids.iter().filter_map(|id| quizzes.get(id).cloned()).collect())
    }

    async fn upsert(&self, quiz: Quiz) -> AppResult<Quiz> {
        let mut quizzes = self.quizzes.write().await;
        quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }
}

#[derive(Default)]
pub struct InMemoryQuizAttemptRepository {
    attempts: Arc<RwLock<HashMap<String, QuizAttempt>>>,
}

impl InMemoryQuizAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryQuizAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let mut attempts = self.attempts.write().await;
        if attempts.contains_key(&attempt.id) {
            return Err(AppError::AlreadyExists(format!(
                "Attempt with id '{}' already exists",
                attempt.id
            )));
        }

        let same_pair = |a: &&QuizAttempt| a.quiz_id == attempt.quiz_id && a.user_id == attempt.user_id;
        if attempts
            .values()
            .filter(same_pair)
            .any(|a| a.attempt_number == attempt.attempt_number)
        {
            return Err(AppError::Conflict(format!(
                "Attempt number {} already used for quiz '{}' by user '{}'",
                attempt.attempt_number, attempt.quiz_id, attempt.user_id
            )));
        }
        if attempt.status == AttemptStatus::InProgress
            && attempts
                .values()
                .filter(same_pair)
                .any(|a| a.status == AttemptStatus::InProgress)
        {
            return Err(AppError::Conflict(format!(
                "User '{}' already has an attempt in progress for quiz '{}'",
                attempt.user_id, attempt.quiz_id
            )));
        }

        attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts.get(id).cloned())
    }

    async fn find_by_user_and_quiz(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        let mut items: Vec<_> = attempts
            .values()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .cloned()
            .collect();
        items.sort_by_key(|a| a.attempt_number);
        Ok(items)
    }

    async fn find_in_progress(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .find(|a| {
                a.user_id == user_id && a.quiz_id == quiz_id && a.status == AttemptStatus::InProgress
            })
            .cloned())
    }

    async fn count_user_attempts(&self, user_id: &str, quiz_id: &str) -> AppResult<usize> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .count())
    }

    async fn find_by_response_id(&self, response_id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .find(|a| a.response(response_id).is_some())
            .cloned())
    }

    async fn find_pending_grading(&self, quiz_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        let mut items: Vec<_> = attempts
            .values()
            .filter(|a| {
                a.quiz_id == quiz_id && a.status.is_finished() && a.pending_grading_count() > 0
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(items)
    }

    async fn update(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let mut attempts = self.attempts.write().await;
        let stored = attempts.get(&attempt.id).ok_or_else(|| {
            AppError::NotFound(format!("Attempt with id '{}' not found", attempt.id))
        })?;

        if stored.version != attempt.version {
            return Err(AppError::Conflict(format!(
                "Attempt '{}' was modified concurrently",
                attempt.id
            )));
        }

        let mut next = attempt;
        next.version += 1;
        attempts.insert(next.id.clone(), next.clone());
        Ok(next)
    }
}

#[derive(Default)]
pub struct InMemoryPrerequisiteRepository {
    edges: Arc<RwLock<HashMap<String, QuizPrerequisite>>>,
}

impl InMemoryPrerequisiteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrerequisiteRepository for InMemoryPrerequisiteRepository {
    async fn create(&self, edge: QuizPrerequisite) -> AppResult<QuizPrerequisite> {
        let mut edges = self.edges.write().await;
        let duplicate = edges.values().any(|e| {
            e.quiz_id == edge.quiz_id && e.prerequisite_quiz_id == edge.prerequisite_quiz_id
        });
        if duplicate || edges.contains_key(&edge.id) {
            return Err(AppError::AlreadyExists(format!(
                "Quiz '{}' already requires '{}'",
                edge.quiz_id, edge.prerequisite_quiz_id
            )));
        }
        edges.insert(edge.id.clone(), edge.clone());
        Ok(edge)
    }

    async fn find_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<QuizPrerequisite>> {
        let edges = self.edges.read().await;
        let mut items: Vec<_> = edges
            .values()
            .filter(|e| e.quiz_id == quiz_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.prerequisite_quiz_id.cmp(&b.prerequisite_quiz_id));
        Ok(items)
    }

    async fn find_all(&self) -> AppResult<Vec<QuizPrerequisite>> {
        let edges = self.edges.read().await;
        Ok(edges.values().cloned().collect())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut edges = self.edges.write().await;
        if edges.remove(id).is_none() {
            return Err(AppError::NotFound(format!(
                "Prerequisite with id '{}' not found",
                id
            )));
        }
        Ok(())
    }
}
