use std::sync::Arc;

use chrono::Utc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::Quiz,
    repositories::QuizRepository,
};

pub struct QuizService {
    repository: Arc<dyn QuizRepository>,
}

impl QuizService {
    pub fn new(repository: Arc<dyn QuizRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_quiz(&self, id: &str) -> AppResult<Quiz> {
        let quiz = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", id)))?;

        Ok(quiz)
    }

    /// Validates the whole quiz definition, questions included, before storing it.
    pub async fn save_quiz(&self, mut quiz: Quiz) -> AppResult<Quiz> {
        quiz.check()?;
        quiz.modified_at = Some(Utc::now());

        let quiz = self.repository.upsert(quiz).await?;
        log::info!(
            "Saved quiz {} ({} questions, max score {})",
            quiz.id,
            quiz.questions.len(),
            quiz.max_score()
        );
        Ok(quiz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::question::MultipleChoice;
    use crate::models::domain::{Choice, Question};
    use crate::repositories::InMemoryQuizRepository;

    fn service() -> QuizService {
        QuizService::new(Arc::new(InMemoryQuizRepository::new()))
    }

    #[tokio::test]
    async fn saved_quiz_can_be_fetched() {
        let service = service();
        let mut quiz = Quiz::new("course", "module", "Basics");
        quiz.add_question(Question::true_false("Rust has a borrow checker", 1.0, true));

        let saved = service.save_quiz(quiz).await.expect("save");
        let fetched = service.get_quiz(&saved.id).await.expect("fetch");

        assert_eq!(fetched.title, "Basics");
        assert_eq!(fetched.questions.len(), 1);
    }

    #[tokio::test]
    async fn missing_quiz_is_not_found() {
        let result = service().get_quiz("missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn invalid_question_configuration_is_rejected() {
        let service = service();
        let mut quiz = Quiz::new("course", "module", "Broken");
        quiz.add_question(Question::multiple_choice(
            "Pick one",
            1.0,
            MultipleChoice {
                allow_multiple: false,
                use_partial_credit: false,
                minimum_score: 0.0,
                choices: vec![Choice::new("a", false), Choice::new("b", false)],
            },
        ));

        let result = service.save_quiz(quiz).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
