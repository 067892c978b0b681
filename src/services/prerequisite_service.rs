use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Quiz, QuizPrerequisite},
        dto::{
            request::CreatePrerequisiteRequest,
            response::{PrerequisiteStatusItem, PrerequisitesStatus},
        },
    },
    repositories::{PrerequisiteRepository, QuizAttemptRepository, QuizRepository},
    services::collaborators::EnrollmentDirectory,
};

/// Adjacency list keyed by quiz id: quiz -> the quizzes it requires.
#[derive(Debug, Default)]
pub struct PrerequisiteGraph {
    edges: HashMap<String, Vec<String>>,
}

impl PrerequisiteGraph {
    pub fn from_edges(edges: &[QuizPrerequisite]) -> Self {
        let mut graph = Self::default();
        for edge in edges {
            graph
                .edges
                .entry(edge.quiz_id.clone())
                .or_default()
                .push(edge.prerequisite_quiz_id.clone());
        }
        graph
    }

    /// True when `from` already (transitively) requires `to`.
    pub fn requires(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(next) = self.edges.get(current) {
                stack.extend(next.iter().map(String::as_str));
            }
        }
        false
    }

    /// Adding `quiz -> prerequisite` closes a cycle iff `prerequisite` already requires `quiz`.
    pub fn would_create_cycle(&self, quiz_id: &str, prerequisite_quiz_id: &str) -> bool {
        self.requires(prerequisite_quiz_id, quiz_id)
    }
}

pub struct PrerequisiteService {
    prerequisites: Arc<dyn PrerequisiteRepository>,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    directory: Arc<dyn EnrollmentDirectory>,
    enforce_acyclic: bool,
    /// Held across the cycle check and the insert.
    edge_writes: Mutex<()>,
}

impl PrerequisiteService {
    pub fn new(
        prerequisites: Arc<dyn PrerequisiteRepository>,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        directory: Arc<dyn EnrollmentDirectory>,
        enforce_acyclic: bool,
    ) -> Self {
        Self {
            prerequisites,
            quizzes,
            attempts,
            directory,
            enforce_acyclic,
            edge_writes: Mutex::new(()),
        }
    }

    /// `prerequisites_status(quiz_id, user_id)`.
    pub async fn status(&self, quiz_id: &str, user_id: &str) -> AppResult<PrerequisitesStatus> {
        let privileged = self.directory.is_instructor(user_id).await?;
        self.evaluate(quiz_id, user_id, privileged).await
    }

    pub async fn are_satisfied(&self, quiz_id: &str, user_id: &str) -> AppResult<bool> {
        Ok(self.status(quiz_id, user_id).await?.all_satisfied)
    }

    /// Unsatisfied edges whose prerequisite is a survey, for the
    /// "complete this survey first" prompt.
    pub async fn pending_survey_prerequisites(
        &self,
        quiz_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<PrerequisiteStatusItem>> {
        Ok(self.status(quiz_id, user_id).await?.pending_surveys())
    }

    /// Evaluates every edge of `quiz_id` for `user_id`; all must hold.
    pub async fn evaluate(
        &self,
        quiz_id: &str,
        user_id: &str,
        privileged: bool,
    ) -> AppResult<PrerequisitesStatus> {
        let edges = self.prerequisites.find_by_quiz(quiz_id).await?;
        if edges.is_empty() {
            return Ok(PrerequisitesStatus {
                all_satisfied: true,
                items: Vec::new(),
            });
        }

        let ids: Vec<String> = edges.iter().map(|e| e.prerequisite_quiz_id.clone()).collect();
        let quizzes: HashMap<String, Quiz> = self
            .quizzes
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|q| (q.id.clone(), q))
            .collect();

        let mut items = Vec::with_capacity(edges.len());
        for edge in &edges {
            let prerequisite = quizzes.get(&edge.prerequisite_quiz_id);
            let bypassed = edge.bypass_for_instructors && privileged;
            let satisfied = bypassed || self.edge_satisfied(edge, user_id).await?;

            items.push(PrerequisiteStatusItem {
                prerequisite_quiz_id: edge.prerequisite_quiz_id.clone(),
                prerequisite_title: prerequisite
                    .map(|q| q.title.clone())
                    .unwrap_or_else(|| edge.prerequisite_quiz_id.clone()),
                required_passing: edge.required_passing,
                is_survey: prerequisite.map(|q| q.is_survey).unwrap_or(false),
                satisfied,
                bypassed,
            });
        }

        let all_satisfied = items.iter().all(|item| item.satisfied);
        Ok(PrerequisitesStatus {
            all_satisfied,
            items,
        })
    }

    async fn edge_satisfied(&self, edge: &QuizPrerequisite, user_id: &str) -> AppResult<bool> {
        let attempts = self
            .attempts
            .find_by_user_and_quiz(user_id, &edge.prerequisite_quiz_id)
            .await?;

        let mut finished = attempts.iter().filter(|a| a.status.is_finished());
        Ok(if edge.required_passing {
            finished.any(|a| a.is_passed)
        } else {
            finished.next().is_some()
        })
    }

    pub async fn add_prerequisite(
        &self,
        request: CreatePrerequisiteRequest,
    ) -> AppResult<QuizPrerequisite> {
        request.validate()?;
        let edge = QuizPrerequisite::new(
            &request.quiz_id,
            &request.prerequisite_quiz_id,
            request.required_passing,
            request.bypass_for_instructors,
        )?;

        for id in [&edge.quiz_id, &edge.prerequisite_quiz_id] {
            if self.quizzes.find_by_id(id).await?.is_none() {
                return Err(AppError::NotFound(format!("Quiz with id '{}' not found", id)));
            }
        }

        let _guard = self.edge_writes.lock().await;
        if self.enforce_acyclic {
            let graph = PrerequisiteGraph::from_edges(&self.prerequisites.find_all().await?);
            if graph.would_create_cycle(&edge.quiz_id, &edge.prerequisite_quiz_id) {
                return Err(AppError::ValidationError(format!(
                    "Requiring '{}' for '{}' would create a prerequisite cycle",
                    edge.prerequisite_quiz_id, edge.quiz_id
                )));
            }
        }

        let edge = self.prerequisites.create(edge).await?;
        log::info!(
            "Quiz {} now requires quiz {} (passing required: {})",
            edge.quiz_id,
            edge.prerequisite_quiz_id,
            edge.required_passing
        );
        Ok(edge)
    }

    pub async fn remove_prerequisite(&self, id: &str) -> AppResult<()> {
        self.prerequisites.delete(id).await?;
        log::info!("Removed prerequisite {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::{AttemptStatus, QuizAttempt};
    use crate::repositories::{
        InMemoryPrerequisiteRepository, InMemoryQuizAttemptRepository, InMemoryQuizRepository,
    };
    use crate::services::collaborators::MockEnrollmentDirectory;

    struct Fixture {
        service: PrerequisiteService,
        quizzes: Arc<InMemoryQuizRepository>,
        attempts: Arc<InMemoryQuizAttemptRepository>,
    }

    fn fixture(instructor: bool) -> Fixture {
        let quizzes = Arc::new(InMemoryQuizRepository::new());
        let attempts = Arc::new(InMemoryQuizAttemptRepository::new());
        let mut directory = MockEnrollmentDirectory::new();
        directory
            .expect_is_instructor()
            .returning(move |_| Ok(instructor));

        let service = PrerequisiteService::new(
            Arc::new(InMemoryPrerequisiteRepository::new()),
            quizzes.clone(),
            attempts.clone(),
            Arc::new(directory),
            true,
        );
        Fixture {
            service,
            quizzes,
            attempts,
        }
    }

    async fn quiz(fixture: &Fixture, title: &str, is_survey: bool) -> Quiz {
        let mut quiz = Quiz::new("course", "module", title);
        quiz.is_survey = is_survey;
        fixture.quizzes.upsert(quiz).await.expect("store quiz")
    }

    async fn record_attempt(fixture: &Fixture, quiz_id: &str, status: AttemptStatus, passed: bool) {
        let count = fixture
            .attempts
            .count_user_attempts("student", quiz_id)
            .await
            .expect("count");
        let mut attempt = QuizAttempt::start(quiz_id, "student", count as u32 + 1);
        attempt.status = status;
        attempt.is_passed = passed;
        fixture.attempts.create(attempt).await.expect("store attempt");
    }

    fn edge(quiz: &Quiz, prerequisite: &Quiz, required_passing: bool, bypass: bool) -> CreatePrerequisiteRequest {
        CreatePrerequisiteRequest {
            quiz_id: quiz.id.clone(),
            prerequisite_quiz_id: prerequisite.id.clone(),
            required_passing,
            bypass_for_instructors: bypass,
        }
    }

    #[tokio::test]
    async fn quiz_without_edges_is_open() {
        let f = fixture(false);
        let target = quiz(&f, "Target", false).await;

        let status = f.service.status(&target.id, "student").await.expect("status");
        assert!(status.all_satisfied);
        assert!(status.items.is_empty());
    }

    #[tokio::test]
    async fn required_passing_needs_a_passed_attempt() {
        let f = fixture(false);
        let intro = quiz(&f, "Intro", false).await;
        let advanced = quiz(&f, "Advanced", false).await;
        f.service
            .add_prerequisite(edge(&advanced, &intro, true, false))
            .await
            .expect("edge");

        record_attempt(&f, &intro.id, AttemptStatus::Completed, false).await;
        assert!(!f.service.are_satisfied(&advanced.id, "student").await.expect("check"));

        record_attempt(&f, &intro.id, AttemptStatus::Completed, true).await;
        assert!(f.service.are_satisfied(&advanced.id, "student").await.expect("check"));
    }

    #[tokio::test]
    async fn attempted_only_edge_ignores_abandoned_and_in_progress() {
        let f = fixture(false);
        let intro = quiz(&f, "Intro", false).await;
        let advanced = quiz(&f, "Advanced", false).await;
        f.service
            .add_prerequisite(edge(&advanced, &intro, false, false))
            .await
            .expect("edge");

        record_attempt(&f, &intro.id, AttemptStatus::Abandoned, false).await;
        assert!(!f.service.are_satisfied(&advanced.id, "student").await.expect("check"));

        record_attempt(&f, &intro.id, AttemptStatus::TimedOut, false).await;
        assert!(f.service.are_satisfied(&advanced.id, "student").await.expect("check"));
    }

    #[tokio::test]
    async fn instructor_bypass_applies_only_to_flagged_edges() {
        let f = fixture(true);
        let intro = quiz(&f, "Intro", false).await;
        let lab = quiz(&f, "Lab", false).await;
        let advanced = quiz(&f, "Advanced", false).await;
        f.service
            .add_prerequisite(edge(&advanced, &intro, true, true))
            .await
            .expect("edge");

        let status = f.service.status(&advanced.id, "instructor").await.expect("status");
        assert!(status.all_satisfied);
        assert!(status.items[0].bypassed);

        f.service
            .add_prerequisite(edge(&advanced, &lab, true, false))
            .await
            .expect("edge");
        assert!(!f.service.are_satisfied(&advanced.id, "instructor").await.expect("check"));
    }

    #[tokio::test]
    async fn pending_surveys_are_reported_separately() {
        let f = fixture(false);
        let survey = quiz(&f, "Welcome survey", true).await;
        let intro = quiz(&f, "Intro", false).await;
        let advanced = quiz(&f, "Advanced", false).await;
        f.service.add_prerequisite(edge(&advanced, &survey, false, false)).await.expect("edge");
        f.service.add_prerequisite(edge(&advanced, &intro, true, false)).await.expect("edge");

        let surveys = f
            .service
            .pending_survey_prerequisites(&advanced.id, "student")
            .await
            .expect("surveys");
        assert_eq!(surveys.len(), 1);
        assert_eq!(surveys[0].prerequisite_title, "Welcome survey");

        record_attempt(&f, &survey.id, AttemptStatus::Completed, true).await;
        let surveys = f
            .service
            .pending_survey_prerequisites(&advanced.id, "student")
            .await
            .expect("surveys");
        assert!(surveys.is_empty());
    }

    #[tokio::test]
    async fn add_prerequisite_rejects_self_loops_cycles_and_duplicates() {
        let f = fixture(false);
        let a = quiz(&f, "A", false).await;
        let b = quiz(&f, "B", false).await;
        let c = quiz(&f, "C", false).await;

        let self_loop = f.service.add_prerequisite(edge(&a, &a, true, false)).await;
        assert!(matches!(self_loop, Err(AppError::ValidationError(_))));

        f.service.add_prerequisite(edge(&b, &a, true, false)).await.expect("b needs a");
        f.service.add_prerequisite(edge(&c, &b, true, false)).await.expect("c needs b");

        let cycle = f.service.add_prerequisite(edge(&a, &c, true, false)).await;
        assert!(matches!(cycle, Err(AppError::ValidationError(_))));

        let duplicate = f.service.add_prerequisite(edge(&b, &a, false, false)).await;
        assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn add_prerequisite_requires_existing_quizzes() {
        let f = fixture(false);
        let a = quiz(&f, "A", false).await;
        let request = CreatePrerequisiteRequest {
            quiz_id: a.id.clone(),
            prerequisite_quiz_id: "ghost".to_string(),
            required_passing: true,
            bypass_for_instructors: false,
        };

        let result = f.service.add_prerequisite(request).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn opposing_edges_added_concurrently_never_form_a_cycle() {
        let f = Arc::new(fixture(false));
        let a = quiz(&f, "A", false).await;
        let b = quiz(&f, "B", false).await;

        let forward = {
            let f = f.clone();
            let request = edge(&a, &b, true, false);
            tokio::spawn(async move { f.service.add_prerequisite(request).await })
        };
        let backward = {
            let f = f.clone();
            let request = edge(&b, &a, true, false);
            tokio::spawn(async move { f.service.add_prerequisite(request).await })
        };

        let results = [forward.await.expect("join"), backward.await.expect("join")];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::ValidationError(_)))));

        let stored = f.service.prerequisites.find_all().await.expect("edges");
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn graph_detects_transitive_requirements() {
        let edges = vec![
            QuizPrerequisite::new("c", "b", true, false).expect("edge"),
            QuizPrerequisite::new("b", "a", true, false).expect("edge"),
        ];
        let graph = PrerequisiteGraph::from_edges(&edges);

        assert!(graph.requires("c", "a"));
        assert!(!graph.requires("a", "c"));
        assert!(graph.would_create_cycle("a", "c"));
        assert!(!graph.would_create_cycle("d", "a"));
    }
}
