use std::sync::Arc;
use std::time::Duration;

use crate::models::domain::question::MultipleChoice;
use crate::models::domain::{Choice, Question, QuestionKind, Quiz};
use crate::repositories::{
    InMemoryPrerequisiteRepository, InMemoryQuizAttemptRepository, InMemoryQuizRepository,
    QuizRepository,
};
use crate::services::attempt_locks::AttemptLocks;
use crate::services::collaborators::{MockEnrollmentDirectory, MockProgressSink};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// In-memory stores shared between the services under test and the assertions.
pub struct TestRepos {
    pub quizzes: Arc<InMemoryQuizRepository>,
    pub attempts: Arc<InMemoryQuizAttemptRepository>,
    pub prerequisites: Arc<InMemoryPrerequisiteRepository>,
    pub locks: Arc<AttemptLocks>,
}

impl TestRepos {
    pub fn new() -> Self {
        init_logging();
        Self {
            quizzes: Arc::new(InMemoryQuizRepository::new()),
            attempts: Arc::new(InMemoryQuizAttemptRepository::new()),
            prerequisites: Arc::new(InMemoryPrerequisiteRepository::new()),
            locks: Arc::new(AttemptLocks::new(Duration::from_millis(50))),
        }
    }

    pub async fn store(&self, quiz: Quiz) -> Quiz {
        self.quizzes.upsert(quiz).await.expect("store quiz")
    }
}

pub fn directory(enrolled: bool, instructor: bool) -> MockEnrollmentDirectory {
    let mut directory = MockEnrollmentDirectory::new();
    directory
        .expect_is_enrolled()
        .returning(move |_, _| Ok(enrolled));
    directory
        .expect_is_instructor()
        .returning(move |_| Ok(instructor));
    directory
}

/// Sink that must be called exactly `times` times.
pub fn progress_sink(times: usize) -> MockProgressSink {
    let mut sink = MockProgressSink::new();
    sink.expect_quiz_passed()
        .times(times)
        .returning(|_, _| Ok(()));
    sink
}

pub fn single_answer(text: &str, points: f64) -> Question {
    Question::multiple_choice(
        text,
        points,
        MultipleChoice {
            allow_multiple: false,
            use_partial_credit: false,
            minimum_score: 0.0,
            choices: vec![
                Choice::new("right", true),
                Choice::new("wrong", false),
                Choice::new("also wrong", false),
            ],
        },
    )
}

pub fn correct_choice(question: &Question) -> String {
    match &question.kind {
        QuestionKind::MultipleChoice(mc) => mc
            .correct_choice_ids()
            .next()
            .expect("question has a correct choice")
            .to_string(),
        _ => panic!("not a multiple choice question"),
    }
}

pub fn wrong_choice(question: &Question) -> String {
    match &question.kind {
        QuestionKind::MultipleChoice(mc) => mc
            .choices
            .iter()
            .find(|c| !c.is_correct)
            .expect("question has a wrong choice")
            .id
            .clone(),
        _ => panic!("not a multiple choice question"),
    }
}

/// Multiple choice worth 5 and an essay worth 5, passing at 70%.
pub fn mc_and_essay_quiz() -> Quiz {
    let mut quiz = Quiz::new("course-1", "module-1", "Ownership");
    quiz.passing_score = 70.0;
    quiz.add_question(single_answer("Who owns a moved value?", 5.0));
    quiz.add_question(Question::essay("Explain borrowing", 5.0, 0, 0));
    quiz
}

pub fn true_false_quiz(count: usize) -> Quiz {
    let mut quiz = Quiz::new("course-1", "module-1", "Quick check");
    for i in 0..count {
        let mut question = Question::true_false(&format!("Statement {}", i + 1), 1.0, true);
        question.order = i as i32;
        quiz.add_question(question);
    }
    quiz
}
