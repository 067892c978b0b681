pub mod memory;
pub mod prerequisite_repository;
pub mod quiz_attempt_repository;
pub mod quiz_repository;

pub use memory::{InMemoryPrerequisiteRepository, InMemoryQuizAttemptRepository, InMemoryQuizRepository};
pub use prerequisite_repository::{MongoPrerequisiteRepository, PrerequisiteRepository};
pub use quiz_attempt_repository::{MongoQuizAttemptRepository, QuizAttemptRepository};
pub use quiz_repository::{MongoQuizRepository, QuizRepository};
