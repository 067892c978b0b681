//! Stable per-attempt shuffling of questions and choices.
//!
//! The order is derived from a SHA-256 of the attempt id and the item id, so a
//! resumed attempt is presented exactly as before without storing the order.

use sha2::{Digest, Sha256};

use crate::models::domain::{Question, QuestionKind, Quiz, QuizAttempt};

fn shuffle_key(attempt_id: &str, item_id: &str) -> [u8; 8] {
    let digest = Sha256::new()
        .chain_update(attempt_id.as_bytes())
        .chain_update(b":")
        .chain_update(item_id.as_bytes())
        .finalize();
    let mut key = [0u8; 8];
    key.copy_from_slice(&digest[..8]);
    key
}

/// Questions as presented to the attempt's user.
pub fn presented_questions(quiz: &Quiz, attempt: &QuizAttempt) -> Vec<Question> {
    let mut questions = quiz.questions.clone();

    if quiz.randomize_questions {
        questions.sort_by_cached_key(|q| shuffle_key(&attempt.id, &q.id));
    } else {
        questions.sort_by_key(|q| q.order);
    }

    for question in &mut questions {
        if let QuestionKind::MultipleChoice(mc) = &mut question.kind {
            if quiz.randomize_choices {
                mc.choices.sort_by_cached_key(|c| shuffle_key(&attempt.id, &c.id));
            } else {
                mc.choices.sort_by_key(|c| c.order);
            }
        }
    }
    questions
}
