//! Per-kind answer checking.
//!
//! Every strategy is infallible: malformed or missing answers score zero with
//! explanatory feedback, so one bad response never blocks an attempt.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::models::domain::question::{Essay, MultipleChoice, TrueFalse};
use crate::models::domain::{GradingStatus, Question, QuestionKind};

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub is_correct: bool,
    pub points_earned: f64,
    pub feedback: String,
    pub grading_status: GradingStatus,
}

impl CheckOutcome {
    fn graded(is_correct: bool, points_earned: f64, feedback: impl Into<String>) -> Self {
        CheckOutcome {
            is_correct,
            points_earned,
            feedback: feedback.into(),
            grading_status: GradingStatus::AutoGraded,
        }
    }

    fn incorrect(feedback: impl Into<String>) -> Self {
        Self::graded(false, 0.0, feedback)
    }
}

pub type Strategy = fn(&Question, &Value) -> CheckOutcome;

pub fn strategy_for(kind: &QuestionKind) -> Strategy {
    match kind {
        QuestionKind::MultipleChoice(_) => check_multiple_choice,
        QuestionKind::TrueFalse(_) => check_true_false,
        QuestionKind::Essay(_) => check_essay,
        QuestionKind::Unsupported => check_unsupported,
    }
}

pub fn check_answer(question: &Question, response_data: &Value) -> CheckOutcome {
    let outcome = strategy_for(&question.kind)(question, response_data);
    log::debug!(
        "Checked {} question {}: correct={} points={}",
        question.kind.label(),
        question.id,
        outcome.is_correct,
        outcome.points_earned
    );
    outcome
}

fn check_multiple_choice(question: &Question, data: &Value) -> CheckOutcome {
    let QuestionKind::MultipleChoice(mc) = &question.kind else {
        return check_unsupported(question, data);
    };
    let selected = selected_choice_ids(data);

    if mc.use_partial_credit && mc.allow_multiple {
        score_partial_credit(question.points, mc, &selected)
    } else if mc.allow_multiple {
        score_all_or_nothing(question.points, mc, &selected)
    } else {
        score_single_answer(question.points, mc, &selected)
    }
}

fn score_single_answer(points: f64, mc: &MultipleChoice, selected: &BTreeSet<String>) -> CheckOutcome {
    if selected.len() != 1 {
        return CheckOutcome::incorrect(if selected.is_empty() {
            "No answer selected."
        } else {
            "Select exactly one answer."
        });
    }

    let is_correct = selected
        .iter()
        .next()
        .and_then(|id| mc.choice(id))
        .map(|choice| choice.is_correct)
        .unwrap_or(false);

    if is_correct {
        CheckOutcome::graded(true, points, "Correct!")
    } else {
        CheckOutcome::incorrect("Incorrect.")
    }
}

fn score_all_or_nothing(points: f64, mc: &MultipleChoice, selected: &BTreeSet<String>) -> CheckOutcome {
    if selected.is_empty() {
        return CheckOutcome::incorrect("No answer selected.");
    }

    let correct: BTreeSet<String> = mc.correct_choice_ids().map(str::to_string).collect();
    if *selected == correct {
        CheckOutcome::graded(true, points, "Correct!")
    } else {
        CheckOutcome::incorrect("Incorrect. All correct options must be selected and no others.")
    }
}

fn score_partial_credit(points: f64, mc: &MultipleChoice, selected: &BTreeSet<String>) -> CheckOutcome {
    let chosen: Vec<_> = selected
        .iter()
        .filter_map(|id| mc.choice(id))
        .filter(|choice| !choice.is_neutral)
        .collect();

    let raw: f64 = chosen.iter().map(|choice| choice.points_value).sum();
    let floor = mc.minimum_score.min(points);
    let earned = raw.clamp(floor, points);

    let chosen_ids: BTreeSet<&str> = chosen.iter().map(|choice| choice.id.as_str()).collect();
    let correct_ids: BTreeSet<&str> = mc.correct_choice_ids().collect();
    let fully_correct = !chosen_ids.is_empty() && chosen_ids == correct_ids;

    let feedback = if fully_correct {
        "Correct!".to_string()
    } else if earned > 0.0 {
        format!("Partially correct: {} of {} points.", earned, points)
    } else {
        "Incorrect.".to_string()
    };

    CheckOutcome::graded(fully_correct, earned, feedback)
}

/// Accepts `{"selected_choices": [..]}`, `{"selected_choice": id}` or a bare
/// id / list. Numeric ids are compared in their decimal form.
fn selected_choice_ids(data: &Value) -> BTreeSet<String> {
    let raw = data
        .get("selected_choices")
        .or_else(|| data.get("selected_choice"))
        .unwrap_or(data);

    match raw {
        Value::Array(items) => items.iter().filter_map(choice_id).collect(),
        other => choice_id(other).into_iter().collect(),
    }
}

fn choice_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn check_true_false(question: &Question, data: &Value) -> CheckOutcome {
    let QuestionKind::TrueFalse(TrueFalse { correct_answer }) = &question.kind else {
        return check_unsupported(question, data);
    };

    match parse_boolean(data.get("answer").unwrap_or(data)) {
        None => CheckOutcome::incorrect("No answer provided."),
        Some(answer) if answer == *correct_answer => {
            CheckOutcome::graded(true, question.points, "Correct!")
        }
        Some(_) => CheckOutcome::incorrect("Incorrect."),
    }
}

pub(crate) fn parse_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn check_essay(question: &Question, data: &Value) -> CheckOutcome {
    let QuestionKind::Essay(essay) = &question.kind else {
        return check_unsupported(question, data);
    };

    let text = data
        .get("essay_text")
        .and_then(Value::as_str)
        .or_else(|| data.as_str())
        .unwrap_or_default();

    let mut feedback = String::new();
    if let Some(problem) = word_count_problem(essay, word_count(text)) {
        feedback.push_str(&problem);
        feedback.push(' ');
    }
    feedback.push_str("Submitted for instructor grading.");

    CheckOutcome {
        is_correct: false,
        points_earned: 0.0,
        feedback,
        grading_status: GradingStatus::PendingManual,
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn word_count_problem(essay: &Essay, words: usize) -> Option<String> {
    let min = essay.min_word_count as usize;
    let max = essay.max_word_count as usize;
    if min > 0 && words < min {
        Some(format!("Essay has {} words; at least {} are required.", words, min))
    } else if max > 0 && words > max {
        Some(format!("Essay has {} words; at most {} are allowed.", words, max))
    } else {
        None
    }
}

fn check_unsupported(question: &Question, _data: &Value) -> CheckOutcome {
    log::warn!(
        "Question {} has unsupported kind '{}'; scoring zero",
        question.id,
        question.kind.label()
    );
    CheckOutcome {
        is_correct: false,
        points_earned: 0.0,
        feedback: format!(
            "Question type '{}' cannot be scored automatically.",
            question.kind.label()
        ),
        grading_status: GradingStatus::Unscorable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::question::{Choice, MultipleChoice};
    use serde_json::json;

    fn single_answer() -> (Question, String, String) {
        let right = Choice::new("Ownership", true);
        let wrong = Choice::new("Garbage collection", false);
        let (right_id, wrong_id) = (right.id.clone(), wrong.id.clone());
        let question = Question::multiple_choice(
            "How does Rust manage memory?",
            5.0,
            MultipleChoice {
                allow_multiple: false,
                use_partial_credit: false,
                minimum_score: 0.0,
                choices: vec![right, wrong],
            },
        );
        (question, right_id, wrong_id)
    }

    fn multi_answer(partial: bool, minimum_score: f64) -> (Question, Vec<String>) {
        let choices = vec![
            Choice::new("Vec", true).with_points(2.0),
            Choice::new("HashMap", true).with_points(2.0),
            Choice::new("int", false).with_points(-1.0),
            Choice::new("Skip", false).neutral().with_points(5.0),
        ];
        let ids = choices.iter().map(|c| c.id.clone()).collect();
        let question = Question::multiple_choice(
            "Pick the std collections",
            4.0,
            MultipleChoice {
                allow_multiple: true,
                use_partial_credit: partial,
                minimum_score,
                choices,
            },
        );
        (question, ids)
    }

    #[test]
    fn single_answer_correct_choice_earns_full_points() {
        let (question, right, _) = single_answer();
        let outcome = check_answer(&question, &json!({ "selected_choice": right }));

        assert!(outcome.is_correct);
        assert_eq!(outcome.points_earned, 5.0);
        assert_eq!(outcome.grading_status, GradingStatus::AutoGraded);
    }

    #[test]
    fn single_answer_rejects_multiple_selections() {
        let (question, right, wrong) = single_answer();
        let outcome = check_answer(&question, &json!({ "selected_choices": [right, wrong] }));

        assert!(!outcome.is_correct);
        assert_eq!(outcome.points_earned, 0.0);
    }

    #[test]
    fn single_answer_wrong_or_unknown_choice_scores_zero() {
        let (question, _, wrong) = single_answer();

        assert!(!check_answer(&question, &json!({ "selected_choice": wrong })).is_correct);
        assert!(!check_answer(&question, &json!({ "selected_choice": "nope" })).is_correct);
        assert!(!check_answer(&question, &json!({})).is_correct);
    }

    #[test]
    fn all_or_nothing_requires_exact_set() {
        let (question, ids) = multi_answer(false, 0.0);

        let exact = check_answer(&question, &json!({ "selected_choices": [ids[0], ids[1]] }));
        assert!(exact.is_correct);
        assert_eq!(exact.points_earned, 4.0);

        let subset = check_answer(&question, &json!({ "selected_choices": [ids[0]] }));
        assert!(!subset.is_correct);
        assert_eq!(subset.points_earned, 0.0);

        let superset =
            check_answer(&question, &json!({ "selected_choices": [ids[0], ids[1], ids[2]] }));
        assert!(!superset.is_correct);

        let with_neutral =
            check_answer(&question, &json!({ "selected_choices": [ids[0], ids[1], ids[3]] }));
        assert!(!with_neutral.is_correct);
    }

    #[test]
    fn partial_credit_sums_selected_values() {
        let (question, ids) = multi_answer(true, 0.0);

        let one = check_answer(&question, &json!({ "selected_choices": [ids[0]] }));
        assert!(!one.is_correct);
        assert_eq!(one.points_earned, 2.0);
        assert!(one.feedback.starts_with("Partially correct"));

        let mixed = check_answer(&question, &json!({ "selected_choices": [ids[0], ids[2]] }));
        assert_eq!(mixed.points_earned, 1.0);
    }

    #[test]
    fn partial_credit_ignores_neutral_choices() {
        let (question, ids) = multi_answer(true, 0.0);
        let outcome =
            check_answer(&question, &json!({ "selected_choices": [ids[0], ids[1], ids[3]] }));

        assert!(outcome.is_correct);
        assert_eq!(outcome.points_earned, 4.0);
    }

    #[test]
    fn partial_credit_is_clamped_to_floor_and_ceiling() {
        let (question, ids) = multi_answer(true, -0.5);

        let negative = check_answer(&question, &json!({ "selected_choices": [ids[2]] }));
        assert_eq!(negative.points_earned, -0.5);

        let mut generous = question.clone();
        if let QuestionKind::MultipleChoice(mc) = &mut generous.kind {
            mc.choices[0].points_value = 10.0;
        }
        let capped = check_answer(&generous, &json!({ "selected_choices": [ids[0], ids[1]] }));
        assert_eq!(capped.points_earned, 4.0);
    }

    #[test]
    fn partial_credit_is_monotonic_in_correct_choices() {
        let (question, ids) = multi_answer(true, -2.0);
        let selections = [
            vec![ids[2].clone()],
            vec![ids[2].clone(), ids[0].clone()],
            vec![ids[2].clone(), ids[0].clone(), ids[1].clone()],
        ];

        let mut previous = f64::MIN;
        for selection in selections {
            let earned = check_answer(&question, &json!({ "selected_choices": selection }))
                .points_earned;
            assert!(earned >= previous, "{} dropped below {}", earned, previous);
            assert!((-2.0..=4.0).contains(&earned));
            previous = earned;
        }
    }

    #[test]
    fn true_false_accepts_boolean_like_inputs() {
        let question = Question::true_false("Rust has a borrow checker", 1.0, true);

        for answer in [json!(true), json!("true"), json!("TRUE"), json!(1), json!("1")] {
            let outcome = check_answer(&question, &json!({ "answer": answer }));
            assert!(outcome.is_correct, "{:?} should be accepted as true", answer);
            assert_eq!(outcome.points_earned, 1.0);
        }

        for answer in [json!(false), json!("false"), json!(0), json!("0")] {
            assert!(!check_answer(&question, &json!({ "answer": answer })).is_correct);
        }
    }

    #[test]
    fn true_false_unparseable_is_no_answer() {
        let question = Question::true_false("?", 1.0, false);

        for data in [json!({ "answer": "maybe" }), json!({ "answer": 2 }), json!(null)] {
            let outcome = check_answer(&question, &data);
            assert!(!outcome.is_correct);
            assert_eq!(outcome.points_earned, 0.0);
            assert_eq!(outcome.feedback, "No answer provided.");
        }
    }

    #[test]
    fn essay_is_never_auto_scored() {
        let question = Question::essay("Discuss lifetimes", 10.0, 3, 0);
        let outcome = check_answer(
            &question,
            &json!({ "essay_text": "Lifetimes describe how long references stay valid." }),
        );

        assert!(!outcome.is_correct);
        assert_eq!(outcome.points_earned, 0.0);
        assert_eq!(outcome.grading_status, GradingStatus::PendingManual);
        assert_eq!(outcome.feedback, "Submitted for instructor grading.");
    }

    #[test]
    fn essay_word_count_bounds_are_reported() {
        let question = Question::essay("Discuss", 10.0, 5, 8);

        let short = check_answer(&question, &json!({ "essay_text": "too short" }));
        assert!(short.feedback.contains("at least 5"));
        assert_eq!(short.grading_status, GradingStatus::PendingManual);

        let long = check_answer(
            &question,
            &json!({ "essay_text": "one two three four five six seven eight nine" }),
        );
        assert!(long.feedback.contains("at most 8"));
    }

    #[test]
    fn unsupported_kind_scores_zero_without_failing() {
        let mut question = Question::true_false("?", 3.0, true);
        question.kind = QuestionKind::Unsupported;
        let outcome = check_answer(&question, &json!({ "answer": true }));

        assert!(!outcome.is_correct);
        assert_eq!(outcome.points_earned, 0.0);
        assert_eq!(outcome.grading_status, GradingStatus::Unscorable);
    }

    #[test]
    fn word_count_splits_on_any_whitespace() {
        assert_eq!(word_count("  one\ttwo\nthree  "), 3);
        assert_eq!(word_count(""), 0);
    }
}
