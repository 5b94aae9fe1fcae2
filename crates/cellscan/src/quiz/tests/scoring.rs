use super::common::*;
use crate::quiz::domain::{AnswerValue, QuestionId, Responses};
use crate::quiz::scoring::{compute_score, ScoreWarning};

fn responses(entries: &[(u32, AnswerValue)]) -> Responses {
    entries
        .iter()
        .map(|(id, value)| (QuestionId(*id), value.clone()))
        .collect()
}

#[test]
fn boolean_questions_sum_weights_of_yes_answers() {
    let questions = vec![boolean(1, 10), boolean(2, 20), boolean(3, 30)];
    let answers = responses(&[
        (1, AnswerValue::text("Yes")),
        (2, AnswerValue::text("No")),
        (3, AnswerValue::text("Yes")),
    ]);

    let card = compute_score(&questions, &answers);

    assert_eq!(card.total, 40);
    assert_eq!(card.components.len(), 3);
    assert!(card.warnings.is_empty());
}

#[test]
fn boolean_contribution_is_all_or_nothing() {
    let questions = vec![boolean(1, 17)];
    for (answer, expected) in [("Yes", 17), ("No", 0), ("yes", 0), ("YES", 0), ("true", 0)] {
        let card = compute_score(&questions, &responses(&[(1, AnswerValue::text(answer))]));
        assert_eq!(card.total, expected, "answer {answer}");
    }
}

#[test]
fn range_answers_are_normalized_and_rounded() {
    let questions = vec![range(1, 1.0, 10.0, 50)];

    let card = compute_score(&questions, &responses(&[(1, AnswerValue::Number(5.0))]));

    assert_eq!(card.total, 22);
    assert_eq!(card.components[0].question_id, QuestionId(1));
}

#[test]
fn range_bounds_map_to_zero_and_full_weight() {
    let questions = vec![range(1, 2.0, 9.0, 35)];

    let low = compute_score(&questions, &responses(&[(1, AnswerValue::Number(2.0))]));
    let high = compute_score(&questions, &responses(&[(1, AnswerValue::Number(9.0))]));

    assert_eq!(low.total, 0);
    assert_eq!(high.total, 35);
}

#[test]
fn halves_round_up() {
    let questions = vec![range(1, 0.0, 2.0, 5)];
    let card = compute_score(&questions, &responses(&[(1, AnswerValue::Number(1.0))]));
    assert_eq!(card.total, 3);
}

#[test]
fn select_answers_scale_with_option_position() {
    let questions = vec![select(1, &["Low", "Medium", "High"], 30)];

    let card = compute_score(&questions, &responses(&[(1, AnswerValue::text("High"))]));

    assert_eq!(card.total, 30);
}

#[test]
fn select_contribution_never_decreases_along_options() {
    let options = ["Never", "Rarely", "Monthly", "Weekly", "Daily", "Hourly", "Always"];
    let questions = vec![select(1, &options, 13)];

    let contributions: Vec<u32> = options
        .iter()
        .map(|option| {
            let answered = responses(&[(1, AnswerValue::text(*option))]);
            compute_score(&questions, &answered).total
        })
        .collect();

    assert_eq!(contributions.first(), Some(&0));
    assert_eq!(contributions.last(), Some(&13));
    assert!(contributions.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn unanswered_questions_contribute_nothing() {
    let questions = vec![boolean(1, 10), boolean(2, 20), select(3, &["A", "B"], 30)];
    let card = compute_score(&questions, &responses(&[(2, AnswerValue::text("Yes"))]));

    assert_eq!(card.total, 20);
    assert_eq!(card.components.len(), 1);
}

#[test]
fn scoring_is_repeatable() {
    let questions = vec![boolean(1, 10), range(2, 1.0, 10.0, 50), select(3, &["A", "B", "C"], 30)];
    let answers = responses(&[
        (1, AnswerValue::text("Yes")),
        (2, AnswerValue::Number(5.0)),
        (3, AnswerValue::text("B")),
    ]);

    let first = compute_score(&questions, &answers);
    let second = compute_score(&questions, &answers);

    assert_eq!(first, second);
    assert_eq!(first.total, 10 + 22 + 15);
}

#[test]
fn degenerate_questions_score_zero_with_warnings() {
    let questions = vec![
        range(1, 4.0, 4.0, 25),
        select(2, &["Only"], 25),
        select(3, &["A", "B"], 25),
        boolean(4, 25),
    ];
    let answers = responses(&[
        (1, AnswerValue::Number(4.0)),
        (2, AnswerValue::text("Only")),
        (3, AnswerValue::text("Z")),
        (4, AnswerValue::Number(1.0)),
    ]);

    let card = compute_score(&questions, &answers);

    assert_eq!(card.total, 0);
    assert_eq!(card.components.len(), 4);
    assert!(matches!(card.warnings[0], ScoreWarning::DegenerateRange { .. }));
    assert!(matches!(
        card.warnings[1],
        ScoreWarning::DegenerateSelect { option_count: 1, .. }
    ));
    assert!(matches!(card.warnings[2], ScoreWarning::UnknownOption { .. }));
    assert!(matches!(card.warnings[3], ScoreWarning::MismatchedValue { .. }));
    assert!(card.components[2].notes.contains("not scored"));
}
