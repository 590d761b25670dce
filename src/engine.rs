// src/engine.rs
//
// Progress engine core: next-question sequencing and score aggregation.
// Pure functions over rows the handlers fetch, so the branching edge cases
// are unit-testable without a database.

use std::collections::HashSet;

use serde::Serialize;
use sqlx::FromRow;

use crate::models::question::Question;

/// One (question, answer) pair belonging to a quiz, as consumed by the
/// aggregation. `answer_id` is aliased from `answers.id` when fetched.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerChoice {
    pub question_id: i64,
    pub answer_id: i64,
    pub is_correct: bool,
}

/// Derived per-progress counts. `completed` is recomputed from the answered
/// set on every read rather than trusted from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scorecard {
    pub completed: bool,
    pub questions_answered: i64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub total_answers: i64,
}

/// Picks the next question for a progress cursor.
///
/// `questions` must be in presentation order, i.e. `(created_at, id)`
/// ascending. With no cursor the first question is returned. Otherwise the
/// candidate is the first question strictly after the cursor in creation
/// order; candidates that already carry an answered row are skipped. `None`
/// means the quiz is exhausted for this progress.
///
/// The time cursor tolerates out-of-order and repeated submissions without
/// double-counting, at the cost of the answered-set skip scan.
pub fn next_question<'a>(
    questions: &'a [Question],
    cursor: Option<&Question>,
    answered: &HashSet<i64>,
) -> Option<&'a Question> {
    let Some(cursor) = cursor else {
        return questions.first();
    };

    questions
        .iter()
        .filter(|q| (q.created_at, q.id) > (cursor.created_at, cursor.id))
        .find(|q| !answered.contains(&q.id))
}

/// Aggregates a progress record into a `Scorecard`.
///
/// Every (question, answer) pair of the quiz contributes exactly one point
/// of `total_answers` and is classified as a hit when either the participant
/// selected it and it is correct, or the participant did NOT select it and
/// it is incorrect. Not picking a wrong option counts the same as an
/// explicit correct judgment, including for questions never touched at all.
pub fn scorecard(
    total_questions: i64,
    choices: &[AnswerChoice],
    selections: &HashSet<(i64, i64)>,
    answered_questions: &HashSet<i64>,
) -> Scorecard {
    let mut correct_answers = 0;

    for choice in choices {
        let selected = selections.contains(&(choice.question_id, choice.answer_id));
        if selected == choice.is_correct {
            correct_answers += 1;
        }
    }

    let questions_answered = answered_questions.len() as i64;

    Scorecard {
        completed: questions_answered == total_questions,
        questions_answered,
        total_questions,
        correct_answers,
        total_answers: choices.len() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn question(id: i64, offset_secs: i64) -> Question {
        let t = Utc::now() + Duration::seconds(offset_secs);
        Question {
            id,
            quiz_id: 1,
            question: format!("q{id}"),
            created_at: t,
            updated_at: t,
        }
    }

    fn choice(question_id: i64, answer_id: i64, is_correct: bool) -> AnswerChoice {
        AnswerChoice {
            question_id,
            answer_id,
            is_correct,
        }
    }

    #[test]
    fn first_question_when_no_cursor() {
        let questions = vec![question(1, 0), question(2, 1)];
        let next = next_question(&questions, None, &HashSet::new());
        assert_eq!(next.map(|q| q.id), Some(1));
    }

    #[test]
    fn advances_in_creation_order() {
        let questions = vec![question(1, 0), question(2, 1), question(3, 2)];
        let answered = HashSet::from([1]);
        let next = next_question(&questions, Some(&questions[0]), &answered);
        assert_eq!(next.map(|q| q.id), Some(2));
    }

    #[test]
    fn skips_already_answered_candidates() {
        // Q2 was answered out of order; the cursor sits on Q1.
        let questions = vec![question(1, 0), question(2, 1), question(3, 2)];
        let answered = HashSet::from([1, 2]);
        let next = next_question(&questions, Some(&questions[0]), &answered);
        assert_eq!(next.map(|q| q.id), Some(3));
    }

    #[test]
    fn exhaustion_reports_completed() {
        let questions = vec![question(1, 0), question(2, 1)];
        let answered = HashSet::from([1, 2]);
        let next = next_question(&questions, Some(&questions[1]), &answered);
        assert!(next.is_none());
    }

    #[test]
    fn ties_on_created_at_break_by_id() {
        let t = Utc::now();
        let mut q1 = question(1, 0);
        let mut q2 = question(2, 0);
        q1.created_at = t;
        q2.created_at = t;
        let questions = vec![q1.clone(), q2];
        let next = next_question(&questions, Some(&q1), &HashSet::new());
        assert_eq!(next.map(|q| q.id), Some(2));
    }

    #[test]
    fn untouched_quiz_scores_by_abstention() {
        // One correct and one wrong option per question; nothing answered.
        // The wrong options count as hits (correctly not selected), the
        // correct ones do not.
        let choices = vec![
            choice(1, 10, true),
            choice(1, 11, false),
            choice(2, 20, true),
            choice(2, 21, false),
        ];
        let card = scorecard(2, &choices, &HashSet::new(), &HashSet::new());
        assert_eq!(card.correct_answers, 2);
        assert_eq!(card.total_answers, 4);
        assert_eq!(card.questions_answered, 0);
        assert!(!card.completed);
    }

    #[test]
    fn single_correct_answer_per_question_example() {
        // Two questions, one correct answer each, no distractors. Answering
        // only the first yields one hit: the untouched question's correct
        // row was not selected, and abstention only pays off for wrong rows.
        let choices = vec![choice(1, 10, true), choice(2, 20, true)];
        let selections = HashSet::from([(1, 10)]);
        let answered_questions = HashSet::from([1]);
        let card = scorecard(2, &choices, &selections, &answered_questions);
        assert_eq!(card.correct_answers, 1);
        assert_eq!(card.total_answers, 2);
        assert_eq!(card.questions_answered, 1);
        assert_eq!(card.total_questions, 2);
        assert!(!card.completed);
    }

    #[test]
    fn selecting_a_wrong_answer_loses_both_ways() {
        // Picking the distractor misses its row AND leaves the correct row
        // unselected.
        let choices = vec![choice(1, 10, true), choice(1, 11, false)];
        let selections = HashSet::from([(1, 11)]);
        let answered_questions = HashSet::from([1]);
        let card = scorecard(1, &choices, &selections, &answered_questions);
        assert_eq!(card.correct_answers, 0);
        assert!(card.completed);
    }

    #[test]
    fn multi_correct_questions_accumulate() {
        let choices = vec![
            choice(1, 10, true),
            choice(1, 11, true),
            choice(1, 12, false),
        ];
        let selections = HashSet::from([(1, 10), (1, 11)]);
        let answered_questions = HashSet::from([1]);
        let card = scorecard(1, &choices, &selections, &answered_questions);
        assert_eq!(card.correct_answers, 3);
        assert_eq!(card.total_answers, 3);
    }
}
