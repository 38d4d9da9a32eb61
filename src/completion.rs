use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Error;
use crate::models::{Answer, InterviewResponse, Questionnaire, ResponseStatus};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOutcome {
    pub percentage: i32,
    pub status: ResponseStatus,
}

/// Derives completion percentage and status for one answer set.
///
/// The percentage counts answered questions over all questions; the status
/// only looks at the required subset, so a response can sit at 100% answered
/// optionals and still be a draft. A question answered more than once in the
/// answer set counts once.
pub fn compute_completion(
    questionnaire: &Questionnaire,
    answers: &[Answer],
) -> Result<CompletionOutcome, Error> {
    let known: HashSet<Uuid> = questionnaire.questions.iter().map(|q| q.id).collect();

    let mut answered: HashSet<Uuid> = HashSet::new();
    for answer in answers {
        if !known.contains(&answer.question_id) {
            return Err(Error::invalid_reference(
                "question",
                answer.question_id.to_string(),
            ));
        }
        if answer.value.is_answered() {
            answered.insert(answer.question_id);
        }
    }

    let total = questionnaire.questions.len();
    if total == 0 {
        return Ok(CompletionOutcome {
            percentage: 0,
            status: ResponseStatus::Draft,
        });
    }

    let percentage = ((answered.len() * 100) as f64 / total as f64).round() as i32;

    let required_total = questionnaire
        .questions
        .iter()
        .filter(|q| q.required)
        .count();
    let required_answered = questionnaire
        .questions
        .iter()
        .filter(|q| q.required && answered.contains(&q.id))
        .count();

    let status = if required_total > 0 && required_answered == required_total {
        ResponseStatus::Completed
    } else if required_answered > 0 {
        ResponseStatus::Incomplete
    } else {
        ResponseStatus::Draft
    };

    Ok(CompletionOutcome { percentage, status })
}

/// Recomputes a response in place after its answers changed.
///
/// `last_modified` is always bumped. `submitted_at` is set on the first
/// transition to completed, kept untouched while the response stays completed,
/// and cleared if later edits drop it back out of completed.
pub fn refresh_completion(
    response: &mut InterviewResponse,
    questionnaire: &Questionnaire,
    now: DateTime<Utc>,
) -> Result<(), Error> {
    let outcome = compute_completion(questionnaire, &response.answers)?;

    response.completion_percentage = outcome.percentage;
    response.status = outcome.status;
    response.last_modified = now;

    match outcome.status {
        ResponseStatus::Completed => {
            if response.submitted_at.is_none() {
                response.submitted_at = Some(now);
            }
        }
        _ => response.submitted_at = None,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerValue, Question, QuestionType};
    use chrono::Duration;

    fn question(id: Uuid, required: bool, position: i32) -> Question {
        Question {
            id,
            prompt: format!("Question {position}"),
            kind: QuestionType::Text,
            required,
            options: None,
            position,
        }
    }

    fn questionnaire(questions: Vec<Question>) -> Questionnaire {
        Questionnaire {
            id: Uuid::new_v4(),
            title: "Technical Skills Assessment".to_string(),
            description: "Assessment for technical roles".to_string(),
            questions,
            created_at: Utc::now(),
            is_active: true,
            assigned_to: vec![],
        }
    }

    fn single(question_id: Uuid, text: &str) -> Answer {
        Answer {
            question_id,
            value: AnswerValue::Single(text.to_string()),
        }
    }

    fn draft_response(questionnaire_id: Uuid, answers: Vec<Answer>) -> InterviewResponse {
        InterviewResponse {
            id: Uuid::new_v4(),
            questionnaire_id,
            user_id: Uuid::new_v4(),
            answers,
            status: ResponseStatus::Draft,
            submitted_at: None,
            last_modified: Utc::now() - Duration::days(1),
            completion_percentage: 0,
        }
    }

    #[test]
    fn two_required_and_one_optional_answered_out_of_four() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let form = questionnaire(vec![
            question(ids[0], true, 1),
            question(ids[1], true, 2),
            question(ids[2], true, 3),
            question(ids[3], false, 4),
        ]);
        let answers = vec![
            single(ids[0], "Avery"),
            single(ids[1], "avery@example.com"),
            single(ids[3], "optional note"),
        ];

        let outcome = compute_completion(&form, &answers).unwrap();
        assert_eq!(outcome.percentage, 75);
        assert_eq!(outcome.status, ResponseStatus::Incomplete);
    }

    #[test]
    fn empty_questionnaire_is_a_zero_percent_draft() {
        let form = questionnaire(vec![]);
        let outcome = compute_completion(&form, &[]).unwrap();
        assert_eq!(outcome.percentage, 0);
        assert_eq!(outcome.status, ResponseStatus::Draft);
    }

    #[test]
    fn all_required_answered_completes_despite_unanswered_optionals() {
        let req = Uuid::new_v4();
        let opt = Uuid::new_v4();
        let form = questionnaire(vec![question(req, true, 1), question(opt, false, 2)]);

        let outcome = compute_completion(&form, &[single(req, "done")]).unwrap();
        assert_eq!(outcome.status, ResponseStatus::Completed);
        assert_eq!(outcome.percentage, 50);
    }

    #[test]
    fn only_optionals_answered_stays_draft() {
        let req = Uuid::new_v4();
        let opt = Uuid::new_v4();
        let form = questionnaire(vec![question(req, true, 1), question(opt, false, 2)]);

        let outcome = compute_completion(&form, &[single(opt, "extra")]).unwrap();
        assert_eq!(outcome.status, ResponseStatus::Draft);
        assert_eq!(outcome.percentage, 50);
    }

    #[test]
    fn empty_string_answers_do_not_count() {
        let id = Uuid::new_v4();
        let form = questionnaire(vec![question(id, true, 1)]);

        let outcome = compute_completion(&form, &[single(id, "")]).unwrap();
        assert_eq!(outcome.percentage, 0);
        assert_eq!(outcome.status, ResponseStatus::Draft);
    }

    #[test]
    fn empty_checkbox_selection_does_not_count() {
        let id = Uuid::new_v4();
        let form = questionnaire(vec![question(id, true, 1)]);
        let answer = Answer {
            question_id: id,
            value: AnswerValue::Multi(vec![]),
        };

        let outcome = compute_completion(&form, &[answer]).unwrap();
        assert_eq!(outcome.status, ResponseStatus::Draft);
    }

    #[test]
    fn duplicate_answers_for_one_question_count_once() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let form = questionnaire(vec![question(a, true, 1), question(b, true, 2)]);
        let answers = vec![single(a, "first"), single(a, "edited")];

        let outcome = compute_completion(&form, &answers).unwrap();
        assert_eq!(outcome.percentage, 50);
        assert_eq!(outcome.status, ResponseStatus::Incomplete);
    }

    #[test]
    fn answer_to_unknown_question_is_rejected() {
        let form = questionnaire(vec![question(Uuid::new_v4(), true, 1)]);
        let stray = Uuid::new_v4();

        let err = compute_completion(&form, &[single(stray, "hello")]).unwrap_err();
        assert!(matches!(err, Error::InvalidReference { entity: "question", .. }));
    }

    #[test]
    fn refresh_sets_submitted_at_once_and_keeps_it_on_later_edits() {
        let id = Uuid::new_v4();
        let form = questionnaire(vec![question(id, true, 1)]);
        let mut response = draft_response(form.id, vec![single(id, "first pass")]);

        let first = Utc::now();
        refresh_completion(&mut response, &form, first).unwrap();
        assert_eq!(response.status, ResponseStatus::Completed);
        assert_eq!(response.submitted_at, Some(first));
        assert_eq!(response.last_modified, first);

        let later = first + Duration::hours(2);
        response.answers = vec![single(id, "revised")];
        refresh_completion(&mut response, &form, later).unwrap();
        assert_eq!(response.submitted_at, Some(first));
        assert_eq!(response.last_modified, later);
    }

    #[test]
    fn refresh_clears_submitted_at_when_completion_regresses() {
        let id = Uuid::new_v4();
        let form = questionnaire(vec![question(id, true, 1)]);
        let mut response = draft_response(form.id, vec![single(id, "done")]);

        refresh_completion(&mut response, &form, Utc::now()).unwrap();
        assert!(response.submitted_at.is_some());

        response.answers = vec![single(id, "")];
        refresh_completion(&mut response, &form, Utc::now()).unwrap();
        assert_eq!(response.status, ResponseStatus::Draft);
        assert_eq!(response.submitted_at, None);
    }

    #[test]
    fn percentage_rounds_to_nearest_integer() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let form = questionnaire(vec![
            question(ids[0], true, 1),
            question(ids[1], true, 2),
            question(ids[2], true, 3),
        ]);

        let outcome = compute_completion(&form, &[single(ids[0], "x")]).unwrap();
        // 1 of 3 answered, 33.33 rounds down.
        assert_eq!(outcome.percentage, 33);

        let outcome = compute_completion(&form, &[single(ids[0], "x"), single(ids[1], "y")])
            .unwrap();
        // 2 of 3 answered, 66.67 rounds up.
        assert_eq!(outcome.percentage, 67);
    }
}
