use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::completion;
use crate::error::Error;
use crate::models::{
    Answer, AnswerValue, InterviewResponse, Question, QuestionType, Questionnaire, ResponseRow,
    ResponseStatus, Role, ThresholdConfig, UserRecord,
};

pub async fn init_db(pool: &PgPool) -> Result<(), Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn fetch_users(pool: &PgPool) -> Result<Vec<UserRecord>, Error> {
    let rows = sqlx::query(
        "SELECT id, username, email, role, is_active, created_at \
         FROM interview_tracker.users ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut users = Vec::new();
    for row in rows {
        users.push(UserRecord {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            role: Role::parse(row.get::<String, _>("role").as_str())?,
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        });
    }

    Ok(users)
}

pub async fn fetch_user_by_email(pool: &PgPool, email: &str) -> Result<UserRecord, Error> {
    let row = sqlx::query(
        "SELECT id, username, email, role, is_active, created_at \
         FROM interview_tracker.users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::invalid_reference("user", email))?;

    Ok(UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        role: Role::parse(row.get::<String, _>("role").as_str())?,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    })
}

/// Rejects malformed user payloads before any write.
pub fn validate_user_payload(username: &str, email: &str) -> Result<(), Error> {
    if username.trim().is_empty() {
        return Err(Error::validation("username", "must not be empty"));
    }
    if email.trim().is_empty() {
        return Err(Error::validation("email", "must not be empty"));
    }
    if !email.contains('@') {
        return Err(Error::validation("email", "must be an email address"));
    }
    Ok(())
}

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    role: Role,
) -> Result<UserRecord, Error> {
    validate_user_payload(username, email)?;

    sqlx::query(
        "INSERT INTO interview_tracker.users (id, username, email, role, is_active) \
         VALUES ($1, $2, $3, $4, TRUE)",
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(role.as_str())
    .execute(pool)
    .await?;

    fetch_user_by_email(pool, email).await
}

/// Edits username and/or role for the account behind `email`; unset fields
/// keep their stored value.
pub async fn update_user(
    pool: &PgPool,
    email: &str,
    username: Option<&str>,
    role: Option<Role>,
) -> Result<(), Error> {
    if let Some(username) = username {
        validate_user_payload(username, email)?;
    }

    let result = sqlx::query(
        "UPDATE interview_tracker.users \
         SET username = COALESCE($2, username), role = COALESCE($3, role) \
         WHERE email = $1",
    )
    .bind(email)
    .bind(username)
    .bind(role.map(|r| r.as_str()))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::invalid_reference("user", email));
    }

    Ok(())
}

pub async fn set_user_active(pool: &PgPool, email: &str, active: bool) -> Result<(), Error> {
    let result = sqlx::query(
        "UPDATE interview_tracker.users SET is_active = $2 WHERE email = $1",
    )
    .bind(email)
    .bind(active)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::invalid_reference("user", email));
    }

    Ok(())
}

/// Deleting a user cascades to their assignments, responses, and answers.
pub async fn delete_user(pool: &PgPool, email: &str) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM interview_tracker.users WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::invalid_reference("user", email));
    }

    Ok(())
}

async fn fetch_questions(pool: &PgPool, questionnaire_id: Uuid) -> Result<Vec<Question>, Error> {
    let rows = sqlx::query(
        "SELECT id, prompt, kind, required, options, position \
         FROM interview_tracker.questions \
         WHERE questionnaire_id = $1 ORDER BY position",
    )
    .bind(questionnaire_id)
    .fetch_all(pool)
    .await?;

    let mut questions = Vec::new();
    for row in rows {
        let options = match row.get::<Option<serde_json::Value>, _>("options") {
            Some(value) => Some(
                serde_json::from_value::<Vec<String>>(value)
                    .map_err(|e| Error::validation("question.options", e.to_string()))?,
            ),
            None => None,
        };
        questions.push(Question {
            id: row.get("id"),
            prompt: row.get("prompt"),
            kind: QuestionType::parse(row.get::<String, _>("kind").as_str())?,
            required: row.get("required"),
            options,
            position: row.get("position"),
        });
    }

    Ok(questions)
}

async fn load_questionnaire_row(pool: &PgPool, row: sqlx::postgres::PgRow) -> Result<Questionnaire, Error> {
    let id: Uuid = row.get("id");
    let questions = fetch_questions(pool, id).await?;

    let assigned = sqlx::query(
        "SELECT user_id FROM interview_tracker.assignments WHERE questionnaire_id = $1",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Questionnaire {
        id,
        title: row.get("title"),
        description: row.get("description"),
        questions,
        created_at: row.get("created_at"),
        is_active: row.get("is_active"),
        assigned_to: assigned.iter().map(|r| r.get("user_id")).collect(),
    })
}

pub async fn fetch_questionnaires(pool: &PgPool) -> Result<Vec<Questionnaire>, Error> {
    let rows = sqlx::query(
        "SELECT id, title, description, created_at, is_active \
         FROM interview_tracker.questionnaires ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut questionnaires = Vec::new();
    for row in rows {
        questionnaires.push(load_questionnaire_row(pool, row).await?);
    }

    Ok(questionnaires)
}

pub async fn fetch_questionnaire_by_title(
    pool: &PgPool,
    title: &str,
) -> Result<Questionnaire, Error> {
    let row = sqlx::query(
        "SELECT id, title, description, created_at, is_active \
         FROM interview_tracker.questionnaires WHERE title = $1",
    )
    .bind(title)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::invalid_reference("questionnaire", title))?;

    load_questionnaire_row(pool, row).await
}

pub async fn fetch_response_rows(pool: &PgPool) -> Result<Vec<ResponseRow>, Error> {
    let rows = sqlx::query(
        "SELECT r.id, r.user_id, u.username, u.email, r.questionnaire_id, \
         q.title AS questionnaire_title, r.status, r.completion_percentage, \
         r.submitted_at, r.last_modified \
         FROM interview_tracker.responses r \
         JOIN interview_tracker.users u ON u.id = r.user_id \
         JOIN interview_tracker.questionnaires q ON q.id = r.questionnaire_id \
         ORDER BY r.last_modified DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(ResponseRow {
            id: row.get("id"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            email: row.get("email"),
            questionnaire_id: row.get("questionnaire_id"),
            questionnaire_title: row.get("questionnaire_title"),
            status: ResponseStatus::parse(row.get::<String, _>("status").as_str())?,
            completion_percentage: row.get("completion_percentage"),
            submitted_at: row.get("submitted_at"),
            last_modified: row.get("last_modified"),
        });
    }

    Ok(records)
}

async fn fetch_answers(pool: &PgPool, response_id: Uuid) -> Result<Vec<Answer>, Error> {
    let rows = sqlx::query(
        "SELECT question_id, value FROM interview_tracker.response_answers \
         WHERE response_id = $1",
    )
    .bind(response_id)
    .fetch_all(pool)
    .await?;

    let mut answers = Vec::new();
    for row in rows {
        let value: serde_json::Value = row.get("value");
        answers.push(Answer {
            question_id: row.get("question_id"),
            value: serde_json::from_value::<AnswerValue>(value)
                .map_err(|e| Error::validation("answer.value", e.to_string()))?,
        });
    }

    Ok(answers)
}

/// The current response for a (user, questionnaire) pair: the most recently
/// modified one. Older responses for the pair are kept as attempt history.
pub async fn current_response_for_pair(
    pool: &PgPool,
    user_id: Uuid,
    questionnaire_id: Uuid,
) -> Result<Option<InterviewResponse>, Error> {
    let row = sqlx::query(
        "SELECT id, questionnaire_id, user_id, status, submitted_at, last_modified, \
         completion_percentage \
         FROM interview_tracker.responses \
         WHERE user_id = $1 AND questionnaire_id = $2 \
         ORDER BY last_modified DESC LIMIT 1",
    )
    .bind(user_id)
    .bind(questionnaire_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let id: Uuid = row.get("id");
    Ok(Some(InterviewResponse {
        id,
        questionnaire_id: row.get("questionnaire_id"),
        user_id: row.get("user_id"),
        answers: fetch_answers(pool, id).await?,
        status: ResponseStatus::parse(row.get::<String, _>("status").as_str())?,
        submitted_at: row.get("submitted_at"),
        last_modified: row.get("last_modified"),
        completion_percentage: row.get("completion_percentage"),
    }))
}

/// Inserts or updates the response row, then replaces its answers wholesale.
/// Runs in one transaction so a failed save leaves the prior state untouched.
pub async fn save_response(pool: &PgPool, response: &InterviewResponse) -> Result<(), Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO interview_tracker.responses
        (id, questionnaire_id, user_id, status, submitted_at, last_modified, completion_percentage)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE
        SET status = EXCLUDED.status,
            submitted_at = EXCLUDED.submitted_at,
            last_modified = EXCLUDED.last_modified,
            completion_percentage = EXCLUDED.completion_percentage
        "#,
    )
    .bind(response.id)
    .bind(response.questionnaire_id)
    .bind(response.user_id)
    .bind(response.status.as_str())
    .bind(response.submitted_at)
    .bind(response.last_modified)
    .bind(response.completion_percentage)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM interview_tracker.response_answers WHERE response_id = $1")
        .bind(response.id)
        .execute(&mut *tx)
        .await?;

    for answer in &response.answers {
        let value = serde_json::to_value(&answer.value)
            .map_err(|e| Error::validation("answer.value", e.to_string()))?;
        sqlx::query(
            "INSERT INTO interview_tracker.response_answers (response_id, question_id, value) \
             VALUES ($1, $2, $3)",
        )
        .bind(response.id)
        .bind(answer.question_id)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn delete_response(pool: &PgPool, response_id: Uuid) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM interview_tracker.responses WHERE id = $1")
        .bind(response_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::invalid_reference("response", response_id.to_string()));
    }

    Ok(())
}

pub async fn fetch_active_threshold(pool: &PgPool) -> Result<Option<ThresholdConfig>, Error> {
    let row = sqlx::query(
        "SELECT id, min_interviews, warning_threshold, is_active, created_at \
         FROM interview_tracker.threshold_config WHERE is_active \
         ORDER BY created_at DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| ThresholdConfig {
        id: row.get("id"),
        min_interviews: row.get("min_interviews"),
        warning_threshold: row.get("warning_threshold"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }))
}

/// Updates the active configuration in place, or creates it on first use.
/// There is at most one active configuration; it is never versioned.
pub async fn set_threshold(
    pool: &PgPool,
    min_interviews: i64,
    warning_threshold: i64,
) -> Result<(), Error> {
    crate::threshold::validate_config(min_interviews, warning_threshold)?;

    let updated = sqlx::query(
        "UPDATE interview_tracker.threshold_config \
         SET min_interviews = $1, warning_threshold = $2 \
         WHERE is_active RETURNING id",
    )
    .bind(min_interviews)
    .bind(warning_threshold)
    .fetch_optional(pool)
    .await?;

    if updated.is_none() {
        sqlx::query(
            "INSERT INTO interview_tracker.threshold_config \
             (id, min_interviews, warning_threshold, is_active) \
             VALUES ($1, $2, $3, TRUE)",
        )
        .bind(Uuid::new_v4())
        .bind(min_interviews)
        .bind(warning_threshold)
        .execute(pool)
        .await?;
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct QuestionPayload {
    pub prompt: String,
    pub kind: QuestionType,
    #[serde(default)]
    pub required: bool,
    pub options: Option<Vec<String>>,
    pub position: i32,
}

#[derive(Debug, Deserialize)]
pub struct QuestionnairePayload {
    pub title: String,
    pub description: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub questions: Vec<QuestionPayload>,
    #[serde(default)]
    pub assigned_to: Vec<String>,
}

fn default_active() -> bool {
    true
}

/// Rejects malformed questionnaire payloads before anything is written.
pub fn validate_questionnaire_payload(payload: &QuestionnairePayload) -> Result<(), Error> {
    if payload.title.trim().is_empty() {
        return Err(Error::validation("title", "must not be empty"));
    }
    if payload.description.trim().is_empty() {
        return Err(Error::validation("description", "must not be empty"));
    }

    let mut positions = HashSet::new();
    for question in &payload.questions {
        if question.prompt.trim().is_empty() {
            return Err(Error::validation("question.prompt", "must not be empty"));
        }
        if !positions.insert(question.position) {
            return Err(Error::validation(
                "question.position",
                format!("duplicate position {}", question.position),
            ));
        }
        let has_options = question
            .options
            .as_ref()
            .map(|o| !o.is_empty())
            .unwrap_or(false);
        if question.kind.takes_options() && !has_options {
            return Err(Error::validation(
                "question.options",
                format!("{} questions need a non-empty option list", question.kind.as_str()),
            ));
        }
        if !question.kind.takes_options() && question.options.is_some() {
            return Err(Error::validation(
                "question.options",
                format!("{} questions must not carry options", question.kind.as_str()),
            ));
        }
    }

    Ok(())
}

/// Imports questionnaires from a JSON array, validating each payload and
/// resolving assignments by user email.
pub async fn import_questionnaires(pool: &PgPool, json: &str) -> Result<usize, Error> {
    let payloads: Vec<QuestionnairePayload> = serde_json::from_str(json)
        .map_err(|e| Error::validation("questionnaires", e.to_string()))?;

    for payload in &payloads {
        validate_questionnaire_payload(payload)?;
    }

    for payload in &payloads {
        let questionnaire_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO interview_tracker.questionnaires \
             (id, title, description, is_active) VALUES ($1, $2, $3, $4)",
        )
        .bind(questionnaire_id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.is_active)
        .execute(pool)
        .await?;

        for question in &payload.questions {
            let options = match &question.options {
                Some(values) => Some(
                    serde_json::to_value(values)
                        .map_err(|e| Error::validation("question.options", e.to_string()))?,
                ),
                None => None,
            };
            sqlx::query(
                "INSERT INTO interview_tracker.questions \
                 (id, questionnaire_id, prompt, kind, required, options, position) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::new_v4())
            .bind(questionnaire_id)
            .bind(&question.prompt)
            .bind(question.kind.as_str())
            .bind(question.required)
            .bind(options)
            .bind(question.position)
            .execute(pool)
            .await?;
        }

        for email in &payload.assigned_to {
            let user = fetch_user_by_email(pool, email).await?;
            sqlx::query(
                "INSERT INTO interview_tracker.assignments (questionnaire_id, user_id) \
                 VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(questionnaire_id)
            .bind(user.id)
            .execute(pool)
            .await?;
        }
    }

    Ok(payloads.len())
}

#[derive(Debug, Deserialize)]
struct AnswerCsvRow {
    email: String,
    questionnaire: String,
    question_position: i32,
    answer: String,
}

/// Choice answers must pick from the question's option list; blank answers
/// pass through (they just do not count as answered).
fn validate_answer_options(question: &Question, value: &AnswerValue) -> Result<(), Error> {
    let Some(options) = &question.options else {
        return Ok(());
    };

    let picks: Vec<&String> = match value {
        AnswerValue::Single(text) if text.is_empty() => Vec::new(),
        AnswerValue::Single(text) => vec![text],
        AnswerValue::Multi(values) => values.iter().collect(),
    };
    for pick in picks {
        if !options.contains(pick) {
            return Err(Error::validation(
                "answer",
                format!("`{}` is not an option for \"{}\"", pick, question.prompt),
            ));
        }
    }

    Ok(())
}

fn blank_response(user_id: Uuid, questionnaire_id: Uuid) -> InterviewResponse {
    InterviewResponse {
        id: Uuid::new_v4(),
        questionnaire_id,
        user_id,
        answers: Vec::new(),
        status: ResponseStatus::Draft,
        submitted_at: None,
        last_modified: Utc::now(),
        completion_percentage: 0,
    }
}

/// Imports answers from a CSV file. Each row edits the current response for
/// its (user, questionnaire) pair, opening a fresh draft when none exists;
/// completion is recomputed once per touched response before saving.
///
/// Checkbox answers list their selections separated by `;`.
pub async fn import_answers(pool: &PgPool, csv_path: &Path) -> Result<usize, Error> {
    let mut reader = csv::Reader::from_path(csv_path)?;

    let mut forms_by_title: HashMap<String, Questionnaire> = HashMap::new();
    let mut user_ids: HashMap<String, Uuid> = HashMap::new();
    let mut touched: HashMap<(Uuid, Uuid), InterviewResponse> = HashMap::new();

    for result in reader.deserialize::<AnswerCsvRow>() {
        let row = result?;

        let user_id = match user_ids.get(&row.email) {
            Some(id) => *id,
            None => {
                let user = fetch_user_by_email(pool, &row.email).await?;
                user_ids.insert(row.email.clone(), user.id);
                user.id
            }
        };
        let form = match forms_by_title.entry(row.questionnaire.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let form = fetch_questionnaire_by_title(pool, &row.questionnaire).await?;
                entry.insert(form)
            }
        };

        let question = form
            .questions
            .iter()
            .find(|q| q.position == row.question_position)
            .ok_or_else(|| {
                Error::invalid_reference(
                    "question",
                    format!("{} #{}", form.title, row.question_position),
                )
            })?;

        let value = if question.kind == QuestionType::Checkbox {
            AnswerValue::Multi(
                row.answer
                    .split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        } else {
            AnswerValue::Single(row.answer.clone())
        };
        validate_answer_options(question, &value)?;

        let key = (user_id, form.id);
        let fetched = if touched.contains_key(&key) {
            None
        } else {
            current_response_for_pair(pool, user_id, form.id).await?
        };
        let response = touched
            .entry(key)
            .or_insert_with(|| fetched.unwrap_or_else(|| blank_response(user_id, form.id)));

        response.answers.retain(|a| a.question_id != question.id);
        response.answers.push(Answer {
            question_id: question.id,
            value,
        });
    }

    let forms_by_id: HashMap<Uuid, Questionnaire> = forms_by_title
        .into_values()
        .map(|form| (form.id, form))
        .collect();

    let saved = touched.len();
    for ((_, questionnaire_id), mut response) in touched {
        let form = forms_by_id
            .get(&questionnaire_id)
            .ok_or_else(|| Error::invalid_reference("questionnaire", questionnaire_id.to_string()))?;
        completion::refresh_completion(&mut response, form, Utc::now())?;
        save_response(pool, &response).await?;
    }

    Ok(saved)
}

fn seed_uuid(value: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(value).map_err(|e| Error::validation("seed", e.to_string()))
}

pub async fn seed(pool: &PgPool) -> Result<(), Error> {
    let users = vec![
        (
            seed_uuid("6f1f6f1e-8a95-4a3b-9c4f-0d8f5f6a2b31")?,
            "sarah_admin",
            "sarah.admin@example.com",
            Role::Admin,
        ),
        (
            seed_uuid("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "john_doe",
            "john.doe@example.com",
            Role::User,
        ),
        (
            seed_uuid("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "jane_smith",
            "jane.smith@example.com",
            Role::User,
        ),
        (
            seed_uuid("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "mike_johnson",
            "mike.johnson@example.com",
            Role::User,
        ),
    ];

    for (id, username, email, role) in users {
        sqlx::query(
            r#"
            INSERT INTO interview_tracker.users (id, username, email, role, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (email) DO UPDATE
            SET username = EXCLUDED.username, role = EXCLUDED.role
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(role.as_str())
        .execute(pool)
        .await?;
    }

    let payload = r#"[
      {
        "title": "Technical Skills Assessment",
        "description": "Assessment for technical roles",
        "questions": [
          { "prompt": "Full Name", "kind": "text", "required": true, "position": 1 },
          { "prompt": "Email Address", "kind": "email", "required": true, "position": 2 },
          { "prompt": "Phone Number", "kind": "phone", "required": false, "position": 3 },
          { "prompt": "Department", "kind": "select", "required": true,
            "options": ["IT", "HR", "Marketing", "Sales"], "position": 4 },
          { "prompt": "Experience Level", "kind": "radio", "required": true,
            "options": ["Junior", "Mid-level", "Senior"], "position": 5 },
          { "prompt": "Technical Skills", "kind": "checkbox", "required": false,
            "options": ["Rust", "SQL", "React", "Kubernetes"], "position": 6 }
        ],
        "assigned_to": ["john.doe@example.com", "jane.smith@example.com"]
      }
    ]"#;

    let existing = sqlx::query(
        "SELECT id FROM interview_tracker.questionnaires WHERE title = $1",
    )
    .bind("Technical Skills Assessment")
    .fetch_optional(pool)
    .await?;
    if existing.is_none() {
        import_questionnaires(pool, payload).await?;
    }

    if fetch_active_threshold(pool).await?.is_none() {
        set_threshold(pool, 10, 8).await?;
    }

    let form = fetch_questionnaire_by_title(pool, "Technical Skills Assessment").await?;
    let john = fetch_user_by_email(pool, "john.doe@example.com").await?;
    if current_response_for_pair(pool, john.id, form.id)
        .await?
        .is_none()
    {
        let mut response = blank_response(john.id, form.id);
        for question in form.questions.iter().filter(|q| q.required) {
            let value = match &question.options {
                Some(options) if question.kind == QuestionType::Checkbox => {
                    AnswerValue::Multi(options.iter().take(2).cloned().collect())
                }
                Some(options) => AnswerValue::Single(
                    options.first().cloned().unwrap_or_default(),
                ),
                None => AnswerValue::Single("seed answer".to_string()),
            };
            response.answers.push(Answer {
                question_id: question.id,
                value,
            });
        }
        completion::refresh_completion(&mut response, &form, Utc::now())?;
        save_response(pool, &response).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> QuestionnairePayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn payload_with_empty_title_is_rejected() {
        let p = payload(r#"{ "title": "  ", "description": "d", "questions": [] }"#);
        assert!(matches!(
            validate_questionnaire_payload(&p),
            Err(Error::Validation { field: "title", .. })
        ));
    }

    #[test]
    fn choice_question_without_options_is_rejected() {
        let p = payload(
            r#"{ "title": "t", "description": "d", "questions": [
                { "prompt": "Department", "kind": "select", "required": true, "position": 1 }
            ] }"#,
        );
        assert!(matches!(
            validate_questionnaire_payload(&p),
            Err(Error::Validation { field: "question.options", .. })
        ));
    }

    #[test]
    fn free_text_question_with_options_is_rejected() {
        let p = payload(
            r#"{ "title": "t", "description": "d", "questions": [
                { "prompt": "Name", "kind": "text", "options": ["a"], "position": 1 }
            ] }"#,
        );
        assert!(matches!(
            validate_questionnaire_payload(&p),
            Err(Error::Validation { field: "question.options", .. })
        ));
    }

    #[test]
    fn duplicate_positions_are_rejected() {
        let p = payload(
            r#"{ "title": "t", "description": "d", "questions": [
                { "prompt": "A", "kind": "text", "position": 1 },
                { "prompt": "B", "kind": "text", "position": 1 }
            ] }"#,
        );
        assert!(matches!(
            validate_questionnaire_payload(&p),
            Err(Error::Validation { field: "question.position", .. })
        ));
    }

    #[test]
    fn user_with_blank_username_is_rejected() {
        assert!(matches!(
            validate_user_payload("  ", "avery@example.com"),
            Err(Error::Validation { field: "username", .. })
        ));
    }

    #[test]
    fn user_with_blank_or_malformed_email_is_rejected() {
        assert!(matches!(
            validate_user_payload("avery", ""),
            Err(Error::Validation { field: "email", .. })
        ));
        assert!(matches!(
            validate_user_payload("avery", "not-an-address"),
            Err(Error::Validation { field: "email", .. })
        ));
    }

    #[test]
    fn well_formed_user_payload_passes_validation() {
        assert!(validate_user_payload("avery_lee", "avery.lee@example.com").is_ok());
    }

    fn select_question(options: &[&str]) -> Question {
        Question {
            id: Uuid::new_v4(),
            prompt: "Department".to_string(),
            kind: QuestionType::Select,
            required: true,
            options: Some(options.iter().map(|s| s.to_string()).collect()),
            position: 1,
        }
    }

    #[test]
    fn answers_outside_the_option_list_are_rejected() {
        let question = select_question(&["IT", "HR"]);

        let valid = AnswerValue::Single("IT".to_string());
        assert!(validate_answer_options(&question, &valid).is_ok());

        let invalid = AnswerValue::Single("Finance".to_string());
        assert!(matches!(
            validate_answer_options(&question, &invalid),
            Err(Error::Validation { field: "answer", .. })
        ));
    }

    #[test]
    fn blank_choice_answers_pass_option_validation() {
        let question = select_question(&["IT", "HR"]);
        let blank = AnswerValue::Single(String::new());
        assert!(validate_answer_options(&question, &blank).is_ok());
    }

    #[test]
    fn well_formed_payload_passes_validation() {
        let p = payload(
            r#"{ "title": "Exit Interview", "description": "Final form", "questions": [
                { "prompt": "Reason", "kind": "text", "required": true, "position": 1 },
                { "prompt": "Team", "kind": "select", "options": ["IT", "HR"], "position": 2 }
            ] }"#,
        );
        assert!(validate_questionnaire_payload(&p).is_ok());
        assert!(p.is_active);
    }
}
