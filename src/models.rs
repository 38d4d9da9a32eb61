use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Number,
    Email,
    Phone,
    Date,
    Select,
    Radio,
    Checkbox,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Number => "number",
            QuestionType::Email => "email",
            QuestionType::Phone => "phone",
            QuestionType::Date => "date",
            QuestionType::Select => "select",
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
        }
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "text" => Ok(QuestionType::Text),
            "number" => Ok(QuestionType::Number),
            "email" => Ok(QuestionType::Email),
            "phone" => Ok(QuestionType::Phone),
            "date" => Ok(QuestionType::Date),
            "select" => Ok(QuestionType::Select),
            "radio" => Ok(QuestionType::Radio),
            "checkbox" => Ok(QuestionType::Checkbox),
            other => Err(Error::validation(
                "question.kind",
                format!("unknown question type `{other}`"),
            )),
        }
    }

    /// select/radio/checkbox questions carry a fixed option list; the rest are free-form.
    pub fn takes_options(&self) -> bool {
        matches!(
            self,
            QuestionType::Select | QuestionType::Radio | QuestionType::Checkbox
        )
    }
}

#[derive(Debug, Clone)]
pub struct Question {
    pub id: Uuid,
    pub prompt: String,
    pub kind: QuestionType,
    pub required: bool,
    pub options: Option<Vec<String>>,
    pub position: i32,
}

#[derive(Debug, Clone)]
pub struct Questionnaire {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub assigned_to: Vec<Uuid>,
}

/// A single answer value: one string, or an ordered selection for checkbox questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multi(Vec<String>),
}

impl AnswerValue {
    pub fn is_answered(&self) -> bool {
        match self {
            AnswerValue::Single(text) => !text.is_empty(),
            AnswerValue::Multi(values) => !values.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub question_id: Uuid,
    pub value: AnswerValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Draft,
    Incomplete,
    Completed,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Draft => "draft",
            ResponseStatus::Incomplete => "incomplete",
            ResponseStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "draft" => Ok(ResponseStatus::Draft),
            "incomplete" => Ok(ResponseStatus::Incomplete),
            "completed" => Ok(ResponseStatus::Completed),
            other => Err(Error::validation(
                "response.status",
                format!("unknown status `{other}`"),
            )),
        }
    }
}

/// One user's attempt at one questionnaire, with its raw answers.
#[derive(Debug, Clone)]
pub struct InterviewResponse {
    pub id: Uuid,
    pub questionnaire_id: Uuid,
    pub user_id: Uuid,
    pub answers: Vec<Answer>,
    pub status: ResponseStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub last_modified: DateTime<Utc>,
    pub completion_percentage: i32,
}

/// Flat response record joined with user and questionnaire columns, the shape
/// the reporting and aggregation paths consume.
#[derive(Debug, Clone)]
pub struct ResponseRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub questionnaire_id: Uuid,
    pub questionnaire_title: String,
    pub status: ResponseStatus,
    pub completion_percentage: i32,
    pub submitted_at: Option<DateTime<Utc>>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(Error::validation(
                "user.role",
                format!("unknown role `{other}`"),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-user rollup derived from responses; never persisted, recomputed per view.
#[derive(Debug, Clone)]
pub struct UserStats {
    pub user_id: Uuid,
    pub username: String,
    pub total_interviews: usize,
    pub completed_interviews: usize,
    pub incomplete_interviews: usize,
    pub completion_rate: f64,
    pub last_activity: Option<DateTime<Utc>>,
    pub below_threshold: bool,
}

#[derive(Debug, Clone)]
pub struct ThresholdConfig {
    pub id: Uuid,
    pub min_interviews: i64,
    pub warning_threshold: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DashboardStats {
    pub total_users: usize,
    pub active_users: usize,
    pub total_questionnaires: usize,
    pub active_questionnaires: usize,
    pub total_interviews: usize,
    pub completed_interviews: usize,
    pub users_below_threshold: usize,
    pub average_completion_rate: f64,
}
