//! Wire shapes for the REST surface. Job fields keep the mixed naming the
//! clients already use (camelCase URLs/dates, snake_case salary bounds);
//! child records are snake_case throughout.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::entities::{application, communication, interview_round, job, user_profile};
use crate::fields;

pub fn iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Distinguishes an absent field from an explicit null in partial updates:
/// `None` means untouched, `Some(None)` means clear.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Accepts a number, a numeric string, or null. LLM extractions are not
/// reliable about which one they emit for salary bounds.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// Incoming job record, from the extension, the UI or an LLM extraction.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct JobPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    /// String or ordered list of strings.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub location: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub salary_lower_bound: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub salary_upper_bound: Option<i64>,
    #[serde(default)]
    pub salary_currency: Option<String>,
    /// String or ordered list of strings.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub requirements: Option<Value>,
    #[serde(default, rename = "applicationUrl")]
    pub application_url: Option<String>,
    #[serde(default, rename = "sourceUrl")]
    pub source_url: Option<String>,
    #[serde(default, rename = "postedDate")]
    pub posted_date: Option<String>,
    #[serde(default, rename = "extractedAt")]
    pub extracted_at: Option<String>,
    #[serde(default, rename = "savedAt")]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub excluded: Option<bool>,
    /// List, or a lone scalar that gets wrapped into one.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub tags: Option<Value>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApplicationOut {
    pub id: String,
    pub job_id: String,
    pub status: String,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<application::Model> for ApplicationOut {
    fn from(model: application::Model) -> Self {
        ApplicationOut {
            id: model.id,
            job_id: model.job_id,
            status: model.status,
            started_at: iso(&model.started_at),
            submitted_at: model.submitted_at.as_ref().map(iso),
            notes: model.notes,
            created_at: iso(&model.created_at),
            updated_at: iso(&model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommunicationOut {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<communication::Model> for CommunicationOut {
    fn from(model: communication::Model) -> Self {
        CommunicationOut {
            id: model.id,
            job_id: model.job_id,
            subject: model.subject,
            from: model.from,
            to: model.to,
            body: model.body,
            body_text: model.body_text,
            received_at: model.received_at.as_ref().map(iso),
            created_at: iso(&model.created_at),
            updated_at: iso(&model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InterviewOut {
    pub id: String,
    pub job_id: String,
    pub round_number: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interviewer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interviewer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<interview_round::Model> for InterviewOut {
    fn from(model: interview_round::Model) -> Self {
        InterviewOut {
            id: model.id,
            job_id: model.job_id,
            round_number: model.round_number,
            interviewer_name: model.interviewer_name,
            interviewer_email: model.interviewer_email,
            notes: model.notes,
            recording_url: model.recording_url,
            scheduled_at: model.scheduled_at.as_ref().map(iso),
            completed_at: model.completed_at.as_ref().map(iso),
            created_at: iso(&model.created_at),
            updated_at: iso(&model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileOut {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub resume_data: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<user_profile::Model> for ProfileOut {
    fn from(model: user_profile::Model) -> Self {
        let resume_data = model
            .resume_data
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());
        ProfileOut {
            id: model.id,
            linkedin_url: model.linkedin_url,
            resume_data,
            created_at: iso(&model.created_at),
            updated_at: iso(&model.updated_at),
        }
    }
}

/// Outgoing job record with its decoded list fields and, when loaded, its
/// child collections.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobOut {
    pub id: String,
    pub title: String,
    pub company: String,
    #[schema(value_type = Option<Object>)]
    pub location: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_lower_bound: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_upper_bound: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_currency: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub requirements: Option<Value>,
    #[serde(rename = "applicationUrl", skip_serializing_if = "Option::is_none")]
    pub application_url: Option<String>,
    #[serde(rename = "sourceUrl", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(rename = "postedDate", skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
    #[serde(rename = "extractedAt", skip_serializing_if = "Option::is_none")]
    pub extracted_at: Option<String>,
    #[serde(rename = "savedAt")]
    pub saved_at: String,
    pub excluded: bool,
    pub tags: Vec<String>,
    #[serde(rename = "acceptedAt", skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<String>,
    #[serde(rename = "rejectedAt", skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communications: Option<Vec<CommunicationOut>>,
    #[serde(rename = "interviewRounds", skip_serializing_if = "Option::is_none")]
    pub interview_rounds: Option<Vec<InterviewOut>>,
}

impl From<job::Model> for JobOut {
    fn from(model: job::Model) -> Self {
        JobOut {
            location: fields::parse_list_or_scalar(model.location.as_deref()),
            requirements: fields::parse_list_or_scalar(model.requirements.as_deref()),
            tags: fields::parse_tags(model.tags.as_deref()),
            id: model.id,
            title: model.title,
            company: model.company,
            description: model.description,
            salary_lower_bound: model.salary_lower_bound,
            salary_upper_bound: model.salary_upper_bound,
            salary_currency: model.salary_currency,
            application_url: model.application_url,
            source_url: model.source_url,
            posted_date: model.posted_date,
            extracted_at: model.extracted_at.as_ref().map(iso),
            saved_at: iso(&model.saved_at),
            excluded: model.excluded,
            accepted_at: model.accepted_at.as_ref().map(iso),
            rejected_at: model.rejected_at.as_ref().map(iso),
            created_at: iso(&model.created_at),
            updated_at: iso(&model.updated_at),
            application: None,
            communications: None,
            interview_rounds: None,
        }
    }
}

impl JobOut {
    /// Attach eagerly loaded child collections.
    pub fn with_children(
        mut self,
        application: Option<application::Model>,
        communications: Vec<communication::Model>,
        interview_rounds: Vec<interview_round::Model>,
    ) -> Self {
        self.application = application.map(ApplicationOut::from);
        self.communications = Some(
            communications
                .into_iter()
                .map(CommunicationOut::from)
                .collect(),
        );
        self.interview_rounds = Some(
            interview_rounds
                .into_iter()
                .map(InterviewOut::from)
                .collect(),
        );
        self
    }
}
