//! Create-or-update for incoming jobs, keyed by duplicate detection on the
//! normalized source URL rather than by id. The resolver scan and the write
//! run inside one transaction, and the `normalized_source_url` column carries
//! a unique index as a backstop: if two concurrent saves of the same URL race
//! past the scan, the second insert hits the index and is retried as an
//! update against the row the winner committed.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set, SqlErr, TransactionTrait};
use tracing::debug;
use uuid::Uuid;

use crate::dedupe;
use crate::dto::JobPayload;
use crate::entities::job;
use crate::fields;
use crate::store::parse_datetime;
use crate::urlnorm;

const TITLE_FALLBACK: &str = "Title Not Found";
const COMPANY_FALLBACK: &str = "Company Not Found";

/// Opaque job id: unix millis plus a short random suffix, matching the ids
/// already present in stores created by earlier versions of the tracker.
pub fn generate_job_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..9])
}

pub struct SaveOutcome {
    pub job: job::Model,
    pub created: bool,
}

/// Save an incoming job: insert when its source URL is unknown, otherwise
/// refresh the existing row. Exactly one row is written either way; child
/// records are never touched here.
pub async fn save_job(db: &DatabaseConnection, payload: JobPayload) -> Result<SaveOutcome, DbErr> {
    match save_job_once(db, &payload).await {
        Err(err) if is_unique_violation(&err) => {
            debug!("lost an insert race on the normalized source URL, retrying as update");
            save_job_once(db, &payload).await
        }
        outcome => outcome,
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

async fn save_job_once(db: &DatabaseConnection, payload: &JobPayload) -> Result<SaveOutcome, DbErr> {
    let title = payload
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| TITLE_FALLBACK.to_string());
    let company = payload
        .company
        .clone()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| COMPANY_FALLBACK.to_string());

    let prepared = fields::prepare(
        payload.location.as_ref(),
        payload.requirements.as_ref(),
        payload.tags.as_ref(),
    );
    let normalized = urlnorm::normalize(payload.source_url.as_deref());

    let now = Utc::now();
    let txn = db.begin().await?;

    let candidates = crate::store::jobs_with_source_url(&txn).await?;
    let duplicate = dedupe::find_duplicate(payload.source_url.as_deref(), &candidates).cloned();

    let outcome = match duplicate {
        Some(existing) => {
            debug!(job_id = %existing.id, "duplicate source URL, updating existing job");
            let mut active: job::ActiveModel = existing.into();
            active.title = Set(title);
            active.company = Set(company);
            active.location = Set(prepared.location);
            active.description = Set(payload.description.clone());
            active.salary_lower_bound = Set(payload.salary_lower_bound);
            active.salary_upper_bound = Set(payload.salary_upper_bound);
            active.salary_currency = Set(payload.salary_currency.clone());
            active.requirements = Set(prepared.requirements);
            active.application_url = Set(payload.application_url.clone());
            active.source_url = Set(payload.source_url.clone());
            active.normalized_source_url = Set(normalized);
            active.posted_date = Set(payload.posted_date.clone());
            active.extracted_at = Set(Some(now));
            active.excluded = Set(payload.excluded == Some(true));
            active.tags = Set(prepared.tags);
            active.updated_at = Set(now);
            // id and saved_at stay untouched.
            let job = active.update(&txn).await?;
            SaveOutcome {
                job,
                created: false,
            }
        }
        None => {
            let id = payload
                .id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(generate_job_id);
            let extracted_at = payload
                .extracted_at
                .as_deref()
                .and_then(parse_datetime)
                .unwrap_or(now);
            let saved_at = payload
                .saved_at
                .as_deref()
                .and_then(parse_datetime)
                .unwrap_or(now);

            let active = job::ActiveModel {
                id: Set(id),
                title: Set(title),
                company: Set(company),
                location: Set(prepared.location),
                description: Set(payload.description.clone()),
                salary_lower_bound: Set(payload.salary_lower_bound),
                salary_upper_bound: Set(payload.salary_upper_bound),
                salary_currency: Set(payload.salary_currency.clone()),
                requirements: Set(prepared.requirements),
                application_url: Set(payload.application_url.clone()),
                source_url: Set(payload.source_url.clone()),
                normalized_source_url: Set(normalized),
                posted_date: Set(payload.posted_date.clone()),
                extracted_at: Set(Some(extracted_at)),
                saved_at: Set(saved_at),
                excluded: Set(payload.excluded == Some(true)),
                tags: Set(prepared.tags),
                accepted_at: Set(None),
                rejected_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            };
            let job = active.insert(&txn).await?;
            SaveOutcome { job, created: true }
        }
    };

    txn.commit().await?;
    Ok(outcome)
}
