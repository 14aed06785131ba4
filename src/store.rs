//! Persistence layer over the tracker entities. Routes never issue queries
//! directly; they go through here so the ordering contracts (jobs by
//! `saved_at` desc, interviews by round asc then scheduled desc,
//! communications by `received_at` desc) live in one place.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    LoaderTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

use crate::dto::JobPayload;
use crate::entities::{
    application, communication, interview_round, job, user_profile, Application, Communication,
    InterviewRound, Job, UserProfile,
};
use crate::upsert;

/// Fixed key of the singleton profile row.
const PROFILE_ID: &str = "default";

pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

pub struct JobWithChildren {
    pub job: job::Model,
    pub application: Option<application::Model>,
    pub communications: Vec<communication::Model>,
    pub interview_rounds: Vec<interview_round::Model>,
}

impl From<JobWithChildren> for crate::dto::JobOut {
    fn from(bundle: JobWithChildren) -> Self {
        crate::dto::JobOut::from(bundle.job).with_children(
            bundle.application,
            bundle.communications,
            bundle.interview_rounds,
        )
    }
}

fn sort_communications(communications: &mut [communication::Model]) {
    // Desc with unset received_at last.
    communications.sort_by(|a, b| b.received_at.cmp(&a.received_at));
}

fn sort_interviews(rounds: &mut [interview_round::Model]) {
    rounds.sort_by(|a, b| {
        a.round_number
            .cmp(&b.round_number)
            .then(b.scheduled_at.cmp(&a.scheduled_at))
    });
}

/// All jobs, newest saved first, with children eagerly attached.
pub async fn list_jobs_with_children(
    db: &DatabaseConnection,
) -> Result<Vec<JobWithChildren>, DbErr> {
    let jobs = Job::find()
        .order_by_desc(job::Column::SavedAt)
        .all(db)
        .await?;

    let applications = jobs.load_many(Application, db).await?;
    let communications = jobs.load_many(Communication, db).await?;
    let interview_rounds = jobs.load_many(InterviewRound, db).await?;

    let mut out = Vec::with_capacity(jobs.len());
    for (((job, apps), mut comms), mut rounds) in jobs
        .into_iter()
        .zip(applications)
        .zip(communications)
        .zip(interview_rounds)
    {
        sort_communications(&mut comms);
        sort_interviews(&mut rounds);
        out.push(JobWithChildren {
            job,
            application: apps.into_iter().next(),
            communications: comms,
            interview_rounds: rounds,
        });
    }
    Ok(out)
}

pub async fn get_job<C: ConnectionTrait>(db: &C, id: &str) -> Result<Option<job::Model>, DbErr> {
    Job::find_by_id(id).one(db).await
}

pub async fn get_job_with_children(
    db: &DatabaseConnection,
    id: &str,
) -> Result<Option<JobWithChildren>, DbErr> {
    let Some(job) = Job::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let application = job
        .find_related(Application)
        .one(db)
        .await?;
    let communications = job
        .find_related(Communication)
        .order_by_desc(communication::Column::ReceivedAt)
        .all(db)
        .await?;
    let interview_rounds = job
        .find_related(InterviewRound)
        .order_by_asc(interview_round::Column::RoundNumber)
        .order_by_desc(interview_round::Column::ScheduledAt)
        .all(db)
        .await?;

    Ok(Some(JobWithChildren {
        job,
        application,
        communications,
        interview_rounds,
    }))
}

/// Candidates for duplicate resolution, in the listing order so resolution is
/// deterministic.
pub async fn jobs_with_source_url<C: ConnectionTrait>(db: &C) -> Result<Vec<job::Model>, DbErr> {
    Job::find()
        .filter(job::Column::SourceUrl.is_not_null())
        .order_by_desc(job::Column::SavedAt)
        .all(db)
        .await
}

/// Delete a job and clean up its children: applications and interview rounds
/// go with it, communications are detached. Returns false when the id does
/// not exist.
pub async fn delete_job(db: &DatabaseConnection, id: &str) -> Result<bool, DbErr> {
    let txn = db.begin().await?;

    if Job::find_by_id(id).one(&txn).await?.is_none() {
        txn.rollback().await?;
        return Ok(false);
    }

    Application::delete_many()
        .filter(application::Column::JobId.eq(id))
        .exec(&txn)
        .await?;
    InterviewRound::delete_many()
        .filter(interview_round::Column::JobId.eq(id))
        .exec(&txn)
        .await?;
    Communication::update_many()
        .col_expr(communication::Column::JobId, sea_orm::sea_query::Expr::value(Option::<String>::None))
        .filter(communication::Column::JobId.eq(id))
        .exec(&txn)
        .await?;
    Job::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(true)
}

pub async fn application_for_job(
    db: &DatabaseConnection,
    job_id: &str,
) -> Result<Option<application::Model>, DbErr> {
    Application::find()
        .filter(application::Column::JobId.eq(job_id))
        .one(db)
        .await
}

pub async fn interviews_for_job(
    db: &DatabaseConnection,
    job_id: &str,
) -> Result<Vec<interview_round::Model>, DbErr> {
    InterviewRound::find()
        .filter(interview_round::Column::JobId.eq(job_id))
        .order_by_asc(interview_round::Column::RoundNumber)
        .order_by_desc(interview_round::Column::ScheduledAt)
        .all(db)
        .await
}

/// Next round number for a job: `max(existing) + 1`, starting at 1.
pub async fn next_round_number(db: &DatabaseConnection, job_id: &str) -> Result<i32, DbErr> {
    let highest = InterviewRound::find()
        .filter(interview_round::Column::JobId.eq(job_id))
        .order_by_desc(interview_round::Column::RoundNumber)
        .one(db)
        .await?;
    Ok(highest.map(|round| round.round_number + 1).unwrap_or(1))
}

pub async fn list_communications(
    db: &DatabaseConnection,
    job_id: Option<&str>,
) -> Result<Vec<communication::Model>, DbErr> {
    let mut query = Communication::find().order_by_desc(communication::Column::ReceivedAt);
    if let Some(job_id) = job_id {
        query = query.filter(communication::Column::JobId.eq(job_id));
    }
    query.all(db).await
}

pub async fn get_profile(db: &DatabaseConnection) -> Result<Option<user_profile::Model>, DbErr> {
    UserProfile::find_by_id(PROFILE_ID).one(db).await
}

/// Create-if-absent, else update. There is never more than one profile row.
pub async fn upsert_profile(
    db: &DatabaseConnection,
    linkedin_url: &str,
    resume_data: &Value,
) -> Result<user_profile::Model, DbErr> {
    let now = Utc::now();
    let serialized = resume_data.to_string();

    match UserProfile::find_by_id(PROFILE_ID).one(db).await? {
        Some(existing) => {
            let mut active: user_profile::ActiveModel = existing.into();
            active.linkedin_url = Set(Some(linkedin_url.to_string()));
            active.resume_data = Set(Some(serialized));
            active.updated_at = Set(now);
            active.update(db).await
        }
        None => {
            let active = user_profile::ActiveModel {
                id: Set(PROFILE_ID.to_string()),
                linkedin_url: Set(Some(linkedin_url.to_string())),
                resume_data: Set(Some(serialized)),
                created_at: Set(now),
                updated_at: Set(now),
            };
            active.insert(db).await
        }
    }
}

/// Replace the stored resume blob. `Ok(None)` when no profile exists yet.
pub async fn update_resume(
    db: &DatabaseConnection,
    resume_data: &Value,
) -> Result<Option<user_profile::Model>, DbErr> {
    let Some(existing) = UserProfile::find_by_id(PROFILE_ID).one(db).await? else {
        return Ok(None);
    };
    let mut active: user_profile::ActiveModel = existing.into();
    active.resume_data = Set(Some(resume_data.to_string()));
    active.updated_at = Set(Utc::now());
    active.update(db).await.map(Some)
}

/// One-time import of the legacy flat-file format (a JSON array of jobs).
/// Runs only when the file exists and the jobs table is empty; the file is
/// renamed afterwards so it is never replayed.
pub async fn import_legacy_jobs(db: &DatabaseConnection, path: &Path) -> Result<(), DbErr> {
    if !path.exists() {
        return Ok(());
    }
    if Job::find().count(db).await? > 0 {
        info!("jobs table is not empty, skipping legacy import");
        return Ok(());
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("could not read legacy jobs file {:?}: {}", path, e);
            return Ok(());
        }
    };
    let payloads: Vec<JobPayload> = match serde_json::from_str(&raw) {
        Ok(payloads) => payloads,
        Err(e) => {
            warn!("legacy jobs file {:?} is not a job array: {}", path, e);
            return Ok(());
        }
    };

    let total = payloads.len();
    for payload in payloads {
        upsert::save_job(db, payload).await?;
    }
    info!("imported {} legacy jobs from {:?}", total, path);

    let imported = path.with_extension("json.imported");
    if let Err(e) = std::fs::rename(path, &imported) {
        warn!("could not rename imported legacy file: {}", e);
    }
    Ok(())
}
