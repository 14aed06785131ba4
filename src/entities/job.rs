use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A stored job posting. `location`, `requirements` and `tags` hold either a
/// plain string or a JSON-encoded list (see `crate::fields`).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub salary_lower_bound: Option<i64>,
    pub salary_upper_bound: Option<i64>,
    pub salary_currency: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub requirements: Option<String>,
    pub application_url: Option<String>,
    pub source_url: Option<String>,
    /// Canonical form of `source_url` (see `crate::urlnorm`); unique-indexed
    /// so concurrent saves of the same posting cannot both insert.
    pub normalized_source_url: Option<String>,
    pub posted_date: Option<String>,
    pub extracted_at: Option<DateTime<Utc>>,
    pub saved_at: DateTime<Utc>,
    pub excluded: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub tags: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::application::Entity")]
    Application,
    #[sea_orm(has_many = "super::communication::Entity")]
    Communication,
    #[sea_orm(has_many = "super::interview_round::Entity")]
    InterviewRound,
}

impl Related<super::application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Application.def()
    }
}

impl Related<super::communication::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Communication.def()
    }
}

impl Related<super::interview_round::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InterviewRound.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
