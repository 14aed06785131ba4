use sea_orm::{Database, DatabaseConnection, DbErr};
use std::env;

/// Connect using `DB_TYPE` ("sqlite" default, or "postgres") and
/// `DATABASE_URL`. SQLite gets a local file when no URL is set.
pub async fn connect() -> Result<DatabaseConnection, DbErr> {
    let db_type = env::var("DB_TYPE").unwrap_or_else(|_| "sqlite".to_string());

    let db_url = match db_type.as_str() {
        "postgres" => env::var("DATABASE_URL")
            .map_err(|_| DbErr::Custom("DATABASE_URL must be set for Postgres".to_string()))?,
        _ => env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./jobtrail.sqlite?mode=rwc".to_string()),
    };

    tracing::info!(
        "connecting to {} database",
        if db_type == "postgres" { "PostgreSQL" } else { "SQLite" }
    );

    Database::connect(&db_url).await
}
