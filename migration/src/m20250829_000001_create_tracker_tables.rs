use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Jobs::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Jobs::Title).string().not_null())
                    .col(ColumnDef::new(Jobs::Company).string().not_null())
                    .col(ColumnDef::new(Jobs::Location).string())
                    .col(ColumnDef::new(Jobs::Description).text())
                    .col(ColumnDef::new(Jobs::SalaryLowerBound).big_integer())
                    .col(ColumnDef::new(Jobs::SalaryUpperBound).big_integer())
                    .col(ColumnDef::new(Jobs::SalaryCurrency).string())
                    .col(ColumnDef::new(Jobs::Requirements).text())
                    .col(ColumnDef::new(Jobs::ApplicationUrl).string())
                    .col(ColumnDef::new(Jobs::SourceUrl).string())
                    .col(ColumnDef::new(Jobs::NormalizedSourceUrl).string())
                    .col(ColumnDef::new(Jobs::PostedDate).string())
                    .col(ColumnDef::new(Jobs::ExtractedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Jobs::SavedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Jobs::Excluded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Jobs::Tags).text())
                    .col(ColumnDef::new(Jobs::AcceptedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Jobs::RejectedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Jobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Jobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_source_url")
                    .table(Jobs::Table)
                    .col(Jobs::SourceUrl)
                    .to_owned(),
            )
            .await?;

        // Backstop for concurrent saves of the same posting: the exact-match
        // half of duplicate resolution is enforced by the database itself.
        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_normalized_source_url")
                    .table(Jobs::Table)
                    .col(Jobs::NormalizedSourceUrl)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Applications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Applications::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Applications::JobId).string().not_null())
                    .col(
                        ColumnDef::new(Applications::Status)
                            .string()
                            .not_null()
                            .default("started"),
                    )
                    .col(
                        ColumnDef::new(Applications::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Applications::SubmittedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Applications::Notes).text())
                    .col(
                        ColumnDef::new(Applications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Applications::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_applications_job")
                            .from(Applications::Table, Applications::JobId)
                            .to(Jobs::Table, Jobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Communications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Communications::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Communications::JobId).string())
                    .col(ColumnDef::new(Communications::Subject).string())
                    .col(ColumnDef::new(Communications::From).string())
                    .col(ColumnDef::new(Communications::To).string())
                    .col(ColumnDef::new(Communications::Body).text().not_null())
                    .col(ColumnDef::new(Communications::BodyText).text())
                    .col(ColumnDef::new(Communications::ReceivedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Communications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Communications::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_communications_job")
                            .from(Communications::Table, Communications::JobId)
                            .to(Jobs::Table, Jobs::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InterviewRounds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InterviewRounds::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InterviewRounds::JobId).string().not_null())
                    .col(
                        ColumnDef::new(InterviewRounds::RoundNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InterviewRounds::InterviewerName).string())
                    .col(ColumnDef::new(InterviewRounds::InterviewerEmail).string())
                    .col(ColumnDef::new(InterviewRounds::Notes).text())
                    .col(ColumnDef::new(InterviewRounds::RecordingUrl).string())
                    .col(ColumnDef::new(InterviewRounds::ScheduledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(InterviewRounds::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(InterviewRounds::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(InterviewRounds::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_interview_rounds_job")
                            .from(InterviewRounds::Table, InterviewRounds::JobId)
                            .to(Jobs::Table, Jobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserProfiles::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserProfiles::LinkedinUrl).string())
                    .col(ColumnDef::new(UserProfiles::ResumeData).text())
                    .col(
                        ColumnDef::new(UserProfiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserProfiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InterviewRounds::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Communications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Applications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Jobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Jobs {
    Table,
    Id,
    Title,
    Company,
    Location,
    Description,
    SalaryLowerBound,
    SalaryUpperBound,
    SalaryCurrency,
    Requirements,
    ApplicationUrl,
    SourceUrl,
    NormalizedSourceUrl,
    PostedDate,
    ExtractedAt,
    SavedAt,
    Excluded,
    Tags,
    AcceptedAt,
    RejectedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Applications {
    Table,
    Id,
    JobId,
    Status,
    StartedAt,
    SubmittedAt,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Communications {
    Table,
    Id,
    JobId,
    Subject,
    From,
    To,
    Body,
    BodyText,
    ReceivedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InterviewRounds {
    Table,
    Id,
    JobId,
    RoundNumber,
    InterviewerName,
    InterviewerEmail,
    Notes,
    RecordingUrl,
    ScheduledAt,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserProfiles {
    Table,
    Id,
    LinkedinUrl,
    ResumeData,
    CreatedAt,
    UpdatedAt,
}
