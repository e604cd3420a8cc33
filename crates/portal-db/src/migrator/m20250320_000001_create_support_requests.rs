//! Support/upgrade requests and their issue-tracker mirror columns

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SupportRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SupportRequest::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SupportRequest::Kind)
                            .string_len(16)
                            .not_null()
                            .default("support"),
                    )
                    .col(ColumnDef::new(SupportRequest::ReporterId).uuid().not_null())
                    .col(ColumnDef::new(SupportRequest::ReporterName).string_len(255).null())
                    .col(
                        ColumnDef::new(SupportRequest::ReporterEmail)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SupportRequest::CustomerId).string_len(32).null())
                    .col(ColumnDef::new(SupportRequest::Subject).string_len(255).not_null())
                    .col(ColumnDef::new(SupportRequest::Description).text().not_null())
                    .col(ColumnDef::new(SupportRequest::Priority).string_len(32).not_null())
                    .col(ColumnDef::new(SupportRequest::Category).string_len(64).not_null())
                    .col(ColumnDef::new(SupportRequest::Attachment).string_len(512).null())
                    .col(ColumnDef::new(SupportRequest::TrackerKey).string_len(64).null())
                    .col(ColumnDef::new(SupportRequest::TrackerId).string_len(64).null())
                    .col(ColumnDef::new(SupportRequest::TrackerUrl).string_len(512).null())
                    .col(ColumnDef::new(SupportRequest::TrackerStatus).string_len(64).null())
                    .col(
                        ColumnDef::new(SupportRequest::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SupportRequest::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_support_requests_reporter_id")
                    .table(SupportRequest::Table)
                    .col(SupportRequest::ReporterId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_support_requests_created_at")
                    .table(SupportRequest::Table)
                    .col(SupportRequest::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(SupportRequest::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum SupportRequest {
    #[sea_orm(iden = "support_requests")]
    Table,
    Id,
    Kind,
    ReporterId,
    ReporterName,
    ReporterEmail,
    CustomerId,
    Subject,
    Description,
    Priority,
    Category,
    Attachment,
    TrackerKey,
    TrackerId,
    TrackerUrl,
    TrackerStatus,
    CreatedAt,
    UpdatedAt,
}
