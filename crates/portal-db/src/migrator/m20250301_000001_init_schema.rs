//! Initial schema: accounts and onboarding submissions

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // 1. Create accounts table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Account::Table)
                    .if_not_exists()
                    .col(uuid(Account::Id).primary_key())
                    .col(string_len(Account::Email, 255).not_null())
                    .col(string_len(Account::PasswordHash, 255).not_null())
                    .col(string_len_null(Account::FullName, 255))
                    .col(string_len_null(Account::Phone, 64))
                    .col(string_len_null(Account::AvatarUrl, 512))
                    .col(string_len_null(Account::CompanyName, 255))
                    .col(string_len(Account::AccountCode, 32).not_null())
                    .col(string_len(Account::Role, 32).not_null().default("customer"))
                    .col(boolean(Account::IsActive).not_null().default(true))
                    .col(
                        boolean(Account::MustChangePassword)
                            .not_null()
                            .default(false),
                    )
                    .col(string_len_null(Account::ResetTokenHash, 128))
                    .col(timestamp_with_time_zone_null(Account::ResetTokenExpiresAt))
                    .col(timestamp_with_time_zone_null(Account::LastLoginAt))
                    .col(
                        timestamp_with_time_zone(Account::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Account::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_accounts_email")
                    .table(Account::Table)
                    .col(Account::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_accounts_account_code")
                    .table(Account::Table)
                    .col(Account::AccountCode)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_accounts_reset_token_hash")
                    .table(Account::Table)
                    .col(Account::ResetTokenHash)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 2. Create onboarding_submissions table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(OnboardingSubmission::Table)
                    .if_not_exists()
                    .col(uuid(OnboardingSubmission::Id).primary_key())
                    .col(string_len(OnboardingSubmission::CustomerId, 32).not_null())
                    .col(string_len(OnboardingSubmission::CompanyName, 255).not_null())
                    .col(string_len(OnboardingSubmission::CompanyEmail, 255).not_null())
                    .col(string_len_null(OnboardingSubmission::ContactName, 255))
                    .col(string_len_null(OnboardingSubmission::ContactPhone, 64))
                    .col(string_len_null(OnboardingSubmission::ContactEmail, 255))
                    .col(string_len_null(OnboardingSubmission::SecondaryContactName, 255))
                    .col(string_len_null(OnboardingSubmission::SecondaryContactPhone, 64))
                    .col(string_len_null(OnboardingSubmission::SecondaryContactEmail, 255))
                    .col(
                        integer(OnboardingSubmission::NumberOfAccounts)
                            .not_null()
                            .default(0),
                    )
                    .col(text(OnboardingSubmission::Aliases).not_null())
                    .col(text_null(OnboardingSubmission::OtherAliases))
                    .col(boolean(OnboardingSubmission::Agree).not_null())
                    .col(boolean(OnboardingSubmission::Acknowledge).not_null())
                    .col(boolean(OnboardingSubmission::Confirm).not_null())
                    .col(
                        timestamp_with_time_zone(OnboardingSubmission::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(OnboardingSubmission::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // The storage-level guarantee behind "one submission per company email"
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_onboarding_submissions_company_email")
                    .table(OnboardingSubmission::Table)
                    .col(OnboardingSubmission::CompanyEmail)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_onboarding_submissions_customer_id")
                    .table(OnboardingSubmission::Table)
                    .col(OnboardingSubmission::CustomerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_onboarding_submissions_created_at")
                    .table(OnboardingSubmission::Table)
                    .col(OnboardingSubmission::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(OnboardingSubmission::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Account::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Account {
    #[sea_orm(iden = "accounts")]
    Table,
    Id,
    Email,
    PasswordHash,
    FullName,
    Phone,
    AvatarUrl,
    CompanyName,
    AccountCode,
    Role,
    IsActive,
    MustChangePassword,
    ResetTokenHash,
    ResetTokenExpiresAt,
    LastLoginAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OnboardingSubmission {
    #[sea_orm(iden = "onboarding_submissions")]
    Table,
    Id,
    CustomerId,
    CompanyName,
    CompanyEmail,
    ContactName,
    ContactPhone,
    ContactEmail,
    SecondaryContactName,
    SecondaryContactPhone,
    SecondaryContactEmail,
    NumberOfAccounts,
    Aliases,
    OtherAliases,
    Agree,
    Acknowledge,
    Confirm,
    CreatedAt,
    UpdatedAt,
}
