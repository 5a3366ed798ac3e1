use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SponsorshipRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SponsorshipRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SponsorshipRequests::CampaignId).uuid().not_null())
                    .col(ColumnDef::new(SponsorshipRequests::SponsorId).uuid().not_null())
                    .col(ColumnDef::new(SponsorshipRequests::RecipientId).uuid().not_null())
                    // NULL for custom (untiered) offers
                    .col(ColumnDef::new(SponsorshipRequests::PerkTierId).uuid().null())
                    .col(
                        ColumnDef::new(SponsorshipRequests::Amount)
                            .decimal_len(16, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SponsorshipRequests::IsCustom).boolean().not_null())
                    .col(ColumnDef::new(SponsorshipRequests::CustomPerks).text().null())
                    .col(ColumnDef::new(SponsorshipRequests::Message).text().null())
                    .col(ColumnDef::new(SponsorshipRequests::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(SponsorshipRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SponsorshipRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sponsorship_requests_campaign")
                            .from(SponsorshipRequests::Table, SponsorshipRequests::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sponsorship_requests_perk_tier")
                            .from(SponsorshipRequests::Table, SponsorshipRequests::PerkTierId)
                            .to(PerkTiers::Table, PerkTiers::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SponsorshipRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SponsorshipRequests {
    Table,
    Id,
    CampaignId,
    SponsorId,
    RecipientId,
    PerkTierId,
    Amount,
    IsCustom,
    CustomPerks,
    Message,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Campaigns {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum PerkTiers {
    Table,
    Id,
}
