use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PerkTiers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PerkTiers::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(PerkTiers::CampaignId).uuid().not_null())
                    .col(ColumnDef::new(PerkTiers::Name).string().not_null())
                    .col(ColumnDef::new(PerkTiers::Description).text().not_null())
                    .col(ColumnDef::new(PerkTiers::Amount).decimal_len(16, 2).not_null())
                    // NULL means unlimited capacity
                    .col(ColumnDef::new(PerkTiers::MaxSponsors).integer().null())
                    .col(
                        ColumnDef::new(PerkTiers::CurrentSponsors)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PerkTiers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_perk_tiers_campaign")
                            .from(PerkTiers::Table, PerkTiers::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            // Tiers are a composition of the campaign
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PerkTiers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PerkTiers {
    Table,
    Id,
    CampaignId,
    Name,
    Description,
    Amount,
    MaxSponsors,
    CurrentSponsors,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Campaigns {
    Table,
    Id,
}
