use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EscrowEntries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(EscrowEntries::Id).uuid().not_null().primary_key())
                    // One ledger entry per offer
                    .col(
                        ColumnDef::new(EscrowEntries::RequestId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(EscrowEntries::Amount).decimal_len(16, 2).not_null())
                    .col(ColumnDef::new(EscrowEntries::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(EscrowEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(EscrowEntries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_escrow_entries_request")
                            .from(EscrowEntries::Table, EscrowEntries::RequestId)
                            .to(SponsorshipRequests::Table, SponsorshipRequests::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EscrowEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EscrowEntries {
    Table,
    Id,
    RequestId,
    Amount,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SponsorshipRequests {
    Table,
    Id,
}
