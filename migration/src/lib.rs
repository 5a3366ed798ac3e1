pub use sea_orm_migration::prelude::*;

mod m20250801_101500_create_profiles_table;
mod m20250801_102030_create_campaigns_table;
mod m20250801_102815_create_perk_tiers_table;
mod m20250801_103420_create_sponsorship_requests_table;
mod m20250801_104050_create_escrow_entries_table;
// Add other migration modules here if you have more

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_101500_create_profiles_table::Migration),
            Box::new(m20250801_102030_create_campaigns_table::Migration),
            Box::new(m20250801_102815_create_perk_tiers_table::Migration),
            Box::new(m20250801_103420_create_sponsorship_requests_table::Migration),
            Box::new(m20250801_104050_create_escrow_entries_table::Migration),
        ]
    }
}
