use futures::future::join_all;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::engine::aggregator;
use crate::entities::{campaign, CampaignStatus, Campaigns};

/// Sweep all non-terminal campaigns and re-derive their funding totals and
/// status (drift repair + lazy deadline expiry).
///
/// The guarded engine operations keep these consistent in normal
/// operation; this job exists so a crashed transaction or operator edit
/// cannot leave a campaign out of step forever.
pub async fn run_funding_reconciliation(conn: Option<&DatabaseConnection>) -> anyhow::Result<()> {
    let Some(db) = conn else {
        tracing::info!("no database connection; skipping reconciliation");
        return Ok(());
    };

    let campaigns = Campaigns::find()
        .filter(
            campaign::Column::Status
                .is_in([CampaignStatus::Open, CampaignStatus::Active]),
        )
        .all(db)
        .await?;
    tracing::info!("Reconciling {} open/active campaigns", campaigns.len());

    let sweeps = campaigns.iter().map(|record| {
        let id = record.id;
        async move { (id, aggregator::recompute_campaign_status(db, id).await) }
    });
    let results = join_all(sweeps).await;

    let mut failures = 0;
    for (id, result) in results {
        match result {
            Ok(record) => {
                tracing::debug!(campaign_id = %id, status = ?record.status, "campaign reconciled");
            }
            Err(e) => {
                failures += 1;
                tracing::error!(campaign_id = %id, error = %e, "reconciliation failed for campaign");
            }
        }
    }
    if failures > 0 {
        tracing::warn!("Reconciliation finished with {} failures", failures);
    }

    Ok(())
}
