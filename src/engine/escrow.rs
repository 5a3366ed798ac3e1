use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::{escrow_entry, EscrowEntries, EscrowStatus};
use crate::error::AppError;

/// Open a HELD ledger entry for a freshly submitted offer.
#[tracing::instrument(skip(conn))]
pub async fn hold<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
    amount: Decimal,
) -> Result<escrow_entry::Model, AppError> {
    let now = Utc::now();
    let entry = escrow_entry::ActiveModel {
        id: Set(Uuid::new_v4()),
        request_id: Set(request_id),
        amount: Set(amount),
        status: Set(EscrowStatus::Held),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(entry.insert(conn).await?)
}

/// HELD → RELEASED. Releasing an already-RELEASED entry is an idempotent
/// no-op returning the terminal row (duplicate approval clicks and
/// webhook-style retries are expected); releasing a REFUNDED entry is
/// `InvalidTransition`.
pub async fn release<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
) -> Result<escrow_entry::Model, AppError> {
    resolve(conn, request_id, EscrowStatus::Released).await
}

/// HELD → REFUNDED, with the same idempotence rule as `release`.
pub async fn refund<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
) -> Result<escrow_entry::Model, AppError> {
    resolve(conn, request_id, EscrowStatus::Refunded).await
}

/// Look up the ledger entry for an offer.
pub async fn entry_for<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
) -> Result<escrow_entry::Model, AppError> {
    EscrowEntries::find()
        .filter(escrow_entry::Column::RequestId.eq(request_id))
        .one(conn)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("no escrow entry for offer {}", request_id))
        })
}

// The HELD -> terminal flip is a conditional UPDATE checked by affected-row
// count, so two racing resolutions cannot both take effect.
#[tracing::instrument(skip(conn))]
async fn resolve<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
    target: EscrowStatus,
) -> Result<escrow_entry::Model, AppError> {
    let result = EscrowEntries::update_many()
        .col_expr(escrow_entry::Column::Status, Expr::value(target))
        .col_expr(escrow_entry::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(escrow_entry::Column::RequestId.eq(request_id))
        .filter(escrow_entry::Column::Status.eq(EscrowStatus::Held))
        .exec(conn)
        .await?;

    let entry = entry_for(conn, request_id).await?;

    if result.rows_affected == 0 {
        if entry.status == target {
            // Second release/refund of a resolved entry: return the
            // terminal state rather than erroring.
            tracing::debug!(?target, "escrow entry already resolved");
            return Ok(entry);
        }
        return Err(AppError::InvalidTransition(format!(
            "escrow for offer {} is {:?}, cannot move to {:?}",
            request_id, entry.status, target
        )));
    }

    Ok(entry)
}
