//! # Order Status Commands
//!
//! The bar's side of fulfillment: list the queue, move orders along.
//!
//! ```text
//! Barista screen                    Database
//! ──────────────                    ────────
//! sees order #A in `pending`
//! taps "Start"  ──► update_order_status(A, pending, in_progress)
//!                        │
//!                        ▼
//!                   UPDATE ... WHERE id = A AND status = 'pending'
//!                   RETURNING the header
//!                        │
//!            ┌───────────┴────────────┐
//!            ▼                        ▼
//!      1 row: updated           0 rows: CONFLICT
//!                              (someone else moved it; refresh)
//! ```
//!
//! The write and the read-back are one statement, so a retried attempt
//! either finds nothing committed or reports the real persisted status.

use brewline_core::validation::validate_uuid;
use brewline_core::{Order, OrderStatus};
use brewline_db::Database;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::retry::with_backoff;

/// Moves an order from `expected` to `desired`.
///
/// ## Errors
/// - `NOT_FOUND`: no such order
/// - `CONFLICT`: the order is no longer in `expected`
/// - `INVALID_TRANSITION`: backward moves, self-moves, or leaving a
///   terminal status
pub async fn update_order_status(
    db: &Database,
    config: &AppConfig,
    order_id: &str,
    expected: OrderStatus,
    desired: OrderStatus,
) -> Result<Order, ApiError> {
    validate_uuid(order_id)?;
    debug!(order_id, from = %expected, to = %desired, "update_order_status command");

    let orders = db.orders();
    let orders = &orders;
    let order = with_backoff(&config.retry_policy(), "update_order_status", move || {
        orders.update_status(order_id, expected, desired)
    })
    .await?;

    info!(
        order_id,
        tracking_code = %order.tracking_code,
        status = %order.status,
        "Order moved"
    );

    Ok(order)
}

/// Orders in `status`, earliest pickup first.
pub async fn list_queue(
    db: &Database,
    config: &AppConfig,
    status: OrderStatus,
) -> Result<Vec<Order>, ApiError> {
    debug!(status = %status, "list_queue command");

    let orders = db.orders();
    let orders = &orders;
    let limit = config.orders.queue_limit;
    let queue = with_backoff(&config.retry_policy(), "list_queue", move || {
        orders.list_by_status(status, limit)
    })
    .await?;

    Ok(queue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::checkout::checkout;
    use crate::commands::checkout::tests::{add_latte, request};
    use crate::commands::fixtures::{config, seeded_db};
    use crate::error::ErrorCode;
    use crate::state::SessionCarts;

    async fn place(db: &Database, session: &str) -> String {
        let carts = SessionCarts::new();
        add_latte(db, &carts, session, 1.0).await;
        checkout(db, &carts, &config(), session, request())
            .await
            .unwrap()
            .order_id
            .unwrap()
    }

    #[tokio::test]
    async fn test_forward_moves() {
        let db = seeded_db().await;
        let cfg = config();
        let id = place(&db, "s1").await;

        let order = update_order_status(&db, &cfg, &id, OrderStatus::Pending, OrderStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::InProgress);

        // Skipping ahead is allowed
        let order = update_order_status(&db, &cfg, &id, OrderStatus::InProgress, OrderStatus::PickedUp)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::PickedUp);
    }

    #[tokio::test]
    async fn test_stale_expected_is_conflict() {
        let db = seeded_db().await;
        let cfg = config();
        let id = place(&db, "s1").await;

        update_order_status(&db, &cfg, &id, OrderStatus::Pending, OrderStatus::Ready)
            .await
            .unwrap();

        let err = update_order_status(&db, &cfg, &id, OrderStatus::Pending, OrderStatus::InProgress)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_backward_and_terminal_moves_rejected() {
        let db = seeded_db().await;
        let cfg = config();
        let id = place(&db, "s1").await;

        update_order_status(&db, &cfg, &id, OrderStatus::Pending, OrderStatus::Ready)
            .await
            .unwrap();

        let err = update_order_status(&db, &cfg, &id, OrderStatus::Ready, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);

        update_order_status(&db, &cfg, &id, OrderStatus::Ready, OrderStatus::Cancelled)
            .await
            .unwrap();
        let err = update_order_status(&db, &cfg, &id, OrderStatus::Cancelled, OrderStatus::Ready)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids() {
        let db = seeded_db().await;
        let cfg = config();

        let missing = uuid::Uuid::new_v4().to_string();
        let err = update_order_status(&db, &cfg, &missing, OrderStatus::Pending, OrderStatus::Ready)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = update_order_status(&db, &cfg, "order-1", OrderStatus::Pending, OrderStatus::Ready)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_queue_by_status() {
        let db = seeded_db().await;
        let cfg = config();
        let first = place(&db, "s1").await;
        let second = place(&db, "s2").await;

        update_order_status(&db, &cfg, &second, OrderStatus::Pending, OrderStatus::InProgress)
            .await
            .unwrap();

        let pending = list_queue(&db, &cfg, OrderStatus::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, first);

        let in_progress = list_queue(&db, &cfg, OrderStatus::InProgress).await.unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].id, second);

        assert!(list_queue(&db, &cfg, OrderStatus::Ready).await.unwrap().is_empty());
    }
}
