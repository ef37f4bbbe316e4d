use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionError, TransactionTrait,
};
use serde_json::json;
use tracing::{info, instrument};

use crate::entities::activity::ActivityVerb;
use crate::entities::{issuance, issuance_line, item, user};
use crate::errors::{ReversalFailure, ServiceError};
use crate::events::{Event, EventSender};
use crate::services::activity::{ActivityService, ActivityTarget, NewActivity};

/// Undoes a committed issuance's quantity effects, exactly once, within the
/// reversal window.
#[derive(Clone)]
pub struct ReversalService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ReversalService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Reverses one issuance.
    ///
    /// The header is checked under an exclusive lock, so two concurrent
    /// attempts serialize: the loser observes `is_reversed` and fails with
    /// no quantity change. The deadline is inclusive — a call at exactly
    /// `issued_at + 6h` succeeds. This is the only path besides stock-in
    /// that may increase an item's quantity.
    #[instrument(skip(self))]
    pub async fn reverse_issuance(
        &self,
        issuance_id: i64,
        reversed_by: i64,
        now: DateTime<Utc>,
    ) -> Result<issuance::Model, ServiceError> {
        let db = self.db_pool.as_ref();

        let header = db
            .transaction::<_, issuance::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = issuance::Entity::find_by_id(issuance_id)
                        .lock_exclusive()
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Issuance {} not found", issuance_id))
                        })?;

                    if header.is_reversed {
                        return Err(ServiceError::Reversal(ReversalFailure::AlreadyReversed {
                            issuance_id,
                        }));
                    }

                    let deadline = header.reversal_deadline();
                    if now > deadline {
                        return Err(ServiceError::Reversal(ReversalFailure::WindowExpired {
                            issuance_id,
                            deadline,
                        }));
                    }

                    let actor = user::Entity::find_by_id(reversed_by)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("User {} not found", reversed_by))
                        })?;

                    let lines = issuance_line::Entity::find()
                        .filter(issuance_line::Column::IssuanceId.eq(issuance_id))
                        .order_by_asc(issuance_line::Column::ItemId)
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let credits: HashMap<i64, i32> =
                        lines.iter().map(|l| (l.item_id, l.quantity)).collect();

                    // Same global lock order as the forward engines
                    let item_ids: Vec<i64> = lines.iter().map(|l| l.item_id).collect();
                    let items = item::Entity::find()
                        .filter(item::Column::Id.is_in(item_ids))
                        .order_by_asc(item::Column::Id)
                        .lock_exclusive()
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let mut line_detail = Vec::with_capacity(items.len());
                    for it in items {
                        let quantity = credits[&it.id];

                        let mut active: item::ActiveModel = it.clone().into();
                        active.quantity = Set(it.quantity + quantity);
                        active.updated_at = Set(Some(now));
                        active.update(txn).await.map_err(ServiceError::db_error)?;

                        line_detail.push(json!({
                            "item_id": it.id,
                            "item": it.name,
                            "quantity": quantity,
                        }));
                    }

                    let mut active: issuance::ActiveModel = header.into();
                    active.is_reversed = Set(true);
                    active.reversed_at = Set(Some(now));
                    active.reversed_by = Set(Some(reversed_by));
                    let updated = active.update(txn).await.map_err(ServiceError::db_error)?;

                    ActivityService::record(
                        txn,
                        NewActivity {
                            actor_id: actor.id,
                            verb: ActivityVerb::IssuanceReversed,
                            target: ActivityTarget::issuance(updated.id),
                            summary: format!(
                                "{} reversed Issuance #{}",
                                actor.full_name, updated.id
                            ),
                            metadata: json!({ "items": line_detail }),
                            created_at: now,
                        },
                    )
                    .await?;

                    Ok(updated)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(issuance_id = header.id, "Issuance reversed");

        self.event_sender
            .send_best_effort(Event::IssuanceReversed {
                issuance_id: header.id,
            })
            .await;

        Ok(header)
    }
}
