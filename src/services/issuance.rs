use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionError, TransactionTrait,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::entities::activity::{self, ActivityVerb};
use crate::entities::{department, issuance, issuance_line, item, staff, user};
use crate::errors::{ServiceError, ValidationFailure};
use crate::events::{Event, EventSender};
use crate::services::activity::{ActivityService, ActivityTarget, NewActivity};
use crate::services::{validate_batch, StockLine};

/// An issuance batch to apply.
#[derive(Debug, Clone)]
pub struct NewIssuance {
    pub staff_id: i64,
    pub issued_by: i64,
    pub lines: Vec<StockLine>,
    pub comment: String,
}

/// Applies outgoing-quantity batches atomically, never below zero stock.
#[derive(Clone)]
pub struct IssuanceService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl IssuanceService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Validates and applies one issuance batch.
    ///
    /// Mirrors stock-in (same lock order, same all-or-nothing contract) with
    /// one addition: after locking, every line must fit within the item's
    /// current quantity or the whole batch is rejected naming the first
    /// short item. The ISSUANCE_CREATED audit record commits with the
    /// mutation; low-stock alerts go out best-effort after the commit.
    #[instrument(skip(self, input), fields(staff_id = input.staff_id, lines = input.lines.len()))]
    pub async fn create_issuance(
        &self,
        input: NewIssuance,
        now: DateTime<Utc>,
    ) -> Result<issuance::Model, ServiceError> {
        let item_ids = validate_batch(&input.lines)?;

        let db = self.db_pool.as_ref();
        let line_count = input.lines.len();
        let staff_id = input.staff_id;

        let (header, touched_items) = db
            .transaction::<_, (issuance::Model, Vec<item::Model>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let staff_member = staff::Entity::find_by_id(input.staff_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or(ServiceError::Validation(ValidationFailure::MissingStaff))?;

                    let department = match staff_member.department_id {
                        Some(dept_id) => department::Entity::find_by_id(dept_id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?,
                        None => None,
                    };

                    let actor = user::Entity::find_by_id(input.issued_by)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("User {} not found", input.issued_by))
                        })?;

                    let items = item::Entity::find()
                        .filter(item::Column::Id.is_in(item_ids.clone()))
                        .order_by_asc(item::Column::Id)
                        .lock_exclusive()
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    if items.len() != item_ids.len() {
                        return Err(ServiceError::Validation(ValidationFailure::UnknownItems));
                    }

                    let quantities: HashMap<i64, i32> = input
                        .lines
                        .iter()
                        .map(|l| (l.item_id, l.quantity))
                        .collect();

                    // Sufficiency is decided only under the lock; checked in
                    // locked order so the reported shortage is deterministic.
                    for it in &items {
                        let requested = quantities[&it.id];
                        if it.quantity < requested {
                            return Err(ServiceError::InsufficientStock {
                                item_id: it.id,
                                item_name: it.name.clone(),
                                available: it.quantity,
                                requested,
                            });
                        }
                    }

                    let header = issuance::ActiveModel {
                        staff_id: Set(staff_member.id),
                        issued_by: Set(actor.id),
                        comment: Set(input.comment.clone()),
                        issued_at: Set(now),
                        is_reversed: Set(false),
                        created_at: Set(now),
                        ..Default::default()
                    };
                    let header = header.insert(txn).await.map_err(ServiceError::db_error)?;

                    let mut line_detail = Vec::with_capacity(items.len());
                    let mut touched = Vec::with_capacity(items.len());
                    for it in items {
                        let quantity = quantities[&it.id];

                        let mut active: item::ActiveModel = it.clone().into();
                        active.quantity = Set(it.quantity - quantity);
                        active.updated_at = Set(Some(now));
                        let updated = active.update(txn).await.map_err(ServiceError::db_error)?;

                        issuance_line::ActiveModel {
                            issuance_id: Set(header.id),
                            item_id: Set(it.id),
                            quantity: Set(quantity),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                        line_detail.push(json!({
                            "item_id": it.id,
                            "item": it.name,
                            "quantity": quantity,
                        }));
                        touched.push(updated);
                    }

                    ActivityService::record(
                        txn,
                        NewActivity {
                            actor_id: actor.id,
                            verb: ActivityVerb::IssuanceCreated,
                            target: ActivityTarget::issuance(header.id),
                            summary: format!(
                                "{} issued {} item(s) to {}",
                                actor.full_name,
                                line_detail.len(),
                                staff_member.name
                            ),
                            metadata: json!({
                                "staff_id": staff_member.id,
                                "staff_name": staff_member.name,
                                "department": department.map(|d| d.name).unwrap_or_default(),
                                "items": line_detail,
                            }),
                            created_at: now,
                        },
                    )
                    .await?;

                    Ok((header, touched))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(issuance_id = header.id, line_count, "Issuance committed");

        self.alert_low_stock(&touched_items, header.issued_by, now)
            .await;

        self.event_sender
            .send_best_effort(Event::IssuanceCreated {
                issuance_id: header.id,
                staff_id,
                line_count,
            })
            .await;

        Ok(header)
    }

    /// Records an ISSUANCE_FAILED activity against the sentinel target so a
    /// rejected batch stays auditable without a half-created header.
    pub async fn record_failed_issuance(
        &self,
        actor_id: i64,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<activity::Model, ServiceError> {
        let db = &*self.db_pool;

        let actor = user::Entity::find_by_id(actor_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", actor_id)))?;

        let record = ActivityService::record(
            db,
            NewActivity {
                actor_id: actor.id,
                verb: ActivityVerb::IssuanceFailed,
                target: ActivityTarget::failed_issuance(),
                summary: format!(
                    "{} attempted an issuance but failed: {}",
                    actor.full_name, error
                ),
                metadata: json!({ "error": error }),
                created_at: now,
            },
        )
        .await?;

        self.event_sender
            .send_best_effort(Event::IssuanceFailed { actor_id })
            .await;

        Ok(record)
    }

    /// Paginated issuance history, newest first, optionally filtered to one
    /// department.
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
        department_id: Option<i64>,
    ) -> Result<(Vec<issuance::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = issuance::Entity::find();
        if let Some(dept_id) = department_id {
            query = query
                .join(JoinType::InnerJoin, issuance::Relation::Staff.def())
                .filter(staff::Column::DepartmentId.eq(dept_id));
        }

        let paginator = query
            .order_by_desc(issuance::Column::IssuedAt)
            .order_by_desc(issuance::Column::Id)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let headers = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((headers, total))
    }

    /// One header with its lines, or NotFound.
    pub async fn get_with_lines(
        &self,
        id: i64,
    ) -> Result<(issuance::Model, Vec<issuance_line::Model>), ServiceError> {
        let db = &*self.db_pool;

        let header = issuance::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Issuance {} not found", id)))?;

        let lines = issuance_line::Entity::find()
            .filter(issuance_line::Column::IssuanceId.eq(id))
            .order_by_asc(issuance_line::Column::ItemId)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((header, lines))
    }

    /// Best-effort low-stock audit records for items the committed batch
    /// pushed to or below their reorder level. Runs outside the batch
    /// transaction: a failed append is logged, never propagated.
    async fn alert_low_stock(&self, touched: &[item::Model], actor_id: i64, now: DateTime<Utc>) {
        let db = &*self.db_pool;

        for it in touched {
            if it.quantity > it.reorder_level {
                continue;
            }

            let result = ActivityService::record(
                db,
                NewActivity {
                    actor_id,
                    verb: ActivityVerb::LowStockAlert,
                    target: ActivityTarget::item(it.id),
                    summary: format!(
                        "Low stock: {} ({} {} remaining, reorder level {})",
                        it.name, it.quantity, it.unit_of_measurement, it.reorder_level
                    ),
                    metadata: json!({
                        "item_id": it.id,
                        "quantity": it.quantity,
                        "reorder_level": it.reorder_level,
                    }),
                    created_at: now,
                },
            )
            .await;

            if let Err(e) = result {
                let e = ServiceError::AuditLogging(e.to_string());
                warn!(item_id = it.id, "{}", e);
            }

            self.event_sender
                .send_best_effort(Event::LowStockAlert {
                    item_id: it.id,
                    quantity: it.quantity,
                    reorder_level: it.reorder_level,
                })
                .await;
        }
    }
}
