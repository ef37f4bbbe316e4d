use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionError, TransactionTrait,
};
use serde_json::json;
use tracing::{info, instrument};

use crate::entities::activity::ActivityVerb;
use crate::entities::{item, stock_in, stock_in_line, user};
use crate::errors::{ServiceError, ValidationFailure};
use crate::events::{Event, EventSender};
use crate::services::activity::{ActivityService, ActivityTarget, NewActivity};
use crate::services::{validate_batch, StockLine};

/// A stock-in batch to apply.
#[derive(Debug, Clone)]
pub struct NewStockIn {
    pub received_by: i64,
    pub lines: Vec<StockLine>,
    pub comment: String,
    /// Overrides the receive timestamp; defaults to `now`.
    pub received_at: Option<DateTime<Utc>>,
    /// Opaque reference to an attached document.
    pub document: Option<String>,
}

/// Applies incoming-quantity batches atomically.
#[derive(Clone)]
pub struct StockInService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StockInService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Validates and applies one stock-in batch.
    ///
    /// All-or-nothing: item increments, the header with its lines and the
    /// STOCKIN_CREATED audit record commit in a single transaction. Items
    /// are locked and applied in ascending item-id order so concurrent
    /// batches touching overlapping items cannot deadlock.
    #[instrument(skip(self, input), fields(lines = input.lines.len()))]
    pub async fn create_stock_in(
        &self,
        input: NewStockIn,
        now: DateTime<Utc>,
    ) -> Result<stock_in::Model, ServiceError> {
        let item_ids = validate_batch(&input.lines)?;

        let db = self.db_pool.as_ref();
        let line_count = input.lines.len();

        let header = db
            .transaction::<_, stock_in::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let actor = user::Entity::find_by_id(input.received_by)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("User {} not found", input.received_by))
                        })?;

                    // Lock every referenced item before reading anything we
                    // act on; ascending id keeps the order global.
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

                    let header = stock_in::ActiveModel {
                        received_by: Set(input.received_by),
                        document: Set(input.document.clone()),
                        comment: Set(input.comment.clone()),
                        received_at: Set(input.received_at.unwrap_or(now)),
                        created_at: Set(now),
                        ..Default::default()
                    };
                    let header = header.insert(txn).await.map_err(ServiceError::db_error)?;

                    // Apply in locked order for deterministic reporting
                    let mut line_detail = Vec::with_capacity(items.len());
                    for it in items {
                        let quantity = quantities[&it.id];

                        let mut active: item::ActiveModel = it.clone().into();
                        active.quantity = Set(it.quantity + quantity);
                        active.updated_at = Set(Some(now));
                        active.update(txn).await.map_err(ServiceError::db_error)?;

                        stock_in_line::ActiveModel {
                            stock_in_id: Set(header.id),
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
                    }

                    ActivityService::record(
                        txn,
                        NewActivity {
                            actor_id: actor.id,
                            verb: ActivityVerb::StockInCreated,
                            target: ActivityTarget::stock_in(header.id),
                            summary: format!(
                                "{} stocked in {} item(s)",
                                actor.full_name,
                                line_detail.len()
                            ),
                            metadata: json!({ "items": line_detail }),
                            created_at: now,
                        },
                    )
                    .await?;

                    Ok(header)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(stock_in_id = header.id, line_count, "Stock-in committed");

        self.event_sender
            .send_best_effort(Event::StockInCreated {
                stock_in_id: header.id,
                line_count,
            })
            .await;

        Ok(header)
    }

    /// Paginated stock-in history, newest first.
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<stock_in::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let paginator = stock_in::Entity::find()
            .order_by_desc(stock_in::Column::ReceivedAt)
            .order_by_desc(stock_in::Column::Id)
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
    ) -> Result<(stock_in::Model, Vec<stock_in_line::Model>), ServiceError> {
        let db = &*self.db_pool;

        let header = stock_in::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("StockIn {} not found", id)))?;

        let lines = stock_in_line::Entity::find()
            .filter(stock_in_line::Column::StockInId.eq(id))
            .order_by_asc(stock_in_line::Column::ItemId)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((header, lines))
    }
}
