use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{info, instrument};

use crate::entities::item::{self, Entity as Item, UnitOfMeasure};
use crate::entities::{issuance_line, stock_in_line};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub category_id: i64,
    /// Opening balance; afterwards quantity moves only through the engines.
    pub initial_quantity: i32,
    pub description: Option<String>,
    pub unit_of_measurement: UnitOfMeasure,
    pub reorder_level: i32,
}

/// Catalog fields only. Quantity is deliberately absent: stock levels move
/// through stock-in, issuance and reversal, never through catalog edits.
#[derive(Debug, Clone, Default)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub description: Option<Option<String>>,
    pub unit_of_measurement: Option<UnitOfMeasure>,
    pub reorder_level: Option<i32>,
}

/// Catalog maintenance and stock-position queries.
#[derive(Clone)]
pub struct ItemService {
    db_pool: Arc<DatabaseConnection>,
}

impl ItemService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Paginated catalog listing with optional name search and category
    /// filter, ordered by name.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
        search: Option<String>,
        category_id: Option<i64>,
    ) -> Result<(Vec<item::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = Item::find();
        if let Some(q) = search.filter(|q| !q.trim().is_empty()) {
            query = query.filter(item::Column::Name.contains(q.trim()));
        }
        if let Some(cat) = category_id {
            query = query.filter(item::Column::CategoryId.eq(cat));
        }

        let paginator = query.order_by_asc(item::Column::Name).paginate(db, limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    pub async fn get(&self, id: i64) -> Result<item::Model, ServiceError> {
        let db = &*self.db_pool;

        Item::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", id)))
    }

    pub async fn create(
        &self,
        input: NewItem,
        now: DateTime<Utc>,
    ) -> Result<item::Model, ServiceError> {
        let db = &*self.db_pool;

        let model = item::ActiveModel {
            name: Set(input.name),
            category_id: Set(input.category_id),
            quantity: Set(input.initial_quantity.max(0)),
            description: Set(input.description),
            unit_of_measurement: Set(input.unit_of_measurement.as_str().to_string()),
            reorder_level: Set(input.reorder_level.max(0)),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            ..Default::default()
        };

        let created = model.insert(db).await.map_err(ServiceError::db_error)?;
        info!(item_id = created.id, "Item created");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateItem,
        now: DateTime<Utc>,
    ) -> Result<item::Model, ServiceError> {
        let db = &*self.db_pool;

        let existing = self.get(id).await?;
        let mut active: item::ActiveModel = existing.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(unit) = input.unit_of_measurement {
            active.unit_of_measurement = Set(unit.as_str().to_string());
        }
        if let Some(reorder_level) = input.reorder_level {
            active.reorder_level = Set(reorder_level.max(0));
        }
        active.updated_at = Set(Some(now));

        active.update(db).await.map_err(ServiceError::db_error)
    }

    /// Deletes an item unless any ledger line references it.
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let existing = self.get(id).await?;

        let stock_in_refs = stock_in_line::Entity::find()
            .filter(stock_in_line::Column::ItemId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let issuance_refs = issuance_line::Entity::find()
            .filter(issuance_line::Column::ItemId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;

        if stock_in_refs > 0 || issuance_refs > 0 {
            return Err(ServiceError::Conflict(format!(
                "Item {} is referenced by ledger records and cannot be deleted.",
                existing.name
            )));
        }

        existing.delete(db).await.map_err(ServiceError::db_error)?;
        info!(item_id = id, "Item deleted");
        Ok(())
    }

    /// Items above zero but at or below their reorder level, lowest first.
    pub async fn low_stock(&self) -> Result<Vec<item::Model>, ServiceError> {
        let db = &*self.db_pool;

        Item::find()
            .filter(item::Column::Quantity.gt(0))
            .filter(Expr::col(item::Column::Quantity).lte(Expr::col(item::Column::ReorderLevel)))
            .order_by_asc(item::Column::Quantity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Items with nothing left, by name.
    pub async fn out_of_stock(&self) -> Result<Vec<item::Model>, ServiceError> {
        let db = &*self.db_pool;

        Item::find()
            .filter(item::Column::Quantity.eq(0))
            .order_by_asc(item::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}
