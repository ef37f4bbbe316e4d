use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::activity::{self, ActivityVerb, Entity as Activity};
use crate::errors::ServiceError;

/// Where an activity points. Supports both a persisted entity and a
/// sentinel type/id pair for events that created nothing (e.g. a rejected
/// issuance attempt).
#[derive(Debug, Clone)]
pub struct ActivityTarget {
    pub target_type: String,
    pub target_id: i64,
}

impl ActivityTarget {
    pub fn stock_in(id: i64) -> Self {
        Self {
            target_type: "StockIn".into(),
            target_id: id,
        }
    }

    pub fn issuance(id: i64) -> Self {
        Self {
            target_type: "Issuance".into(),
            target_id: id,
        }
    }

    pub fn item(id: i64) -> Self {
        Self {
            target_type: "Item".into(),
            target_id: id,
        }
    }

    /// Sentinel target for issuance attempts that never created a header.
    pub fn failed_issuance() -> Self {
        Self::issuance(0)
    }
}

/// One audit entry about to be appended.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub actor_id: i64,
    pub verb: ActivityVerb,
    pub target: ActivityTarget,
    pub summary: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Append-only recorder for the audit spine plus feed queries.
#[derive(Clone)]
pub struct ActivityService {
    db_pool: Arc<DatabaseConnection>,
}

impl ActivityService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Appends one audit entry on the given connection.
    ///
    /// Generic over the connection so engines can couple the append to their
    /// own transaction; callers recording outside a transaction pass the
    /// pool connection.
    pub async fn record<C>(conn: &C, entry: NewActivity) -> Result<activity::Model, ServiceError>
    where
        C: ConnectionTrait,
    {
        let model = activity::ActiveModel {
            actor_id: Set(entry.actor_id),
            verb: Set(entry.verb.as_str().to_string()),
            target_type: Set(entry.target.target_type),
            target_id: Set(entry.target.target_id),
            summary: Set(entry.summary),
            metadata: Set(entry.metadata),
            created_at: Set(entry.created_at),
            ..Default::default()
        };

        model.insert(conn).await.map_err(ServiceError::db_error)
    }

    /// Most recent activities, newest first.
    pub async fn recent(&self, limit: u64) -> Result<Vec<activity::Model>, ServiceError> {
        let db = &*self.db_pool;

        Activity::find()
            .order_by_desc(activity::Column::CreatedAt)
            .order_by_desc(activity::Column::Id)
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Paginated activity feed, newest first.
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<activity::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let paginator = Activity::find()
            .order_by_desc(activity::Column::CreatedAt)
            .order_by_desc(activity::Column::Id)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let entries = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((entries, total))
    }
}
