use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// What a ledger activity records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityVerb {
    StockInCreated,
    IssuanceCreated,
    IssuanceReversed,
    IssuanceFailed,
    LowStockAlert,
}

impl ActivityVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityVerb::StockInCreated => "STOCKIN_CREATED",
            ActivityVerb::IssuanceCreated => "ISSUANCE_CREATED",
            ActivityVerb::IssuanceReversed => "ISSUANCE_REVERSED",
            ActivityVerb::IssuanceFailed => "ISSUANCE_FAILED",
            ActivityVerb::LowStockAlert => "LOW_STOCK_ALERT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "STOCKIN_CREATED" => Some(ActivityVerb::StockInCreated),
            "ISSUANCE_CREATED" => Some(ActivityVerb::IssuanceCreated),
            "ISSUANCE_REVERSED" => Some(ActivityVerb::IssuanceReversed),
            "ISSUANCE_FAILED" => Some(ActivityVerb::IssuanceFailed),
            "LOW_STOCK_ALERT" => Some(ActivityVerb::LowStockAlert),
            _ => None,
        }
    }
}

/// Append-only audit entry; never mutated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub actor_id: i64,
    /// Storing as string in DB, but will convert to/from `ActivityVerb`
    pub verb: String,
    pub target_type: String,
    pub target_id: i64,
    pub summary: String,
    pub metadata: Json,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn verb(&self) -> Option<ActivityVerb> {
        ActivityVerb::from_str(&self.verb)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ActorId",
        to = "super::user::Column::Id"
    )]
    Actor,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Actor.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_round_trip() {
        for v in [
            ActivityVerb::StockInCreated,
            ActivityVerb::IssuanceCreated,
            ActivityVerb::IssuanceReversed,
            ActivityVerb::IssuanceFailed,
            ActivityVerb::LowStockAlert,
        ] {
            assert_eq!(ActivityVerb::from_str(v.as_str()), Some(v));
        }
        assert_eq!(ActivityVerb::from_str("ITEM_RENAMED"), None);
    }
}
