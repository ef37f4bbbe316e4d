use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Units an item can be counted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitOfMeasure {
    Pkts,
    Pcs,
    Bundles,
    Dozen,
    Pairs,
    Rolls,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Pkts => "pkts",
            UnitOfMeasure::Pcs => "pcs",
            UnitOfMeasure::Bundles => "bundles",
            UnitOfMeasure::Dozen => "dozen",
            UnitOfMeasure::Pairs => "pairs",
            UnitOfMeasure::Rolls => "rolls",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pkts" => Some(UnitOfMeasure::Pkts),
            "pcs" => Some(UnitOfMeasure::Pcs),
            "bundles" => Some(UnitOfMeasure::Bundles),
            "dozen" => Some(UnitOfMeasure::Dozen),
            "pairs" => Some(UnitOfMeasure::Pairs),
            "rolls" => Some(UnitOfMeasure::Rolls),
            _ => None,
        }
    }
}

/// Stock position derived from quantity and reorder level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::InStock => "In Stock",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    /// Mutated only by the stock-in, issuance and reversal engines.
    pub quantity: i32,
    pub description: Option<String>,
    pub unit_of_measurement: String,
    pub reorder_level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> StockStatus {
        if self.quantity == 0 {
            StockStatus::OutOfStock
        } else if self.quantity <= self.reorder_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn unit(&self) -> Option<UnitOfMeasure> {
        UnitOfMeasure::from_str(&self.unit_of_measurement)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::stock_in_line::Entity")]
    StockInLines,
    #[sea_orm(has_many = "super::issuance_line::Entity")]
    IssuanceLines,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::stock_in_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockInLines.def()
    }
}

impl Related<super::issuance_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IssuanceLines.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }

        if let ActiveValue::NotSet = active_model.updated_at {
            active_model.updated_at = Set(Some(now));
        }

        Ok(active_model)
    }
}
