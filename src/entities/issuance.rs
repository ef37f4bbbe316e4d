use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Hours after `issued_at` during which an issuance may still be reversed.
/// The deadline is inclusive: a reversal at exactly `issued_at + 6h` succeeds.
pub const REVERSAL_WINDOW_HOURS: i64 = 6;

/// Lifecycle of an issuance relative to its reversal window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssuanceStatus {
    /// Not reversed, within the reversal window
    Active,
    /// Not reversed, window expired
    Locked,
    Reversed,
}

impl IssuanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuanceStatus::Active => "Active",
            IssuanceStatus::Locked => "Locked",
            IssuanceStatus::Reversed => "Reversed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "issuances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub staff_id: i64,
    pub issued_by: i64,
    pub comment: String,
    pub issued_at: DateTime<Utc>,
    pub is_reversed: bool,
    pub reversed_at: Option<DateTime<Utc>>,
    pub reversed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Last instant at which this issuance may be reversed (inclusive).
    pub fn reversal_deadline(&self) -> DateTime<Utc> {
        self.issued_at + Duration::hours(REVERSAL_WINDOW_HOURS)
    }

    pub fn can_reverse_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_reversed && now <= self.reversal_deadline()
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> IssuanceStatus {
        if self.is_reversed {
            IssuanceStatus::Reversed
        } else if now <= self.reversal_deadline() {
            IssuanceStatus::Active
        } else {
            IssuanceStatus::Locked
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::staff::Entity",
        from = "Column::StaffId",
        to = "super::staff::Column::Id"
    )]
    Staff,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::IssuedBy",
        to = "super::user::Column::Id"
    )]
    IssuedByUser,
    #[sea_orm(has_many = "super::issuance_line::Entity")]
    Lines,
}

impl Related<super::staff::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Staff.def()
    }
}

impl Related<super::issuance_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
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
    use chrono::TimeZone;

    fn issuance(issued_at: DateTime<Utc>, is_reversed: bool) -> Model {
        Model {
            id: 1,
            staff_id: 1,
            issued_by: 1,
            comment: String::new(),
            issued_at,
            is_reversed,
            reversed_at: None,
            reversed_by: None,
            created_at: issued_at,
        }
    }

    #[test]
    fn deadline_is_inclusive() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let iss = issuance(t0, false);

        let deadline = iss.reversal_deadline();
        assert!(iss.can_reverse_at(deadline));
        assert!(!iss.can_reverse_at(deadline + Duration::seconds(1)));
    }

    #[test]
    fn status_transitions() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();

        let iss = issuance(t0, false);
        assert_eq!(iss.status_at(t0 + Duration::hours(1)), IssuanceStatus::Active);
        assert_eq!(iss.status_at(t0 + Duration::hours(7)), IssuanceStatus::Locked);

        let reversed = issuance(t0, true);
        assert_eq!(
            reversed.status_at(t0 + Duration::hours(1)),
            IssuanceStatus::Reversed
        );
        assert!(!reversed.can_reverse_at(t0 + Duration::hours(1)));
    }
}
