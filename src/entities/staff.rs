use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Staff member receiving issued stock. Distinct from `user`, which is the
/// operator performing ledger actions.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "staff")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub staff_code: String,
    pub name: String,
    pub department_id: Option<i64>,
    pub job_role: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id"
    )]
    Department,
    #[sea_orm(has_many = "super::issuance::Entity")]
    Issuances,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::issuance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Issuances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
