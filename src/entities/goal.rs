//! Goal entity - A savings target. Raised amount and progress are computed at read time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Goal database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "goals")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the goal
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Goal title
    pub title: String,
    /// Amount the organisation wants to raise
    pub target_amount: f64,
    /// Optional deadline
    pub deadline: Option<Date>,
    /// Free-text description
    pub description: Option<String>,
    /// When the goal was created
    pub created_at: DateTime,
}

/// Defines relationships between Goal and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Payments counting towards this goal
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
