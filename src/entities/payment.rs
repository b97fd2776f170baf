//! Payment entity - One monthly dues payment for a member.
//!
//! At most one row exists per (`member_id`, `month`, `year`) competency period; the
//! unique index is created alongside the table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Member this payment belongs to
    pub member_id: i64,
    /// Competency month (1-12)
    pub month: i32,
    /// Competency year
    pub year: i32,
    /// Amount paid
    pub amount: f64,
    /// Whether the amount has actually been received
    pub paid: bool,
    /// Date the money was received
    pub paid_at: Option<Date>,
    /// When the row was first written
    pub created_at: DateTime,
    /// Free-text notes
    pub notes: Option<String>,
    /// Savings goal this payment counts towards
    pub goal_id: Option<i64>,
    /// Attachment id returned by the attachment store
    pub attachment_id: Option<String>,
    /// Original attachment file name
    pub attachment_name: Option<String>,
    /// Attachment URL returned by the attachment store
    pub attachment_url: Option<String>,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one member
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::MemberId",
        to = "super::member::Column::Id",
        on_delete = "Cascade"
    )]
    Member,
    /// A payment may count towards one goal
    #[sea_orm(
        belongs_to = "super::goal::Entity",
        from = "Column::GoalId",
        to = "super::goal::Column::Id",
        on_delete = "SetNull"
    )]
    Goal,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::goal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Goal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
