//! Expense entity - Money spent by the organisation.
//!
//! Expenses never touch the scalar `current_balance`; they only show up in the
//! statement and in the lazy balance seed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the expense
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Short title
    pub title: String,
    /// Amount spent (positive)
    pub amount: f64,
    /// Date of the expense
    pub expense_date: Date,
    /// Optional category label
    pub category: Option<String>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Event this expense was incurred for
    pub event_id: Option<i64>,
    /// Attachment id returned by the attachment store
    pub attachment_id: Option<String>,
    /// Original attachment file name
    pub attachment_name: Option<String>,
    /// Attachment URL returned by the attachment store
    pub attachment_url: Option<String>,
}

/// Defines relationships between Expense and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// An expense may belong to one event
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id",
        on_delete = "SetNull"
    )]
    Event,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
