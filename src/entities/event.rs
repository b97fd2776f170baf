//! Event entity - A fundraising event with manually entered raised/spent totals.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Event database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the event
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event name
    pub name: String,
    /// Date the event took place
    pub event_date: Date,
    /// Money raised, entered by hand
    pub raised_amount: f64,
    /// Money spent, entered by hand
    pub spent_amount: f64,
    /// Free-text description
    pub description: Option<String>,
}

impl Model {
    /// Net result of the event (`raised - spent`).
    #[must_use]
    pub fn net(&self) -> f64 {
        self.raised_amount - self.spent_amount
    }
}

/// Defines relationships between Event and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One event has many expenses
    #[sea_orm(has_many = "super::expense::Entity")]
    Expenses,
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
