//! Savings goals. `raised` and `progress` are computed on every read from the payments
//! that reference the goal; nothing derived is stored.

use crate::{
    core::input::{deserialize_optional_date, optional_text, require_text},
    entities::{Goal, Payment, goal, payment},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Body of a goal create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalInput {
    /// Goal title
    pub title: Option<String>,
    /// Amount to raise
    pub target_amount: Option<f64>,
    /// Optional deadline
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub deadline: Option<NaiveDate>,
    /// Free-text description
    pub description: Option<String>,
}

/// A goal with its computed totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    #[serde(flatten)]
    pub goal: goal::Model,
    pub raised: f64,
    pub progress: f64,
}

/// Percentage of `target` covered by `raised`, capped at 100. Zero target means 0%.
#[must_use]
pub fn progress_percent(raised: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    (raised / target * 100.0).min(100.0)
}

fn validate(input: &GoalInput) -> Result<(String, f64)> {
    let title = require_text(input.title.as_deref(), "title")?;
    let target = input
        .target_amount
        .ok_or(Error::MissingField { field: "targetAmount" })?;
    if !target.is_finite() || target < 0.0 {
        return Err(Error::InvalidAmount { amount: target });
    }
    Ok((title, target))
}

/// All goals with `raised` and `progress`, ordered by deadline.
pub async fn list_goals(db: &DatabaseConnection) -> Result<Vec<GoalProgress>> {
    let goals = Goal::find()
        .order_by_asc(goal::Column::Deadline)
        .order_by_asc(goal::Column::Id)
        .all(db)
        .await?;

    let totals: HashMap<i64, f64> = Payment::find()
        .select_only()
        .column(payment::Column::GoalId)
        .column_as(payment::Column::Amount.sum(), "total")
        .filter(payment::Column::GoalId.is_not_null())
        .group_by(payment::Column::GoalId)
        .into_tuple::<(i64, Option<f64>)>()
        .all(db)
        .await?
        .into_iter()
        .map(|(goal_id, total)| (goal_id, total.unwrap_or(0.0)))
        .collect();

    Ok(goals
        .into_iter()
        .map(|goal| {
            let raised = totals.get(&goal.id).copied().unwrap_or(0.0);
            let progress = progress_percent(raised, goal.target_amount);
            GoalProgress {
                goal,
                raised,
                progress,
            }
        })
        .collect())
}

/// Creates a goal.
pub async fn create_goal(db: &DatabaseConnection, input: GoalInput) -> Result<goal::Model> {
    let (title, target_amount) = validate(&input)?;
    let goal = goal::ActiveModel {
        title: Set(title),
        target_amount: Set(target_amount),
        deadline: Set(input.deadline),
        description: Set(optional_text(input.description)),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Created goal {} '{}'", goal.id, goal.title);
    Ok(goal)
}

/// Replaces a goal's fields.
pub async fn update_goal(
    db: &DatabaseConnection,
    goal_id: i64,
    input: GoalInput,
) -> Result<goal::Model> {
    let (title, target_amount) = validate(&input)?;
    let existing = Goal::find_by_id(goal_id)
        .one(db)
        .await?
        .ok_or(Error::GoalNotFound { id: goal_id })?;

    let mut active_model: goal::ActiveModel = existing.into();
    active_model.title = Set(title);
    active_model.target_amount = Set(target_amount);
    active_model.deadline = Set(input.deadline);
    active_model.description = Set(optional_text(input.description));
    active_model.update(db).await.map_err(Into::into)
}

/// Deletes a goal; payments that referenced it stay, without a goal.
pub async fn delete_goal(db: &DatabaseConnection, goal_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    Goal::find_by_id(goal_id)
        .one(&txn)
        .await?
        .ok_or(Error::GoalNotFound { id: goal_id })?;
    Payment::update_many()
        .col_expr(payment::Column::GoalId, Expr::value(Option::<i64>::None))
        .filter(payment::Column::GoalId.eq(goal_id))
        .exec(&txn)
        .await?;
    Goal::delete_by_id(goal_id).exec(&txn).await?;

    txn.commit().await?;
    info!("Deleted goal {goal_id}");
    Ok(())
}
