//! Shared test utilities for the treasurer service.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test records with sensible defaults.

use crate::{
    core::{
        event::{EventInput, create_event},
        expense::{ExpenseInput, create_expense},
        goal::{GoalInput, create_goal},
        input::parse_date,
        member::{MemberInput, create_member},
    },
    entities,
    errors::Result,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test member with sensible defaults.
///
/// # Defaults
/// * `email`: `<name>@clan.test` (lowercased)
/// * `registration_number`: the name
/// * `role`: viewer, pending password setup
pub async fn create_test_member(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::member::Model> {
    let created = create_member(
        db,
        MemberInput {
            name: Some(name.to_string()),
            email: Some(format!("{}@clan.test", name.to_lowercase())),
            registration_number: Some(name.to_string()),
            ..Default::default()
        },
    )
    .await?;
    Ok(created.member)
}

/// Inserts a payment row directly, bypassing the ledger operations.
/// Use this when a test needs rows that did not move `current_balance`.
pub async fn insert_raw_payment(
    db: &DatabaseConnection,
    member_id: i64,
    month: i32,
    year: i32,
    amount: f64,
    paid: bool,
) -> Result<entities::payment::Model> {
    entities::payment::ActiveModel {
        member_id: Set(member_id),
        month: Set(month),
        year: Set(year),
        amount: Set(amount),
        paid: Set(paid),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Sets `paid_at` (`YYYY-MM-DD`) on an existing payment.
pub async fn set_paid_at(
    db: &DatabaseConnection,
    payment: entities::payment::Model,
    paid_at: &str,
) -> Result<entities::payment::Model> {
    let mut active_model: entities::payment::ActiveModel = payment.into();
    active_model.paid_at = Set(Some(parse_date(paid_at)?));
    active_model.update(db).await.map_err(Into::into)
}

/// Creates a test expense without category.
pub async fn create_test_expense(
    db: &DatabaseConnection,
    title: &str,
    amount: f64,
    expense_date: &str,
) -> Result<entities::expense::Model> {
    create_expense(
        db,
        ExpenseInput {
            title: Some(title.to_string()),
            amount: Some(amount),
            expense_date: Some(parse_date(expense_date)?),
            ..Default::default()
        },
    )
    .await
}

/// Creates a test event with the given totals.
pub async fn create_test_event(
    db: &DatabaseConnection,
    name: &str,
    event_date: &str,
    raised: f64,
    spent: f64,
) -> Result<entities::event::Model> {
    create_event(
        db,
        EventInput {
            name: Some(name.to_string()),
            event_date: Some(parse_date(event_date)?),
            raised_amount: Some(raised),
            spent_amount: Some(spent),
            description: None,
        },
    )
    .await
}

/// Creates a test goal without deadline.
pub async fn create_test_goal(
    db: &DatabaseConnection,
    title: &str,
    target_amount: f64,
) -> Result<entities::goal::Model> {
    create_goal(
        db,
        GoalInput {
            title: Some(title.to_string()),
            target_amount: Some(target_amount),
            ..Default::default()
        },
    )
    .await
}
