//! Expense records.
//!
//! Plain CRUD. Expenses never adjust `current_balance`; they appear in the statement
//! and in the one-time balance seed only.

use crate::{
    core::input::{
        Attachment, deserialize_optional_date, optional_text, require_positive_amount,
        require_text,
    },
    entities::{Event, Expense, expense},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::info;

/// Body of an expense create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseInput {
    /// What the money was spent on
    pub title: Option<String>,
    /// Amount spent, must be positive
    pub amount: Option<f64>,
    /// Day of the expense
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub expense_date: Option<NaiveDate>,
    /// Free-text category
    pub category: Option<String>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Event the expense belongs to
    pub event_id: Option<i64>,
    /// Attachment identifiers
    #[serde(flatten)]
    pub attachment: Attachment,
}

struct ValidExpense {
    title: String,
    amount: f64,
    expense_date: NaiveDate,
}

fn validate(input: &ExpenseInput) -> Result<ValidExpense> {
    Ok(ValidExpense {
        title: require_text(input.title.as_deref(), "title")?,
        amount: require_positive_amount(input.amount, "amount")?,
        expense_date: input
            .expense_date
            .ok_or(Error::MissingField { field: "expenseDate" })?,
    })
}

async fn ensure_event_exists<C>(db: &C, event_id: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(event_id) = event_id {
        Event::find_by_id(event_id)
            .one(db)
            .await?
            .ok_or(Error::EventNotFound { id: event_id })?;
    }
    Ok(())
}

/// All expenses, most recent first.
pub async fn list_expenses(db: &DatabaseConnection) -> Result<Vec<expense::Model>> {
    Expense::find()
        .order_by_desc(expense::Column::ExpenseDate)
        .order_by_desc(expense::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records a new expense.
pub async fn create_expense(
    db: &DatabaseConnection,
    input: ExpenseInput,
) -> Result<expense::Model> {
    let valid = validate(&input)?;
    ensure_event_exists(db, input.event_id).await?;
    let attachment = input.attachment.normalized();

    let expense = expense::ActiveModel {
        title: Set(valid.title),
        amount: Set(valid.amount),
        expense_date: Set(valid.expense_date),
        category: Set(optional_text(input.category)),
        notes: Set(optional_text(input.notes)),
        event_id: Set(input.event_id),
        attachment_id: Set(attachment.attachment_id),
        attachment_name: Set(attachment.attachment_name),
        attachment_url: Set(attachment.attachment_url),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Recorded expense {} ({:.2})", expense.id, expense.amount);
    Ok(expense)
}

/// Replaces an expense's fields; attachment fields left empty keep their stored value.
pub async fn update_expense(
    db: &DatabaseConnection,
    expense_id: i64,
    input: ExpenseInput,
) -> Result<expense::Model> {
    let valid = validate(&input)?;
    let existing = Expense::find_by_id(expense_id)
        .one(db)
        .await?
        .ok_or(Error::ExpenseNotFound { id: expense_id })?;
    ensure_event_exists(db, input.event_id).await?;
    let attachment = input.attachment.normalized();

    let mut active_model: expense::ActiveModel = existing.into();
    active_model.title = Set(valid.title);
    active_model.amount = Set(valid.amount);
    active_model.expense_date = Set(valid.expense_date);
    active_model.category = Set(optional_text(input.category));
    active_model.notes = Set(optional_text(input.notes));
    active_model.event_id = Set(input.event_id);
    if attachment.attachment_id.is_some() {
        active_model.attachment_id = Set(attachment.attachment_id);
    }
    if attachment.attachment_name.is_some() {
        active_model.attachment_name = Set(attachment.attachment_name);
    }
    if attachment.attachment_url.is_some() {
        active_model.attachment_url = Set(attachment.attachment_url);
    }

    active_model.update(db).await.map_err(Into::into)
}

/// Deletes an expense.
pub async fn delete_expense(db: &DatabaseConnection, expense_id: i64) -> Result<()> {
    let result = Expense::delete_by_id(expense_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::ExpenseNotFound { id: expense_id });
    }
    info!("Deleted expense {expense_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::settings::{get_current_balance, set_current_balance};
    use crate::test_utils::*;

    fn groceries() -> ExpenseInput {
        ExpenseInput {
            title: Some("Mercado".to_string()),
            amount: Some(45.5),
            expense_date: NaiveDate::from_ymd_opt(2024, 2, 10),
            category: Some("Alimentação".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_expense_requires_fields() -> Result<()> {
        let db = setup_test_db().await?;

        let mut no_title = groceries();
        no_title.title = None;
        assert!(matches!(
            create_expense(&db, no_title).await,
            Err(Error::MissingField { field: "title" })
        ));

        let mut no_date = groceries();
        no_date.expense_date = None;
        assert!(matches!(
            create_expense(&db, no_date).await,
            Err(Error::MissingField { field: "expenseDate" })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_expense_crud_never_touches_balance() -> Result<()> {
        let db = setup_test_db().await?;
        set_current_balance(&db, 100.0).await?;

        let expense = create_expense(&db, groceries()).await?;
        assert_eq!(get_current_balance(&db).await?, 100.0);

        let mut changed = groceries();
        changed.amount = Some(80.0);
        let updated = update_expense(&db, expense.id, changed).await?;
        assert_eq!(updated.amount, 80.0);
        assert_eq!(get_current_balance(&db).await?, 100.0);

        delete_expense(&db, expense.id).await?;
        assert_eq!(get_current_balance(&db).await?, 100.0);
        assert!(list_expenses(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_expense_with_unknown_event() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = groceries();
        input.event_id = Some(12);
        assert!(matches!(
            create_expense(&db, input).await,
            Err(Error::EventNotFound { id: 12 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_keeps_attachment_when_blank() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = groceries();
        input.attachment.attachment_url = Some("https://files/nota".to_string());
        let expense = create_expense(&db, input).await?;

        let updated = update_expense(&db, expense.id, groceries()).await?;
        assert_eq!(updated.attachment_url.as_deref(), Some("https://files/nota"));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unknown_expense() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(matches!(
            delete_expense(&db, 3).await,
            Err(Error::ExpenseNotFound { id: 3 })
        ));
        Ok(())
    }
}
