//! Fundraising events. Raised and spent totals are entered by hand and only feed the
//! statement and the events summary.

use crate::{
    core::input::{deserialize_optional_date, non_negative_amount, optional_text, require_text},
    entities::{Event, Expense, event, expense},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Body of an event create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    /// Event name
    pub name: Option<String>,
    /// Day of the event
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub event_date: Option<NaiveDate>,
    /// Money raised, defaults to 0
    pub raised_amount: Option<f64>,
    /// Money spent, defaults to 0
    pub spent_amount: Option<f64>,
    /// Free-text description
    pub description: Option<String>,
}

/// One row of the events summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub name: String,
    pub date: NaiveDate,
    pub raised: f64,
    pub spent: f64,
    pub net: f64,
}

impl From<event::Model> for EventSummary {
    fn from(event: event::Model) -> Self {
        let net = event.net();
        Self {
            name: event.name,
            date: event.event_date,
            raised: event.raised_amount,
            spent: event.spent_amount,
            net,
        }
    }
}

fn apply_input(active_model: &mut event::ActiveModel, input: EventInput) -> Result<()> {
    let name = require_text(input.name.as_deref(), "name")?;
    let event_date = input
        .event_date
        .ok_or(Error::MissingField { field: "eventDate" })?;
    active_model.name = Set(name);
    active_model.event_date = Set(event_date);
    active_model.raised_amount = Set(non_negative_amount(input.raised_amount)?);
    active_model.spent_amount = Set(non_negative_amount(input.spent_amount)?);
    active_model.description = Set(optional_text(input.description));
    Ok(())
}

/// All events, most recent first.
pub async fn list_events(db: &DatabaseConnection) -> Result<Vec<event::Model>> {
    Event::find()
        .order_by_desc(event::Column::EventDate)
        .order_by_desc(event::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates an event.
pub async fn create_event(db: &DatabaseConnection, input: EventInput) -> Result<event::Model> {
    let mut active_model = event::ActiveModel {
        ..Default::default()
    };
    apply_input(&mut active_model, input)?;
    let event = active_model.insert(db).await?;
    info!("Created event {} '{}'", event.id, event.name);
    Ok(event)
}

/// Replaces an event's fields.
pub async fn update_event(
    db: &DatabaseConnection,
    event_id: i64,
    input: EventInput,
) -> Result<event::Model> {
    let existing = Event::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or(Error::EventNotFound { id: event_id })?;
    let mut active_model: event::ActiveModel = existing.into();
    apply_input(&mut active_model, input)?;
    active_model.update(db).await.map_err(Into::into)
}

/// Deletes an event, detaching any expenses that referenced it.
#[instrument(skip(db))]
pub async fn delete_event(db: &DatabaseConnection, event_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    Event::find_by_id(event_id)
        .one(&txn)
        .await?
        .ok_or(Error::EventNotFound { id: event_id })?;

    let detached = Expense::update_many()
        .col_expr(expense::Column::EventId, Expr::value(Option::<i64>::None))
        .filter(expense::Column::EventId.eq(event_id))
        .exec(&txn)
        .await?;
    Event::delete_by_id(event_id).exec(&txn).await?;

    txn.commit().await?;
    info!(
        "Deleted event {event_id} ({} expenses detached)",
        detached.rows_affected
    );
    Ok(())
}

/// Name, date and totals of every event, most recent first.
pub async fn event_summary(db: &DatabaseConnection) -> Result<Vec<EventSummary>> {
    let events = list_events(db).await?;
    Ok(events.into_iter().map(EventSummary::from).collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_event_defaults_amounts() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_event(
            &db,
            EventInput {
                name: Some("Festa junina".to_string()),
                event_date: NaiveDate::from_ymd_opt(2024, 6, 20),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(event.raised_amount, 0.0);
        assert_eq!(event.spent_amount, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_event_requires_name_and_date() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_event(
            &db,
            EventInput {
                name: Some("Sem data".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::MissingField { field: "eventDate" })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_event_detaches_expenses() -> Result<()> {
        let db = setup_test_db().await?;
        let event = create_test_event(&db, "Bingo", "2024-05-01", 300.0, 120.0).await?;
        let expense = create_test_expense(&db, "Prêmios", 120.0, "2024-05-01").await?;
        let mut linked: expense::ActiveModel = expense.into();
        linked.event_id = Set(Some(event.id));
        let linked = linked.update(&db).await?;

        delete_event(&db, event.id).await?;

        let reloaded = Expense::find_by_id(linked.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.event_id, None);
        assert!(list_events(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_event_summary_net() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_event(&db, "Rifa", "2024-03-01", 200.0, 50.0).await?;
        create_test_event(&db, "Churrasco", "2024-04-01", 100.0, 180.0).await?;

        let summary = event_summary(&db).await?;
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].name, "Churrasco");
        assert_eq!(summary[0].net, -80.0);
        assert_eq!(summary[1].net, 150.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_unknown_event() -> Result<()> {
        let db = setup_test_db().await?;
        let result = update_event(&db, 5, EventInput::default()).await;
        assert!(matches!(result, Err(Error::EventNotFound { id: 5 })));
        Ok(())
    }
}
