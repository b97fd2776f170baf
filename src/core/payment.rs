//! Payment ledger operations - monthly dues per member and competency period.
//!
//! Every mutation runs inside one database transaction together with the matching
//! `current_balance` adjustment, so a failure leaves both the payments table and the
//! scalar balance untouched. The delta applied is
//! `policy.contribution(new) - policy.contribution(old)`; under the default
//! [`BalancePolicy::RawAmount`] that is simply the change in `amount`.

use crate::{
    core::{
        input::{
            Attachment, deserialize_nullable, deserialize_nullable_date,
            deserialize_optional_date, optional_text, require_positive_amount,
        },
        settings::{BalancePolicy, adjust_current_balance, get_current_balance},
    },
    entities::{Goal, Member, Payment, payment},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Body of a create-or-replace request. Required fields are checked by
/// [`create_or_replace_payment`] so that a missing one is a validation error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    /// Member the payment belongs to
    pub member_id: Option<i64>,
    /// Competency month
    pub month: Option<i32>,
    /// Competency year
    pub year: Option<i32>,
    /// Amount, must be positive
    pub amount: Option<f64>,
    /// Received flag, defaults to false
    #[serde(default)]
    pub paid: Option<bool>,
    /// Date the money was received
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub paid_at: Option<NaiveDate>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Goal the payment counts towards
    pub goal_id: Option<i64>,
    /// Attachment identifiers, blank ones keep the stored value
    #[serde(flatten)]
    pub attachment: Attachment,
}

/// Body of an update request. Absent fields keep their stored value; an explicit
/// `null` clears the nullable ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    /// New amount, must be positive when given
    pub amount: Option<f64>,
    /// New received flag
    pub paid: Option<bool>,
    /// New received date, `Some(None)` clears it
    #[serde(default, deserialize_with = "deserialize_nullable_date")]
    pub paid_at: Option<Option<NaiveDate>>,
    /// New notes, `Some(None)` clears them
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub notes: Option<Option<String>>,
    /// New goal, `Some(None)` detaches the payment
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub goal_id: Option<Option<i64>>,
    /// Attachment identifiers, blank ones keep the stored value
    #[serde(flatten)]
    pub attachment: Attachment,
}

/// Filters for [`list_payments`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    /// Competency month
    pub month: Option<i32>,
    /// Competency year
    pub year: Option<i32>,
    /// Restrict to one member
    pub member_id: Option<i64>,
}

/// A payment joined with its member's name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    /// The stored payment
    #[serde(flatten)]
    pub payment: payment::Model,
    /// Member display name
    pub member_name: String,
}

impl PaymentView {
    fn from_pair(
        (payment, member): (payment::Model, Option<crate::entities::MemberModel>),
    ) -> Self {
        Self {
            payment,
            member_name: member.map(|member| member.name).unwrap_or_default(),
        }
    }
}

fn validate_month(month: i32) -> Result<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(Error::InvalidMonth { month })
    }
}

async fn ensure_member_exists<C>(db: &C, member_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    Member::find_by_id(member_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or(Error::MemberNotFound { id: member_id })
}

async fn ensure_goal_exists<C>(db: &C, goal_id: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let Some(goal_id) = goal_id else {
        return Ok(());
    };
    Goal::find_by_id(goal_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or(Error::GoalNotFound { id: goal_id })
}

/// Writes only the attachment fields that carry a value.
fn apply_attachment(active_model: &mut payment::ActiveModel, attachment: Attachment) {
    let attachment = attachment.normalized();
    if let Some(id) = attachment.attachment_id {
        active_model.attachment_id = Set(Some(id));
    }
    if let Some(name) = attachment.attachment_name {
        active_model.attachment_name = Set(Some(name));
    }
    if let Some(url) = attachment.attachment_url {
        active_model.attachment_url = Set(Some(url));
    }
}

/// Creates the payment for a (member, month, year) period, or replaces the existing one.
///
/// Replacing overwrites amount, paid flag, paid date, notes and goal; stored attachment
/// fields survive when the new request leaves them empty. The scalar balance moves by the
/// contribution delta under `policy` in the same transaction.
#[instrument(skip(db, input))]
pub async fn create_or_replace_payment(
    db: &DatabaseConnection,
    policy: BalancePolicy,
    input: PaymentInput,
) -> Result<payment::Model> {
    let member_id = input.member_id.ok_or(Error::MissingField { field: "memberId" })?;
    let month = input.month.ok_or(Error::MissingField { field: "month" })?;
    let year = input.year.ok_or(Error::MissingField { field: "year" })?;
    let amount = require_positive_amount(input.amount, "amount")?;
    validate_month(month)?;

    let txn = db.begin().await?;

    // Seed before writing so the new row is not counted twice
    get_current_balance(&txn).await?;
    ensure_member_exists(&txn, member_id).await?;
    ensure_goal_exists(&txn, input.goal_id).await?;

    let existing = Payment::find()
        .filter(payment::Column::MemberId.eq(member_id))
        .filter(payment::Column::Month.eq(month))
        .filter(payment::Column::Year.eq(year))
        .one(&txn)
        .await?;
    let previous = existing
        .as_ref()
        .map_or(0.0, |row| policy.contribution(row.amount, row.paid));

    let is_new = existing.is_none();
    let mut active_model = match existing {
        Some(row) => row.into(),
        None => payment::ActiveModel {
            member_id: Set(member_id),
            month: Set(month),
            year: Set(year),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        },
    };
    active_model.amount = Set(amount);
    active_model.paid = Set(input.paid.unwrap_or(false));
    active_model.paid_at = Set(input.paid_at);
    active_model.notes = Set(optional_text(input.notes));
    active_model.goal_id = Set(input.goal_id);
    apply_attachment(&mut active_model, input.attachment);

    let saved = if is_new {
        active_model.insert(&txn).await?
    } else {
        active_model.update(&txn).await?
    };

    let delta = policy.contribution(saved.amount, saved.paid) - previous;
    let balance = adjust_current_balance(&txn, delta).await?;

    txn.commit().await?;

    info!(
        "Saved payment {} for member {member_id} ({month:02}/{year}), balance {delta:+.2} -> {balance:.2}",
        saved.id
    );
    Ok(saved)
}

/// Updates a payment by id, applying only the provided fields.
#[instrument(skip(db, update))]
pub async fn update_payment(
    db: &DatabaseConnection,
    policy: BalancePolicy,
    payment_id: i64,
    update: PaymentUpdate,
) -> Result<payment::Model> {
    let amount = match update.amount {
        Some(amount) => Some(require_positive_amount(Some(amount), "amount")?),
        None => None,
    };

    let txn = db.begin().await?;

    get_current_balance(&txn).await?;
    let existing = Payment::find_by_id(payment_id)
        .one(&txn)
        .await?
        .ok_or(Error::PaymentNotFound { id: payment_id })?;
    ensure_goal_exists(&txn, update.goal_id.flatten()).await?;

    let previous = policy.contribution(existing.amount, existing.paid);

    let mut active_model: payment::ActiveModel = existing.into();
    if let Some(amount) = amount {
        active_model.amount = Set(amount);
    }
    if let Some(paid) = update.paid {
        active_model.paid = Set(paid);
    }
    if let Some(paid_at) = update.paid_at {
        active_model.paid_at = Set(paid_at);
    }
    if let Some(notes) = update.notes {
        active_model.notes = Set(optional_text(notes));
    }
    if let Some(goal_id) = update.goal_id {
        active_model.goal_id = Set(goal_id);
    }
    apply_attachment(&mut active_model, update.attachment);

    let saved = active_model.update(&txn).await?;

    let delta = policy.contribution(saved.amount, saved.paid) - previous;
    let balance = adjust_current_balance(&txn, delta).await?;

    txn.commit().await?;

    info!("Updated payment {payment_id}, balance {delta:+.2} -> {balance:.2}");
    Ok(saved)
}

/// Deletes a payment and removes its contribution from the scalar balance.
///
/// Returns the deleted row.
#[instrument(skip(db))]
pub async fn delete_payment(
    db: &DatabaseConnection,
    policy: BalancePolicy,
    payment_id: i64,
) -> Result<payment::Model> {
    let txn = db.begin().await?;

    get_current_balance(&txn).await?;
    let existing = Payment::find_by_id(payment_id)
        .one(&txn)
        .await?
        .ok_or(Error::PaymentNotFound { id: payment_id })?;

    Payment::delete_by_id(payment_id).exec(&txn).await?;

    let delta = -policy.contribution(existing.amount, existing.paid);
    let balance = adjust_current_balance(&txn, delta).await?;

    txn.commit().await?;

    info!("Deleted payment {payment_id}, balance {delta:+.2} -> {balance:.2}");
    Ok(existing)
}

/// Retrieves a single payment with its member name.
pub async fn get_payment(db: &DatabaseConnection, payment_id: i64) -> Result<PaymentView> {
    Payment::find_by_id(payment_id)
        .find_also_related(Member)
        .one(db)
        .await?
        .map(PaymentView::from_pair)
        .ok_or(Error::PaymentNotFound { id: payment_id })
}

/// Lists payments, newest competency period first.
pub async fn list_payments(
    db: &DatabaseConnection,
    filter: PaymentFilter,
) -> Result<Vec<PaymentView>> {
    let mut query = Payment::find().find_also_related(Member);
    if let Some(month) = filter.month {
        query = query.filter(payment::Column::Month.eq(month));
    }
    if let Some(year) = filter.year {
        query = query.filter(payment::Column::Year.eq(year));
    }
    if let Some(member_id) = filter.member_id {
        query = query.filter(payment::Column::MemberId.eq(member_id));
    }

    let rows = query
        .order_by_desc(payment::Column::Year)
        .order_by_desc(payment::Column::Month)
        .order_by_asc(payment::Column::Id)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(PaymentView::from_pair).collect())
}

/// All payments of one member, newest competency period first.
pub async fn payment_history(
    db: &DatabaseConnection,
    member_id: i64,
) -> Result<Vec<payment::Model>> {
    Payment::find()
        .filter(payment::Column::MemberId.eq(member_id))
        .order_by_desc(payment::Column::Year)
        .order_by_desc(payment::Column::Month)
        .all(db)
        .await
        .map_err(Into::into)
}
