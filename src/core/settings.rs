//! Settings and scalar balance store.
//!
//! Settings are string key-value pairs in the `settings` table. One of them,
//! `current_balance`, is the organisation's running cash figure: it is seeded lazily
//! from the ledger tables the first time anyone reads it, and from then on only moves
//! through [`adjust_current_balance`] (payment mutations) or [`set_current_balance`]
//! (manual correction). It is deliberately not reconciled against the statement view.

use crate::{
    config::database::text_number_increment,
    entities::{Expense, Payment, Setting, expense, payment, setting},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr};
use tracing::{debug, info, instrument};

/// Key under which the scalar balance is stored.
pub const CURRENT_BALANCE_KEY: &str = "current_balance";

/// Organisation preferences and their defaults.
pub const DEFAULT_SETTINGS: [(&str, &str); 9] = [
    ("org_name", "Tesoureiro Assistente"),
    (
        "org_tagline",
        "Controle completo de membros, pagamentos, metas e eventos do clã.",
    ),
    ("default_payment_amount", "100"),
    (
        "document_footer",
        "Guarde este recibo para referência. Em caso de dúvidas, procure o tesoureiro responsável.",
    ),
    ("payment_due_day", ""),
    ("pix_key", ""),
    ("pix_receiver", ""),
    ("dashboard_note", ""),
    (
        "disclaimer_text",
        "Sistema para uso interno. Os dados são confidenciais e de responsabilidade da organização.",
    ),
];

/// How payment mutations translate into scalar balance deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    /// Every payment counts with its raw amount, whatever its `paid` flag says.
    #[default]
    RawAmount,
    /// Only payments flagged `paid` count; toggling the flag moves the balance.
    PaidOnly,
}

impl BalancePolicy {
    /// Amount a payment contributes to the scalar balance under this policy.
    #[must_use]
    pub const fn contribution(self, amount: f64, paid: bool) -> f64 {
        match self {
            Self::RawAmount => amount,
            Self::PaidOnly => {
                if paid {
                    amount
                } else {
                    0.0
                }
            }
        }
    }
}

impl FromStr for BalancePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "raw_amount" => Ok(Self::RawAmount),
            "paid_only" => Ok(Self::PaidOnly),
            other => Err(Error::Config {
                message: format!(
                    "Unknown balance policy '{other}' (expected raw_amount or paid_only)"
                ),
            }),
        }
    }
}

/// Typed view over the organisation preferences.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgSettings {
    /// Display name
    pub org_name: String,
    /// Tagline shown under the name
    pub org_tagline: String,
    /// Suggested monthly dues amount
    pub default_payment_amount: f64,
    /// Reminder day of month (1-31)
    pub payment_due_day: Option<u32>,
    /// PIX key for payments
    pub pix_key: String,
    /// PIX receiver name
    pub pix_receiver: String,
    /// Free-text dashboard note
    pub dashboard_note: String,
    /// Disclaimer shown in the UI
    pub disclaimer_text: String,
    /// Footer printed on exported documents
    pub document_footer: String,
}

impl OrgSettings {
    /// Builds the typed view from a raw settings map (as returned by [`get_settings`]).
    #[must_use]
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let text = |key: &str| {
            map.get(key)
                .cloned()
                .or_else(|| default_setting(key).map(ToString::to_string))
                .unwrap_or_default()
        };
        let default_amount = default_setting("default_payment_amount")
            .and_then(|value| value.parse().ok())
            .unwrap_or(100.0);
        let org_name = text("org_name");

        Self {
            org_name: if org_name.trim().is_empty() {
                default_setting("org_name").unwrap_or_default().to_string()
            } else {
                org_name
            },
            org_tagline: text("org_tagline"),
            default_payment_amount: map
                .get("default_payment_amount")
                .and_then(|value| value.trim().parse::<f64>().ok())
                .filter(|value| value.is_finite())
                .unwrap_or(default_amount),
            payment_due_day: normalize_due_day(map.get("payment_due_day").map(String::as_str)),
            pix_key: text("pix_key"),
            pix_receiver: text("pix_receiver"),
            dashboard_note: text("dashboard_note"),
            disclaimer_text: text("disclaimer_text"),
            document_footer: text("document_footer"),
        }
    }
}

/// Default value for a known setting key.
#[must_use]
pub fn default_setting(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| *value)
}

/// Whether `key` is one of the organisation preferences in [`DEFAULT_SETTINGS`].
#[must_use]
pub fn is_known_setting(key: &str) -> bool {
    default_setting(key).is_some()
}

/// Accepts an integer day of month 1-31; anything else means "no reminder".
#[must_use]
pub fn normalize_due_day(value: Option<&str>) -> Option<u32> {
    value
        .and_then(|text| text.trim().parse::<u32>().ok())
        .filter(|day| (1..=31).contains(day))
}

/// Permissive numeric coercion for stored values: anything unparsable is 0.
#[must_use]
pub fn parse_number(value: Option<&str>) -> f64 {
    value
        .and_then(|text| text.trim().parse::<f64>().ok())
        .filter(|number| number.is_finite())
        .unwrap_or(0.0)
}

/// Reads a single setting; `None` when the key has never been written.
pub async fn get_setting<C>(db: &C, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let row = Setting::find_by_id(key.to_string()).one(db).await?;
    Ok(row.and_then(|setting| setting.value))
}

/// Inserts or updates a single setting.
///
/// Written as find-then-update-or-insert so the same code runs on every backend.
pub async fn set_setting<C>(db: &C, key: &str, value: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();
    let existing = Setting::find_by_id(key.to_string()).one(db).await?;

    if let Some(row) = existing {
        let mut active_model: setting::ActiveModel = row.into();
        active_model.value = Set(Some(value.to_string()));
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        let new_setting = setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(Some(value.to_string())),
            updated_at: Set(now),
        };
        new_setting.insert(db).await?;
    }

    debug!("Set setting {key}");
    Ok(())
}

/// All organisation preferences, stored values overriding defaults.
pub async fn get_settings<C>(db: &C) -> Result<BTreeMap<String, String>>
where
    C: ConnectionTrait,
{
    let keys: Vec<String> = DEFAULT_SETTINGS
        .iter()
        .map(|(key, _)| (*key).to_string())
        .collect();
    let rows = Setting::find()
        .filter(setting::Column::Key.is_in(keys))
        .all(db)
        .await?;

    let mut settings: BTreeMap<String, String> = DEFAULT_SETTINGS
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    for row in rows {
        if let Some(value) = row.value {
            settings.insert(row.key, value);
        }
    }
    Ok(settings)
}

/// Typed organisation preferences.
pub async fn public_settings<C>(db: &C) -> Result<OrgSettings>
where
    C: ConnectionTrait,
{
    let map = get_settings(db).await?;
    Ok(OrgSettings::from_map(&map))
}

/// Writes known preference keys and, optionally, overwrites the scalar balance,
/// all inside one transaction. Unknown keys are skipped.
#[instrument(skip(db, values))]
pub async fn update_settings(
    db: &DatabaseConnection,
    values: &BTreeMap<String, String>,
    current_balance: Option<f64>,
) -> Result<()> {
    let txn = db.begin().await?;

    for (key, value) in values {
        if is_known_setting(key) {
            set_setting(&txn, key, value).await?;
        } else {
            debug!("Ignoring unknown setting key {key}");
        }
    }
    if let Some(balance) = current_balance {
        set_current_balance(&txn, balance).await?;
    }

    txn.commit().await?;
    info!("Settings updated ({} keys)", values.len());
    Ok(())
}

/// Sum of payment amounts (paid ones only when `paid_only`) and sum of all expenses.
pub async fn ledger_totals<C>(db: &C, paid_only: bool) -> Result<(f64, f64)>
where
    C: ConnectionTrait,
{
    let mut payments = Payment::find()
        .select_only()
        .column_as(payment::Column::Amount.sum(), "total");
    if paid_only {
        payments = payments.filter(payment::Column::Paid.eq(true));
    }
    let payments_total = payments
        .into_tuple::<Option<f64>>()
        .one(db)
        .await?
        .flatten()
        .unwrap_or(0.0);

    let expenses_total = Expense::find()
        .select_only()
        .column_as(expense::Column::Amount.sum(), "total")
        .into_tuple::<Option<f64>>()
        .one(db)
        .await?
        .flatten()
        .unwrap_or(0.0);

    Ok((payments_total, expenses_total))
}

/// Returns the stored balance, seeding it from `SUM(paid payments) - SUM(expenses)`
/// exactly once when no row exists yet.
async fn ensure_balance_row<C>(db: &C) -> Result<f64>
where
    C: ConnectionTrait,
{
    if let Some(row) = Setting::find_by_id(CURRENT_BALANCE_KEY.to_string())
        .one(db)
        .await?
    {
        return Ok(parse_number(row.value.as_deref()));
    }

    let (paid_total, expenses_total) = ledger_totals(db, true).await?;
    let seed = paid_total - expenses_total;
    set_setting(db, CURRENT_BALANCE_KEY, &seed.to_string()).await?;
    info!("Seeded {CURRENT_BALANCE_KEY} = {seed:.2} from payments and expenses");
    Ok(seed)
}

/// Current scalar balance, lazily initialised on first read.
pub async fn get_current_balance<C>(db: &C) -> Result<f64>
where
    C: ConnectionTrait,
{
    ensure_balance_row(db).await
}

/// Overwrites the scalar balance (manual correction).
pub async fn set_current_balance<C>(db: &C, value: f64) -> Result<f64>
where
    C: ConnectionTrait,
{
    if !value.is_finite() {
        return Err(Error::InvalidAmount { amount: value });
    }
    set_setting(db, CURRENT_BALANCE_KEY, &value.to_string()).await?;
    info!("Manually set {CURRENT_BALANCE_KEY} = {value:.2}");
    Ok(value)
}

/// Adds `delta` to the scalar balance with a single `value = value + delta` statement
/// and returns the new balance.
///
/// The row is initialised first if needed. A zero (or non-finite) delta only performs
/// the initialisation.
pub async fn adjust_current_balance<C>(db: &C, delta: f64) -> Result<f64>
where
    C: ConnectionTrait,
{
    let current = ensure_balance_row(db).await?;
    if delta == 0.0 || !delta.is_finite() {
        return Ok(current);
    }

    let backend = db.get_database_backend();
    Setting::update_many()
        .col_expr(
            setting::Column::Value,
            text_number_increment(backend, "value", delta),
        )
        .col_expr(
            setting::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(setting::Column::Key.eq(CURRENT_BALANCE_KEY))
        .exec(db)
        .await?;

    let updated = parse_number(get_setting(db, CURRENT_BALANCE_KEY).await?.as_deref());
    debug!("Adjusted {CURRENT_BALANCE_KEY} by {delta:+.2} -> {updated:.2}");
    Ok(updated)
}

/// Re-derives the scalar balance from the ledger tables under `policy` and stores it.
///
/// `RawAmount` counts every payment (matching how its deltas accumulate); `PaidOnly`
/// counts paid payments only.
#[instrument(skip(db))]
pub async fn recompute_current_balance(
    db: &DatabaseConnection,
    policy: BalancePolicy,
) -> Result<f64> {
    let txn = db.begin().await?;
    let (payments_total, expenses_total) =
        ledger_totals(&txn, policy == BalancePolicy::PaidOnly).await?;
    let balance = set_current_balance(&txn, payments_total - expenses_total).await?;
    txn.commit().await?;
    Ok(balance)
}
