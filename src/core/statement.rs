//! Statement ("extrato") builder.
//!
//! Merges paid payments (positive), expenses (negative) and events (raised minus spent)
//! into one date-ordered sequence and computes a running balance from zero. This is a
//! pure read: it never looks at the scalar `current_balance`, so the two figures may
//! legitimately differ.

use crate::{
    core::input::parse_optional_date,
    entities::{Event, Expense, Member, Payment, event, expense, payment},
    errors::{Error, Result},
};
use chrono::{NaiveDate, NaiveTime};
use sea_orm::{Condition, QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Source table of a statement entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Paid dues payment
    Pagamento,
    /// Expense
    Despesa,
    /// Event net result
    Evento,
}

impl EntryType {
    /// Wire name used in filters and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pagamento => "pagamento",
            Self::Despesa => "despesa",
            Self::Evento => "evento",
        }
    }

    /// Human-facing label used in exports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pagamento => "Entrada",
            Self::Despesa => "Saída",
            Self::Evento => "Evento",
        }
    }
}

impl FromStr for EntryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "pagamento" => Ok(Self::Pagamento),
            "despesa" => Ok(Self::Despesa),
            "evento" => Ok(Self::Evento),
            other => Err(Error::validation(format!(
                "Invalid entry type '{other}' (expected pagamento, despesa or evento)"
            ))),
        }
    }
}

/// Statement filters. Every field is optional; the member filter only narrows payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementFilter {
    /// Inclusive lower bound on the entry date
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on the entry date
    pub end_date: Option<NaiveDate>,
    /// Keep only one source table
    pub entry_type: Option<EntryType>,
    /// Keep only this member's payments
    pub member_id: Option<i64>,
}

impl StatementFilter {
    /// Builds a filter from raw query-string values; blank values count as absent.
    pub fn from_params(
        start_date: Option<&str>,
        end_date: Option<&str>,
        entry_type: Option<&str>,
        member_id: Option<&str>,
    ) -> Result<Self> {
        let entry_type = match entry_type.map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(text.parse()?),
        };
        let member_id = match member_id.map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(text.parse::<i64>().map_err(|_| {
                Error::validation(format!("Invalid member id '{text}'"))
            })?),
        };
        Ok(Self {
            start_date: parse_optional_date(start_date)?,
            end_date: parse_optional_date(end_date)?,
            entry_type,
            member_id,
        })
    }

    fn includes(&self, entry_type: EntryType) -> bool {
        self.entry_type.is_none_or(|wanted| wanted == entry_type)
    }
}

/// One line of the statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementEntry {
    /// Day the money moved
    pub date: NaiveDate,
    /// Source table, serialised as `type`
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Human-readable description, e.g. `Pagamento - Ana (01/2024)`
    pub description: String,
    /// Signed amount: income positive, spending negative
    pub amount: f64,
    /// Free-text notes, empty when none
    pub notes: String,
    /// Cumulative sum of amounts up to and including this entry
    pub running_balance: f64,
}

/// Totals over a set of statement entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementSummary {
    /// Sum of positive amounts
    pub total_income: f64,
    /// Sum of the absolute values of negative amounts
    pub total_expense: f64,
    /// `total_income - total_expense`
    pub net_balance: f64,
    /// Number of entries
    pub count: usize,
}

/// Entries plus their summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// Date-ordered entries with running balances
    pub entries: Vec<StatementEntry>,
    /// Totals over `entries`
    pub summary: StatementSummary,
}

fn entry(
    date: NaiveDate,
    entry_type: EntryType,
    description: String,
    amount: f64,
    notes: Option<String>,
) -> StatementEntry {
    StatementEntry {
        date,
        entry_type,
        description,
        amount,
        notes: notes.unwrap_or_default(),
        running_balance: 0.0,
    }
}

fn payment_entry(row: payment::Model, member_name: &str) -> StatementEntry {
    // created_at is NOT NULL, so it always backs a missing paid_at
    let date = row.paid_at.unwrap_or_else(|| row.created_at.date());
    entry(
        date,
        EntryType::Pagamento,
        format!("Pagamento - {member_name} ({:02}/{})", row.month, row.year),
        row.amount,
        row.notes,
    )
}

fn expense_entry(row: expense::Model) -> StatementEntry {
    let description = match row.category.as_deref().filter(|c| !c.is_empty()) {
        Some(category) => format!("Despesa - {} ({category})", row.title),
        None => format!("Despesa - {}", row.title),
    };
    entry(row.expense_date, EntryType::Despesa, description, -row.amount, row.notes)
}

fn event_entry(row: event::Model) -> StatementEntry {
    let net = row.net();
    entry(
        row.event_date,
        EntryType::Evento,
        format!("Evento - {}", row.name),
        net,
        row.description,
    )
}

/// Sorts entries by date (stable, so same-day entries keep their insertion order)
/// and fills in the running balance with one left-to-right pass.
#[must_use]
pub fn assemble(mut entries: Vec<StatementEntry>) -> Vec<StatementEntry> {
    entries.sort_by(|a, b| a.date.cmp(&b.date));
    let mut running_total = 0.0;
    for entry in &mut entries {
        running_total += entry.amount;
        entry.running_balance = running_total;
    }
    entries
}

/// Income, expense and net totals. Zero-amount entries count towards neither total.
#[must_use]
pub fn summarize(entries: &[StatementEntry]) -> StatementSummary {
    let total_income: f64 = entries
        .iter()
        .filter(|entry| entry.amount > 0.0)
        .map(|entry| entry.amount)
        .sum();
    let total_expense: f64 = entries
        .iter()
        .filter(|entry| entry.amount < 0.0)
        .map(|entry| entry.amount.abs())
        .sum();
    StatementSummary {
        total_income,
        total_expense,
        net_balance: total_income - total_expense,
        count: entries.len(),
    }
}

async fn payment_entries<C>(db: &C, filter: &StatementFilter) -> Result<Vec<StatementEntry>>
where
    C: ConnectionTrait,
{
    let mut query = Payment::find()
        .find_also_related(Member)
        .filter(payment::Column::Paid.eq(true));

    if let Some(member_id) = filter.member_id {
        query = query.filter(payment::Column::MemberId.eq(member_id));
    }
    // Effective date is COALESCE(paid_at, created_at)
    if let Some(start) = filter.start_date {
        query = query.filter(
            Condition::any()
                .add(payment::Column::PaidAt.gte(start))
                .add(
                    Condition::all()
                        .add(payment::Column::PaidAt.is_null())
                        .add(payment::Column::CreatedAt.gte(start.and_time(NaiveTime::MIN))),
                ),
        );
    }
    if let Some(end) = filter.end_date {
        let mut unpaid_dated = Condition::all().add(payment::Column::PaidAt.is_null());
        if let Some(next_day) = end.succ_opt() {
            unpaid_dated =
                unpaid_dated.add(payment::Column::CreatedAt.lt(next_day.and_time(NaiveTime::MIN)));
        }
        query = query.filter(
            Condition::any()
                .add(payment::Column::PaidAt.lte(end))
                .add(unpaid_dated),
        );
    }

    let rows = query.order_by_asc(payment::Column::Id).all(db).await?;
    Ok(rows
        .into_iter()
        .map(|(payment, member)| {
            let member_name = member.map(|member| member.name).unwrap_or_default();
            payment_entry(payment, &member_name)
        })
        .collect())
}

async fn expense_entries<C>(db: &C, filter: &StatementFilter) -> Result<Vec<StatementEntry>>
where
    C: ConnectionTrait,
{
    let mut query = Expense::find();
    if let Some(start) = filter.start_date {
        query = query.filter(expense::Column::ExpenseDate.gte(start));
    }
    if let Some(end) = filter.end_date {
        query = query.filter(expense::Column::ExpenseDate.lte(end));
    }
    let rows = query.order_by_asc(expense::Column::Id).all(db).await?;
    Ok(rows.into_iter().map(expense_entry).collect())
}

async fn event_entries<C>(db: &C, filter: &StatementFilter) -> Result<Vec<StatementEntry>>
where
    C: ConnectionTrait,
{
    let mut query = Event::find();
    if let Some(start) = filter.start_date {
        query = query.filter(event::Column::EventDate.gte(start));
    }
    if let Some(end) = filter.end_date {
        query = query.filter(event::Column::EventDate.lte(end));
    }
    let rows = query.order_by_asc(event::Column::Id).all(db).await?;
    Ok(rows.into_iter().map(event_entry).collect())
}

/// Builds the ordered statement entries for `filter`.
///
/// Tables excluded by the type filter are not queried at all.
pub async fn build_entries<C>(db: &C, filter: &StatementFilter) -> Result<Vec<StatementEntry>>
where
    C: ConnectionTrait,
{
    let mut entries = Vec::new();
    if filter.includes(EntryType::Pagamento) {
        entries.extend(payment_entries(db, filter).await?);
    }
    if filter.includes(EntryType::Despesa) {
        entries.extend(expense_entries(db, filter).await?);
    }
    if filter.includes(EntryType::Evento) {
        entries.extend(event_entries(db, filter).await?);
    }

    let entries = assemble(entries);
    debug!("Built statement with {} entries for {filter:?}", entries.len());
    Ok(entries)
}

/// Entries and summary in one call.
pub async fn build_statement<C>(db: &C, filter: &StatementFilter) -> Result<Statement>
where
    C: ConnectionTrait,
{
    let entries = build_entries(db, filter).await?;
    let summary = summarize(&entries);
    Ok(Statement { entries, summary })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::settings::get_current_balance;
    use crate::test_utils::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn bare(day: &str, entry_type: EntryType, amount: f64) -> StatementEntry {
        entry(date(day), entry_type, String::new(), amount, None)
    }

    #[test]
    fn test_assemble_sorts_stably_and_accumulates() {
        let entries = assemble(vec![
            bare("2024-03-01", EntryType::Pagamento, 100.0),
            bare("2024-01-15", EntryType::Pagamento, 50.0),
            bare("2024-01-15", EntryType::Despesa, -20.0),
            bare("2024-01-15", EntryType::Evento, 0.0),
        ]);

        let types: Vec<EntryType> = entries.iter().map(|e| e.entry_type).collect();
        assert_eq!(
            types,
            [
                EntryType::Pagamento,
                EntryType::Despesa,
                EntryType::Evento,
                EntryType::Pagamento
            ]
        );
        let running: Vec<f64> = entries.iter().map(|e| e.running_balance).collect();
        assert_eq!(running, [50.0, 30.0, 30.0, 130.0]);
    }

    #[test]
    fn test_summarize_ignores_zero_entries() {
        let entries = assemble(vec![
            bare("2024-01-01", EntryType::Pagamento, 100.0),
            bare("2024-01-02", EntryType::Despesa, -40.0),
            bare("2024-01-03", EntryType::Evento, 0.0),
            bare("2024-01-04", EntryType::Evento, -10.0),
        ]);
        let summary = summarize(&entries);

        assert_eq!(summary.total_income, 100.0);
        assert_eq!(summary.total_expense, 50.0);
        assert_eq!(summary.net_balance, 50.0);
        assert_eq!(summary.count, 4);
        assert_eq!(entries.last().unwrap().running_balance, summary.net_balance);
    }

    #[test]
    fn test_filter_from_params() {
        let filter = StatementFilter::from_params(
            Some("2024-01-01"),
            Some(""),
            Some("despesa"),
            Some("7"),
        )
        .unwrap();
        assert_eq!(filter.start_date, Some(date("2024-01-01")));
        assert_eq!(filter.end_date, None);
        assert_eq!(filter.entry_type, Some(EntryType::Despesa));
        assert_eq!(filter.member_id, Some(7));

        assert!(matches!(
            StatementFilter::from_params(None, None, Some("saque"), None),
            Err(Error::Validation { .. })
        ));
        assert!(StatementFilter::from_params(None, None, None, Some("abc")).is_err());
    }

    #[tokio::test]
    async fn test_sample_scenario_scalar_and_statement_diverge() -> Result<()> {
        let db = setup_test_db().await?;
        let member = create_test_member(&db, "Ana").await?;
        let payment = insert_raw_payment(&db, member.id, 1, 2024, 100.0, true).await?;
        set_paid_at(&db, payment, "2024-01-10").await?;

        assert_eq!(get_current_balance(&db).await?, 100.0);

        create_test_expense(&db, "Material", 50.0, "2024-02-05").await?;
        assert_eq!(get_current_balance(&db).await?, 100.0);

        let statement = build_statement(&db, &StatementFilter::default()).await?;
        let running: Vec<f64> = statement.entries.iter().map(|e| e.running_balance).collect();
        assert_eq!(running, [100.0, 50.0]);
        assert_eq!(statement.entries[0].description, "Pagamento - Ana (01/2024)");
        assert_eq!(statement.entries[1].description, "Despesa - Material");
        assert_eq!(statement.summary.net_balance, 50.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_running_balance_matches_summary_and_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let member = create_test_member(&db, "Bia").await?;
        let first = insert_raw_payment(&db, member.id, 1, 2024, 100.0, true).await?;
        set_paid_at(&db, first, "2024-01-05").await?;
        let second = insert_raw_payment(&db, member.id, 2, 2024, 100.0, true).await?;
        set_paid_at(&db, second, "2024-02-05").await?;
        insert_raw_payment(&db, member.id, 3, 2024, 100.0, false).await?;
        create_test_expense(&db, "Aluguel", 75.5, "2024-01-20").await?;
        create_test_event(&db, "Rifa", "2024-02-01", 300.0, 80.0).await?;
        create_test_event(&db, "Jantar", "2024-02-10", 50.0, 120.0).await?;

        let first_run = build_statement(&db, &StatementFilter::default()).await?;
        let second_run = build_statement(&db, &StatementFilter::default()).await?;
        assert_eq!(first_run, second_run);

        let entries = &first_run.entries;
        assert_eq!(entries.len(), 5);
        let sum: f64 = entries.iter().map(|e| e.amount).sum();
        let last = entries.last().unwrap().running_balance;
        assert!((last - sum).abs() < 1e-9);
        assert!(
            (last - (first_run.summary.total_income - first_run.summary.total_expense)).abs()
                < 1e-9
        );
        assert!(entries.windows(2).all(|pair| pair[0].date <= pair[1].date));
        Ok(())
    }

    #[tokio::test]
    async fn test_type_and_member_filters() -> Result<()> {
        let db = setup_test_db().await?;
        let ana = create_test_member(&db, "Ana").await?;
        let bia = create_test_member(&db, "Bia").await?;
        insert_raw_payment(&db, ana.id, 1, 2024, 100.0, true).await?;
        insert_raw_payment(&db, bia.id, 1, 2024, 60.0, true).await?;
        create_test_expense(&db, "Luz", 30.0, "2024-01-20").await?;
        create_test_event(&db, "Bingo", "2024-01-25", 90.0, 10.0).await?;

        let only_expenses = StatementFilter {
            entry_type: Some(EntryType::Despesa),
            ..Default::default()
        };
        let entries = build_entries(&db, &only_expenses).await?;
        assert_eq!(entries.len(), 1);
        assert!(entries.iter().all(|e| e.entry_type == EntryType::Despesa && e.amount < 0.0));

        let events_for_member = StatementFilter {
            entry_type: Some(EntryType::Evento),
            member_id: Some(ana.id),
            ..Default::default()
        };
        let entries = build_entries(&db, &events_for_member).await?;
        assert!(entries.iter().all(|e| e.entry_type != EntryType::Pagamento));
        assert_eq!(entries.len(), 1);

        let member_only = StatementFilter {
            member_id: Some(bia.id),
            ..Default::default()
        };
        let entries = build_entries(&db, &member_only).await?;
        let payments: Vec<&StatementEntry> = entries
            .iter()
            .filter(|e| e.entry_type == EntryType::Pagamento)
            .collect();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, 60.0);
        // Expenses and events are not narrowed by member
        assert_eq!(entries.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_date_range_uses_paid_at_then_created_at() -> Result<()> {
        let db = setup_test_db().await?;
        let member = create_test_member(&db, "Ana").await?;
        let january = insert_raw_payment(&db, member.id, 1, 2024, 10.0, true).await?;
        set_paid_at(&db, january, "2024-01-31").await?;
        let march = insert_raw_payment(&db, member.id, 3, 2024, 30.0, true).await?;
        set_paid_at(&db, march, "2024-03-01").await?;
        create_test_expense(&db, "Fevereiro", 5.0, "2024-02-15").await?;
        create_test_expense(&db, "Abril", 5.0, "2024-04-15").await?;

        let range = StatementFilter {
            start_date: Some(date("2024-01-31")),
            end_date: Some(date("2024-03-01")),
            ..Default::default()
        };
        let entries = build_entries(&db, &range).await?;
        let amounts: Vec<f64> = entries.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, [10.0, -5.0, 30.0]);

        // Unpaid-date payments fall back to created_at, which is today
        insert_raw_payment(&db, member.id, 5, 2024, 7.0, true).await?;
        let today = chrono::Utc::now().date_naive();
        let today_only = StatementFilter {
            start_date: Some(today),
            end_date: Some(today),
            entry_type: Some(EntryType::Pagamento),
            member_id: None,
        };
        let entries = build_entries(&db, &today_only).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, 7.0);
        assert_eq!(entries[0].date, today);
        Ok(())
    }
}
