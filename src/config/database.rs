//! Database configuration module.
//!
//! This module is the persistence adapter: it opens a connection to either the embedded
//! `SQLite` file or a networked `PostgreSQL` server (chosen by URL scheme), creates every
//! table from the entity definitions with `Schema::create_table_from_entity`, and holds the
//! few SQL fragments whose spelling differs between the two backends. Everything else goes
//! through `SeaORM`'s query builder, which already renders placeholders per backend.

use crate::entities::{Event, Expense, Goal, Member, Payment, Setting, payment};
use crate::errors::Result;
use sea_orm::sea_query::{Expr, Index, SimpleExpr};
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info};

/// Default database URL, a single-file `SQLite` database created on first use.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/treasurer.sqlite?mode=rwc";

/// Name of the unique index enforcing one payment per member and competency period.
pub const PAYMENT_PERIOD_INDEX: &str = "idx_payments_member_period";

/// Establishes a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first so a fresh
/// checkout can start without manual setup.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(parent) = sqlite_file_parent(database_url) {
        std::fs::create_dir_all(parent)?;
    }
    debug!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Returns the directory holding a file-backed `SQLite` database, if any.
fn sqlite_file_parent(database_url: &str) -> Option<&Path> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next()?;
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

/// Creates all tables (if missing) using `SeaORM`'s schema generation from entity definitions.
///
/// Tables are created parents-first so foreign keys resolve, then the composite unique
/// index on `payments(member_id, month, year)` is added.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut tables = [
        schema.create_table_from_entity(Member),
        schema.create_table_from_entity(Goal),
        schema.create_table_from_entity(Event),
        schema.create_table_from_entity(Payment),
        schema.create_table_from_entity(Expense),
        schema.create_table_from_entity(Setting),
    ];
    for table in &mut tables {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    let period_index = Index::create()
        .name(PAYMENT_PERIOD_INDEX)
        .table(Payment)
        .col(payment::Column::MemberId)
        .col(payment::Column::Month)
        .col(payment::Column::Year)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&period_index)).await?;

    info!("Database tables ensured");
    Ok(())
}

/// Builds `CAST(CAST(COALESCE(value, '0') AS <float>) + delta AS TEXT)` for the given backend.
///
/// Settings store numbers as text, so an in-place increment has to cast through the
/// backend's floating point type. Running it as a single `UPDATE` keeps concurrent
/// increments from losing each other.
#[must_use]
pub fn text_number_increment(backend: DatabaseBackend, column: &str, delta: f64) -> SimpleExpr {
    let (float_type, text_type) = match backend {
        DatabaseBackend::Sqlite => ("REAL", "TEXT"),
        DatabaseBackend::Postgres => ("DOUBLE PRECISION", "TEXT"),
        DatabaseBackend::MySql => ("DOUBLE", "CHAR"),
    };
    Expr::cust_with_values(
        format!("CAST(CAST(COALESCE(\"{column}\", '0') AS {float_type}) + ? AS {text_type})"),
        [delta],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        event::Model as EventModel, expense::Model as ExpenseModel, goal::Model as GoalModel,
        member::Model as MemberModel, payment::Model as PaymentModel,
        setting::Model as SettingModel,
    };
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<MemberModel> = Member::find().limit(1).all(&db).await?;
        let _: Vec<PaymentModel> = Payment::find().limit(1).all(&db).await?;
        let _: Vec<ExpenseModel> = Expense::find().limit(1).all(&db).await?;
        let _: Vec<EventModel> = Event::find().limit(1).all(&db).await?;
        let _: Vec<GoalModel> = Goal::find().limit(1).all(&db).await?;
        let _: Vec<SettingModel> = Setting::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_sqlite_file_parent() {
        assert_eq!(
            sqlite_file_parent("sqlite://data/treasurer.sqlite?mode=rwc"),
            Some(Path::new("data"))
        );
        assert_eq!(sqlite_file_parent("sqlite::memory:"), None);
        assert_eq!(sqlite_file_parent("sqlite://treasurer.sqlite"), None);
        assert_eq!(sqlite_file_parent("postgres://localhost/treasurer"), None);
    }
}
