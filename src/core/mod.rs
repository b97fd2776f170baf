//! Core business logic - framework-agnostic ledger, record and reporting operations.
//!
//! Functions take a `SeaORM` connection and plain input structs and return crate
//! [`Result`](crate::errors::Result)s; the HTTP layer only translates requests and
//! responses around them.

/// Principals, bearer tokens and password hashing
pub mod auth;
/// Fundraising events
pub mod event;
/// Expense records (no balance side effects)
pub mod expense;
/// Savings goals with computed progress
pub mod goal;
/// Shared request validation helpers
pub mod input;
/// Members, registration and login
pub mod member;
/// Payment ledger operations that maintain `current_balance`
pub mod payment;
/// CSV/PDF exports, receipts and the balance report
pub mod report;
/// Settings and the scalar balance store
pub mod settings;
/// Statement ("extrato") builder
pub mod statement;
