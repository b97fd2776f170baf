//! Unified error type for the treasurer service.
//!
//! Every fallible operation in the crate returns [`Result`]. Each variant maps to
//! exactly one HTTP status through [`Error::status_code`], so the HTTP layer never
//! has to inspect messages to decide how to respond.

use thiserror::Error;

/// Crate-wide error enum.
#[derive(Debug, Error)]
pub enum Error {
    // --- 400 Bad Request ---
    /// A required input field was absent or empty
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field as it appears in requests
        field: &'static str,
    },

    /// Amount was zero, negative, NaN or infinite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Competency month outside 1..=12
    #[error("Invalid month: {month} (expected 1-12)")]
    InvalidMonth {
        /// The rejected month
        month: i32,
    },

    /// Date string that is not `YYYY-MM-DD`
    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate {
        /// The rejected input
        value: String,
    },

    /// Any other request validation failure
    #[error("{message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    // --- 401 Unauthorized ---
    /// No bearer token, or the token could not be verified
    #[error("Authentication required")]
    Unauthenticated,

    /// Email/password pair did not match an active member
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token signature or expiry check failed
    #[error("Invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    // --- 403 Forbidden ---
    /// Authenticated principal lacks the required role or scope
    #[error("{message}")]
    Forbidden {
        /// Human-readable reason
        message: String,
    },

    // --- 404 Not Found ---
    /// Member id does not exist
    #[error("Member not found: {id}")]
    MemberNotFound {
        /// Requested member id
        id: i64,
    },

    /// Payment id does not exist
    #[error("Payment not found: {id}")]
    PaymentNotFound {
        /// Requested payment id
        id: i64,
    },

    /// Expense id does not exist
    #[error("Expense not found: {id}")]
    ExpenseNotFound {
        /// Requested expense id
        id: i64,
    },

    /// Event id does not exist
    #[error("Event not found: {id}")]
    EventNotFound {
        /// Requested event id
        id: i64,
    },

    /// Goal id does not exist
    #[error("Goal not found: {id}")]
    GoalNotFound {
        /// Requested goal id
        id: i64,
    },

    // --- 409 Conflict ---
    /// Unique business key already taken (email, registration number)
    #[error("{message}")]
    Conflict {
        /// Human-readable reason
        message: String,
    },

    // --- 500 Internal Server Error ---
    /// Configuration missing or malformed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable reason
        message: String,
    },

    /// `JWT_SECRET` is not set, so tokens can be neither issued nor verified
    #[error("Authentication not configured")]
    AuthNotConfigured,

    /// Storage backend failure, message propagated as-is
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem or socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Password hashing failure
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Underlying hasher message
        message: String,
    },

    /// CSV rendering failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingField { .. }
            | Self::InvalidAmount { .. }
            | Self::InvalidMonth { .. }
            | Self::InvalidDate { .. }
            | Self::Validation { .. } => 400,
            Self::Unauthenticated | Self::InvalidCredentials | Self::Token(_) => 401,
            Self::Forbidden { .. } => 403,
            Self::MemberNotFound { .. }
            | Self::PaymentNotFound { .. }
            | Self::ExpenseNotFound { .. }
            | Self::EventNotFound { .. }
            | Self::GoalNotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Config { .. }
            | Self::AuthNotConfigured
            | Self::Database(_)
            | Self::Io(_)
            | Self::PasswordHash { .. }
            | Self::Csv(_) => 500,
        }
    }

    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::PasswordHash {
            message: value.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
