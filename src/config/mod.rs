/// Application settings loaded from `treasurer.toml` and the environment
pub mod app;

/// Database connection, table creation and backend-specific SQL fragments
pub mod database;

pub use app::{AppConfig, load_app_configuration};
