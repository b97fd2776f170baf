//! HTTP surface: shared state, router assembly and request handlers.
//!
//! Handlers stay thin. They authenticate the caller through the [`Principal`]
//! extractor, check the role, call into [`crate::core`] and wrap the result in the
//! `{ "ok": true, ... }` envelope.
//!
//! [`Principal`]: crate::core::auth::Principal

use crate::config::AppConfig;
use axum::{
    Json, Router,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod error;
mod extract;
mod ledger;
mod members;
mod payments;
mod records;

pub use extract::{JsonBody, PathParam, QueryParams};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Loaded configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Bundles a connection and configuration.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

/// Wraps a payload object in the success envelope.
pub(crate) fn ok_json(payload: Value) -> Json<Value> {
    let mut body = json!({ "ok": true });
    if let (Some(target), Value::Object(fields)) = (body.as_object_mut(), payload) {
        target.extend(fields);
    }
    Json(body)
}

/// File download with the given MIME type and attachment name.
pub(crate) fn download(bytes: Vec<u8>, content_type: &'static str, file_name: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

async fn health() -> Json<Value> {
    ok_json(json!({ "status": "running" }))
}

/// Builds the complete application router.
pub fn router(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/api/health", get(health))
        // identity
        .route("/api/login", post(auth::login))
        .route("/api/register", post(auth::register))
        .route("/api/setup-password", post(auth::setup_password))
        .route("/api/me", get(auth::me))
        // members
        .route(
            "/api/members",
            get(members::list_members).post(members::create_member),
        )
        .route("/api/members/delinquent", get(members::delinquent_members))
        .route(
            "/api/members/{id}",
            put(members::update_member).delete(members::delete_member),
        )
        .route("/api/members/{id}/invite", post(members::invite_member))
        // payments
        .route(
            "/api/payments",
            get(payments::list_payments).post(payments::create_or_replace_payment),
        )
        .route(
            "/api/payments/history/{member_id}",
            get(payments::payment_history),
        )
        .route(
            "/api/payments/{id}",
            get(payments::get_payment)
                .put(payments::update_payment)
                .delete(payments::delete_payment),
        )
        .route("/api/payments/{id}/receipt", get(payments::payment_receipt))
        // expenses, events, goals
        .route(
            "/api/expenses",
            get(records::list_expenses).post(records::create_expense),
        )
        .route(
            "/api/expenses/{id}",
            put(records::update_expense).delete(records::delete_expense),
        )
        .route(
            "/api/events",
            get(records::list_events).post(records::create_event),
        )
        .route("/api/events/summary", get(records::event_summary))
        .route(
            "/api/events/{id}",
            put(records::update_event).delete(records::delete_event),
        )
        .route(
            "/api/goals",
            get(records::list_goals).post(records::create_goal),
        )
        .route(
            "/api/goals/{id}",
            put(records::update_goal).delete(records::delete_goal),
        )
        // statement, settings, reports
        .route("/api/extrato", get(ledger::statement))
        .route("/api/extrato/export", get(ledger::export_statement))
        .route(
            "/api/settings",
            get(ledger::get_settings).put(ledger::update_settings),
        )
        .route("/api/settings/balance", put(ledger::set_balance))
        .route("/api/reports/balance", get(ledger::balance_report))
        .route("/api/reports/monthly", get(ledger::monthly_report))
        .route("/api/reports/annual", get(ledger::annual_report))
        .route("/api/reports/export", get(ledger::export_report))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    #![allow(clippy::unwrap_used)]
    use super::{AppState, router};
    use crate::{
        config::AppConfig,
        core::auth::{Principal, issue_token},
        entities::Role,
        errors::Result,
        test_utils::setup_test_db,
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    pub const SECRET: &str = "test-secret";

    pub async fn test_state() -> Result<AppState> {
        let db = setup_test_db().await?;
        let config = AppConfig {
            jwt_secret: Some(SECRET.to_string()),
            admin_email: Some("root@clan.org".to_string()),
            admin_password: Some("root-pass".to_string()),
            ..AppConfig::default()
        };
        Ok(AppState::new(db, config))
    }

    pub fn token_for(role: Role, member_id: Option<i64>) -> String {
        let principal = Principal {
            role,
            member_id,
            email: Some("someone@clan.org".to_string()),
            name: "Someone".to_string(),
        };
        issue_token(SECRET, &principal, 1).unwrap()
    }

    pub fn admin_token() -> String {
        token_for(Role::Admin, None)
    }

    /// Sends one request through a fresh router and returns status and JSON body.
    pub async fn send(
        state: &AppState,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = send_raw(state, method, uri, token, body).await;
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn send_raw(
        state: &AppState,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }
}
