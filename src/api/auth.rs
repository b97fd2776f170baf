//! Login, self-registration, password setup and the current-principal endpoint.

use super::{
    AppState, ok_json,
    extract::{JsonBody, jwt_secret},
};
use crate::{
    core::{
        auth::{Principal, issue_token},
        input::require_text,
        member::{self, RegisterInput, normalize_email},
    },
    errors::Result,
};
use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetupPasswordRequest {
    token: Option<String>,
    password: Option<String>,
}

fn session_body(state: &AppState, principal: &Principal) -> Result<Json<Value>> {
    let token = issue_token(
        jwt_secret(state)?,
        principal,
        state.config.token_ttl_hours,
    )?;
    Ok(ok_json(json!({
        "token": token,
        "role": principal.role,
        "email": principal.email,
        "name": principal.name,
        "memberId": principal.member_id,
    })))
}

/// Checks the configured bootstrap admin before stored members.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<Value>> {
    jwt_secret(&state)?;
    let email = require_text(request.email.as_deref(), "email")?;
    let password = require_text(request.password.as_deref(), "password")?;

    if let (Some(admin_email), Some(admin_password)) = (
        state.config.admin_email.as_deref(),
        state.config.admin_password.as_deref(),
    ) && normalize_email(&email) == normalize_email(admin_email)
        && password == admin_password
    {
        info!("Bootstrap admin logged in");
        return session_body(&state, &Principal::bootstrap_admin(admin_email));
    }

    let member = member::authenticate(&state.db, &email, &password).await?;
    info!("Member {} logged in", member.id);
    session_body(&state, &Principal::from_member(&member))
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterInput>,
) -> Result<Json<Value>> {
    jwt_secret(&state)?;
    let member = member::register_member(&state.db, input).await?;
    session_body(&state, &Principal::from_member(&member))
}

pub async fn setup_password(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SetupPasswordRequest>,
) -> Result<Json<Value>> {
    jwt_secret(&state)?;
    let member = member::setup_password(
        &state.db,
        request.token.as_deref(),
        request.password.as_deref(),
    )
    .await?;
    session_body(&state, &Principal::from_member(&member))
}

pub async fn me(principal: Principal) -> Json<Value> {
    ok_json(json!({
        "role": principal.role,
        "email": principal.email,
        "name": principal.name,
        "memberId": principal.member_id,
    }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::super::test_support::{send, test_state};
    use crate::{
        core::member::{MemberInput, create_member},
        errors::Result,
    };
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_bootstrap_admin_login_and_me() -> Result<()> {
        let state = test_state().await?;
        let (status, body) = send(
            &state,
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": " ROOT@clan.org ", "password": "root-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "admin");
        assert!(body["memberId"].is_null());

        let token = body["token"].as_str().unwrap().to_string();
        let (status, me) = send(&state, "GET", "/api/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["role"], "admin");
        Ok(())
    }

    #[tokio::test]
    async fn test_register_setup_and_login_flow() -> Result<()> {
        let state = test_state().await?;

        let (status, body) = send(
            &state,
            "POST",
            "/api/register",
            None,
            Some(json!({
                "name": "Ana",
                "email": "ana@clan.org",
                "password": "s3cret",
                "registrationNumber": "A-1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "admin");

        let created = create_member(
            &state.db,
            MemberInput {
                name: Some("Bia".to_string()),
                email: Some("bia@clan.org".to_string()),
                registration_number: Some("B-2".to_string()),
                ..Default::default()
            },
        )
        .await?;

        // pending members cannot log in yet
        let (status, _) = send(
            &state,
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "bia@clan.org", "password": "whatever" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &state,
            "POST",
            "/api/setup-password",
            None,
            Some(json!({ "token": created.setup_token, "password": "bia-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "viewer");

        let (status, _) = send(
            &state,
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "bia@clan.org", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &state,
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "bia@clan.org", "password": "bia-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["memberId"], created.member.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_login_requires_fields() -> Result<()> {
        let state = test_state().await?;
        let (status, body) = send(
            &state,
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "x@clan.org" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        Ok(())
    }
}
