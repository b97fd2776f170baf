//! Member management. Reads are scoped to the caller; mutations are admin-only.

use super::{
    AppState, ok_json,
    extract::{JsonBody, PathParam, QueryParams, require_admin},
};
use crate::{
    core::{
        auth::Principal,
        member::{self, MemberInput},
    },
    errors::Result,
};
use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    month: Option<i32>,
    year: Option<i32>,
}

pub async fn list_members(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Value>> {
    let scope = principal.scope_member(None)?;
    let members = member::list_members(&state.db, scope).await?;
    Ok(ok_json(json!({ "members": members })))
}

/// Members with a missing or unpaid payment for the period.
pub async fn delinquent_members(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<PeriodQuery>,
) -> Result<Json<Value>> {
    let scope = principal.scope_member(None)?;
    let members = member::delinquent_members(&state.db, query.month, query.year, scope).await?;
    Ok(ok_json(json!({ "members": members })))
}

pub async fn create_member(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(input): JsonBody<MemberInput>,
) -> Result<Json<Value>> {
    require_admin(&principal)?;
    let created = member::create_member(&state.db, input).await?;
    Ok(ok_json(json!({
        "member": created.member,
        "setupToken": created.setup_token,
    })))
}

pub async fn update_member(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
    JsonBody(input): JsonBody<MemberInput>,
) -> Result<Json<Value>> {
    require_admin(&principal)?;
    let member = member::update_member(&state.db, id, input).await?;
    Ok(ok_json(json!({ "member": member })))
}

/// Re-issues a setup token so the member can choose a new password.
pub async fn invite_member(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Value>> {
    require_admin(&principal)?;
    let created = member::invite_member(&state.db, id).await?;
    Ok(ok_json(json!({
        "member": created.member,
        "setupToken": created.setup_token,
    })))
}

pub async fn delete_member(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Value>> {
    require_admin(&principal)?;
    let removed = member::delete_member(&state.db, state.config.balance_policy, id).await?;
    Ok(ok_json(json!({ "removedPayments": removed })))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::super::test_support::{admin_token, send, test_state, token_for};
    use crate::{
        core::settings::get_current_balance,
        entities::Role,
        errors::Result,
        test_utils::{create_test_member, insert_raw_payment},
    };
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_member_crud_is_admin_only() -> Result<()> {
        let state = test_state().await?;
        let admin = admin_token();
        let director = token_for(Role::DiretorFinanceiro, None);

        let payload = json!({
            "name": "Caio",
            "email": "Caio@Clan.org",
            "registrationNumber": "C-3"
        });
        let (status, _) = send(
            &state,
            "POST",
            "/api/members",
            Some(&director),
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &state,
            "POST",
            "/api/members",
            Some(&admin),
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["member"]["email"], "caio@clan.org");
        assert_eq!(body["member"]["mustResetPassword"], true);
        assert!(body["member"].get("passwordHash").is_none());
        assert_eq!(body["setupToken"].as_str().unwrap().len(), 48);

        let (status, _) = send(&state, "POST", "/api/members", Some(&admin), Some(payload)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let id = body["member"]["id"].as_i64().unwrap();
        let (status, body) = send(
            &state,
            "PUT",
            &format!("/api/members/{id}"),
            Some(&admin),
            Some(json!({
                "name": "Caio Souza",
                "email": "caio@clan.org",
                "registrationNumber": "C-3",
                "role": "diretor_financeiro"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["member"]["role"], "diretor_financeiro");
        Ok(())
    }

    #[tokio::test]
    async fn test_viewer_sees_only_self() -> Result<()> {
        let state = test_state().await?;
        let ana = create_test_member(&state.db, "Ana").await?;
        create_test_member(&state.db, "Bia").await?;

        let viewer = token_for(Role::Viewer, Some(ana.id));
        let (status, body) = send(&state, "GET", "/api/members", Some(&viewer), None).await;
        assert_eq!(status, StatusCode::OK);
        let members = body["members"].as_array().unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0]["name"], "Ana");

        let (_, body) = send(&state, "GET", "/api/members", Some(&admin_token()), None).await;
        assert_eq!(body["members"].as_array().unwrap().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_member_cascades_and_moves_balance() -> Result<()> {
        let state = test_state().await?;
        let ana = create_test_member(&state.db, "Ana").await?;
        insert_raw_payment(&state.db, ana.id, 1, 2024, 80.0, true).await?;
        assert!((get_current_balance(&state.db).await? - 80.0).abs() < f64::EPSILON);

        let (status, body) = send(
            &state,
            "DELETE",
            &format!("/api/members/{}", ana.id),
            Some(&admin_token()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removedPayments"], 1);
        assert!(get_current_balance(&state.db).await?.abs() < f64::EPSILON);

        let (status, _) = send(
            &state,
            "DELETE",
            &format!("/api/members/{}", ana.id),
            Some(&admin_token()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_delinquent_members() -> Result<()> {
        let state = test_state().await?;
        let ana = create_test_member(&state.db, "Ana").await?;
        let bia = create_test_member(&state.db, "Bia").await?;
        insert_raw_payment(&state.db, ana.id, 3, 2024, 50.0, true).await?;
        insert_raw_payment(&state.db, bia.id, 3, 2024, 50.0, false).await?;

        let (status, body) = send(
            &state,
            "GET",
            "/api/members/delinquent?month=3&year=2024",
            Some(&admin_token()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body["members"]
            .as_array()
            .unwrap()
            .iter()
            .map(|member| member["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Bia".to_string()]);
        Ok(())
    }
}
