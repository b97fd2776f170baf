//! Payment handlers. Viewers read only their own payments; mutations need a
//! privileged role and move the scalar balance.

use super::{
    AppState, download, ok_json,
    extract::{JsonBody, PathParam, QueryParams, require_privileged},
};
use crate::{
    core::{
        auth::{MemberScope, Principal},
        member::get_member,
        payment::{self, PaymentFilter, PaymentInput, PaymentUpdate, PaymentView},
        report::receipt_pdf,
        settings::public_settings,
    },
    errors::Result,
};
use axum::{Json, extract::State, response::Response};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    month: Option<i32>,
    year: Option<i32>,
    member_id: Option<i64>,
}

/// Loads a payment and checks the caller may see it.
async fn visible_payment(state: &AppState, principal: &Principal, id: i64) -> Result<PaymentView> {
    let view = payment::get_payment(&state.db, id).await?;
    principal.scope_member(Some(view.payment.member_id))?;
    Ok(view)
}

pub async fn list_payments(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<PaymentQuery>,
) -> Result<Json<Value>> {
    let member_id = match principal.scope_member(query.member_id)? {
        MemberScope::All => None,
        MemberScope::Member(id) => Some(id),
        MemberScope::Nobody => return Ok(ok_json(json!({ "payments": [] }))),
    };
    let filter = PaymentFilter {
        month: query.month,
        year: query.year,
        member_id,
    };
    let payments = payment::list_payments(&state.db, filter).await?;
    Ok(ok_json(json!({ "payments": payments })))
}

pub async fn payment_history(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(member_id): PathParam<i64>,
) -> Result<Json<Value>> {
    principal.scope_member(Some(member_id))?;
    let payments = payment::payment_history(&state.db, member_id).await?;
    Ok(ok_json(json!({ "payments": payments })))
}

pub async fn get_payment(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Value>> {
    let view = visible_payment(&state, &principal, id).await?;
    Ok(ok_json(json!({ "payment": view })))
}

/// PDF receipt for one payment.
pub async fn payment_receipt(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
) -> Result<Response> {
    let view = visible_payment(&state, &principal, id).await?;
    let member = get_member(&state.db, view.payment.member_id).await?;
    let org = public_settings(&state.db).await?;
    let bytes = receipt_pdf(&view, member.email.as_deref(), &org);
    Ok(download(bytes, "application/pdf", &format!("recibo-{id}.pdf")))
}

pub async fn create_or_replace_payment(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(input): JsonBody<PaymentInput>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let payment =
        payment::create_or_replace_payment(&state.db, state.config.balance_policy, input).await?;
    Ok(ok_json(json!({ "payment": payment })))
}

pub async fn update_payment(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
    JsonBody(update): JsonBody<PaymentUpdate>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let payment =
        payment::update_payment(&state.db, state.config.balance_policy, id, update).await?;
    Ok(ok_json(json!({ "payment": payment })))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    payment::delete_payment(&state.db, state.config.balance_policy, id).await?;
    Ok(ok_json(json!({})))
}
