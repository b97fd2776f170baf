//! Expenses, events and goals. Any principal may read; mutations need a privileged role.

use super::{
    AppState, ok_json,
    extract::{JsonBody, PathParam, require_privileged},
};
use crate::{
    core::{
        auth::Principal,
        event::{self, EventInput},
        expense::{self, ExpenseInput},
        goal::{self, GoalInput},
    },
    errors::Result,
};
use axum::{Json, extract::State};
use serde_json::{Value, json};

// --- expenses ---

pub async fn list_expenses(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<Value>> {
    let expenses = expense::list_expenses(&state.db).await?;
    Ok(ok_json(json!({ "expenses": expenses })))
}

pub async fn create_expense(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(input): JsonBody<ExpenseInput>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let expense = expense::create_expense(&state.db, input).await?;
    Ok(ok_json(json!({ "expense": expense })))
}

pub async fn update_expense(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
    JsonBody(input): JsonBody<ExpenseInput>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let expense = expense::update_expense(&state.db, id, input).await?;
    Ok(ok_json(json!({ "expense": expense })))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    expense::delete_expense(&state.db, id).await?;
    Ok(ok_json(json!({})))
}

// --- events ---

pub async fn list_events(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<Value>> {
    let events = event::list_events(&state.db).await?;
    Ok(ok_json(json!({ "events": events })))
}

pub async fn event_summary(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<Value>> {
    let events = event::event_summary(&state.db).await?;
    Ok(ok_json(json!({ "events": events })))
}

pub async fn create_event(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(input): JsonBody<EventInput>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let event = event::create_event(&state.db, input).await?;
    Ok(ok_json(json!({ "event": event })))
}

pub async fn update_event(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
    JsonBody(input): JsonBody<EventInput>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let event = event::update_event(&state.db, id, input).await?;
    Ok(ok_json(json!({ "event": event })))
}

pub async fn delete_event(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    event::delete_event(&state.db, id).await?;
    Ok(ok_json(json!({})))
}

// --- goals ---

pub async fn list_goals(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<Value>> {
    let goals = goal::list_goals(&state.db).await?;
    Ok(ok_json(json!({ "goals": goals })))
}

pub async fn create_goal(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(input): JsonBody<GoalInput>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let goal = goal::create_goal(&state.db, input).await?;
    Ok(ok_json(json!({ "goal": goal })))
}

pub async fn update_goal(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
    JsonBody(input): JsonBody<GoalInput>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let goal = goal::update_goal(&state.db, id, input).await?;
    Ok(ok_json(json!({ "goal": goal })))
}

pub async fn delete_goal(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    goal::delete_goal(&state.db, id).await?;
    Ok(ok_json(json!({})))
}
