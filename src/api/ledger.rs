//! Statement, export, settings and balance report handlers. All privileged.

use super::{
    AppState, download, ok_json,
    extract::{JsonBody, QueryParams, require_privileged},
};
use crate::{
    core::{
        auth::Principal,
        report::{self, ExportFormat, ReportKind, ReportPeriod},
        settings::{self, CURRENT_BALANCE_KEY, get_current_balance, public_settings},
        statement::{StatementFilter, build_statement},
    },
    errors::{Error, Result},
};
use axum::{Json, extract::State, response::Response};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    #[serde(rename = "type")]
    entry_type: Option<String>,
    member_id: Option<String>,
    format: Option<String>,
}

impl StatementQuery {
    fn filter(&self) -> Result<StatementFilter> {
        StatementFilter::from_params(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            self.entry_type.as_deref(),
            self.member_id.as_deref(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    month: Option<i32>,
    year: Option<i32>,
    #[serde(rename = "type")]
    kind: Option<String>,
    format: Option<String>,
}

impl ReportQuery {
    fn period(&self) -> Result<ReportPeriod> {
        ReportPeriod {
            month: self.month,
            year: self.year,
        }
        .validated()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BalanceRequest {
    value: Option<Value>,
}

/// Accepts a JSON number or a numeric string; anything non-finite is rejected.
fn parse_balance(value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|balance| balance.is_finite())
        .ok_or_else(|| Error::validation("Provide a valid balance"))
}

/// Stringifies a settings value; `null` means "leave unchanged".
fn setting_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

pub async fn statement(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<StatementQuery>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let statement = build_statement(&state.db, &query.filter()?).await?;
    Ok(ok_json(json!({
        "entries": statement.entries,
        "summary": statement.summary,
    })))
}

/// Same statement rendered as a CSV or PDF download.
pub async fn export_statement(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<StatementQuery>,
) -> Result<Response> {
    require_privileged(&principal)?;
    let format: ExportFormat = query.format.as_deref().unwrap_or_default().parse()?;
    let statement = build_statement(&state.db, &query.filter()?).await?;
    let org = public_settings(&state.db).await?;
    let bytes = report::export_statement(&statement, format, &org)?;
    info!(
        "Exported statement as {:?} ({} entries)",
        format, statement.summary.count
    );
    Ok(download(bytes, format.content_type(), format.file_name()))
}

pub async fn get_settings(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let values = settings::get_settings(&state.db).await?;
    let current_balance = get_current_balance(&state.db).await?;
    Ok(ok_json(json!({
        "settings": values,
        "currentBalance": current_balance,
    })))
}

/// Writes known keys and, when `currentBalance` is present, overwrites the scalar.
pub async fn update_settings(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(mut body): JsonBody<Map<String, Value>>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;

    let current_balance = match body.remove("currentBalance") {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_balance(&value)?),
    };
    body.remove(CURRENT_BALANCE_KEY);
    let values: BTreeMap<String, String> = body
        .into_iter()
        .filter_map(|(key, value)| setting_text(value).map(|text| (key, text)))
        .collect();

    settings::update_settings(&state.db, &values, current_balance).await?;

    let values = settings::get_settings(&state.db).await?;
    let current_balance = get_current_balance(&state.db).await?;
    Ok(ok_json(json!({
        "settings": values,
        "currentBalance": current_balance,
    })))
}

pub async fn set_balance(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(request): JsonBody<BalanceRequest>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let value = request.value.ok_or(Error::MissingField { field: "value" })?;
    let current_balance = settings::set_current_balance(&state.db, parse_balance(&value)?).await?;
    Ok(ok_json(json!({ "currentBalance": current_balance })))
}

/// Paid vs. spent totals, optionally for one `year`, next to the stored balance.
pub async fn balance_report(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<ReportQuery>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let report = report::balance_report(&state.db, query.year).await?;
    Ok(ok_json(json!(report)))
}

/// Paid total of one competency month.
pub async fn monthly_report(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<ReportQuery>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let month = query.month.ok_or(Error::MissingField { field: "month" })?;
    let year = query.year.ok_or(Error::MissingField { field: "year" })?;
    let total = report::paid_total(&state.db, query.period()?).await?;
    Ok(ok_json(json!({ "month": month, "year": year, "total": total })))
}

/// Paid total of one year.
pub async fn annual_report(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<ReportQuery>,
) -> Result<Json<Value>> {
    require_privileged(&principal)?;
    let year = query.year.ok_or(Error::MissingField { field: "year" })?;
    let period = ReportPeriod {
        month: None,
        year: Some(year),
    };
    let total = report::paid_total(&state.db, period).await?;
    Ok(ok_json(json!({ "year": year, "total": total })))
}

/// Raw payment or expense rows as a CSV or PDF download.
pub async fn export_report(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<ReportQuery>,
) -> Result<Response> {
    require_privileged(&principal)?;
    let format: ExportFormat = query.format.as_deref().unwrap_or_default().parse()?;
    let kind: ReportKind = query.kind.as_deref().unwrap_or_default().parse()?;
    let table = report::report_rows(&state.db, kind, query.period()?).await?;
    let org = public_settings(&state.db).await?;
    let bytes = report::export_report(&table, format, &org)?;
    info!(
        "Exported {:?} report as {:?} ({} rows)",
        kind,
        format,
        table.rows.len()
    );
    Ok(download(bytes, format.content_type(), &kind.file_name(format)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::super::test_support::{admin_token, send, send_raw, test_state, token_for};
    use super::*;
    use crate::{
        entities::Role,
        test_utils::{
            create_test_event, create_test_expense, create_test_member, insert_raw_payment,
            set_paid_at,
        },
    };
    use axum::http::StatusCode;

    #[test]
    fn test_parse_balance() {
        assert_eq!(parse_balance(&json!(12.5)).unwrap(), 12.5);
        assert_eq!(parse_balance(&json!(" -3 ")).unwrap(), -3.0);
        assert!(parse_balance(&json!("abc")).is_err());
        assert!(parse_balance(&json!("NaN")).is_err());
        assert!(parse_balance(&json!(true)).is_err());
    }

    #[tokio::test]
    async fn test_statement_endpoint() -> Result<()> {
        let state = test_state().await?;
        let ana = create_test_member(&state.db, "Ana").await?;
        let payment = insert_raw_payment(&state.db, ana.id, 1, 2024, 100.0, true).await?;
        set_paid_at(&state.db, payment, "2024-01-05").await?;
        create_test_expense(&state.db, "Aluguel", 30.0, "2024-01-10").await?;
        create_test_event(&state.db, "Bingo", "2024-01-20", 50.0, 20.0).await?;

        let (status, body) = send(&state, "GET", "/api/extrato", Some(&admin_token()), None).await;
        assert_eq!(status, StatusCode::OK);
        let entries = body["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["type"], "pagamento");
        assert_eq!(entries[1]["runningBalance"], 70.0);
        assert_eq!(entries[2]["runningBalance"], 100.0);
        assert_eq!(body["summary"]["totalIncome"], 130.0);
        assert_eq!(body["summary"]["totalExpense"], 30.0);
        assert_eq!(body["summary"]["netBalance"], 100.0);

        let (status, body) = send(
            &state,
            "GET",
            "/api/extrato?type=despesa&startDate=2024-01-01&endDate=2024-01-31",
            Some(&admin_token()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["count"], 1);

        let (status, _) = send(
            &state,
            "GET",
            "/api/extrato?startDate=01/02/2024",
            Some(&admin_token()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let viewer = token_for(Role::Viewer, Some(ana.id));
        let (status, _) = send(&state, "GET", "/api/extrato", Some(&viewer), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn test_export_formats() -> Result<()> {
        let state = test_state().await?;
        create_test_expense(&state.db, "Aluguel", 30.0, "2024-01-10").await?;

        let (status, bytes) = send_raw(
            &state,
            "GET",
            "/api/extrato/export",
            Some(&admin_token()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let csv = String::from_utf8(bytes).unwrap();
        assert!(csv.starts_with("data,tipo,descricao,valor,saldo_acumulado,observacoes"));
        assert!(csv.contains("10/01/2024"));

        let (status, bytes) = send_raw(
            &state,
            "GET",
            "/api/extrato/export?format=pdf",
            Some(&admin_token()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"%PDF-"));

        let (status, _) = send_raw(
            &state,
            "GET",
            "/api/extrato/export?format=xlsx",
            Some(&admin_token()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_settings_and_balance_override() -> Result<()> {
        let state = test_state().await?;
        let admin = admin_token();

        let (status, body) = send(&state, "GET", "/api/settings", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settings"]["org_name"], "Tesoureiro Assistente");
        assert_eq!(body["currentBalance"], 0.0);

        let (status, body) = send(
            &state,
            "PUT",
            "/api/settings",
            Some(&admin),
            Some(json!({
                "org_name": "Clã Aurora",
                "not_a_setting": "ignored",
                "currentBalance": 250
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settings"]["org_name"], "Clã Aurora");
        assert!(body["settings"].get("not_a_setting").is_none());
        assert_eq!(body["currentBalance"], 250.0);

        let (status, body) = send(
            &state,
            "PUT",
            "/api/settings/balance",
            Some(&admin),
            Some(json!({ "value": "99.5" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["currentBalance"], 99.5);

        let (status, _) = send(
            &state,
            "PUT",
            "/api/settings/balance",
            Some(&admin),
            Some(json!({ "value": "lots" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&state, "GET", "/api/reports/balance", Some(&admin), None).await;
        assert_eq!(body["currentBalance"], 99.5);
        assert_eq!(body["balance"], 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_period_reports() -> Result<()> {
        let state = test_state().await?;
        let admin = admin_token();
        let ana = create_test_member(&state.db, "Ana").await?;
        insert_raw_payment(&state.db, ana.id, 1, 2024, 100.0, true).await?;
        insert_raw_payment(&state.db, ana.id, 2, 2024, 50.0, true).await?;
        insert_raw_payment(&state.db, ana.id, 3, 2024, 70.0, false).await?;
        insert_raw_payment(&state.db, ana.id, 1, 2023, 10.0, true).await?;
        create_test_expense(&state.db, "Aluguel", 30.0, "2024-01-10").await?;
        create_test_expense(&state.db, "Faixa", 8.0, "2023-06-01").await?;

        let (status, body) = send(
            &state,
            "GET",
            "/api/reports/monthly?month=2&year=2024",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["month"], 2);
        assert_eq!(body["total"], 50.0);

        let (status, _) = send(
            &state,
            "GET",
            "/api/reports/monthly?year=2024",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(
            &state,
            "GET",
            "/api/reports/monthly?month=13&year=2024",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &state,
            "GET",
            "/api/reports/annual?year=2024",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 150.0);
        let (status, _) = send(&state, "GET", "/api/reports/annual", Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(
            &state,
            "GET",
            "/api/reports/balance?year=2024",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(body["year"], 2024);
        assert_eq!(body["totalPayments"], 150.0);
        assert_eq!(body["totalExpenses"], 30.0);
        assert_eq!(body["balance"], 120.0);

        let viewer = token_for(Role::Viewer, Some(ana.id));
        let (status, _) = send(
            &state,
            "GET",
            "/api/reports/annual?year=2024",
            Some(&viewer),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn test_raw_report_export() -> Result<()> {
        let state = test_state().await?;
        let admin = admin_token();
        let ana = create_test_member(&state.db, "Ana").await?;
        insert_raw_payment(&state.db, ana.id, 5, 2024, 45.0, false).await?;
        create_test_expense(&state.db, "Lanche", 12.5, "2024-05-03").await?;

        let (status, bytes) = send_raw(
            &state,
            "GET",
            "/api/reports/export?month=5&year=2024",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let csv = String::from_utf8(bytes).unwrap();
        assert_eq!(
            csv.lines().collect::<Vec<_>>(),
            vec!["membro,mes,ano,valor,pago,pago_em", "Ana,05,2024,45.00,não,"]
        );

        let (status, bytes) = send_raw(
            &state,
            "GET",
            "/api/reports/export?type=expenses&year=2024",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let csv = String::from_utf8(bytes).unwrap();
        assert!(csv.starts_with("titulo,valor,data,categoria,observacoes"));
        assert!(csv.contains("Lanche,12.50,03/05/2024"));

        let (status, bytes) = send_raw(
            &state,
            "GET",
            "/api/reports/export?type=expenses&format=pdf",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"%PDF-"));

        let (status, body) = send(
            &state,
            "GET",
            "/api/reports/export?type=members",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        Ok(())
    }
}
