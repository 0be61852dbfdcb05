//! HTTP request handlers for web adapter.

use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::adapters::csv_adapter;
use crate::domain::dataset::Record;
use crate::domain::einvoice::{
    CreditNote, EInvoiceResponse, Invoice, InvoiceStatus, ValidationReport, validate_invoice,
};
use crate::domain::error::AnalystError;
use crate::domain::sales_sync::{
    self, DEFAULT_SALES_DATASET, SaleDetail, SalesWindow, SyncReport,
};
use crate::domain::timestamp;
use crate::domain::tools::{self, ToolCall, ToolDeclaration, ToolOutcome};

use super::{AppState, WebError};

type Shared = State<Arc<AppState>>;

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Asistente Analista Financiero API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "financial-assistant" }))
}

#[derive(Debug, Serialize)]
pub struct DataSummary {
    pub data: Vec<Record>,
    pub columns: Vec<String>,
    pub row_count: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub data_summary: DataSummary,
}

pub async fn upload_csv(
    State(state): Shared,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, WebError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| WebError::new(e.status(), e.body_text()))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) = upload.ok_or_else(|| WebError::bad_request("missing 'file' field"))?;
    if !filename.ends_with(".csv") {
        tracing::warn!(filename, "rejecting non-CSV upload");
        return Err(WebError::bad_request("File must be a CSV"));
    }

    let records = csv_adapter::parse_records(&bytes)?;
    let dataset = state.settings.upload_dataset.as_str();
    if state.store.contains(dataset) {
        tracing::info!(dataset, filename, "upload replaces existing dataset");
    }
    let summary = state.store.store(dataset, records);
    let data = state.store.preview(dataset, state.settings.preview_rows)?;

    Ok(Json(UploadResponse {
        message: format!(
            "Successfully uploaded {} rows of financial data",
            summary.row_count
        ),
        data_summary: DataSummary {
            data,
            columns: summary.columns,
            row_count: summary.row_count,
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct DatasetInfo {
    pub dataset_name: String,
    pub columns: Vec<String>,
}

pub async fn list_datasets(State(state): Shared) -> Result<Json<Vec<DatasetInfo>>, WebError> {
    let datasets = state
        .store
        .names()
        .into_iter()
        .map(|name| {
            let columns = state.store.columns(&name)?;
            Ok(DatasetInfo {
                dataset_name: name,
                columns,
            })
        })
        .collect::<Result<Vec<_>, AnalystError>>()?;
    Ok(Json(datasets))
}

pub async fn list_tools() -> Json<Vec<ToolDeclaration>> {
    Json(tools::declarations())
}

pub async fn invoke_tool(
    State(state): Shared,
    Path(name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, WebError> {
    let Json(arguments) = body?;
    tracing::debug!(tool = %name, "invoking tool");
    let result = tools::invoke(&state.store, &ToolCall::new(name, arguments))?;
    Ok(Json(result))
}

pub async fn run_calls(
    State(state): Shared,
    body: Result<Json<Vec<ToolCall>>, JsonRejection>,
) -> Result<Json<Vec<ToolOutcome>>, WebError> {
    let Json(calls) = body?;
    Ok(Json(tools::run_tool_calls(&state.store, &calls)))
}

pub async fn validate(
    body: Result<Json<Invoice>, JsonRejection>,
) -> Result<Json<ValidationReport>, WebError> {
    let Json(invoice) = body?;
    Ok(Json(validate_invoice(&invoice)))
}

pub async fn issue_invoice(
    State(state): Shared,
    body: Result<Json<Invoice>, JsonRejection>,
) -> Result<Json<EInvoiceResponse>, WebError> {
    let Json(invoice) = body?;
    Ok(Json(state.einvoice.issue_invoice(&invoice)))
}

pub async fn issue_credit_note(
    State(state): Shared,
    body: Result<Json<CreditNote>, JsonRejection>,
) -> Result<Json<EInvoiceResponse>, WebError> {
    let Json(note) = body?;
    Ok(Json(state.einvoice.issue_credit_note(&note)))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub cufe: String,
}

pub async fn invoice_status(
    State(state): Shared,
    Path(numero): Path<String>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<InvoiceStatus>, WebError> {
    let Query(query) = query?;
    Ok(Json(state.einvoice.query_status(&numero, &query.cufe)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncRequest {
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub fecha_inicio: Option<chrono::NaiveDateTime>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub fecha_fin: Option<chrono::NaiveDateTime>,
    #[serde(default)]
    pub limite: Option<usize>,
    #[serde(default)]
    pub dataset_name: Option<String>,
}

/// An empty body syncs the configured look-back window into `ventas`.
pub async fn sync_sales(
    State(state): Shared,
    body: Result<Json<Option<SyncRequest>>, JsonRejection>,
) -> Result<Json<SyncReport>, WebError> {
    let request = match body {
        Ok(Json(request)) => request.unwrap_or_default(),
        Err(JsonRejection::MissingJsonContentType(_)) => SyncRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    let window = SalesWindow::resolve(
        request.fecha_inicio,
        request.fecha_fin,
        request.limite,
        &state.settings.sales,
        chrono::Local::now().naive_local(),
    )?;
    let dataset = request
        .dataset_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SALES_DATASET.to_string());
    let report = sales_sync::sync_sales(state.sales.as_ref(), &state.store, &dataset, &window)?;
    Ok(Json(report))
}

pub async fn sale_details(
    State(state): Shared,
    Path(sale_id): Path<String>,
) -> Result<Json<SaleDetail>, WebError> {
    Ok(Json(state.sales.sale_details(&sale_id)?))
}

pub async fn not_found() -> WebError {
    WebError::not_found("route not found")
}
