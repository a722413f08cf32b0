//! Reports handlers

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{report, DecisionRecord, ReportFilter, ReportSummary};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct ReportPage {
    pub items: Vec<DecisionRecord>,
    pub limit: i64,
    pub offset: i64,
    pub summary: ReportSummary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<ExportFormat>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn validated(filter: &ReportFilter) -> AppResult<()> {
    filter
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))
}

/// List reports with summary counts
pub async fn list(
    State(state): State<AppState>,
    filter: Result<Query<ReportFilter>, QueryRejection>,
) -> AppResult<Json<ReportPage>> {
    let Query(filter) = filter?;
    validated(&filter)?;

    let items = DecisionRecord::list(&state.pool, &filter).await?;
    let summary = DecisionRecord::summary(&state.pool, &filter).await?;

    Ok(Json(ReportPage {
        items,
        limit: filter.limit(),
        offset: filter.offset(),
        summary,
    }))
}

/// Download every report in the range
pub async fn export(
    State(state): State<AppState>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query?;
    let filter = ReportFilter::range(query.from, query.to);
    validated(&filter)?;

    let records = DecisionRecord::list_all(&state.pool, &filter).await?;
    tracing::info!("Exporting {} reports", records.len());

    let response = match query.format.unwrap_or_default() {
        ExportFormat::Csv => {
            let body = report::to_csv(&records)
                .map_err(|e| AppError::InternalError(format!("CSV export failed: {}", e)))?;
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                    (header::CONTENT_DISPOSITION, "attachment; filename=\"reports.csv\""),
                ],
                body,
            )
                .into_response()
        }
        ExportFormat::Json => {
            let body = serde_json::to_vec_pretty(&records)?;
            (
                [
                    (header::CONTENT_TYPE, "application/json"),
                    (header::CONTENT_DISPOSITION, "attachment; filename=\"reports.json\""),
                ],
                body,
            )
                .into_response()
        }
    };

    Ok(response)
}
