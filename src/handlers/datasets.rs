//! Dataset handlers

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{validate_filename, DatasetMeta, DecisionRecord, FlowContext, ReportSummary, TrafficContext};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct DatasetList {
    pub datasets: Vec<DatasetMeta>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeDatasetQuery {
    #[validate(range(min = 1))]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeDatasetResponse {
    pub dataset_id: Uuid,
    pub processed: usize,
    pub summary: ReportSummary,
    pub results: Vec<DecisionRecord>,
}

/// Upload a CSV dataset (multipart field `file`)
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DatasetMeta>)> {
    let max_bytes = state.datasets.max_bytes();

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        validate_filename(&filename)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "File too large (max {}MB)",
                    max_bytes / (1024 * 1024)
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        let meta = state.datasets.save(&filename, bytes).await?;
        return Ok((StatusCode::CREATED, Json(meta)));
    }

    Err(AppError::ValidationError("No file field 'file' in form-data".to_string()))
}

/// List uploaded datasets, newest first
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DatasetList>> {
    let datasets = state.datasets.list().await?;
    Ok(Json(DatasetList { datasets }))
}

/// Get single dataset
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<DatasetMeta>> {
    let Path(id) = id?;
    let meta = state.datasets.get(id).await?;
    Ok(Json(meta))
}

/// Replay dataset rows through the decision pipeline
///
/// Rows are processed in order, capped at the configured row limit.
pub async fn analyze(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<AnalyzeDatasetQuery>, QueryRejection>,
) -> AppResult<Json<AnalyzeDatasetResponse>> {
    let Path(id) = id?;
    let Query(query) = query?;
    query
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let cap = state.config.dataset_row_limit;
    let limit = query.limit.map_or(cap, |l| l.min(cap));

    let meta = state.datasets.get(id).await?;
    let rows = state.datasets.read_rows(&meta, limit).await?;

    let mut results = Vec::with_capacity(rows.len());
    for (row_index, row) in rows.into_iter().enumerate() {
        let (observation, from_row) = match row.observation() {
            Some(obs) => (obs, true),
            None => (state.engine.sample_flow(), false),
        };

        let decision = state.engine.evaluate(&observation);
        let context = TrafficContext::dataset(
            meta.dataset_id,
            row_index,
            from_row,
            FlowContext::from_decision(&decision, None),
        );
        let record = DecisionRecord::from_decision(&decision, context, row.into_value());
        record.insert(&state.pool).await?;
        results.push(record);
    }

    let summary = ReportSummary::tally(results.iter().map(|r| &r.decision_status));
    tracing::info!(
        "Dataset {} replayed: {} rows ({} non-normal)",
        meta.dataset_id,
        results.len(),
        summary.non_normal
    );

    Ok(Json(AnalyzeDatasetResponse {
        dataset_id: meta.dataset_id,
        processed: results.len(),
        summary,
        results,
    }))
}
