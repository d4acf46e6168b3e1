//! `GET /compliance/summary`: dashboard counts.

use axum::{Json, extract::State};
use regdoc_core::{projection::ComplianceSummary, store::DocumentStore};

use crate::{ApiState, error::ApiError};

pub async fn summary<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<ComplianceSummary>, ApiError>
where
  S: DocumentStore,
{
  Ok(Json(state.compliance.summary().await?))
}
