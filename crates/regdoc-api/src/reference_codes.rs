//! Handlers for `/reference-codes` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reference-codes/prefix` | Optional `location`, `document_type_id`, `section_id` |
//! | `GET`  | `/reference-codes/availability` | `?code` required; optional `exclude` |
//! | `GET`  | `/reference-codes/suggestions` | `?code` required |

use axum::{
  Json,
  extract::{Query, State},
};
use regdoc_core::{document::Location, reference::Availability, store::DocumentStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Prefix ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PrefixParams {
  pub location:         Option<Location>,
  pub document_type_id: Option<Uuid>,
  pub section_id:       Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrefixResponse {
  pub prefix: String,
}

/// `GET /reference-codes/prefix?location=England[&document_type_id=...][&section_id=...]`
pub async fn prefix<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<PrefixParams>,
) -> Result<Json<PrefixResponse>, ApiError>
where
  S: DocumentStore,
{
  let prefix = state
    .codes
    .build_prefix(params.location, params.document_type_id, params.section_id)
    .await?;
  Ok(Json(PrefixResponse { prefix }))
}

// ─── Availability ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
  pub code:    String,
  /// The document being edited, which may keep its own code.
  pub exclude: Option<Uuid>,
}

/// `GET /reference-codes/availability?code=EN-POL-1-001[&exclude=<id>]`
pub async fn availability<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<AvailabilityParams>,
) -> Result<Json<Availability>, ApiError>
where
  S: DocumentStore,
{
  let availability = state
    .codes
    .check_availability(&params.code, params.exclude)
    .await?;
  Ok(Json(availability))
}

// ─── Suggestions ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SuggestionParams {
  pub code: String,
}

/// `GET /reference-codes/suggestions?code=EN-POL-1-002`
pub async fn suggestions<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<SuggestionParams>,
) -> Result<Json<Vec<String>>, ApiError>
where
  S: DocumentStore,
{
  Ok(Json(state.codes.suggest(&params.code).await?))
}
