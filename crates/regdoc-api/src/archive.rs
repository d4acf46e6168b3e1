//! Handlers for the archive ledger.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/archive` | Every entry, newest first; optional `document_id` |
//! | `POST` | `/archive/{entry_id}/restore` | Reactivates the entry's document |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use regdoc_core::{
  document::{ArchiveEntry, Document},
  store::DocumentStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub document_id: Option<Uuid>,
}

/// `GET /archive[?document_id=<id>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ArchiveEntry>>, ApiError>
where
  S: DocumentStore,
{
  let entries = match params.document_id {
    Some(id) => state.versions.history(id).await?,
    None => state.versions.list_archive().await?,
  };
  Ok(Json(entries))
}

/// `POST /archive/{entry_id}/restore`
pub async fn restore<S>(
  State(state): State<ApiState<S>>,
  Path(entry_id): Path<Uuid>,
) -> Result<Json<Document>, ApiError>
where
  S: DocumentStore,
{
  Ok(Json(state.versions.restore(entry_id).await?))
}
