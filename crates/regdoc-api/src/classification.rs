//! Handlers for standards, document types and sections.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/standards` | Natural order by name |
//! | `POST`   | `/standards` | Body: `{"name":"..."}`; returns 201 |
//! | `PUT`    | `/standards/{id}` | Body: `{"name":"..."}` |
//! | `DELETE` | `/standards/{id}` | 204; references are left dangling |
//! | `GET`    | `/document-types` | Natural order by name |
//! | `POST`   | `/document-types` | Body: `{"name":"...","code":"..."}`; returns 201 |
//! | `GET`    | `/sections` | Natural order by code; optional `standard_id` |
//! | `POST`   | `/sections` | Body: [`SectionInput`]; creates or replaces |
//! | `GET`    | `/sections/parent-options` | Optional `section_id` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use regdoc_core::{
  classification::{DocumentType, Section, SectionInput, Standard},
  store::DocumentStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Standards ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StandardBody {
  pub name: String,
}

/// `GET /standards`
pub async fn list_standards<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Standard>>, ApiError>
where
  S: DocumentStore,
{
  Ok(Json(state.classes.list_standards().await?))
}

/// `POST /standards`
pub async fn create_standard<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<StandardBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
{
  let standard = state.classes.create_standard(body.name).await?;
  Ok((StatusCode::CREATED, Json(standard)))
}

/// `PUT /standards/{id}`
pub async fn rename_standard<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StandardBody>,
) -> Result<Json<Standard>, ApiError>
where
  S: DocumentStore,
{
  Ok(Json(state.classes.rename_standard(id, body.name).await?))
}

/// `DELETE /standards/{id}`
pub async fn delete_standard<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore,
{
  state.classes.delete_standard(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Document types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DocumentTypeBody {
  pub name: String,
  pub code: String,
}

/// `GET /document-types`
pub async fn list_document_types<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<DocumentType>>, ApiError>
where
  S: DocumentStore,
{
  Ok(Json(state.classes.list_document_types().await?))
}

/// `POST /document-types`
pub async fn create_document_type<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<DocumentTypeBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
{
  let document_type = state
    .classes
    .create_document_type(body.name, body.code)
    .await?;
  Ok((StatusCode::CREATED, Json(document_type)))
}

// ─── Sections ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SectionListParams {
  pub standard_id: Option<Uuid>,
}

/// `GET /sections[?standard_id=<id>]`
pub async fn list_sections<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<SectionListParams>,
) -> Result<Json<Vec<Section>>, ApiError>
where
  S: DocumentStore,
{
  Ok(Json(state.classes.list_sections(params.standard_id).await?))
}

/// `POST /sections`. With an `id` of an existing section, replaces it.
pub async fn upsert_section<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<SectionInput>,
) -> Result<Json<Section>, ApiError>
where
  S: DocumentStore,
{
  Ok(Json(state.classes.upsert_section(body).await?))
}

#[derive(Debug, Deserialize)]
pub struct ParentOptionsParams {
  /// The section being edited, excluded from its own options.
  pub section_id: Option<Uuid>,
}

/// `GET /sections/parent-options[?section_id=<id>]`
pub async fn parent_options<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ParentOptionsParams>,
) -> Result<Json<Vec<Section>>, ApiError>
where
  S: DocumentStore,
{
  Ok(Json(state.classes.parent_options(params.section_id).await?))
}
