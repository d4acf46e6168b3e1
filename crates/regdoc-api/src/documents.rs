//! Handlers for `/documents` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/documents` | Compliance rows; optional `text`, `standard_id`, `document_type_id`, `include_archived`, `sort`, `direction` |
//! | `POST`  | `/documents` | Body: [`NewDocumentInput`]; returns 201 + stored document |
//! | `GET`   | `/documents/{id}` | Single document with `ETag` |
//! | `PUT`   | `/documents/{id}` | New version. Body: [`DocumentMeta`]; honours `If-Match` |
//! | `PATCH` | `/documents/{id}` | In-place correction. Body: [`DocumentAmendment`]; honours `If-Match` |
//! | `POST`  | `/documents/{id}/review` | Stamp the review date |
//! | `POST`  | `/documents/{id}/archive` | Body: `{"summary":"...","actor":"..."}`; returns 201 + ledger entry |
//! | `GET`   | `/documents/{id}/history` | Ledger entries, newest first |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use regdoc_core::{
  document::{ArchiveEntry, Document, DocumentAmendment, DocumentMeta, NewDocumentInput},
  projection::{ComplianceRow, ProjectionFilter, SortColumn, SortDirection},
  store::DocumentStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  ApiState,
  error::ApiError,
  etag::{check_if_match, document_etag},
};

/// A document response carrying its `ETag`.
fn tagged(status: StatusCode, doc: Document) -> impl IntoResponse {
  let etag = document_etag(&doc);
  (status, [(header::ETAG, etag)], Json(doc))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub text:             Option<String>,
  pub standard_id:      Option<Uuid>,
  pub document_type_id: Option<Uuid>,
  #[serde(default)]
  pub include_archived: bool,
  #[serde(default)]
  pub sort:             SortColumn,
  #[serde(default)]
  pub direction:        SortDirection,
}

/// `GET /documents[?text=...][&standard_id=...][&sort=title&direction=desc]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ComplianceRow>>, ApiError>
where
  S: DocumentStore,
{
  let filter = ProjectionFilter {
    text:             params.text,
    standard_id:      params.standard_id,
    document_type_id: params.document_type_id,
    include_archived: params.include_archived,
  };
  let rows = state
    .compliance
    .rows(&filter, params.sort, params.direction)
    .await?;
  Ok(Json(rows))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /documents/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
{
  let doc = state.versions.get(id).await?;
  Ok(tagged(StatusCode::OK, doc))
}

/// `GET /documents/{id}/history`
pub async fn history<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ArchiveEntry>>, ApiError>
where
  S: DocumentStore,
{
  Ok(Json(state.versions.history(id).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /documents`: returns 201 + the stored [`Document`]. Supersedes an
/// active document with the same reference code and section.
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewDocumentInput>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
{
  let doc = state.versions.create(body).await?;
  Ok(tagged(StatusCode::CREATED, doc))
}

// ─── Edit / amend ─────────────────────────────────────────────────────────────

/// The current document, when `If-Match` is present and matches it.
async fn precondition<S>(
  state: &ApiState<S>,
  headers: &HeaderMap,
  id: Uuid,
) -> Result<Option<Document>, ApiError>
where
  S: DocumentStore,
{
  if !headers.contains_key(header::IF_MATCH) {
    return Ok(None);
  }
  let current = state.versions.get(id).await?;
  check_if_match(headers, &current)?;
  Ok(Some(current))
}

/// `PUT /documents/{id}`: save as the next version.
pub async fn edit<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<DocumentMeta>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
{
  let expected = precondition(&state, &headers, id)
    .await?
    .map(|d| d.current_version);
  let doc = state.versions.edit(id, body, expected).await?;
  Ok(tagged(StatusCode::OK, doc))
}

/// `PATCH /documents/{id}`: correct metadata without a new version. With
/// `If-Match`, the write is conditional on the row the tag matched.
pub async fn amend<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<DocumentAmendment>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
{
  let doc = match precondition(&state, &headers, id).await? {
    Some(read) => state.versions.amend_read(read, body).await?,
    None => state.versions.amend(id, body, None).await?,
  };
  Ok(tagged(StatusCode::OK, doc))
}

// ─── Review ───────────────────────────────────────────────────────────────────

/// `POST /documents/{id}/review`
pub async fn review<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
{
  let doc = state.versions.review(id).await?;
  Ok(tagged(StatusCode::OK, doc))
}

// ─── Archive ──────────────────────────────────────────────────────────────────

/// Missing fields are left blank so the version manager reports them as
/// [`MissingSummary`](regdoc_core::Error::MissingSummary) /
/// [`MissingActor`](regdoc_core::Error::MissingActor).
#[derive(Debug, Deserialize)]
pub struct ArchiveBody {
  #[serde(default)]
  pub summary: String,
  #[serde(default)]
  pub actor:   String,
}

/// `POST /documents/{id}/archive`: returns 201 + the new ledger entry.
pub async fn archive<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ArchiveBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
{
  let entry = state.versions.archive(id, &body.summary, &body.actor).await?;
  Ok((StatusCode::CREATED, Json(entry)))
}
