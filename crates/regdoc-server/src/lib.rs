//! HTTP server assembly for the regdoc document register.
//!
//! Mounts the JSON API from [`regdoc_api`] under `/api`, wrapped in request
//! tracing, over any [`DocumentStore`].

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use regdoc_api::{ApiState, api_router};
use regdoc_core::{projection::DEFAULT_DUE_SOON_DAYS, store::DocumentStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `REGDOC_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub store_path:    PathBuf,
  /// Look-ahead window for the "due soon" review status.
  #[serde(default = "default_due_soon_days")]
  pub due_soon_days: i64,
}

fn default_due_soon_days() -> i64 { DEFAULT_DUE_SOON_DAYS }

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete application router for `store`.
pub fn router<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: DocumentStore + 'static,
{
  let state = ApiState::new(store).with_due_soon_days(config.due_soon_days);

  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
  };
  use regdoc_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  async fn make_app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let config = ServerConfig {
      host:          "127.0.0.1".to_string(),
      port:          8080,
      store_path:    PathBuf::from(":memory:"),
      due_soon_days: DEFAULT_DUE_SOON_DAYS,
    };
    router(Arc::new(store), &config)
  }

  async fn send(
    app:     &Router,
    method:  &str,
    uri:     &str,
    headers: Vec<(header::HeaderName, &str)>,
    body:    Option<Value>,
  ) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = match body {
      Some(json) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, value)
  }

  /// Seed one standard, one `POL` document type and top-level section `1`.
  /// Returns `(type_id, section_id)`.
  async fn seed(app: &Router) -> (String, String) {
    let (status, _, standard) =
      send(app, "POST", "/api/standards", vec![], Some(json!({ "name": "ISO 9001" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, _, doc_type) = send(
      app,
      "POST",
      "/api/document-types",
      vec![],
      Some(json!({ "name": "Policy", "code": "pol" })),
    )
    .await;

    let (status, _, section) = send(
      app,
      "POST",
      "/api/sections",
      vec![],
      Some(json!({ "code": "1", "title": "Scope", "standard_id": standard["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (
      doc_type["id"].as_str().unwrap().to_string(),
      section["id"].as_str().unwrap().to_string(),
    )
  }

  fn document_body(type_id: &str, section_id: &str, code: &str) -> Value {
    json!({
      "title": "Quality policy",
      "document_type_id": type_id,
      "location": "England",
      "section_id": section_id,
      "reference_code": code,
      "file_url": null,
      "notes": null,
      "review_period_months": 12,
      "actor": "qa@example.com",
    })
  }

  // ── Health ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_returns_ok() {
    let app = make_app().await;
    let resp = app
      .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  // ── Documents ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_returns_201_and_get_returns_same_etag() {
    let app = make_app().await;
    let (type_id, section_id) = seed(&app).await;

    let (status, headers, doc) = send(
      &app,
      "POST",
      "/api/documents",
      vec![],
      Some(document_body(&type_id, &section_id, "en-pol-1-001")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(doc["reference_code"], "EN-POL-1-001");
    assert_eq!(doc["current_version"], 1);
    let etag = headers.get(header::ETAG).unwrap().clone();

    let (status, headers, fetched) =
      send(&app, "GET", &format!("/api/documents/{}", doc["id"].as_str().unwrap()), vec![], None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, doc);
    assert_eq!(headers.get(header::ETAG), Some(&etag));
  }

  #[tokio::test]
  async fn missing_required_field_is_422() {
    let app = make_app().await;
    let (type_id, section_id) = seed(&app).await;
    let mut body = document_body(&type_id, &section_id, "EN-POL-1-001");
    body.as_object_mut().unwrap().remove("title");

    let (status, _, _) = send(&app, "POST", "/api/documents", vec![], Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _, err) = send(
      &app,
      "POST",
      "/api/documents",
      vec![],
      Some(document_body(&type_id, &section_id, "   ")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(err["error"].as_str().unwrap().contains("reference code"));
  }

  #[tokio::test]
  async fn duplicate_code_in_other_section_is_409() {
    let app = make_app().await;
    let (type_id, section_id) = seed(&app).await;
    send(&app, "POST", "/api/documents", vec![], Some(document_body(&type_id, &section_id, "EN-POL-1-001"))).await;

    let (_, _, other) = send(
      &app,
      "POST",
      "/api/sections",
      vec![],
      Some(json!({ "code": "2", "title": "Context" })),
    )
    .await;
    let other_id = other["id"].as_str().unwrap();

    let (status, _, err) = send(
      &app,
      "POST",
      "/api/documents",
      vec![],
      Some(document_body(&type_id, other_id, "EN-POL-1-001")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(err["error"].as_str().unwrap().contains("EN-POL-1-001"));
  }

  #[tokio::test]
  async fn put_honours_if_match() {
    let app = make_app().await;
    let (type_id, section_id) = seed(&app).await;
    let (_, headers, doc) = send(
      &app,
      "POST",
      "/api/documents",
      vec![],
      Some(document_body(&type_id, &section_id, "EN-POL-1-001")),
    )
    .await;
    let uri = format!("/api/documents/{}", doc["id"].as_str().unwrap());
    let etag = headers.get(header::ETAG).unwrap().to_str().unwrap().to_string();

    let (status, _, _) = send(
      &app,
      "PUT",
      &uri,
      vec![(header::IF_MATCH, "\"stale-etag\"")],
      Some(document_body(&type_id, &section_id, "EN-POL-1-001")),
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    let (status, headers, edited) = send(
      &app,
      "PUT",
      &uri,
      vec![(header::IF_MATCH, etag.as_str())],
      Some(document_body(&type_id, &section_id, "EN-POL-1-001")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["current_version"], 2);
    assert_ne!(headers.get(header::ETAG).unwrap().to_str().unwrap(), etag);

    // The first tag is now stale for amendments too.
    let (status, _, _) = send(
      &app,
      "PATCH",
      &uri,
      vec![(header::IF_MATCH, etag.as_str())],
      Some(json!({
        "title": "Quality Policy",
        "document_type_id": type_id,
        "section_id": section_id,
        "reference_code": "EN-POL-1-001",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
  }

  #[tokio::test]
  async fn patch_amends_without_new_version() {
    let app = make_app().await;
    let (type_id, section_id) = seed(&app).await;
    let (_, _, doc) = send(
      &app,
      "POST",
      "/api/documents",
      vec![],
      Some(document_body(&type_id, &section_id, "EN-POL-1-001")),
    )
    .await;
    let uri = format!("/api/documents/{}", doc["id"].as_str().unwrap());

    let (status, _, amended) = send(
      &app,
      "PATCH",
      &uri,
      vec![],
      Some(json!({
        "title": "Quality Policy",
        "document_type_id": type_id,
        "section_id": section_id,
        "reference_code": "EN-POL-1-001",
        "notes": "typo fixed",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amended["current_version"], 1);
    assert_eq!(amended["title"], "Quality Policy");
    assert_eq!(amended["review_period_months"], 12);
  }

  #[tokio::test]
  async fn patch_with_if_match_rejects_an_intervening_amendment() {
    let app = make_app().await;
    let (type_id, section_id) = seed(&app).await;
    let (_, headers, doc) = send(
      &app,
      "POST",
      "/api/documents",
      vec![],
      Some(document_body(&type_id, &section_id, "EN-POL-1-001")),
    )
    .await;
    let uri = format!("/api/documents/{}", doc["id"].as_str().unwrap());
    let etag = headers.get(header::ETAG).unwrap().to_str().unwrap().to_string();
    let amendment = |notes: &str| {
      json!({
        "title": "Quality policy",
        "document_type_id": type_id,
        "section_id": section_id,
        "reference_code": "EN-POL-1-001",
        "notes": notes,
      })
    };

    let (status, _, first) =
      send(&app, "PATCH", &uri, vec![(header::IF_MATCH, etag.as_str())], Some(amendment("first")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["current_version"], 1);

    let (status, _, _) =
      send(&app, "PATCH", &uri, vec![(header::IF_MATCH, etag.as_str())], Some(amendment("second")))
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    let (_, _, stored) = send(&app, "GET", &uri, vec![], None).await;
    assert_eq!(stored["notes"], "first");
  }

  #[tokio::test]
  async fn unknown_document_is_404_with_json_error() {
    let app = make_app().await;
    let (status, _, err) =
      send(&app, "GET", &format!("/api/documents/{}", Uuid::new_v4()), vec![], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(err["error"].is_string());
  }

  // ── Archive ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn archive_and_restore_round_trip() {
    let app = make_app().await;
    let (type_id, section_id) = seed(&app).await;
    let (_, _, doc) = send(
      &app,
      "POST",
      "/api/documents",
      vec![],
      Some(document_body(&type_id, &section_id, "EN-POL-1-001")),
    )
    .await;
    let id = doc["id"].as_str().unwrap();

    let (status, _, _) = send(
      &app,
      "POST",
      &format!("/api/documents/{id}/archive"),
      vec![],
      Some(json!({ "actor": "auditor" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _, entry) = send(
      &app,
      "POST",
      &format!("/api/documents/{id}/archive"),
      vec![],
      Some(json!({ "summary": "Withdrawn", "actor": "auditor" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["archived_version"], 1);

    let (_, _, ledger) = send(&app, "GET", "/api/archive", vec![], None).await;
    assert_eq!(ledger.as_array().unwrap().len(), 1);

    let (status, _, _) = send(&app, "POST", &format!("/api/documents/{id}/review"), vec![], None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, restored) = send(
      &app,
      "POST",
      &format!("/api/archive/{}/restore", entry["id"].as_str().unwrap()),
      vec![],
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["archived"], false);

    let (_, _, history) =
      send(&app, "GET", &format!("/api/documents/{id}/history"), vec![], None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
  }

  // ── Reference codes ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn reference_code_endpoints() {
    let app = make_app().await;
    let (type_id, section_id) = seed(&app).await;
    for code in ["EN-POL-1-001", "EN-POL-1-002"] {
      send(&app, "POST", "/api/documents", vec![], Some(document_body(&type_id, &section_id, code)))
        .await;
    }

    let (_, _, prefix) = send(
      &app,
      "GET",
      &format!("/api/reference-codes/prefix?location=England&document_type_id={type_id}"),
      vec![],
      None,
    )
    .await;
    assert_eq!(prefix["prefix"], "EN-POL");

    let (_, _, availability) = send(
      &app,
      "GET",
      "/api/reference-codes/availability?code=EN-POL-1-002",
      vec![],
      None,
    )
    .await;
    assert_eq!(availability["available"], false);

    let (_, _, suggestions) = send(
      &app,
      "GET",
      "/api/reference-codes/suggestions?code=EN-POL-1-002",
      vec![],
      None,
    )
    .await;
    assert_eq!(
      suggestions,
      json!(["ENPOL1-003", "ENPOL1-004", "ENPOL1-005", "ENPOL1-006", "ENPOL1-007"])
    );
  }

  // ── Classification ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn section_cycle_is_409_and_listing_is_natural() {
    let app = make_app().await;
    let (_, top_id) = seed(&app).await;
    let (_, _, child) = send(
      &app,
      "POST",
      "/api/sections",
      vec![],
      Some(json!({ "code": "1.1", "title": "Detail", "parent_section_id": top_id })),
    )
    .await;

    let (status, _, _) = send(
      &app,
      "POST",
      "/api/sections",
      vec![],
      Some(json!({ "id": top_id, "code": "1", "title": "Scope", "parent_section_id": child["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for code in ["10", "2"] {
      send(&app, "POST", "/api/sections", vec![], Some(json!({ "code": code, "title": code }))).await;
    }
    let (_, _, sections) = send(&app, "GET", "/api/sections", vec![], None).await;
    let codes: Vec<&str> = sections
      .as_array()
      .unwrap()
      .iter()
      .map(|s| s["code"].as_str().unwrap())
      .collect();
    assert_eq!(codes, ["1", "1.1", "2", "10"]);
  }

  #[tokio::test]
  async fn deleting_standard_returns_204_then_404() {
    let app = make_app().await;
    let (_, _, standard) =
      send(&app, "POST", "/api/standards", vec![], Some(json!({ "name": "ISO 14001" }))).await;
    let uri = format!("/api/standards/{}", standard["id"].as_str().unwrap());

    let (status, _, _) = send(&app, "DELETE", &uri, vec![], None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&app, "DELETE", &uri, vec![], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Compliance ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn compliance_listing_and_summary() {
    let app = make_app().await;
    let (type_id, section_id) = seed(&app).await;
    for code in ["EN-POL-1-010", "EN-POL-1-002"] {
      send(&app, "POST", "/api/documents", vec![], Some(document_body(&type_id, &section_id, code)))
        .await;
    }

    let (status, _, rows) =
      send(&app, "GET", "/api/documents?sort=reference_code&direction=desc", vec![], None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows[0]["reference_code"], "EN-POL-1-010");
    assert_eq!(rows[0]["standard_name"], "ISO 9001");
    assert_eq!(rows[0]["complete"], true);

    let (_, _, summary) = send(&app, "GET", "/api/compliance/summary", vec![], None).await;
    assert_eq!(summary["active"], 2);
    assert_eq!(summary["archived"], 0);
    assert_eq!(summary["incomplete"], 0);
  }
}
