//! JSON REST API for the regdoc document register.
//!
//! Exposes an axum [`Router`] backed by any [`regdoc_core::store::DocumentStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", regdoc_api::api_router(ApiState::new(store.clone())))
//! ```

pub mod archive;
pub mod classification;
pub mod compliance;
pub mod documents;
pub mod error;
pub mod etag;
pub mod reference_codes;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use regdoc_core::{
  classification::ClassificationStore, lifecycle::VersionManager,
  projection::ComplianceProjection, reference::ReferenceCodeAllocator, store::DocumentStore,
};

pub use error::ApiError;

// ─── State ───────────────────────────────────────────────────────────────────

/// The core components every handler draws on, all sharing one store.
pub struct ApiState<S> {
  pub classes:    ClassificationStore<S>,
  pub codes:      ReferenceCodeAllocator<S>,
  pub versions:   VersionManager<S>,
  pub compliance: ComplianceProjection<S>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      classes:    self.classes.clone(),
      codes:      self.codes.clone(),
      versions:   self.versions.clone(),
      compliance: self.compliance.clone(),
    }
  }
}

impl<S: DocumentStore> ApiState<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      classes:    ClassificationStore::new(Arc::clone(&store)),
      codes:      ReferenceCodeAllocator::new(Arc::clone(&store)),
      versions:   VersionManager::new(Arc::clone(&store)),
      compliance: ComplianceProjection::new(store),
    }
  }

  /// Replace the version manager, e.g. to install a custom notifier.
  pub fn with_versions(mut self, versions: VersionManager<S>) -> Self {
    self.versions = versions;
    self
  }

  pub fn with_due_soon_days(mut self, days: i64) -> Self {
    self.compliance = self.compliance.with_due_soon_days(days);
    self
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: DocumentStore + 'static,
{
  Router::new()
    // Documents
    .route(
      "/documents",
      get(documents::list::<S>).post(documents::create::<S>),
    )
    .route(
      "/documents/{id}",
      get(documents::get_one::<S>)
        .put(documents::edit::<S>)
        .patch(documents::amend::<S>),
    )
    .route("/documents/{id}/review", post(documents::review::<S>))
    .route("/documents/{id}/archive", post(documents::archive::<S>))
    .route("/documents/{id}/history", get(documents::history::<S>))
    // Archive ledger
    .route("/archive", get(archive::list::<S>))
    .route("/archive/{entry_id}/restore", post(archive::restore::<S>))
    // Reference codes
    .route("/reference-codes/prefix", get(reference_codes::prefix::<S>))
    .route(
      "/reference-codes/availability",
      get(reference_codes::availability::<S>),
    )
    .route(
      "/reference-codes/suggestions",
      get(reference_codes::suggestions::<S>),
    )
    // Classification
    .route(
      "/standards",
      get(classification::list_standards::<S>).post(classification::create_standard::<S>),
    )
    .route(
      "/standards/{id}",
      put(classification::rename_standard::<S>).delete(classification::delete_standard::<S>),
    )
    .route(
      "/document-types",
      get(classification::list_document_types::<S>)
        .post(classification::create_document_type::<S>),
    )
    .route(
      "/sections",
      get(classification::list_sections::<S>).post(classification::upsert_section::<S>),
    )
    .route(
      "/sections/parent-options",
      get(classification::parent_options::<S>),
    )
    // Dashboard
    .route("/compliance/summary", get(compliance::summary::<S>))
    .with_state(state)
}
