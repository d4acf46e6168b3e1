//! Error types for `regdoc-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  // ── Validation ──────────────────────────────────────────────────────────
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("a change summary is required")]
  MissingSummary,

  #[error("an acting user is required")]
  MissingActor,

  // ── Conflicts ───────────────────────────────────────────────────────────
  #[error("reference code {0:?} is already used by an active document")]
  DuplicateReferenceCode(String),

  #[error("section {0} cannot be its own parent")]
  SelfParent(Uuid),

  #[error("assigning parent {parent} to section {section} would create a cycle")]
  Cycle { section: Uuid, parent: Uuid },

  #[error("section hierarchy is limited to two levels: {0}")]
  DepthExceeded(String),

  #[error("document {id} changed concurrently (expected version {expected})")]
  StaleVersion { id: Uuid, expected: u32 },

  #[error("document {0} is archived")]
  Archived(Uuid),

  // ── Not found ───────────────────────────────────────────────────────────
  #[error("document not found: {0}")]
  DocumentNotFound(Uuid),

  #[error("archive entry not found: {0}")]
  ArchiveEntryNotFound(Uuid),

  #[error("section not found: {0}")]
  SectionNotFound(Uuid),

  #[error("standard not found: {0}")]
  StandardNotFound(Uuid),

  #[error("document type not found: {0}")]
  DocumentTypeNotFound(Uuid),

  // ── Pass-through ────────────────────────────────────────────────────────
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error without altering it.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Whether the error reports a missing row rather than a rejected request.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::DocumentNotFound(_)
        | Self::ArchiveEntryNotFound(_)
        | Self::SectionNotFound(_)
        | Self::StandardNotFound(_)
        | Self::DocumentTypeNotFound(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
