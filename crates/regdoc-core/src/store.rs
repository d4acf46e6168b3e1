//! The `DocumentStore` trait and its write outcomes.
//!
//! The trait is implemented by storage backends (e.g. `regdoc-store-sqlite`).
//! The lifecycle components in this crate depend on this abstraction, never on
//! a concrete backend, and receive it explicitly at construction.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  classification::{DocumentType, Section, Standard},
  document::{ArchiveEntry, Document, DocumentAmendment},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of a conditional write against the `documents` table.
///
/// Backends report rule violations through this type rather than through
/// `Self::Error` so callers can tell a rejected write from a broken store.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<T> {
  Written(T),
  /// The write would leave two active documents with the same reference
  /// code. Nothing was written.
  ReferenceCodeTaken,
  /// The target row was missing or no longer in the expected state (wrong
  /// version, or already archived/active). Nothing was written.
  Conflict,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a regdoc storage backend.
///
/// Implementations must guarantee, atomically at write time, that no two
/// non-archived documents share a reference code, and that the multi-step
/// writes ([`supersede`](Self::supersede),
/// [`archive_document`](Self::archive_document)) persist the ledger entry
/// before flipping the archived flag, with no partial result visible on
/// failure.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Standards ─────────────────────────────────────────────────────────

  fn insert_standard(
    &self,
    standard: Standard,
  ) -> impl Future<Output = Result<Standard, Self::Error>> + Send + '_;

  /// Returns `None` if the standard does not exist.
  fn rename_standard(
    &self,
    id: Uuid,
    name: String,
  ) -> impl Future<Output = Result<Option<Standard>, Self::Error>> + Send + '_;

  /// Delete without cascading. References from sections and documents are
  /// left dangling. Returns whether a row was removed.
  fn delete_standard(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_standard(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Standard>, Self::Error>> + Send + '_;

  fn list_standards(
    &self,
  ) -> impl Future<Output = Result<Vec<Standard>, Self::Error>> + Send + '_;

  // ── Document types ────────────────────────────────────────────────────

  fn insert_document_type(
    &self,
    document_type: DocumentType,
  ) -> impl Future<Output = Result<DocumentType, Self::Error>> + Send + '_;

  fn get_document_type(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<DocumentType>, Self::Error>> + Send + '_;

  fn list_document_types(
    &self,
  ) -> impl Future<Output = Result<Vec<DocumentType>, Self::Error>> + Send + '_;

  // ── Sections ──────────────────────────────────────────────────────────

  /// Insert the section, or replace every column of an existing row with the
  /// same id.
  fn save_section(
    &self,
    section: Section,
  ) -> impl Future<Output = Result<Section, Self::Error>> + Send + '_;

  fn get_section(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Section>, Self::Error>> + Send + '_;

  /// All sections, or only those classified under `standard_id`. Order is
  /// unspecified.
  fn list_sections(
    &self,
    standard_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Section>, Self::Error>> + Send + '_;

  // ── Documents: reads ─ ─────────────────────────────────────────────────

  fn get_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  fn list_documents(
    &self,
    include_archived: bool,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;

  /// The active document holding exactly `code`, ignoring `exclude`.
  fn find_active_by_code(
    &self,
    code: String,
    exclude: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// Reference codes of active documents starting with any of `prefixes`.
  fn active_codes_with_prefixes(
    &self,
    prefixes: Vec<String>,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  // ── Documents: conditional writes ─ ────────────────────────────────────

  /// Insert a new active document.
  fn insert_document(
    &self,
    document: Document,
  ) -> impl Future<Output = Result<WriteOutcome<Document>, Self::Error>> + Send + '_;

  /// In one transaction: append `entry`, flag `entry.document_id` archived
  /// (only if it is still active at `entry.archived_version`), then insert
  /// `replacement`. Any failure rolls back all three steps.
  fn supersede(
    &self,
    entry: ArchiveEntry,
    replacement: Document,
  ) -> impl Future<Output = Result<WriteOutcome<Document>, Self::Error>> + Send + '_;

  /// Overwrite every mutable column of an active document, provided its
  /// stored version is still `expected_version`.
  fn replace_document(
    &self,
    document: Document,
    expected_version: u32,
  ) -> impl Future<Output = Result<WriteOutcome<Document>, Self::Error>> + Send + '_;

  /// Write only the amendment columns of an active document, provided the
  /// stored row still matches `read` in its version and in every amendment
  /// column. Amending leaves the version alone, so the version by itself
  /// cannot detect a concurrent amend.
  fn amend_document(
    &self,
    read: Document,
    amendment: DocumentAmendment,
  ) -> impl Future<Output = Result<WriteOutcome<Document>, Self::Error>> + Send + '_;

  /// Set `last_reviewed_at` on an active document.
  fn mark_reviewed(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<WriteOutcome<Document>, Self::Error>> + Send + '_;

  /// In one transaction: append `entry`, then flag `entry.document_id`
  /// archived (only if it is still active at `entry.archived_version`).
  fn archive_document(
    &self,
    entry: ArchiveEntry,
  ) -> impl Future<Output = Result<WriteOutcome<ArchiveEntry>, Self::Error>> + Send + '_;

  /// Clear the archived flag on an archived document.
  fn restore_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<WriteOutcome<Document>, Self::Error>> + Send + '_;

  // ── Archive ledger ────────────────────────────────────────────────────

  fn get_archive_entry(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ArchiveEntry>, Self::Error>> + Send + '_;

  /// Ledger entries, newest first, optionally for one document only.
  fn list_archive_entries(
    &self,
    document_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<ArchiveEntry>, Self::Error>> + Send + '_;
}
