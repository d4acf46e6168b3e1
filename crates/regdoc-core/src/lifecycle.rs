//! The document version manager: every mutation of a document goes through
//! here.
//!
//! Documents move `Active(v)` → `Archived(v)`. History is preserved by
//! writing an [`ArchiveEntry`] before any row leaves active service; the store
//! performs entry-then-flag inside one transaction and re-checks reference
//! code uniqueness at write time, so a request either fully applies or fails
//! with a single typed error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  classification::required,
  document::{
    AUTO_ARCHIVE_SUMMARY, ArchiveEntry, Document, DocumentAmendment, DocumentMeta,
    NewDocumentInput, clean_optional, normalize_reference_code,
  },
  reference::ReferenceCodeAllocator,
  store::{DocumentStore, WriteOutcome},
};

// ─── Notifications ───────────────────────────────────────────────────────────

/// A completed lifecycle transition, handed to the [`Notifier`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
  Created {
    document_id:    Uuid,
    reference_code: String,
    version:        u32,
    /// The active predecessor archived by this create, if any.
    superseded:     Option<Uuid>,
  },
  NewVersion {
    document_id:    Uuid,
    reference_code: String,
    version:        u32,
  },
  Amended {
    document_id:    Uuid,
    reference_code: String,
  },
  Reviewed {
    document_id: Uuid,
    reviewed_at: DateTime<Utc>,
  },
  Archived {
    document_id: Uuid,
    entry_id:    Uuid,
    archived_by: String,
  },
  Restored {
    document_id:    Uuid,
    reference_code: String,
  },
}

/// Outbound hook for the surrounding application (e-mail, webhooks…).
///
/// Called after a transition has been committed. Delivery is
/// fire-and-forget: implementations must not block and cannot fail the
/// operation that triggered them.
pub trait Notifier: Send + Sync {
  fn notify(&self, event: &LifecycleEvent);
}

/// Default notifier: records each event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn notify(&self, event: &LifecycleEvent) {
    tracing::info!(?event, "lifecycle event");
  }
}

// ─── Version manager ─────────────────────────────────────────────────────────

/// Orchestrates create, edit, amend, review, archive and restore.
pub struct VersionManager<S> {
  store:     Arc<S>,
  allocator: ReferenceCodeAllocator<S>,
  notifier:  Arc<dyn Notifier>,
}

impl<S> Clone for VersionManager<S> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      allocator: self.allocator.clone(),
      notifier:  Arc::clone(&self.notifier),
    }
  }
}

/// Title and reference code after validation and normalisation.
struct CheckedFields {
  title:          String,
  reference_code: String,
}

impl<S: DocumentStore> VersionManager<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      allocator: ReferenceCodeAllocator::new(Arc::clone(&store)),
      store,
      notifier: Arc::new(LogNotifier),
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = notifier;
    self
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get(&self, id: Uuid) -> Result<Document> {
    self
      .store
      .get_document(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::DocumentNotFound(id))
  }

  /// Ledger entries for one document, newest first.
  pub async fn history(&self, document_id: Uuid) -> Result<Vec<ArchiveEntry>> {
    let entries = self
      .store
      .list_archive_entries(Some(document_id))
      .await
      .map_err(Error::store)?;
    if entries.is_empty() {
      // Distinguish "no history yet" from "no such document".
      self.get(document_id).await?;
    }
    Ok(entries)
  }

  /// The whole ledger, newest first.
  pub async fn list_archive(&self) -> Result<Vec<ArchiveEntry>> {
    self
      .store
      .list_archive_entries(None)
      .await
      .map_err(Error::store)
  }

  // ── Create ────────────────────────────────────────────────────────────

  /// Register a new document.
  ///
  /// An active document with the same reference code is a conflict, except
  /// when it is also filed under the same section: that document is the
  /// predecessor, and is archived (ledger entry first) before the new row is
  /// inserted at the next version.
  pub async fn create(&self, input: NewDocumentInput) -> Result<Document> {
    let NewDocumentInput { meta, actor } = input;
    let checked = self
      .check_fields(&meta.title, meta.document_type_id, meta.section_id, &meta.reference_code)
      .await?;

    let holder = self
      .store
      .find_active_by_code(checked.reference_code.clone(), None)
      .await
      .map_err(Error::store)?;

    let predecessor = match holder {
      Some(prior) if prior.section_id == meta.section_id => Some(prior),
      Some(_) => return Err(self.duplicate(&checked.reference_code)),
      None => None,
    };

    let document = Document {
      id:                   Uuid::new_v4(),
      title:                checked.title,
      document_type_id:     meta.document_type_id,
      location:             meta.location,
      section_id:           meta.section_id,
      reference_code:       checked.reference_code,
      file_url:             clean_optional(meta.file_url),
      notes:                clean_optional(meta.notes),
      archived:             false,
      current_version:      predecessor.as_ref().map_or(1, |p| p.current_version + 1),
      review_period_months: meta.review_period_months,
      last_reviewed_at:     None,
      created_at:           Utc::now(),
    };

    let outcome = match &predecessor {
      Some(prior) => {
        let entry = ArchiveEntry::snapshot(prior, AUTO_ARCHIVE_SUMMARY, clean_optional(actor));
        self.store.supersede(entry, document).await
      }
      None => self.store.insert_document(document).await,
    }
    .map_err(Error::store)?;

    let created = match outcome {
      WriteOutcome::Written(doc) => doc,
      WriteOutcome::ReferenceCodeTaken => {
        return Err(self.duplicate(&meta.reference_code));
      }
      WriteOutcome::Conflict => {
        return Err(match &predecessor {
          Some(prior) => self.explain_lost_supersession(prior, &meta.reference_code).await,
          None => self.duplicate(&meta.reference_code),
        });
      }
    };

    tracing::info!(
      document_id = %created.id,
      reference_code = %created.reference_code,
      version = created.current_version,
      superseded = ?predecessor.as_ref().map(|p| p.id),
      "document created"
    );
    self.notifier.notify(&LifecycleEvent::Created {
      document_id:    created.id,
      reference_code: created.reference_code.clone(),
      version:        created.current_version,
      superseded:     predecessor.map(|p| p.id),
    });
    Ok(created)
  }

  // ── Edit (new version) ────────────────────────────────────────────────

  /// Replace a document's metadata as its next version. The version counter
  /// is the audit trail for this path; no ledger entry is written.
  ///
  /// With `expected_version`, the edit is refused with
  /// [`Error::StaleVersion`] unless the document is still at that version.
  pub async fn edit(
    &self,
    id: Uuid,
    meta: DocumentMeta,
    expected_version: Option<u32>,
  ) -> Result<Document> {
    let current = self.get_active_at(id, expected_version).await?;
    let checked = self
      .check_fields(&meta.title, meta.document_type_id, meta.section_id, &meta.reference_code)
      .await?;
    self.allocator.ensure_available(&checked.reference_code, Some(id)).await?;
    let code = checked.reference_code.clone();

    let next = Document {
      id,
      title: checked.title,
      document_type_id: meta.document_type_id,
      location: meta.location,
      section_id: meta.section_id,
      reference_code: checked.reference_code,
      file_url: clean_optional(meta.file_url),
      notes: clean_optional(meta.notes),
      archived: false,
      current_version: current.current_version + 1,
      review_period_months: meta.review_period_months,
      last_reviewed_at: current.last_reviewed_at,
      created_at: current.created_at,
    };

    let outcome = self
      .store
      .replace_document(next, current.current_version)
      .await
      .map_err(Error::store)?;
    let updated = self.settle(outcome, &current, &code).await?;

    tracing::info!(
      document_id = %id,
      version = updated.current_version,
      "new document version"
    );
    self.notifier.notify(&LifecycleEvent::NewVersion {
      document_id:    id,
      reference_code: updated.reference_code.clone(),
      version:        updated.current_version,
    });
    Ok(updated)
  }

  // ── Amend ─────────────────────────────────────────────────────────────

  /// Correct metadata in place. Version, creation date, review date and
  /// review period are untouched.
  pub async fn amend(
    &self,
    id: Uuid,
    amendment: DocumentAmendment,
    expected_version: Option<u32>,
  ) -> Result<Document> {
    let current = self.get_active_at(id, expected_version).await?;
    self.amend_read(current, amendment).await
  }

  /// Amend a document the caller has already read. The write only lands if
  /// the stored row is still exactly `current`, otherwise
  /// [`Error::StaleVersion`].
  pub async fn amend_read(
    &self,
    current: Document,
    amendment: DocumentAmendment,
  ) -> Result<Document> {
    if current.archived {
      return Err(Error::Archived(current.id));
    }
    let id = current.id;
    let checked = self
      .check_fields(
        &amendment.title,
        amendment.document_type_id,
        amendment.section_id,
        &amendment.reference_code,
      )
      .await?;
    self.allocator.ensure_available(&checked.reference_code, Some(id)).await?;
    let code = checked.reference_code.clone();

    let amendment = DocumentAmendment {
      title:            checked.title,
      document_type_id: amendment.document_type_id,
      section_id:       amendment.section_id,
      reference_code:   checked.reference_code,
      file_url:         clean_optional(amendment.file_url),
      notes:            clean_optional(amendment.notes),
    };

    let outcome = self
      .store
      .amend_document(current.clone(), amendment)
      .await
      .map_err(Error::store)?;
    let amended = self.settle(outcome, &current, &code).await?;

    tracing::info!(document_id = %id, "document amended");
    self.notifier.notify(&LifecycleEvent::Amended {
      document_id:    id,
      reference_code: amended.reference_code.clone(),
    });
    Ok(amended)
  }

  // ── Review ────────────────────────────────────────────────────────────

  /// Record that the document was reviewed now.
  pub async fn review(&self, id: Uuid) -> Result<Document> {
    let current = self.get_active(id).await?;
    let now = Utc::now();
    let outcome = self.store.mark_reviewed(id, now).await.map_err(Error::store)?;
    let reviewed = self.settle(outcome, &current, &current.reference_code).await?;

    tracing::info!(document_id = %id, "document reviewed");
    self.notifier.notify(&LifecycleEvent::Reviewed {
      document_id: id,
      reviewed_at: now,
    });
    Ok(reviewed)
  }

  // ── Archive ───────────────────────────────────────────────────────────

  /// Retire a document. The ledger entry is persisted before the document is
  /// flagged, so a failure leaves it active rather than archived without
  /// history.
  pub async fn archive(&self, id: Uuid, summary: &str, actor: &str) -> Result<ArchiveEntry> {
    let summary = summary.trim();
    if summary.is_empty() {
      return Err(Error::MissingSummary);
    }
    let actor = actor.trim();
    if actor.is_empty() {
      return Err(Error::MissingActor);
    }

    let current = self.get_active(id).await?;
    let entry = ArchiveEntry::snapshot(&current, summary, Some(actor.to_owned()));

    let outcome = self
      .store
      .archive_document(entry)
      .await
      .map_err(Error::store)?;
    let entry = match outcome {
      WriteOutcome::Written(entry) => entry,
      WriteOutcome::ReferenceCodeTaken => {
        return Err(self.duplicate(&current.reference_code));
      }
      WriteOutcome::Conflict => return Err(self.explain_conflict(&current).await),
    };

    tracing::info!(
      document_id = %id,
      entry_id = %entry.id,
      version = entry.archived_version,
      "document archived"
    );
    self.notifier.notify(&LifecycleEvent::Archived {
      document_id: id,
      entry_id:    entry.id,
      archived_by: actor.to_owned(),
    });
    Ok(entry)
  }

  // ── Restore ───────────────────────────────────────────────────────────

  /// Reactivate the document an archive entry belongs to.
  ///
  /// Only the archived flag is cleared: the document comes back with the
  /// content and version of its current row, not the entry's snapshot.
  pub async fn restore(&self, archive_entry_id: Uuid) -> Result<Document> {
    let entry = self
      .store
      .get_archive_entry(archive_entry_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ArchiveEntryNotFound(archive_entry_id))?;

    let current = self.get(entry.document_id).await?;
    if !current.archived {
      return Ok(current);
    }

    let outcome = self
      .store
      .restore_document(current.id)
      .await
      .map_err(Error::store)?;

    let restored = match outcome {
      WriteOutcome::Written(doc) => doc,
      WriteOutcome::ReferenceCodeTaken => {
        return Err(self.duplicate(&current.reference_code));
      }
      WriteOutcome::Conflict => {
        // Someone else may have restored it first; that is the same result.
        let now = self.get(current.id).await?;
        if now.archived {
          return Err(Error::StaleVersion {
            id:       now.id,
            expected: current.current_version,
          });
        }
        now
      }
    };

    tracing::info!(document_id = %restored.id, "document restored");
    self.notifier.notify(&LifecycleEvent::Restored {
      document_id:    restored.id,
      reference_code: restored.reference_code.clone(),
    });
    Ok(restored)
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn get_active(&self, id: Uuid) -> Result<Document> {
    let doc = self.get(id).await?;
    if doc.archived {
      return Err(Error::Archived(id));
    }
    Ok(doc)
  }

  async fn get_active_at(&self, id: Uuid, expected_version: Option<u32>) -> Result<Document> {
    let doc = self.get_active(id).await?;
    match expected_version {
      Some(expected) if expected != doc.current_version => {
        Err(Error::StaleVersion { id, expected })
      }
      _ => Ok(doc),
    }
  }

  /// Validate the fields shared by create, edit and amend.
  async fn check_fields(
    &self,
    title: &str,
    document_type_id: Uuid,
    section_id: Option<Uuid>,
    reference_code: &str,
  ) -> Result<CheckedFields> {
    let title = required("title", title)?;
    let reference_code = normalize_reference_code(&required("reference code", reference_code)?);

    self
      .store
      .get_document_type(document_type_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::DocumentTypeNotFound(document_type_id))?;

    if let Some(section_id) = section_id {
      self
        .store
        .get_section(section_id)
        .await
        .map_err(Error::store)?
        .ok_or(Error::SectionNotFound(section_id))?;
    }

    Ok(CheckedFields { title, reference_code })
  }

  /// Map a conditional-write outcome for an existing document to a result.
  async fn settle(
    &self,
    outcome: WriteOutcome<Document>,
    read: &Document,
    code: &str,
  ) -> Result<Document> {
    match outcome {
      WriteOutcome::Written(doc) => Ok(doc),
      WriteOutcome::ReferenceCodeTaken => Err(self.duplicate(code)),
      WriteOutcome::Conflict => Err(self.explain_conflict(read).await),
    }
  }

  /// Work out why a conditional write on `read` matched no row.
  async fn explain_conflict(&self, read: &Document) -> Error {
    match self.store.get_document(read.id).await {
      Ok(None) => Error::DocumentNotFound(read.id),
      Ok(Some(doc)) if doc.archived => Error::Archived(read.id),
      Ok(Some(_)) => Error::StaleVersion {
        id:       read.id,
        expected: read.current_version,
      },
      Err(e) => Error::store(e),
    }
  }

  /// The predecessor changed between the read and the supersede. If another
  /// active document now holds the code, a concurrent create won it.
  async fn explain_lost_supersession(&self, prior: &Document, code: &str) -> Error {
    let holder = self
      .store
      .find_active_by_code(normalize_reference_code(code), None)
      .await;
    match holder {
      Ok(Some(doc)) if doc.id != prior.id => self.duplicate(code),
      Ok(_) => self.explain_conflict(prior).await,
      Err(e) => Error::store(e),
    }
  }

  fn duplicate(&self, code: &str) -> Error {
    let code = normalize_reference_code(code);
    tracing::warn!(reference_code = %code, "reference code already in use");
    Error::DuplicateReferenceCode(code)
  }
}
