//! Documents and the append-only archive ledger.
//!
//! A [`Document`] row is the single mutable holder of a document's current
//! truth. Every transition that retires a version writes an
//! [`ArchiveEntry`] first; entries are never updated or deleted.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Location ────────────────────────────────────────────────────────────────

/// The site a document applies to. Each location has a fixed two-letter code
/// that leads every reference code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
  England,
  Wales,
  Poland,
  Group,
}

impl Location {
  pub const ALL: [Location; 4] =
    [Self::England, Self::Wales, Self::Poland, Self::Group];

  /// The two-letter facet used in reference codes.
  pub fn code(self) -> &'static str {
    match self {
      Self::England => "EN",
      Self::Wales => "WA",
      Self::Poland => "PL",
      Self::Group => "GR",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|l| l.code() == code)
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::England => "England",
      Self::Wales => "Wales",
      Self::Poland => "Poland",
      Self::Group => "Group",
    }
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// A controlled document as currently held in the register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
  pub id:                   Uuid,
  pub title:                String,
  pub document_type_id:     Uuid,
  pub location:             Location,
  pub section_id:           Option<Uuid>,
  /// Unique among non-archived documents.
  pub reference_code:       String,
  pub file_url:             Option<String>,
  pub notes:                Option<String>,
  pub archived:             bool,
  /// Starts at 1.
  pub current_version:      u32,
  pub review_period_months: Option<u32>,
  pub last_reviewed_at:     Option<DateTime<Utc>>,
  pub created_at:           DateTime<Utc>,
}

impl Document {
  /// When the next review falls due: the last review (or creation, if never
  /// reviewed) plus the review period. `None` without a review period.
  pub fn review_due(&self) -> Option<DateTime<Utc>> {
    review_due(
      self.last_reviewed_at.or(Some(self.created_at)),
      self.review_period_months,
    )
  }
}

/// `base + months`, or `None` if either input is missing or the result is
/// out of range.
pub fn review_due(
  base: Option<DateTime<Utc>>,
  period_months: Option<u32>,
) -> Option<DateTime<Utc>> {
  base?.checked_add_months(Months::new(period_months?))
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// The full editable metadata of a document, as supplied to create and
/// new-version edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
  pub title:                String,
  pub document_type_id:     Uuid,
  pub location:             Location,
  pub section_id:           Option<Uuid>,
  pub reference_code:       String,
  pub file_url:             Option<String>,
  pub notes:                Option<String>,
  pub review_period_months: Option<u32>,
}

/// Input to [`crate::lifecycle::VersionManager::create`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocumentInput {
  #[serde(flatten)]
  pub meta:  DocumentMeta,
  /// Recorded as `archived_by` on the ledger entry of a superseded
  /// predecessor, if there is one.
  #[serde(default)]
  pub actor: Option<String>,
}

/// The subset of fields an amendment may touch. Version, creation date,
/// review date and review period are deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAmendment {
  pub title:            String,
  pub document_type_id: Uuid,
  pub section_id:       Option<Uuid>,
  pub reference_code:   String,
  pub file_url:         Option<String>,
  pub notes:            Option<String>,
}

/// Trim a reference code and upper-case it; codes are compared verbatim
/// after this.
pub fn normalize_reference_code(code: &str) -> String {
  code.trim().to_uppercase()
}

/// Trim optional free text, collapsing blank values to `None`.
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

// ─── Archive ledger ──────────────────────────────────────────────────────────

/// Summary written when a create supersedes an active document holding the
/// same reference code and section.
pub const AUTO_ARCHIVE_SUMMARY: &str = "Auto-archived due to new version added.";

/// An immutable snapshot of a document taken as it left active service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
  pub id:               Uuid,
  pub document_id:      Uuid,
  /// The version the document held immediately before the transition.
  pub archived_version: u32,
  pub title:            String,
  pub reference_code:   String,
  pub file_url:         Option<String>,
  pub document_type_id: Uuid,
  pub notes:            Option<String>,
  pub section_id:       Option<Uuid>,
  /// Creation date of the snapshotted document row.
  pub created_at:       DateTime<Utc>,
  pub change_summary:   String,
  pub change_date:      DateTime<Utc>,
  pub archived_by:      Option<String>,
}

impl ArchiveEntry {
  /// Snapshot `doc` as it stands now.
  pub fn snapshot(
    doc: &Document,
    change_summary: impl Into<String>,
    archived_by: Option<String>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      document_id: doc.id,
      archived_version: doc.current_version,
      title: doc.title.clone(),
      reference_code: doc.reference_code.clone(),
      file_url: doc.file_url.clone(),
      document_type_id: doc.document_type_id,
      notes: doc.notes.clone(),
      section_id: doc.section_id,
      created_at: doc.created_at,
      change_summary: change_summary.into(),
      change_date: Utc::now(),
      archived_by,
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn doc(created: DateTime<Utc>) -> Document {
    Document {
      id:                   Uuid::new_v4(),
      title:                "Quality Manual".into(),
      document_type_id:     Uuid::new_v4(),
      location:             Location::England,
      section_id:           None,
      reference_code:       "EN-POL-4-001".into(),
      file_url:             None,
      notes:                None,
      archived:             false,
      current_version:      2,
      review_period_months: Some(12),
      last_reviewed_at:     None,
      created_at:           created,
    }
  }

  #[test]
  fn location_codes_round_trip() {
    for loc in Location::ALL {
      assert_eq!(Location::from_code(loc.code()), Some(loc));
    }
    assert_eq!(Location::from_code("XX"), None);
  }

  #[test]
  fn review_due_falls_back_to_creation_date() {
    let created = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
    let d = doc(created);
    assert_eq!(
      d.review_due(),
      Some(Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap())
    );
  }

  #[test]
  fn review_due_prefers_last_review() {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut d = doc(created);
    d.review_period_months = Some(1);
    d.last_reviewed_at = Some(Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap());
    // Month arithmetic clamps to the end of February.
    assert_eq!(
      d.review_due(),
      Some(Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap())
    );
  }

  #[test]
  fn review_due_without_period_is_none() {
    let mut d = doc(Utc::now());
    d.review_period_months = None;
    assert_eq!(d.review_due(), None);
    assert_eq!(review_due(None, Some(6)), None);
  }

  #[test]
  fn snapshot_captures_current_version() {
    let d = doc(Utc::now());
    let entry = ArchiveEntry::snapshot(&d, "Withdrawn", Some("auditor".into()));
    assert_eq!(entry.document_id, d.id);
    assert_eq!(entry.archived_version, 2);
    assert_eq!(entry.reference_code, d.reference_code);
    assert_eq!(entry.archived_by.as_deref(), Some("auditor"));
  }

  #[test]
  fn reference_codes_are_normalized() {
    assert_eq!(normalize_reference_code("  en-pol-4-a1 "), "EN-POL-4-A1");
  }
}
