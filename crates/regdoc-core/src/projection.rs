//! Read-only compliance view over the register.
//!
//! Joins each document with its section, standard and type into a flat
//! [`ComplianceRow`] for dashboards. Nothing here writes.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  classification::{DocumentType, Section, Standard},
  document::{Document, Location},
  natural::natural_cmp,
  store::DocumentStore,
};

/// Default look-ahead for [`ReviewStatus::DueSoon`].
pub const DEFAULT_DUE_SOON_DAYS: i64 = 30;

// ─── Rows ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
  Overdue,
  DueSoon,
  Current,
  /// No review period set.
  Unscheduled,
}

impl ReviewStatus {
  pub fn classify(
    due: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
  ) -> Self {
    match due {
      None => Self::Unscheduled,
      Some(due) if due < now => Self::Overdue,
      Some(due) if due <= now + window => Self::DueSoon,
      Some(_) => Self::Current,
    }
  }

  fn as_str(self) -> &'static str {
    match self {
      Self::Overdue => "overdue",
      Self::DueSoon => "due_soon",
      Self::Current => "current",
      Self::Unscheduled => "unscheduled",
    }
  }
}

/// One document, denormalised for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRow {
  pub document_id:        Uuid,
  pub title:              String,
  pub reference_code:     String,
  pub location:           Location,
  pub document_type_id:   Uuid,
  pub document_type_name: Option<String>,
  pub section_code:       Option<String>,
  pub section_title:      Option<String>,
  pub standard_id:        Option<Uuid>,
  pub standard_name:      Option<String>,
  pub current_version:    u32,
  pub archived:           bool,
  pub review_due:         Option<DateTime<Utc>>,
  pub review_status:      ReviewStatus,
  /// Type, section and standard all resolved.
  pub complete:           bool,
}

/// Build rows from already-loaded tables. Dangling references leave the
/// corresponding columns empty and mark the row incomplete.
pub fn project(
  documents: Vec<Document>,
  sections: &[Section],
  standards: &[Standard],
  types: &[DocumentType],
  now: DateTime<Utc>,
  due_soon: Duration,
) -> Vec<ComplianceRow> {
  let sections: HashMap<Uuid, &Section> = sections.iter().map(|s| (s.id, s)).collect();
  let standards: HashMap<Uuid, &Standard> = standards.iter().map(|s| (s.id, s)).collect();
  let types: HashMap<Uuid, &DocumentType> = types.iter().map(|t| (t.id, t)).collect();

  documents
    .into_iter()
    .map(|doc| {
      let section = doc.section_id.and_then(|id| sections.get(&id).copied());
      let standard_id = section.and_then(|s| s.standard_id);
      let standard = standard_id.and_then(|id| standards.get(&id).copied());
      let doc_type = types.get(&doc.document_type_id).copied();
      let review_due = doc.review_due();

      ComplianceRow {
        document_id: doc.id,
        review_status: ReviewStatus::classify(review_due, now, due_soon),
        complete: section.is_some() && standard.is_some() && doc_type.is_some(),
        title: doc.title,
        reference_code: doc.reference_code,
        location: doc.location,
        document_type_id: doc.document_type_id,
        document_type_name: doc_type.map(|t| t.name.clone()),
        section_code: section.map(|s| s.code.clone()),
        section_title: section.map(|s| s.title.clone()),
        standard_id,
        standard_name: standard.map(|s| s.name.clone()),
        current_version: doc.current_version,
        archived: doc.archived,
        review_due,
      }
    })
    .collect()
}

// ─── Filtering and sorting ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectionFilter {
  /// Case-insensitive match against title, reference code and section title.
  pub text:             Option<String>,
  pub standard_id:      Option<Uuid>,
  pub document_type_id: Option<Uuid>,
  #[serde(default)]
  pub include_archived: bool,
}

impl ProjectionFilter {
  pub fn matches(&self, row: &ComplianceRow) -> bool {
    if row.archived && !self.include_archived {
      return false;
    }
    if self.standard_id.is_some() && row.standard_id != self.standard_id {
      return false;
    }
    if let Some(type_id) = self.document_type_id
      && row.document_type_id != type_id
    {
      return false;
    }
    match self.text.as_deref().map(str::trim) {
      Some(text) if !text.is_empty() => {
        let needle = text.to_lowercase();
        [Some(&row.title), Some(&row.reference_code), row.section_title.as_ref()]
          .into_iter()
          .flatten()
          .any(|hay| hay.to_lowercase().contains(&needle))
      }
      _ => true,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
  Title,
  #[default]
  ReferenceCode,
  Location,
  DocumentType,
  SectionCode,
  SectionTitle,
  Standard,
  Version,
  ReviewDue,
  ReviewStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  #[default]
  Asc,
  Desc,
}

/// Stable in-place sort by one column. Text columns use natural ordering;
/// empty values sort last in ascending order.
pub fn sort_rows(rows: &mut [ComplianceRow], column: SortColumn, direction: SortDirection) {
  rows.sort_by(|a, b| {
    let ord = compare_by(a, b, column);
    match direction {
      SortDirection::Asc => ord,
      SortDirection::Desc => ord.reverse(),
    }
  });
}

fn compare_by(a: &ComplianceRow, b: &ComplianceRow, column: SortColumn) -> Ordering {
  fn text(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
      (Some(a), Some(b)) => natural_cmp(a, b),
      (Some(_), None) => Ordering::Less,
      (None, Some(_)) => Ordering::Greater,
      (None, None) => Ordering::Equal,
    }
  }

  match column {
    SortColumn::Title => natural_cmp(&a.title, &b.title),
    SortColumn::ReferenceCode => natural_cmp(&a.reference_code, &b.reference_code),
    SortColumn::Location => natural_cmp(a.location.name(), b.location.name()),
    SortColumn::DocumentType => {
      text(a.document_type_name.as_deref(), b.document_type_name.as_deref())
    }
    SortColumn::SectionCode => text(a.section_code.as_deref(), b.section_code.as_deref()),
    SortColumn::SectionTitle => text(a.section_title.as_deref(), b.section_title.as_deref()),
    SortColumn::Standard => text(a.standard_name.as_deref(), b.standard_name.as_deref()),
    SortColumn::Version => a.current_version.cmp(&b.current_version),
    SortColumn::ReviewDue => match (a.review_due, b.review_due) {
      (Some(a), Some(b)) => a.cmp(&b),
      (Some(_), None) => Ordering::Less,
      (None, Some(_)) => Ordering::Greater,
      (None, None) => Ordering::Equal,
    },
    SortColumn::ReviewStatus => natural_cmp(a.review_status.as_str(), b.review_status.as_str()),
  }
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// Dashboard counts. Review and completeness counts cover active documents
/// only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceSummary {
  pub total:      usize,
  pub active:     usize,
  pub archived:   usize,
  pub overdue:    usize,
  pub due_soon:   usize,
  pub incomplete: usize,
}

pub fn summarize(rows: &[ComplianceRow]) -> ComplianceSummary {
  rows.iter().fold(ComplianceSummary::default(), |mut acc, row| {
    acc.total += 1;
    if row.archived {
      acc.archived += 1;
      return acc;
    }
    acc.active += 1;
    match row.review_status {
      ReviewStatus::Overdue => acc.overdue += 1,
      ReviewStatus::DueSoon => acc.due_soon += 1,
      ReviewStatus::Current | ReviewStatus::Unscheduled => {}
    }
    if !row.complete {
      acc.incomplete += 1;
    }
    acc
  })
}

// ─── Component ───────────────────────────────────────────────────────────────

/// Read-only projection over a [`DocumentStore`].
pub struct ComplianceProjection<S> {
  store:    Arc<S>,
  due_soon: Duration,
}

impl<S> Clone for ComplianceProjection<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), due_soon: self.due_soon }
  }
}

impl<S: DocumentStore> ComplianceProjection<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, due_soon: Duration::days(DEFAULT_DUE_SOON_DAYS) }
  }

  pub fn with_due_soon_days(mut self, days: i64) -> Self {
    self.due_soon = Duration::days(days);
    self
  }

  /// Filtered, sorted rows.
  pub async fn rows(
    &self,
    filter: &ProjectionFilter,
    column: SortColumn,
    direction: SortDirection,
  ) -> Result<Vec<ComplianceRow>> {
    let mut rows: Vec<ComplianceRow> = self
      .load(filter.include_archived)
      .await?
      .into_iter()
      .filter(|r| filter.matches(r))
      .collect();
    sort_rows(&mut rows, column, direction);
    Ok(rows)
  }

  pub async fn summary(&self) -> Result<ComplianceSummary> {
    Ok(summarize(&self.load(true).await?))
  }

  async fn load(&self, include_archived: bool) -> Result<Vec<ComplianceRow>> {
    let documents = self
      .store
      .list_documents(include_archived)
      .await
      .map_err(Error::store)?;
    let sections = self.store.list_sections(None).await.map_err(Error::store)?;
    let standards = self.store.list_standards().await.map_err(Error::store)?;
    let types = self.store.list_document_types().await.map_err(Error::store)?;
    Ok(project(documents, &sections, &standards, &types, Utc::now(), self.due_soon))
  }
}
