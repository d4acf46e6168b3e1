//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so they sort lexically in time order. UUIDs are
//! stored as hyphenated lowercase strings, locations as their two-letter code.

use chrono::{DateTime, SecondsFormat, Utc};
use regdoc_core::{
  classification::{DocumentType, Section, Standard},
  document::{ArchiveEntry, Document, Location},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Location ─────────────────────────────────────────────────────────────────

pub fn encode_location(l: Location) -> &'static str { l.code() }

pub fn decode_location(s: &str) -> Result<Location> {
  Location::from_code(s).ok_or_else(|| Error::Decode(format!("unknown location: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `documents` SELECT; matches
/// [`RawDocument::from_row`].
pub const DOCUMENT_COLUMNS: &str = "id, title, document_type_id, location, section_id, \
  reference_code, file_url, notes, archived, current_version, review_period_months, \
  last_reviewed_at, created_at";

/// A `documents` row in column form, used in both directions.
#[derive(Debug, Clone)]
pub struct RawDocument {
  pub id:                   String,
  pub title:                String,
  pub document_type_id:     String,
  pub location:             String,
  pub section_id:           Option<String>,
  pub reference_code:       String,
  pub file_url:             Option<String>,
  pub notes:                Option<String>,
  pub archived:             bool,
  pub current_version:      u32,
  pub review_period_months: Option<u32>,
  pub last_reviewed_at:     Option<String>,
  pub created_at:           String,
}

impl RawDocument {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      title:                row.get(1)?,
      document_type_id:     row.get(2)?,
      location:             row.get(3)?,
      section_id:           row.get(4)?,
      reference_code:       row.get(5)?,
      file_url:             row.get(6)?,
      notes:                row.get(7)?,
      archived:             row.get(8)?,
      current_version:      row.get(9)?,
      review_period_months: row.get(10)?,
      last_reviewed_at:     row.get(11)?,
      created_at:           row.get(12)?,
    })
  }

  pub fn encode(doc: &Document) -> Self {
    Self {
      id:                   encode_uuid(doc.id),
      title:                doc.title.clone(),
      document_type_id:     encode_uuid(doc.document_type_id),
      location:             encode_location(doc.location).to_owned(),
      section_id:           doc.section_id.map(encode_uuid),
      reference_code:       doc.reference_code.clone(),
      file_url:             doc.file_url.clone(),
      notes:                doc.notes.clone(),
      archived:             doc.archived,
      current_version:      doc.current_version,
      review_period_months: doc.review_period_months,
      last_reviewed_at:     doc.last_reviewed_at.map(encode_dt),
      created_at:           encode_dt(doc.created_at),
    }
  }

  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      id:                   decode_uuid(&self.id)?,
      title:                self.title,
      document_type_id:     decode_uuid(&self.document_type_id)?,
      location:             decode_location(&self.location)?,
      section_id:           decode_opt_uuid(self.section_id)?,
      reference_code:       self.reference_code,
      file_url:             self.file_url,
      notes:                self.notes,
      archived:             self.archived,
      current_version:      self.current_version,
      review_period_months: self.review_period_months,
      last_reviewed_at:     self.last_reviewed_at.as_deref().map(decode_dt).transpose()?,
      created_at:           decode_dt(&self.created_at)?,
    })
  }
}

pub const ARCHIVE_COLUMNS: &str = "id, document_id, archived_version, title, reference_code, \
  file_url, document_type_id, notes, section_id, created_at, change_summary, change_date, \
  archived_by";

/// A `document_archive` row in column form, used in both directions.
#[derive(Debug, Clone)]
pub struct RawArchiveEntry {
  pub id:               String,
  pub document_id:      String,
  pub archived_version: u32,
  pub title:            String,
  pub reference_code:   String,
  pub file_url:         Option<String>,
  pub document_type_id: String,
  pub notes:            Option<String>,
  pub section_id:       Option<String>,
  pub created_at:       String,
  pub change_summary:   String,
  pub change_date:      String,
  pub archived_by:      Option<String>,
}

impl RawArchiveEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      document_id:      row.get(1)?,
      archived_version: row.get(2)?,
      title:            row.get(3)?,
      reference_code:   row.get(4)?,
      file_url:         row.get(5)?,
      document_type_id: row.get(6)?,
      notes:            row.get(7)?,
      section_id:       row.get(8)?,
      created_at:       row.get(9)?,
      change_summary:   row.get(10)?,
      change_date:      row.get(11)?,
      archived_by:      row.get(12)?,
    })
  }

  pub fn encode(entry: &ArchiveEntry) -> Self {
    Self {
      id:               encode_uuid(entry.id),
      document_id:      encode_uuid(entry.document_id),
      archived_version: entry.archived_version,
      title:            entry.title.clone(),
      reference_code:   entry.reference_code.clone(),
      file_url:         entry.file_url.clone(),
      document_type_id: encode_uuid(entry.document_type_id),
      notes:            entry.notes.clone(),
      section_id:       entry.section_id.map(encode_uuid),
      created_at:       encode_dt(entry.created_at),
      change_summary:   entry.change_summary.clone(),
      change_date:      encode_dt(entry.change_date),
      archived_by:      entry.archived_by.clone(),
    }
  }

  pub fn into_entry(self) -> Result<ArchiveEntry> {
    Ok(ArchiveEntry {
      id:               decode_uuid(&self.id)?,
      document_id:      decode_uuid(&self.document_id)?,
      archived_version: self.archived_version,
      title:            self.title,
      reference_code:   self.reference_code,
      file_url:         self.file_url,
      document_type_id: decode_uuid(&self.document_type_id)?,
      notes:            self.notes,
      section_id:       decode_opt_uuid(self.section_id)?,
      created_at:       decode_dt(&self.created_at)?,
      change_summary:   self.change_summary,
      change_date:      decode_dt(&self.change_date)?,
      archived_by:      self.archived_by,
    })
  }
}

pub const SECTION_COLUMNS: &str =
  "id, code, short_code, title, description, standard_id, parent_section_id";

/// Raw strings read directly from a `sections` row.
pub struct RawSection {
  pub id:                String,
  pub code:              String,
  pub short_code:        Option<String>,
  pub title:             String,
  pub description:       String,
  pub standard_id:       Option<String>,
  pub parent_section_id: Option<String>,
}

impl RawSection {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      code:              row.get(1)?,
      short_code:        row.get(2)?,
      title:             row.get(3)?,
      description:       row.get(4)?,
      standard_id:       row.get(5)?,
      parent_section_id: row.get(6)?,
    })
  }

  pub fn into_section(self) -> Result<Section> {
    Ok(Section {
      id:                decode_uuid(&self.id)?,
      code:              self.code,
      short_code:        self.short_code,
      title:             self.title,
      description:       self.description,
      standard_id:       decode_opt_uuid(self.standard_id)?,
      parent_section_id: decode_opt_uuid(self.parent_section_id)?,
    })
  }
}

/// Raw strings read directly from a `standards` row.
pub struct RawStandard {
  pub id:   String,
  pub name: String,
}

impl RawStandard {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { id: row.get(0)?, name: row.get(1)? })
  }

  pub fn into_standard(self) -> Result<Standard> {
    Ok(Standard { id: decode_uuid(&self.id)?, name: self.name })
  }
}

/// Raw strings read directly from a `document_types` row.
pub struct RawDocumentType {
  pub id:   String,
  pub name: String,
  pub code: String,
}

impl RawDocumentType {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { id: row.get(0)?, name: row.get(1)?, code: row.get(2)? })
  }

  pub fn into_document_type(self) -> Result<DocumentType> {
    Ok(DocumentType {
      id:   decode_uuid(&self.id)?,
      name: self.name,
      code: self.code,
    })
  }
}
