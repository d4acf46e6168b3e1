//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::{collections::BTreeSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use regdoc_core::{
  classification::{DocumentType, Section, Standard},
  document::{ArchiveEntry, Document, DocumentAmendment},
  store::{DocumentStore, WriteOutcome},
};

use crate::{
  Result,
  encode::{
    ARCHIVE_COLUMNS, DOCUMENT_COLUMNS, RawArchiveEntry, RawDocument, RawDocumentType,
    RawSection, RawStandard, SECTION_COLUMNS, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A regdoc store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "sqlite store opened");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  #[cfg(test)]
  pub(crate) fn conn_for_tests(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a conditional document write and decode whatever row it returns.
  async fn write_document<F>(&self, f: F) -> Result<WriteOutcome<Document>>
  where
    F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<WriteOutcome<RawDocument>>
      + Send
      + 'static,
  {
    let outcome = self.conn.call(move |conn| Ok(f(conn)?)).await?;
    decode_outcome(outcome, RawDocument::into_document)
  }
}

// ─── SQL helpers ─────────────────────────────────────────────────────────────

/// Whether `e` is a UNIQUE violation, i.e. the active reference code index
/// rejected the write.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

fn decode_outcome<R, T>(
  outcome: WriteOutcome<R>,
  decode: impl FnOnce(R) -> Result<T>,
) -> Result<WriteOutcome<T>> {
  Ok(match outcome {
    WriteOutcome::Written(raw) => WriteOutcome::Written(decode(raw)?),
    WriteOutcome::ReferenceCodeTaken => WriteOutcome::ReferenceCodeTaken,
    WriteOutcome::Conflict => WriteOutcome::Conflict,
  })
}

fn select_document(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawDocument>> {
  conn
    .query_row(
      &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
      rusqlite::params![id],
      RawDocument::from_row,
    )
    .optional()
}

fn select_archive_entry(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawArchiveEntry>> {
  conn
    .query_row(
      &format!("SELECT {ARCHIVE_COLUMNS} FROM document_archive WHERE id = ?1"),
      rusqlite::params![id],
      RawArchiveEntry::from_row,
    )
    .optional()
}

/// After an UPDATE: re-read the row if it matched, otherwise report a
/// conflict.
fn reread_if_changed(
  conn: &rusqlite::Connection,
  id: &str,
  changed: usize,
) -> rusqlite::Result<WriteOutcome<RawDocument>> {
  if changed == 0 {
    return Ok(WriteOutcome::Conflict);
  }
  Ok(select_document(conn, id)?.map_or(WriteOutcome::Conflict, WriteOutcome::Written))
}

fn insert_document_row(conn: &rusqlite::Connection, d: &RawDocument) -> rusqlite::Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO documents ({DOCUMENT_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
    ),
    rusqlite::params![
      d.id,
      d.title,
      d.document_type_id,
      d.location,
      d.section_id,
      d.reference_code,
      d.file_url,
      d.notes,
      d.archived,
      d.current_version,
      d.review_period_months,
      d.last_reviewed_at,
      d.created_at,
    ],
  )?;
  Ok(())
}

fn insert_archive_row(conn: &rusqlite::Connection, e: &RawArchiveEntry) -> rusqlite::Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO document_archive ({ARCHIVE_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
    ),
    rusqlite::params![
      e.id,
      e.document_id,
      e.archived_version,
      e.title,
      e.reference_code,
      e.file_url,
      e.document_type_id,
      e.notes,
      e.section_id,
      e.created_at,
      e.change_summary,
      e.change_date,
      e.archived_by,
    ],
  )?;
  Ok(())
}

/// Flag a document archived, only if it is still active at `version`.
/// Returns whether the row matched.
fn flag_archived(conn: &rusqlite::Connection, id: &str, version: u32) -> rusqlite::Result<bool> {
  let changed = conn.execute(
    "UPDATE documents SET archived = 1
     WHERE id = ?1 AND archived = 0 AND current_version = ?2",
    rusqlite::params![id, version],
  )?;
  Ok(changed == 1)
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = crate::Error;

  // ── Standards ─────────────────────────────────────────────────────────────

  async fn insert_standard(&self, standard: Standard) -> Result<Standard> {
    let id_str = encode_uuid(standard.id);
    let name = standard.name.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO standards (id, name) VALUES (?1, ?2)",
          rusqlite::params![id_str, name],
        )?;
        Ok(())
      })
      .await?;

    Ok(standard)
  }

  async fn rename_standard(&self, id: Uuid, name: String) -> Result<Option<Standard>> {
    let id_str = encode_uuid(id);
    let name_param = name.clone();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE standards SET name = ?2 WHERE id = ?1",
          rusqlite::params![id_str, name_param],
        )?)
      })
      .await?;

    Ok((changed > 0).then_some(Standard { id, name }))
  }

  async fn delete_standard(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM standards WHERE id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn get_standard(&self, id: Uuid) -> Result<Option<Standard>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawStandard> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, name FROM standards WHERE id = ?1",
            rusqlite::params![id_str],
            RawStandard::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawStandard::into_standard).transpose()
  }

  async fn list_standards(&self) -> Result<Vec<Standard>> {
    let raws: Vec<RawStandard> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, name FROM standards")?;
        let rows = stmt
          .query_map([], RawStandard::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStandard::into_standard).collect()
  }

  // ── Document types ────────────────────────────────────────────────────────

  async fn insert_document_type(&self, document_type: DocumentType) -> Result<DocumentType> {
    let id_str = encode_uuid(document_type.id);
    let name = document_type.name.clone();
    let code = document_type.code.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO document_types (id, name, code) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, name, code],
        )?;
        Ok(())
      })
      .await?;

    Ok(document_type)
  }

  async fn get_document_type(&self, id: Uuid) -> Result<Option<DocumentType>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDocumentType> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, name, code FROM document_types WHERE id = ?1",
            rusqlite::params![id_str],
            RawDocumentType::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawDocumentType::into_document_type).transpose()
  }

  async fn list_document_types(&self) -> Result<Vec<DocumentType>> {
    let raws: Vec<RawDocumentType> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, name, code FROM document_types")?;
        let rows = stmt
          .query_map([], RawDocumentType::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocumentType::into_document_type).collect()
  }

  // ── Sections ──────────────────────────────────────────────────────────────

  async fn save_section(&self, section: Section) -> Result<Section> {
    let id_str       = encode_uuid(section.id);
    let code         = section.code.clone();
    let short_code   = section.short_code.clone();
    let title        = section.title.clone();
    let description  = section.description.clone();
    let standard_str = section.standard_id.map(encode_uuid);
    let parent_str   = section.parent_section_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO sections ({SECTION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
               code              = excluded.code,
               short_code        = excluded.short_code,
               title             = excluded.title,
               description       = excluded.description,
               standard_id       = excluded.standard_id,
               parent_section_id = excluded.parent_section_id"
          ),
          rusqlite::params![
            id_str,
            code,
            short_code,
            title,
            description,
            standard_str,
            parent_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(section)
  }

  async fn get_section(&self, id: Uuid) -> Result<Option<Section>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSection> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SECTION_COLUMNS} FROM sections WHERE id = ?1"),
            rusqlite::params![id_str],
            RawSection::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSection::into_section).transpose()
  }

  async fn list_sections(&self, standard_id: Option<Uuid>) -> Result<Vec<Section>> {
    let standard_str = standard_id.map(encode_uuid);

    let raws: Vec<RawSection> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SECTION_COLUMNS} FROM sections
           WHERE ?1 IS NULL OR standard_id = ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![standard_str], RawSection::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSection::into_section).collect()
  }

  // ── Documents: reads ─ ─────────────────────────────────────────────────────

  async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| Ok(select_document(conn, &id_str)?))
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn list_documents(&self, include_archived: bool) -> Result<Vec<Document>> {
    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DOCUMENT_COLUMNS} FROM documents
           WHERE archived = 0 OR ?1
           ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![include_archived], RawDocument::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  async fn find_active_by_code(
    &self,
    code: String,
    exclude: Option<Uuid>,
  ) -> Result<Option<Document>> {
    let exclude_str = exclude.map(encode_uuid);

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {DOCUMENT_COLUMNS} FROM documents
               WHERE reference_code = ?1
                 AND archived = 0
                 AND (?2 IS NULL OR id != ?2)
               LIMIT 1"
            ),
            rusqlite::params![code, exclude_str],
            RawDocument::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn active_codes_with_prefixes(&self, prefixes: Vec<String>) -> Result<Vec<String>> {
    let codes: BTreeSet<String> = self
      .conn
      .call(move |conn| {
        // substr() rather than LIKE: codes may contain `_` or `%`.
        let mut stmt = conn.prepare(
          "SELECT reference_code FROM documents
           WHERE archived = 0
             AND substr(reference_code, 1, length(?1)) = ?1",
        )?;
        let mut codes = BTreeSet::new();
        for prefix in &prefixes {
          let rows = stmt.query_map(rusqlite::params![prefix], |r| r.get::<_, String>(0))?;
          for code in rows {
            codes.insert(code?);
          }
        }
        Ok(codes)
      })
      .await?;

    Ok(codes.into_iter().collect())
  }

  // ── Documents: conditional writes ─ ────────────────────────────────────────

  async fn insert_document(&self, document: Document) -> Result<WriteOutcome<Document>> {
    let raw = RawDocument::encode(&document);

    self
      .write_document(move |conn| {
        match insert_document_row(conn, &raw) {
          Ok(()) => {}
          Err(e) if is_unique_violation(&e) => return Ok(WriteOutcome::ReferenceCodeTaken),
          Err(e) => return Err(e),
        }
        reread_if_changed(conn, &raw.id, 1)
      })
      .await
  }

  async fn supersede(
    &self,
    entry: ArchiveEntry,
    replacement: Document,
  ) -> Result<WriteOutcome<Document>> {
    let entry_raw = RawArchiveEntry::encode(&entry);
    let doc_raw = RawDocument::encode(&replacement);

    self
      .write_document(move |conn| {
        // Dropping `tx` without commit rolls every step back.
        let tx = conn.transaction()?;
        insert_archive_row(&tx, &entry_raw)?;
        if !flag_archived(&tx, &entry_raw.document_id, entry_raw.archived_version)? {
          return Ok(WriteOutcome::Conflict);
        }
        match insert_document_row(&tx, &doc_raw) {
          Ok(()) => {}
          Err(e) if is_unique_violation(&e) => return Ok(WriteOutcome::ReferenceCodeTaken),
          Err(e) => return Err(e),
        }
        let stored = reread_if_changed(&tx, &doc_raw.id, 1)?;
        tx.commit()?;
        Ok(stored)
      })
      .await
  }

  async fn replace_document(
    &self,
    document: Document,
    expected_version: u32,
  ) -> Result<WriteOutcome<Document>> {
    let d = RawDocument::encode(&document);

    self
      .write_document(move |conn| {
        let changed = conn.execute(
          "UPDATE documents SET
             title                = ?2,
             document_type_id     = ?3,
             location             = ?4,
             section_id           = ?5,
             reference_code       = ?6,
             file_url             = ?7,
             notes                = ?8,
             current_version      = ?9,
             review_period_months = ?10,
             last_reviewed_at     = ?11
           WHERE id = ?1 AND archived = 0 AND current_version = ?12",
          rusqlite::params![
            d.id,
            d.title,
            d.document_type_id,
            d.location,
            d.section_id,
            d.reference_code,
            d.file_url,
            d.notes,
            d.current_version,
            d.review_period_months,
            d.last_reviewed_at,
            expected_version,
          ],
        );
        match changed {
          Ok(n) => reread_if_changed(conn, &d.id, n),
          Err(e) if is_unique_violation(&e) => Ok(WriteOutcome::ReferenceCodeTaken),
          Err(e) => Err(e),
        }
      })
      .await
  }

  async fn amend_document(
    &self,
    read: Document,
    amendment: DocumentAmendment,
  ) -> Result<WriteOutcome<Document>> {
    let r = RawDocument::encode(&read);
    let type_str = encode_uuid(amendment.document_type_id);
    let section_str = amendment.section_id.map(encode_uuid);

    self
      .write_document(move |conn| {
        let changed = conn.execute(
          "UPDATE documents SET
             title            = ?2,
             document_type_id = ?3,
             section_id       = ?4,
             reference_code   = ?5,
             file_url         = ?6,
             notes            = ?7
           WHERE id = ?1 AND archived = 0
             AND current_version  = ?8
             AND title            = ?9
             AND document_type_id = ?10
             AND section_id       IS ?11
             AND reference_code   = ?12
             AND file_url         IS ?13
             AND notes            IS ?14",
          rusqlite::params![
            r.id,
            amendment.title,
            type_str,
            section_str,
            amendment.reference_code,
            amendment.file_url,
            amendment.notes,
            r.current_version,
            r.title,
            r.document_type_id,
            r.section_id,
            r.reference_code,
            r.file_url,
            r.notes,
          ],
        );
        match changed {
          Ok(n) => reread_if_changed(conn, &r.id, n),
          Err(e) if is_unique_violation(&e) => Ok(WriteOutcome::ReferenceCodeTaken),
          Err(e) => Err(e),
        }
      })
      .await
  }

  async fn mark_reviewed(&self, id: Uuid, at: DateTime<Utc>) -> Result<WriteOutcome<Document>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at);

    self
      .write_document(move |conn| {
        let changed = conn.execute(
          "UPDATE documents SET last_reviewed_at = ?2 WHERE id = ?1 AND archived = 0",
          rusqlite::params![id_str, at_str],
        )?;
        reread_if_changed(conn, &id_str, changed)
      })
      .await
  }

  async fn archive_document(&self, entry: ArchiveEntry) -> Result<WriteOutcome<ArchiveEntry>> {
    let raw = RawArchiveEntry::encode(&entry);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        insert_archive_row(&tx, &raw)?;
        if !flag_archived(&tx, &raw.document_id, raw.archived_version)? {
          return Ok(WriteOutcome::Conflict);
        }
        let stored = select_archive_entry(&tx, &raw.id)?;
        tx.commit()?;
        Ok(stored.map_or(WriteOutcome::Conflict, WriteOutcome::Written))
      })
      .await?;

    decode_outcome(outcome, RawArchiveEntry::into_entry)
  }

  async fn restore_document(&self, id: Uuid) -> Result<WriteOutcome<Document>> {
    let id_str = encode_uuid(id);

    self
      .write_document(move |conn| {
        let changed = conn.execute(
          "UPDATE documents SET archived = 0 WHERE id = ?1 AND archived = 1",
          rusqlite::params![id_str],
        );
        match changed {
          Ok(n) => reread_if_changed(conn, &id_str, n),
          Err(e) if is_unique_violation(&e) => Ok(WriteOutcome::ReferenceCodeTaken),
          Err(e) => Err(e),
        }
      })
      .await
  }

  // ── Archive ledger ────────────────────────────────────────────────────────

  async fn get_archive_entry(&self, id: Uuid) -> Result<Option<ArchiveEntry>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| Ok(select_archive_entry(conn, &id_str)?))
      .await?;

    raw.map(RawArchiveEntry::into_entry).transpose()
  }

  async fn list_archive_entries(&self, document_id: Option<Uuid>) -> Result<Vec<ArchiveEntry>> {
    let doc_str = document_id.map(encode_uuid);

    let raws: Vec<RawArchiveEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ARCHIVE_COLUMNS} FROM document_archive
           WHERE ?1 IS NULL OR document_id = ?1
           ORDER BY change_date DESC, archived_version DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![doc_str], RawArchiveEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawArchiveEntry::into_entry).collect()
  }
}
