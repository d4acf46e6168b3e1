//! SQL schema for the regdoc SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS standards (
    id    TEXT PRIMARY KEY,
    name  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS document_types (
    id    TEXT PRIMARY KEY,
    name  TEXT NOT NULL,
    code  TEXT NOT NULL
);

-- standard_id carries no foreign key: deleting a standard leaves it dangling.
CREATE TABLE IF NOT EXISTS sections (
    id                 TEXT PRIMARY KEY,
    code               TEXT NOT NULL,
    short_code         TEXT,
    title              TEXT NOT NULL,
    description        TEXT NOT NULL DEFAULT '',
    standard_id        TEXT,
    parent_section_id  TEXT REFERENCES sections(id),
    CHECK (parent_section_id IS NULL OR parent_section_id != id)
);

CREATE TABLE IF NOT EXISTS documents (
    id                    TEXT PRIMARY KEY,
    title                 TEXT NOT NULL,
    document_type_id      TEXT NOT NULL REFERENCES document_types(id),
    location              TEXT NOT NULL,   -- 'EN' | 'WA' | 'PL' | 'GR'
    section_id            TEXT REFERENCES sections(id),
    reference_code        TEXT NOT NULL,
    file_url              TEXT,
    notes                 TEXT,
    archived              INTEGER NOT NULL DEFAULT 0,
    current_version       INTEGER NOT NULL CHECK (current_version >= 1),
    review_period_months  INTEGER,
    last_reviewed_at      TEXT,            -- ISO 8601 UTC
    created_at            TEXT NOT NULL    -- ISO 8601 UTC
);

-- At most one active document per reference code. Archived rows keep their
-- code for history and are exempt.
CREATE UNIQUE INDEX IF NOT EXISTS documents_active_code_idx
    ON documents(reference_code) WHERE archived = 0;

-- The archive ledger is strictly append-only.
CREATE TABLE IF NOT EXISTS document_archive (
    id                TEXT PRIMARY KEY,
    document_id       TEXT NOT NULL REFERENCES documents(id),
    archived_version  INTEGER NOT NULL,
    title             TEXT NOT NULL,
    reference_code    TEXT NOT NULL,
    file_url          TEXT,
    document_type_id  TEXT NOT NULL,
    notes             TEXT,
    section_id        TEXT,
    created_at        TEXT NOT NULL,
    change_summary    TEXT NOT NULL CHECK (length(trim(change_summary)) > 0),
    change_date       TEXT NOT NULL,
    archived_by       TEXT
);

CREATE TRIGGER IF NOT EXISTS document_archive_no_update
BEFORE UPDATE ON document_archive
BEGIN
    SELECT RAISE(ABORT, 'archive entries are immutable');
END;

CREATE TRIGGER IF NOT EXISTS document_archive_no_delete
BEFORE DELETE ON document_archive
BEGIN
    SELECT RAISE(ABORT, 'archive entries are immutable');
END;

CREATE INDEX IF NOT EXISTS sections_standard_idx   ON sections(standard_id);
CREATE INDEX IF NOT EXISTS archive_document_idx    ON document_archive(document_id);
CREATE INDEX IF NOT EXISTS archive_change_date_idx ON document_archive(change_date);

PRAGMA user_version = 1;
";
