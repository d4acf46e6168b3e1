//! ETag computation and `If-Match` checks for document resources.
//!
//! ETags are SHA-256 hashes over a document's id, version, archived flag and
//! every mutable field, so an amendment changes the tag even though it leaves
//! the version alone.

use axum::http::{HeaderMap, header};
use regdoc_core::document::Document;
use sha2::{Digest, Sha256};

use crate::error::ApiError;

/// Compute the (quoted) ETag for `doc`.
pub fn document_etag(doc: &Document) -> String {
  let mut hasher = Sha256::new();
  hasher.update(doc.id.as_bytes());
  hasher.update(doc.current_version.to_le_bytes());
  hasher.update([u8::from(doc.archived)]);
  hasher.update(doc.document_type_id.as_bytes());
  hasher.update(doc.section_id.map_or([0; 16], |id| *id.as_bytes()));
  hasher.update(doc.review_period_months.map_or(-1, i64::from).to_le_bytes());
  hasher.update(
    doc
      .last_reviewed_at
      .map_or(i64::MIN, |t| t.timestamp_micros())
      .to_le_bytes(),
  );

  let text = [
    Some(doc.location.code()),
    Some(doc.title.as_str()),
    Some(doc.reference_code.as_str()),
    doc.file_url.as_deref(),
    doc.notes.as_deref(),
  ];
  for field in text {
    // Length-prefixed so adjacent fields cannot run into each other.
    match field {
      Some(s) => {
        hasher.update((s.len() as u64).to_le_bytes());
        hasher.update(s.as_bytes());
      }
      None => hasher.update(u64::MAX.to_le_bytes()),
    }
  }

  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// Fail with [`ApiError::PreconditionFailed`] unless the request's `If-Match`
/// header (if any) names the current representation of `doc`.
///
/// Tags are accepted with or without their surrounding quotes, and `*`
/// matches anything.
pub fn check_if_match(headers: &HeaderMap, doc: &Document) -> Result<(), ApiError> {
  let Some(value) = headers.get(header::IF_MATCH) else {
    return Ok(());
  };
  let value = value
    .to_str()
    .map_err(|_| ApiError::PreconditionFailed("unreadable If-Match header".into()))?;

  let current = document_etag(doc);
  let matched = value.split(',').map(str::trim).any(|tag| {
    tag == "*" || strip_etag_quotes(tag.trim_start_matches("W/")) == strip_etag_quotes(&current)
  });

  if matched {
    Ok(())
  } else {
    Err(ApiError::PreconditionFailed(format!(
      "document {} has changed",
      doc.id
    )))
  }
}

fn strip_etag_quotes(s: &str) -> &str { s.trim_matches('"') }
