//! Reference code assembly, availability checks and suffix suggestions.
//!
//! A reference code has the shape `LOCATION-TYPE-SECTION-SUFFIX`, e.g.
//! `EN-POL-4.1-003`. The first three parts (the facets) are chosen
//! independently and the prefix grows as each one is picked; the suffix is
//! free text supplied by the user.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  classification::required,
  document::{Location, normalize_reference_code},
  store::DocumentStore,
};

/// How many suggestions [`ReferenceCodeAllocator::suggest`] offers.
pub const SUGGESTION_COUNT: usize = 5;

static TRAILING_NUMBER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"-(\d+)$").expect("static regex is valid"));

// ─── Pure helpers ────────────────────────────────────────────────────────────

/// Join whichever facets are known into a dashed prefix. Progression stops at
/// the first missing facet: no location gives `""`, and a section code is
/// only appended after a type code.
pub fn assemble_prefix(
  location: Option<Location>,
  type_code: Option<&str>,
  section_code: Option<&str>,
) -> String {
  let Some(location) = location else {
    return String::new();
  };
  let mut parts = vec![location.code()];
  if let Some(type_code) = type_code {
    parts.push(type_code);
    if let Some(section_code) = section_code {
      parts.push(section_code);
    }
  }
  parts.join("-")
}

/// `PREFIX-SUFFIX`, with the suffix trimmed and upper-cased. An empty suffix
/// yields the prefix alone.
pub fn compose(prefix: &str, suffix: &str) -> String {
  let suffix = suffix.trim().to_uppercase();
  if suffix.is_empty() {
    prefix.to_owned()
  } else {
    format!("{prefix}-{suffix}")
  }
}

/// The three facets read back out of a full reference code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFacets {
  pub location:     Location,
  pub type_code:    String,
  pub section_code: String,
}

impl CodeFacets {
  /// Parse `LOCATION-TYPE-SECTION[-SUFFIX]`. Returns `None` unless all three
  /// facets are present and the location code is known.
  pub fn parse(code: &str) -> Option<Self> {
    let code = normalize_reference_code(code);
    let mut parts = code.splitn(4, '-');
    let location = Location::from_code(parts.next()?)?;
    let type_code = parts.next().filter(|p| !p.is_empty())?.to_owned();
    let section_code = parts.next().filter(|p| !p.is_empty())?.to_owned();
    Some(Self { location, type_code, section_code })
  }

  /// The facets run together without separators, e.g. `ENPOL1`.
  pub fn composite(&self) -> String {
    format!("{}{}{}", self.location.code(), self.type_code, self.section_code)
  }

  /// The facets joined by dashes, e.g. `EN-POL-1`.
  pub fn dashed(&self) -> String {
    format!("{}-{}-{}", self.location.code(), self.type_code, self.section_code)
  }
}

/// The numeric suffix after the last dash, if the code ends in one.
pub fn trailing_number(code: &str) -> Option<u64> {
  TRAILING_NUMBER
    .captures(code)
    .and_then(|c| c.get(1))
    .and_then(|m| m.as_str().parse().ok())
}

/// Propose up to [`SUGGESTION_COUNT`] codes after the highest numeric suffix
/// found in `existing`, formatted as `COMPOSITE-NNN`. Every candidate lies
/// above the highest suffix, so none can collide with an existing code in
/// either the compact or the dashed form. Stops early at `u64::MAX`.
pub fn next_suggestions(facets: &CodeFacets, existing: &[String]) -> Vec<String> {
  let composite = facets.composite();
  let highest = existing
    .iter()
    .filter_map(|c| trailing_number(c))
    .max()
    .unwrap_or(0);

  std::iter::successors(highest.checked_add(1), |n| n.checked_add(1))
    .take(SUGGESTION_COUNT)
    .map(|n| format!("{composite}-{n:03}"))
    .collect()
}

// ─── Component ───────────────────────────────────────────────────────────────

/// Result of [`ReferenceCodeAllocator::check_availability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
  pub available: bool,
}

/// Builds reference codes from classification facets and checks them against
/// the codes of active documents.
pub struct ReferenceCodeAllocator<S> {
  store: Arc<S>,
}

impl<S> Clone for ReferenceCodeAllocator<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: DocumentStore> ReferenceCodeAllocator<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// The prefix for however many facets are currently chosen and resolvable.
  /// A type or section id that does not resolve ends the progression.
  pub async fn build_prefix(
    &self,
    location: Option<Location>,
    document_type_id: Option<Uuid>,
    section_id: Option<Uuid>,
  ) -> Result<String> {
    if location.is_none() {
      return Ok(String::new());
    }

    let type_code = match document_type_id {
      Some(id) => self
        .store
        .get_document_type(id)
        .await
        .map_err(Error::store)?
        .map(|t| t.code),
      None => None,
    };

    let section_code = match (section_id, &type_code) {
      (Some(id), Some(_)) => self
        .store
        .get_section(id)
        .await
        .map_err(Error::store)?
        .map(|s| s.facet_code().to_owned()),
      _ => None,
    };

    Ok(assemble_prefix(
      location,
      type_code.as_deref(),
      section_code.as_deref(),
    ))
  }

  /// A code is available unless an active document other than `exclude`
  /// already holds it.
  pub async fn check_availability(
    &self,
    code: &str,
    exclude: Option<Uuid>,
  ) -> Result<Availability> {
    let code = normalize_reference_code(&required("reference code", code)?);
    let holder = self
      .store
      .find_active_by_code(code, exclude)
      .await
      .map_err(Error::store)?;
    Ok(Availability { available: holder.is_none() })
  }

  /// Fail with [`Error::DuplicateReferenceCode`] if `code` is taken.
  pub async fn ensure_available(&self, code: &str, exclude: Option<Uuid>) -> Result<()> {
    if self.check_availability(code, exclude).await?.available {
      Ok(())
    } else {
      Err(Error::DuplicateReferenceCode(normalize_reference_code(code)))
    }
  }

  /// Up to [`SUGGESTION_COUNT`] unused codes sharing the facets of
  /// `full_code`. Empty unless location, type and section are all present.
  ///
  /// Suggestions are advisory; they reserve nothing and must still pass the
  /// write-time uniqueness check.
  pub async fn suggest(&self, full_code: &str) -> Result<Vec<String>> {
    let Some(facets) = CodeFacets::parse(full_code) else {
      return Ok(Vec::new());
    };
    let prefixes = vec![
      format!("{}-", facets.composite()),
      format!("{}-", facets.dashed()),
    ];
    let existing = self
      .store
      .active_codes_with_prefixes(prefixes)
      .await
      .map_err(Error::store)?;
    Ok(next_suggestions(&facets, &existing))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn codes(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

  #[test]
  fn prefix_progression() {
    assert_eq!(assemble_prefix(None, Some("POL"), Some("1")), "");
    assert_eq!(assemble_prefix(Some(Location::England), None, None), "EN");
    assert_eq!(
      assemble_prefix(Some(Location::England), Some("POL"), None),
      "EN-POL"
    );
    assert_eq!(
      assemble_prefix(Some(Location::England), Some("POL"), Some("4.1")),
      "EN-POL-4.1"
    );
  }

  #[test]
  fn section_without_type_is_not_appended() {
    assert_eq!(assemble_prefix(Some(Location::Wales), None, Some("4.1")), "WA");
  }

  #[test]
  fn compose_uppercases_suffix() {
    assert_eq!(compose("EN-POL-1", " a7 "), "EN-POL-1-A7");
    assert_eq!(compose("EN-POL-1", "  "), "EN-POL-1");
  }

  #[test]
  fn facets_parse_from_full_code() {
    let f = CodeFacets::parse("en-pol-1-002").unwrap();
    assert_eq!(f.location, Location::England);
    assert_eq!(f.type_code, "POL");
    assert_eq!(f.section_code, "1");
    assert_eq!(f.composite(), "ENPOL1");
    assert_eq!(f.dashed(), "EN-POL-1");
  }

  #[test]
  fn facets_require_all_three_parts() {
    assert!(CodeFacets::parse("EN-POL").is_none());
    assert!(CodeFacets::parse("EN--1").is_none());
    assert!(CodeFacets::parse("XX-POL-1-001").is_none());
    assert!(CodeFacets::parse("GR-SOP-7").is_some());
  }

  #[test]
  fn trailing_number_extraction() {
    assert_eq!(trailing_number("EN-POL-1-002"), Some(2));
    assert_eq!(trailing_number("ENPOL1-120"), Some(120));
    assert_eq!(trailing_number("EN-POL-1-A"), None);
    assert_eq!(trailing_number("EN-POL-1-002X"), None);
  }

  #[test]
  fn suggestions_continue_after_highest_suffix() {
    let facets = CodeFacets::parse("EN-POL-1-002").unwrap();
    let existing = codes(&["EN-POL-1-001", "EN-POL-1-002"]);
    assert_eq!(
      next_suggestions(&facets, &existing),
      codes(&["ENPOL1-003", "ENPOL1-004", "ENPOL1-005", "ENPOL1-006", "ENPOL1-007"])
    );
  }

  #[test]
  fn suggestions_start_at_one_without_numeric_suffixes() {
    let facets = CodeFacets::parse("PL-WI-3-X").unwrap();
    let existing = codes(&["PL-WI-3-DRAFT"]);
    assert_eq!(
      next_suggestions(&facets, &existing),
      codes(&["PLWI3-001", "PLWI3-002", "PLWI3-003", "PLWI3-004", "PLWI3-005"])
    );
  }

  #[test]
  fn suggestions_mix_compact_and_dashed_history() {
    let facets = CodeFacets::parse("EN-POL-1").unwrap();
    let existing = codes(&["ENPOL1-004", "EN-POL-1-002"]);
    let s = next_suggestions(&facets, &existing);
    assert_eq!(s.first().map(String::as_str), Some("ENPOL1-005"));
    assert_eq!(s.len(), SUGGESTION_COUNT);
  }

  #[test]
  fn suggestions_stop_at_the_largest_suffix() {
    let facets = CodeFacets::parse("EN-POL-1-001").unwrap();
    let near_max = vec![format!("EN-POL-1-{}", u64::MAX - 2)];
    assert_eq!(next_suggestions(&facets, &near_max), vec![
      format!("ENPOL1-{}", u64::MAX - 1),
      format!("ENPOL1-{}", u64::MAX),
    ]);

    let at_max = vec![format!("EN-POL-1-{}", u64::MAX)];
    assert!(next_suggestions(&facets, &at_max).is_empty());
  }

  #[test]
  fn suggestions_are_strictly_increasing_and_unused() {
    let facets = CodeFacets::parse("GR-POL-2-010").unwrap();
    let existing = codes(&["GR-POL-2-010", "GRPOL2-007"]);
    let s = next_suggestions(&facets, &existing);
    let numbers: Vec<u64> = s.iter().filter_map(|c| trailing_number(c)).collect();
    assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    assert!(s.iter().all(|c| !existing.contains(c)));
  }
}
