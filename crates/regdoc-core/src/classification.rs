//! Standards, document types and the two-level section hierarchy.
//!
//! Sections form a forest at most two levels deep: a section's parent must be
//! a top-level section, and a section that already has sub-sections cannot
//! itself be placed under a parent. The parent chain is walked before every
//! write so a section can never become its own ancestor.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, document::clean_optional, natural::natural_cmp, store::DocumentStore};

// ─── Records ─────────────────────────────────────────────────────────────────

/// A top-level compliance framework, e.g. "ISO 9001".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standard {
  pub id:   Uuid,
  pub name: String,
}

/// A kind of controlled document (policy, procedure, work instruction…).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
  pub id:   Uuid,
  pub name: String,
  /// The TYPE facet of a reference code, e.g. `POL`.
  pub code: String,
}

/// A clause or sub-clause of a standard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
  pub id:                Uuid,
  /// Human clause number, e.g. `4.1`.
  pub code:              String,
  /// Preferred SECTION facet of a reference code; `code` is used when unset.
  pub short_code:        Option<String>,
  pub title:             String,
  pub description:       String,
  /// May dangle if the standard was deleted.
  pub standard_id:       Option<Uuid>,
  pub parent_section_id: Option<Uuid>,
}

impl Section {
  /// The code used when this section is a reference-code facet.
  pub fn facet_code(&self) -> &str {
    self.short_code.as_deref().unwrap_or(&self.code)
  }

  pub fn is_top_level(&self) -> bool { self.parent_section_id.is_none() }
}

/// Input to [`ClassificationStore::upsert_section`]. When `id` is absent or
/// unknown a new section is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionInput {
  pub id:                Option<Uuid>,
  pub code:              String,
  pub short_code:        Option<String>,
  pub title:             String,
  #[serde(default)]
  pub description:       String,
  pub standard_id:       Option<Uuid>,
  pub parent_section_id: Option<Uuid>,
}

// ─── Hierarchy rules ─────────────────────────────────────────────────────────

/// Check that `parent_id` may become the parent of `section_id`, given every
/// section currently stored (keyed by id).
///
/// Rejects, in order: self-parenting, an unknown parent, a parent chain that
/// reaches `section_id` or loops on itself, a parent that is not top-level,
/// and a section that already has sub-sections of its own.
pub fn validate_parent(
  sections: &HashMap<Uuid, Section>,
  section_id: Uuid,
  parent_id: Uuid,
) -> Result<()> {
  if parent_id == section_id {
    return Err(Error::SelfParent(section_id));
  }

  let parent = sections
    .get(&parent_id)
    .ok_or(Error::SectionNotFound(parent_id))?;

  let mut seen = HashSet::new();
  let mut cursor = Some(parent_id);
  while let Some(id) = cursor {
    if id == section_id || !seen.insert(id) {
      return Err(Error::Cycle { section: section_id, parent: parent_id });
    }
    cursor = sections.get(&id).and_then(|s| s.parent_section_id);
  }

  if !parent.is_top_level() {
    return Err(Error::DepthExceeded(format!(
      "parent section {} is itself a sub-section",
      parent.code
    )));
  }

  if sections
    .values()
    .any(|s| s.parent_section_id == Some(section_id))
  {
    return Err(Error::DepthExceeded(
      "a section with sub-sections cannot be given a parent".into(),
    ));
  }

  Ok(())
}

/// Sort sections by code using natural ordering.
pub fn sort_sections(sections: &mut [Section]) {
  sections.sort_by(|a, b| natural_cmp(&a.code, &b.code));
}

// ─── Component ───────────────────────────────────────────────────────────────

/// Validated access to standards, document types and sections.
pub struct ClassificationStore<S> {
  store: Arc<S>,
}

impl<S> Clone for ClassificationStore<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: DocumentStore> ClassificationStore<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  // ── Standards ─────────────────────────────────────────────────────────

  pub async fn create_standard(&self, name: String) -> Result<Standard> {
    let name = required("name", &name)?;
    let standard = Standard { id: Uuid::new_v4(), name };
    self.store.insert_standard(standard).await.map_err(Error::store)
  }

  pub async fn rename_standard(&self, id: Uuid, name: String) -> Result<Standard> {
    let name = required("name", &name)?;
    self
      .store
      .rename_standard(id, name)
      .await
      .map_err(Error::store)?
      .ok_or(Error::StandardNotFound(id))
  }

  /// Delete a standard unconditionally. Sections and documents that refer to
  /// it keep the dangling id.
  pub async fn delete_standard(&self, id: Uuid) -> Result<()> {
    let removed = self.store.delete_standard(id).await.map_err(Error::store)?;
    if !removed {
      return Err(Error::StandardNotFound(id));
    }
    tracing::info!(standard_id = %id, "standard deleted");
    Ok(())
  }

  pub async fn get_standard(&self, id: Uuid) -> Result<Standard> {
    self
      .store
      .get_standard(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::StandardNotFound(id))
  }

  pub async fn list_standards(&self) -> Result<Vec<Standard>> {
    let mut standards = self.store.list_standards().await.map_err(Error::store)?;
    standards.sort_by(|a, b| natural_cmp(&a.name, &b.name));
    Ok(standards)
  }

  // ── Document types ────────────────────────────────────────────────────

  pub async fn create_document_type(
    &self,
    name: String,
    code: String,
  ) -> Result<DocumentType> {
    let document_type = DocumentType {
      id:   Uuid::new_v4(),
      name: required("name", &name)?,
      code: required("code", &code)?.to_uppercase(),
    };
    self
      .store
      .insert_document_type(document_type)
      .await
      .map_err(Error::store)
  }

  pub async fn get_document_type(&self, id: Uuid) -> Result<DocumentType> {
    self
      .store
      .get_document_type(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::DocumentTypeNotFound(id))
  }

  pub async fn list_document_types(&self) -> Result<Vec<DocumentType>> {
    let mut types = self.store.list_document_types().await.map_err(Error::store)?;
    types.sort_by(|a, b| natural_cmp(&a.name, &b.name));
    Ok(types)
  }

  // ── Sections ──────────────────────────────────────────────────────────

  /// Create or replace a section after validating its fields and its place
  /// in the hierarchy.
  ///
  /// The hierarchy check reads the whole parent chain before writing. It is
  /// not transactionally locked against concurrent hierarchy edits.
  pub async fn upsert_section(&self, input: SectionInput) -> Result<Section> {
    let code = required("code", &input.code)?;
    let title = required("title", &input.title)?;

    if let Some(standard_id) = input.standard_id {
      self.get_standard(standard_id).await?;
    }

    let section_id = input.id.unwrap_or_else(Uuid::new_v4);

    if let Some(parent_id) = input.parent_section_id {
      let all: HashMap<Uuid, Section> = self
        .store
        .list_sections(None)
        .await
        .map_err(Error::store)?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
      validate_parent(&all, section_id, parent_id)?;
    }

    let section = Section {
      id: section_id,
      code,
      short_code: clean_optional(input.short_code),
      title,
      description: input.description.trim().to_owned(),
      standard_id: input.standard_id,
      parent_section_id: input.parent_section_id,
    };

    let saved = self.store.save_section(section).await.map_err(Error::store)?;
    tracing::debug!(section_id = %saved.id, code = %saved.code, "section saved");
    Ok(saved)
  }

  pub async fn get_section(&self, id: Uuid) -> Result<Section> {
    self
      .store
      .get_section(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::SectionNotFound(id))
  }

  /// Sections in natural code order, optionally restricted to one standard.
  pub async fn list_sections(&self, standard_id: Option<Uuid>) -> Result<Vec<Section>> {
    let mut sections = self
      .store
      .list_sections(standard_id)
      .await
      .map_err(Error::store)?;
    sort_sections(&mut sections);
    Ok(sections)
  }

  /// Sections that may be chosen as the parent of `section_id` (or of a new
  /// section when `None`): top-level sections other than the section itself.
  pub async fn parent_options(&self, section_id: Option<Uuid>) -> Result<Vec<Section>> {
    let mut options: Vec<Section> = self
      .store
      .list_sections(None)
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter(|s| s.is_top_level() && Some(s.id) != section_id)
      .collect();
    sort_sections(&mut options);
    Ok(options)
  }
}

/// Trim `value`, failing with a validation error if nothing is left.
pub(crate) fn required(field: &str, value: &str) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::Validation(format!("{field} is required")));
  }
  Ok(trimmed.to_owned())
}
