//! Declarative container for a multi-step form.
//!
//! A `Schema` groups ordered `Section`s, each holding ordered `Field`s.
//! Construction (either `Schema::new` or deserialization) runs the structural
//! checks, so a `Schema` value in hand is always well-formed. Sections are
//! reference counted: the admin-gating transform copies only the sections it
//! changes and shares the rest with the template.
//!
//! Typical usage:
//! ```ignore
//! let schema = Schema::new("Phone Settings", "Phone Settings", vec![
//!     Section::new(Some("Call management".into()), "callManagement", vec![
//!         Field::number("callManagement.maxAttempts", "Max attempts")?,
//!     ]),
//!     Section::new(None, "actions", vec![Field::button("Save", ButtonAction::Submit)]),
//! ])?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::actions::ButtonId;
use crate::errors::SchemaError;
use crate::field::{ButtonAction, Field, FieldKind};

/// Layout hint derived from a section's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionLayout {
    /// Every field is a button (a button row).
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Absent for inline rows (typically buttons).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub backend_key: String,
    pub fields: Vec<Field>,
}

impl Section {
    pub fn new(title: Option<String>, backend_key: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            title,
            backend_key: backend_key.into(),
            fields,
        }
    }

    pub fn layout(&self) -> SectionLayout {
        if !self.fields.is_empty() && self.fields.iter().all(Field::is_button) {
            SectionLayout::Horizontal
        } else {
            SectionLayout::Vertical
        }
    }
}

/// Serialized shape of a schema; converted into [`Schema`] through validation.
#[derive(Debug, Clone, Deserialize)]
struct SchemaDocument {
    title: String,
    backend_key: String,
    sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDocument")]
pub struct Schema {
    title: String,
    backend_key: String,
    sections: Vec<Arc<Section>>,
}

impl Schema {
    pub fn new(
        title: impl Into<String>,
        backend_key: impl Into<String>,
        sections: Vec<Section>,
    ) -> Result<Self, SchemaError> {
        Self::try_from(SchemaDocument {
            title: title.into(),
            backend_key: backend_key.into(),
            sections,
        })
    }

    /// Parse and validate a JSON schema document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn backend_key(&self) -> &str {
        &self.backend_key
    }

    pub fn sections(&self) -> &[Arc<Section>] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn section_by_key(&self, key: &str) -> Option<&Section> {
        self.sections
            .iter()
            .map(Arc::as_ref)
            .find(|s| s.backend_key == key)
    }

    /// Find a top-level field by its dotted name.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields()
            .find(|f| f.name.as_ref().is_some_and(|n| n.to_string() == name))
    }

    /// All top-level fields in render order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    /// Every button as `(section index, field index, id, action)`.
    pub fn buttons(&self) -> impl Iterator<Item = (usize, usize, &ButtonId, ButtonAction)> {
        self.sections.iter().enumerate().flat_map(|(si, section)| {
            section
                .fields
                .iter()
                .enumerate()
                .filter_map(move |(fi, field)| match &field.kind {
                    FieldKind::Button {
                        action,
                        id: Some(id),
                    } => Some((si, fi, id, *action)),
                    _ => None,
                })
        })
    }

    pub fn button(&self, id: &ButtonId) -> Option<(usize, usize, ButtonAction)> {
        self.buttons()
            .find(|(_, _, candidate, _)| *candidate == id)
            .map(|(si, fi, _, action)| (si, fi, action))
    }

    pub(crate) fn with_sections(&self, sections: Vec<Arc<Section>>) -> Self {
        Self {
            title: self.title.clone(),
            backend_key: self.backend_key.clone(),
            sections,
        }
    }
}

impl TryFrom<SchemaDocument> for Schema {
    type Error = SchemaError;

    fn try_from(doc: SchemaDocument) -> Result<Self, Self::Error> {
        let mut section_keys = HashSet::new();
        let mut button_ids = HashSet::new();
        let mut sections = Vec::with_capacity(doc.sections.len());

        for (si, mut section) in doc.sections.into_iter().enumerate() {
            if !section_keys.insert(section.backend_key.clone()) {
                return Err(SchemaError::DuplicateSection(section.backend_key));
            }
            for (fi, field) in section.fields.iter_mut().enumerate() {
                field.check(&section.backend_key)?;
                if let FieldKind::Button { action, id } = &mut field.kind {
                    let id = id.get_or_insert_with(|| ButtonId::derived(si, fi, *action));
                    if !button_ids.insert(id.clone()) {
                        return Err(SchemaError::DuplicateButton(id.clone()));
                    }
                }
            }
            sections.push(Arc::new(section));
        }

        Ok(Schema {
            title: doc.title,
            backend_key: doc.backend_key,
            sections,
        })
    }
}
