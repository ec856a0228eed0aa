//! Field definitions of the form schema.
//!
//! - `Field`: common metadata (name, label, tooltip, admin flag) plus a
//!   closed `FieldKind`
//! - `FieldOption`: one selectable value of a radio / checkbox group
//! - `NestedFieldSpec`: template entry of a repeatable (dynamic) group
//!
//! Everything here is plain data. Structural checks run when the owning
//! [`Schema`](crate::schema::Schema) is built; behavior lives in
//! `interpret.rs`, `dynamic.rs` and `actions.rs`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use strum::{AsRefStr, Display, EnumString};

use crate::actions::ButtonId;
use crate::errors::{PathError, SchemaError};
use crate::key_path::FieldPath;

/// Semantic effect of a button.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ButtonAction {
    Next,
    Previous,
    Submit,
    Custom,
}

/// Editor flavor for text fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextInput {
    #[default]
    Plain,
    Number,
    /// Obfuscated visually only; the stored value stays plain.
    Secret,
    Multiline,
}

/// One selectable value. A radio option may reveal a nested field while it
/// is the selected one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveals: Option<Box<Field>>,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            reveals: None,
        }
    }

    pub fn reveals(mut self, field: Field) -> Self {
        self.reveals = Some(Box::new(field));
        self
    }
}

/// Template entry of a dynamic group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedFieldSpec {
    #[serde(flatten)]
    pub field: Field,
    /// Immutable on repetition 0 only.
    #[serde(default)]
    pub disable_on_first: bool,
}

impl NestedFieldSpec {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            disable_on_first: false,
        }
    }

    pub fn disable_on_first(mut self) -> Self {
        self.disable_on_first = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text {
        #[serde(default)]
        input: TextInput,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    Radio {
        options: Vec<FieldOption>,
    },
    /// Without options the value is a single boolean; with options it is
    /// the array of checked option values.
    Checkbox {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<Vec<FieldOption>>,
    },
    Toggle,
    Dynamic {
        nested_fields: Vec<NestedFieldSpec>,
        add_button_label: String,
    },
    Button {
        action: ButtonAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<ButtonId>,
    },
    Static {
        content: String,
    },
}

impl FieldKind {
    pub fn tag(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "text",
            FieldKind::Radio { .. } => "radio",
            FieldKind::Checkbox { .. } => "checkbox",
            FieldKind::Toggle => "toggle",
            FieldKind::Dynamic { .. } => "dynamic",
            FieldKind::Button { .. } => "button",
            FieldKind::Static { .. } => "static",
        }
    }
}

/// Declarative description of a form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<FieldPath>,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    /// Set by the admin-gating transform, never by schema authors.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub admin_only: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl Field {
    fn with_kind(name: Option<FieldPath>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name,
            label: label.into(),
            tooltip: None,
            admin_only: false,
            kind,
        }
    }

    fn named(name: &str) -> Result<Option<FieldPath>, PathError> {
        FieldPath::parse_name(name).map(Some)
    }

    pub fn text(name: &str, label: impl Into<String>) -> Result<Self, PathError> {
        Ok(Self::with_kind(
            Self::named(name)?,
            label,
            FieldKind::Text {
                input: TextInput::Plain,
                placeholder: None,
            },
        ))
    }

    pub fn number(name: &str, label: impl Into<String>) -> Result<Self, PathError> {
        Ok(Self::with_kind(
            Self::named(name)?,
            label,
            FieldKind::Text {
                input: TextInput::Number,
                placeholder: None,
            },
        ))
    }

    pub fn radio(
        name: &str,
        label: impl Into<String>,
        options: Vec<FieldOption>,
    ) -> Result<Self, PathError> {
        Ok(Self::with_kind(
            Self::named(name)?,
            label,
            FieldKind::Radio { options },
        ))
    }

    pub fn checkbox(name: &str, label: impl Into<String>) -> Result<Self, PathError> {
        Ok(Self::with_kind(
            Self::named(name)?,
            label,
            FieldKind::Checkbox { options: None },
        ))
    }

    pub fn toggle(name: &str, label: impl Into<String>) -> Result<Self, PathError> {
        Ok(Self::with_kind(Self::named(name)?, label, FieldKind::Toggle))
    }

    pub fn dynamic(
        name: &str,
        label: impl Into<String>,
        nested_fields: Vec<NestedFieldSpec>,
        add_button_label: impl Into<String>,
    ) -> Result<Self, PathError> {
        Ok(Self::with_kind(
            Self::named(name)?,
            label,
            FieldKind::Dynamic {
                nested_fields,
                add_button_label: add_button_label.into(),
            },
        ))
    }

    pub fn button(label: impl Into<String>, action: ButtonAction) -> Self {
        Self::with_kind(None, label, FieldKind::Button { action, id: None })
    }

    pub fn static_content(content: impl Into<String>) -> Self {
        Self::with_kind(
            None,
            "",
            FieldKind::Static {
                content: content.into(),
            },
        )
    }

    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn with_id(mut self, button_id: ButtonId) -> Self {
        if let FieldKind::Button { id, .. } = &mut self.kind {
            *id = Some(button_id);
        }
        self
    }

    /// Human readable handle for error messages.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None if !self.label.is_empty() => self.label.clone(),
            None => format!("<{}>", self.kind.tag()),
        }
    }

    pub fn is_button(&self) -> bool {
        matches!(self.kind, FieldKind::Button { .. })
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, FieldKind::Dynamic { .. })
    }

    /// Options for radio / checkbox kinds.
    pub fn options(&self) -> Option<&[FieldOption]> {
        match &self.kind {
            FieldKind::Radio { options } => Some(options),
            FieldKind::Checkbox {
                options: Some(options),
            } => Some(options),
            _ => None,
        }
    }

    /// Structural checks shared by top-level and nested fields.
    pub(crate) fn check(&self, section: &str) -> Result<(), SchemaError> {
        if let Some(name) = &self.name {
            name.ensure_key_only()
                .map_err(|source| SchemaError::InvalidName {
                    section: section.to_string(),
                    source,
                })?;
        }
        match &self.kind {
            FieldKind::Radio { options } => {
                if options.is_empty() {
                    return Err(SchemaError::MissingOptions(self.display_name()));
                }
                for revealed in options.iter().filter_map(|o| o.reveals.as_deref()) {
                    revealed.check(section)?;
                }
            }
            FieldKind::Dynamic { nested_fields, .. } => {
                if nested_fields.is_empty() {
                    return Err(SchemaError::MissingNestedFields(self.display_name()));
                }
                for nested in nested_fields {
                    let kind = nested.field.kind.tag();
                    if matches!(
                        nested.field.kind,
                        FieldKind::Dynamic { .. } | FieldKind::Button { .. }
                    ) {
                        return Err(SchemaError::UnsupportedNestedKind {
                            field: nested.field.display_name(),
                            kind,
                        });
                    }
                    nested.field.check(section)?;
                }
            }
            FieldKind::Button { .. } | FieldKind::Static { .. } => {}
            FieldKind::Checkbox {
                options: Some(options),
            } if options.iter().any(|o| o.reveals.is_some()) => {
                return Err(SchemaError::RevealOnCheckbox(self.display_name()));
            }
            FieldKind::Text { .. } | FieldKind::Checkbox { .. } | FieldKind::Toggle => {}
        }
        let needs_name = !matches!(
            self.kind,
            FieldKind::Button { .. } | FieldKind::Static { .. }
        );
        if needs_name && self.name.is_none() {
            return Err(SchemaError::MissingName {
                field: self.display_name(),
                kind: self.kind.tag(),
            });
        }
        Ok(())
    }
}
