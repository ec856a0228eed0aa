//! Field interpreter: turns one schema field plus the live values into a
//! [`RenderDirective`] (value, change target, message, editability).
//!
//! Rules applied to every kind:
//! - an admin-only field viewed without privilege is not editable and shows
//!   [`FieldMessage::AdminOnly`] in place of any validation message
//! - a tooltip takes the label slot; the label moves next to the info marker
//! - `toggle` reads absent / falsy values as `false`

use std::fmt;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::actions::ButtonId;
use crate::dynamic::{self, RepetitionDirective};
use crate::field::{ButtonAction, Field, FieldKind, FieldOption, TextInput};
use crate::key_path::FieldPath;
use crate::schema::{Schema, Section, SectionLayout};
use crate::values::{FormErrors, ValueStore};

/// Role information supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capability {
    pub is_privileged: bool,
}

impl Capability {
    pub const PRIVILEGED: Capability = Capability {
        is_privileged: true,
    };
    pub const RESTRICTED: Capability = Capability {
        is_privileged: false,
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum LabelSlot {
    Inline { label: String },
    /// The tooltip occupies the slot; `label` is shown beside the info marker.
    Tooltip { tooltip: String, label: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum FieldMessage {
    AdminOnly,
    Invalid(String),
}

impl fmt::Display for FieldMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldMessage::AdminOnly => f.write_str("(Admin only field)"),
            FieldMessage::Invalid(msg) => f.write_str(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionView {
    pub label: String,
    pub value: JsonValue,
}

impl From<&FieldOption> for OptionView {
    fn from(option: &FieldOption) -> Self {
        Self {
            label: option.label.clone(),
            value: option.value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DirectiveBody {
    Text {
        value: JsonValue,
        input: TextInput,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
    },
    Radio {
        options: Vec<OptionView>,
        selected: Option<usize>,
        /// Field revealed by the selected option; rendering it is up to the
        /// caller.
        #[serde(skip_serializing_if = "Option::is_none")]
        revealed: Option<Box<Field>>,
    },
    Checkbox {
        value: JsonValue,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        options: Vec<OptionView>,
        /// Indices of checked options (option lists only).
        #[serde(skip_serializing_if = "Vec::is_empty")]
        checked: Vec<usize>,
    },
    Toggle {
        on: bool,
    },
    Dynamic {
        add_button_label: String,
        repetitions: Vec<RepetitionDirective>,
    },
    Button {
        id: Option<ButtonId>,
        action: ButtonAction,
    },
    Static {
        content: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderDirective {
    /// Change-handler target; `None` for static content and buttons.
    pub path: Option<FieldPath>,
    pub label: LabelSlot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<FieldMessage>,
    pub editable: bool,
    pub admin_locked: bool,
    pub body: DirectiveBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionDirective {
    pub title: Option<String>,
    pub backend_key: String,
    pub layout: SectionLayout,
    pub fields: Vec<RenderDirective>,
}

pub fn resolve<V>(
    field: &Field,
    capability: Capability,
    values: &V,
    errors: &FormErrors,
) -> RenderDirective
where
    V: ValueStore + ?Sized,
{
    resolve_at(field, field.name.clone(), false, capability, values, errors)
}

/// Resolve `field` bound to `path` instead of its own name. `locked` forces
/// the directive read-only without touching the message.
pub(crate) fn resolve_at<V>(
    field: &Field,
    path: Option<FieldPath>,
    locked: bool,
    capability: Capability,
    values: &V,
    errors: &FormErrors,
) -> RenderDirective
where
    V: ValueStore + ?Sized,
{
    let admin_locked = field.admin_only && !capability.is_privileged;
    let stored = path.as_ref().and_then(|p| values.get(p));
    let current = stored.cloned().unwrap_or(JsonValue::Null);

    let body = match &field.kind {
        FieldKind::Text { input, placeholder } => DirectiveBody::Text {
            value: current,
            input: *input,
            placeholder: placeholder.clone(),
        },
        FieldKind::Radio { options } => {
            let selected = options.iter().position(|o| o.value == current);
            DirectiveBody::Radio {
                options: options.iter().map(OptionView::from).collect(),
                selected,
                revealed: selected.and_then(|i| options[i].reveals.clone()),
            }
        }
        FieldKind::Checkbox { options } => {
            let options = options.as_deref().unwrap_or_default();
            let checked = match &current {
                JsonValue::Array(items) => options
                    .iter()
                    .enumerate()
                    .filter(|(_, o)| items.contains(&o.value))
                    .map(|(i, _)| i)
                    .collect(),
                _ => Vec::new(),
            };
            DirectiveBody::Checkbox {
                value: current,
                options: options.iter().map(OptionView::from).collect(),
                checked,
            }
        }
        FieldKind::Toggle => DirectiveBody::Toggle {
            on: is_truthy(stored),
        },
        FieldKind::Dynamic {
            nested_fields,
            add_button_label,
        } => DirectiveBody::Dynamic {
            add_button_label: add_button_label.clone(),
            repetitions: match &path {
                Some(path) => dynamic::repetitions(
                    path,
                    nested_fields,
                    admin_locked || locked,
                    capability,
                    values,
                    errors,
                ),
                None => Vec::new(),
            },
        },
        FieldKind::Button { action, id } => DirectiveBody::Button {
            id: id.clone(),
            action: *action,
        },
        FieldKind::Static { content } => DirectiveBody::Static {
            content: content.clone(),
        },
    };

    let message = if admin_locked {
        Some(FieldMessage::AdminOnly)
    } else {
        path.as_ref()
            .and_then(|p| errors.get(&p.to_string()))
            .map(|msg| FieldMessage::Invalid(msg.to_string()))
    };
    let editable = !admin_locked && !locked && !matches!(field.kind, FieldKind::Static { .. });

    RenderDirective {
        path: match field.kind {
            FieldKind::Button { .. } | FieldKind::Static { .. } => None,
            _ => path,
        },
        label: label_slot(field),
        message,
        editable,
        admin_locked,
        body,
    }
}

/// Directive for the field revealed by the currently selected radio option.
pub fn resolve_revealed<V>(
    field: &Field,
    capability: Capability,
    values: &V,
    errors: &FormErrors,
) -> Option<RenderDirective>
where
    V: ValueStore + ?Sized,
{
    let FieldKind::Radio { options } = &field.kind else {
        return None;
    };
    let current = field.name.as_ref().and_then(|p| values.get(p))?;
    let revealed = options.iter().find(|o| &o.value == current)?.reveals.as_deref()?;
    Some(resolve(revealed, capability, values, errors))
}

pub fn resolve_section<V>(
    section: &Section,
    capability: Capability,
    values: &V,
    errors: &FormErrors,
) -> SectionDirective
where
    V: ValueStore + ?Sized,
{
    SectionDirective {
        title: section.title.clone(),
        backend_key: section.backend_key.clone(),
        layout: section.layout(),
        fields: section
            .fields
            .iter()
            .map(|f| resolve(f, capability, values, errors))
            .collect(),
    }
}

pub fn resolve_schema<V>(
    schema: &Schema,
    capability: Capability,
    values: &V,
    errors: &FormErrors,
) -> Vec<SectionDirective>
where
    V: ValueStore + ?Sized,
{
    schema
        .sections()
        .iter()
        .map(|s| resolve_section(s, capability, values, errors))
        .collect()
}

fn label_slot(field: &Field) -> LabelSlot {
    match &field.tooltip {
        Some(tooltip) => LabelSlot::Tooltip {
            tooltip: tooltip.clone(),
            label: field.label.clone(),
        },
        None => LabelSlot::Inline {
            label: field.label.clone(),
        },
    }
}

/// Falsy: absent, null, `false`, `0`, `""` and the string `"false"`.
pub(crate) fn is_truthy(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(JsonValue::String(s)) => !s.is_empty() && s != "false",
        Some(JsonValue::Array(_)) | Some(JsonValue::Object(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::FormValues;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn values(v: JsonValue) -> FormValues {
        FormValues::new(v)
    }

    fn gated(mut field: Field) -> Field {
        field.admin_only = true;
        field
    }

    #[test]
    fn reads_value_and_error_by_name() {
        let field = Field::number("callManagement.maxAttempts", "Max attempts").unwrap();
        let vals = values(json!({ "callManagement": { "maxAttempts": 4 } }));
        let errors = FormErrors::from_iter([("callManagement.maxAttempts", "Must be at most 3")]);

        let d = resolve(&field, Capability::RESTRICTED, &vals, &errors);
        assert_eq!(
            d.body,
            DirectiveBody::Text {
                value: json!(4),
                input: TextInput::Number,
                placeholder: None
            }
        );
        assert_eq!(d.message, Some(FieldMessage::Invalid("Must be at most 3".into())));
        assert!(d.editable);
        assert_eq!(d.path.unwrap().to_string(), "callManagement.maxAttempts");
    }

    #[test]
    fn admin_marker_replaces_validation_error() {
        let field = gated(Field::number("callManagement.maxAttempts", "Max attempts").unwrap());
        let errors = FormErrors::from_iter([("callManagement.maxAttempts", "Required")]);

        let restricted = resolve(&field, Capability::RESTRICTED, &FormValues::default(), &errors);
        assert!(!restricted.editable);
        assert_eq!(restricted.message, Some(FieldMessage::AdminOnly));
        assert_eq!(restricted.message.unwrap().to_string(), "(Admin only field)");

        let admin = resolve(&field, Capability::PRIVILEGED, &FormValues::default(), &errors);
        assert!(admin.editable);
        assert_eq!(admin.message, Some(FieldMessage::Invalid("Required".into())));
    }

    #[test]
    fn tooltip_takes_the_label_slot() {
        let field = Field::toggle("callRecording.enabled", "Record calls")
            .unwrap()
            .tooltip("Recordings are kept for 30 days");
        let d = resolve(
            &field,
            Capability::RESTRICTED,
            &FormValues::default(),
            &FormErrors::default(),
        );
        assert_eq!(
            d.label,
            LabelSlot::Tooltip {
                tooltip: "Recordings are kept for 30 days".into(),
                label: "Record calls".into()
            }
        );
    }

    #[test]
    fn toggle_coerces_falsy_values() {
        let field = Field::toggle("flags.on", "On").unwrap();
        for (stored, expected) in [
            (json!({}), false),
            (json!({ "flags": { "on": null } }), false),
            (json!({ "flags": { "on": 0 } }), false),
            (json!({ "flags": { "on": "" } }), false),
            (json!({ "flags": { "on": "false" } }), false),
            (json!({ "flags": { "on": true } }), true),
            (json!({ "flags": { "on": "true" } }), true),
        ] {
            let d = resolve(
                &field,
                Capability::RESTRICTED,
                &values(stored),
                &FormErrors::default(),
            );
            assert_eq!(d.body, DirectiveBody::Toggle { on: expected });
        }
    }

    #[test]
    fn radio_exposes_selection_and_revealed_field() {
        let rate = Field::number("callRecording.rate", "Sample rate (%)").unwrap();
        let field = Field::radio(
            "callRecording.mode",
            "Mode",
            vec![
                FieldOption::new("Off", "off"),
                FieldOption::new("Sampled", "sampled").reveals(rate.clone()),
            ],
        )
        .unwrap();
        let vals = values(json!({ "callRecording": { "mode": "sampled", "rate": 20 } }));

        let d = resolve(&field, Capability::RESTRICTED, &vals, &FormErrors::default());
        let DirectiveBody::Radio { selected, revealed, options } = d.body else {
            panic!("expected radio body");
        };
        assert_eq!(selected, Some(1));
        assert_eq!(options.len(), 2);
        assert_eq!(revealed.as_deref(), Some(&rate));

        let nested = resolve_revealed(&field, Capability::RESTRICTED, &vals, &FormErrors::default())
            .unwrap();
        assert_eq!(nested.path.unwrap().to_string(), "callRecording.rate");

        let off = values(json!({ "callRecording": { "mode": "off" } }));
        assert!(
            resolve_revealed(&field, Capability::RESTRICTED, &off, &FormErrors::default()).is_none()
        );
    }

    #[test]
    fn checkbox_options_report_checked_indices() {
        let mut field = Field::checkbox("filter.statuses", "Statuses").unwrap();
        field.kind = FieldKind::Checkbox {
            options: Some(vec![
                FieldOption::new("New", "new"),
                FieldOption::new("Callback", "callback"),
                FieldOption::new("Closed", "closed"),
            ]),
        };
        let vals = values(json!({ "filter": { "statuses": ["closed", "new"] } }));
        let d = resolve(&field, Capability::RESTRICTED, &vals, &FormErrors::default());
        let DirectiveBody::Checkbox { checked, .. } = d.body else {
            panic!("expected checkbox body");
        };
        assert_eq!(checked, vec![0, 2]);
    }

    #[test]
    fn static_and_button_have_no_binding() {
        let d = resolve(
            &Field::static_content("Changes apply to new calls only."),
            Capability::PRIVILEGED,
            &FormValues::default(),
            &FormErrors::default(),
        );
        assert!(d.path.is_none());
        assert!(!d.editable);
        assert!(d.message.is_none());

        let b = resolve(
            &Field::button("Next", ButtonAction::Next),
            Capability::RESTRICTED,
            &FormValues::default(),
            &FormErrors::default(),
        );
        assert!(matches!(b.body, DirectiveBody::Button { action: ButtonAction::Next, .. }));
        assert!(b.path.is_none());
    }
}
