//! Form runtime: one gated schema, its button state machine and the
//! multi-step cursor.
//!
//! A `Form` is built once per schema version and role. Rendering is a pure
//! read of the caller's values; clicks go through the shared
//! [`ActionMachine`], and a completed `NEXT` / `PREVIOUS` moves the step
//! cursor. Steps are the content sections only; button rows are never a
//! step.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::actions::{
    ActionConfig, ActionMachine, ButtonId, ButtonState, ClickOutcome, FormHandlers,
    ValidationScope,
};
use crate::errors::ActionError;
use crate::field::{ButtonAction, Field, FieldKind};
use crate::gating::{annotate_with_report, AdminOnlyPaths, GatingReport};
use crate::interpret::{is_truthy, resolve_schema, resolve_section, Capability, SectionDirective};
use crate::key_path::FieldPath;
use crate::schema::{Schema, SectionLayout};
use crate::values::{FormErrors, FormValues, ValueStore};

/// Which fields `NEXT` asks the validator to check. `SUBMIT` always
/// validates the whole form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopePolicy {
    /// Whole schema on every step.
    #[default]
    WholeForm,
    /// Only the section the cursor is on.
    CurrentStep,
}

#[derive(Debug, Clone, Default)]
pub struct FormConfig {
    pub actions: ActionConfig,
    pub scope: ScopePolicy,
}

pub struct Form {
    schema: Schema,
    capability: Capability,
    machine: ActionMachine,
    scope: ScopePolicy,
    /// Indices of the sections that are wizard steps.
    steps: Vec<usize>,
    step: AtomicUsize,
    report: GatingReport,
}

impl Form {
    /// Gate `template` for `capability` and set up a fresh runtime.
    pub fn new(
        template: &Schema,
        admin_paths: &AdminOnlyPaths,
        capability: Capability,
        config: FormConfig,
    ) -> Self {
        Self::with_machine(
            template,
            admin_paths,
            capability,
            config.scope,
            ActionMachine::new(config.actions),
        )
    }

    /// Same as [`Form::new`] with a caller-built machine (e.g. one that
    /// publishes button events).
    pub fn with_machine(
        template: &Schema,
        admin_paths: &AdminOnlyPaths,
        capability: Capability,
        scope: ScopePolicy,
        machine: ActionMachine,
    ) -> Self {
        let (schema, report) = annotate_with_report(template, admin_paths);
        info!(
            schema = schema.backend_key(),
            privileged = capability.is_privileged,
            gated = report.gated_fields,
            "form ready"
        );
        let steps: Vec<usize> = schema
            .sections()
            .iter()
            .enumerate()
            .filter(|(_, section)| section.layout() == SectionLayout::Vertical)
            .map(|(index, _)| index)
            .collect();
        let first = steps.first().copied().unwrap_or(0);
        Self {
            schema,
            capability,
            machine,
            scope,
            steps,
            step: AtomicUsize::new(first),
            report,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn gating_report(&self) -> &GatingReport {
        &self.report
    }

    pub fn machine(&self) -> &ActionMachine {
        &self.machine
    }

    /// Section index under the step cursor.
    pub fn current_step(&self) -> usize {
        self.step.load(Ordering::SeqCst)
    }

    pub fn button_state(&self, id: &ButtonId) -> ButtonState {
        self.machine.state(id)
    }

    /// Advisory: disable the whole fieldset while this is true.
    pub fn is_busy(&self, submitting: bool) -> bool {
        submitting || self.machine.any_pending()
    }

    pub fn render<V>(&self, values: &V, errors: &FormErrors) -> Vec<SectionDirective>
    where
        V: ValueStore + ?Sized,
    {
        resolve_schema(&self.schema, self.capability, values, errors)
    }

    /// Directives of the section under the step cursor.
    pub fn render_step<V>(&self, values: &V, errors: &FormErrors) -> Option<SectionDirective>
    where
        V: ValueStore + ?Sized,
    {
        self.schema
            .sections()
            .get(self.current_step())
            .map(|s| resolve_section(s, self.capability, values, errors))
    }

    pub async fn click<H>(
        &self,
        id: &ButtonId,
        values: &FormValues,
        handlers: &H,
    ) -> Result<ClickOutcome, ActionError>
    where
        H: FormHandlers + ?Sized,
    {
        let (_, _, action) = self
            .schema
            .button(id)
            .ok_or_else(|| ActionError::UnknownButton(id.clone()))?;
        let scope = match (action, self.scope) {
            (ButtonAction::Next, ScopePolicy::CurrentStep) => {
                ValidationScope::Section(self.current_step())
            }
            _ => ValidationScope::Form,
        };

        let outcome = self
            .machine
            .click(id, action, scope, values, handlers)
            .await?;

        if outcome == ClickOutcome::Completed {
            let moved = match action {
                ButtonAction::Next => self.move_step(|s| {
                    self.steps.iter().copied().find(|&i| i > s).unwrap_or(s)
                }),
                ButtonAction::Previous => self.move_step(|s| {
                    self.steps.iter().rev().copied().find(|&i| i < s).unwrap_or(s)
                }),
                ButtonAction::Submit | ButtonAction::Custom => None,
            };
            if let Some(step) = moved {
                debug!(button = %id, step, "step changed");
            }
        }
        Ok(outcome)
    }

    fn move_step(&self, f: impl Fn(usize) -> usize) -> Option<usize> {
        self.step
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| Some(f(s)))
            .ok()
            .map(f)
    }

    /// JSON payload of every bound field. Object keys come out sorted.
    /// Toggles become booleans, dynamic groups arrays, and a revealed field is
    /// included only while its option is selected. For a restricted viewer
    /// admin-only fields (including nested ones in every repetition) are left
    /// out.
    pub fn submission<V>(&self, values: &V) -> FormValues
    where
        V: ValueStore + ?Sized,
    {
        let mut payload = FormValues::default();
        let restricted = !self.capability.is_privileged;
        for field in self.schema.fields() {
            collect(field, values, restricted, &mut payload);
        }
        payload
    }
}

fn collect<V>(field: &Field, values: &V, restricted: bool, payload: &mut FormValues)
where
    V: ValueStore + ?Sized,
{
    let Some(name) = &field.name else {
        return;
    };
    if restricted && field.admin_only {
        return;
    }
    let stored = values.get(name);
    let value = match &field.kind {
        FieldKind::Toggle => JsonValue::Bool(is_truthy(stored)),
        FieldKind::Dynamic { nested_fields, .. } => match stored {
            Some(JsonValue::Array(items)) => {
                let locked: Vec<&FieldPath> = nested_fields
                    .iter()
                    .filter(|spec| restricted && spec.field.admin_only)
                    .filter_map(|spec| spec.field.name.as_ref())
                    .collect();
                JsonValue::Array(
                    items
                        .iter()
                        .map(|item| strip(item.clone(), &locked))
                        .collect(),
                )
            }
            _ => JsonValue::Array(Vec::new()),
        },
        FieldKind::Radio { options } => {
            let current = stored.cloned().unwrap_or(JsonValue::Null);
            if let Some(revealed) = options
                .iter()
                .find(|o| o.value == current)
                .and_then(|o| o.reveals.as_deref())
            {
                collect(revealed, values, restricted, payload);
            }
            current
        }
        FieldKind::Text { .. } | FieldKind::Checkbox { .. } => {
            stored.cloned().unwrap_or(JsonValue::Null)
        }
        FieldKind::Button { .. } | FieldKind::Static { .. } => return,
    };
    payload.set_value(name, value);
}

/// Drop the `locked` nested paths from one repetition record.
fn strip(item: JsonValue, locked: &[&FieldPath]) -> JsonValue {
    if locked.is_empty() || !item.is_object() {
        return item;
    }
    let mut record = FormValues::new(item);
    for path in locked {
        record.remove(path);
    }
    record.into_json()
}
