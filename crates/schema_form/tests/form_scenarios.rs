//! End-to-end scenarios for the form engine:
//! - admin gating on a phone-settings schema (prefix match, idempotence)
//! - dynamic groups with a locked first repetition
//! - a validation-gated submit button

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use futures::FutureExt;
use schema_form::{
    annotate, resolve, AdminOnlyPaths, ButtonAction, ButtonId, ButtonState, Capability,
    ClickOutcome, Field, FieldMessage, Form, FormConfig, FormErrors, FormHandlers, FormValues,
    NestedFieldSpec, Schema, Section, Validation, ValidationScope,
};
use serde_json::json;

fn phone_settings() -> Schema {
    Schema::new(
        "Phone Settings",
        "Phone Settings",
        vec![
            Section::new(
                Some("Call management".into()),
                "callManagement",
                vec![Field::number("callManagement.maxAttempts", "Max attempts").unwrap()],
            ),
            Section::new(
                None,
                "actions",
                vec![Field::button("Save", ButtonAction::Submit).with_id(ButtonId::new("save"))],
            ),
        ],
    )
    .unwrap()
}

fn paths(raw: &[&str]) -> AdminOnlyPaths {
    AdminOnlyPaths::parse(raw.iter().copied()).unwrap()
}

#[test]
fn section_path_gates_field_and_sibling_section_does_not() {
    let schema = phone_settings();

    let gated = annotate(&schema, &paths(&["Phone Settings.callManagement"]));
    assert!(gated.field_by_name("callManagement.maxAttempts").unwrap().admin_only);

    let other = annotate(&schema, &paths(&["Phone Settings.callRecording"]));
    assert!(!other.field_by_name("callManagement.maxAttempts").unwrap().admin_only);
}

#[test]
fn gating_is_idempotent_and_unaffected_by_unrelated_paths() {
    let schema = phone_settings();
    for list in [
        vec!["Phone Settings.callManagement"],
        vec!["Phone Settings.callManagement.maxAttempts", "Other.a", "Other.b"],
        vec!["Phone Settings", "Nope.nope"],
    ] {
        let p = paths(&list);
        let once = annotate(&schema, &p);
        assert_eq!(annotate(&once, &p), once);
        assert!(once.field_by_name("callManagement.maxAttempts").unwrap().admin_only);
    }
}

#[test]
fn restricted_viewer_sees_admin_marker_over_validation_error() {
    let gated = annotate(&phone_settings(), &paths(&["Phone Settings.callManagement"]));
    let field = gated.field_by_name("callManagement.maxAttempts").unwrap();
    let errors = FormErrors::from_iter([("callManagement.maxAttempts", "Required")]);

    let d = resolve(field, Capability::RESTRICTED, &FormValues::default(), &errors);
    assert!(!d.editable);
    assert_eq!(d.message, Some(FieldMessage::AdminOnly));
}

#[test]
fn dynamic_group_locks_only_the_first_gap() {
    let field = Field::dynamic(
        "steps",
        "Steps",
        vec![NestedFieldSpec::new(Field::number("gap", "Gap").unwrap()).disable_on_first()],
        "Add step",
    )
    .unwrap();
    let values = FormValues::new(json!({ "steps": [{}, {}, {}] }));
    let reps = schema_form::dynamic::resolve_group(
        &field,
        Capability::RESTRICTED,
        &values,
        &FormErrors::default(),
    )
    .unwrap();
    let editable: Vec<bool> = reps.iter().map(|r| r.fields[0].editable).collect();
    assert_eq!(editable, vec![false, true, true]);
}

struct RejectingValidator {
    submits: AtomicUsize,
}

impl FormHandlers for RejectingValidator {
    fn validate<'a>(
        &'a self,
        _values: &'a FormValues,
        _scope: ValidationScope,
    ) -> BoxFuture<'a, Validation> {
        async { Err(FormErrors::from_iter([("callManagement.maxAttempts", "Required")])) }.boxed()
    }

    fn on_submit<'a>(&'a self, _values: &'a FormValues) -> BoxFuture<'a, anyhow::Result<()>> {
        async move {
            self.submits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }
}

#[tokio::test(start_paused = true)]
async fn submit_with_one_validation_error_stays_idle() {
    let form = Form::new(
        &phone_settings(),
        &AdminOnlyPaths::default(),
        Capability::PRIVILEGED,
        FormConfig::default(),
    );
    let handlers = RejectingValidator {
        submits: AtomicUsize::new(0),
    };
    let save = ButtonId::new("save");

    let outcome = form
        .click(&save, &FormValues::default(), &handlers)
        .await
        .unwrap();
    let ClickOutcome::Invalid(errors) = outcome else {
        panic!("expected validation failure");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(form.button_state(&save), ButtonState::Idle);
    assert_eq!(handlers.submits.load(Ordering::SeqCst), 0);
}

#[test]
fn json_schema_documents_load_with_derived_ids() {
    let schema = Schema::from_json(
        r#"{
            "title": "Phone Settings",
            "backend_key": "Phone Settings",
            "sections": [
                { "title": "Calls", "backend_key": "callManagement", "fields": [
                    {
                        "name": "callManagement.maxAttempts",
                        "label": "Max attempts",
                        "kind": "text",
                        "input": "number"
                    }
                ]},
                { "backend_key": "actions", "fields": [
                    { "label": "Save", "kind": "button", "action": "SUBMIT" }
                ]}
            ]
        }"#,
    )
    .unwrap();
    let ids: Vec<String> = schema.buttons().map(|(_, _, id, _)| id.to_string()).collect();
    assert_eq!(ids, vec!["1:0:SUBMIT"]);
}
