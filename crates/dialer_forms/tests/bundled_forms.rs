use std::path::Path;

use dialer_forms::catalog::SchemaKind;
use dialer_forms::cli::{gate, render, submit, SubmitResult};
use dialer_forms::config::FormsConfig;
use pretty_assertions::assert_eq;
use schema_form::{
    AdminOnlyPaths, ButtonId, Capability, ClickOutcome, Form, FormErrors, FormValues, ScopePolicy,
};
use serde_json::json;
use strum::IntoEnumIterator;

fn defaults() -> FormsConfig {
    FormsConfig::load(Some(Path::new("no-such-dialer-forms.toml"))).unwrap()
}

#[test]
fn default_admin_paths_all_hit_a_field() {
    let config = defaults();
    let mut gated = Vec::new();
    for kind in SchemaKind::iter() {
        let out = gate(kind, &config).unwrap();
        assert_eq!(out["unmatched"], json!([]), "unmatched paths in {kind}");
        gated.push(out["gated_fields"].as_u64().unwrap());
    }
    assert_eq!(gated, vec![0, 2, 1]);
}

#[test]
fn restricted_viewer_gets_locked_attempt_settings() {
    let values = FormValues::new(json!({
        "exitStrategy": { "maxAttempts": 3, "attempts": [{}, {}] }
    }));
    let section = render(
        SchemaKind::ListExitStrategy,
        Capability::RESTRICTED,
        &values,
        &FormErrors::default(),
        Some(0),
        &defaults(),
    )
    .unwrap();

    let max_attempts = &section["fields"][0];
    assert_eq!(max_attempts["editable"], json!(false));
    assert_eq!(max_attempts["message"], json!({ "type": "admin_only" }));

    let reps = section["fields"][1]["body"]["repetitions"].as_array().unwrap();
    let gap_editable: Vec<bool> = reps
        .iter()
        .map(|r| r["fields"][0]["editable"].as_bool().unwrap())
        .collect();
    assert_eq!(gap_editable, vec![false, false]);
}

#[test]
fn admin_viewer_only_loses_the_first_gap() {
    let values = FormValues::new(json!({ "exitStrategy": { "attempts": [{}, {}, {}] } }));
    let section = render(
        SchemaKind::ListExitStrategy,
        Capability::PRIVILEGED,
        &values,
        &FormErrors::default(),
        Some(0),
        &defaults(),
    )
    .unwrap();

    assert_eq!(section["fields"][0]["editable"], json!(true));
    let reps = section["fields"][1]["body"]["repetitions"].as_array().unwrap();
    let gap_editable: Vec<bool> = reps
        .iter()
        .map(|r| r["fields"][0]["editable"].as_bool().unwrap())
        .collect();
    assert_eq!(gap_editable, vec![false, true, true]);
}

#[test]
fn render_rejects_a_missing_step() {
    let err = render(
        SchemaKind::CallRecording,
        Capability::PRIVILEGED,
        &FormValues::default(),
        &FormErrors::default(),
        Some(9),
        &defaults(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("no step 9"));
}

#[tokio::test(start_paused = true)]
async fn call_recording_submission_is_normalized() {
    let values = FormValues::new(json!({
        "recording": { "enabled": true, "mode": "sampled", "sampleRate": "25" },
        "retention": { "days": " 30 " }
    }));
    let result = submit(
        SchemaKind::CallRecording,
        Capability::PRIVILEGED,
        values,
        None,
        &defaults(),
    )
    .await
    .unwrap();

    let SubmitResult::Accepted { button, payload } = result else {
        panic!("expected the submission to pass validation");
    };
    assert_eq!(button, ButtonId::new("save-rules"));
    assert_eq!(
        payload.as_json(),
        &json!({
            "recording": { "enabled": true, "mode": "sampled", "sampleRate": 25, "announce": null },
            "retention": { "days": 30 }
        })
    );
}

#[tokio::test(start_paused = true)]
async fn incomplete_exit_strategy_is_rejected() {
    let result = submit(
        SchemaKind::ListExitStrategy,
        Capability::PRIVILEGED,
        FormValues::new(json!({
            "exitStrategy": { "attempts": [{ "gap": 0 }, { "gap": 99999 }] }
        })),
        None,
        &defaults(),
    )
    .await
    .unwrap();

    let SubmitResult::Rejected(errors) = result else {
        panic!("expected validation errors");
    };
    let paths: Vec<&str> = errors.iter().map(|(path, _)| path).collect();
    assert_eq!(
        paths,
        vec![
            "exitRules.finalDisposition",
            "exitStrategy.attempts[1].gap",
            "exitStrategy.maxAttempts",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn custom_button_skips_validation() {
    let result = submit(
        SchemaKind::CallRecording,
        Capability::RESTRICTED,
        FormValues::default(),
        Some(ButtonId::new("play-announcement")),
        &defaults(),
    )
    .await
    .unwrap();
    assert!(matches!(result, SubmitResult::Accepted { .. }));
}

fn step_scoped() -> FormsConfig {
    let mut config = defaults();
    config.validation_scope = ScopePolicy::CurrentStep;
    config
}

#[tokio::test(start_paused = true)]
async fn list_filter_steps_stop_before_the_button_row() {
    let schema = SchemaKind::ListFilter.load().unwrap();
    let rules = SchemaKind::ListFilter.rules(&schema).unwrap();
    let form = Form::new(
        &schema,
        &AdminOnlyPaths::default(),
        Capability::PRIVILEGED,
        step_scoped().form_config(),
    );
    let next = ButtonId::new("2:1:NEXT");
    let values = FormValues::new(json!({ "criteria": { "name": "Warm leads" } }));

    for _ in 0..2 {
        let outcome = form.click(&next, &values, &rules).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Completed);
    }
    assert_eq!(form.current_step(), 1);
    let step = form.render_step(&values, &FormErrors::default()).unwrap();
    assert_eq!(step.backend_key, "ordering");
}

#[tokio::test(start_paused = true)]
async fn step_scoped_submit_still_checks_every_section() {
    let result = submit(
        SchemaKind::ListExitStrategy,
        Capability::PRIVILEGED,
        FormValues::new(json!({ "exitStrategy": { "maxAttempts": 3 } })),
        Some(ButtonId::new("save-strategy")),
        &step_scoped(),
    )
    .await
    .unwrap();

    let SubmitResult::Rejected(errors) = result else {
        panic!("expected the other section to be validated too");
    };
    assert_eq!(errors.get("exitRules.finalDisposition"), Some("Required"));
}

#[tokio::test(start_paused = true)]
async fn restricted_submit_drops_admin_only_values() {
    let result = submit(
        SchemaKind::ListExitStrategy,
        Capability::RESTRICTED,
        FormValues::new(json!({
            "exitStrategy": {
                "maxAttempts": 20,
                "attempts": [{ "gap": 0, "onNoAnswer": "hang_up" }, { "gap": "45" }]
            },
            "exitRules": { "finalDisposition": "close" }
        })),
        None,
        &defaults(),
    )
    .await
    .unwrap();

    let SubmitResult::Accepted { payload, .. } = result else {
        panic!("expected the submission to pass validation");
    };
    assert_eq!(
        payload.as_json(),
        &json!({
            "exitStrategy": { "attempts": [{ "onNoAnswer": "hang_up" }, {}] },
            "exitRules": { "finalDisposition": "close" }
        })
    );
}
