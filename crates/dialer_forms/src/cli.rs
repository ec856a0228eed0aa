use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use futures::future::BoxFuture;
use futures::FutureExt;
use schema_form::{
    ButtonAction, ButtonId, Capability, ClickOutcome, Form, FormErrors, FormHandlers, FormValues,
    Validation, ValidationScope,
};
use serde_json::{json, Value as JsonValue};
use strum::IntoEnumIterator;
use tracing::info;

use crate::catalog::SchemaKind;
use crate::config::FormsConfig;
use crate::validation::RuleValidator;

#[derive(Parser)]
#[command(
    name = "dialer-forms",
    version,
    about = "Render, gate and submit the dialer settings forms"
)]
pub struct Cli {
    /// Configuration file (default: ./dialer_forms.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// List the bundled schemas
    List,
    /// Print the render directives of a schema as JSON
    Render {
        #[arg(long, value_enum)]
        schema: SchemaKind,
        /// Render for a privileged (admin) viewer
        #[arg(long)]
        admin: bool,
        /// JSON file with the current values
        #[arg(long)]
        values: Option<PathBuf>,
        /// JSON file with validation errors to show
        #[arg(long)]
        errors: Option<PathBuf>,
        /// Only this section
        #[arg(long)]
        step: Option<usize>,
    },
    /// Print the gated schema and every admin path that matched nothing
    Gate {
        #[arg(long, value_enum)]
        schema: SchemaKind,
    },
    /// Click a button (the first SUBMIT button by default) with the given values
    Submit {
        #[arg(long, value_enum)]
        schema: SchemaKind,
        #[arg(long)]
        admin: bool,
        #[arg(long)]
        values: Option<PathBuf>,
        #[arg(long)]
        button: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    /// The handler ran; `payload` is the submission built from the
    /// validated values.
    Accepted { button: ButtonId, payload: FormValues },
    Rejected(FormErrors),
}

/// Form hooks of the CLI: bundled rules for validation, and the submitted
/// values captured for printing.
pub struct CliHandlers {
    rules: RuleValidator,
    submitted: Mutex<Option<FormValues>>,
}

impl CliHandlers {
    pub fn new(rules: RuleValidator) -> Self {
        Self {
            rules,
            submitted: Mutex::new(None),
        }
    }

    pub fn take_submitted(&self) -> Option<FormValues> {
        self.submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl FormHandlers for CliHandlers {
    fn validate<'a>(
        &'a self,
        values: &'a FormValues,
        scope: ValidationScope,
    ) -> BoxFuture<'a, Validation> {
        self.rules.validate(values, scope)
    }

    fn on_submit<'a>(&'a self, values: &'a FormValues) -> BoxFuture<'a, anyhow::Result<()>> {
        async move {
            *self
                .submitted
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(values.clone());
            info!("values submitted");
            Ok(())
        }
        .boxed()
    }

    fn on_custom<'a>(
        &'a self,
        id: &'a ButtonId,
        _values: &'a FormValues,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        async move {
            info!(button = %id, "custom action requested");
            Ok(())
        }
        .boxed()
    }
}

pub async fn execute(cli: Cli) -> Result<()> {
    let config =
        FormsConfig::load(cli.config.as_deref()).wrap_err("failed to load configuration")?;

    match cli.cmd {
        Cmd::List => {
            for kind in SchemaKind::iter() {
                let schema = kind.load()?;
                println!(
                    "{kind}\t{}\t{} sections",
                    schema.title(),
                    schema.section_count()
                );
            }
        }
        Cmd::Render {
            schema,
            admin,
            values,
            errors,
            step,
        } => {
            let values = read_values(values.as_deref())?;
            let errors = match errors {
                Some(path) => serde_json::from_str(&read(&path)?)
                    .wrap_err_with(|| format!("{} is not a valid errors file", path.display()))?,
                None => FormErrors::default(),
            };
            let out = render(schema, capability(admin), &values, &errors, step, &config)?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Cmd::Gate { schema } => {
            let out = gate(schema, &config)?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Cmd::Submit {
            schema,
            admin,
            values,
            button,
        } => {
            let values = read_values(values.as_deref())?;
            let button = button.map(ButtonId::new);
            match submit(schema, capability(admin), values, button, &config).await? {
                SubmitResult::Accepted { button, payload } => {
                    info!(%button, "accepted");
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                }
                SubmitResult::Rejected(errors) => {
                    println!("{}", serde_json::to_string_pretty(&errors)?);
                    return Err(eyre!("validation failed with {} error(s)", errors.len()));
                }
            }
        }
    }
    Ok(())
}

/// Directives of every section, or only section `step`.
pub fn render(
    kind: SchemaKind,
    capability: Capability,
    values: &FormValues,
    errors: &FormErrors,
    step: Option<usize>,
    config: &FormsConfig,
) -> Result<JsonValue> {
    let form = build_form(kind, capability, config)?;
    let mut sections = form.render(values, errors);
    let out = match step {
        Some(index) if index >= sections.len() => {
            return Err(eyre!(
                "`{kind}` has {} sections, no step {index}",
                sections.len()
            ))
        }
        Some(index) => serde_json::to_value(sections.swap_remove(index))?,
        None => serde_json::to_value(sections)?,
    };
    Ok(out)
}

/// The gated schema together with the admin paths that matched no field.
pub fn gate(kind: SchemaKind, config: &FormsConfig) -> Result<JsonValue> {
    let form = build_form(kind, Capability::PRIVILEGED, config)?;
    let report = form.gating_report();
    let unmatched: Vec<String> = report.unmatched.iter().map(ToString::to_string).collect();
    Ok(json!({
        "schema": serde_json::to_value(form.schema())?,
        "gated_fields": report.gated_fields,
        "unmatched": unmatched,
    }))
}

pub async fn submit(
    kind: SchemaKind,
    capability: Capability,
    values: FormValues,
    button: Option<ButtonId>,
    config: &FormsConfig,
) -> Result<SubmitResult> {
    let form = build_form(kind, capability, config)?;
    let handlers = CliHandlers::new(kind.rules(form.schema())?);
    let button = match button {
        Some(id) => id,
        None => form
            .schema()
            .buttons()
            .find(|(_, _, _, action)| *action == ButtonAction::Submit)
            .map(|(_, _, id, _)| id.clone())
            .ok_or_else(|| eyre!("`{kind}` has no submit button"))?,
    };

    match form.click(&button, &values, &handlers).await? {
        ClickOutcome::Completed => {
            let submitted = handlers.take_submitted().unwrap_or(values);
            Ok(SubmitResult::Accepted {
                payload: form.submission(&submitted),
                button,
            })
        }
        ClickOutcome::Invalid(errors) => Ok(SubmitResult::Rejected(errors)),
        ClickOutcome::Ignored => Err(eyre!("button `{button}` is still busy")),
    }
}

fn build_form(kind: SchemaKind, capability: Capability, config: &FormsConfig) -> Result<Form> {
    let template = kind.load()?;
    let admin_paths = config
        .admin_paths_for(template.backend_key())
        .wrap_err("invalid admin_only_paths in configuration")?;
    Ok(Form::new(
        &template,
        &admin_paths,
        capability,
        config.form_config(),
    ))
}

fn capability(admin: bool) -> Capability {
    if admin {
        Capability::PRIVILEGED
    } else {
        Capability::RESTRICTED
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).wrap_err_with(|| format!("cannot read {}", path.display()))
}

fn read_values(path: Option<&Path>) -> Result<FormValues> {
    let Some(path) = path else {
        return Ok(FormValues::default());
    };
    let root: JsonValue = serde_json::from_str(&read(path)?)
        .wrap_err_with(|| format!("{} is not valid JSON", path.display()))?;
    Ok(FormValues::new(root))
}
