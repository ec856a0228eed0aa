//! Layered runtime configuration.
//!
//! Sources, lowest priority first:
//! 1. `config/default.toml` compiled into the binary
//! 2. an optional TOML file (`dialer_forms.toml` in the working directory
//!    unless `--config` points elsewhere)
//! 3. `DIALER_FORMS_*` environment variables; `DIALER_FORMS_ADMIN_ONLY_PATHS`
//!    is a comma separated list

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat, Source};
use schema_form::{ActionConfig, AdminOnlyPaths, FormConfig, PathError, ScopePolicy};
use serde::Deserialize;
use tracing::debug;

const DEFAULTS: &str = include_str!("../config/default.toml");

pub const DEFAULT_CONFIG_FILE: &str = "dialer_forms.toml";

#[derive(Clone, Debug, Deserialize)]
pub struct FormsConfig {
    /// Dotted admin-only capability paths, e.g. `Call Recording.retention`.
    pub admin_only_paths: Vec<String>,
    /// How long a button stays in `Success` before reverting.
    pub success_dwell_ms: u64,
    pub validation_scope: ScopePolicy,
}

impl FormsConfig {
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        debug!(file = %file.display(), "loading configuration");
        Self::layered(File::from(file).format(FileFormat::Toml).required(false))
    }

    fn layered<S>(overlay: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        Config::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .add_source(overlay)
            .add_source(
                Environment::with_prefix("DIALER_FORMS")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("admin_only_paths"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn admin_paths(&self) -> Result<AdminOnlyPaths, PathError> {
        AdminOnlyPaths::parse(&self.admin_only_paths)
    }

    /// Only the paths rooted at `schema_key`, so gating another schema does
    /// not report them as unmatched.
    pub fn admin_paths_for(&self, schema_key: &str) -> Result<AdminOnlyPaths, PathError> {
        Ok(self
            .admin_paths()?
            .iter()
            .filter(|path| path.as_slice().first().is_some_and(|k| k == schema_key))
            .cloned()
            .collect())
    }

    pub fn form_config(&self) -> FormConfig {
        FormConfig {
            actions: ActionConfig {
                success_dwell: Duration::from_millis(self.success_dwell_ms),
            },
            scope: self.validation_scope,
        }
    }
}
