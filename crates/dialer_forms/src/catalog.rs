//! Bundled dialer settings schemas.
//!
//! The JSON documents under `schemas/` are compiled into the binary and
//! parsed on demand. Each kind also knows the validation rules its backend
//! enforces.

use clap::ValueEnum;
use schema_form::Schema;
use strum::{Display, EnumIter, IntoEnumIterator};
use thiserror::Error;

use crate::validation::{Rule, RuleError, RuleValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum SchemaKind {
    ListFilter,
    ListExitStrategy,
    CallRecording,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("bundled schema `{kind}` does not parse: {source}")]
    Invalid {
        kind: SchemaKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("rules of `{kind}` do not fit the schema: {source}")]
    Rules {
        kind: SchemaKind,
        #[source]
        source: RuleError,
    },
}

impl SchemaKind {
    pub fn source(self) -> &'static str {
        match self {
            SchemaKind::ListFilter => include_str!("../schemas/list_filter.json"),
            SchemaKind::ListExitStrategy => include_str!("../schemas/list_exit_strategy.json"),
            SchemaKind::CallRecording => include_str!("../schemas/call_recording.json"),
        }
    }

    pub fn load(self) -> Result<Schema, CatalogError> {
        Schema::from_json(self.source())
            .map_err(|source| CatalogError::Invalid { kind: self, source })
    }

    /// Backend validation rules for this kind, bound to `schema`.
    pub fn rules(self, schema: &Schema) -> Result<RuleValidator, CatalogError> {
        let rules = match self {
            SchemaKind::ListFilter => RuleValidator::builder(schema)
                .field("criteria.name", Rule::Required)
                .field("criteria.maxAgeDays", Rule::Range { min: 1, max: 365 }),
            SchemaKind::ListExitStrategy => RuleValidator::builder(schema)
                .field("exitStrategy.maxAttempts", Rule::Required)
                .field("exitStrategy.maxAttempts", Rule::Range { min: 1, max: 20 })
                .each("exitStrategy.attempts", "gap", Rule::Range { min: 0, max: 10_080 })
                .field("exitRules.finalDisposition", Rule::Required),
            SchemaKind::CallRecording => RuleValidator::builder(schema)
                .field("recording.sampleRate", Rule::Range { min: 1, max: 100 })
                .field("retention.days", Rule::Required)
                .field("retention.days", Rule::Range { min: 1, max: 3650 }),
        };
        rules
            .build()
            .map_err(|source| CatalogError::Rules { kind: self, source })
    }
}

/// Every bundled schema, in declaration order.
pub fn load_all() -> Result<Vec<(SchemaKind, Schema)>, CatalogError> {
    SchemaKind::iter()
        .map(|kind| kind.load().map(|schema| (kind, schema)))
        .collect()
}
