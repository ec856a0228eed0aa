use thiserror::Error;

use crate::actions::ButtonId;

/// Malformed dotted path (field name, composite value path or admin path).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    #[error("empty segment in path `{0}`")]
    EmptySegment(String),

    #[error("malformed index in path `{0}`")]
    BadIndex(String),

    #[error("index segments are not allowed in field names: `{0}`")]
    IndexInName(String),
}

/// Construction-time schema errors. Schemas are build artifacts, so these
/// surface when a document is loaded, never while rendering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid field name in section `{section}`: {source}")]
    InvalidName {
        section: String,
        #[source]
        source: PathError,
    },

    #[error("radio field `{0}` has no options")]
    MissingOptions(String),

    #[error("checkbox field `{0}` has an option that reveals a field; only radio options can")]
    RevealOnCheckbox(String),

    #[error("dynamic field `{0}` has no nested fields")]
    MissingNestedFields(String),

    #[error("field `{field}` of kind `{kind}` must have a name")]
    MissingName { field: String, kind: &'static str },

    #[error("field `{field}` of kind `{kind}` cannot be nested in a dynamic group")]
    UnsupportedNestedKind { field: String, kind: &'static str },

    #[error("duplicate section backend key: {0}")]
    DuplicateSection(String),

    #[error("duplicate button id: {0}")]
    DuplicateButton(ButtonId),
}

/// Errors raised by the field and dynamic-group interpreters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("field `{0}` is not a dynamic group")]
    NotDynamic(String),

    #[error("field `{0}` has no name to bind values to")]
    Unbound(String),

    #[error("repetition {index} out of range for `{path}` (len {len})")]
    RepetitionOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Failures surfaced from a button click.
///
/// Handler errors are re-raised unchanged inside `Handler`; the state machine
/// has already reverted the button to idle when the caller sees one.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("unknown button: {0}")]
    UnknownButton(ButtonId),

    #[error("action {button} failed: {error:#}")]
    Handler {
        button: ButtonId,
        error: anyhow::Error,
    },
}

impl ActionError {
    /// Borrow the caller's original error, if this is a handler failure.
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            ActionError::Handler { error, .. } => Some(error),
            _ => None,
        }
    }
}
