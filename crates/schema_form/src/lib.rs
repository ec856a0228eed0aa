//! Declarative form engine.
//!
//! A [`Schema`] describes sections and fields as plain data. The engine
//! gates it for a role ([`gating`]), interprets every field against the
//! caller's values ([`interpret`], [`dynamic`]) and drives button actions
//! through a per-button async state machine ([`actions`]). [`Form`] bundles
//! the pieces for one rendered form instance.

pub mod actions;
pub mod dynamic;
pub mod errors;
pub mod field;
pub mod form;
pub mod gating;
pub mod interpret;
pub mod key_path;
pub mod schema;
pub mod values;

pub use actions::{
    ActionConfig, ActionMachine, ButtonEvent, ButtonId, ButtonState, ClickOutcome, FormHandlers,
    Validation, ValidationScope,
};
pub use errors::{ActionError, FormError, PathError, SchemaError};
pub use field::{ButtonAction, Field, FieldKind, FieldOption, NestedFieldSpec, TextInput};
pub use form::{Form, FormConfig, ScopePolicy};
pub use gating::{annotate, annotate_with_report, AdminOnlyPaths, GatingReport};
pub use interpret::{
    resolve, Capability, DirectiveBody, FieldMessage, LabelSlot, RenderDirective, SectionDirective,
};
pub use key_path::{AdminOnlyPath, FieldPath};
pub use schema::{Schema, Section, SectionLayout};
pub use values::{FormErrors, FormState, FormValues, ValueStore};
