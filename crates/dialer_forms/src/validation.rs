//! Backend validation rules for the bundled schemas.
//!
//! A [`RuleValidator`] is the `validate` hook of the CLI's form handlers. It
//! only checks the sections covered by the requested [`ValidationScope`] and,
//! when everything passes, hands back the values with numeric strings of
//! range-checked fields turned into JSON numbers.

use futures::future::BoxFuture;
use futures::FutureExt;
use schema_form::{
    Field, FieldKind, FieldPath, FormErrors, FormHandlers, FormValues, PathError, Schema,
    Validation, ValidationScope, ValueStore,
};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Present and not blank.
    Required,
    /// Integer within `min..=max`; absent values pass.
    Range { min: i64, max: i64 },
}

#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("no field `{0}` in the schema")]
    UnknownField(String),
    #[error("`{0}` is not a dynamic group with a nested `{1}`")]
    UnknownNested(String, String),
    #[error(transparent)]
    Path(#[from] PathError),
}

#[derive(Debug, Clone, PartialEq)]
enum Target {
    Field(FieldPath),
    EachRepetition { group: FieldPath, nested: FieldPath },
}

#[derive(Debug, Clone, PartialEq)]
struct Check {
    section: usize,
    target: Target,
    rule: Rule,
}

#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    checks: Vec<Check>,
}

/// Collects rules by field name; names are resolved against the schema in
/// [`RuleBuilder::build`].
pub struct RuleBuilder<'a> {
    schema: &'a Schema,
    pending: Vec<(String, Option<String>, Rule)>,
}

impl<'a> RuleBuilder<'a> {
    pub fn field(mut self, name: &str, rule: Rule) -> Self {
        self.pending.push((name.to_string(), None, rule));
        self
    }

    /// Apply `rule` to `nested` in every repetition of the dynamic `group`.
    pub fn each(mut self, group: &str, nested: &str, rule: Rule) -> Self {
        self.pending
            .push((group.to_string(), Some(nested.to_string()), rule));
        self
    }

    pub fn build(self) -> Result<RuleValidator, RuleError> {
        let mut checks = Vec::with_capacity(self.pending.len());
        for (name, nested, rule) in self.pending {
            let (section, field) = locate(self.schema, &name)
                .ok_or_else(|| RuleError::UnknownField(name.clone()))?;
            let path = FieldPath::parse_name(&name)?;
            let target = match nested {
                None => Target::Field(path),
                Some(nested) => {
                    if !has_nested(field, &nested) {
                        return Err(RuleError::UnknownNested(name, nested));
                    }
                    Target::EachRepetition {
                        group: path,
                        nested: FieldPath::parse_name(&nested)?,
                    }
                }
            };
            checks.push(Check {
                section,
                target,
                rule,
            });
        }
        Ok(RuleValidator { checks })
    }
}

impl RuleValidator {
    pub fn builder(schema: &Schema) -> RuleBuilder<'_> {
        RuleBuilder {
            schema,
            pending: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run every check in `scope` against `values`.
    pub fn check(&self, values: &FormValues, scope: ValidationScope) -> Validation {
        let mut errors = FormErrors::default();
        let mut normalized = values.clone();

        for check in self.checks.iter().filter(|c| in_scope(c.section, scope)) {
            for path in targets(&check.target, values) {
                let key = path.to_string();
                if errors.get(&key).is_some() {
                    continue;
                }
                match apply(check.rule, values.get(&path)) {
                    Ok(Some(number)) => normalized.set_value(&path, number),
                    Ok(None) => {}
                    Err(message) => errors.insert(key, message),
                }
            }
        }

        debug!(?scope, errors = errors.len(), "rules checked");
        if errors.is_empty() {
            Ok(Some(normalized))
        } else {
            Err(errors)
        }
    }
}

impl FormHandlers for RuleValidator {
    fn validate<'a>(
        &'a self,
        values: &'a FormValues,
        scope: ValidationScope,
    ) -> BoxFuture<'a, Validation> {
        async move { self.check(values, scope) }.boxed()
    }
}

fn in_scope(section: usize, scope: ValidationScope) -> bool {
    match scope {
        ValidationScope::Form => true,
        ValidationScope::Section(current) => section == current,
    }
}

fn targets(target: &Target, values: &FormValues) -> Vec<FieldPath> {
    match target {
        Target::Field(path) => vec![path.clone()],
        Target::EachRepetition { group, nested } => {
            let count = values
                .get(group)
                .and_then(JsonValue::as_array)
                .map_or(0, Vec::len);
            (0..count).map(|i| group.index(i).join(nested)).collect()
        }
    }
}

/// `Ok(Some(_))` carries the normalized number of a range-checked value.
fn apply(rule: Rule, value: Option<&JsonValue>) -> Result<Option<JsonValue>, String> {
    let blank = is_blank(value);
    match rule {
        Rule::Required if blank => Err("Required".to_string()),
        Rule::Required => Ok(None),
        Rule::Range { .. } if blank => Ok(None),
        Rule::Range { min, max } => match value.and_then(as_integer) {
            Some(n) if n >= min && n <= max => Ok(Some(JsonValue::from(n))),
            _ => Err(format!("Must be a number in range [{min}..{max}]")),
        },
    }
}

fn is_blank(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => s.trim().is_empty(),
        Some(JsonValue::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn as_integer(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Section index and field carrying `name`, including fields revealed by a
/// radio option.
fn locate<'s>(schema: &'s Schema, name: &str) -> Option<(usize, &'s Field)> {
    schema
        .sections()
        .iter()
        .enumerate()
        .find_map(|(index, section)| {
            section
                .fields
                .iter()
                .find_map(|field| named(field, name))
                .map(|field| (index, field))
        })
}

fn named<'f>(field: &'f Field, name: &str) -> Option<&'f Field> {
    if field.name.as_ref().is_some_and(|n| n.to_string() == name) {
        return Some(field);
    }
    match &field.kind {
        FieldKind::Radio { options } => options
            .iter()
            .filter_map(|o| o.reveals.as_deref())
            .find_map(|revealed| named(revealed, name)),
        _ => None,
    }
}

fn has_nested(field: &Field, nested: &str) -> bool {
    match &field.kind {
        FieldKind::Dynamic { nested_fields, .. } => nested_fields
            .iter()
            .any(|spec| spec.field.name.as_ref().is_some_and(|n| n.to_string() == nested)),
        _ => false,
    }
}
