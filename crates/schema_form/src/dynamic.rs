//! Repeatable (dynamic) field groups.
//!
//! The value at a dynamic field's name is an ordered array of records, one per
//! repetition. Each nested field of repetition `i` binds to
//! `<group>[<i>].<nested name>` and resolves like any other field, except that
//! `disable_on_first` nested fields are read-only on repetition 0.

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::debug;

use crate::errors::FormError;
use crate::field::{Field, FieldKind, NestedFieldSpec};
use crate::interpret::{resolve_at, Capability, RenderDirective};
use crate::key_path::FieldPath;
use crate::values::{FormErrors, ValueStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepetitionDirective {
    pub index: usize,
    pub path: FieldPath,
    pub fields: Vec<RenderDirective>,
}

pub fn resolve_group<V>(
    field: &Field,
    capability: Capability,
    values: &V,
    errors: &FormErrors,
) -> Result<Vec<RepetitionDirective>, FormError>
where
    V: ValueStore + ?Sized,
{
    let (path, nested) = group_parts(field)?;
    let locked = field.admin_only && !capability.is_privileged;
    Ok(repetitions(path, nested, locked, capability, values, errors))
}

pub(crate) fn repetitions<V>(
    path: &FieldPath,
    nested: &[NestedFieldSpec],
    locked: bool,
    capability: Capability,
    values: &V,
    errors: &FormErrors,
) -> Vec<RepetitionDirective>
where
    V: ValueStore + ?Sized,
{
    (0..len_at(path, values))
        .map(|index| {
            let base = path.index(index);
            let fields = nested
                .iter()
                .map(|spec| {
                    let bound = spec.field.name.as_ref().map(|name| base.join(name));
                    let first_lock = index == 0 && spec.disable_on_first;
                    resolve_at(
                        &spec.field,
                        bound,
                        locked || first_lock,
                        capability,
                        values,
                        errors,
                    )
                })
                .collect();
            RepetitionDirective {
                index,
                path: base,
                fields,
            }
        })
        .collect()
}

/// Number of repetitions currently stored for `field`.
pub fn len<V>(field: &Field, values: &V) -> Result<usize, FormError>
where
    V: ValueStore + ?Sized,
{
    let (path, _) = group_parts(field)?;
    Ok(len_at(path, values))
}

/// Add one empty repetition at the end; returns its index.
pub fn append<S>(field: &Field, store: &mut S) -> Result<usize, FormError>
where
    S: ValueStore + ?Sized,
{
    let (path, _) = group_parts(field)?;
    let index = len_at(path, &*store);
    store.set_value(&path.index(index), JsonValue::Object(JsonMap::new()));
    debug!(group = %path, index, "repetition appended");
    Ok(index)
}

/// Delete repetition `index`; later repetitions shift down by one.
pub fn remove<S>(field: &Field, store: &mut S, index: usize) -> Result<JsonValue, FormError>
where
    S: ValueStore + ?Sized,
{
    let (path, _) = group_parts(field)?;
    let len = len_at(path, &*store);
    if index >= len {
        return Err(FormError::RepetitionOutOfRange {
            path: path.to_string(),
            index,
            len,
        });
    }
    let removed = store
        .remove(&path.index(index))
        .unwrap_or(JsonValue::Null);
    debug!(group = %path, index, "repetition removed");
    Ok(removed)
}

fn group_parts(field: &Field) -> Result<(&FieldPath, &[NestedFieldSpec]), FormError> {
    let FieldKind::Dynamic { nested_fields, .. } = &field.kind else {
        return Err(FormError::NotDynamic(field.display_name()));
    };
    let path = field
        .name
        .as_ref()
        .ok_or_else(|| FormError::Unbound(field.display_name()))?;
    Ok((path, nested_fields))
}

fn len_at<V>(path: &FieldPath, values: &V) -> usize
where
    V: ValueStore + ?Sized,
{
    values
        .get(path)
        .and_then(JsonValue::as_array)
        .map_or(0, Vec::len)
}
