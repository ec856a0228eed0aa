//! Admin-gating transform.
//!
//! Marks fields `admin_only` when an [`AdminOnlyPath`] is a segment prefix of
//! the field's full path `[schema key, section key, name[1..]...]`. Nested
//! fields of dynamic groups use `[schema key, section key, nested name...]`.
//! The transform is pure: it returns a new schema and shares every section it
//! did not touch with the input.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::PathError;
use crate::field::{Field, FieldKind};
use crate::key_path::AdminOnlyPath;
use crate::schema::{Schema, Section};

/// Flat list of admin-only capability paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminOnlyPaths(Vec<AdminOnlyPath>);

impl AdminOnlyPaths {
    pub fn parse<I, S>(raw: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw.into_iter()
            .map(|s| AdminOnlyPath::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(AdminOnlyPaths)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdminOnlyPath> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<AdminOnlyPath> for AdminOnlyPaths {
    fn from_iter<T: IntoIterator<Item = AdminOnlyPath>>(iter: T) -> Self {
        AdminOnlyPaths(iter.into_iter().collect())
    }
}

/// Outcome details of one annotation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatingReport {
    /// Paths that matched no field of the schema.
    pub unmatched: Vec<AdminOnlyPath>,
    /// Number of fields (top-level, nested and revealed) that are admin-only
    /// after the pass.
    pub gated_fields: usize,
}

pub fn annotate(schema: &Schema, paths: &AdminOnlyPaths) -> Schema {
    annotate_with_report(schema, paths).0
}

pub fn annotate_with_report(schema: &Schema, paths: &AdminOnlyPaths) -> (Schema, GatingReport) {
    let mut matched = vec![false; paths.len()];
    let mut gated_fields = 0;

    let sections = schema
        .sections()
        .iter()
        .map(|section| {
            let prefix = [schema.backend_key(), section.backend_key.as_str()];
            let mut pass = SectionPass {
                prefix,
                paths,
                matched: &mut matched,
                gated: 0,
                changed: false,
            };
            let mut copy: Option<Section> = None;
            for (fi, field) in section.fields.iter().enumerate() {
                let mut candidate = field.clone();
                if pass.visit(&mut candidate) {
                    copy.get_or_insert_with(|| section.as_ref().clone()).fields[fi] = candidate;
                }
            }
            gated_fields += pass.gated;
            match copy {
                Some(section) => Arc::new(section),
                None => Arc::clone(section),
            }
        })
        .collect();

    let unmatched: Vec<AdminOnlyPath> = paths
        .iter()
        .zip(&matched)
        .filter(|(_, hit)| !**hit)
        .map(|(path, _)| path.clone())
        .collect();
    for path in &unmatched {
        warn!(
            schema = schema.backend_key(),
            "admin-only path `{path}` matches no field"
        );
    }
    debug!(
        schema = schema.backend_key(),
        gated_fields, "admin gating applied"
    );

    (
        schema.with_sections(sections),
        GatingReport {
            unmatched,
            gated_fields,
        },
    )
}

struct SectionPass<'a> {
    prefix: [&'a str; 2],
    paths: &'a AdminOnlyPaths,
    matched: &'a mut [bool],
    gated: usize,
    changed: bool,
}

impl SectionPass<'_> {
    /// Annotate `field` and everything nested in it. Returns true when any
    /// flag flipped from false to true.
    fn visit(&mut self, field: &mut Field) -> bool {
        self.changed = false;
        self.mark(field, true);
        match &mut field.kind {
            FieldKind::Dynamic { nested_fields, .. } => {
                for nested in nested_fields.iter_mut() {
                    self.mark(&mut nested.field, false);
                }
            }
            FieldKind::Radio { options } => {
                for revealed in options.iter_mut().filter_map(|o| o.reveals.as_deref_mut()) {
                    self.mark(revealed, true);
                }
            }
            _ => {}
        }
        self.changed
    }

    fn mark(&mut self, field: &mut Field, drop_leading: bool) {
        let Some(name) = &field.name else {
            return;
        };
        let skip = usize::from(drop_leading);
        let full: Vec<&str> = self
            .prefix
            .iter()
            .copied()
            .chain(name.keys().skip(skip))
            .collect();

        let mut hit = false;
        for (i, path) in self.paths.iter().enumerate() {
            if path.is_prefix_of(&full) {
                self.matched[i] = true;
                hit = true;
            }
        }
        if hit && !field.admin_only {
            field.admin_only = true;
            self.changed = true;
        }
        if field.admin_only {
            self.gated += 1;
        }
    }
}
