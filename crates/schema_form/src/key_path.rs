use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::PathError;

/// One step of a [`FieldPath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Dotted path into the value tree, e.g. `callManagement.maxAttempts` or
/// `steps[2].gap`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        let mut segments = Vec::new();
        for part in raw.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => part.split_at(pos),
                None => (part, ""),
            };
            if key.is_empty() {
                return Err(PathError::EmptySegment(raw.to_string()));
            }
            if key.contains(']') {
                return Err(PathError::BadIndex(raw.to_string()));
            }
            segments.push(Segment::Key(key.to_string()));
            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| PathError::BadIndex(raw.to_string()))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| PathError::BadIndex(raw.to_string()))?;
                segments.push(Segment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(PathError::BadIndex(raw.to_string()));
                }
            }
        }
        Ok(FieldPath(segments))
    }

    /// Parse a schema field name: a key-only dotted path.
    pub fn parse_name(raw: &str) -> Result<Self, PathError> {
        let path = Self::parse(raw)?;
        path.ensure_key_only()?;
        Ok(path)
    }

    pub fn ensure_key_only(&self) -> Result<(), PathError> {
        if self.0.iter().any(|s| matches!(s, Segment::Index(_))) {
            return Err(PathError::IndexInName(self.to_string()));
        }
        Ok(())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Key segments only, in order. Index segments are skipped.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|s| match s {
            Segment::Key(k) => Some(k.as_str()),
            Segment::Index(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.push(Segment::Index(index));
        next
    }

    pub fn join(&self, other: &FieldPath) -> Self {
        let mut next = self.clone();
        next.0.extend(other.0.iter().cloned());
        next
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Segment::Key(k) if i == 0 => write!(f, "{k}")?,
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

/// Capability path of the form `<SchemaKey>.<SectionKey>.<fieldSuffix...>`.
///
/// Segments are plain strings split on `.`; they may contain spaces
/// (`"Phone Settings.callManagement"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AdminOnlyPath(Vec<String>);

impl AdminOnlyPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        let parts: Vec<String> = raw.split('.').map(str::to_string).collect();
        if parts.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment(raw.to_string()));
        }
        Ok(AdminOnlyPath(parts))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// True when every segment of `self` equals the corresponding leading
    /// segment of `full`.
    pub fn is_prefix_of<S: AsRef<str>>(&self, full: &[S]) -> bool {
        self.0.len() <= full.len()
            && self.0.iter().zip(full).all(|(a, b)| a == b.as_ref())
    }
}

impl fmt::Display for AdminOnlyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for AdminOnlyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_indices_and_round_trips_display() {
        let p = FieldPath::parse("steps[2].gap").unwrap();
        assert_eq!(
            p.segments(),
            &[
                Segment::Key("steps".into()),
                Segment::Index(2),
                Segment::Key("gap".into())
            ]
        );
        assert_eq!(p.to_string(), "steps[2].gap");
        assert_eq!(
            FieldPath::parse("grid[1][0]").unwrap().to_string(),
            "grid[1][0]"
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(FieldPath::parse(""), Err(PathError::Empty));
        assert!(matches!(
            FieldPath::parse(".a"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            FieldPath::parse("a."),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            FieldPath::parse("a..b"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(FieldPath::parse("a[x]"), Err(PathError::BadIndex(_))));
        assert!(matches!(FieldPath::parse("a[1"), Err(PathError::BadIndex(_))));
        assert!(matches!(FieldPath::parse("a[1]b"), Err(PathError::BadIndex(_))));
    }

    #[test]
    fn names_must_be_key_only() {
        assert!(FieldPath::parse_name("callManagement.maxAttempts").is_ok());
        assert!(matches!(
            FieldPath::parse_name("steps[0]"),
            Err(PathError::IndexInName(_))
        ));
    }

    #[test]
    fn admin_path_prefix_match() {
        let admin = AdminOnlyPath::parse("Phone Settings.callManagement").unwrap();
        assert!(admin.is_prefix_of(&["Phone Settings", "callManagement", "maxAttempts"]));
        assert!(admin.is_prefix_of(&["Phone Settings", "callManagement"]));
        assert!(!admin.is_prefix_of(&["Phone Settings"]));
        assert!(!admin.is_prefix_of(&["Phone Settings", "callRecording", "enabled"]));
        assert!(AdminOnlyPath::parse("a..b").is_err());
    }
}
