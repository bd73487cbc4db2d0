//! Dotted property paths
//!
//! A [`PropertyPath`] addresses a (possibly nested) member of a JSON object,
//! e.g. `customer.address.city`. Reads tolerate missing or non-object
//! intermediates; writes create the intermediate objects they need.

use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A non-empty sequence of member names
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    /// Parse a dotted path
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for an empty path or an empty segment
    /// (`"a..b"`, `".a"`, `"a."`).
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::invalid_path(path, "path is empty"));
        }

        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(Error::invalid_path(path, "path contains an empty segment"));
        }

        Ok(Self { segments })
    }

    /// Path made of a single member name
    #[must_use]
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// First segment
    #[must_use]
    pub fn root(&self) -> &str {
        self.segments.first().map_or("", String::as_str)
    }

    /// Last segment, the member name the path resolves to
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Path of the containing member, `None` for a root-level path
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        (self.segments.len() > 1).then(|| self.prefix(self.segments.len() - 1))
    }

    /// The first `depth` segments
    #[must_use]
    pub fn prefix(&self, depth: usize) -> Self {
        Self {
            segments: self.segments[..depth.clamp(1, self.segments.len())].to_vec(),
        }
    }

    /// Read the value this path addresses inside `value`
    #[must_use]
    pub fn read<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| current.as_object()?.get(segment))
    }

    /// Read the value this path addresses inside an object
    #[must_use]
    pub fn read_in<'a>(&self, object: &'a Map<String, Value>) -> Option<&'a Value> {
        let (head, rest) = self.segments.split_first()?;
        rest.iter()
            .try_fold(object.get(head)?, |current, segment| {
                current.as_object()?.get(segment)
            })
    }

    /// Write `value` at this path, creating intermediate objects and
    /// replacing intermediate members that are not objects
    pub fn write(&self, target: &mut Map<String, Value>, value: Value) {
        write_into(target, &self.segments, value);
    }

    /// The object that holds the leaf member of this path
    pub fn parent_object_mut<'a>(
        &self,
        target: &'a mut Map<String, Value>,
    ) -> Option<&'a mut Map<String, Value>> {
        let (_, parents) = self.segments.split_last()?;
        object_at(target, parents)
    }
}

fn write_into(target: &mut Map<String, Value>, segments: &[String], value: Value) {
    match segments {
        [] => {}
        [leaf] => {
            target.insert(leaf.clone(), value);
        }
        [head, rest @ ..] => {
            let slot = target
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(child) = slot {
                write_into(child, rest, value);
            }
        }
    }
}

fn object_at<'a>(
    target: &'a mut Map<String, Value>,
    segments: &[String],
) -> Option<&'a mut Map<String, Value>> {
    match segments.split_first() {
        None => Some(target),
        Some((head, rest)) => object_at(target.get_mut(head)?.as_object_mut()?, rest),
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for PropertyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
