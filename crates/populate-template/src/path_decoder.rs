//! dotted path decoding
//!
//! Turns `key=value` assignments such as `database.primary.host=localhost` into
//! nested objects and merges them into a [Mapping].
//!
//! Rules:
//! - a path is split on `.`, no segment may be empty
//! - missing objects on the way to the leaf are created
//! - assigning the same leaf twice replaces the earlier value
//! - a path that runs through a non-object (`a=1` then `a.b=2`) is a conflict
//! - a leaf that would replace an object (`a.b=2` then `a=1`) is a conflict
//!
//! Values are never coerced, an assignment always produces a [Value::String].
use crate::value::{Mapping, Value};
use std::str::FromStr;

/// A single `key=value` pair
#[derive(derive_new::new, Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub key: String,
    pub value: String,
}

impl Assignment {
    /// Merge this assignment into `into`
    pub fn apply(&self, into: &mut Mapping) -> Result<(), DecodeError> {
        decode(&self.key, &self.value, into)
    }
}

impl FromStr for Assignment {
    type Err = DecodeError;

    /// Splits on the first `=`, the value may contain further `=` characters
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((key, value)) = s.split_once('=') else {
            return Err(DecodeError::MissingSeparator {
                assignment: s.to_string(),
            });
        };

        split_path(key)?;
        Ok(Assignment::new(key.to_string(), value.to_string()))
    }
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Assign `value` at the dotted `path` inside `into`
#[tracing::instrument(level = "trace", skip(into))]
pub fn decode(path: &str, value: &str, into: &mut Mapping) -> Result<(), DecodeError> {
    let segments = split_path(path)?;
    let (leaf, parents) = segments
        .split_last()
        .expect("split_path never returns an empty path");

    let mut node = into;
    for (depth, segment) in parents.iter().enumerate() {
        let child = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Mapping::new()));

        node = match child {
            Value::Object(object) => object,
            other => {
                return Err(DecodeError::PathConflict {
                    path: path.to_string(),
                    conflict: segments[..=depth].join("."),
                    found: other.kind(),
                })
            }
        };
    }

    if let Some(existing @ Value::Object(_)) = node.get(*leaf) {
        return Err(DecodeError::PathConflict {
            path: path.to_string(),
            conflict: path.to_string(),
            found: existing.kind(),
        });
    }

    if let Some(previous) = node.insert(leaf.to_string(), Value::String(value.to_string())) {
        tracing::trace!(path, ?previous, "replaced earlier value");
    }

    Ok(())
}

fn split_path(path: &str) -> Result<Vec<&str>, DecodeError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(DecodeError::MalformedPath {
            path: path.to_string(),
        });
    }

    Ok(segments)
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("Malformed key \"{path}\": segments between dots must not be empty")]
    MalformedPath { path: String },
    #[error("Cannot assign \"{path}\": \"{conflict}\" already holds a value of type {found}")]
    PathConflict {
        path: String,
        conflict: String,
        found: &'static str,
    },
    #[error("Malformed value \"{assignment}\": expected the format name=value")]
    MissingSeparator { assignment: String },
}
