//! value resolution
//!
//! Builds the single [Mapping] all templates are rendered against:
//! 1. the values file (yaml) is loaded as the base, if one was given and exists
//! 2. every assignment is applied on top, in the order given
//!
//! Assignments therefore always override values from the file, but only at the
//! exact path they name. Siblings loaded from the file are left alone.
use crate::path_decoder::{Assignment, DecodeError};
use crate::value::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Merge the values file and the assignments into one [Mapping]
pub fn resolve(
    values_file: Option<&Path>,
    assignments: &[Assignment],
) -> Result<Mapping, ResolveError> {
    if values_file.is_none() && assignments.is_empty() {
        return Err(ResolveError::NoValuesProvided);
    }

    let mut mapping = match values_file {
        Some(path) if path.exists() => load_values_file(path)?,
        Some(path) => {
            tracing::warn!(path=%path.display(), "values file does not exist, continuing without it");
            Mapping::new()
        }
        None => Mapping::new(),
    };

    for assignment in assignments {
        tracing::debug!(%assignment, "applying value");
        assignment
            .apply(&mut mapping)
            .map_err(|source| ResolveError::Assignment {
                key: assignment.key.clone(),
                source,
            })?;
    }

    Ok(mapping)
}

/// Parse a yaml document into a [Mapping]
///
/// An empty document is an empty mapping, any other non-mapping document is rejected.
pub fn load_values_file(path: &Path) -> Result<Mapping, ResolveError> {
    tracing::info!(path=%path.display(), "loading values file");

    let contents = std::fs::read_to_string(path).map_err(|source| ResolveError::Io {
        path: path.to_owned(),
        source,
    })?;

    parse_values(&contents).map_err(|err| match err {
        ParseFailure::Yaml(source) => ResolveError::FileParse {
            path: path.to_owned(),
            source,
        },
        ParseFailure::NotAMapping(found) => ResolveError::NotAMapping {
            path: path.to_owned(),
            found,
        },
    })
}

enum ParseFailure {
    Yaml(serde_yaml::Error),
    NotAMapping(&'static str),
}

fn parse_values(contents: &str) -> Result<Mapping, ParseFailure> {
    if contents.trim().is_empty() {
        return Ok(Mapping::new());
    }

    // `<<: *anchor` merge keys are only resolved on serde_yaml's own value type
    let mut document =
        serde_yaml::from_str::<serde_yaml::Value>(contents).map_err(ParseFailure::Yaml)?;
    document.apply_merge().map_err(ParseFailure::Yaml)?;

    match serde_yaml::from_value::<Value>(document).map_err(ParseFailure::Yaml)? {
        Value::Object(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(ParseFailure::NotAMapping(other.kind())),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("Values must be specified either via the --values-file (-f) or --value (-v) flags")]
    NoValuesProvided,
    #[error("Unable to read values file {}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unable to parse values file {}", path.display())]
    FileParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Values file {} must contain a mapping at the top level, found {found}", path.display())]
    NotAMapping { path: PathBuf, found: &'static str },
    #[error("Invalid value for \"{key}\"")]
    Assignment { key: String, source: DecodeError },
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn values_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn assignments(pairs: &[&str]) -> Vec<Assignment> {
        pairs.iter().map(|pair| pair.parse().unwrap()).collect()
    }

    fn yaml(s: &str) -> Mapping {
        match serde_yaml::from_str::<Value>(s).unwrap() {
            Value::Object(mapping) => mapping,
            other => panic!("not a mapping: {other:?}"),
        }
    }

    #[test]
    fn nothing_given() {
        let err = resolve(None, &[]).unwrap_err();
        assert!(matches!(err, ResolveError::NoValuesProvided));
    }

    #[test]
    fn assignments_only() {
        let mapping = resolve(None, &assignments(&["a.b=hi", "c=d"])).unwrap();
        assert_eq!(mapping, yaml("{ a: { b: hi }, c: d }"));
    }

    #[test]
    fn assignment_overlays_file() {
        let file = values_file("x: 1\ny:\n  z: 2\n");
        let mapping = resolve(Some(file.path()), &assignments(&["y.z=3"])).unwrap();

        assert_eq!(mapping, yaml("{ x: 1, y: { z: '3' } }"));
    }

    #[test]
    fn assignment_adds_sibling_to_file_subtree() {
        let file = values_file("db:\n  host: localhost\n");
        let mapping = resolve(Some(file.path()), &assignments(&["db.port=5432"])).unwrap();

        assert_eq!(mapping, yaml("db: { host: localhost, port: '5432' }"));
    }

    #[test]
    fn assignment_through_file_scalar_conflicts() {
        let file = values_file("db: sqlite\n");
        let err = resolve(Some(file.path()), &assignments(&["db.host=x"])).unwrap_err();

        let ResolveError::Assignment { key, source } = err else {
            panic!("unexpected error variant");
        };
        assert_eq!(key, "db.host");
        assert!(matches!(source, DecodeError::PathConflict { found: "string", .. }));
    }

    #[test]
    fn missing_file_is_no_base_values() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("values.yaml");

        let mapping = resolve(Some(missing.as_path()), &assignments(&["a=1"])).unwrap();
        assert_eq!(mapping, yaml("a: '1'"));

        let mapping = resolve(Some(missing.as_path()), &[]).unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn empty_file_is_empty_mapping() {
        let file = values_file("   \n");
        assert!(resolve(Some(file.path()), &[]).unwrap().is_empty());

        let file = values_file("~\n");
        assert!(resolve(Some(file.path()), &[]).unwrap().is_empty());
    }

    #[test]
    fn malformed_file() {
        let file = values_file("a: [unclosed\n");
        let err = resolve(Some(file.path()), &[]).unwrap_err();

        let ResolveError::FileParse { path, .. } = err else {
            panic!("unexpected error variant");
        };
        assert_eq!(path, file.path());
    }

    #[test]
    fn merge_keys_are_resolved() {
        let file = values_file("base: &b { x: 1 }\nchild: { <<: *b, y: 2 }\n");
        let mapping = resolve(Some(file.path()), &assignments(&["child.z=3"])).unwrap();

        assert_eq!(
            mapping,
            yaml("{ base: { x: 1 }, child: { y: 2, x: 1, z: '3' } }")
        );
    }

    #[test]
    fn top_level_must_be_a_mapping() {
        let file = values_file("- a\n- b\n");
        let err = resolve(Some(file.path()), &[]).unwrap_err();

        assert!(matches!(err, ResolveError::NotAMapping { found: "array", .. }));
    }

    #[test]
    fn assignments_apply_in_order() {
        let mapping = resolve(None, &assignments(&["env=dev", "env=prod"])).unwrap();
        assert_eq!(mapping["env"], Value::from("prod"));
    }
}
