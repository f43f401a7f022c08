use serde_yaml::{Mapping, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, Result};
use crate::schema::{self, FieldKind};

/// A single `dotted.path=value` command-line override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub path: String,
    pub raw: String,
}

impl FromStr for Override {
    type Err = ConfigError;

    fn from_str(arg: &str) -> Result<Self> {
        let (path, raw) = arg
            .split_once('=')
            .ok_or_else(|| ConfigError::override_error(arg, "expected KEY=VALUE"))?;
        let path = path.trim();
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(ConfigError::override_error(path, "malformed key path"));
        }
        Ok(Self {
            path: path.to_string(),
            raw: raw.to_string(),
        })
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.path, self.raw)
    }
}

impl Override {
    /// Interprets the raw text for a field of the given kind. String fields
    /// take the text verbatim; everything else goes through the YAML scalar
    /// rules so `10`, `true` and `0.5` keep their types.
    fn value_for(&self, kind: FieldKind) -> Result<Value> {
        if matches!(kind, FieldKind::Str { .. }) || self.raw.is_empty() {
            return Ok(Value::String(self.raw.clone()));
        }
        let value: Value = serde_yaml::from_str(&self.raw)
            .map_err(|err| ConfigError::override_error(&self.path, err.to_string()))?;
        match value {
            Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => Err(
                ConfigError::override_error(&self.path, "value must be a scalar"),
            ),
            scalar => Ok(scalar),
        }
    }
}

/// Parses every `KEY=VALUE` argument, stopping at the first malformed one.
pub fn parse_all<S: AsRef<str>>(args: &[S]) -> Result<Vec<Override>> {
    args.iter().map(|arg| arg.as_ref().parse()).collect()
}

/// Applies `overrides` to the raw document in order. Paths resolve against
/// the schema, so a key the document omits can still be supplied here.
pub fn apply(document: &mut Value, overrides: &[Override]) -> Result<()> {
    for item in overrides {
        let field = schema::lookup(&item.path).ok_or_else(|| {
            let reason = if schema::is_section(&item.path) {
                "path names a section, not a single value"
            } else {
                "no such key"
            };
            ConfigError::override_error(&item.path, reason)
        })?;
        let value = item.value_for(field.kind)?;
        log::debug!("override {} -> {:?}", item.path, value);
        set_path(document, &item.path, value)?;
    }
    Ok(())
}

fn set_path(document: &mut Value, path: &str, value: Value) -> Result<()> {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };

    let mut current = document;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        let mapping = match current {
            Value::Mapping(mapping) => mapping,
            _ => return Err(ConfigError::override_error(path, "parent is not a mapping")),
        };
        current = mapping
            .entry(Value::String(segment.to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    match current {
        Value::Mapping(mapping) => {
            mapping.insert(Value::String(leaf.to_string()), value);
            Ok(())
        }
        _ => Err(ConfigError::override_error(path, "parent is not a mapping")),
    }
}
