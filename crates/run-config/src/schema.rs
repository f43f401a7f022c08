//! Static description of every key a run configuration may contain.
//!
//! Validation walks the raw YAML value against this table before the typed
//! structs are built, so each failure can name the dotted path of the
//! offending key. Override resolution uses the same table.

use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Str { non_empty: bool },
    Bool,
    Int { min: i64, max: i64 },
    /// Finite and strictly positive.
    PositiveFloat,
    OneOf(&'static [i64]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub path: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Accepts an explicit `null`; only fields backed by an `Option`.
    pub nullable: bool,
}

const U32_MAX: i64 = u32::MAX as i64;
const STR: FieldKind = FieldKind::Str { non_empty: false };
const NON_EMPTY: FieldKind = FieldKind::Str { non_empty: true };
const COUNT: FieldKind = FieldKind::Int { min: 0, max: U32_MAX };
const POSITIVE: FieldKind = FieldKind::Int { min: 1, max: U32_MAX };

const fn required(path: &'static str, kind: FieldKind) -> Field {
    Field {
        path,
        kind,
        required: true,
        nullable: false,
    }
}

const fn optional(path: &'static str, kind: FieldKind) -> Field {
    Field {
        path,
        kind,
        required: false,
        nullable: false,
    }
}

const fn nullable(path: &'static str, kind: FieldKind) -> Field {
    Field {
        path,
        kind,
        required: false,
        nullable: true,
    }
}

pub const FIELDS: &[Field] = &[
    required("dataset.dataset_root", NON_EMPTY),
    required("dataset.with_history", FieldKind::Bool),
    required("dataset.history_max_len", COUNT),
    required("dataset.encoder_name_or_path", NON_EMPTY),
    required("dataset.decoder_name_or_path", NON_EMPTY),
    required("dataset.local_rank", FieldKind::Int { min: -1, max: i64::MAX }),
    required("dataset.world_size", POSITIVE),
    required("dataset.train_dataloader_conf.batch_size", POSITIVE),
    required("dataset.train_dataloader_conf.num_workers", COUNT),
    required("dataset.val_dataloader_conf.batch_size", POSITIVE),
    required("dataset.val_dataloader_conf.num_workers", COUNT),
    required("dataset.test_dataloader_conf.batch_size", POSITIVE),
    required("dataset.test_dataloader_conf.num_workers", COUNT),
    optional("dataset.diff_max_len", POSITIVE),
    optional("dataset.msg_max_len", POSITIVE),
    required("logger._target_", NON_EMPTY),
    required("logger.name", STR),
    required("logger.project", STR),
    required("model.encoder_decoder", FieldKind::Bool),
    required("model.learning_rate", FieldKind::PositiveFloat),
    required("model.encoder_name_or_path", NON_EMPTY),
    required("model.decoder_name_or_path", NON_EMPTY),
    nullable("model.num_layers_encoder", POSITIVE),
    nullable("model.num_layers_decoder", POSITIVE),
    optional("model.actual_generation", FieldKind::Bool),
    required("trainer.gpus", COUNT),
    required("trainer.accelerator", STR),
    required("trainer.max_epochs", POSITIVE),
    required("trainer.precision", FieldKind::OneOf(&[16, 32])),
    required("trainer.amp_level", STR),
    required("trainer.auto_select_gpus", FieldKind::Bool),
    required("trainer.num_sanity_val_steps", COUNT),
    required("trainer.accumulate_grad_batches", POSITIVE),
];

/// Looks up a leaf field by its dotted path.
pub fn lookup(path: &str) -> Option<&'static Field> {
    FIELDS.iter().find(|field| field.path == path)
}

/// A section is any proper prefix of a field path, e.g. `dataset` or
/// `dataset.train_dataloader_conf`.
pub fn is_section(path: &str) -> bool {
    FIELDS.iter().any(|field| {
        field
            .path
            .strip_prefix(path)
            .is_some_and(|rest| rest.starts_with('.'))
    })
}

fn sections() -> Vec<&'static str> {
    let mut sections: Vec<&'static str> = FIELDS
        .iter()
        .flat_map(|field| {
            field
                .path
                .match_indices('.')
                .map(move |(idx, _)| &field.path[..idx])
        })
        .collect();
    sections.sort_unstable();
    sections.dedup();
    sections
}

pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Resolves a dotted path inside a raw document.
pub fn get<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

pub(crate) fn check_root(document: &Value) -> Result<()> {
    if document.is_mapping() {
        Ok(())
    } else {
        Err(ConfigError::Parse(format!(
            "expected a mapping at the document root, found {}",
            describe(document)
        )))
    }
}

/// Checks the raw document against [`FIELDS`]: unknown keys, missing
/// sections and fields, then per-field type and range.
pub fn validate(document: &Value) -> Result<()> {
    check_root(document)?;
    if let Value::Mapping(root) = document {
        check_keys(root, "")?;
    }

    for section in sections() {
        match get(document, section) {
            Some(Value::Mapping(_)) => {}
            Some(other) => {
                return Err(ConfigError::validation(
                    section,
                    format!("expected a mapping, found {}", describe(other)),
                ))
            }
            None => return Err(ConfigError::validation(section, "missing required section")),
        }
    }

    for field in FIELDS {
        match get(document, field.path) {
            None if field.required => {
                return Err(ConfigError::validation(field.path, "missing required field"))
            }
            None => {}
            Some(Value::Null) if field.nullable => {}
            Some(value) => check_value(field, value)?,
        }
    }
    Ok(())
}

fn check_keys(mapping: &Mapping, prefix: &str) -> Result<()> {
    for (key, value) in mapping {
        let key = match key {
            Value::String(key) => key.as_str(),
            other => {
                let at = if prefix.is_empty() { "<root>" } else { prefix };
                return Err(ConfigError::validation(
                    at,
                    format!("keys must be strings, found {}", describe(other)),
                ));
            }
        };
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };

        if is_section(&path) {
            // A non-mapping section is reported by the section pass.
            if let Value::Mapping(nested) = value {
                check_keys(nested, &path)?;
            }
        } else if lookup(&path).is_none() {
            return Err(ConfigError::validation(path, "unknown field"));
        }
    }
    Ok(())
}

fn check_value(field: &Field, value: &Value) -> Result<()> {
    let mismatch = |expected: &str| {
        ConfigError::validation(
            field.path,
            format!("expected {expected}, found {}", describe(value)),
        )
    };

    match field.kind {
        FieldKind::Str { non_empty } => {
            let text = value.as_str().ok_or_else(|| mismatch("a string"))?;
            if non_empty && text.trim().is_empty() {
                return Err(ConfigError::validation(field.path, "must not be empty"));
            }
        }
        FieldKind::Bool => {
            value.as_bool().ok_or_else(|| mismatch("a boolean"))?;
        }
        FieldKind::Int { min, max } => {
            let number = integer(value).ok_or_else(|| mismatch("an integer"))?;
            let in_range = number
                .map(|n| (min..=max).contains(&n))
                .unwrap_or(false);
            if !in_range {
                let bound = if max == i64::MAX {
                    format!("must be at least {min}")
                } else {
                    format!("must be between {min} and {max}")
                };
                return Err(ConfigError::validation(field.path, bound));
            }
        }
        FieldKind::PositiveFloat => {
            let number = value.as_f64().ok_or_else(|| mismatch("a number"))?;
            if !number.is_finite() || number <= 0.0 {
                return Err(ConfigError::validation(
                    field.path,
                    format!("must be a finite number greater than 0, got {number}"),
                ));
            }
        }
        FieldKind::OneOf(allowed) => {
            let number = integer(value).ok_or_else(|| mismatch("an integer"))?;
            if !number.is_some_and(|n| allowed.contains(&n)) {
                let allowed: Vec<String> = allowed.iter().map(i64::to_string).collect();
                return Err(ConfigError::validation(
                    field.path,
                    format!("must be one of {}", allowed.join(", ")),
                ));
            }
        }
    }
    Ok(())
}

/// `None` when `value` is not an integer at all, `Some(None)` when it is an
/// integer too large for `i64`.
fn integer(value: &Value) -> Option<Option<i64>> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.as_i64()),
        _ => None,
    }
}
