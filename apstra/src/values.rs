//! Typed reads of configuration, plan and state values
//!
//! Null and unknown both read as `None`; a value of the wrong shape is an
//! attribute error.

use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

fn type_error(path: &AttributePath, err: tfplug::TfplugError) -> Diagnostic {
    Diagnostic::attribute_error(path, "Invalid attribute type", err.to_string())
}

pub(crate) fn string(value: &DynamicValue, path: &AttributePath) -> Result<Option<String>, Diagnostic> {
    value.get_string_opt(path).map_err(|e| type_error(path, e))
}

pub(crate) fn required_string(value: &DynamicValue, path: &AttributePath) -> Result<String, Diagnostic> {
    string(value, path)?.ok_or_else(|| {
        Diagnostic::attribute_error(
            path,
            format!("Missing {}", path),
            format!("The '{}' attribute is required", path),
        )
    })
}

pub(crate) fn boolean(value: &DynamicValue, path: &AttributePath) -> Result<Option<bool>, Diagnostic> {
    value.get_bool_opt(path).map_err(|e| type_error(path, e))
}

/// Whole number converted into `T`; fractions and out-of-range values are
/// errors
pub(crate) fn integer<T: TryFrom<i64>>(
    value: &DynamicValue,
    path: &AttributePath,
) -> Result<Option<T>, Diagnostic> {
    let Some(n) = value.get_number_opt(path).map_err(|e| type_error(path, e))? else {
        return Ok(None);
    };
    if n.fract() != 0.0 {
        return Err(Diagnostic::invalid_attribute_value(
            path,
            "must be a whole number",
            Dynamic::Number(n),
        ));
    }
    T::try_from(n as i64).map(Some).map_err(|_| {
        Diagnostic::invalid_attribute_value(path, "is out of range", Dynamic::Number(n))
    })
}

/// Strings of a list or set; null reads as empty
pub(crate) fn strings(value: &DynamicValue, path: &AttributePath) -> Result<Vec<String>, Diagnostic> {
    match value.get(path) {
        Dynamic::Null | Dynamic::Unknown => Ok(Vec::new()),
        Dynamic::List(items) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(i, item)| match item {
                Dynamic::String(s) => Ok(s.clone()),
                other => Err(Diagnostic::attribute_error(
                    &path.clone().index(i as i64),
                    "Invalid attribute type",
                    format!("expected string, got {}", other.type_name()),
                )),
            })
            .collect(),
        other => Err(Diagnostic::attribute_error(
            path,
            "Invalid attribute type",
            format!("expected list, got {}", other.type_name()),
        )),
    }
}

/// String map; null reads as empty
pub(crate) fn string_map(
    value: &DynamicValue,
    path: &AttributePath,
) -> Result<Vec<(String, String)>, Diagnostic> {
    let entries = match value.get(path) {
        Dynamic::Null | Dynamic::Unknown => return Ok(Vec::new()),
        Dynamic::Map(entries) => entries,
        other => {
            return Err(Diagnostic::attribute_error(
                path,
                "Invalid attribute type",
                format!("expected map, got {}", other.type_name()),
            ))
        }
    };
    let mut pairs = Vec::with_capacity(entries.len());
    for (key, item) in entries {
        match item {
            Dynamic::String(s) => pairs.push((key, s)),
            Dynamic::Null => {}
            other => {
                return Err(Diagnostic::attribute_error(
                    &path.clone().key(&key),
                    "Invalid attribute type",
                    format!("expected string, got {}", other.type_name()),
                ))
            }
        }
    }
    pairs.sort();
    Ok(pairs)
}

/// Set value, null when empty
pub(crate) fn string_set_or_null(items: &[String]) -> Dynamic {
    if items.is_empty() {
        return Dynamic::Null;
    }
    Dynamic::List(items.iter().map(|s| Dynamic::string(s.as_str())).collect())
}

pub(crate) fn optional_string(value: &Option<String>) -> Dynamic {
    value.as_deref().map(Dynamic::string).unwrap_or(Dynamic::Null)
}
