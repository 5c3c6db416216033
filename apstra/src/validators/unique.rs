use std::collections::{HashMap, HashSet};

use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::types::{AttributePath, Diagnostic, Dynamic};

/// No two members of a collection of objects may share the same values for
/// the named attributes (every attribute when no names are given)
pub struct UniqueValueCombinationsAt {
    pub attributes: Vec<String>,
}

impl UniqueValueCombinationsAt {
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    fn key_names(&self, object: &HashMap<String, Dynamic>) -> Vec<String> {
        if !self.attributes.is_empty() {
            return self.attributes.clone();
        }
        let mut names: Vec<String> = object.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Validator for UniqueValueCombinationsAt {
    fn description(&self) -> String {
        if self.attributes.is_empty() {
            return "Ensure that no two collection (list/map/set) members share values for all attributes"
                .to_string();
        }
        format!(
            "Ensure that no two collection (list/map/set) members share values for these attributes: [{}]",
            self.attributes.join(" ")
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let elements: Vec<(AttributePath, &Dynamic)> = match &request.config_value.value {
            Dynamic::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (request.path.clone().index(i as i64), item))
                .collect(),
            Dynamic::Map(entries) => {
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                keys.into_iter()
                    .map(|k| (request.path.clone().key(k), &entries[k]))
                    .collect()
            }
            _ => return ValidatorResponse::default(),
        };

        let mut response = ValidatorResponse::default();
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        for (element_path, element) in elements {
            // nothing to compare until the element is known and present
            if element.is_unknown() || element.is_null() {
                continue;
            }
            let Some(object) = element.as_map() else {
                response.diagnostics.push(Diagnostic::attribute_error(
                    &request.path,
                    "Invalid Validator for Element Value",
                    format!(
                        "While performing schema-based validation, an unexpected error occurred. \
                         The attribute declares an object values validator, however its elements are not objects.\n\n\
                         Path: {}\nElement Value Type: {}",
                        request.path,
                        element.type_name()
                    ),
                ));
                return response;
            };

            let names = self.key_names(object);
            let mut combination = Vec::with_capacity(names.len());
            let mut deferred = false;
            for name in &names {
                let value = object.get(name).cloned().unwrap_or(Dynamic::Null);
                if value.is_unknown() {
                    deferred = true;
                    break;
                }
                combination.push(value.to_string());
            }
            if deferred {
                continue;
            }

            if !seen.insert(combination) {
                let label = format!("[{}]", names.join(" "));
                response.diagnostics.push(Diagnostic::attribute_error(
                    &element_path,
                    format!("{} collision", label),
                    format!("Two objects cannot use the same {}", label),
                ));
            }
        }
        response
    }
}
