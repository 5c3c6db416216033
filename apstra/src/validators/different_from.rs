use tfplug::path::PathExpression;
use tfplug::plan_modifier::values_equal;
use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::types::{Diagnostic, Dynamic};

use super::{matched_values, quoted};

/// The value must not appear among the elements of the collections at
/// `expressions`
pub struct DifferentFromValues {
    pub expressions: Vec<PathExpression>,
}

impl DifferentFromValues {
    pub fn new(expressions: Vec<PathExpression>) -> Self {
        Self { expressions }
    }
}

impl Validator for DifferentFromValues {
    fn description(&self) -> String {
        let parts: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        format!(
            "Ensure that no value matches the elements found at: {:?}",
            parts
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let own = &request.config_value.value;
        if own.is_null() || own.is_unknown() {
            return ValidatorResponse::default();
        }

        let mut response = ValidatorResponse::default();
        for (path, collection) in matched_values(request, &self.expressions) {
            if path == request.path {
                continue;
            }
            let elements: Vec<&Dynamic> = match &collection {
                Dynamic::List(items) => items.iter().collect(),
                Dynamic::Map(entries) => entries.values().collect(),
                _ => continue,
            };
            for element in elements {
                if element.is_null() || element.is_unknown() {
                    continue;
                }
                if values_equal(own, element) {
                    response
                        .diagnostics
                        .push(Diagnostic::invalid_attribute_combination(
                            &request.path,
                            format!(
                                "attribute {} must not have any values which match attribute {} ({})",
                                quoted(&request.path),
                                quoted(&path),
                                element
                            ),
                        ));
                }
            }
        }
        response
    }
}

/// The value must differ from the values at `expressions`
pub struct DifferentFrom {
    pub expressions: Vec<PathExpression>,
}

impl DifferentFrom {
    pub fn new(expressions: Vec<PathExpression>) -> Self {
        Self { expressions }
    }
}

impl Validator for DifferentFrom {
    fn description(&self) -> String {
        let parts: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        format!(
            "Ensure that if an attribute is set, these don't share the same value: {:?}",
            parts
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let own = &request.config_value.value;
        if own.is_null() || own.is_unknown() {
            return ValidatorResponse::default();
        }

        let mut response = ValidatorResponse::default();
        for (path, value) in matched_values(request, &self.expressions) {
            if path == request.path || value.is_null() || value.is_unknown() {
                continue;
            }
            if values_equal(own, &value) {
                response
                    .diagnostics
                    .push(Diagnostic::invalid_attribute_combination(
                        &request.path,
                        format!(
                            "Attribute {} cannot have the same value as {}",
                            quoted(&request.path),
                            quoted(&path)
                        ),
                    ));
            }
        }
        response
    }
}
