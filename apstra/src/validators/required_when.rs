use tfplug::path::PathExpression;
use tfplug::plan_modifier::values_equal;
use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::types::{Diagnostic, Dynamic};

use super::{matched_values, quoted};

/// This attribute must be set when the attribute at `expression` has `value`
pub struct RequiredWhenValueIs {
    pub expression: PathExpression,
    pub value: Dynamic,
}

impl RequiredWhenValueIs {
    pub fn new(expression: PathExpression, value: impl Into<Dynamic>) -> Self {
        Self {
            expression,
            value: value.into(),
        }
    }
}

impl Validator for RequiredWhenValueIs {
    fn description(&self) -> String {
        format!(
            "Ensures that a value is supplied when attribute at {:?} has value {}",
            self.expression.to_string(),
            self.value
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let own = &request.config_value.value;
        if own.is_unknown() || !own.is_null() {
            return ValidatorResponse::default();
        }

        let mut response = ValidatorResponse::default();
        for (path, value) in matched_values(request, std::slice::from_ref(&self.expression)) {
            if path == request.path {
                continue;
            }
            if value.is_null() || value.is_unknown() {
                return ValidatorResponse::default();
            }
            if values_equal(&value, &self.value) {
                response.diagnostics.push(Diagnostic::attribute_error(
                    &request.path,
                    "Missing required attribute",
                    format!(
                        "Attribute {} required when {} has value {}.",
                        quoted(&request.path),
                        quoted(&path),
                        self.value
                    ),
                ));
            }
        }
        response
    }
}

/// This attribute must be set when the attribute at `expression` is null
pub struct RequiredWhenValueNull {
    pub expression: PathExpression,
}

impl RequiredWhenValueNull {
    pub fn new(expression: PathExpression) -> Self {
        Self { expression }
    }
}

impl Validator for RequiredWhenValueNull {
    fn description(&self) -> String {
        format!(
            "Ensures that a value is supplied when attribute at {} is null",
            self.expression
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let own = &request.config_value.value;
        if own.is_unknown() || !own.is_null() {
            return ValidatorResponse::default();
        }

        let mut response = ValidatorResponse::default();
        for (path, value) in matched_values(request, std::slice::from_ref(&self.expression)) {
            if path == request.path {
                continue;
            }
            if value.is_unknown() || !value.is_null() {
                return ValidatorResponse::default();
            }
            response.diagnostics.push(Diagnostic::attribute_error(
                &request.path,
                "Missing required attribute",
                format!(
                    "Attribute {} required when attribute {} is null.",
                    quoted(&request.path),
                    quoted(&path)
                ),
            ));
        }
        response
    }
}

/// This attribute may not be set when the attribute at `expression` has
/// `value`
pub struct ForbiddenWhenValueIs {
    pub expression: PathExpression,
    pub value: Dynamic,
}

impl ForbiddenWhenValueIs {
    pub fn new(expression: PathExpression, value: impl Into<Dynamic>) -> Self {
        Self {
            expression,
            value: value.into(),
        }
    }
}

impl Validator for ForbiddenWhenValueIs {
    fn description(&self) -> String {
        format!(
            "Ensures that no value is supplied when attribute at {:?} has value {}",
            self.expression.to_string(),
            self.value
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let own = &request.config_value.value;
        if own.is_unknown() || own.is_null() {
            return ValidatorResponse::default();
        }

        let mut response = ValidatorResponse::default();
        for (path, value) in matched_values(request, std::slice::from_ref(&self.expression)) {
            if path == request.path {
                continue;
            }
            if value.is_null() || value.is_unknown() {
                return ValidatorResponse::default();
            }
            if values_equal(&value, &self.value) {
                response
                    .diagnostics
                    .push(Diagnostic::invalid_attribute_combination(
                        &request.path,
                        format!(
                            "value not permitted when {} has value {}, got {}",
                            quoted(&path),
                            self.value,
                            own
                        ),
                    ));
            }
        }
        response
    }
}
