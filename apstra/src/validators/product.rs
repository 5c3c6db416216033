use tfplug::path::PathExpression;
use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::types::{Diagnostic, Dynamic};

use super::{matched_values, quoted};

/// Number must be at least `multiplier` times the number at `expression`
pub struct AtLeastProductOf {
    pub multiplier: f64,
    pub expression: PathExpression,
}

impl AtLeastProductOf {
    pub fn new(multiplier: f64, expression: PathExpression) -> Self {
        Self {
            multiplier,
            expression,
        }
    }
}

impl Validator for AtLeastProductOf {
    fn description(&self) -> String {
        format!(
            "value must be at least {} times the value at {}",
            Dynamic::Number(self.multiplier),
            self.expression
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let Some(own) = request.config_value.value.as_number() else {
            return ValidatorResponse::default();
        };

        let mut response = ValidatorResponse::default();
        for (path, value) in matched_values(request, std::slice::from_ref(&self.expression)) {
            let Some(other) = value.as_number() else {
                continue;
            };
            if own < other * self.multiplier {
                response
                    .diagnostics
                    .push(Diagnostic::invalid_attribute_combination(
                        &request.path,
                        format!(
                            "value must be at least {:.6} times the value at {} ({}), got {}",
                            self.multiplier,
                            quoted(&path),
                            value,
                            request.config_value.value
                        ),
                    ));
            }
        }
        response
    }
}
