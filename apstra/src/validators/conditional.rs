//! Validators that gate other validators on this attribute's own value

use std::sync::Arc;

use tfplug::plan_modifier::values_equal;
use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::types::{Diagnostic, Dynamic};

use super::wrap_diagnostics;

fn run_all(validators: &[Arc<dyn Validator>], request: &ValidatorRequest) -> Vec<Diagnostic> {
    validators
        .iter()
        .flat_map(|v| v.validate(request).diagnostics)
        .collect()
}

fn describe_all(validators: &[Arc<dyn Validator>]) -> String {
    let descriptions: Vec<String> = validators.iter().map(|v| v.description()).collect();
    descriptions.join(" + ")
}

/// Runs `validators` only when this attribute equals `trigger`. Null is a
/// legitimate trigger.
pub struct WhenValueIs {
    pub trigger: Dynamic,
    pub validators: Vec<Arc<dyn Validator>>,
}

impl WhenValueIs {
    pub fn new(trigger: impl Into<Dynamic>, validators: Vec<Arc<dyn Validator>>) -> Self {
        Self {
            trigger: trigger.into(),
            validators,
        }
    }
}

impl Validator for WhenValueIs {
    fn description(&self) -> String {
        format!(
            "element must satisfy all validations: {} because value is {}",
            describe_all(&self.validators),
            self.trigger
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let own = &request.config_value.value;
        if own.is_unknown() || !values_equal(own, &self.trigger) {
            return ValidatorResponse::default();
        }
        ValidatorResponse {
            diagnostics: wrap_diagnostics(
                &format!("When attribute {} is {}", request.path, self.trigger),
                run_all(&self.validators, request),
            ),
        }
    }
}

/// Runs `validators` only when this attribute is set
pub struct WhenValueSet {
    pub validators: Vec<Arc<dyn Validator>>,
}

impl WhenValueSet {
    pub fn new(validators: Vec<Arc<dyn Validator>>) -> Self {
        Self { validators }
    }
}

impl Validator for WhenValueSet {
    fn description(&self) -> String {
        format!(
            "element must satisfy all validations: {} because value is set",
            describe_all(&self.validators)
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let own = &request.config_value.value;
        if own.is_unknown() || own.is_null() {
            return ValidatorResponse::default();
        }
        ValidatorResponse {
            diagnostics: wrap_diagnostics(
                &format!("When attribute {} is set", request.path),
                run_all(&self.validators, request),
            ),
        }
    }
}
