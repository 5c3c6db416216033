use std::sync::Arc;

use tfplug::path::PathExpression;
use tfplug::plan_modifier::values_equal;
use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::types::{Diagnostic, Dynamic};

use super::{matched_values, wrap_diagnostics};

/// The value at `expression` must be `value`. The diagnostic lands on the
/// other attribute, which makes this useful inside [`super::WhenValueSet`].
pub struct ValueAtMustBe {
    pub expression: PathExpression,
    pub value: Dynamic,
    pub null_ok: bool,
}

impl ValueAtMustBe {
    pub fn new(expression: PathExpression, value: impl Into<Dynamic>, null_ok: bool) -> Self {
        Self {
            expression,
            value: value.into(),
            null_ok,
        }
    }
}

impl Validator for ValueAtMustBe {
    fn description(&self) -> String {
        format!(
            "element at {:?} must be: {} (null is {})",
            self.expression.to_string(),
            self.value,
            self.null_ok
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        for (path, value) in matched_values(request, std::slice::from_ref(&self.expression)) {
            if value.is_unknown() || (value.is_null() && self.null_ok) {
                return response;
            }
            if !values_equal(&value, &self.value) {
                response.diagnostics.push(Diagnostic::invalid_attribute_value(
                    &path,
                    format!("must be {}", self.value),
                    &value,
                ));
            }
        }
        response
    }
}

/// Each value matched by `expression` must be `value`
pub struct MustBeWhenValueAt {
    pub expression: PathExpression,
    pub value: Dynamic,
}

impl MustBeWhenValueAt {
    pub fn new(expression: PathExpression, value: impl Into<Dynamic>) -> Self {
        Self {
            expression,
            value: value.into(),
        }
    }
}

impl Validator for MustBeWhenValueAt {
    fn description(&self) -> String {
        format!(
            "value at {} must be {}",
            self.expression,
            self.value
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        for (path, value) in matched_values(request, std::slice::from_ref(&self.expression)) {
            if value.is_unknown() {
                return response;
            }
            if !values_equal(&value, &self.value) {
                response.diagnostics.push(Diagnostic::invalid_attribute_value(
                    &path,
                    format!("value must be {}", self.value),
                    &value,
                ));
            }
        }
        response
    }
}

/// Runs `validators` against this attribute whenever the value at
/// `expression` equals `trigger`
pub struct WhenValueAtMustBe {
    pub expression: PathExpression,
    pub trigger: Dynamic,
    pub validators: Vec<Arc<dyn Validator>>,
}

impl WhenValueAtMustBe {
    pub fn new(
        expression: PathExpression,
        trigger: impl Into<Dynamic>,
        validators: Vec<Arc<dyn Validator>>,
    ) -> Self {
        Self {
            expression,
            trigger: trigger.into(),
            validators,
        }
    }
}

impl Validator for WhenValueAtMustBe {
    fn description(&self) -> String {
        let descriptions: Vec<String> = self.validators.iter().map(|v| v.description()).collect();
        format!(
            "element must satisfy all validations: {} when value at {:?} is {}",
            descriptions.join(" + "),
            self.expression.to_string(),
            self.trigger
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        for (path, value) in matched_values(request, std::slice::from_ref(&self.expression)) {
            if value.is_unknown() {
                return response;
            }
            if !values_equal(&value, &self.trigger) {
                continue;
            }
            let nested: Vec<Diagnostic> = self
                .validators
                .iter()
                .flat_map(|v| v.validate(request).diagnostics)
                .collect();
            response.diagnostics.extend(wrap_diagnostics(
                &format!("When attribute {} is {}", path, self.trigger),
                nested,
            ));
        }
        response
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::validators::test_support::{request, sibling};
    use tfplug::path::PathExpression;
    use tfplug::types::AttributePath;
    use tfplug::validator::StringOneOfValidator;

    #[test]
    fn value_at_must_be_reports_at_other_path() {
        let v = ValueAtMustBe::new(PathExpression::match_root("ipv4_enabled"), true, false);
        let config = Dynamic::object([
            ("ipv4_enabled", Dynamic::Bool(false)),
            ("ipv4_peer_prefix", Dynamic::string("10.0.0.0/24")),
        ]);
        let resp = v.validate(&request(config, AttributePath::new("ipv4_peer_prefix")));
        assert_eq!(resp.diagnostics.len(), 1);
        assert_eq!(
            resp.diagnostics[0].attribute,
            Some(AttributePath::new("ipv4_enabled"))
        );
        assert_eq!(
            resp.diagnostics[0].detail,
            "Attribute ipv4_enabled must be true, got: false"
        );
    }

    #[test]
    fn value_at_must_be_null_handling() {
        let config = Dynamic::object([
            ("flag", Dynamic::Null),
            ("other", Dynamic::string("x")),
        ]);
        let lenient = ValueAtMustBe::new(sibling("flag"), true, true);
        assert!(lenient
            .validate(&request(config.clone(), AttributePath::new("other")))
            .diagnostics
            .is_empty());

        let strict = ValueAtMustBe::new(sibling("flag"), true, false);
        assert_eq!(
            strict
                .validate(&request(config, AttributePath::new("other")))
                .diagnostics
                .len(),
            1
        );
    }

    #[test]
    fn must_be_when_value_at_defers_on_unknown() {
        let v = MustBeWhenValueAt::new(sibling("mode"), "static");
        let unknown = Dynamic::object([("mode", Dynamic::Unknown), ("x", Dynamic::Null)]);
        assert!(v
            .validate(&request(unknown, AttributePath::new("x")))
            .diagnostics
            .is_empty());

        let wrong = Dynamic::object([("mode", Dynamic::string("dynamic")), ("x", Dynamic::Null)]);
        let resp = v.validate(&request(wrong, AttributePath::new("x")));
        assert_eq!(
            resp.diagnostics[0].detail,
            "Attribute mode value must be \"static\", got: \"dynamic\""
        );
    }

    #[test]
    fn when_value_at_runs_nested_validators_on_trigger() {
        let v = WhenValueAtMustBe::new(
            sibling("platform"),
            "junos",
            vec![Arc::new(StringOneOfValidator::new(["a", "b"])) as Arc<dyn Validator>],
        );
        let triggered = Dynamic::object([
            ("platform", Dynamic::string("junos")),
            ("mode", Dynamic::string("c")),
        ]);
        let resp = v.validate(&request(triggered, AttributePath::new("mode")));
        assert_eq!(resp.diagnostics.len(), 1);
        assert!(resp.diagnostics[0]
            .detail
            .starts_with("When attribute platform is \"junos\": "));

        let other = Dynamic::object([
            ("platform", Dynamic::string("eos")),
            ("mode", Dynamic::string("c")),
        ]);
        assert!(v
            .validate(&request(other, AttributePath::new("mode")))
            .diagnostics
            .is_empty());
    }
}
