use tfplug::plan_modifier::values_equal;
use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::types::{Diagnostic, Dynamic};

/// The value must equal one of `values`
pub struct MustBeOneOf {
    pub values: Vec<Dynamic>,
}

impl MustBeOneOf {
    pub fn new<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Dynamic>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn joined(&self) -> String {
        let parts: Vec<String> = self.values.iter().map(ToString::to_string).collect();
        parts.join(",")
    }
}

impl Validator for MustBeOneOf {
    fn description(&self) -> String {
        format!(
            "Ensure that the value is one of the following : {}",
            self.joined()
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let own = &request.config_value.value;
        if own.is_unknown() || own.is_null() {
            return ValidatorResponse::default();
        }
        if self.values.iter().any(|v| values_equal(v, own)) {
            return ValidatorResponse::default();
        }
        ValidatorResponse::with(Diagnostic::invalid_attribute_value(
            &request.path,
            format!("Must be one of : {}", self.joined()),
            own,
        ))
    }
}
