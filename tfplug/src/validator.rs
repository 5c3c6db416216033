//! Generic attribute validators
//!
//! Value checks (length, pattern, range, size) and the basic
//! path-expression validators. All of them leave null and unknown values
//! alone; presence is the schema's business.

use crate::path::{display_expressions, PathExpression};
use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{AttributePath, Diagnostic, Dynamic};

/// Every concrete path matched by `expressions` (merged onto the request's
/// own expression) together with its configured value
pub fn matched_values(
    request: &ValidatorRequest,
    expressions: &[PathExpression],
) -> Vec<(AttributePath, Dynamic)> {
    request
        .path_expression
        .merge_expressions(expressions)
        .iter()
        .flat_map(|expr| expr.matches(&request.config.value))
        .map(|path| {
            let value = request.config.get(&path);
            (path, value)
        })
        .collect()
}

fn number_text(n: f64) -> String {
    Dynamic::Number(n).to_string()
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn length_at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn length_between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("string length must be between {} and {}", min, max),
            (Some(min), None) => format!("string length must be at least {}", min),
            (None, Some(max)) => format!("string length must be at most {}", max),
            (None, None) => "string of any length".to_string(),
        }
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let Some(s) = request.config_value.value.as_str() else {
            return ValidatorResponse::default();
        };
        let len = s.chars().count();
        let too_short = self.min.is_some_and(|min| len < min);
        let too_long = self.max.is_some_and(|max| len > max);
        if !too_short && !too_long {
            return ValidatorResponse::default();
        }
        ValidatorResponse::with(Diagnostic::attribute_error(
            &request.path,
            "Invalid Attribute Value Length",
            format!("Attribute {} {}, got: {}", request.path, self.description(), len),
        ))
    }
}

pub struct StringOneOfValidator {
    pub values: Vec<String>,
}

impl StringOneOfValidator {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for StringOneOfValidator {
    fn description(&self) -> String {
        let quoted: Vec<String> = self.values.iter().map(|v| format!("{:?}", v)).collect();
        format!("value must be one of: [{}]", quoted.join(" "))
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        match request.config_value.value.as_str() {
            Some(s) if !self.values.iter().any(|v| v == s) => {
                ValidatorResponse::with(Diagnostic::attribute_error(
                    &request.path,
                    "Invalid Attribute Value Match",
                    format!(
                        "Attribute {} {}, got: {}",
                        request.path,
                        self.description(),
                        request.config_value.value
                    ),
                ))
            }
            _ => ValidatorResponse::default(),
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        format!("value must match {}", self.description)
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        match request.config_value.value.as_str() {
            Some(s) if !self.pattern.is_match(s) => {
                ValidatorResponse::with(Diagnostic::attribute_error(
                    &request.path,
                    "Invalid Attribute Value Match",
                    format!(
                        "Attribute {} {}, got: {}",
                        request.path,
                        self.description(),
                        request.config_value.value
                    ),
                ))
            }
            _ => ValidatorResponse::default(),
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!(
                "value must be between {} and {}",
                number_text(min),
                number_text(max)
            ),
            (Some(min), None) => format!("value must be at least {}", number_text(min)),
            (None, Some(max)) => format!("value must be at most {}", number_text(max)),
            (None, None) => "any number".to_string(),
        }
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let Some(n) = request.config_value.value.as_number() else {
            return ValidatorResponse::default();
        };
        let below = self.min.is_some_and(|min| n < min);
        let above = self.max.is_some_and(|max| n > max);
        if below || above {
            return ValidatorResponse::with(Diagnostic::invalid_attribute_value(
                &request.path,
                self.description(),
                number_text(n),
            ));
        }
        ValidatorResponse::default()
    }
}

/// Element count of a list, set or map
pub struct SizeValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl SizeValidator {
    pub fn size_at_least(min: usize) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn size_between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl Validator for SizeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => {
                format!("collection must contain at least {} elements and at most {} elements", min, max)
            }
            (Some(min), None) => format!("collection must contain at least {} elements", min),
            (None, Some(max)) => format!("collection must contain at most {} elements", max),
            (None, None) => "collection of any size".to_string(),
        }
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let len = match &request.config_value.value {
            Dynamic::List(items) => items.len(),
            Dynamic::Map(entries) => entries.len(),
            _ => return ValidatorResponse::default(),
        };
        let too_small = self.min.is_some_and(|min| len < min);
        let too_big = self.max.is_some_and(|max| len > max);
        if too_small || too_big {
            return ValidatorResponse::with(Diagnostic::invalid_attribute_value(
                &request.path,
                self.description(),
                len,
            ));
        }
        ValidatorResponse::default()
    }
}

/// Number must be at least the sum of the values at the given expressions
pub struct AtLeastSumOf {
    pub expressions: Vec<PathExpression>,
}

impl AtLeastSumOf {
    pub fn new(expressions: Vec<PathExpression>) -> Self {
        Self { expressions }
    }
}

impl Validator for AtLeastSumOf {
    fn description(&self) -> String {
        let parts: Vec<String> = self.expressions.iter().map(ToString::to_string).collect();
        format!("value must be at least sum of {}", parts.join(" + "))
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let Some(own) = request.config_value.value.as_number() else {
            return ValidatorResponse::default();
        };

        let mut sum = 0.0;
        let mut summed = Vec::new();
        for (path, value) in matched_values(request, &self.expressions) {
            match value {
                Dynamic::Unknown => return ValidatorResponse::default(),
                Dynamic::Number(n) => {
                    sum += n;
                    summed.push(path.to_string());
                }
                _ => {}
            }
        }

        if summed.is_empty() || own >= sum {
            return ValidatorResponse::default();
        }
        ValidatorResponse::with(Diagnostic::invalid_attribute_value(
            &request.path,
            format!("value must be at least sum of {}", summed.join(" + ")),
            number_text(own),
        ))
    }
}

/// Exactly one of this attribute and the attributes at `expressions` is set
pub struct ExactlyOneOf {
    pub expressions: Vec<PathExpression>,
}

impl ExactlyOneOf {
    pub fn new(expressions: Vec<PathExpression>) -> Self {
        Self { expressions }
    }
}

impl Validator for ExactlyOneOf {
    fn description(&self) -> String {
        format!(
            "Ensure that one and only one attribute from this collection is set: {}",
            display_expressions(&self.expressions)
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let own = &request.config_value.value;
        if own.is_unknown() {
            return ValidatorResponse::default();
        }
        let mut count = usize::from(!own.is_null());

        for (path, value) in matched_values(request, &self.expressions) {
            if path == request.path {
                continue;
            }
            if value.is_unknown() {
                return ValidatorResponse::default();
            }
            if !value.is_null() {
                count += 1;
            }
        }

        let expressions =
            display_expressions(&request.path_expression.merge_expressions(&self.expressions));
        match count {
            1 => ValidatorResponse::default(),
            0 => ValidatorResponse::with(Diagnostic::invalid_attribute_combination(
                &request.path,
                format!(
                    "No attribute specified when one (and only one) of {} is required",
                    expressions
                ),
            )),
            n => ValidatorResponse::with(Diagnostic::invalid_attribute_combination(
                &request.path,
                format!(
                    "{} attributes specified when one (and only one) of {} is required",
                    n, expressions
                ),
            )),
        }
    }
}

/// At least one of this attribute and the attributes at `expressions` is set
pub struct AtLeastOneOf {
    pub expressions: Vec<PathExpression>,
}

impl AtLeastOneOf {
    pub fn new(expressions: Vec<PathExpression>) -> Self {
        Self { expressions }
    }
}

impl Validator for AtLeastOneOf {
    fn description(&self) -> String {
        format!(
            "Ensure that at least one attribute from this collection is set: {}",
            display_expressions(&self.expressions)
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let own = &request.config_value.value;
        if !own.is_null() {
            return ValidatorResponse::default();
        }

        for (path, value) in matched_values(request, &self.expressions) {
            if path == request.path {
                continue;
            }
            if value.is_unknown() || !value.is_null() {
                return ValidatorResponse::default();
            }
        }

        ValidatorResponse::with(Diagnostic::invalid_attribute_combination(
            &request.path,
            format!(
                "At least one attribute out of {} must be specified",
                display_expressions(&request.path_expression.merge_expressions(&self.expressions))
            ),
        ))
    }
}

/// This attribute cannot be set together with the attributes at `expressions`
pub struct ConflictsWith {
    pub expressions: Vec<PathExpression>,
}

impl ConflictsWith {
    pub fn new(expressions: Vec<PathExpression>) -> Self {
        Self { expressions }
    }
}

impl Validator for ConflictsWith {
    fn description(&self) -> String {
        format!(
            "Ensure that if an attribute is set, these are not set: {}",
            display_expressions(&self.expressions)
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        if request.config_value.value.is_null() {
            return response;
        }
        for (path, value) in matched_values(request, &self.expressions) {
            if path == request.path || value.is_null() {
                continue;
            }
            response
                .diagnostics
                .push(Diagnostic::invalid_attribute_combination(
                    &request.path,
                    format!(
                        "Attribute \"{}\" cannot be specified when \"{}\" is specified",
                        path, request.path
                    ),
                ));
        }
        response
    }
}

/// When this attribute is set, the attributes at `expressions` must be too
pub struct AlsoRequires {
    pub expressions: Vec<PathExpression>,
}

impl AlsoRequires {
    pub fn new(expressions: Vec<PathExpression>) -> Self {
        Self { expressions }
    }
}

impl Validator for AlsoRequires {
    fn description(&self) -> String {
        format!(
            "Ensure that if an attribute is set, also these are set: {}",
            display_expressions(&self.expressions)
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let mut response = ValidatorResponse::default();
        if request.config_value.value.is_null() {
            return response;
        }
        for (path, value) in matched_values(request, &self.expressions) {
            if path == request.path || !value.is_null() {
                continue;
            }
            response
                .diagnostics
                .push(Diagnostic::invalid_attribute_combination(
                    &request.path,
                    format!(
                        "Attribute \"{}\" must be specified when \"{}\" is specified",
                        path, request.path
                    ),
                ));
        }
        response
    }
}
