use tfplug::path::{display_expressions, PathExpression};
use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::types::Diagnostic;

use super::matched_values;

/// When this attribute is validated, at least `n` of the attributes at
/// `expressions` must be set as well.
pub struct AlsoRequiresNOf {
    pub n: usize,
    pub expressions: Vec<PathExpression>,
}

impl AlsoRequiresNOf {
    pub fn new(n: usize, expressions: Vec<PathExpression>) -> Self {
        Self { n, expressions }
    }
}

impl Validator for AlsoRequiresNOf {
    fn description(&self) -> String {
        format!(
            "Ensure that at least {} attribute(s) from this collection is set: {}",
            self.n,
            display_expressions(&self.expressions)
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let mut found = 0;
        for (path, value) in matched_values(request, &self.expressions) {
            if path == request.path {
                continue;
            }
            if value.is_unknown() {
                return ValidatorResponse::default();
            }
            if !value.is_null() {
                found += 1;
            }
            if found == self.n {
                return ValidatorResponse::default();
            }
        }
        if found >= self.n {
            return ValidatorResponse::default();
        }

        ValidatorResponse::with(Diagnostic::invalid_attribute_combination(
            &request.path,
            format!(
                "At least {} attributes out of {} must be set",
                self.n,
                display_expressions(&request.path_expression.merge_expressions(&self.expressions))
            ),
        ))
    }
}

/// No more than `n` of the attributes at `expressions` may be set. Pass
/// `PathExpression::match_relative()` to count the validated attribute too.
pub struct AtMostNOf {
    pub n: usize,
    pub expressions: Vec<PathExpression>,
}

impl AtMostNOf {
    pub fn new(n: usize, expressions: Vec<PathExpression>) -> Self {
        Self { n, expressions }
    }
}

impl Validator for AtMostNOf {
    fn description(&self) -> String {
        format!(
            "Ensure that at most {} attributes from this collection is set: {}",
            self.n,
            display_expressions(&self.expressions)
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let mut seen = Vec::new();
        for (path, value) in matched_values(request, &self.expressions) {
            if value.is_unknown() {
                return ValidatorResponse::default();
            }
            if !value.is_null() && !seen.contains(&path) {
                seen.push(path);
            }
        }

        if seen.len() <= self.n {
            return ValidatorResponse::default();
        }

        ValidatorResponse::with(Diagnostic::invalid_attribute_combination(
            &request.path,
            format!(
                "At most {} attributes out of {} may be specified, but {} non-null attributes were found",
                self.n,
                display_expressions(&request.path_expression.merge_expressions(&self.expressions)),
                seen.len()
            ),
        ))
    }
}
