//! Schema-driven configuration validation
//!
//! Walks a configuration against its schema and runs every attribute's
//! validators, descending into nested attribute objects.

use crate::path::PathExpression;
use crate::schema::{Attribute, ObjectNestingMode, Schema, ValidatorRequest};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Validates `config` against `schema`.
///
/// Diagnostics from every attribute are collected; one failing attribute
/// never stops the others from being checked.
pub fn validate_config(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if config.is_unknown() {
        return diagnostics;
    }
    validate_attributes(
        &schema.block.attributes,
        config,
        &AttributePath::root(),
        &mut diagnostics,
    );
    tracing::debug!(
        diagnostics = diagnostics.len(),
        "validated configuration against schema"
    );
    diagnostics
}

fn validate_attributes(
    attributes: &[Attribute],
    config: &DynamicValue,
    parent: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for attribute in attributes {
        let path = parent.clone().attribute(&attribute.name);
        let value = config.get(&path);

        if attribute.required && value.is_null() {
            diagnostics.push(Diagnostic::attribute_error(
                &path,
                "Missing required argument",
                format!(
                    "The argument \"{}\" is required, but no definition was found.",
                    attribute.name
                ),
            ));
        }

        if attribute.computed && !attribute.optional && !attribute.required && !value.is_null() {
            diagnostics.push(Diagnostic::attribute_error(
                &path,
                "Value for unconfigurable attribute",
                format!(
                    "Can't configure a value for \"{}\": its value will be decided automatically based on the result of applying this configuration.",
                    attribute.name
                ),
            ));
        }

        if !attribute.validators.is_empty() {
            let request = ValidatorRequest {
                config: config.clone(),
                config_value: DynamicValue::new(value.clone()),
                path: path.clone(),
                path_expression: PathExpression::from_path(&path),
            };
            for validator in &attribute.validators {
                diagnostics.extend(validator.validate(&request).diagnostics);
            }
        }

        let Some(nested) = &attribute.nested_type else {
            continue;
        };
        match (nested.nesting, &value) {
            (ObjectNestingMode::Single, Dynamic::Map(_)) => {
                validate_attributes(&nested.attributes, config, &path, diagnostics);
            }
            (ObjectNestingMode::List | ObjectNestingMode::Set, Dynamic::List(items)) => {
                // unknown elements are checked once they are known
                for (idx, _) in items.iter().enumerate().filter(|(_, i)| !i.is_unknown()) {
                    let element = path.clone().index(idx as i64);
                    validate_attributes(&nested.attributes, config, &element, diagnostics);
                }
            }
            (ObjectNestingMode::Map, Dynamic::Map(entries)) => {
                let mut keys: Vec<&String> =
                    entries.keys().filter(|k| !entries[*k].is_unknown()).collect();
                keys.sort();
                for key in keys {
                    let element = path.clone().key(key);
                    validate_attributes(&nested.attributes, config, &element, diagnostics);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        AttributeBuilder, AttributeType, SchemaBuilder, Validator, ValidatorResponse,
    };

    struct MustBePositive;

    impl Validator for MustBePositive {
        fn description(&self) -> String {
            "must be positive".to_string()
        }

        fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
            match request.config_value.value.as_number() {
                Some(n) if n <= 0.0 => ValidatorResponse::with(Diagnostic::invalid_attribute_value(
                    &request.path,
                    self.description(),
                    &request.config_value.value,
                )),
                _ => ValidatorResponse::default(),
            }
        }
    }

    fn schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::nested(
                    "ranges",
                    ObjectNestingMode::Set,
                    vec![
                        AttributeBuilder::new("first", AttributeType::Number)
                            .required()
                            .validator(MustBePositive)
                            .build(),
                        AttributeBuilder::new("last", AttributeType::Number)
                            .required()
                            .validator(MustBePositive)
                            .build(),
                    ],
                )
                .optional()
                .build(),
            )
            .build()
    }

    #[test]
    fn missing_required_attribute_is_reported() {
        let config = DynamicValue::new(Dynamic::object([("name", Dynamic::Null)]));
        let diags = validate_config(&schema(), &config);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Missing required argument");
        assert_eq!(diags[0].attribute, Some(AttributePath::new("name")));
    }

    #[test]
    fn unknown_required_attribute_is_accepted() {
        let config = DynamicValue::new(Dynamic::object([("name", Dynamic::Unknown)]));
        assert!(validate_config(&schema(), &config).is_empty());
    }

    #[test]
    fn computed_only_attribute_cannot_be_set() {
        let config = DynamicValue::new(Dynamic::object([
            ("name", Dynamic::string("a")),
            ("id", Dynamic::string("b")),
        ]));
        let diags = validate_config(&schema(), &config);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Value for unconfigurable attribute");
    }

    #[test]
    fn nested_elements_are_validated_individually() {
        let config = DynamicValue::new(Dynamic::object([
            ("name", Dynamic::string("a")),
            (
                "ranges",
                Dynamic::List(vec![
                    Dynamic::object([("first", Dynamic::Number(1.0)), ("last", Dynamic::Number(-1.0))]),
                    Dynamic::object([("first", Dynamic::Number(0.0)), ("last", Dynamic::Null)]),
                ]),
            ),
        ]));

        let diags = validate_config(&schema(), &config);
        let paths: Vec<String> = diags
            .iter()
            .filter_map(|d| d.attribute.as_ref().map(ToString::to_string))
            .collect();
        assert_eq!(paths, vec!["ranges[0].last", "ranges[1].first", "ranges[1].last"]);
    }

    #[test]
    fn unknown_nested_elements_are_skipped() {
        let config = DynamicValue::new(Dynamic::object([
            ("name", Dynamic::string("a")),
            (
                "ranges",
                Dynamic::List(vec![
                    Dynamic::Unknown,
                    Dynamic::object([("first", Dynamic::Number(-1.0)), ("last", Dynamic::Number(2.0))]),
                ]),
            ),
        ]));
        let diags = validate_config(&schema(), &config);
        assert_eq!(diags.len(), 1, "{:?}", diags);
        assert_eq!(
            diags[0].attribute,
            Some(AttributePath::new("ranges").index(1).attribute("first"))
        );
    }
}
