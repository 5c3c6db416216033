//! Data source implementations

pub mod agent_profile;
pub mod ct_primitive;
pub mod ip_pool;
pub mod range_pool;

pub use agent_profile::AgentProfileDataSource;
pub use ct_primitive::PrimitiveDataSource;
pub use ip_pool::IpPoolDataSource;
pub use range_pool::RangePoolDataSource;

use crate::values;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{ExactlyOneOf, StringLengthValidator};
use tfplug::PathExpression;

/// How a data source finds its object
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lookup {
    Id(String),
    Name(String),
}

/// `id` and `name`, exactly one of which must be configured
pub(crate) fn lookup_attributes(noun: &str) -> Vec<Attribute> {
    vec![
        AttributeBuilder::new("id", AttributeType::String)
            .description(&format!(
                "ID of the desired {}. Required when `name` is omitted.",
                noun
            ))
            .optional()
            .computed()
            .validator(StringLengthValidator::length_at_least(1))
            .validator(ExactlyOneOf::new(vec![
                PathExpression::match_relative(),
                PathExpression::match_root("name"),
            ]))
            .build(),
        AttributeBuilder::new("name", AttributeType::String)
            .description(&format!(
                "(Non unique) name of the {}. Required when `id` is omitted.",
                noun
            ))
            .optional()
            .computed()
            .validator(StringLengthValidator::length_at_least(1))
            .build(),
    ]
}

/// Name wins when both are somehow present
pub(crate) fn lookup(config: &DynamicValue) -> Result<Lookup, Diagnostic> {
    if let Some(name) = values::string(config, &AttributePath::new("name"))? {
        return Ok(Lookup::Name(name));
    }
    match values::string(config, &AttributePath::new("id"))? {
        Some(id) => Ok(Lookup::Id(id)),
        None => Err(Diagnostic::error(
            "Missing lookup attribute",
            "exactly one of 'id' and 'name' must be set",
        )),
    }
}

/// The one object carrying the requested name
pub(crate) fn single_named<T>(noun: &str, name: &str, mut found: Vec<T>) -> Result<T, String> {
    match found.len() {
        0 => Err(format!("no {} named '{}' found", noun, name)),
        1 => Ok(found.remove(0)),
        n => Err(format!("{} {}s named '{}' found, expected 1", n, noun, name)),
    }
}
