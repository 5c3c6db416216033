//! Cross-attribute validators
//!
//! Validators that look beyond the attribute under validation: they take
//! path expressions, merge relative ones onto the validated attribute's own
//! expression, and compare the values found there. Unknown values anywhere
//! in the comparison defer validation to apply time; null means "not set".

mod also_requires;
mod conditional;
mod different_from;
mod must_be_one_of;
mod network;
mod object_attributes;
mod product;
mod required_when;
mod unique;
mod value_at;

pub use also_requires::{AlsoRequiresNOf, AtMostNOf};
pub use conditional::{WhenValueIs, WhenValueSet};
pub use different_from::{DifferentFrom, DifferentFromValues};
pub use must_be_one_of::MustBeOneOf;
pub use network::{overlaps, FallsWithinCidr, ParseCidr, ParseIp};
pub use object_attributes::{AtLeastNAttributes, AtMostNAttributes, ExactlyNAttributes};
pub use product::AtLeastProductOf;
pub use required_when::{ForbiddenWhenValueIs, RequiredWhenValueIs, RequiredWhenValueNull};
pub use unique::UniqueValueCombinationsAt;
pub use value_at::{MustBeWhenValueAt, ValueAtMustBe, WhenValueAtMustBe};

pub use tfplug::validator::matched_values;

use tfplug::types::{AttributePath, Diagnostic};

/// Path rendered as a quoted string for diagnostic text
fn quoted(path: &AttributePath) -> String {
    format!("{:?}", path.to_string())
}

/// Prefixes each diagnostic's detail with `prefix`
fn wrap_diagnostics(prefix: &str, diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    diagnostics
        .into_iter()
        .map(|mut d| {
            d.detail = format!("{}: {}", prefix, d.detail);
            d
        })
        .collect()
}
