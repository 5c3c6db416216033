//! Object validators counting how many of a set of attributes are configured

use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::types::{Diagnostic, Dynamic};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound {
    AtLeast,
    AtMost,
    Exactly,
}

struct AttributeCount {
    bound: Bound,
    n: usize,
    attributes: Vec<String>,
}

impl AttributeCount {
    fn new<I, S>(bound: Bound, n: usize, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bound,
            n,
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    fn names(names: &[String]) -> String {
        format!("['{}']", names.join("', '"))
    }

    fn description(&self) -> String {
        let qualifier = match self.bound {
            Bound::AtLeast => "at least",
            Bound::AtMost => "at most",
            Bound::Exactly => "exactly",
        };
        format!(
            "ensure that the object has {} {} of the following attributes configured: {}",
            qualifier,
            self.n,
            Self::names(&self.attributes)
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let object = match &request.config_value.value {
            Dynamic::Map(object) => object,
            _ => return ValidatorResponse::default(),
        };

        // an empty list means every attribute of the object
        let attributes: Vec<String> = if self.attributes.is_empty() {
            let mut all: Vec<String> = object.keys().cloned().collect();
            all.sort();
            all
        } else {
            self.attributes.clone()
        };

        if self.n > attributes.len() {
            return ValidatorResponse::with(Diagnostic::attribute_error(
                &request.path,
                "Invalid validator for element value",
                format!(
                    "While performing schema-based validation, an unexpected error occurred. \
                     A schema validator which validates specific attributes has been configured for this object, \
                     but the validator has been configured to check more objects than it knows about.\n\n\
                     Count of attributes to check: {}\n Attributes known to the validator: {}",
                    self.n,
                    Self::names(&attributes)
                ),
            ));
        }

        let mut found = 0;
        for name in &attributes {
            let Some(value) = object.get(name) else {
                let mut available: Vec<String> = object.keys().cloned().collect();
                available.sort();
                return ValidatorResponse::with(Diagnostic::attribute_error(
                    &request.path,
                    "Invalid validator for element value",
                    format!(
                        "While performing schema-based validation, an unexpected error occurred. \
                         A schema validator which validates specific attributes has been configured for this object, \
                         but the available attributes don't include all of the attributes requested for validation.\n\n\
                         Available attributes: {}\n Attributes to be validated: {}",
                        Self::names(&available),
                        Self::names(&attributes)
                    ),
                ));
            };
            if value.is_unknown() {
                return ValidatorResponse::default();
            }
            if !value.is_null() {
                found += 1;
            }
        }

        let failure = match self.bound {
            Bound::AtLeast if found < self.n => Some((
                "Insufficient attribute configuration",
                format!(
                    "At least {} values from: {} must be configured.",
                    self.n,
                    Self::names(&attributes)
                ),
            )),
            Bound::AtMost if found > self.n => Some((
                "Too many attributes configured",
                format!(
                    "No more than {} values from: {} may be configured.",
                    self.n,
                    Self::names(&attributes)
                ),
            )),
            Bound::Exactly if found != self.n => Some((
                "Wrong number of attributes configured",
                format!(
                    "Exactly {} values from: {} must be configured.",
                    self.n,
                    Self::names(&attributes)
                ),
            )),
            _ => None,
        };

        match failure {
            Some((summary, detail)) => {
                ValidatorResponse::with(Diagnostic::attribute_error(&request.path, summary, detail))
            }
            None => ValidatorResponse::default(),
        }
    }
}

macro_rules! attribute_count_validator {
    ($(#[$doc:meta])* $name:ident, $bound:expr) => {
        $(#[$doc])*
        pub struct $name(AttributeCount);

        impl $name {
            pub fn new<I, S>(n: usize, attributes: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                Self(AttributeCount::new($bound, n, attributes))
            }
        }

        impl Validator for $name {
            fn description(&self) -> String {
                self.0.description()
            }

            fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
                self.0.validate(request)
            }
        }
    };
}

attribute_count_validator!(
    /// At least `n` of the named attributes must be non-null
    AtLeastNAttributes,
    Bound::AtLeast
);
attribute_count_validator!(
    /// At most `n` of the named attributes may be non-null
    AtMostNAttributes,
    Bound::AtMost
);
attribute_count_validator!(
    /// Exactly `n` of the named attributes must be non-null
    ExactlyNAttributes,
    Bound::Exactly
);

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::validators::test_support::request;
    use tfplug::types::AttributePath;

    fn endpoint(v4: Dynamic, v6: Dynamic) -> Dynamic {
        Dynamic::object([(
            "endpoint",
            Dynamic::object([("ipv4_address", v4), ("ipv6_address", v6)]),
        )])
    }

    #[test]
    fn at_least_reports_insufficient_configuration() {
        let v = AtLeastNAttributes::new(1, ["ipv4_address", "ipv6_address"]);
        let resp = v.validate(&request(
            endpoint(Dynamic::Null, Dynamic::Null),
            AttributePath::new("endpoint"),
        ));
        assert_eq!(resp.diagnostics.len(), 1);
        assert_eq!(resp.diagnostics[0].summary, "Insufficient attribute configuration");
        assert_eq!(
            resp.diagnostics[0].detail,
            "At least 1 values from: ['ipv4_address', 'ipv6_address'] must be configured."
        );
    }

    #[test]
    fn unknown_member_defers() {
        let v = ExactlyNAttributes::new(1, ["ipv4_address", "ipv6_address"]);
        assert!(v
            .validate(&request(
                endpoint(Dynamic::Unknown, Dynamic::string("::1")),
                AttributePath::new("endpoint"),
            ))
            .diagnostics
            .is_empty());
    }

    #[test]
    fn at_most_and_exactly() {
        let both = endpoint(Dynamic::string("10.0.0.1"), Dynamic::string("::1"));
        let resp = AtMostNAttributes::new(1, ["ipv4_address", "ipv6_address"])
            .validate(&request(both.clone(), AttributePath::new("endpoint")));
        assert_eq!(resp.diagnostics[0].summary, "Too many attributes configured");

        let resp = ExactlyNAttributes::new(1, ["ipv4_address", "ipv6_address"])
            .validate(&request(both, AttributePath::new("endpoint")));
        assert_eq!(resp.diagnostics[0].summary, "Wrong number of attributes configured");
    }

    #[test]
    fn misconfigured_validators_are_bugs() {
        let cfg = endpoint(Dynamic::Null, Dynamic::Null);
        let resp = AtLeastNAttributes::new(3, ["ipv4_address", "ipv6_address"])
            .validate(&request(cfg.clone(), AttributePath::new("endpoint")));
        assert_eq!(resp.diagnostics[0].summary, "Invalid validator for element value");

        let resp = AtLeastNAttributes::new(1, ["missing"])
            .validate(&request(cfg, AttributePath::new("endpoint")));
        assert!(resp.diagnostics[0].detail.contains("Attributes to be validated: ['missing']"));
    }

    #[test]
    fn null_object_is_skipped() {
        let v = AtLeastNAttributes::new(1, ["a"]);
        assert!(v
            .validate(&request(
                Dynamic::object([("endpoint", Dynamic::Null)]),
                AttributePath::new("endpoint"),
            ))
            .diagnostics
            .is_empty());
    }
}
