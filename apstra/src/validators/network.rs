//! IP address and CIDR prefix validators

use std::net::IpAddr;

use ipnet::IpNet;
use tfplug::path::PathExpression;
use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::types::Diagnostic;

use super::matched_values;

/// True when the two prefixes share any address
pub fn overlaps(a: &IpNet, b: &IpNet) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
}

fn family_label(require_ipv4: bool, require_ipv6: bool) -> &'static str {
    match (require_ipv4, require_ipv6) {
        (true, false) => "IPv4 ",
        (false, true) => "IPv6 ",
        _ => "",
    }
}

fn family_ok(ip: &IpAddr, require_ipv4: bool, require_ipv6: bool) -> bool {
    match ip {
        IpAddr::V4(_) => !require_ipv6 || require_ipv4,
        IpAddr::V6(_) => !require_ipv4 || require_ipv6,
    }
}

/// String must be a CIDR prefix, optionally of a specific family
pub struct ParseCidr {
    pub require_ipv4: bool,
    pub require_ipv6: bool,
}

impl ParseCidr {
    pub fn new(require_ipv4: bool, require_ipv6: bool) -> Self {
        Self {
            require_ipv4,
            require_ipv6,
        }
    }
}

impl Validator for ParseCidr {
    fn description(&self) -> String {
        format!(
            "value must be an {}CIDR prefix",
            family_label(self.require_ipv4, self.require_ipv6)
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let Some(text) = request.config_value.value.as_str() else {
            return ValidatorResponse::default();
        };
        match text.parse::<IpNet>() {
            Ok(net) if family_ok(&net.addr(), self.require_ipv4, self.require_ipv6) => {
                ValidatorResponse::default()
            }
            _ => ValidatorResponse::with(Diagnostic::invalid_attribute_value(
                &request.path,
                self.description(),
                &request.config_value.value,
            )),
        }
    }
}

/// String must be an IP address, optionally of a specific family
pub struct ParseIp {
    pub require_ipv4: bool,
    pub require_ipv6: bool,
}

impl ParseIp {
    pub fn new(require_ipv4: bool, require_ipv6: bool) -> Self {
        Self {
            require_ipv4,
            require_ipv6,
        }
    }
}

impl Validator for ParseIp {
    fn description(&self) -> String {
        format!(
            "value must be an {}IP address",
            family_label(self.require_ipv4, self.require_ipv6)
        )
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let Some(text) = request.config_value.value.as_str() else {
            return ValidatorResponse::default();
        };
        match text.parse::<IpAddr>() {
            Ok(ip) if family_ok(&ip, self.require_ipv4, self.require_ipv6) => {
                ValidatorResponse::default()
            }
            _ => ValidatorResponse::with(Diagnostic::invalid_attribute_value(
                &request.path,
                self.description(),
                &request.config_value.value,
            )),
        }
    }
}

/// IP address must fall within the CIDR prefix found at `expression`
pub struct FallsWithinCidr {
    pub expression: PathExpression,
    pub all_zeros_ok: bool,
    pub all_ones_ok: bool,
}

impl FallsWithinCidr {
    pub fn new(expression: PathExpression, all_zeros_ok: bool, all_ones_ok: bool) -> Self {
        Self {
            expression,
            all_zeros_ok,
            all_ones_ok,
        }
    }
}

impl Validator for FallsWithinCidr {
    fn description(&self) -> String {
        let base = format!(
            "Ensures that the supplied IP address falls within the CIDR block specified at attribute {:?}",
            self.expression.resolve().to_string()
        );
        match (self.all_zeros_ok, self.all_ones_ok) {
            (true, true) => format!("{}.", base),
            (true, false) => format!("{} and is not the \"all ones\" address.", base),
            (false, true) => format!("{} and is not the \"all zeros\" address.", base),
            (false, false) => format!(
                "{} and is neither the \"all zeros\" address nor the \"all ones\" address.",
                base
            ),
        }
    }

    fn validate(&self, request: &ValidatorRequest) -> ValidatorResponse {
        let own = &request.config_value.value;
        let Some(text) = own.as_str() else {
            return ValidatorResponse::default();
        };

        let mut response = ValidatorResponse::default();
        for (path, value) in matched_values(request, std::slice::from_ref(&self.expression)) {
            if value.is_unknown() {
                return ValidatorResponse::default();
            }
            let Some(block) = value.as_str() else {
                continue;
            };
            let subnet = match block.parse::<IpNet>() {
                Ok(subnet) => subnet.trunc(),
                Err(e) => {
                    response.diagnostics.push(Diagnostic::attribute_error(
                        &path,
                        format!("error parsing CIDR block {:?}", block),
                        e.to_string(),
                    ));
                    return response;
                }
            };

            let within = text.parse::<IpAddr>().ok().filter(|ip| subnet.contains(ip));
            let Some(ip) = within else {
                response.diagnostics.push(Diagnostic::invalid_attribute_value(
                    &request.path,
                    format!("value must fall within {}", subnet),
                    text,
                ));
                return response;
            };

            if ip == subnet.network() && !self.all_zeros_ok {
                response.diagnostics.push(Diagnostic::invalid_attribute_value(
                    &request.path,
                    format!("value must not be the all-zeros address {}", ip),
                    text,
                ));
                return response;
            }
            if ip == subnet.broadcast() && !self.all_ones_ok {
                response.diagnostics.push(Diagnostic::invalid_attribute_value(
                    &request.path,
                    format!("value must not be the all-ones address {}", ip),
                    text,
                ));
                return response;
            }
        }
        response
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::validators::test_support::{request, sibling};
    use tfplug::types::{AttributePath, Dynamic};

    #[test]
    fn prefix_overlap() {
        let net = |s: &str| s.parse::<IpNet>().unwrap();
        assert!(overlaps(&net("10.0.0.0/8"), &net("10.1.0.0/16")));
        assert!(overlaps(&net("10.1.0.0/16"), &net("10.0.0.0/8")));
        assert!(!overlaps(&net("10.1.0.0/16"), &net("10.2.0.0/16")));
        assert!(overlaps(&net("0.0.0.0/0"), &net("192.0.2.0/24")));
        assert!(!overlaps(&net("2001:db8::/126"), &net("2001:db8::4/126")));
        assert!(!overlaps(&net("10.0.0.0/8"), &net("::/0")));
    }

    #[test]
    fn parse_cidr_rejects_garbage() {
        let v = ParseCidr::new(false, false);
        for bad in ["10.0.0.0", "10.0.0.0/33", "10.0.0.0/", "x/8", "::/129"] {
            let config = Dynamic::object([("network", Dynamic::string(bad))]);
            let resp = v.validate(&request(config, AttributePath::new("network")));
            assert_eq!(resp.diagnostics.len(), 1, "{bad}");
        }
    }

    #[test]
    fn parse_cidr_enforces_family() {
        let cfg = |s: &str| Dynamic::object([("network", Dynamic::string(s))]);
        let v4 = ParseCidr::new(true, false);
        assert!(v4
            .validate(&request(cfg("10.0.0.0/8"), AttributePath::new("network")))
            .diagnostics
            .is_empty());

        let resp = v4.validate(&request(cfg("2001:db8::/32"), AttributePath::new("network")));
        assert_eq!(
            resp.diagnostics[0].detail,
            "Attribute network value must be an IPv4 CIDR prefix, got: \"2001:db8::/32\""
        );

        let any = ParseCidr::new(false, false);
        assert!(any
            .validate(&request(cfg("2001:db8::/32"), AttributePath::new("network")))
            .diagnostics
            .is_empty());
    }

    #[test]
    fn parse_ip() {
        let cfg = |s: &str| Dynamic::object([("management_ip", Dynamic::string(s))]);
        let v = ParseIp::new(false, false);
        assert!(v
            .validate(&request(cfg("192.0.2.10"), AttributePath::new("management_ip")))
            .diagnostics
            .is_empty());
        assert_eq!(
            v.validate(&request(cfg("192.0.2.300"), AttributePath::new("management_ip")))
                .diagnostics
                .len(),
            1
        );
        let v6_only = ParseIp::new(false, true);
        assert_eq!(
            v6_only
                .validate(&request(cfg("192.0.2.10"), AttributePath::new("management_ip")))
                .diagnostics
                .len(),
            1
        );
    }

    fn gateway(ip: &str, subnet: Dynamic) -> Dynamic {
        Dynamic::object([("gateway", Dynamic::string(ip)), ("subnet", subnet)])
    }

    #[test]
    fn falls_within_cidr() {
        let v = FallsWithinCidr::new(sibling("subnet"), false, false);
        let subnet = || Dynamic::string("10.1.1.0/24");

        assert!(v
            .validate(&request(gateway("10.1.1.1", subnet()), AttributePath::new("gateway")))
            .diagnostics
            .is_empty());

        let resp = v.validate(&request(
            gateway("10.1.2.1", subnet()),
            AttributePath::new("gateway"),
        ));
        assert_eq!(
            resp.diagnostics[0].detail,
            "Attribute gateway value must fall within 10.1.1.0/24, got: 10.1.2.1"
        );

        let resp = v.validate(&request(
            gateway("10.1.1.0", subnet()),
            AttributePath::new("gateway"),
        ));
        assert!(resp.diagnostics[0].detail.contains("all-zeros"));

        let resp = v.validate(&request(
            gateway("10.1.1.255", subnet()),
            AttributePath::new("gateway"),
        ));
        assert!(resp.diagnostics[0].detail.contains("all-ones"));

        let lenient = FallsWithinCidr::new(sibling("subnet"), true, true);
        assert!(lenient
            .validate(&request(gateway("10.1.1.255", subnet()), AttributePath::new("gateway")))
            .diagnostics
            .is_empty());
    }

    #[test]
    fn falls_within_cidr_defers_and_reports_bad_blocks() {
        let v = FallsWithinCidr::new(sibling("subnet"), false, false);
        assert!(v
            .validate(&request(gateway("10.1.1.1", Dynamic::Unknown), AttributePath::new("gateway")))
            .diagnostics
            .is_empty());

        let resp = v.validate(&request(
            gateway("10.1.1.1", Dynamic::string("bogus")),
            AttributePath::new("gateway"),
        ));
        assert_eq!(resp.diagnostics[0].summary, "error parsing CIDR block \"bogus\"");
        assert_eq!(resp.diagnostics[0].attribute, Some(AttributePath::new("subnet")));
    }
}
