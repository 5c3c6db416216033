//! BGP Peering (IP Endpoint) primitive

use super::{
    api_primitives_to_json, child_primitives_attribute, label_attribute, marshal,
    nested_primitives, primitive_attribute, sort_child_primitives, wrong_attribute_type,
    Primitive, Prototype,
};
use crate::api::connectivity_templates::{
    AttachIpEndpointWithBgpNsxt, NeighborAsnType, Primitive as ApiPrimitive, PrimitiveAttributes,
};
use crate::validators::{AtLeastProductOf, ParseIp};
use crate::values;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use tfplug::path::PathExpression;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{
    AlsoRequires, AtLeastOneOf, NumberRangeValidator, StringLengthValidator,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BgpPeeringIpEndpoint {
    pub label: String,
    /// Dynamic neighbor ASN when unset
    pub neighbor_asn: Option<u32>,
    pub ttl: Option<u8>,
    pub bfd_enabled: bool,
    pub password: Option<String>,
    pub keepalive_time: Option<u16>,
    pub hold_time: Option<u16>,
    pub local_asn: Option<u32>,
    pub ipv4_address: Option<String>,
    pub ipv6_address: Option<String>,
    pub child_primitives: Vec<String>,
}

/// BGP timer attributes shared by the peering primitives. Hold time must be
/// at least three keepalive intervals and each one needs the other.
pub(crate) fn timer_attributes(min: f64) -> Vec<Attribute> {
    vec![
        AttributeBuilder::new("keepalive_time", AttributeType::Number)
            .description("BGP keepalive time (seconds).")
            .optional()
            .validator(NumberRangeValidator::between(min, u16::MAX as f64))
            .validator(AlsoRequires::new(vec![PathExpression::match_root(
                "hold_time",
            )]))
            .build(),
        AttributeBuilder::new("hold_time", AttributeType::Number)
            .description("BGP hold time (seconds).")
            .optional()
            .validator(NumberRangeValidator::between(min, u16::MAX as f64))
            .validator(AlsoRequires::new(vec![PathExpression::match_root(
                "keepalive_time",
            )]))
            .validator(AtLeastProductOf::new(
                3.0,
                PathExpression::match_root("keepalive_time"),
            ))
            .build(),
    ]
}

pub(crate) fn parse_address(
    address: &Option<String>,
    family: &str,
    path: &AttributePath,
) -> Result<Option<String>, Diagnostic> {
    let Some(address) = address else {
        return Ok(None);
    };
    address
        .parse::<IpAddr>()
        .map(|ip| Some(ip.to_string()))
        .map_err(|e| {
            Diagnostic::attribute_error(
                path,
                format!("failed parsing {} address {:?}", family, address),
                e.to_string(),
            )
        })
}

impl Primitive for BgpPeeringIpEndpoint {
    const POLICY_TYPE: &'static str = "AttachIpEndpointWithBgpNsxt";
    const DATA_SOURCE_TYPE: &'static str = "apstra_datacenter_ct_bgp_peering_ip_endpoint";
    const KIND: &'static str = "BgpPeeringIpEndpoint";
    const DESCRIPTION: &'static str = "This data source composes a Connectivity Template \
        Primitive as a JSON string, suitable for use in the `child_primitives` attribute \
        of an IP Link Connectivity Template Primitive.";

    fn attributes() -> Vec<Attribute> {
        let mut attributes = vec![
            label_attribute(),
            AttributeBuilder::new("neighbor_asn", AttributeType::Number)
                .description("Neighbor ASN. Omit for *Neighbor ASN Type Dynamic*.")
                .optional()
                .validator(NumberRangeValidator::between(0.0, u32::MAX as f64))
                .build(),
            AttributeBuilder::new("ttl", AttributeType::Number)
                .description("BGP Time To Live. Omit to use device defaults.")
                .optional()
                .validator(NumberRangeValidator::between(0.0, u8::MAX as f64))
                .build(),
            AttributeBuilder::new("bfd_enabled", AttributeType::Bool)
                .description("Enable BFD.")
                .optional()
                .build(),
            AttributeBuilder::new("password", AttributeType::String)
                .description("BGP TCP authentication password (unencrypted).")
                .optional()
                .sensitive()
                .validator(StringLengthValidator::length_at_least(1))
                .build(),
        ];
        attributes.extend(timer_attributes(0.0));
        attributes.extend([
            AttributeBuilder::new("local_asn", AttributeType::Number)
                .description("This feature is configured on a per-peer basis. It allows a router to appear to be a member of a second autonomous system (AS) by prepending a local-as AS number, in addition to its real AS number, announced to its eBGP peer.")
                .optional()
                .validator(NumberRangeValidator::between(0.0, u32::MAX as f64))
                .build(),
            AttributeBuilder::new("ipv4_address", AttributeType::String)
                .description("IPv4 address of peer.")
                .optional()
                .validator(ParseIp::new(true, false))
                .validator(AtLeastOneOf::new(vec![PathExpression::match_root(
                    "ipv6_address",
                )]))
                .build(),
            AttributeBuilder::new("ipv6_address", AttributeType::String)
                .description("IPv6 address of peer.")
                .optional()
                .validator(ParseIp::new(false, true))
                .build(),
            child_primitives_attribute(),
            primitive_attribute(),
        ]);
        attributes
    }

    fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        let path = |name: &str| AttributePath::new(name);
        Ok(Self {
            label: values::string(config, &path("label"))?.unwrap_or_default(),
            neighbor_asn: values::integer(config, &path("neighbor_asn"))?,
            ttl: values::integer(config, &path("ttl"))?,
            bfd_enabled: values::boolean(config, &path("bfd_enabled"))?.unwrap_or(false),
            password: values::string(config, &path("password"))?,
            keepalive_time: values::integer(config, &path("keepalive_time"))?,
            hold_time: values::integer(config, &path("hold_time"))?,
            local_asn: values::integer(config, &path("local_asn"))?,
            ipv4_address: values::string(config, &path("ipv4_address"))?,
            ipv6_address: values::string(config, &path("ipv6_address"))?,
            child_primitives: values::strings(config, &path("child_primitives"))?,
        })
    }

    fn from_api(primitive: &ApiPrimitive) -> Result<Self, Diagnostic> {
        let PrimitiveAttributes::IpEndpointWithBgpNsxt(attributes) = &primitive.attributes else {
            return Err(wrong_attribute_type(Self::POLICY_TYPE, primitive));
        };
        Ok(Self {
            label: primitive.label.clone(),
            neighbor_asn: match attributes.neighbor_asn_type {
                NeighborAsnType::Dynamic => None,
                NeighborAsnType::Static => attributes.asn,
            },
            ttl: Some(attributes.ttl),
            bfd_enabled: attributes.bfd,
            password: attributes.password.clone(),
            keepalive_time: attributes.keepalive,
            hold_time: attributes.holdtime,
            local_asn: attributes.local_asn,
            ipv4_address: attributes.ipv4_addr.clone(),
            ipv6_address: attributes.ipv6_addr.clone(),
            child_primitives: api_primitives_to_json(&primitive.subpolicies)?,
        })
    }

    fn marshal(&self) -> Result<String, Diagnostic> {
        let mut child_primitives = self.child_primitives.clone();
        sort_child_primitives(&mut child_primitives);
        marshal(
            Self::KIND,
            Self::POLICY_TYPE,
            &self.label,
            &BgpPeeringIpEndpointPrototype {
                neighbor_asn: self.neighbor_asn,
                neighbor_asn_dynamic: self.neighbor_asn.is_none(),
                ipv4_afi_enabled: self.ipv4_address.is_some(),
                ipv6_afi_enabled: self.ipv6_address.is_some(),
                // zero means device default
                ttl: self.ttl.unwrap_or(0),
                bfd_enabled: self.bfd_enabled,
                password: self.password.clone(),
                keepalive_time: self.keepalive_time,
                hold_time: self.hold_time,
                local_asn: self.local_asn,
                ipv4_address: self.ipv4_address.clone(),
                ipv6_address: self.ipv6_address.clone(),
                child_primitives,
            },
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BgpPeeringIpEndpointPrototype {
    neighbor_asn: Option<u32>,
    #[serde(default)]
    neighbor_asn_dynamic: bool,
    #[serde(default)]
    ipv4_afi_enabled: bool,
    #[serde(default)]
    ipv6_afi_enabled: bool,
    #[serde(default)]
    ttl: u8,
    #[serde(default)]
    bfd_enabled: bool,
    password: Option<String>,
    keepalive_time: Option<u16>,
    hold_time: Option<u16>,
    local_asn: Option<u32>,
    ipv4_address: Option<String>,
    ipv6_address: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    child_primitives: Vec<String>,
}

impl Prototype for BgpPeeringIpEndpointPrototype {
    fn to_api(&self, label: &str, path: &AttributePath) -> Result<ApiPrimitive, Diagnostic> {
        Ok(ApiPrimitive {
            id: None,
            label: label.to_string(),
            attributes: PrimitiveAttributes::IpEndpointWithBgpNsxt(AttachIpEndpointWithBgpNsxt {
                asn: self.neighbor_asn,
                bfd: self.bfd_enabled,
                holdtime: self.hold_time,
                ipv4_addr: parse_address(&self.ipv4_address, "IPv4", path)?,
                ipv6_addr: parse_address(&self.ipv6_address, "IPv6", path)?,
                ipv4_safi: self.ipv4_afi_enabled,
                ipv6_safi: self.ipv6_afi_enabled,
                keepalive: self.keepalive_time,
                local_asn: self.local_asn,
                neighbor_asn_type: NeighborAsnType::from_dynamic(self.neighbor_asn_dynamic),
                password: self.password.clone(),
                ttl: self.ttl,
            }),
            subpolicies: nested_primitives(&self.child_primitives, path)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::connectivity_template::{child_primitives_from_json, primitive_from_api};
    use crate::connectivity_template::RoutingPolicy;
    use tfplug::schema::SchemaBuilder;
    use tfplug::types::Dynamic;
    use tfplug::validation::validate_config;

    fn schema() -> tfplug::schema::Schema {
        BgpPeeringIpEndpoint::attributes()
            .into_iter()
            .fold(SchemaBuilder::new(), |b, a| b.attribute(a))
            .build()
    }

    fn config(pairs: Vec<(&str, Dynamic)>) -> DynamicValue {
        DynamicValue::new(Dynamic::object(pairs))
    }

    #[test]
    fn missing_neighbor_asn_is_dynamic() {
        let endpoint = BgpPeeringIpEndpoint {
            ipv4_address: Some("192.0.2.1".to_string()),
            ..Default::default()
        };
        let parsed = child_primitives_from_json(&[endpoint.marshal().unwrap()], &AttributePath::new("p"))
            .unwrap();
        let PrimitiveAttributes::IpEndpointWithBgpNsxt(attributes) = &parsed[0].attributes else {
            panic!("not an ip endpoint");
        };
        assert_eq!(attributes.neighbor_asn_type, NeighborAsnType::Dynamic);
        assert!(attributes.ipv4_safi);
        assert!(!attributes.ipv6_safi);
        assert_eq!(attributes.ttl, 0);
    }

    #[test]
    fn api_readback_matches_configuration() {
        let policy = RoutingPolicy {
            label: "rp".to_string(),
            routing_policy_id: Some("rp-1".to_string()),
        }
        .marshal()
        .unwrap();
        let endpoint = BgpPeeringIpEndpoint {
            label: "peer".to_string(),
            neighbor_asn: Some(65001),
            ttl: Some(2),
            keepalive_time: Some(10),
            hold_time: Some(30),
            ipv6_address: Some("2001:db8::1".to_string()),
            child_primitives: vec![policy],
            ..Default::default()
        };
        let json = endpoint.marshal().unwrap();
        let parsed = child_primitives_from_json(&[json.clone()], &AttributePath::new("p")).unwrap();
        assert_eq!(primitive_from_api(&parsed[0]).unwrap(), json);
    }

    #[test]
    fn hold_time_must_cover_three_keepalives() {
        let diags = validate_config(
            &schema(),
            &config(vec![
                ("ipv4_address", Dynamic::string("192.0.2.1")),
                ("keepalive_time", Dynamic::Number(10.0)),
                ("hold_time", Dynamic::Number(20.0)),
            ]),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("hold_time")));
    }

    #[test]
    fn keepalive_requires_hold_time() {
        let diags = validate_config(
            &schema(),
            &config(vec![
                ("ipv4_address", Dynamic::string("192.0.2.1")),
                ("keepalive_time", Dynamic::Number(10.0)),
            ]),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Invalid Attribute Combination");
        assert_eq!(diags[0].attribute, Some(AttributePath::new("keepalive_time")));
    }

    #[test]
    fn an_address_is_required() {
        let diags = validate_config(&schema(), &config(vec![("ttl", Dynamic::Number(1.0))]));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("ipv4_address")));

        let diags = validate_config(
            &schema(),
            &config(vec![("ipv4_address", Dynamic::string("2001:db8::1"))]),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Invalid Attribute Value");
    }
}
