//! Dynamic BGP Peering primitive: BGP sessions accepted from any neighbor
//! within a prefix

use std::sync::Arc;

use super::bgp_peering_ip_endpoint::timer_attributes;
use super::{
    api_primitives_to_json, child_primitives_attribute, marshal, name_attribute,
    nested_primitives, primitive_attribute, sort_child_primitives, wrong_attribute_type,
    Primitive, Prototype,
};
use crate::api::connectivity_templates::{
    AttachBgpWithPrefixPeering, Primitive as ApiPrimitive, PrimitiveAttributes,
};
use crate::validators::{ParseCidr, ValueAtMustBe, WhenValueSet};
use crate::values;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use tfplug::path::PathExpression;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, Validator};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{AtLeastOneOf, NumberRangeValidator, StringLengthValidator};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicBgpPeering {
    pub name: String,
    pub ttl: Option<u8>,
    pub bfd_enabled: bool,
    pub password: Option<String>,
    pub keepalive_time: Option<u16>,
    pub hold_time: Option<u16>,
    pub ipv4_enabled: bool,
    pub ipv6_enabled: bool,
    pub local_asn: Option<u32>,
    pub ipv4_peer_prefix: Option<String>,
    pub ipv6_peer_prefix: Option<String>,
    pub child_primitives: Vec<String>,
}

fn peer_prefix_attribute(family: &str, ipv4: bool) -> Attribute {
    let enabled = format!("{}_enabled", family);
    AttributeBuilder::new(&format!("{}_peer_prefix", family), AttributeType::String)
        .description("Peer prefix in CIDR notation. Omit to have Apstra derive the prefix from the subnet of the interface.")
        .optional()
        .validator(ParseCidr::new(ipv4, !ipv4))
        .validator(WhenValueSet::new(vec![Arc::new(ValueAtMustBe::new(
            PathExpression::match_root(&enabled),
            true,
            false,
        )) as Arc<dyn Validator>]))
        .build()
}

fn peer_prefix(
    prefix: &Option<String>,
    family: &str,
    path: &AttributePath,
) -> Result<Option<String>, Diagnostic> {
    let Some(prefix) = prefix else {
        return Ok(None);
    };
    prefix
        .parse::<IpNet>()
        .map(|net| Some(net.trunc().to_string()))
        .map_err(|e| {
            Diagnostic::attribute_error(
                path,
                format!("failed parsing {} neighbor prefix {:?}", family, prefix),
                e.to_string(),
            )
        })
}

impl Primitive for DynamicBgpPeering {
    const POLICY_TYPE: &'static str = "AttachBgpWithPrefixPeeringForSviOrSubinterface";
    const DATA_SOURCE_TYPE: &'static str = "apstra_datacenter_ct_dynamic_bgp_peering";
    const KIND: &'static str = "DynamicBgpPeering";
    const DESCRIPTION: &'static str = "This data source composes a Connectivity Template \
        Primitive as a JSON string, suitable for use in the `child_primitives` attribute \
        of an IP Link Connectivity Template Primitive.";

    fn attributes() -> Vec<Attribute> {
        let mut attributes = vec![
            name_attribute(),
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
            AttributeBuilder::new("ipv4_enabled", AttributeType::Bool)
                .description("Enables peering with IPv4 neighbors.")
                .optional()
                .validator(AtLeastOneOf::new(vec![PathExpression::match_root(
                    "ipv6_enabled",
                )]))
                .build(),
            AttributeBuilder::new("ipv6_enabled", AttributeType::Bool)
                .description("Enables peering with IPv6 neighbors.")
                .optional()
                .build(),
            AttributeBuilder::new("local_asn", AttributeType::Number)
                .description("This feature is configured on a per-peer basis. It allows a router to appear to be a member of a second autonomous system (AS) by prepending a local-as AS number, in addition to its real AS number, announced to its eBGP peer.")
                .optional()
                .validator(NumberRangeValidator::between(1.0, u32::MAX as f64))
                .build(),
            peer_prefix_attribute("ipv4", true),
            peer_prefix_attribute("ipv6", false),
            child_primitives_attribute(),
            primitive_attribute(),
        ]);
        attributes
    }

    fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        let path = |name: &str| AttributePath::new(name);
        Ok(Self {
            name: values::string(config, &path("name"))?.unwrap_or_default(),
            ttl: values::integer(config, &path("ttl"))?,
            bfd_enabled: values::boolean(config, &path("bfd_enabled"))?.unwrap_or(false),
            password: values::string(config, &path("password"))?,
            keepalive_time: values::integer(config, &path("keepalive_time"))?,
            hold_time: values::integer(config, &path("hold_time"))?,
            ipv4_enabled: values::boolean(config, &path("ipv4_enabled"))?.unwrap_or(false),
            ipv6_enabled: values::boolean(config, &path("ipv6_enabled"))?.unwrap_or(false),
            local_asn: values::integer(config, &path("local_asn"))?,
            ipv4_peer_prefix: values::string(config, &path("ipv4_peer_prefix"))?,
            ipv6_peer_prefix: values::string(config, &path("ipv6_peer_prefix"))?,
            child_primitives: values::strings(config, &path("child_primitives"))?,
        })
    }

    fn from_api(primitive: &ApiPrimitive) -> Result<Self, Diagnostic> {
        let PrimitiveAttributes::BgpWithPrefixPeering(attributes) = &primitive.attributes else {
            return Err(wrong_attribute_type(Self::POLICY_TYPE, primitive));
        };
        Ok(Self {
            name: primitive.label.clone(),
            ttl: Some(attributes.ttl),
            bfd_enabled: attributes.bfd,
            password: attributes.password.clone(),
            keepalive_time: attributes.keepalive,
            hold_time: attributes.holdtime,
            ipv4_enabled: attributes.session_addressing_ipv4,
            ipv6_enabled: attributes.session_addressing_ipv6,
            local_asn: attributes.local_asn,
            ipv4_peer_prefix: attributes.prefix_neighbor_ipv4.clone(),
            ipv6_peer_prefix: attributes.prefix_neighbor_ipv6.clone(),
            child_primitives: api_primitives_to_json(&primitive.subpolicies)?,
        })
    }

    fn marshal(&self) -> Result<String, Diagnostic> {
        let mut child_primitives = self.child_primitives.clone();
        sort_child_primitives(&mut child_primitives);
        marshal(
            Self::KIND,
            Self::POLICY_TYPE,
            &self.name,
            &DynamicBgpPeeringPrototype {
                ipv4_afi_enabled: self.ipv4_enabled,
                ipv6_afi_enabled: self.ipv6_enabled,
                ttl: self.ttl.unwrap_or(0),
                bfd_enabled: self.bfd_enabled,
                password: self.password.clone(),
                keepalive_time: self.keepalive_time,
                hold_time: self.hold_time,
                ipv4_enabled: self.ipv4_enabled,
                ipv6_enabled: self.ipv6_enabled,
                local_asn: self.local_asn,
                ipv4_peer_prefix: self.ipv4_peer_prefix.clone(),
                ipv6_peer_prefix: self.ipv6_peer_prefix.clone(),
                child_primitives,
            },
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DynamicBgpPeeringPrototype {
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
    #[serde(default)]
    ipv4_enabled: bool,
    #[serde(default)]
    ipv6_enabled: bool,
    local_asn: Option<u32>,
    ipv4_peer_prefix: Option<String>,
    ipv6_peer_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    child_primitives: Vec<String>,
}

impl Prototype for DynamicBgpPeeringPrototype {
    fn to_api(&self, label: &str, path: &AttributePath) -> Result<ApiPrimitive, Diagnostic> {
        Ok(ApiPrimitive {
            id: None,
            label: label.to_string(),
            attributes: PrimitiveAttributes::BgpWithPrefixPeering(AttachBgpWithPrefixPeering {
                bfd: self.bfd_enabled,
                holdtime: self.hold_time,
                ipv4_safi: self.ipv4_afi_enabled,
                ipv6_safi: self.ipv6_afi_enabled,
                keepalive: self.keepalive_time,
                local_asn: self.local_asn,
                password: self.password.clone(),
                prefix_neighbor_ipv4: peer_prefix(&self.ipv4_peer_prefix, "ipv4", path)?,
                prefix_neighbor_ipv6: peer_prefix(&self.ipv6_peer_prefix, "ipv6", path)?,
                session_addressing_ipv4: self.ipv4_enabled,
                session_addressing_ipv6: self.ipv6_enabled,
                ttl: self.ttl,
            }),
            subpolicies: nested_primitives(&self.child_primitives, path)?,
        })
    }
}
