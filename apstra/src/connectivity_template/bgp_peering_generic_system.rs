//! BGP Peering (Generic System) primitive

use super::bgp_peering_ip_endpoint::timer_attributes;
use super::{
    api_primitives_to_json, child_primitives_attribute, marshal, name_attribute,
    nested_primitives, primitive_attribute, sort_child_primitives, wrong_attribute_type,
    Primitive, Prototype,
};
use crate::api::connectivity_templates::{
    AttachBgpOverSubinterfacesOrSvi, NeighborAsnType, PeerFrom, PeerTo,
    Primitive as ApiPrimitive, PrimitiveAttributes, SessionAddressing,
};
use crate::values;
use serde::{Deserialize, Serialize};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{NumberRangeValidator, StringLengthValidator, StringOneOfValidator};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BgpPeeringGenericSystem {
    pub name: String,
    pub ttl: Option<u8>,
    pub bfd_enabled: bool,
    pub password: Option<String>,
    pub keepalive_time: Option<u16>,
    pub hold_time: Option<u16>,
    pub ipv4_addressing_type: Option<String>,
    pub ipv6_addressing_type: Option<String>,
    pub local_asn: Option<u32>,
    pub neighbor_asn_dynamic: bool,
    pub peer_from_loopback: bool,
    pub peer_to: Option<String>,
    pub child_primitives: Vec<String>,
}

fn afi_enabled(addressing_type: &Option<String>) -> bool {
    addressing_type
        .as_deref()
        .is_some_and(|t| t != SessionAddressing::None.as_str())
}

impl Primitive for BgpPeeringGenericSystem {
    const POLICY_TYPE: &'static str = "AttachBgpOverSubinterfacesOrSvi";
    const DATA_SOURCE_TYPE: &'static str = "apstra_datacenter_ct_bgp_peering_generic_system";
    const KIND: &'static str = "BgpPeeringGenericSystem";
    const DESCRIPTION: &'static str = "This data source composes a Connectivity Template \
        Primitive as a JSON string, suitable for use in the `child_primitives` attribute \
        of an IP Link Connectivity Template Primitive.";

    fn attributes() -> Vec<Attribute> {
        let mut attributes = vec![
            name_attribute(),
            AttributeBuilder::new("ttl", AttributeType::Number)
                .description("BGP Time To Live. Omit to use device defaults.")
                .optional()
                .validator(NumberRangeValidator::between(1.0, u8::MAX as f64))
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
        attributes.extend(timer_attributes(1.0));
        attributes.extend([
            AttributeBuilder::new("ipv4_addressing_type", AttributeType::String)
                .description("One of `none`, `addressed` (or omit)")
                .optional()
                .validator(StringOneOfValidator::new(["none", "addressed"]))
                .build(),
            AttributeBuilder::new("ipv6_addressing_type", AttributeType::String)
                .description("One of `none`, `addressed`, `link_local` (or omit)")
                .optional()
                .validator(StringOneOfValidator::new(["none", "addressed", "link_local"]))
                .build(),
            AttributeBuilder::new("local_asn", AttributeType::Number)
                .description("This feature is configured on a per-peer basis. It allows a router to appear to be a member of a second autonomous system (AS) by prepending a local-as AS number, in addition to its real AS number, announced to its eBGP peer.")
                .optional()
                .validator(NumberRangeValidator::between(1.0, u32::MAX as f64))
                .build(),
            AttributeBuilder::new("neighbor_asn_dynamic", AttributeType::Bool)
                .description("Default behavior is `static`")
                .optional()
                .build(),
            AttributeBuilder::new("peer_from_loopback", AttributeType::Bool)
                .description("Enable to peer from loopback interface. Default behavior peers from physical interface.")
                .optional()
                .build(),
            AttributeBuilder::new("peer_to", AttributeType::String)
                .description("One of `loopback`, `interface_or_ip_endpoint`, `interface_or_shared_ip_endpoint` (or omit)")
                .optional()
                .validator(StringOneOfValidator::new([
                    "loopback",
                    "interface_or_ip_endpoint",
                    "interface_or_shared_ip_endpoint",
                ]))
                .build(),
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
            ipv4_addressing_type: values::string(config, &path("ipv4_addressing_type"))?,
            ipv6_addressing_type: values::string(config, &path("ipv6_addressing_type"))?,
            local_asn: values::integer(config, &path("local_asn"))?,
            neighbor_asn_dynamic: values::boolean(config, &path("neighbor_asn_dynamic"))?
                .unwrap_or(false),
            peer_from_loopback: values::boolean(config, &path("peer_from_loopback"))?
                .unwrap_or(false),
            peer_to: values::string(config, &path("peer_to"))?,
            child_primitives: values::strings(config, &path("child_primitives"))?,
        })
    }

    fn from_api(primitive: &ApiPrimitive) -> Result<Self, Diagnostic> {
        let PrimitiveAttributes::BgpOverSubinterfacesOrSvi(attributes) = &primitive.attributes
        else {
            return Err(wrong_attribute_type(Self::POLICY_TYPE, primitive));
        };
        Ok(Self {
            name: primitive.label.clone(),
            ttl: Some(attributes.ttl),
            bfd_enabled: attributes.bfd,
            password: attributes.password.clone(),
            keepalive_time: attributes.keepalive,
            hold_time: attributes.holdtime,
            ipv4_addressing_type: Some(attributes.session_addressing_ipv4.as_str().to_string()),
            ipv6_addressing_type: Some(attributes.session_addressing_ipv6.as_str().to_string()),
            local_asn: attributes.local_asn,
            neighbor_asn_dynamic: attributes.neighbor_asn_type == NeighborAsnType::Dynamic,
            peer_from_loopback: attributes.peer_from == PeerFrom::Loopback,
            peer_to: Some(attributes.peer_to.as_str().to_string()),
            child_primitives: api_primitives_to_json(&primitive.subpolicies)?,
        })
    }

    fn marshal(&self) -> Result<String, Diagnostic> {
        let mut child_primitives = self.child_primitives.clone();
        sort_child_primitives(&mut child_primitives);
        let none = || SessionAddressing::None.as_str().to_string();
        marshal(
            Self::KIND,
            Self::POLICY_TYPE,
            &self.name,
            &BgpPeeringGenericSystemPrototype {
                ipv4_afi_enabled: afi_enabled(&self.ipv4_addressing_type),
                ipv6_afi_enabled: afi_enabled(&self.ipv6_addressing_type),
                ttl: self.ttl.unwrap_or(0),
                bfd_enabled: self.bfd_enabled,
                password: self.password.clone(),
                keepalive_time: self.keepalive_time,
                hold_time: self.hold_time,
                ipv4_addressing_type: self.ipv4_addressing_type.clone().unwrap_or_else(none),
                ipv6_addressing_type: self.ipv6_addressing_type.clone().unwrap_or_else(none),
                local_asn: self.local_asn,
                neighbor_asn_dynamic: self.neighbor_asn_dynamic,
                peer_from_loopback: self.peer_from_loopback,
                peer_to: self
                    .peer_to
                    .clone()
                    .unwrap_or_else(|| PeerTo::InterfaceOrIpEndpoint.as_str().to_string()),
                child_primitives,
            },
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BgpPeeringGenericSystemPrototype {
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
    ipv4_addressing_type: String,
    ipv6_addressing_type: String,
    local_asn: Option<u32>,
    #[serde(default)]
    neighbor_asn_dynamic: bool,
    #[serde(default)]
    peer_from_loopback: bool,
    peer_to: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    child_primitives: Vec<String>,
}

impl Prototype for BgpPeeringGenericSystemPrototype {
    fn to_api(&self, label: &str, path: &AttributePath) -> Result<ApiPrimitive, Diagnostic> {
        let session_addressing_ipv4 = self
            .ipv4_addressing_type
            .parse::<SessionAddressing>()
            .map_err(|e| {
                Diagnostic::attribute_error(
                    path,
                    format!(
                        "failed parsing ipv4 addressing type {:?}",
                        self.ipv4_addressing_type
                    ),
                    e.to_string(),
                )
            })?;
        let session_addressing_ipv6 = self
            .ipv6_addressing_type
            .parse::<SessionAddressing>()
            .map_err(|e| {
                Diagnostic::attribute_error(
                    path,
                    format!(
                        "failed parsing ipv6 addressing type {:?}",
                        self.ipv6_addressing_type
                    ),
                    e.to_string(),
                )
            })?;
        let peer_to = self.peer_to.parse::<PeerTo>().map_err(|e| {
            Diagnostic::attribute_error(path, "failed parsing peer_to", e.to_string())
        })?;

        Ok(ApiPrimitive {
            id: None,
            label: label.to_string(),
            attributes: PrimitiveAttributes::BgpOverSubinterfacesOrSvi(
                AttachBgpOverSubinterfacesOrSvi {
                    bfd: self.bfd_enabled,
                    holdtime: self.hold_time,
                    ipv4_safi: self.ipv4_afi_enabled,
                    ipv6_safi: self.ipv6_afi_enabled,
                    keepalive: self.keepalive_time,
                    local_asn: self.local_asn,
                    neighbor_asn_type: NeighborAsnType::from_dynamic(self.neighbor_asn_dynamic),
                    password: self.password.clone(),
                    peer_from: if self.peer_from_loopback {
                        PeerFrom::Loopback
                    } else {
                        PeerFrom::Interface
                    },
                    peer_to,
                    session_addressing_ipv4,
                    session_addressing_ipv6,
                    ttl: self.ttl,
                },
            ),
            subpolicies: nested_primitives(&self.child_primitives, path)?,
        })
    }
}
