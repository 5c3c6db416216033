//! IP Link primitive, a logical link within a routing zone

use super::{
    api_primitives_to_json, child_primitives_attribute, label_attribute, marshal,
    nested_primitives, primitive_attribute, sort_child_primitives, wrong_attribute_type,
    Primitive, Prototype,
};
use crate::api::connectivity_templates::{
    AttachLogicalLink, InterfaceType, Ipv4AddressingType, Ipv6AddressingType,
    Primitive as ApiPrimitive, PrimitiveAttributes,
};
use crate::values;
use serde::{Deserialize, Serialize};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{NumberRangeValidator, StringLengthValidator, StringOneOfValidator};

pub const VLAN_MIN: u16 = 1;
pub const VLAN_MAX: u16 = 4094;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IpLink {
    pub label: String,
    pub routing_zone_id: String,
    /// Tagged link when set
    pub vlan_id: Option<u16>,
    pub ipv4_addressing_type: Option<String>,
    pub ipv6_addressing_type: Option<String>,
    pub child_primitives: Vec<String>,
}

impl Primitive for IpLink {
    const POLICY_TYPE: &'static str = "AttachLogicalLink";
    const DATA_SOURCE_TYPE: &'static str = "apstra_datacenter_ct_ip_link";
    const KIND: &'static str = "IpLink";
    const DESCRIPTION: &'static str = "This data source composes a Connectivity Template \
        Primitive as a JSON string, suitable for use in the `primitives` attribute of \
        an `apstra_datacenter_connectivity_template` resource or the `child_primitives` \
        attribute of a Different Connectivity Template Primitive.";

    fn attributes() -> Vec<Attribute> {
        vec![
            label_attribute(),
            AttributeBuilder::new("routing_zone_id", AttributeType::String)
                .description("Apstra Object ID of the Routing Zone to which this IP Link should belong.")
                .required()
                .validator(StringLengthValidator::length_at_least(1))
                .build(),
            AttributeBuilder::new("vlan_id", AttributeType::Number)
                .description("When set, selects the 802.1Q VLAN ID to use for the link's traffic. Omit for an untagged link.")
                .optional()
                .validator(NumberRangeValidator::between(VLAN_MIN as f64, VLAN_MAX as f64))
                .build(),
            AttributeBuilder::new("ipv4_addressing_type", AttributeType::String)
                .description("One of `none`, `numbered`, or omit.")
                .optional()
                .validator(StringOneOfValidator::new(["none", "numbered"]))
                .build(),
            AttributeBuilder::new("ipv6_addressing_type", AttributeType::String)
                .description("One of `link_local`, `numbered`, `none`, or omit.")
                .optional()
                .validator(StringOneOfValidator::new(["link_local", "numbered", "none"]))
                .build(),
            primitive_attribute(),
            child_primitives_attribute(),
        ]
    }

    fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        Ok(Self {
            label: values::string(config, &AttributePath::new("label"))?.unwrap_or_default(),
            routing_zone_id: values::string(config, &AttributePath::new("routing_zone_id"))?
                .unwrap_or_default(),
            vlan_id: values::integer(config, &AttributePath::new("vlan_id"))?,
            ipv4_addressing_type: values::string(
                config,
                &AttributePath::new("ipv4_addressing_type"),
            )?,
            ipv6_addressing_type: values::string(
                config,
                &AttributePath::new("ipv6_addressing_type"),
            )?,
            child_primitives: values::strings(config, &AttributePath::new("child_primitives"))?,
        })
    }

    fn from_api(primitive: &ApiPrimitive) -> Result<Self, Diagnostic> {
        let PrimitiveAttributes::LogicalLink(attributes) = &primitive.attributes else {
            return Err(wrong_attribute_type(Self::POLICY_TYPE, primitive));
        };
        Ok(Self {
            label: primitive.label.clone(),
            routing_zone_id: attributes.security_zone.clone().unwrap_or_default(),
            vlan_id: attributes.vlan_id,
            ipv4_addressing_type: Some(attributes.ipv4_addressing_type.as_str().to_string()),
            ipv6_addressing_type: Some(attributes.ipv6_addressing_type.as_str().to_string()),
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
            &IpLinkPrototype {
                routing_zone_id: self.routing_zone_id.clone(),
                tagged: self.vlan_id.is_some(),
                vlan_id: self.vlan_id,
                ipv4_addressing_type: self
                    .ipv4_addressing_type
                    .clone()
                    .unwrap_or_else(|| Ipv4AddressingType::None.as_str().to_string()),
                ipv6_addressing_type: self
                    .ipv6_addressing_type
                    .clone()
                    .unwrap_or_else(|| Ipv6AddressingType::None.as_str().to_string()),
                child_primitives,
            },
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct IpLinkPrototype {
    routing_zone_id: String,
    #[serde(default)]
    tagged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vlan_id: Option<u16>,
    ipv4_addressing_type: String,
    ipv6_addressing_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    child_primitives: Vec<String>,
}

impl Prototype for IpLinkPrototype {
    fn to_api(&self, label: &str, path: &AttributePath) -> Result<ApiPrimitive, Diagnostic> {
        let ipv4_addressing_type = self.ipv4_addressing_type.parse::<Ipv4AddressingType>().map_err(|e| {
            Diagnostic::attribute_error(
                path,
                format!(
                    "failed parsing ipv4 addressing type {:?}",
                    self.ipv4_addressing_type
                ),
                e.to_string(),
            )
        })?;
        let ipv6_addressing_type = self.ipv6_addressing_type.parse::<Ipv6AddressingType>().map_err(|e| {
            Diagnostic::attribute_error(
                path,
                format!(
                    "failed parsing ipv6 addressing type {:?}",
                    self.ipv6_addressing_type
                ),
                e.to_string(),
            )
        })?;

        Ok(ApiPrimitive {
            id: None,
            label: label.to_string(),
            attributes: PrimitiveAttributes::LogicalLink(AttachLogicalLink {
                security_zone: Some(self.routing_zone_id.clone()),
                interface_type: if self.tagged {
                    InterfaceType::Tagged
                } else {
                    InterfaceType::Untagged
                },
                vlan_id: self.vlan_id,
                ipv4_addressing_type,
                ipv6_addressing_type,
            }),
            subpolicies: nested_primitives(&self.child_primitives, path)?,
        })
    }
}
