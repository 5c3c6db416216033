//! Static Route primitive

use super::{label_attribute, marshal, primitive_attribute, wrong_attribute_type, Primitive, Prototype};
use crate::api::connectivity_templates::{
    AttachStaticRoute, Primitive as ApiPrimitive, PrimitiveAttributes,
};
use crate::validators::ParseCidr;
use crate::values;
use serde::{Deserialize, Serialize};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StaticRoute {
    pub label: String,
    pub network: Option<String>,
    pub share_ip_endpoint: bool,
}

impl Primitive for StaticRoute {
    const POLICY_TYPE: &'static str = "AttachStaticRoute";
    const DATA_SOURCE_TYPE: &'static str = "apstra_datacenter_ct_static_route";
    const KIND: &'static str = "StaticRoute";
    const DESCRIPTION: &'static str = "This data source composes a Connectivity Template \
        Primitive as a JSON string, suitable for use in the `child_primitives` attribute \
        of an IP Link Connectivity Template Primitive.";

    fn attributes() -> Vec<Attribute> {
        vec![
            label_attribute(),
            AttributeBuilder::new("network", AttributeType::String)
                .description("Destination network in CIDR notation")
                .required()
                .validator(ParseCidr::new(false, false))
                .build(),
            AttributeBuilder::new("share_ip_endpoint", AttributeType::Bool)
                .description("Indicates whether the next-hop IP address is shared across multiple remote systems. Default: `false`")
                .optional()
                .build(),
            primitive_attribute(),
        ]
    }

    fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        Ok(Self {
            label: values::string(config, &AttributePath::new("label"))?.unwrap_or_default(),
            network: values::string(config, &AttributePath::new("network"))?,
            share_ip_endpoint: values::boolean(config, &AttributePath::new("share_ip_endpoint"))?
                .unwrap_or(false),
        })
    }

    fn from_api(primitive: &ApiPrimitive) -> Result<Self, Diagnostic> {
        let PrimitiveAttributes::StaticRoute(attributes) = &primitive.attributes else {
            return Err(wrong_attribute_type(Self::POLICY_TYPE, primitive));
        };
        Ok(Self {
            label: primitive.label.clone(),
            network: attributes.network.clone(),
            share_ip_endpoint: attributes.share_ip_endpoint,
        })
    }

    fn marshal(&self) -> Result<String, Diagnostic> {
        marshal(
            Self::KIND,
            Self::POLICY_TYPE,
            &self.label,
            &StaticRoutePrototype {
                network: self.network.clone(),
                share_ip_endpoint: self.share_ip_endpoint,
            },
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StaticRoutePrototype {
    network: Option<String>,
    #[serde(default)]
    share_ip_endpoint: bool,
}

impl Prototype for StaticRoutePrototype {
    fn to_api(&self, label: &str, _path: &AttributePath) -> Result<ApiPrimitive, Diagnostic> {
        Ok(ApiPrimitive {
            id: None,
            label: label.to_string(),
            attributes: PrimitiveAttributes::StaticRoute(AttachStaticRoute {
                network: self.network.clone(),
                share_ip_endpoint: self.share_ip_endpoint,
            }),
            subpolicies: Vec::new(),
        })
    }
}
