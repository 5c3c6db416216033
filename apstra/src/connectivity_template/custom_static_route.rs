//! Custom Static Route primitive: a route with an explicit next hop in a
//! routing zone

use super::{marshal, primitive_attribute, wrong_attribute_type, Primitive, Prototype};
use crate::api::connectivity_templates::{
    AttachCustomStaticRoute, Primitive as ApiPrimitive, PrimitiveAttributes,
};
use crate::validators::{ParseCidr, ParseIp};
use crate::values;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringLengthValidator;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomStaticRoute {
    pub routing_zone_id: Option<String>,
    pub network: Option<String>,
    pub next_hop: Option<String>,
}

impl Primitive for CustomStaticRoute {
    const POLICY_TYPE: &'static str = "AttachCustomStaticRoute";
    const DATA_SOURCE_TYPE: &'static str = "apstra_datacenter_ct_custom_static_route";
    const KIND: &'static str = "CustomStaticRoute";
    const DESCRIPTION: &'static str = "This data source composes a Connectivity Template \
        Primitive as a JSON string, suitable for use in the `child_primitives` attribute \
        of an IP Link Connectivity Template Primitive.";

    fn attributes() -> Vec<Attribute> {
        vec![
            AttributeBuilder::new("routing_zone_id", AttributeType::String)
                .description("Apstra Object ID of the Routing Zone in which the route is installed.")
                .required()
                .validator(StringLengthValidator::length_at_least(1))
                .build(),
            AttributeBuilder::new("network", AttributeType::String)
                .description("Destination network in CIDR notation")
                .required()
                .validator(ParseCidr::new(false, false))
                .build(),
            AttributeBuilder::new("next_hop", AttributeType::String)
                .description("Next-hop router IP address")
                .required()
                .validator(ParseIp::new(false, false))
                .build(),
            primitive_attribute(),
        ]
    }

    fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        Ok(Self {
            routing_zone_id: values::string(config, &AttributePath::new("routing_zone_id"))?,
            network: values::string(config, &AttributePath::new("network"))?,
            next_hop: values::string(config, &AttributePath::new("next_hop"))?,
        })
    }

    fn from_api(primitive: &ApiPrimitive) -> Result<Self, Diagnostic> {
        let PrimitiveAttributes::CustomStaticRoute(attributes) = &primitive.attributes else {
            return Err(wrong_attribute_type(Self::POLICY_TYPE, primitive));
        };
        Ok(Self {
            routing_zone_id: attributes.vrf_node_id.clone(),
            network: attributes.network.clone(),
            next_hop: attributes.next_hop.clone(),
        })
    }

    fn marshal(&self) -> Result<String, Diagnostic> {
        marshal(
            Self::KIND,
            Self::POLICY_TYPE,
            "",
            &CustomStaticRoutePrototype {
                routing_zone_id: self.routing_zone_id.clone(),
                network: self.network.clone(),
                next_hop_ip_address: self.next_hop.clone(),
            },
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CustomStaticRoutePrototype {
    routing_zone_id: Option<String>,
    network: Option<String>,
    next_hop_ip_address: Option<String>,
}

impl Prototype for CustomStaticRoutePrototype {
    fn to_api(&self, label: &str, path: &AttributePath) -> Result<ApiPrimitive, Diagnostic> {
        // the API stores the masked network
        let network = match &self.network {
            Some(network) => Some(
                network
                    .parse::<IpNet>()
                    .map_err(|e| {
                        Diagnostic::attribute_error(
                            path,
                            format!("failed parsing network CIDR string {:?}", network),
                            e.to_string(),
                        )
                    })?
                    .trunc()
                    .to_string(),
            ),
            None => None,
        };

        let next_hop = match &self.next_hop_ip_address {
            Some(next_hop) => Some(
                next_hop
                    .parse::<IpAddr>()
                    .map_err(|e| {
                        Diagnostic::attribute_error(
                            path,
                            format!("failed parsing next hop IP address string {:?}", next_hop),
                            e.to_string(),
                        )
                    })?
                    .to_string(),
            ),
            None => None,
        };

        Ok(ApiPrimitive {
            id: None,
            label: label.to_string(),
            attributes: PrimitiveAttributes::CustomStaticRoute(AttachCustomStaticRoute {
                vrf_node_id: self.routing_zone_id.clone(),
                network,
                next_hop,
            }),
            subpolicies: Vec::new(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::connectivity_template::child_primitives_from_json;

    #[test]
    fn network_is_masked_for_the_api() {
        let route = CustomStaticRoute {
            routing_zone_id: Some("rz-1".to_string()),
            network: Some("10.1.1.7/24".to_string()),
            next_hop: Some("10.1.1.1".to_string()),
        };
        let parsed = child_primitives_from_json(
            &[route.marshal().unwrap()],
            &AttributePath::new("child_primitives"),
        )
        .unwrap();
        assert_eq!(
            parsed[0].attributes,
            PrimitiveAttributes::CustomStaticRoute(AttachCustomStaticRoute {
                vrf_node_id: Some("rz-1".to_string()),
                network: Some("10.1.1.0/24".to_string()),
                next_hop: Some("10.1.1.1".to_string()),
            })
        );
    }

    #[test]
    fn bad_next_hop_is_reported() {
        let json = r#"{"type":"AttachCustomStaticRoute","label":"","data":{"routing_zone_id":"rz","network":null,"next_hop_ip_address":"10.1.1"}}"#;
        let err = child_primitives_from_json(&[json.to_string()], &AttributePath::new("p"))
            .unwrap_err();
        assert_eq!(
            err.summary,
            "failed parsing next hop IP address string \"10.1.1\""
        );
        assert_eq!(err.attribute, Some(AttributePath::new("p").index(0)));
    }
}
