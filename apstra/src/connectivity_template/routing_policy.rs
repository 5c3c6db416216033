//! Routing Policy primitive, attaching an existing routing policy

use super::{label_attribute, marshal, primitive_attribute, wrong_attribute_type, Primitive, Prototype};
use crate::api::connectivity_templates::{
    AttachExistingRoutingPolicy, Primitive as ApiPrimitive, PrimitiveAttributes,
};
use crate::values;
use serde::{Deserialize, Serialize};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringLengthValidator;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutingPolicy {
    pub label: String,
    pub routing_policy_id: Option<String>,
}

impl Primitive for RoutingPolicy {
    const POLICY_TYPE: &'static str = "AttachExistingRoutingPolicy";
    const DATA_SOURCE_TYPE: &'static str = "apstra_datacenter_ct_routing_policy";
    const KIND: &'static str = "RoutingPolicy";
    const DESCRIPTION: &'static str = "This data source composes a Connectivity Template \
        Primitive as a JSON string, suitable for use in the `child_primitives` attribute \
        of a BGP peering Connectivity Template Primitive.";

    fn attributes() -> Vec<Attribute> {
        vec![
            label_attribute(),
            AttributeBuilder::new("routing_policy_id", AttributeType::String)
                .description("Routing Policy ID to be applied")
                .required()
                .validator(StringLengthValidator::length_at_least(1))
                .build(),
            primitive_attribute(),
        ]
    }

    fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        Ok(Self {
            label: values::string(config, &AttributePath::new("label"))?.unwrap_or_default(),
            routing_policy_id: values::string(config, &AttributePath::new("routing_policy_id"))?,
        })
    }

    fn from_api(primitive: &ApiPrimitive) -> Result<Self, Diagnostic> {
        let PrimitiveAttributes::ExistingRoutingPolicy(attributes) = &primitive.attributes else {
            return Err(wrong_attribute_type(Self::POLICY_TYPE, primitive));
        };
        Ok(Self {
            label: primitive.label.clone(),
            routing_policy_id: attributes.rp_to_attach.clone(),
        })
    }

    fn marshal(&self) -> Result<String, Diagnostic> {
        marshal(
            Self::KIND,
            Self::POLICY_TYPE,
            &self.label,
            &RoutingPolicyPrototype {
                routing_policy_id: self.routing_policy_id.clone(),
            },
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RoutingPolicyPrototype {
    routing_policy_id: Option<String>,
}

impl Prototype for RoutingPolicyPrototype {
    fn to_api(&self, label: &str, path: &AttributePath) -> Result<ApiPrimitive, Diagnostic> {
        let Some(routing_policy_id) = &self.routing_policy_id else {
            return Err(Diagnostic::attribute_error(
                path,
                "primitive rehydration failed",
                "routing policy primitive has no routing_policy_id",
            ));
        };
        Ok(ApiPrimitive {
            id: None,
            label: label.to_string(),
            attributes: PrimitiveAttributes::ExistingRoutingPolicy(AttachExistingRoutingPolicy {
                rp_to_attach: Some(routing_policy_id.clone()),
            }),
            subpolicies: Vec::new(),
        })
    }
}
