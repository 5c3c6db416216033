//! Routing Zone Constraint primitive

use super::{label_attribute, marshal, primitive_attribute, wrong_attribute_type, Primitive, Prototype};
use crate::api::connectivity_templates::{
    AttachRoutingZoneConstraint, Primitive as ApiPrimitive, PrimitiveAttributes,
};
use crate::values;
use serde::{Deserialize, Serialize};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringLengthValidator;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutingZoneConstraint {
    pub label: String,
    pub routing_zone_constraint_id: Option<String>,
}

impl Primitive for RoutingZoneConstraint {
    const POLICY_TYPE: &'static str = "AttachRoutingZoneConstraint";
    const DATA_SOURCE_TYPE: &'static str = "apstra_datacenter_ct_routing_zone_constraint";
    const KIND: &'static str = "RoutingZoneConstraint";
    const DESCRIPTION: &'static str = "This data source composes a Connectivity Template \
        Primitive as a JSON string, suitable for use in the `primitives` attribute of \
        an `apstra_datacenter_connectivity_template` resource.";

    fn attributes() -> Vec<Attribute> {
        vec![
            label_attribute(),
            AttributeBuilder::new("routing_zone_constraint_id", AttributeType::String)
                .description("Routing Zone Constraint ID to be applied")
                .required()
                .validator(StringLengthValidator::length_at_least(1))
                .build(),
            primitive_attribute(),
        ]
    }

    fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        Ok(Self {
            label: values::string(config, &AttributePath::new("label"))?.unwrap_or_default(),
            routing_zone_constraint_id: values::string(
                config,
                &AttributePath::new("routing_zone_constraint_id"),
            )?,
        })
    }

    fn from_api(primitive: &ApiPrimitive) -> Result<Self, Diagnostic> {
        let PrimitiveAttributes::RoutingZoneConstraint(attributes) = &primitive.attributes else {
            return Err(wrong_attribute_type(Self::POLICY_TYPE, primitive));
        };
        Ok(Self {
            label: primitive.label.clone(),
            routing_zone_constraint_id: attributes.routing_zone_constraint.clone(),
        })
    }

    fn marshal(&self) -> Result<String, Diagnostic> {
        marshal(
            Self::KIND,
            Self::POLICY_TYPE,
            &self.label,
            &RoutingZoneConstraintPrototype {
                routing_zone_constraint_id: self.routing_zone_constraint_id.clone(),
            },
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RoutingZoneConstraintPrototype {
    routing_zone_constraint_id: Option<String>,
}

impl Prototype for RoutingZoneConstraintPrototype {
    fn to_api(&self, label: &str, path: &AttributePath) -> Result<ApiPrimitive, Diagnostic> {
        let Some(id) = &self.routing_zone_constraint_id else {
            return Err(Diagnostic::attribute_error(
                path,
                "primitive rehydration failed",
                "routing zone constraint primitive has no routing_zone_constraint_id",
            ));
        };
        Ok(ApiPrimitive {
            id: None,
            label: label.to_string(),
            attributes: PrimitiveAttributes::RoutingZoneConstraint(AttachRoutingZoneConstraint {
                routing_zone_constraint: Some(id.clone()),
            }),
            subpolicies: Vec::new(),
        })
    }
}
