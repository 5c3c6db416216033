//! Virtual Network (Multiple) primitive

use super::{marshal, primitive_attribute, wrong_attribute_type, Primitive, Prototype};
use crate::api::connectivity_templates::{
    AttachMultipleVlan, Primitive as ApiPrimitive, PrimitiveAttributes,
};
use crate::validators::DifferentFromValues;
use crate::values;
use serde::{Deserialize, Serialize};
use tfplug::path::PathExpression;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{SizeValidator, StringLengthValidator};

/// Untagged and tagged virtual networks on the same interfaces. This
/// primitive has no label and no children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VnMultiple {
    pub untagged_vn_id: Option<String>,
    pub tagged_vn_ids: Vec<String>,
}

impl Primitive for VnMultiple {
    const POLICY_TYPE: &'static str = "AttachMultipleVLAN";
    const DATA_SOURCE_TYPE: &'static str = "apstra_datacenter_ct_virtual_network_multiple";
    const KIND: &'static str = "VnMultiple";
    const DESCRIPTION: &'static str = "This data source composes a Connectivity Template \
        Primitive as a JSON string, suitable for use in the `primitives` attribute of \
        an `apstra_datacenter_connectivity_template` resource or the `child_primitives` \
        attribute of a Different Connectivity Template Primitive.";

    fn attributes() -> Vec<Attribute> {
        vec![
            AttributeBuilder::new("untagged_vn_id", AttributeType::String)
                .description("Virtual Network ID which should be presented without VLAN tags")
                .optional()
                .validator(StringLengthValidator::length_at_least(1))
                .validator(DifferentFromValues::new(vec![PathExpression::match_root(
                    "tagged_vn_ids",
                )]))
                .build(),
            AttributeBuilder::new(
                "tagged_vn_ids",
                AttributeType::Set(Box::new(AttributeType::String)),
            )
            .description("Virtual Network IDs which should be presented with VLAN tags")
            .optional()
            .validator(SizeValidator::size_at_least(1))
            .build(),
            primitive_attribute(),
        ]
    }

    fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        let mut tagged_vn_ids = values::strings(config, &AttributePath::new("tagged_vn_ids"))?;
        tagged_vn_ids.sort();
        Ok(Self {
            untagged_vn_id: values::string(config, &AttributePath::new("untagged_vn_id"))?,
            tagged_vn_ids,
        })
    }

    fn from_api(primitive: &ApiPrimitive) -> Result<Self, Diagnostic> {
        let PrimitiveAttributes::MultipleVlan(attributes) = &primitive.attributes else {
            return Err(wrong_attribute_type(Self::POLICY_TYPE, primitive));
        };
        let mut tagged_vn_ids = attributes.tagged_vn_node_ids.clone();
        tagged_vn_ids.sort();
        Ok(Self {
            untagged_vn_id: attributes.untagged_vn_node_id.clone(),
            tagged_vn_ids,
        })
    }

    fn marshal(&self) -> Result<String, Diagnostic> {
        marshal(
            Self::KIND,
            Self::POLICY_TYPE,
            "",
            &VnMultiplePrototype {
                untagged_vn_id: self.untagged_vn_id.clone(),
                tagged_vn_ids: self.tagged_vn_ids.clone(),
            },
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct VnMultiplePrototype {
    untagged_vn_id: Option<String>,
    // an empty list, never null
    #[serde(default)]
    tagged_vn_ids: Vec<String>,
}

impl Prototype for VnMultiplePrototype {
    fn to_api(&self, label: &str, _path: &AttributePath) -> Result<ApiPrimitive, Diagnostic> {
        Ok(ApiPrimitive {
            id: None,
            label: label.to_string(),
            attributes: PrimitiveAttributes::MultipleVlan(AttachMultipleVlan {
                untagged_vn_node_id: self.untagged_vn_id.clone(),
                tagged_vn_node_ids: self.tagged_vn_ids.clone(),
            }),
            subpolicies: Vec::new(),
        })
    }
}
