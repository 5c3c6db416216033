//! Virtual Network (Single) primitive

use super::{
    api_primitives_to_json, child_primitives_attribute, label_attribute, marshal,
    nested_primitives, primitive_attribute, sort_child_primitives, wrong_attribute_type,
    Primitive, Prototype,
};
use crate::api::connectivity_templates::{
    AttachSingleVlan, Primitive as ApiPrimitive, PrimitiveAttributes, VlanTagging,
};
use crate::values;
use serde::{Deserialize, Serialize};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringLengthValidator;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VnSingle {
    pub label: String,
    pub vn_id: String,
    pub tagged: bool,
    pub child_primitives: Vec<String>,
}

impl Primitive for VnSingle {
    const POLICY_TYPE: &'static str = "AttachSingleVLAN";
    const DATA_SOURCE_TYPE: &'static str = "apstra_datacenter_ct_virtual_network_single";
    const KIND: &'static str = "VnSingle";
    const DESCRIPTION: &'static str = "This data source composes a Connectivity Template \
        Primitive as a JSON string, suitable for use in the `primitives` attribute of \
        an `apstra_datacenter_connectivity_template` resource or the `child_primitives` \
        attribute of a Different Connectivity Template Primitive.";

    fn attributes() -> Vec<Attribute> {
        vec![
            label_attribute(),
            AttributeBuilder::new("vn_id", AttributeType::String)
                .description("Virtual Network ID")
                .required()
                .validator(StringLengthValidator::length_at_least(1))
                .build(),
            AttributeBuilder::new("tagged", AttributeType::Bool)
                .description("Indicates whether the selected interfaces should join the VN with 802.1Q tags. Default: `false`")
                .optional()
                .build(),
            primitive_attribute(),
            child_primitives_attribute(),
        ]
    }

    fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic> {
        Ok(Self {
            label: values::string(config, &AttributePath::new("label"))?.unwrap_or_default(),
            vn_id: values::string(config, &AttributePath::new("vn_id"))?.unwrap_or_default(),
            tagged: values::boolean(config, &AttributePath::new("tagged"))?.unwrap_or(false),
            child_primitives: values::strings(config, &AttributePath::new("child_primitives"))?,
        })
    }

    fn from_api(primitive: &ApiPrimitive) -> Result<Self, Diagnostic> {
        let PrimitiveAttributes::SingleVlan(attributes) = &primitive.attributes else {
            return Err(wrong_attribute_type(Self::POLICY_TYPE, primitive));
        };
        Ok(Self {
            label: primitive.label.clone(),
            vn_id: attributes.vn_node_id.clone().unwrap_or_default(),
            tagged: attributes.tag_type == VlanTagging::VlanTagged,
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
            &VnSinglePrototype {
                vn_id: self.vn_id.clone(),
                tagged: self.tagged,
                child_primitives,
            },
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct VnSinglePrototype {
    vn_id: String,
    #[serde(default)]
    tagged: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    child_primitives: Vec<String>,
}

impl Prototype for VnSinglePrototype {
    fn to_api(&self, label: &str, path: &AttributePath) -> Result<ApiPrimitive, Diagnostic> {
        Ok(ApiPrimitive {
            id: None,
            label: label.to_string(),
            attributes: PrimitiveAttributes::SingleVlan(AttachSingleVlan {
                vn_node_id: Some(self.vn_id.clone()),
                tag_type: VlanTagging::from_tagged(self.tagged),
            }),
            subpolicies: nested_primitives(&self.child_primitives, path)?,
        })
    }
}
