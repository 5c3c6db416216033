//! Connectivity template primitives
//!
//! A primitive lives in two shapes. In Terraform configuration it is a JSON
//! envelope string (`{"type", "label", "data"}`) rendered by the primitive's
//! data source; nested primitives are envelope strings embedded in the
//! parent's `data.child_primitives`. In the blueprint it is the API model of
//! [`crate::api::connectivity_templates`]. Everything here converts between
//! the two so that a template read back from the API renders to exactly the
//! strings the configuration holds.

pub mod bgp_peering_generic_system;
pub mod bgp_peering_ip_endpoint;
pub mod custom_static_route;
pub mod dynamic_bgp_peering;
pub mod ip_link;
pub mod routing_policy;
pub mod routing_zone_constraint;
pub mod static_route;
pub mod vn_multiple;
pub mod vn_single;

pub use bgp_peering_generic_system::BgpPeeringGenericSystem;
pub use bgp_peering_ip_endpoint::BgpPeeringIpEndpoint;
pub use custom_static_route::CustomStaticRoute;
pub use dynamic_bgp_peering::DynamicBgpPeering;
pub use ip_link::IpLink;
pub use routing_policy::RoutingPolicy;
pub use routing_zone_constraint::RoutingZoneConstraint;
pub use static_route::StaticRoute;
pub use vn_multiple::VnMultiple;
pub use vn_single::VnSingle;

use crate::api::connectivity_templates::{Primitive as ApiPrimitive, PrimitiveAttributes};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::cmp::Reverse;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::SizeValidator;

/// The JSON document a primitive data source renders into `primitive`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveEnvelope {
    #[serde(rename = "type")]
    pub primitive_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub data: Value,
}

/// A primitive as configured through its data source
pub trait Primitive: Sized + Send + Sync + 'static {
    /// Policy type name written to the envelope
    const POLICY_TYPE: &'static str;
    const DATA_SOURCE_TYPE: &'static str;
    /// Short name used in marshaling errors
    const KIND: &'static str;
    const DESCRIPTION: &'static str;

    /// Data source schema attributes, `primitive` included
    fn attributes() -> Vec<Attribute>;

    fn from_config(config: &DynamicValue) -> Result<Self, Diagnostic>;

    fn from_api(primitive: &ApiPrimitive) -> Result<Self, Diagnostic>;

    /// Renders the envelope string
    fn marshal(&self) -> Result<String, Diagnostic>;
}

/// Envelope payload of one primitive type
pub trait Prototype {
    fn to_api(&self, label: &str, path: &AttributePath) -> Result<ApiPrimitive, Diagnostic>;
}

/// Wraps `data` in an envelope. Callers sort their children with
/// [`sort_child_primitives`] first.
pub fn marshal<T: Serialize>(
    kind: &str,
    policy_type: &str,
    label: &str,
    data: &T,
) -> Result<String, Diagnostic> {
    let data = serde_json::to_value(data).map_err(|e| {
        Diagnostic::error(
            format!("failed marshaling {} primitive data", kind),
            e.to_string(),
        )
    })?;
    serde_json::to_string(&PrimitiveEnvelope {
        primitive_type: policy_type.to_string(),
        label: label.to_string(),
        data,
    })
    .map_err(|e| Diagnostic::error("failed marshaling primitive", e.to_string()))
}

/// Orders child envelopes by the SHA-1 digest of their text, highest first,
/// so equal sets of children always marshal identically
pub fn sort_child_primitives(children: &mut [String]) {
    children.sort_by_cached_key(|child| Reverse(Sha1::digest(child.as_bytes()).to_vec()));
}

fn prototype<P>(data: &Value, path: &AttributePath) -> Result<Box<dyn Prototype>, Diagnostic>
where
    P: Prototype + DeserializeOwned + 'static,
{
    P::deserialize(data)
        .map(|p| Box::new(p) as Box<dyn Prototype>)
        .map_err(|e| {
            Diagnostic::attribute_error(path, "primitive rehydration failed", e.to_string())
        })
}

/// Decodes the envelope payload into the prototype its `type` names
pub fn rehydrate(
    envelope: &PrimitiveEnvelope,
    path: &AttributePath,
) -> Result<Box<dyn Prototype>, Diagnostic> {
    let data = &envelope.data;
    match envelope.primitive_type.as_str() {
        "" => Err(Diagnostic::attribute_error(
            path,
            "failed parsing primitive type string \"\"",
            "primitive type must not be empty",
        )),
        "AttachSingleVLAN" => prototype::<vn_single::VnSinglePrototype>(data, path),
        "AttachMultipleVLAN" => prototype::<vn_multiple::VnMultiplePrototype>(data, path),
        "AttachLogicalLink" => prototype::<ip_link::IpLinkPrototype>(data, path),
        "AttachStaticRoute" => prototype::<static_route::StaticRoutePrototype>(data, path),
        "AttachCustomStaticRoute" => {
            prototype::<custom_static_route::CustomStaticRoutePrototype>(data, path)
        }
        "AttachIpEndpointWithBgpNsxt" => {
            prototype::<bgp_peering_ip_endpoint::BgpPeeringIpEndpointPrototype>(data, path)
        }
        "AttachBgpOverSubinterfacesOrSvi" => {
            prototype::<bgp_peering_generic_system::BgpPeeringGenericSystemPrototype>(data, path)
        }
        "AttachBgpWithPrefixPeeringForSviOrSubinterface" => {
            prototype::<dynamic_bgp_peering::DynamicBgpPeeringPrototype>(data, path)
        }
        "AttachExistingRoutingPolicy" => {
            prototype::<routing_policy::RoutingPolicyPrototype>(data, path)
        }
        "AttachRoutingZoneConstraint" => {
            prototype::<routing_zone_constraint::RoutingZoneConstraintPrototype>(data, path)
        }
        other => Err(Diagnostic::attribute_error(
            path,
            "primitive rehydration failed",
            format!("unhandled primitive type {:?}", other),
        )),
    }
}

fn parse_primitive(raw: &str, path: &AttributePath) -> Result<ApiPrimitive, Diagnostic> {
    let envelope: PrimitiveEnvelope = serde_json::from_str(raw).map_err(|e| {
        Diagnostic::attribute_error(path, "failed to unmarshal primitive", e.to_string())
    })?;
    rehydrate(&envelope, path)?.to_api(&envelope.label, path)
}

/// API primitives for the envelope strings configured at `path`; a failure
/// is reported at the offending element
pub fn child_primitives_from_json(
    primitives: &[String],
    path: &AttributePath,
) -> Result<Vec<ApiPrimitive>, Diagnostic> {
    primitives
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_primitive(raw, &path.clone().index(i as i64)))
        .collect()
}

/// Children embedded in a prototype; failures are reported at the parent
pub(crate) fn nested_primitives(
    children: &[String],
    path: &AttributePath,
) -> Result<Vec<ApiPrimitive>, Diagnostic> {
    children
        .iter()
        .map(|raw| parse_primitive(raw, path))
        .collect()
}

/// Envelope string of an API primitive and everything below it
pub fn primitive_from_api(primitive: &ApiPrimitive) -> Result<String, Diagnostic> {
    match &primitive.attributes {
        PrimitiveAttributes::SingleVlan(_) => VnSingle::from_api(primitive)?.marshal(),
        PrimitiveAttributes::MultipleVlan(_) => VnMultiple::from_api(primitive)?.marshal(),
        PrimitiveAttributes::LogicalLink(_) => IpLink::from_api(primitive)?.marshal(),
        PrimitiveAttributes::StaticRoute(_) => StaticRoute::from_api(primitive)?.marshal(),
        PrimitiveAttributes::CustomStaticRoute(_) => {
            CustomStaticRoute::from_api(primitive)?.marshal()
        }
        PrimitiveAttributes::IpEndpointWithBgpNsxt(_) => {
            BgpPeeringIpEndpoint::from_api(primitive)?.marshal()
        }
        PrimitiveAttributes::BgpOverSubinterfacesOrSvi(_) => {
            BgpPeeringGenericSystem::from_api(primitive)?.marshal()
        }
        PrimitiveAttributes::BgpWithPrefixPeering(_) => {
            DynamicBgpPeering::from_api(primitive)?.marshal()
        }
        PrimitiveAttributes::ExistingRoutingPolicy(_) => {
            RoutingPolicy::from_api(primitive)?.marshal()
        }
        PrimitiveAttributes::RoutingZoneConstraint(_) => {
            RoutingZoneConstraint::from_api(primitive)?.marshal()
        }
    }
}

pub fn api_primitives_to_json(primitives: &[ApiPrimitive]) -> Result<Vec<String>, Diagnostic> {
    primitives.iter().map(primitive_from_api).collect()
}

pub(crate) fn wrong_attribute_type(expected: &str, primitive: &ApiPrimitive) -> Diagnostic {
    Diagnostic::error(
        "failed loading API primitive due to wrong attribute type",
        format!(
            "expected {} attributes, got {}",
            expected,
            primitive.attributes.policy_type_name()
        ),
    )
}

pub(crate) fn label_attribute() -> Attribute {
    AttributeBuilder::new("label", AttributeType::String)
        .description("Label used by the web UI on the Primitive \"block\" in the Connectivity Template.")
        .optional()
        .build()
}

/// BGP primitives call their label `name`
pub(crate) fn name_attribute() -> Attribute {
    AttributeBuilder::new("name", AttributeType::String)
        .description("Label used on the Primitive \"block\" in the Connectivity Template.")
        .optional()
        .build()
}

pub(crate) fn primitive_attribute() -> Attribute {
    AttributeBuilder::new("primitive", AttributeType::String)
        .description(
            "JSON output for use in the `primitives` field of an \
             `apstra_datacenter_connectivity_template` resource or a different \
             Connectivity Template Primitive data source",
        )
        .computed()
        .build()
}

pub(crate) fn child_primitives_attribute() -> Attribute {
    AttributeBuilder::new(
        "child_primitives",
        AttributeType::Set(Box::new(AttributeType::String)),
    )
    .description(
        "Set of JSON strings describing Connectivity Template Primitives which are \
         children of this Connectivity Template Primitive. Use the `primitive` attribute \
         of other Connectivity Template Primitive data sources here.",
    )
    .optional()
    .validator(SizeValidator::size_at_least(1))
    .build()
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::connectivity_templates::{AttachStaticRoute, VlanTagging};
    use tfplug::types::Dynamic;

    fn static_route(network: &str) -> String {
        StaticRoute {
            label: String::new(),
            network: Some(network.to_string()),
            share_ip_endpoint: false,
        }
        .marshal()
        .unwrap()
    }

    #[test]
    fn envelope_carries_type_and_label() {
        let json = VnSingle {
            label: "vn".to_string(),
            vn_id: "vn-1".to_string(),
            tagged: true,
            child_primitives: vec![],
        }
        .marshal()
        .unwrap();
        let envelope: PrimitiveEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(envelope.primitive_type, "AttachSingleVLAN");
        assert_eq!(envelope.label, "vn");
        assert_eq!(envelope.data["vn_id"], "vn-1");
        assert_eq!(envelope.data["tagged"], true);
        assert!(envelope.data.get("child_primitives").is_none());
    }

    #[test]
    fn children_sort_by_descending_digest() {
        let mut children = vec![
            static_route("10.0.0.0/8"),
            static_route("0.0.0.0/0"),
            static_route("192.168.0.0/16"),
        ];
        sort_child_primitives(&mut children);
        let digests: Vec<Vec<u8>> = children
            .iter()
            .map(|c| Sha1::digest(c.as_bytes()).to_vec())
            .collect();
        assert!(digests.windows(2).all(|w| w[0] >= w[1]));

        // order of the input set does not matter
        let mut reversed: Vec<String> = children.iter().rev().cloned().collect();
        sort_child_primitives(&mut reversed);
        assert_eq!(reversed, children);
    }

    #[test]
    fn unknown_type_fails_rehydration() {
        let envelope = PrimitiveEnvelope {
            primitive_type: "AttachSomethingElse".to_string(),
            label: String::new(),
            data: Value::Null,
        };
        let err = rehydrate(&envelope, &AttributePath::new("primitives"))
            .err()
            .unwrap();
        assert_eq!(err.summary, "primitive rehydration failed");
        assert_eq!(err.detail, "unhandled primitive type \"AttachSomethingElse\"");
    }

    #[test]
    fn bad_element_is_reported_at_its_index() {
        let primitives = vec![static_route("0.0.0.0/0"), "{not json".to_string()];
        let err = child_primitives_from_json(&primitives, &AttributePath::new("primitives"))
            .unwrap_err();
        assert_eq!(
            err.attribute,
            Some(AttributePath::new("primitives").index(1))
        );
        assert_eq!(err.summary, "failed to unmarshal primitive");
    }

    #[test]
    fn nested_primitives_reach_the_api_model() {
        let route = static_route("0.0.0.0/0");
        let link = IpLink {
            label: "link".to_string(),
            routing_zone_id: "rz-1".to_string(),
            vlan_id: Some(10),
            ipv4_addressing_type: None,
            ipv6_addressing_type: None,
            child_primitives: vec![route],
        }
        .marshal()
        .unwrap();

        let parsed = child_primitives_from_json(&[link.clone()], &AttributePath::new("primitives"))
            .unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].label, "link");
        assert_eq!(parsed[0].subpolicies.len(), 1);
        assert_eq!(
            parsed[0].subpolicies[0].attributes,
            PrimitiveAttributes::StaticRoute(AttachStaticRoute {
                network: Some("0.0.0.0/0".to_string()),
                share_ip_endpoint: false,
            })
        );

        // reading the template back renders the configured string again
        assert_eq!(api_primitives_to_json(&parsed).unwrap(), vec![link]);
    }

    #[test]
    fn data_source_config_marshals_like_api_readback() {
        let config = DynamicValue::new(Dynamic::object([
            ("label", Dynamic::Null),
            ("vn_id", Dynamic::string("vn-7")),
            ("tagged", Dynamic::Null),
            ("child_primitives", Dynamic::Null),
            ("primitive", Dynamic::Null),
        ]));
        let from_config = VnSingle::from_config(&config).unwrap().marshal().unwrap();

        let parsed =
            child_primitives_from_json(&[from_config.clone()], &AttributePath::new("p")).unwrap();
        match &parsed[0].attributes {
            PrimitiveAttributes::SingleVlan(a) => assert_eq!(a.tag_type, VlanTagging::Untagged),
            other => panic!("unexpected attributes {:?}", other),
        }
        assert_eq!(primitive_from_api(&parsed[0]).unwrap(), from_config);
    }

    #[test]
    fn wrong_attributes_fail_loading() {
        let parsed = child_primitives_from_json(
            &[static_route("0.0.0.0/0")],
            &AttributePath::new("p"),
        )
        .unwrap();
        let err = VnSingle::from_api(&parsed[0]).unwrap_err();
        assert_eq!(
            err.summary,
            "failed loading API primitive due to wrong attribute type"
        );
    }
}
