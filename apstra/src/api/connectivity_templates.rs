//! Connectivity template (endpoint policy) API
//!
//! A template is stored as a flat list of policies. The root is a `batch`
//! whose subpolicies are `pipeline`s; each pipeline pairs one primitive
//! (`first_subpolicy`) with an optional batch of child pipelines
//! (`second_subpolicy`).

use super::common::ApiQueryParams;
use super::{ApiError, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

const BATCH: &str = "batch";
const PIPELINE: &str = "pipeline";

/// One entry of the blueprint policy import/export documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub policy_type_name: String,
    #[serde(default)]
    pub attributes: Value,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct PolicyDocument {
    policies: Vec<Policy>,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown value {0:?}")]
pub struct ParseEnumError(pub String);

fn parse_enum<T: DeserializeOwned>(s: &str) -> Result<T, ParseEnumError> {
    serde_json::from_value(Value::String(s.to_string())).map_err(|_| ParseEnumError(s.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VlanTagging {
    VlanTagged,
    Untagged,
}

impl VlanTagging {
    pub fn from_tagged(tagged: bool) -> Self {
        if tagged {
            VlanTagging::VlanTagged
        } else {
            VlanTagging::Untagged
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceType {
    Tagged,
    Untagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ipv4AddressingType {
    None,
    Numbered,
}

impl Ipv4AddressingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ipv4AddressingType::None => "none",
            Ipv4AddressingType::Numbered => "numbered",
        }
    }
}

impl FromStr for Ipv4AddressingType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_enum(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ipv6AddressingType {
    None,
    LinkLocal,
    Numbered,
}

impl Ipv6AddressingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ipv6AddressingType::None => "none",
            Ipv6AddressingType::LinkLocal => "link_local",
            Ipv6AddressingType::Numbered => "numbered",
        }
    }
}

impl FromStr for Ipv6AddressingType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_enum(s)
    }
}

/// BGP session addressing of the generic-system peering primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAddressing {
    None,
    Addressed,
    LinkLocal,
}

impl SessionAddressing {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionAddressing::None => "none",
            SessionAddressing::Addressed => "addressed",
            SessionAddressing::LinkLocal => "link_local",
        }
    }
}

impl FromStr for SessionAddressing {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_enum(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborAsnType {
    Static,
    Dynamic,
}

impl NeighborAsnType {
    pub fn from_dynamic(dynamic: bool) -> Self {
        if dynamic {
            NeighborAsnType::Dynamic
        } else {
            NeighborAsnType::Static
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerFrom {
    Loopback,
    Interface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerTo {
    Loopback,
    InterfaceOrIpEndpoint,
    InterfaceOrSharedIpEndpoint,
}

impl PeerTo {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerTo::Loopback => "loopback",
            PeerTo::InterfaceOrIpEndpoint => "interface_or_ip_endpoint",
            PeerTo::InterfaceOrSharedIpEndpoint => "interface_or_shared_ip_endpoint",
        }
    }
}

impl FromStr for PeerTo {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_enum(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachSingleVlan {
    pub vn_node_id: Option<String>,
    pub tag_type: VlanTagging,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachMultipleVlan {
    pub untagged_vn_node_id: Option<String>,
    #[serde(default)]
    pub tagged_vn_node_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachLogicalLink {
    pub security_zone: Option<String>,
    pub interface_type: InterfaceType,
    pub vlan_id: Option<u16>,
    pub ipv4_addressing_type: Ipv4AddressingType,
    pub ipv6_addressing_type: Ipv6AddressingType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachStaticRoute {
    pub network: Option<String>,
    #[serde(default)]
    pub share_ip_endpoint: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachCustomStaticRoute {
    pub vrf_node_id: Option<String>,
    pub network: Option<String>,
    pub next_hop: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachIpEndpointWithBgpNsxt {
    pub asn: Option<u32>,
    #[serde(default)]
    pub bfd: bool,
    pub holdtime: Option<u16>,
    pub ipv4_addr: Option<String>,
    pub ipv6_addr: Option<String>,
    #[serde(default)]
    pub ipv4_safi: bool,
    #[serde(default)]
    pub ipv6_safi: bool,
    pub keepalive: Option<u16>,
    pub local_asn: Option<u32>,
    pub neighbor_asn_type: NeighborAsnType,
    pub password: Option<String>,
    #[serde(default)]
    pub ttl: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachBgpOverSubinterfacesOrSvi {
    #[serde(default)]
    pub bfd: bool,
    pub holdtime: Option<u16>,
    #[serde(default)]
    pub ipv4_safi: bool,
    #[serde(default)]
    pub ipv6_safi: bool,
    pub keepalive: Option<u16>,
    pub local_asn: Option<u32>,
    pub neighbor_asn_type: NeighborAsnType,
    pub password: Option<String>,
    pub peer_from: PeerFrom,
    pub peer_to: PeerTo,
    pub session_addressing_ipv4: SessionAddressing,
    pub session_addressing_ipv6: SessionAddressing,
    #[serde(default)]
    pub ttl: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachBgpWithPrefixPeering {
    #[serde(default)]
    pub bfd: bool,
    pub holdtime: Option<u16>,
    #[serde(default)]
    pub ipv4_safi: bool,
    #[serde(default)]
    pub ipv6_safi: bool,
    pub keepalive: Option<u16>,
    pub local_asn: Option<u32>,
    pub password: Option<String>,
    pub prefix_neighbor_ipv4: Option<String>,
    pub prefix_neighbor_ipv6: Option<String>,
    #[serde(default)]
    pub session_addressing_ipv4: bool,
    #[serde(default)]
    pub session_addressing_ipv6: bool,
    #[serde(default)]
    pub ttl: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachExistingRoutingPolicy {
    pub rp_to_attach: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachRoutingZoneConstraint {
    pub routing_zone_constraint: Option<String>,
}

/// Attributes of one primitive, keyed by its policy type
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveAttributes {
    SingleVlan(AttachSingleVlan),
    MultipleVlan(AttachMultipleVlan),
    LogicalLink(AttachLogicalLink),
    StaticRoute(AttachStaticRoute),
    CustomStaticRoute(AttachCustomStaticRoute),
    IpEndpointWithBgpNsxt(AttachIpEndpointWithBgpNsxt),
    BgpOverSubinterfacesOrSvi(AttachBgpOverSubinterfacesOrSvi),
    BgpWithPrefixPeering(AttachBgpWithPrefixPeering),
    ExistingRoutingPolicy(AttachExistingRoutingPolicy),
    RoutingZoneConstraint(AttachRoutingZoneConstraint),
}

impl PrimitiveAttributes {
    pub fn policy_type_name(&self) -> &'static str {
        match self {
            PrimitiveAttributes::SingleVlan(_) => "AttachSingleVLAN",
            PrimitiveAttributes::MultipleVlan(_) => "AttachMultipleVLAN",
            PrimitiveAttributes::LogicalLink(_) => "AttachLogicalLink",
            PrimitiveAttributes::StaticRoute(_) => "AttachStaticRoute",
            PrimitiveAttributes::CustomStaticRoute(_) => "AttachCustomStaticRoute",
            PrimitiveAttributes::IpEndpointWithBgpNsxt(_) => "AttachIpEndpointWithBgpNsxt",
            PrimitiveAttributes::BgpOverSubinterfacesOrSvi(_) => "AttachBgpOverSubinterfacesOrSvi",
            PrimitiveAttributes::BgpWithPrefixPeering(_) => {
                "AttachBgpWithPrefixPeeringForSviOrSubinterface"
            }
            PrimitiveAttributes::ExistingRoutingPolicy(_) => "AttachExistingRoutingPolicy",
            PrimitiveAttributes::RoutingZoneConstraint(_) => "AttachRoutingZoneConstraint",
        }
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        match self {
            PrimitiveAttributes::SingleVlan(a) => serde_json::to_value(a),
            PrimitiveAttributes::MultipleVlan(a) => serde_json::to_value(a),
            PrimitiveAttributes::LogicalLink(a) => serde_json::to_value(a),
            PrimitiveAttributes::StaticRoute(a) => serde_json::to_value(a),
            PrimitiveAttributes::CustomStaticRoute(a) => serde_json::to_value(a),
            PrimitiveAttributes::IpEndpointWithBgpNsxt(a) => serde_json::to_value(a),
            PrimitiveAttributes::BgpOverSubinterfacesOrSvi(a) => serde_json::to_value(a),
            PrimitiveAttributes::BgpWithPrefixPeering(a) => serde_json::to_value(a),
            PrimitiveAttributes::ExistingRoutingPolicy(a) => serde_json::to_value(a),
            PrimitiveAttributes::RoutingZoneConstraint(a) => serde_json::to_value(a),
        }
    }

    /// Typed attributes of a primitive policy, None for batch, pipeline and
    /// unknown policy types
    fn from_json(policy_type_name: &str, attributes: &Value) -> Option<Result<Self, serde_json::Error>> {
        fn parse<T: DeserializeOwned>(v: &Value) -> Result<T, serde_json::Error> {
            T::deserialize(v)
        }
        let parsed = match policy_type_name {
            "AttachSingleVLAN" => parse(attributes).map(PrimitiveAttributes::SingleVlan),
            "AttachMultipleVLAN" => parse(attributes).map(PrimitiveAttributes::MultipleVlan),
            "AttachLogicalLink" => parse(attributes).map(PrimitiveAttributes::LogicalLink),
            "AttachStaticRoute" => parse(attributes).map(PrimitiveAttributes::StaticRoute),
            "AttachCustomStaticRoute" => {
                parse(attributes).map(PrimitiveAttributes::CustomStaticRoute)
            }
            "AttachIpEndpointWithBgpNsxt" => {
                parse(attributes).map(PrimitiveAttributes::IpEndpointWithBgpNsxt)
            }
            "AttachBgpOverSubinterfacesOrSvi" => {
                parse(attributes).map(PrimitiveAttributes::BgpOverSubinterfacesOrSvi)
            }
            "AttachBgpWithPrefixPeeringForSviOrSubinterface" => {
                parse(attributes).map(PrimitiveAttributes::BgpWithPrefixPeering)
            }
            "AttachExistingRoutingPolicy" => {
                parse(attributes).map(PrimitiveAttributes::ExistingRoutingPolicy)
            }
            "AttachRoutingZoneConstraint" => {
                parse(attributes).map(PrimitiveAttributes::RoutingZoneConstraint)
            }
            _ => return None,
        };
        Some(parsed)
    }
}

/// A primitive together with the primitives nested below it
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub id: Option<String>,
    pub label: String,
    pub attributes: PrimitiveAttributes,
    pub subpolicies: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectivityTemplate {
    pub id: Option<String>,
    pub label: String,
    pub description: String,
    pub tags: Vec<String>,
    pub subpolicies: Vec<Primitive>,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ConnectivityTemplate {
    /// Fills missing template and primitive IDs with fresh UUIDs
    pub fn assign_ids(&mut self) {
        fn walk(primitives: &mut [Primitive]) {
            for p in primitives {
                if p.id.is_none() {
                    p.id = Some(new_id());
                }
                walk(&mut p.subpolicies);
            }
        }
        if self.id.is_none() {
            self.id = Some(new_id());
        }
        walk(&mut self.subpolicies);
    }

    /// Flattens the template into import policies, root first. Pipelines and
    /// batches get fresh IDs; missing primitive IDs are generated.
    pub fn to_policies(&self) -> Result<Vec<Policy>, ApiError> {
        let root_id = self.id.clone().unwrap_or_else(new_id);
        let mut policies = vec![Policy {
            id: root_id,
            label: self.label.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            policy_type_name: BATCH.to_string(),
            attributes: Value::Null,
            visible: true,
        }];
        let pipelines = pipelines_to_policies(&self.subpolicies, &mut policies)?;
        policies[0].attributes = json!({ "subpolicies": pipelines });
        Ok(policies)
    }

    /// Rebuilds the template rooted at `root_id` from exported policies
    pub fn from_policies(root_id: &str, policies: &[Policy]) -> Result<Self, ApiError> {
        let index: HashMap<&str, &Policy> = policies.iter().map(|p| (p.id.as_str(), p)).collect();
        let root = index
            .get(root_id)
            .ok_or_else(|| ApiError::NotFound(format!("connectivity template {}", root_id)))?;
        if root.policy_type_name != BATCH {
            return Err(ApiError::ParseError(format!(
                "policy {} is a {}, expected {}",
                root_id, root.policy_type_name, BATCH
            )));
        }
        Ok(Self {
            id: Some(root.id.clone()),
            label: root.label.clone(),
            description: root.description.clone(),
            tags: root.tags.clone(),
            subpolicies: batch_primitives(root, &index)?,
        })
    }
}

fn pipelines_to_policies(
    primitives: &[Primitive],
    policies: &mut Vec<Policy>,
) -> Result<Vec<String>, ApiError> {
    let mut pipeline_ids = Vec::with_capacity(primitives.len());
    for primitive in primitives {
        let primitive_id = primitive.id.clone().unwrap_or_else(new_id);
        let attributes = primitive.attributes.to_json().map_err(|e| {
            ApiError::ParseError(format!(
                "failed encoding {} attributes: {}",
                primitive.attributes.policy_type_name(),
                e
            ))
        })?;

        let pipeline_idx = policies.len();
        let pipeline_id = new_id();
        policies.push(Policy {
            id: pipeline_id.clone(),
            label: format!("{} (pipeline)", primitive.label),
            description: String::new(),
            tags: Vec::new(),
            policy_type_name: PIPELINE.to_string(),
            attributes: Value::Null,
            visible: false,
        });
        policies.push(Policy {
            id: primitive_id.clone(),
            label: primitive.label.clone(),
            description: String::new(),
            tags: Vec::new(),
            policy_type_name: primitive.attributes.policy_type_name().to_string(),
            attributes,
            visible: false,
        });

        let second = if primitive.subpolicies.is_empty() {
            Value::Null
        } else {
            let batch_idx = policies.len();
            let batch_id = new_id();
            policies.push(Policy {
                id: batch_id.clone(),
                label: format!("{} (batch)", primitive.label),
                description: String::new(),
                tags: Vec::new(),
                policy_type_name: BATCH.to_string(),
                attributes: Value::Null,
                visible: false,
            });
            let children = pipelines_to_policies(&primitive.subpolicies, policies)?;
            policies[batch_idx].attributes = json!({ "subpolicies": children });
            Value::String(batch_id)
        };

        policies[pipeline_idx].attributes = json!({
            "first_subpolicy": primitive_id,
            "second_subpolicy": second,
        });
        pipeline_ids.push(pipeline_id);
    }
    Ok(pipeline_ids)
}

fn referenced<'a>(
    index: &HashMap<&str, &'a Policy>,
    id: &str,
    parent: &Policy,
) -> Result<&'a Policy, ApiError> {
    index.get(id).copied().ok_or_else(|| {
        ApiError::ParseError(format!(
            "policy {} referenced by {} not found",
            id, parent.id
        ))
    })
}

fn subpolicy_ids(batch: &Policy) -> Vec<String> {
    batch
        .attributes
        .get("subpolicies")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn batch_primitives(
    batch: &Policy,
    index: &HashMap<&str, &Policy>,
) -> Result<Vec<Primitive>, ApiError> {
    let mut primitives = Vec::new();
    for pipeline_id in subpolicy_ids(batch) {
        let pipeline = referenced(index, &pipeline_id, batch)?;
        if pipeline.policy_type_name != PIPELINE {
            return Err(ApiError::ParseError(format!(
                "policy {} is a {}, expected {}",
                pipeline.id, pipeline.policy_type_name, PIPELINE
            )));
        }

        let first_id = pipeline
            .attributes
            .get("first_subpolicy")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ApiError::ParseError(format!("pipeline {} has no first subpolicy", pipeline.id))
            })?;
        let first = referenced(index, first_id, pipeline)?;
        let attributes = PrimitiveAttributes::from_json(&first.policy_type_name, &first.attributes)
            .ok_or_else(|| {
                ApiError::ParseError(format!(
                    "unhandled primitive type {:?}",
                    first.policy_type_name
                ))
            })?
            .map_err(|e| {
                ApiError::ParseError(format!(
                    "failed parsing {} attributes of {}: {}",
                    first.policy_type_name, first.id, e
                ))
            })?;

        let subpolicies = match pipeline
            .attributes
            .get("second_subpolicy")
            .and_then(Value::as_str)
        {
            Some(batch_id) => batch_primitives(referenced(index, batch_id, pipeline)?, index)?,
            None => Vec::new(),
        };

        primitives.push(Primitive {
            id: Some(first.id.clone()),
            label: first.label.clone(),
            attributes,
            subpolicies,
        });
    }
    Ok(primitives)
}

/// IDs of every policy reachable from `root_id`, parents before children
pub fn reachable_policy_ids(root_id: &str, policies: &[Policy]) -> Vec<String> {
    let index: HashMap<&str, &Policy> = policies.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    let mut stack = vec![root_id.to_string()];
    while let Some(id) = stack.pop() {
        let Some(policy) = index.get(id.as_str()) else {
            continue;
        };
        if !seen.insert(id.clone()) {
            continue;
        }
        ordered.push(id);
        let mut children = subpolicy_ids(policy);
        for key in ["first_subpolicy", "second_subpolicy"] {
            if let Some(child) = policy.attributes.get(key).and_then(Value::as_str) {
                children.push(child.to_string());
            }
        }
        stack.extend(children.into_iter().rev());
    }
    ordered
}

/// Connectivity templates of one blueprint
pub struct ConnectivityTemplatesApi<'a> {
    client: &'a Client,
    blueprint_id: &'a str,
}

impl<'a> ConnectivityTemplatesApi<'a> {
    pub fn new(client: &'a Client, blueprint_id: &'a str) -> Self {
        Self {
            client,
            blueprint_id,
        }
    }

    /// GET /api/blueprints/{id}/obj-policy-export
    pub async fn export(&self) -> Result<Vec<Policy>, ApiError> {
        let document: PolicyDocument = self
            .client
            .get(&format!(
                "/api/blueprints/{}/obj-policy-export",
                self.blueprint_id
            ))
            .await?;
        Ok(document.policies)
    }

    async fn import_policies(&self, policies: Vec<Policy>) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(
                &format!("/api/blueprints/{}/obj-policy-import", self.blueprint_id),
                &PolicyDocument { policies },
            )
            .await
    }

    /// Creates the template, returning its ID
    pub async fn create(&self, template: &ConnectivityTemplate) -> Result<String, ApiError> {
        let mut template = template.clone();
        template.assign_ids();
        let policies = template.to_policies()?;
        let id = policies[0].id.clone();
        self.import_policies(policies).await?;
        tracing::debug!("created connectivity template {} in {}", id, self.blueprint_id);
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> Result<ConnectivityTemplate, ApiError> {
        let policies = self.export().await?;
        ConnectivityTemplate::from_policies(id, &policies)
    }

    /// Replaces the template in place. Policies of the previous version which
    /// the new one no longer references are deleted afterwards.
    pub async fn update(&self, id: &str, template: &ConnectivityTemplate) -> Result<(), ApiError> {
        let previous = reachable_policy_ids(id, &self.export().await?);

        let mut template = template.clone();
        template.id = Some(id.to_string());
        template.assign_ids();
        let policies = template.to_policies()?;
        let current: HashSet<String> = policies.iter().map(|p| p.id.clone()).collect();
        self.import_policies(policies).await?;

        for stale in previous.iter().filter(|p| !current.contains(*p)) {
            match self.delete_policy(stale, false).await {
                Ok(()) | Err(ApiError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Deletes the template and everything below it
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.delete_policy(id, true).await
    }

    /// DELETE /api/blueprints/{id}/endpoint-policies/{policy_id}
    async fn delete_policy(&self, policy_id: &str, recursive: bool) -> Result<(), ApiError> {
        let params = ApiQueryParams::new().add("delete_recursive", recursive);
        self.client
            .delete_with_params::<()>(
                &format!(
                    "/api/blueprints/{}/endpoint-policies/{}",
                    self.blueprint_id, policy_id
                ),
                &params,
            )
            .await
    }
}
