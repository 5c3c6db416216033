//! Resource pool API: ASN, VNI and integer range pools, IPv4 and IPv6
//! subnet pools

use super::common::{string_or_number, ListResponse, ObjectId};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

/// Pools allocated from numeric ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePoolKind {
    Asn,
    Vni,
    Integer,
}

impl RangePoolKind {
    pub fn api_path(&self) -> &'static str {
        match self {
            RangePoolKind::Asn => "/api/resources/asn-pools",
            RangePoolKind::Vni => "/api/resources/vni-pools",
            RangePoolKind::Integer => "/api/resources/integer-pools",
        }
    }

    /// Human name used in diagnostics ("ASN pool")
    pub fn display_name(&self) -> &'static str {
        match self {
            RangePoolKind::Asn => "ASN",
            RangePoolKind::Vni => "VNI",
            RangePoolKind::Integer => "Integer",
        }
    }

    /// Inclusive bounds of a range member
    pub fn bounds(&self) -> (u64, u64) {
        match self {
            RangePoolKind::Asn => (1, 4_294_967_295),
            RangePoolKind::Vni => (4096, 16_777_214),
            RangePoolKind::Integer => (1, 4_294_967_295),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpPoolFamily {
    V4,
    V6,
}

impl IpPoolFamily {
    pub fn api_path(&self) -> &'static str {
        match self {
            IpPoolFamily::V4 => "/api/resources/ip-pools",
            IpPoolFamily::V6 => "/api/resources/ipv6-pools",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            IpPoolFamily::V4 => "IPv4",
            IpPoolFamily::V6 => "IPv6",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolRange {
    pub first: u64,
    pub last: u64,
    #[serde(with = "string_or_number", default)]
    pub total: f64,
    #[serde(with = "string_or_number", default)]
    pub used: f64,
    #[serde(with = "string_or_number", default)]
    pub used_percentage: f64,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangePool {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub ranges: Vec<PoolRange>,
    #[serde(default)]
    pub status: String,
    #[serde(with = "string_or_number", default)]
    pub total: f64,
    #[serde(with = "string_or_number", default)]
    pub used: f64,
    #[serde(with = "string_or_number", default)]
    pub used_percentage: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeRequest {
    pub first: u64,
    pub last: u64,
}

/// Body for creating and replacing a range pool
#[derive(Debug, Clone, Serialize)]
pub struct RangePoolRequest {
    pub display_name: String,
    pub ranges: Vec<RangeRequest>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSubnet {
    pub network: String,
    #[serde(default)]
    pub status: String,
    #[serde(with = "string_or_number", default)]
    pub total: f64,
    #[serde(with = "string_or_number", default)]
    pub used: f64,
    #[serde(with = "string_or_number", default)]
    pub used_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpPool {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub subnets: Vec<PoolSubnet>,
    #[serde(default)]
    pub status: String,
    #[serde(with = "string_or_number", default)]
    pub total: f64,
    #[serde(with = "string_or_number", default)]
    pub used: f64,
    #[serde(with = "string_or_number", default)]
    pub used_percentage: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetRequest {
    pub network: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IpPoolRequest {
    pub display_name: String,
    pub subnets: Vec<SubnetRequest>,
    pub tags: Vec<String>,
}

/// Resources API for pool operations
pub struct ResourcesApi<'a> {
    client: &'a Client,
}

impl<'a> ResourcesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/resources/{kind}-pools
    pub async fn list_range_pools(&self, kind: RangePoolKind) -> Result<Vec<RangePool>, ApiError> {
        let list: ListResponse<RangePool> = self.client.get(kind.api_path()).await?;
        Ok(list.items)
    }

    /// GET /api/resources/{kind}-pools/{id}
    pub async fn get_range_pool(&self, kind: RangePoolKind, id: &str) -> Result<RangePool, ApiError> {
        self.client
            .get(&format!("{}/{}", kind.api_path(), id))
            .await
    }

    /// Pools whose display name is `name`
    pub async fn range_pools_named(
        &self,
        kind: RangePoolKind,
        name: &str,
    ) -> Result<Vec<RangePool>, ApiError> {
        Ok(self
            .list_range_pools(kind)
            .await?
            .into_iter()
            .filter(|p| p.display_name == name)
            .collect())
    }

    /// POST /api/resources/{kind}-pools, returns the new pool ID
    pub async fn create_range_pool(
        &self,
        kind: RangePoolKind,
        request: &RangePoolRequest,
    ) -> Result<String, ApiError> {
        let created: ObjectId = self.client.post(kind.api_path(), request).await?;
        Ok(created.id)
    }

    /// PUT /api/resources/{kind}-pools/{id}
    pub async fn update_range_pool(
        &self,
        kind: RangePoolKind,
        id: &str,
        request: &RangePoolRequest,
    ) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(&format!("{}/{}", kind.api_path(), id), request)
            .await
    }

    /// DELETE /api/resources/{kind}-pools/{id}
    pub async fn delete_range_pool(&self, kind: RangePoolKind, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("{}/{}", kind.api_path(), id))
            .await
    }

    pub async fn list_ip_pools(&self, family: IpPoolFamily) -> Result<Vec<IpPool>, ApiError> {
        let list: ListResponse<IpPool> = self.client.get(family.api_path()).await?;
        Ok(list.items)
    }

    pub async fn get_ip_pool(&self, family: IpPoolFamily, id: &str) -> Result<IpPool, ApiError> {
        self.client
            .get(&format!("{}/{}", family.api_path(), id))
            .await
    }

    pub async fn ip_pools_named(
        &self,
        family: IpPoolFamily,
        name: &str,
    ) -> Result<Vec<IpPool>, ApiError> {
        Ok(self
            .list_ip_pools(family)
            .await?
            .into_iter()
            .filter(|p| p.display_name == name)
            .collect())
    }

    pub async fn create_ip_pool(
        &self,
        family: IpPoolFamily,
        request: &IpPoolRequest,
    ) -> Result<String, ApiError> {
        let created: ObjectId = self.client.post(family.api_path(), request).await?;
        Ok(created.id)
    }

    pub async fn update_ip_pool(
        &self,
        family: IpPoolFamily,
        id: &str,
        request: &IpPoolRequest,
    ) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(&format!("{}/{}", family.api_path(), id), request)
            .await
    }

    pub async fn delete_ip_pool(&self, family: IpPoolFamily, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("{}/{}", family.api_path(), id))
            .await
    }
}
