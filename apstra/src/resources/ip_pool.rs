//! IPv4 and IPv6 pool resources

use super::{id_path, modify_plan, state_with_id};
use crate::api::resources::{IpPool, IpPoolFamily, IpPoolRequest, PoolSubnet, SubnetRequest};
use crate::api::ApiError;
use crate::plan_modifiers::UseStateForUnknown;
use crate::provider_data::{not_configured, ApstraProviderData};
use crate::validators::{overlaps, ParseCidr};
use crate::values;
use async_trait::async_trait;
use ipnet::IpNet;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceMetadataRequest, ResourceMetadataResponse, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    ResourceWithModifyPlan, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, ObjectNestingMode, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validation::validate_config;
use tfplug::validator::{SizeValidator, StringLengthValidator};

pub struct IpPoolResource {
    family: IpPoolFamily,
    provider_data: Option<ApstraProviderData>,
}

impl IpPoolResource {
    pub fn new(family: IpPoolFamily) -> Self {
        Self {
            family,
            provider_data: None,
        }
    }

    pub fn ipv4() -> Self {
        Self::new(IpPoolFamily::V4)
    }

    pub fn ipv6() -> Self {
        Self::new(IpPoolFamily::V6)
    }

    pub fn schema_static(family: IpPoolFamily) -> Schema {
        let noun = family.display_name();
        let example = match family {
            IpPoolFamily::V4 => "192.0.2.0/24",
            IpPoolFamily::V6 => "2001:db8::/64",
        };
        let subnet = vec![
            AttributeBuilder::new("network", AttributeType::String)
                .description(&format!("Network specification in CIDR syntax (\"{}\").", example))
                .required()
                .validator(ParseCidr::new(
                    family == IpPoolFamily::V4,
                    family == IpPoolFamily::V6,
                ))
                .build(),
            AttributeBuilder::new("status", AttributeType::String)
                .description(&format!("Status of the {} resource pool.", noun))
                .computed()
                .build(),
            AttributeBuilder::new("total", AttributeType::Number)
                .description(&format!("Total number of addresses in this {} range.", noun))
                .computed()
                .build(),
            AttributeBuilder::new("used", AttributeType::Number)
                .description(&format!("Count of used addresses in this {} range.", noun))
                .computed()
                .build(),
            AttributeBuilder::new("used_percentage", AttributeType::Number)
                .description(&format!("Percent of used addresses in this {} range.", noun))
                .computed()
                .build(),
        ];

        SchemaBuilder::new()
            .version(0)
            .description(&format!("This resource creates an {} resource pool", noun))
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description(&format!("Apstra ID number of the {} pool", noun))
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description(&format!("Display name of the {} pool", noun))
                    .required()
                    .validator(StringLengthValidator::length_at_least(1))
                    .build(),
            )
            .attribute(
                AttributeBuilder::nested("subnets", ObjectNestingMode::Set, subnet)
                    .description(&format!("{} allocation ranges", noun))
                    .required()
                    .validator(SizeValidator::size_at_least(1))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description(&format!("Status of the {} resource pool.", noun))
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("total", AttributeType::Number)
                    .description(&format!("Total number of addresses in the {} pool.", noun))
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("used", AttributeType::Number)
                    .description(&format!("Count of used addresses in the {} pool.", noun))
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("used_percentage", AttributeType::Number)
                    .description(&format!("Percent of used addresses in the {} pool.", noun))
                    .computed()
                    .build(),
            )
            .build()
    }
}

fn subnet_paths(value: &DynamicValue) -> Vec<AttributePath> {
    match value.get(&AttributePath::new("subnets")) {
        Dynamic::List(items) => (0..items.len())
            .map(|i| AttributePath::new("subnets").index(i as i64).attribute("network"))
            .collect(),
        _ => vec![],
    }
}

fn pool_request(value: &DynamicValue) -> Result<IpPoolRequest, Diagnostic> {
    let display_name = values::required_string(value, &AttributePath::new("name"))?;
    let subnets = subnet_paths(value)
        .iter()
        .map(|path| values::required_string(value, path).map(|network| SubnetRequest { network }))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(IpPoolRequest {
        display_name,
        subnets,
        tags: vec![],
    })
}

/// Each subnet must be written as its network base address, and no two
/// subnets of a pool may overlap. Unknown subnets end the check.
pub(crate) fn subnet_problems(config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];
    let mut accepted: Vec<IpNet> = vec![];
    for path in subnet_paths(config) {
        let text = match config.get(&path) {
            Dynamic::String(text) => text,
            Dynamic::Unknown => break,
            _ => continue,
        };
        let cidr: IpNet = match text.parse() {
            Ok(cidr) => cidr,
            Err(e) => {
                diagnostics.push(Diagnostic::attribute_error(
                    &path,
                    "failure parsing CIDR notation",
                    format!("error parsing {:?} - {}", text, e),
                ));
                break;
            }
        };

        if cidr.addr() != cidr.network() {
            diagnostics.push(Diagnostic::attribute_error(
                &path,
                "bad subnet specification",
                format!(
                    "{:?} doesn't specify a network base address. Did you mean {:?}?",
                    text,
                    cidr.trunc().to_string()
                ),
            ));
            break;
        }

        if let Some(other) = accepted.iter().find(|other| overlaps(other, &cidr)) {
            diagnostics.push(Diagnostic::attribute_error(
                &path,
                "pool has overlapping subnets",
                format!(
                    "subnets {:?} and {:?} overlap",
                    cidr.to_string(),
                    other.to_string()
                ),
            ));
            break;
        }
        accepted.push(cidr);
    }
    diagnostics
}

fn subnet_state(subnet: &PoolSubnet) -> Dynamic {
    Dynamic::object([
        ("network", Dynamic::string(subnet.network.as_str())),
        ("status", Dynamic::string(subnet.status.as_str())),
        ("total", Dynamic::Number(subnet.total)),
        ("used", Dynamic::Number(subnet.used)),
        ("used_percentage", Dynamic::Number(subnet.used_percentage)),
    ])
}

pub(crate) fn pool_state(pool: &IpPool) -> DynamicValue {
    let subnets: Vec<Dynamic> = pool.subnets.iter().map(subnet_state).collect();
    DynamicValue::new(Dynamic::object([
        ("id", Dynamic::string(pool.id.as_str())),
        ("name", Dynamic::string(pool.display_name.as_str())),
        (
            "subnets",
            if subnets.is_empty() {
                Dynamic::Null
            } else {
                Dynamic::List(subnets)
            },
        ),
        ("status", Dynamic::string(pool.status.as_str())),
        ("total", Dynamic::Number(pool.total)),
        ("used", Dynamic::Number(pool.used)),
        ("used_percentage", Dynamic::Number(pool.used_percentage)),
    ]))
}

#[async_trait]
impl Resource for IpPoolResource {
    fn type_name(&self) -> &str {
        match self.family {
            IpPoolFamily::V4 => "apstra_ipv4_pool",
            IpPoolFamily::V6 => "apstra_ipv6_pool",
        }
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(self.family),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = validate_config(&Self::schema_static(self.family), &request.config);
        if !tfplug::types::has_errors(&diagnostics) {
            diagnostics.extend(subnet_problems(&request.config));
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let failed = |diagnostic: Diagnostic, state: DynamicValue| CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![diagnostic],
        };

        let Some(provider_data) = &self.provider_data else {
            return failed(not_configured(), request.planned_state);
        };
        let pool_request = match pool_request(&request.planned_state) {
            Ok(pool_request) => pool_request,
            Err(diag) => return failed(diag, request.planned_state),
        };

        let resources = provider_data.client.resources();
        let id = match resources.create_ip_pool(self.family, &pool_request).await {
            Ok(id) => id,
            Err(e) => {
                return failed(
                    Diagnostic::error(
                        format!("error creating new {} Pool", self.family.display_name()),
                        e.to_string(),
                    ),
                    request.planned_state,
                )
            }
        };
        tracing::info!("created {} pool {}", self.family.display_name(), id);

        match resources.get_ip_pool(self.family, &id).await {
            Ok(pool) => CreateResourceResponse {
                new_state: pool_state(&pool),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => {
                let state = state_with_id(request.planned_state, &id);
                failed(
                    Diagnostic::error(
                        format!("Error retrieving {} Pool", self.family.display_name()),
                        e.to_string(),
                    ),
                    state,
                )
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let keep = |request: ReadResourceRequest, diagnostic: Diagnostic| ReadResourceResponse {
            new_state: Some(request.current_state),
            diagnostics: vec![diagnostic],
            private: request.private,
            deferred: None,
        };

        let Some(provider_data) = &self.provider_data else {
            return keep(request, not_configured());
        };
        let id = match values::required_string(&request.current_state, &id_path()) {
            Ok(id) => id,
            Err(diag) => return keep(request, diag),
        };

        match provider_data.client.resources().get_ip_pool(self.family, &id).await {
            Ok(pool) => ReadResourceResponse {
                new_state: Some(pool_state(&pool)),
                diagnostics: vec![],
                private: request.private,
                deferred: None,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "{} pool {} deleted outside of terraform",
                    self.family.display_name(),
                    id
                );
                ReadResourceResponse::removed(request.private)
            }
            Err(e) => {
                let diag = Diagnostic::error(
                    format!("error reading {} pool", self.family.display_name()),
                    e.to_string(),
                );
                keep(request, diag)
            }
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let failed = |diagnostic: Diagnostic, state: DynamicValue| UpdateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![diagnostic],
        };

        let Some(provider_data) = &self.provider_data else {
            return failed(not_configured(), request.prior_state);
        };
        let id = match values::required_string(&request.prior_state, &id_path()) {
            Ok(id) => id,
            Err(diag) => return failed(diag, request.prior_state),
        };
        let pool_request = match pool_request(&request.planned_state) {
            Ok(pool_request) => pool_request,
            Err(diag) => return failed(diag, request.prior_state),
        };

        let resources = provider_data.client.resources();
        if let Err(e) = resources.update_ip_pool(self.family, &id, &pool_request).await {
            return failed(
                Diagnostic::error(
                    format!("error updating {} Pool", self.family.display_name()),
                    e.to_string(),
                ),
                request.prior_state,
            );
        }

        match resources.get_ip_pool(self.family, &id).await {
            Ok(pool) => UpdateResourceResponse {
                new_state: pool_state(&pool),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => failed(
                Diagnostic::error(
                    format!("error reading {} pool", self.family.display_name()),
                    e.to_string(),
                ),
                request.planned_state,
            ),
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };
        let id = match values::required_string(&request.prior_state, &id_path()) {
            Ok(id) => id,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        match provider_data
            .client
            .resources()
            .delete_ip_pool(self.family, &id)
            .await
        {
            Ok(()) | Err(ApiError::NotFound(_)) => DeleteResourceResponse { diagnostics: vec![] },
            Err(e) => DeleteResourceResponse {
                diagnostics: vec![Diagnostic::error(
                    format!("error deleting {} pool", self.family.display_name()),
                    e.to_string(),
                )],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for IpPoolResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        match ApstraProviderData::from_provider_data(request.provider_data) {
            Ok(provider_data) => {
                self.provider_data = Some(provider_data);
                ConfigureResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureResourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}

#[async_trait]
impl ResourceWithModifyPlan for IpPoolResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        modify_plan(&Self::schema_static(self.family), request)
    }
}

#[async_trait]
impl ResourceWithImportState for IpPoolResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse::default();
        import_state_passthrough_id(&ctx, id_path(), &request, &mut response);
        response
    }
}
