//! ASN, VNI and integer pool resources
//!
//! The three pool types share one implementation; [`RangePoolKind`] picks the
//! API path, the member bounds and the wording of diagnostics.

use super::{id_path, modify_plan, state_with_id};
use crate::api::resources::{PoolRange, RangePool, RangePoolKind, RangePoolRequest, RangeRequest};
use crate::provider_data::{not_configured, ApstraProviderData};
use crate::values;
use async_trait::async_trait;
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
use tfplug::schema::{
    Attribute, AttributeBuilder, AttributeType, ObjectNestingMode, Schema, SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validation::validate_config;
use tfplug::validator::{AtLeastSumOf, NumberRangeValidator, SizeValidator, StringLengthValidator};
use tfplug::PathExpression;

use crate::plan_modifiers::UseStateForUnknown;
use crate::validators::UniqueValueCombinationsAt;

pub struct RangePoolResource {
    kind: RangePoolKind,
    provider_data: Option<ApstraProviderData>,
}

impl RangePoolResource {
    pub fn new(kind: RangePoolKind) -> Self {
        Self {
            kind,
            provider_data: None,
        }
    }

    pub fn asn() -> Self {
        Self::new(RangePoolKind::Asn)
    }

    pub fn vni() -> Self {
        Self::new(RangePoolKind::Vni)
    }

    pub fn integer() -> Self {
        Self::new(RangePoolKind::Integer)
    }

    pub fn schema_static(kind: RangePoolKind) -> Schema {
        let noun = kind.display_name();
        SchemaBuilder::new()
            .version(0)
            .description(&format!("This resource creates an {} resource pool", noun))
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Apstra ID number of the pool")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Pool name displayed in the Apstra web UI")
                    .required()
                    .validator(StringLengthValidator::length_at_least(1))
                    .build(),
            )
            .attribute(
                AttributeBuilder::nested("ranges", ObjectNestingMode::Set, range_attributes(kind))
                    .description(&format!(
                        "Ranges mark the begin/end {} numbers available from the pool",
                        noun
                    ))
                    .required()
                    .validator(SizeValidator::size_at_least(1))
                    .validator(UniqueValueCombinationsAt::new(["first", "last"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("total", AttributeType::Number)
                    .description(&format!("Total number of {}s in the {} Pool.", noun, noun))
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description(&format!(
                        "Status of the {} Pool. Note that this element is probably better read \
                         from a `data` source because it will be more up-to-date.",
                        noun
                    ))
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("used", AttributeType::Number)
                    .description(&format!("Count of used {}s in the {} Pool.", noun, noun))
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("used_percentage", AttributeType::Number)
                    .description(&format!("Percent of used {}s in the {} Pool.", noun, noun))
                    .computed()
                    .build(),
            )
            .build()
    }

    fn pool_request(&self, value: &DynamicValue) -> Result<RangePoolRequest, Diagnostic> {
        let name = values::required_string(value, &AttributePath::new("name"))?;
        let count = match value.get(&AttributePath::new("ranges")) {
            Dynamic::List(items) => items.len(),
            _ => 0,
        };

        let mut ranges = Vec::with_capacity(count);
        for idx in 0..count {
            let path = AttributePath::new("ranges").index(idx as i64);
            let first = required_member(value, &path.clone().attribute("first"))?;
            let last = required_member(value, &path.clone().attribute("last"))?;
            ranges.push(RangeRequest { first, last });
        }

        Ok(RangePoolRequest {
            display_name: name,
            ranges,
            tags: vec![],
        })
    }
}

fn required_member(value: &DynamicValue, path: &AttributePath) -> Result<u64, Diagnostic> {
    values::integer::<u64>(value, path)?.ok_or_else(|| {
        Diagnostic::attribute_error(
            path,
            format!("Missing {}", path),
            format!("The '{}' attribute is required", path),
        )
    })
}

fn range_attributes(kind: RangePoolKind) -> Vec<Attribute> {
    let (min, max) = kind.bounds();
    let noun = kind.display_name();
    vec![
        AttributeBuilder::new("first", AttributeType::Number)
            .required()
            .validator(NumberRangeValidator::between(min as f64, max as f64))
            .build(),
        AttributeBuilder::new("last", AttributeType::Number)
            .required()
            .validator(NumberRangeValidator::between(min as f64, max as f64))
            .validator(AtLeastSumOf::new(vec![PathExpression::match_relative()
                .at_parent()
                .at_name("first")]))
            .build(),
        AttributeBuilder::new("total", AttributeType::Number)
            .description(&format!("Total number of {}s in the {} Pool Range.", noun, noun))
            .computed()
            .build(),
        AttributeBuilder::new("status", AttributeType::String)
            .description(&format!(
                "Status of the {} Pool Range, as reported by Apstra.",
                noun
            ))
            .computed()
            .build(),
        AttributeBuilder::new("used", AttributeType::Number)
            .description(&format!("Count of used {}s in the {} Pool Range.", noun, noun))
            .computed()
            .build(),
        AttributeBuilder::new("used_percentage", AttributeType::Number)
            .description(&format!("Percent of used {}s in the {} Pool Range.", noun, noun))
            .computed()
            .build(),
    ]
}

/// Ranges of one pool may not overlap. Checking stops at the first range
/// whose bounds are not yet known.
pub(crate) fn range_collisions(kind: RangePoolKind, config: &DynamicValue) -> Vec<Diagnostic> {
    let Dynamic::List(items) = config.get(&AttributePath::new("ranges")) else {
        return vec![];
    };

    let mut diagnostics = vec![];
    let mut accepted: Vec<(u64, u64)> = vec![];
    for (idx, item) in items.iter().enumerate() {
        let bound = |name: &str| {
            item.as_map()
                .and_then(|m| m.get(name))
                .and_then(Dynamic::as_number)
        };
        let (Some(first), Some(last)) = (bound("first"), bound("last")) else {
            break;
        };
        let (first, last) = (first as u64, last as u64);

        if accepted.iter().any(|&(f, l)| first <= l && f <= last) {
            diagnostics.push(Diagnostic::attribute_error(
                &AttributePath::new("ranges").index(idx as i64),
                format!("{} range collision", kind.display_name()),
                format!(
                    "{} range {} - {} overlaps with another range in this pool",
                    kind.display_name(),
                    first,
                    last
                ),
            ));
            break;
        }
        accepted.push((first, last));
    }
    diagnostics
}

fn range_state(range: &PoolRange) -> Dynamic {
    Dynamic::object([
        ("first", Dynamic::Number(range.first as f64)),
        ("last", Dynamic::Number(range.last as f64)),
        ("total", Dynamic::Number(range.total)),
        ("status", Dynamic::string(range.status.as_str())),
        ("used", Dynamic::Number(range.used)),
        ("used_percentage", Dynamic::Number(range.used_percentage)),
    ])
}

/// Full resource (and data source) state of a pool
pub(crate) fn pool_state(pool: &RangePool) -> DynamicValue {
    let ranges: Vec<Dynamic> = pool.ranges.iter().map(range_state).collect();
    DynamicValue::new(Dynamic::object([
        ("id", Dynamic::string(pool.id.as_str())),
        ("name", Dynamic::string(pool.display_name.as_str())),
        (
            "ranges",
            if ranges.is_empty() {
                Dynamic::Null
            } else {
                Dynamic::List(ranges)
            },
        ),
        ("total", Dynamic::Number(pool.total)),
        ("status", Dynamic::string(pool.status.as_str())),
        ("used", Dynamic::Number(pool.used)),
        ("used_percentage", Dynamic::Number(pool.used_percentage)),
    ]))
}

#[async_trait]
impl Resource for RangePoolResource {
    fn type_name(&self) -> &str {
        match self.kind {
            RangePoolKind::Asn => "apstra_asn_pool",
            RangePoolKind::Vni => "apstra_vni_pool",
            RangePoolKind::Integer => "apstra_integer_pool",
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
            schema: Self::schema_static(self.kind),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = validate_config(&Self::schema_static(self.kind), &request.config);
        diagnostics.extend(range_collisions(self.kind, &request.config));
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
        let pool_request = match self.pool_request(&request.planned_state) {
            Ok(pool_request) => pool_request,
            Err(diag) => return failed(diag, request.planned_state),
        };

        let resources = provider_data.client.resources();
        let id = match resources.create_range_pool(self.kind, &pool_request).await {
            Ok(id) => id,
            Err(e) => {
                return failed(
                    Diagnostic::error(
                        format!("error creating new {} Pool", self.kind.display_name()),
                        e.to_string(),
                    ),
                    request.planned_state,
                )
            }
        };
        tracing::info!("created {} pool {}", self.kind.display_name(), id);

        match resources.get_range_pool(self.kind, &id).await {
            Ok(pool) => CreateResourceResponse {
                new_state: pool_state(&pool),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => {
                let state = state_with_id(request.planned_state, &id);
                failed(
                    Diagnostic::error(
                        format!("error reading new {} Pool", self.kind.display_name()),
                        e.to_string(),
                    ),
                    state,
                )
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
                private: request.private,
                deferred: None,
            };
        };
        let id = match values::required_string(&request.current_state, &id_path()) {
            Ok(id) => id,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                    deferred: None,
                }
            }
        };

        match provider_data.client.resources().get_range_pool(self.kind, &id).await {
            Ok(pool) => ReadResourceResponse {
                new_state: Some(pool_state(&pool)),
                diagnostics: vec![],
                private: request.private,
                deferred: None,
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!("{} pool {} deleted outside of terraform", self.kind.display_name(), id);
                ReadResourceResponse::removed(request.private)
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![Diagnostic::error(
                    format!("error reading {} pool", self.kind.display_name()),
                    e.to_string(),
                )],
                private: request.private,
                deferred: None,
            },
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
        let pool_request = match self.pool_request(&request.planned_state) {
            Ok(pool_request) => pool_request,
            Err(diag) => return failed(diag, request.prior_state),
        };

        let resources = provider_data.client.resources();
        if let Err(e) = resources.update_range_pool(self.kind, &id, &pool_request).await {
            return failed(
                Diagnostic::error(
                    format!("error updating {} Pool", self.kind.display_name()),
                    e.to_string(),
                ),
                request.prior_state,
            );
        }

        match resources.get_range_pool(self.kind, &id).await {
            Ok(pool) => UpdateResourceResponse {
                new_state: pool_state(&pool),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => failed(
                Diagnostic::error(
                    format!("error reading {} Pool", self.kind.display_name()),
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
            .delete_range_pool(self.kind, &id)
            .await
        {
            // already gone
            Ok(()) | Err(crate::api::ApiError::NotFound(_)) => {
                DeleteResourceResponse { diagnostics: vec![] }
            }
            Err(e) => DeleteResourceResponse {
                diagnostics: vec![Diagnostic::error(
                    format!("error deleting {} pool", self.kind.display_name()),
                    e.to_string(),
                )],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for RangePoolResource {
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
impl ResourceWithModifyPlan for RangePoolResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        modify_plan(&Self::schema_static(self.kind), request)
    }
}

#[async_trait]
impl ResourceWithImportState for RangePoolResource {
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

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn config(ranges: &[(f64, f64)]) -> DynamicValue {
        DynamicValue::new(Dynamic::object([
            ("id", Dynamic::Null),
            ("name", Dynamic::string("pool")),
            (
                "ranges",
                Dynamic::List(
                    ranges
                        .iter()
                        .map(|&(first, last)| {
                            Dynamic::object([
                                ("first", Dynamic::Number(first)),
                                ("last", Dynamic::Number(last)),
                                ("total", Dynamic::Null),
                                ("status", Dynamic::Null),
                                ("used", Dynamic::Null),
                                ("used_percentage", Dynamic::Null),
                            ])
                        })
                        .collect(),
                ),
            ),
        ]))
    }

    #[test]
    fn overlapping_ranges_collide() {
        let diags = range_collisions(RangePoolKind::Asn, &config(&[(10.0, 20.0), (20.0, 30.0)]));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "ASN range collision");
        assert_eq!(
            diags[0].attribute,
            Some(AttributePath::new("ranges").index(1))
        );

        assert!(range_collisions(RangePoolKind::Asn, &config(&[(10.0, 19.0), (20.0, 30.0)]))
            .is_empty());
    }

    #[test]
    fn schema_validators_check_bounds_and_order() {
        let schema = RangePoolResource::schema_static(RangePoolKind::Vni);
        let diags = validate_config(&schema, &config(&[(4096.0, 5000.0)]));
        assert!(diags.is_empty(), "{:?}", diags);

        let diags = validate_config(&schema, &config(&[(100.0, 5000.0)]));
        assert_eq!(diags.len(), 1, "{:?}", diags);
        assert_eq!(
            diags[0].attribute,
            Some(AttributePath::new("ranges").index(0).attribute("first"))
        );

        let diags = validate_config(&schema, &config(&[(6000.0, 5000.0)]));
        assert_eq!(diags.len(), 1, "{:?}", diags);
        assert_eq!(
            diags[0].attribute,
            Some(AttributePath::new("ranges").index(0).attribute("last"))
        );
    }

    #[test]
    fn duplicate_ranges_conflict() {
        let schema = RangePoolResource::schema_static(RangePoolKind::Integer);
        let diags = validate_config(&schema, &config(&[(1.0, 5.0), (1.0, 5.0)]));
        assert!(diags
            .iter()
            .any(|d| d.summary.contains("collision")), "{:?}", diags);
    }

    #[test]
    fn request_from_plan() {
        let resource = RangePoolResource::asn();
        let request = resource.pool_request(&config(&[(1.0, 5.0)])).unwrap();
        assert_eq!(request.display_name, "pool");
        assert_eq!(request.ranges, vec![RangeRequest { first: 1, last: 5 }]);
    }

    #[test]
    fn unknown_range_does_not_block_plan() {
        let schema = RangePoolResource::schema_static(RangePoolKind::Asn);
        let mut planned = config(&[(64512.0, 64600.0)]);
        let mut ranges = match planned.get(&AttributePath::new("ranges")) {
            Dynamic::List(items) => items,
            other => panic!("unexpected ranges {:?}", other),
        };
        ranges.push(Dynamic::Unknown);
        planned
            .set_list(&AttributePath::new("ranges"), ranges)
            .unwrap();
        let diags = validate_config(&schema, &planned);
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[tokio::test]
    async fn failed_read_back_keeps_new_id() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/api/resources/asn-pools")
            .with_status(202)
            .with_body(r#"{"id": "pool-9"}"#)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/api/resources/asn-pools/pool-9")
            .with_status(404)
            .create_async()
            .await;

        let resource = RangePoolResource {
            kind: RangePoolKind::Asn,
            provider_data: Some(ApstraProviderData::new(
                crate::api::test_helpers::create_test_client(&server.url()),
            )),
        };
        let planned = config(&[(64512.0, 64600.0)]);
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "apstra_asn_pool".to_string(),
                    config: planned.clone(),
                    planned_state: planned,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "error reading new ASN Pool");
        assert_eq!(
            response.new_state.get_string(&id_path()).unwrap(),
            "pool-9"
        );
    }
}
