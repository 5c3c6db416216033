//! End-to-end exercise of the provider traits with an in-memory backend

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{plan_attributes, RequiresReplace, UseStateForUnknown};
use tfplug::provider::{
    configured_data_source, configured_resource, ConfigureProviderRequest,
    ConfigureProviderResponse, DataSourceFactory, Provider, ProviderMetaSchemaRequest,
    ProviderMetaSchemaResponse, ProviderMetadataRequest, ProviderMetadataResponse,
    ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory, StopProviderRequest,
    StopProviderResponse, ValidateProviderConfigRequest, ValidateProviderConfigResponse,
};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{
    AttributePath, ClientCapabilities, Diagnostic, Dynamic, DynamicValue, ServerCapabilities,
};
use tfplug::validation::validate_config;
use tfplug::validator::{NumberRangeValidator, StringLengthValidator};
use tfplug::TfplugError;

#[derive(Default)]
struct Backend {
    pools: RwLock<HashMap<String, (String, f64)>>,
    next_id: AtomicUsize,
}

struct PoolProvider {
    backend: Option<Arc<Backend>>,
}

#[async_trait]
impl Provider for PoolProvider {
    fn type_name(&self) -> &str {
        "memory"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new().build(),
            diagnostics: vec![],
        }
    }

    async fn meta_schema(
        &self,
        _ctx: Context,
        _request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse {
        ProviderMetaSchemaResponse {
            schema: None,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let backend = Arc::new(Backend::default());
        self.backend = Some(backend.clone());
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(backend),
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            "memory_pool".to_string(),
            Box::new(|| Box::new(PoolResource::default())),
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
        data_sources.insert(
            "memory_pool_count".to_string(),
            Box::new(|| Box::new(PoolCountDataSource::default())),
        );
        data_sources
    }
}

fn pool_schema() -> Schema {
    SchemaBuilder::new()
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown)
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .validator(StringLengthValidator::length_at_least(1))
                .plan_modifier(RequiresReplace)
                .build(),
        )
        .attribute(
            AttributeBuilder::new("size", AttributeType::Number)
                .optional()
                .computed()
                .validator(NumberRangeValidator::between(1.0, 100.0))
                .default(StaticDefault::number(10.0))
                .build(),
        )
        .build()
}

#[derive(Default)]
struct PoolResource {
    backend: Option<Arc<Backend>>,
}

impl PoolResource {
    fn backend(&self) -> Result<&Arc<Backend>, Diagnostic> {
        self.backend.as_ref().ok_or_else(|| {
            Diagnostic::error("Provider not configured", "No backend was configured")
        })
    }
}

#[async_trait]
impl Resource for PoolResource {
    fn type_name(&self) -> &str {
        "memory_pool"
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
            schema: pool_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: validate_config(&pool_schema(), &request.config),
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let backend = match self.backend() {
            Ok(backend) => backend,
            Err(diag) => {
                return CreateResourceResponse {
                    new_state: state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let id = format!("pool-{}", backend.next_id.fetch_add(1, Ordering::SeqCst));
        let name = state.get_string(&AttributePath::new("name")).unwrap();
        let size = state.get_number(&AttributePath::new("size")).unwrap();
        backend
            .pools
            .write()
            .await
            .insert(id.clone(), (name, size));
        state.set_string(&AttributePath::new("id"), id).unwrap();

        CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let id = request
            .current_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        let found = self
            .backend()
            .unwrap()
            .pools
            .read()
            .await
            .get(&id)
            .cloned();

        let new_state = found.map(|(name, size)| {
            let mut state = request.current_state.clone();
            state.set_string(&AttributePath::new("name"), name).unwrap();
            state.set_number(&AttributePath::new("size"), size).unwrap();
            state
        });
        ReadResourceResponse {
            new_state,
            diagnostics: vec![],
            private: request.private,
            deferred: None,
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        let size = request
            .planned_state
            .get_number(&AttributePath::new("size"))
            .unwrap();
        if let Some(pool) = self.backend().unwrap().pools.write().await.get_mut(&id) {
            pool.1 = size;
        }
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        self.backend().unwrap().pools.write().await.remove(&id);
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for PoolResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match request
            .provider_data
            .and_then(|data| data.downcast::<Backend>().ok())
        {
            Some(backend) => self.backend = Some(backend),
            None => diagnostics.push(Diagnostic::error(
                "Invalid provider data",
                "Expected the in-memory backend",
            )),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[derive(Default)]
struct PoolCountDataSource {
    backend: Option<Arc<Backend>>,
}

#[async_trait]
impl DataSource for PoolCountDataSource {
    fn type_name(&self) -> &str {
        "memory_pool_count"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("count", AttributeType::Number)
                        .computed()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(backend) = &self.backend else {
            return ReadDataSourceResponse::failed(vec![Diagnostic::error(
                "Provider not configured",
                "No backend was configured",
            )]);
        };
        let count = backend.pools.read().await.len();
        let mut state = DynamicValue::empty_object();
        state
            .set_number(&AttributePath::new("count"), count as f64)
            .unwrap();
        ReadDataSourceResponse {
            state,
            diagnostics: vec![],
            deferred: None,
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for PoolCountDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        self.backend = request
            .provider_data
            .and_then(|data| data.downcast::<Backend>().ok());
        ConfigureDataSourceResponse {
            diagnostics: vec![],
        }
    }
}

async fn configured_provider() -> (PoolProvider, ConfigureProviderResponse) {
    let mut provider = PoolProvider { backend: None };
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: DynamicValue::empty_object(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    (provider, response)
}

fn config(name: &str, size: Option<f64>) -> DynamicValue {
    DynamicValue::new(Dynamic::object([
        ("id", Dynamic::Null),
        ("name", Dynamic::string(name)),
        ("size", size.map(Dynamic::Number).unwrap_or(Dynamic::Null)),
    ]))
}

#[tokio::test]
async fn resource_lifecycle_through_factories() {
    let (provider, configured) = configured_provider().await;
    let resource = configured_resource(
        &provider,
        Context::new(),
        "memory_pool",
        configured.provider_data.clone(),
    )
    .await
    .unwrap();

    let cfg = config("blue", None);
    let validated = resource
        .validate(
            Context::new(),
            ValidateResourceConfigRequest {
                type_name: "memory_pool".to_string(),
                config: cfg.clone(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(validated.diagnostics.is_empty());

    let plan = plan_attributes(&pool_schema(), &cfg, &DynamicValue::null(), &cfg);
    assert!(plan.diagnostics.is_empty());
    assert!(plan.planned_state.get(&AttributePath::new("id")).is_unknown());
    assert_eq!(
        plan.planned_state.get(&AttributePath::new("size")),
        Dynamic::Number(10.0)
    );

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "memory_pool".to_string(),
                planned_state: plan.planned_state,
                config: cfg,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty());
    assert_eq!(
        created
            .new_state
            .get_string(&AttributePath::new("id"))
            .unwrap(),
        "pool-0"
    );

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "memory_pool".to_string(),
                current_state: created.new_state.clone(),
                private: vec![],
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert_eq!(read.new_state.as_ref(), Some(&created.new_state));

    resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "memory_pool".to_string(),
                prior_state: created.new_state.clone(),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    let gone = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "memory_pool".to_string(),
                current_state: created.new_state,
                private: vec![],
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(gone.new_state.is_none());
}

#[tokio::test]
async fn renaming_requires_replacement_and_keeps_id() {
    let prior = DynamicValue::new(Dynamic::object([
        ("id", Dynamic::string("pool-7")),
        ("name", Dynamic::string("blue")),
        ("size", Dynamic::Number(10.0)),
    ]));
    let cfg = config("green", Some(20.0));
    let mut proposed = cfg.clone();
    proposed
        .set_string(&AttributePath::new("id"), "pool-7".to_string())
        .unwrap();

    let plan = plan_attributes(&pool_schema(), &cfg, &prior, &proposed);
    assert_eq!(plan.requires_replace, vec![AttributePath::new("name")]);
    assert_eq!(
        plan.planned_state.get_string(&AttributePath::new("id")).unwrap(),
        "pool-7"
    );
}

#[tokio::test]
async fn validation_reports_every_invalid_attribute() {
    let (provider, configured) = configured_provider().await;
    let resource = configured_resource(
        &provider,
        Context::new(),
        "memory_pool",
        configured.provider_data,
    )
    .await
    .unwrap();

    let response = resource
        .validate(
            Context::new(),
            ValidateResourceConfigRequest {
                type_name: "memory_pool".to_string(),
                config: config("", Some(500.0)),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;

    let paths: Vec<String> = response
        .diagnostics
        .iter()
        .filter_map(|d| d.attribute.as_ref().map(ToString::to_string))
        .collect();
    assert_eq!(paths, vec!["name", "size"]);
}

#[tokio::test]
async fn concurrent_creates_share_one_backend() {
    let (provider, configured) = configured_provider().await;
    let resource: Arc<dyn ResourceWithConfigure> = configured_resource(
        &provider,
        Context::new(),
        "memory_pool",
        configured.provider_data.clone(),
    )
    .await
    .unwrap()
    .into();

    let creates = (0..8).map(|i| {
        let resource = resource.clone();
        async move {
            let cfg = config(&format!("pool{}", i), Some(5.0));
            resource
                .create(
                    Context::new(),
                    CreateResourceRequest {
                        type_name: "memory_pool".to_string(),
                        planned_state: cfg.clone(),
                        config: cfg,
                        planned_private: vec![],
                        provider_meta: None,
                    },
                )
                .await
        }
    });
    let responses = futures::future::join_all(creates).await;
    assert!(responses.iter().all(|r| r.diagnostics.is_empty()));

    let count = configured_data_source(
        &provider,
        Context::new(),
        "memory_pool_count",
        configured.provider_data,
    )
    .await
    .unwrap()
    .read(
        Context::new(),
        ReadDataSourceRequest {
            type_name: "memory_pool_count".to_string(),
            config: DynamicValue::empty_object(),
            provider_meta: None,
            client_capabilities: ClientCapabilities::default(),
        },
    )
    .await;
    assert_eq!(
        count.state.get_number(&AttributePath::new("count")).unwrap(),
        8.0
    );
    assert!(provider.backend.is_some());
}

#[tokio::test]
async fn factories_reject_unknown_types_and_missing_configuration() {
    let (provider, configured) = configured_provider().await;

    let unknown = configured_resource(
        &provider,
        Context::new(),
        "memory_nothing",
        configured.provider_data.clone(),
    )
    .await;
    assert!(matches!(unknown, Err(TfplugError::ResourceNotFound(_))));

    let unconfigured = configured_resource(&provider, Context::new(), "memory_pool", None).await;
    assert!(matches!(unconfigured, Err(TfplugError::ProviderNotConfigured)));

    let wrong_data: Arc<dyn std::any::Any + Send + Sync> = Arc::new(42u8);
    let invalid =
        configured_resource(&provider, Context::new(), "memory_pool", Some(wrong_data)).await;
    assert!(matches!(invalid, Err(TfplugError::InvalidConfiguration(_))));

    let missing = configured_data_source(&provider, Context::new(), "memory_nope", None).await;
    assert!(matches!(missing, Err(TfplugError::DataSourceNotFound(_))));
}
