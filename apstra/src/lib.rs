//! Terraform provider for Juniper Apstra

pub mod api;
pub mod connectivity_template;
pub mod data_sources;
pub mod logging;
pub mod plan_modifiers;
pub mod provider_data;
pub mod resources;
pub mod validators;
mod values;

use crate::api::resources::{IpPoolFamily, RangePoolKind};
use crate::connectivity_template::{
    BgpPeeringGenericSystem, BgpPeeringIpEndpoint, CustomStaticRoute, DynamicBgpPeering, IpLink,
    RoutingPolicy, RoutingZoneConstraint, StaticRoute, VnMultiple, VnSingle,
};
use crate::data_sources::{
    AgentProfileDataSource, IpPoolDataSource, PrimitiveDataSource, RangePoolDataSource,
};
use crate::provider_data::ApstraProviderData;
use crate::resources::{
    AgentProfileResource, DatacenterConnectivityTemplateResource, IpPoolResource,
    ManagedDeviceResource, RangePoolResource,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{DataSource, DataSourceWithConfigure};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider, ProviderData,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::{Resource, ResourceWithConfigure};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{has_errors, AttributePath, Diagnostic, DynamicValue, ServerCapabilities};
use tfplug::validation::validate_config;

pub const ENV_URL: &str = "APSTRA_URL";
pub const ENV_USER: &str = "APSTRA_USER";
pub const ENV_PASS: &str = "APSTRA_PASS";

#[derive(Default)]
pub struct ApstraProvider;

impl ApstraProvider {
    pub fn new() -> Self {
        logging::init();
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Provider for Juniper Apstra.")
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description(&format!(
                        "URL of the Apstra server, e.g. `https://<user>:<password>@apstra.example.com:443/`. \
                         Credentials missing from the URL are read from the `{}` and `{}` environment \
                         variables. Falls back to `{}` when omitted.",
                        ENV_USER, ENV_PASS, ENV_URL
                    ))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tls_validation_disabled", AttributeType::Bool)
                    .description("Set 'true' to disable TLS certificate validation.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("blueprint_mutex_disabled", AttributeType::Bool)
                    .description(
                        "Blueprint mutexes serialize changes made by concurrent Terraform runs. \
                         Set 'true' to skip locking.",
                    )
                    .optional()
                    .build(),
            )
            .build()
    }
}

/// Connection settings after config and environment are merged
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub url: String,
    pub username: String,
    pub password: String,
    pub tls_validation_disabled: bool,
    pub blueprint_mutex_disabled: bool,
}

fn config_string(config: &DynamicValue, name: &str) -> Result<Option<String>, Diagnostic> {
    values::string(config, &AttributePath::new(name))
}

fn config_bool(config: &DynamicValue, name: &str) -> Result<bool, Diagnostic> {
    Ok(values::boolean(config, &AttributePath::new(name))?.unwrap_or(false))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Merges the provider block with the environment. Credentials embedded in
/// the URL win over the environment, and are removed from the returned URL.
pub fn connection_settings(config: &DynamicValue) -> Result<ConnectionSettings, Vec<Diagnostic>> {
    let raw_url = config_string(config, "url")
        .map_err(|d| vec![d])?
        .or_else(|| env_var(ENV_URL));
    let tls_validation_disabled =
        config_bool(config, "tls_validation_disabled").map_err(|d| vec![d])?;
    let blueprint_mutex_disabled =
        config_bool(config, "blueprint_mutex_disabled").map_err(|d| vec![d])?;

    let Some(raw_url) = raw_url else {
        return Err(vec![Diagnostic::attribute_error(
            &AttributePath::new("url"),
            "Missing Apstra URL",
            format!(
                "the Apstra URL must be set in the provider configuration or the {} environment variable",
                ENV_URL
            ),
        )]);
    };

    let mut url = url::Url::parse(&raw_url).map_err(|e| {
        vec![Diagnostic::attribute_error(
            &AttributePath::new("url"),
            "Invalid Apstra URL",
            format!("error parsing URL '{}' - {}", raw_url, e),
        )]
    })?;

    let decode = |s: &str| {
        urlencoding::decode(s)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| s.to_string())
    };
    let username = Some(url.username())
        .filter(|u| !u.is_empty())
        .map(decode)
        .or_else(|| env_var(ENV_USER));
    let password = url.password().map(decode).or_else(|| env_var(ENV_PASS));

    // credentials never reach the client's base URL
    if url.set_username("").is_err() || url.set_password(None).is_err() {
        return Err(vec![Diagnostic::attribute_error(
            &AttributePath::new("url"),
            "Invalid Apstra URL",
            format!("URL '{}' cannot carry credentials", url),
        )]);
    }

    let mut diagnostics = vec![];
    if username.is_none() {
        diagnostics.push(Diagnostic::error(
            "Missing Apstra username",
            format!(
                "the username must be embedded in the URL or set in the {} environment variable",
                ENV_USER
            ),
        ));
    }
    if password.is_none() {
        diagnostics.push(Diagnostic::error(
            "Missing Apstra password",
            format!(
                "the password must be embedded in the URL or set in the {} environment variable",
                ENV_PASS
            ),
        ));
    }

    match (username, password) {
        (Some(username), Some(password)) => Ok(ConnectionSettings {
            url: url.to_string(),
            username,
            password,
            tls_validation_disabled,
            blueprint_mutex_disabled,
        }),
        _ => Err(diagnostics),
    }
}

fn register_resource<R, F>(factories: &mut HashMap<String, ResourceFactory>, factory: F)
where
    R: ResourceWithConfigure + 'static,
    F: Fn() -> R + Send + Sync + 'static,
{
    let type_name = factory().type_name().to_string();
    factories.insert(
        type_name,
        Box::new(move || Box::new(factory()) as Box<dyn ResourceWithConfigure>),
    );
}

fn register_data_source<D, F>(factories: &mut HashMap<String, DataSourceFactory>, factory: F)
where
    D: DataSourceWithConfigure + 'static,
    F: Fn() -> D + Send + Sync + 'static,
{
    let type_name = factory().type_name().to_string();
    factories.insert(
        type_name,
        Box::new(move || Box::new(factory()) as Box<dyn DataSourceWithConfigure>),
    );
}

#[async_trait]
impl Provider for ApstraProvider {
    fn type_name(&self) -> &str {
        "apstra"
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

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::schema_static(),
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
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let failed = |diagnostics: Vec<Diagnostic>| ConfigureProviderResponse {
            diagnostics,
            provider_data: None,
        };

        let schema_diags = validate_config(&Self::schema_static(), &request.config);
        if has_errors(&schema_diags) {
            return failed(schema_diags);
        }

        let settings = match connection_settings(&request.config) {
            Ok(settings) => settings,
            Err(diagnostics) => return failed(diagnostics),
        };
        if settings.blueprint_mutex_disabled {
            tracing::info!("blueprint mutexes disabled");
        }

        let client = match api::Client::new(
            &settings.url,
            &settings.username,
            &settings.password,
            settings.tls_validation_disabled,
        ) {
            Ok(client) => client,
            Err(e) => {
                return failed(vec![Diagnostic::error(
                    "Failed to create API client",
                    e.to_string(),
                )])
            }
        };

        if let Err(e) = client.login().await {
            return failed(vec![Diagnostic::error(
                "Error logging in to Apstra",
                format!("login to {} failed - {}", settings.url, e),
            )]);
        }

        tracing::info!(url = %settings.url, "provider configured");
        let provider_data: ProviderData = Arc::new(ApstraProviderData::new(client));
        ConfigureProviderResponse {
            diagnostics: schema_diags,
            provider_data: Some(provider_data),
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: validate_config(&Self::schema_static(), &request.config),
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories = HashMap::new();
        register_resource(&mut factories, RangePoolResource::asn);
        register_resource(&mut factories, RangePoolResource::vni);
        register_resource(&mut factories, RangePoolResource::integer);
        register_resource(&mut factories, IpPoolResource::ipv4);
        register_resource(&mut factories, IpPoolResource::ipv6);
        register_resource(&mut factories, AgentProfileResource::new);
        register_resource(&mut factories, ManagedDeviceResource::new);
        register_resource(&mut factories, DatacenterConnectivityTemplateResource::new);
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories = HashMap::new();
        register_data_source(&mut factories, || RangePoolDataSource::new(RangePoolKind::Asn));
        register_data_source(&mut factories, || RangePoolDataSource::new(RangePoolKind::Vni));
        register_data_source(&mut factories, || {
            RangePoolDataSource::new(RangePoolKind::Integer)
        });
        register_data_source(&mut factories, || IpPoolDataSource::new(IpPoolFamily::V4));
        register_data_source(&mut factories, || IpPoolDataSource::new(IpPoolFamily::V6));
        register_data_source(&mut factories, AgentProfileDataSource::new);

        register_data_source(&mut factories, PrimitiveDataSource::<VnSingle>::new);
        register_data_source(&mut factories, PrimitiveDataSource::<VnMultiple>::new);
        register_data_source(&mut factories, PrimitiveDataSource::<IpLink>::new);
        register_data_source(&mut factories, PrimitiveDataSource::<BgpPeeringGenericSystem>::new);
        register_data_source(&mut factories, PrimitiveDataSource::<BgpPeeringIpEndpoint>::new);
        register_data_source(&mut factories, PrimitiveDataSource::<DynamicBgpPeering>::new);
        register_data_source(&mut factories, PrimitiveDataSource::<StaticRoute>::new);
        register_data_source(&mut factories, PrimitiveDataSource::<CustomStaticRoute>::new);
        register_data_source(&mut factories, PrimitiveDataSource::<RoutingPolicy>::new);
        register_data_source(&mut factories, PrimitiveDataSource::<RoutingZoneConstraint>::new);
        factories
    }
}
