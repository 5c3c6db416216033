//! Provider trait and related types
//!
//! The provider owns configuration and hands factories for its resources and
//! data sources to the host. Whatever `configure` returns as provider data
//! is passed to every resource and data source `configure` call.

use crate::context::Context;
use crate::data_source::{ConfigureDataSourceRequest, DataSourceWithConfigure};
use crate::error::{Result, TfplugError};
use crate::resource::{ConfigureResourceRequest, ResourceWithConfigure};
use crate::schema::Schema;
use crate::types::{has_errors, ClientCapabilities, Diagnostic, DynamicValue, ServerCapabilities};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Creates a fresh, unconfigured resource instance
pub type ResourceFactory = Box<dyn Fn() -> Box<dyn ResourceWithConfigure> + Send + Sync>;

/// Creates a fresh, unconfigured data source instance
pub type DataSourceFactory = Box<dyn Fn() -> Box<dyn DataSourceWithConfigure> + Send + Sync>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider type name, the prefix of every resource type name
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse;

    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    async fn meta_schema(
        &self,
        ctx: Context,
        request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse;

    /// Called once with the provider block; MUST return the data resources
    /// and data sources need (API clients and such)
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    async fn validate(
        &self,
        ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse;

    async fn stop(&self, ctx: Context, request: StopProviderRequest) -> StopProviderResponse;

    /// Resource factories keyed by type name
    fn resources(&self) -> HashMap<String, ResourceFactory>;

    /// Data source factories keyed by type name
    fn data_sources(&self) -> HashMap<String, DataSourceFactory>;
}

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    pub type_name: String,
    pub server_capabilities: ServerCapabilities,
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ProviderMetaSchemaRequest;

pub struct ProviderMetaSchemaResponse {
    pub schema: Option<Schema>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
    pub client_capabilities: ClientCapabilities,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    pub provider_data: Option<ProviderData>,
}

pub struct ValidateProviderConfigRequest {
    pub config: DynamicValue,
}

pub struct ValidateProviderConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct StopProviderRequest;

pub struct StopProviderResponse {
    pub error: Option<String>,
}

/// Provider data handed to resources and data sources
pub type ProviderData = Arc<dyn Any + Send + Sync>;

/// Builds the named resource from the provider's factories and configures it.
pub async fn configured_resource(
    provider: &dyn Provider,
    ctx: Context,
    type_name: &str,
    provider_data: Option<ProviderData>,
) -> Result<Box<dyn ResourceWithConfigure>> {
    let factories = provider.resources();
    let factory = factories
        .get(type_name)
        .ok_or_else(|| TfplugError::ResourceNotFound(type_name.to_string()))?;
    let provider_data = provider_data.ok_or(TfplugError::ProviderNotConfigured)?;

    let mut resource = factory();
    let response = resource
        .configure(
            ctx,
            ConfigureResourceRequest {
                provider_data: Some(provider_data),
            },
        )
        .await;
    if has_errors(&response.diagnostics) {
        return Err(TfplugError::InvalidConfiguration(summaries(&response.diagnostics)));
    }
    Ok(resource)
}

/// Data source counterpart of [`configured_resource`].
pub async fn configured_data_source(
    provider: &dyn Provider,
    ctx: Context,
    type_name: &str,
    provider_data: Option<ProviderData>,
) -> Result<Box<dyn DataSourceWithConfigure>> {
    let factories = provider.data_sources();
    let factory = factories
        .get(type_name)
        .ok_or_else(|| TfplugError::DataSourceNotFound(type_name.to_string()))?;

    let mut data_source = factory();
    let response = data_source
        .configure(ctx, ConfigureDataSourceRequest { provider_data })
        .await;
    if has_errors(&response.diagnostics) {
        return Err(TfplugError::InvalidConfiguration(summaries(&response.diagnostics)));
    }
    Ok(data_source)
}

fn summaries(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.summary.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
