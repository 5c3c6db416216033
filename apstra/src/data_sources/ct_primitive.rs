//! Connectivity template primitive data sources
//!
//! These never call the API. Each one validates its configuration and
//! renders it into the computed `primitive` JSON string.

use crate::connectivity_template::Primitive;
use async_trait::async_trait;
use std::marker::PhantomData;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic};
use tfplug::validation::validate_config;

pub struct PrimitiveDataSource<P> {
    primitive: PhantomData<fn() -> P>,
}

impl<P: Primitive> PrimitiveDataSource<P> {
    pub fn new() -> Self {
        Self {
            primitive: PhantomData,
        }
    }

    pub fn schema_static() -> Schema {
        P::attributes()
            .into_iter()
            .fold(
                SchemaBuilder::new().version(0).description(P::DESCRIPTION),
                |builder, attribute| builder.attribute(attribute),
            )
            .build()
    }
}

impl<P: Primitive> Default for PrimitiveDataSource<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: Primitive> DataSource for PrimitiveDataSource<P> {
    fn type_name(&self) -> &str {
        P::DATA_SOURCE_TYPE
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
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: validate_config(&Self::schema_static(), &request.config),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let primitive = match P::from_config(&request.config).and_then(|p| p.marshal()) {
            Ok(primitive) => primitive,
            Err(diag) => return ReadDataSourceResponse::failed(vec![diag]),
        };

        let mut state = request.config;
        if let Err(e) = state.set_string(&AttributePath::new("primitive"), primitive) {
            return ReadDataSourceResponse::failed(vec![Diagnostic::error(
                "Failed to set primitive",
                e.to_string(),
            )]);
        }
        tracing::debug!(data_source = P::DATA_SOURCE_TYPE, "rendered primitive");

        ReadDataSourceResponse {
            state,
            diagnostics: vec![],
            deferred: None,
        }
    }
}

#[async_trait]
impl<P: Primitive> DataSourceWithConfigure for PrimitiveDataSource<P> {
    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        ConfigureDataSourceResponse {
            diagnostics: vec![],
        }
    }
}
