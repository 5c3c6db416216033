//! ASN, VNI and integer pool data sources

use super::{lookup, lookup_attributes, single_named, Lookup};
use crate::api::resources::RangePoolKind;
use crate::provider_data::{not_configured, ApstraProviderData};
use crate::resources::range_pool::pool_state;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, ObjectNestingMode, Schema, SchemaBuilder};
use tfplug::types::Diagnostic;
use tfplug::validation::validate_config;

pub struct RangePoolDataSource {
    kind: RangePoolKind,
    provider_data: Option<ApstraProviderData>,
}

impl RangePoolDataSource {
    pub fn new(kind: RangePoolKind) -> Self {
        Self {
            kind,
            provider_data: None,
        }
    }

    pub fn schema_static(kind: RangePoolKind) -> Schema {
        let noun = kind.display_name();
        let computed = |name: &str, attribute_type: AttributeType, description: String| {
            AttributeBuilder::new(name, attribute_type)
                .description(&description)
                .computed()
                .build()
        };

        let ranges = vec![
            computed("first", AttributeType::Number, format!("First {} in the range.", noun)),
            computed("last", AttributeType::Number, format!("Last {} in the range.", noun)),
            computed("total", AttributeType::Number, format!("Total number of {}s in the range.", noun)),
            computed("status", AttributeType::String, format!("Status of the {} range.", noun)),
            computed("used", AttributeType::Number, format!("Count of used {}s in the range.", noun)),
            computed(
                "used_percentage",
                AttributeType::Number,
                format!("Percent of used {}s in the range.", noun),
            ),
        ];

        let builder = lookup_attributes(&format!("{} Resource Pool", noun))
            .into_iter()
            .fold(
                SchemaBuilder::new().version(0).description(&format!(
                    "This data source provides details of a specific {} Resource Pool. \
                     Exactly one of `id` or `name` must be specified.",
                    noun
                )),
                |builder, attribute| builder.attribute(attribute),
            );
        builder
            .attribute(
                AttributeBuilder::nested("ranges", ObjectNestingMode::Set, ranges)
                    .description(&format!("Detailed info about individual {} Pool Ranges.", noun))
                    .computed()
                    .build(),
            )
            .attribute(computed("total", AttributeType::Number, format!("Total number of {}s in the pool.", noun)))
            .attribute(computed("status", AttributeType::String, format!("Status of the {} pool.", noun)))
            .attribute(computed("used", AttributeType::Number, format!("Count of used {}s in the pool.", noun)))
            .attribute(computed(
                "used_percentage",
                AttributeType::Number,
                format!("Percent of used {}s in the pool.", noun),
            ))
            .build()
    }
}

#[async_trait]
impl DataSource for RangePoolDataSource {
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
            schema: Self::schema_static(self.kind),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: validate_config(&Self::schema_static(self.kind), &request.config),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse::failed(vec![not_configured()]);
        };
        let lookup = match lookup(&request.config) {
            Ok(lookup) => lookup,
            Err(diag) => return ReadDataSourceResponse::failed(vec![diag]),
        };

        let noun = self.kind.display_name();
        let resources = provider_data.client.resources();
        let pool = match &lookup {
            Lookup::Id(id) => resources
                .get_range_pool(self.kind, id)
                .await
                .map_err(|e| e.to_string()),
            Lookup::Name(name) => match resources.range_pools_named(self.kind, name).await {
                Ok(found) => single_named(&format!("{} pool", noun), name, found),
                Err(e) => Err(e.to_string()),
            },
        };

        match pool {
            Ok(pool) => {
                tracing::debug!(pool = %pool.id, "read {} pool", noun);
                ReadDataSourceResponse {
                    state: pool_state(&pool),
                    diagnostics: vec![],
                    deferred: None,
                }
            }
            Err(e) => ReadDataSourceResponse::failed(vec![Diagnostic::error(
                format!("Error retrieving {} pool", noun),
                format!("cannot retrieve {} pool - {}", noun, e),
            )]),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for RangePoolDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        match ApstraProviderData::from_provider_data(request.provider_data) {
            Ok(provider_data) => {
                self.provider_data = Some(provider_data);
                ConfigureDataSourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureDataSourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::Server;
    use tfplug::types::{AttributePath, ClientCapabilities, Dynamic, DynamicValue};

    fn read_request(id: Dynamic, name: Dynamic) -> ReadDataSourceRequest {
        ReadDataSourceRequest {
            type_name: "apstra_asn_pool".to_string(),
            config: DynamicValue::new(Dynamic::object([("id", id), ("name", name)])),
            provider_meta: None,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    fn data_source(url: &str) -> RangePoolDataSource {
        RangePoolDataSource {
            kind: RangePoolKind::Asn,
            provider_data: Some(ApstraProviderData::new(create_test_client(url))),
        }
    }

    #[tokio::test]
    async fn read_by_name() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/api/resources/asn-pools")
            .with_status(200)
            .with_body(
                r#"{"items": [
                    {"id": "p-1", "display_name": "spines", "status": "in_use",
                     "total": 100, "used": 2, "used_percentage": 2.0,
                     "ranges": [{"first": 64512, "last": 64611, "total": 100, "used": 2,
                                 "used_percentage": 2.0, "status": "pool_element_in_use"}]},
                    {"id": "p-2", "display_name": "leafs"}
                ]}"#,
            )
            .create_async()
            .await;

        let response = data_source(&server.url())
            .read(Context::new(), read_request(Dynamic::Null, Dynamic::string("spines")))
            .await;
        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.state.get_string(&AttributePath::new("id")).unwrap(), "p-1");
        assert_eq!(
            response
                .state
                .get_number(&AttributePath::new("ranges").index(0).attribute("first"))
                .unwrap(),
            64512.0
        );
    }

    #[tokio::test]
    async fn read_missing_id_fails() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/resources/asn-pools/nope")
            .with_status(404)
            .with_body(r#"{"errors": "not found"}"#)
            .create_async()
            .await;

        let response = data_source(&server.url())
            .read(Context::new(), read_request(Dynamic::string("nope"), Dynamic::Null))
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Error retrieving ASN pool");
    }
}
