//! IPv4 and IPv6 pool data sources

use super::{lookup, lookup_attributes, single_named, Lookup};
use crate::api::resources::IpPoolFamily;
use crate::provider_data::{not_configured, ApstraProviderData};
use crate::resources::ip_pool::pool_state;
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

pub struct IpPoolDataSource {
    family: IpPoolFamily,
    provider_data: Option<ApstraProviderData>,
}

impl IpPoolDataSource {
    pub fn new(family: IpPoolFamily) -> Self {
        Self {
            family,
            provider_data: None,
        }
    }

    pub fn schema_static(family: IpPoolFamily) -> Schema {
        let noun = family.display_name();
        let computed = |name: &str, attribute_type: AttributeType, description: String| {
            AttributeBuilder::new(name, attribute_type)
                .description(&description)
                .computed()
                .build()
        };

        let subnets = vec![
            computed("network", AttributeType::String, "Network specification in CIDR syntax.".to_string()),
            computed("status", AttributeType::String, format!("Status of the {} subnet.", noun)),
            computed("total", AttributeType::Number, "Total number of addresses in this subnet.".to_string()),
            computed("used", AttributeType::Number, "Count of used addresses in this subnet.".to_string()),
            computed(
                "used_percentage",
                AttributeType::Number,
                "Percent of used addresses in this subnet.".to_string(),
            ),
        ];

        lookup_attributes(&format!("{} Resource Pool", noun))
            .into_iter()
            .fold(
                SchemaBuilder::new().version(0).description(&format!(
                    "This data source provides details of a single {} Resource Pool. \
                     Exactly one of `id` or `name` must be specified.",
                    noun
                )),
                |builder, attribute| builder.attribute(attribute),
            )
            .attribute(
                AttributeBuilder::nested("subnets", ObjectNestingMode::Set, subnets)
                    .description(&format!("Detailed info about individual {} subnets.", noun))
                    .computed()
                    .build(),
            )
            .attribute(computed("status", AttributeType::String, format!("Status of the {} resource pool.", noun)))
            .attribute(computed(
                "total",
                AttributeType::Number,
                format!("Total number of addresses in the {} resource pool.", noun),
            ))
            .attribute(computed(
                "used",
                AttributeType::Number,
                format!("Count of used addresses in the {} resource pool.", noun),
            ))
            .attribute(computed(
                "used_percentage",
                AttributeType::Number,
                format!("Percent of used addresses in the {} resource pool.", noun),
            ))
            .build()
    }
}

#[async_trait]
impl DataSource for IpPoolDataSource {
    fn type_name(&self) -> &str {
        match self.family {
            IpPoolFamily::V4 => "apstra_ipv4_pool",
            IpPoolFamily::V6 => "apstra_ipv6_pool",
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
            schema: Self::schema_static(self.family),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: validate_config(&Self::schema_static(self.family), &request.config),
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

        let noun = self.family.display_name();
        let resources = provider_data.client.resources();
        let pool = match &lookup {
            Lookup::Id(id) => resources
                .get_ip_pool(self.family, id)
                .await
                .map_err(|e| e.to_string()),
            Lookup::Name(name) => match resources.ip_pools_named(self.family, name).await {
                Ok(found) => single_named(&format!("{} pool", noun), name, found),
                Err(e) => Err(e.to_string()),
            },
        };

        match pool {
            Ok(pool) => ReadDataSourceResponse {
                state: pool_state(&pool),
                diagnostics: vec![],
                deferred: None,
            },
            Err(e) => ReadDataSourceResponse::failed(vec![Diagnostic::error(
                format!("Error retrieving {} pool", noun),
                format!("cannot retrieve {} pool - {}", noun, e),
            )]),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for IpPoolDataSource {
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
