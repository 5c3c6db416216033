//! Agent profile data source

use super::{lookup, lookup_attributes, single_named, Lookup};
use crate::provider_data::{not_configured, ApstraProviderData};
use crate::resources::agent_profile::profile_state;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::Diagnostic;
use tfplug::validation::validate_config;

#[derive(Default)]
pub struct AgentProfileDataSource {
    provider_data: Option<ApstraProviderData>,
}

impl AgentProfileDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        lookup_attributes("Agent Profile")
            .into_iter()
            .fold(
                SchemaBuilder::new().version(0).description(
                    "This data source looks up details of an Agent Profile using either its name \
                     (Apstra ensures these are unique), or its ID (but not both).",
                ),
                |builder, attribute| builder.attribute(attribute),
            )
            .attribute(
                AttributeBuilder::new("platform", AttributeType::String)
                    .description("Indicates the platform supported by the Agent Profile.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("has_username", AttributeType::Bool)
                    .description("Indicates whether a username has been configured.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("has_password", AttributeType::Bool)
                    .description("Indicates whether a password has been configured.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "packages",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                .description("Admin-provided software packages stored on the Apstra server.")
                .computed()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "open_options",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                .description("Configured parameters for offbox agents")
                .computed()
                .build(),
            )
            .build()
    }
}

#[async_trait]
impl DataSource for AgentProfileDataSource {
    fn type_name(&self) -> &str {
        "apstra_agent_profile"
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
        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse::failed(vec![not_configured()]);
        };
        let lookup = match lookup(&request.config) {
            Ok(lookup) => lookup,
            Err(diag) => return ReadDataSourceResponse::failed(vec![diag]),
        };

        let profiles = provider_data.client.agent_profiles();
        let profile = match &lookup {
            Lookup::Id(id) => profiles.get(id).await.map_err(|e| e.to_string()),
            Lookup::Name(name) => match profiles.named(name).await {
                Ok(found) => single_named("Agent Profile", name, found),
                Err(e) => Err(e.to_string()),
            },
        };

        match profile {
            Ok(profile) => ReadDataSourceResponse {
                state: profile_state(&profile),
                diagnostics: vec![],
                deferred: None,
            },
            Err(e) => ReadDataSourceResponse::failed(vec![Diagnostic::error(
                "Error retrieving Agent Profile",
                e,
            )]),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for AgentProfileDataSource {
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

    #[tokio::test]
    async fn read_by_name() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/api/system-agent-profiles")
            .with_status(200)
            .with_body(
                r#"{"items": [
                    {"id": "prof-1", "label": "eos", "platform": "eos", "has_username": true,
                     "has_password": true, "open_options": {"proto": "https"}},
                    {"id": "prof-2", "label": "junos"}
                ]}"#,
            )
            .create_async()
            .await;

        let data_source = AgentProfileDataSource {
            provider_data: Some(ApstraProviderData::new(create_test_client(&server.url()))),
        };
        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "apstra_agent_profile".to_string(),
                    config: DynamicValue::new(Dynamic::object([
                        ("id", Dynamic::Null),
                        ("name", Dynamic::string("eos")),
                    ])),
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "prof-1");
        assert_eq!(state.get_string(&AttributePath::new("platform")).unwrap(), "eos");
        assert_eq!(
            state
                .get_string(&AttributePath::new("open_options").key("proto"))
                .unwrap(),
            "https"
        );
        assert!(state.get(&AttributePath::new("packages")).is_null());
    }

    #[tokio::test]
    async fn unconfigured_read_fails() {
        let response = AgentProfileDataSource::new()
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "apstra_agent_profile".to_string(),
                    config: DynamicValue::empty_object(),
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }
}
