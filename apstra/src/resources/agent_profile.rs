//! Agent profile resource

use super::{id_path, modify_plan, state_with_id};
use crate::api::agent_profiles::{AgentProfile, AgentProfileRequest};
use crate::api::ApiError;
use crate::plan_modifiers::UseStateForUnknown;
use crate::provider_data::{not_configured, ApstraProviderData};
use crate::values;
use async_trait::async_trait;
use std::collections::HashMap;
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
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validation::validate_config;
use tfplug::validator::{SizeValidator, StringLengthValidator, StringOneOfValidator};

pub(crate) const PLATFORMS: [&str; 3] = ["nxos", "junos", "eos"];

#[derive(Default)]
pub struct AgentProfileResource {
    provider_data: Option<ApstraProviderData>,
}

impl AgentProfileResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description(
                "This resource creates an Agent Profile. Note that credentials (username/password) \
                 cannot be set using this resource because Apstra doesn't allow them to be \
                 retrieved, so drift could never be detected.",
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Apstra ID of the Agent Profile.")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Apstra name of the Agent Profile.")
                    .required()
                    .validator(StringLengthValidator::length_at_least(1))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("has_username", AttributeType::Bool)
                    .description("Indicates whether a username has been set.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("has_password", AttributeType::Bool)
                    .description("Indicates whether a password has been set.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("platform", AttributeType::String)
                    .description("Device platform.")
                    .optional()
                    .validator(StringOneOfValidator::new(PLATFORMS))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "packages",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                .description(
                    "Packages (name -> version) to be included with agents deployed using this profile.",
                )
                .optional()
                .validator(SizeValidator::size_at_least(1))
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "open_options",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                .description(
                    "Passes configured parameters to offbox agents. For example, to use HTTPS as the \
                     API connection from offbox agents to devices, use the key-value pair: \
                     proto-https - port-443.",
                )
                .optional()
                .validator(SizeValidator::size_at_least(1))
                .build(),
            )
            .build()
    }
}

fn profile_request(value: &DynamicValue) -> Result<AgentProfileRequest, Diagnostic> {
    let packages: HashMap<String, String> = values::string_map(value, &AttributePath::new("packages"))?
        .into_iter()
        .collect();
    Ok(AgentProfileRequest {
        label: values::required_string(value, &AttributePath::new("name"))?,
        platform: values::string(value, &AttributePath::new("platform"))?,
        packages: AgentProfileRequest::packages_from_map(&packages),
        open_options: values::string_map(value, &AttributePath::new("open_options"))?
            .into_iter()
            .collect(),
    })
}

fn string_map_or_null(map: HashMap<String, String>) -> Dynamic {
    if map.is_empty() {
        return Dynamic::Null;
    }
    Dynamic::Map(
        map.into_iter()
            .map(|(k, v)| (k, Dynamic::String(v)))
            .collect(),
    )
}

pub(crate) fn profile_state(profile: &AgentProfile) -> DynamicValue {
    let platform = profile
        .platform
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(Dynamic::string)
        .unwrap_or(Dynamic::Null);
    DynamicValue::new(Dynamic::object([
        ("id", Dynamic::string(profile.id.as_str())),
        ("name", Dynamic::string(profile.label.as_str())),
        ("has_username", Dynamic::Bool(profile.has_username)),
        ("has_password", Dynamic::Bool(profile.has_password)),
        ("platform", platform),
        ("packages", string_map_or_null(profile.package_map())),
        ("open_options", string_map_or_null(profile.open_options.clone())),
    ]))
}

#[async_trait]
impl Resource for AgentProfileResource {
    fn type_name(&self) -> &str {
        "apstra_agent_profile"
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
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: validate_config(&Self::schema_static(), &request.config),
        }
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
        let profile_request = match profile_request(&request.planned_state) {
            Ok(profile_request) => profile_request,
            Err(diag) => return failed(diag, request.planned_state),
        };

        let profiles = provider_data.client.agent_profiles();
        let id = match profiles.create(&profile_request).await {
            Ok(id) => id,
            Err(e) => {
                return failed(
                    Diagnostic::error(
                        "error creating new Agent Profile",
                        format!("Could not create, unexpected error: {}", e),
                    ),
                    request.planned_state,
                )
            }
        };
        tracing::info!("created agent profile {}", id);

        match profiles.get(&id).await {
            Ok(profile) => CreateResourceResponse {
                new_state: profile_state(&profile),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => {
                let state = state_with_id(request.planned_state, &id);
                failed(
                    Diagnostic::error(
                        "error reading Agent Profile",
                        format!("Could not Read '{}' - {}", id, e),
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

        match provider_data.client.agent_profiles().get(&id).await {
            Ok(profile) => ReadResourceResponse {
                new_state: Some(profile_state(&profile)),
                diagnostics: vec![],
                private: request.private,
                deferred: None,
            },
            Err(e) if e.is_not_found() => ReadResourceResponse::removed(request.private),
            Err(e) => {
                let diag = Diagnostic::error(
                    "error reading Agent Profile",
                    format!("Could not Read '{}' - {}", id, e),
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
        let profile_request = match profile_request(&request.planned_state) {
            Ok(profile_request) => profile_request,
            Err(diag) => return failed(diag, request.prior_state),
        };

        let update_failed = |e: ApiError| {
            Diagnostic::error(
                "error updating Agent Profile",
                format!("Could not Update '{}' - {}", id, e),
            )
        };
        let profiles = provider_data.client.agent_profiles();
        if let Err(e) = profiles.update(&id, &profile_request).await {
            return failed(update_failed(e), request.prior_state);
        }
        match profiles.get(&id).await {
            Ok(profile) => UpdateResourceResponse {
                new_state: profile_state(&profile),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => failed(update_failed(e), request.planned_state),
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

        match provider_data.client.agent_profiles().delete(&id).await {
            Ok(()) | Err(ApiError::NotFound(_)) => DeleteResourceResponse { diagnostics: vec![] },
            Err(e) => DeleteResourceResponse {
                diagnostics: vec![Diagnostic::error(
                    "error deleting Agent Profile",
                    format!("could not delete Agent Profile '{}' - {}", id, e),
                )],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for AgentProfileResource {
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
impl ResourceWithModifyPlan for AgentProfileResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        modify_plan(&Self::schema_static(), request)
    }
}

#[async_trait]
impl ResourceWithImportState for AgentProfileResource {
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
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    fn plan() -> DynamicValue {
        DynamicValue::new(Dynamic::object([
            ("id", Dynamic::Unknown),
            ("name", Dynamic::string("junos")),
            ("has_username", Dynamic::Unknown),
            ("has_password", Dynamic::Unknown),
            ("platform", Dynamic::string("junos")),
            (
                "packages",
                Dynamic::object([("telemetry", Dynamic::string("1.2"))]),
            ),
            ("open_options", Dynamic::Null),
        ]))
    }

    #[test]
    fn packages_are_sent_as_name_version() {
        let request = profile_request(&plan()).unwrap();
        assert_eq!(request.label, "junos");
        assert_eq!(request.platform.as_deref(), Some("junos"));
        assert_eq!(request.packages, vec!["telemetry==1.2".to_string()]);
        assert!(request.open_options.is_empty());
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let mut config = plan();
        for name in ["id", "has_username", "has_password"] {
            config.set_null(&AttributePath::new(name)).unwrap();
        }
        config
            .set_string(&AttributePath::new("platform"), "ios".to_string())
            .unwrap();
        let diags = validate_config(&AgentProfileResource::schema_static(), &config);
        assert_eq!(diags.len(), 1, "{:?}", diags);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("platform")));
    }

    #[tokio::test]
    async fn create_reads_back_profile() {
        let mut server = Server::new_async().await;
        let created = server
            .mock("POST", "/api/system-agent-profiles")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "label": "junos",
                "platform": "junos",
                "packages": ["telemetry==1.2"]
            })))
            .with_status(201)
            .with_body(r#"{"id": "prof-1"}"#)
            .create_async()
            .await;
        let _read = server
            .mock("GET", "/api/system-agent-profiles/prof-1")
            .with_status(200)
            .with_body(
                r#"{"id": "prof-1", "label": "junos", "platform": "junos",
                    "packages": ["telemetry==1.2"], "has_username": true}"#,
            )
            .create_async()
            .await;

        let resource = AgentProfileResource {
            provider_data: Some(ApstraProviderData::new(create_test_client(&server.url()))),
        };
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "apstra_agent_profile".to_string(),
                    planned_state: plan(),
                    config: plan(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;
        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        created.assert_async().await;

        let state = response.new_state;
        assert_eq!(state.get_string(&id_path()).unwrap(), "prof-1");
        assert!(state.get_bool(&AttributePath::new("has_username")).unwrap());
        assert!(!state.get_bool(&AttributePath::new("has_password")).unwrap());
        assert_eq!(
            state.get_string(&AttributePath::new("packages").key("telemetry")).unwrap(),
            "1.2"
        );
        assert!(state.get(&AttributePath::new("open_options")).is_null());
    }
}
