//! Managed device resource
//!
//! Creates and installs a system agent for a switch. When `device_key` is
//! configured, the system discovered by the agent is checked against it
//! and acknowledged.

use super::modify_plan;
use crate::api::system_agents::{AgentType, JobOperation, SystemAgent, SystemAgentRequest};
use crate::api::systems::SystemUserConfig;
use crate::api::{ApiError, Client};
use crate::plan_modifiers::{RequiresReplace, UseStateForUnknown};
use crate::provider_data::{not_configured, ApstraProviderData};
use crate::validators::ParseIp;
use crate::values;
use async_trait::async_trait;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceMetadataRequest, ResourceMetadataResponse, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceWithConfigure, ResourceWithModifyPlan, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{has_errors, AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validation::validate_config;
use tfplug::validator::StringLengthValidator;

const INSTALL_POLL_INTERVAL: Duration = Duration::from_secs(1);
const INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Default)]
pub struct ManagedDeviceResource {
    provider_data: Option<ApstraProviderData>,
}

/// Values read from plan or state
#[derive(Debug, Clone, PartialEq)]
struct ManagedDeviceModel {
    agent_id: Option<String>,
    system_id: Option<String>,
    management_ip: String,
    device_key: Option<String>,
    agent_profile_id: String,
    off_box: Option<bool>,
}

impl ManagedDeviceModel {
    fn from_value(value: &DynamicValue) -> Result<Self, Diagnostic> {
        Ok(Self {
            agent_id: values::string(value, &AttributePath::new("agent_id"))?,
            system_id: values::string(value, &AttributePath::new("system_id"))?,
            management_ip: values::required_string(value, &AttributePath::new("management_ip"))?,
            device_key: values::string(value, &AttributePath::new("device_key"))?,
            agent_profile_id: values::required_string(
                value,
                &AttributePath::new("agent_profile_id"),
            )?,
            off_box: values::boolean(value, &AttributePath::new("off_box"))?,
        })
    }

    fn from_agent(agent: &SystemAgent, device_key: Option<String>) -> Self {
        Self {
            agent_id: Some(agent.id.clone()),
            system_id: agent.status.system_id.clone(),
            management_ip: agent.management_ip.clone(),
            device_key,
            agent_profile_id: agent.profile.clone().unwrap_or_default(),
            off_box: Some(agent.agent_type.is_off_box()),
        }
    }

    fn to_state(&self) -> DynamicValue {
        DynamicValue::new(Dynamic::object([
            ("agent_id", values::optional_string(&self.agent_id)),
            ("system_id", values::optional_string(&self.system_id)),
            ("management_ip", Dynamic::string(self.management_ip.as_str())),
            ("device_key", values::optional_string(&self.device_key)),
            (
                "agent_profile_id",
                Dynamic::string(self.agent_profile_id.as_str()),
            ),
            ("off_box", self.off_box.into()),
        ]))
    }

    fn required_agent_id(&self) -> Result<&str, Diagnostic> {
        self.agent_id.as_deref().ok_or_else(|| {
            Diagnostic::attribute_error(
                &AttributePath::new("agent_id"),
                "Missing agent_id",
                "The managed device state has no agent ID",
            )
        })
    }
}

impl ManagedDeviceResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description(
                "This resource creates/installs an Agent for an Apstra Managed Device. \
                 Optionally, it will 'Acknowledge' the discovered system if the `device_key` \
                 (serial number) reported by the agent matches the optional `device_key` field.",
            )
            .attribute(
                AttributeBuilder::new("agent_id", AttributeType::String)
                    .description("Apstra ID for the Managed Device Agent.")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("system_id", AttributeType::String)
                    .description("Apstra ID for the System onboarded by the Managed Device Agent.")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("management_ip", AttributeType::String)
                    .description("Management IP address of the system.")
                    .required()
                    .validator(ParseIp::new(false, false))
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("device_key", AttributeType::String)
                    .description(
                        "Key which uniquely identifies a System asset. Possibly a MAC address or serial number.",
                    )
                    .optional()
                    .validator(StringLengthValidator::length_at_least(1))
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("agent_profile_id", AttributeType::String)
                    .description(
                        "ID of the Agent Profile used when instantiating the Agent. An Agent Profile \
                         is required to specify the login credentials and platform type.",
                    )
                    .required()
                    .validator(StringLengthValidator::length_at_least(1))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("off_box", AttributeType::Bool)
                    .description(
                        "Indicates that an 'Offbox' agent should be created (required for Junos devices)",
                    )
                    .optional()
                    .computed()
                    .plan_modifier(RequiresReplace)
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .build()
    }
}

/// The agent profile must exist and carry credentials and a platform,
/// otherwise the agent cannot log in to the device.
async fn validate_agent_profile(client: &Client, profile_id: &str) -> Vec<Diagnostic> {
    let path = AttributePath::new("agent_profile_id");
    let profile = match client.agent_profiles().get(profile_id).await {
        Ok(profile) => profile,
        Err(e) if e.is_not_found() => {
            return vec![Diagnostic::attribute_error(
                &path,
                "agent profile not found",
                format!("agent profile {:?} does not exist", profile_id),
            )]
        }
        Err(e) => return vec![Diagnostic::error("error validating agent profile", e.to_string())],
    };

    let mut diagnostics = vec![];
    if !profile.has_credentials() {
        diagnostics.push(Diagnostic::attribute_error(
            &path,
            "Agent Profile needs credentials",
            format!(
                "selected agent_profile_id {:?} ({}) must have credentials - please fix via Web UI",
                profile.label, profile.id
            ),
        ));
    }
    if !profile.has_platform() {
        diagnostics.push(Diagnostic::attribute_error(
            &path,
            "Agent Profile needs platform",
            format!(
                "selected agent_profile_id {:?} ({}) must specify the platform type",
                profile.label, profile.id
            ),
        ));
    }
    diagnostics
}

/// Device key reported by the agent's system, `None` when the system is
/// not yet known
async fn reported_device_key(
    client: &Client,
    system_id: Option<&str>,
) -> Result<Option<String>, Diagnostic> {
    let Some(system_id) = system_id else {
        return Ok(None);
    };
    match client.systems().get(system_id).await {
        Ok(system) => Ok(Some(system.device_key)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(Diagnostic::error(
            "error reading managed device system info",
            format!("Could not Read {:?} - {}", system_id, e),
        )),
    }
}

async fn create_device(
    client: &Client,
    plan: &ManagedDeviceModel,
) -> Result<ManagedDeviceModel, Diagnostic> {
    let agents = client.system_agents();
    let agent_id = agents
        .create(&SystemAgentRequest::full_control(
            &plan.management_ip,
            &plan.agent_profile_id,
            AgentType::from_off_box(plan.off_box.unwrap_or(false)),
        ))
        .await
        .map_err(|e| Diagnostic::error("error creating new Agent", e.to_string()))?;
    tracing::info!("created agent {} for {}", agent_id, plan.management_ip);

    agents
        .run_job(&agent_id, JobOperation::Install, INSTALL_POLL_INTERVAL, INSTALL_TIMEOUT)
        .await
        .map_err(|e| {
            Diagnostic::error(
                format!("Could not run 'install' job on new agent {:?}", agent_id),
                e.to_string(),
            )
        })?;

    let agent = agents
        .get(&agent_id)
        .await
        .map_err(|e| Diagnostic::error("error fetching Agent info", e.to_string()))?;
    let system_id = agent.status.system_id.clone().ok_or_else(|| {
        Diagnostic::error(
            "error fetching Agent info",
            format!("agent {:?} did not report a system ID after install", agent_id),
        )
    })?;

    let systems = client.systems();
    let system = systems
        .get(&system_id)
        .await
        .map_err(|e| Diagnostic::error("error fetching system info", e.to_string()))?;

    if let Some(expected) = &plan.device_key {
        if *expected != system.device_key {
            return Err(Diagnostic::attribute_error(
                &AttributePath::new("device_key"),
                "error system device_key mismatch",
                format!(
                    "config expects switch device_key {:?}, device reports {:?}",
                    expected, system.device_key
                ),
            ));
        }
        systems
            .update_user_config(&system_id, &SystemUserConfig::acknowledge(&system.facts))
            .await
            .map_err(|e| {
                Diagnostic::error(
                    "error updating managed device",
                    format!("unexpected error while updating user config: {}", e),
                )
            })?;
        tracing::info!("acknowledged system {} ({})", system_id, system.device_key);
    }

    Ok(ManagedDeviceModel::from_agent(
        &agent,
        Some(system.device_key),
    ))
}

#[async_trait]
impl Resource for ManagedDeviceResource {
    fn type_name(&self) -> &str {
        "apstra_managed_device"
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
        let mut diagnostics = validate_config(&Self::schema_static(), &request.config);
        if has_errors(&diagnostics) {
            return ValidateResourceConfigResponse { diagnostics };
        }

        // profile checks need both a client and a known profile ID
        if let Some(provider_data) = &self.provider_data {
            if let Ok(Some(profile_id)) =
                values::string(&request.config, &AttributePath::new("agent_profile_id"))
            {
                diagnostics.extend(validate_agent_profile(&provider_data.client, &profile_id).await);
            }
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let failed = |diagnostics: Vec<Diagnostic>, state: DynamicValue| CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics,
        };

        let Some(provider_data) = &self.provider_data else {
            return failed(vec![not_configured()], request.planned_state);
        };
        let plan = match ManagedDeviceModel::from_value(&request.planned_state) {
            Ok(plan) => plan,
            Err(diag) => return failed(vec![diag], request.planned_state),
        };

        let diagnostics = validate_agent_profile(&provider_data.client, &plan.agent_profile_id).await;
        if has_errors(&diagnostics) {
            return failed(diagnostics, request.planned_state);
        }

        match create_device(&provider_data.client, &plan).await {
            Ok(created) => CreateResourceResponse {
                new_state: created.to_state(),
                private: vec![],
                diagnostics: vec![],
            },
            Err(diag) => failed(vec![diag], request.planned_state),
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
        let state = match ManagedDeviceModel::from_value(&request.current_state) {
            Ok(state) => state,
            Err(diag) => return keep(request, diag),
        };
        let agent_id = match state.required_agent_id() {
            Ok(agent_id) => agent_id.to_string(),
            Err(diag) => return keep(request, diag),
        };

        let client = &provider_data.client;
        let agent = match client.system_agents().get(&agent_id).await {
            Ok(agent) => agent,
            Err(e) if e.is_not_found() => {
                tracing::warn!("agent {} deleted outside of terraform", agent_id);
                return ReadResourceResponse::removed(request.private);
            }
            Err(e) => {
                let diag = Diagnostic::error(
                    "error reading managed device agent info",
                    format!("Could not Read {:?} ({}) - {}", agent_id, state.management_ip, e),
                );
                return keep(request, diag);
            }
        };

        let device_key = match reported_device_key(client, agent.status.system_id.as_deref()).await {
            Ok(device_key) => device_key.or(state.device_key),
            Err(diag) => return keep(request, diag),
        };

        ReadResourceResponse {
            new_state: Some(ManagedDeviceModel::from_agent(&agent, device_key).to_state()),
            diagnostics: vec![],
            private: request.private,
            deferred: None,
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
        let models = ManagedDeviceModel::from_value(&request.prior_state).and_then(|state| {
            ManagedDeviceModel::from_value(&request.planned_state).map(|plan| (state, plan))
        });
        let (state, plan) = match models {
            Ok(models) => models,
            Err(diag) => return failed(diag, request.prior_state),
        };
        let agent_id = match state.required_agent_id() {
            Ok(agent_id) => agent_id.to_string(),
            Err(diag) => return failed(diag, request.prior_state),
        };

        // only the agent profile can change in place
        if state.agent_profile_id != plan.agent_profile_id {
            if let Err(e) = provider_data
                .client
                .system_agents()
                .assign_profile(std::slice::from_ref(&agent_id), &plan.agent_profile_id)
                .await
            {
                return failed(
                    Diagnostic::error(
                        "error updating managed device agent",
                        format!(
                            "error while updating managed device agent {:?} ({}) - {}",
                            agent_id, state.management_ip, e
                        ),
                    ),
                    request.prior_state,
                );
            }
        }

        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
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
        let state = match ManagedDeviceModel::from_value(&request.prior_state) {
            Ok(state) => state,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        let client = &provider_data.client;
        if let Some(agent_id) = &state.agent_id {
            match client.system_agents().delete(agent_id).await {
                Ok(()) | Err(ApiError::NotFound(_)) => {}
                Err(e) => {
                    return DeleteResourceResponse {
                        diagnostics: vec![Diagnostic::error(
                            "error deleting device agent",
                            format!(
                                "device agent {:?} ({:?} {:?}) delete error - {}",
                                agent_id,
                                state.system_id.as_deref().unwrap_or_default(),
                                state.management_ip,
                                e
                            ),
                        )],
                    }
                }
            }
        }

        if let Some(system_id) = &state.system_id {
            match client.systems().delete(system_id).await {
                Ok(()) | Err(ApiError::NotFound(_)) => {}
                Err(e) => {
                    return DeleteResourceResponse {
                        diagnostics: vec![Diagnostic::error(
                            "error deleting managed device",
                            format!(
                                "managed device {:?} ({}) delete error - {}",
                                system_id, state.management_ip, e
                            ),
                        )],
                    }
                }
            }
        }

        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ManagedDeviceResource {
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
impl ResourceWithModifyPlan for ManagedDeviceResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        modify_plan(&Self::schema_static(), request)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    fn plan(device_key: Option<&str>) -> DynamicValue {
        DynamicValue::new(Dynamic::object([
            ("agent_id", Dynamic::Unknown),
            ("system_id", Dynamic::Unknown),
            ("management_ip", Dynamic::string("192.168.1.10")),
            ("device_key", device_key.into()),
            ("agent_profile_id", Dynamic::string("prof-1")),
            ("off_box", Dynamic::Bool(true)),
        ]))
    }

    fn resource(url: &str) -> ManagedDeviceResource {
        ManagedDeviceResource {
            provider_data: Some(ApstraProviderData::new(create_test_client(url))),
        }
    }

    fn create_request(planned_state: DynamicValue) -> CreateResourceRequest {
        CreateResourceRequest {
            type_name: "apstra_managed_device".to_string(),
            config: planned_state.clone(),
            planned_state,
            planned_private: vec![],
            provider_meta: None,
        }
    }

    #[tokio::test]
    async fn create_installs_agent_and_acknowledges_system() {
        let mut server = Server::new_async().await;
        let _profile = server
            .mock("GET", "/api/system-agent-profiles/prof-1")
            .with_status(200)
            .with_body(
                r#"{"id": "prof-1", "label": "junos", "platform": "junos",
                    "has_username": true, "has_password": true}"#,
            )
            .create_async()
            .await;
        let _agent = server
            .mock("POST", "/api/system-agents")
            .with_status(201)
            .with_body(r#"{"id": "agent-1"}"#)
            .create_async()
            .await;
        let _job = server
            .mock("POST", "/api/system-agents/agent-1/jobs")
            .match_body(Matcher::Json(serde_json::json!({"operation": "install"})))
            .with_status(201)
            .with_body(r#"{"id": "job-1"}"#)
            .create_async()
            .await;
        let _job_state = server
            .mock("GET", "/api/system-agents/agent-1/jobs/job-1")
            .with_status(200)
            .with_body(r#"{"id": "job-1", "state": "success"}"#)
            .create_async()
            .await;
        let _agent_info = server
            .mock("GET", "/api/system-agents/agent-1")
            .with_status(200)
            .with_body(
                r#"{"id": "agent-1", "management_ip": "192.168.1.10", "profile": "prof-1",
                    "agent_type": "offbox", "status": {"system_id": "SN123"}}"#,
            )
            .create_async()
            .await;
        let _system = server
            .mock("GET", "/api/systems/SN123")
            .with_status(200)
            .with_body(r#"{"device_key": "SN123", "facts": {"aos_hcl_model": "Juniper_vQFX"}}"#)
            .create_async()
            .await;
        let ack = server
            .mock("PUT", "/api/systems/SN123")
            .match_body(Matcher::Json(serde_json::json!({
                "user_config": {"aos_hcl_model": "Juniper_vQFX", "admin_state": "normal"}
            })))
            .with_status(202)
            .create_async()
            .await;

        let response = resource(&server.url())
            .create(Context::new(), create_request(plan(Some("SN123"))))
            .await;
        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        ack.assert_async().await;

        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("agent_id")).unwrap(), "agent-1");
        assert_eq!(state.get_string(&AttributePath::new("system_id")).unwrap(), "SN123");
        assert!(state.get_bool(&AttributePath::new("off_box")).unwrap());
    }

    #[tokio::test]
    async fn create_requires_profile_credentials() {
        let mut server = Server::new_async().await;
        let _profile = server
            .mock("GET", "/api/system-agent-profiles/prof-1")
            .with_status(200)
            .with_body(r#"{"id": "prof-1", "label": "bare"}"#)
            .create_async()
            .await;
        let agent = server
            .mock("POST", "/api/system-agents")
            .expect(0)
            .create_async()
            .await;

        let response = resource(&server.url())
            .create(Context::new(), create_request(plan(None)))
            .await;
        let summaries: Vec<&str> = response
            .diagnostics
            .iter()
            .map(|d| d.summary.as_str())
            .collect();
        assert_eq!(
            summaries,
            vec!["Agent Profile needs credentials", "Agent Profile needs platform"]
        );
        agent.assert_async().await;
    }

    #[tokio::test]
    async fn read_of_deleted_agent_removes_resource() {
        let mut server = Server::new_async().await;
        let _agent = server
            .mock("GET", "/api/system-agents/agent-1")
            .with_status(404)
            .with_body(r#"{"errors": "not found"}"#)
            .create_async()
            .await;

        let mut state = plan(None);
        state
            .set_string(&AttributePath::new("agent_id"), "agent-1".to_string())
            .unwrap();
        let response = resource(&server.url())
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "apstra_managed_device".to_string(),
                    current_state: state,
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: Default::default(),
                },
            )
            .await;
        assert!(response.new_state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn management_ip_must_parse() {
        let mut config = plan(None);
        config
            .set_string(&AttributePath::new("management_ip"), "10.0.0.300".to_string())
            .unwrap();
        config.set_null(&AttributePath::new("agent_id")).unwrap();
        config.set_null(&AttributePath::new("system_id")).unwrap();
        let diags = validate_config(&ManagedDeviceResource::schema_static(), &config);
        assert_eq!(diags.len(), 1, "{:?}", diags);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("management_ip")));
    }
}
