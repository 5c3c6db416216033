//! Datacenter connectivity template resource
//!
//! Primitives arrive as the JSON envelopes rendered by the
//! `apstra_datacenter_ct_*` data sources. They are converted to API
//! primitives, and the template travels through the blueprint's policy
//! import/export endpoints.

use super::{id_path, modify_plan};
use crate::api::connectivity_templates::ConnectivityTemplate;
use crate::api::ApiError;
use crate::connectivity_template::{api_primitives_to_json, child_primitives_from_json};
use crate::plan_modifiers::{RequiresReplace, UseStateForUnknown};
use crate::provider_data::{not_configured, ApstraProviderData};
use crate::values;
use async_trait::async_trait;
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
use tfplug::validator::{SizeValidator, StringLengthValidator};

#[derive(Default)]
pub struct DatacenterConnectivityTemplateResource {
    provider_data: Option<ApstraProviderData>,
}

fn primitives_path() -> AttributePath {
    AttributePath::new("primitives")
}

impl DatacenterConnectivityTemplateResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("This resource creates a Connectivity Template within a Datacenter Blueprint.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Apstra Object ID.")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("blueprint_id", AttributeType::String)
                    .description("Apstra Blueprint ID.")
                    .required()
                    .validator(StringLengthValidator::length_at_least(1))
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name displayed in web UI.")
                    .required()
                    .validator(StringLengthValidator::length_at_least(1))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Description displayed in web UI.")
                    .optional()
                    .validator(StringLengthValidator::length_at_least(1))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Set(Box::new(AttributeType::String)))
                    .description("Set of Tag labels")
                    .optional()
                    .validator(SizeValidator::size_at_least(1))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "primitives",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .description(
                    "Set of Connectivity Template Primitives expressed as JSON strings, \
                     as rendered by the `apstra_datacenter_ct_*` data sources.",
                )
                .required()
                .validator(SizeValidator::size_at_least(1))
                .build(),
            )
            .build()
    }
}

/// Primitive envelopes, or `None` while any of them is still unknown
fn primitive_strings(value: &DynamicValue) -> Result<Option<Vec<String>>, Diagnostic> {
    match value.get(&primitives_path()) {
        Dynamic::Unknown => Ok(None),
        Dynamic::List(items) if items.iter().any(Dynamic::is_unknown) => Ok(None),
        _ => values::strings(value, &primitives_path()).map(Some),
    }
}

fn template_from_plan(value: &DynamicValue) -> Result<ConnectivityTemplate, Diagnostic> {
    let primitives = primitive_strings(value)?.ok_or_else(|| {
        Diagnostic::attribute_error(
            &primitives_path(),
            "Unknown primitives",
            "primitives must be known before the connectivity template can be written",
        )
    })?;
    Ok(ConnectivityTemplate {
        id: None,
        label: values::required_string(value, &AttributePath::new("name"))?,
        description: values::string(value, &AttributePath::new("description"))?
            .unwrap_or_default(),
        tags: values::strings(value, &AttributePath::new("tags"))?,
        subpolicies: child_primitives_from_json(&primitives, &primitives_path())?,
    })
}

fn template_state(
    blueprint_id: &str,
    template: &ConnectivityTemplate,
) -> Result<DynamicValue, Diagnostic> {
    let mut primitives = api_primitives_to_json(&template.subpolicies)?;
    primitives.sort();
    let mut tags = template.tags.clone();
    tags.sort();
    let description = Some(template.description.clone()).filter(|d| !d.is_empty());
    Ok(DynamicValue::new(Dynamic::object([
        (
            "id",
            values::optional_string(&template.id),
        ),
        ("blueprint_id", Dynamic::string(blueprint_id)),
        ("name", Dynamic::string(template.label.as_str())),
        ("description", values::optional_string(&description)),
        ("tags", values::string_set_or_null(&tags)),
        ("primitives", values::string_set_or_null(&primitives)),
    ])))
}

#[async_trait]
impl Resource for DatacenterConnectivityTemplateResource {
    fn type_name(&self) -> &str {
        "apstra_datacenter_connectivity_template"
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

        // catch malformed primitives at plan time
        match primitive_strings(&request.config) {
            Ok(Some(primitives)) => {
                if let Err(diag) = child_primitives_from_json(&primitives, &primitives_path()) {
                    diagnostics.push(diag);
                }
            }
            Ok(None) => {}
            Err(diag) => diagnostics.push(diag),
        }
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
        let prepared = values::required_string(&request.planned_state, &AttributePath::new("blueprint_id"))
            .and_then(|bp| template_from_plan(&request.planned_state).map(|t| (bp, t)));
        let (blueprint_id, template) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => return failed(diag, request.planned_state),
        };

        let id = match provider_data
            .client
            .connectivity_templates(&blueprint_id)
            .create(&template)
            .await
        {
            Ok(id) => id,
            Err(ApiError::NotFound(e)) => {
                return failed(
                    Diagnostic::error(format!("blueprint {} not found", blueprint_id), e),
                    request.planned_state,
                )
            }
            Err(e) => {
                return failed(
                    Diagnostic::error(
                        format!("failed to create connectivity template in blueprint {}", blueprint_id),
                        e.to_string(),
                    ),
                    request.planned_state,
                )
            }
        };
        tracing::info!("created connectivity template {} in blueprint {}", id, blueprint_id);

        let mut state = request.planned_state;
        if let Err(e) = state.set_string(&id_path(), id) {
            return failed(Diagnostic::error("Failed to set id", e.to_string()), state);
        }
        CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![],
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
        let ids = values::required_string(&request.current_state, &AttributePath::new("blueprint_id"))
            .and_then(|bp| values::required_string(&request.current_state, &id_path()).map(|id| (bp, id)));
        let (blueprint_id, id) = match ids {
            Ok(ids) => ids,
            Err(diag) => return keep(request, diag),
        };

        let template = match provider_data
            .client
            .connectivity_templates(&blueprint_id)
            .get(&id)
            .await
        {
            Ok(template) => template,
            // a missing blueprint takes the template with it
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "connectivity template {} in blueprint {} not found",
                    id,
                    blueprint_id
                );
                return ReadResourceResponse::removed(request.private);
            }
            Err(e) => {
                let diag = Diagnostic::error(
                    format!("failed to read connectivity template {}", id),
                    e.to_string(),
                );
                return keep(request, diag);
            }
        };

        match template_state(&blueprint_id, &template) {
            Ok(state) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics: vec![],
                private: request.private,
                deferred: None,
            },
            Err(diag) => keep(request, diag),
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
        let prepared = values::required_string(&request.prior_state, &AttributePath::new("blueprint_id"))
            .and_then(|bp| values::required_string(&request.prior_state, &id_path()).map(|id| (bp, id)))
            .and_then(|(bp, id)| template_from_plan(&request.planned_state).map(|t| (bp, id, t)));
        let (blueprint_id, id, template) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => return failed(diag, request.prior_state),
        };

        if let Err(e) = provider_data
            .client
            .connectivity_templates(&blueprint_id)
            .update(&id, &template)
            .await
        {
            return failed(
                Diagnostic::error(
                    format!("failed to update connectivity template {}", id),
                    e.to_string(),
                ),
                request.prior_state,
            );
        }

        let mut state = request.planned_state;
        if let Err(e) = state.set_string(&id_path(), id) {
            return failed(Diagnostic::error("Failed to set id", e.to_string()), state);
        }
        UpdateResourceResponse {
            new_state: state,
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
        let ids = values::required_string(&request.prior_state, &AttributePath::new("blueprint_id"))
            .and_then(|bp| values::required_string(&request.prior_state, &id_path()).map(|id| (bp, id)));
        let (blueprint_id, id) = match ids {
            Ok(ids) => ids,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        match provider_data
            .client
            .connectivity_templates(&blueprint_id)
            .delete(&id)
            .await
        {
            Ok(()) | Err(ApiError::NotFound(_)) => DeleteResourceResponse { diagnostics: vec![] },
            Err(e) => DeleteResourceResponse {
                diagnostics: vec![Diagnostic::error(
                    format!("failed to delete connectivity template {}", id),
                    e.to_string(),
                )],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for DatacenterConnectivityTemplateResource {
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
impl ResourceWithModifyPlan for DatacenterConnectivityTemplateResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        modify_plan(&Self::schema_static(), request)
    }
}
