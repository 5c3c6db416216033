//! Provider configuration through resource and data source calls against a
//! mock Apstra server

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use apstra::ApstraProvider;
use mockito::{Matcher, Server, ServerGuard};
use tfplug::context::Context;
use tfplug::data_source::{DataSource, ReadDataSourceRequest};
use tfplug::provider::{
    configured_data_source, configured_resource, ConfigureProviderRequest, Provider, ProviderData,
};
use tfplug::resource::{
    CreateResourceRequest, DeleteResourceRequest, ReadResourceRequest, Resource,
    ValidateResourceConfigRequest,
};
use tfplug::types::{AttributePath, ClientCapabilities, Dynamic, DynamicValue};
use tfplug::TfplugError;

async fn configured_provider(server: &mut ServerGuard) -> (ApstraProvider, ProviderData) {
    let _login = server
        .mock("POST", "/api/aaa/login")
        .with_status(201)
        .with_body(r#"{"token": "tok-1", "id": "session"}"#)
        .create_async()
        .await;

    let mut provider = ApstraProvider::new();
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: DynamicValue::new(Dynamic::object([
                    (
                        "url",
                        Dynamic::string(format!("http://admin:admin@{}", server.host_with_port())),
                    ),
                    ("tls_validation_disabled", Dynamic::Bool(true)),
                    ("blueprint_mutex_disabled", Dynamic::Null),
                ])),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let provider_data = response.provider_data.unwrap();
    (provider, provider_data)
}

#[tokio::test]
async fn asn_pool_lifecycle() {
    let mut server = Server::new_async().await;
    let (provider, provider_data) = configured_provider(&mut server).await;

    let create = server
        .mock("POST", "/api/resources/asn-pools")
        .match_header("authtoken", "tok-1")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "display_name": "spines",
            "ranges": [{"first": 64512, "last": 64600}]
        })))
        .with_status(202)
        .with_body(r#"{"id": "pool-1"}"#)
        .create_async()
        .await;
    let get = server
        .mock("GET", "/api/resources/asn-pools/pool-1")
        .with_status(200)
        .with_body(
            r#"{"id": "pool-1", "display_name": "spines", "status": "not_in_use",
                "total": 89, "used": 0, "used_percentage": 0,
                "ranges": [{"first": 64512, "last": 64600, "total": 89, "used": 0,
                            "used_percentage": 0, "status": "pool_element_available"}]}"#,
        )
        .expect(2)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/api/resources/asn-pools/pool-1")
        .with_status(202)
        .create_async()
        .await;

    let resource = tokio_test::assert_ok!(
        configured_resource(&provider, Context::new(), "apstra_asn_pool", Some(provider_data)).await
    );

    let plan = DynamicValue::new(Dynamic::object([
        ("id", Dynamic::Unknown),
        ("name", Dynamic::string("spines")),
        (
            "ranges",
            Dynamic::List(vec![Dynamic::object([
                ("first", Dynamic::Number(64512.0)),
                ("last", Dynamic::Number(64600.0)),
                ("total", Dynamic::Unknown),
                ("status", Dynamic::Unknown),
                ("used", Dynamic::Unknown),
                ("used_percentage", Dynamic::Unknown),
            ])]),
        ),
        ("total", Dynamic::Unknown),
        ("status", Dynamic::Unknown),
        ("used", Dynamic::Unknown),
        ("used_percentage", Dynamic::Unknown),
    ]));

    let validated = resource
        .validate(
            Context::new(),
            ValidateResourceConfigRequest {
                type_name: "apstra_asn_pool".to_string(),
                config: plan.clone(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(validated.diagnostics.is_empty(), "{:?}", validated.diagnostics);

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "apstra_asn_pool".to_string(),
                planned_state: plan.clone(),
                config: plan,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    create.assert_async().await;
    assert_eq!(
        created.new_state.get_string(&AttributePath::new("id")).unwrap(),
        "pool-1"
    );
    assert_eq!(
        created.new_state.get_number(&AttributePath::new("total")).unwrap(),
        89.0
    );

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "apstra_asn_pool".to_string(),
                current_state: created.new_state.clone(),
                private: vec![],
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(read.diagnostics.is_empty(), "{:?}", read.diagnostics);
    assert_eq!(
        read.new_state
            .unwrap()
            .get_string(&AttributePath::new("status"))
            .unwrap(),
        "not_in_use"
    );
    get.assert_async().await;

    let deleted = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "apstra_asn_pool".to_string(),
                prior_state: created.new_state,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(deleted.diagnostics.is_empty(), "{:?}", deleted.diagnostics);
    delete.assert_async().await;
}

#[tokio::test]
async fn primitive_feeds_connectivity_template() {
    let mut server = Server::new_async().await;
    let (provider, provider_data) = configured_provider(&mut server).await;

    let data_source = configured_data_source(
        &provider,
        Context::new(),
        "apstra_datacenter_ct_routing_policy",
        Some(provider_data.clone()),
    )
    .await
    .unwrap();
    let rendered = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "apstra_datacenter_ct_routing_policy".to_string(),
                config: DynamicValue::new(Dynamic::object([
                    ("label", Dynamic::string("export")),
                    ("routing_policy_id", Dynamic::string("rp-1")),
                    ("primitive", Dynamic::Unknown),
                ])),
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(rendered.diagnostics.is_empty(), "{:?}", rendered.diagnostics);
    let primitive = rendered
        .state
        .get_string(&AttributePath::new("primitive"))
        .unwrap();
    let envelope: serde_json::Value = serde_json::from_str(&primitive).unwrap();
    assert_eq!(envelope["type"], "AttachExistingRoutingPolicy");
    assert_eq!(envelope["label"], "export");

    let import = server
        .mock("PUT", "/api/blueprints/bp-1/obj-policy-import")
        .match_body(Matcher::Regex("rp-1".to_string()))
        .with_status(204)
        .create_async()
        .await;

    let resource = configured_resource(
        &provider,
        Context::new(),
        "apstra_datacenter_connectivity_template",
        Some(provider_data),
    )
    .await
    .unwrap();
    let plan = DynamicValue::new(Dynamic::object([
        ("id", Dynamic::Unknown),
        ("blueprint_id", Dynamic::string("bp-1")),
        ("name", Dynamic::string("policies")),
        ("description", Dynamic::Null),
        ("tags", Dynamic::Null),
        ("primitives", Dynamic::List(vec![Dynamic::string(primitive)])),
    ]));

    let validated = resource
        .validate(
            Context::new(),
            ValidateResourceConfigRequest {
                type_name: "apstra_datacenter_connectivity_template".to_string(),
                config: plan.clone(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(validated.diagnostics.is_empty(), "{:?}", validated.diagnostics);

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "apstra_datacenter_connectivity_template".to_string(),
                planned_state: plan.clone(),
                config: plan,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    import.assert_async().await;
    assert!(!created
        .new_state
        .get_string(&AttributePath::new("id"))
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn unknown_types_and_missing_configuration() {
    let mut server = Server::new_async().await;
    let (provider, provider_data) = configured_provider(&mut server).await;

    let err = configured_resource(
        &provider,
        Context::new(),
        "apstra_blueprint",
        Some(provider_data),
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, TfplugError::ResourceNotFound(name) if name == "apstra_blueprint"));

    let err = configured_resource(&provider, Context::new(), "apstra_vni_pool", None)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, TfplugError::ProviderNotConfigured));
}
