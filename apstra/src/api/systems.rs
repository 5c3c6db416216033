//! Managed system API

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

const SYSTEMS_PATH: &str = "/api/systems";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemFacts {
    #[serde(default)]
    pub aos_hcl_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemUserConfig {
    #[serde(default)]
    pub aos_hcl_model: String,
    #[serde(default)]
    pub admin_state: String,
}

impl SystemUserConfig {
    /// Acknowledges a system for management
    pub fn acknowledge(facts: &SystemFacts) -> Self {
        Self {
            aos_hcl_model: facts.aos_hcl_model.clone(),
            admin_state: "normal".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedSystem {
    pub device_key: String,
    #[serde(default)]
    pub facts: SystemFacts,
    #[serde(default)]
    pub user_config: Option<SystemUserConfig>,
}

#[derive(Serialize)]
struct UserConfigRequest<'a> {
    user_config: &'a SystemUserConfig,
}

/// Systems API
pub struct SystemsApi<'a> {
    client: &'a Client,
}

impl<'a> SystemsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/systems/{id}
    pub async fn get(&self, id: &str) -> Result<ManagedSystem, ApiError> {
        self.client.get(&format!("{}/{}", SYSTEMS_PATH, id)).await
    }

    /// PUT /api/systems/{id} with a new user config
    pub async fn update_user_config(
        &self,
        id: &str,
        user_config: &SystemUserConfig,
    ) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(
                &format!("{}/{}", SYSTEMS_PATH, id),
                &UserConfigRequest { user_config },
            )
            .await
    }

    /// DELETE /api/systems/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("{}/{}", SYSTEMS_PATH, id))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn acknowledge_puts_user_config() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/systems/SN123")
            .with_status(200)
            .with_body(r#"{"device_key": "SN123", "facts": {"aos_hcl_model": "Juniper_vQFX"}}"#)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/api/systems/SN123")
            .match_body(Matcher::Json(serde_json::json!({
                "user_config": {"aos_hcl_model": "Juniper_vQFX", "admin_state": "normal"}
            })))
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let system = client.systems().get("SN123").await.unwrap();
        assert!(system.user_config.is_none());

        client
            .systems()
            .update_user_config("SN123", &SystemUserConfig::acknowledge(&system.facts))
            .await
            .unwrap();
        put.assert_async().await;
    }
}
