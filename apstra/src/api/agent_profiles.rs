//! System agent profile API

use super::common::{ListResponse, ObjectId};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const PROFILES_PATH: &str = "/api/system-agent-profiles";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub has_username: bool,
    #[serde(default)]
    pub has_password: bool,
    /// `name==version` strings
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub open_options: HashMap<String, String>,
}

impl AgentProfile {
    pub fn has_credentials(&self) -> bool {
        self.has_username && self.has_password
    }

    pub fn has_platform(&self) -> bool {
        self.platform.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Packages as a `name -> version` map
    pub fn package_map(&self) -> HashMap<String, String> {
        self.packages
            .iter()
            .map(|p| match p.split_once("==") {
                Some((name, version)) => (name.to_string(), version.to_string()),
                None => (p.clone(), String::new()),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentProfileRequest {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    pub packages: Vec<String>,
    pub open_options: HashMap<String, String>,
}

impl AgentProfileRequest {
    /// Packages given as a `name -> version` map, sorted by name
    pub fn packages_from_map(packages: &HashMap<String, String>) -> Vec<String> {
        let mut list: Vec<String> = packages
            .iter()
            .map(|(name, version)| format!("{}=={}", name, version))
            .collect();
        list.sort();
        list
    }
}

/// Agent profiles API
pub struct AgentProfilesApi<'a> {
    client: &'a Client,
}

impl<'a> AgentProfilesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/system-agent-profiles
    pub async fn list(&self) -> Result<Vec<AgentProfile>, ApiError> {
        let list: ListResponse<AgentProfile> = self.client.get(PROFILES_PATH).await?;
        Ok(list.items)
    }

    /// GET /api/system-agent-profiles/{id}
    pub async fn get(&self, id: &str) -> Result<AgentProfile, ApiError> {
        self.client.get(&format!("{}/{}", PROFILES_PATH, id)).await
    }

    pub async fn named(&self, label: &str) -> Result<Vec<AgentProfile>, ApiError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|p| p.label == label)
            .collect())
    }

    /// POST /api/system-agent-profiles
    pub async fn create(&self, request: &AgentProfileRequest) -> Result<String, ApiError> {
        let created: ObjectId = self.client.post(PROFILES_PATH, request).await?;
        Ok(created.id)
    }

    /// PUT /api/system-agent-profiles/{id}
    pub async fn update(&self, id: &str, request: &AgentProfileRequest) -> Result<(), ApiError> {
        self.client
            .put::<(), _>(&format!("{}/{}", PROFILES_PATH, id), request)
            .await
    }

    /// DELETE /api/system-agent-profiles/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("{}/{}", PROFILES_PATH, id))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::Server;

    #[tokio::test]
    async fn get_profile_without_credentials() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/system-agent-profiles/prof-1")
            .with_status(200)
            .with_body(
                r#"{"id": "prof-1", "label": "junos", "platform": "junos",
                    "has_username": true, "has_password": false,
                    "packages": ["aos-deployment-helper==1.2"], "open_options": {}}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let profile = client.agent_profiles().get("prof-1").await.unwrap();
        assert!(!profile.has_credentials());
        assert!(profile.has_platform());
        assert_eq!(
            profile.package_map().get("aos-deployment-helper").map(String::as_str),
            Some("1.2")
        );
    }

    #[test]
    fn packages_round_trip_through_map() {
        let mut map = HashMap::new();
        map.insert("b".to_string(), "2".to_string());
        map.insert("a".to_string(), "1".to_string());
        assert_eq!(
            AgentProfileRequest::packages_from_map(&map),
            vec!["a==1".to_string(), "b==2".to_string()]
        );
    }

    #[test]
    fn empty_platform_is_missing() {
        let profile: AgentProfile =
            serde_json::from_str(r#"{"id": "p", "label": "l", "platform": ""}"#).unwrap();
        assert!(!profile.has_platform());
        assert!(profile.packages.is_empty());
    }
}
