//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::sync::Arc;
use tfplug::provider::ProviderData;
use tfplug::types::Diagnostic;

#[derive(Clone)]
pub struct ApstraProviderData {
    pub client: Arc<Client>,
}

impl ApstraProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Recovers the provider data handed to a resource or data source
    /// `configure` call
    pub fn from_provider_data(data: Option<ProviderData>) -> Result<Self, Diagnostic> {
        let Some(data) = data else {
            return Err(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            ));
        };
        data.downcast_ref::<ApstraProviderData>()
            .cloned()
            .ok_or_else(|| {
                Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract ApstraProviderData from provider data",
                )
            })
    }
}

/// Diagnostic for resources used before the provider configured them
pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn rejects_foreign_provider_data() {
        let data: ProviderData = Arc::new("not provider data".to_string());
        let err = ApstraProviderData::from_provider_data(Some(data)).err().unwrap();
        assert_eq!(err.summary, "Invalid provider data");

        let err = ApstraProviderData::from_provider_data(None).err().unwrap();
        assert_eq!(err.summary, "No provider data");
    }

    #[test]
    fn accepts_own_provider_data() {
        let client = Client::new("https://apstra.example.com", "admin", "admin", true).unwrap();
        let data: ProviderData = Arc::new(ApstraProviderData::new(client));
        let provider_data = ApstraProviderData::from_provider_data(Some(data)).unwrap();
        assert_eq!(provider_data.client.base_url(), "https://apstra.example.com");
    }
}
