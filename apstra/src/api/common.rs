//! Common types and utilities for the Apstra API

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Envelope of every list endpoint
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}

/// Body returned by create endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObjectId {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub errors: Option<HashMap<String, serde_json::Value>>,
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("API error details: error={error:?}, field_errors={field_errors:?}")]
pub struct ApiErrorDetails {
    pub error: Option<String>,
    pub field_errors: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Pool counters arrive as numbers or as decimal strings depending on the
/// Apstra release (`"total": "4294967295"`)
pub mod string_or_number {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(*value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNumber {
            String(String),
            Number(f64),
        }

        match Option::<StringOrNumber>::deserialize(deserializer)? {
            Some(StringOrNumber::String(s)) => s.parse::<f64>().map_err(serde::de::Error::custom),
            Some(StringOrNumber::Number(n)) => Ok(n),
            None => Ok(0.0),
        }
    }
}
