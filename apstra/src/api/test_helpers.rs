//! Test helpers for the Apstra API

#[cfg(test)]
#[allow(dead_code, clippy::disallowed_methods)]
pub fn create_test_client(url: &str) -> super::Client {
    super::Client::with_config(url, "admin", "admin", true, fast_retries()).unwrap()
}

#[cfg(test)]
pub fn fast_retries() -> super::RetryConfig {
    super::RetryConfig {
        max_retries: 2,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        timeout_seconds: 5,
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::super::*;
    use super::create_test_client;
    use mockito::{Matcher, Server};

    #[test]
    fn test_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = Client::new("not a url", "admin", "admin", false)
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::UrlError(_)));
    }

    #[tokio::test]
    async fn login_stores_token_for_later_requests() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/api/aaa/login")
            .match_body(Matcher::Json(serde_json::json!({
                "username": "admin",
                "password": "admin"
            })))
            .with_status(201)
            .with_body(r#"{"token": "tok-123", "id": "session"}"#)
            .create_async()
            .await;
        let listed = server
            .mock("GET", "/api/resources/asn-pools")
            .match_header(AUTH_TOKEN_HEADER, "tok-123")
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        assert!(!client.is_logged_in().await);
        client.login().await.unwrap();
        assert!(client.is_logged_in().await);

        let pools = client
            .resources()
            .list_range_pools(resources::RangePoolKind::Asn)
            .await
            .unwrap();
        assert!(pools.is_empty());
        login.assert_async().await;
        listed.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/aaa/login")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client.login().await.unwrap_err();
        assert!(matches!(err, ApiError::AuthError));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/api/systems/sys-1")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client.systems().get("sys-1").await.unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable));
        m.assert_async().await;

        let stats = client.request_stats().await;
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.retries, 2);
        assert_eq!(stats.statuses.get(&503), Some(&3));
    }

    #[tokio::test]
    async fn client_errors_carry_details() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/resources/vni-pools")
            .with_status(422)
            .with_body(r#"{"errors": {"ranges": "overlapping ranges"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .resources()
            .create_range_pool(
                resources::RangePoolKind::Vni,
                &resources::RangePoolRequest {
                    display_name: "v".to_string(),
                    ranges: vec![],
                    tags: vec![],
                },
            )
            .await
            .unwrap_err();

        match err {
            ApiError::ApiError {
                status, details, ..
            } => {
                assert_eq!(status, 422);
                let details = details.unwrap();
                assert!(details.field_errors.unwrap().contains_key("ranges"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_api_error_formatting() {
        let error = ApiError::ApiError {
            status: 400,
            message: "Bad Request".to_string(),
            details: Some(Box::new(ApiErrorDetails {
                error: Some("general error".to_string()),
                field_errors: None,
            })),
        };

        let error_str = error.to_string();
        assert!(error_str.contains("HTTP 400"));
        assert!(error_str.contains("Bad Request"));
        assert!(ApiError::NotFound("/api/x".to_string()).is_not_found());
    }
}
