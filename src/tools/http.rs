//! Shared HTTP plumbing for the data APIs

use crate::error::RouterError;
use crate::Result;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct DataApiClient {
    client: Client,
    base_url: String,
    source: &'static str,
}

impl DataApiClient {
    pub fn new(source: &'static str, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            source,
        })
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    /// GET `{base_url}{path}` with query parameters and an optional bearer token.
    pub async fn get_json(
        &self,
        path: &str,
        params: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        debug!(source = self.source, path, "Data API request");

        let mut request = self.client.get(url).query(params);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        // reqwest errors render the full URL, which carries the API key
        let response = request.send().await.map_err(|e| {
            RouterError::DataApiError(format!(
                "{} request failed for {}: {}",
                self.source,
                path,
                e.without_url()
            ))
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            RouterError::DataApiError(format!(
                "{} response unreadable: {}",
                self.source,
                e.without_url()
            ))
        })?;

        if !status.is_success() {
            return Err(RouterError::DataApiError(format!(
                "{} returned {} for {}: {}",
                self.source, status, path, text
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            RouterError::DataApiError(format!("{} returned invalid JSON: {}", self.source, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_json_sends_params_and_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/things"))
            .and(query_param("q", "tesla"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = DataApiClient::new("Test", &server.uri(), Duration::from_secs(5)).unwrap();
        let body = client
            .get_json("/v2/things", &[("q", "tesla".to_string())], Some("secret"))
            .await
            .unwrap();

        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_non_success_status_is_data_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = DataApiClient::new("Test", &server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.get_json("/x", &[], None).await.unwrap_err();

        match err {
            RouterError::DataApiError(msg) => {
                assert!(msg.contains("429"));
                assert!(msg.contains("rate limited"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_error_hides_api_key() {
        // nothing listens on the discard port
        let client =
            DataApiClient::new("FRED", "http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client
            .get_json(
                "/fred/series/observations",
                &[("api_key", "SECRET123".to_string())],
                None,
            )
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(matches!(err, RouterError::DataApiError(_)));
        assert!(msg.contains("/fred/series/observations"));
        assert!(!msg.contains("SECRET123"), "key leaked: {msg}");
        assert!(!msg.contains("api_key"), "query string leaked: {msg}");
    }

    #[tokio::test]
    async fn test_invalid_json_is_data_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = DataApiClient::new("Test", &server.uri(), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            client.get_json("/x", &[], None).await,
            Err(RouterError::DataApiError(_))
        ));
    }
}
