//! CWA open data client.

use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use suhua_core::CwaConfig;

use crate::types::WeatherError;

/// Where one dataset lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// CWA dataset id, e.g. "O-A0002-001"
    pub dataset: String,
    /// Extra query parameters beyond Authorization/format
    pub params: Vec<(String, String)>,
}

impl SourceConfig {
    pub fn dataset(id: &str) -> Self {
        Self {
            dataset: id.to_string(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }
}

/// Undecoded JSON body of one dataset response
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub dataset: String,
    pub body: Value,
}

impl RawPayload {
    pub fn new(dataset: &str, body: Value) -> Self {
        Self {
            dataset: dataset.to_string(),
            body,
        }
    }

    /// The `records` object every CWA datastore response wraps its data in
    pub fn records(&self) -> Result<&Value, WeatherError> {
        self.body
            .get("records")
            .ok_or_else(|| WeatherError::Parse(format!("{}: missing records", self.dataset)))
    }
}

#[derive(Debug, Clone)]
pub struct CwaClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl CwaClient {
    pub fn new(config: &CwaConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Fetch one dataset and return its JSON body.
    ///
    /// Fails on transport errors, non-2xx status, a `"success": "false"`
    /// envelope, or a body that is not JSON.
    #[instrument(skip(self), fields(dataset = %source.dataset), level = "debug")]
    pub async fn fetch(&self, source: &SourceConfig) -> Result<RawPayload, WeatherError> {
        if self.api_key.is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let url = format!("{}/{}", self.base_url, source.dataset);
        let mut query: Vec<(&str, &str)> =
            vec![("Authorization", self.api_key.as_str()), ("format", "JSON")];
        query.extend(source.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let response = self.client.get(&url).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status {
                dataset: source.dataset.clone(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;

        // CWA reports the flag as a string
        let success = match body.get("success") {
            Some(Value::String(s)) => s == "true",
            Some(Value::Bool(b)) => *b,
            _ => true,
        };
        if !success {
            return Err(WeatherError::Rejected(source.dataset.clone()));
        }

        Ok(RawPayload::new(&source.dataset, body))
    }
}

/// Read a number that CWA sometimes publishes as a string
pub(crate) fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> CwaConfig {
        CwaConfig {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            ..CwaConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_sends_authorization() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/O-A0002-001"))
            .and(query_param("Authorization", "test-key"))
            .and(query_param("format", "JSON"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": "true",
                "records": { "Station": [] }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = CwaClient::new(&config(&mock_server.uri())).unwrap();
        let payload = client
            .fetch(&SourceConfig::dataset("O-A0002-001"))
            .await
            .unwrap();

        assert_eq!(payload.dataset, "O-A0002-001");
        assert!(payload.records().unwrap().get("Station").is_some());
    }

    #[tokio::test]
    async fn test_fetch_extra_params() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/F-C0032-001"))
            .and(query_param("locationName", "宜蘭縣"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": "true",
                "records": {}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = CwaClient::new(&config(&mock_server.uri())).unwrap();
        let source = SourceConfig::dataset("F-C0032-001").with_param("locationName", "宜蘭縣");
        assert!(client.fetch(&source).await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client = CwaClient::new(&config(&mock_server.uri())).unwrap();
        let result = client.fetch(&SourceConfig::dataset("E-A0015-001")).await;

        assert!(matches!(result, Err(WeatherError::Status { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_fetch_unsuccessful_envelope() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": "false"
            })))
            .mount(&mock_server)
            .await;

        let client = CwaClient::new(&config(&mock_server.uri())).unwrap();
        let result = client.fetch(&SourceConfig::dataset("W-C0034-005")).await;

        assert!(matches!(result, Err(WeatherError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_fetch_not_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&mock_server)
            .await;

        let client = CwaClient::new(&config(&mock_server.uri())).unwrap();
        let result = client.fetch(&SourceConfig::dataset("O-A0002-001")).await;

        assert!(matches!(result, Err(WeatherError::Network(_))));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let mut cfg = config("http://127.0.0.1:9");
        cfg.api_key.clear();
        let client = CwaClient::new(&cfg).unwrap();
        let result = client.fetch(&SourceConfig::dataset("O-A0002-001")).await;
        assert!(matches!(result, Err(WeatherError::MissingApiKey)));
    }

    #[test]
    fn test_lenient_f64() {
        let v = serde_json::json!({ "a": 1.5, "b": "33", "c": "n/a" });
        assert_eq!(lenient_f64(v.get("a")), Some(1.5));
        assert_eq!(lenient_f64(v.get("b")), Some(33.0));
        assert_eq!(lenient_f64(v.get("c")), None);
        assert_eq!(lenient_f64(v.get("missing")), None);
    }
}
