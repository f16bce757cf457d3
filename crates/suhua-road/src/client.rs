//! TDX traffic-news client.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use suhua_core::time::parse_timestamp;
use suhua_core::RoadConfig;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::error::RoadError;
use crate::types::RawIncident;

/// Tokens are renewed this long before they expire
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Anything that can deliver raw incident texts for classification
#[async_trait]
pub trait RoadIncidentSource: Send + Sync {
    async fn fetch_incidents(&self) -> Result<Vec<RawIncident>, RoadError>;
}

#[async_trait]
impl<S: RoadIncidentSource + ?Sized> RoadIncidentSource for std::sync::Arc<S> {
    async fn fetch_incidents(&self) -> Result<Vec<RawIncident>, RoadError> {
        (**self).fetch_incidents().await
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(rename = "Newses", alias = "News")]
    items: Option<Vec<NewsItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NewsItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "NewsURL")]
    news_url: Option<String>,
    #[serde(default)]
    publish_time: Option<String>,
    #[serde(default)]
    update_time: Option<String>,
}

impl NewsItem {
    fn into_incident(self) -> Option<RawIncident> {
        let text = [self.title, self.description]
            .into_iter()
            .flatten()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            return None;
        }

        let time = self
            .update_time
            .as_deref()
            .or(self.publish_time.as_deref())
            .and_then(parse_timestamp);

        Some(RawIncident {
            text,
            time,
            link: self.news_url.filter(|u| !u.is_empty()),
        })
    }
}

pub struct TdxRoadClient {
    client: reqwest::Client,
    auth_url: String,
    news_url: String,
    credentials: Option<(String, String)>,
    token: Mutex<Option<CachedToken>>,
}

impl TdxRoadClient {
    pub fn new(config: &RoadConfig) -> Result<Self, RoadError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        let credentials = config
            .credentials()
            .map(|(id, secret)| (id.to_string(), secret.to_string()));
        if credentials.is_none() {
            tracing::info!("No TDX credentials configured, road feed will be called anonymously");
        }

        Ok(Self {
            client,
            auth_url: config.auth_url.clone(),
            news_url: config.news_url.clone(),
            credentials,
            token: Mutex::new(None),
        })
    }

    /// Bearer token for the news request, exchanging credentials when the
    /// cached token is missing or about to expire. `None` when anonymous.
    async fn access_token(&self) -> Result<Option<String>, RoadError> {
        let Some((client_id, client_secret)) = &self.credentials else {
            return Ok(None);
        };

        let mut cached = self.token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if now < token.expires_at {
                return Ok(Some(token.access_token.clone()));
            }
        }

        let token = self.exchange_token(client_id, client_secret).await?;
        let lifetime = (token.expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0);
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(lifetime),
        });

        Ok(Some(access_token))
    }

    #[instrument(skip(self, client_secret), level = "debug")]
    async fn exchange_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenResponse, RoadError> {
        let response = self
            .client
            .post(&self.auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RoadError::TokenExchange(format!("{}: {}", status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| RoadError::TokenExchange(format!("Invalid token response: {}", e)))
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, RoadError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| RoadError::Parse(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 {
            Err(RoadError::TokenRejected)
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(RoadError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(RoadError::ApiError(format!("{}: {}", status, text)))
        }
    }
}

#[async_trait]
impl RoadIncidentSource for TdxRoadClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch_incidents(&self) -> Result<Vec<RawIncident>, RoadError> {
        let token = self.access_token().await?;

        let mut request = self.client.get(&self.news_url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let news: NewsResponse = match self.handle_response(response).await {
            Err(RoadError::TokenRejected) => {
                self.forget_token().await;
                return Err(RoadError::TokenRejected);
            }
            other => other?,
        };

        let items = news
            .items
            .ok_or_else(|| RoadError::Parse("Missing Newses list".to_string()))?;
        let incidents: Vec<RawIncident> =
            items.into_iter().filter_map(NewsItem::into_incident).collect();

        tracing::debug!(count = incidents.len(), "Fetched road news");
        Ok(incidents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, credentials: bool) -> RoadConfig {
        RoadConfig {
            client_id: credentials.then(|| "id".to_string()),
            client_secret: credentials.then(|| "secret".to_string()),
            auth_url: format!("{}/token", server.uri()),
            news_url: format!("{}/news", server.uri()),
            timeout_secs: 5,
            ..RoadConfig::default()
        }
    }

    fn news_body() -> serde_json::Value {
        serde_json::json!({
            "UpdateTime": "2025-07-25T15:30:00+08:00",
            "Newses": [
                {
                    "NewsID": "1",
                    "Title": "台9線東澳路段坍方",
                    "Description": "封閉雙向車道，請改道台9丁線",
                    "NewsURL": "https://example.test/news/1",
                    "PublishTime": "2025-07-25T14:00:00+08:00",
                    "UpdateTime": "2025-07-25T15:00:00+08:00"
                },
                { "NewsID": "2", "Title": "", "Description": "" }
            ]
        })
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tdx_token",
                "expires_in": 86400,
                "token_type": "Bearer"
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fetch_with_token() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .and(header("Authorization", "Bearer tdx_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(news_body()))
            .mount(&server)
            .await;

        let client = TdxRoadClient::new(&config(&server, true)).unwrap();
        let incidents = client.fetch_incidents().await.unwrap();

        assert_eq!(incidents.len(), 1);
        assert_eq!(
            incidents[0].text,
            "台9線東澳路段坍方 封閉雙向車道，請改道台9丁線"
        );
        assert_eq!(incidents[0].link.as_deref(), Some("https://example.test/news/1"));
        assert_eq!(
            incidents[0].time,
            parse_timestamp("2025-07-25T15:00:00+08:00")
        );
    }

    #[tokio::test]
    async fn test_token_reused_between_calls() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(200).set_body_json(news_body()))
            .expect(2)
            .mount(&server)
            .await;

        let client = TdxRoadClient::new(&config(&server, true)).unwrap();
        client.fetch_incidents().await.unwrap();
        client.fetch_incidents().await.unwrap();
    }

    #[tokio::test]
    async fn test_anonymous_without_credentials() {
        let server = MockServer::start().await;
        mount_token(&server, 0).await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "News": [{ "Title": "蘇花公路和仁路段落石" }]
            })))
            .mount(&server)
            .await;

        let client = TdxRoadClient::new(&config(&server, false)).unwrap();
        let incidents = client.fetch_incidents().await.unwrap();

        assert_eq!(incidents.len(), 1);
        assert!(incidents[0].time.is_none());
    }

    #[tokio::test]
    async fn test_token_exchange_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let client = TdxRoadClient::new(&config(&server, true)).unwrap();
        let err = client.fetch_incidents().await.unwrap_err();
        assert!(matches!(err, RoadError::TokenExchange(ref msg) if msg.contains("invalid_client")));
    }

    #[tokio::test]
    async fn test_rejected_token_is_dropped() {
        let server = MockServer::start().await;
        mount_token(&server, 2).await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = TdxRoadClient::new(&config(&server, true)).unwrap();
        assert!(matches!(client.fetch_incidents().await, Err(RoadError::TokenRejected)));
        // The next call has to exchange credentials again
        assert!(matches!(client.fetch_incidents().await, Err(RoadError::TokenRejected)));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let client = TdxRoadClient::new(&config(&server, false)).unwrap();
        assert!(matches!(client.fetch_incidents().await, Err(RoadError::RateLimited(30))));
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = TdxRoadClient::new(&config(&server, false)).unwrap();
        let err = client.fetch_incidents().await.unwrap_err();
        assert!(matches!(err, RoadError::ApiError(_)));
        assert_eq!(err.user_message(), "路況資料來源回應錯誤");
    }

    #[tokio::test]
    async fn test_unparsable_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = TdxRoadClient::new(&config(&server, false)).unwrap();
        assert!(matches!(client.fetch_incidents().await, Err(RoadError::Parse(_))));
    }

    #[tokio::test]
    async fn test_missing_news_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = TdxRoadClient::new(&config(&server, false)).unwrap();
        assert!(matches!(client.fetch_incidents().await, Err(RoadError::Parse(_))));
    }
}
