//! The feed abstraction shared by every CWA dataset.

use chrono::{DateTime, Utc};

use crate::client::{CwaClient, RawPayload, SourceConfig};
use crate::types::WeatherError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Rain,
    Forecast,
    Earthquake,
    Typhoon,
}

impl FeedKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rain => "rain",
            Self::Forecast => "forecast",
            Self::Earthquake => "earthquake",
            Self::Typhoon => "typhoon",
        }
    }
}

/// A dataset that can be parsed into domain records.
///
/// `unavailable` must have the same shape as a successful parse so that
/// callers never have to special-case a failed upstream.
pub trait Feed {
    type Output;

    fn kind(&self) -> FeedKind;

    fn source(&self) -> SourceConfig;

    fn parse(&self, raw: &RawPayload, now: DateTime<Utc>) -> Result<Self::Output, WeatherError>;

    fn unavailable(&self) -> Self::Output;
}

/// Fetches and parses feeds, absorbing every failure
#[derive(Debug, Clone)]
pub struct CwaProvider {
    client: CwaClient,
}

impl CwaProvider {
    pub fn new(client: CwaClient) -> Self {
        Self { client }
    }

    /// Fetch + parse, or the feed's unavailable value on any error
    pub async fn load<F: Feed>(&self, feed: &F, now: DateTime<Utc>) -> F::Output {
        match self.try_load(feed, now).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(feed = feed.kind().name(), error = %e, "Feed unavailable");
                feed.unavailable()
            }
        }
    }

    pub async fn try_load<F: Feed>(
        &self,
        feed: &F,
        now: DateTime<Utc>,
    ) -> Result<F::Output, WeatherError> {
        let raw = self.client.fetch(&feed.source()).await?;
        let output = feed.parse(&raw, now)?;
        tracing::debug!(feed = feed.kind().name(), "Feed loaded");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suhua_core::CwaConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct CountFeed;

    impl Feed for CountFeed {
        type Output = usize;

        fn kind(&self) -> FeedKind {
            FeedKind::Rain
        }

        fn source(&self) -> SourceConfig {
            SourceConfig::dataset("COUNT")
        }

        fn parse(&self, raw: &RawPayload, _now: DateTime<Utc>) -> Result<usize, WeatherError> {
            raw.records()?
                .get("items")
                .and_then(|v| v.as_array())
                .map(Vec::len)
                .ok_or_else(|| WeatherError::Parse("items".into()))
        }

        fn unavailable(&self) -> usize {
            usize::MAX
        }
    }

    async fn provider(server: &MockServer) -> CwaProvider {
        let config = CwaConfig {
            api_key: "k".to_string(),
            base_url: server.uri(),
            ..CwaConfig::default()
        };
        CwaProvider::new(CwaClient::new(&config).unwrap())
    }

    #[tokio::test]
    async fn test_load_parses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/COUNT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "records": { "items": [1, 2, 3] }
            })))
            .mount(&server)
            .await;

        let provider = provider(&server).await;
        assert_eq!(provider.load(&CountFeed, Utc::now()).await, 3);
    }

    #[tokio::test]
    async fn test_load_falls_back_on_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "records": {}
            })))
            .mount(&server)
            .await;

        let provider = provider(&server).await;
        assert_eq!(provider.load(&CountFeed, Utc::now()).await, usize::MAX);
    }

    #[tokio::test]
    async fn test_load_falls_back_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = provider(&server).await;
        assert_eq!(provider.load(&CountFeed, Utc::now()).await, usize::MAX);
    }
}
