//! Radar and typhoon-track image proxy.

use axum::body::Bytes;
use std::time::Duration;
use suhua_core::{AppError, CwaConfig, NetworkError, ReqwestErrorExt, ServerConfig};
use tracing::instrument;

pub const RADAR_IMAGE_PATH: &str = "/api/radar-image";
pub const TYPHOON_IMAGE_PATH: &str = "/api/typhoon-image";

/// Typhoon chart link embedded in the dashboard payload.
///
/// The page loads it as-is from another origin, so it must be absolute:
/// the proxy route under `public_url` when one is configured, otherwise
/// the upstream image.
pub fn typhoon_image_link(server: &ServerConfig, cwa: &CwaConfig) -> String {
    match server
        .public_url
        .as_deref()
        .map(|base| base.trim_end_matches('/'))
        .filter(|base| !base.is_empty())
    {
        Some(base) => format!("{}{}", base, TYPHOON_IMAGE_PATH),
        None => cwa.typhoon_image_url.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Radar,
    Typhoon,
}

impl ImageKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Radar => "radar",
            Self::Typhoon => "typhoon",
        }
    }
}

/// Upstream image, passed through unchanged
#[derive(Debug, Clone)]
pub struct ProxiedImage {
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct ImageProxy {
    client: reqwest::Client,
    radar_url: String,
    typhoon_url: String,
}

impl ImageProxy {
    pub fn new(config: &CwaConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Network(e.into_network_error()))?;

        Ok(Self {
            client,
            radar_url: config.radar_image_url.clone(),
            typhoon_url: config.typhoon_image_url.clone(),
        })
    }

    fn url(&self, kind: ImageKind) -> &str {
        match kind {
            ImageKind::Radar => &self.radar_url,
            ImageKind::Typhoon => &self.typhoon_url,
        }
    }

    #[instrument(skip(self), fields(kind = kind.name()), level = "debug")]
    pub async fn fetch(&self, kind: ImageKind) -> Result<ProxiedImage, AppError> {
        let response = self
            .client
            .get(self.url(kind))
            .send()
            .await
            .map_err(|e| AppError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message: format!("{} image upstream returned {}", kind.name(), status),
            }
            .into());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Network(e.into_network_error()))?;

        Ok(ProxiedImage {
            content_type,
            bytes,
        })
    }
}
