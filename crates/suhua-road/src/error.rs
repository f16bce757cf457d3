//! Road-feed error types.

use suhua_core::{NetworkError, ReqwestErrorExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoadError {
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Access token rejected")]
    TokenRejected,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid taxonomy: {0}")]
    Taxonomy(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl From<reqwest::Error> for RoadError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.into_network_error())
    }
}

impl RoadError {
    /// Short description shown beside the failure label on the dashboard.
    pub fn user_message(&self) -> String {
        match self {
            Self::TokenExchange(_) | Self::TokenRejected => "路況資料授權失敗".to_string(),
            Self::RateLimited(secs) => format!("路況資料請求過於頻繁，{} 秒後重試", secs),
            Self::ApiError(_) => "路況資料來源回應錯誤".to_string(),
            Self::Parse(_) => "路況資料格式無法解析".to_string(),
            Self::Taxonomy(msg) => format!("路況關鍵字設定錯誤：{}", msg),
            Self::Network(_) => "路況資料來源連線失敗".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        assert!(RoadError::RateLimited(30).user_message().contains("30"));
        assert!(RoadError::Taxonomy("no segments".into())
            .user_message()
            .contains("no segments"));
    }

    #[test]
    fn test_network_failures_share_one_message() {
        assert_eq!(
            RoadError::Network(NetworkError::Timeout).user_message(),
            RoadError::Network(NetworkError::ConnectionFailed("refused".into())).user_message()
        );
    }
}
