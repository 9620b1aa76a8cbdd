//! Content sources resolve a provider message id into its media bytes.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use reqwest::{Client, StatusCode, header};
use std::io;
use thiserror::Error;

/// Used when the provider does not say what it sent.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid source id `{0}`")]
    InvalidId(String),
    #[error("content request for `{source_id}` failed with status {status}")]
    Status {
        source_id: String,
        status: StatusCode,
    },
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Media bytes and their declared MIME type. The body is consumed once.
pub struct FetchedContent {
    pub content_type: String,
    pub body: BoxStream<'static, io::Result<Bytes>>,
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, source_id: &str) -> Result<FetchedContent, SourceError>;
}

/// Fetches `GET {base_url}/{source_id}/content`, optionally with a bearer
/// token, and streams the response body.
#[derive(Debug, Clone)]
pub struct HttpContentSource {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpContentSource {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn content_url(&self, source_id: &str) -> String {
        format!("{}/{}/content", self.base_url, source_id)
    }
}

fn ensure_id_safe(source_id: &str) -> Result<(), SourceError> {
    if source_id.is_empty()
        || !source_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        || source_id.contains("..")
    {
        return Err(SourceError::InvalidId(source_id.to_string()));
    }
    Ok(())
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch(&self, source_id: &str) -> Result<FetchedContent, SourceError> {
        ensure_id_safe(source_id)?;

        let mut request = self.client.get(self.content_url(source_id));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                source_id: source_id.to_string(),
                status,
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let body = response
            .bytes_stream()
            .map_err(io::Error::other)
            .boxed();

        Ok(FetchedContent { content_type, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_url_joins_base_and_id() {
        let source = HttpContentSource::new("https://api-data.example.com/v2/bot/message/", None);
        assert_eq!(
            source.content_url("12345"),
            "https://api-data.example.com/v2/bot/message/12345/content"
        );
    }

    #[test]
    fn source_ids_are_validated() {
        assert!(ensure_id_safe("468789577898262530").is_ok());
        assert!(ensure_id_safe("msg_01-a.b").is_ok());
        assert!(ensure_id_safe("").is_err());
        assert!(ensure_id_safe("../etc").is_err());
        assert!(ensure_id_safe("a/b").is_err());
        assert!(ensure_id_safe("a?b=c").is_err());
    }

    #[tokio::test]
    async fn invalid_id_fails_before_any_request() {
        let source = HttpContentSource::new("http://127.0.0.1:9", None);
        let err = match source.fetch("bad/id").await {
            Err(err) => err,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(err, SourceError::InvalidId(_)));
    }
}
