//! HTTP client abstraction for testability

use futures::future::BoxFuture;
use thiserror::Error;

use crate::config::ServerConfig;

/// Errors from the HTTP layer. `Status` carries any non-2xx response code;
/// everything else (DNS, connect, timeout, body read) is a connection error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP status {0}")]
    Status(u16),
}

/// Trait for HTTP GET operations.
///
/// Dyn-compatible via boxed futures so tests can inject scripted clients.
pub trait HttpClient: Send + Sync {
    /// Performs a GET request and returns the response body.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, HttpError>>;
}

impl<T: HttpClient + ?Sized> HttpClient for std::sync::Arc<T> {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, HttpError>> {
        (**self).get(url)
    }
}

/// Real HTTP client backed by reqwest, configured with the server's
/// User-Agent and timeout.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(config: &ServerConfig) -> Result<Self, HttpError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let user_agent = config
            .user_agent
            .parse()
            .map_err(|e| HttpError::Connection(format!("invalid User-Agent: {}", e)))?;
        headers.insert(reqwest::header::USER_AGENT, user_agent);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| HttpError::Connection(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, HttpError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| HttpError::Connection(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(HttpError::Status(status.as_u16()));
            }

            response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| HttpError::Connection(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MockHttpClient;

    #[tokio::test]
    async fn test_mock_client_counts_calls() {
        let mock = MockHttpClient::new(|_, _| Ok(vec![1, 2, 3]));
        assert_eq!(mock.get("http://example.com/a").await.unwrap(), vec![1, 2, 3]);
        mock.get("http://example.com/a").await.unwrap();
        mock.get("http://example.com/b").await.unwrap();
        assert_eq!(mock.calls_matching("/a"), 2);
        assert_eq!(mock.calls_matching("example.com"), 3);
    }

    #[tokio::test]
    async fn test_mock_client_error() {
        let mock = MockHttpClient::new(|_, _| Err(HttpError::Status(404)));
        assert_eq!(
            mock.get("http://example.com").await,
            Err(HttpError::Status(404))
        );
    }
}
