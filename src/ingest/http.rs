//! HTTP JSON candidate source
//!
//! Each endpoint is one sub-source returning a JSON array of candidate
//! records. Endpoints are queried in order; one failing endpoint is logged
//! and skipped, and the fetch only fails when every endpoint failed.

use std::time::Duration;

use crate::catalog::CatRecord;

use super::source::{Batch, CandidateSource, SourceError};

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Candidate source backed by HTTP endpoints serving JSON
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    endpoints: Vec<String>,
}

impl HttpSource {
    /// Create a source with the default request timeout
    pub fn new(endpoints: Vec<String>) -> Result<Self, SourceError> {
        Self::with_timeout(endpoints, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a source with a custom request timeout
    pub fn with_timeout(endpoints: Vec<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("catfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Setup(e.to_string()))?;

        Ok(Self { client, endpoints })
    }

    /// Endpoints in query order
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    async fn fetch_endpoint(&self, endpoint: &str) -> Result<Vec<CatRecord>, SourceError> {
        let request_error = |e: reqwest::Error| SourceError::Request {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        };

        let mut records: Vec<CatRecord> = self
            .client
            .get(endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(request_error)?
            .error_for_status()
            .map_err(request_error)?
            .json()
            .await
            .map_err(request_error)?;

        for record in &mut records {
            if record.source.is_empty() {
                record.source = endpoint.to_string();
            }
        }

        Ok(records)
    }
}

impl CandidateSource for HttpSource {
    async fn fetch_candidates(
        &self,
        total: usize,
        per_source: usize,
    ) -> Result<Vec<CatRecord>, SourceError> {
        let mut batch = Batch::new(total);
        let mut failures = 0;

        for endpoint in &self.endpoints {
            if batch.is_full() {
                break;
            }

            match self.fetch_endpoint(endpoint).await {
                Ok(records) => {
                    tracing::debug!(endpoint = %endpoint, found = records.len(), "Endpoint fetched");
                    batch.extend_from(records, per_source);
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(error = %e, "Source endpoint failed");
                }
            }
        }

        if failures > 0 && failures == self.endpoints.len() {
            return Err(SourceError::AllFailed(failures));
        }

        Ok(batch.into_records())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serve `body` as JSON to every request, return the endpoint url
    async fn serve_json(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}/cats", addr)
    }

    /// An endpoint nothing listens on
    async fn dead_endpoint() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/cats", addr)
    }

    #[tokio::test]
    async fn test_failing_endpoint_skipped() {
        let good = serve_json(
            r#"[{"id":"a","breed":"Tabby","url":"http://img/a"},
                {"id":"b","breed":"Siamese","url":"http://img/b","source":"rescue"}]"#,
        )
        .await;
        let source = HttpSource::new(vec![dead_endpoint().await, good.clone()]).unwrap();

        let batch = source.fetch_candidates(10, 10).await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].source, good);
        assert_eq!(batch[1].source, "rescue");
    }

    #[tokio::test]
    async fn test_all_endpoints_failed() {
        let source = HttpSource::new(vec![dead_endpoint().await, dead_endpoint().await]).unwrap();

        let result = source.fetch_candidates(10, 10).await;
        assert!(matches!(result, Err(SourceError::AllFailed(2))));
    }

    #[tokio::test]
    async fn test_no_endpoints_is_empty_batch() {
        let source = HttpSource::new(Vec::new()).unwrap();
        assert!(source.fetch_candidates(10, 10).await.unwrap().is_empty());
    }
}
