//! Response Stream-Back
//!
//! Streams an upstream body to the caller and records usage once the copy has
//! been attempted, however it ends.

use axum::body::Body;
use axum::http::StatusCode;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::UsageAggregator;
use crate::router::Tier;

/// Pending usage record for one routed request
///
/// Recorded exactly once, when dropped: after the last chunk, after a failed
/// chunk, or when the caller goes away mid-stream.
#[derive(Debug)]
pub struct UsageGuard {
    metrics: Arc<UsageAggregator>,
    tier: Tier,
    cost: f64,
    status: StatusCode,
    started: Instant,
    bytes: u64,
    expected: Option<u64>,
    finished: bool,
    error: Option<String>,
}

/// How the copy back to the caller ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Complete,
    Failed,
    Abandoned,
}

impl UsageGuard {
    pub fn new(
        metrics: Arc<UsageAggregator>,
        tier: Tier,
        cost: f64,
        status: StatusCode,
        started: Instant,
    ) -> Self {
        Self {
            metrics,
            tier,
            cost,
            status,
            started,
            bytes: 0,
            expected: None,
            finished: false,
            error: None,
        }
    }

    /// Count a chunk sent to the caller
    ///
    /// A body with a declared length is complete once that many bytes are out;
    /// the server may drop the stream right after without polling it again.
    fn advance(&mut self, len: usize) {
        self.bytes += len as u64;
        if self.expected.is_some_and(|expected| self.bytes >= expected) {
            self.finished = true;
        }
    }

    fn outcome(&self) -> Outcome {
        if self.error.is_some() {
            Outcome::Failed
        } else if self.finished {
            Outcome::Complete
        } else {
            Outcome::Abandoned
        }
    }
}

impl Drop for UsageGuard {
    fn drop(&mut self) {
        self.metrics.record(self.tier, self.cost);

        match self.outcome() {
            Outcome::Complete => {}
            Outcome::Failed => tracing::error!(
                tier = %self.tier,
                bytes = self.bytes,
                error = self.error.as_deref().unwrap_or_default(),
                "Failed to copy response body back"
            ),
            Outcome::Abandoned => tracing::warn!(
                tier = %self.tier,
                bytes = self.bytes,
                "Caller went away before the response body was fully sent"
            ),
        }

        tracing::info!(
            "<- RSP: Model: {} | Cost Est: ${:.6} | Status: {} | Time: {:?} | Size: {} bytes",
            self.tier,
            self.cost,
            self.status.as_u16(),
            self.started.elapsed(),
            self.bytes
        );
    }
}

/// Wrap an upstream response body so it streams chunk by chunk
pub fn metered_body(upstream: reqwest::Response, mut guard: UsageGuard) -> Body {
    guard.expected = upstream.content_length();
    let mut chunks = Box::pin(upstream.bytes_stream());

    let stream = async_stream::stream! {
        let mut guard = guard;

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    guard.advance(bytes.len());
                    yield Ok(bytes);
                }
                Err(e) => {
                    guard.error = Some(e.to_string());
                    yield Err(e);
                    break;
                }
            }
        }

        guard.finished = true;
    };

    Body::from_stream(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_records_on_drop() {
        let metrics = Arc::new(UsageAggregator::new());
        let guard = UsageGuard::new(
            Arc::clone(&metrics),
            Tier::ExpensiveModel,
            0.25,
            StatusCode::OK,
            Instant::now(),
        );

        assert_eq!(metrics.snapshot().total_requests, 0);
        drop(guard);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.requests_for(Tier::ExpensiveModel), 1);
        assert_eq!(snapshot.total_cost_usd, 0.25);
    }

    #[tokio::test]
    async fn test_metered_body_streams_and_records_once() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(200)
            .with_body("streamed body")
            .create_async()
            .await;

        let upstream = reqwest::get(server.url()).await.unwrap();
        let metrics = Arc::new(UsageAggregator::new());
        let guard = UsageGuard::new(
            Arc::clone(&metrics),
            Tier::CheapModel,
            1.0e-6,
            StatusCode::OK,
            Instant::now(),
        );

        let body = metered_body(upstream, guard);
        assert_eq!(metrics.snapshot().total_requests, 0);

        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(bytes, "streamed body");
        assert_eq!(metrics.snapshot().requests_for(Tier::CheapModel), 1);
    }

    #[tokio::test]
    async fn test_abandoned_body_still_records() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .with_status(200)
            .with_body("never read")
            .create_async()
            .await;

        let upstream = reqwest::get(server.url()).await.unwrap();
        let metrics = Arc::new(UsageAggregator::new());
        let guard = UsageGuard::new(
            Arc::clone(&metrics),
            Tier::CheapModel,
            0.0,
            StatusCode::OK,
            Instant::now(),
        );

        drop(metered_body(upstream, guard));
        assert_eq!(metrics.snapshot().total_requests, 1);
    }

    fn cheap_guard(metrics: &Arc<UsageAggregator>) -> UsageGuard {
        UsageGuard::new(
            Arc::clone(metrics),
            Tier::CheapModel,
            0.0,
            StatusCode::OK,
            Instant::now(),
        )
    }

    #[test]
    fn test_declared_length_reached_is_complete() {
        let metrics = Arc::new(UsageAggregator::new());
        let mut guard = cheap_guard(&metrics);
        guard.expected = Some(5);

        guard.advance(3);
        assert_eq!(guard.outcome(), Outcome::Abandoned);
        guard.advance(2);
        assert_eq!(guard.outcome(), Outcome::Complete);
    }

    #[test]
    fn test_unknown_length_needs_end_of_stream() {
        let metrics = Arc::new(UsageAggregator::new());
        let mut guard = cheap_guard(&metrics);

        guard.advance(1024);
        assert_eq!(guard.outcome(), Outcome::Abandoned);

        guard.error = Some("connection reset".to_string());
        assert_eq!(guard.outcome(), Outcome::Failed);
    }

    #[tokio::test]
    async fn test_upstream_failure_mid_body_is_recorded() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // promise 100 bytes, send 7, hang up
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\npartial")
                .await
                .unwrap();
        });

        let upstream = reqwest::get(format!("http://{}/", addr)).await.unwrap();
        let metrics = Arc::new(UsageAggregator::new());
        let body = metered_body(upstream, cheap_guard(&metrics));

        assert!(axum::body::to_bytes(body, usize::MAX).await.is_err());
        assert_eq!(metrics.snapshot().total_requests, 1);
        assert_eq!(metrics.snapshot().requests_for(Tier::CheapModel), 1);
    }
}
