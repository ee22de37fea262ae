use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::models::{RankRequest, RankResponse};
use crate::services::circuit_breaker::{BreakerConfig, BreakerError, CircuitBreaker};

/// Failures of a single call to the ranking service
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to execute request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("ranking service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("ranking call timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors surfaced by [`RankingClient`]
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("time budget exceeded: {elapsed:?} > {threshold:?}")]
    BudgetExceeded { elapsed: Duration, threshold: Duration },

    #[error("too many candidates: {count}, maximum allowed: {max}")]
    TooManyCandidates { count: usize, max: usize },

    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RankingError {
    /// Only transport-class failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, RankingError::Transport(_))
    }
}

/// Wire-level access to the ranking service
#[async_trait]
pub trait RankingTransport: Send + Sync {
    async fn rank(&self, request: &RankRequest) -> Result<RankResponse, TransportError>;
}

/// JSON-over-HTTP transport: `POST {base_url}/api/rank`
pub struct HttpRankingTransport {
    base_url: String,
    client: Client,
}

impl HttpRankingTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RankingTransport for HttpRankingTransport {
    async fn rank(&self, request: &RankRequest) -> Result<RankResponse, TransportError> {
        let url = format!("{}/api/rank", self.base_url.trim_end_matches('/'));

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Limits applied around every ranking call
#[derive(Debug, Clone, Copy)]
pub struct RankingClientConfig {
    pub call_timeout: Duration,
    pub max_candidates: usize,
    pub failure_threshold: u32,
    pub open_timeout: Duration,
    /// Time already spent on the request beyond which the service is not called
    pub time_budget: Duration,
    /// First retry delay; doubled for every further attempt
    pub initial_backoff: Duration,
}

impl Default for RankingClientConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_millis(800),
            max_candidates: 250,
            failure_threshold: 20,
            open_timeout: Duration::from_secs(30),
            time_budget: Duration::from_millis(400),
            initial_backoff: Duration::from_millis(10),
        }
    }
}

/// Ranking service client with a time budget, a size bound, a circuit
/// breaker and bounded retries.
///
/// One instance is meant to be shared by every in-flight request; its
/// breaker is the only state carried between requests.
pub struct RankingClient {
    transport: Arc<dyn RankingTransport>,
    breaker: CircuitBreaker,
    config: RankingClientConfig,
}

impl RankingClient {
    pub fn new(transport: Arc<dyn RankingTransport>, config: RankingClientConfig) -> Self {
        let breaker = CircuitBreaker::new(BreakerConfig {
            max_errors: config.failure_threshold,
            timeout: config.open_timeout,
        });

        Self {
            transport,
            breaker,
            config,
        }
    }

    pub fn config(&self) -> &RankingClientConfig {
        &self.config
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Issue one ranking call.
    ///
    /// Budget and size violations fail before any I/O. A response carrying a
    /// service-reported `error` is returned as `Ok`; it is not a call failure
    /// and does not count against the breaker.
    pub async fn rank_candidates(
        &self,
        request: &RankRequest,
        elapsed: Duration,
    ) -> Result<RankResponse, RankingError> {
        if elapsed > self.config.time_budget {
            return Err(RankingError::BudgetExceeded {
                elapsed,
                threshold: self.config.time_budget,
            });
        }

        if request.candidates.len() > self.config.max_candidates {
            return Err(RankingError::TooManyCandidates {
                count: request.candidates.len(),
                max: self.config.max_candidates,
            });
        }

        let transport = &self.transport;
        let call_timeout = self.config.call_timeout;

        self.breaker
            .call(|| async move {
                match tokio::time::timeout(call_timeout, transport.rank(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout(call_timeout)),
                }
            })
            .await
            .map_err(|e| match e {
                BreakerError::Open => RankingError::CircuitOpen,
                BreakerError::Inner(transport_error) => RankingError::Transport(transport_error),
            })
    }

    /// [`rank_candidates`](Self::rank_candidates) with up to `max_retries`
    /// further attempts for transport failures, backing off 10ms, 20ms, 40ms...
    /// Time spent retrying is charged against the budget, so a retry that
    /// starts after the budget is spent ends with
    /// [`RankingError::BudgetExceeded`] rather than the last transport error.
    pub async fn rank_candidates_with_retry(
        &self,
        request: &RankRequest,
        max_retries: usize,
        elapsed: Duration,
    ) -> Result<RankResponse, RankingError> {
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            match self.rank_candidates(request, elapsed + started.elapsed()).await {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_retryable() || attempt >= max_retries => return Err(e),
                Err(e) => {
                    let delay = self.backoff_delay(attempt);
                    tracing::debug!(
                        "Ranking attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.config.initial_backoff.saturating_mul(factor)
    }
}
