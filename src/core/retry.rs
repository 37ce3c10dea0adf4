//! Bounded retry with exponential backoff, shared by every remote call site.
//!
//! The loop is an explicit state machine:
//! `Attempt(n)` → `Succeeded` | `Failed` | `Backoff(delay)` → `Attempt(n + 1)`.

use crate::domain::ports::{ApiRequest, ApiResponse, HttpTransport, TransportError};
use crate::utils::error::SyncError;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Success,
    /// 429, 5xx, timeout or connection failure.
    Transient(String),
    /// 401/403, never retried.
    Unauthorized(u16),
    /// Any other response or transport failure, never retried.
    Rejected(String),
}

pub fn classify(result: &Result<ApiResponse, TransportError>) -> AttemptResult {
    match result {
        Ok(response) if response.is_success() => AttemptResult::Success,
        Ok(response) if response.status == 401 || response.status == 403 => {
            AttemptResult::Unauthorized(response.status)
        }
        Ok(response) if response.status == 429 || (500..600).contains(&response.status) => {
            AttemptResult::Transient(format!("HTTP {}", response.status))
        }
        Ok(response) => AttemptResult::Rejected(format!("HTTP {}", response.status)),
        Err(error @ (TransportError::Timeout(_) | TransportError::Connect(_))) => {
            AttemptResult::Transient(error.to_string())
        }
        Err(error) => AttemptResult::Rejected(error.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    Attempt(u32),
    Backoff(Duration),
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
    retries: u32,
    step: RetryStep,
}

impl RetryState {
    fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt: 1,
            retries: 0,
            step: RetryStep::Attempt(1),
        }
    }

    pub fn step(&self) -> RetryStep {
        self.step
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Advances after the current attempt finished.
    pub fn record(&mut self, outcome: &AttemptResult) -> RetryStep {
        self.step = match outcome {
            AttemptResult::Success => RetryStep::Succeeded,
            AttemptResult::Transient(_) if self.retries < self.policy.max_retries => {
                self.retries += 1;
                RetryStep::Backoff(self.policy.backoff_delay(self.retries))
            }
            _ => RetryStep::Failed,
        };
        self.step
    }

    /// Leaves backoff and starts the next attempt.
    pub fn resume(&mut self) -> RetryStep {
        if let RetryStep::Backoff(_) = self.step {
            self.attempt += 1;
            self.step = RetryStep::Attempt(self.attempt);
        }
        self.step
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    #[error("unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("{reason} after {retries} retries")]
    Exhausted { retries: u32, reason: String },

    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("{0}")]
    Transport(String),
}

impl RetryError {
    pub fn into_sync_error(self, operation: &str) -> SyncError {
        match self {
            RetryError::Unauthorized { status } => SyncError::Auth {
                operation: operation.to_string(),
                status,
            },
            RetryError::Exhausted { retries, reason } => SyncError::Transient {
                operation: operation.to_string(),
                retries,
                reason,
            },
            RetryError::Rejected { status, body } => SyncError::ApiRejected {
                operation: operation.to_string(),
                status,
                body,
            },
            RetryError::Transport(reason) => SyncError::Transient {
                operation: operation.to_string(),
                retries: 0,
                reason,
            },
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry `retry` (1-based): base, 2×base, 4×base, ...
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    pub fn start(&self) -> RetryState {
        RetryState::new(*self)
    }

    pub async fn execute<T: HttpTransport + ?Sized>(
        &self,
        transport: &T,
        request: &ApiRequest,
    ) -> Result<ApiResponse, RetryError> {
        let mut state = self.start();

        loop {
            let result = transport.send(request).await;
            let outcome = classify(&result);

            match state.record(&outcome) {
                RetryStep::Backoff(delay) => {
                    if let AttemptResult::Transient(reason) = &outcome {
                        tracing::warn!(
                            "⏳ {} {} -> {}; retry {}/{} in {:?}",
                            request.method,
                            request.url,
                            reason,
                            state.retries(),
                            self.max_retries,
                            delay
                        );
                    }
                    tokio::time::sleep(delay).await;
                    state.resume();
                }
                _ => return finish(outcome, result, state.retries()),
            }
        }
    }
}

fn finish(
    outcome: AttemptResult,
    result: Result<ApiResponse, TransportError>,
    retries: u32,
) -> Result<ApiResponse, RetryError> {
    match (outcome, result) {
        (AttemptResult::Success, Ok(response)) => Ok(response),
        (AttemptResult::Unauthorized(status), _) => Err(RetryError::Unauthorized { status }),
        (AttemptResult::Transient(reason), _) => Err(RetryError::Exhausted { retries, reason }),
        (_, Ok(response)) => Err(RetryError::Rejected {
            status: response.status,
            body: response.body,
        }),
        (_, Err(error)) => Err(RetryError::Transport(error.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fakes::ScriptedTransport;
    use crate::domain::ports::HttpMethod;

    fn request() -> ApiRequest {
        ApiRequest::new(
            HttpMethod::Patch,
            "https://tenant.example/api/v2/policy/urllist/7/append",
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_backoff_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn test_state_machine_two_transients_then_success() {
        let mut state = RetryPolicy::default().start();
        let busy = AttemptResult::Transient("HTTP 503".to_string());

        assert_eq!(state.step(), RetryStep::Attempt(1));
        assert_eq!(state.record(&busy), RetryStep::Backoff(Duration::from_secs(1)));
        assert_eq!(state.resume(), RetryStep::Attempt(2));
        assert_eq!(state.record(&busy), RetryStep::Backoff(Duration::from_secs(2)));
        assert_eq!(state.resume(), RetryStep::Attempt(3));
        assert_eq!(state.record(&AttemptResult::Success), RetryStep::Succeeded);
        assert_eq!(state.retries(), 2);
    }

    #[test]
    fn test_state_machine_fails_after_max_retries() {
        let mut state = RetryPolicy::default().start();
        let throttled = AttemptResult::Transient("HTTP 429".to_string());

        for expected in [1, 2, 4] {
            assert_eq!(
                state.record(&throttled),
                RetryStep::Backoff(Duration::from_secs(expected))
            );
            state.resume();
        }
        assert_eq!(state.record(&throttled), RetryStep::Failed);
        assert_eq!(state.retries(), 3);
    }

    #[test]
    fn test_state_machine_unauthorized_fails_immediately() {
        let mut state = RetryPolicy::default().start();
        assert_eq!(state.record(&AttemptResult::Unauthorized(401)), RetryStep::Failed);
        assert_eq!(state.retries(), 0);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&Ok(ApiResponse::new(204, ""))), AttemptResult::Success);
        assert_eq!(
            classify(&Ok(ApiResponse::new(403, ""))),
            AttemptResult::Unauthorized(403)
        );
        assert!(matches!(
            classify(&Ok(ApiResponse::new(502, ""))),
            AttemptResult::Transient(_)
        ));
        assert!(matches!(
            classify(&Ok(ApiResponse::new(413, ""))),
            AttemptResult::Rejected(_)
        ));
        assert!(matches!(
            classify(&Err(TransportError::Timeout(Duration::from_secs(60)))),
            AttemptResult::Transient(_)
        ));
        assert!(matches!(
            classify(&Err(TransportError::Connect("connection reset".to_string()))),
            AttemptResult::Transient(_)
        ));
        assert!(matches!(
            classify(&Err(TransportError::Other("bad url".to_string()))),
            AttemptResult::Rejected(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_recovers_after_two_503() {
        let transport = ScriptedTransport::new()
            .respond_times(2, 503, "busy")
            .respond(200, "{}");
        let started = tokio::time::Instant::now();

        let response = RetryPolicy::default()
            .execute(&transport, &request())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.calls(), 3);
        // 1s + 2s of backoff on the paused clock
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_exhausts_on_repeated_429() {
        let transport = ScriptedTransport::new().respond_times(4, 429, "slow down");

        let error = RetryPolicy::default()
            .execute(&transport, &request())
            .await
            .unwrap_err();

        assert_eq!(
            error,
            RetryError::Exhausted {
                retries: 3,
                reason: "HTTP 429".to_string()
            }
        );
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_unauthorized_is_not_retried() {
        let transport = ScriptedTransport::new()
            .respond(401, "bad token")
            .respond(200, "{}");

        let error = RetryPolicy::default()
            .execute(&transport, &request())
            .await
            .unwrap_err();

        assert_eq!(error, RetryError::Unauthorized { status: 401 });
        assert_eq!(transport.calls(), 1);
        assert_eq!(transport.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_retries_timeouts() {
        let transport = ScriptedTransport::new()
            .fail(TransportError::Timeout(Duration::from_secs(60)))
            .respond(200, "ok");

        let response = RetryPolicy::default()
            .execute(&transport, &request())
            .await
            .unwrap();

        assert_eq!(response.body, "ok");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_retries_dropped_connections() {
        let transport = ScriptedTransport::new()
            .fail(TransportError::Connect("connection closed before message completed".to_string()))
            .fail(TransportError::Connect("connection reset by peer".to_string()))
            .respond(200, "ok");

        let response = RetryPolicy::default()
            .execute(&transport, &request())
            .await
            .unwrap();

        assert_eq!(response.body, "ok");
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_execute_rejected_status_keeps_body() {
        let transport = ScriptedTransport::new().respond(413, "payload too large");

        let error = RetryPolicy::default()
            .execute(&transport, &request())
            .await
            .unwrap_err();

        assert_eq!(
            error,
            RetryError::Rejected {
                status: 413,
                body: "payload too large".to_string()
            }
        );
    }

    #[test]
    fn test_into_sync_error_mapping() {
        let auth = RetryError::Unauthorized { status: 403 }.into_sync_error("deploy");
        assert!(matches!(auth, SyncError::Auth { status: 403, .. }));

        let exhausted = RetryError::Exhausted {
            retries: 3,
            reason: "HTTP 503".to_string(),
        }
        .into_sync_error("list URL lists");
        assert!(matches!(exhausted, SyncError::Transient { retries: 3, .. }));
    }
}
