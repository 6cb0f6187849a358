//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a call is retryable (idempotent verbs only)
//! - Re-run the rest of the chain with exponential backoff + jitter
//! - Enforce a retry budget shared by every call through the chain
//!
//! # Design Decisions
//! - Never retry POST/PATCH (non-idempotent)
//! - Connect failures, transport timeouts and 5xx responses are transient
//! - Backoff sleeps race the call's token and deadline; `Cancelled` is
//!   returned as soon as either fires
//! - A retry whose backoff would outlast the deadline is not attempted;
//!   the last outcome is returned instead

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::RetryConfig;
use crate::error::{ApiError, CancelReason};
use crate::http::request::ApiRequest;
use crate::http::response::ApiResponse;
use crate::observability::metrics;
use crate::pipeline::{Interceptor, Next};
use crate::resilience::backoff::Backoff;
use crate::resilience::timeouts::{remaining, sleep_until_deadline};

const TOKEN: u64 = 1000;
const RESERVE_MULTIPLIER: u64 = 10;

/// Token bucket limiting retries to a share of traffic.
///
/// Every first attempt deposits `ratio` of a token and every retry spends
/// one. The bucket starts with `min_retries` tokens and holds at most ten
/// times that.
#[derive(Debug)]
pub struct RetryBudget {
    deposit: u64,
    cap: u64,
    balance: AtomicU64,
}

impl RetryBudget {
    pub fn new(ratio: f32, min_retries: u32) -> Self {
        let reserve = u64::from(min_retries.max(1)) * TOKEN;
        Self {
            deposit: (f64::from(ratio.clamp(0.0, 1.0)) * TOKEN as f64) as u64,
            cap: reserve * RESERVE_MULTIPLIER,
            balance: AtomicU64::new(reserve),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.budget_ratio, config.min_retries)
    }

    /// Credit the budget for one first attempt.
    pub fn deposit(&self) {
        let _ = self.balance.fetch_update(Ordering::AcqRel, Ordering::Acquire, |balance| {
            Some(balance.saturating_add(self.deposit).min(self.cap))
        });
    }

    /// Spend one retry. False when the budget is exhausted.
    pub fn withdraw(&self) -> bool {
        self.balance
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |balance| balance.checked_sub(TOKEN))
            .is_ok()
    }

    /// Whole retries currently available.
    pub fn available(&self) -> u64 {
        self.balance.load(Ordering::Acquire) / TOKEN
    }
}

/// Re-runs the rest of the chain on transient failures.
#[derive(Debug)]
pub struct RetryInterceptor {
    max_attempts: u32,
    backoff: Backoff,
    budget: RetryBudget,
}

impl RetryInterceptor {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Backoff::from_config(config),
            budget: RetryBudget::from_config(config),
        }
    }

    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }
}

fn is_retryable(outcome: &Result<ApiResponse, ApiError>) -> bool {
    match outcome {
        Ok(response) => response.status.is_server_error(),
        Err(e) => e.is_transient(),
    }
}

#[async_trait]
impl Interceptor for RetryInterceptor {
    fn name(&self) -> &str {
        "retry"
    }

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, ApiError> {
        if !request.is_idempotent() || self.max_attempts == 1 {
            return next.run(request).await;
        }

        self.budget.deposit();
        let mut attempt = 1;

        loop {
            let outcome = next.run(request.clone()).await;
            if !is_retryable(&outcome) || attempt >= self.max_attempts {
                return outcome;
            }

            let delay = self.backoff.delay(attempt);
            if remaining(request.deadline()).is_some_and(|left| left <= delay) {
                tracing::debug!(
                    request_id = %request.id(),
                    method = request.method().name,
                    attempt,
                    "Deadline too close to retry"
                );
                return outcome;
            }
            if !self.budget.withdraw() {
                tracing::warn!(
                    request_id = %request.id(),
                    method = request.method().name,
                    "Retry budget exhausted"
                );
                return outcome;
            }

            metrics::record_retry(request.contract(), request.method().name);
            tracing::debug!(
                request_id = %request.id(),
                method = request.method().name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying call"
            );

            tokio::select! {
                biased;
                _ = request.cancellation().cancelled() => {
                    return Err(ApiError::Cancelled { reason: CancelReason::Token });
                }
                _ = sleep_until_deadline(request.deadline()) => {
                    return Err(ApiError::Cancelled { reason: CancelReason::Deadline });
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
