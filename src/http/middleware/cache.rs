//! Response cache middleware.
//!
//! # Responsibilities
//! - Answer repeated `GET` calls from memory while the entry is fresh
//! - Store successful responses for `ttl`
//! - Keep at most `max_entries` responses
//!
//! # Design Decisions
//! - Keyed by contract, method and argument values; headers added by other
//!   stages are not part of the key
//! - Concurrent updates use DashMap's per-shard locking, never a global lock
//! - Only 2xx responses are stored

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Method;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::error::ApiError;
use crate::http::request::ApiRequest;
use crate::http::response::ApiResponse;
use crate::observability::metrics;
use crate::pipeline::{Interceptor, Next};

#[derive(Debug, Clone)]
struct CachedResponse {
    stored_at: Instant,
    response: ApiResponse,
}

impl CachedResponse {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

#[derive(Debug)]
pub struct CacheInterceptor {
    ttl: Duration,
    max_entries: usize,
    entries: DashMap<String, CachedResponse>,
}

impl CacheInterceptor {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: DashMap::new(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every stored response.
    pub fn clear(&self) {
        self.entries.clear();
    }

    fn lookup(&self, key: &str) -> Option<ApiResponse> {
        let hit = self
            .entries
            .get(key)
            .and_then(|entry| entry.is_fresh(self.ttl).then(|| entry.response.clone()));
        if hit.is_none() {
            self.entries.remove_if(key, |_, entry| !entry.is_fresh(self.ttl));
        }
        hit
    }

    fn store(&self, key: String, response: ApiResponse) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.entries.retain(|_, entry| entry.is_fresh(self.ttl));
            if self.entries.len() >= self.max_entries {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|entry| entry.stored_at)
                    .map(|entry| entry.key().clone());
                if let Some(oldest) = oldest {
                    self.entries.remove(&oldest);
                }
            }
        }

        self.entries.insert(
            key,
            CachedResponse {
                stored_at: Instant::now(),
                response,
            },
        );
    }
}

fn cache_key(request: &ApiRequest) -> String {
    let mut key = format!("{}::{}", request.contract(), request.method().name);
    for (name, value) in request.arguments().iter() {
        key.push_str(&format!("|{}={}", name, value));
    }
    key
}

#[async_trait]
impl Interceptor for CacheInterceptor {
    fn name(&self) -> &str {
        "cache"
    }

    async fn intercept(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, ApiError> {
        if request.method().verb != Method::GET {
            return next.run(request).await;
        }

        let key = cache_key(&request);
        if let Some(response) = self.lookup(&key) {
            metrics::record_cache(true);
            tracing::debug!(request_id = %request.id(), key = %key, "Cache hit");
            return Ok(response);
        }
        metrics::record_cache(false);

        let response = next.run(request).await?;
        if response.is_success() {
            self.store(key, response.clone());
        }
        Ok(response)
    }
}
