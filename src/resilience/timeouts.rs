//! Deadline helpers.
//!
//! Call deadlines are plain `std::time::Instant`s carried on the request.
//! These helpers turn them into futures that can take part in a
//! `tokio::select!` race.

use std::time::{Duration, Instant};

/// Resolve once `deadline` has passed. Never resolves without a deadline.
pub async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Time left before `deadline`, if one is set.
pub fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}
