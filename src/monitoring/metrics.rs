// Copyright (c) 2026 Verity
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Prometheus metrics for the Cube engine: compile/parse counts, PoW hash
//! rate, parse-failure breakdown, `CubeContest` outcomes, and Continuation
//! split/recombine activity.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use thiserror::Error;

/// Metrics registration errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A metric failed to construct or register with the `Registry`.
    #[error("prometheus")]
    Prom,
}

/// Metrics container, cheaply `Clone`-able (every field is an `Arc`-backed
/// prometheus handle) so it can be threaded through `compile`/`parse`/
/// `split` calls without an `Arc<Metrics>` wrapper.
#[derive(Clone)]
pub struct Metrics {
    /// Registry all metrics below are registered against.
    pub registry: Registry,

    /// Cubes successfully compiled, across all types.
    pub cubes_compiled_total: IntCounter,
    /// Cubes successfully parsed from received bytes.
    pub cubes_parsed_total: IntCounter,
    /// Parse failures, labeled by `CubeError` variant name.
    pub parse_failures_total: IntCounterVec,

    /// Hash attempts made by the proof-of-work search loop.
    pub pow_attempts_total: IntCounter,
    /// Proof-of-work searches cancelled before finding a nonce.
    pub pow_cancelled_total: IntCounter,

    /// `CubeContest` resolutions, labeled by winning argument (`first` /
    /// `second`).
    pub contest_resolutions_total: IntCounterVec,

    /// Continuation `split` calls.
    pub continuation_splits_total: IntCounter,
    /// Chunk Cubes produced across all `split` calls.
    pub continuation_chunks_total: IntCounter,
    /// Continuation `recombine` calls.
    pub continuation_recombines_total: IntCounter,
}

impl Metrics {
    /// Create and register every metric against a fresh [`Registry`].
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let cubes_compiled_total =
            IntCounter::new("verity_cubes_compiled_total", "Cubes successfully compiled")
                .map_err(|_| MetricsError::Prom)?;
        let cubes_parsed_total =
            IntCounter::new("verity_cubes_parsed_total", "Cubes successfully parsed")
                .map_err(|_| MetricsError::Prom)?;
        let parse_failures_total = IntCounterVec::new(
            Opts::new("verity_parse_failures_total", "Cube parse failures by kind"),
            &["kind"],
        )
        .map_err(|_| MetricsError::Prom)?;

        let pow_attempts_total = IntCounter::new(
            "verity_pow_attempts_total",
            "Proof-of-work hash attempts across all searches",
        )
        .map_err(|_| MetricsError::Prom)?;
        let pow_cancelled_total = IntCounter::new(
            "verity_pow_cancelled_total",
            "Proof-of-work searches cancelled before completion",
        )
        .map_err(|_| MetricsError::Prom)?;

        let contest_resolutions_total = IntCounterVec::new(
            Opts::new("verity_contest_resolutions_total", "CubeContest outcomes by winner"),
            &["winner"],
        )
        .map_err(|_| MetricsError::Prom)?;

        let continuation_splits_total = IntCounter::new(
            "verity_continuation_splits_total",
            "Continuation split operations performed",
        )
        .map_err(|_| MetricsError::Prom)?;
        let continuation_chunks_total = IntCounter::new(
            "verity_continuation_chunks_total",
            "Chunk Cubes produced by Continuation split",
        )
        .map_err(|_| MetricsError::Prom)?;
        let continuation_recombines_total = IntCounter::new(
            "verity_continuation_recombines_total",
            "Continuation recombine operations performed",
        )
        .map_err(|_| MetricsError::Prom)?;

        registry.register(Box::new(cubes_compiled_total.clone())).map_err(|_| MetricsError::Prom)?;
        registry.register(Box::new(cubes_parsed_total.clone())).map_err(|_| MetricsError::Prom)?;
        registry.register(Box::new(parse_failures_total.clone())).map_err(|_| MetricsError::Prom)?;
        registry.register(Box::new(pow_attempts_total.clone())).map_err(|_| MetricsError::Prom)?;
        registry.register(Box::new(pow_cancelled_total.clone())).map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(contest_resolutions_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(continuation_splits_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(continuation_chunks_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(continuation_recombines_total.clone()))
            .map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            cubes_compiled_total,
            cubes_parsed_total,
            parse_failures_total,
            pow_attempts_total,
            pow_cancelled_total,
            contest_resolutions_total,
            continuation_splits_total,
            continuation_chunks_total,
            continuation_recombines_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_without_collision() {
        let metrics = Metrics::new().unwrap();
        metrics.pow_attempts_total.inc();
        metrics.parse_failures_total.with_label_values(&["SignatureError"]).inc();
        metrics.contest_resolutions_total.with_label_values(&["first"]).inc();
        assert_eq!(metrics.pow_attempts_total.get(), 1);
        assert!(!metrics.registry.gather().is_empty());
    }
}
