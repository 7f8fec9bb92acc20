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

//! In-process engine tunables, deserializable from TOML via `serde`. This is
//! deliberately not a node configuration loader — no peer lists, listen
//! addresses, or data directories live here, only the knobs `core` itself
//! reads (default difficulty, PoW yield batching).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures loading an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document did not parse or did not match the expected shape.
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Tunables for the Cube engine. All fields have defaults matching
/// [`EngineConfig::default`]; a partial TOML document only needs to name the
/// fields it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum trailing-zero-bit count `Cube::parse` requires of incoming
    /// cubes, and that `CubeBuilder::compile` searches for.
    pub default_difficulty: u32,
    /// How many proof-of-work attempts `core::pow::search` makes per
    /// blocking-thread batch before yielding back to the async runtime.
    pub pow_yield_batch: u64,
    /// Whether a failed Continuation chunk decrypt is logged at
    /// `tracing::trace!` (it never becomes an `Err` — decrypt failures are
    /// expected whenever a cube is addressed to someone else). Disable in
    /// deployments that treat even trace-level logging of decrypt attempts
    /// as noise.
    pub trace_log_decrypt_failures: bool,
    /// Deadline, in milliseconds, `veritum::decompile` waits for a full
    /// `CONTINUED_IN` chain before yielding a partial result. `None` means
    /// wait indefinitely.
    pub continuation_deadline_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_difficulty: 0,
            pow_yield_batch: 1000,
            trace_log_decrypt_failures: true,
            continuation_deadline_ms: Some(30_000),
        }
    }
}

impl EngineConfig {
    /// Parse an `EngineConfig` from a TOML document, falling back to
    /// [`EngineConfig::default`] for any field the document omits.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// The configured Continuation deadline as a [`std::time::Duration`],
    /// if one is set.
    pub fn continuation_deadline(&self) -> Option<std::time::Duration> {
        self.continuation_deadline_ms.map(std::time::Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_required_difficulty() {
        assert_eq!(EngineConfig::default().default_difficulty, 0);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = EngineConfig::from_toml_str("default_difficulty = 8\n").unwrap();
        assert_eq!(cfg.default_difficulty, 8);
        assert_eq!(cfg.pow_yield_batch, EngineConfig::default().pow_yield_batch);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(EngineConfig::from_toml_str("not = [valid").is_err());
    }

    #[test]
    fn continuation_deadline_converts_to_duration() {
        let cfg = EngineConfig { continuation_deadline_ms: Some(5_000), ..EngineConfig::default() };
        assert_eq!(cfg.continuation_deadline(), Some(std::time::Duration::from_secs(5)));
        let cfg = EngineConfig { continuation_deadline_ms: None, ..EngineConfig::default() };
        assert_eq!(cfg.continuation_deadline(), None);
    }
}
