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

//! Hashcash-style proof-of-work search over the `NONCE` positional field.
//!
//! The search is a hot loop, so it runs on a blocking thread pool (via
//! `tokio::task::spawn_blocking`) and yields cooperatively every
//! `yield_batch` attempts rather than hogging a worker thread indefinitely.
//! Cancellation (a competing cube winning the CubeContest first, or
//! shutdown) is a `tokio::sync::watch::Receiver<bool>`, checked at each
//! yield point rather than raced with `tokio::select!`.

use crate::core::crypto;
use crate::monitoring::metrics::Metrics;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

/// Failures from [`search`].
#[derive(Debug, Error)]
pub enum PowError {
    /// The search was cancelled before finding a qualifying nonce.
    #[error("proof-of-work search cancelled")]
    Cancelled,
}

/// Create a fresh cancellation pair: hold the sender, hand the receiver to
/// [`search`].
pub fn cancel_pair() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Search for a 4-byte nonce such that `hash(prefix || nonce || suffix)` has
/// at least `difficulty` trailing zero bits (`prefix`/`suffix` are the bytes
/// surrounding the `NONCE` positional slot in the cube buffer being
/// compiled).
///
/// Yields to the async runtime every `yield_batch` attempts so a long search
/// does not starve other tasks sharing the blocking thread pool.
pub async fn search(
    prefix: Vec<u8>,
    suffix: Vec<u8>,
    difficulty: u32,
    yield_batch: u64,
    cancel: watch::Receiver<bool>,
    metrics: Option<Metrics>,
) -> Result<[u8; 4], PowError> {
    let mut nonce: u32 = 0;
    loop {
        let prefix = prefix.clone();
        let suffix = suffix.clone();
        let cancel = cancel.clone();
        let (found, next_nonce, attempted) = tokio::task::spawn_blocking(move || {
            search_batch(&prefix, &suffix, difficulty, nonce, yield_batch, &cancel)
        })
        .await
        .expect("pow search batch panicked");

        if let Some(m) = &metrics {
            m.pow_attempts_total.inc_by(attempted);
        }

        if let Some(nonce_bytes) = found {
            debug!(difficulty, attempts = attempted, "proof-of-work found");
            return Ok(nonce_bytes);
        }
        if *cancel.borrow() {
            if let Some(m) = &metrics {
                m.pow_cancelled_total.inc();
            }
            return Err(PowError::Cancelled);
        }
        nonce = next_nonce;
        tokio::task::yield_now().await;
    }
}

/// Try `yield_batch` consecutive nonce values starting at `start`, returning
/// the winning 4-byte nonce if found, and the next nonce to try otherwise.
fn search_batch(
    prefix: &[u8],
    suffix: &[u8],
    difficulty: u32,
    start: u32,
    yield_batch: u64,
    cancel: &watch::Receiver<bool>,
) -> (Option<[u8; 4]>, u32, u64) {
    let mut buf = Vec::with_capacity(prefix.len() + 4 + suffix.len());
    let mut nonce = start;
    for attempted in 0..yield_batch {
        if *cancel.borrow() {
            return (None, nonce, attempted);
        }
        let nonce_bytes = nonce.to_be_bytes();
        buf.clear();
        buf.extend_from_slice(prefix);
        buf.extend_from_slice(&nonce_bytes);
        buf.extend_from_slice(suffix);

        let digest = crypto::hash(&buf);
        if crypto::trailing_zero_bits(&digest) >= difficulty {
            return (Some(nonce_bytes), nonce, attempted + 1);
        }
        nonce = nonce.wrapping_add(1);
    }
    (None, nonce, yield_batch)
}
