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

//! The `Store` contract: `put` applies `CubeContest` atomically per key,
//! `get`/`has` are plain lookups, `iter_keys`/`iter_notifications` stream
//! results in key order, and `subscribe` hands out an owning
//! `tokio::sync::broadcast`-backed [`Subscription`] — dropping it
//! unsubscribes.
//!
//! Two reference implementations live alongside this trait: [`memory`] (an
//! in-process `HashMap`, used in tests) and [`sled_store`] (a `sled`-backed
//! store for local experimentation, with two secondary notification
//! indices).

/// In-process reference `Store`.
pub mod memory;
/// `sled`-backed reference `Store`.
pub mod sled_store;

use crate::core::contest::{self, Winner};
use crate::core::cube::Cube;
use crate::core::veritum::ChunkSource;
use crate::monitoring::metrics::Metrics;
use futures::stream::Stream;
use std::future::Future;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::trace;

/// Failures from a `Store` implementation's backing storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing storage rejected the operation (disk full, corruption,
    /// transaction conflict after retries, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Which secondary notification index to read: two views, keyed by
/// `(notify_recipient || timestamp || cube_key)` and
/// `(notify_recipient || difficulty_byte || cube_key)` respectively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationOrder {
    /// Ordered by `DATE`, oldest first.
    Time,
    /// Ordered by achieved proof-of-work difficulty, lowest first.
    Difficulty,
}

/// Emitted on `subscribe()` every time `put` stores a new winner at a key
/// (including the first cube at a previously-empty key).
#[derive(Clone, Debug)]
pub struct CubeAddedEvent {
    /// The cube now stored at this key.
    pub cube: Cube,
    /// Whether this replaced a previous cube at the same key (a `CubeContest`
    /// was run) or the key was previously empty.
    pub replaced_existing: bool,
}

/// An owning handle to a `Store`'s `CubeAddedEvent` stream. Dropping it
/// unsubscribes.
pub struct Subscription {
    rx: broadcast::Receiver<CubeAddedEvent>,
}

impl Subscription {
    fn new(rx: broadcast::Receiver<CubeAddedEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event, skipping over any the receiver lagged past
    /// (a slow subscriber misses events rather than blocking `put`).
    pub async fn recv(&mut self) -> Option<CubeAddedEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(skipped, "store subscription lagged; dropping missed events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// The storage contract `core` is written against. Implementations apply
/// `CubeContest` atomically inside `put` and publish the winner via
/// `subscribe`.
pub trait Store: Send + Sync {
    /// Store `cube`, running `CubeContest` against any existing cube at the
    /// same key; returns the winner (which may be `cube` itself, the
    /// previously-stored cube, or — for FROZEN/PIC — `cube` again since
    /// identical content is idempotent).
    fn put(&self, cube: Cube) -> impl Future<Output = Result<Cube, StoreError>> + Send;

    /// Look up a cube by key.
    fn get(&self, key: [u8; 32]) -> impl Future<Output = Option<Cube>> + Send;

    /// Whether a cube is stored at `key`.
    fn has(&self, key: [u8; 32]) -> impl Future<Output = bool> + Send;

    /// Stream every stored key in key order, optionally restricted to those
    /// starting with `prefix` and capped at `limit`.
    fn iter_keys(
        &self,
        prefix: Option<Vec<u8>>,
        limit: Option<usize>,
    ) -> impl Stream<Item = [u8; 32]> + Send;

    /// Stream cubes addressed to `recipient` via their `NOTIFY` positional
    /// field, ordered per `order`.
    fn iter_notifications(
        &self,
        recipient: [u8; 32],
        order: NotificationOrder,
        limit: Option<usize>,
    ) -> impl Stream<Item = Cube> + Send;

    /// Subscribe to every future `put`'s winner.
    fn subscribe(&self) -> Subscription;
}

/// Apply `CubeContest` between an incoming cube and whatever (if anything) is
/// already stored at its key, recording the outcome in `metrics` if given.
/// Shared by every `Store` implementation's `put` so the contest-outcome
/// metric label stays consistent across backends.
pub(crate) fn contest_against_existing(
    incoming: Cube,
    existing: Option<Cube>,
    metrics: Option<&Metrics>,
) -> Cube {
    let Some(existing) = existing else {
        if let Some(m) = metrics {
            m.contest_resolutions_total.with_label_values(&["only"]).inc();
        }
        return incoming;
    };
    let winner = contest::resolve(&existing, &incoming);
    if let Some(m) = metrics {
        let label = match winner {
            Winner::First => "existing",
            Winner::Second => "incoming",
        };
        m.contest_resolutions_total.with_label_values(&[label]).inc();
    }
    match winner {
        Winner::First => existing,
        Winner::Second => incoming,
    }
}

/// Turn a blocking-producer `mpsc::Receiver` into a `Stream`, for backends
/// (like `sled`) whose iteration is synchronous: the producer side runs on a
/// blocking thread and sends items as it finds them, and this just drains the
/// channel cooperatively.
pub(crate) fn receiver_stream<T: Send + 'static>(rx: mpsc::Receiver<T>) -> impl Stream<Item = T> {
    futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) })
}

impl<S: Store> ChunkSource for S {
    fn get(&self, key: [u8; 32]) -> impl Future<Output = Option<Cube>> + Send {
        Store::get(self, key)
    }
}
