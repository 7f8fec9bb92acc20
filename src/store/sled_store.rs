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

//! A `sled`-backed reference `Store`, for local experimentation beyond what
//! fits in memory. Three trees: `cubes` (key → compiled bytes) and two
//! secondary notification indices — `notify_by_time`
//! (`recipient || date || key` → key) and `notify_by_difficulty`
//! (`recipient || difficulty_byte || key` → key) — so a recipient's
//! `*_NOTIFY` cubes can be scanned in either order without touching the main
//! tree.
//!
//! Iteration runs on a blocking thread (`sled`'s iterator is synchronous) and
//! feeds results back through a bounded channel, the same
//! compute-on-a-blocking-thread-and-cooperate-with-the-runtime shape
//! `core::pow` uses for its hash search.

use crate::core::cube::Cube;
use crate::core::cube_codec;
use crate::monitoring::metrics::Metrics;
use crate::store::{
    contest_against_existing, receiver_stream, CubeAddedEvent, NotificationOrder, Store, StoreError,
    Subscription,
};
use futures::stream::Stream;
use tokio::sync::{broadcast, mpsc};

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const ITER_CHANNEL_CAPACITY: usize = 128;

/// `sled`-backed `Store`.
pub struct SledStore {
    cubes: sled::Tree,
    notify_by_time: sled::Tree,
    notify_by_difficulty: sled::Tree,
    events: broadcast::Sender<CubeAddedEvent>,
    metrics: Option<Metrics>,
}

impl SledStore {
    /// Open (or create) a `sled` database rooted at `path`.
    pub fn open(path: &str, metrics: Option<Metrics>) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        let cubes = db.open_tree("cubes").map_err(|e| StoreError::Backend(e.to_string()))?;
        let notify_by_time =
            db.open_tree("notify_by_time").map_err(|e| StoreError::Backend(e.to_string()))?;
        let notify_by_difficulty =
            db.open_tree("notify_by_difficulty").map_err(|e| StoreError::Backend(e.to_string()))?;
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self { cubes, notify_by_time, notify_by_difficulty, events, metrics })
    }

    fn decode(bytes: sled::IVec) -> Option<Cube> {
        cube_codec::parse(&bytes, 0, None).ok()
    }
}

impl Store for SledStore {
    async fn put(&self, cube: Cube) -> Result<Cube, StoreError> {
        let cubes = self.cubes.clone();
        let notify_by_time = self.notify_by_time.clone();
        let notify_by_difficulty = self.notify_by_difficulty.clone();
        let metrics = self.metrics.clone();

        let (winner, replaced_existing) = tokio::task::spawn_blocking(move || -> Result<(Cube, bool), StoreError> {
            let key = cube.key();
            let existing = cubes
                .get(key)
                .map_err(|e| StoreError::Backend(e.to_string()))?
                .and_then(SledStore::decode);
            let replaced_existing = existing.is_some();
            let winner = contest_against_existing(cube, existing, metrics.as_ref());

            cubes
                .insert(&key[..], winner.binary().as_slice())
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            if let Some(recipient) = winner.notify_recipient() {
                let mut time_key = Vec::with_capacity(32 + 8 + 32);
                time_key.extend_from_slice(&recipient);
                time_key.extend_from_slice(&winner.date().to_be_bytes());
                time_key.extend_from_slice(&key);
                notify_by_time
                    .insert(time_key, &key[..])
                    .map_err(|e| StoreError::Backend(e.to_string()))?;

                let mut difficulty_key = Vec::with_capacity(32 + 1 + 32);
                difficulty_key.extend_from_slice(&recipient);
                difficulty_key.push(winner.difficulty().min(u8::MAX as u32) as u8);
                difficulty_key.extend_from_slice(&key);
                notify_by_difficulty
                    .insert(difficulty_key, &key[..])
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
            }
            Ok((winner, replaced_existing))
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))??;

        let _ = self.events.send(CubeAddedEvent { cube: winner.clone(), replaced_existing });
        Ok(winner)
    }

    async fn get(&self, key: [u8; 32]) -> Option<Cube> {
        let cubes = self.cubes.clone();
        tokio::task::spawn_blocking(move || cubes.get(key).ok().flatten().and_then(SledStore::decode))
            .await
            .unwrap_or(None)
    }

    async fn has(&self, key: [u8; 32]) -> bool {
        let cubes = self.cubes.clone();
        tokio::task::spawn_blocking(move || cubes.contains_key(key).unwrap_or(false))
            .await
            .unwrap_or(false)
    }

    fn iter_keys(&self, prefix: Option<Vec<u8>>, limit: Option<usize>) -> impl Stream<Item = [u8; 32]> {
        let cubes = self.cubes.clone();
        let (tx, rx) = mpsc::channel(ITER_CHANNEL_CAPACITY);
        tokio::task::spawn_blocking(move || {
            let iter: Box<dyn Iterator<Item = sled::Result<(sled::IVec, sled::IVec)>>> = match &prefix {
                Some(p) => Box::new(cubes.scan_prefix(p)),
                None => Box::new(cubes.iter()),
            };
            let mut emitted = 0usize;
            for item in iter {
                if let Some(l) = limit {
                    if emitted >= l {
                        break;
                    }
                }
                let Ok((k, _v)) = item else { break };
                if k.len() != 32 {
                    continue;
                }
                let mut key = [0u8; 32];
                key.copy_from_slice(&k);
                if tx.blocking_send(key).is_err() {
                    break;
                }
                emitted += 1;
            }
        });
        receiver_stream(rx)
    }

    fn iter_notifications(
        &self,
        recipient: [u8; 32],
        order: NotificationOrder,
        limit: Option<usize>,
    ) -> impl Stream<Item = Cube> {
        let index = match order {
            NotificationOrder::Time => self.notify_by_time.clone(),
            NotificationOrder::Difficulty => self.notify_by_difficulty.clone(),
        };
        let cubes = self.cubes.clone();
        let (tx, rx) = mpsc::channel(ITER_CHANNEL_CAPACITY);
        tokio::task::spawn_blocking(move || {
            let mut emitted = 0usize;
            for item in index.scan_prefix(recipient) {
                if let Some(l) = limit {
                    if emitted >= l {
                        break;
                    }
                }
                let Ok((_index_key, cube_key)) = item else { break };
                let Ok(Some(bytes)) = cubes.get(&cube_key) else { continue };
                let Some(cube) = SledStore::decode(bytes) else { continue };
                if tx.blocking_send(cube).is_err() {
                    break;
                }
                emitted += 1;
            }
        });
        receiver_stream(rx)
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.events.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cube_codec::CubeBuilder;
    use crate::core::cube_type::CubeType;
    use crate::core::field::Field;
    use crate::core::field_type::FieldType;
    use crate::core::pow::cancel_pair;
    use crate::core::crypto;
    use futures::StreamExt;
    use tempfile::tempdir;

    async fn frozen(payload: &[u8], date: u64) -> Cube {
        let mut builder = CubeBuilder::new(CubeType::Frozen);
        builder.push_field(Field::new(FieldType::Payload, payload.to_vec()));
        builder.date(date);
        let (_tx, rx) = cancel_pair();
        builder.compile(1, 1000, rx, None).await.unwrap()
    }

    #[tokio::test]
    async fn put_then_get_round_trips_through_sled() {
        crypto::init().unwrap();
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path().to_str().unwrap(), None).unwrap();
        let cube = frozen(b"persisted", 1).await;
        store.put(cube.clone()).await.unwrap();
        let loaded = store.get(cube.key()).await.unwrap();
        assert_eq!(loaded.key(), cube.key());
        assert_eq!(loaded.fields(), cube.fields());
    }

    #[tokio::test]
    async fn notify_indices_return_recipients_cubes() {
        crypto::init().unwrap();
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path().to_str().unwrap(), None).unwrap();
        let recipient = [9u8; 32];

        let mut builder = CubeBuilder::new(CubeType::FrozenNotify);
        builder.push_field(Field::new(FieldType::Payload, b"ping".to_vec()));
        builder.date(42);
        builder.notify_recipient(recipient);
        let (_tx, rx) = cancel_pair();
        let cube = builder.compile(1, 1000, rx, None).await.unwrap();
        store.put(cube.clone()).await.unwrap();

        let by_time: Vec<_> = store.iter_notifications(recipient, NotificationOrder::Time, None).collect().await;
        assert_eq!(by_time.len(), 1);
        assert_eq!(by_time[0].key(), cube.key());
    }

    #[tokio::test]
    async fn iter_keys_scans_prefix() {
        crypto::init().unwrap();
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path().to_str().unwrap(), None).unwrap();
        let cube = frozen(b"scoped", 1).await;
        store.put(cube.clone()).await.unwrap();

        let all: Vec<_> = store.iter_keys(None, None).collect().await;
        assert!(all.contains(&cube.key()));
    }
}
