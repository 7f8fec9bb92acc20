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

//! An in-process reference `Store`: a `Mutex`-guarded `BTreeMap`, used in
//! tests and by callers that don't need cubes to outlive the process.

use crate::core::cube::Cube;
use crate::monitoring::metrics::Metrics;
use crate::store::{contest_against_existing, CubeAddedEvent, NotificationOrder, Store, StoreError, Subscription};
use futures::stream::Stream;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// In-process `Store` backed by a `Mutex<BTreeMap<[u8; 32], Cube>>`.
pub struct MemoryStore {
    cubes: Mutex<BTreeMap<[u8; 32], Cube>>,
    events: broadcast::Sender<CubeAddedEvent>,
    metrics: Option<Metrics>,
}

impl MemoryStore {
    /// An empty store, optionally recording `CubeContest` outcomes to `metrics`.
    pub fn new(metrics: Option<Metrics>) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { cubes: Mutex::new(BTreeMap::new()), events, metrics }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Store for MemoryStore {
    async fn put(&self, cube: Cube) -> Result<Cube, StoreError> {
        let key = cube.key();
        let existing = self.cubes.lock().expect("memory store mutex poisoned").get(&key).cloned();
        let replaced_existing = existing.is_some();
        let winner = contest_against_existing(cube, existing, self.metrics.as_ref());
        self.cubes
            .lock()
            .expect("memory store mutex poisoned")
            .insert(key, winner.clone());
        let _ = self.events.send(CubeAddedEvent { cube: winner.clone(), replaced_existing });
        Ok(winner)
    }

    async fn get(&self, key: [u8; 32]) -> Option<Cube> {
        self.cubes.lock().expect("memory store mutex poisoned").get(&key).cloned()
    }

    async fn has(&self, key: [u8; 32]) -> bool {
        self.cubes.lock().expect("memory store mutex poisoned").contains_key(&key)
    }

    fn iter_keys(&self, prefix: Option<Vec<u8>>, limit: Option<usize>) -> impl Stream<Item = [u8; 32]> {
        let keys: Vec<[u8; 32]> = self
            .cubes
            .lock()
            .expect("memory store mutex poisoned")
            .keys()
            .filter(|k| match prefix.as_deref() {
                Some(p) => k.starts_with(p),
                None => true,
            })
            .take(limit.unwrap_or(usize::MAX))
            .copied()
            .collect();
        futures::stream::iter(keys)
    }

    fn iter_notifications(
        &self,
        recipient: [u8; 32],
        order: NotificationOrder,
        limit: Option<usize>,
    ) -> impl Stream<Item = Cube> {
        let mut matching: Vec<Cube> = self
            .cubes
            .lock()
            .expect("memory store mutex poisoned")
            .values()
            .filter(|c| c.notify_recipient() == Some(recipient))
            .cloned()
            .collect();
        match order {
            NotificationOrder::Time => matching.sort_by_key(|c| c.date()),
            NotificationOrder::Difficulty => matching.sort_by_key(|c| c.difficulty()),
        }
        matching.truncate(limit.unwrap_or(usize::MAX));
        futures::stream::iter(matching)
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
    use crate::core::{crypto, identity::Identity};
    use futures::StreamExt;

    async fn frozen(payload: &[u8], date: u64) -> Cube {
        let mut builder = CubeBuilder::new(CubeType::Frozen);
        builder.push_field(Field::new(FieldType::Payload, payload.to_vec()));
        builder.date(date);
        let (_tx, rx) = cancel_pair();
        builder.compile(1, 1000, rx, None).await.unwrap()
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        crypto::init().unwrap();
        let store = MemoryStore::default();
        let cube = frozen(b"hello", 1).await;
        let stored = store.put(cube.clone()).await.unwrap();
        assert_eq!(stored.key(), cube.key());
        assert_eq!(store.get(cube.key()).await, Some(cube.clone()));
        assert!(store.has(cube.key()).await);
    }

    #[tokio::test]
    async fn newer_muc_wins_contest_on_put() {
        crypto::init().unwrap();
        let store = MemoryStore::default();
        let identity = Identity::derive("alice", "pw").unwrap();
        let key = identity.root_muc_signing_keypair();

        let mut older = CubeBuilder::new(CubeType::Muc);
        older.push_field(Field::new(FieldType::Username, b"a".to_vec()));
        older.date(100);
        older.signing_key(identity.root_muc_signing_keypair());
        let (_tx, rx) = cancel_pair();
        let older = older.compile(1, 1000, rx, None).await.unwrap();

        let mut newer = CubeBuilder::new(CubeType::Muc);
        newer.push_field(Field::new(FieldType::Username, b"b".to_vec()));
        newer.date(200);
        newer.signing_key(identity.root_muc_signing_keypair());
        let (_tx, rx) = cancel_pair();
        let newer = newer.compile(1, 1000, rx, None).await.unwrap();

        store.put(older).await.unwrap();
        let winner = store.put(newer.clone()).await.unwrap();
        assert_eq!(winner.date(), 200);
        assert_eq!(store.get(key.public_key).await.unwrap().date(), 200);
    }

    #[tokio::test]
    async fn subscribers_observe_put_events() {
        crypto::init().unwrap();
        let store = MemoryStore::default();
        let mut sub = store.subscribe();
        let cube = frozen(b"notify me", 1).await;
        store.put(cube.clone()).await.unwrap();
        let event = sub.recv().await.unwrap();
        assert_eq!(event.cube.key(), cube.key());
        assert!(!event.replaced_existing);
    }

    #[tokio::test]
    async fn iter_keys_respects_limit() {
        crypto::init().unwrap();
        let store = MemoryStore::default();
        store.put(frozen(b"one", 1).await).await.unwrap();
        store.put(frozen(b"two", 2).await).await.unwrap();
        let keys: Vec<_> = store.iter_keys(None, Some(1)).collect().await;
        assert_eq!(keys.len(), 1);
    }
}
