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

use verity::core::cube_codec::CubeBuilder;
use verity::core::cube_type::CubeType;
use verity::core::field::Field;
use verity::core::field_type::FieldType;
use verity::core::pow::cancel_pair;
use verity::core::{crypto, identity::Identity};
use verity::store::memory::MemoryStore;
use verity::store::Store;

/// A store holds a PMUC at key K with `PMUC_UPDATE_COUNT = 7`. Publishing a
/// fresh PMUC at the same key with the default count of 0 must, after
/// `apply_pmuc_auto_increment` consults the stored cube, land with count 8
/// and win the contest against the stored one.
#[tokio::test]
async fn republishing_a_pmuc_increments_past_the_stored_count() {
    crypto::init().unwrap();
    let store = MemoryStore::default();
    let identity = Identity::derive("alice", "hunter2").unwrap();

    let mut first = CubeBuilder::new(CubeType::Pmuc);
    first.push_field(Field::new(FieldType::Username, b"alice".to_vec()));
    first.date(1_000);
    first.pmuc_update_count(7);
    first.signing_key(identity.root_muc_signing_keypair());
    let (_tx, rx) = cancel_pair();
    let first = first.compile(1, 1000, rx, None).await.unwrap();
    assert_eq!(first.pmuc_update_count(), Some(7));

    let key = first.key();
    store.put(first.clone()).await.unwrap();

    let mut second = CubeBuilder::new(CubeType::Pmuc);
    second.push_field(Field::new(FieldType::Username, b"alice-v2".to_vec()));
    second.date(2_000);
    second.signing_key(identity.root_muc_signing_keypair());
    let stored = store.get(key).await.unwrap();
    second.apply_pmuc_auto_increment(stored.pmuc_update_count()).unwrap();
    let (_tx, rx) = cancel_pair();
    let second = second.compile(1, 1000, rx, None).await.unwrap();
    assert_eq!(second.pmuc_update_count(), Some(8));

    let winner = store.put(second.clone()).await.unwrap();
    assert_eq!(winner.key(), key);
    assert_eq!(winner.pmuc_update_count(), Some(8));
    assert_eq!(store.get(key).await.unwrap().pmuc_update_count(), Some(8));
}

/// With no stored cube at the key yet, auto-increment is a no-op: the first
/// publish of a PMUC keeps whatever count its builder was given.
#[tokio::test]
async fn first_publish_of_a_pmuc_is_not_bumped() {
    crypto::init().unwrap();
    let store = MemoryStore::default();
    let identity = Identity::derive("bob", "hunter2").unwrap();
    let signing_key = identity.root_muc_signing_keypair();

    let mut builder = CubeBuilder::new(CubeType::Pmuc);
    builder.push_field(Field::new(FieldType::Username, b"bob".to_vec()));
    builder.date(1_000);
    builder.signing_key(signing_key);
    builder.apply_pmuc_auto_increment(None).unwrap();
    let (_tx, rx) = cancel_pair();
    let cube = builder.compile(1, 1000, rx, None).await.unwrap();
    assert_eq!(cube.pmuc_update_count(), Some(0));

    let winner = store.put(cube.clone()).await.unwrap();
    assert_eq!(winner.pmuc_update_count(), Some(0));
}
