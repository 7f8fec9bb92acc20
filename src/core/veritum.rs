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

//! `Veritum`: a logical content unit — fields plus a cube-type selection —
//! and the orchestration that ties `core::continuation`'s Split/Recombine to
//! `core::cube_codec`'s compile/parse. A Veritum's key is the key of its
//! first chunk.

use crate::core::continuation::{self, ContinuationError, SplitOptions};
use crate::core::cube::Cube;
use crate::core::cube_type::CubeType;
use crate::core::field::Field;
use crate::monitoring::metrics::Metrics;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{trace, warn};

/// A logical Veritum prior to compilation: an ordered field list plus the
/// cube type its chunks will take.
#[derive(Clone, Debug)]
pub struct Veritum {
    /// Cube type every chunk will be compiled as.
    pub cube_type: CubeType,
    /// The ordered, pre-split field list.
    pub fields: Vec<Field>,
}

impl Veritum {
    /// Construct a Veritum from its cube type and field list.
    pub fn new(cube_type: CubeType, fields: Vec<Field>) -> Self {
        Self { cube_type, fields }
    }
}

/// A compiled Veritum: its chunk chain, plus the convenience of its key
/// (the first chunk's key) already extracted.
#[derive(Clone, Debug)]
pub struct CompiledVeritum {
    /// The key of `chunks[0]` — the Veritum's key.
    pub key: [u8; 32],
    /// The ordered chunk chain, as produced by `continuation::split`.
    pub chunks: Vec<Cube>,
}

/// Failures from compiling or decompiling a Veritum.
#[derive(Debug, Error)]
pub enum VeritumError {
    /// Splitting or compiling a chunk failed.
    #[error(transparent)]
    Continuation(#[from] ContinuationError),
    /// Split produced no chunks at all (only possible with an empty field
    /// list and a degenerate options set — never for normal callers, since
    /// `plan_chunks` always emits at least one, possibly empty, chunk).
    #[error("split produced no chunks")]
    Empty,
}

/// Compile a Veritum into its chunk chain (Split, then wrap in the key
/// convenience).
pub async fn compile(
    veritum: Veritum,
    options: SplitOptions,
    cancel: watch::Receiver<bool>,
    metrics: Option<Metrics>,
) -> Result<CompiledVeritum, VeritumError> {
    let chunks = continuation::split(veritum.fields, options, cancel, metrics).await?;
    let key = chunks.first().ok_or(VeritumError::Empty)?.key();
    Ok(CompiledVeritum { key, chunks })
}

/// Anything able to resolve a chunk Cube by its key — implemented by
/// `core::store::Store` and by test doubles.
pub trait ChunkSource {
    /// Fetch the chunk stored at `key`, if any.
    fn get(&self, key: [u8; 32]) -> impl Future<Output = Option<Cube>> + Send;
}

/// Result of following a `CONTINUED_IN` chain from a first chunk.
#[derive(Clone, Debug)]
pub struct DecompileOutcome {
    /// Chunks gathered, in chain order.
    pub chunks: Vec<Cube>,
    /// `false` if a deadline expired before the last chunk (whose payload
    /// has no outstanding `CONTINUED_IN`) was reached.
    pub complete: bool,
}

impl DecompileOutcome {
    /// Reassemble the gathered chunks into their field sequence via
    /// `continuation::recombine`. If `complete` is `false`, the last field
    /// spanning the missing chunk(s) will read truncated — callers should
    /// check `complete` before trusting the result.
    pub fn fields(&self, metrics: Option<&Metrics>) -> Vec<Field> {
        continuation::recombine(&self.chunks, metrics)
    }
}

fn continued_in_target(cube: &Cube) -> Option<[u8; 32]> {
    cube.fields().into_iter().find_map(|f| {
        let rel = f.as_relationship()?;
        (rel.relationship_type == crate::core::relationship::RelationshipType::ContinuedIn)
            .then_some(rel.remote_key)
    })
}

/// Follow a chunk chain starting at `first_key`, fetching each link via
/// `source`, until either the chain ends (no further `CONTINUED_IN`) or
/// `deadline` elapses, in which case the chunks gathered so far are
/// returned as a partial result.
pub async fn decompile<S: ChunkSource>(
    source: &S,
    first_key: [u8; 32],
    deadline: Option<Duration>,
) -> DecompileOutcome {
    let fetch_chain = async {
        let mut chunks = Vec::new();
        let mut next_key = Some(first_key);
        while let Some(key) = next_key {
            let Some(cube) = source.get(key).await else {
                warn!(?key, "continuation retrieval: chunk missing from store");
                return (chunks, false);
            };
            next_key = continued_in_target(&cube);
            chunks.push(cube);
        }
        (chunks, true)
    };

    let (chunks, complete) = match deadline {
        Some(d) => match tokio::time::timeout(d, fetch_chain).await {
            Ok(result) => result,
            Err(_) => {
                trace!("continuation retrieval deadline expired");
                // The timed-out future is dropped along with whatever
                // chunks it had gathered locally; there is nothing partial
                // to recover from a cancelled future, so report empty.
                (Vec::new(), false)
            }
        },
        None => fetch_chain.await,
    };

    DecompileOutcome { chunks, complete }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto;
    use crate::core::field_type::FieldType;
    use crate::core::pow::cancel_pair;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MapSource(Mutex<HashMap<[u8; 32], Cube>>);

    impl ChunkSource for MapSource {
        async fn get(&self, key: [u8; 32]) -> Option<Cube> {
            self.0.lock().unwrap().get(&key).cloned()
        }
    }

    #[tokio::test]
    async fn compile_key_matches_first_chunk() {
        crypto::init().unwrap();
        let veritum = Veritum::new(
            CubeType::Frozen,
            vec![Field::new(FieldType::Payload, b"hello".to_vec())],
        );
        let (_tx, rx) = cancel_pair();
        let options = SplitOptions {
            cube_type: CubeType::Frozen,
            difficulty: 1,
            yield_batch: 1000,
            date: 1_700_000_000,
            signing_seed: None,
            max_chunk_payload: None,
        };
        let compiled = compile(veritum, options, rx, None).await.unwrap();
        assert_eq!(compiled.key, compiled.chunks[0].key());
    }

    #[tokio::test]
    async fn decompile_follows_chain_and_recombines() {
        crypto::init().unwrap();
        let big_text = "y".repeat(1180);
        let veritum = Veritum::new(
            CubeType::Frozen,
            vec![Field::new(FieldType::Payload, big_text.as_bytes().to_vec())],
        );
        let (_tx, rx) = cancel_pair();
        let options = SplitOptions {
            cube_type: CubeType::Frozen,
            difficulty: 1,
            yield_batch: 1000,
            date: 0,
            signing_seed: None,
            max_chunk_payload: None,
        };
        let compiled = compile(veritum, options, rx, None).await.unwrap();
        assert_eq!(compiled.chunks.len(), 2);

        let mut map = HashMap::new();
        for chunk in &compiled.chunks {
            map.insert(chunk.key(), chunk.clone());
        }
        let source = MapSource(Mutex::new(map));

        let outcome = decompile(&source, compiled.key, Some(Duration::from_secs(1))).await;
        assert!(outcome.complete);
        assert_eq!(outcome.chunks.len(), 2);
        let fields = outcome.fields(None);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].value, big_text.as_bytes());
    }

    #[tokio::test]
    async fn decompile_reports_incomplete_on_missing_chunk() {
        crypto::init().unwrap();
        let big_text = "z".repeat(1180);
        let veritum = Veritum::new(
            CubeType::Frozen,
            vec![Field::new(FieldType::Payload, big_text.as_bytes().to_vec())],
        );
        let (_tx, rx) = cancel_pair();
        let options = SplitOptions {
            cube_type: CubeType::Frozen,
            difficulty: 1,
            yield_batch: 1000,
            date: 0,
            signing_seed: None,
            max_chunk_payload: None,
        };
        let compiled = compile(veritum, options, rx, None).await.unwrap();
        assert_eq!(compiled.chunks.len(), 2);

        // Only store the first chunk; the chain is unresolvable.
        let mut map = HashMap::new();
        map.insert(compiled.chunks[0].key(), compiled.chunks[0].clone());
        let source = MapSource(Mutex::new(map));

        let outcome = decompile(&source, compiled.key, Some(Duration::from_secs(1))).await;
        assert!(!outcome.complete);
        assert_eq!(outcome.chunks.len(), 1);
    }
}
