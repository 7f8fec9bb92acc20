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

//! Split an oversized Veritum field list into a linked chain of chunk
//! Cubes, and losslessly reassemble it.

use crate::core::binary_layout::MIN_CHUNK;
use crate::core::crypto::{self, CryptoError, EncryptionKeypair, SigningKeypair};
use crate::core::cube::Cube;
use crate::core::cube_codec::{CubeBuilder, CubeError};
use crate::core::cube_type::CubeType;
use crate::core::field::Field;
use crate::core::field_parser::{self, FieldError};
use crate::core::field_type::{FieldType, LengthKind};
use crate::core::grammar::Schema;
use crate::core::relationship::{Relationship, RelationshipType};
use crate::monitoring::metrics::Metrics;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::watch;
use tracing::trace;

/// Failures from [`split`]/[`recombine`]/[`encrypt`].
#[derive(Debug, Error)]
pub enum ContinuationError {
    /// A chunk's field list did not serialize (should not happen — the
    /// planner never overfills a chunk).
    #[error(transparent)]
    FieldSizeError(#[from] FieldError),
    /// Compiling a planned chunk failed.
    #[error(transparent)]
    Cube(#[from] CubeError),
    /// Encrypt/decrypt crypto failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

fn is_continued_in(field: &Field) -> bool {
    field.field_type == FieldType::RelatesTo
        && field.as_relationship().map(|r| r.relationship_type == RelationshipType::ContinuedIn).unwrap_or(false)
}

/// Step 1: drop excluded fields and any pre-existing `CONTINUED_IN`
/// relationships, then insert zero-length `PADDING` separators between
/// surviving adjacent same-type variable-length fields.
fn preprocess(fields: Vec<Field>) -> Vec<Field> {
    let mut out: Vec<Field> = Vec::with_capacity(fields.len());
    for field in fields {
        if field.field_type.is_continuation_excluded() || is_continued_in(&field) {
            continue;
        }
        if let Some(prev) = out.last() {
            if prev.field_type == field.field_type
                && matches!(field.field_type.length_kind(), Some(LengthKind::Variable))
            {
                out.push(Field::padding_marker());
            }
        }
        out.push(field);
    }
    out
}

/// The plan produced by [`plan_chunks`]: one field list per chunk, plus the
/// location of each `CONTINUED_IN` placeholder awaiting its real key.
struct SplitPlan {
    chunks: Vec<Vec<Field>>,
    /// `(chunk_index, field_index)` of each placeholder, in chunk order.
    refs: Vec<(usize, usize)>,
}

fn continued_in_placeholder() -> Field {
    Field::relates_to(Relationship::new(RelationshipType::ContinuedIn, [0u8; 32]))
}

/// Steps 2-4 of Split: budget accounting and per-field placement.
fn plan_chunks(fields: Vec<Field>, per_cube_payload: usize) -> SplitPlan {
    let mut chunks: Vec<Vec<Field>> = vec![Vec::new()];
    let mut refs: Vec<(usize, usize)> = Vec::new();
    let mut current_remaining = per_cube_payload;
    let mut space_remaining: i64 = per_cube_payload as i64;
    let mut min_bytes_required: i64 = fields.iter().map(|f| f.wire_len() as i64).sum();
    let mut queue: VecDeque<Field> = fields.into();

    while !queue.is_empty() {
        while space_remaining < min_bytes_required {
            let placeholder = continued_in_placeholder();
            space_remaining += per_cube_payload as i64;
            min_bytes_required += placeholder.wire_len() as i64;
            queue.push_front(placeholder);
        }
        let field = queue.pop_front().expect("queue non-empty");
        let needed = field.wire_len();

        if needed <= current_remaining {
            // (a) fits.
            let chunk_idx = chunks.len() - 1;
            if is_continued_in(&field) {
                refs.push((chunk_idx, chunks[chunk_idx].len()));
            }
            chunks[chunk_idx].push(field);
            current_remaining -= needed;
            space_remaining -= needed as i64;
            min_bytes_required -= needed as i64;
        } else if current_remaining >= MIN_CHUNK && matches!(field.field_type.length_kind(), Some(LengthKind::Variable))
        {
            // (b) split across a chunk boundary.
            let take = current_remaining - 3; // 1 tag byte + 2 length bytes
            let (head, tail) = field.value.split_at(take);
            let part1 = Field::new(field.field_type, head.to_vec());
            let part2 = Field::new(field.field_type, tail.to_vec());

            let chunk_idx = chunks.len() - 1;
            // Splitting adds a second TLV header, so swap the unplaced
            // field's cost for part2's (part1's cost was already spent).
            min_bytes_required += part2.wire_len() as i64 - needed as i64;
            space_remaining -= part1.wire_len() as i64;
            chunks[chunk_idx].push(part1);
            current_remaining = 0;
            queue.push_front(part2);
        } else {
            // (c) roll over; wasted space is spent, not reclaimed.
            space_remaining -= current_remaining as i64;
            chunks.push(Vec::new());
            current_remaining = per_cube_payload;
            queue.push_front(field);
        }
    }

    SplitPlan { chunks, refs }
}

/// Options controlling [`split`].
#[derive(Clone)]
pub struct SplitOptions {
    /// Cube type chosen for every chunk.
    pub cube_type: CubeType,
    /// Required proof-of-work difficulty for every chunk.
    pub difficulty: u32,
    /// Hash attempts between cooperative PoW yields.
    pub yield_batch: u64,
    /// `DATE` positional written into every chunk.
    pub date: u64,
    /// Signing key for signed cube types. Each chunk is independently
    /// re-signed with (a clone of) this key rather than treating the chain
    /// itself as jointly signed.
    pub signing_seed: Option<[u8; 32]>,
    /// Caller-supplied cap on each chunk's payload region, for callers that
    /// want smaller-than-maximal chunks (lower per-hop transfer size, more
    /// predictable chunk counts). Clamped to the schema's natural payload
    /// capacity if larger; has no effect if `None`.
    pub max_chunk_payload: Option<usize>,
}

/// Split `fields` into a chain of compiled, linked chunk Cubes.
pub async fn split(
    fields: Vec<Field>,
    options: SplitOptions,
    cancel: watch::Receiver<bool>,
    metrics: Option<Metrics>,
) -> Result<Vec<Cube>, ContinuationError> {
    let schema = Schema::for_type(options.cube_type);
    let per_cube_payload = match options.max_chunk_payload {
        Some(cap) => cap.min(schema.payload_capacity()),
        None => schema.payload_capacity(),
    };

    let prepared = preprocess(fields);
    let plan = plan_chunks(prepared, per_cube_payload);

    // Compile chunks in reverse order so each CONTINUED_IN ref can be
    // written with the already-known key of the following chunk.
    let mut compiled: Vec<Option<Cube>> = vec![None; plan.chunks.len()];
    for i in (0..plan.chunks.len()).rev() {
        let mut builder = CubeBuilder::new(options.cube_type);
        builder.date(options.date);
        for field in &plan.chunks[i] {
            builder.push_field(field.clone());
        }
        if let Some(seed) = options.signing_seed {
            builder.signing_key(SigningKeypair::from_seed(&seed));
        }
        let cube = builder
            .compile(options.difficulty, options.yield_batch, cancel.clone(), metrics.clone())
            .await?;
        compiled[i] = Some(cube);
    }

    // Fill in each CONTINUED_IN placeholder with the next chunk's key, then
    // recompile the (now-mutated) chunk.
    for &(chunk_idx, field_idx) in &plan.refs {
        let next_key = compiled[chunk_idx + 1].as_ref().expect("later chunks already compiled").key();
        let mut fields = plan.chunks[chunk_idx].clone();
        fields[field_idx] = Field::relates_to(Relationship::new(RelationshipType::ContinuedIn, next_key));

        let mut builder = CubeBuilder::new(options.cube_type);
        builder.date(options.date);
        for field in &fields {
            builder.push_field(field.clone());
        }
        if let Some(seed) = options.signing_seed {
            builder.signing_key(SigningKeypair::from_seed(&seed));
        }
        compiled[chunk_idx] = Some(
            builder.compile(options.difficulty, options.yield_batch, cancel.clone(), metrics.clone()).await?,
        );
    }

    if let Some(m) = &metrics {
        m.continuation_splits_total.inc();
        m.continuation_chunks_total.inc_by(compiled.len() as u64);
    }
    trace!(chunks = compiled.len(), refs = plan.refs.len(), "split veritum into chunks");
    Ok(compiled.into_iter().map(|c| c.expect("every chunk compiled")).collect())
}

/// Reassemble the original field sequence from an ordered chain of chunk
/// Cubes.
pub fn recombine(chunks: &[Cube], metrics: Option<&Metrics>) -> Vec<Field> {
    let mut out: Vec<Field> = Vec::new();
    for chunk in chunks {
        for field in chunk.fields() {
            if is_continued_in(&field) {
                continue;
            }
            let merge = matches!(field.field_type.length_kind(), Some(LengthKind::Variable))
                && out.last().map(|last: &Field| last.field_type == field.field_type).unwrap_or(false);
            if merge {
                out.last_mut().expect("checked above").value.extend_from_slice(&field.value);
            } else {
                out.push(field);
            }
        }
    }
    if let Some(m) = metrics {
        m.continuation_recombines_total.inc();
    }
    out.retain(|f| f.field_type != FieldType::Padding);
    out
}

/// Encrypt a Veritum's CCI field set for `recipient_pub`, to be applied
/// before [`split`].
pub fn encrypt(
    fields: Vec<Field>,
    sender: &EncryptionKeypair,
    recipient_pub: &[u8; 32],
) -> Result<Vec<Field>, ContinuationError> {
    let (to_encrypt, to_preserve): (Vec<Field>, Vec<Field>) =
        fields.into_iter().partition(|f| !f.field_type.is_continuation_excluded());

    let needed: usize = to_encrypt.iter().map(Field::wire_len).sum();
    let blob = field_parser::compile(&to_encrypt, needed)?;

    let shared = sender.precompute(recipient_pub);
    let (nonce, ciphertext) = shared.seal_parts(&blob);

    let mut out = Vec::with_capacity(to_preserve.len() + 2);
    out.push(Field::new(FieldType::CryptoNonce, nonce.to_vec()));
    out.push(Field::new(FieldType::Encrypted, ciphertext));
    out.extend(to_preserve);
    Ok(out)
}

/// Decrypt a field set produced by [`encrypt`]. On any failure (wrong
/// recipient, tampering) returns `fields` unchanged rather than failing
/// loudly, since a cube may legitimately be addressed to someone else.
pub fn decrypt(fields: Vec<Field>, recipient: &EncryptionKeypair, sender_pub: &[u8; 32]) -> Vec<Field> {
    let Some(nonce_pos) = fields.iter().position(|f| f.field_type == FieldType::CryptoNonce) else {
        return fields;
    };
    let Some(enc_pos) = fields.iter().position(|f| f.field_type == FieldType::Encrypted) else {
        return fields;
    };

    let shared = recipient.precompute(sender_pub);
    let plaintext = match shared.open_parts(&fields[nonce_pos].value, &fields[enc_pos].value) {
        Ok(p) => p,
        Err(_) => {
            tracing::trace!("continuation decrypt failed; returning ciphertext fields unchanged");
            return fields;
        }
    };
    let decoded = match field_parser::decompile(&plaintext) {
        Ok(d) => d.fields,
        Err(_) => {
            tracing::trace!("continuation decrypt produced malformed plaintext; returning unchanged");
            return fields;
        }
    };

    let mut out = Vec::with_capacity(fields.len() + decoded.len());
    for (i, field) in fields.into_iter().enumerate() {
        if i == enc_pos {
            out.extend(decoded.iter().cloned());
        } else if i == nonce_pos {
            continue;
        } else {
            out.push(field);
        }
    }
    out
}
