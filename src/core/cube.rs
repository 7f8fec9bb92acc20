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

//! The compiled/parsed `Cube`: a validated, owned 1024-byte buffer plus its
//! derived `key` and `hash`.
//!
//! A cube moves through three lifecycle states — *new* (fields only),
//! *compiled*, *parsed* — collapsing to the same shape once binary bytes
//! exist. This crate expresses that as a typestate split instead of a tagged
//! enum: [`crate::core::cube_codec::CubeBuilder`] is the mutable "new" state
//! (a field list you can keep editing), and `Cube` here is the immutable
//! result of either compiling a builder or parsing received bytes — "any
//! field mutation invalidates and returns it to new" becomes, in this split,
//! simply: you edit the `CubeBuilder`, not the `Cube`.

use crate::core::binary_layout::CUBE_SIZE;
use crate::core::cube_type::CubeType;
use crate::core::field::Field;
use crate::core::field_type::FieldType;
use crate::core::field_parser;
use crate::core::grammar::Schema;

/// A validated, immutable Cube: exactly [`CUBE_SIZE`] bytes, with its key and
/// content hash already known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cube {
    cube_type: CubeType,
    buffer: [u8; CUBE_SIZE],
    /// Storage/lookup key: the public key for MUC-family types, the content
    /// hash otherwise.
    key: [u8; 32],
    /// BLAKE2b-256 hash of `buffer`.
    hash: [u8; 32],
    schema: Schema,
}

impl Cube {
    /// Wrap an already-validated buffer with its derived key/hash. Only
    /// called by `cube_codec`, which performs the validation.
    pub(crate) fn from_parts(
        cube_type: CubeType,
        buffer: [u8; CUBE_SIZE],
        key: [u8; 32],
        hash: [u8; 32],
    ) -> Self {
        let schema = Schema::for_type(cube_type);
        Self { cube_type, buffer, key, hash, schema }
    }

    /// This cube's type.
    pub fn cube_type(&self) -> CubeType {
        self.cube_type
    }

    /// The full compiled buffer.
    pub fn binary(&self) -> &[u8; CUBE_SIZE] {
        &self.buffer
    }

    /// Storage/lookup key.
    pub fn key(&self) -> [u8; 32] {
        self.key
    }

    /// BLAKE2b-256 content hash.
    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    /// Read a positional field's raw bytes, if this cube's type carries one.
    pub fn positional_value(&self, field_type: FieldType) -> Option<&[u8]> {
        let slot = self.schema.positional(field_type)?;
        Some(&self.buffer[slot.offset..slot.offset + slot.len])
    }

    /// Decode the `DATE` positional field as a big-endian unsigned integer
    /// (seconds since epoch).
    pub fn date(&self) -> u64 {
        let bytes = self.positional_value(FieldType::Date).expect("every cube type has DATE");
        let mut buf = [0u8; 8];
        buf[8 - bytes.len()..].copy_from_slice(bytes);
        u64::from_be_bytes(buf)
    }

    /// Proof-of-work difficulty actually achieved (trailing zero bits of
    /// `hash`).
    pub fn difficulty(&self) -> u32 {
        crate::core::crypto::trailing_zero_bits(&self.hash)
    }

    /// The `PMUC_UPDATE_COUNT` positional field, for PMUC-family cubes.
    pub fn pmuc_update_count(&self) -> Option<u32> {
        let bytes = self.positional_value(FieldType::PmucUpdateCount)?;
        Some(u32::from_be_bytes(bytes.try_into().expect("PMUC_UPDATE_COUNT is 4 bytes")))
    }

    /// The Ed25519 public key, for MUC-family cubes.
    pub fn public_key(&self) -> Option<[u8; 32]> {
        let bytes = self.positional_value(FieldType::PublicKey)?;
        Some(bytes.try_into().expect("PUBLIC_KEY is 32 bytes"))
    }

    /// The notification recipient key, for `*_NOTIFY` cubes.
    pub fn notify_recipient(&self) -> Option<[u8; 32]> {
        let bytes = self.positional_value(FieldType::Notify)?;
        Some(bytes.try_into().expect("NOTIFY is 32 bytes"))
    }

    /// Decompile the TLV payload region into its field list. Raw, non-CCI
    /// cube types have no TLV structure and return an empty list — read
    /// `raw_content` instead.
    pub fn fields(&self) -> Vec<Field> {
        let (start, end) = self.schema.payload_region;
        field_parser::decompile(&self.buffer[start..end])
            .map(|d| d.fields)
            .unwrap_or_default()
    }

    /// Bytes of the payload region up to (and not including) `CCI_END`, or
    /// the whole region if it was exactly full.
    pub fn payload_region(&self) -> &[u8] {
        let (start, end) = self.schema.payload_region;
        &self.buffer[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto;

    fn dummy_frozen(date: u64) -> Cube {
        let mut buffer = [0u8; CUBE_SIZE];
        buffer[0] = CubeType::Frozen.tag();
        buffer[CUBE_SIZE - 9..CUBE_SIZE - 4].copy_from_slice(&date.to_be_bytes()[3..]);
        let hash = crypto::hash(&buffer);
        Cube::from_parts(CubeType::Frozen, buffer, hash, hash)
    }

    #[test]
    fn reads_back_date_and_difficulty() {
        let cube = dummy_frozen(1_700_000_000);
        assert_eq!(cube.date(), 1_700_000_000);
        assert_eq!(cube.difficulty(), crypto::trailing_zero_bits(&cube.hash()));
    }

    #[test]
    fn frozen_has_no_pmuc_or_public_key() {
        let cube = dummy_frozen(0);
        assert_eq!(cube.pmuc_update_count(), None);
        assert_eq!(cube.public_key(), None);
    }
}
