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

//! Per-[`CubeType`] schema: where the positional fields sit, and how big the
//! payload (TLV) region in between them is.
//!
//! Schemas are pure functions of `CubeType` — there is no class hierarchy to
//! register a new family, just a new `CubeType` variant plus the arithmetic
//! below picking up its front/back positional set.

use crate::core::binary_layout::*;
use crate::core::cube_type::CubeType;
use crate::core::field_type::FieldType;

/// Offset (into the 1024-byte cube buffer) and length of one positional slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionalSlot {
    /// The slot's field type.
    pub field_type: FieldType,
    /// Byte offset of the slot's first byte.
    pub offset: usize,
    /// Length of the slot in bytes.
    pub len: usize,
}

/// The fully resolved layout for one `CubeType`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    /// The cube type this schema describes.
    pub cube_type: CubeType,
    /// Front positionals, in front-to-back order (always starts with `Type`).
    pub front: Vec<PositionalSlot>,
    /// Back positionals, in front-to-back order as they appear in the
    /// buffer.
    pub back: Vec<PositionalSlot>,
    /// `[start, end)` of the payload (TLV) region.
    pub payload_region: (usize, usize),
}

impl Schema {
    /// Compute the schema for a given cube type.
    pub fn for_type(cube_type: CubeType) -> Schema {
        let mut front = Vec::new();
        let mut offset = 0usize;

        front.push(PositionalSlot { field_type: FieldType::Type, offset, len: TYPE_SIZE });
        offset += TYPE_SIZE;

        if cube_type.is_notify() {
            front.push(PositionalSlot { field_type: FieldType::Notify, offset, len: NOTIFY_SIZE });
            offset += NOTIFY_SIZE;
        }
        if cube_type.is_pmuc() {
            front.push(PositionalSlot {
                field_type: FieldType::PmucUpdateCount,
                offset,
                len: PMUC_UPDATE_COUNT_SIZE,
            });
            offset += PMUC_UPDATE_COUNT_SIZE;
        }
        if cube_type.is_muc_family() {
            front.push(PositionalSlot { field_type: FieldType::PublicKey, offset, len: PUBLIC_KEY_SIZE });
            offset += PUBLIC_KEY_SIZE;
        }
        let front_len = offset;

        let mut back_len = DATE_SIZE + NONCE_SIZE;
        if cube_type.is_signed() {
            back_len += SIGNATURE_SIZE;
        }

        let mut back = Vec::new();
        let mut back_offset = CUBE_SIZE - back_len;
        if cube_type.is_signed() {
            back.push(PositionalSlot {
                field_type: FieldType::Signature,
                offset: back_offset,
                len: SIGNATURE_SIZE,
            });
            back_offset += SIGNATURE_SIZE;
        }
        back.push(PositionalSlot { field_type: FieldType::Date, offset: back_offset, len: DATE_SIZE });
        back_offset += DATE_SIZE;
        back.push(PositionalSlot { field_type: FieldType::Nonce, offset: back_offset, len: NONCE_SIZE });
        back_offset += NONCE_SIZE;
        debug_assert_eq!(back_offset, CUBE_SIZE);

        Schema { cube_type, front, back, payload_region: (front_len, CUBE_SIZE - back_len) }
    }

    /// Offset up to (but not including) the signature, for types that sign —
    /// i.e. `[0..signature_offset]` is exactly what gets signed/verified.
    pub fn signature_offset(&self) -> Option<usize> {
        self.back
            .iter()
            .find(|s| s.field_type == FieldType::Signature)
            .map(|s| s.offset)
    }

    /// Capacity of the payload region in bytes.
    pub fn payload_capacity(&self) -> usize {
        self.payload_region.1 - self.payload_region.0
    }

    /// Find a positional slot's offset/length by field type, if this schema
    /// has one.
    pub fn positional(&self, field_type: FieldType) -> Option<PositionalSlot> {
        self.front
            .iter()
            .chain(self.back.iter())
            .copied()
            .find(|s| s.field_type == field_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_layout_is_type_payload_date_nonce() {
        let s = Schema::for_type(CubeType::Frozen);
        assert_eq!(s.front.len(), 1);
        assert_eq!(s.payload_region, (1, CUBE_SIZE - DATE_SIZE - NONCE_SIZE));
        assert_eq!(s.payload_capacity(), CUBE_SIZE - 1 - DATE_SIZE - NONCE_SIZE);
        assert!(s.signature_offset().is_none());
    }

    #[test]
    fn muc_layout_has_pubkey_front_and_signature_back() {
        let s = Schema::for_type(CubeType::Muc);
        assert_eq!(s.positional(FieldType::PublicKey).unwrap().len, PUBLIC_KEY_SIZE);
        let sig_off = s.signature_offset().unwrap();
        assert_eq!(sig_off, CUBE_SIZE - SIGNATURE_SIZE - DATE_SIZE - NONCE_SIZE);
    }

    #[test]
    fn pmuc_notify_has_all_four_front_positionals() {
        let s = Schema::for_type(CubeType::PmucNotify);
        let kinds: Vec<_> = s.front.iter().map(|p| p.field_type).collect();
        assert_eq!(
            kinds,
            vec![FieldType::Type, FieldType::Notify, FieldType::PmucUpdateCount, FieldType::PublicKey]
        );
    }

    #[test]
    fn every_schema_sums_to_cube_size() {
        for t in CubeType::ALL {
            let s = Schema::for_type(t);
            let front_len: usize = s.front.iter().map(|p| p.len).sum();
            let back_len: usize = s.back.iter().map(|p| p.len).sum();
            assert_eq!(front_len + s.payload_capacity() + back_len, CUBE_SIZE);
        }
    }
}
