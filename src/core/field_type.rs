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

//! Unified field-type enum.
//!
//! Every byte-producing slot in a Cube, positional or TLV, is a single
//! `FieldType` rather than two separate notions of "field type" kept loosely
//! in sync — one enum to name both a fixed-offset positional and a CCI TLV
//! field.

use crate::core::binary_layout::*;

/// A field type, covering both positional (fixed-offset) slots and CCI TLV
/// fields carried in the payload region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldType {
    // --- positional slots ---
    /// The leading type tag (always byte 0).
    Type,
    /// Notification recipient key (`*_NOTIFY` types).
    Notify,
    /// PMUC monotonic update counter (`PMUC`/`PMUC_NOTIFY`).
    PmucUpdateCount,
    /// Ed25519 public key (MUC-family types); also the cube key for those types.
    PublicKey,
    /// Ed25519 signature over the prefix preceding it.
    Signature,
    /// Big-endian unsigned seconds-since-epoch.
    Date,
    /// Hashcash nonce.
    Nonce,
    /// Opaque payload occupying the entire payload region (non-CCI cubes only).
    RawContent,

    // --- CCI TLV fields ---
    /// Terminates the TLV stream in the payload region.
    CciEnd,
    /// Generic application-defined payload.
    Application,
    /// Ciphertext produced by [`crate::core::continuation::encrypt`].
    Encrypted,
    /// Nonce accompanying an `Encrypted` field.
    CryptoNonce,
    /// A recipient's Curve25519 public key.
    CryptoPubkey,
    /// A subkey derivation seed.
    SubkeySeed,
    /// Primary content payload.
    Payload,
    /// Human-readable content name.
    Contentname,
    /// Free-text description.
    Description,
    /// A packed `(relationship_type, remote_key)` pair, see `core::field::Relationship`.
    RelatesTo,
    /// Display name.
    Username,
    /// One-byte media type discriminant (TEXT=1, JPEG=2, ...).
    MediaType,
    /// Avatar image bytes.
    Avatar,
    /// Padding: either a zero-length TLV separator between same-type runs,
    /// or (outside TLV framing) raw filler bytes after `CciEnd`.
    Padding,
    /// One of sixteen application-reserved custom slots (1..=16).
    Custom(u8),
}

/// Whether a field value carries a length prefix when serialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthKind {
    /// Always exactly this many bytes; no length prefix on the wire.
    Fixed(usize),
    /// A 2-byte big-endian length prefix precedes the value. Two bytes
    /// (rather than one) so a single field can span most of a chunk's
    /// payload region, as Continuation splitting relies on.
    Variable,
}

impl FieldType {
    /// The stable one-byte wire tag for CCI TLV fields. Positional and raw
    /// slots have no TLV tag and return `None`.
    pub fn wire_tag(&self) -> Option<u8> {
        use FieldType::*;
        Some(match self {
            CciEnd => 0x00,
            Application => 0x04,
            Encrypted => 0x08,
            CryptoNonce => 0x0C,
            CryptoPubkey => 0x18,
            SubkeySeed => 0x1C,
            Payload => 0x40,
            Contentname => 0x44,
            Description => 0x48,
            RelatesTo => 0x4C,
            Username => 0x50,
            MediaType => 0x54,
            Avatar => 0x58,
            Padding => 0x7C,
            Custom(n) if (1..=16).contains(n) => 0xC0u8 + (n - 1) * 4,
            Custom(_) => return None,
            Type | Notify | PmucUpdateCount | PublicKey | Signature | Date | Nonce
            | RawContent => return None,
        })
    }

    /// Resolve a wire tag back to a `FieldType`, if it names a TLV field.
    pub fn from_wire_tag(tag: u8) -> Option<FieldType> {
        use FieldType::*;
        Some(match tag {
            0x00 => CciEnd,
            0x04 => Application,
            0x08 => Encrypted,
            0x0C => CryptoNonce,
            0x18 => CryptoPubkey,
            0x1C => SubkeySeed,
            0x40 => Payload,
            0x44 => Contentname,
            0x48 => Description,
            0x4C => RelatesTo,
            0x50 => Username,
            0x54 => MediaType,
            0x58 => Avatar,
            0x7C => Padding,
            t if (0xC0..=0xFC).contains(&t) && (t - 0xC0) % 4 == 0 => {
                Custom((t - 0xC0) / 4 + 1)
            }
            _ => return None,
        })
    }

    /// Fixed size for positional slots; `None` for slots with no independent
    /// size (i.e. TLV fields, handled by [`FieldType::length_kind`]).
    pub fn positional_size(&self) -> Option<usize> {
        use FieldType::*;
        match self {
            Type => Some(TYPE_SIZE),
            Notify => Some(NOTIFY_SIZE),
            PmucUpdateCount => Some(PMUC_UPDATE_COUNT_SIZE),
            PublicKey => Some(PUBLIC_KEY_SIZE),
            Signature => Some(SIGNATURE_SIZE),
            Date => Some(DATE_SIZE),
            Nonce => Some(NONCE_SIZE),
            _ => None,
        }
    }

    /// Whether this field type is a positional slot (fixed offset from the
    /// front or back of the cube) rather than a TLV payload field.
    pub fn is_positional(&self) -> bool {
        self.positional_size().is_some()
    }

    /// Length behavior for TLV (CCI) fields. A field type is always fixed-
    /// length or always variable-length, never both.
    pub fn length_kind(&self) -> Option<LengthKind> {
        use FieldType::*;
        match self {
            CciEnd => Some(LengthKind::Fixed(0)),
            RelatesTo => Some(LengthKind::Fixed(33)),
            CryptoPubkey => Some(LengthKind::Fixed(32)),
            MediaType => Some(LengthKind::Fixed(1)),
            // secretbox nonce length (sodiumoxide::crypto::secretbox::NONCEBYTES).
            CryptoNonce => Some(LengthKind::Fixed(24)),
            Padding => Some(LengthKind::Variable),
            Application | Encrypted | SubkeySeed | Payload | Contentname | Description
            | Username | Avatar | Custom(_) => Some(LengthKind::Variable),
            Type | Notify | PmucUpdateCount | PublicKey | Signature | Date | Nonce
            | RawContent => None,
        }
    }

    /// `true` for the field types never transported across a Continuation
    /// split/recombine boundary: positional slots, raw core content, and the
    /// two structural markers (`CciEnd`/`Padding` are regenerated per chunk
    /// by the codec, not carried as application data — though `Recombine`
    /// temporarily retains `Padding` mid-algorithm, see `core::continuation`).
    pub fn is_continuation_excluded(&self) -> bool {
        self.is_positional() || matches!(self, FieldType::RawContent | FieldType::CciEnd)
    }
}
