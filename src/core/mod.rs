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

//! The Cube engine: binary layout, the CCI field grammar, cryptography,
//! proof-of-work, Cube compile/parse, `CubeContest`, Continuation, the
//! Veritum orchestration layer, and local Identity key management.

/// Fixed offsets and sizes for the 1024-byte Cube binary layout.
pub mod binary_layout;
/// Pure, local `CubeContest` conflict resolution.
pub mod contest;
/// The compiled/parsed `Cube` type.
pub mod cube;
/// `CubeBuilder` (new-state assembly) and `parse` (received-bytes validation).
pub mod cube_codec;
/// The closed set of Cube types and their structural properties.
pub mod cube_type;
/// Cryptographic primitives: hashing, signing, box/secretbox, KDF.
pub mod crypto;
/// Split an oversized Veritum into linked chunk Cubes, and reassemble it.
pub mod continuation;
/// The logical, owned field value used while building/splitting/recombining.
pub mod field;
/// Serialize/deserialize the TLV payload region.
pub mod field_parser;
/// Unified field-type enum covering positional slots and CCI TLV fields.
pub mod field_type;
/// Per-cube-type positional layout and payload-region bounds.
pub mod grammar;
/// Local Identity: master key derivation, signing/encryption subkeys, and
/// rebuild coalescing for MUC/PMUC republication.
pub mod identity;
/// Hashcash-style proof-of-work search over the `NONCE` positional field.
pub mod pow;
/// `RELATES_TO` field value: a typed pointer `(relationship_type, remote_key)`.
pub mod relationship;
/// The Veritum orchestration layer tying Continuation to `CubeCodec`.
pub mod veritum;
