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

//! Fixed sizes of the positional fields making up a Cube's binary layout.
//!
//! A Cube is always exactly [`CUBE_SIZE`] bytes. See `core::grammar` for how
//! these sizes combine into a per-[`crate::core::cube_type::CubeType`] layout.

/// Total size of a compiled or parsed Cube, in bytes.
pub const CUBE_SIZE: usize = 1024;

/// Size of the leading type tag.
pub const TYPE_SIZE: usize = 1;
/// Size of the NOTIFY recipient key (present on `*_NOTIFY` types).
pub const NOTIFY_SIZE: usize = 32;
/// Size of the PMUC update counter (present on `PMUC`/`PMUC_NOTIFY`).
pub const PMUC_UPDATE_COUNT_SIZE: usize = 4;
/// Size of the Ed25519 public key (present on MUC-family types).
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of the Ed25519 signature (present on MUC-family types).
pub const SIGNATURE_SIZE: usize = 64;
/// Size of the big-endian unsigned seconds-since-epoch timestamp.
pub const DATE_SIZE: usize = 5;
/// Size of the hashcash nonce.
pub const NONCE_SIZE: usize = 4;

/// Smallest payload slice worth splitting off into its own chunk rather than
/// rolling the whole field over (`Continuation::Split`, case b vs c).
pub const MIN_CHUNK: usize = 10;

/// Number of hash attempts between cooperative PoW yields.
pub const DEFAULT_POW_YIELD_BATCH: u32 = 1000;
