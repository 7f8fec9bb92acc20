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

//! Verity core: the Cube engine for a peer-to-peer content-addressed
//! network.
//!
//! This crate provides:
//! - The 1024-byte self-validating Cube binary format, its CCI TLV field
//!   grammar, and the `FROZEN`/`PIC`/`MUC`/`PMUC` (and `*_NOTIFY`) cube
//!   families
//! - Hashcash-style proof-of-work and local `CubeContest` conflict
//!   resolution
//! - Veritum: splitting oversized logical content across
//!   `CONTINUED_IN`-linked chunk Cubes, and reassembling it
//! - Local Identity key derivation and management
//! - The `Store` trait plus in-memory and `sled`-backed reference
//!   implementations
//! - Monitoring via Prometheus metrics

/// The Cube engine: binary layout, field grammar, crypto, PoW, compile/parse,
/// `CubeContest`, Continuation, Veritum, and Identity.
pub mod core;
/// Engine-level configuration (`EngineConfig`).
pub mod config;
/// Observability (Prometheus metrics).
pub mod monitoring;
/// The `Store` trait and its in-memory and `sled`-backed reference
/// implementations.
pub mod store;
