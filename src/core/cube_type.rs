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

//! The closed set of Cube types and the structural properties that follow
//! from each (signed?, notify-bearing?, versioned?, key derivation rule).
//!
//! `CubeType` plugs into `core::grammar` rather than being expressed as a
//! class hierarchy: new families would register a new `Schema`, not a new
//! struct.

use thiserror::Error;

/// The closed set of Cube types.
///
/// Wire tag values are an implementation choice — only a closed
/// eight-member set is required — see `DESIGN.md`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CubeType {
    /// Immutable, content-addressed.
    Frozen = 0x01,
    /// `Frozen` carrying a notification recipient key.
    FrozenNotify = 0x02,
    /// Persistent immutable cube, content-addressed.
    Pic = 0x03,
    /// `Pic` carrying a notification recipient key.
    PicNotify = 0x04,
    /// Mutable user cube, signed, keyed by public key.
    Muc = 0x05,
    /// `Muc` carrying a notification recipient key.
    MucNotify = 0x06,
    /// Versioned MUC with an explicit update counter.
    Pmuc = 0x07,
    /// `Pmuc` carrying a notification recipient key.
    PmucNotify = 0x08,
}

/// An unrecognized type tag byte.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown cube type tag {0:#04x}")]
pub struct UnknownCubeType(pub u8);

impl CubeType {
    /// All eight cube types, in wire-tag order.
    pub const ALL: [CubeType; 8] = [
        CubeType::Frozen,
        CubeType::FrozenNotify,
        CubeType::Pic,
        CubeType::PicNotify,
        CubeType::Muc,
        CubeType::MucNotify,
        CubeType::Pmuc,
        CubeType::PmucNotify,
    ];

    /// Decode the leading type tag byte.
    pub fn from_tag(tag: u8) -> Result<Self, UnknownCubeType> {
        Self::ALL
            .into_iter()
            .find(|t| *t as u8 == tag)
            .ok_or(UnknownCubeType(tag))
    }

    /// The leading type tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Whether this type carries a 32-byte NOTIFY recipient key.
    pub fn is_notify(self) -> bool {
        matches!(
            self,
            CubeType::FrozenNotify | CubeType::PicNotify | CubeType::MucNotify | CubeType::PmucNotify
        )
    }

    /// Whether this type carries a `PMUC_UPDATE_COUNT` front positional.
    pub fn is_pmuc(self) -> bool {
        matches!(self, CubeType::Pmuc | CubeType::PmucNotify)
    }

    /// Whether this type is in the MUC family (carries `PUBLIC_KEY`, is
    /// signed, and is keyed by its public key rather than its hash).
    pub fn is_muc_family(self) -> bool {
        matches!(
            self,
            CubeType::Muc | CubeType::MucNotify | CubeType::Pmuc | CubeType::PmucNotify
        )
    }

    /// Whether Cubes of this type require an Ed25519 signature.
    pub fn is_signed(self) -> bool {
        self.is_muc_family()
    }

    /// Whether this type carries CCI TLV fields in its payload region
    /// (`true` for every type in this crate — bare/non-CCI RAWCONTENT cubes
    /// are a degenerate case handled by `CubeCodec` directly and are not
    /// modeled as a separate `CubeType`).
    pub fn is_cci(self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_type() {
        for t in CubeType::ALL {
            assert_eq!(CubeType::from_tag(t.tag()).unwrap(), t);
        }
    }

    #[test]
    fn unknown_tag_rejected() {
        assert_eq!(CubeType::from_tag(0x00), Err(UnknownCubeType(0x00)));
        assert_eq!(CubeType::from_tag(0xFF), Err(UnknownCubeType(0xFF)));
    }

    #[test]
    fn family_properties() {
        assert!(CubeType::Muc.is_signed());
        assert!(CubeType::Pmuc.is_pmuc());
        assert!(CubeType::PmucNotify.is_notify());
        assert!(!CubeType::Frozen.is_signed());
        assert!(!CubeType::Pic.is_notify());
    }
}
