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

//! `CubeContest`: the pure, local rule that picks a winner between two
//! cubes sharing the same key.
//!
//! FROZEN/PIC require byte-identical copies (first
//! wins on any mismatch); MUC-family orders by DATE, then difficulty, then
//! hash; PMUC-family additionally orders by `PMUC_UPDATE_COUNT` ahead of
//! DATE. The result is a total order — ties never occur for two distinct
//! byte buffers, since hash is the final tiebreaker and differs whenever
//! the buffers do.

use crate::core::cube::Cube;
use crate::core::cube_type::CubeType;
use std::cmp::Ordering;

/// Which of two contesting cubes wins the `CubeContest`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Winner {
    /// The first cube (`a`) wins.
    First,
    /// The second cube (`b`) wins.
    Second,
}

/// Resolve a conflict between two cubes sharing the same key.
///
/// # Panics
/// Panics if `a.cube_type() != b.cube_type()` — cubes sharing a key always
/// share a type, since the key derivation (public key or hash) is
/// type-specific and `Store::put` only ever contests cubes already found at
/// the same key.
pub fn resolve(a: &Cube, b: &Cube) -> Winner {
    assert_eq!(a.cube_type(), b.cube_type(), "CubeContest requires cubes of the same type");

    match a.cube_type() {
        CubeType::Frozen | CubeType::FrozenNotify | CubeType::Pic | CubeType::PicNotify => {
            // Immutable: identical buffers are the same cube either way; on a
            // mismatch the first one stored wins.
            Winner::First
        }
        CubeType::Muc | CubeType::MucNotify => resolve_by(a, b, &[Key::Date, Key::Difficulty, Key::Hash]),
        CubeType::Pmuc | CubeType::PmucNotify => {
            resolve_by(a, b, &[Key::PmucUpdateCount, Key::Date, Key::Difficulty, Key::Hash])
        }
    }
}

enum Key {
    PmucUpdateCount,
    Date,
    Difficulty,
    Hash,
}

fn resolve_by(a: &Cube, b: &Cube, order: &[Key]) -> Winner {
    for key in order {
        let ord = match key {
            Key::PmucUpdateCount => a
                .pmuc_update_count()
                .expect("PMUC cube has PMUC_UPDATE_COUNT")
                .cmp(&b.pmuc_update_count().expect("PMUC cube has PMUC_UPDATE_COUNT")),
            Key::Date => a.date().cmp(&b.date()),
            Key::Difficulty => a.difficulty().cmp(&b.difficulty()),
            Key::Hash => a.hash().cmp(&b.hash()),
        };
        match ord {
            Ordering::Greater => return Winner::First,
            Ordering::Less => return Winner::Second,
            Ordering::Equal => continue,
        }
    }
    // Every tiebreaker exhausted without a decision only happens for two
    // byte-identical buffers (hash ties iff buffers are equal); pick the
    // first arbitrarily since there is nothing left to distinguish them.
    Winner::First
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::binary_layout::CUBE_SIZE;
    use crate::core::crypto;

    fn muc(date: u64, nonce: u8) -> Cube {
        let mut buffer = [0u8; CUBE_SIZE];
        buffer[0] = CubeType::Muc.tag();
        buffer[1..33].fill(7); // PUBLIC_KEY
        buffer[CUBE_SIZE - 9..CUBE_SIZE - 4].copy_from_slice(&date.to_be_bytes()[3..]);
        buffer[CUBE_SIZE - 1] = nonce;
        let hash = crypto::hash(&buffer);
        Cube::from_parts(CubeType::Muc, buffer, buffer[1..33].try_into().unwrap(), hash)
    }

    #[test]
    fn newer_date_wins() {
        let older = muc(100, 0);
        let newer = muc(200, 0);
        assert_eq!(resolve(&older, &newer), Winner::Second);
        assert_eq!(resolve(&newer, &older), Winner::First);
    }

    #[test]
    fn frozen_identical_buffers_pick_first() {
        let mut buffer = [0u8; CUBE_SIZE];
        buffer[0] = CubeType::Frozen.tag();
        let hash = crypto::hash(&buffer);
        let a = Cube::from_parts(CubeType::Frozen, buffer, hash, hash);
        let b = Cube::from_parts(CubeType::Frozen, buffer, hash, hash);
        assert_eq!(resolve(&a, &b), Winner::First);
    }

    #[test]
    #[should_panic]
    fn mismatched_types_panic() {
        let mut frozen_buf = [0u8; CUBE_SIZE];
        frozen_buf[0] = CubeType::Frozen.tag();
        let frozen_hash = crypto::hash(&frozen_buf);
        let frozen = Cube::from_parts(CubeType::Frozen, frozen_buf, frozen_hash, frozen_hash);
        let muc = muc(1, 1);
        resolve(&frozen, &muc);
    }
}
