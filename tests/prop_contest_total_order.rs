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

use proptest::prelude::*;
use verity::core::contest::{resolve, Winner};
use verity::core::crypto::{self, SigningKeypair};
use verity::core::cube_codec::{parse, CubeBuilder};
use verity::core::cube_type::CubeType;
use verity::core::field::Field;
use verity::core::field_type::FieldType;
use verity::core::pow::cancel_pair;

fn muc(date: u64, username: &str) -> Vec<u8> {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let username = username.to_string();
    rt.block_on(async move {
        crypto::init().unwrap();
        let mut builder = CubeBuilder::new(CubeType::Muc);
        builder.push_field(Field::new(FieldType::Username, username.into_bytes()));
        builder.date(date);
        builder.signing_key(SigningKeypair::from_seed(&[4u8; 32]));
        let (_tx, rx) = cancel_pair();
        let cube = builder.compile(0, 1000, rx, None).await.unwrap();
        cube.binary().to_vec()
    })
}

proptest! {
    /// Swapping the two arguments to `resolve` swaps `First`/`Second` but
    /// never changes which underlying cube is picked.
    #[test]
    fn resolve_is_stable_under_argument_swap(
        date_a in any::<u64>(),
        date_b in any::<u64>(),
        name_a in "[a-z]{1,8}",
        name_b in "[a-z]{1,8}",
    ) {
        let bin_a = muc(date_a, &name_a);
        let bin_b = muc(date_b, &name_b);
        let a = parse(&bin_a, 0, None).unwrap();
        let b = parse(&bin_b, 0, None).unwrap();

        let forward = resolve(&a, &b);
        let backward = resolve(&b, &a);

        let forward_cube_wins_a = matches!(forward, Winner::First);
        let backward_cube_wins_a = matches!(backward, Winner::Second);
        prop_assert_eq!(forward_cube_wins_a, backward_cube_wins_a);
    }
}
