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
use verity::core::continuation::{recombine, split, SplitOptions};
use verity::core::crypto;
use verity::core::cube_type::CubeType;
use verity::core::field::Field;
use verity::core::field_type::FieldType;
use verity::core::pow::cancel_pair;

fn split_and_recombine(payloads: Vec<Vec<u8>>) -> (Vec<Vec<u8>>, Vec<Vec<u8>>) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async move {
        crypto::init().unwrap();
        let fields: Vec<Field> =
            payloads.iter().map(|p| Field::new(FieldType::Payload, p.clone())).collect();
        let options = SplitOptions {
            cube_type: CubeType::Frozen,
            difficulty: 0,
            yield_batch: 1000,
            date: 1_700_000_000,
            signing_seed: None,
            max_chunk_payload: None,
        };
        let (_tx, rx) = cancel_pair();
        let chunks = split(fields, options, rx, None).await.unwrap();
        let restored: Vec<Vec<u8>> = recombine(&chunks, None)
            .into_iter()
            .filter(|f| f.field_type == FieldType::Payload)
            .map(|f| f.value)
            .collect();
        (payloads, restored)
    })
}

proptest! {
    /// Recombine undoes Split: the concatenation of payload field values
    /// surviving a split/recombine round trip matches the original list,
    /// regardless of how many chunks the payloads spanned.
    #[test]
    fn recombine_undoes_split_for_arbitrary_payload_lists(
        payloads in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 1..400),
            1..6,
        ),
    ) {
        let (original, restored) = split_and_recombine(payloads);
        prop_assert_eq!(original, restored);
    }
}
