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
use verity::core::crypto;
use verity::core::cube_codec::{parse, CubeBuilder};
use verity::core::cube_type::CubeType;
use verity::core::field::Field;
use verity::core::field_type::FieldType;
use verity::core::pow::cancel_pair;

fn compile_frozen(payload: Vec<u8>, date: u64) -> Vec<u8> {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async move {
        crypto::init().unwrap();
        let mut builder = CubeBuilder::new(CubeType::Frozen);
        builder.push_field(Field::new(FieldType::Payload, payload));
        builder.date(date);
        let (_tx, rx) = cancel_pair();
        let cube = builder.compile(0, 1000, rx, None).await.unwrap();
        cube.binary().to_vec()
    })
}

proptest! {
    /// Any FROZEN cube compiled from an arbitrary payload and date parses
    /// back to an identical key, hash, and field set.
    #[test]
    fn compiled_frozen_cubes_parse_back_identically(
        payload in proptest::collection::vec(any::<u8>(), 0..600),
        date in any::<u64>(),
    ) {
        let binary = compile_frozen(payload.clone(), date);
        let parsed_a = parse(&binary, 0, None).unwrap();
        let parsed_b = parse(&binary, 0, None).unwrap();

        prop_assert_eq!(parsed_a.key(), parsed_b.key());
        prop_assert_eq!(parsed_a.hash(), parsed_b.hash());
        prop_assert_eq!(parsed_a.fields(), parsed_b.fields());
        prop_assert_eq!(parsed_a.date(), date);

        let payload_field = parsed_a.fields().into_iter().find(|f| f.field_type == FieldType::Payload);
        prop_assert_eq!(payload_field.map(|f| f.value), Some(payload));
    }

    /// Parsing rejects any buffer not exactly `CUBE_SIZE` bytes, regardless
    /// of content.
    #[test]
    fn parse_rejects_wrong_length_buffers(len in 0usize..2048, filler in any::<u8>()) {
        prop_assume!(len != 1024);
        let buffer = vec![filler; len];
        prop_assert!(parse(&buffer, 0, None).is_err());
    }
}
