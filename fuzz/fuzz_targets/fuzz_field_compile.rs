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

#![no_main]
#![forbid(unsafe_code)]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use verity::core::field::Field;
use verity::core::field_parser::compile;
use verity::core::field_type::FieldType;

#[derive(Clone, Debug, Arbitrary)]
enum FuzzFieldType {
    Payload,
    Application,
    Contentname,
    Description,
    Username,
}

impl From<FuzzFieldType> for FieldType {
    fn from(f: FuzzFieldType) -> Self {
        match f {
            FuzzFieldType::Payload => FieldType::Payload,
            FuzzFieldType::Application => FieldType::Application,
            FuzzFieldType::Contentname => FieldType::Contentname,
            FuzzFieldType::Description => FieldType::Description,
            FuzzFieldType::Username => FieldType::Username,
        }
    }
}

#[derive(Clone, Debug, Arbitrary)]
struct Input {
    fields: Vec<(FuzzFieldType, Vec<u8>)>,
    capacity: u16,
}

fuzz_target!(|inp: Input| {
    // Arbitrary variable-length TLV field lists must either serialize within
    // the claimed capacity or report an error — never panic or silently
    // truncate.
    let fields: Vec<Field> =
        inp.fields.into_iter().map(|(t, v)| Field::new(t.into(), v)).collect();
    let _ = compile(&fields, inp.capacity as usize);
});

