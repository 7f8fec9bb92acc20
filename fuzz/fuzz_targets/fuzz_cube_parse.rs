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
use verity::core::cube_codec::parse;

#[derive(Clone, Debug, Arbitrary)]
struct Input {
    buffer: Vec<u8>,
    required_difficulty: u32,
}

fuzz_target!(|inp: Input| {
    // Any byte buffer, of any length, at any required difficulty, must
    // either parse into a validated Cube or return an error — never panic.
    let _ = parse(&inp.buffer, inp.required_difficulty, None);
});
