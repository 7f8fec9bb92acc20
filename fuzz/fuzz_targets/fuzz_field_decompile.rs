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

use libfuzzer_sys::fuzz_target;
use verity::core::field_parser::decompile;

fuzz_target!(|data: &[u8]| {
    // A payload region's TLV bytes may be truncated, carry an unknown tag,
    // or claim a length prefix past the end of the buffer; decompile must
    // reject these, never panic.
    let _ = decompile(data);
});
