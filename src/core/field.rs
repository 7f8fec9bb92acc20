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

//! The logical, owned field value used while building, splitting, and
//! recombining Veritum field lists. Once a Cube is compiled, reads go
//! through `Cube::field_value`, which slices the compiled buffer directly
//! (see `core::cube`) — `Field` here is the construction-time currency.

use crate::core::field_type::{FieldType, LengthKind};
use crate::core::relationship::Relationship;

/// One field: a type tag plus its value bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    /// The field's type.
    pub field_type: FieldType,
    /// The field's raw value bytes.
    pub value: Vec<u8>,
}

impl Field {
    /// Construct a field, without validating its length against
    /// [`FieldType::length_kind`] (use [`Field::checked`] for that).
    pub fn new(field_type: FieldType, value: Vec<u8>) -> Self {
        Self { field_type, value }
    }

    /// Construct a field, validating the value length against the field
    /// type's declared [`LengthKind`] when the type has one.
    pub fn checked(field_type: FieldType, value: Vec<u8>) -> Result<Self, FieldLengthError> {
        if let Some(LengthKind::Fixed(n)) = field_type.length_kind() {
            if value.len() != n {
                return Err(FieldLengthError { field_type, expected: Some(n), got: value.len() });
            }
        }
        if let Some(LengthKind::Variable) = field_type.length_kind() {
            if value.len() > u16::MAX as usize {
                return Err(FieldLengthError { field_type, expected: None, got: value.len() });
            }
        }
        Ok(Self { field_type, value })
    }

    /// Build a `RELATES_TO` field from a [`Relationship`].
    pub fn relates_to(rel: Relationship) -> Self {
        Self { field_type: FieldType::RelatesTo, value: rel.to_bytes().to_vec() }
    }

    /// Decode this field's value as a [`Relationship`], if it is a
    /// `RELATES_TO` field.
    pub fn as_relationship(&self) -> Option<Relationship> {
        if self.field_type != FieldType::RelatesTo {
            return None;
        }
        Relationship::from_bytes(&self.value).ok()
    }

    /// Build a zero-length `PADDING` separator, used to keep two adjacent
    /// same-type variable-length fields from merging on re-parse.
    pub fn padding_marker() -> Self {
        Self { field_type: FieldType::Padding, value: Vec::new() }
    }

    /// Serialized size of this field on the wire, including its type tag and
    /// (if variable) 2-byte length prefix.
    pub fn wire_len(&self) -> usize {
        let header = match self.field_type.length_kind() {
            Some(LengthKind::Fixed(_)) => 1,
            Some(LengthKind::Variable) => 3,
            None => 0,
        };
        header + self.value.len()
    }
}

/// A field's declared length did not match its value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field {field_type:?} expected length {expected:?}, got {got}")]
pub struct FieldLengthError {
    /// The offending field type.
    pub field_type: FieldType,
    /// The length the type requires, if fixed.
    pub expected: Option<usize>,
    /// The length actually supplied.
    pub got: usize,
}
