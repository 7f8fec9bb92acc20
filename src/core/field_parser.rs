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

//! Serialize/deserialize the TLV payload region.
//!
//! `CCI_END`/`PADDING` insertion on compile and trailing-byte handling on
//! decompile are the caller's job (`core::cube_codec`) — this module only
//! knows how to turn a `&[Field]` into payload bytes and back, stopping
//! either when the region is exhausted or a `CCI_END` tag is seen — both are
//! valid terminators.

use crate::core::field::Field;
use crate::core::field_type::{FieldType, LengthKind};
use thiserror::Error;

/// Errors from `FieldParser::compile`/`decompile`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    /// Compiling the fields would overflow the payload region.
    #[error("payload would exceed region capacity ({needed} > {capacity})")]
    FieldSizeError {
        /// Bytes the fields would need.
        needed: usize,
        /// Bytes actually available.
        capacity: usize,
    },
    /// A field's value length disagreed with its fixed-length schema.
    #[error("field {0:?} has a fixed length that the value violates")]
    BadFixedLength(FieldType),
    /// A variable-length field's value was longer than a 2-byte length
    /// prefix can express.
    #[error("field {0:?} value too long for a 2-byte length prefix")]
    ValueTooLong(FieldType),
    /// The payload region ended mid-field.
    #[error("truncated field at payload offset {0}")]
    BinaryDataError(usize),
    /// A TLV tag byte did not name any known field type.
    #[error("unknown field type tag {0:#04x}")]
    UnknownFieldType(u8),
}

/// Serialize `fields` into a payload-region byte buffer no larger than
/// `capacity`. Does not add `CCI_END`/`PADDING` — see `core::cube_codec`.
pub fn compile(fields: &[Field], capacity: usize) -> Result<Vec<u8>, FieldError> {
    let needed: usize = fields.iter().map(Field::wire_len).sum();
    if needed > capacity {
        return Err(FieldError::FieldSizeError { needed, capacity });
    }

    let mut out = Vec::with_capacity(needed);
    for f in fields {
        let tag = f
            .field_type
            .wire_tag()
            .unwrap_or_else(|| panic!("field type {:?} has no TLV wire tag", f.field_type));
        match f.field_type.length_kind() {
            Some(LengthKind::Fixed(n)) => {
                if f.value.len() != n {
                    return Err(FieldError::BadFixedLength(f.field_type));
                }
                out.push(tag);
                out.extend_from_slice(&f.value);
            }
            Some(LengthKind::Variable) => {
                if f.value.len() > u16::MAX as usize {
                    return Err(FieldError::ValueTooLong(f.field_type));
                }
                out.push(tag);
                out.extend_from_slice(&(f.value.len() as u16).to_be_bytes());
                out.extend_from_slice(&f.value);
            }
            None => panic!("field type {:?} is positional, not TLV", f.field_type),
        }
    }
    Ok(out)
}

/// Result of decompiling a payload region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decompiled {
    /// The TLV fields found, in order.
    pub fields: Vec<Field>,
    /// Byte offset (into the payload region) where a `CCI_END` tag was
    /// found, if any — bytes at and after this offset are not part of
    /// `fields`. `None` means the region was exhausted exactly at the end
    /// of the last field, with no `CCI_END`.
    pub cci_end_at: Option<usize>,
}

/// Parse a payload region into its TLV field sequence, stopping at either
/// `CCI_END` or the end of `bytes`.
pub fn decompile(bytes: &[u8]) -> Result<Decompiled, FieldError> {
    let mut fields = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let tag = bytes[pos];
        let Some(field_type) = FieldType::from_wire_tag(tag) else {
            return Err(FieldError::UnknownFieldType(tag));
        };
        if field_type == FieldType::CciEnd {
            return Ok(Decompiled { fields, cci_end_at: Some(pos) });
        }

        let header_len = match field_type.length_kind() {
            Some(LengthKind::Fixed(_)) => 1,
            Some(LengthKind::Variable) => 3,
            None => return Err(FieldError::UnknownFieldType(tag)),
        };
        if pos + header_len > bytes.len() {
            return Err(FieldError::BinaryDataError(pos));
        }

        let value_len = match field_type.length_kind() {
            Some(LengthKind::Fixed(n)) => n,
            Some(LengthKind::Variable) => u16::from_be_bytes([bytes[pos + 1], bytes[pos + 2]]) as usize,
            None => unreachable!(),
        };
        let value_start = pos + header_len;
        let value_end = value_start + value_len;
        if value_end > bytes.len() {
            return Err(FieldError::BinaryDataError(pos));
        }

        fields.push(Field::new(field_type, bytes[value_start..value_end].to_vec()));
        pos = value_end;
    }

    Ok(Decompiled { fields, cci_end_at: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::Field;

    #[test]
    fn compile_decompile_round_trip() {
        let fields = vec![
            Field::new(FieldType::Payload, b"hello".to_vec()),
            Field::new(FieldType::Username, b"Alice".to_vec()),
        ];
        let bytes = compile(&fields, 1000).unwrap();
        let decompiled = decompile(&bytes).unwrap();
        assert_eq!(decompiled.fields, fields);
        assert_eq!(decompiled.cci_end_at, None);
    }

    #[test]
    fn decompile_stops_at_cci_end() {
        let mut bytes = compile(&[Field::new(FieldType::Payload, b"x".to_vec())], 100).unwrap();
        bytes.push(0x00); // CCI_END
        bytes.extend_from_slice(&[0xAA, 0xAA, 0xAA]); // padding
        let d = decompile(&bytes).unwrap();
        assert_eq!(d.fields, vec![Field::new(FieldType::Payload, b"x".to_vec())]);
        assert_eq!(d.cci_end_at, Some(bytes.len() - 1 - 3));
    }

    #[test]
    fn rejects_oversized_payload() {
        let fields = vec![Field::new(FieldType::Payload, vec![0u8; 50])];
        let err = compile(&fields, 10).unwrap_err();
        assert!(matches!(err, FieldError::FieldSizeError { .. }));
    }

    #[test]
    fn rejects_truncated_field() {
        let bytes = vec![FieldType::Payload.wire_tag().unwrap(), 10, 1, 2, 3];
        let err = decompile(&bytes).unwrap_err();
        assert_eq!(err, FieldError::BinaryDataError(0));
    }

    #[test]
    fn rejects_unknown_field_type() {
        let bytes = vec![0x01];
        let err = decompile(&bytes).unwrap_err();
        assert_eq!(err, FieldError::UnknownFieldType(0x01));
    }
}
