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

//! Assemble, validate, and tear down Cubes: the "new" ([`CubeBuilder`]) and
//! "compiled"/"parsed" ([`crate::core::cube::Cube`]) lifecycle states.

use crate::core::binary_layout::*;
use crate::core::crypto::{self, SigningKeypair};
use crate::core::cube::Cube;
use crate::core::cube_type::{CubeType, UnknownCubeType};
use crate::core::field::Field;
use crate::core::field_parser::{self, FieldError};
use crate::core::field_type::FieldType;
use crate::core::grammar::Schema;
use crate::monitoring::metrics::Metrics;
use sodiumoxide::randombytes::randombytes_into;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, trace};

/// All failure kinds from assembling, compiling, or parsing a Cube.
#[derive(Debug, Error)]
pub enum CubeError {
    /// Parsed input was not exactly [`CUBE_SIZE`] bytes.
    #[error("binary length must be {CUBE_SIZE}, got {0}")]
    BinaryLengthError(usize),
    /// The leading type tag did not name a known [`CubeType`].
    #[error(transparent)]
    UnknownCubeType(#[from] UnknownCubeType),
    /// A TLV tag byte inside the payload region did not name a known
    /// [`FieldType`].
    #[error("unknown field type tag {0:#04x}")]
    UnknownFieldType(u8),
    /// Compiling would exceed the payload region, or a field value
    /// disagreed with its fixed-length schema.
    #[error(transparent)]
    FieldSizeError(#[from] FieldError),
    /// The TLV payload region was truncated during parse.
    #[error("truncated TLV data at payload offset {0}")]
    BinaryDataError(usize),
    /// Signature verification failed on parse.
    #[error("signature verification failed")]
    SignatureError,
    /// The recomputed hash did not meet the required difficulty.
    #[error("hash met only {actual} of {required} required trailing zero bits")]
    InsufficientDifficulty {
        /// Trailing zero bits actually present.
        actual: u32,
        /// Trailing zero bits required.
        required: u32,
    },
    /// Underlying crypto primitive rejected its input shape.
    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),
    /// A PMUC builder had no `PMUC_UPDATE_COUNT` field at all (distinct from
    /// one holding zero).
    #[error("PMUC cube is missing its PMUC_UPDATE_COUNT field")]
    MissingPmucUpdateCount,
    /// An operation requires a private key the builder does not hold.
    #[error("operation requires a private signing key, none was supplied")]
    ApiMisuseError,
    /// Compilation was cancelled before the proof-of-work search completed.
    #[error("compile cancelled during proof-of-work search")]
    Cancelled,
}

/// The mutable "new" lifecycle state: a field list plus enough metadata to
/// compile it into a [`Cube`]. Any further edits belong here, not on a
/// compiled `Cube` — see `core::cube`'s module doc.
pub struct CubeBuilder {
    cube_type: CubeType,
    fields: Vec<Field>,
    date: u64,
    notify_recipient: Option<[u8; 32]>,
    pmuc_update_count: Option<u32>,
    signing_key: Option<SigningKeypair>,
}

impl CubeBuilder {
    /// Start building a cube of the given type.
    pub fn new(cube_type: CubeType) -> Self {
        Self {
            cube_type,
            fields: Vec::new(),
            date: 0,
            notify_recipient: None,
            pmuc_update_count: if cube_type.is_pmuc() { Some(0) } else { None },
            signing_key: None,
        }
    }

    /// Append a TLV field.
    pub fn push_field(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// Set the `DATE` positional (seconds since epoch).
    pub fn date(&mut self, date: u64) -> &mut Self {
        self.date = date;
        self
    }

    /// Set the `NOTIFY` recipient key, for `*_NOTIFY` types.
    pub fn notify_recipient(&mut self, key: [u8; 32]) -> &mut Self {
        self.notify_recipient = Some(key);
        self
    }

    /// Set the `PMUC_UPDATE_COUNT`, for PMUC-family types.
    pub fn pmuc_update_count(&mut self, count: u32) -> &mut Self {
        self.pmuc_update_count = Some(count);
        self
    }

    /// Provide the Ed25519 signing key for MUC-family types.
    pub fn signing_key(&mut self, key: SigningKeypair) -> &mut Self {
        self.signing_key = Some(key);
        self
    }

    /// Apply the PMUC auto-increment rule: if this builder's count
    /// is still the default zero and the Store already holds a cube at this
    /// key, bump it to `stored_count + 1`. If no private key is held, the
    /// count is left at zero and a warning is logged — the cube may then
    /// lose its `CubeContest`.
    pub fn apply_pmuc_auto_increment(&mut self, stored_count: Option<u32>) -> Result<(), CubeError> {
        if !self.cube_type.is_pmuc() {
            return Ok(());
        }
        let count = self.pmuc_update_count.ok_or(CubeError::MissingPmucUpdateCount)?;
        if count != 0 {
            return Ok(());
        }
        let Some(stored_count) = stored_count else { return Ok(()) };
        if self.signing_key.is_none() {
            tracing::warn!("PMUC rebuild has no private key; leaving PMUC_UPDATE_COUNT at 0");
            return Ok(());
        }
        self.pmuc_update_count = Some(stored_count + 1);
        Ok(())
    }

    /// Compile this builder into a validated [`Cube`]: positional assembly,
    /// TLV serialization, CCI_END/PADDING, signing, and proof-of-work
    /// search: assemble positionals, serialize TLV fields, sign, then search
    /// for a nonce meeting `difficulty`.
    pub async fn compile(
        self,
        difficulty: u32,
        yield_batch: u64,
        cancel: watch::Receiver<bool>,
        metrics: Option<Metrics>,
    ) -> Result<Cube, CubeError> {
        let schema = Schema::for_type(self.cube_type);
        let mut buffer = [0u8; CUBE_SIZE];

        // (a) front positionals.
        buffer[0] = self.cube_type.tag();
        if let Some(slot) = schema.positional(FieldType::Notify) {
            let key = self.notify_recipient.ok_or(CubeError::ApiMisuseError)?;
            buffer[slot.offset..slot.offset + slot.len].copy_from_slice(&key);
        }
        if let Some(slot) = schema.positional(FieldType::PmucUpdateCount) {
            let count = self.pmuc_update_count.ok_or(CubeError::MissingPmucUpdateCount)?;
            buffer[slot.offset..slot.offset + slot.len].copy_from_slice(&count.to_be_bytes());
        }
        if let Some(slot) = schema.positional(FieldType::PublicKey) {
            let key = self.signing_key.as_ref().ok_or(CubeError::ApiMisuseError)?.public_key;
            buffer[slot.offset..slot.offset + slot.len].copy_from_slice(&key);
        }

        // (b) + (c) payload region: TLV fields, then CCI_END/PADDING fill.
        let capacity = schema.payload_capacity();
        let mut payload = field_parser::compile(&self.fields, capacity)?;
        if payload.len() < capacity {
            payload.push(FieldType::CciEnd.wire_tag().expect("CCI_END has a wire tag"));
            let pad_len = capacity - payload.len();
            let mut padding = vec![0u8; pad_len];
            randombytes_into(&mut padding);
            payload.extend_from_slice(&padding);
        }
        let (start, end) = schema.payload_region;
        buffer[start..end].copy_from_slice(&payload);

        // back positionals: DATE is known up front; NONCE is searched below.
        let date_slot = schema.positional(FieldType::Date).expect("every schema has DATE");
        let date_bytes = self.date.to_be_bytes();
        buffer[date_slot.offset..date_slot.offset + date_slot.len]
            .copy_from_slice(&date_bytes[8 - date_slot.len..]);

        let nonce_slot = schema.positional(FieldType::Nonce).expect("every schema has NONCE");

        // For signed types, NONCE lies after SIGNATURE in the back layout, so
        // strictly speaking every nonce attempt should re-sign. The signed
        // prefix [0..signature_offset) excludes DATE/NONCE, so the
        // recomputed signature is identical on every attempt in practice —
        // resign anyway rather than rely on that being true forever.
        if self.cube_type.is_signed() {
            let sig_slot = schema.positional(FieldType::Signature).expect("signed cube has SIGNATURE");
            let signing_key = self.signing_key.as_ref().ok_or(CubeError::ApiMisuseError)?;
            let mut nonce: u32 = 0;
            loop {
                if *cancel.borrow() {
                    if let Some(m) = &metrics {
                        m.pow_cancelled_total.inc();
                    }
                    return Err(CubeError::Cancelled);
                }
                let sig = signing_key.sign(&buffer[..sig_slot.offset]);
                buffer[sig_slot.offset..sig_slot.offset + sig_slot.len].copy_from_slice(&sig);
                buffer[nonce_slot.offset..nonce_slot.offset + nonce_slot.len]
                    .copy_from_slice(&nonce.to_be_bytes());

                let digest = crypto::hash(&buffer);
                if let Some(m) = &metrics {
                    m.pow_attempts_total.inc();
                }
                if crypto::trailing_zero_bits(&digest) >= difficulty {
                    break;
                }
                nonce = nonce.wrapping_add(1);
                if nonce as u64 % yield_batch == 0 {
                    tokio::task::yield_now().await;
                }
            }
        } else {
            let prefix = buffer[..nonce_slot.offset].to_vec();
            let suffix = buffer[nonce_slot.offset + nonce_slot.len..].to_vec();
            let nonce_bytes = crate::core::pow::search(prefix, suffix, difficulty, yield_batch, cancel, metrics)
                .await
                .map_err(|_| CubeError::Cancelled)?;
            buffer[nonce_slot.offset..nonce_slot.offset + nonce_slot.len].copy_from_slice(&nonce_bytes);
        }

        let hash = crypto::hash(&buffer);
        let key = match schema.positional(FieldType::PublicKey) {
            Some(slot) => buffer[slot.offset..slot.offset + slot.len].try_into().expect("32 bytes"),
            None => hash,
        };
        if let Some(m) = &metrics {
            m.cubes_compiled_total.inc();
        }
        info!(cube_type = ?self.cube_type, difficulty, "compiled cube");
        Ok(Cube::from_parts(self.cube_type, buffer, key, hash))
    }
}

/// Parse a received 1024-byte buffer into a validated [`Cube`]. Parse
/// failures on untrusted peer data are expected to be logged by the caller
/// at info/trace and the cube dropped — this function itself just reports
/// the error.
pub fn parse(bytes: &[u8], required_difficulty: u32, metrics: Option<&Metrics>) -> Result<Cube, CubeError> {
    match parse_inner(bytes, required_difficulty) {
        Ok(cube) => {
            if let Some(m) = metrics {
                m.cubes_parsed_total.inc();
            }
            Ok(cube)
        }
        Err(e) => {
            if let Some(m) = metrics {
                m.parse_failures_total.with_label_values(&[e.kind()]).inc();
            }
            Err(e)
        }
    }
}

fn parse_inner(bytes: &[u8], required_difficulty: u32) -> Result<Cube, CubeError> {
    if bytes.len() != CUBE_SIZE {
        return Err(CubeError::BinaryLengthError(bytes.len()));
    }
    let cube_type = CubeType::from_tag(bytes[0])?;
    let schema = Schema::for_type(cube_type);

    let (start, end) = schema.payload_region;
    field_parser::decompile(&bytes[start..end]).map_err(|e| match e {
        FieldError::BinaryDataError(pos) => CubeError::BinaryDataError(pos),
        FieldError::UnknownFieldType(tag) => CubeError::UnknownFieldType(tag),
        other => CubeError::FieldSizeError(other),
    })?;

    let mut buffer = [0u8; CUBE_SIZE];
    buffer.copy_from_slice(bytes);
    let hash = crypto::hash(&buffer);
    let actual = crypto::trailing_zero_bits(&hash);
    if actual < required_difficulty {
        return Err(CubeError::InsufficientDifficulty { actual, required: required_difficulty });
    }

    if cube_type.is_signed() {
        let sig_slot = schema.positional(FieldType::Signature).expect("signed cube has SIGNATURE");
        let pk_slot = schema.positional(FieldType::PublicKey).expect("signed cube has PUBLIC_KEY");
        let signature: [u8; 64] = buffer[sig_slot.offset..sig_slot.offset + sig_slot.len]
            .try_into()
            .expect("64 bytes");
        let public_key: [u8; 32] = buffer[pk_slot.offset..pk_slot.offset + pk_slot.len]
            .try_into()
            .expect("32 bytes");
        crypto::verify(&buffer[..sig_slot.offset], &signature, &public_key)
            .map_err(|_| CubeError::SignatureError)?;
    }

    let key = match schema.positional(FieldType::PublicKey) {
        Some(slot) => buffer[slot.offset..slot.offset + slot.len].try_into().expect("32 bytes"),
        None => hash,
    };
    trace!(?cube_type, "parsed cube");
    Ok(Cube::from_parts(cube_type, buffer, key, hash))
}

impl CubeError {
    /// Stable label for metrics, one per variant (ignoring payload fields).
    fn kind(&self) -> &'static str {
        match self {
            CubeError::BinaryLengthError(_) => "BinaryLengthError",
            CubeError::UnknownCubeType(_) => "UnknownCubeType",
            CubeError::UnknownFieldType(_) => "UnknownFieldType",
            CubeError::FieldSizeError(_) => "FieldSizeError",
            CubeError::BinaryDataError(_) => "BinaryDataError",
            CubeError::SignatureError => "SignatureError",
            CubeError::InsufficientDifficulty { .. } => "InsufficientDifficulty",
            CubeError::Crypto(_) => "CryptoError",
            CubeError::MissingPmucUpdateCount => "MissingPmucUpdateCount",
            CubeError::ApiMisuseError => "ApiMisuseError",
            CubeError::Cancelled => "Cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pow::cancel_pair;

    #[tokio::test]
    async fn frozen_round_trip() {
        crypto::init().unwrap();
        let mut builder = CubeBuilder::new(CubeType::Frozen);
        builder.push_field(Field::new(FieldType::Payload, b"hello".to_vec()));
        builder.date(1_700_000_000);
        let (_tx, rx) = cancel_pair();
        let cube = builder.compile(1, 1000, rx, None).await.unwrap();

        assert_eq!(cube.binary().len(), CUBE_SIZE);
        assert_eq!(cube.key(), cube.hash());
        let parsed = parse(cube.binary(), 1, None).unwrap();
        assert_eq!(parsed.key(), cube.key());
        let payload = parsed.fields().into_iter().find(|f| f.field_type == FieldType::Payload).unwrap();
        assert_eq!(payload.value, b"hello");
    }

    #[tokio::test]
    async fn muc_signature_round_trip_and_tamper_detection() {
        crypto::init().unwrap();
        let key = SigningKeypair::from_seed(&[1u8; 32]);
        let mut builder = CubeBuilder::new(CubeType::Muc);
        builder.push_field(Field::new(FieldType::Username, b"Alice".to_vec()));
        builder.date(1_700_000_000);
        builder.signing_key(key);
        let (_tx, rx) = cancel_pair();
        let cube = builder.compile(1, 1000, rx, None).await.unwrap();
        assert_eq!(cube.key().len(), 32);

        let mut tampered = *cube.binary();
        let (start, _end) = Schema::for_type(CubeType::Muc).payload_region;
        tampered[start] ^= 0xFF;
        assert!(matches!(
            parse(&tampered, 0, None),
            Err(CubeError::SignatureError) | Err(CubeError::BinaryDataError(_)) | Err(CubeError::UnknownFieldType(_))
        ));
    }

    #[tokio::test]
    async fn rejects_wrong_length() {
        assert!(matches!(parse(&[0u8; 10], 0, None), Err(CubeError::BinaryLengthError(10))));
    }
}
