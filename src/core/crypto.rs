#![forbid(unsafe_code)]
#![deny(missing_docs)]
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

//! Cryptographic primitives, all backed by `sodiumoxide` (libsodium):
//! `BLAKE2b` hashing, Ed25519 signing, `crypto_box`/`secretbox` authenticated
//! encryption, `kdf` subkey derivation, and Argon2id master-key stretching.
//!
//! This module names operations after their libsodium shapes directly
//! (`box_beforenm`, `secretbox_easy`, `kdf_derive_from_key`,
//! `sign_seed_keypair`, `box_seed_keypair`) — a thin, typed wrapper rather
//! than a reimplementation.

use sodiumoxide::crypto::{box_, generichash, kdf, pwhash::argon2id13, secretbox, sign};
use thiserror::Error;
use zeroize::Zeroize;

/// Width in bytes of the content hash used to key Frozen/PIC cubes.
pub const HASH_SIZE: usize = 32;

/// Cryptographic failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// A signature did not verify against the claimed public key.
    #[error("signature verification failed")]
    BadSignature,
    /// Ciphertext failed to authenticate (wrong key, tampered, or wrong nonce).
    #[error("decryption failed authentication")]
    BadCiphertext,
    /// A key or seed buffer was the wrong length.
    #[error("key material had the wrong length")]
    BadKeyLength,
    /// Argon2id master key derivation failed (e.g. the platform rejected
    /// the requested memory/ops limits).
    #[error("key stretching failed")]
    KeyStretchFailed,
}

/// Ensure the process-wide libsodium state is initialized. Idempotent and
/// cheap to call repeatedly; `sodiumoxide::init()` itself is not always
/// safe to call from multiple threads racing for the first call, so callers
/// should invoke this once during startup (see `identity::Identity::load`).
pub fn init() -> Result<(), CryptoError> {
    sodiumoxide::init().map_err(|_| CryptoError::KeyStretchFailed)
}

/// `BLAKE2b`-256 hash of `data`, used to key Frozen and PIC cubes from their
/// compiled bytes.
pub fn hash(data: &[u8]) -> [u8; HASH_SIZE] {
    let state = generichash::State::new(Some(HASH_SIZE), None).expect("valid digest size");
    let mut state = state;
    state.update(data).expect("hashing into an open state cannot fail");
    let digest = state.finalize().expect("finalize on an open state cannot fail");
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(digest.as_ref());
    out
}

/// Count trailing zero bits of `digest`, the hashcash-style proof-of-work
/// score used by `core::pow` (`trailing_zero_bits(hash(binary)) >= difficulty`).
pub fn trailing_zero_bits(digest: &[u8]) -> u32 {
    let mut count = 0u32;
    for byte in digest.iter().rev() {
        if *byte == 0 {
            count += 8;
            continue;
        }
        count += byte.trailing_zeros();
        break;
    }
    count
}

/// An Ed25519 signing keypair derived deterministically from a 32-byte seed
/// (`sign_seed_keypair`).
pub struct SigningKeypair {
    /// The public verification key.
    pub public_key: [u8; 32],
    secret_key: sign::SecretKey,
}

impl SigningKeypair {
    /// Derive a signing keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let seed = sign::Seed::from_slice(seed).expect("32-byte seed");
        let (pk, sk) = sign::keypair_from_seed(&seed);
        Self { public_key: pk.0, secret_key: sk }
    }

    /// Sign `message`, producing a detached 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let sig = sign::sign_detached(message, &self.secret_key);
        sig.0
    }
}

impl Drop for SigningKeypair {
    fn drop(&mut self) {
        self.secret_key.0.zeroize();
    }
}

/// Verify a detached Ed25519 signature.
pub fn verify(message: &[u8], signature: &[u8; 64], public_key: &[u8; 32]) -> Result<(), CryptoError> {
    let pk = sign::PublicKey(*public_key);
    let sig = sign::Signature::from_bytes(signature).map_err(|_| CryptoError::BadKeyLength)?;
    if sign::verify_detached(&sig, message, &pk) {
        Ok(())
    } else {
        Err(CryptoError::BadSignature)
    }
}

/// An X25519 encryption keypair derived deterministically from a 32-byte
/// seed (`box_seed_keypair`), used for Veritum chunk encryption.
pub struct EncryptionKeypair {
    /// The public encryption key.
    pub public_key: [u8; 32],
    secret_key: box_::SecretKey,
}

impl EncryptionKeypair {
    /// Derive an encryption keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let seed = box_::Seed::from_slice(seed).expect("32-byte seed");
        let (pk, sk) = box_::keypair_from_seed(&seed);
        Self { public_key: pk.0, secret_key: sk }
    }

    /// Precompute the shared key for repeated exchanges with `their_public_key`
    /// (`box_beforenm`).
    pub fn precompute(&self, their_public_key: &[u8; 32]) -> SharedKey {
        let their_pk = box_::PublicKey(*their_public_key);
        SharedKey(box_::precompute(&their_pk, &self.secret_key))
    }
}

impl Drop for EncryptionKeypair {
    fn drop(&mut self) {
        self.secret_key.0.zeroize();
    }
}

/// A precomputed `box_` shared key (output of `box_beforenm`).
pub struct SharedKey(box_::PrecomputedKey);

impl SharedKey {
    /// Authenticated-encrypt `plaintext` under a fresh random nonce,
    /// returning `nonce || ciphertext`.
    pub fn seal(&self, plaintext: &[u8]) -> Vec<u8> {
        let nonce = box_::gen_nonce();
        let ciphertext = box_::seal_precomputed(plaintext, &nonce, &self.0);
        let mut out = Vec::with_capacity(box_::NONCEBYTES + ciphertext.len());
        out.extend_from_slice(nonce.0.as_ref());
        out.extend_from_slice(&ciphertext);
        out
    }

    /// Decrypt a `nonce || ciphertext` buffer produced by [`SharedKey::seal`].
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < box_::NONCEBYTES {
            return Err(CryptoError::BadCiphertext);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(box_::NONCEBYTES);
        let nonce = box_::Nonce::from_slice(nonce_bytes).ok_or(CryptoError::BadKeyLength)?;
        box_::open_precomputed(ciphertext, &nonce, &self.0).map_err(|_| CryptoError::BadCiphertext)
    }

    /// Like [`SharedKey::seal`] but returns the nonce and ciphertext as
    /// separate buffers, for callers (e.g. `core::continuation`) that wire
    /// them into distinct `CRYPTO_NONCE`/`ENCRYPTED` fields instead of one
    /// concatenated blob.
    pub fn seal_parts(&self, plaintext: &[u8]) -> ([u8; box_::NONCEBYTES], Vec<u8>) {
        let nonce = box_::gen_nonce();
        let ciphertext = box_::seal_precomputed(plaintext, &nonce, &self.0);
        (nonce.0, ciphertext)
    }

    /// Inverse of [`SharedKey::seal_parts`].
    pub fn open_parts(&self, nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = box_::Nonce::from_slice(nonce).ok_or(CryptoError::BadKeyLength)?;
        box_::open_precomputed(ciphertext, &nonce, &self.0).map_err(|_| CryptoError::BadCiphertext)
    }
}

/// Width in bytes of a `secretbox` symmetric key.
pub const SECRET_KEY_SIZE: usize = secretbox::KEYBYTES;
/// Width in bytes of a `secretbox` nonce.
pub const NONCE_SIZE: usize = secretbox::NONCEBYTES;

/// Symmetrically encrypt `plaintext` under `key` with a fresh random nonce
/// (`secretbox_easy`), returning `nonce || ciphertext`.
pub fn secretbox_seal(plaintext: &[u8], key: &[u8; SECRET_KEY_SIZE]) -> Vec<u8> {
    let key = secretbox::Key(*key);
    let nonce = secretbox::gen_nonce();
    let ciphertext = secretbox::seal(plaintext, &nonce, &key);
    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(nonce.0.as_ref());
    out.extend_from_slice(&ciphertext);
    out
}

/// Decrypt a `nonce || ciphertext` buffer produced by [`secretbox_seal`].
pub fn secretbox_open(sealed: &[u8], key: &[u8; SECRET_KEY_SIZE]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < NONCE_SIZE {
        return Err(CryptoError::BadCiphertext);
    }
    let key = secretbox::Key(*key);
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let nonce = secretbox::Nonce::from_slice(nonce_bytes).ok_or(CryptoError::BadKeyLength)?;
    secretbox::open(ciphertext, &nonce, &key).map_err(|_| CryptoError::BadCiphertext)
}

/// Derive a 32-byte subkey from a master key, a numeric subkey id, and an
/// 8-byte context string (`kdf_derive_from_key`). Used to split one
/// Argon2id-stretched master key into independent signing/encryption seeds.
pub fn derive_subkey(master_key: &[u8; kdf::KEYBYTES], subkey_id: u64, context: &[u8; 8]) -> [u8; 32] {
    let master = kdf::Key(*master_key);
    let mut out = [0u8; 32];
    kdf::derive_from_key(&mut out, subkey_id, *context, &master).expect("32 is within kdf bounds");
    out
}

/// Stretch a passphrase into a [`kdf::KEYBYTES`] master key via Argon2id,
/// using `salt` (stored alongside the encrypted identity file, not secret).
pub fn stretch_passphrase(
    passphrase: &str,
    salt: &[u8; argon2id13::SALTBYTES],
) -> Result<[u8; kdf::KEYBYTES], CryptoError> {
    let mut out = [0u8; kdf::KEYBYTES];
    let salt = argon2id13::Salt(*salt);
    argon2id13::derive_key(
        &mut out,
        passphrase.as_bytes(),
        &salt,
        argon2id13::OPSLIMIT_INTERACTIVE,
        argon2id13::MEMLIMIT_INTERACTIVE,
    )
    .map_err(|_| CryptoError::KeyStretchFailed)?;
    Ok(out)
}
