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

//! Local Identity: Argon2id master-key derivation, `kdf`-derived signing and
//! encryption subkeys, optional at-rest persistence (atomic writes, `zeroize`
//! on drop, and an optional passphrase-at-rest via `secretbox` + Argon2id),
//! and `RebuildCoalescer`, which debounces concurrent PMUC republish
//! requests for the same key.

use crate::core::cube::Cube;
use crate::core::cube_codec::CubeError;
use crate::core::crypto::{self, CryptoError, EncryptionKeypair, SigningKeypair};
use futures::future::{FutureExt, Shared};
use sodiumoxide::crypto::{kdf, pwhash::argon2id13};
use sodiumoxide::randombytes::randombytes_into;
use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use zeroize::Zeroize;

/// Domain separator for the Identity root MUC's signing subkey.
pub const ROOT_MUC_CONTEXT: [u8; 8] = *b"idrtmuc1";

const IDENTITY_FILE_MAGIC: &[u8] = b"VRTYID01";

/// Identity failures.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A crypto primitive rejected its input shape.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// Reading or writing the identity file failed.
    #[error("identity file io error")]
    Io,
    /// The identity file is encrypted at rest and no passphrase was given.
    #[error("identity file is encrypted; no passphrase supplied")]
    MissingPassphrase,
    /// The identity file was the wrong size or otherwise malformed.
    #[error("identity file is corrupt or truncated")]
    InvalidFile,
}

/// A local Identity: a 32-byte Argon2id-stretched master key from which every
/// signing/encryption subkey is derived via `kdf_derive_from_key`.
pub struct Identity {
    master_key: [u8; kdf::KEYBYTES],
}

impl Drop for Identity {
    fn drop(&mut self) {
        self.master_key.zeroize();
    }
}

impl Identity {
    /// Derive an Identity deterministically from `(username, password)` via
    /// `Argon2id(password, salt = hash(username)[..SALTBYTES])`. Holds no
    /// file handle; callers who want this cached to disk use
    /// [`Identity::load_or_create`] instead.
    pub fn derive(username: &str, password: &str) -> Result<Self, IdentityError> {
        let digest = crypto::hash(username.as_bytes());
        let mut salt = [0u8; argon2id13::SALTBYTES];
        salt.copy_from_slice(&digest[..argon2id13::SALTBYTES]);
        let master_key = crypto::stretch_passphrase(password, &salt)?;
        Ok(Self { master_key })
    }

    /// Load an Identity's master key from `path`, creating one with a
    /// randomly generated master key if the file does not exist yet. If
    /// `passphrase` is `Some`, the file is encrypted at rest with a
    /// `secretbox` key wrapped by an Argon2id stretch of the passphrase.
    pub fn load_or_create(path: &Path, passphrase: Option<&str>) -> Result<Self, IdentityError> {
        if path.exists() {
            let bytes = fs::read(path).map_err(|_| IdentityError::Io)?;
            let plain = if bytes.starts_with(IDENTITY_FILE_MAGIC) {
                let passphrase = passphrase.ok_or(IdentityError::MissingPassphrase)?;
                decrypt_master_key(passphrase, &bytes)?
            } else {
                bytes
            };
            let master_key: [u8; kdf::KEYBYTES] =
                plain.as_slice().try_into().map_err(|_| IdentityError::InvalidFile)?;
            return Ok(Self { master_key });
        }

        let mut master_key = [0u8; kdf::KEYBYTES];
        randombytes_into(&mut master_key);

        let on_disk = match passphrase {
            Some(p) => encrypt_master_key(p, &master_key)?,
            None => master_key.to_vec(),
        };
        atomic_write_private(path, &on_disk)?;
        Ok(Self { master_key })
    }

    /// Derive a signing subkey (`kdf_derive_from_key` then `sign_seed_keypair`).
    pub fn signing_keypair(&self, subkey_id: u64, context: &[u8; 8]) -> SigningKeypair {
        SigningKeypair::from_seed(&crypto::derive_subkey(&self.master_key, subkey_id, context))
    }

    /// Derive an encryption subkey (`kdf_derive_from_key` then `box_seed_keypair`).
    pub fn encryption_keypair(&self, subkey_id: u64, context: &[u8; 8]) -> EncryptionKeypair {
        EncryptionKeypair::from_seed(&crypto::derive_subkey(&self.master_key, subkey_id, context))
    }

    /// The signing keypair for this Identity's root MUC, at the stable
    /// domain-separated context reserved for it.
    pub fn root_muc_signing_keypair(&self) -> SigningKeypair {
        self.signing_keypair(0, &ROOT_MUC_CONTEXT)
    }
}

fn atomic_write_private(path: &Path, bytes: &[u8]) -> Result<(), IdentityError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|_| IdentityError::Io)?;
    }
    let mut tmp = path.to_path_buf();
    tmp.set_extension("tmp");
    {
        let mut f = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)
            .map_err(|_| IdentityError::Io)?;
        f.write_all(bytes).map_err(|_| IdentityError::Io)?;
        let _ = f.sync_all();
    }
    set_private_perms_best_effort(&tmp);
    fs::rename(&tmp, path).map_err(|_| IdentityError::Io)?;
    set_private_perms_best_effort(path);
    Ok(())
}

fn set_private_perms_best_effort(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

fn encrypt_master_key(passphrase: &str, master_key: &[u8; kdf::KEYBYTES]) -> Result<Vec<u8>, IdentityError> {
    let mut salt = [0u8; argon2id13::SALTBYTES];
    randombytes_into(&mut salt);
    let mut wrap_key = crypto::stretch_passphrase(passphrase, &salt)?;
    let sealed = crypto::secretbox_seal(master_key, &wrap_key);
    wrap_key.zeroize();

    let mut out = Vec::with_capacity(IDENTITY_FILE_MAGIC.len() + salt.len() + sealed.len());
    out.extend_from_slice(IDENTITY_FILE_MAGIC);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&sealed);
    Ok(out)
}

fn decrypt_master_key(passphrase: &str, bytes: &[u8]) -> Result<Vec<u8>, IdentityError> {
    let header_end = IDENTITY_FILE_MAGIC.len();
    let salt_end = header_end + argon2id13::SALTBYTES;
    if bytes.len() <= salt_end {
        return Err(IdentityError::InvalidFile);
    }
    let mut salt = [0u8; argon2id13::SALTBYTES];
    salt.copy_from_slice(&bytes[header_end..salt_end]);
    let mut wrap_key = crypto::stretch_passphrase(passphrase, &salt)?;
    let plain = crypto::secretbox_open(&bytes[salt_end..], &wrap_key).map_err(IdentityError::Crypto)?;
    wrap_key.zeroize();
    Ok(plain)
}

type SharedCompile = Shared<Pin<Box<dyn Future<Output = Arc<Result<Cube, CubeError>>> + Send>>>;

/// Debounces concurrent PMUC republish requests for the same key: a second
/// caller asking to rebuild a key whose previous rebuild is still in flight
/// joins that rebuild's result instead of starting a second `compile`,
/// rather than replicating an ad hoc rebuild timer per caller.
pub struct RebuildCoalescer {
    inflight: Mutex<HashMap<[u8; 32], SharedCompile>>,
}

impl Default for RebuildCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

impl RebuildCoalescer {
    /// An empty coalescer with no rebuilds in flight.
    pub fn new() -> Self {
        Self { inflight: Mutex::new(HashMap::new()) }
    }

    /// Publish a PMUC revision at `key`. If a rebuild for `key` is already in
    /// flight, await its result; otherwise run `make_compile` and register it
    /// as the in-flight rebuild for any concurrent callers.
    pub async fn rebuild<F>(&self, key: [u8; 32], make_compile: F) -> Arc<Result<Cube, CubeError>>
    where
        F: Future<Output = Result<Cube, CubeError>> + Send + 'static,
    {
        let shared = {
            let mut guard = self.inflight.lock().expect("coalescer mutex poisoned");
            match guard.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let boxed: Pin<Box<dyn Future<Output = Arc<Result<Cube, CubeError>>> + Send>> =
                        Box::pin(async move { Arc::new(make_compile.await) });
                    let shared = boxed.shared();
                    guard.insert(key, shared.clone());
                    shared
                }
            }
        };

        let result = shared.await;
        self.inflight.lock().expect("coalescer mutex poisoned").remove(&key);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cube_codec::CubeBuilder;
    use crate::core::cube_type::CubeType;
    use crate::core::field::Field;
    use crate::core::field_type::FieldType;
    use crate::core::pow::cancel_pair;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[test]
    fn derive_is_deterministic_in_username_and_password() {
        crypto::init().unwrap();
        let a = Identity::derive("alice", "hunter2").unwrap();
        let b = Identity::derive("alice", "hunter2").unwrap();
        assert_eq!(a.root_muc_signing_keypair().public_key, b.root_muc_signing_keypair().public_key);

        let c = Identity::derive("alice", "different").unwrap();
        assert_ne!(a.root_muc_signing_keypair().public_key, c.root_muc_signing_keypair().public_key);
    }

    #[test]
    fn signing_and_encryption_subkeys_differ() {
        crypto::init().unwrap();
        let id = Identity::derive("bob", "correct-horse").unwrap();
        let sign_key = id.signing_keypair(1, b"sign0001");
        let enc_key = id.encryption_keypair(1, b"crypt001");
        assert_ne!(sign_key.public_key, enc_key.public_key);
    }

    #[test]
    fn load_or_create_round_trips_through_disk_without_passphrase() {
        crypto::init().unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("identity.bin");

        let created = Identity::load_or_create(&path, None).unwrap();
        let loaded = Identity::load_or_create(&path, None).unwrap();
        assert_eq!(
            created.root_muc_signing_keypair().public_key,
            loaded.root_muc_signing_keypair().public_key
        );
    }

    #[test]
    fn load_or_create_round_trips_through_disk_with_passphrase() {
        crypto::init().unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("identity.bin");

        let created = Identity::load_or_create(&path, Some("s3cret")).unwrap();
        let loaded = Identity::load_or_create(&path, Some("s3cret")).unwrap();
        assert_eq!(
            created.root_muc_signing_keypair().public_key,
            loaded.root_muc_signing_keypair().public_key
        );

        assert!(matches!(
            Identity::load_or_create(&path, None),
            Err(IdentityError::MissingPassphrase)
        ));
    }

    #[tokio::test]
    async fn coalescer_runs_one_compile_for_concurrent_same_key_rebuilds() {
        crypto::init().unwrap();
        let coalescer = Arc::new(RebuildCoalescer::new());
        let key = [42u8; 32];
        let compiles = Arc::new(AtomicUsize::new(0));

        let make_compile = |compiles: Arc<AtomicUsize>| async move {
            compiles.fetch_add(1, Ordering::SeqCst);
            let mut builder = CubeBuilder::new(CubeType::Frozen);
            builder.push_field(Field::new(FieldType::Payload, b"rebuild".to_vec()));
            builder.date(1);
            let (_tx, rx) = cancel_pair();
            builder.compile(1, 1000, rx, None).await
        };

        let a = coalescer.rebuild(key, make_compile(compiles.clone()));
        let b = coalescer.rebuild(key, make_compile(compiles.clone()));
        let (ra, rb) = tokio::join!(a, b);
        assert!(ra.is_ok());
        assert!(rb.is_ok());
        assert_eq!(compiles.load(Ordering::SeqCst), 1);
    }
}
