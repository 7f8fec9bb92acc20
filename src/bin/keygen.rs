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

//! Generate (or load) a local Identity and print its root MUC public key.
//!
//! Usage: `keygen [data-dir] [--passphrase-env VAR]`

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use std::path::PathBuf;
use verity::core::crypto;
use verity::core::identity::Identity;

fn main() -> Result<()> {
    crypto::init().map_err(|e| anyhow::anyhow!("{e}"))?;

    let mut args = std::env::args().skip(1);
    let data_dir = args.next().unwrap_or_else(|| "data".to_string());
    let mut passphrase_env = None;
    while let Some(arg) = args.next() {
        if arg == "--passphrase-env" {
            passphrase_env = args.next();
        }
    }
    let passphrase = passphrase_env
        .map(|var| std::env::var(&var).with_context(|| format!("reading {var}")))
        .transpose()?;

    let mut key_path = PathBuf::from(data_dir);
    std::fs::create_dir_all(&key_path)?;
    key_path.push("identity.bin");

    let identity = Identity::load_or_create(&key_path, passphrase.as_deref())
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let public_key = identity.root_muc_signing_keypair().public_key;
    println!("{}", hex::encode(public_key));
    Ok(())
}
