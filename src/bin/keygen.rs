// Copyright (c) 2026
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

//! Generates a self-signed device identity (P-384 cert + key PEM pair)
//! and prints its display device id.

use std::path::PathBuf;

use syncspirit_rs::core::crypto::KeyPair;
use syncspirit_rs::core::device_id::DeviceId;
use syncspirit_rs::error::Result;

fn main() -> Result<()> {
    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "data".to_string());
    let out_dir = PathBuf::from(out_dir);
    std::fs::create_dir_all(&out_dir).map_err(|_| syncspirit_rs::error::SyncError::TlsCertSaveFailure)?;

    let cert_path = out_dir.join("cert.pem");
    let key_path = out_dir.join("key.pem");

    let device_name = std::env::args().nth(2).unwrap_or_else(|| "syncspirit-rs".to_string());
    let key_pair = KeyPair::generate(&device_name)?;
    key_pair.save(&cert_path, &key_path)?;

    let id = DeviceId::from_cert(key_pair.cert_der());
    println!("{}", id.display());
    Ok(())
}
