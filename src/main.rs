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
#![warn(missing_docs)]

//! Demonstration binary: generates (or loads) a device identity, builds a
//! `Hello` frame for it, and runs the local-announce responder until
//! interrupted. Takes no CLI flags; every tunable comes from `config.toml`
//! in the working directory, if present.

use std::path::Path;

use tokio::sync::watch;
use tracing::info;

use syncspirit_rs::config::Config;
use syncspirit_rs::core::crypto::KeyPair;
use syncspirit_rs::core::device_id::DeviceId;
use syncspirit_rs::core::uri::Uri;
use syncspirit_rs::discovery::local::spawn_local_discovery;
use syncspirit_rs::monitoring::Metrics;
use syncspirit_rs::proto::make_hello;

fn load_config() -> Config {
    match std::fs::read_to_string("config.toml") {
        Ok(text) => Config::from_toml_str(&text).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}

fn load_or_generate_identity(device_name: &str) -> syncspirit_rs::Result<KeyPair> {
    let cert_path = Path::new("cert.pem");
    let key_path = Path::new("key.pem");
    if cert_path.exists() && key_path.exists() {
        return KeyPair::load(cert_path, key_path);
    }
    let key_pair = KeyPair::generate(device_name)?;
    key_pair.save(cert_path, key_path)?;
    Ok(key_pair)
}

#[tokio::main]
async fn main() {
    syncspirit_rs::logging::init_logging(false);

    let config = load_config();
    let device_name =
        if config.main.device_name.is_empty() { "syncspirit-rs".to_string() } else { config.main.device_name.clone() };

    let key_pair = match load_or_generate_identity(&device_name) {
        Ok(kp) => kp,
        Err(err) => {
            tracing::error!(?err, "failed to establish a device identity");
            std::process::exit(1);
        }
    };
    let device_id = DeviceId::from_cert(key_pair.cert_der());
    info!(id = device_id.display(), "device identity ready");

    let hello = make_hello(&device_name);
    info!(bytes = hello.len(), "built hello frame");

    let metrics = match Metrics::new() {
        Ok(m) => m,
        Err(err) => {
            tracing::error!(?err, "failed to initialize metrics");
            std::process::exit(1);
        }
    };

    if !config.local_discovery.enabled {
        info!("local_discovery disabled in config; exiting after identity setup");
        return;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let port = config.local_discovery.port;
    let frequency = std::time::Duration::from_millis(config.local_discovery.frequency_ms);
    let uris = vec![Uri::parse("tcp://0.0.0.0:22000").expect("static URI is well-formed")];

    let handle = match spawn_local_discovery(
        port,
        frequency,
        *device_id.sha256(),
        uris,
        1,
        Some(metrics),
        shutdown_rx,
        |announce, addr| {
            info!(?addr, instance = announce.instance_id, "saw peer announce");
        },
    ) {
        Ok(h) => h,
        Err(err) => {
            tracing::error!(?err, "failed to start local discovery");
            std::process::exit(1);
        }
    };

    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
    let _ = shutdown_tx.send(true);
    let _ = handle.await;
}
