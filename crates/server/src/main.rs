// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! encored: the encore dispatch server binary.

use encore_server::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_env("ENCORE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("encored: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = encore_server::run(config).await {
        eprintln!("encored: {e}");
        std::process::exit(1);
    }
}
