//! Startup configuration loaded from the environment.
//!
//! Grounded on the teacher's `Config::from_env` (`dotenvy` load,
//! `env::var(...).expect(...)` for required vars), kept for required vars
//! but falling back to sane defaults for optional pagination/log knobs the
//! way `leeleeEcho-polymarket-backend`'s `AppConfig` does. The teacher's
//! RabbitMQ/instrument-list vars have no counterpart in this crate's scope
//! and are dropped (see DESIGN.md).

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;

const BIND_ADDR: &str = "BIND_ADDR";
const LOG_FILTER: &str = "LOG_FILTER";

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let bind_addr = env::var(BIND_ADDR)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| "0.0.0.0:8080".parse().expect("default bind addr is valid"));

        let log_filter = env::var(LOG_FILTER).unwrap_or_else(|_| "info".to_string());

        Config { bind_addr, log_filter }
    }
}
