// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed daemon configuration (spec §6 "Environment configuration").
//!
//! Every field has a documented default; the corresponding
//! environment variable, when set and parseable, overrides it. Invalid
//! values are logged and ignored rather than rejected at startup — a
//! misconfigured timeout shouldn't keep the whole daemon from starting.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub t_heartbeat: Duration,
    pub t_heartbeat_stale: Duration,
    pub t_lease: Duration,
    pub t_dispatch_retry: Duration,
    pub t_dispatch_deadline: Duration,
    pub max_retries: u32,
    pub max_sessions_per_worker: u32,
    pub session_idle_timeout: Duration,
    pub session_max_duration: Duration,
    pub shard_count: u32,
    pub owner_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            t_heartbeat: Duration::from_secs(10),
            t_heartbeat_stale: Duration::from_secs(60),
            t_lease: Duration::from_secs(300),
            t_dispatch_retry: Duration::from_secs(2),
            t_dispatch_deadline: Duration::from_secs(600),
            max_retries: 3,
            max_sessions_per_worker: 8,
            session_idle_timeout: Duration::from_secs(30),
            session_max_duration: Duration::from_secs(4 * 3600),
            shard_count: 1,
            owner_id: format!("txd-{}", nanoid::nanoid!(8)),
        }
    }
}

impl Config {
    txctl_core::setters! {
        set {
            t_heartbeat: Duration,
            t_heartbeat_stale: Duration,
            t_lease: Duration,
            t_dispatch_retry: Duration,
            t_dispatch_deadline: Duration,
            max_retries: u32,
            max_sessions_per_worker: u32,
            session_idle_timeout: Duration,
            session_max_duration: Duration,
            shard_count: u32,
        }
        into {
            owner_id: String,
        }
    }

    /// Builds a `Config` from the process environment, falling back to
    /// spec-documented defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_secs("T_HEARTBEAT") {
            cfg = cfg.t_heartbeat(v);
        }
        if let Some(v) = env_secs("T_HEARTBEAT_STALE") {
            cfg = cfg.t_heartbeat_stale(v);
        }
        if let Some(v) = env_secs("T_LEASE") {
            cfg = cfg.t_lease(v);
        }
        if let Some(v) = env_secs("T_DISPATCH_RETRY") {
            cfg = cfg.t_dispatch_retry(v);
        }
        if let Some(v) = env_secs("T_DISPATCH_DEADLINE") {
            cfg = cfg.t_dispatch_deadline(v);
        }
        if let Some(v) = env_parse::<u32>("MAX_RETRIES") {
            cfg = cfg.max_retries(v);
        }
        if let Some(v) = env_parse::<u32>("MAX_SESSIONS_PER_WORKER") {
            cfg = cfg.max_sessions_per_worker(v);
        }
        if let Some(v) = env_secs("SESSION_IDLE_TIMEOUT") {
            cfg = cfg.session_idle_timeout(v);
        }
        if let Some(v) = env_secs("SESSION_MAX_DURATION") {
            cfg = cfg.session_max_duration(v);
        }
        if let Some(v) = env_parse::<u32>("TXD_SHARD_COUNT") {
            cfg = cfg.shard_count(v);
        }
        if let Ok(owner) = std::env::var("TXD_OWNER_ID") {
            cfg = cfg.owner_id(owner);
        }
        cfg
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}
