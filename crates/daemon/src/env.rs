// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Protocol version advertised in the IPC handshake.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve the state directory: `TXD_STATE_DIR` > `XDG_STATE_HOME/txd` >
/// `~/.local/state/txd`. The admin socket lives at `<state_dir>/txd.sock`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TXD_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("txd");
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".local/state/txd")
}

pub fn socket_path() -> PathBuf {
    state_dir().join("txd.sock")
}
