// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connects to the daemon's admin Unix socket and exchanges a single
//! [`AdminQuery`]/[`AdminResponse`] pair per call.

use std::path::PathBuf;

use thiserror::Error;
use tokio::net::UnixStream;
use tx_wire::{AdminQuery, AdminResponse};
use txd::ipc::{read_message, write_message, ProtocolError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("txd is not running (no socket at {0})")]
    NotRunning(PathBuf),
    #[error("connection error: {0}")]
    Connect(#[source] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("daemon returned an error: {0}")]
    Daemon(String),
}

pub struct AdminClient {
    stream: UnixStream,
}

impl AdminClient {
    pub async fn connect(socket_path: &std::path::Path) -> Result<Self, ClientError> {
        if !socket_path.exists() {
            return Err(ClientError::NotRunning(socket_path.to_path_buf()));
        }
        let stream = UnixStream::connect(socket_path).await.map_err(ClientError::Connect)?;
        Ok(Self { stream })
    }

    pub async fn call(&mut self, query: AdminQuery) -> Result<AdminResponse, ClientError> {
        write_message(&mut self.stream, &query).await?;
        let response: AdminResponse = read_message(&mut self.stream).await?;
        if let AdminResponse::Error { message } = &response {
            return Err(ClientError::Daemon(message.clone()));
        }
        Ok(response)
    }
}
