// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accept loop for the admin Unix socket. Each connection is served on
//! its own task; the listener itself only stops accepting once
//! `shutdown` fires, letting in-flight connections finish their current
//! request.

use std::path::Path;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::ipc::wire::{read_message, write_message, ProtocolError};
use crate::state::AppState;

/// Binds the admin socket at `path` and serves connections until
/// `shutdown` fires. Removes a stale socket file left behind by an
/// unclean prior exit before binding.
pub async fn serve(
    path: &Path,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if path.exists() {
        tokio::fs::remove_file(path).await?;
    }
    let listener = UnixListener::bind(path)?;
    info!(socket = %path.display(), "admin listener bound");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("admin listener shutting down");
                    break;
                }
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let state = state.clone();
                        tokio::spawn(async move {
                            if let Err(err) = serve_connection(stream, &state).await {
                                warn!(error = %err, "admin connection ended with an error");
                            }
                        });
                    }
                    Err(err) => warn!(error = %err, "failed to accept admin connection"),
                }
            }
        }
    }

    let _ = tokio::fs::remove_file(path).await;
    Ok(())
}

async fn serve_connection(mut stream: UnixStream, state: &AppState) -> Result<(), ProtocolError> {
    loop {
        let query = match read_message(&mut stream).await {
            Ok(query) => query,
            Err(ProtocolError::Closed) => return Ok(()),
            Err(err) => return Err(err),
        };
        let response = state.handle(query).await;
        write_message(&mut stream, &response).await?;
    }
}
