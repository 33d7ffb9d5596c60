// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-endpoint HMAC signing (spec §4.6 "signing is per-endpoint HMAC
//! over `timestamp + "." + payload`").

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature, in the `t=<ms>,v1=<hex>` shape used
/// by the other signed-webhook examples in the pack.
pub fn sign(secret: &str, timestamp_ms: u64, payload: &str) -> String {
    let signed = format!("{timestamp_ms}.{payload}");
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any length");
    mac.update(signed.as_bytes());
    let digest = mac.finalize().into_bytes();
    let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
    format!("t={timestamp_ms},v1={hex}")
}
