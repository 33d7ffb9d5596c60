// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime wire protocol (spec §6 "Realtime wire protocol"). The
//! handler variant (raw WebSocket vs. some other duplex transport)
//! selects field naming conventions elsewhere; the state machine these
//! events describe is identical across variants, which is why this
//! crate defines one shape instead of two.

use crate::ids::SessionId;
use serde::{Deserialize, Serialize};

/// Server→client session lifecycle and transcript events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    SessionBegin {
        session_id: SessionId,
        negotiated_language: String,
        negotiated_model: String,
        #[serde(default)]
        warnings: Vec<String>,
    },
    VadSpeechStart {
        timestamp_ms: u64,
    },
    VadSpeechEnd {
        timestamp_ms: u64,
    },
    TranscriptPartial {
        text: String,
        start_ms: u64,
        end_ms: u64,
        /// Monotonically increasing per-utterance revision; a later
        /// revision for the same span supersedes an earlier one.
        revision: u32,
    },
    TranscriptFinal {
        text: String,
        start_ms: u64,
        end_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        words: Option<Vec<WordTiming>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<f32>,
    },
    SessionEnd {
        summary: crate::session::SessionStats,
        transcript: String,
        segments: Vec<TranscriptSegment>,
    },
    SessionTerminated {
        reason: String,
        last_transcript_offset_ms: u64,
        recoverable: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recovery_hint: Option<String>,
    },
    SessionRecovered {
        new_session_id: SessionId,
        previous_session_id: SessionId,
        recovered_offset_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub text_len: u32,
    pub start_ms: u64,
    pub end_ms: u64,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// Client→server control messages. Audio frames themselves are carried
/// out-of-band (binary WebSocket frames), not as a `ClientEvent` variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Forces finalization of the current utterance.
    Flush,
    /// Graceful termination.
    End,
}

/// WebSocket close codes (spec §6). These are surface constants, not
/// decisions: the gateway chooses when to emit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    InvalidAuth,
    MissingScope,
    SessionTimeout,
    RateLimit,
    Internal,
    NoCapacity,
}

impl CloseCode {
    pub const fn code(self) -> u16 {
        match self {
            CloseCode::InvalidAuth => 4001,
            CloseCode::MissingScope => 4003,
            CloseCode::SessionTimeout => 4008,
            CloseCode::RateLimit => 4029,
            CloseCode::Internal => 4500,
            CloseCode::NoCapacity => 4503,
        }
    }
}
