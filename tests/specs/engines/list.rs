//! `txctl engines` against a freshly started daemon with no engines
//! registered (spec.md §4.2, §6 "CLI surface").

use crate::prelude::Daemon;

#[test]
fn engines_list_is_empty_on_a_fresh_daemon() {
    let daemon = Daemon::start();
    daemon.txctl(&["engines", "list"]).passes().stdout_has("(none)");
}

#[test]
fn engines_list_accepts_a_stage_filter() {
    let daemon = Daemon::start();
    daemon.txctl(&["engines", "list", "--stage", "transcribe"]).passes();
}

#[test]
fn engines_list_rejects_an_unknown_stage() {
    let daemon = Daemon::start();
    daemon.txctl(&["engines", "list", "--stage", "not_a_stage"]).fails().stderr_has("unknown stage");
}

#[test]
fn engines_drain_succeeds_even_for_an_unregistered_engine() {
    // Drain only publishes an advisory (spec §4.2/§9 "no hidden
    // process-wide state"); it never requires the engine to already be
    // registered, matching the registry's idempotent-operation design.
    let daemon = Daemon::start();
    daemon.txctl(&["engines", "drain", "whisper-large-v3"]).passes().stdout_has("draining whisper-large-v3");
}

#[test]
fn engines_list_json_format_emits_an_array() {
    let daemon = Daemon::start();
    daemon.txctl(&["--format", "json", "engines", "list"]).passes().stdout_has("[]");
}
