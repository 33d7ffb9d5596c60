//! `txctl sessions list`/`terminate` (spec.md §4.5, §6).

use crate::prelude::Daemon;

#[test]
fn sessions_list_is_empty_on_a_fresh_daemon() {
    let daemon = Daemon::start();
    daemon.txctl(&["sessions", "list"]).passes().stdout_has("(none)");
}

#[test]
fn sessions_list_json_format_emits_an_array() {
    let daemon = Daemon::start();
    daemon.txctl(&["--format", "json", "sessions", "list"]).passes().stdout_has("[]");
}

#[test]
fn sessions_terminate_on_an_unknown_session_reports_not_found() {
    let daemon = Daemon::start();
    daemon.txctl(&["sessions", "terminate", "ses-does-not-exist"]).fails().stderr_has("not found");
}
