//! `txctl webhooks deliveries list` (spec.md §4.6, §6).

use crate::prelude::Daemon;

#[test]
fn deliveries_list_is_empty_on_a_fresh_daemon() {
    let daemon = Daemon::start();
    daemon.txctl(&["webhooks", "deliveries", "list"]).passes().stdout_has("(none)");
}

#[test]
fn deliveries_list_accepts_every_documented_status_filter() {
    let daemon = Daemon::start();
    for status in ["pending", "delivered", "failed", "dead"] {
        daemon.txctl(&["webhooks", "deliveries", "list", "--status", status]).passes();
    }
}

#[test]
fn deliveries_list_rejects_an_unknown_status() {
    let daemon = Daemon::start();
    daemon
        .txctl(&["webhooks", "deliveries", "list", "--status", "bogus"])
        .fails()
        .stderr_has("unknown delivery status");
}
