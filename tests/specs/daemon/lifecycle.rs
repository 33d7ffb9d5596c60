//! `txd` startup/shutdown: the admin socket appears, answers requests,
//! and is removed again once the daemon exits gracefully (see
//! `crates/daemon/src/ipc/listener.rs`).

use crate::prelude::Daemon;

#[test]
fn txd_binds_admin_socket_and_answers_sessions_list() {
    let daemon = Daemon::start();
    daemon.txctl(&["sessions", "list"]).passes().stdout_has("(none)");
}

#[test]
fn txd_removes_its_socket_on_graceful_shutdown() {
    let mut daemon = Daemon::start();
    assert!(daemon.socket_exists());
    daemon.terminate_gracefully();

    for _ in 0..100 {
        if !daemon.socket_exists() {
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    panic!("socket file was not cleaned up after graceful daemon shutdown");
}
