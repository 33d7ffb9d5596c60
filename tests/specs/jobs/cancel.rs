//! `txctl jobs cancel`/`retry-task` (spec.md §4.3, §6). Job ingestion is
//! out of scope for this control plane (handled by the gateway), so
//! these specs exercise the admin surface against jobs/tasks that do
//! not exist in the daemon's store yet.

use crate::prelude::Daemon;

#[test]
fn jobs_cancel_on_an_unknown_job_reports_not_found() {
    let daemon = Daemon::start();
    daemon.txctl(&["jobs", "cancel", "job-does-not-exist"]).fails().stderr_has("job-does-not-exist");
}

#[test]
fn jobs_retry_task_on_an_unknown_job_reports_not_found() {
    let daemon = Daemon::start();
    daemon
        .txctl(&["jobs", "retry-task", "job-does-not-exist", "task-does-not-exist"])
        .fails()
        .stderr_has("not found");
}
