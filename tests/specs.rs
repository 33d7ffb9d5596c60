//! Workspace-level black-box specs for the `txctl`/`txd` admin surface
//! (spec.md §6 "CLI surface (control plane admin)").
//!
//! Each spec spawns its own `txd` against a fresh temp state dir so
//! tests never share a socket or in-memory store.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/cli/help.rs"]
mod cli_help;

#[path = "specs/daemon/lifecycle.rs"]
mod daemon_lifecycle;

#[path = "specs/engines/list.rs"]
mod engines_list;

#[path = "specs/jobs/cancel.rs"]
mod jobs_cancel;

#[path = "specs/webhooks/deliveries.rs"]
mod webhooks_deliveries;

#[path = "specs/sessions/list.rs"]
mod sessions_list;
