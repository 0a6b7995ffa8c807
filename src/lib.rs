//! # LeechGuard - ban-list automation for qBittorrent swarms
//!
//! This library implements an unattended control loop that inspects
//! the peer swarms of a running qBittorrent instance through its WebUI
//! v2 API, identifies peers whose client fingerprint matches known
//! ratio-cheating or leech-oriented software, and instructs the client
//! to block their addresses for a bounded time window.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `config`: startup configuration snapshot and fail-fast validation
//! - `api`: the WebUI v2 boundary - the `ControlPlane` trait and its
//!   blocking `QbitClient` implementation
//! - `fingerprint`: declarative client-fingerprint pattern tables and
//!   the pure peer classifier
//! - `registry`: the TTL-keyed ban set pushed to the client
//! - `scanner`: one polling cycle's read-and-classify step
//! - `session`: the authenticate/recover/degrade state machine that
//!   drives the loop
//! - `utils`: endpoint normalization and duration parsing helpers
//!
//! ## Control flow
//!
//! The session controller authenticates once, then repeatedly scans
//! every swarm, feeds detections into the ban registry, pushes the
//! registry's materialized form to the client, and sleeps a fixed
//! interval. Any failure inside a cycle is answered with a single
//! re-authentication probe; if that fails the session degrades and the
//! loop stops.
//!
//! Ban state is process-local by design: restarts start clean, and the
//! client's preference push makes the current set authoritative each
//! cycle.

pub mod api;
pub mod config;
pub mod fingerprint;
pub mod registry;
pub mod scanner;
pub mod session;
pub mod utils;
