//! fleetview - temperature telemetry for vehicle fleets.
//!
//! # Overview
//!
//! fleetview sits between a vehicle-tracking REST API and a thin web front
//! end. It pulls device listings (cached for 30 s per credential), runs
//! temperature reports, flattens the raw sensor payloads into time-ordered
//! records, pages them for tables, projects them for charts, and exports
//! finished reports as JPEG, PDF or CSV.
//!
//! # Modules
//!
//! - [`cache`]: Per-credential device cache with a 30 s lifetime
//! - [`extract`]: Batched, cancellable flattening of report payloads
//! - [`series`]: Chronological sort and 100-row paging
//! - [`chart`]: Chart points and label text
//! - [`timezone`]: The fixed display shift applied to timestamps
//! - [`export`]: JPEG and PDF report rendering
//! - [`request`]: `generate_report` request construction
//! - [`summary`]: Status counts and the device CSV
//! - [`pipeline`]: Report processing end to end
//! - [`upstream`], [`fetcher`]: HTTP clients
//! - [`poller`]: Background status refresh
//! - [`api`]: HTTP API handlers
//! - [`config`], [`error`], [`model`]: Shared plumbing

pub mod api;
pub mod cache;
pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetcher;
pub mod model;
pub mod pipeline;
pub mod poller;
pub mod request;
pub mod series;
pub mod summary;
pub mod timezone;
pub mod upstream;
