//! # Intake Application Library
//!
//! The network-aware side of the intake wizard: HTTP server, CLI, backend
//! and directory clients, configuration and the cached reference service.
//! All workflow rules live in `intake-core`.

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod reference;
