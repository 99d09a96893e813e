//! Incident Relay - incident intake with live dispatch status updates.
//!
//! # Overview
//!
//! A reporter submits a free-text description, optional coordinates and an
//! optional photo. The service triages it into emergency categories and a
//! severity, hands back a tracking id, and then streams a fixed series of
//! dispatch status updates to whichever WebSocket client registers for that
//! id.
//!
//! All state lives in memory. Nothing survives a restart.
//!
//! # Modules
//!
//! - [`model`]: Report, classification and wire message types
//! - [`classifier`]: Pluggable triage with a keyword heuristic
//! - [`registry`]: Shared report id to client channel map
//! - [`dispatcher`]: Timed, cancellable status sequences
//! - [`api`]: HTTP and WebSocket handlers
//! - [`config`]: Environment configuration
//! - [`error`]: Request-level errors

pub mod api;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod registry;
