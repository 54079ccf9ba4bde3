//! # DevTrack API Library
//!
//! This library provides the core functionality for the DevTrack API
//! service: incremental GitHub synchronization, cached AI activity
//! summaries, and read-only analytics over the stored history.

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod github;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod summary;
pub mod sync;
pub mod telemetry;
pub use migration;
