//! koji-lineage - cached container build lineage
//!
//! Resolves container image builds to their parent builds, build tasks and
//! NVRs through a build metadata service, keeping every answer in bounded
//! caches that persist between runs.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod lineage;
pub mod resolve;
pub mod service;
pub mod types;
pub mod ui;

pub use error::{LineageError, LineageResult};
