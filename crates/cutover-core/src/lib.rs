//! Core library for cutover.
//!
//! This crate provides the foundational types and functionality used by the
//! `cutover` CLI and any downstream consumers.
//!
//! # Modules
//!
//! - [`changelog`] - Changelog section bookkeeping
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//! - [`git`] - Git operations for release sequencing
//! - [`retry`] - Bounded retry for transient tool failures
//! - [`sequencer`] - The checkpointed release state machine
//! - [`state`] - Durable run state and the release record
//! - [`store`] - The version record file
//! - [`tools`] - External tool contracts and the shell implementation
//! - [`version`] - Release version grammar and arithmetic
//!
//! # Quick Start
//!
//! ```no_run
//! use cutover_core::{Config, ConfigLoader};
//!
//! let config = ConfigLoader::new()
//!     .with_user_config(true)
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! println!("Log level: {:?}", config.log_level);
//! ```
#![deny(unsafe_code)]

pub mod changelog;

pub mod config;

pub mod error;

pub mod git;

pub mod retry;

pub mod sequencer;

pub mod state;

pub mod store;

pub mod tools;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

pub use version::{Phase, ReleaseVersion};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
