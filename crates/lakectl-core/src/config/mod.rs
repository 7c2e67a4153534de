//! Configuration and profile management.
//!
//! Profiles live in a TOML file at the platform config location and carry
//! the workspace/account connection settings plus per-profile resilience
//! tuning. Environment variables override profile values unless the caller
//! pinned an explicit config file.

#![allow(clippy::module_inception)]

pub mod config;
pub mod error;
pub mod resilience;

pub use config::{Config, Profile, Settings};
pub use error::{ConfigError, Result};
pub use resilience::ResilienceConfig;
