//! Configuration module for Tributary.
//!
//! Handles the site table, query defaults, and environment variables.

mod settings;

pub use settings::{expand_env_vars, Defaults, Settings, SettingsError};
