//! MailCheck Common - Shared types and configuration
//!
//! This crate provides the configuration, error type and the finding
//! vocabulary shared by the collector, the rule engine and the CLI.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::{Category, Finding, FindingStatus, RuleId};
