//! Configuration module for Outreach-Scout
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and reading credentials from the environment.
//!
//! # Example
//!
//! ```no_run
//! use outreach_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("outreach.toml")).unwrap();
//! println!("Keywords: {:?}", config.search.keywords);
//! ```

mod credentials;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClassifierConfig, Config, FollowUpConfig, MessagesConfig, PacingConfig, PlatformConfig,
    SearchConfig, SelectorConfig, StorageConfig, WebDriverConfig,
};

pub use credentials::{Credentials, CLASSIFIER_KEY_VAR, PASSWORD_VAR, USERNAME_VAR};

// Re-export parser functions
pub use parser::load_config;
