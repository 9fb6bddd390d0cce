//! Shared types, error model, and configuration for coalwire.
//!
//! This crate is the foundation depended on by all other coalwire crates.
//! It provides:
//! - [`CoalwireError`] — the unified error type
//! - Domain types ([`Candidate`], [`PublicationRecord`], [`CadenceState`], [`Platform`])
//! - Configuration ([`AppConfig`], config loading, credential checks)

pub mod config;
pub mod error;
pub mod text;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CadenceConfig, ChannelConfig, DocStoreConfig, ScoringConfig, SearchConfig,
    SiteConfig, StorageConfig, config_dir, config_file_path, credential, expand_path, init_config,
    load_config, load_config_from, validate_credentials,
};
pub use error::{CoalwireError, Result};
pub use text::slugify;
pub use types::{
    CadenceState, Candidate, Category, FREIGHT_TOPIC_LOG_CAP, Platform, PostVersions,
    PublicationRecord,
};
