//! Shared types, error model, and configuration for WikiTrigger.
//!
//! This crate is the foundation depended on by all other WikiTrigger crates.
//! It provides:
//! - [`WikiTriggerError`]: the unified error type
//! - Domain types ([`TriggerKind`], [`CandidateEvent`], [`Watermark`], [`TriggerRequest`])
//! - Configuration ([`AppConfig`], [`FeedConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CursorConfig, CursorDelivery, DefaultsConfig, FeedConfig, WikiConfig, config_dir,
    config_file_path, cursor_secret, init_config, load_config, load_config_from,
};
pub use error::{Result, WikiTriggerError};
pub use types::{
    CandidateEvent, DEFAULT_RESPONSE_LIMIT, RawItem, TriggerFields, TriggerKind, TriggerRequest,
    Watermark, compare_ids,
};
