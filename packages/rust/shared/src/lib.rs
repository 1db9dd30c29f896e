//! Shared types, error model, configuration, and file/retry primitives for
//! Pressline.
//!
//! This crate is the foundation depended on by all other Pressline crates.
//! It provides:
//! - [`PresslineError`]: the unified error type
//! - Domain types ([`Task`], [`TaskBatch`], [`ContentItem`])
//! - Configuration ([`AppConfig`], [`RunContext`], config loading)
//! - [`write_atomic`] and the [`retry`] executor

pub mod atomic;
pub mod config;
pub mod error;
pub mod retry;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use atomic::{StagedWrite, write_atomic, write_if_changed};
pub use config::{
    AppConfig, CONFIG_FILE_NAME, ConfigOverrides, ContentTypeConfig, GeneratorConfig,
    HistoryConfig, NavConfig, NavLink, PublishConfig, QueueConfig, QueueSettings, RetryConfig,
    RunContext, SiteConfig, SiteContext, StaticPage, check_forbidden_env, config_dir,
    find_config_file, init_config, load_config, load_config_from,
};
pub use error::{PresslineError, Result};
pub use retry::{RetryPolicy, retry};
pub use types::{
    ContentItem, DATE_FORMAT, Task, TaskBatch, TaskStatus, is_url_safe_slug, recency_order,
    sort_by_recency,
};
