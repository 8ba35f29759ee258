//! # Runtime Configuration
//!
//! Node settings and logging setup shared by the actor runtime crates.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use runtime_config::{init_logging, RuntimeConfig};
//! use std::path::Path;
//!
//! let config = RuntimeConfig::load(Some(Path::new("config/node.toml")))?;
//! init_logging(&config.logging)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod logging;
pub mod settings;

// Re-export commonly used types
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use settings::{MailboxSettings, NetworkSettings, RuntimeConfig, ENV_PREFIX};
