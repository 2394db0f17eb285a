//! In-play odds watcher - Main Library
//!
//! Thin presentation layer over the `inplay` workspace library.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (config paths)
//! - **inplay**: Scanner, pattern engine, notifications and bots (re-exported)
//!
//! ## Usage in Binaries
//!
//! ```rust,no_run
//! use inplay_watch::bin_common::{load_config_from_env, ConfigType};
//! use inplay_watch::inplay::ScannerConfig;
//!
//! let path = load_config_from_env(ConfigType::Scanner);
//! let config = ScannerConfig::load(&path);
//! ```

// Re-export the workspace library for convenience
pub use inplay;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;

    pub use cli::{config_path_from_args, load_config_from_env, parse_args, ConfigType};
}
