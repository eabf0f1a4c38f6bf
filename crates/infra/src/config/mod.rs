//! Configuration loading
//!
//! Reads [`wavelink_domain::ChannelConfig`] from an optional TOML/JSON file
//! and `WAVELINK_*` environment overrides.

pub mod loader;

// Re-export commonly used items
pub use loader::{
    apply_env_overrides, apply_overrides, find_config_in, load, load_from_file,
    probe_config_paths,
};
