//! # Storage Layer
//!
//! Configuration and playbook files used by the build driver.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Global config | TOML | `~/.config/docsh/config.toml` |
//! | Project config | TOML | `docsh.toml` (current dir or a parent) |
//! | Site playbook | YAML | `site.yml` (configurable) |
//! | Local-dev playbook | YAML | `site-local-dev.yml`, next to the site playbook |
//! | Clone cache | git clones | `{temp}/{component}-{branch}` |
//!
//! ## Key Types
//!
//! - [`Config`] - Global and project configuration
//! - [`Playbook`] - Antora playbook with unknown keys preserved
//! - [`DevPlaybook`] - Generated playbook removed on drop

mod config;
mod playbook;

pub use config::{Config, ConfigError, SiteConfig, CONFIG_FILE};
pub use playbook::{
    ContentSource, DevPlaybook, Playbook, PlaybookError, PlaybookOptions,
};
