//! Configuration handling for docsh
//!
//! Configuration is read from `~/.config/docsh/config.toml` (global) and
//! `docsh.toml` in the current directory or the nearest parent (project).
//! Project values override global ones key by key.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::include::{ExecutorSettings, DEFAULT_COMPONENT_VERSION};

/// Project configuration file name
pub const CONFIG_FILE: &str = "docsh.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Settings for the site build driver
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SiteConfig {
    /// Site playbook used as the template for the local-dev playbook
    pub source: PathBuf,

    /// Output directory written into the local-dev playbook
    pub output: PathBuf,

    /// File name of the generated playbook, created next to `source`
    pub playbook_name: String,

    /// Site generator command; `--playbook <file>` is appended
    pub generator: Vec<String>,

    /// Quiet period before rebuilding in dev mode
    pub debounce_ms: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("site.yml"),
            output: PathBuf::from("docs-dev"),
            playbook_name: "site-local-dev.yml".to_string(),
            generator: vec!["antora".to_string()],
            debounce_ms: 500,
        }
    }
}

/// Combined configuration (global + project)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Command that always receives the component version as first argument
    pub versioned_command: Option<String>,

    /// Version used when a document has no `page-component-version`
    pub default_component_version: String,

    /// Where remote repositories are cloned (defaults to the temp directory)
    pub clone_cache_dir: Option<PathBuf>,

    /// Kill shell includes running longer than this many seconds
    pub timeout_secs: Option<u64>,

    /// Host environment variables passed to commands in addition to PATH
    pub pass_env: Vec<String>,

    /// Site build settings
    pub site: SiteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            versioned_command: None,
            default_component_version: DEFAULT_COMPONENT_VERSION.to_string(),
            clone_cache_dir: None,
            timeout_secs: None,
            pass_env: Vec::new(),
            site: SiteConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration for the current directory
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        let global = Self::global_config_dir().map(|dir| dir.join("config.toml"));
        Self::load_from(global.as_deref(), &cwd)
    }

    /// Loads configuration from an optional global file and the project
    /// file found from `start`
    pub fn load_from(global: Option<&Path>, start: &Path) -> Result<Self> {
        let mut merged = toml::Table::new();

        if let Some(path) = global.filter(|p| p.is_file()) {
            merge_tables(&mut merged, read_table(path).context("Failed to load global config")?);
        }

        if let Some(path) = Self::find_project_config(start) {
            merge_tables(&mut merged, read_table(&path).context("Failed to load project config")?);
        }

        let config: Config = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "docsh", "docsh").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Finds `docsh.toml` in `start` or its nearest ancestor
    pub fn find_project_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|path| path.is_file())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.site.generator.is_empty() || self.site.generator[0].trim().is_empty() {
            return Err(ConfigError::Invalid("site.generator must name a command".to_string()));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid("timeout_secs must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Root directory for remote repository clones
    pub fn clone_cache_dir(&self) -> PathBuf {
        self.clone_cache_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Settings handed to the shell include executor
    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            versioned_command: self.versioned_command.clone(),
            default_component_version: Some(self.default_component_version.clone()),
            pass_env: self.pass_env.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;

    toml::from_str(&content)
        .map_err(|e| ConfigError::Parse(e.to_string()))
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Overlays `overlay` onto `base`, merging nested tables
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.default_component_version, "latest");
        assert_eq!(config.site.source, PathBuf::from("site.yml"));
        assert_eq!(config.site.generator, vec!["antora"]);
        assert_eq!(config.clone_cache_dir(), std::env::temp_dir());
    }

    #[test]
    fn parse_project_config() {
        let toml = r#"
versioned_command = "mycli"
timeout_secs = 30
pass_env = ["HOME"]

[site]
generator = ["npx", "antora"]
debounce_ms = 250
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.versioned_command.as_deref(), Some("mycli"));
        assert_eq!(config.site.generator, vec!["npx", "antora"]);
        assert_eq!(config.site.debounce_ms, 250);
        assert_eq!(config.site.output, PathBuf::from("docs-dev"));

        let settings = config.executor_settings();
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
        assert_eq!(settings.pass_env, vec!["HOME"]);
        assert_eq!(settings.default_component_version.as_deref(), Some("latest"));
    }

    #[test]
    fn project_overrides_global() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        fs::write(
            &global,
            "versioned_command = \"globalcli\"\ntimeout_secs = 5\n[site]\ndebounce_ms = 100\n",
        )
        .unwrap();

        let project = dir.path().join("project");
        let nested = project.join("docs").join("modules");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            project.join(CONFIG_FILE),
            "versioned_command = \"projectcli\"\n[site]\noutput = \"build/site\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&global), &nested).unwrap();
        assert_eq!(config.versioned_command.as_deref(), Some("projectcli"));
        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(config.site.debounce_ms, 100);
        assert_eq!(config.site.output, PathBuf::from("build/site"));
    }

    #[test]
    fn missing_files_give_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(Some(&dir.path().join("absent.toml")), dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "timeout_secs = 0\n").unwrap();
        assert!(Config::load_from(None, dir.path()).is_err());

        fs::write(dir.path().join(CONFIG_FILE), "[site]\ngenerator = []\n").unwrap();
        assert!(Config::load_from(None, dir.path()).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "versioned_command = [").unwrap();
        let err = Config::load_from(None, dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config"));
    }
}
