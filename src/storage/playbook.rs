//! Antora playbooks for local development
//!
//! A local-dev playbook is the site playbook with every content source
//! pointed at a local clone (`--dir`, assigned round-robin) and the output
//! directory replaced. Keys this module does not know about are kept as-is.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use thiserror::Error;

use super::SiteConfig;

#[derive(Debug, Error)]
pub enum PlaybookError {
    #[error("local clone of the repository is not specified, please clone it and point to it using -d or --dir flag")]
    NoLocalSources,

    #[error("Failed to read playbook {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse playbook {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to write playbook {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize playbook: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SiteSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentSource {
    pub url: String,

    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContentSection {
    #[serde(default)]
    pub sources: Vec<ContentSource>,

    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OutputSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    #[serde(flatten)]
    pub extra: Mapping,
}

/// An Antora site playbook
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Playbook {
    #[serde(default)]
    pub site: SiteSection,

    #[serde(default)]
    pub content: ContentSection,

    #[serde(default)]
    pub output: OutputSection,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl Playbook {
    pub fn load(path: &Path) -> Result<Self, PlaybookError> {
        let content = fs::read_to_string(path).map_err(|source| PlaybookError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| PlaybookError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn to_yaml(&self) -> Result<String, PlaybookError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Points content sources at local directories, cycling through `dirs`
    pub fn use_local_sources(&mut self, dirs: &[PathBuf]) {
        if dirs.is_empty() {
            return;
        }
        for (i, source) in self.content.sources.iter_mut().enumerate() {
            source.url = dirs[i % dirs.len()].display().to_string();
        }
    }

    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) {
        self.output.dir = Some(dir.into());
    }

    /// Site title, or a generic name
    pub fn title(&self) -> &str {
        self.site.title.as_deref().unwrap_or("Antora")
    }

    /// Content sources that are local directories
    pub fn local_source_dirs(&self) -> Vec<PathBuf> {
        self.content
            .sources
            .iter()
            .map(|s| PathBuf::from(&s.url))
            .filter(|p| p.is_dir())
            .collect()
    }
}

/// How to obtain the playbook for a local build
#[derive(Debug, Clone, Default)]
pub struct PlaybookOptions {
    /// Site playbook to derive from (defaults to the configured source)
    pub source: Option<PathBuf>,

    /// Use this playbook as-is instead of generating one
    pub playbook: Option<PathBuf>,

    /// Local clones for the content sources
    pub dirs: Vec<PathBuf>,

    /// Output directory (defaults to the configured output)
    pub output: Option<PathBuf>,

    /// Keep the generated playbook on exit
    pub keep: bool,
}

/// The playbook file a build runs against.
///
/// A generated playbook is removed when this value is dropped, unless it was
/// asked to be kept.
#[derive(Debug)]
pub struct DevPlaybook {
    path: PathBuf,
    playbook: Playbook,
    remove_on_drop: bool,
}

impl DevPlaybook {
    /// Uses an explicit playbook, or generates the local-dev one
    pub fn prepare(options: &PlaybookOptions, site: &SiteConfig) -> Result<Self, PlaybookError> {
        if let Some(path) = &options.playbook {
            let playbook = Playbook::load(path)?;
            return Ok(Self {
                path: path.clone(),
                playbook,
                remove_on_drop: false,
            });
        }

        if options.dirs.is_empty() {
            return Err(PlaybookError::NoLocalSources);
        }

        let source = options.source.as_ref().unwrap_or(&site.source);
        let mut playbook = Playbook::load(source)?;

        let dirs: Vec<PathBuf> = options.dirs.iter().map(|d| absolute(d)).collect();
        playbook.use_local_sources(&dirs);
        playbook.set_output_dir(options.output.clone().unwrap_or_else(|| site.output.clone()));

        let path = source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .join(&site.playbook_name);

        fs::write(&path, playbook.to_yaml()?).map_err(|source| PlaybookError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            playbook,
            remove_on_drop: !options.keep,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn playbook(&self) -> &Playbook {
        &self.playbook
    }

    /// Whether the file is generated and will be removed
    pub fn is_temporary(&self) -> bool {
        self.remove_on_drop
    }

    /// Re-reads the playbook file after it changed on disk
    pub fn reload(&mut self) -> Result<(), PlaybookError> {
        self.playbook = Playbook::load(&self.path)?;
        Ok(())
    }
}

impl Drop for DevPlaybook {
    fn drop(&mut self) {
        if self.remove_on_drop {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SITE: &str = r#"
site:
  title: Example Docs
  start_page: example::index.adoc
content:
  sources:
    - url: https://github.com/example/one.git
      branches: main
      start_path: docs
    - url: https://github.com/example/two.git
      branches: [v1.x, v2.x]
    - url: https://github.com/example/three.git
ui:
  bundle:
    url: ./ui-bundle.zip
output:
  dir: build/site
asciidoc:
  extensions:
    - ./lib/include-shell.js
"#;

    fn site_config(dir: &Path) -> SiteConfig {
        SiteConfig {
            source: dir.join("site.yml"),
            ..Default::default()
        }
    }

    #[test]
    fn parse_keeps_unknown_keys() {
        let playbook = Playbook::parse(SITE).unwrap();
        assert_eq!(playbook.title(), "Example Docs");
        assert_eq!(playbook.content.sources.len(), 3);
        assert!(playbook.extra.contains_key("ui"));
        assert!(playbook.extra.contains_key("asciidoc"));

        let yaml = playbook.to_yaml().unwrap();
        assert!(yaml.contains("start_path: docs"));
        assert!(yaml.contains("ui-bundle.zip"));
        assert!(yaml.contains("start_page: example::index.adoc"));
    }

    #[test]
    fn local_sources_round_robin() {
        let mut playbook = Playbook::parse(SITE).unwrap();
        playbook.use_local_sources(&[PathBuf::from("/src/a"), PathBuf::from("/src/b")]);

        let urls: Vec<&str> = playbook.content.sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["/src/a", "/src/b", "/src/a"]);
    }

    #[test]
    fn prepare_requires_dirs_without_playbook() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("site.yml"), SITE).unwrap();

        let err = DevPlaybook::prepare(&PlaybookOptions::default(), &site_config(dir.path())).unwrap_err();
        assert!(matches!(err, PlaybookError::NoLocalSources));
        assert!(err.to_string().contains("-d or --dir"));
    }

    #[test]
    fn prepare_writes_and_removes_generated_playbook() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("site.yml"), SITE).unwrap();
        let clone = dir.path().join("clone");
        fs::create_dir_all(&clone).unwrap();

        let options = PlaybookOptions {
            dirs: vec![clone.clone()],
            output: Some(PathBuf::from("out")),
            ..Default::default()
        };

        let generated_path;
        {
            let dev = DevPlaybook::prepare(&options, &site_config(dir.path())).unwrap();
            generated_path = dev.path().to_path_buf();
            assert_eq!(generated_path, dir.path().join("site-local-dev.yml"));
            assert!(dev.is_temporary());

            let written = Playbook::load(&generated_path).unwrap();
            assert!(written.content.sources.iter().all(|s| s.url == clone.display().to_string()));
            assert_eq!(written.output.dir, Some(PathBuf::from("out")));
            assert_eq!(written.local_source_dirs(), vec![clone.clone(); 3]);
        }
        assert!(!generated_path.exists());
    }

    #[test]
    fn keep_leaves_generated_playbook() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("site.yml"), SITE).unwrap();

        let options = PlaybookOptions {
            dirs: vec![dir.path().to_path_buf()],
            keep: true,
            ..Default::default()
        };
        let path = DevPlaybook::prepare(&options, &site_config(dir.path()))
            .unwrap()
            .path()
            .to_path_buf();
        assert!(path.exists());
    }

    #[test]
    fn explicit_playbook_is_used_as_is() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.yml");
        fs::write(&path, SITE).unwrap();

        let options = PlaybookOptions {
            playbook: Some(path.clone()),
            ..Default::default()
        };
        {
            let dev = DevPlaybook::prepare(&options, &site_config(dir.path())).unwrap();
            assert_eq!(dev.path(), path);
            assert!(!dev.is_temporary());
            assert_eq!(dev.playbook().output.dir, Some(PathBuf::from("build/site")));
        }
        assert!(path.exists());
    }

    #[test]
    fn missing_source_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let options = PlaybookOptions {
            dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        let err = DevPlaybook::prepare(&options, &site_config(dir.path())).unwrap_err();
        assert!(matches!(err, PlaybookError::Read { .. }));
    }
}
