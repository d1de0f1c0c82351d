//! Layered configuration.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. built-in defaults, rooted at `~/Music/iTunes`;
//! 2. `config.toml`, `config.yaml` and `config.json` in the user's config
//!    directory, or one explicitly given file instead;
//! 3. `TUNECHECK_*` environment variables (`TUNECHECK_LIBRARY_DIR`, ...).

pub mod error;

use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result};

pub const ENV_PREFIX: &str = "TUNECHECK_";
pub const DEFAULT_CATALOG: &str = "iTunes Music Library.xml";
pub const DEFAULT_MEDIA_DIR: &str = "iTunes Music";
const CONFIG_FILES: &[&str] = &["config.toml", "config.yaml", "config.json"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the catalog export and the media directory.
    pub library_dir: PathBuf,
    /// Catalog export, relative to `library_dir` unless absolute.
    pub catalog: PathBuf,
    /// Media directory, relative to `library_dir` unless absolute.
    pub media_dir: PathBuf,
    /// Files with these extensions are never reported as missing from the
    /// catalog.
    pub ignored_extensions: Vec<String>,
    /// Directories with these extensions are opaque and not descended into.
    pub bundle_extensions: Vec<String>,
}

impl Config {
    /// Built-in defaults for the current user.
    pub fn defaults() -> Result<Self> {
        let dirs = BaseDirs::new().ok_or_raise(|| ErrorKind::NoHomeDirectory)?;
        Ok(Self::rooted_at(dirs.home_dir().join("Music").join("iTunes")))
    }

    fn rooted_at(library_dir: PathBuf) -> Self {
        Self {
            library_dir,
            catalog: PathBuf::from(DEFAULT_CATALOG),
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
            ignored_extensions: [".epub", ".m4r", ".pdf", ".plist"].map(String::from).to_vec(),
            bundle_extensions: vec![".itlp".to_string()],
        }
    }

    /// The merged configuration sources, with `file` replacing the files in
    /// the user's config directory when given.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::defaults()?));
        match file {
            Some(file) => figment = merge_file(figment, file)?,
            None => {
                if let Some(dirs) = ProjectDirs::from("", "", "tunecheck") {
                    for name in CONFIG_FILES {
                        let path = dirs.config_dir().join(name);
                        if path.is_file() {
                            tracing::debug!(path = %path.display(), "Loading configuration file");
                            figment = merge_file(figment, &path)?;
                        }
                    }
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        figment.extract().or_raise(|| ErrorKind::Invalid)
    }

    /// Load the configuration from every source.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(file)?)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.library_dir.join(&self.catalog)
    }

    pub fn media_path(&self) -> PathBuf {
        self.library_dir.join(&self.media_dir)
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::MissingFile(path.to_path_buf()));
    }
    let extension = path.extension().map(|e| e.to_string_lossy().to_lowercase());
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}
