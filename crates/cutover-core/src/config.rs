//! Configuration loading and discovery.
//!
//! This module provides configuration file discovery by:
//! 1. Walking up from the current directory to find project config
//! 2. Loading user config from XDG config directory
//! 3. Merging with sensible defaults
//!
//! # Supported formats
//!
//! The following configuration file formats are supported:
//! - TOML (`.toml`)
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! # Config file locations (in order of precedence, highest first):
//! - `.cutover.<ext>` in current directory or any parent
//! - `cutover.<ext>` in current directory or any parent
//! - `~/.config/cutover/config.<ext>` (user config)
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use cutover_core::config::{Config, ConfigLoader};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::retry::RetryPolicy;

/// Default path of the persisted version record, relative to the project root.
pub const DEFAULT_VERSION_FILE: &str = "pkg_info.json";

/// Default documentation directory, relative to the project root.
pub const DEFAULT_DOCS_DIR: &str = "docs";

/// Default changelog document, relative to the project root.
pub const DEFAULT_CHANGELOG: &str = "CHANGELOG.md";

const DEFAULT_TAG_PREFIX: &str = "v";
const DEFAULT_TITLE: &str = "{name} {version}";
const DEFAULT_BUILD_COMMAND: &str = "python -m build --wheel";
const DEFAULT_ARTIFACT: &str = "dist/{name}-{version}-py3-none-any.whl";
const DEFAULT_PUBLISH_COMMAND: &str = "twine upload {artifact}";
const DEFAULT_RELEASE_COMMAND: &str =
    "gh release create {tag} --title '{title}' --generate-notes {attachments}";
const DEFAULT_CHANGELOG_COMMAND: &str = "git cliff --latest --strip header";

/// The configuration for cutover.
///
/// Deserialized from config files found during discovery (TOML, YAML, or JSON).
/// All section fields are optional — the defaults describe a conventional
/// project layout, and config values act as overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Project layout overrides.
    pub project: Option<ProjectConfig>,
    /// Command overrides per pipeline step.
    pub commands: Option<CommandsConfig>,
    /// Release naming and attachment configuration.
    pub release: Option<ReleaseConfig>,
    /// Retry budget for transient failures.
    pub retry: Option<RetryConfig>,
}

/// Project layout overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Project name used in artifact and archive names
    /// (default: the project root's directory name).
    pub name: Option<String>,
    /// Path of the version record (default: `pkg_info.json`).
    pub version_file: Option<Utf8PathBuf>,
    /// Documentation directory to package (default: `docs`).
    pub docs_dir: Option<Utf8PathBuf>,
    /// Changelog document to maintain (default: `CHANGELOG.md`).
    pub changelog: Option<Utf8PathBuf>,
}

/// Command overrides for each externally-delegated pipeline step.
///
/// Commands are shell templates with `{var}` interpolation:
/// - `{name}` — the project name
/// - `{version}` — the release version (e.g., `1.2.0`)
/// - `{tag}` — the git tag (e.g., `v1.2.0`)
/// - `{title}` — the rendered release title
/// - `{artifact}` — the built artifact path
/// - `{attachments}` — space-separated asset paths for the hosted release
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommandsConfig {
    /// Build command producing the distributable artifact.
    pub build: Option<String>,
    /// Path template where the build command leaves the artifact.
    pub artifact: Option<String>,
    /// Upload command for the artifact.
    pub publish: Option<String>,
    /// Hosted-release creation command.
    pub release: Option<String>,
    /// Changelog section generator; section text is read from stdout.
    pub changelog: Option<String>,
}

/// Release naming and attachment configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReleaseConfig {
    /// Prefix for release tags (default: `v`).
    pub tag_prefix: Option<String>,
    /// Title template for the hosted release (default: `{name} {version}`).
    pub title: Option<String>,
    /// Attach the docs archive alongside the artifact (default: `true`).
    pub attach_docs: Option<bool>,
}

/// Retry budget for transient failures (uploads, changelog generation).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts before a transient failure becomes fatal (default: 3).
    pub max_attempts: Option<u32>,
    /// Delay before the first retry, in milliseconds (default: 500).
    pub base_delay_ms: Option<u64>,
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Config {
    /// The project name, falling back to the root directory's name.
    pub fn project_name(&self, root: &Utf8Path) -> String {
        self.project
            .as_ref()
            .and_then(|p| p.name.clone())
            .or_else(|| root.file_name().map(str::to_string))
            .unwrap_or_else(|| "project".to_string())
    }

    /// The version record path, resolved against the project root.
    pub fn version_file(&self, root: &Utf8Path) -> Utf8PathBuf {
        let rel = self
            .project
            .as_ref()
            .and_then(|p| p.version_file.as_deref())
            .unwrap_or_else(|| Utf8Path::new(DEFAULT_VERSION_FILE));
        root.join(rel)
    }

    /// The docs directory, resolved against the project root.
    pub fn docs_dir(&self, root: &Utf8Path) -> Utf8PathBuf {
        let rel = self
            .project
            .as_ref()
            .and_then(|p| p.docs_dir.as_deref())
            .unwrap_or_else(|| Utf8Path::new(DEFAULT_DOCS_DIR));
        root.join(rel)
    }

    /// The changelog document, resolved against the project root.
    pub fn changelog_path(&self, root: &Utf8Path) -> Utf8PathBuf {
        let rel = self
            .project
            .as_ref()
            .and_then(|p| p.changelog.as_deref())
            .unwrap_or_else(|| Utf8Path::new(DEFAULT_CHANGELOG));
        root.join(rel)
    }

    /// The tag prefix, defaulting to `v`.
    pub fn tag_prefix(&self) -> &str {
        self.release
            .as_ref()
            .and_then(|r| r.tag_prefix.as_deref())
            .unwrap_or(DEFAULT_TAG_PREFIX)
    }

    /// The release title template.
    pub fn title_template(&self) -> &str {
        self.release
            .as_ref()
            .and_then(|r| r.title.as_deref())
            .unwrap_or(DEFAULT_TITLE)
    }

    /// Whether the docs archive is attached to the hosted release.
    pub fn attach_docs(&self) -> bool {
        self.release
            .as_ref()
            .and_then(|r| r.attach_docs)
            .unwrap_or(true)
    }

    /// The build command template.
    pub fn build_command(&self) -> &str {
        self.commands
            .as_ref()
            .and_then(|c| c.build.as_deref())
            .unwrap_or(DEFAULT_BUILD_COMMAND)
    }

    /// The artifact path template.
    pub fn artifact_template(&self) -> &str {
        self.commands
            .as_ref()
            .and_then(|c| c.artifact.as_deref())
            .unwrap_or(DEFAULT_ARTIFACT)
    }

    /// The publish command template.
    pub fn publish_command(&self) -> &str {
        self.commands
            .as_ref()
            .and_then(|c| c.publish.as_deref())
            .unwrap_or(DEFAULT_PUBLISH_COMMAND)
    }

    /// The hosted-release command template.
    pub fn release_command(&self) -> &str {
        self.commands
            .as_ref()
            .and_then(|c| c.release.as_deref())
            .unwrap_or(DEFAULT_RELEASE_COMMAND)
    }

    /// The changelog generator command template.
    pub fn changelog_command(&self) -> &str {
        self.commands
            .as_ref()
            .and_then(|c| c.changelog.as_deref())
            .unwrap_or(DEFAULT_CHANGELOG_COMMAND)
    }

    /// The retry budget for transient failures.
    pub fn retry_policy(&self) -> RetryPolicy {
        let retry = self.retry.as_ref();
        let mut policy = RetryPolicy::default();
        if let Some(n) = retry.and_then(|r| r.max_attempts) {
            policy.max_attempts = n;
        }
        if let Some(ms) = retry.and_then(|r| r.base_delay_ms) {
            policy.base_delay_ms = ms;
        }
        policy
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "cutover";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Starting directory for project config search.
    project_search_root: Option<Utf8PathBuf>,
    /// Whether to include user config from XDG directory.
    include_user_config: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    /// Explicit config files to load (for testing or programmatic use).
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Set the starting directory for project config search.
    ///
    /// The loader will walk up from this directory looking for config files.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/cutover/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set a boundary marker to stop directory traversal.
    ///
    /// When walking up directories, stop if we find a directory containing
    /// this file or directory name. Default is `.git`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load.
    ///
    /// Files are loaded in order, with later files taking precedence.
    /// Explicit files are loaded after discovered files.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration, merging all discovered sources.
    ///
    /// Precedence (highest to lowest):
    /// 1. Explicit files (in order added via `with_file`)
    /// 2. Project config (closest to search root)
    /// 3. User config (`~/.config/cutover/config.<ext>`)
    /// 4. Default values
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Start with user config (lowest precedence of file sources)
        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
        }

        // Add project config
        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            figment = Self::merge_file(figment, &project_config);
        }

        // Add explicit files (highest precedence)
        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Load configuration, returning an error if no config file is found.
    pub fn load_or_error(self) -> ConfigResult<Config> {
        let has_user = self.include_user_config && self.find_user_config().is_some();
        let has_project = self
            .project_search_root
            .as_ref()
            .and_then(|root| self.find_project_config(root))
            .is_some();
        let has_explicit = !self.explicit_files.is_empty();

        if !has_user && !has_project && !has_explicit {
            return Err(ConfigError::NotFound);
        }

        self.load()
    }

    /// Find project config by walking up from the given directory.
    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            // Check for boundary marker
            if let Some(ref marker) = self.boundary_marker {
                let marker_path = dir.join(marker);
                if marker_path.exists() && dir != start {
                    // Found boundary in a parent dir, stop searching
                    break;
                }
            }

            // Check for config files in this directory (try each extension)
            for ext in CONFIG_EXTENSIONS {
                // Try dotfile first (.cutover.toml)
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }

                // Then try regular name (cutover.toml)
                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    /// Find user config in XDG config directory.
    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
        let config_dir = proj_dirs.config_dir();

        // Try each supported extension
        for ext in CONFIG_EXTENSIONS {
            let config_path = config_dir.join(format!("config.{ext}"));
            if config_path.is_file() {
                return Utf8PathBuf::from_path_buf(config_path).ok();
            }
        }

        None
    }

    /// Merge a config file into the figment, detecting format from extension.
    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("toml") => figment.merge(Toml::file_exact(path.as_str())),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Find the project config file path without loading it.
///
/// Useful for commands that need to know where config is located.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new()
        .with_project_search(start.as_ref())
        .without_boundary_marker()
        .find_project_config(start.as_ref())
}

/// Get the project directories for XDG-compliant path resolution.
///
/// Returns `None` if the home directory cannot be determined.
fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the user config directory path.
///
/// Returns `~/.config/cutover/` on Linux, `~/Library/Application Support/cutover/`
/// on macOS, and equivalent on other platforms.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// Get the user cache directory path.
///
/// Returns `~/.cache/cutover/` on Linux, `~/Library/Caches/cutover/`
/// on macOS, and equivalent on other platforms.
pub fn user_cache_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.cache_dir().to_path_buf()).ok()
}

/// Get the user data directory path.
///
/// Returns `~/.local/share/cutover/` on Linux, `~/Library/Application Support/cutover/`
/// on macOS, and equivalent on other platforms.
pub fn user_data_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_dir().to_path_buf()).ok()
}

/// Get the local data directory path (machine-specific, not synced).
///
/// Returns `~/.local/share/cutover/` on Linux, `~/Library/Application Support/cutover/`
/// on macOS, and equivalent on other platforms.
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_local_dir().to_path_buf()).ok()
}
