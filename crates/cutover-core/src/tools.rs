//! External tool boundary for the release sequence.
//!
//! Every step that leaves the process goes through one of the traits in
//! this module, so the sequencer can be driven by fakes in tests and by
//! [`ShellTools`] in production. `ShellTools` runs user-configured command
//! templates through `sh -c` in the project root and classifies failures
//! by sniffing tool output, the same way the git module detects the
//! not-a-repository case.
//!
//! # Variables
//!
//! Command templates support `{var}` interpolation for:
//! `{name}`, `{version}`, `{tag}`, `{title}`, `{artifact}`,
//! `{attachments}`.

use std::fs;
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::git::{self, GitError, GitResult};
use crate::version::ReleaseVersion;

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from external tools, classified for retry and reporting.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The build command exited non-zero or produced no artifact.
    #[error("build failed:\n{output}")]
    Build {
        /// Combined output from the build command.
        output: String,
    },

    /// The registry or release host rejected the credentials.
    #[error("authentication rejected: {message}")]
    Auth {
        /// What the tool reported.
        message: String,
    },

    /// The upload failed for a reason worth retrying.
    #[error("upload failed: {message}")]
    Upload {
        /// What the tool reported.
        message: String,
    },

    /// A network-level failure from an external tool.
    #[error("network failure: {message}")]
    Network {
        /// What the tool reported.
        message: String,
    },

    /// The remote service throttled the request.
    #[error("rate limited: {message}")]
    RateLimit {
        /// What the tool reported.
        message: String,
    },

    /// The remote side already has this release.
    #[error("already released: {message}")]
    Conflict {
        /// What already exists.
        message: String,
    },

    /// The hosted release command failed outright.
    #[error("release creation failed:\n{output}")]
    Release {
        /// Combined output from the release command.
        output: String,
    },

    /// An external command failed in a way no other class covers.
    #[error("{command} failed:\n{output}")]
    Command {
        /// The command that failed.
        command: String,
        /// Combined output from the command.
        output: String,
    },

    /// A filesystem operation failed.
    #[error("{message}")]
    Io {
        /// What went wrong.
        message: String,
    },

    /// Failed to spawn an external command.
    #[error("failed to execute command: {0}")]
    Exec(#[from] std::io::Error),
}

impl ToolError {
    /// Whether a bounded retry is worth attempting.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Upload { .. } | Self::Network { .. } | Self::RateLimit { .. }
        )
    }

    /// Short classification label for logs and JSON output.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Build { .. } => "build",
            Self::Auth { .. } => "auth",
            Self::Upload { .. } => "upload",
            Self::Network { .. } => "network",
            Self::RateLimit { .. } => "rate-limit",
            Self::Conflict { .. } => "conflict",
            Self::Release { .. } => "release",
            Self::Command { .. } => "command",
            Self::Io { .. } => "io",
            Self::Exec(_) => "exec",
        }
    }

    /// Whether the failure came from an external tool rather than the
    /// local environment.
    pub const fn is_external(&self) -> bool {
        !matches!(self, Self::Io { .. } | Self::Exec(_))
    }
}

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

// ──────────────────────────────────────────────
// Traits
// ──────────────────────────────────────────────

/// Proof that the registry accepted an upload.
///
/// Publishing is the one step whose effect cannot be re-verified locally,
/// so the receipt is persisted in the run state as the durable evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// The artifact that was uploaded.
    pub artifact: Utf8PathBuf,
    /// Output captured from the publish command.
    pub output: String,
}

/// Builds the distributable artifact.
pub trait BuildInvoker {
    /// Where the artifact for this version lands, per the artifact template.
    fn artifact_path(&self, version: &ReleaseVersion) -> Utf8PathBuf;

    /// Run the build command and return the artifact path.
    ///
    /// Errors with [`ToolError::Build`] when the command fails or exits
    /// zero without producing the artifact.
    fn build(&self, version: &ReleaseVersion) -> ToolResult<Utf8PathBuf>;
}

/// Uploads the artifact to the package registry.
pub trait PublishInvoker {
    /// Run the publish command for an already-built artifact.
    fn publish(&self, version: &ReleaseVersion, artifact: &Utf8Path) -> ToolResult<PublishReceipt>;
}

/// Packages the documentation tree into a versioned archive.
pub trait DocsPackager {
    /// Where the docs archive for this version lands.
    fn archive_path(&self, version: &ReleaseVersion) -> Utf8PathBuf;

    /// Whether the documentation source tree exists.
    fn docs_present(&self) -> bool;

    /// Stage and compress the docs tree, returning the archive path.
    fn package_docs(&self, version: &ReleaseVersion) -> ToolResult<Utf8PathBuf>;
}

/// Creates the tag and the hosted release entry.
pub trait ReleasePublisher {
    /// Tag the release and run the hosted release command.
    ///
    /// Returns the release URL when the tool printed one.
    fn create_release(
        &self,
        version: &ReleaseVersion,
        tag: &str,
        title: &str,
        attachments: &[Utf8PathBuf],
    ) -> ToolResult<Option<String>>;
}

/// Produces the changelog section for a version.
pub trait ChangelogGenerator {
    /// Run the changelog command and return the section text.
    ///
    /// The tag is the one the release itself uses, so command templates
    /// that reference `{tag}` see the configured prefix.
    fn generate_section(&self, version: &ReleaseVersion, tag: &str) -> ToolResult<String>;
}

/// Read-only questions about the surrounding repository.
pub trait RepoProbe {
    /// Whether the project root is inside a git work tree.
    fn is_inside_repo(&self) -> GitResult<bool>;

    /// Whether the working tree has no uncommitted changes.
    fn is_clean(&self) -> GitResult<bool>;

    /// Whether a tag with this exact name exists.
    fn tag_exists(&self, tag: &str) -> GitResult<bool>;
}

/// Everything the sequencer needs from the outside world.
pub trait Tools:
    BuildInvoker + PublishInvoker + DocsPackager + ReleasePublisher + ChangelogGenerator + RepoProbe
{
}

impl<T> Tools for T where
    T: BuildInvoker
        + PublishInvoker
        + DocsPackager
        + ReleasePublisher
        + ChangelogGenerator
        + RepoProbe
{
}

// ──────────────────────────────────────────────
// Command interpolation
// ──────────────────────────────────────────────

/// Variables available to configured command templates.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// The project name.
    pub name: String,
    /// The version being released (e.g., `1.2.3`).
    pub version: String,
    /// The git tag (e.g., `v1.2.3`).
    pub tag: String,
    /// The hosted release title.
    pub title: String,
    /// Path to the built artifact.
    pub artifact: String,
    /// Space-separated attachment paths for the release command.
    pub attachments: String,
}

/// Replace `{var}` placeholders with values from the context.
///
/// Public so the CLI can preview interpolated commands for dry-run display.
pub fn interpolate_command(template: &str, context: &CommandContext) -> String {
    template
        .replace("{name}", &context.name)
        .replace("{version}", &context.version)
        .replace("{tag}", &context.tag)
        .replace("{title}", &context.title)
        .replace("{artifact}", &context.artifact)
        .replace("{attachments}", &context.attachments)
}

// ──────────────────────────────────────────────
// ShellTools
// ──────────────────────────────────────────────

/// Construction arguments for [`ShellTools`].
///
/// Keeps the constructor call site readable without an eight-argument
/// function. All paths are absolute; command fields are templates with
/// `{var}` placeholders.
#[derive(Debug, Clone)]
pub struct ShellToolsInit {
    /// Absolute project root; commands run here.
    pub root: Utf8PathBuf,
    /// The project name, for `{name}` interpolation.
    pub project: String,
    /// Build command template.
    pub build_command: String,
    /// Artifact path template, relative to the root.
    pub artifact_template: String,
    /// Publish command template.
    pub publish_command: String,
    /// Hosted release command template.
    pub release_command: String,
    /// Changelog section command template.
    pub changelog_command: String,
    /// Absolute path of the documentation tree.
    pub docs_dir: Utf8PathBuf,
}

/// Production tools: configured command templates run through `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellTools {
    root: Utf8PathBuf,
    project: String,
    build_command: String,
    artifact_template: String,
    publish_command: String,
    release_command: String,
    changelog_command: String,
    docs_dir: Utf8PathBuf,
}

impl ShellTools {
    /// Create a tool set rooted at a project directory.
    pub fn new(init: ShellToolsInit) -> Self {
        Self {
            root: init.root,
            project: init.project,
            build_command: init.build_command,
            artifact_template: init.artifact_template,
            publish_command: init.publish_command,
            release_command: init.release_command,
            changelog_command: init.changelog_command,
            docs_dir: init.docs_dir,
        }
    }

    /// Interpolation context seeded with the project name and version.
    fn context(&self, version: &ReleaseVersion) -> CommandContext {
        CommandContext {
            name: self.project.clone(),
            version: version.to_string(),
            ..CommandContext::default()
        }
    }

    /// Run an interpolated command in the project root.
    fn run(&self, command: &str) -> std::io::Result<std::process::Output> {
        debug!(%command, "running tool command");
        Command::new("sh")
            .args(["-c", command])
            .current_dir(self.root.as_std_path())
            .output()
    }
}

impl BuildInvoker for ShellTools {
    fn artifact_path(&self, version: &ReleaseVersion) -> Utf8PathBuf {
        let relative = interpolate_command(&self.artifact_template, &self.context(version));
        self.root.join(relative)
    }

    #[instrument(skip(self), fields(%version))]
    fn build(&self, version: &ReleaseVersion) -> ToolResult<Utf8PathBuf> {
        let command = interpolate_command(&self.build_command, &self.context(version));
        let output = self.run(&command)?;

        if !output.status.success() {
            return Err(ToolError::Build {
                output: combined_output(&output),
            });
        }

        let artifact = self.artifact_path(version);
        if !artifact.is_file() {
            return Err(ToolError::Build {
                output: format!("build succeeded but {artifact} was not produced"),
            });
        }

        debug!(%artifact, "build complete");
        Ok(artifact)
    }
}

impl PublishInvoker for ShellTools {
    #[instrument(skip(self), fields(%version, %artifact))]
    fn publish(&self, version: &ReleaseVersion, artifact: &Utf8Path) -> ToolResult<PublishReceipt> {
        let mut context = self.context(version);
        context.artifact = artifact.to_string();
        let command = interpolate_command(&self.publish_command, &context);
        let output = self.run(&command)?;

        if !output.status.success() {
            return Err(classify_publish_failure(&combined_output(&output)));
        }

        Ok(PublishReceipt {
            artifact: artifact.to_path_buf(),
            output: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        })
    }
}

impl DocsPackager for ShellTools {
    fn archive_path(&self, version: &ReleaseVersion) -> Utf8PathBuf {
        self.root
            .join(format!("{}-{version}-docs.tgz", self.project))
    }

    fn docs_present(&self) -> bool {
        self.docs_dir.is_dir()
    }

    #[instrument(skip(self), fields(%version))]
    fn package_docs(&self, version: &ReleaseVersion) -> ToolResult<Utf8PathBuf> {
        if !self.docs_dir.is_dir() {
            return Err(ToolError::Io {
                message: format!("docs directory {} not found", self.docs_dir),
            });
        }

        let archive = self.archive_path(version);
        let staged_name = format!("{}-{version}-docs", self.project);

        // Stage under the root so the final rename stays on one filesystem
        // and a failed run leaves no partial archive behind.
        let io_err = |message: String| ToolError::Io { message };
        let stage = tempfile::TempDir::new_in(self.root.as_std_path())
            .map_err(|e| io_err(format!("failed to create staging directory: {e}")))?;
        let stage_path = Utf8Path::from_path(stage.path())
            .ok_or_else(|| io_err("staging directory path is not UTF-8".into()))?;

        copy_tree(&self.docs_dir, &stage_path.join(&staged_name))
            .map_err(|e| io_err(format!("failed to stage docs tree: {e}")))?;

        let staged_archive = stage_path.join(archive.file_name().unwrap_or("docs.tgz"));
        let output = Command::new("tar")
            .args(["-czf", staged_archive.as_str(), "-C", stage_path.as_str()])
            .arg(&staged_name)
            .output()?;
        if !output.status.success() {
            return Err(io_err(format!(
                "tar failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        fs::rename(&staged_archive, &archive)
            .map_err(|e| io_err(format!("failed to move archive into place: {e}")))?;

        debug!(%archive, "docs packaged");
        Ok(archive)
    }
}

impl ReleasePublisher for ShellTools {
    #[instrument(skip(self), fields(%version, %tag))]
    fn create_release(
        &self,
        version: &ReleaseVersion,
        tag: &str,
        title: &str,
        attachments: &[Utf8PathBuf],
    ) -> ToolResult<Option<String>> {
        // Tagging is idempotent across resumed runs: a tag left behind by
        // a failed attempt is reused, not an error.
        match git::tag_exists(tag) {
            Ok(true) => debug!(%tag, "tag already present"),
            Ok(false) => match git::create_tag(tag, title) {
                Ok(()) => {}
                Err(GitError::Exec(e)) => return Err(ToolError::Exec(e)),
                Err(e) => {
                    return Err(ToolError::Command {
                        command: "git tag".into(),
                        output: e.to_string(),
                    });
                }
            },
            Err(GitError::Exec(e)) => return Err(ToolError::Exec(e)),
            Err(e) => {
                return Err(ToolError::Command {
                    command: "git tag".into(),
                    output: e.to_string(),
                });
            }
        }

        let mut context = self.context(version);
        context.tag = tag.to_string();
        context.title = title.to_string();
        context.attachments = attachments
            .iter()
            .map(|path| path.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let command = interpolate_command(&self.release_command, &context);
        let output = self.run(&command)?;

        if !output.status.success() {
            return Err(classify_release_failure(tag, &combined_output(&output)));
        }

        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if url.is_empty() { None } else { Some(url) })
    }
}

impl ChangelogGenerator for ShellTools {
    #[instrument(skip(self), fields(%version, %tag))]
    fn generate_section(&self, version: &ReleaseVersion, tag: &str) -> ToolResult<String> {
        let mut context = self.context(version);
        context.tag = tag.to_string();
        let command = interpolate_command(&self.changelog_command, &context);
        let output = self.run(&command)?;

        if !output.status.success() {
            return Err(classify_changelog_failure(
                &command,
                &combined_output(&output),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl RepoProbe for ShellTools {
    fn is_inside_repo(&self) -> GitResult<bool> {
        git::is_inside_repo()
    }

    fn is_clean(&self) -> GitResult<bool> {
        git::is_clean()
    }

    fn tag_exists(&self, tag: &str) -> GitResult<bool> {
        git::tag_exists(tag)
    }
}

// ──────────────────────────────────────────────
// Failure classification
// ──────────────────────────────────────────────

/// Merge stdout and stderr into one trimmed block for error reporting.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut combined = String::new();
    if !stdout.trim().is_empty() {
        combined.push_str(stdout.trim());
    }
    if !stderr.trim().is_empty() {
        if !combined.is_empty() {
            combined.push('\n');
        }
        combined.push_str(stderr.trim());
    }
    combined
}

/// Classify a failed publish by sniffing the tool's output.
fn classify_publish_failure(output: &str) -> ToolError {
    let lower = output.to_lowercase();
    if is_auth_failure(&lower) {
        ToolError::Auth {
            message: output.to_string(),
        }
    } else if is_rate_limited(&lower) {
        ToolError::RateLimit {
            message: output.to_string(),
        }
    } else if is_network_failure(&lower) {
        ToolError::Network {
            message: output.to_string(),
        }
    } else {
        // Registries fail uploads for plenty of passing reasons; treat the
        // unclassified remainder as retryable.
        ToolError::Upload {
            message: output.to_string(),
        }
    }
}

/// Classify a failed hosted release command.
fn classify_release_failure(tag: &str, output: &str) -> ToolError {
    let lower = output.to_lowercase();
    if lower.contains("already exists") {
        ToolError::Conflict {
            message: format!("release {tag} already exists"),
        }
    } else if is_auth_failure(&lower) {
        ToolError::Auth {
            message: output.to_string(),
        }
    } else if is_rate_limited(&lower) {
        ToolError::RateLimit {
            message: output.to_string(),
        }
    } else if is_network_failure(&lower) {
        ToolError::Network {
            message: output.to_string(),
        }
    } else {
        ToolError::Release {
            output: output.to_string(),
        }
    }
}

/// Classify a failed changelog command.
fn classify_changelog_failure(command: &str, output: &str) -> ToolError {
    let lower = output.to_lowercase();
    if is_rate_limited(&lower) {
        ToolError::RateLimit {
            message: output.to_string(),
        }
    } else if is_network_failure(&lower) {
        ToolError::Network {
            message: output.to_string(),
        }
    } else {
        ToolError::Command {
            command: command.to_string(),
            output: output.to_string(),
        }
    }
}

fn is_auth_failure(lower: &str) -> bool {
    ["401", "403", "unauthorized", "forbidden", "authentication", "invalid credentials"]
        .iter()
        .any(|marker| lower.contains(marker))
}

fn is_rate_limited(lower: &str) -> bool {
    ["rate limit", "too many requests", "429"]
        .iter()
        .any(|marker| lower.contains(marker))
}

fn is_network_failure(lower: &str) -> bool {
    [
        "connection",
        "timed out",
        "timeout",
        "network",
        "could not resolve",
        "temporarily unavailable",
        "502",
        "503",
        "504",
    ]
    .iter()
    .any(|marker| lower.contains(marker))
}

/// Recursively copy a directory tree.
fn copy_tree(from: &Utf8Path, to: &Utf8Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in from.read_dir_utf8()? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn version() -> ReleaseVersion {
        ReleaseVersion::parse("0.1.0").unwrap()
    }

    fn tools_in(root: &Utf8Path) -> ShellTools {
        ShellTools::new(ShellToolsInit {
            root: root.to_path_buf(),
            project: "proj".into(),
            build_command: "true".into(),
            artifact_template: "dist/{name}-{version}.whl".into(),
            publish_command: "true".into(),
            release_command: "true".into(),
            changelog_command: "printf 'section'".into(),
            docs_dir: root.join("docs"),
        })
    }

    fn utf8_root(tmp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn interpolate_all_variables() {
        let ctx = CommandContext {
            name: "proj".into(),
            version: "1.2.3".into(),
            tag: "v1.2.3".into(),
            title: "proj 1.2.3".into(),
            artifact: "dist/proj-1.2.3.whl".into(),
            attachments: "a.tgz b.tgz".into(),
        };
        let result = interpolate_command(
            "{name} {version} {tag} '{title}' {artifact} {attachments}",
            &ctx,
        );
        assert_eq!(
            result,
            "proj 1.2.3 v1.2.3 'proj 1.2.3' dist/proj-1.2.3.whl a.tgz b.tgz"
        );
    }

    #[test]
    fn interpolate_preserves_unknown_braces() {
        let ctx = CommandContext::default();
        assert_eq!(interpolate_command("echo {unknown}", &ctx), "echo {unknown}");
    }

    #[test]
    fn artifact_path_follows_template() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        let tools = tools_in(&root);
        assert_eq!(
            tools.artifact_path(&version()),
            root.join("dist/proj-0.1.0.whl")
        );
    }

    #[test]
    fn build_fails_without_artifact() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        let tools = tools_in(&root);

        // Command exits zero but produces nothing.
        let err = tools.build(&version()).unwrap_err();
        assert!(matches!(err, ToolError::Build { .. }));
        assert!(err.to_string().contains("was not produced"));
    }

    #[test]
    fn build_returns_artifact_when_produced() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        let mut tools = tools_in(&root);
        tools.build_command = "mkdir -p dist && touch dist/proj-0.1.0.whl".into();

        let artifact = tools.build(&version()).unwrap();
        assert_eq!(artifact, root.join("dist/proj-0.1.0.whl"));
        assert!(artifact.is_file());
    }

    #[test]
    fn build_carries_command_output_on_failure() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        let mut tools = tools_in(&root);
        tools.build_command = "printf 'compiling' && printf 'boom' >&2 && false".into();

        let err = tools.build(&version()).unwrap_err();
        match err {
            ToolError::Build { output } => {
                assert!(output.contains("compiling"));
                assert!(output.contains("boom"));
            }
            other => panic!("expected build error, got {other:?}"),
        }
    }

    #[test]
    fn publish_returns_receipt() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        let mut tools = tools_in(&root);
        tools.publish_command = "printf 'uploaded {artifact}'".into();

        let artifact = root.join("dist/proj-0.1.0.whl");
        let receipt = tools.publish(&version(), &artifact).unwrap();
        assert_eq!(receipt.artifact, artifact);
        assert!(receipt.output.contains("uploaded"));
        assert!(receipt.output.contains("proj-0.1.0.whl"));
    }

    #[test]
    fn package_docs_builds_versioned_archive() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        fs::create_dir_all(root.join("docs/guide")).unwrap();
        fs::write(root.join("docs/index.md"), "# Docs\n").unwrap();
        fs::write(root.join("docs/guide/setup.md"), "setup\n").unwrap();

        let tools = tools_in(&root);
        let archive = tools.package_docs(&version()).unwrap();

        assert_eq!(archive, root.join("proj-0.1.0-docs.tgz"));
        assert!(archive.is_file());

        // The staged directory name is versioned inside the archive.
        let listing = Command::new("tar")
            .args(["-tzf", archive.as_str()])
            .output()
            .unwrap();
        let listing = String::from_utf8_lossy(&listing.stdout).to_string();
        assert!(listing.contains("proj-0.1.0-docs/index.md"));
        assert!(listing.contains("proj-0.1.0-docs/guide/setup.md"));
    }

    #[test]
    fn package_docs_requires_docs_dir() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        let tools = tools_in(&root);

        let err = tools.package_docs(&version()).unwrap_err();
        assert!(matches!(err, ToolError::Io { .. }));
        assert!(!root.join("proj-0.1.0-docs.tgz").exists());
    }

    #[test]
    fn generate_section_captures_stdout() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        let tools = tools_in(&root);

        let section = tools.generate_section(&version(), "v0.1.0").unwrap();
        assert_eq!(section, "section");
    }

    #[test]
    fn generate_section_interpolates_the_given_tag() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        let mut tools = tools_in(&root);
        tools.changelog_command = "printf '%s' '{tag}'".into();

        // A non-default prefix must reach the command untouched.
        let section = tools.generate_section(&version(), "rel-0.1.0").unwrap();
        assert_eq!(section, "rel-0.1.0");
    }

    #[test]
    fn classify_publish_auth() {
        let err = classify_publish_failure("HTTPError: 403 Forbidden");
        assert!(matches!(err, ToolError::Auth { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn classify_publish_rate_limit() {
        let err = classify_publish_failure("429 Too Many Requests");
        assert!(matches!(err, ToolError::RateLimit { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn classify_publish_network() {
        let err = classify_publish_failure("ConnectionError: connection reset by peer");
        assert!(matches!(err, ToolError::Network { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn classify_publish_default_is_upload() {
        let err = classify_publish_failure("something odd happened");
        assert!(matches!(err, ToolError::Upload { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn classify_release_conflict() {
        let err = classify_release_failure("v1.0.0", "release already exists on host");
        assert!(matches!(err, ToolError::Conflict { .. }));
        assert!(err.to_string().contains("v1.0.0"));
        assert!(!err.is_transient());
    }

    #[test]
    fn classify_release_default_is_fatal() {
        let err = classify_release_failure("v1.0.0", "unknown flag: --nope");
        assert!(matches!(err, ToolError::Release { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn classify_changelog_default_is_fatal() {
        let err = classify_changelog_failure("git cliff", "config error");
        assert!(matches!(err, ToolError::Command { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn classify_changelog_network_is_transient() {
        let err = classify_changelog_failure("gh api", "could not resolve host");
        assert!(matches!(err, ToolError::Network { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn error_kinds_name_the_class() {
        assert_eq!(
            ToolError::Build {
                output: String::new()
            }
            .kind(),
            "build"
        );
        assert_eq!(
            ToolError::RateLimit {
                message: String::new()
            }
            .kind(),
            "rate-limit"
        );
        assert_eq!(
            ToolError::Io {
                message: String::new()
            }
            .kind(),
            "io"
        );
    }

    #[test]
    fn io_errors_are_not_external() {
        assert!(
            !ToolError::Io {
                message: String::new()
            }
            .is_external()
        );
        assert!(
            ToolError::Conflict {
                message: String::new()
            }
            .is_external()
        );
    }
}
