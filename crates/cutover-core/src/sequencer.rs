//! Release sequencer — the checkpointed release state machine.
//!
//! Runs the seven release steps in a fixed order, confirming each step's
//! postcondition and persisting the checkpoint before the next step
//! starts. A failed step halts the run in the last reached state; nothing
//! is rolled back. `--resume` re-checks postconditions against the
//! checkpoint and continues with the first step that cannot be confirmed
//! complete.
//!
//! The sequencer is generic over its collaborators ([`Tools`]) so tests
//! can drive it with scripted fakes, and reports progress through an
//! event callback for the CLI to render.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::changelog::{self, ChangelogError};
use crate::config::Config;
use crate::git::GitError;
use crate::retry::{RetryPolicy, run_with_retry};
use crate::state::{RunState, SequencerState, StateError};
use crate::store::{StoreError, VersionStore};
use crate::tools::{CommandContext, ToolError, Tools, interpolate_command};
use crate::version::{Phase, ReleaseVersion, VersionError};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from the release sequence.
#[derive(Error, Debug)]
pub enum SequenceError {
    /// A step's precondition did not hold.
    #[error("{step} precondition failed: {reason}")]
    Precondition {
        /// The step whose precondition failed.
        step: StepName,
        /// Why it failed.
        reason: String,
    },

    /// An external tool failed during a step.
    #[error("{step} failed: {source}")]
    Step {
        /// The step that failed.
        step: StepName,
        /// The classified tool failure.
        #[source]
        source: ToolError,
    },

    /// An unfinished checkpoint exists and `--resume` was not given.
    #[error(
        "found an unfinished run for {version} (reached {reached}); \
         rerun with --resume or remove {state_file}"
    )]
    UnfinishedRun {
        /// The version the unfinished run was cutting.
        version: ReleaseVersion,
        /// The state the unfinished run reached.
        reached: SequencerState,
        /// The checkpoint file.
        state_file: Utf8PathBuf,
    },

    /// `--resume` was given but no unfinished checkpoint exists.
    #[error("no unfinished run to resume")]
    NothingToResume,

    /// A repository probe failed.
    #[error(transparent)]
    Repo(#[from] GitError),

    /// Version record error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Checkpoint error.
    #[error(transparent)]
    State(#[from] StateError),

    /// Version error.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Changelog file error.
    #[error(transparent)]
    Changelog(#[from] ChangelogError),
}

impl SequenceError {
    /// Whether the failure came from an external tool rather than a
    /// local precondition or environment problem.
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::Step { source, .. } if source.is_external())
    }
}

/// Result alias for sequencer operations.
pub type SequenceResult<T> = Result<T, SequenceError>;

// ──────────────────────────────────────────────
// Steps and events
// ──────────────────────────────────────────────

/// The release steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepName {
    /// Write the release version to the version record.
    SetVersion,
    /// Build the distributable artifact.
    Build,
    /// Upload the artifact to the package registry.
    Publish,
    /// Package the documentation archive.
    PackageDocs,
    /// Tag and create the hosted release entry.
    CreateRelease,
    /// Record the release section in the changelog.
    UpdateChangelog,
    /// Write the next development version to the version record.
    SetNextVersion,
}

impl StepName {
    /// Every step, in execution order.
    pub const ALL: [Self; 7] = [
        Self::SetVersion,
        Self::Build,
        Self::Publish,
        Self::PackageDocs,
        Self::CreateRelease,
        Self::UpdateChangelog,
        Self::SetNextVersion,
    ];

    /// The state a completed run of this step reaches.
    pub const fn target(self) -> SequencerState {
        match self {
            Self::SetVersion => SequencerState::VersionSet,
            Self::Build => SequencerState::Built,
            Self::Publish => SequencerState::Published,
            Self::PackageDocs => SequencerState::DocsPackaged,
            Self::CreateRelease => SequencerState::ReleaseCreated,
            Self::UpdateChangelog => SequencerState::ChangelogUpdated,
            Self::SetNextVersion => SequencerState::NextVersionSet,
        }
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SetVersion => "set-version",
            Self::Build => "build",
            Self::Publish => "publish",
            Self::PackageDocs => "package-docs",
            Self::CreateRelease => "create-release",
            Self::UpdateChangelog => "update-changelog",
            Self::SetNextVersion => "set-next-version",
        };
        write!(f, "{name}")
    }
}

/// Events emitted while the sequence runs, for progress reporting.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// A step is about to run.
    StepStarted(StepName),
    /// A step's action completed (or was skipped by configuration).
    StepCompleted(StepName, StepOutcome),
    /// A resumed run confirmed the step already complete.
    StepSkipped {
        /// The step that was skipped.
        step: StepName,
        /// Why it was skipped.
        reason: String,
    },
}

/// Outcome of a single step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum StepOutcome {
    /// The step's action ran and its postcondition holds.
    Success {
        /// Description of what happened.
        message: String,
    },
    /// The step did not run.
    Skipped {
        /// Why the step was skipped.
        reason: String,
    },
}

/// Outcome of a full release run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// The version that was released.
    pub version: ReleaseVersion,
    /// The development version the project moved to.
    pub next_version: ReleaseVersion,
    /// The tag that was created.
    pub tag: String,
    /// Per-step outcomes, in execution order.
    pub steps: Vec<(StepName, StepOutcome)>,
    /// Whether this run resumed an earlier checkpoint.
    pub resumed: bool,
    /// The sealed release record.
    pub state: RunState,
}

/// A single dry-run precondition check.
#[derive(Debug, Clone, Serialize)]
pub struct StepCheck {
    /// The step the check belongs to.
    pub step: StepName,
    /// Whether the precondition holds (or will hold once earlier steps run).
    pub passed: bool,
    /// Description of the result.
    pub message: String,
}

/// Report from a dry run: every step's precondition, evaluated read-only.
#[derive(Debug, Clone, Serialize)]
pub struct DryRunReport {
    /// The version a real run would release.
    pub version: ReleaseVersion,
    /// The tag a real run would create.
    pub tag: String,
    /// Whether an unfinished checkpoint would be resumed.
    pub resuming: bool,
    /// Individual step checks, in execution order.
    pub checks: Vec<StepCheck>,
    /// Whether every check passed.
    pub all_passed: bool,
}

/// Options controlling a release run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Continue an unfinished run from its checkpoint.
    pub resume: bool,
}

// ──────────────────────────────────────────────
// Plan
// ──────────────────────────────────────────────

/// Resolved paths and naming for one project's release sequence.
#[derive(Debug, Clone)]
pub struct ReleasePlan {
    /// Absolute project root.
    pub root: Utf8PathBuf,
    /// The project name, used in tags, titles, and artifact names.
    pub project: String,
    /// Absolute path of the version record.
    pub version_file: Utf8PathBuf,
    /// Absolute path of the changelog.
    pub changelog_path: Utf8PathBuf,
    /// Absolute path of the checkpoint file.
    pub state_path: Utf8PathBuf,
    /// Prefix for release tags.
    pub tag_prefix: String,
    /// Template for the hosted release title.
    pub title_template: String,
    /// Whether to package docs and attach the archive to the release.
    pub attach_docs: bool,
    /// Retry policy for transient tool failures.
    pub retry: RetryPolicy,
}

impl ReleasePlan {
    /// Derive a plan from loaded configuration.
    pub fn from_config(root: &Utf8Path, config: &Config) -> Self {
        Self {
            root: root.to_path_buf(),
            project: config.project_name(root),
            version_file: config.version_file(root),
            changelog_path: config.changelog_path(root),
            state_path: RunState::path_for(root),
            tag_prefix: config.tag_prefix().to_string(),
            title_template: config.title_template().to_string(),
            attach_docs: config.attach_docs(),
            retry: config.retry_policy(),
        }
    }

    /// The tag a version releases under.
    pub fn tag_for(&self, version: &ReleaseVersion) -> String {
        version.tag_name(&self.tag_prefix)
    }

    /// The hosted release title for a version.
    pub fn title_for(&self, version: &ReleaseVersion) -> String {
        let context = CommandContext {
            name: self.project.clone(),
            version: version.to_string(),
            ..CommandContext::default()
        };
        interpolate_command(&self.title_template, &context)
    }
}

// ──────────────────────────────────────────────
// Sequencer
// ──────────────────────────────────────────────

/// Everything a step needs besides the mutable checkpoint.
struct StepScope<'a> {
    store: &'a VersionStore,
    release: &'a ReleaseVersion,
    next: &'a ReleaseVersion,
    tag: &'a str,
    title: &'a str,
    resumed: bool,
}

/// Drives the release steps against a collaborator set.
#[derive(Debug)]
pub struct Sequencer<T> {
    tools: T,
    plan: ReleasePlan,
}

impl<T: Tools> Sequencer<T> {
    /// Create a sequencer for a plan.
    pub const fn new(plan: ReleasePlan, tools: T) -> Self {
        Self { tools, plan }
    }

    /// Run the release sequence to completion.
    ///
    /// Calls `on_event` at step boundaries so the CLI can update progress
    /// display. On failure the checkpoint stays behind for `--resume`.
    #[instrument(skip(self, on_event), fields(resume = options.resume))]
    pub fn run(
        &self,
        options: RunOptions,
        mut on_event: impl FnMut(RunEvent),
    ) -> SequenceResult<RunOutcome> {
        let store = VersionStore::new(self.plan.version_file.clone());
        let checkpoint = RunState::load(&self.plan.state_path)?;

        let (mut state, resumed) = if options.resume {
            match checkpoint {
                Some(state) if !state.is_finished() => {
                    info!(version = %state.version, reached = %state.reached, "resuming run");
                    (state, true)
                }
                _ => return Err(SequenceError::NothingToResume),
            }
        } else {
            if let Some(state) = checkpoint
                && !state.is_finished()
            {
                return Err(SequenceError::UnfinishedRun {
                    version: state.version,
                    reached: state.reached,
                    state_file: self.plan.state_path.clone(),
                });
            }
            (RunState::begin(self.release_version(&store)?), false)
        };

        let release = state.version.clone();
        let next = release.next_dev_version();
        let tag = self.plan.tag_for(&release);
        let title = self.plan.title_for(&release);
        let scope = StepScope {
            store: &store,
            release: &release,
            next: &next,
            tag: &tag,
            title: &title,
            resumed,
        };

        let mut steps = Vec::new();
        for step in StepName::ALL {
            on_event(RunEvent::StepStarted(step));

            if resumed && self.confirmed_complete(step, &state, &store, &tag)? {
                debug!(%step, "step already complete, skipping");
                let reason = "already complete".to_string();
                on_event(RunEvent::StepSkipped {
                    step,
                    reason: reason.clone(),
                });
                steps.push((step, StepOutcome::Skipped { reason }));
                continue;
            }

            let outcome = self.run_step(step, &mut state, &scope)?;
            state.save(&self.plan.state_path)?;
            on_event(RunEvent::StepCompleted(step, outcome.clone()));
            steps.push((step, outcome));
        }

        info!(version = %release, %tag, resumed, "release sequence complete");

        Ok(RunOutcome {
            version: release,
            next_version: next,
            tag,
            steps,
            resumed,
            state,
        })
    }

    /// Evaluate every step's precondition read-only, without executing
    /// anything or writing any state.
    #[instrument(skip(self))]
    pub fn dry_run(&self) -> SequenceResult<DryRunReport> {
        let store = VersionStore::new(self.plan.version_file.clone());
        let checkpoint = RunState::load(&self.plan.state_path)?.filter(|s| !s.is_finished());

        let release = match &checkpoint {
            Some(state) => state.version.clone(),
            None => self.release_version(&store)?,
        };
        let tag = self.plan.tag_for(&release);

        let checks: Vec<StepCheck> = StepName::ALL
            .into_iter()
            .map(|step| self.check_step(step, checkpoint.as_ref(), &store, &release, &tag))
            .collect();
        let all_passed = checks.iter().all(|c| c.passed);
        debug!(all_passed, "dry run complete");

        Ok(DryRunReport {
            version: release,
            tag,
            resuming: checkpoint.is_some(),
            checks,
            all_passed,
        })
    }

    /// Derive the release version from the stored development version.
    fn release_version(&self, store: &VersionStore) -> SequenceResult<ReleaseVersion> {
        let stored = store.read()?;
        if !stored.is_dev() {
            return Err(SequenceError::Precondition {
                step: StepName::SetVersion,
                reason: format!(
                    "stored version {stored} is not a development version; nothing to release"
                ),
            });
        }
        Ok(stored.release_version())
    }

    /// Whether a checkpointed step can be confirmed complete.
    ///
    /// The checkpoint must say the step's target state was reached AND the
    /// step's postcondition must still hold. Publishing is the exception:
    /// the registry cannot be probed, so the persisted receipt stands in.
    fn confirmed_complete(
        &self,
        step: StepName,
        state: &RunState,
        store: &VersionStore,
        tag: &str,
    ) -> SequenceResult<bool> {
        if state.reached < step.target() {
            return Ok(false);
        }
        let confirmed = match step {
            StepName::SetVersion => store.read()? == state.version,
            StepName::Build => state.artifact.as_ref().is_some_and(|a| a.is_file()),
            StepName::Publish => state.receipt.is_some(),
            // A run with attach_docs = false records no archive; there is
            // nothing to re-verify.
            StepName::PackageDocs => state.docs_archive.as_ref().is_none_or(|a| a.is_file()),
            StepName::CreateRelease => self.tools.tag_exists(tag)?,
            StepName::UpdateChangelog => {
                changelog::section_recorded(&self.plan.changelog_path, &state.version)?
            }
            StepName::SetNextVersion => store.read()?.is_dev(),
        };
        Ok(confirmed)
    }

    /// Run one step's precondition, action, and state transition.
    fn run_step(
        &self,
        step: StepName,
        state: &mut RunState,
        scope: &StepScope<'_>,
    ) -> SequenceResult<StepOutcome> {
        let step_err = |source: ToolError| SequenceError::Step { step, source };
        debug!(%step, "running step");

        let outcome = match step {
            StepName::SetVersion => {
                self.check_repo_preconditions()?;
                scope.store.write(scope.release, Phase::Release)?;
                state.advance(SequencerState::VersionSet);
                StepOutcome::Success {
                    message: format!(
                        "Set version {release} in {file}",
                        release = scope.release,
                        file = self.plan.version_file
                    ),
                }
            }

            StepName::Build => {
                let stored = scope.store.read()?;
                if &stored != scope.release {
                    return Err(SequenceError::Precondition {
                        step,
                        reason: format!(
                            "version record holds {stored}, expected {release}",
                            release = scope.release
                        ),
                    });
                }
                let artifact = self.tools.build(scope.release).map_err(step_err)?;
                state.record_artifact(artifact.clone());
                state.advance(SequencerState::Built);
                StepOutcome::Success {
                    message: format!("Built {artifact}"),
                }
            }

            StepName::Publish => {
                let artifact = state
                    .artifact
                    .clone()
                    .unwrap_or_else(|| self.tools.artifact_path(scope.release));
                if !artifact.is_file() {
                    return Err(SequenceError::Precondition {
                        step,
                        reason: format!("artifact {artifact} not found"),
                    });
                }
                let receipt = run_with_retry(&self.plan.retry, "publish", || {
                    self.tools.publish(scope.release, &artifact)
                })
                .map_err(step_err)?;
                state.record_receipt(receipt);
                state.advance(SequencerState::Published);
                StepOutcome::Success {
                    message: format!("Published {artifact}"),
                }
            }

            StepName::PackageDocs => {
                if !self.plan.attach_docs {
                    state.advance(SequencerState::DocsPackaged);
                    return Ok(StepOutcome::Skipped {
                        reason: "attach_docs = false".into(),
                    });
                }
                let archive = self.tools.package_docs(scope.release).map_err(step_err)?;
                state.record_docs_archive(archive.clone());
                state.advance(SequencerState::DocsPackaged);
                StepOutcome::Success {
                    message: format!("Packaged docs into {archive}"),
                }
            }

            StepName::CreateRelease => {
                // A pre-existing tag on a fresh run means this version was
                // already released; resumed runs reuse their own tag.
                if !scope.resumed && self.tools.tag_exists(scope.tag)? {
                    return Err(step_err(ToolError::Conflict {
                        message: format!("tag {tag} already exists", tag = scope.tag),
                    }));
                }
                let mut attachments = Vec::new();
                if let Some(artifact) = &state.artifact {
                    attachments.push(artifact.clone());
                }
                if let Some(archive) = &state.docs_archive {
                    attachments.push(archive.clone());
                }
                let url = run_with_retry(&self.plan.retry, "create-release", || {
                    self.tools
                        .create_release(scope.release, scope.tag, scope.title, &attachments)
                })
                .map_err(step_err)?;
                state.record_release_url(url.clone());
                state.advance(SequencerState::ReleaseCreated);
                StepOutcome::Success {
                    message: url.map_or_else(
                        || format!("Created release {tag}", tag = scope.tag),
                        |url| format!("Created release {url}"),
                    ),
                }
            }

            StepName::UpdateChangelog => {
                if !changelog_parent_exists(&self.plan.changelog_path) {
                    return Err(SequenceError::Precondition {
                        step,
                        reason: format!(
                            "parent directory of {} does not exist",
                            self.plan.changelog_path
                        ),
                    });
                }
                let section = run_with_retry(&self.plan.retry, "update-changelog", || {
                    self.tools.generate_section(scope.release, scope.tag)
                })
                .map_err(step_err)?;
                changelog::update_file(&self.plan.changelog_path, scope.release, &section)?;
                state.record_changelog(section);
                state.advance(SequencerState::ChangelogUpdated);
                StepOutcome::Success {
                    message: format!(
                        "Recorded {release} in {path}",
                        release = scope.release,
                        path = self.plan.changelog_path
                    ),
                }
            }

            StepName::SetNextVersion => {
                let stored = scope.store.read()?;
                if &stored != scope.release {
                    return Err(SequenceError::Precondition {
                        step,
                        reason: format!(
                            "version record holds {stored}, expected {release}",
                            release = scope.release
                        ),
                    });
                }
                scope.store.write(scope.next, Phase::NextDev)?;
                state.advance(SequencerState::NextVersionSet);
                state.complete();
                StepOutcome::Success {
                    message: format!("Set next development version {next}", next = scope.next),
                }
            }
        };

        Ok(outcome)
    }

    /// Fresh runs start from a repository with a clean working tree.
    fn check_repo_preconditions(&self) -> SequenceResult<()> {
        if !self.tools.is_inside_repo()? {
            return Err(SequenceError::Precondition {
                step: StepName::SetVersion,
                reason: "not inside a git repository".into(),
            });
        }
        if !self.tools.is_clean()? {
            return Err(SequenceError::Precondition {
                step: StepName::SetVersion,
                reason: "working tree has uncommitted changes".into(),
            });
        }
        Ok(())
    }

    /// Evaluate one step's precondition for the dry-run report.
    ///
    /// Preconditions that earlier steps in the same run will satisfy are
    /// reported as passing with a forward-looking message.
    fn check_step(
        &self,
        step: StepName,
        checkpoint: Option<&RunState>,
        store: &VersionStore,
        release: &ReleaseVersion,
        tag: &str,
    ) -> StepCheck {
        let check = |passed: bool, message: String| StepCheck {
            step,
            passed,
            message,
        };

        if let Some(state) = checkpoint {
            match self.confirmed_complete(step, state, store, tag) {
                Ok(true) => return check(true, "already complete".into()),
                Ok(false) => {}
                Err(e) => return check(false, format!("failed to check: {e}")),
            }
        }
        let resuming = checkpoint.is_some();

        match step {
            StepName::SetVersion => match self.tools.is_inside_repo() {
                Ok(false) => check(false, "not inside a git repository".into()),
                Err(e) => check(false, format!("failed to check: {e}")),
                Ok(true) => match self.tools.is_clean() {
                    Ok(true) => check(
                        true,
                        format!("would set version {release} in {}", self.plan.version_file),
                    ),
                    Ok(false) => check(false, "working tree has uncommitted changes".into()),
                    Err(e) => check(false, format!("failed to check: {e}")),
                },
            },

            StepName::Build => check(
                true,
                format!("would build {}", self.tools.artifact_path(release)),
            ),

            StepName::Publish => {
                let artifact = self.tools.artifact_path(release);
                if artifact.is_file() {
                    check(true, format!("would publish {artifact}"))
                } else {
                    check(true, format!("would publish {artifact} (produced by build)"))
                }
            }

            StepName::PackageDocs => {
                if !self.plan.attach_docs {
                    check(true, "skipped (attach_docs = false)".into())
                } else if self.tools.docs_present() {
                    check(
                        true,
                        format!("would package docs into {}", self.tools.archive_path(release)),
                    )
                } else {
                    check(false, "docs directory not found".into())
                }
            }

            StepName::CreateRelease => match self.tools.tag_exists(tag) {
                Ok(true) if resuming => {
                    check(true, format!("tag {tag} already present, would reuse it"))
                }
                Ok(true) => check(false, format!("tag {tag} already exists")),
                Ok(false) => check(
                    true,
                    format!(
                        "would tag {tag} and create release '{title}'",
                        title = self.plan.title_for(release)
                    ),
                ),
                Err(e) => check(false, format!("failed to check: {e}")),
            },

            StepName::UpdateChangelog => {
                if changelog_parent_exists(&self.plan.changelog_path) {
                    check(
                        true,
                        format!("would record {release} in {}", self.plan.changelog_path),
                    )
                } else {
                    check(
                        false,
                        format!(
                            "parent directory of {} does not exist",
                            self.plan.changelog_path
                        ),
                    )
                }
            }

            StepName::SetNextVersion => check(
                true,
                format!(
                    "would set next development version {}",
                    release.next_dev_version()
                ),
            ),
        }
    }
}

/// Whether the changelog's parent directory exists.
fn changelog_parent_exists(path: &Utf8Path) -> bool {
    path.parent().is_none_or(Utf8Path::is_dir)
}
