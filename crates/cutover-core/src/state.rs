//! Run state — the durable checkpoint of a release cycle.
//!
//! The sequencer persists a [`RunState`] after every completed step. A
//! halted run leaves the file behind so a later `--resume` knows which
//! steps are already confirmed; a finished run leaves it behind as the
//! release record (version, artifact paths, changelog section, completion
//! timestamp).

use std::fs;
use std::io::Write as _;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tools::PublishReceipt;
use crate::version::ReleaseVersion;

/// File name of the checkpoint, relative to the project root.
pub const STATE_FILE: &str = ".cutover-state.json";

// ──────────────────────────────────────────────
// Types
// ──────────────────────────────────────────────

/// Errors from checkpoint persistence.
#[derive(Error, Debug)]
pub enum StateError {
    /// The checkpoint could not be read.
    #[error("failed to read run state {path}: {source}")]
    Read {
        /// Checkpoint path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The checkpoint could not be written.
    #[error("failed to write run state {path}: {source}")]
    Write {
        /// Checkpoint path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The checkpoint exists but does not deserialize.
    #[error("{path} is not a valid run state: {reason}")]
    Malformed {
        /// Checkpoint path.
        path: Utf8PathBuf,
        /// What was wrong with it.
        reason: String,
    },
}

/// Result alias for checkpoint operations.
pub type StateResult<T> = Result<T, StateError>;

/// The states of the release sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SequencerState {
    /// Nothing has run yet.
    NotStarted,
    /// The release version is persisted in the version record.
    VersionSet,
    /// The distributable artifact exists.
    Built,
    /// The artifact is uploaded to the package registry.
    Published,
    /// The documentation archive exists.
    DocsPackaged,
    /// The tag and hosted release entry exist.
    ReleaseCreated,
    /// The changelog carries this version's section.
    ChangelogUpdated,
    /// The next development version is persisted. Terminal.
    NextVersionSet,
}

impl SequencerState {
    /// Whether this is the terminal state of a cycle.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::NextVersionSet)
    }
}

impl std::fmt::Display for SequencerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotStarted => "not-started",
            Self::VersionSet => "version-set",
            Self::Built => "built",
            Self::Published => "published",
            Self::DocsPackaged => "docs-packaged",
            Self::ReleaseCreated => "release-created",
            Self::ChangelogUpdated => "changelog-updated",
            Self::NextVersionSet => "next-version-set",
        };
        write!(f, "{name}")
    }
}

/// The checkpoint accumulator for one release cycle.
///
/// Step results are recorded as the sequence runs; once the terminal state
/// is reached and [`RunState::complete`] fires, the value doubles as the
/// immutable release record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// The release version this cycle is cutting.
    pub version: ReleaseVersion,
    /// The last state whose step completed.
    pub reached: SequencerState,
    /// Path of the built artifact.
    pub artifact: Option<Utf8PathBuf>,
    /// Receipt from the registry upload.
    pub receipt: Option<PublishReceipt>,
    /// Path of the documentation archive.
    pub docs_archive: Option<Utf8PathBuf>,
    /// URL of the hosted release entry.
    pub release_url: Option<String>,
    /// The changelog section recorded for this version.
    pub changelog_section: Option<String>,
    /// When the cycle started (UTC, ISO-8601).
    pub started_at: String,
    /// When the cycle reached its terminal state (UTC, ISO-8601).
    pub completed_at: Option<String>,
}

// ──────────────────────────────────────────────
// Persistence
// ──────────────────────────────────────────────

impl RunState {
    /// Start a fresh checkpoint for a release version.
    pub fn begin(version: ReleaseVersion) -> Self {
        Self {
            version,
            reached: SequencerState::NotStarted,
            artifact: None,
            receipt: None,
            docs_archive: None,
            release_url: None,
            changelog_section: None,
            started_at: now_utc_iso(),
            completed_at: None,
        }
    }

    /// The checkpoint path for a project root.
    pub fn path_for(root: &Utf8Path) -> Utf8PathBuf {
        root.join(STATE_FILE)
    }

    /// Load the checkpoint, if one exists.
    pub fn load(path: &Utf8Path) -> StateResult<Option<Self>> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StateError::Read {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };
        let state = serde_json::from_str(&raw).map_err(|e| StateError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Some(state))
    }

    /// Persist the checkpoint through a sibling temp file and a rename.
    pub fn save(&self, path: &Utf8Path) -> StateResult<()> {
        let write_err = |source| StateError::Write {
            path: path.to_path_buf(),
            source,
        };
        let rendered = serde_json::to_string_pretty(self).map_err(|e| StateError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(rendered.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    // ──────────────────────────────────────────────
    // Step results
    // ──────────────────────────────────────────────

    /// Mark a state as reached.
    pub const fn advance(&mut self, state: SequencerState) {
        self.reached = state;
    }

    /// Record the built artifact.
    pub fn record_artifact(&mut self, artifact: Utf8PathBuf) {
        self.artifact = Some(artifact);
    }

    /// Record the upload receipt.
    pub fn record_receipt(&mut self, receipt: PublishReceipt) {
        self.receipt = Some(receipt);
    }

    /// Record the documentation archive.
    pub fn record_docs_archive(&mut self, archive: Utf8PathBuf) {
        self.docs_archive = Some(archive);
    }

    /// Record the hosted release URL.
    pub fn record_release_url(&mut self, url: Option<String>) {
        self.release_url = url;
    }

    /// Record the changelog section text.
    pub fn record_changelog(&mut self, section: String) {
        self.changelog_section = Some(section);
    }

    /// Seal the record once the terminal state is reached.
    pub fn complete(&mut self) {
        self.completed_at = Some(now_utc_iso());
    }

    /// Whether this checkpoint describes a finished cycle.
    pub fn is_finished(&self) -> bool {
        self.completed_at.is_some() || self.reached.is_terminal()
    }
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

/// Return today's date as `YYYY-MM-DD` without external date crates.
///
/// Uses the civil-days-from-epoch algorithm (Howard Hinnant) to convert
/// `SystemTime::now()` into a calendar date in UTC.
pub fn iso_date_today() -> String {
    let secs = unix_now();
    let (y, m, d) = civil_from_days((secs / 86400) as i64);
    format!("{y:04}-{m:02}-{d:02}")
}

/// Return the current instant as `YYYY-MM-DDTHH:MM:SSZ` (UTC, ISO-8601).
pub fn now_utc_iso() -> String {
    let secs = unix_now();
    let (y, m, d) = civil_from_days((secs / 86400) as i64);
    let rem = secs % 86400;
    let (h, mi, s) = (rem / 3600, (rem % 3600) / 60, rem % 60);
    format!("{y:04}-{m:02}-{d:02}T{h:02}:{mi:02}:{s:02}Z")
}

fn unix_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Hinnant civil_from_days algorithm.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097); // day of era [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365; // year of era [0, 399]
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year [0, 365]
    let mp = (5 * doy + 2) / 153; // month index [0, 11]
    let d = doy - (153 * mp + 2) / 5 + 1; // day [1, 31]
    let m = if mp < 10 { mp + 3 } else { mp - 9 }; // month [1, 12]
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn version() -> ReleaseVersion {
        ReleaseVersion::parse("0.1.0").unwrap()
    }

    #[test]
    fn begin_starts_empty() {
        let state = RunState::begin(version());
        assert_eq!(state.reached, SequencerState::NotStarted);
        assert!(state.artifact.is_none());
        assert!(state.receipt.is_none());
        assert!(state.docs_archive.is_none());
        assert!(state.release_url.is_none());
        assert!(state.changelog_section.is_none());
        assert!(state.completed_at.is_none());
        assert!(!state.is_finished());
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let path = RunState::path_for(&root);

        let mut state = RunState::begin(version());
        state.advance(SequencerState::Built);
        state.record_artifact("dist/proj-0.1.0.whl".into());
        state.save(&path).unwrap();

        let loaded = RunState::load(&path).unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn load_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        assert!(RunState::load(&RunState::path_for(&root)).unwrap().is_none());
    }

    #[test]
    fn load_rejects_malformed_state() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let path = RunState::path_for(&root);
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            RunState::load(&path),
            Err(StateError::Malformed { .. })
        ));
    }

    #[test]
    fn state_order_follows_the_sequence() {
        assert!(SequencerState::NotStarted < SequencerState::VersionSet);
        assert!(SequencerState::Built < SequencerState::Published);
        assert!(SequencerState::ChangelogUpdated < SequencerState::NextVersionSet);
    }

    #[test]
    fn complete_seals_the_record() {
        let mut state = RunState::begin(version());
        state.advance(SequencerState::NextVersionSet);
        assert!(state.is_finished());

        state.complete();
        let stamp = state.completed_at.clone().unwrap();
        assert_eq!(stamp.len(), 20);
        assert!(stamp.ends_with('Z'));
    }

    #[test]
    fn timestamps_are_iso8601() {
        let date = iso_date_today();
        assert_eq!(date.len(), 10);
        assert_eq!(date.as_bytes()[4], b'-');
        assert_eq!(date.as_bytes()[7], b'-');

        let now = now_utc_iso();
        assert_eq!(now.len(), 20);
        assert_eq!(now.as_bytes()[10], b'T');
        assert!(now.starts_with(&date));
    }

    #[test]
    fn serialized_states_are_kebab_case() {
        let json = serde_json::to_string(&SequencerState::DocsPackaged).unwrap();
        assert_eq!(json, "\"docs-packaged\"");
        let back: SequencerState = serde_json::from_str("\"next-version-set\"").unwrap();
        assert_eq!(back, SequencerState::NextVersionSet);
    }
}
