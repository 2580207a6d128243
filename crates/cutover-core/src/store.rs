//! The persisted version record.
//!
//! A small JSON file (`pkg_info.json` by convention) with one recognized
//! key, `version`. The record belongs to the released project, so any other
//! keys it carries are preserved across writes. Writes go through a temp
//! file in the same directory and a rename, so a crashed write never
//! truncates the record.

use std::fs;
use std::io::Write as _;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use thiserror::Error;

use crate::version::{Phase, ReleaseVersion, VersionError};

/// Errors from the version record.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The record could not be read.
    #[error("failed to read version record {path}: {source}")]
    Read {
        /// Record path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The record could not be written.
    #[error("failed to write version record {path}: {source}")]
    Write {
        /// Record path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The record is not a JSON object with a `version` string.
    #[error("{path} is not a valid version record: {reason}")]
    Malformed {
        /// Record path.
        path: Utf8PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The stored value failed the version grammar, or the value being
    /// written failed its phase policy.
    #[error(transparent)]
    Version(#[from] VersionError),
}

/// Result alias for version record operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Reads and writes the persisted version record.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: Utf8PathBuf,
}

impl VersionStore {
    /// Create a store over the given record path.
    pub fn new<P: Into<Utf8PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// The record path.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Read the current version from the record.
    pub fn read(&self) -> StoreResult<ReleaseVersion> {
        let raw = fs::read_to_string(&self.path).map_err(|e| StoreError::Read {
            path: self.path.clone(),
            source: e,
        })?;
        let record: Value = serde_json::from_str(&raw).map_err(|e| StoreError::Malformed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let version = record
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Malformed {
                path: self.path.clone(),
                reason: "missing `version` string key".to_string(),
            })?;
        Ok(ReleaseVersion::parse(version)?)
    }

    /// Write a version to the record, validating it for the given phase.
    ///
    /// Keys other than `version` survive the write. The record is created
    /// if it does not exist yet.
    pub fn write(&self, version: &ReleaseVersion, phase: Phase) -> StoreResult<()> {
        version.validate_for(phase)?;

        let mut record = match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| StoreError::Malformed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Value::Object(Default::default()),
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        let Some(object) = record.as_object_mut() else {
            return Err(StoreError::Malformed {
                path: self.path.clone(),
                reason: "not a JSON object".to_string(),
            });
        };
        object.insert("version".to_string(), Value::String(version.to_string()));

        let rendered = serde_json::to_string_pretty(&record).map_err(|e| StoreError::Malformed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        self.persist(&rendered)
    }

    /// Write content through a sibling temp file and a rename.
    fn persist(&self, content: &str) -> StoreResult<()> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        let dir = self.path.parent().unwrap_or_else(|| Utf8Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> VersionStore {
        let path = Utf8PathBuf::try_from(dir.path().join("pkg_info.json")).unwrap();
        VersionStore::new(path)
    }

    #[test]
    fn write_then_read_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        let v = ReleaseVersion::parse("0.1.0").unwrap();

        store.write(&v, Phase::Release).unwrap();
        assert_eq!(store.read().unwrap(), v);
    }

    #[test]
    fn unknown_keys_survive_writes() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        fs::write(
            store.path(),
            r#"{"name": "lantern", "version": "0.1.0.dev0"}"#,
        )
        .unwrap();

        let v = ReleaseVersion::parse("0.1.0").unwrap();
        store.write(&v, Phase::Release).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let record: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(record["name"], "lantern");
        assert_eq!(record["version"], "0.1.0");
    }

    #[test]
    fn missing_record_fails_to_read() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        assert!(matches!(store.read(), Err(StoreError::Read { .. })));
    }

    #[test]
    fn record_without_version_key_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        fs::write(store.path(), r#"{"name": "proj"}"#).unwrap();
        assert!(matches!(store.read(), Err(StoreError::Malformed { .. })));
    }

    #[test]
    fn record_with_bad_version_fails_the_grammar() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        fs::write(store.path(), r#"{"version": "not.a.version.at.all"}"#).unwrap();
        assert!(matches!(store.read(), Err(StoreError::Version(_))));
    }

    #[test]
    fn write_enforces_the_phase_policy() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);

        let dev = ReleaseVersion::parse("0.2.0.dev0").unwrap();
        let result = store.write(&dev, Phase::Release);
        assert!(matches!(result, Err(StoreError::Version(_))));
        // Nothing was persisted by the refused write
        assert!(!store.path().exists());

        let release = ReleaseVersion::parse("0.2.0").unwrap();
        assert!(store.write(&release, Phase::NextDev).is_err());
    }

    #[test]
    fn non_object_record_is_refused() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        fs::write(store.path(), "[1, 2, 3]").unwrap();

        let v = ReleaseVersion::parse("1.0.0").unwrap();
        assert!(matches!(
            store.write(&v, Phase::Release),
            Err(StoreError::Malformed { .. })
        ));
    }
}
