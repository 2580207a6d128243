//! Release version grammar and phase policy.
//!
//! Versions take the form `<major>.<minor>.<patch>` with an optional
//! `.devN` suffix marking an in-progress development cycle. A release is
//! cut by stripping the suffix; the cycle that follows bumps the minor
//! and re-attaches `.dev0`.

use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// The string does not match `<major>.<minor>.<patch>[.devN]`.
    #[error("invalid version {input:?}: {reason}")]
    Parse {
        /// The offending input.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The version violates the dev-suffix policy for its phase.
    #[error("{version} is not a valid {phase} version: {reason}")]
    Validation {
        /// The version that was checked.
        version: String,
        /// The phase it was checked against.
        phase: Phase,
        /// Which rule it broke.
        reason: String,
    },
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Which side of the release boundary a version sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// A published release. No dev suffix allowed.
    Release,
    /// The development cycle that follows a release. Dev suffix required.
    NextDev,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Release => write!(f, "release"),
            Self::NextDev => write!(f, "next-dev"),
        }
    }
}

/// A version string of the form `<major>.<minor>.<patch>[.devN]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    base: Version,
    dev: Option<u64>,
}

impl ReleaseVersion {
    /// Build a plain release version.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            base: Version::new(major, minor, patch),
            dev: None,
        }
    }

    /// Attach a dev suffix.
    #[must_use]
    pub const fn with_dev(mut self, n: u64) -> Self {
        self.dev = Some(n);
        self
    }

    /// Parse a version string, stripping an optional `v` prefix.
    pub fn parse(s: &str) -> VersionResult<Self> {
        let trimmed = s.strip_prefix('v').unwrap_or(s);
        let (base_str, dev) = match trimmed.rfind(".dev") {
            Some(idx) => {
                let digits = &trimmed[idx + 4..];
                let n = digits.parse::<u64>().map_err(|_| VersionError::Parse {
                    input: s.to_string(),
                    reason: "dev suffix must be `.dev` followed by digits".to_string(),
                })?;
                (&trimmed[..idx], Some(n))
            }
            None => (trimmed, None),
        };
        let base = Version::parse(base_str).map_err(|e| VersionError::Parse {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        if !base.pre.is_empty() || !base.build.is_empty() {
            return Err(VersionError::Parse {
                input: s.to_string(),
                reason: "pre-release and build metadata are not part of the grammar".to_string(),
            });
        }
        Ok(Self { base, dev })
    }

    /// Whether this version carries a dev suffix.
    pub const fn is_dev(&self) -> bool {
        self.dev.is_some()
    }

    /// The dev suffix number, if any.
    pub const fn dev_number(&self) -> Option<u64> {
        self.dev
    }

    /// Check the dev-suffix policy for a phase.
    ///
    /// A release version must not carry a dev suffix; a next-dev version
    /// must.
    pub fn validate_for(&self, phase: Phase) -> VersionResult<()> {
        match phase {
            Phase::Release if self.is_dev() => Err(VersionError::Validation {
                version: self.to_string(),
                phase,
                reason: "a release version must not carry a dev suffix".to_string(),
            }),
            Phase::NextDev if !self.is_dev() => Err(VersionError::Validation {
                version: self.to_string(),
                phase,
                reason: "a next-dev version must carry a dev suffix".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// The release this version is working toward: the dev suffix stripped.
    ///
    /// Already-released versions pass through unchanged.
    #[must_use]
    pub fn release_version(&self) -> Self {
        Self {
            base: self.base.clone(),
            dev: None,
        }
    }

    /// The development version that follows this release: minor bumped,
    /// patch reset, `.dev0` attached.
    #[must_use]
    pub fn next_dev_version(&self) -> Self {
        Self {
            base: Version::new(self.base.major, self.base.minor + 1, 0),
            dev: Some(0),
        }
    }

    /// The tag naming this version, e.g. `v1.2.0`.
    pub fn tag_name(&self, prefix: &str) -> String {
        format!("{prefix}{self}")
    }
}

impl std::fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)?;
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ReleaseVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ReleaseVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReleaseVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}
