//! The persistent changelog document.
//!
//! One section per version, newest first, keyed by a `## <version>` heading
//! (the `## [<version>] - <date>` flavor is recognized too). Generated
//! section text is spliced in under the document title; re-running an
//! update for a version replaces its section instead of duplicating it.

use std::fs;
use std::io::Write as _;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::state::iso_date_today;
use crate::version::ReleaseVersion;

/// Errors from changelog updates.
#[derive(Error, Debug)]
pub enum ChangelogError {
    /// The changelog could not be read.
    #[error("failed to read changelog {path}: {source}")]
    Read {
        /// Document path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The changelog could not be written.
    #[error("failed to write changelog {path}: {source}")]
    Write {
        /// Document path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for changelog operations.
pub type ChangelogResult<T> = Result<T, ChangelogError>;

/// Whether the document already carries a section for this version.
pub fn has_section(document: &str, version: &ReleaseVersion) -> bool {
    document
        .lines()
        .any(|line| heading_version(line).as_ref() == Some(version))
}

/// Whether the document at `path` carries a section for this version.
///
/// A missing document has no sections.
pub fn section_recorded(path: &Utf8Path, version: &ReleaseVersion) -> ChangelogResult<bool> {
    match fs::read_to_string(path) {
        Ok(document) => Ok(has_section(&document, version)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ChangelogError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Splice a version's section into the document.
///
/// The section lands under the title block, above all existing sections.
/// An existing section for the same version is replaced. Section text that
/// does not open with a heading for this version gets one, dated today.
pub fn upsert_section(document: &str, version: &ReleaseVersion, section: &str) -> String {
    let new_block = normalized_block(version, section);
    let (preamble, mut sections) = split_sections(document);

    sections.retain(|(v, _)| v.as_ref() != Some(version));
    sections.insert(0, (Some(version.clone()), new_block));

    let mut out = String::new();
    let preamble = preamble.trim_end();
    if preamble.is_empty() {
        out.push_str("# Changelog\n");
    } else {
        out.push_str(preamble);
        out.push('\n');
    }
    for (_, block) in &sections {
        out.push('\n');
        out.push_str(block.trim_end());
        out.push('\n');
    }
    out
}

/// Read-modify-write [`upsert_section`] against a document on disk.
///
/// The document is created (with a title) when absent. The write goes
/// through a sibling temp file and a rename.
pub fn update_file(
    path: &Utf8Path,
    version: &ReleaseVersion,
    section: &str,
) -> ChangelogResult<()> {
    let current = match fs::read_to_string(path) {
        Ok(document) => document,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(ChangelogError::Read {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let updated = upsert_section(&current, version, section);

    let write_err = |source| ChangelogError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(updated.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// The version a `## ` heading names, if it parses.
fn heading_version(line: &str) -> Option<ReleaseVersion> {
    let rest = line.strip_prefix("## ")?;
    let token = rest.split_whitespace().next()?;
    let token = token.trim_start_matches('[').trim_end_matches(']');
    ReleaseVersion::parse(token).ok()
}

/// Section text with a guaranteed heading for this version.
fn normalized_block(version: &ReleaseVersion, section: &str) -> String {
    let body = section.trim();
    let already_headed = body
        .lines()
        .next()
        .is_some_and(|line| heading_version(line).as_ref() == Some(version));
    if already_headed {
        format!("{body}\n")
    } else {
        format!("## {version} - {}\n\n{body}\n", iso_date_today())
    }
}

/// Split a document into its title block and `## `-headed sections.
fn split_sections(document: &str) -> (String, Vec<(Option<ReleaseVersion>, String)>) {
    let mut preamble = String::new();
    let mut sections: Vec<(Option<ReleaseVersion>, String)> = Vec::new();
    for line in document.lines() {
        if line.starts_with("## ") {
            sections.push((heading_version(line), format!("{line}\n")));
        } else if let Some((_, block)) = sections.last_mut() {
            block.push_str(line);
            block.push('\n');
        } else {
            preamble.push_str(line);
            preamble.push('\n');
        }
    }
    (preamble, sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn v(s: &str) -> ReleaseVersion {
        ReleaseVersion::parse(s).unwrap()
    }

    #[test]
    fn upsert_into_empty_document() {
        let doc = upsert_section("", &v("0.1.0"), "- first release");
        assert!(doc.starts_with("# Changelog\n"));
        assert!(has_section(&doc, &v("0.1.0")));
        assert!(doc.contains("- first release"));
    }

    #[test]
    fn new_section_lands_above_older_ones() {
        let existing = "# Changelog\n\n## 0.1.0 - 2026-01-10\n\n- old stuff\n";
        let doc = upsert_section(existing, &v("0.2.0"), "- new stuff");

        assert!(has_section(&doc, &v("0.1.0")));
        assert!(has_section(&doc, &v("0.2.0")));
        let newer = doc.find("## 0.2.0").unwrap();
        let older = doc.find("## 0.1.0").unwrap();
        assert!(newer < older);
    }

    #[test]
    fn same_version_replaces_instead_of_duplicating() {
        let first = upsert_section("", &v("0.2.0"), "- draft notes");
        let second = upsert_section(&first, &v("0.2.0"), "- final notes");

        assert_eq!(second.matches("## 0.2.0").count(), 1);
        assert!(second.contains("- final notes"));
        assert!(!second.contains("- draft notes"));
    }

    #[test]
    fn generator_supplied_heading_is_kept() {
        let section = "## [0.3.0] - 2026-02-01\n\n- generated upstream";
        let doc = upsert_section("", &v("0.3.0"), section);

        assert!(doc.contains("## [0.3.0] - 2026-02-01"));
        assert_eq!(doc.matches("0.3.0").count(), 1);
    }

    #[test]
    fn heading_match_is_exact() {
        let doc = "# Changelog\n\n## 0.1.0.dev0 - 2026-01-01\n\n- dev notes\n";
        assert!(has_section(doc, &v("0.1.0.dev0")));
        assert!(!has_section(doc, &v("0.1.0")));
    }

    #[test]
    fn bracketed_and_prefixed_headings_match() {
        let doc = "## [1.2.0] - 2026-01-01\n\n- a\n\n## v1.1.0\n\n- b\n";
        assert!(has_section(doc, &v("1.2.0")));
        assert!(has_section(doc, &v("1.1.0")));
    }

    #[test]
    fn update_file_creates_the_document() {
        let tmp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("CHANGELOG.md")).unwrap();

        update_file(&path, &v("0.1.0"), "- first release").unwrap();

        assert!(section_recorded(&path, &v("0.1.0")).unwrap());
        let doc = fs::read_to_string(&path).unwrap();
        assert!(doc.starts_with("# Changelog\n"));
    }

    #[test]
    fn section_recorded_is_false_for_missing_document() {
        let tmp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("CHANGELOG.md")).unwrap();
        assert!(!section_recorded(&path, &v("0.1.0")).unwrap());
    }
}
