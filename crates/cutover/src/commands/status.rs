//! Status command — report the version record and any run checkpoint.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use cutover_core::config::{self, Config};
use cutover_core::sequencer::ReleasePlan;
use cutover_core::state::RunState;
use cutover_core::store::VersionStore;

/// Arguments for the `status` subcommand.
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct StatusReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    version_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<&'static str>,
    /// Why the version record could not be read, when it could not.
    #[serde(skip_serializing_if = "Option::is_none")]
    version_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checkpoint: Option<RunState>,
    /// Why the checkpoint could not be read, when it could not.
    #[serde(skip_serializing_if = "Option::is_none")]
    checkpoint_error: Option<String>,
}

impl StatusReport {
    fn gather(plan: &ReleasePlan, cwd: &camino::Utf8Path) -> Self {
        let (version, phase, version_error) =
            match VersionStore::new(plan.version_file.clone()).read() {
                Ok(version) => {
                    let phase = if version.is_dev() {
                        "development"
                    } else {
                        "release"
                    };
                    (Some(version.to_string()), Some(phase), None)
                }
                Err(err) => (None, None, Some(err.to_string())),
            };

        let (checkpoint, checkpoint_error) = match RunState::load(&plan.state_path) {
            Ok(found) => (found, None),
            Err(err) => (None, Some(err.to_string())),
        };

        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            version_file: plan.version_file.to_string(),
            version,
            phase,
            version_error,
            checkpoint,
            checkpoint_error,
        }
    }
}

/// Print the version record and checkpoint state.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory (the project root)
#[instrument(name = "cmd_status", skip_all, fields(json_output))]
pub fn cmd_status(
    _args: StatusArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing status command");

    let plan = ReleasePlan::from_config(cwd, config);
    let report = StatusReport::gather(&plan, cwd);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Version".bold().underline());
    println!("  {}: {}", "Record".dimmed(), report.version_file.cyan());
    match (&report.version, report.phase) {
        (Some(version), Some(phase)) => println!(
            "  {}: {} {}",
            "Version".dimmed(),
            version.green().bold(),
            format!("({phase})").dimmed(),
        ),
        _ => println!(
            "  {} {}",
            "○".yellow(),
            report
                .version_error
                .as_deref()
                .unwrap_or("no version recorded")
                .yellow(),
        ),
    }
    if let Some(ref path) = report.config_file {
        println!("  {}: {}", "Config file".dimmed(), path.cyan());
    }

    println!();
    println!("{}", "Checkpoint".bold().underline());
    match &report.checkpoint {
        None => match &report.checkpoint_error {
            Some(err) => println!("  {} {}", "!".yellow(), err.yellow()),
            None => println!("  {} No run in progress", "○".dimmed()),
        },
        Some(state) if state.is_finished() => {
            let completed = state.completed_at.as_deref().unwrap_or("");
            println!(
                "  {} Released {} {}",
                "✓".green(),
                state.version.to_string().bold(),
                format!("(completed {completed})").dimmed(),
            );
        }
        Some(state) => {
            println!(
                "  {} Run for {} reached {}",
                "!".yellow(),
                state.version.to_string().bold(),
                state.reached.to_string().cyan(),
            );
            println!("    {}", format!("started {}", state.started_at).dimmed());
            println!("    Resume with {}", "cutover run --resume".cyan());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutover_core::state::SequencerState;
    use cutover_core::version::ReleaseVersion;
    use std::fs;
    use tempfile::TempDir;

    fn utf8_root(tmp: &TempDir) -> camino::Utf8PathBuf {
        camino::Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 temp dir")
    }

    #[test]
    fn gather_reads_version_record() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        fs::write(root.join("pkg_info.json"), r#"{"version": "0.2.0.dev0"}"#).unwrap();

        let plan = ReleasePlan::from_config(&root, &Config::default());
        let report = StatusReport::gather(&plan, &root);

        assert_eq!(report.version.as_deref(), Some("0.2.0.dev0"));
        assert_eq!(report.phase, Some("development"));
        assert!(report.version_error.is_none());
        assert!(report.checkpoint.is_none());
    }

    #[test]
    fn gather_reports_missing_record() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);

        let plan = ReleasePlan::from_config(&root, &Config::default());
        let report = StatusReport::gather(&plan, &root);

        assert!(report.version.is_none());
        assert!(report.version_error.is_some());
    }

    #[test]
    fn gather_includes_unfinished_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        fs::write(root.join("pkg_info.json"), r#"{"version": "0.2.0"}"#).unwrap();

        let plan = ReleasePlan::from_config(&root, &Config::default());
        let mut state = RunState::begin(ReleaseVersion::new(0, 2, 0));
        state.advance(SequencerState::Built);
        state.save(&plan.state_path).unwrap();

        let report = StatusReport::gather(&plan, &root);
        let checkpoint = report.checkpoint.expect("checkpoint present");
        assert_eq!(checkpoint.reached, SequencerState::Built);
        assert!(!checkpoint.is_finished());
        assert_eq!(report.phase, Some("release"));
    }

    #[test]
    fn gather_surfaces_unreadable_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        fs::write(root.join("pkg_info.json"), r#"{"version": "0.2.0"}"#).unwrap();

        let plan = ReleasePlan::from_config(&root, &Config::default());
        fs::write(&plan.state_path, "{ not json").unwrap();

        let report = StatusReport::gather(&plan, &root);
        assert!(report.checkpoint.is_none());
        let error = report.checkpoint_error.expect("load failure reported");
        assert!(error.contains(".cutover-state.json"));
    }

    #[test]
    fn cmd_status_json_succeeds() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        assert!(cmd_status(StatusArgs::default(), true, &Config::default(), &root).is_ok());
    }

    #[test]
    fn cmd_status_text_succeeds() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_root(&tmp);
        fs::write(root.join("pkg_info.json"), r#"{"version": "1.0.0.dev2"}"#).unwrap();
        assert!(cmd_status(StatusArgs::default(), false, &Config::default(), &root).is_ok());
    }
}
