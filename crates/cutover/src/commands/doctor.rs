//! Doctor command — diagnose configuration and environment.

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use cutover_core::config::{self, Config};
use cutover_core::git;
use cutover_core::store::VersionStore;

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    config: ConfigStatus,
    project: ProjectStatus,
    repository: RepoStatus,
    tools: Vec<ToolStatus>,
    directories: DirectoryPaths,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Path to loaded config file, if any
    file: Option<String>,
    /// Whether a config file was found
    found: bool,
}

#[derive(Serialize)]
struct ProjectStatus {
    /// Path of the version record
    version_file: String,
    /// The recorded version, when readable
    version: Option<String>,
}

#[derive(Serialize)]
struct RepoStatus {
    /// Whether the working directory is inside a git repository
    inside: bool,
    /// Whether the working tree is clean, when inside a repository
    clean: Option<bool>,
    /// `owner/repo` from the origin remote, or the raw URL if unparseable
    remote: Option<String>,
}

#[derive(Serialize)]
struct ToolStatus {
    /// What the sequence uses the program for
    step: &'static str,
    /// The program named by the configured command
    program: String,
    /// Whether the program resolves on PATH
    found: bool,
    /// Resolved path, when found
    path: Option<String>,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    cache: Option<String>,
    data: Option<String>,
    data_local: Option<String>,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    /// Current working directory
    cwd: Option<String>,
    /// Relevant environment variables
    env_vars: Vec<EnvVar>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
    description: &'static str,
}

impl DoctorReport {
    fn gather(config: &Config, cwd: &camino::Utf8Path) -> Self {
        let config_file = config::find_project_config(cwd);
        let version_file = config.version_file(cwd);
        let version = VersionStore::new(version_file.clone())
            .read()
            .ok()
            .map(|v| v.to_string());

        Self {
            config: ConfigStatus {
                found: config_file.is_some(),
                file: config_file.map(|p| p.to_string()),
            },
            project: ProjectStatus {
                version_file: version_file.to_string(),
                version,
            },
            repository: gather_repo(),
            tools: gather_tools(config),
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                cache: config::user_cache_dir().map(|p| p.to_string()),
                data: config::user_data_dir().map(|p| p.to_string()),
                data_local: config::user_data_local_dir().map(|p| p.to_string()),
            },
            environment: EnvironmentInfo {
                cwd: Some(cwd.to_string()),
                env_vars: vec![
                    EnvVar {
                        name: "XDG_CONFIG_HOME",
                        value: std::env::var("XDG_CONFIG_HOME").ok(),
                        description: "Override config directory",
                    },
                    EnvVar {
                        name: "XDG_CACHE_HOME",
                        value: std::env::var("XDG_CACHE_HOME").ok(),
                        description: "Override cache directory",
                    },
                    EnvVar {
                        name: "XDG_DATA_HOME",
                        value: std::env::var("XDG_DATA_HOME").ok(),
                        description: "Override data directory",
                    },
                    EnvVar {
                        name: "RUST_LOG",
                        value: std::env::var("RUST_LOG").ok(),
                        description: "Log filter directive",
                    },
                    EnvVar {
                        name: "CUTOVER_LOG_PATH",
                        value: std::env::var("CUTOVER_LOG_PATH").ok(),
                        description: "Explicit log file path",
                    },
                    EnvVar {
                        name: "CUTOVER_LOG_DIR",
                        value: std::env::var("CUTOVER_LOG_DIR").ok(),
                        description: "Log directory override",
                    },
                ],
            },
        }
    }
}

/// Inspect the repository state the release sequence will run against.
///
/// Git operates on the process working directory, which the global `-C`
/// flag has already set.
fn gather_repo() -> RepoStatus {
    if !git::is_inside_repo().unwrap_or(false) {
        return RepoStatus {
            inside: false,
            clean: None,
            remote: None,
        };
    }

    let remote = git::remote_url("origin").ok().flatten().map(|url| {
        git::parse_owner_repo(&url).map_or(url, |(owner, repo)| format!("{owner}/{repo}"))
    });

    RepoStatus {
        inside: true,
        clean: git::is_clean().ok(),
        remote,
    }
}

/// Probe PATH for every program the configured sequence shells out to.
fn gather_tools(config: &Config) -> Vec<ToolStatus> {
    let steps = [
        ("build", config.build_command()),
        ("publish", config.publish_command()),
        ("release", config.release_command()),
        ("changelog", config.changelog_command()),
        // The sequencer itself shells out to these two.
        ("repository checks", "git"),
        ("docs archive", "tar"),
    ];

    steps
        .iter()
        .map(|(step, command)| probe_tool(step, command))
        .collect()
}

/// Resolve the program a command template starts with.
fn probe_tool(step: &'static str, command: &str) -> ToolStatus {
    let program = command
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();
    let path = which::which(&program).ok();

    ToolStatus {
        step,
        found: path.is_some(),
        path: path.map(|p| p.display().to_string()),
        program,
    }
}

/// Run diagnostics and report configuration status.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory
#[instrument(name = "cmd_doctor", skip_all, fields(json_output))]
pub fn cmd_doctor(
    _args: DoctorArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing doctor command");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("valid template"),
    );
    spinner.set_message("Gathering diagnostics...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let report = DoctorReport::gather(config, cwd);
    spinner.finish_and_clear();
    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        // Config status
        println!("{}", "Configuration".bold().underline());
        if report.config.found {
            println!(
                "  {} Config file: {}",
                "✓".green(),
                report.config.file.as_deref().unwrap_or("").cyan()
            );
        } else {
            println!("  {} No config file found", "○".yellow());
            offer_config_creation()?;
        }
        println!();

        // Project
        println!("{}", "Project".bold().underline());
        match report.project.version {
            Some(ref version) => println!(
                "  {} Version record: {} {}",
                "✓".green(),
                report.project.version_file.cyan(),
                format!("({version})").dimmed(),
            ),
            None => println!(
                "  {} Version record not readable: {}",
                "○".yellow(),
                report.project.version_file.cyan(),
            ),
        }
        println!();

        // Repository
        println!("{}", "Repository".bold().underline());
        if report.repository.inside {
            match report.repository.clean {
                Some(true) => println!("  {} Working tree clean", "✓".green()),
                Some(false) => {
                    println!("  {} Working tree has uncommitted changes", "○".yellow());
                }
                None => println!("  {} Working tree state unknown", "○".yellow()),
            }
            match report.repository.remote {
                Some(ref remote) => {
                    println!("  {} Remote: {}", "✓".green(), remote.cyan());
                }
                None => println!("  {} No origin remote configured", "○".yellow()),
            }
        } else {
            println!(
                "  {} Not inside a git repository {}",
                "✗".red(),
                "(releases need one)".dimmed()
            );
        }
        println!();

        // Tools
        println!("{}", "Tools".bold().underline());
        for tool in &report.tools {
            if tool.found {
                println!(
                    "  {} {}: {} {}",
                    "✓".green(),
                    tool.step.dimmed(),
                    tool.program,
                    format!("({})", tool.path.as_deref().unwrap_or("")).dimmed(),
                );
            } else {
                println!(
                    "  {} {}: {} {}",
                    "✗".red(),
                    tool.step.dimmed(),
                    tool.program,
                    "not found on PATH".yellow(),
                );
            }
        }
        println!();

        // Directories
        println!("{}", "Directories".bold().underline());
        print_dir("  Config", &report.directories.config);
        print_dir("  Cache", &report.directories.cache);
        print_dir("  Data", &report.directories.data);
        print_dir("  Data (local)", &report.directories.data_local);
        println!();

        // Environment
        println!("{}", "Environment".bold().underline());
        println!("  {}: {}", "Working directory".dimmed(), cwd.cyan());

        let set_vars: Vec<_> = report
            .environment
            .env_vars
            .iter()
            .filter(|v| v.value.is_some())
            .collect();

        if set_vars.is_empty() {
            println!("  {} No XDG/logging overrides set", "○".dimmed());
        } else {
            for var in set_vars {
                println!(
                    "  {}: {}",
                    var.name.dimmed(),
                    var.value.as_deref().unwrap_or("").cyan()
                );
            }
        }
    }

    Ok(())
}

fn print_dir(label: &str, path: &Option<String>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}

/// Offer to create a default config file when none exists.
fn offer_config_creation() -> anyhow::Result<()> {
    let Some(config_dir) = config::user_config_dir() else {
        return Ok(());
    };

    let config_path = config_dir.join("config.yaml");

    // Don't prompt if running non-interactively
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Ok(());
    }

    let create = Confirm::new("Create a default config file?")
        .with_default(false)
        .with_help_message(&format!("Will create {config_path}"))
        .prompt();

    match create {
        Ok(true) => {
            // Ensure directory exists
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            // Write default config as YAML
            let default_config = Config::default();
            let yaml = serde_saphyr::to_string(&default_config)?;
            std::fs::write(&config_path, yaml)?;

            println!("  {} Created {}", "✓".green(), config_path.cyan());
        }
        Ok(false) => {
            // User declined
        }
        Err(_) => {
            // Prompt interrupted (Ctrl+C, etc.)
        }
    }

    Ok(())
}
