//! Run command — thin CLI layer over `cutover_core::sequencer`.

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use cutover_core::config::Config;
use cutover_core::sequencer::{
    DryRunReport, ReleasePlan, RunEvent, RunOptions, RunOutcome, Sequencer, StepOutcome,
};
use cutover_core::state::RunState;
use cutover_core::store::VersionStore;
use cutover_core::tools::{ShellTools, ShellToolsInit};

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Continue an interrupted run from its checkpoint
    #[arg(long)]
    pub resume: bool,

    /// Report step preconditions without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Execute the run command.
#[instrument(name = "cmd_run", skip_all)]
pub fn cmd_run(
    args: RunArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(
        json_output = global_json,
        resume = args.resume,
        dry_run = args.dry_run,
        "executing run command"
    );

    let plan = ReleasePlan::from_config(cwd, config);
    let tools = ShellTools::new(ShellToolsInit {
        root: plan.root.clone(),
        project: plan.project.clone(),
        build_command: config.build_command().to_string(),
        artifact_template: config.artifact_template().to_string(),
        publish_command: config.publish_command().to_string(),
        release_command: config.release_command().to_string(),
        changelog_command: config.changelog_command().to_string(),
        docs_dir: config.docs_dir(cwd),
    });

    if args.dry_run {
        let report = Sequencer::new(plan, tools)
            .dry_run()
            .context("release checks failed to run")?;
        display_dry_run(&report, global_json)?;
        if report.all_passed {
            return Ok(());
        }
        anyhow::bail!("release checks failed");
    }

    // Resolve what this run would release, for display only; the sequencer
    // re-validates once it runs.
    let checkpoint = RunState::load(&plan.state_path)?.filter(|state| !state.is_finished());
    let resuming = args.resume && checkpoint.is_some();
    let release = match checkpoint {
        Some(state) => state.version,
        None => VersionStore::new(plan.version_file.clone())
            .read()
            .context("cannot read the version record")?
            .release_version(),
    };
    let tag = plan.tag_for(&release);

    if !global_json {
        println!(
            "\n{}: {} {}",
            "Release".bold(),
            release.to_string().green().bold(),
            format!("({tag})").dimmed(),
        );
        if resuming {
            println!("{}", "Resuming from checkpoint.".yellow());
        }
        println!();
    }

    // Confirm before executing (unless scripted or stdin is not a terminal)
    if !global_json && !args.yes && std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        let confirmed = Confirm::new("Proceed with release?")
            .with_default(true)
            .prompt()
            .context("confirmation prompt failed")?;
        if !confirmed {
            println!("{}", "Release cancelled.".yellow());
            return Ok(());
        }
        println!();
    }

    let sequencer = Sequencer::new(plan, tools);
    let outcome = sequencer
        .run(RunOptions { resume: args.resume }, |event| {
            if !global_json {
                display_event(&event);
            }
        })
        .context("release failed")?;

    display_outcome(&outcome, global_json)
}

/// Render a sequencer event for terminal progress display.
fn display_event(event: &RunEvent) {
    match event {
        RunEvent::StepStarted(step) => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("  {spinner:.cyan} {msg}")
                    .expect("valid template")
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
            spinner.set_message(format!("{step}..."));
            // Steps are synchronous; the spinner shows briefly to indicate activity.
            spinner.finish_and_clear();
        }
        RunEvent::StepCompleted(step, outcome) => match outcome {
            StepOutcome::Success { message } => {
                println!(
                    "  {} {} {}",
                    "✓".green(),
                    step.to_string().bold(),
                    message.dimmed(),
                );
            }
            StepOutcome::Skipped { reason } => {
                println!(
                    "  {} {} {}",
                    "–".yellow(),
                    step.to_string().bold(),
                    format!("skipped: {reason}").dimmed(),
                );
            }
        },
        RunEvent::StepSkipped { step, reason } => {
            println!(
                "  {} {} {}",
                "–".yellow(),
                step.to_string().bold(),
                reason.dimmed(),
            );
        }
    }
}

/// Render the final run summary.
fn display_outcome(outcome: &RunOutcome, global_json: bool) -> anyhow::Result<()> {
    if global_json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    println!();
    let verb = if outcome.resumed {
        "Resumed and released"
    } else {
        "Released"
    };
    println!(
        "{} {} {} ({} steps)",
        "✓".green().bold(),
        verb,
        outcome.tag.green().bold(),
        outcome.steps.len(),
    );
    if let Some(ref url) = outcome.state.release_url {
        println!("  {}: {}", "Release".dimmed(), url.cyan());
    }
    println!(
        "  {}: {}",
        "Next development version".dimmed(),
        outcome.next_version,
    );
    Ok(())
}

/// Render a dry-run report.
fn display_dry_run(report: &DryRunReport, global_json: bool) -> anyhow::Result<()> {
    if global_json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("\n{}", "DRY RUN — no changes will be made".yellow().bold());
    println!(
        "\n{}: {} {}",
        "Release".bold(),
        report.version.to_string().green().bold(),
        format!("({})", report.tag).dimmed(),
    );
    if report.resuming {
        println!("{}", "Resuming from checkpoint.".yellow());
    }
    println!();

    for check in &report.checks {
        let icon = if check.passed {
            "✓".green().to_string()
        } else {
            "✗".red().to_string()
        };
        println!("  {icon} {}: {}", check.step.to_string().bold(), check.message);
    }

    println!();
    if report.all_passed {
        println!("  {}", "Ready to release!".green().bold());
    } else {
        let failed = report.checks.iter().filter(|c| !c.passed).count();
        println!(
            "  {} — fix issues above before releasing",
            format!("{failed} check(s) failed").red().bold(),
        );
    }
    Ok(())
}
