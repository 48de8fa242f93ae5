//! Top-level CLI definition and dispatch.

use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Local;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;

use crate::cli::clean::{CleanupRequest, Collaborators, run_cleanup_sequence};
use crate::core::config::{Config, Paths};
use crate::core::context::{RUN_ID_FORMAT, RunOptions};
use crate::core::errors::{Result, TidyError};
use crate::executor::runner::SystemRunner;
use crate::gate::prompt::StdinPrompt;
use crate::logger::jsonl::JsonlLogger;
use crate::monitor::space::StatvfsProbe;
use crate::report::render::ReportDocument;
use crate::scanner::dedup::FamilySet;

/// TidyTux: organize downloads, retire stale archives and duplicate
/// scripts, and free space fast when the disk is nearly full.
#[derive(Debug, Parser)]
#[command(name = "tidytux", version, about)]
pub struct Cli {
    /// Approve every action without prompting.
    #[arg(short = 'y', long)]
    pub yes: bool,
    /// Force emergency mode regardless of free space.
    #[arg(short = 'e', long)]
    pub emergency: bool,
    /// Inspect and plan only; change nothing.
    #[arg(short = 'r', long = "report-only")]
    pub report_only: bool,
    /// No prompts and no non-error output (implies --yes).
    #[arg(short = 'q', long)]
    pub quiet: bool,
    /// Show per-action detail.
    #[arg(short = 'v', long)]
    pub verbose: bool,
    /// Directory to organize (default: ~/Downloads).
    #[arg(long, value_name = "DIR")]
    pub target: Option<PathBuf>,
    /// Where backups, logs and config live (default: ~/.tidytux).
    #[arg(long, value_name = "DIR")]
    pub config_root: Option<PathBuf>,
    /// Config file (default: <config-root>/config.toml).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Also run package, journal and container cleanup.
    #[arg(long)]
    pub system: bool,
    /// Also offer a system package upgrade.
    #[arg(long)]
    pub upgrade: bool,
    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
    /// Print a shell completion script and exit.
    #[arg(long, value_name = "SHELL")]
    pub completions: Option<Shell>,
}

impl Cli {
    const fn run_options(&self) -> RunOptions {
        RunOptions {
            yes: self.yes,
            emergency: self.emergency,
            report_only: self.report_only,
            quiet: self.quiet,
            verbose: self.verbose,
        }
    }
}

/// Dispatch the CLI.
///
/// # Errors
/// Returns the run's fatal error; the binary maps it to an exit code.
pub fn run(cli: &Cli) -> Result<()> {
    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "tidytux", &mut io::stdout());
        return Ok(());
    }

    // The only place the environment is consulted.
    let home = std::env::var_os("HOME").map(PathBuf::from);

    let paths = match (&cli.config_root, &home) {
        (Some(root), _) => Paths::new(root),
        (None, Some(home)) => Paths::for_home(home),
        (None, None) => {
            return Err(TidyError::InvalidConfig {
                details: "HOME is not set; pass --config-root".to_string(),
            });
        }
    };
    let defaults = home.as_deref().map(Config::for_home).unwrap_or_default();
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let config = Config::load(&config_path, cli.config.is_some(), defaults)?;

    let target = cli.target.clone().unwrap_or_else(|| config.scan.target.clone());
    if target.as_os_str().is_empty() {
        return Err(TidyError::InvalidConfig {
            details: "no target directory; pass --target or set [scan] target".to_string(),
        });
    }

    let mut system = config.system;
    system.tasks |= cli.system;
    system.upgrade |= cli.upgrade;

    let mut request = CleanupRequest::new(
        cli.run_options(),
        target,
        paths.backups_dir(),
        FamilySet::from_config(&config.dedup)?,
    );
    request.system = system;
    request.started_at = Local::now();

    let run_id = request.started_at.format(RUN_ID_FORMAT).to_string();
    let mut logger = JsonlLogger::open(&paths.logs_dir().join(format!("{run_id}.jsonl")));

    let console: Box<dyn Write> = if cli.quiet || cli.json {
        Box::new(io::sink())
    } else {
        Box::new(io::stdout())
    };

    let outcome = run_cleanup_sequence(
        &request,
        Collaborators {
            probe: &StatvfsProbe,
            runner: &SystemRunner,
            prompt: Box::new(StdinPrompt::new()),
            prompt_out: Box::new(io::stderr()),
            console,
            logger: &mut logger,
        },
    )?;

    let html_path = paths.logs_dir().join(format!("{run_id}.html"));
    if let Err(err) = std::fs::write(&html_path, outcome.report.to_html()) {
        eprintln!(
            "{} cannot write report to {}: {err}",
            "warning:".yellow().bold(),
            html_path.display()
        );
    }

    if cli.json {
        println!("{}", outcome.report.to_json()?);
    } else if !cli.quiet {
        print_report(&outcome.report, outcome.context.verbose);
        if outcome.context.verbose {
            println!("Report written to {}", html_path.display());
            if let Some(log) = logger.path() {
                println!("Activity log: {}", log.display());
            }
        }
    }
    Ok(())
}

fn print_report(report: &ReportDocument, verbose: bool) {
    let text = report.to_text(verbose);
    let mut section = "";
    for (index, line) in text.lines().enumerate() {
        if index == 0 {
            println!("{}", line.bold().cyan());
            continue;
        }
        if !line.starts_with(' ') {
            section = line;
        }
        if line.starts_with("Items cleaned") || line.starts_with("Space reclaimed") {
            println!("{}", line.green().bold());
        } else if section.starts_with("Skipped") {
            println!("{}", line.yellow());
        } else if section.starts_with("Planned") {
            println!("{}", line.dimmed());
        } else {
            println!("{line}");
        }
    }
}
