//! Doctor command — diagnose configuration and environment.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use teampulse_core::config;
use tracing::{debug, instrument};

use crate::terminal;

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    directories: DirectoryPaths,
    config: ConfigStatus,
    teams: Vec<TeamStatus>,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    cache: Option<String>,
    data: Option<String>,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Path to loaded config file, if any
    file: Option<String>,
    /// Whether a config file was found
    found: bool,
    /// First validation failure, if the loaded config is not collectable
    validation_error: Option<String>,
    /// Configured tracker environments
    tracker_environments: Vec<String>,
}

#[derive(Serialize)]
struct TeamStatus {
    name: String,
    members: usize,
    /// Standard filters (`wip`, `bugs`, `completed`, `incidents`) that are
    /// not configured. Missing `incidents` makes CFR/MTTR unavailable.
    missing_filters: Vec<&'static str>,
    has_repo_selector: bool,
    project_keys: usize,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    cwd: Option<String>,
    env_vars: Vec<EnvVar>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
    description: &'static str,
}

impl DoctorReport {
    fn gather(loaded: &teampulse_core::Config, cwd: &camino::Utf8Path) -> Self {
        let config_file = config::find_project_config(cwd);

        let teams = loaded
            .teams
            .iter()
            .map(|team| {
                let missing_filters = ["wip", "bugs", "completed", "incidents"]
                    .into_iter()
                    .filter(|key| !team.filter_ids.contains_key(*key))
                    .collect();
                TeamStatus {
                    name: team.name.clone(),
                    members: team.members.len(),
                    missing_filters,
                    has_repo_selector: !team.repo_selector.is_empty(),
                    project_keys: team.project_keys.len(),
                }
            })
            .collect();

        Self {
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                cache: config::user_cache_dir().map(|p| p.to_string()),
                data: config::user_data_dir().map(|p| p.to_string()),
            },
            config: ConfigStatus {
                found: config_file.is_some(),
                file: config_file.map(|p| p.to_string()),
                validation_error: loaded.validate().err().map(|e| e.to_string()),
                tracker_environments: loaded.tracker.environments.keys().cloned().collect(),
            },
            teams,
            environment: EnvironmentInfo {
                cwd: Some(cwd.to_string()),
                env_vars: vec![
                    EnvVar {
                        name: "TEAM_METRICS_ENV",
                        value: std::env::var("TEAM_METRICS_ENV").ok(),
                        description: "Default tracker environment",
                    },
                    EnvVar {
                        name: "RUST_LOG",
                        value: std::env::var("RUST_LOG").ok(),
                        description: "Log filter directive",
                    },
                    EnvVar {
                        name: "TEAMPULSE_LOG_PATH",
                        value: std::env::var("TEAMPULSE_LOG_PATH").ok(),
                        description: "Explicit log file path",
                    },
                    EnvVar {
                        name: "TEAMPULSE_LOG_DIR",
                        value: std::env::var("TEAMPULSE_LOG_DIR").ok(),
                        description: "Log directory",
                    },
                ],
            },
        }
    }
}

/// Run diagnostics and report configuration status.
#[instrument(name = "cmd_doctor", skip_all, fields(json_output = global_json))]
pub fn cmd_doctor(
    _args: DoctorArgs,
    global_json: bool,
    config: &teampulse_core::Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<u8> {
    debug!("executing doctor command");

    let spinner = terminal::progress_spinner("Gathering diagnostics...");
    let report = DoctorReport::gather(config, cwd);
    spinner.finish_and_clear();

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(super::EXIT_OK);
    }

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
    }
    match &report.config.validation_error {
        None => println!("  {} Configuration is collectable", "✓".green()),
        Some(error) => println!("  {} {}", "✗".red(), error.red()),
    }
    if report.config.tracker_environments.is_empty() {
        println!("  {} No tracker environments configured", "○".yellow());
    } else {
        println!(
            "  {}: {}",
            "Tracker environments".dimmed(),
            report.config.tracker_environments.join(", ").cyan()
        );
    }
    println!();

    // Teams
    println!("{}", "Teams".bold().underline());
    if report.teams.is_empty() {
        println!("  {} No teams configured", "○".yellow());
    }
    for team in &report.teams {
        if team.missing_filters.is_empty() {
            println!(
                "  {} {} ({} members)",
                "✓".green(),
                team.name.cyan(),
                team.members
            );
        } else {
            println!(
                "  {} {} ({} members) missing filters: {}",
                "○".yellow(),
                team.name.cyan(),
                team.members,
                team.missing_filters.join(", ").yellow()
            );
        }
        if !team.has_repo_selector {
            println!(
                "      {}",
                "no repo selector: team will collect zero repositories".yellow()
            );
        }
    }
    println!();

    // Directories
    println!("{}", "Directories".bold().underline());
    print_dir("  Config", &report.directories.config);
    print_dir("  Cache", &report.directories.cache);
    print_dir("  Data", &report.directories.data);
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
        println!("  {} No environment overrides set", "○".dimmed());
    } else {
        for var in set_vars {
            println!(
                "  {}: {}",
                var.name.dimmed(),
                var.value.as_deref().unwrap_or("").cyan()
            );
        }
    }

    Ok(super::EXIT_OK)
}

fn print_dir(label: &str, path: &Option<String>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}
