//! Show command — read snapshots the dashboard would read.

use chrono::Utc;
use clap::Args;
use owo_colors::OwoColorize;
use teampulse_core::DateRange;
use teampulse_core::error::SnapshotError;
use teampulse_core::pipeline;
use teampulse_core::snapshot::SnapshotStore;
use tracing::instrument;

use super::{EXIT_CONFIG, EXIT_OK, resolve_environment};

/// Arguments for the `show` subcommand.
#[derive(Args, Debug, Default)]
pub struct ShowArgs {
    /// Date range of the snapshot to show; omit to list all snapshots
    #[arg(long = "date-range", value_name = "SPEC")]
    pub date_range: Option<String>,

    /// Tracker environment (default: $TEAM_METRICS_ENV, then "prod")
    #[arg(long, value_name = "NAME")]
    pub env: Option<String>,
}

/// Print one snapshot's comparison table, or list available snapshots.
#[instrument(name = "cmd_show", skip_all)]
pub fn cmd_show(
    args: ShowArgs,
    global_json: bool,
    config: &teampulse_core::Config,
) -> anyhow::Result<u8> {
    let store = SnapshotStore::new(pipeline::data_dir(config));

    let Some(spec) = args.date_range else {
        return list_snapshots(&store, global_json);
    };

    // Normalize the spec so `q1-2025` finds the `Q1-2025` snapshot
    let label = match DateRange::parse(&spec, Utc::now()) {
        Ok(range) => range.label().to_string(),
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            return Ok(EXIT_CONFIG);
        }
    };
    let environment = resolve_environment(args.env);

    let snapshot = match store.read(&label, &environment) {
        Ok(snapshot) => snapshot,
        Err(err @ SnapshotError::NotFound { .. }) => {
            eprintln!("{} {err}", "error:".red().bold());
            return Ok(EXIT_CONFIG);
        }
        Err(err) => return Err(err.into()),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(EXIT_OK);
    }

    println!(
        "{} {} ({}) collected {}",
        "Snapshot".bold(),
        snapshot.range_label.cyan(),
        snapshot.environment.cyan(),
        snapshot.timestamp.to_rfc3339().dimmed()
    );
    println!();
    println!(
        "  {:<20} {:>6} {:>8} {:>6} {:>10} {:>10}",
        "Team".bold(),
        "score".bold(),
        "level".bold(),
        "PRs".bold(),
        "resolved".bold(),
        "deploys/wk".bold()
    );
    for (name, summary) in &snapshot.comparison {
        println!(
            "  {:<20} {:>6.1} {:>8} {:>6} {:>10} {:>10.2}",
            name,
            summary.performance_score,
            summary.overall_level.to_string(),
            summary.pr_count,
            summary.throughput,
            summary.deployments_per_week,
        );
    }
    if !snapshot.diagnostics.errors.is_empty() {
        println!();
        println!(
            "  {} {} collection failures recorded",
            "!".yellow(),
            snapshot.diagnostics.errors.len()
        );
    }

    Ok(EXIT_OK)
}

fn list_snapshots(store: &SnapshotStore, global_json: bool) -> anyhow::Result<u8> {
    let entries = store.list()?;

    if global_json {
        let rows: Vec<_> = entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "range": e.range_label,
                    "environment": e.environment,
                    "timestamp": e.timestamp.to_rfc3339(),
                    "path": e.path.as_str(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(EXIT_OK);
    }

    if entries.is_empty() {
        println!("No snapshots yet. Run `teampulse collect` first.");
        return Ok(EXIT_OK);
    }

    println!("{}", "Snapshots".bold().underline());
    for entry in entries {
        println!(
            "  {:<24} {:<8} {}",
            entry.range_label.cyan(),
            entry.environment,
            entry.timestamp.to_rfc3339().dimmed()
        );
    }
    Ok(EXIT_OK)
}
