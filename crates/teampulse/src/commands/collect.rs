//! Collect command — run a full collection and seal a snapshot.

use clap::Args;
use owo_colors::OwoColorize;
use serde_json::json;
use teampulse_core::CancellationToken;
use teampulse_core::error::PipelineError;
use teampulse_core::events::EventBus;
use teampulse_core::pipeline::{self, CollectionOptions, RunSummary};
use tracing::{debug, instrument};

use super::{EXIT_CANCELLED, EXIT_CONFIG, EXIT_OK, EXIT_UPSTREAM, resolve_environment};
use crate::terminal;

/// Arguments for the `collect` subcommand.
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Date range to collect: <N>d, YYYY, Q<N>-YYYY, or YYYY-MM-DD:YYYY-MM-DD
    #[arg(long = "date-range", value_name = "SPEC", default_value = "90d")]
    pub date_range: String,

    /// Tracker environment (default: $TEAM_METRICS_ENV, then "prod")
    #[arg(long, value_name = "NAME")]
    pub env: Option<String>,
}

/// Run a collection for the requested range and environment.
///
/// Exit codes: 0 success (including partial results with degraded
/// markers), 1 configuration/validation failure, 2 unrecoverable upstream
/// failure or blocked snapshot, 130 cancelled.
#[instrument(name = "cmd_collect", skip_all, fields(range = %args.date_range))]
pub fn cmd_collect(
    args: CollectArgs,
    global_json: bool,
    config: &teampulse_core::Config,
) -> anyhow::Result<u8> {
    let environment = resolve_environment(args.env.clone());
    let options = CollectionOptions {
        range_spec: args.date_range.clone(),
        environment: environment.clone(),
    };
    debug!(env = %environment, "starting collection");

    let runtime = tokio::runtime::Runtime::new()?;
    let cancel = CancellationToken::new();
    runtime.spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let bus = EventBus::new();
    let spinner = terminal::progress_spinner(&format!(
        "Collecting {} ({environment})...",
        args.date_range
    ));
    let result = runtime.block_on(pipeline::run_collection(config, &options, cancel, &bus));
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            report_summary(&summary, global_json);
            Ok(EXIT_OK)
        }
        Err(PipelineError::Cancelled) => {
            eprintln!("{}", "collection cancelled".yellow());
            Ok(EXIT_CANCELLED)
        }
        Err(err @ (PipelineError::Config(_) | PipelineError::Range(_))) => {
            eprintln!("{} {err}", "error:".red().bold());
            Ok(EXIT_CONFIG)
        }
        Err(err) => {
            // Startup and snapshot-gate failures: the run produced nothing
            // usable and any prior snapshot was preserved.
            eprintln!("{} {err}", "error:".red().bold());
            Ok(EXIT_UPSTREAM)
        }
    }
}

fn report_summary(summary: &RunSummary, global_json: bool) {
    if global_json {
        let payload = json!({
            "range": summary.range_label,
            "environment": summary.environment,
            "snapshot_path": summary.snapshot_path.as_str(),
            "teams": summary.teams,
            "records": {
                "prs": summary.pr_total,
                "commits": summary.commit_total,
                "issues": summary.issue_total,
                "deployments": summary.deployment_total,
            },
            "partial_results": summary.partial_results,
            "failures": summary.failures.iter().map(|f| json!({
                "team": f.team,
                "reason": f.reason,
            })).collect::<Vec<_>>(),
            "degraded": summary.degraded,
            "elapsed_seconds": summary.elapsed_seconds,
        });
        println!("{payload}");
        return;
    }

    println!(
        "{} {} ({})",
        "Collected".green().bold(),
        summary.range_label.cyan(),
        summary.environment.cyan()
    );
    println!("  {}", summary.summary_line());
    if !summary.degraded.is_empty() {
        println!(
            "  {} {}",
            "degraded:".yellow(),
            summary.degraded.join(", ")
        );
    }
    println!("  snapshot: {}", summary.snapshot_path.as_str().dimmed());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_range_is_90d() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: CollectArgs,
        }

        let wrapper = Wrapper::parse_from(["test"]);
        assert_eq!(wrapper.args.date_range, "90d");
        assert!(wrapper.args.env.is_none());
    }
}
