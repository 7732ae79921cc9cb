//! Command implementations

pub mod collect;

pub mod doctor;

pub mod show;

/// Exit code for success, including partial results with degraded markers.
pub const EXIT_OK: u8 = 0;

/// Exit code for configuration or validation failures.
pub const EXIT_CONFIG: u8 = 1;

/// Exit code for unrecoverable upstream failures after all retries.
pub const EXIT_UPSTREAM: u8 = 2;

/// Exit code for cooperative cancellation (SIGINT convention).
pub const EXIT_CANCELLED: u8 = 130;

/// Resolve the tracker environment: flag, then `TEAM_METRICS_ENV`, then
/// `prod`.
pub fn resolve_environment(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("TEAM_METRICS_ENV").ok())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "prod".to_string())
}
