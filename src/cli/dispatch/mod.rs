//! Map validated CLI arguments to the server action.

use anyhow::{Context, Result};
use url::Url;

use crate::cli::actions::{server::Args, Action};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches.get_one::<String>("dsn").cloned();

    let frontend_base_url = matches
        .get_one::<String>("frontend-base-url")
        .cloned()
        .context("missing required argument: --frontend-base-url")?;
    let frontend_base_url = Url::parse(&frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;

    let session_ttl_seconds = matches
        .get_one::<u64>("session-ttl-seconds")
        .copied()
        .unwrap_or(crate::api::handlers::auth::DEFAULT_SESSION_TTL_SECONDS);
    let rolling_sessions = !matches.get_flag("fixed-sessions");

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url,
        session_ttl_seconds,
        rolling_sessions,
    }))
}
