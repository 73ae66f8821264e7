use anyhow::Result;
use tracing::debug;
use url::Url;

use crate::api::{self, handlers::auth::AuthConfig};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub frontend_base_url: Url,
    pub session_ttl_seconds: u64,
    pub rolling_sessions: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("server args: {args:?}");

    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_rolling_sessions(args.rolling_sessions);

    api::new(args.port, args.dsn, auth_config).await
}
