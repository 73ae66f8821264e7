use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL, used as the exact CORS origin")
                .env("KC_AUTH_FRONTEND_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session TTL in seconds")
                .env("KC_AUTH_SESSION_TTL")
                .default_value("28800")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("fixed-sessions")
                .long("fixed-sessions")
                .help("Disable rolling session expiry; sessions end at creation time plus TTL")
                .env("KC_AUTH_FIXED_SESSIONS")
                .action(clap::ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Command {
        with_args(Command::new("test"))
    }

    #[test]
    fn defaults() {
        temp_env::with_vars(
            [
                ("KC_AUTH_FRONTEND_URL", None::<&str>),
                ("KC_AUTH_SESSION_TTL", None),
                ("KC_AUTH_FIXED_SESSIONS", None),
            ],
            || {
                let matches = command().get_matches_from(vec!["test"]);
                assert_eq!(
                    matches.get_one::<String>("frontend-base-url").cloned(),
                    Some("http://localhost:5173".to_string())
                );
                assert_eq!(
                    matches.get_one::<u64>("session-ttl-seconds").copied(),
                    Some(28_800)
                );
                assert!(!matches.get_flag("fixed-sessions"));
            },
        );
    }

    #[test]
    fn env_overrides() {
        temp_env::with_vars(
            [
                ("KC_AUTH_FRONTEND_URL", Some("https://chat.example.com")),
                ("KC_AUTH_SESSION_TTL", Some("3600")),
            ],
            || {
                let matches = command().get_matches_from(vec!["test"]);
                assert_eq!(
                    matches.get_one::<String>("frontend-base-url").cloned(),
                    Some("https://chat.example.com".to_string())
                );
                assert_eq!(
                    matches.get_one::<u64>("session-ttl-seconds").copied(),
                    Some(3600)
                );
            },
        );
    }
}
