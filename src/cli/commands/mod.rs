pub mod credentials;
pub mod logging;
pub mod portal;

use crate::roles::Role;
use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::{
        PossibleValuesParser, TypedValueParser,
        styling::{AnsiColor, Effects, Styles},
    },
};

pub const CMD_REGISTER: &str = "register";
pub const CMD_LOGIN: &str = "login";
pub const CMD_VISIT: &str = "visit";
pub const CMD_ROUTES: &str = "routes";
pub const CMD_REQUEST_ROLE: &str = "request-role";
pub const CMD_CHECKOUT: &str = "checkout";
pub const CMD_CONFIRM_PAYMENT: &str = "confirm-payment";

pub const ARG_NEXT: &str = "next";
pub const ARG_PATH: &str = "path";
pub const ARG_ROLE: &str = "role";
pub const ARG_MESSAGE: &str = "message";
pub const ARG_SCHOLARSHIP_ID: &str = "scholarship-id";
pub const ARG_SESSION_ID: &str = "session-id";
pub const ARG_APPLICATION: &str = "application";
pub const ARG_UNPAID: &str = "unpaid";

fn application_arg() -> Arg {
    Arg::new(ARG_APPLICATION)
        .long(ARG_APPLICATION)
        .help("Application data as a JSON object")
        .default_value("{}")
}

fn subcommands() -> Vec<Command> {
    vec![
        credentials::with_password_args(
            Command::new(CMD_REGISTER).about("Create an account and sign in"),
        ),
        credentials::with_args(
            Command::new(CMD_LOGIN)
                .about("Sign in and report where the portal sends you")
                .arg(
                    Arg::new(ARG_NEXT)
                        .long(ARG_NEXT)
                        .help("Location to return to after signing in"),
                ),
            true,
        ),
        credentials::with_args(
            Command::new(CMD_VISIT)
                .about("Resolve a portal location, optionally signed in")
                .arg(
                    Arg::new(ARG_PATH)
                        .help("Location to visit, e.g. /dashboard/admin/profile")
                        .required(true),
                ),
            false,
        ),
        Command::new(CMD_ROUTES).about("List the route table and its guards"),
        credentials::with_args(
            Command::new(CMD_REQUEST_ROLE)
                .about("Ask an admin for a higher role")
                .arg(
                    Arg::new(ARG_ROLE)
                        .long(ARG_ROLE)
                        .help("Role to request")
                        .required(true)
                        .value_parser(
                            PossibleValuesParser::new([Role::Moderator.as_str(), Role::Admin.as_str()])
                                .map(|value| Role::parse(&value)),
                        ),
                )
                .arg(
                    Arg::new(ARG_MESSAGE)
                        .long(ARG_MESSAGE)
                        .short('m')
                        .help("Why the role is needed")
                        .default_value(""),
                ),
            true,
        ),
        credentials::with_args(
            Command::new(CMD_CHECKOUT)
                .about("Open a payment checkout session for an application")
                .arg(
                    Arg::new(ARG_SCHOLARSHIP_ID)
                        .long(ARG_SCHOLARSHIP_ID)
                        .help("Scholarship to apply for")
                        .required(true),
                )
                .arg(application_arg())
                .arg(
                    Arg::new(ARG_UNPAID)
                        .long(ARG_UNPAID)
                        .help("Save the application as unpaid instead of paying now")
                        .action(ArgAction::SetTrue),
                ),
            true,
        ),
        credentials::with_args(
            Command::new(CMD_CONFIRM_PAYMENT)
                .about("Confirm a completed checkout session")
                .arg(
                    Arg::new(ARG_SESSION_ID)
                        .long(ARG_SESSION_ID)
                        .help("Checkout session id returned to the success page")
                        .required(true),
                )
                .arg(application_arg()),
            false,
        ),
    ]
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("scholarstream")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommands(subcommands());

    let command = portal::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::commands::{
        credentials::{ARG_EMAIL, ARG_PASSWORD},
        logging::ARG_VERBOSITY,
        portal::{ARG_API_URL, ARG_FIREBASE_API_KEY, ARG_REQUEST_TIMEOUT, ARG_ROLE_CACHE_TTL},
    };

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "scholarstream");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        command.debug_assert();
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("SCHOLARSTREAM_API_URL", None::<&str>),
                ("SCHOLARSTREAM_ROLE_CACHE_TTL", None),
                ("SCHOLARSTREAM_REQUEST_TIMEOUT", None),
                ("SCHOLARSTREAM_LOG_LEVEL", None),
            ],
            || {
                let matches = new().get_matches_from(vec!["scholarstream", "routes"]);
                assert_eq!(
                    matches.get_one::<String>(ARG_API_URL).cloned(),
                    Some("http://localhost:3000".to_string())
                );
                assert_eq!(matches.get_one::<u64>(ARG_ROLE_CACHE_TTL).copied(), Some(300));
                assert_eq!(matches.get_one::<u64>(ARG_REQUEST_TIMEOUT).copied(), Some(10));
                assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(0));
                assert_eq!(matches.subcommand_name(), Some(CMD_ROUTES));
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("SCHOLARSTREAM_API_URL", Some("https://api.scholarstream.dev")),
                ("SCHOLARSTREAM_FIREBASE_API_KEY", Some("key-123")),
                ("SCHOLARSTREAM_ROLE_CACHE_TTL", Some("60")),
                ("SCHOLARSTREAM_EMAIL", Some("ada@uni.edu")),
                ("SCHOLARSTREAM_PASSWORD", Some("hunter22")),
                ("SCHOLARSTREAM_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["scholarstream", "login"]);
                assert_eq!(
                    matches.get_one::<String>(ARG_API_URL).cloned(),
                    Some("https://api.scholarstream.dev".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(ARG_FIREBASE_API_KEY).cloned(),
                    Some("key-123".to_string())
                );
                assert_eq!(matches.get_one::<u64>(ARG_ROLE_CACHE_TTL).copied(), Some(60));
                assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(2));

                let (_, login) = matches.subcommand().unwrap();
                assert_eq!(
                    login.get_one::<String>(ARG_EMAIL).cloned(),
                    Some("ada@uni.edu".to_string())
                );
                assert_eq!(
                    login.get_one::<String>(ARG_PASSWORD).cloned(),
                    Some("hunter22".to_string())
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("SCHOLARSTREAM_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["scholarstream", "routes"]);
                assert_eq!(
                    matches.get_one::<u8>(ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_usize {
            temp_env::with_vars([("SCHOLARSTREAM_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["scholarstream".to_string(), "routes".to_string()];
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }
                let matches = new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>(ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_login_requires_credentials() {
        temp_env::with_vars(
            [
                ("SCHOLARSTREAM_EMAIL", None::<&str>),
                ("SCHOLARSTREAM_PASSWORD", None),
                ("SCHOLARSTREAM_GOOGLE_ID_TOKEN", None),
            ],
            || {
                assert!(new().try_get_matches_from(vec!["scholarstream", "login"]).is_err());
                assert!(
                    new()
                        .try_get_matches_from(vec!["scholarstream", "login", "--email", "a@b.io"])
                        .is_err()
                );
                assert!(
                    new()
                        .try_get_matches_from(vec![
                            "scholarstream",
                            "login",
                            "--google-id-token",
                            "tok",
                            "--email",
                            "a@b.io",
                            "--password",
                            "secret1"
                        ])
                        .is_err()
                );
                assert!(
                    new()
                        .try_get_matches_from(vec!["scholarstream", "login", "--google-id-token", "tok"])
                        .is_ok()
                );
                assert!(
                    new()
                        .try_get_matches_from(vec!["scholarstream", "visit", "/"])
                        .is_ok()
                );
            },
        );
    }

    #[test]
    fn test_request_role_values() {
        temp_env::with_vars([("SCHOLARSTREAM_GOOGLE_ID_TOKEN", Some("tok"))], || {
            let matches = new().get_matches_from(vec![
                "scholarstream",
                "request-role",
                "--role",
                "Moderator",
                "-m",
                "I review weekly",
            ]);
            let (_, sub) = matches.subcommand().unwrap();
            assert_eq!(sub.get_one::<Role>(ARG_ROLE).copied(), Some(Role::Moderator));
            assert_eq!(
                sub.get_one::<String>(ARG_MESSAGE).cloned(),
                Some("I review weekly".to_string())
            );

            assert!(
                new()
                    .try_get_matches_from(vec!["scholarstream", "request-role", "--role", "Student"])
                    .is_err()
            );
        });
    }

    #[test]
    fn test_global_args_after_subcommand() {
        temp_env::with_vars([("SCHOLARSTREAM_API_URL", None::<&str>)], || {
            let matches = new().get_matches_from(vec![
                "scholarstream",
                "visit",
                "/dashboard",
                "--api-url",
                "http://127.0.0.1:9000",
            ]);
            assert_eq!(
                matches.get_one::<String>(ARG_API_URL).cloned(),
                Some("http://127.0.0.1:9000".to_string())
            );
        });
    }
}
