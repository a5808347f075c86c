use clap::{Arg, ArgGroup, Command};

pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_GOOGLE_ID_TOKEN: &str = "google-id-token";

const GROUP: &str = "credentials";

/// Email/password or a Google ID token for the federated flow.
#[must_use]
pub fn with_args(command: Command, required: bool) -> Command {
    command
        .arg(
            Arg::new(ARG_EMAIL)
                .long(ARG_EMAIL)
                .short('e')
                .help("Account email")
                .env("SCHOLARSTREAM_EMAIL")
                .requires(ARG_PASSWORD),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Account password")
                .env("SCHOLARSTREAM_PASSWORD")
                .hide_env_values(true)
                .requires(ARG_EMAIL),
        )
        .arg(
            Arg::new(ARG_GOOGLE_ID_TOKEN)
                .long(ARG_GOOGLE_ID_TOKEN)
                .help("Google ID token obtained from a completed sign-in popup")
                .env("SCHOLARSTREAM_GOOGLE_ID_TOKEN")
                .hide_env_values(true)
                .conflicts_with_all([ARG_EMAIL, ARG_PASSWORD]),
        )
        .group(
            ArgGroup::new(GROUP)
                .args([ARG_EMAIL, ARG_GOOGLE_ID_TOKEN])
                .required(required),
        )
}

/// Registration only supports email and password.
#[must_use]
pub fn with_password_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_EMAIL)
                .long(ARG_EMAIL)
                .short('e')
                .help("Account email")
                .env("SCHOLARSTREAM_EMAIL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Account password (at least 6 characters)")
                .env("SCHOLARSTREAM_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
}
