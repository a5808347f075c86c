use crate::config::{DEFAULT_API_BASE_URL, DEFAULT_IDENTITY_BASE_URL, DEFAULT_TOKEN_BASE_URL};
use clap::{Arg, Command};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_FIREBASE_API_KEY: &str = "firebase-api-key";
pub const ARG_IDENTITY_URL: &str = "identity-url";
pub const ARG_TOKEN_URL: &str = "token-url";
pub const ARG_ROLE_CACHE_TTL: &str = "role-cache-ttl";
pub const ARG_REQUEST_TIMEOUT: &str = "request-timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Portal backend base URL")
                .env("SCHOLARSTREAM_API_URL")
                .default_value(DEFAULT_API_BASE_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_FIREBASE_API_KEY)
                .long(ARG_FIREBASE_API_KEY)
                .help("Firebase Web API key (required to sign in)")
                .env("SCHOLARSTREAM_FIREBASE_API_KEY")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_IDENTITY_URL)
                .long(ARG_IDENTITY_URL)
                .help("Identity Toolkit base URL")
                .env("SCHOLARSTREAM_IDENTITY_URL")
                .default_value(DEFAULT_IDENTITY_BASE_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_URL)
                .long(ARG_TOKEN_URL)
                .help("Secure Token service base URL")
                .env("SCHOLARSTREAM_TOKEN_URL")
                .default_value(DEFAULT_TOKEN_BASE_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_ROLE_CACHE_TTL)
                .long(ARG_ROLE_CACHE_TTL)
                .help("Seconds a resolved role is reused before asking the backend again")
                .env("SCHOLARSTREAM_ROLE_CACHE_TTL")
                .default_value("300")
                .value_parser(clap::value_parser!(u64))
                .global(true),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT)
                .long(ARG_REQUEST_TIMEOUT)
                .help("Timeout in seconds for every outbound request")
                .env("SCHOLARSTREAM_REQUEST_TIMEOUT")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..))
                .global(true),
        )
}
