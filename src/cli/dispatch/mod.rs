use crate::cli::actions::{
    Action,
    account::{self, Credentials},
    navigate, payment,
};
use crate::cli::commands::{
    ARG_APPLICATION, ARG_MESSAGE, ARG_NEXT, ARG_PATH, ARG_ROLE, ARG_SCHOLARSHIP_ID, ARG_SESSION_ID,
    ARG_UNPAID, CMD_CHECKOUT, CMD_CONFIRM_PAYMENT, CMD_LOGIN, CMD_REGISTER, CMD_REQUEST_ROLE,
    CMD_ROUTES, CMD_VISIT,
    credentials::{ARG_EMAIL, ARG_GOOGLE_ID_TOKEN, ARG_PASSWORD},
    portal::{
        ARG_API_URL, ARG_FIREBASE_API_KEY, ARG_IDENTITY_URL, ARG_REQUEST_TIMEOUT,
        ARG_ROLE_CACHE_TTL, ARG_TOKEN_URL,
    },
};
use crate::config::PortalConfig;
use crate::roles::Role;
use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;

const MISSING_CREDENTIALS: &str = "missing credentials: --email or --google-id-token";

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let config = portal_config(matches)?;

    match matches.subcommand() {
        Some((CMD_REGISTER, sub)) => Ok(Action::Register(account::RegisterArgs {
            config: require_api_key(config)?,
            email: required(sub, ARG_EMAIL)?,
            password: SecretString::from(required(sub, ARG_PASSWORD)?),
        })),
        Some((CMD_LOGIN, sub)) => Ok(Action::Login(account::LoginArgs {
            config: require_api_key(config)?,
            credentials: credentials(sub).context(MISSING_CREDENTIALS)?,
            next: sub.get_one::<String>(ARG_NEXT).cloned(),
        })),
        Some((CMD_VISIT, sub)) => {
            let credentials = credentials(sub);
            let config = if credentials.is_some() {
                require_api_key(config)?
            } else {
                config
            };
            Ok(Action::Visit(navigate::VisitArgs {
                config,
                credentials,
                path: required(sub, ARG_PATH)?,
            }))
        }
        Some((CMD_ROUTES, _)) => Ok(Action::Routes),
        Some((CMD_REQUEST_ROLE, sub)) => Ok(Action::RequestRole(account::RoleRequestArgs {
            config: require_api_key(config)?,
            credentials: credentials(sub).context(MISSING_CREDENTIALS)?,
            role: sub
                .get_one::<Role>(ARG_ROLE)
                .copied()
                .context("missing required argument: --role")?,
            message: sub.get_one::<String>(ARG_MESSAGE).cloned().unwrap_or_default(),
        })),
        Some((CMD_CHECKOUT, sub)) => Ok(Action::Checkout(payment::CheckoutArgs {
            config: require_api_key(config)?,
            credentials: credentials(sub).context(MISSING_CREDENTIALS)?,
            scholarship_id: required(sub, ARG_SCHOLARSHIP_ID)?,
            application: application(sub)?,
            unpaid: sub.get_flag(ARG_UNPAID),
        })),
        Some((CMD_CONFIRM_PAYMENT, sub)) => {
            let credentials = credentials(sub);
            let config = if credentials.is_some() {
                require_api_key(config)?
            } else {
                config
            };
            Ok(Action::ConfirmPayment(payment::ConfirmArgs {
                config,
                credentials,
                session_id: required(sub, ARG_SESSION_ID)?,
                application: application(sub)?,
            }))
        }
        Some((name, _)) => Err(anyhow!("unknown command: {name}")),
        None => Err(anyhow!("missing command")),
    }
}

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

fn portal_config(matches: &ArgMatches) -> Result<PortalConfig> {
    let api_key = matches
        .get_one::<String>(ARG_FIREBASE_API_KEY)
        .map(|key| key.trim().to_string())
        .unwrap_or_default();

    let mut config = PortalConfig::new(SecretString::from(api_key))
        .with_api_base_url(&required(matches, ARG_API_URL)?)
        .with_identity_base_url(&required(matches, ARG_IDENTITY_URL)?)
        .with_token_base_url(&required(matches, ARG_TOKEN_URL)?);

    if let Some(ttl) = matches.get_one::<u64>(ARG_ROLE_CACHE_TTL) {
        config = config.with_role_cache_ttl(Duration::from_secs(*ttl));
    }
    if let Some(timeout) = matches.get_one::<u64>(ARG_REQUEST_TIMEOUT) {
        config = config.with_request_timeout(Duration::from_secs(*timeout));
    }

    Ok(config)
}

fn require_api_key(config: PortalConfig) -> Result<PortalConfig> {
    if config.firebase_api_key.expose_secret().is_empty() {
        bail!("missing required argument: --{ARG_FIREBASE_API_KEY}");
    }
    Ok(config)
}

fn credentials(matches: &ArgMatches) -> Option<Credentials> {
    if let Some(token) = matches.get_one::<String>(ARG_GOOGLE_ID_TOKEN) {
        return Some(Credentials::Google {
            id_token: SecretString::from(token.clone()),
        });
    }
    let email = matches.get_one::<String>(ARG_EMAIL)?;
    let password = matches.get_one::<String>(ARG_PASSWORD)?;
    Some(Credentials::Password {
        email: email.clone(),
        password: SecretString::from(password.clone()),
    })
}

fn application(matches: &ArgMatches) -> Result<Value> {
    let raw = matches
        .get_one::<String>(ARG_APPLICATION)
        .map_or("{}", String::as_str);
    let value: Value = serde_json::from_str(raw).context("--application is not valid JSON")?;
    if !value.is_object() {
        bail!("--application must be a JSON object");
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::commands;

    const CLEAN_ENV: [(&str, Option<&str>); 7] = [
        ("SCHOLARSTREAM_API_URL", None),
        ("SCHOLARSTREAM_FIREBASE_API_KEY", None),
        ("SCHOLARSTREAM_IDENTITY_URL", None),
        ("SCHOLARSTREAM_TOKEN_URL", None),
        ("SCHOLARSTREAM_EMAIL", None),
        ("SCHOLARSTREAM_PASSWORD", None),
        ("SCHOLARSTREAM_GOOGLE_ID_TOKEN", None),
    ];

    fn dispatch(args: &[&str]) -> Result<Action> {
        let mut argv = vec!["scholarstream"];
        argv.extend_from_slice(args);
        let matches = commands::new().try_get_matches_from(argv).unwrap();
        handler(&matches)
    }

    #[test]
    fn login_with_password() {
        temp_env::with_vars(CLEAN_ENV, || {
            let action = dispatch(&[
                "--firebase-api-key",
                "key-123",
                "--api-url",
                "https://api.scholarstream.dev/",
                "--role-cache-ttl",
                "60",
                "login",
                "-e",
                "ada@uni.edu",
                "--password",
                "hunter22",
                "--next",
                "/checkout/9",
            ])
            .unwrap();

            let Action::Login(args) = action else {
                panic!("expected login");
            };
            assert_eq!(args.config.api_base_url, "https://api.scholarstream.dev");
            assert_eq!(args.config.firebase_api_key.expose_secret(), "key-123");
            assert_eq!(args.config.role_cache_ttl, Duration::from_secs(60));
            assert_eq!(args.next.as_deref(), Some("/checkout/9"));
            match args.credentials {
                Credentials::Password { email, password } => {
                    assert_eq!(email, "ada@uni.edu");
                    assert_eq!(password.expose_secret(), "hunter22");
                }
                Credentials::Google { .. } => panic!("expected password credentials"),
            }
        });
    }

    #[test]
    fn sign_in_commands_need_api_key() {
        temp_env::with_vars(CLEAN_ENV, || {
            let err = dispatch(&["login", "--google-id-token", "tok"]).unwrap_err();
            assert!(err.to_string().contains("--firebase-api-key"));

            let err = dispatch(&["visit", "/dashboard", "--google-id-token", "tok"]).unwrap_err();
            assert!(err.to_string().contains("--firebase-api-key"));
        });
    }

    #[test]
    fn anonymous_visit_needs_no_api_key() {
        temp_env::with_vars(CLEAN_ENV, || {
            let action = dispatch(&["visit", "/dashboard/admin/profile"]).unwrap();
            let Action::Visit(args) = action else {
                panic!("expected visit");
            };
            assert!(args.credentials.is_none());
            assert_eq!(args.path, "/dashboard/admin/profile");
        });
    }

    #[test]
    fn request_role_maps_role() {
        temp_env::with_vars(CLEAN_ENV, || {
            let action = dispatch(&[
                "--firebase-api-key",
                "key",
                "request-role",
                "--google-id-token",
                "tok",
                "--role",
                "Admin",
            ])
            .unwrap();
            let Action::RequestRole(args) = action else {
                panic!("expected request-role");
            };
            assert_eq!(args.role, Role::Admin);
            assert_eq!(args.message, "");
            assert!(matches!(args.credentials, Credentials::Google { .. }));
        });
    }

    #[test]
    fn checkout_parses_application() {
        temp_env::with_vars(CLEAN_ENV, || {
            let action = dispatch(&[
                "--firebase-api-key",
                "key",
                "checkout",
                "--google-id-token",
                "tok",
                "--scholarship-id",
                "s-1",
                "--application",
                r#"{"degree":"MSc"}"#,
                "--unpaid",
            ])
            .unwrap();
            let Action::Checkout(args) = action else {
                panic!("expected checkout");
            };
            assert_eq!(args.scholarship_id, "s-1");
            assert_eq!(args.application, serde_json::json!({ "degree": "MSc" }));
            assert!(args.unpaid);
        });
    }

    #[test]
    fn application_must_be_a_json_object() {
        temp_env::with_vars(CLEAN_ENV, || {
            let err = dispatch(&[
                "confirm-payment",
                "--session-id",
                "cs_1",
                "--application",
                "[1, 2]",
            ])
            .unwrap_err();
            assert!(err.to_string().contains("JSON object"));

            let err = dispatch(&[
                "confirm-payment",
                "--session-id",
                "cs_1",
                "--application",
                "{oops",
            ])
            .unwrap_err();
            assert!(err.to_string().contains("not valid JSON"));
        });
    }

    #[test]
    fn routes_needs_nothing() {
        temp_env::with_vars(CLEAN_ENV, || {
            assert!(matches!(dispatch(&["routes"]).unwrap(), Action::Routes));
        });
    }
}
