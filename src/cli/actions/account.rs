use crate::config::PortalConfig;
use crate::identity::{FederatedCredential, Identity, PopupFlow};
use crate::portal::Portal;
use crate::roles::Role;
use crate::routes::login_return_target;
use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::debug;

const GOOGLE_PROVIDER_ID: &str = "google.com";

#[derive(Clone, Debug)]
pub enum Credentials {
    Password {
        email: String,
        password: SecretString,
    },
    /// ID token from a Google sign-in completed outside the CLI.
    Google { id_token: SecretString },
}

#[derive(Debug)]
pub struct RegisterArgs {
    pub config: PortalConfig,
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug)]
pub struct LoginArgs {
    pub config: PortalConfig,
    pub credentials: Credentials,
    pub next: Option<String>,
}

#[derive(Debug)]
pub struct RoleRequestArgs {
    pub config: PortalConfig,
    pub credentials: Credentials,
    pub role: Role,
    pub message: String,
}

/// Popup flow that hands back a credential obtained beforehand.
struct PresetCredential(FederatedCredential);

#[async_trait]
impl PopupFlow for PresetCredential {
    async fn open(&self) -> Option<FederatedCredential> {
        Some(self.0.clone())
    }
}

/// Builds the portal, wiring a Google token into the popup flow when given.
pub(crate) fn connect(config: &PortalConfig, credentials: Option<&Credentials>) -> Result<Portal> {
    debug!(?config, "connecting portal");
    let popup: Option<Arc<dyn PopupFlow>> = match credentials {
        Some(Credentials::Google { id_token }) => Some(Arc::new(PresetCredential(
            FederatedCredential {
                provider_id: GOOGLE_PROVIDER_ID.to_string(),
                id_token: id_token.clone(),
            },
        ))),
        _ => None,
    };
    Portal::from_config(config, popup).context("failed to set up the portal")
}

pub(crate) async fn sign_in(portal: &Portal, credentials: &Credentials) -> Result<Identity> {
    match credentials {
        Credentials::Password { email, password } => portal
            .session()
            .sign_in_with_password(email, password)
            .await
            .context("sign-in failed"),
        Credentials::Google { .. } => {
            let outcome = portal
                .sign_in_with_federated_provider()
                .await
                .context("Google sign-in failed")?;
            if let Err(err) = &outcome.profile_sync {
                eprintln!("warning: signed in, but the profile was not saved: {err}");
            }
            Ok(outcome.identity)
        }
    }
}

/// Execute the register action.
/// # Errors
/// Returns an error if the account cannot be created.
pub async fn register(args: RegisterArgs) -> Result<()> {
    let portal = connect(&args.config, None)?;
    let identity = portal
        .session()
        .register_with_password(&args.email, &args.password)
        .await
        .context("registration failed")?;

    let access = portal.settled_access().await;
    let role = access.authoritative_role().unwrap_or_default();
    println!("registered {} ({})", identity.email, identity.uid);
    println!("role: {role}");
    println!("dashboard: {}", role.dashboard_home());
    Ok(())
}

/// Execute the login action: sign in, then resolve where the portal goes next.
/// # Errors
/// Returns an error if sign-in fails.
pub async fn login(args: LoginArgs) -> Result<()> {
    let portal = connect(&args.config, Some(&args.credentials))?;
    let identity = sign_in(&portal, &args.credentials).await?;

    let target = login_return_target(args.next.as_deref());
    let navigation = portal.navigate(&target).await;
    let role = portal.access().authoritative_role().unwrap_or_default();

    println!("signed in as {} ({})", identity.email, identity.uid);
    println!("role: {role}");
    println!("{target} -> {navigation}");
    Ok(())
}

/// Execute the request-role action.
/// # Errors
/// Returns an error if sign-in or the request fails.
pub async fn request_role(args: RoleRequestArgs) -> Result<()> {
    let portal = connect(&args.config, Some(&args.credentials))?;
    let identity = sign_in(&portal, &args.credentials).await?;

    portal
        .request_role(args.role, &args.message)
        .await
        .context("role request failed")?;
    println!("requested {} for {}", args.role, identity.email);
    Ok(())
}
