use crate::cli::actions::account::{Credentials, connect, sign_in};
use crate::config::PortalConfig;
use crate::features::payments::{confirm_payment, create_checkout, save_unpaid};
use anyhow::{Context, Result, bail};
use serde_json::Value;

#[derive(Debug)]
pub struct CheckoutArgs {
    pub config: PortalConfig,
    pub credentials: Credentials,
    pub scholarship_id: String,
    pub application: Value,
    pub unpaid: bool,
}

#[derive(Debug)]
pub struct ConfirmArgs {
    pub config: PortalConfig,
    pub credentials: Option<Credentials>,
    pub session_id: String,
    pub application: Value,
}

/// Execute the checkout action, or save the application as unpaid.
/// # Errors
/// Returns an error if sign-in or the backend call fails.
pub async fn checkout(args: CheckoutArgs) -> Result<()> {
    let portal = connect(&args.config, Some(&args.credentials))?;
    sign_in(&portal, &args.credentials).await?;
    let bearer = portal.bearer().await?;

    if args.unpaid {
        save_unpaid(portal.api(), &bearer, &args.scholarship_id, &args.application)
            .await
            .context("failed to save the application")?;
        println!("application for {} saved as unpaid", args.scholarship_id);
        return Ok(());
    }

    let session = create_checkout(portal.api(), &bearer, &args.scholarship_id, &args.application)
        .await
        .context("failed to create a checkout session")?;
    println!("checkout session: {}", session.session_id);
    if let Some(url) = &session.url {
        println!("pay at: {url}");
    }
    Ok(())
}

/// Execute the confirm-payment action.
/// # Errors
/// Returns an error if the backend call fails or does not confirm the payment.
pub async fn confirm(args: ConfirmArgs) -> Result<()> {
    let portal = connect(&args.config, args.credentials.as_ref())?;
    let bearer = match &args.credentials {
        Some(credentials) => {
            sign_in(&portal, credentials).await?;
            Some(portal.bearer().await?)
        }
        None => None,
    };

    let confirmation = confirm_payment(
        portal.api(),
        bearer.as_ref(),
        &args.session_id,
        &args.application,
    )
    .await
    .context("failed to confirm the payment")?;

    let Some(application) = confirmation.confirmed_application() else {
        bail!("payment for session {} was not confirmed", args.session_id);
    };
    println!("{}", serde_json::to_string_pretty(application)?);
    Ok(())
}
