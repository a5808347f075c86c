use crate::cli::actions::account::{Credentials, connect, sign_in};
use crate::config::PortalConfig;
use crate::routes::Router;
use anyhow::Result;

#[derive(Debug)]
pub struct VisitArgs {
    pub config: PortalConfig,
    pub credentials: Option<Credentials>,
    pub path: String,
}

/// Execute the visit action: resolve one location, anonymously or signed in.
/// # Errors
/// Returns an error if the portal cannot be set up or sign-in fails.
pub async fn visit(args: VisitArgs) -> Result<()> {
    let portal = connect(&args.config, args.credentials.as_ref())?;
    if let Some(credentials) = &args.credentials {
        sign_in(&portal, credentials).await?;
    }

    let navigation = portal.navigate(&args.path).await;
    println!("{} -> {navigation}", args.path);
    Ok(())
}

/// Prints the route table with each route's guard.
pub fn routes() {
    print!("{}", route_table(&Router::new()));
}

fn route_table(router: &Router) -> String {
    let width = router
        .routes()
        .iter()
        .map(|route| route.pattern.len())
        .max()
        .unwrap_or(0);
    router
        .routes()
        .iter()
        .map(|route| format!("{:<width$}  {}\n", route.pattern, route.guard))
        .collect()
}
