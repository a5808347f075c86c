use crate::cli::actions::{Action, account, navigate, payment};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Register(args) => account::register(args).await,
        Action::Login(args) => account::login(args).await,
        Action::Visit(args) => navigate::visit(args).await,
        Action::Routes => {
            navigate::routes();
            Ok(())
        }
        Action::RequestRole(args) => account::request_role(args).await,
        Action::Checkout(args) => payment::checkout(args).await,
        Action::ConfirmPayment(args) => payment::confirm(args).await,
    }
}
