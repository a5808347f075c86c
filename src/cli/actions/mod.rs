pub mod account;
pub mod navigate;
pub mod payment;

// Internal "interpreter" for `Action`.
// The match lives in its own module so `mod.rs` stays small.
mod run;

#[derive(Debug)]
pub enum Action {
    Register(account::RegisterArgs),
    Login(account::LoginArgs),
    Visit(navigate::VisitArgs),
    Routes,
    RequestRole(account::RoleRequestArgs),
    Checkout(payment::CheckoutArgs),
    ConfirmPayment(payment::ConfirmArgs),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
