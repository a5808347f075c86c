pub mod client;
pub mod types;

pub use client::{confirm_payment, create_checkout, save_unpaid};
pub use types::{CheckoutSession, PaymentConfirmation};
