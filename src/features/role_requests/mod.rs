pub mod client;
pub mod types;

pub use client::submit_role_request;
pub use types::RoleRequest;
