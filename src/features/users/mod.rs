pub mod client;
pub mod types;

pub use client::upsert_profile;
pub use types::UserProfile;
