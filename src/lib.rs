//! # ScholarStream (portal session & access core)
//!
//! `scholarstream` is the client core of the ScholarStream scholarship portal.
//! Students browse scholarships, apply, pay and review; moderators triage
//! applications; admins manage scholarships, users and analytics. This crate
//! owns the part of the portal with real state: who is signed in, which role
//! they hold, and whether a requested view may be shown.
//!
//! ## Session
//!
//! The [`session::SessionManager`] bridges an external identity provider
//! (Firebase Authentication through [`identity::firebase::FirebaseProvider`])
//! into a single owned session value. It is the only writer; everything else
//! subscribes to snapshots.
//!
//! ## Roles
//!
//! The [`roles::RoleResolver`] maps the signed-in email to one of
//! `Student`, `Moderator` or `Admin` by asking the backend. Answers are cached
//! for a staleness window and failures always degrade to `Student`, never to an
//! elevated role.
//!
//! ## Route Gating
//!
//! [`routes::Router`] holds the portal's route table. Each route carries a
//! [`routes::RouteGuard`]; guards answer `Loading` until both the session and
//! the role are settled, so protected content is never shown early. The
//! backend stays the authority: gating here is navigation UX only.

pub mod api;
pub mod cli;
pub mod config;
pub mod features;
pub mod identity;
pub mod portal;
pub mod roles;
pub mod routes;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

pub use portal::Portal;
