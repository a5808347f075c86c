//! Backend feature clients used around sign-in: the profile upsert after a
//! federated login, role-elevation requests and the payment hand-off. Each
//! feature keeps its wire types next to the request helpers and relies on the
//! backend for authorization.

pub mod payments;
pub mod role_requests;
pub mod users;
