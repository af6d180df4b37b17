//! HTTP controllers
//!
//! Routes are mounted under `/notifications` and `/api` by [`crate::server::routes`].

pub mod send;
pub mod subscribe;
pub mod unsubscribe;
pub mod vapid_public_key;
pub mod version;
