#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Wire contracts shared by the coursepay server, its frontend and the
//! payment gateways that call back into it.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;

/// Header carrying the plaintext admin secret for the admin API.
pub const ADMIN_AUTH_HEADER: &str = "Coursepay-Admin-Authorization";
