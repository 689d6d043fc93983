//! OAuth refresh coordination module
//!
//! De-duplicates concurrent upstream OAuth refreshes per identity and
//! revokes the bound session token when a refresh permanently fails.

mod singleflight;
mod sync;

#[cfg(test)]
mod tests;

pub use singleflight::Group;
pub use sync::{OAuthTokenRefresher, OAuthTokenSync, SessionRevoker, REFRESH_TIMEOUT};
