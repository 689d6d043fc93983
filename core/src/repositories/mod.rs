//! Repository interfaces implemented by the infrastructure layer

pub mod token_repository;

pub use token_repository::{TokenRepository, TokenRotation};
