//! Cryptographic primitives for emberchain

pub mod authorizer;
pub mod hash;

pub use authorizer::{Authorizer, KeypairAuthorizer, PlainAuthorizer};
pub use hash::Hash256;
