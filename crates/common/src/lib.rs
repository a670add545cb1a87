//! Shared types for the hdb-oauth workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
