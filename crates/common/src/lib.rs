//! Common types for the back-office session client

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
