//! Remote document API access.

pub mod auth;
pub mod client;

pub use auth::{authenticate, login};
pub use client::ApiClient;
