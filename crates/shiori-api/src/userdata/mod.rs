pub mod auth;
mod client;
mod error;

pub use client::UserDataClient;
pub use error::StoreError;
