// headgate-api: Async Rust client for the Dhiever irrigation controller backend

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use error::Error;
