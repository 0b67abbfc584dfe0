//! Docker volume plugin HTTP API.

pub mod error;
pub mod extract;
pub mod server;
pub mod types;
