//! Vestibule Core - Shared types and configuration for the Vestibule client
//!
//! This crate defines the data model (credentials, principals, session
//! states), the unified error type, API configuration, and logging setup
//! shared by the client SDK and the CLI.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use tracing;
