//! GreenZone - backend of the GreenZone mobile app.
//!
//! Accounts live in Firebase Authentication; profiles and "bio" places
//! live in Postgres. The HTTP API is built with Axum.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **services**: Application use cases (auth, users, places)
//! - **infra**: Infrastructure concerns (database, Redis, identity provider)
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared response envelopes
//!
//! Domain entities live in the `domain` crate and the error taxonomy in
//! the `common` crate.
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! cargo run -- serve
//!
//! # Run migrations
//! cargo run -- migrate up
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::{create_router, AppState};
pub use common::{AppError, AppResult};
pub use config::Config;
pub use domain::{Place, Principal, User, UserRole};
