//! Hydrolink write server library.
//!
//! Exposes the building blocks (config, write jobs, external writer, JSON
//! store, routes, WebSocket push) so integration tests and the binary
//! entrypoint can both access them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod router;
pub mod routes;
pub mod state;
pub mod store;
pub mod writer;
pub mod ws;
