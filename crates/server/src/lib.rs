//! HTTP surface for the transmute conversion service.
//!
//! The binary in `main.rs` wires configuration, the working directory and
//! the converter registry together; this library exposes the router so
//! integration tests can drive it in-process.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::AppState;
