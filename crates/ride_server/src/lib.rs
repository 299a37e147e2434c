//! HTTP and WebSocket front end for the ride dispatch core.
//!
//! Handlers authenticate the caller, translate the request into one
//! `RideService` call, and map the outcome onto a status code. No dispatch
//! logic lives here.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
