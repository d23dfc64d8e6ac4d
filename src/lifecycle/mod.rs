//! # System Lifecycle
//!
//! Starts the store actor, wires the handlers into the route table, and tears
//! everything down again. Logging setup lives in
//! [`resource_framework::tracing`].

pub mod api_system;

pub use api_system::ApiSystem;
