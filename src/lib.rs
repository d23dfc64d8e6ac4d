//! # Resource Recipe
//!
//! > **A hook-driven REST resource for `User`, built on `resource-framework`.**
//!
//! The framework crate owns the pipeline: every request walks
//! sanitize → validate → pre hooks → store → post hooks → transform → respond,
//! and any hook can stop it with an HTTP-style error. This crate is the
//! application on top: one entity, its hooks, a route table and the runtime
//! that wires them to the store actor.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Resource ([`user_api`])
//! - **Role**: Builds the six `User` handlers and registers their hooks.
//! - **Key items**: [`handlers`](user_api::handlers), [`RequireOwnerOrAdmin`](user_api::hooks::RequireOwnerOrAdmin).
//!
//! ### 2. The Router ([`routes`])
//! - **Role**: Maps `(method, path)` to a handler and extracts `:id` / `:format`.
//! - **Key items**: [`RouteTable`](routes::RouteTable).
//!
//! ### 3. The Orchestrator ([`lifecycle`])
//! - **Role**: Spawns the store actor, builds the handlers, shuts everything down.
//! - **Key items**: [`ApiSystem`](lifecycle::ApiSystem), [`shutdown`](lifecycle::ApiSystem::shutdown).
//!
//! ### 4. Configuration ([`config`])
//! Pipeline settings and store collections, read from TOML.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with pipeline transitions visible
//! RUST_LOG=debug cargo run
//!
//! # Use a custom configuration file
//! RESOURCE_RECIPE_CONFIG=./my-config.toml cargo run
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod routes;
pub mod user_api;
