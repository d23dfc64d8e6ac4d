//! # Resource Framework
//!
//! This crate generates REST CRUD handlers for a named entity and runs every
//! request through an ordered lifecycle of user-registered hooks. The store is a
//! collaborator behind the [`Store`] trait; routing and error rendering stay with
//! the caller.
//!
//! ## Architecture Overview
//!
//! 1. **Hook Registry** ([`HookRegistry`]) - ordered callbacks keyed by event and stage
//! 2. **Query/Mutation Builder** ([`QueryBuilder`], [`QueryContext`]) - request to store operation
//! 3. **Pipeline Executor** ([`Pipeline`]) - the per-request state machine
//! 4. **Transform Engine** ([`TransformChain`]) - shapes result documents
//! 5. **Action Factory** ([`ResourceFactory`], [`ActionBuilder`], [`Handler`]) - the public entry point
//!
//! ## The Lifecycle
//!
//! ```text
//! sanitize → validate → pre(stage) → store call → post(stage) → transform → respond
//! ```
//!
//! The first error from any step ends the request with that error's status.
//! Hook lists are frozen when the handler is built, so concurrent requests only
//! ever read them.
//!
//! ## Quick Start
//!
//! ```rust
//! use resource_framework::{CollectionActor, Defaults, Request, ResourceFactory, Stage};
//! use resource_framework::{HookResult, QueryContext};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (actor, store) = CollectionActor::new(32);
//!     tokio::spawn(actor.run());
//!
//!     let factory = ResourceFactory::new(Arc::new(store), Arc::new(Defaults::default()));
//!     let users = factory.resource("User");
//!
//!     let create = users.create().to_handler();
//!     let mut index = users.index();
//!     index
//!         .pre(Stage::Query, |ctx: &mut QueryContext, _: &Request| -> HookResult {
//!             ctx.sort("-createdAt");
//!             Ok(())
//!         })
//!         .unwrap();
//!     let index = index.to_handler();
//!
//!     let body = json!({"name": "Ada", "password": "secret"});
//!     let created = create.call(Request::new().with_body(body)).await.unwrap();
//!     assert_eq!(created.status, 200);
//!     assert!(created.body.get("password").is_none());
//!
//!     let listed = index.call(Request::new()).await.unwrap();
//!     assert_eq!(listed.body.as_array().map(Vec::len), Some(1));
//! }
//! ```
//!
//! ## Testing
//!
//! [`mock::MockStore`] answers store calls from queued expectations and records
//! every operation, which makes it the spy for "the store was never reached".

pub mod action;
pub mod document;
pub mod error;
pub mod hooks;
pub mod mock;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod request;
pub mod resource;
pub mod settings;
pub mod store;
pub mod tracing;
pub mod transform;

pub use action::{ActionBuilder, Handler, ResourceFactory, ResourceScope};
pub use document::Document;
pub use error::{ConfigurationError, PipelineError, ValidationError};
pub use hooks::{
    FnHook, Hook, HookEvent, HookRegistry, HookResult, PostHook, PreHook, SanitizeHook,
    ValidateHook,
};
pub use pipeline::{Pipeline, PipelineState, Responder};
pub use query::{Projection, Query, QueryBuilder, QueryContext};
pub use report::ErrorReport;
pub use request::{Format, Request, Response};
pub use resource::{ActionKind, Method, ResourceDescriptor, Stage};
pub use settings::{Defaults, PipelineSettings};
pub use store::{
    CollectionActor, CollectionOptions, Operation, ResultSet, Store, StoreClient, StoreError,
};
pub use transform::{FnTransform, StripField, Transform, TransformChain};
