//! # Store Collaborator
//!
//! The pipeline never implements persistence. It hands an [`Operation`] built by
//! the query builder to a [`Store`] and gets back a [`ResultSet`] or a
//! [`StoreError`].
//!
//! This module also ships an in-memory implementation built on the actor pattern:
//! a [`CollectionActor`] owns every collection and processes requests one at a
//! time, and the cloneable [`StoreClient`] implements [`Store`] by message
//! passing. It is the store used by the demo application and the tests; a real
//! deployment swaps in its own `Store`.

pub mod actor;
pub mod client;
pub mod message;

pub use actor::{CollectionActor, CollectionOptions};
pub use client::StoreClient;
pub use message::{StoreRequest, StoreResponse};

use crate::document::Document;
use crate::query::{Projection, Query};
use async_trait::async_trait;
use std::time::Duration;

/// The descriptor of one store call.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Find(Query),
    FindOne(Query),
    Count(Query),
    Insert {
        document: Document,
        projection: Projection,
    },
    /// Applies `changes` to the first document matching `query`.
    Update { query: Query, changes: Document },
    /// Removes the first document matching `query` and returns it.
    Remove(Query),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Find(_) => "find",
            Operation::FindOne(_) => "find_one",
            Operation::Count(_) => "count",
            Operation::Insert { .. } => "insert",
            Operation::Update { .. } => "update",
            Operation::Remove(_) => "remove",
        }
    }
}

/// What a store call returns, shaped by the action kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSet {
    Many(Vec<Document>),
    One(Document),
    Count(u64),
}

impl ResultSet {
    /// Documents in the set; empty for a count.
    pub fn documents(&self) -> &[Document] {
        match self {
            ResultSet::Many(docs) => docs,
            ResultSet::One(doc) => std::slice::from_ref(doc),
            ResultSet::Count(_) => &[],
        }
    }

    pub fn documents_mut(&mut self) -> &mut [Document] {
        match self {
            ResultSet::Many(docs) => docs,
            ResultSet::One(doc) => std::slice::from_mut(doc),
            ResultSet::Count(_) => &mut [],
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            ResultSet::Count(n) => Some(*n),
            _ => None,
        }
    }
}

/// Errors raised by a store collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Version conflict: {0}")]
    Conflict(String),
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Store closed")]
    Closed,
    #[error("Store dropped response channel")]
    Dropped,
    #[error("Store backend error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        let message: String = message.into();
        StoreError::Backend(message.into())
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Performs `operation` against the collection for `entity`.
    async fn execute(&self, entity: &str, operation: Operation) -> Result<ResultSet, StoreError>;
}
