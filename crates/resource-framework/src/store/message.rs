//! # Store Messages
//!
//! Messages exchanged between [`StoreClient`](super::StoreClient) and
//! [`CollectionActor`](super::CollectionActor).

use super::{Operation, ResultSet, StoreError};
use tokio::sync::oneshot;

/// One-shot channel the actor answers an execute request on.
pub type StoreResponse = oneshot::Sender<Result<ResultSet, StoreError>>;

#[derive(Debug)]
pub enum StoreRequest {
    Execute {
        entity: String,
        operation: Operation,
        respond_to: StoreResponse,
    },
    /// Drops every document of a collection; answers with how many were removed.
    Clear {
        entity: String,
        respond_to: oneshot::Sender<usize>,
    },
}
