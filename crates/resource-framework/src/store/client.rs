//! # Store Client
//!
//! The cloneable handle to a running [`CollectionActor`](super::CollectionActor).

use super::message::StoreRequest;
use super::{Operation, ResultSet, Store, StoreError};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// Forwards store calls to the actor over an mpsc channel and awaits the reply on
/// a oneshot channel. Holds only a sender, so clones are cheap and every clone
/// talks to the same collections.
#[derive(Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    /// Removes every document of `entity`, returning how many were dropped.
    pub async fn clear(&self, entity: &str) -> Result<usize, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Clear {
                entity: entity.to_string(),
                respond_to,
            })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)
    }
}

#[async_trait]
impl Store for StoreClient {
    async fn execute(&self, entity: &str, operation: Operation) -> Result<ResultSet, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Execute {
                entity: entity.to_string(),
                operation,
                respond_to,
            })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }
}
