//! # Collection Actor
//!
//! The server half of the in-memory store. It owns every collection and processes
//! [`StoreRequest`]s sequentially, so the documents need no locking: exclusive
//! ownership inside the task is the concurrency control.
//!
//! ## Document bookkeeping
//!
//! * **Insert** assigns `_id` (`<entity>_<n>`) unless one is supplied, sets `__v`
//!   to 0, and stamps `createdAt`/`updatedAt` unless supplied.
//! * **Update** rejects a supplied `__v` that differs from the stored one with
//!   [`StoreError::Conflict`], merges the remaining fields, bumps `__v` and
//!   refreshes `updatedAt`. `_id` and `createdAt` never change.
//! * Reads sort stably, so documents with equal sort keys keep insertion order.

use super::message::StoreRequest;
use super::{Operation, ResultSet, StoreClient, StoreError};
use crate::document::{Document, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD, VERSION_FIELD};
use crate::query::Query;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-collection behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionOptions {
    /// Fields left out of reads unless selected with `+field`.
    pub hidden_fields: Vec<String>,
}

#[derive(Debug, Default)]
struct Collection {
    docs: Vec<Document>,
    next_id: u64,
    options: CollectionOptions,
}

impl Collection {
    fn position(&self, query: &Query) -> Option<usize> {
        self.docs.iter().position(|doc| query.matches(doc))
    }

    fn generate_id(&mut self, entity: &str) -> String {
        let prefix = entity.to_lowercase();
        loop {
            self.next_id += 1;
            let id = format!("{prefix}_{}", self.next_id);
            if !self.docs.iter().any(|d| id_of(d) == Some(id.as_str())) {
                return id;
            }
        }
    }
}

fn id_of(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub struct CollectionActor {
    receiver: mpsc::Receiver<StoreRequest>,
    collections: HashMap<String, Collection>,
}

impl CollectionActor {
    /// Creates the actor and its client.
    ///
    /// `buffer_size` bounds the request channel; callers wait for space when full.
    pub fn new(buffer_size: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            collections: HashMap::new(),
        };
        (actor, StoreClient::new(sender))
    }

    /// Configures a collection before the actor starts.
    pub fn with_collection(mut self, entity: &str, options: CollectionOptions) -> Self {
        self.collections.entry(entity.to_string()).or_default().options = options;
        self
    }

    /// Processes requests until every client is dropped.
    pub async fn run(mut self) {
        info!(collections = self.collections.len(), "Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Execute {
                    entity,
                    operation,
                    respond_to,
                } => {
                    debug!(%entity, ?operation, "Execute");
                    let collection = self.collections.entry(entity.clone()).or_default();
                    let result = apply(collection, &entity, operation);
                    if let Err(e) = &result {
                        warn!(%entity, error = %e, "Operation failed");
                    }
                    let _ = respond_to.send(result);
                }
                StoreRequest::Clear { entity, respond_to } => {
                    let removed = self
                        .collections
                        .get_mut(&entity)
                        .map(|c| std::mem::take(&mut c.docs).len())
                        .unwrap_or(0);
                    info!(%entity, removed, "Cleared");
                    let _ = respond_to.send(removed);
                }
            }
        }

        let size: usize = self.collections.values().map(|c| c.docs.len()).sum();
        info!(size, "Store shutdown");
    }
}

fn apply(
    collection: &mut Collection,
    entity: &str,
    operation: Operation,
) -> Result<ResultSet, StoreError> {
    let hidden = collection.options.hidden_fields.clone();
    match operation {
        Operation::Find(query) => {
            let mut matches: Vec<&Document> =
                collection.docs.iter().filter(|d| query.matches(d)).collect();
            matches.sort_by(|a, b| query.compare(a, b));
            let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
            let limit = query
                .limit
                .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
                .unwrap_or(usize::MAX);
            let docs = matches
                .into_iter()
                .skip(skip)
                .take(limit)
                .map(|d| query.projection.apply(d, &hidden))
                .collect();
            Ok(ResultSet::Many(docs))
        }
        Operation::FindOne(query) => {
            let mut matches: Vec<&Document> =
                collection.docs.iter().filter(|d| query.matches(d)).collect();
            matches.sort_by(|a, b| query.compare(a, b));
            matches
                .first()
                .map(|d| ResultSet::One(query.projection.apply(d, &hidden)))
                .ok_or_else(|| not_found(entity, &query))
        }
        Operation::Count(query) => {
            let n = collection.docs.iter().filter(|d| query.matches(d)).count();
            Ok(ResultSet::Count(n as u64))
        }
        Operation::Insert {
            mut document,
            projection,
        } => {
            let id = match id_of(&document) {
                Some(id) if collection.docs.iter().any(|d| id_of(d) == Some(id)) => {
                    return Err(StoreError::Conflict(format!("{entity} {id} already exists")));
                }
                Some(id) => id.to_string(),
                None => collection.generate_id(entity),
            };
            let stamp = now();
            document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            document.insert(VERSION_FIELD.to_string(), Value::from(0));
            document
                .entry(CREATED_AT_FIELD)
                .or_insert_with(|| stamp.clone());
            document.entry(UPDATED_AT_FIELD).or_insert(stamp);

            let out = projection.apply(&document, &hidden);
            collection.docs.push(document);
            info!(%entity, %id, size = collection.docs.len(), "Inserted");
            Ok(ResultSet::One(out))
        }
        Operation::Update { query, mut changes } => {
            let idx = collection
                .position(&query)
                .ok_or_else(|| not_found(entity, &query))?;
            let doc = &mut collection.docs[idx];
            let current = doc.get(VERSION_FIELD).and_then(Value::as_u64).unwrap_or(0);
            if let Some(expected) = changes.remove(VERSION_FIELD) {
                if expected.as_u64() != Some(current) {
                    return Err(StoreError::Conflict(format!(
                        "{entity} {} is at version {current}, update expected {expected}",
                        id_of(doc).unwrap_or("?")
                    )));
                }
            }
            for (field, value) in changes {
                if field != ID_FIELD && field != CREATED_AT_FIELD {
                    doc.insert(field, value);
                }
            }
            doc.insert(VERSION_FIELD.to_string(), Value::from(current + 1));
            doc.insert(UPDATED_AT_FIELD.to_string(), now());
            info!(%entity, id = id_of(doc).unwrap_or("?"), version = current + 1, "Updated");
            Ok(ResultSet::One(query.projection.apply(doc, &hidden)))
        }
        Operation::Remove(query) => {
            let idx = collection
                .position(&query)
                .ok_or_else(|| not_found(entity, &query))?;
            let doc = collection.docs.remove(idx);
            info!(%entity, id = id_of(&doc).unwrap_or("?"), size = collection.docs.len(), "Removed");
            Ok(ResultSet::One(query.projection.apply(&doc, &hidden)))
        }
    }
}

fn not_found(entity: &str, query: &Query) -> StoreError {
    StoreError::NotFound(format!(
        "{entity} matching {}",
        Value::Object(query.filter.clone())
    ))
}
