//! # Mock Store & Testing Guide
//!
//! [`MockStore`] implements [`Store`] entirely in memory. Instead of holding
//! documents it replays queued expectations, so a test decides exactly what each
//! store call returns and can assert afterwards which operations the pipeline
//! issued.
//!
//! ## When to use the mock vs the collection actor
//!
//! | Feature | MockStore | CollectionActor |
//! |---------|-----------|-----------------|
//! | **State** | None (expectations) | Real documents |
//! | **Call tracking** | Every operation recorded | None |
//! | **Error injection** | Easy (`return_err`) | Needs a real conflict or miss |
//! | **Use case** | Hook ordering, short-circuits, failure paths | End-to-end flows |
//!
//! ## Example
//!
//! ```rust
//! use resource_framework::mock::MockStore;
//! use resource_framework::{ActionKind, Defaults, Request, ResourceFactory, ResultSet};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MockStore::new();
//!     store.expect_execute().return_ok(ResultSet::Count(3));
//!
//!     let factory = ResourceFactory::new(Arc::new(store.clone()), Arc::new(Defaults::default()));
//!     let handler = factory.create_action("User", ActionKind::Count).to_handler();
//!
//!     let response = handler.call(Request::new()).await.unwrap();
//!     assert_eq!(response.body["count"], 3);
//!     assert_eq!(store.calls(), 1);
//!     store.verify();
//! }
//! ```
//!
//! A call with no queued expectation fails with a backend [`StoreError`] rather
//! than panicking inside the pipeline, so the test sees it as a 500.

use crate::store::{Operation, ResultSet, Store, StoreError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Result<ResultSet, StoreError>>,
    calls: Vec<(String, Operation)>,
}

/// A store that answers from a queue of expectations and records every call.
///
/// Clones share the same queue and call log.
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues the answer for the next `execute` call.
    pub fn expect_execute(&self) -> ExecuteExpectationBuilder {
        ExecuteExpectationBuilder {
            state: self.state.clone(),
        }
    }

    /// Number of `execute` calls received so far.
    pub fn calls(&self) -> usize {
        self.lock().calls.len()
    }

    /// Every operation received, in call order.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().calls.iter().map(|(_, op)| op.clone()).collect()
    }

    /// Entities named by each call, in call order.
    pub fn entities(&self) -> Vec<String> {
        self.lock().calls.iter().map(|(e, _)| e.clone()).collect()
    }

    /// Panics if any queued expectation was never consumed.
    pub fn verify(&self) {
        let remaining = self.lock().expectations.len();
        if remaining > 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }
}

#[async_trait]
impl Store for MockStore {
    async fn execute(&self, entity: &str, operation: Operation) -> Result<ResultSet, StoreError> {
        let mut state = self.lock();
        let name = operation.name();
        state.calls.push((entity.to_string(), operation));
        state.expectations.pop_front().unwrap_or_else(|| {
            Err(StoreError::backend(format!(
                "unexpected {name} call on {entity}"
            )))
        })
    }
}

/// Builder for `execute` expectations.
pub struct ExecuteExpectationBuilder {
    state: Arc<Mutex<MockState>>,
}

impl ExecuteExpectationBuilder {
    fn push(self, response: Result<ResultSet, StoreError>) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .expectations
            .push_back(response);
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: ResultSet) {
        self.push(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: StoreError) {
        self.push(Err(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;

    #[tokio::test]
    async fn replays_expectations_in_order() {
        let store = MockStore::new();
        store.expect_execute().return_ok(ResultSet::Count(1));
        store
            .expect_execute()
            .return_err(StoreError::NotFound("gone".into()));

        let first = store
            .execute("User", Operation::Count(Query::default()))
            .await
            .unwrap();
        assert_eq!(first, ResultSet::Count(1));

        let second = store.execute("User", Operation::Remove(Query::by_id("x"))).await;
        assert!(matches!(second, Err(StoreError::NotFound(_))));

        assert_eq!(store.calls(), 2);
        assert_eq!(store.entities(), vec!["User", "User"]);
        store.verify();
    }

    #[tokio::test]
    async fn unexpected_call_is_a_backend_error() {
        let store = MockStore::new();
        let result = store.execute("User", Operation::Find(Query::default())).await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert_eq!(store.calls(), 1);
    }

    #[test]
    #[should_panic(expected = "Not all expectations were met")]
    fn verify_panics_on_leftovers() {
        let store = MockStore::new();
        store.expect_execute().return_ok(ResultSet::Count(0));
        store.verify();
    }
}
