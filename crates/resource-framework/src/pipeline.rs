//! # Pipeline Executor
//!
//! Runs one request through the fixed lifecycle of an action:
//!
//! ```text
//! Init → Sanitizing → Validating → PreStage → Executing → PostStage → Transforming → Responding → Done
//!                                      ↑                        |
//!                                      └──── next stage ────────┘
//!    \________________________________________________________________________________/
//!                                        ↓ any error
//!                                     Errored
//! ```
//!
//! Each step returns the next state or a [`PipelineError`]. The first error ends
//! the request: no later hook runs and nothing partial is emitted. The error is
//! handed back to the caller, which forwards it to the error-reporting
//! collaborator (see [`ErrorReport`](crate::report::ErrorReport)).
//!
//! ## Stage brackets
//!
//! Pre and post hooks are keyed by [`Stage`]. Every store call is bracketed by
//! the hooks of one stage: `PreStage → Executing → PostStage`. Most actions make
//! a single call, but Update and Destroy walk two brackets:
//!
//! ```text
//! pre(query) → find the target → post(query) → pre(save|destroy) → write → post(save|destroy)
//! ```
//!
//! so a `query` post hook that rejects the fetched document stops the request
//! before anything is written. The fetched document is handed to the second
//! bracket as [`QueryContext::found`].
//!
//! ## Per-request state
//!
//! The [`QueryContext`] and the [`ResultSet`] are carried inside the state value,
//! so they exist only for the step that owns them and are never shared between
//! requests. The pipeline itself holds only immutable data behind `Arc`s.

use crate::error::PipelineError;
use crate::hooks::HookRegistry;
use crate::query::{carries_version, QueryBuilder, QueryContext};
use crate::request::{Format, Request, Response};
use crate::resource::{ResourceDescriptor, Stage};
use crate::store::{Operation, ResultSet, Store, StoreError};
use crate::transform::TransformChain;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Replaces the Responding step: turns the transformed result set into a response.
pub type Responder =
    Arc<dyn Fn(ResultSet, &Request) -> Result<Response, PipelineError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Sanitizing,
    Validating,
    PreStage,
    Executing,
    PostStage,
    Transforming,
    Responding,
    Done,
    Errored,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Errored)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineState::Init => "init",
            PipelineState::Sanitizing => "sanitizing",
            PipelineState::Validating => "validating",
            PipelineState::PreStage => "pre_stage",
            PipelineState::Executing => "executing",
            PipelineState::PostStage => "post_stage",
            PipelineState::Transforming => "transforming",
            PipelineState::Responding => "responding",
            PipelineState::Done => "done",
            PipelineState::Errored => "errored",
        })
    }
}

/// The context of a request inside the hooks of one stage.
struct Bracket {
    stage: Stage,
    ctx: QueryContext,
}

/// What the store call of a bracket returned, plus the bracket that follows it.
struct Outcome {
    stage: Stage,
    results: ResultSet,
    next: Option<Bracket>,
}

/// A state together with the data that state owns.
enum Step {
    Init,
    Sanitizing,
    Validating,
    PreStage(Bracket),
    Executing(Bracket),
    PostStage(Outcome),
    Transforming(ResultSet),
    Responding(ResultSet),
    Done(Response),
}

impl Step {
    fn state(&self) -> PipelineState {
        match self {
            Step::Init => PipelineState::Init,
            Step::Sanitizing => PipelineState::Sanitizing,
            Step::Validating => PipelineState::Validating,
            Step::PreStage(_) => PipelineState::PreStage,
            Step::Executing(_) => PipelineState::Executing,
            Step::PostStage(_) => PipelineState::PostStage,
            Step::Transforming(_) => PipelineState::Transforming,
            Step::Responding(_) => PipelineState::Responding,
            Step::Done(_) => PipelineState::Done,
        }
    }
}

/// Everything one invocation reads besides the pipeline itself.
struct Invocation {
    request: Request,
    format: Format,
}

pub struct Pipeline {
    descriptor: ResourceDescriptor,
    registry: Arc<HookRegistry>,
    builder: QueryBuilder,
    transforms: TransformChain,
    store: Arc<dyn Store>,
    store_timeout: Option<Duration>,
    responder: Option<Responder>,
}

impl Pipeline {
    pub fn new(
        descriptor: ResourceDescriptor,
        registry: Arc<HookRegistry>,
        builder: QueryBuilder,
        transforms: TransformChain,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            descriptor,
            registry,
            builder,
            transforms,
            store,
            store_timeout: None,
            responder: None,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_responder(mut self, responder: Option<Responder>) -> Self {
        self.responder = responder;
        self
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Drives `request` from `Init` to `Done`, or returns the error that sent it
    /// to `Errored`.
    pub async fn execute(&self, request: Request) -> Result<Response, PipelineError> {
        let mut run = Invocation {
            request,
            format: Format::Json,
        };
        let mut step = Step::Init;

        loop {
            let from = step.state();
            step = match self.advance(step, &mut run).await {
                Ok(Step::Done(response)) => {
                    debug!(from = %from, to = %PipelineState::Done, "Transition");
                    return Ok(response);
                }
                Ok(next) => next,
                Err(err) => {
                    debug!(
                        from = %from,
                        to = %PipelineState::Errored,
                        status = err.status(),
                        "Transition"
                    );
                    return Err(err);
                }
            };
            debug!(from = %from, to = %step.state(), "Transition");
        }
    }

    async fn advance(&self, step: Step, run: &mut Invocation) -> Result<Step, PipelineError> {
        let action = self.descriptor.action();
        match step {
            Step::Init => Ok(Step::Sanitizing),

            Step::Sanitizing => {
                for hook in self.registry.sanitizers() {
                    hook.sanitize(&mut run.request).await?;
                }
                Ok(Step::Validating)
            }

            Step::Validating => {
                // Fail fast: the first failing validator ends the request.
                for hook in self.registry.validators() {
                    hook.validate(&run.request).await?;
                }
                let ctx = self.builder.build(&run.request)?;
                run.format = ctx.format();
                Ok(Step::PreStage(Bracket {
                    stage: action.first_stage(),
                    ctx,
                }))
            }

            Step::PreStage(mut bracket) => {
                for hook in self.registry.pre_hooks(bracket.stage) {
                    hook.pre(&mut bracket.ctx, &run.request).await?;
                }
                Ok(Step::Executing(bracket))
            }

            Step::Executing(Bracket { stage, ctx }) => match action.next_stage(stage) {
                Some(next) => {
                    let results = self.call_store(ctx.lookup()).await?;
                    Ok(Step::PostStage(Outcome {
                        stage,
                        results,
                        next: Some(Bracket { stage: next, ctx }),
                    }))
                }
                None => {
                    let results = self.call_store(ctx.into_operation()).await?;
                    Ok(Step::PostStage(Outcome {
                        stage,
                        results,
                        next: None,
                    }))
                }
            },

            Step::PostStage(Outcome {
                stage,
                mut results,
                next,
            }) => {
                for hook in self.registry.post_hooks(stage) {
                    hook.post(&mut results, &run.request).await?;
                }
                match next {
                    Some(mut bracket) => {
                        bracket.ctx.found = results.documents().first().cloned();
                        Ok(Step::PreStage(bracket))
                    }
                    None if action.produces_documents() => Ok(Step::Transforming(results)),
                    None => Ok(Step::Responding(results)),
                }
            }

            Step::Transforming(mut results) => {
                for doc in results.documents_mut() {
                    *doc = self.transforms.apply(doc);
                }
                Ok(Step::Responding(results))
            }

            Step::Responding(results) => {
                let response = match &self.responder {
                    Some(responder) => responder(results, &run.request)?,
                    None => render(results, run.format),
                };
                Ok(Step::Done(response))
            }

            Step::Done(response) => Ok(Step::Done(response)),
        }
    }

    async fn call_store(&self, operation: Operation) -> Result<ResultSet, StoreError> {
        let entity = self.descriptor.entity();
        if let Operation::Update { changes, .. } = &operation {
            debug!(versioned = carries_version(changes), "Update carries version");
        }
        debug!(%entity, ?operation, "Store call");

        let call = self.store.execute(entity, operation);
        match self.store_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| StoreError::Timeout(limit))?,
            None => call.await,
        }
    }
}

/// Default Responding step: a document, an array of documents, or `{"count": n}`.
fn render(results: ResultSet, format: Format) -> Response {
    let body = match results {
        ResultSet::Many(docs) => Value::Array(docs.into_iter().map(Value::Object).collect()),
        ResultSet::One(doc) => Value::Object(doc),
        ResultSet::Count(n) => json!({ "count": n }),
    };
    Response {
        status: 200,
        content_type: format.content_type(),
        body,
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("descriptor", &self.descriptor)
            .field("hooks", &self.registry.len())
            .field("transforms", &self.transforms.len())
            .field("store_timeout", &self.store_timeout)
            .field("custom_responder", &self.responder.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::hooks::{FnHook, Hook, HookResult};
    use crate::mock::MockStore;
    use crate::resource::ActionKind;
    use crate::settings::PipelineSettings;
    use crate::transform::FnTransform;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn pipeline(action: ActionKind, registry: HookRegistry, store: &MockStore) -> Pipeline {
        let settings = PipelineSettings::default();
        let transforms = TransformChain::new(
            settings.credential_field.as_deref(),
            &[],
            registry.transforms().cloned().collect::<Vec<_>>(),
        );
        Pipeline::new(
            ResourceDescriptor::new("User", action),
            Arc::new(registry),
            QueryBuilder::new(action, &settings),
            transforms,
            Arc::new(store.clone()),
        )
    }

    #[tokio::test]
    async fn count_skips_transforming() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let mut registry = HookRegistry::new();
        registry.register(Hook::Transform(Arc::new(FnTransform(
            move |_: &Document, _: &mut Document| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ))));

        let store = MockStore::new();
        store.expect_execute().return_ok(ResultSet::Count(4));

        let response = pipeline(ActionKind::Count, registry, &store)
            .execute(Request::new())
            .await
            .unwrap();

        assert_eq!(response.body, json!({"count": 4}));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn update_fetches_before_it_writes() {
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        for stage in [Stage::Save, Stage::Query] {
            let pre_events = events.clone();
            registry.register(Hook::Pre(
                stage,
                Arc::new(FnHook(move |ctx: &mut QueryContext, _: &Request| -> HookResult {
                    let found = ctx.found.as_ref().map(|d| d["name"].clone());
                    pre_events.lock().unwrap().push(format!("pre {stage} {found:?}"));
                    Ok(())
                })),
            ));
            let post_events = events.clone();
            registry.register(Hook::Post(
                stage,
                Arc::new(FnHook(move |_: &mut ResultSet, _: &Request| -> HookResult {
                    post_events.lock().unwrap().push(format!("post {stage}"));
                    Ok(())
                })),
            ));
        }

        let store = MockStore::new();
        store
            .expect_execute()
            .return_ok(ResultSet::One(doc(json!({"_id": "u1", "name": "Ada"}))));
        store
            .expect_execute()
            .return_ok(ResultSet::One(doc(json!({"_id": "u1", "name": "Grace"}))));

        let request = Request::new()
            .with_param("id", "u1")
            .with_body(json!({"name": "Grace"}));
        let response = pipeline(ActionKind::Update, registry, &store)
            .execute(request)
            .await
            .unwrap();

        assert_eq!(response.body["name"], "Grace");
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "pre query None",
                "post query",
                r#"pre save Some(String("Ada"))"#,
                "post save",
            ]
        );
        let operations = store.operations();
        let names: Vec<&str> = operations.iter().map(Operation::name).collect();
        assert_eq!(names, vec!["find_one", "update"]);
        store.verify();
    }

    #[tokio::test]
    async fn query_post_hook_rejection_prevents_the_write() {
        for action in [ActionKind::Update, ActionKind::Destroy] {
            let mut registry = HookRegistry::new();
            registry.register(Hook::Post(
                Stage::Query,
                Arc::new(FnHook(|results: &mut ResultSet, _: &Request| -> HookResult {
                    match results.documents().first() {
                        Some(doc) if doc["owner"] == "u2" => Ok(()),
                        _ => Err(PipelineError::unauthorized("not the owner")),
                    }
                })),
            ));

            let store = MockStore::new();
            store
                .expect_execute()
                .return_ok(ResultSet::One(doc(json!({"_id": "u1", "owner": "u1"}))));

            let err = pipeline(action, registry, &store)
                .execute(Request::new().with_param("id", "u1").with_body(json!({})))
                .await
                .unwrap_err();

            assert_eq!(err.status(), 401, "{action}");
            let operations = store.operations();
            let names: Vec<&str> = operations.iter().map(Operation::name).collect();
            assert_eq!(names, vec!["find_one"], "{action}");
        }
    }

    #[tokio::test]
    async fn store_timeout_is_a_server_error() {
        struct Stalled;

        #[async_trait::async_trait]
        impl Store for Stalled {
            async fn execute(&self, _: &str, _: Operation) -> Result<ResultSet, StoreError> {
                std::future::pending().await
            }
        }

        let settings = PipelineSettings::default();
        let pipeline = Pipeline::new(
            ResourceDescriptor::new("User", ActionKind::Index),
            Arc::new(HookRegistry::new()),
            QueryBuilder::new(ActionKind::Index, &settings),
            TransformChain::default(),
            Arc::new(Stalled),
        )
        .with_store_timeout(Some(Duration::from_millis(20)));

        let err = pipeline.execute(Request::new()).await.unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(matches!(err, PipelineError::Store(StoreError::Timeout(_))));
    }

    #[tokio::test]
    async fn unrecognized_format_renders_json() {
        let store = MockStore::new();
        store.expect_execute().return_ok(ResultSet::Count(2));
        let response = pipeline(ActionKind::Count, HookRegistry::new(), &store)
            .execute(Request::new().with_param("format", ":format?"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/json");
        assert_eq!(response.body, json!({"count": 2}));
    }
}
