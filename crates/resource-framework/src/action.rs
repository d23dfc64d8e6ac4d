//! # Action Factory
//!
//! The public entry point. [`ResourceFactory::create_action`] returns an
//! [`ActionBuilder`] with its own, empty [`HookRegistry`]; hooks registered on it
//! accumulate in call order. [`ActionBuilder::to_handler`] freezes the registry and
//! returns the [`Handler`] the router invokes once per request.
//!
//! ```rust
//! use resource_framework::mock::MockStore;
//! use resource_framework::{
//!     ActionKind, Defaults, HookResult, PipelineError, QueryContext, Request, ResourceFactory,
//!     ResultSet, Stage,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = MockStore::new();
//! let factory = ResourceFactory::new(Arc::new(store.clone()), Arc::new(Defaults::default()));
//!
//! let mut destroy = factory.create_action("User", ActionKind::Destroy);
//! destroy
//!     .pre(Stage::Query, |_: &mut QueryContext, req: &Request| -> HookResult {
//!         match req.header("authorization") {
//!             Some(_) => Ok(()),
//!             None => Err(PipelineError::unauthorized("missing token")),
//!         }
//!     })
//!     .unwrap();
//! let handler = destroy.to_handler();
//!
//! let err = handler
//!     .call(Request::new().with_param("id", "user_1"))
//!     .await
//!     .unwrap_err();
//! assert_eq!(err.status(), 401);
//! assert_eq!(store.calls(), 0);
//! # }
//! ```
//!
//! Registering on a builder whose handler was already built fails with
//! [`ConfigurationError::Frozen`].

use crate::document::Document;
use crate::error::{ConfigurationError, PipelineError, ValidationError};
use crate::hooks::{
    FnHook, Hook, HookEvent, HookRegistry, HookResult, PostHook, PreHook, SanitizeHook,
    ValidateHook,
};
use crate::pipeline::{Pipeline, Responder};
use crate::query::{QueryBuilder, QueryContext};
use crate::report::ErrorReport;
use crate::request::{Request, Response};
use crate::resource::{ActionKind, ResourceDescriptor, Stage};
use crate::settings::Defaults;
use crate::store::{ResultSet, Store};
use crate::transform::{FnTransform, Transform, TransformChain};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Builds actions that share one store and one set of defaults.
#[derive(Clone)]
pub struct ResourceFactory {
    store: Arc<dyn Store>,
    defaults: Arc<Defaults>,
}

impl ResourceFactory {
    pub fn new(store: Arc<dyn Store>, defaults: Arc<Defaults>) -> Self {
        Self { store, defaults }
    }

    /// Starts configuring one action. Every call yields independent state.
    pub fn create_action(&self, entity: impl Into<String>, action: ActionKind) -> ActionBuilder {
        ActionBuilder {
            descriptor: ResourceDescriptor::new(entity, action),
            registry: RegistryState::Open(HookRegistry::new()),
            store: self.store.clone(),
            defaults: self.defaults.clone(),
        }
    }

    /// Shorthand for creating several actions on the same entity.
    pub fn resource(&self, entity: impl Into<String>) -> ResourceScope<'_> {
        ResourceScope {
            factory: self,
            entity: entity.into(),
        }
    }
}

/// The actions of one entity; each method yields a fresh builder.
pub struct ResourceScope<'a> {
    factory: &'a ResourceFactory,
    entity: String,
}

impl ResourceScope<'_> {
    pub fn action(&self, kind: ActionKind) -> ActionBuilder {
        self.factory.create_action(self.entity.clone(), kind)
    }

    pub fn index(&self) -> ActionBuilder {
        self.action(ActionKind::Index)
    }

    pub fn create(&self) -> ActionBuilder {
        self.action(ActionKind::Create)
    }

    pub fn show(&self) -> ActionBuilder {
        self.action(ActionKind::Show)
    }

    pub fn update(&self) -> ActionBuilder {
        self.action(ActionKind::Update)
    }

    pub fn destroy(&self) -> ActionBuilder {
        self.action(ActionKind::Destroy)
    }

    pub fn count(&self) -> ActionBuilder {
        self.action(ActionKind::Count)
    }
}

enum RegistryState {
    Open(HookRegistry),
    Frozen(Arc<HookRegistry>),
}

/// Accumulates hook registrations for one action until [`to_handler`](Self::to_handler).
pub struct ActionBuilder {
    descriptor: ResourceDescriptor,
    registry: RegistryState,
    store: Arc<dyn Store>,
    defaults: Arc<Defaults>,
}

impl ActionBuilder {
    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.registry, RegistryState::Frozen(_))
    }

    fn register(&mut self, hook: Hook) -> Result<&mut Self, ConfigurationError> {
        match &mut self.registry {
            RegistryState::Open(registry) => {
                if let Some(stage) = hook.stage() {
                    if !self.descriptor.action().stages().contains(&stage) {
                        warn!(
                            resource = %self.descriptor,
                            %stage,
                            "Hook registered on a stage this action never runs"
                        );
                    }
                }
                registry.register(hook);
                Ok(self)
            }
            RegistryState::Frozen(_) => Err(ConfigurationError::Frozen {
                resource: self.descriptor.to_string(),
                event: hook.event().to_string(),
            }),
        }
    }

    pub fn on_sanitize<F>(&mut self, hook: F) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(&mut Request) -> HookResult + Send + Sync + 'static,
    {
        self.register(Hook::Sanitize(Arc::new(FnHook(hook))))
    }

    pub fn on_validate<F>(&mut self, hook: F) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(&Request) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.register(Hook::Validate(Arc::new(FnHook(hook))))
    }

    pub fn pre<F>(&mut self, stage: Stage, hook: F) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(&mut QueryContext, &Request) -> HookResult + Send + Sync + 'static,
    {
        self.register(Hook::Pre(stage, Arc::new(FnHook(hook))))
    }

    pub fn post<F>(&mut self, stage: Stage, hook: F) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(&mut ResultSet, &Request) -> HookResult + Send + Sync + 'static,
    {
        self.register(Hook::Post(stage, Arc::new(FnHook(hook))))
    }

    pub fn on_transform<F>(&mut self, hook: F) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(&Document, &mut Document) + Send + Sync + 'static,
    {
        self.register(Hook::Transform(Arc::new(FnTransform(hook))))
    }

    pub fn sanitize_hook(
        &mut self,
        hook: impl SanitizeHook + 'static,
    ) -> Result<&mut Self, ConfigurationError> {
        self.register(Hook::Sanitize(Arc::new(hook)))
    }

    pub fn validate_hook(
        &mut self,
        hook: impl ValidateHook + 'static,
    ) -> Result<&mut Self, ConfigurationError> {
        self.register(Hook::Validate(Arc::new(hook)))
    }

    pub fn pre_hook(
        &mut self,
        stage: Stage,
        hook: impl PreHook + 'static,
    ) -> Result<&mut Self, ConfigurationError> {
        self.register(Hook::Pre(stage, Arc::new(hook)))
    }

    pub fn post_hook(
        &mut self,
        stage: Stage,
        hook: impl PostHook + 'static,
    ) -> Result<&mut Self, ConfigurationError> {
        self.register(Hook::Post(stage, Arc::new(hook)))
    }

    pub fn transform_hook(
        &mut self,
        hook: impl Transform + 'static,
    ) -> Result<&mut Self, ConfigurationError> {
        self.register(Hook::Transform(Arc::new(hook)))
    }

    /// Freezes the registry and returns the request handler.
    ///
    /// Calling it again returns another handler over the same frozen hooks.
    pub fn to_handler(&mut self) -> Handler {
        self.build(None)
    }

    /// Like [`to_handler`](Self::to_handler), but `responder` replaces the default
    /// serialization of the transformed result set.
    pub fn to_handler_with<F>(&mut self, responder: F) -> Handler
    where
        F: Fn(ResultSet, &Request) -> Result<Response, PipelineError> + Send + Sync + 'static,
    {
        self.build(Some(Arc::new(responder)))
    }

    fn freeze(&mut self) -> Arc<HookRegistry> {
        let registry = match std::mem::replace(
            &mut self.registry,
            RegistryState::Frozen(Arc::default()),
        ) {
            RegistryState::Open(registry) => Arc::new(registry),
            RegistryState::Frozen(registry) => registry,
        };
        self.registry = RegistryState::Frozen(registry.clone());
        registry
    }

    fn build(&mut self, responder: Option<Responder>) -> Handler {
        let registry = self.freeze();
        let settings = &self.defaults.settings;
        let transforms = TransformChain::new(
            settings.credential_field.as_deref(),
            self.defaults.transforms(),
            registry.transforms().cloned().collect::<Vec<_>>(),
        );
        let pipeline = Pipeline::new(
            self.descriptor.clone(),
            registry,
            QueryBuilder::new(self.descriptor.action(), settings),
            transforms,
            self.store.clone(),
        )
        .with_store_timeout(settings.store_timeout())
        .with_responder(responder);

        info!(
            resource = %self.descriptor,
            hooks = pipeline.registry().len(),
            sanitize = pipeline.registry().get(HookEvent::Sanitize, None).len(),
            validate = pipeline.registry().get(HookEvent::Validate, None).len(),
            "Handler built"
        );
        Handler {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// The router-facing entry point of one action. Cheap to clone; clones share the
/// frozen pipeline.
#[derive(Clone, Debug)]
pub struct Handler {
    pipeline: Arc<Pipeline>,
}

impl Handler {
    pub fn descriptor(&self) -> &ResourceDescriptor {
        self.pipeline.descriptor()
    }

    /// Runs one request. `Err` is the error to forward to the error reporter.
    pub async fn call(&self, request: Request) -> Result<Response, PipelineError> {
        let descriptor = self.pipeline.descriptor();
        let span = info_span!(
            "pipeline",
            resource = descriptor.entity(),
            action = descriptor.action().as_str()
        );

        async {
            let result = self.pipeline.execute(request).await;
            match &result {
                Ok(response) => info!(status = response.status, "Request completed"),
                Err(err) => warn!(status = err.status(), error = %err, "Request failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Runs one request and renders any error, so the result is always a response.
    pub async fn respond(&self, request: Request) -> Response {
        match self.call(request).await {
            Ok(response) => response,
            Err(err) => ErrorReport::from(&err).into_response(),
        }
    }
}
