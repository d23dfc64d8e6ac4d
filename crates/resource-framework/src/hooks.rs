//! # Hook Registry
//!
//! Each action owns one [`HookRegistry`]: ordered callback lists keyed by
//! `(event, stage)`. Registration happens while the action is being configured;
//! once its handler is built the registry is moved behind an `Arc` and never
//! mutated again, so concurrent requests only ever read it.
//!
//! Hooks run in registration order (FIFO). There are no priorities.
//!
//! ## Hook kinds
//!
//! | Event | Receives | Fails with |
//! |-------|----------|------------|
//! | [`Sanitize`](HookEvent::Sanitize) | `&mut Request` | any [`PipelineError`] |
//! | [`Validate`](HookEvent::Validate) | `&Request` | [`ValidationError`] (always 400) |
//! | [`Pre`](HookEvent::Pre) | `&mut QueryContext`, `&Request` | any [`PipelineError`] |
//! | [`Post`](HookEvent::Post) | `&mut ResultSet`, `&Request` | any [`PipelineError`] |
//! | [`Transform`](HookEvent::Transform) | raw and output document | cannot fail |
//!
//! Closures cover the synchronous case. Hooks that must await something (another
//! service, a timer) implement the async traits directly.

use crate::error::{PipelineError, ValidationError};
use crate::query::QueryContext;
use crate::request::Request;
use crate::resource::Stage;
use crate::store::ResultSet;
use crate::transform::Transform;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type HookResult = Result<(), PipelineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    Sanitize,
    Validate,
    Pre,
    Post,
    Transform,
}

impl HookEvent {
    /// Whether hooks for this event are keyed by a stage.
    pub fn is_staged(self) -> bool {
        matches!(self, HookEvent::Pre | HookEvent::Post)
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookEvent::Sanitize => "sanitize",
            HookEvent::Validate => "validate",
            HookEvent::Pre => "pre",
            HookEvent::Post => "post",
            HookEvent::Transform => "transform",
        })
    }
}

#[async_trait]
pub trait SanitizeHook: Send + Sync {
    async fn sanitize(&self, request: &mut Request) -> HookResult;
}

#[async_trait]
pub trait ValidateHook: Send + Sync {
    async fn validate(&self, request: &Request) -> Result<(), ValidationError>;
}

#[async_trait]
pub trait PreHook: Send + Sync {
    async fn pre(&self, ctx: &mut QueryContext, request: &Request) -> HookResult;
}

#[async_trait]
pub trait PostHook: Send + Sync {
    async fn post(&self, results: &mut ResultSet, request: &Request) -> HookResult;
}

/// Adapts a synchronous closure into one of the hook traits.
pub struct FnHook<F>(pub F);

#[async_trait]
impl<F> SanitizeHook for FnHook<F>
where
    F: Fn(&mut Request) -> HookResult + Send + Sync,
{
    async fn sanitize(&self, request: &mut Request) -> HookResult {
        (self.0)(request)
    }
}

#[async_trait]
impl<F> ValidateHook for FnHook<F>
where
    F: Fn(&Request) -> Result<(), ValidationError> + Send + Sync,
{
    async fn validate(&self, request: &Request) -> Result<(), ValidationError> {
        (self.0)(request)
    }
}

#[async_trait]
impl<F> PreHook for FnHook<F>
where
    F: Fn(&mut QueryContext, &Request) -> HookResult + Send + Sync,
{
    async fn pre(&self, ctx: &mut QueryContext, request: &Request) -> HookResult {
        (self.0)(ctx, request)
    }
}

#[async_trait]
impl<F> PostHook for FnHook<F>
where
    F: Fn(&mut ResultSet, &Request) -> HookResult + Send + Sync,
{
    async fn post(&self, results: &mut ResultSet, request: &Request) -> HookResult {
        (self.0)(results, request)
    }
}

/// A callback value tagged with the event (and stage) it listens to.
#[derive(Clone)]
pub enum Hook {
    Sanitize(Arc<dyn SanitizeHook>),
    Validate(Arc<dyn ValidateHook>),
    Pre(Stage, Arc<dyn PreHook>),
    Post(Stage, Arc<dyn PostHook>),
    Transform(Arc<dyn Transform>),
}

impl Hook {
    pub fn event(&self) -> HookEvent {
        match self {
            Hook::Sanitize(_) => HookEvent::Sanitize,
            Hook::Validate(_) => HookEvent::Validate,
            Hook::Pre(..) => HookEvent::Pre,
            Hook::Post(..) => HookEvent::Post,
            Hook::Transform(_) => HookEvent::Transform,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Hook::Pre(stage, _) | Hook::Post(stage, _) => Some(*stage),
            _ => None,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage() {
            Some(stage) => write!(f, "Hook({} {})", self.event(), stage),
            None => write!(f, "Hook({})", self.event()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct HookKey {
    event: HookEvent,
    stage: Option<Stage>,
}

impl HookKey {
    fn new(event: HookEvent, stage: Option<Stage>) -> Self {
        // Stage-less events ignore whatever stage the caller passes.
        let stage = if event.is_staged() { stage } else { None };
        Self { event, stage }
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    /// Global insertion sequence within the registry.
    pub order: u64,
    pub hook: Hook,
}

#[derive(Debug, Default)]
pub struct HookRegistry {
    entries: HashMap<HookKey, Vec<Registration>>,
    next_order: u64,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `hook` to the list for its `(event, stage)`.
    pub fn register(&mut self, hook: Hook) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        self.entries
            .entry(HookKey::new(hook.event(), hook.stage()))
            .or_default()
            .push(Registration { order, hook });
        order
    }

    /// Hooks for `(event, stage)` in registration order.
    pub fn get(&self, event: HookEvent, stage: Option<Stage>) -> &[Registration] {
        self.entries
            .get(&HookKey::new(event, stage))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sanitizers(&self) -> impl Iterator<Item = &Arc<dyn SanitizeHook>> {
        self.get(HookEvent::Sanitize, None)
            .iter()
            .filter_map(|r| match &r.hook {
                Hook::Sanitize(hook) => Some(hook),
                _ => None,
            })
    }

    pub fn validators(&self) -> impl Iterator<Item = &Arc<dyn ValidateHook>> {
        self.get(HookEvent::Validate, None)
            .iter()
            .filter_map(|r| match &r.hook {
                Hook::Validate(hook) => Some(hook),
                _ => None,
            })
    }

    pub fn pre_hooks(&self, stage: Stage) -> impl Iterator<Item = &Arc<dyn PreHook>> {
        self.get(HookEvent::Pre, Some(stage))
            .iter()
            .filter_map(|r| match &r.hook {
                Hook::Pre(_, hook) => Some(hook),
                _ => None,
            })
    }

    pub fn post_hooks(&self, stage: Stage) -> impl Iterator<Item = &Arc<dyn PostHook>> {
        self.get(HookEvent::Post, Some(stage))
            .iter()
            .filter_map(|r| match &r.hook {
                Hook::Post(_, hook) => Some(hook),
                _ => None,
            })
    }

    pub fn transforms(&self) -> impl Iterator<Item = &Arc<dyn Transform>> {
        self.get(HookEvent::Transform, None)
            .iter()
            .filter_map(|r| match &r.hook {
                Hook::Transform(hook) => Some(hook),
                _ => None,
            })
    }
}
