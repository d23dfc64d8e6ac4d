//! Hooks attached to the `User` actions.

use crate::model::Role;
use async_trait::async_trait;
use resource_framework::{
    HookResult, PipelineError, PreHook, QueryContext, Request, SanitizeHook, ValidationError,
};
use serde_json::Value;
use tracing::debug;

/// Header carrying the id of the calling user.
pub const CALLER_HEADER: &str = "x-user-id";
/// Header carrying the role of the calling user.
pub const ROLE_HEADER: &str = "x-user-role";

/// Trims and lowercases `email` in the query and the body.
pub struct NormalizeEmail;

#[async_trait]
impl SanitizeHook for NormalizeEmail {
    async fn sanitize(&self, request: &mut Request) -> HookResult {
        if let Some(Value::String(email)) = request.query.get_mut("email") {
            *email = email.trim().to_lowercase();
        }
        if let Some(Value::String(email)) = request.body.get_mut("email") {
            *email = email.trim().to_lowercase();
        }
        Ok(())
    }
}

/// Rejects requests without a caller. Admins may touch any user, everyone else
/// only themselves.
pub struct RequireOwnerOrAdmin;

#[async_trait]
impl PreHook for RequireOwnerOrAdmin {
    async fn pre(&self, _ctx: &mut QueryContext, request: &Request) -> HookResult {
        let caller = request
            .header(CALLER_HEADER)
            .ok_or_else(|| PipelineError::unauthorized("missing caller"))?;
        if request.header(ROLE_HEADER) == Some(Role::Admin.as_str()) {
            return Ok(());
        }
        if request.id() != Some(caller) {
            debug!(caller, requested = ?request.id(), "Caller is not the owner");
            return Err(PipelineError::unauthorized("not the owner"));
        }
        Ok(())
    }
}

pub fn validate_signup(request: &Request) -> Result<(), ValidationError> {
    request.require_body("name")?;
    request.require_body("email")?;
    request.require_body("password")?;
    match request.body.get("email").and_then(Value::as_str) {
        Some(email) if email.contains('@') => Ok(()),
        _ => Err(ValidationError::for_field("email", "email must contain '@'")),
    }
}

/// New accounts start as subscribers unless an admin says otherwise.
pub fn default_role(ctx: &mut QueryContext, request: &Request) -> HookResult {
    let is_admin = request.header(ROLE_HEADER) == Some(Role::Admin.as_str());
    let has_role = ctx
        .payload
        .as_ref()
        .is_some_and(|payload| payload.contains_key("role"));
    if !is_admin || !has_role {
        ctx.set("role", Role::Subscriber.as_str());
    }
    Ok(())
}

/// Only admins may change roles.
pub fn protect_role(ctx: &mut QueryContext, request: &Request) -> HookResult {
    if request.header(ROLE_HEADER) != Some(Role::Admin.as_str()) {
        ctx.unset("role");
    }
    Ok(())
}
