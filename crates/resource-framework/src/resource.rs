//! # Resource Descriptors
//!
//! A resource is a named entity paired with one CRUD verb. The pair is fixed when
//! an action is created and identifies the pipeline in logs and errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The CRUD verb a pipeline serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Index,
    Create,
    Show,
    Update,
    Destroy,
    Count,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Index => "index",
            ActionKind::Create => "create",
            ActionKind::Show => "show",
            ActionKind::Update => "update",
            ActionKind::Destroy => "destroy",
            ActionKind::Count => "count",
        }
    }

    /// The stage bracketing the action's first store call.
    pub fn first_stage(self) -> Stage {
        match self {
            ActionKind::Create => Stage::Save,
            _ => Stage::Query,
        }
    }

    /// The stage after `stage`, if any.
    ///
    /// Update and Destroy fetch their target under `query` first, so hooks can
    /// inspect it, and only then write under `save` or `destroy`.
    pub fn next_stage(self, stage: Stage) -> Option<Stage> {
        match (self, stage) {
            (ActionKind::Update, Stage::Query) => Some(Stage::Save),
            (ActionKind::Destroy, Stage::Query) => Some(Stage::Destroy),
            _ => None,
        }
    }

    /// Every stage the action brackets, in execution order.
    pub fn stages(self) -> Vec<Stage> {
        std::iter::successors(Some(self.first_stage()), |&stage| self.next_stage(stage)).collect()
    }

    /// Whether the action addresses a single document through the `id` path parameter.
    pub fn targets_id(self) -> bool {
        matches!(
            self,
            ActionKind::Show | ActionKind::Update | ActionKind::Destroy
        )
    }

    /// Count responds with a scalar, so it has no document to transform.
    pub fn produces_documents(self) -> bool {
        !matches!(self, ActionKind::Count)
    }

    /// HTTP method of the conventional route for this action.
    pub fn method(self) -> Method {
        match self {
            ActionKind::Index | ActionKind::Show | ActionKind::Count => Method::Get,
            ActionKind::Create => Method::Post,
            ActionKind::Update => Method::Put,
            ActionKind::Destroy => Method::Delete,
        }
    }

    /// Conventional route pattern for this action on `collection`.
    pub fn route(self, collection: &str) -> String {
        match self {
            ActionKind::Index | ActionKind::Create => format!("/{collection}.:format?"),
            ActionKind::Count => format!("/{collection}/count.:format?"),
            ActionKind::Show | ActionKind::Update | ActionKind::Destroy => {
                format!("/{collection}/:id.:format?")
            }
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The point in the store operation a pre/post hook brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Query,
    Save,
    Destroy,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Query => "query",
            Stage::Save => "save",
            Stage::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

/// Identifies which entity and which CRUD verb a pipeline serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceDescriptor {
    entity: String,
    action: ActionKind,
}

impl ResourceDescriptor {
    pub fn new(entity: impl Into<String>, action: ActionKind) -> Self {
        Self {
            entity: entity.into(),
            action,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn action(&self) -> ActionKind {
        self.action
    }

    /// Collection name used in routes: lowercased entity, naively pluralized.
    pub fn collection(&self) -> String {
        collection_name(&self.entity)
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity, self.action)
    }
}

/// `"User"` -> `"users"`, `"Category"` -> `"categories"`, `"Address"` -> `"addresses"`.
pub fn collection_name(entity: &str) -> String {
    let lower = entity.to_lowercase();
    if lower.ends_with('s') || lower.ends_with('x') || lower.ends_with("ch") {
        format!("{lower}es")
    } else if let Some(stem) = lower.strip_suffix('y') {
        if stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            format!("{lower}s")
        } else {
            format!("{stem}ies")
        }
    } else {
        format!("{lower}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_bracket_each_action() {
        assert_eq!(ActionKind::Index.stages(), vec![Stage::Query]);
        assert_eq!(ActionKind::Count.stages(), vec![Stage::Query]);
        assert_eq!(ActionKind::Create.stages(), vec![Stage::Save]);
        assert_eq!(ActionKind::Update.stages(), vec![Stage::Query, Stage::Save]);
        assert_eq!(ActionKind::Destroy.stages(), vec![Stage::Query, Stage::Destroy]);
    }

    #[test]
    fn routes_follow_collection_shapes() {
        assert_eq!(ActionKind::Index.route("users"), "/users.:format?");
        assert_eq!(ActionKind::Count.route("users"), "/users/count.:format?");
        assert_eq!(ActionKind::Update.route("users"), "/users/:id.:format?");
        assert_eq!(ActionKind::Destroy.method(), Method::Delete);
    }

    #[test]
    fn collection_names() {
        assert_eq!(collection_name("User"), "users");
        assert_eq!(collection_name("Category"), "categories");
        assert_eq!(collection_name("Key"), "keys");
        assert_eq!(collection_name("Address"), "addresses");
    }

    #[test]
    fn descriptor_display() {
        let descriptor = ResourceDescriptor::new("User", ActionKind::Show);
        assert_eq!(descriptor.to_string(), "User#show");
        assert_eq!(descriptor.collection(), "users");
    }
}
