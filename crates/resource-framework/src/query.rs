//! # Query/Mutation Builder
//!
//! [`QueryBuilder::build`] turns a sanitized, validated [`Request`] into a
//! [`QueryContext`]: the per-request, mutable description of what the store should
//! do. Pre hooks refine it through [`QueryContext::select`], [`QueryContext::sort`]
//! and [`QueryContext::filter`]; the pipeline then converts it into an
//! [`Operation`] for the store collaborator. The builder never talks to the store.
//!
//! ## Query parameters
//!
//! | Parameter | Meaning |
//! |-----------|---------|
//! | `sort`    | `"createdAt -name"`: ascending unless prefixed with `-` |
//! | `select`  | `"+role -password"`: see [`Projection`] |
//! | `limit`   | page size (Index defaults to the configured page size) |
//! | `skip`    | documents to skip before the page |
//! | anything else | equality filter on that field |
//!
//! Filter values from the query string are text. A textual filter matches a
//! stored number or boolean that renders the same, so `?__v=0` finds version `0`.

use crate::document::{compare_values, Document, ID_FIELD, VERSION_FIELD};
use crate::error::{PipelineError, ValidationError};
use crate::request::{Format, Request};
use crate::resource::ActionKind;
use crate::settings::PipelineSettings;
use crate::store::Operation;
use serde_json::Value;
use std::cmp::Ordering;

const RESERVED_PARAMS: [&str; 4] = ["sort", "select", "limit", "skip"];

fn filter_matches(stored: &Value, expected: &Value) -> bool {
    match (stored, expected) {
        (Value::Number(_) | Value::Bool(_), Value::String(text)) => stored.to_string() == *text,
        _ => stored == expected,
    }
}

/// One entry of a field selection.
///
/// `+field` parses to `included: true`, `-field` to `included: false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    pub field: String,
    pub included: bool,
}

/// Structured field selection.
///
/// A bare field name makes the projection *exclusive*: only the named fields (and
/// `_id`, unless excluded) survive. `+field` forces a field the store hides by
/// default into the result; `-field` removes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub fields: Vec<FieldSelection>,
    pub exclusive: bool,
}

impl Projection {
    /// Parses a space separated selection string such as `"+role -password"`.
    pub fn parse(spec: &str) -> Self {
        let mut projection = Projection::default();
        projection.merge(spec);
        projection
    }

    /// Adds the selections in `spec`; a later entry for the same field wins.
    pub fn merge(&mut self, spec: &str) {
        for token in spec.split_whitespace() {
            let (field, included) = match token.as_bytes()[0] {
                b'+' => (&token[1..], true),
                b'-' => (&token[1..], false),
                _ => {
                    self.exclusive = true;
                    (token, true)
                }
            };
            if field.is_empty() {
                continue;
            }
            self.set(field, included);
        }
    }

    pub fn set(&mut self, field: &str, included: bool) {
        self.fields.retain(|s| s.field != field);
        self.fields.push(FieldSelection {
            field: field.to_string(),
            included,
        });
    }

    fn lookup(&self, field: &str) -> Option<bool> {
        self.fields
            .iter()
            .find(|s| s.field == field)
            .map(|s| s.included)
    }

    /// Shapes a stored document; `hidden` lists fields omitted unless force-included.
    pub fn apply(&self, doc: &Document, hidden: &[String]) -> Document {
        doc.iter()
            .filter(|(field, _)| {
                let field = field.as_str();
                match self.lookup(field) {
                    Some(included) => included,
                    None if self.exclusive => field == ID_FIELD,
                    None => !hidden.iter().any(|h| h == field),
                }
            })
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

/// Parses `"createdAt -name"` into sort keys.
pub fn parse_sort(spec: &str) -> Vec<SortKey> {
    spec.split_whitespace()
        .filter_map(|token| {
            let (field, direction) = match token.strip_prefix('-') {
                Some(field) => (field, Direction::Descending),
                None => (token.trim_start_matches('+'), Direction::Ascending),
            };
            (!field.is_empty()).then(|| SortKey {
                field: field.to_string(),
                direction,
            })
        })
        .collect()
}

/// Filter, projection, ordering and pagination of a read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Equality predicates, all of which must hold.
    pub filter: Document,
    pub projection: Projection,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Query {
    pub fn by_id(id: &str) -> Self {
        let mut query = Query::default();
        query
            .filter
            .insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        query
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filter.iter().all(|(field, expected)| {
            doc.get(field)
                .is_some_and(|stored| filter_matches(stored, expected))
        })
    }

    /// Ordering between two documents under this query's sort keys.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for key in &self.sort {
            let ord = compare_values(a.get(&key.field), b.get(&key.field));
            let ord = match key.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// The mutable per-request context pre hooks refine.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    action: ActionKind,
    format: Format,
    pub query: Query,
    /// Fields to persist (Create/Update only).
    pub payload: Option<Document>,
    /// The target Update and Destroy fetched under the `query` stage, as the
    /// `query` post hooks left it. Set before the `save`/`destroy` pre hooks run.
    pub found: Option<Document>,
}

impl QueryContext {
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            format: Format::Json,
            query: Query::default(),
            payload: None,
            found: None,
        }
    }

    pub fn action(&self) -> ActionKind {
        self.action
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Adds field selections, e.g. `ctx.select("+role -email")`.
    pub fn select(&mut self, spec: &str) -> &mut Self {
        self.query.projection.merge(spec);
        self
    }

    /// Replaces the sort order, e.g. `ctx.sort("-createdAt")`.
    pub fn sort(&mut self, spec: &str) -> &mut Self {
        self.query.sort = parse_sort(spec);
        self
    }

    /// Narrows the query with additional equality predicates.
    pub fn filter(&mut self, predicate: Document) -> &mut Self {
        self.query.filter.extend(predicate);
        self
    }

    pub fn filter_eq(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.query.filter.insert(field.into(), value.into());
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets a field on the mutation payload, creating the payload if needed.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.payload
            .get_or_insert_with(Document::new)
            .insert(field.into(), value.into());
        self
    }

    /// Removes a field from the mutation payload.
    pub fn unset(&mut self, field: &str) -> &mut Self {
        if let Some(payload) = self.payload.as_mut() {
            payload.remove(field);
        }
        self
    }

    /// Fetches the target of an Update or Destroy without changing it.
    pub fn lookup(&self) -> Operation {
        Operation::FindOne(self.query.clone())
    }

    /// The store operation this context describes.
    pub fn into_operation(self) -> Operation {
        let payload = self.payload.unwrap_or_default();
        match self.action {
            ActionKind::Index => Operation::Find(self.query),
            ActionKind::Show => Operation::FindOne(self.query),
            ActionKind::Count => Operation::Count(self.query),
            ActionKind::Create => Operation::Insert {
                document: payload,
                projection: self.query.projection,
            },
            ActionKind::Update => Operation::Update {
                query: self.query,
                changes: payload,
            },
            ActionKind::Destroy => Operation::Remove(self.query),
        }
    }
}

/// Builds fresh contexts for one action kind.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    action: ActionKind,
    page_size: u64,
    default_sort: Vec<SortKey>,
}

impl QueryBuilder {
    pub fn new(action: ActionKind, settings: &PipelineSettings) -> Self {
        Self {
            action,
            page_size: settings.page_size,
            default_sort: parse_sort(&settings.default_sort),
        }
    }

    pub fn build(&self, request: &Request) -> Result<QueryContext, PipelineError> {
        let mut ctx = QueryContext::new(self.action);
        ctx.format = Format::negotiate(request);

        if self.action.targets_id() {
            let id = request
                .id()
                .ok_or_else(|| ValidationError::for_field("id", "missing resource id"))?;
            ctx.query = Query::by_id(id);
        }

        match self.action {
            ActionKind::Index => {
                self.read_params(&mut ctx.query, request)?;
                if ctx.query.sort.is_empty() {
                    ctx.query.sort = self.default_sort.clone();
                }
                ctx.query.limit.get_or_insert(self.page_size);
            }
            ActionKind::Count => {
                self.read_params(&mut ctx.query, request)?;
                ctx.query.sort.clear();
                ctx.query.skip = 0;
                ctx.query.limit = None;
            }
            ActionKind::Show => {
                if let Some(spec) = string_param(request, "select")? {
                    ctx.query.projection.merge(spec);
                }
            }
            ActionKind::Create => {
                ctx.payload = Some(body_payload(request)?);
            }
            ActionKind::Update => {
                let mut payload = body_payload(request)?;
                // The id comes from the path; the version is passed through untouched.
                payload.remove(ID_FIELD);
                ctx.payload = Some(payload);
            }
            ActionKind::Destroy => {}
        }

        Ok(ctx)
    }

    fn read_params(&self, query: &mut Query, request: &Request) -> Result<(), PipelineError> {
        for (field, value) in &request.query {
            if !RESERVED_PARAMS.contains(&field.as_str()) {
                query.filter.insert(field.clone(), value.clone());
            }
        }
        if let Some(spec) = string_param(request, "sort")? {
            query.sort = parse_sort(spec);
        }
        if let Some(spec) = string_param(request, "select")? {
            query.projection.merge(spec);
        }
        if let Some(limit) = number_param(request, "limit")? {
            query.limit = Some(limit);
        }
        if let Some(skip) = number_param(request, "skip")? {
            query.skip = skip;
        }
        Ok(())
    }
}

fn string_param<'a>(request: &'a Request, name: &str) -> Result<Option<&'a str>, PipelineError> {
    match request.query.get(name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ValidationError::for_field(name, format!("'{name}' must be a string")).into()),
    }
}

fn number_param(request: &Request, name: &str) -> Result<Option<u64>, PipelineError> {
    let invalid = || ValidationError::for_field(name, format!("'{name}' must be a non-negative integer"));
    match request.query.get(name) {
        None => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(|| invalid().into()),
        Some(Value::String(s)) => s.parse::<u64>().map(Some).map_err(|_| invalid().into()),
        Some(_) => Err(invalid().into()),
    }
}

fn body_payload(request: &Request) -> Result<Document, PipelineError> {
    match &request.body {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Document::new()),
        _ => Err(ValidationError::new("request body must be a JSON object").into()),
    }
}

/// `true` when the update carries an explicit version for optimistic concurrency.
pub fn carries_version(changes: &Document) -> bool {
    changes.contains_key(VERSION_FIELD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn builder(action: ActionKind) -> QueryBuilder {
        QueryBuilder::new(action, &PipelineSettings::default())
    }

    #[test]
    fn projection_parses_prefixes() {
        let projection = Projection::parse("+role -password");
        assert!(!projection.exclusive);
        assert_eq!(
            projection.fields,
            vec![
                FieldSelection { field: "role".into(), included: true },
                FieldSelection { field: "password".into(), included: false },
            ]
        );
    }

    #[test]
    fn projection_applies_hidden_and_forced_fields() {
        let stored = doc(json!({"_id": "1", "name": "Ada", "role": "Admin", "password": "x"}));
        let hidden = vec!["role".to_string()];

        let default = Projection::default().apply(&stored, &hidden);
        assert!(!default.contains_key("role"));

        let forced = Projection::parse("+role -password").apply(&stored, &hidden);
        assert_eq!(forced, doc(json!({"_id": "1", "name": "Ada", "role": "Admin"})));

        let only_id = Projection::parse("_id").apply(&stored, &hidden);
        assert_eq!(only_id, doc(json!({"_id": "1"})));
    }

    #[test]
    fn sort_parses_directions() {
        assert_eq!(
            parse_sort("createdAt -name"),
            vec![
                SortKey { field: "createdAt".into(), direction: Direction::Ascending },
                SortKey { field: "name".into(), direction: Direction::Descending },
            ]
        );
    }

    #[test]
    fn index_defaults_to_first_page_oldest_first() {
        let ctx = builder(ActionKind::Index).build(&Request::new()).unwrap();
        assert_eq!(ctx.query.limit, Some(10));
        assert_eq!(ctx.query.sort, parse_sort("createdAt"));
        assert!(ctx.query.filter.is_empty());
    }

    #[test]
    fn index_reads_filters_and_paging() {
        let req = Request::new()
            .with_query("role", "Subscriber")
            .with_query("limit", "3")
            .with_query("skip", "2")
            .with_query("sort", "-name");
        let ctx = builder(ActionKind::Index).build(&req).unwrap();
        assert_eq!(ctx.query.filter, doc(json!({"role": "Subscriber"})));
        assert_eq!(ctx.query.limit, Some(3));
        assert_eq!(ctx.query.skip, 2);
        assert_eq!(ctx.query.sort[0].direction, Direction::Descending);
    }

    #[test]
    fn bad_limit_is_a_validation_error() {
        let req = Request::new().with_query("limit", "ten");
        let err = builder(ActionKind::Index).build(&req).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn count_ignores_paging() {
        let req = Request::new().with_query("limit", "3");
        let ctx = builder(ActionKind::Count).build(&req).unwrap();
        assert_eq!(ctx.query.limit, None);
    }

    #[test]
    fn update_takes_id_from_path() {
        let req = Request::new()
            .with_param("id", "user_1")
            .with_body(json!({"_id": "other", "name": "Bob", "__v": 0}));
        let ctx = builder(ActionKind::Update).build(&req).unwrap();
        assert_eq!(ctx.query.filter, doc(json!({"_id": "user_1"})));
        let payload = ctx.payload.unwrap();
        assert!(!payload.contains_key("_id"));
        assert!(carries_version(&payload));
    }

    #[test]
    fn show_without_id_fails() {
        let err = builder(ActionKind::Show).build(&Request::new()).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn create_rejects_non_object_body() {
        let req = Request::new().with_body(json!([1, 2]));
        assert_eq!(builder(ActionKind::Create).build(&req).unwrap_err().status(), 400);
    }

    #[test]
    fn context_mutators_chain() {
        let mut ctx = QueryContext::new(ActionKind::Index);
        ctx.select("+role")
            .sort("createdAt")
            .filter(doc(json!({"role": "Subscriber"})))
            .limit(5);
        assert_eq!(ctx.query.projection.fields.len(), 1);
        assert_eq!(ctx.query.filter["role"], json!("Subscriber"));
        assert!(matches!(ctx.into_operation(), Operation::Find(q) if q.limit == Some(5)));
    }

    #[test]
    fn textual_filters_match_stored_scalars() {
        let stored = doc(json!({"name": "Ada", "__v": 0, "active": true}));
        let query = |filter: Value| Query {
            filter: doc(filter),
            ..Query::default()
        };

        assert!(query(json!({"__v": "0"})).matches(&stored));
        assert!(query(json!({"__v": 0, "active": "true"})).matches(&stored));
        assert!(!query(json!({"__v": "1"})).matches(&stored));
        assert!(!query(json!({"name": 0})).matches(&stored));
        assert!(!query(json!({"missing": "0"})).matches(&stored));
    }
}
