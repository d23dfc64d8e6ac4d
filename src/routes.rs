//! # Route Table
//!
//! A minimal router standing in for an HTTP framework. Each mounted [`Handler`]
//! contributes the conventional route of its action:
//!
//! | Method | Pattern | Action |
//! |--------|---------|--------|
//! | GET    | `/users.:format?`       | index   |
//! | POST   | `/users.:format?`       | create  |
//! | GET    | `/users/count.:format?` | count   |
//! | GET    | `/users/:id.:format?`   | show    |
//! | PUT    | `/users/:id.:format?`   | update  |
//! | DELETE | `/users/:id.:format?`   | destroy |
//!
//! Routes match in mount order, so `count` must be mounted before `show`.

use resource_framework::{ErrorReport, Handler, Method, PipelineError, Request, Response};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// One parsed route pattern such as `/users/:id.:format?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    segments: Vec<Segment>,
    optional_format: bool,
}

impl Pattern {
    pub fn parse(pattern: &str) -> Self {
        let (body, optional_format) = match pattern.strip_suffix(".:format?") {
            Some(body) => (body, true),
            None => (pattern, false),
        };
        let segments = body
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        Self {
            segments,
            optional_format,
        }
    }

    /// Path parameters when `path` matches, including `format` when present.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (i, (segment, part)) in self.segments.iter().zip(&parts).enumerate() {
            let mut part = *part;
            if self.optional_format && i == parts.len() - 1 {
                if let Some((base, format)) = part.rsplit_once('.') {
                    if format.is_empty() {
                        return None;
                    }
                    params.push(("format".to_string(), format.to_string()));
                    part = base;
                }
            }
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => params.push((name.clone(), part.to_string())),
            }
        }
        Some(params)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => write!(f, "/{s}")?,
                Segment::Param(name) => write!(f, "/:{name}")?,
            }
        }
        if self.optional_format {
            f.write_str(".:format?")?;
        }
        Ok(())
    }
}

struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the conventional route of `handler`'s action.
    pub fn mount(&mut self, handler: Handler) -> &mut Self {
        let descriptor = handler.descriptor();
        let action = descriptor.action();
        let pattern = Pattern::parse(&action.route(&descriptor.collection()));
        debug!(method = %action.method(), %pattern, resource = %descriptor, "Mounted");
        self.routes.push(Route {
            method: action.method(),
            pattern,
            handler,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// `(METHOD, pattern)` of every route, in match order.
    pub fn describe(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| format!("{} {}", r.method, r.pattern))
            .collect()
    }

    /// The first route matching, with its extracted path parameters.
    pub fn resolve(&self, method: Method, path: &str) -> Option<(&Handler, Vec<(String, String)>)> {
        self.routes
            .iter()
            .filter(|r| r.method == method)
            .find_map(|r| r.pattern.matches(path).map(|params| (&r.handler, params)))
    }

    /// Routes `request` and always produces a response; unknown routes render 404.
    pub async fn dispatch(&self, method: Method, path: &str, mut request: Request) -> Response {
        match self.resolve(method, path) {
            Some((handler, params)) => {
                for (name, value) in params {
                    request = request.with_param(name, value);
                }
                handler.respond(request).await
            }
            None => {
                let err = PipelineError::not_found(format!("Cannot {method} {path}"));
                ErrorReport::from(&err).into_response()
            }
        }
    }
}
