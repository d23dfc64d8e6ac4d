//! # Transform Engine
//!
//! Shapes each result document into its externally visible representation. Every
//! transform sees the raw document (`doc`) and the representation built so far
//! (`ret`), and may delete or rewrite fields of `ret`.
//!
//! The chain for one action is fixed when its handler is built:
//!
//! 1. credential stripping (from [`PipelineSettings::credential_field`](crate::settings::PipelineSettings))
//! 2. the caller-supplied defaults from [`Defaults`](crate::settings::Defaults)
//! 3. the action's own transform hooks, in registration order
//!
//! so a resource transform can never observe the credential field.

use crate::document::Document;
use std::sync::Arc;

pub trait Transform: Send + Sync {
    fn transform(&self, doc: &Document, ret: &mut Document);
}

/// Adapts a closure into a [`Transform`].
pub struct FnTransform<F>(pub F);

impl<F> Transform for FnTransform<F>
where
    F: Fn(&Document, &mut Document) + Send + Sync,
{
    fn transform(&self, doc: &Document, ret: &mut Document) {
        (self.0)(doc, ret)
    }
}

/// Removes one field from the representation.
#[derive(Debug, Clone)]
pub struct StripField(pub String);

impl Transform for StripField {
    fn transform(&self, _doc: &Document, ret: &mut Document) {
        ret.remove(&self.0);
    }
}

#[derive(Clone, Default)]
pub struct TransformChain {
    transforms: Vec<Arc<dyn Transform>>,
}

impl TransformChain {
    pub fn new(
        credential_field: Option<&str>,
        defaults: &[Arc<dyn Transform>],
        hooks: impl IntoIterator<Item = Arc<dyn Transform>>,
    ) -> Self {
        let mut transforms: Vec<Arc<dyn Transform>> = Vec::new();
        if let Some(field) = credential_field {
            transforms.push(Arc::new(StripField(field.to_string())));
        }
        transforms.extend(defaults.iter().cloned());
        transforms.extend(hooks);
        Self { transforms }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Runs the whole chain over one raw document.
    pub fn apply(&self, doc: &Document) -> Document {
        let mut ret = doc.clone();
        for transform in &self.transforms {
            transform.transform(doc, &mut ret);
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn credential_is_stripped_before_hooks_run() {
        let saw_password = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = saw_password.clone();
        let hook: Arc<dyn Transform> = Arc::new(FnTransform(move |_: &Document, ret: &mut Document| {
            if ret.contains_key("password") {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        }));

        let chain = TransformChain::new(Some("password"), &[], [hook]);
        let out = chain.apply(&doc(json!({"name": "Ada", "password": "secret"})));

        assert_eq!(out, doc(json!({"name": "Ada"})));
        assert!(!saw_password.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn later_hooks_win() {
        let first: Arc<dyn Transform> = Arc::new(FnTransform(|_: &Document, ret: &mut Document| {
            ret.insert("name".into(), json!("first"));
        }));
        let second: Arc<dyn Transform> = Arc::new(FnTransform(|_: &Document, ret: &mut Document| {
            ret.insert("name".into(), json!("second"));
        }));

        let chain = TransformChain::new(None, &[], [first, second]);
        assert_eq!(chain.apply(&doc(json!({"name": "raw"})))["name"], json!("second"));
    }

    #[test]
    fn hooks_see_raw_document() {
        let hook: Arc<dyn Transform> = Arc::new(FnTransform(|doc: &Document, ret: &mut Document| {
            ret.insert("had_password".into(), json!(doc.contains_key("password")));
        }));
        let chain = TransformChain::new(Some("password"), &[], [hook]);
        let out = chain.apply(&doc(json!({"password": "x"})));
        assert_eq!(out, doc(json!({"had_password": true})));
    }
}
