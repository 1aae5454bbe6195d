//! Replaces literal attribute values with references.
//!
//! Provider state only has values. To recover the links between
//! resources, every intrinsic in a resource's template properties is
//! evaluated against the deployed stack, and any state string equal to
//! one of those results is swapped for the rendered intrinsic.

use crate::declarations::Declarations;
use crate::diag::Diagnostics;
use crate::mapping::ResourceMapping;
use crate::path::AttributePath;
use crate::reference::Reference;
use crate::render::{render, RenderContext, RenderError};
use crate::template::{EvalContext, Expr, Intrinsic};
use crate::traits::ResourceTraits;
use crate::value::{json_document, Value};

/// What an intrinsic evaluated to, in the form it takes in state.
#[derive(Debug, Clone, PartialEq)]
enum Evaluated {
    Text(String),
    List(Vec<String>),
}

struct Candidate<'t> {
    intrinsic: &'t Intrinsic,
    evaluated: Evaluated,
    /// Filled on first match.
    rendered: Option<Result<Reference, RenderError>>,
}

/// Resolves references for the resources of one run.
pub struct DependencyResolver<'a> {
    render: RenderContext<'a>,
    eval: &'a EvalContext<'a>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(render: RenderContext<'a>, eval: &'a EvalContext<'a>) -> Self {
        DependencyResolver { render, eval }
    }

    /// Rewrites `attributes` in place. Returns the number of values
    /// replaced. Render failures are reported as warnings and the value
    /// keeps its literal form.
    pub fn resolve(
        &self,
        mapping: &ResourceMapping,
        traits: &ResourceTraits,
        attributes: &mut Value,
        decls: &mut Declarations,
        diags: &mut Diagnostics,
    ) -> usize {
        let Some(resource) = self.render.template.resource(&mapping.logical_id) else {
            return 0;
        };
        let mut candidates = self.candidates(&resource.properties);
        if candidates.is_empty() {
            return 0;
        }

        let mut walker = Walker {
            resolver: self,
            traits,
            candidates: &mut candidates,
            decls,
            replaced: 0,
        };
        walker.walk(&AttributePath::root(), attributes);
        let replaced = walker.replaced;

        for candidate in candidates {
            if let Some(Err(err)) = candidate.rendered {
                log::warn!("{}: {}", mapping.address(), err);
                diags.warning(
                    Some(mapping.address()),
                    format!("could not render {}", candidate.intrinsic.tag()),
                    err.to_string(),
                );
            }
        }
        log::debug!("{}: {} references resolved", mapping.address(), replaced);
        replaced
    }

    fn candidates<'t>(&self, properties: &'t Expr) -> Vec<Candidate<'t>> {
        let mut candidates: Vec<Candidate<'t>> = Vec::new();
        for intrinsic in properties.intrinsics() {
            let Some(evaluated) = self.evaluate(intrinsic) else {
                continue;
            };
            // The first intrinsic producing a value claims it.
            if candidates.iter().any(|c| c.evaluated == evaluated) {
                continue;
            }
            candidates.push(Candidate {
                intrinsic,
                evaluated,
                rendered: None,
            });
        }
        candidates
    }

    fn evaluate(&self, intrinsic: &Intrinsic) -> Option<Evaluated> {
        match self.eval.evaluate(&Expr::Intrinsic(intrinsic.clone()))? {
            serde_json::Value::String(s) if !s.is_empty() => Some(Evaluated::Text(s)),
            serde_json::Value::Number(n) => Some(Evaluated::Text(n.to_string())),
            serde_json::Value::Array(items) if !items.is_empty() => items
                .iter()
                .map(|i| i.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Evaluated::List),
            _ => None,
        }
    }
}

struct Walker<'r, 'a, 't> {
    resolver: &'r DependencyResolver<'a>,
    traits: &'r ResourceTraits,
    candidates: &'r mut Vec<Candidate<'t>>,
    decls: &'r mut Declarations,
    replaced: usize,
}

impl Walker<'_, '_, '_> {
    fn walk(&mut self, path: &AttributePath, value: &mut Value) {
        if !path.is_root() && self.traits.is_unconfigurable(path) {
            return;
        }
        match value {
            Value::String(s) => {
                if let Some(reference) = self.matching(|e| matches!(e, Evaluated::Text(t) if t == s)) {
                    *value = Value::Reference(reference);
                    self.replaced += 1;
                } else if let Some(doc) = json_document(s) {
                    let mut doc = Value::from(doc);
                    self.walk_document(path, &mut doc);
                    *value = Value::Document(Box::new(doc));
                }
            }
            Value::Number(n) => {
                let text = n.to_string();
                if let Some(reference) = self.matching(|e| matches!(e, Evaluated::Text(t) if *t == text)) {
                    *value = Value::Reference(reference);
                    self.replaced += 1;
                }
            }
            Value::List(items) => {
                let texts: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
                if let Some(texts) = texts {
                    let found = self.matching(|e| match e {
                        Evaluated::List(list) => !texts.is_empty() && *list == texts,
                        Evaluated::Text(_) => false,
                    });
                    if let Some(reference) = found {
                        *value = Value::Reference(reference);
                        self.replaced += 1;
                        return;
                    }
                }
                for (i, item) in items.iter_mut().enumerate() {
                    self.walk(&path.index(i), item);
                }
            }
            Value::Object(entries) => {
                for (key, item) in entries.iter_mut() {
                    self.walk(&path.child(key), item);
                }
            }
            Value::Document(inner) => self.walk_document(path, inner),
            _ => {}
        }
    }

    /// Inside a JSON document no path is unconfigurable.
    fn walk_document(&mut self, path: &AttributePath, value: &mut Value) {
        match value {
            Value::String(s) => {
                if let Some(reference) = self.matching(|e| matches!(e, Evaluated::Text(t) if t == s)) {
                    *value = Value::Reference(reference);
                    self.replaced += 1;
                }
            }
            Value::List(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    self.walk_document(&path.index(i), item);
                }
            }
            Value::Object(entries) => {
                for (key, item) in entries.iter_mut() {
                    self.walk_document(&path.child(key), item);
                }
            }
            Value::Document(inner) => self.walk_document(path, inner),
            _ => {}
        }
    }

    /// Renders the first candidate accepted by `pred`, once.
    fn matching(&mut self, pred: impl Fn(&Evaluated) -> bool) -> Option<Reference> {
        let candidate = self.candidates.iter_mut().find(|c| pred(&c.evaluated))?;
        let ctx = self.resolver.render;
        let decls = &mut *self.decls;
        let rendered = candidate
            .rendered
            .get_or_insert_with(|| render(candidate.intrinsic, &ctx, decls, None));
        rendered.as_ref().ok().cloned()
    }
}
