//! Routers for conditional edges
//!
//! A router is a pure function of the current state that names the next node.
//! It must return one of the targets it declared when the edge was wired; the
//! driver treats anything else as a fatal configuration error.
//!
//! Two implementations are provided:
//!
//! - [`FnRouter`] wraps a closure, for simple boolean or computed decisions.
//! - [`DirectiveRouter`] reads a free-form field, parses it into an
//!   enumerated [`Directive`], and maps the directive to a node. Input that
//!   does not parse resolves to the directive's documented fallback and is
//!   logged as a degraded-path event; it never raises.
//!
//! ```text
//!   state ──► extract(&state) ──► D::parse(raw) ──┬─► Some(d) ─┐
//!                                                 └─► None ──► D::fallback() (warn)
//!                                                              │
//!                                             map(d, &state) ──► NodeId
//! ```

use crate::graph::NodeId;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

/// Selects the next node for a conditional edge
pub trait Router<S>: Send + Sync {
    /// Name used in logs and diagrams
    fn name(&self) -> &str;

    /// Pick the next node from the current state
    fn route(&self, state: &S) -> NodeId;

    /// Every node this router may return
    fn targets(&self) -> Vec<NodeId>;
}

/// Router backed by a closure
pub struct FnRouter<S> {
    name: String,
    targets: Vec<NodeId>,
    func: Arc<dyn Fn(&S) -> NodeId + Send + Sync>,
}

impl<S> FnRouter<S> {
    /// Create a router with its declared targets
    pub fn new<I, T, F>(name: impl Into<String>, targets: I, func: F) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
        F: Fn(&S) -> NodeId + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            func: Arc::new(func),
        }
    }
}

impl<S> Router<S> for FnRouter<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn route(&self, state: &S) -> NodeId {
        (self.func)(state)
    }

    fn targets(&self) -> Vec<NodeId> {
        self.targets.clone()
    }
}

/// An enumerated routing directive with a documented default
pub trait Directive: Sized + Debug {
    /// Parse raw field content; `None` when unrecognized or empty
    fn parse(raw: &str) -> Option<Self>;

    /// Directive used when the input does not parse
    fn fallback() -> Self;

    /// Parse, falling back to [`Directive::fallback`] on unrecognized input
    ///
    /// Returns the directive and whether the fallback was used.
    fn resolve(raw: &str) -> (Self, bool) {
        match Self::parse(raw) {
            Some(directive) => (directive, false),
            None => (Self::fallback(), true),
        }
    }
}

/// Router that parses a state field into a [`Directive`]
pub struct DirectiveRouter<S, D> {
    name: String,
    targets: Vec<NodeId>,
    extract: Box<dyn Fn(&S) -> &str + Send + Sync>,
    map: Box<dyn Fn(D, &S) -> NodeId + Send + Sync>,
    _directive: PhantomData<fn() -> D>,
}

impl<S, D> DirectiveRouter<S, D>
where
    D: Directive,
{
    /// Create a directive router
    ///
    /// * `extract` - reads the raw directive text from the state
    /// * `map` - turns a parsed directive into a node name
    pub fn new<I, T, E, M>(name: impl Into<String>, targets: I, extract: E, map: M) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
        E: Fn(&S) -> &str + Send + Sync + 'static,
        M: Fn(D, &S) -> NodeId + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            extract: Box::new(extract),
            map: Box::new(map),
            _directive: PhantomData,
        }
    }

    /// Parse the directive currently held in `state`
    pub fn directive(&self, state: &S) -> D {
        let raw = (self.extract)(state);
        let (directive, degraded) = D::resolve(raw);
        if degraded {
            tracing::warn!(
                router = %self.name,
                raw = %raw,
                fallback = ?directive,
                "unrecognized routing directive, using fallback"
            );
        }
        directive
    }
}

impl<S, D> Router<S> for DirectiveRouter<S, D>
where
    D: Directive,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn route(&self, state: &S) -> NodeId {
        let directive = self.directive(state);
        (self.map)(directive, state)
    }

    fn targets(&self) -> Vec<NodeId> {
        self.targets.clone()
    }
}
