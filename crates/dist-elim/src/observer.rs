//! Hooks invoked at each committed rewrite.

use std::cell::RefCell;

use crate::dispatch::DistOpKind;

/// A rewrite about to be committed.
#[derive(Clone, Copy, Debug)]
pub struct RewriteEvent<'a> {
    pub kind: DistOpKind,
    /// Name of the rule that produced the rewrite.
    pub rule: &'static str,
    /// One-line rendering of the original operation.
    pub op: &'a str,
}

/// Observes committed rewrites. Never consulted by the algorithm itself.
pub trait RewriteObserver {
    fn on_rewrite(&self, event: &RewriteEvent<'_>);
}

/// Logs every rewrite at `debug` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl RewriteObserver for TracingObserver {
    fn on_rewrite(&self, event: &RewriteEvent<'_>) {
        tracing::debug!(kind = %event.kind, rule = event.rule, "rewrite `{}`", event.op);
    }
}

/// An owned copy of a [`RewriteEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRewrite {
    pub kind: DistOpKind,
    pub rule: &'static str,
    pub op: String,
}

/// Collects every rewrite it observes.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<RecordedRewrite>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedRewrite> {
        self.events.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<DistOpKind> {
        self.events.borrow().iter().map(|e| e.kind).collect()
    }
}

impl RewriteObserver for RecordingObserver {
    fn on_rewrite(&self, event: &RewriteEvent<'_>) {
        self.events.borrow_mut().push(RecordedRewrite {
            kind: event.kind,
            rule: event.rule,
            op: event.op.to_owned(),
        });
    }
}
