//! Single-pass, all-or-nothing elimination engine.
//!
//! The engine runs in two phases over a snapshot of the module:
//!
//! 1. **Match**: every snapshot op with a rule is rewritten into detached
//!    operations recorded as [`Mutations`]; replacement types are checked
//!    against the original results. The module is not touched.
//! 2. **Commit**: the recorded mutations are applied in module order.
//!
//! A failure in the match phase discards everything created so far, leaving
//! the module unchanged. Ops created by the run are never in the snapshot,
//! so nothing is visited twice.

use std::collections::{BTreeMap, HashMap};

use dist_ir::dialect::core::Module;
use dist_ir::printer::{print_op_header, print_type};
use dist_ir::rewrite::{Mutations, PatternRewriter};
use dist_ir::{IrContext, OpRef, TypeRef, ValueRef, walk};

use crate::dispatch::{Dispatch, DistOpKind, RuleSet};
use crate::error::{ElimError, ElimResult};
use crate::observer::{RewriteEvent, RewriteObserver};

/// Statistics of a successful run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElimStats {
    /// Number of operations in the snapshot.
    pub visited: usize,
    /// Committed rewrites per kind.
    pub rewrites: BTreeMap<DistOpKind, usize>,
}

impl ElimStats {
    pub fn count(&self, kind: DistOpKind) -> usize {
        self.rewrites.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.rewrites.values().sum()
    }

    /// Whether the run left the module untouched.
    pub fn is_noop(&self) -> bool {
        self.total() == 0
    }
}

/// A rewrite recorded in the match phase, waiting for the commit.
struct PendingRewrite {
    op: OpRef,
    kind: DistOpKind,
    rule: &'static str,
    mutations: Mutations,
}

pub struct EliminationEngine<'a> {
    rules: &'a RuleSet,
    observer: Option<&'a dyn RewriteObserver>,
}

impl<'a> EliminationEngine<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self {
            rules,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Option<&'a dyn RewriteObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Eliminate every operation with a rule in one pass over `module`.
    pub fn run(&self, ctx: &mut IrContext, module: Module) -> ElimResult<ElimStats> {
        let snapshot = walk::collect_ops(ctx, module.body(ctx));
        let mut stats = ElimStats {
            visited: snapshot.len(),
            ..ElimStats::default()
        };

        let pending = match self.match_all(ctx, &snapshot) {
            Ok(pending) => pending,
            Err((err, pending)) => {
                tracing::warn!(
                    reason = err.reason(),
                    discarded = pending.len(),
                    "aborting elimination: {err}"
                );
                for rewrite in pending.into_iter().rev() {
                    rewrite.mutations.discard(ctx);
                }
                return Err(err);
            }
        };

        self.commit(ctx, module, pending, &mut stats);
        Ok(stats)
    }

    /// Match phase. On failure, returns the error together with every
    /// rewrite recorded so far so the caller can discard them.
    #[allow(clippy::result_large_err)]
    fn match_all(
        &self,
        ctx: &mut IrContext,
        snapshot: &[OpRef],
    ) -> Result<Vec<PendingRewrite>, (ElimError, Vec<PendingRewrite>)> {
        let mut pending = Vec::new();

        for &op in snapshot {
            let Dispatch::Rule { kind, rule } = self.rules.dispatch(ctx, op) else {
                tracing::trace!(op = %ctx.op_full_name(op), "no rule");
                continue;
            };

            let mut rewriter = PatternRewriter::new();
            let outcome = rule.match_and_rewrite(ctx, op, &mut rewriter);
            let mutations = rewriter.take_mutations();

            let checked = outcome.and_then(|matched| {
                if matched {
                    check_result_types(ctx, op, &mutations)?;
                }
                Ok(matched)
            });

            match checked {
                Ok(true) => {
                    tracing::debug!(%kind, rule = rule.name(), "rewrite recorded");
                    pending.push(PendingRewrite {
                        op,
                        kind,
                        rule: rule.name(),
                        mutations,
                    });
                }
                Ok(false) => mutations.discard(ctx),
                Err(err) => {
                    mutations.discard(ctx);
                    return Err((err, pending));
                }
            }
        }

        Ok(pending)
    }

    fn commit(
        &self,
        ctx: &mut IrContext,
        module: Module,
        pending: Vec<PendingRewrite>,
        stats: &mut ElimStats,
    ) {
        let module_block = module.first_block(ctx);
        let mut remap: HashMap<ValueRef, ValueRef> = HashMap::new();

        for rewrite in pending {
            if let Some(observer) = self.observer {
                let op_text = print_op_header(ctx, rewrite.op);
                observer.on_rewrite(&RewriteEvent {
                    kind: rewrite.kind,
                    rule: rewrite.rule,
                    op: &op_text,
                });
            }

            let replaced = rewrite.mutations.apply(ctx, rewrite.op, module_block, &|v| {
                resolve(&remap, v)
            });
            remap.extend(replaced);
            *stats.rewrites.entry(rewrite.kind).or_default() += 1;
        }
    }
}

/// Follow `remap` until reaching a value that was not replaced.
fn resolve(remap: &HashMap<ValueRef, ValueRef>, mut value: ValueRef) -> ValueRef {
    while let Some(&next) = remap.get(&value) {
        value = next;
    }
    value
}

fn check_result_types(ctx: &IrContext, op: OpRef, mutations: &Mutations) -> ElimResult<()> {
    let Some(found) = mutations.replacement_types(ctx) else {
        return Ok(());
    };
    let expected = ctx.op_result_types(op);

    let describe = |ty: Option<&TypeRef>| match ty {
        Some(&ty) => print_type(ctx, ty),
        None => "<none>".to_owned(),
    };
    let len = expected.len().max(found.len());
    for index in 0..len {
        let (e, f) = (expected.get(index), found.get(index));
        if e != f {
            return Err(ElimError::TypeMismatch {
                op: print_op_header(ctx, op),
                index,
                expected: describe(e),
                found: describe(f),
            });
        }
    }
    Ok(())
}
