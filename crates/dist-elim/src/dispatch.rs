//! Classification of operations into eliminated kinds, and the rule table.

use std::fmt;

use dist_ir::dialect::dist;
use dist_ir::rewrite::RewritePattern;
use dist_ir::{IrContext, OpRef, Symbol};

use crate::config::ElimConfig;
use crate::error::ElimError;
use crate::rules::{ForwardRegisteredShape, LowerAllReduce, MaterializeZeros};

/// The closed family of operations the pass eliminates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DistOpKind {
    RegisterTensor,
    LocalOffsets,
    LocalShape,
    AllReduce,
}

impl DistOpKind {
    pub const ALL: [DistOpKind; 4] = [
        DistOpKind::RegisterTensor,
        DistOpKind::LocalOffsets,
        DistOpKind::LocalShape,
        DistOpKind::AllReduce,
    ];

    /// The kind of `op`, or `None` for anything outside the family.
    pub fn classify(ctx: &IrContext, op: OpRef) -> Option<Self> {
        let data = ctx.op(op);
        if data.dialect != dist::DIALECT_NAME() {
            return None;
        }
        Self::ALL.into_iter().find(|kind| kind.op_name() == data.name)
    }

    /// Operation name within the `dist` dialect.
    pub fn op_name(self) -> Symbol {
        match self {
            DistOpKind::RegisterTensor => dist::REGISTER_TENSOR(),
            DistOpKind::LocalOffsets => dist::LOCAL_OFFSETS(),
            DistOpKind::LocalShape => dist::LOCAL_SHAPE(),
            DistOpKind::AllReduce => dist::ALL_REDUCE(),
        }
    }

    pub fn full_name(self) -> &'static str {
        match self {
            DistOpKind::RegisterTensor => "dist.register_tensor",
            DistOpKind::LocalOffsets => "dist.local_offsets",
            DistOpKind::LocalShape => "dist.local_shape",
            DistOpKind::AllReduce => "dist.all_reduce",
        }
    }
}

impl fmt::Display for DistOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name())
    }
}

/// A rewrite rule of the pass.
pub type ElimRule = dyn RewritePattern<Error = ElimError>;

/// Outcome of looking up the rule for an operation.
pub enum Dispatch<'a> {
    NoRule,
    Rule { kind: DistOpKind, rule: &'a ElimRule },
}

/// One rule per eliminated kind, configured for a pass instance.
#[derive(Debug)]
pub struct RuleSet {
    zeros: MaterializeZeros,
    forward_shape: ForwardRegisteredShape,
    all_reduce: LowerAllReduce,
}

impl RuleSet {
    pub fn new(config: &ElimConfig) -> Self {
        Self {
            zeros: MaterializeZeros,
            forward_shape: ForwardRegisteredShape,
            all_reduce: LowerAllReduce::new(config.all_reduce),
        }
    }

    pub fn rule_for(&self, kind: DistOpKind) -> &ElimRule {
        match kind {
            DistOpKind::RegisterTensor | DistOpKind::LocalOffsets => &self.zeros,
            DistOpKind::LocalShape => &self.forward_shape,
            DistOpKind::AllReduce => &self.all_reduce,
        }
    }

    pub fn dispatch(&self, ctx: &IrContext, op: OpRef) -> Dispatch<'_> {
        match DistOpKind::classify(ctx, op) {
            Some(kind) => Dispatch::Rule {
                kind,
                rule: self.rule_for(kind),
            },
            None => Dispatch::NoRule,
        }
    }
}
