//! Conversion target: which operations and dialects may remain after a
//! conversion.

use std::collections::HashSet;
use std::ops::ControlFlow;

use derive_more::Display;

use crate::Symbol;
use crate::context::IrContext;
use crate::refs::{OpRef, RegionRef};
use crate::walk;

/// Result of a legality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalityCheck {
    /// The operation may remain.
    Legal,
    /// The operation must have been converted away.
    Illegal,
}

/// Legality rules for a conversion.
///
/// Everything is legal by default. Specific op rules take precedence over
/// dialect rules.
#[derive(Debug, Clone, Default)]
pub struct ConversionTarget {
    legal_dialects: HashSet<Symbol>,
    illegal_dialects: HashSet<Symbol>,
    legal_ops: HashSet<(Symbol, Symbol)>,
    illegal_ops: HashSet<(Symbol, Symbol)>,
}

impl ConversionTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an entire dialect as legal.
    pub fn add_legal_dialect(&mut self, dialect: Symbol) -> &mut Self {
        self.legal_dialects.insert(dialect);
        self
    }

    /// Mark an entire dialect as illegal.
    pub fn add_illegal_dialect(&mut self, dialect: Symbol) -> &mut Self {
        self.illegal_dialects.insert(dialect);
        self
    }

    /// Mark a specific operation as legal.
    pub fn add_legal_op(&mut self, dialect: Symbol, op_name: Symbol) -> &mut Self {
        self.legal_ops.insert((dialect, op_name));
        self
    }

    /// Mark a specific operation as illegal.
    pub fn add_illegal_op(&mut self, dialect: Symbol, op_name: Symbol) -> &mut Self {
        self.illegal_ops.insert((dialect, op_name));
        self
    }

    /// Check if a specific operation is legal.
    ///
    /// Resolution order: op rules, then dialect rules, then legal.
    pub fn is_legal(&self, ctx: &IrContext, op: OpRef) -> LegalityCheck {
        let data = ctx.op(op);
        let key = (data.dialect, data.name);

        if self.legal_ops.contains(&key) {
            return LegalityCheck::Legal;
        }
        if self.illegal_ops.contains(&key) {
            return LegalityCheck::Illegal;
        }
        if self.legal_dialects.contains(&data.dialect) {
            return LegalityCheck::Legal;
        }
        if self.illegal_dialects.contains(&data.dialect) {
            return LegalityCheck::Illegal;
        }
        LegalityCheck::Legal
    }

    /// Every illegal operation nested in `region`, in walk order.
    pub fn verify(&self, ctx: &IrContext, region: RegionRef) -> Vec<IllegalOp> {
        let mut illegal = Vec::new();

        let _ = walk::walk_region::<()>(ctx, region, &mut |op| {
            if self.is_legal(ctx, op) == LegalityCheck::Illegal {
                let data = ctx.op(op);
                illegal.push(IllegalOp {
                    op,
                    dialect: data.dialect,
                    name: data.name,
                });
            }
            ControlFlow::Continue(walk::WalkAction::Advance)
        });

        illegal
    }
}

/// An illegal operation found during verification.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{dialect}.{name} ({op})")]
pub struct IllegalOp {
    pub op: OpRef,
    pub dialect: Symbol,
    pub name: Symbol,
}
