//! Value integrity and use-chain validation.
//!
//! Two checks run over a module:
//!
//! 1. **Scope validation**: every operand refers to a live value that is
//!    visible at the point of use: a block argument of an enclosing block, or
//!    a result of an operation that precedes the user in an enclosing block.
//! 2. **Use-chain consistency**: the use-chains stored in `IrContext` exactly
//!    match the operands of all operations in the module.

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

use derive_more::Display;

use crate::context::IrContext;
use crate::dialect::core::Module;
use crate::refs::{BlockRef, OpRef, RegionRef, ValueDef, ValueRef};
use crate::walk;

// ============================================================================
// Error types
// ============================================================================

/// An operand that does not resolve to a visible, live value.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("stale value: operand #{operand_index} of {consumer_op} references {description}")]
pub struct StaleValueError {
    /// Full name of the consuming operation (e.g. "dist.local_shape").
    pub consumer_op: String,
    /// Index of the stale operand within the consuming operation.
    pub operand_index: usize,
    /// Human-readable description of the stale value.
    pub description: String,
}

/// A use-chain inconsistency.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{message}")]
pub struct UseChainError {
    pub message: String,
}

/// Result of validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub stale_errors: Vec<StaleValueError>,
    pub use_chain_errors: Vec<UseChainError>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.stale_errors.is_empty() && self.use_chain_errors.is_empty()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "validation passed");
        }
        if !self.stale_errors.is_empty() {
            writeln!(f, "{} stale value(s) found:", self.stale_errors.len())?;
            for err in &self.stale_errors {
                writeln!(f, "  - {}", err)?;
            }
        }
        if !self.use_chain_errors.is_empty() {
            writeln!(
                f,
                "{} use-chain error(s) found:",
                self.use_chain_errors.len()
            )?;
            for err in &self.use_chain_errors {
                writeln!(f, "  - {}", err)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Scope validation (value integrity)
// ============================================================================

/// Describe a value for diagnostic purposes.
fn describe_value(ctx: &IrContext, v: ValueRef) -> String {
    match ctx.value_def(v) {
        ValueDef::OpResult(op, idx) => {
            let state = if ctx.is_removed(op) {
                "erased "
            } else if ctx.op(op).parent_block.is_none() {
                "detached "
            } else {
                ""
            };
            format!("result #{} of {}{}", idx, state, ctx.op_full_name(op))
        }
        ValueDef::BlockArg(block, idx) => format!("block arg #{} of {}", idx, block),
    }
}

fn check_region(
    ctx: &IrContext,
    region: RegionRef,
    visible: &HashSet<ValueRef>,
    errors: &mut Vec<StaleValueError>,
) {
    for &block in &ctx.region(region).blocks {
        check_block(ctx, block, visible.clone(), errors);
    }
}

fn check_block(
    ctx: &IrContext,
    block: BlockRef,
    mut visible: HashSet<ValueRef>,
    errors: &mut Vec<StaleValueError>,
) {
    visible.extend(ctx.block_args(block).iter().copied());

    for &op in &ctx.block(block).ops {
        for (i, &operand) in ctx.op_operands(op).iter().enumerate() {
            if !visible.contains(&operand) {
                errors.push(StaleValueError {
                    consumer_op: ctx.op_full_name(op),
                    operand_index: i,
                    description: describe_value(ctx, operand),
                });
            }
        }
        for &nested in &ctx.op(op).regions {
            check_region(ctx, nested, &visible, errors);
        }
        visible.extend(ctx.op_results(op).iter().copied());
    }
}

/// Check that every operand in the module resolves to a visible, live value.
pub fn validate_value_integrity(ctx: &IrContext, module: Module) -> ValidationResult {
    let mut errors = Vec::new();
    check_region(ctx, module.body(ctx), &HashSet::new(), &mut errors);
    ValidationResult {
        stale_errors: errors,
        use_chain_errors: vec![],
    }
}

// ============================================================================
// Use-chain consistency validation
// ============================================================================

/// Validate that the use-chain stored in `IrContext` matches the actual operands.
///
/// Checks two directions:
/// 1. For every operand of every op, there must be a corresponding entry in `uses(operand)`.
/// 2. For every use recorded on a value defined in the module, the user must
///    be a live operation whose operand points back.
pub fn validate_use_chains(ctx: &IrContext, module: Module) -> ValidationResult {
    let mut errors = Vec::new();
    let body = module.body(ctx);

    let mut actual_uses: HashSet<(ValueRef, OpRef, u32)> = HashSet::new();
    let mut defined: HashSet<ValueRef> = HashSet::new();

    let _ = walk::walk_region::<()>(ctx, body, &mut |op| {
        for (idx, &operand) in ctx.op_operands(op).iter().enumerate() {
            actual_uses.insert((operand, op, idx as u32));
        }
        defined.extend(ctx.op_results(op).iter().copied());
        for &region in &ctx.op(op).regions {
            for &block in &ctx.region(region).blocks {
                defined.extend(ctx.block_args(block).iter().copied());
            }
        }
        ControlFlow::Continue(walk::WalkAction::Advance)
    });
    for &block in &ctx.region(body).blocks {
        defined.extend(ctx.block_args(block).iter().copied());
    }

    // Direction 1: actual operand → use-chain entry must exist
    for &(val, op, idx) in &actual_uses {
        let found = ctx
            .uses(val)
            .iter()
            .any(|u| u.user == op && u.operand_index == idx);
        if !found {
            errors.push(UseChainError {
                message: format!(
                    "operand #{} of {} ({}) uses {} but no use-chain entry exists",
                    idx,
                    ctx.op_full_name(op),
                    op,
                    val,
                ),
            });
        }
    }

    // Direction 2: use-chain entry → actual operand must exist
    for &val in &defined {
        for u in ctx.uses(val) {
            if ctx.is_removed(u.user) {
                errors.push(UseChainError {
                    message: format!(
                        "use-chain entry for {} refers to erased {}",
                        val, u.user
                    ),
                });
                continue;
            }
            let points_back = ctx
                .op_operands(u.user)
                .get(u.operand_index as usize)
                .is_some_and(|&v| v == val);
            if !points_back {
                errors.push(UseChainError {
                    message: format!(
                        "use-chain entry for {} claims use by {} operand #{}, but no such operand exists",
                        val, u.user, u.operand_index,
                    ),
                });
            }
        }
    }

    ValidationResult {
        stale_errors: vec![],
        use_chain_errors: errors,
    }
}

/// Run both validations and combine results.
pub fn validate_module(ctx: &IrContext, module: Module) -> ValidationResult {
    let scope = validate_value_integrity(ctx, module);
    let uses = validate_use_chains(ctx, module);
    ValidationResult {
        stale_errors: scope.stale_errors,
        use_chain_errors: uses.use_chain_errors,
    }
}
