//! Rewrite rules, one per replacement strategy.
//!
//! Rules never touch the module: every new operation is created detached and
//! recorded on the [`PatternRewriter`], so the engine can still discard the
//! whole run.

use dist_ir::dialect::{arith, dist, func, tensor};
use dist_ir::ops::{DialectOp, expect_operands};
use dist_ir::printer::print_op_header;
use dist_ir::rewrite::{PatternRewriter, RewritePattern};
use dist_ir::{IrContext, OpRef, ValueRef, symbols};

use crate::config::AllReduceLowering;
use crate::dispatch::DistOpKind;
use crate::error::{ElimError, ElimResult};

symbols! {
    PRINTF => "printf",
}

/// Replaces every result of `dist.register_tensor` and `dist.local_offsets`
/// with an `arith.const` zero of the same type.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaterializeZeros;

impl RewritePattern for MaterializeZeros {
    type Error = ElimError;

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> ElimResult<bool> {
        if !matches!(
            DistOpKind::classify(ctx, op),
            Some(DistOpKind::RegisterTensor | DistOpKind::LocalOffsets)
        ) {
            return Ok(false);
        }

        let location = ctx.op(op).location;
        let result_tys = ctx.op_result_types(op).to_vec();
        let mut zeros = Vec::with_capacity(result_tys.len());
        for ty in result_tys {
            let zero = arith::zero(ctx, location, ty);
            rewriter.insert_op(zero.op_ref());
            zeros.push(zero.result(ctx));
        }
        rewriter.erase_op(zeros);
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "materialize-zeros"
    }
}

/// Forwards `dist.local_shape %t` to the shape operand of the
/// `dist.register_tensor` that produced `%t`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForwardRegisteredShape;

impl ForwardRegisteredShape {
    fn registered_shape(ctx: &IrContext, op: OpRef) -> Result<ValueRef, String> {
        expect_operands(ctx, op, 1).map_err(|e| e.to_string())?;
        let ptensor = ctx.op_operands(op)[0];

        let Some(producer) = ctx.defining_op(ptensor) else {
            return Err("operand is a block argument, not a dist.register_tensor result".to_owned());
        };
        if ctx.is_removed(producer) {
            return Err("operand is produced by an erased operation".to_owned());
        }
        let register = dist::RegisterTensor::from_op(ctx, producer).map_err(|e| e.to_string())?;
        register
            .shape(ctx)
            .ok_or_else(|| "dist.register_tensor has no shape operand".to_owned())
    }
}

impl RewritePattern for ForwardRegisteredShape {
    type Error = ElimError;

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> ElimResult<bool> {
        if !dist::LocalShape::matches(ctx, op) {
            return Ok(false);
        }

        let shape = Self::registered_shape(ctx, op)
            .map_err(|reason| ElimError::precondition(print_op_header(ctx, op), reason))?;
        rewriter.erase_op(vec![shape]);
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "forward-registered-shape"
    }
}

/// Lowers `dist.all_reduce` to a local identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct LowerAllReduce {
    lowering: AllReduceLowering,
}

impl LowerAllReduce {
    pub fn new(lowering: AllReduceLowering) -> Self {
        Self { lowering }
    }
}

impl RewritePattern for LowerAllReduce {
    type Error = ElimError;

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> ElimResult<bool> {
        let Ok(all_reduce) = dist::AllReduce::from_op(ctx, op) else {
            return Ok(false);
        };

        let Some(input) = all_reduce.tensor(ctx) else {
            return Err(ElimError::precondition(
                print_op_header(ctx, op),
                "dist.all_reduce has no tensor operand",
            ));
        };
        if ctx.op_result_types(op).len() != 1 {
            return Err(ElimError::precondition(
                print_op_header(ctx, op),
                "dist.all_reduce must have exactly one result",
            ));
        }
        let location = ctx.op(op).location;

        match self.lowering {
            AllReduceLowering::Forward => {
                rewriter.erase_op(vec![input]);
                return Ok(true);
            }
            AllReduceLowering::TraceCall => {
                let decl = func::declaration(ctx, location, PRINTF());
                rewriter.add_module_op(decl.op_ref());
                let call = func::call(ctx, location, PRINTF(), [], []);
                rewriter.insert_op(call.op_ref());
            }
            AllReduceLowering::Cast => {}
        }

        // Identity: the cast keeps the input's type.
        let input_ty = ctx.value_ty(input);
        let cast = tensor::cast(ctx, location, input, input_ty);
        rewriter.replace_op(cast.op_ref());
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "lower-all-reduce"
    }
}
