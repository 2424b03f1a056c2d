//! Dist dialect: distribution-aware tensor operations.
//!
//! These ops describe how a global tensor is partitioned across devices.
//! Nothing downstream understands them; `dist-elim` removes them.

use crate::context::{IrContext, OperationDataBuilder};
use crate::location::Location;
use crate::refs::{TypeRef, ValueRef};
use crate::types::Attribute;
use crate::{Symbol, dialect_op, symbols};

symbols! {
    DIALECT_NAME => "dist",
    REGISTER_TENSOR => "register_tensor",
    LOCAL_OFFSETS => "local_offsets",
    LOCAL_SHAPE => "local_shape",
    ALL_REDUCE => "all_reduce",
    OP => "op",
}

dialect_op! {
    /// `%id = dist.register_tensor %shape, %extra... : ty`
    RegisterTensor = "dist"."register_tensor",
    /// `%o... = dist.local_offsets %operands... : tys`
    LocalOffsets = "dist"."local_offsets",
    /// `%s = dist.local_shape %ptensor : ty`
    LocalShape = "dist"."local_shape",
    /// `%r = dist.all_reduce %t {op = @sum} : ty`
    AllReduce = "dist"."all_reduce",
}

pub fn register_tensor(
    ctx: &mut IrContext,
    location: Location,
    shape: ValueRef,
    extra: impl IntoIterator<Item = ValueRef>,
    result_ty: TypeRef,
) -> RegisterTensor {
    let op = OperationDataBuilder::new(location, DIALECT_NAME(), REGISTER_TENSOR())
        .operand(shape)
        .operands(extra)
        .result(result_ty)
        .create(ctx);
    RegisterTensor(op)
}

pub fn local_offsets(
    ctx: &mut IrContext,
    location: Location,
    operands: impl IntoIterator<Item = ValueRef>,
    result_tys: impl IntoIterator<Item = TypeRef>,
) -> LocalOffsets {
    let op = OperationDataBuilder::new(location, DIALECT_NAME(), LOCAL_OFFSETS())
        .operands(operands)
        .results(result_tys)
        .create(ctx);
    LocalOffsets(op)
}

pub fn local_shape(
    ctx: &mut IrContext,
    location: Location,
    ptensor: ValueRef,
    result_ty: TypeRef,
) -> LocalShape {
    let op = OperationDataBuilder::new(location, DIALECT_NAME(), LOCAL_SHAPE())
        .operand(ptensor)
        .result(result_ty)
        .create(ctx);
    LocalShape(op)
}

pub fn all_reduce(
    ctx: &mut IrContext,
    location: Location,
    tensor: ValueRef,
    result_ty: TypeRef,
    reduction: Symbol,
) -> AllReduce {
    let op = OperationDataBuilder::new(location, DIALECT_NAME(), ALL_REDUCE())
        .operand(tensor)
        .attr(OP(), Attribute::Symbol(reduction))
        .result(result_ty)
        .create(ctx);
    AllReduce(op)
}

impl RegisterTensor {
    /// The global shape operand. `None` for a malformed op with no operands.
    pub fn shape(&self, ctx: &IrContext) -> Option<ValueRef> {
        ctx.op_operands(self.0).first().copied()
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

impl LocalOffsets {
    pub fn results<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_results(self.0)
    }
}

impl LocalShape {
    /// The partitioned tensor whose local shape is queried.
    pub fn ptensor(&self, ctx: &IrContext) -> Option<ValueRef> {
        ctx.op_operands(self.0).first().copied()
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

impl AllReduce {
    pub fn tensor(&self, ctx: &IrContext) -> Option<ValueRef> {
        ctx.op_operands(self.0).first().copied()
    }

    /// The reduction kind (`@sum`, `@max`, ...). Informational only.
    pub fn reduction(&self, ctx: &IrContext) -> Option<Symbol> {
        ctx.op_attr(self.0, OP()).and_then(Attribute::as_symbol)
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn result_ty(&self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_types(self.0)[0]
    }
}
