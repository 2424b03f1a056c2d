//! Tensor dialect: ranked tensor types and the identity `tensor.cast`.

use crate::context::{IrContext, OperationDataBuilder};
use crate::location::Location;
use crate::refs::{TypeRef, ValueRef};
use crate::types::{Attribute, TypeDataBuilder};
use crate::{dialect_op, symbols};

symbols! {
    DIALECT_NAME => "tensor",
    CAST => "cast",
    RANKED => "ranked",
    SHAPE => "shape",
}

dialect_op! {
    /// `tensor.cast %src : ty`: reinterprets a tensor as another tensor type
    /// without touching its data.
    Cast = "tensor"."cast"
}

pub fn cast(ctx: &mut IrContext, location: Location, input: ValueRef, result_ty: TypeRef) -> Cast {
    let op = OperationDataBuilder::new(location, DIALECT_NAME(), CAST())
        .operand(input)
        .result(result_ty)
        .create(ctx);
    Cast(op)
}

impl Cast {
    pub fn input(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

/// Intern `tensor.ranked(elem) {shape = [..]}`.
pub fn ranked_type(ctx: &mut IrContext, element: TypeRef, shape: &[u64]) -> TypeRef {
    let dims = shape.iter().map(|&d| Attribute::IntBits(d)).collect();
    ctx.types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), RANKED())
            .param(element)
            .attr(SHAPE(), Attribute::List(dims))
            .build(),
    )
}

/// Whether `ty` is a ranked tensor type.
pub fn is_ranked(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, DIALECT_NAME(), RANKED())
}

/// Static shape of a ranked tensor type.
pub fn shape_of(ctx: &IrContext, ty: TypeRef) -> Option<Vec<u64>> {
    if !is_ranked(ctx, ty) {
        return None;
    }
    match ctx.types.get(ty).attrs.get(&SHAPE())? {
        Attribute::List(dims) => dims.iter().map(Attribute::as_int).collect(),
        _ => None,
    }
}

/// Element type of a ranked tensor type.
pub fn element_type(ctx: &IrContext, ty: TypeRef) -> Option<TypeRef> {
    if !is_ranked(ctx, ty) {
        return None;
    }
    ctx.types.get(ty).params.first().copied()
}
