//! Arith dialect: scalar constants.

use crate::context::{IrContext, OperationDataBuilder};
use crate::dialect::core;
use crate::location::Location;
use crate::refs::{TypeRef, ValueRef};
use crate::types::Attribute;
use crate::{dialect_op, symbols};

symbols! {
    DIALECT_NAME => "arith",
    CONST => "const",
    VALUE => "value",
}

dialect_op! {
    /// `arith.const {value = ...} : ty`
    Const = "arith"."const"
}

pub fn r#const(ctx: &mut IrContext, location: Location, ty: TypeRef, value: Attribute) -> Const {
    let op = OperationDataBuilder::new(location, DIALECT_NAME(), CONST())
        .attr(VALUE(), value)
        .result(ty)
        .create(ctx);
    Const(op)
}

/// A zero constant of type `ty`. Float scalars get a float zero.
pub fn zero(ctx: &mut IrContext, location: Location, ty: TypeRef) -> Const {
    let value = if core::is_float(ctx, ty) {
        Attribute::FloatBits(0.0f64.to_bits())
    } else {
        Attribute::IntBits(0)
    };
    r#const(ctx, location, ty, value)
}

impl Const {
    pub fn value(&self, ctx: &IrContext) -> Option<Attribute> {
        ctx.op_attr(self.0, VALUE()).cloned()
    }

    pub fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn result_ty(&self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_types(self.0)[0]
    }
}
