//! Core dialect: the `core.module` container and scalar types.

use smallvec::smallvec;

use crate::context::{BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::location::Location;
use crate::ops::DialectOp;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef};
use crate::types::{Attribute, TypeDataBuilder};
use crate::{Symbol, dialect_op, symbols};

symbols! {
    DIALECT_NAME => "core",
    SYM_NAME => "sym_name",
    INDEX => "index",
    I1 => "i1",
    I32 => "i32",
    I64 => "i64",
    F32 => "f32",
}

dialect_op! {
    /// `core.module`: owns a single body region whose first block holds the
    /// top-level operations.
    Module = "core"."module"
}

/// Create an empty module with one body block.
pub fn module(ctx: &mut IrContext, location: Location, name: Symbol) -> Module {
    let block = ctx.create_block(BlockData {
        location,
        args: vec![],
        ops: smallvec![],
        parent_region: None,
    });
    let body = ctx.create_region(RegionData {
        location,
        blocks: smallvec![block],
        parent_op: None,
    });
    let op = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new("module"))
        .attr(SYM_NAME(), Attribute::Symbol(name))
        .region(body)
        .create(ctx);
    Module(op)
}

impl Module {
    /// Wrap `op`, verifying it is a `core.module` with exactly one body region.
    pub fn new(ctx: &IrContext, op: OpRef) -> Option<Self> {
        let module = Self::from_op(ctx, op).ok()?;
        (ctx.op(op).regions.len() == 1).then_some(module)
    }

    /// Get the module's body region.
    pub fn body(self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    /// Get the first block of the module body.
    pub fn first_block(self, ctx: &IrContext) -> Option<BlockRef> {
        ctx.region(self.body(ctx)).blocks.first().copied()
    }

    /// Get all top-level operations in the module's first block.
    pub fn ops(self, ctx: &IrContext) -> Vec<OpRef> {
        match self.first_block(ctx) {
            Some(block) => ctx.block(block).ops.to_vec(),
            None => vec![],
        }
    }

    /// Get the module name (from `sym_name` attribute).
    pub fn name(self, ctx: &IrContext) -> Option<Symbol> {
        ctx.op_attr(self.0, SYM_NAME()).and_then(Attribute::as_symbol)
    }
}

/// Intern the scalar type `core.<name>`.
pub fn scalar_type(ctx: &mut IrContext, name: Symbol) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(DIALECT_NAME(), name).build())
}

pub fn index_type(ctx: &mut IrContext) -> TypeRef {
    scalar_type(ctx, INDEX())
}

pub fn i1_type(ctx: &mut IrContext) -> TypeRef {
    scalar_type(ctx, I1())
}

pub fn i32_type(ctx: &mut IrContext) -> TypeRef {
    scalar_type(ctx, I32())
}

pub fn i64_type(ctx: &mut IrContext) -> TypeRef {
    scalar_type(ctx, I64())
}

pub fn f32_type(ctx: &mut IrContext) -> TypeRef {
    scalar_type(ctx, F32())
}

/// Whether `ty` is a floating-point scalar.
pub fn is_float(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, DIALECT_NAME(), F32())
}
