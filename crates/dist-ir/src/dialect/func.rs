//! Func dialect: symbol-named functions and direct calls.

use smallvec::smallvec;

use crate::context::{BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::location::Location;
use crate::refs::{OpRef, RegionRef, TypeRef, ValueRef};
use crate::types::Attribute;
use crate::{Symbol, dialect_op, symbols};

symbols! {
    DIALECT_NAME => "func",
    FUNC => "func",
    CALL => "call",
    SYM_NAME => "sym_name",
    CALLEE => "callee",
}

dialect_op! {
    /// `func.func @name { body }`
    Func = "func"."func",
    /// `func.call {callee = @name} %args : results`
    Call = "func"."call",
}

/// Create a function whose body is a single empty block.
///
/// With no ops in the body this is a declaration: no arguments, no results.
pub fn declaration(ctx: &mut IrContext, location: Location, sym_name: Symbol) -> Func {
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
    func(ctx, location, sym_name, body)
}

pub fn func(ctx: &mut IrContext, location: Location, sym_name: Symbol, body: RegionRef) -> Func {
    let op = OperationDataBuilder::new(location, DIALECT_NAME(), FUNC())
        .attr(SYM_NAME(), Attribute::Symbol(sym_name))
        .region(body)
        .create(ctx);
    Func(op)
}

pub fn call(
    ctx: &mut IrContext,
    location: Location,
    callee: Symbol,
    args: impl IntoIterator<Item = ValueRef>,
    results: impl IntoIterator<Item = TypeRef>,
) -> Call {
    let op = OperationDataBuilder::new(location, DIALECT_NAME(), CALL())
        .operands(args)
        .results(results)
        .attr(CALLEE(), Attribute::Symbol(callee))
        .create(ctx);
    Call(op)
}

impl Func {
    pub fn sym_name(&self, ctx: &IrContext) -> Option<Symbol> {
        ctx.op_attr(self.0, SYM_NAME()).and_then(Attribute::as_symbol)
    }

    pub fn body(&self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }
}

impl Call {
    pub fn callee(&self, ctx: &IrContext) -> Option<Symbol> {
        ctx.op_attr(self.0, CALLEE()).and_then(Attribute::as_symbol)
    }

    pub fn args<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.0)
    }
}

/// The `sym_name` of any operation that declares one.
pub fn symbol_of(ctx: &IrContext, op: OpRef) -> Option<Symbol> {
    ctx.op_attr(op, SYM_NAME()).and_then(Attribute::as_symbol)
}
