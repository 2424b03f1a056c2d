//! Arena-based SSA intermediate representation.
//!
//! All IR entities live in an [`IrContext`] and are addressed by `Copy`
//! references ([`OpRef`], [`ValueRef`], ...). Use-chains are maintained on
//! every mutation, so replacing all uses of a value is a direct operation.
//!
//! Besides the storage itself the crate provides typed op wrappers for a few
//! small dialects, a text printer and parser, validation, and the rewrite
//! plumbing passes are built on.

pub mod context;
pub mod dialect;
pub mod location;
pub mod ops;
pub mod parser;
pub mod printer;
pub mod refs;
pub mod rewrite;
pub mod symbol;
pub mod types;
pub mod validation;
pub mod walk;

pub use context::{
    BlockArgData, BlockData, IrContext, OperationData, OperationDataBuilder, RegionData, Use,
    ValueData,
};
pub use location::{Location, Span};
pub use ops::{ConversionError, DialectOp};
pub use refs::{BlockRef, OpRef, PathRef, RegionRef, TypeRef, ValueDef, ValueRef};
pub use symbol::Symbol;
pub use types::{Attribute, PathInterner, TypeData, TypeDataBuilder, TypeInterner};
