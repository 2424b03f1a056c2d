//! Typed wrappers over raw operations.
//!
//! Provides the `DialectOp` trait and the `dialect_op!` macro that declares
//! a `Copy` newtype around [`OpRef`] for one `dialect.op` pair.

use derive_more::Display;

use crate::context::IrContext;
use crate::refs::OpRef;

/// Error when converting an operation to a dialect-specific wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ConversionError {
    /// Operation name doesn't match expected dialect.operation.
    #[display("expected `{expected}`, found `{actual}`")]
    WrongOperation {
        expected: &'static str,
        actual: String,
    },
    /// Wrong number of operands.
    #[display("expected {expected} operand(s), found {actual}")]
    WrongOperandCount { expected: usize, actual: usize },
}

impl std::error::Error for ConversionError {}

/// Trait for dialect operation wrappers.
pub trait DialectOp: Sized + Copy {
    const DIALECT_NAME: &'static str;
    const OP_NAME: &'static str;

    fn from_op(ctx: &IrContext, op: OpRef) -> Result<Self, ConversionError>;
    fn op_ref(&self) -> OpRef;

    fn matches(ctx: &IrContext, op: OpRef) -> bool {
        let data = ctx.op(op);
        data.dialect == crate::Symbol::new(Self::DIALECT_NAME)
            && data.name == crate::Symbol::new(Self::OP_NAME)
    }
}

/// Declare a dialect operation wrapper.
///
/// ```
/// use dist_ir::dialect_op;
///
/// dialect_op! {
///     /// `test.marker`
///     Marker = "test"."marker"
/// }
/// ```
#[macro_export]
macro_rules! dialect_op {
    ($($(#[$attr:meta])* $wrapper:ident = $dialect:literal . $op:literal),* $(,)?) => {
        $(
            $(#[$attr])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
            pub struct $wrapper($crate::OpRef);

            impl $crate::ops::DialectOp for $wrapper {
                const DIALECT_NAME: &'static str = $dialect;
                const OP_NAME: &'static str = $op;

                fn from_op(
                    ctx: &$crate::IrContext,
                    op: $crate::OpRef,
                ) -> Result<Self, $crate::ops::ConversionError> {
                    if !<Self as $crate::ops::DialectOp>::matches(ctx, op) {
                        return Err($crate::ops::ConversionError::WrongOperation {
                            expected: concat!($dialect, ".", $op),
                            actual: ctx.op_full_name(op),
                        });
                    }
                    Ok(Self(op))
                }

                fn op_ref(&self) -> $crate::OpRef {
                    self.0
                }
            }

            impl $wrapper {
                /// Get the underlying OpRef.
                pub fn op_ref(&self) -> $crate::OpRef {
                    self.0
                }
            }
        )*
    };
}

/// Check the operand count of an operation against an exact expectation.
pub fn expect_operands(ctx: &IrContext, op: OpRef, expected: usize) -> Result<(), ConversionError> {
    let actual = ctx.op_operands(op).len();
    if actual != expected {
        return Err(ConversionError::WrongOperandCount { expected, actual });
    }
    Ok(())
}
