//! Rewrite pattern trait.

use super::rewriter::PatternRewriter;
use crate::context::IrContext;
use crate::refs::OpRef;

/// A pattern that can match and transform IR operations.
///
/// # Arguments
///
/// - `ctx`: Mutable reference to the IR context for querying and creating
///   detached operations.
/// - `op`: The operation to match against.
/// - `rewriter`: Accumulates mutations (replace, insert, erase, add_module_op).
///
/// # Return Value
///
/// `Ok(true)` if the pattern matched and recorded mutations, `Ok(false)` if
/// it does not apply, `Err` if it matched but the operation cannot be
/// rewritten.
pub trait RewritePattern {
    type Error;

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> Result<bool, Self::Error>;

    /// Human-readable name for diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
