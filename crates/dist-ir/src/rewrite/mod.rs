//! Rewrite infrastructure: in-place mutation with RAUW.
//!
//! Patterns record their work on a [`PatternRewriter`]; the recorded
//! [`Mutations`] are applied to the module or discarded as a unit.

pub mod conversion_target;
pub mod pattern;
pub mod rewriter;

pub use conversion_target::{ConversionTarget, IllegalOp, LegalityCheck};
pub use pattern::RewritePattern;
pub use rewriter::{Mutations, PatternRewriter};
