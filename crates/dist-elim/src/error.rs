//! Failure taxonomy of the elimination pass.

use derive_more::{Display, Error};
use dist_ir::rewrite::IllegalOp;

pub type ElimResult<T> = Result<T, ElimError>;

/// Why a run of the pass failed. Every variant is fatal; the module is left
/// exactly as it was before the run, except for
/// [`ElimError::ResidualEliminatedKind`] and [`ElimError::IrValidation`],
/// which are detected after the commit.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum ElimError {
    /// A rule's structural precondition does not hold, e.g. a
    /// `dist.local_shape` whose operand is not produced by a live
    /// `dist.register_tensor`.
    #[display("missing dependency for `{op}`: {reason}")]
    PreconditionViolation {
        /// One-line rendering of the offending operation.
        op: String,
        reason: String,
    },

    /// Operations of an eliminated kind survived the commit.
    #[display("{} eliminated operation(s) remain: {}", ops.len(), join(ops))]
    ResidualEliminatedKind {
        ops: Vec<IllegalOp>,
    },

    /// A replacement value does not have the type of the result it replaces.
    #[display("result #{index} of `{op}` has type `{expected}`, but its replacement has type `{found}`")]
    TypeMismatch {
        op: String,
        index: usize,
        expected: String,
        found: String,
    },

    /// The module failed integrity validation after the commit.
    #[display("IR validation failed after `{pass}`:\n{report}")]
    IrValidation {
        pass: &'static str,
        report: String,
    },
}

impl ElimError {
    /// Stable, machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            ElimError::PreconditionViolation { .. } => "missing-dependency",
            ElimError::ResidualEliminatedKind { .. } => "residual-eliminated-kind",
            ElimError::TypeMismatch { .. } => "type-mismatch",
            ElimError::IrValidation { .. } => "ir-validation",
        }
    }

    pub(crate) fn precondition(op: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ElimError::PreconditionViolation {
            op: op.into(),
            reason: reason.to_string(),
        }
    }
}

fn join(ops: &[IllegalOp]) -> String {
    ops.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
