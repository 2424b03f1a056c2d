//! Post-commit check that no eliminated operation survives.

use dist_ir::dialect::core::Module;
use dist_ir::rewrite::{ConversionTarget, IllegalOp};
use dist_ir::{IrContext, Symbol};

use crate::dispatch::DistOpKind;
use crate::error::{ElimError, ElimResult};

/// A target marking the four eliminated ops illegal and `legal_dialects`
/// legal. Everything else stays legal.
pub fn conversion_target(legal_dialects: &[Symbol]) -> ConversionTarget {
    let mut target = ConversionTarget::new();
    for &dialect in legal_dialects {
        target.add_legal_dialect(dialect);
    }
    for kind in DistOpKind::ALL {
        target.add_illegal_op(dist_ir::dialect::dist::DIALECT_NAME(), kind.op_name());
    }
    target
}

/// Every operation of an eliminated kind left in `module`, in walk order.
pub fn residual_ops(ctx: &IrContext, module: Module) -> Vec<IllegalOp> {
    conversion_target(&[]).verify(ctx, module.body(ctx))
}

pub fn is_fully_eliminated(ctx: &IrContext, module: Module) -> bool {
    residual_ops(ctx, module).is_empty()
}

/// Fail with [`ElimError::ResidualEliminatedKind`] if anything is left.
pub fn check(ctx: &IrContext, module: Module) -> ElimResult<()> {
    let ops = residual_ops(ctx, module);
    if ops.is_empty() {
        Ok(())
    } else {
        Err(ElimError::ResidualEliminatedKind { ops })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dist_ir::parser::parse_test_module;

    #[test]
    fn reports_nested_leftovers_in_walk_order() {
        let mut ctx = IrContext::new();
        let module = parse_test_module(
            &mut ctx,
            r#"core.module @m {
  %0 = arith.const {value = 4} : core.index
  %1 = dist.register_tensor %0 : core.i64
  func.func @main {
    %2 = dist.local_shape %1 : core.index
    %3 = dist.device_count : core.index
  }
}"#,
        );
        let err = check(&ctx, module).unwrap_err();
        assert_eq!(err.reason(), "residual-eliminated-kind");
        let ElimError::ResidualEliminatedKind { ops } = err else {
            unreachable!()
        };
        let names: Vec<_> = ops.iter().map(|o| format!("{}.{}", o.dialect, o.name)).collect();
        assert_eq!(names, vec!["dist.register_tensor", "dist.local_shape"]);
    }

    #[test]
    fn clean_module_passes() {
        let mut ctx = IrContext::new();
        let module = parse_test_module(
            &mut ctx,
            "core.module @m {\n  %0 = arith.const {value = 0} : core.i64\n}",
        );
        assert!(check(&ctx, module).is_ok());
        assert!(is_fully_eliminated(&ctx, module));
    }

    #[test]
    fn target_keeps_other_dist_ops_legal() {
        let mut ctx = IrContext::new();
        let module = parse_test_module(
            &mut ctx,
            "core.module @m {\n  %0 = dist.device_count : core.index\n}",
        );
        let target = conversion_target(&[Symbol::new("arith")]);
        assert!(target.verify(&ctx, module.body(&ctx)).is_empty());
    }
}
