//! End-to-end behavior of the dist elimination pass on textual IR.

use dist_elim::{AllReduceLowering, DistElimPass, DistOpKind, ElimConfig, ElimError};
use dist_ir::dialect::core::Module;
use dist_ir::dialect::tensor;
use dist_ir::ops::DialectOp;
use dist_ir::parser::parse_test_module;
use dist_ir::printer::print_module;
use dist_ir::validation::validate_module;
use dist_ir::{IrContext, walk};
use insta::assert_snapshot;

fn run_with(config: ElimConfig, input: &str) -> (IrContext, Module, Result<String, ElimError>) {
    let mut ctx = IrContext::new();
    let module = parse_test_module(&mut ctx, input);
    let result = DistElimPass::new(config)
        .run(&mut ctx, module)
        .map(|_| print_module(&ctx, module.op_ref()));
    (ctx, module, result)
}

fn eliminate(input: &str) -> String {
    let (_, _, result) = run_with(ElimConfig::default(), input);
    result.unwrap_or_else(|e| panic!("elimination failed: {e}"))
}

const MIXED: &str = r#"core.module @m {
  %0 = arith.const {value = 16} : core.index
  %1 = arith.const {value = 0.0} : tensor.ranked(core.f32) {shape = [4, 4]}
  %2 = dist.register_tensor %0, %1 : core.i64
  %3, %4 = dist.local_offsets %0, %2 : core.index, core.index
  func.func @main {
    %5 = dist.local_shape %2 : core.index
    %6 = dist.all_reduce %1 {op = @sum} : tensor.ranked(core.f32) {shape = [4, 4]}
    test.use %3, %4, %5, %6
  }
}"#;

#[test]
fn eliminates_every_dist_op() {
    assert_snapshot!(eliminate(MIXED), @r"
    core.module @m {
      %0 = arith.const {value = 16} : core.index
      %1 = arith.const {value = 0.0} : tensor.ranked(core.f32) {shape = [4, 4]}
      %2 = arith.const {value = 0} : core.i64
      %3 = arith.const {value = 0} : core.index
      %4 = arith.const {value = 0} : core.index
      func.func @main {
        %5 = tensor.cast %1 : tensor.ranked(core.f32) {shape = [4, 4]}
        test.use %3, %4, %0, %5
      }
    }
    ");
}

#[test]
fn second_run_is_a_noop() {
    let mut ctx = IrContext::new();
    let module = parse_test_module(&mut ctx, MIXED);
    let pass = DistElimPass::default();

    let first = pass.run(&mut ctx, module).unwrap();
    assert_eq!(first.total(), 4);
    let once = print_module(&ctx, module.op_ref());

    let second = pass.run(&mut ctx, module).unwrap();
    assert!(second.is_noop());
    assert_eq!(print_module(&ctx, module.op_ref()), once);
}

#[test]
fn replacements_keep_result_types() {
    let mut ctx = IrContext::new();
    let module = parse_test_module(&mut ctx, MIXED);
    let consumer = walk::collect_ops(&ctx, module.body(&ctx))
        .into_iter()
        .find(|&op| ctx.op_full_name(op) == "test.use")
        .unwrap();
    let before: Vec<_> = ctx
        .op_operands(consumer)
        .iter()
        .map(|&v| ctx.value_ty(v))
        .collect();

    DistElimPass::default().run(&mut ctx, module).unwrap();

    let after: Vec<_> = ctx
        .op_operands(consumer)
        .iter()
        .map(|&v| ctx.value_ty(v))
        .collect();
    assert_eq!(before, after);
    assert!(validate_module(&ctx, module).is_ok());
}

#[test]
fn minimal_module_forwards_the_shape() {
    let mut ctx = IrContext::new();
    let module = parse_test_module(
        &mut ctx,
        r#"core.module @m {
  %0 = arith.const {value = 4} : core.index
  %1 = dist.register_tensor %0 : core.i64
  %2 = dist.local_shape %1 : core.index
  test.consume %2
}"#,
    );
    let shape = ctx.op_result(module.ops(&ctx)[0], 0);

    let stats = DistElimPass::default().run(&mut ctx, module).unwrap();
    assert_eq!(stats.count(DistOpKind::RegisterTensor), 1);
    assert_eq!(stats.count(DistOpKind::LocalShape), 1);

    let ops = module.ops(&ctx);
    let consumer = *ops.last().unwrap();
    assert_eq!(ctx.op_operands(consumer), &[shape]);
    assert_snapshot!(print_module(&ctx, module.op_ref()), @r"
    core.module @m {
      %0 = arith.const {value = 4} : core.index
      %1 = arith.const {value = 0} : core.i64
      test.consume %0
    }
    ");
}

#[test]
fn register_result_users_see_a_zero() {
    assert_snapshot!(eliminate(r#"core.module @m {
  %0 = arith.const {value = 4} : core.index
  %1 = dist.register_tensor %0 : core.i64
  %2 = dist.local_shape %1 : core.index
  test.consume %1, %2
}"#), @r"
    core.module @m {
      %0 = arith.const {value = 4} : core.index
      %1 = arith.const {value = 0} : core.i64
      test.consume %1, %0
    }
    ");
}

#[test]
fn shape_forwarding_is_transitive() {
    assert_snapshot!(eliminate(r#"core.module @m {
  %0 = arith.const {value = 32} : core.index
  %1 = dist.register_tensor %0 : core.i64
  %2 = dist.local_shape %1 : core.index
  %3 = dist.register_tensor %2 : core.i64
  %4 = dist.local_shape %3 : core.index
  %5 = dist.register_tensor %4 : core.i64
  %6 = dist.local_shape %5 : core.index
  test.consume %6
}"#), @r"
    core.module @m {
      %0 = arith.const {value = 32} : core.index
      %1 = arith.const {value = 0} : core.i64
      %2 = arith.const {value = 0} : core.i64
      %3 = arith.const {value = 0} : core.i64
      test.consume %0
    }
    ");
}

#[test]
fn local_shape_of_all_reduce_fails_without_mutation() {
    let input = r#"core.module @m {
  %0 = arith.const {value = 4} : core.index
  %1 = dist.register_tensor %0 : core.i64
  %2, %3 = dist.local_offsets %0, %1 : core.index, core.index
  %4 = dist.all_reduce %1 {op = @sum} : core.i64
  %5 = dist.local_shape %4 : core.index
  test.consume %2, %3, %5
}"#;
    let (ctx, module, result) = run_with(ElimConfig::default(), input);

    let err = result.unwrap_err();
    assert_eq!(err.reason(), "missing-dependency");
    assert_snapshot!(err.to_string(), @"missing dependency for `%0 = dist.local_shape %? : core.index`: expected `dist.register_tensor`, found `dist.all_reduce`");
    assert_eq!(print_module(&ctx, module.op_ref()).trim_end(), input);
    assert!(validate_module(&ctx, module).is_ok());
}

#[test]
fn failed_run_can_be_retried_after_fixing_the_input() {
    let mut ctx = IrContext::new();
    let module = parse_test_module(
        &mut ctx,
        r#"core.module @m {
  %0 = test.opaque : core.i64
  %1 = dist.local_shape %0 : core.index
  test.consume %1
}"#,
    );
    let pass = DistElimPass::default();
    assert!(pass.run(&mut ctx, module).is_err());

    // Nothing was left half-applied, so a healthy module in the same context still works.
    let other = parse_test_module(
        &mut ctx,
        "core.module @n {\n  %0 = arith.const {value = 1} : core.index\n  %1 = dist.register_tensor %0 : core.i64\n}",
    );
    assert_eq!(pass.run(&mut ctx, other).unwrap().total(), 1);
}

#[test]
fn all_reduce_on_4x4_f32_becomes_an_identity_cast() {
    let mut ctx = IrContext::new();
    let module = parse_test_module(
        &mut ctx,
        r#"core.module @m {
  %0 = test.load : tensor.ranked(core.f32) {shape = [4, 4]}
  %1 = dist.all_reduce %0 {op = @sum} : tensor.ranked(core.f32) {shape = [4, 4]}
  test.store %1
}"#,
    );
    let t = ctx.op_result(module.ops(&ctx)[0], 0);

    DistElimPass::default().run(&mut ctx, module).unwrap();

    let ops = module.ops(&ctx);
    let cast = tensor::Cast::from_op(&ctx, ops[1]).unwrap();
    assert_eq!(cast.input(&ctx), t);
    let ty = ctx.value_ty(cast.result(&ctx));
    assert_eq!(tensor::shape_of(&ctx, ty), Some(vec![4, 4]));
    assert_eq!(ty, ctx.value_ty(t));
    assert_eq!(ctx.op_operands(ops[2]), &[cast.result(&ctx)]);
}

#[test]
fn forward_strategy_drops_same_typed_all_reduce() {
    let (_, _, result) = run_with(
        ElimConfig::new().with_all_reduce(AllReduceLowering::Forward),
        r#"core.module @m {
  %0 = test.load : tensor.ranked(core.f32) {shape = [4, 4]}
  %1 = dist.all_reduce %0 {op = @sum} : tensor.ranked(core.f32) {shape = [4, 4]}
  %2 = dist.all_reduce %1 {op = @max} : tensor.ranked(core.f32) {shape = [4, 4]}
  test.store %2
}"#,
    );
    assert_snapshot!(result.unwrap(), @r"
    core.module @m {
      %0 = test.load : tensor.ranked(core.f32) {shape = [4, 4]}
      test.store %0
    }
    ");
}

#[test]
fn reshaping_all_reduce_is_a_type_mismatch() {
    let input = r#"core.module @m {
  %0 = test.load : tensor.ranked(core.f32) {shape = [8, 4]}
  %1 = dist.all_reduce %0 {op = @sum} : tensor.ranked(core.f32) {shape = [4, 4]}
  test.store %1
}"#;
    for lowering in AllReduceLowering::ALL {
        let (ctx, module, result) = run_with(ElimConfig::new().with_all_reduce(lowering), input);

        let err = result.unwrap_err();
        assert_eq!(err.reason(), "type-mismatch", "{lowering}");
        let ElimError::TypeMismatch {
            index,
            expected,
            found,
            ..
        } = &err
        else {
            panic!("{lowering}: unexpected error {err}");
        };
        assert_eq!(*index, 0);
        assert_eq!(expected, "tensor.ranked(core.f32) {shape = [4, 4]}");
        assert_eq!(found, "tensor.ranked(core.f32) {shape = [8, 4]}");
        assert_eq!(print_module(&ctx, module.op_ref()).trim_end(), input);
        assert!(validate_module(&ctx, module).is_ok());
    }
}

#[test]
fn trace_call_strategy_declares_printf_once() {
    let (_, _, result) = run_with(
        ElimConfig::new().with_all_reduce(AllReduceLowering::TraceCall),
        r#"core.module @m {
  %0 = test.load : tensor.ranked(core.f32) {shape = [4, 4]}
  %1 = dist.all_reduce %0 {op = @sum} : tensor.ranked(core.f32) {shape = [4, 4]}
  %2 = dist.all_reduce %1 {op = @sum} : tensor.ranked(core.f32) {shape = [4, 4]}
  test.store %2
}"#,
    );
    assert_snapshot!(result.unwrap(), @r"
    core.module @m {
      func.func @printf {
      }
      %0 = test.load : tensor.ranked(core.f32) {shape = [4, 4]}
      func.call {callee = @printf}
      %1 = tensor.cast %0 : tensor.ranked(core.f32) {shape = [4, 4]}
      func.call {callee = @printf}
      %2 = tensor.cast %1 : tensor.ranked(core.f32) {shape = [4, 4]}
      test.store %2
    }
    ");
}

#[test]
fn trace_call_reuses_an_existing_printf() {
    let (_, _, result) = run_with(
        ElimConfig::new().with_all_reduce(AllReduceLowering::TraceCall),
        r#"core.module @m {
  %0 = test.load : core.f32
  func.func @printf {
  }
  %1 = dist.all_reduce %0 {op = @sum} : core.f32
  test.store %1
}"#,
    );
    let text = result.unwrap();
    assert_eq!(text.matches("func.func @printf").count(), 1);
    assert!(text.starts_with("core.module @m {\n  %0 = test.load"));
}

#[test]
fn module_without_dist_ops_is_untouched() {
    let input = r#"core.module @m {
  %0 = arith.const {value = 4} : core.index
  func.func @f {
    test.consume %0
  }
}"#;
    let (_, _, result) = run_with(ElimConfig::default(), input);
    assert_eq!(result.unwrap().trim_end(), input);
}
