//! The outward-facing pass driver.

use std::rc::Rc;

use dist_ir::dialect::core::Module;
use dist_ir::dialect::{arith, dist, func, tensor};
use dist_ir::rewrite::ConversionTarget;
use dist_ir::validation::validate_module;
use dist_ir::{IrContext, Symbol};

use crate::config::{AllReduceLowering, ElimConfig};
use crate::dispatch::{DistOpKind, RuleSet};
use crate::engine::{ElimStats, EliminationEngine};
use crate::error::{ElimError, ElimResult};
use crate::legality;
use crate::observer::RewriteObserver;

/// Eliminates the `dist` dialect from a module.
///
/// A run either rewrites every `dist.register_tensor`, `dist.local_offsets`,
/// `dist.local_shape` and `dist.all_reduce`, or fails and leaves the module
/// as it was. Nothing persists between runs, and running again on an
/// eliminated module succeeds without changes.
///
/// ```
/// use dist_elim::DistElimPass;
/// use dist_ir::IrContext;
/// use dist_ir::parser::parse_module;
/// use dist_ir::printer::print_module;
///
/// let mut ctx = IrContext::new();
/// let module = parse_module(
///     &mut ctx,
///     "core.module @m {\n  %0 = arith.const {value = 4} : core.index\n  %1 = dist.register_tensor %0 : core.i64\n}",
/// )
/// .unwrap();
///
/// let stats = DistElimPass::default().run(&mut ctx, module).unwrap();
/// assert_eq!(stats.total(), 1);
/// assert!(!print_module(&ctx, module.op_ref()).contains("dist."));
/// ```
pub struct DistElimPass {
    config: ElimConfig,
    rules: RuleSet,
    observer: Option<Rc<dyn RewriteObserver>>,
}

impl Default for DistElimPass {
    fn default() -> Self {
        Self::new(ElimConfig::default())
    }
}

impl DistElimPass {
    pub const NAME: &'static str = "dist-elim";

    pub fn new(config: ElimConfig) -> Self {
        let rules = RuleSet::new(&config);
        Self {
            config,
            rules,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Rc<dyn RewriteObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The `(dialect, op)` pairs this pass removes.
    pub fn eliminated_ops() -> [(Symbol, Symbol); 4] {
        DistOpKind::ALL.map(|kind| (dist::DIALECT_NAME(), kind.op_name()))
    }

    /// Dialects whose operations the pass may create.
    pub fn dependent_dialects(&self) -> Vec<Symbol> {
        let mut dialects = vec![arith::DIALECT_NAME(), tensor::DIALECT_NAME()];
        if self.config.all_reduce == AllReduceLowering::TraceCall {
            dialects.push(func::DIALECT_NAME());
        }
        dialects
    }

    /// Legality rules matching what a successful run guarantees.
    pub fn conversion_target(&self) -> ConversionTarget {
        legality::conversion_target(&self.dependent_dialects())
    }

    /// Eliminate every `dist` operation in `module`.
    ///
    /// Missing-dependency and type-mismatch failures are reported before
    /// anything is committed, so `module` is left untouched. The residual
    /// kind check and the IR validation run after commit: when they fail
    /// with [`ElimError::ResidualEliminatedKind`] or
    /// [`ElimError::IrValidation`], `module` already holds the rewrites.
    pub fn run(&self, ctx: &mut IrContext, module: Module) -> ElimResult<ElimStats> {
        let _span = tracing::info_span!("dist_elim", all_reduce = %self.config.all_reduce).entered();

        let stats = EliminationEngine::new(&self.rules)
            .with_observer(self.observer.as_deref())
            .run(ctx, module)?;

        legality::check(ctx, module).inspect_err(|err| tracing::warn!("{err}"))?;

        if self.config.verify_after_commit {
            let result = validate_module(ctx, module);
            if !result.is_ok() {
                return Err(ElimError::IrValidation {
                    pass: Self::NAME,
                    report: result.to_string(),
                });
            }
        }

        tracing::debug!(
            visited = stats.visited,
            rewrites = stats.total(),
            "dist dialect eliminated"
        );
        Ok(stats)
    }
}
