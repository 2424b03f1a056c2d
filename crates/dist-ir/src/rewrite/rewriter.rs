//! PatternRewriter: records the mutations of one rewrite without touching
//! the module.
//!
//! A pattern creates its new operations detached (via `IrContext::create_op`)
//! and records them here. The caller later either applies the recorded
//! [`Mutations`] to the module or discards them, leaving the module as it was.

use crate::Symbol;
use crate::context::IrContext;
use crate::refs::{BlockRef, OpRef, TypeRef, ValueRef};

/// Accumulated mutations from a pattern rewrite.
#[derive(Debug, Default)]
pub struct Mutations {
    /// Operations to insert before the current op's position.
    prefix_ops: Vec<OpRef>,
    /// The replacement operation (if any).
    replacement: Option<OpRef>,
    /// If set, the operation is erased and its results mapped to these values.
    erase_values: Option<Vec<ValueRef>>,
    /// Operations to add at the start of the module body.
    module_ops: Vec<OpRef>,
}

/// Rewriter interface for patterns.
///
/// Patterns use this to record mutations which are applied after the
/// pattern returns.
#[derive(Debug, Default)]
pub struct PatternRewriter {
    mutations: Mutations,
}

impl PatternRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an operation before the current operation.
    ///
    /// The op must already be created via `ctx.create_op()` but not yet
    /// attached to a block. Multiple calls accumulate operations in order.
    pub fn insert_op(&mut self, op: OpRef) {
        self.mutations.prefix_ops.push(op);
    }

    /// Replace the current operation with a new one.
    ///
    /// Old results are mapped 1:1 by index to the new op's results.
    pub fn replace_op(&mut self, new_op: OpRef) {
        debug_assert!(
            self.mutations.replacement.is_none() && self.mutations.erase_values.is_none(),
            "replace_op called after replace_op or erase_op"
        );
        self.mutations.replacement = Some(new_op);
    }

    /// Erase the current operation, mapping its results to the given values.
    pub fn erase_op(&mut self, replacement_values: Vec<ValueRef>) {
        debug_assert!(
            self.mutations.replacement.is_none() && self.mutations.erase_values.is_none(),
            "erase_op called after replace_op or erase_op"
        );
        self.mutations.erase_values = Some(replacement_values);
    }

    /// Add an operation at module level (e.g. a function declaration).
    ///
    /// If the module already holds an op with the same `sym_name` when the
    /// mutations are applied, the new op is dropped instead.
    pub fn add_module_op(&mut self, op: OpRef) {
        self.mutations.module_ops.push(op);
    }

    /// Check if any mutation was recorded.
    pub fn has_mutations(&self) -> bool {
        !self.mutations.prefix_ops.is_empty()
            || self.mutations.replacement.is_some()
            || self.mutations.erase_values.is_some()
            || !self.mutations.module_ops.is_empty()
    }

    /// Consume the rewriter and return accumulated mutations.
    pub fn take_mutations(self) -> Mutations {
        self.mutations
    }
}

impl Mutations {
    /// Every operation created for this rewrite, in creation order.
    pub fn created_ops(&self) -> impl Iterator<Item = OpRef> + '_ {
        self.module_ops
            .iter()
            .chain(&self.prefix_ops)
            .chain(&self.replacement)
            .copied()
    }

    /// The values that will stand in for the original op's results.
    pub fn replacement_values(&self, ctx: &IrContext) -> Option<Vec<ValueRef>> {
        match (&self.replacement, &self.erase_values) {
            (Some(op), _) => Some(ctx.op_results(*op).to_vec()),
            (None, Some(values)) => Some(values.clone()),
            (None, None) => None,
        }
    }

    /// Types of [`Self::replacement_values`], for checking against the
    /// original results.
    pub fn replacement_types(&self, ctx: &IrContext) -> Option<Vec<TypeRef>> {
        self.replacement_values(ctx)
            .map(|values| values.into_iter().map(|v| ctx.value_ty(v)).collect())
    }

    /// Destroy every created operation, leaving the module untouched.
    pub fn discard(self, ctx: &mut IrContext) {
        let created: Vec<OpRef> = self.created_ops().collect();
        // Later ops may use results of earlier ones
        for op in created.into_iter().rev() {
            ctx.remove_op(op);
        }
    }

    /// Apply the mutations to `original_op`, which must sit in a block.
    ///
    /// `resolve` maps a recorded value to the value that currently stands for
    /// it, for values whose producers were rewritten after this rewrite was
    /// recorded. Returns the `(old, new)` result pairs that were replaced.
    pub fn apply(
        self,
        ctx: &mut IrContext,
        original_op: OpRef,
        module_block: Option<BlockRef>,
        resolve: &dyn Fn(ValueRef) -> ValueRef,
    ) -> Vec<(ValueRef, ValueRef)> {
        let parent_block = ctx.op(original_op).parent_block;
        let mut replaced = Vec::new();

        // 1. Insert prefix ops before the original op
        if let Some(block) = parent_block {
            for &prefix_op in &self.prefix_ops {
                ctx.insert_op_before(block, original_op, prefix_op);
            }
        }

        // 2. Handle replacement or erasure
        let new_values = match (self.replacement, self.erase_values) {
            (Some(new_op), _) => {
                if let Some(block) = parent_block {
                    ctx.insert_op_before(block, original_op, new_op);
                }
                Some(ctx.op_results(new_op).to_vec())
            }
            (None, Some(values)) => Some(values.into_iter().map(resolve).collect()),
            (None, None) => None,
        };

        if let Some(new_values) = new_values {
            let old_results: Vec<ValueRef> = ctx.op_results(original_op).to_vec();
            debug_assert_eq!(
                old_results.len(),
                new_values.len(),
                "result count mismatch ({} vs {})",
                old_results.len(),
                new_values.len()
            );
            for (&old_v, &new_v) in old_results.iter().zip(&new_values) {
                ctx.replace_all_uses(old_v, new_v);
                replaced.push((old_v, new_v));
            }

            if let Some(block) = parent_block {
                ctx.remove_op_from_block(block, original_op);
            }
            ctx.remove_op(original_op);
        }

        // 3. Module-level ops go to the start of the module, once per symbol
        if let Some(module_block) = module_block {
            let mut insert_at = 0;
            for module_op in self.module_ops {
                if defines_existing_symbol(ctx, module_block, module_op) {
                    tracing::trace!(
                        op = %ctx.op_full_name(module_op),
                        "symbol already defined in module"
                    );
                    ctx.remove_op(module_op);
                    continue;
                }
                ctx.insert_op_at(module_block, insert_at, module_op);
                insert_at += 1;
            }
        } else {
            for module_op in self.module_ops {
                ctx.remove_op(module_op);
            }
        }

        replaced
    }
}

fn sym_name_of(ctx: &IrContext, op: OpRef) -> Option<Symbol> {
    ctx.op_attr(op, Symbol::new("sym_name"))
        .and_then(|attr| attr.as_symbol())
}

fn defines_existing_symbol(ctx: &IrContext, block: BlockRef, op: OpRef) -> bool {
    let Some(name) = sym_name_of(ctx, op) else {
        return false;
    };
    ctx.block(block)
        .ops
        .iter()
        .any(|&existing| sym_name_of(ctx, existing) == Some(name))
}
