//! IR text format parser.
//!
//! Parses the textual IR produced by [`crate::printer`] back into an
//! [`IrContext`].
//!
//! # Two-stage parsing
//!
//! 1. **Raw parse**: winnow combinators in [`raw`] parse text into `Raw*`
//!    structures.
//! 2. **IR build**: `IrBuilder` converts `Raw*` into `OpRef`, `BlockRef`,
//!    `RegionRef`, resolving value names lexically.

mod raw;

use std::collections::{BTreeMap, HashMap, HashSet};

use derive_more::Display;
use smallvec::smallvec;
use winnow::prelude::*;

use crate::Symbol;
use crate::context::{BlockArgData, BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::dialect::core::Module;
use crate::location::{Location, Span};
use crate::ops::DialectOp;
use crate::refs::*;
use crate::types::*;
use raw::{RawAttribute, RawOperation, RawRegion, RawType};

/// Parse error for the IR text format.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("parse error at offset {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl std::error::Error for ParseError {}

impl ParseError {
    fn unresolved(message: String) -> Self {
        Self { message, offset: 0 }
    }
}

// ============================================================================
// IrBuilder (Raw -> IR)
// ============================================================================

struct IrBuilder<'a> {
    ctx: &'a mut IrContext,
    location: Location,
    /// Maps value name (without %) -> ValueRef
    value_map: HashMap<String, ValueRef>,
}

impl<'a> IrBuilder<'a> {
    fn new(ctx: &'a mut IrContext, path: &str) -> Self {
        let path = ctx.paths.intern(path.to_owned());
        let location = Location::new(path, Span::new(0, 0));
        Self {
            ctx,
            location,
            value_map: HashMap::new(),
        }
    }

    fn build_type(&mut self, raw: &RawType<'_>) -> TypeRef {
        let mut builder =
            TypeDataBuilder::new(Symbol::from_dynamic(raw.dialect), Symbol::from_dynamic(raw.name));
        for p in &raw.params {
            let param = self.build_type(p);
            builder = builder.param(param);
        }
        for (k, v) in &raw.attrs {
            let attr = self.build_attribute(v);
            builder = builder.attr(Symbol::from_dynamic(k), attr);
        }
        self.ctx.types.intern(builder.build())
    }

    fn build_attribute(&mut self, raw: &RawAttribute<'_>) -> Attribute {
        match raw {
            RawAttribute::Bool(b) => Attribute::Bool(*b),
            RawAttribute::Int(n) => Attribute::IntBits(*n),
            RawAttribute::Float(f) => Attribute::FloatBits(f.to_bits()),
            RawAttribute::String(s) => Attribute::String(s.clone()),
            RawAttribute::Symbol(s) => Attribute::Symbol(Symbol::from_dynamic(s)),
            RawAttribute::Type(t) => Attribute::Type(self.build_type(t)),
            RawAttribute::List(items) => {
                Attribute::List(items.iter().map(|a| self.build_attribute(a)).collect())
            }
            RawAttribute::Unit => Attribute::Unit,
        }
    }

    /// Build a region. Names defined inside it go out of scope afterwards.
    fn build_region(&mut self, raw: &RawRegion<'_>) -> Result<RegionRef, ParseError> {
        let saved = self.value_map.clone();
        let result = self.build_region_inner(raw);
        self.value_map = saved;
        result
    }

    fn build_region_inner(&mut self, raw: &RawRegion<'_>) -> Result<RegionRef, ParseError> {
        // Pre-create all blocks so their arguments are in scope everywhere
        let mut seen_labels = HashSet::new();
        let mut block_refs = Vec::with_capacity(raw.blocks.len());

        for raw_block in &raw.blocks {
            if !seen_labels.insert(raw_block.label) {
                return Err(ParseError::unresolved(format!(
                    "duplicate block label '^{}'",
                    raw_block.label
                )));
            }

            let args = raw_block
                .args
                .iter()
                .map(|(_, ty)| BlockArgData {
                    ty: self.build_type(ty),
                })
                .collect();
            let block = self.ctx.create_block(BlockData {
                location: self.location,
                args,
                ops: smallvec![],
                parent_region: None,
            });

            for (j, (name, _)) in raw_block.args.iter().enumerate() {
                let value = self.ctx.block_arg(block, j as u32);
                self.define_value(name, value)?;
            }
            block_refs.push(block);
        }

        for (raw_block, &block) in raw.blocks.iter().zip(&block_refs) {
            for raw_op in &raw_block.ops {
                let op = self.build_operation(raw_op)?;
                self.ctx.push_op(block, op);
            }
        }

        Ok(self.ctx.create_region(RegionData {
            location: self.location,
            blocks: block_refs.into_iter().collect(),
            parent_op: None,
        }))
    }

    fn define_value(&mut self, name: &str, value: ValueRef) -> Result<(), ParseError> {
        if self.value_map.insert(name.to_owned(), value).is_some() {
            return Err(ParseError::unresolved(format!(
                "duplicate SSA name '%{name}'"
            )));
        }
        Ok(())
    }

    fn build_operation(&mut self, raw: &RawOperation<'_>) -> Result<OpRef, ParseError> {
        let operands: Vec<ValueRef> = raw
            .operands
            .iter()
            .map(|name| {
                self.value_map.get(*name).copied().ok_or_else(|| {
                    ParseError::unresolved(format!(
                        "undefined value '%{}' in operation '{}.{}'",
                        name, raw.dialect, raw.op_name
                    ))
                })
            })
            .collect::<Result<_, _>>()?;

        if !raw.results.is_empty() && raw.results.len() != raw.result_types.len() {
            return Err(ParseError::unresolved(format!(
                "operation '{}.{}' declares {} result names but {} result types",
                raw.dialect,
                raw.op_name,
                raw.results.len(),
                raw.result_types.len()
            )));
        }

        let result_types: Vec<TypeRef> =
            raw.result_types.iter().map(|t| self.build_type(t)).collect();

        let mut attributes: BTreeMap<Symbol, Attribute> = BTreeMap::new();
        for (k, v) in &raw.attributes {
            let attr = self.build_attribute(v);
            attributes.insert(Symbol::from_dynamic(k), attr);
        }
        if let Some(name) = &raw.sym_name {
            attributes.insert(
                Symbol::new("sym_name"),
                Attribute::Symbol(Symbol::from_dynamic(name)),
            );
        }

        let regions = raw
            .regions
            .iter()
            .map(|r| self.build_region(r))
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = OperationDataBuilder::new(
            self.location,
            Symbol::from_dynamic(raw.dialect),
            Symbol::from_dynamic(raw.op_name),
        )
        .operands(operands)
        .results(result_types);
        for (k, v) in attributes {
            builder = builder.attr(k, v);
        }
        for r in regions {
            builder = builder.region(r);
        }
        let op = builder.create(self.ctx);

        for (i, name) in raw.results.iter().enumerate() {
            let value = self.ctx.op_result(op, i as u32);
            self.define_value(name, value)?;
        }

        Ok(op)
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Parse a single top-level operation from its textual representation.
///
/// `path` names the source in the locations attached to the created IR.
pub fn parse_op(ctx: &mut IrContext, input: &str, path: &str) -> Result<OpRef, ParseError> {
    let mut remaining = input;
    let offset = |remaining: &str| input.len() - remaining.len();

    let raw_op = raw::raw_operation
        .parse_next(&mut remaining)
        .map_err(|e| ParseError {
            message: format!("parse error: {e}"),
            offset: offset(remaining),
        })?;

    raw::ws.parse_next(&mut remaining).map_err(|e| ParseError {
        message: format!("lexer error: {e}"),
        offset: offset(remaining),
    })?;
    if !remaining.is_empty() {
        return Err(ParseError {
            message: "trailing input after top-level operation".to_owned(),
            offset: offset(remaining),
        });
    }

    IrBuilder::new(ctx, path).build_operation(&raw_op)
}

/// Parse a `core.module` from text.
pub fn parse_module(ctx: &mut IrContext, input: &str) -> Result<Module, ParseError> {
    let op = parse_op(ctx, input, "textual-ir")?;
    if Module::from_op(ctx, op).is_err() {
        return Err(ParseError {
            message: format!("expected `core.module`, found `{}`", ctx.op_full_name(op)),
            offset: 0,
        });
    }
    Module::new(ctx, op).ok_or_else(|| ParseError {
        message: format!(
            "`core.module` must have exactly one region, found {}",
            ctx.op(op).regions.len()
        ),
        offset: 0,
    })
}

/// Parse textual IR into a [`Module`], panicking on failure.
///
/// Convenience wrapper around [`parse_module`] for tests.
pub fn parse_test_module(ctx: &mut IrContext, input: &str) -> Module {
    parse_module(ctx, input).unwrap_or_else(|e| {
        panic!(
            "Failed to parse test IR at offset {}:\n  {}\n\nInput:\n{}",
            e.offset, e.message, input
        );
    })
}
