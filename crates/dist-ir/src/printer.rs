//! Text format printer.
//!
//! Every operation is printed in the generic form:
//!
//! ```text
//! core.module @m {
//!   %0 = arith.const {value = 4} : core.index
//!   %1 = dist.register_tensor %0 : core.i64
//!   %2 = dist.local_shape %1 : core.index
//!   func.func @printf {
//!   }
//! }
//! ```
//!
//! Values are numbered once per printed root, in definition order, so that
//! values defined at module level can be referenced anywhere below it.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;

use crate::Symbol;
use crate::context::IrContext;
use crate::refs::*;
use crate::types::*;

/// Print state for value numbering and block labeling.
struct PrintState<'a> {
    ctx: &'a IrContext,
    value_names: HashMap<ValueRef, String>,
    block_labels: HashMap<BlockRef, String>,
    next_value_num: usize,
    next_block_num: usize,
}

impl<'a> PrintState<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            value_names: HashMap::new(),
            block_labels: HashMap::new(),
            next_value_num: 0,
            next_block_num: 0,
        }
    }

    fn assign_value_name(&mut self, v: ValueRef) -> String {
        let name = format!("%{}", self.next_value_num);
        self.next_value_num += 1;
        self.value_names.insert(v, name.clone());
        name
    }

    fn get_value_name(&self, v: ValueRef) -> &str {
        self.value_names.get(&v).map(|s| s.as_str()).unwrap_or("%?")
    }

    fn assign_block_label(&mut self, b: BlockRef) -> String {
        let label = format!("^bb{}", self.next_block_num);
        self.next_block_num += 1;
        self.block_labels.insert(b, label.clone());
        label
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Print an operation (and everything nested in it) as IR text.
pub fn print_op(ctx: &IrContext, op: OpRef) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    print_operation(&mut state, &mut out, op, 0).expect("fmt::Write to String never fails");
    out
}

/// Print an operation on one line, without its regions.
///
/// Operands defined outside the operation print as `%?`.
pub fn print_op_header(ctx: &IrContext, op: OpRef) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    print_op_signature(&mut state, &mut out, op).expect("fmt::Write to String never fails");
    out
}

/// Print a type as IR text.
pub fn print_type(ctx: &IrContext, ty: TypeRef) -> String {
    let mut out = String::new();
    write_type(ctx, &mut out, ty).expect("fmt::Write to String never fails");
    out
}

/// Print a module as IR text.
pub fn print_module(ctx: &IrContext, root: OpRef) -> String {
    print_op(ctx, root)
}

// ============================================================================
// Type printing
// ============================================================================

fn write_type(ctx: &IrContext, f: &mut impl Write, ty: TypeRef) -> fmt::Result {
    let data = ctx.types.get(ty);
    write!(f, "{}.{}", data.dialect, data.name)?;
    if !data.params.is_empty() {
        f.write_char('(')?;
        for (i, &param) in data.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, param)?;
        }
        f.write_char(')')?;
    } else if !data.attrs.is_empty() {
        // Empty parens signal that attrs follow
        f.write_str("()")?;
    }
    if !data.attrs.is_empty() {
        f.write_str(" {")?;
        for (i, (key, val)) in data.attrs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = ", key)?;
            write_attribute(ctx, f, val)?;
        }
        f.write_char('}')?;
    }
    Ok(())
}

// ============================================================================
// Attribute printing
// ============================================================================

fn write_attribute(ctx: &IrContext, f: &mut impl Write, attr: &Attribute) -> fmt::Result {
    match attr {
        Attribute::Unit => f.write_str("unit"),
        Attribute::Bool(b) => write!(f, "{b}"),
        Attribute::IntBits(v) => write!(f, "{v}"),
        Attribute::FloatBits(bits) => {
            let v = f64::from_bits(*bits);
            let s = format!("{v}");
            f.write_str(&s)?;
            // Keep a decimal point on finite whole numbers so they re-parse as floats
            if v.is_finite() && !s.contains('.') && !s.contains('e') && !s.contains('E') {
                f.write_str(".0")?;
            }
            Ok(())
        }
        Attribute::String(s) => {
            f.write_char('"')?;
            write_escaped_string(f, s)?;
            f.write_char('"')
        }
        Attribute::Symbol(sym) => write_symbol(f, *sym),
        Attribute::Type(ty) => write_type(ctx, f, *ty),
        Attribute::List(list) => {
            f.write_char('[')?;
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_attribute(ctx, f, item)?;
            }
            f.write_char(']')
        }
    }
}

fn write_escaped_string(f: &mut impl Write, s: &str) -> fmt::Result {
    for ch in s.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\0' => f.write_str("\\0")?,
            c if c.is_control() => write!(f, "\\x{:02x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

fn write_symbol(f: &mut impl Write, sym: Symbol) -> fmt::Result {
    sym.with_str(|s| {
        let needs_quoting = s.is_empty() || !s.chars().all(|c| c.is_alphanumeric() || c == '_');
        if needs_quoting {
            f.write_str("@\"")?;
            write_escaped_string(f, s)?;
            f.write_char('"')
        } else {
            write!(f, "@{s}")
        }
    })
}

// ============================================================================
// Operation printing
// ============================================================================

fn print_operation(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let indent_str = " ".repeat(indent);
    f.write_str(&indent_str)?;
    print_op_signature(state, f, op)?;

    let regions = state.ctx.op(op).regions.clone();
    for region in regions {
        f.write_str(" {\n")?;
        print_region(state, f, region, indent)?;
        write!(f, "{indent_str}}}")?;
    }

    f.write_char('\n')
}

/// `[results =] dialect.op [@sym] [operands] [{attrs}] [: types]`
fn print_op_signature(state: &mut PrintState<'_>, f: &mut impl Write, op: OpRef) -> fmt::Result {
    let ctx = state.ctx;

    // Results
    let results = ctx.op_results(op);
    if !results.is_empty() {
        for (i, &v) in results.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let name = state.assign_value_name(v);
            f.write_str(&name)?;
        }
        f.write_str(" = ")?;
    }

    // Dialect.op
    let data = ctx.op(op);
    write!(f, "{}.{}", data.dialect, data.name)?;

    // Symbol name
    let sym_key = Symbol::new("sym_name");
    let sym_name = match data.attributes.get(&sym_key) {
        Some(Attribute::Symbol(name)) => Some(*name),
        _ => None,
    };
    if let Some(name) = sym_name {
        f.write_char(' ')?;
        write_symbol(f, name)?;
    }

    // Operands
    let operands = ctx.op_operands(op);
    if !operands.is_empty() {
        f.write_char(' ')?;
        for (i, &v) in operands.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(state.get_value_name(v))?;
        }
    }

    // Attributes (sym_name already printed)
    let attrs: Vec<_> = data
        .attributes
        .iter()
        .filter(|(key, _)| !(sym_name.is_some() && **key == sym_key))
        .collect();
    if !attrs.is_empty() {
        f.write_str(" {")?;
        for (i, (key, val)) in attrs.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key} = ")?;
            write_attribute(ctx, f, val)?;
        }
        f.write_char('}')?;
    }

    // Result types
    let result_types = ctx.op_result_types(op);
    if !result_types.is_empty() {
        f.write_str(" : ")?;
        for (i, &ty) in result_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, ty)?;
        }
    }

    Ok(())
}

// ============================================================================
// Region / Block printing
// ============================================================================

/// Print the blocks of `region`. Labels sit at `indent`, ops one level deeper.
fn print_region(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    region: RegionRef,
    indent: usize,
) -> fmt::Result {
    let blocks: Vec<_> = state.ctx.region(region).blocks.to_vec();

    let can_elide_label = blocks.len() == 1 && state.ctx.block_args(blocks[0]).is_empty();
    let indent_str = " ".repeat(indent);

    for &block in &blocks {
        if !can_elide_label {
            let label = state.assign_block_label(block);
            write!(f, "{indent_str}{label}")?;
            let args = state.ctx.block_args(block).to_vec();
            if !args.is_empty() {
                f.write_char('(')?;
                for (j, &arg) in args.iter().enumerate() {
                    if j > 0 {
                        f.write_str(", ")?;
                    }
                    let arg_name = state.assign_value_name(arg);
                    let ty = state.ctx.value_ty(arg);
                    write!(f, "{arg_name}: ")?;
                    write_type(state.ctx, f, ty)?;
                }
                f.write_char(')')?;
            }
            f.write_str(":\n")?;
        }

        let ops: Vec<_> = state.ctx.block(block).ops.to_vec();
        for op in ops {
            print_operation(state, f, op, indent + 2)?;
        }
    }

    Ok(())
}
