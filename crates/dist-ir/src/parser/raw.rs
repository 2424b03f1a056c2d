//! Text to borrowed `Raw*` trees.
//!
//! Nothing is resolved at this stage: value names, block labels and type
//! names stay slices of the input until `IrBuilder` interns them.

use winnow::ascii::dec_uint;
use winnow::combinator::{alt, delimited, not, opt, preceded, separated, separated_pair, terminated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_till, take_while};

type PError = ErrMode<ContextError>;

pub(crate) type RawAttrs<'a> = Vec<(&'a str, RawAttribute<'a>)>;

/// `[results =] dialect.op [@sym] [operands] [{attrs}] [: types] [regions]`
#[derive(Debug, Clone)]
pub(crate) struct RawOperation<'a> {
    pub results: Vec<&'a str>,
    pub dialect: &'a str,
    pub op_name: &'a str,
    pub sym_name: Option<String>,
    pub operands: Vec<&'a str>,
    pub attributes: RawAttrs<'a>,
    pub result_types: Vec<RawType<'a>>,
    pub regions: Vec<RawRegion<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawRegion<'a> {
    pub blocks: Vec<RawBlock<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawBlock<'a> {
    pub label: &'a str,
    pub args: Vec<(&'a str, RawType<'a>)>,
    pub ops: Vec<RawOperation<'a>>,
}

/// `dialect.name[(params) [{attrs}]]`
#[derive(Debug, Clone)]
pub(crate) struct RawType<'a> {
    pub dialect: &'a str,
    pub name: &'a str,
    pub params: Vec<RawType<'a>>,
    pub attrs: RawAttrs<'a>,
}

#[derive(Debug, Clone)]
pub(crate) enum RawAttribute<'a> {
    Bool(bool),
    Int(u64),
    Float(f64),
    String(String),
    Symbol(String),
    Type(RawType<'a>),
    List(Vec<RawAttribute<'a>>),
    Unit,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., is_name_char).parse_next(input)
}

/// Skip whitespace and `//` comments.
pub(crate) fn ws(input: &mut &str) -> ModalResult<()> {
    loop {
        *input = input.trim_start();
        if !input.starts_with("//") {
            return Ok(());
        }
        take_till(0.., '\n').void().parse_next(input)?;
    }
}

/// Whether the next token after whitespace starts with one of `tokens`.
fn next_is(input: &str, tokens: &[char]) -> bool {
    let mut rest = input;
    ws(&mut rest).is_ok() && rest.starts_with(tokens)
}

/// `item` with whitespace on both sides.
fn padded<'a, O>(mut item: impl Parser<&'a str, O, PError>) -> impl Parser<&'a str, O, PError> {
    move |input: &mut &'a str| -> ModalResult<O> {
        ws(input)?;
        let out = item.parse_next(input)?;
        ws(input)?;
        Ok(out)
    }
}

/// At least `min` comma-separated `item`s.
fn comma_list<'a, O>(
    min: usize,
    item: impl Parser<&'a str, O, PError>,
) -> impl Parser<&'a str, Vec<O>, PError> {
    separated(min.., padded(item), ',')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
pub(crate) fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., is_name_char),
    )
        .take()
        .parse_next(input)
}

pub(crate) fn value_ref<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded('%', name).parse_next(input)
}

/// `@name` or `@"any text"`.
pub(crate) fn symbol_ref(input: &mut &str) -> ModalResult<String> {
    preceded('@', alt((string_lit, name.map(str::to_owned)))).parse_next(input)
}

pub(crate) fn block_label<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded('^', name).parse_next(input)
}

pub(crate) fn qualified_name<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str)> {
    separated_pair(ident, '.', ident).parse_next(input)
}

/// Decimal integer. Negative values are stored as their two's complement
/// and must fit an `i64`.
pub(crate) fn integer_lit(input: &mut &str) -> ModalResult<u64> {
    let negative = opt('-').parse_next(input)?.is_some();
    let magnitude: u64 = dec_uint(input)?;
    match (negative, magnitude) {
        (false, m) => Ok(m),
        (true, m) if m <= i64::MIN.unsigned_abs() => Ok(m.wrapping_neg()),
        (true, _) => Err(ErrMode::Backtrack(ContextError::new())),
    }
}

/// Float literal with a mandatory `.`, so `42` stays an integer.
pub(crate) fn float_with_dot(input: &mut &str) -> ModalResult<f64> {
    let digits = || take_while(1.., |c: char| c.is_ascii_digit());
    let exponent = (one_of(['e', 'E']), opt(one_of(['+', '-'])), digits());
    (opt('-'), digits(), '.', digits(), opt(exponent))
        .take()
        .try_map(str::parse::<f64>)
        .parse_next(input)
}

/// Double-quoted string, undoing the printer's escapes.
pub(crate) fn string_lit(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut out = String::new();
    loop {
        match any.parse_next(input)? {
            '"' => return Ok(out),
            '\\' => {
                let unescaped = match any.parse_next(input)? {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    'x' => take_while(2, |c: char| c.is_ascii_hexdigit())
                        .try_map(|hex| u8::from_str_radix(hex, 16))
                        .map(char::from)
                        .parse_next(input)?,
                    other => other,
                };
                out.push(unescaped);
            }
            c => out.push(c),
        }
    }
}

pub(crate) fn raw_type<'a>(input: &mut &'a str) -> ModalResult<RawType<'a>> {
    let (dialect, name) = qualified_name.parse_next(input)?;
    let params = opt(delimited('(', comma_list(0, raw_type), (ws, ')'))).parse_next(input)?;
    // Attributes need explicit parentheses, otherwise `{` opens a region.
    let attrs = match params {
        Some(_) => opt(preceded(ws, raw_attr_dict)).parse_next(input)?,
        None => None,
    };
    Ok(RawType {
        dialect,
        name,
        params: params.unwrap_or_default(),
        attrs: attrs.unwrap_or_default(),
    })
}

pub(crate) fn raw_attr_value<'a>(input: &mut &'a str) -> ModalResult<RawAttribute<'a>> {
    alt((
        "true".value(RawAttribute::Bool(true)),
        "false".value(RawAttribute::Bool(false)),
        "unit".value(RawAttribute::Unit),
        string_lit.map(RawAttribute::String),
        symbol_ref.map(RawAttribute::Symbol),
        delimited('[', comma_list(0, raw_attr_value), (ws, ']')).map(RawAttribute::List),
        float_with_dot.map(RawAttribute::Float),
        integer_lit.map(RawAttribute::Int),
        raw_type.map(RawAttribute::Type),
    ))
    .parse_next(input)
}

/// `{key = value, ...}` with at least one entry; `{}` is an empty region.
pub(crate) fn raw_attr_dict<'a>(input: &mut &'a str) -> ModalResult<RawAttrs<'a>> {
    let entry = separated_pair(ident, padded('='), raw_attr_value);
    delimited('{', comma_list(1, entry), (ws, '}')).parse_next(input)
}

fn result_list<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    terminated(comma_list(1, value_ref), '=').parse_next(input)
}

/// A list followed by `=` belongs to the next operation.
fn operand_list<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    terminated(comma_list(1, value_ref), not('=')).parse_next(input)
}

fn type_annotation<'a>(input: &mut &'a str) -> ModalResult<Vec<RawType<'a>>> {
    preceded((ws, ':'), comma_list(1, raw_type)).parse_next(input)
}

fn block_args<'a>(input: &mut &'a str) -> ModalResult<Vec<(&'a str, RawType<'a>)>> {
    let arg = separated_pair(value_ref, padded(':'), raw_type);
    delimited('(', comma_list(0, arg), (ws, ')')).parse_next(input)
}

pub(crate) fn raw_operation<'a>(input: &mut &'a str) -> ModalResult<RawOperation<'a>> {
    ws(input)?;
    let results = opt(result_list).parse_next(input)?.unwrap_or_default();
    let (dialect, op_name) = preceded(ws, qualified_name).parse_next(input)?;
    let sym_name = opt(preceded(ws, symbol_ref)).parse_next(input)?;
    let operands = opt(operand_list).parse_next(input)?.unwrap_or_default();
    let attributes = opt(preceded(ws, raw_attr_dict))
        .parse_next(input)?
        .unwrap_or_default();
    let result_types = opt(type_annotation).parse_next(input)?.unwrap_or_default();

    let mut regions = Vec::new();
    while next_is(input, &['{']) {
        ws(input)?;
        regions.push(raw_region(input)?);
    }

    Ok(RawOperation {
        results,
        dialect,
        op_name,
        sym_name,
        operands,
        attributes,
        result_types,
        regions,
    })
}

/// Operations up to the next block label, closing brace or end of input.
fn op_sequence<'a>(input: &mut &'a str) -> ModalResult<Vec<RawOperation<'a>>> {
    let mut ops = Vec::new();
    loop {
        ws(input)?;
        if input.is_empty() || input.starts_with(['^', '}']) {
            return Ok(ops);
        }
        ops.push(raw_operation(input)?);
    }
}

/// `^label[(args)]: ops`
pub(crate) fn raw_block<'a>(input: &mut &'a str) -> ModalResult<RawBlock<'a>> {
    let label = preceded(ws, block_label).parse_next(input)?;
    let args = opt(block_args).parse_next(input)?.unwrap_or_default();
    (ws, ':').parse_next(input)?;
    let ops = op_sequence(input)?;
    Ok(RawBlock { label, args, ops })
}

/// `{ ^bb0: ... ^bb1: ... }`, or `{ ops }` for a single unlabeled block.
pub(crate) fn raw_region<'a>(input: &mut &'a str) -> ModalResult<RawRegion<'a>> {
    '{'.parse_next(input)?;
    let mut blocks = Vec::new();
    if next_is(input, &['^']) {
        while next_is(input, &['^']) {
            blocks.push(raw_block(input)?);
        }
    } else {
        blocks.push(RawBlock {
            label: "bb0",
            args: vec![],
            ops: op_sequence(input)?,
        });
    }
    (ws, '}').parse_next(input)?;
    Ok(RawRegion { blocks })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tensor_type_with_shape() {
        let mut input = "tensor.ranked(core.f32) {shape = [4, 4]}";
        let raw = raw_type.parse_next(&mut input).expect("should parse type");
        assert_eq!((raw.dialect, raw.name), ("tensor", "ranked"));
        assert_eq!(raw.params.len(), 1);
        assert_eq!(raw.attrs.len(), 1);
        assert_eq!(raw.attrs[0].0, "shape");
        assert!(matches!(&raw.attrs[0].1, RawAttribute::List(dims) if dims.len() == 2));
        assert!(input.is_empty());
    }

    #[test]
    fn type_without_parens_leaves_brace() {
        let mut input = "core.index { }";
        let raw = raw_type.parse_next(&mut input).expect("should parse type");
        assert!(raw.attrs.is_empty());
        assert_eq!(input, " { }");
    }

    #[test]
    fn parse_attribute_values() {
        let mut input = "42";
        assert!(matches!(
            raw_attr_value.parse_next(&mut input),
            Ok(RawAttribute::Int(42))
        ));

        let mut input = "-1";
        assert!(matches!(
            raw_attr_value.parse_next(&mut input),
            Ok(RawAttribute::Int(v)) if v == u64::MAX
        ));

        let mut input = "0.0";
        assert!(matches!(
            raw_attr_value.parse_next(&mut input),
            Ok(RawAttribute::Float(f)) if f == 0.0
        ));

        let mut input = "@sum";
        assert!(matches!(
            raw_attr_value.parse_next(&mut input),
            Ok(RawAttribute::Symbol(ref s)) if s == "sum"
        ));

        let mut input = r#""a\nb""#;
        assert!(matches!(
            raw_attr_value.parse_next(&mut input),
            Ok(RawAttribute::String(ref s)) if s == "a\nb"
        ));

        let mut input = "core.i32";
        assert!(matches!(
            raw_attr_value.parse_next(&mut input),
            Ok(RawAttribute::Type(_))
        ));
    }

    #[test]
    fn parse_quoted_symbol() {
        let mut input = "@\"a.b\"";
        assert_eq!(symbol_ref.parse_next(&mut input).unwrap(), "a.b");
    }

    #[test]
    fn integer_below_i64_min_is_rejected() {
        let mut input = "-9223372036854775808";
        assert_eq!(
            integer_lit.parse_next(&mut input).unwrap(),
            i64::MIN as u64
        );

        let mut input = "-9223372036854775809";
        assert!(integer_lit.parse_next(&mut input).is_err());
    }

    #[test]
    fn operand_list_stops_before_next_result() {
        let mut input = "test.use\n  %1 = test.def : core.index";
        let op = raw_operation.parse_next(&mut input).expect("should parse");
        assert!(op.operands.is_empty());

        let next = raw_operation.parse_next(&mut input).expect("should parse");
        assert_eq!(next.results, vec!["1"]);
        assert_eq!(next.op_name, "def");
    }

    #[test]
    fn empty_braces_are_a_region() {
        let mut input = "func.func @printf {\n}";
        let op = raw_operation.parse_next(&mut input).expect("should parse");
        assert_eq!(op.sym_name.as_deref(), Some("printf"));
        assert!(op.attributes.is_empty());
        assert_eq!(op.regions.len(), 1);
        assert_eq!(op.regions[0].blocks.len(), 1);
        assert!(op.regions[0].blocks[0].ops.is_empty());
    }

    #[test]
    fn region_after_attrs_and_types() {
        let mut input = "%0 = test.op %a {k = 1} : core.index { test.inner }";
        let op = raw_operation.parse_next(&mut input).expect("should parse");
        assert_eq!(op.results, vec!["0"]);
        assert_eq!(op.operands, vec!["a"]);
        assert_eq!(op.attributes.len(), 1);
        assert_eq!(op.result_types.len(), 1);
        assert_eq!(op.regions[0].blocks[0].ops.len(), 1);
    }

    #[test]
    fn explicit_blocks_with_args() {
        let mut input = "{\n^bb0(%x: core.index):\n  test.use %x\n^bb1:\n}";
        let region = raw_region.parse_next(&mut input).expect("should parse");
        assert_eq!(region.blocks.len(), 2);
        assert_eq!(region.blocks[0].args.len(), 1);
        assert_eq!(region.blocks[0].ops.len(), 1);
        assert!(region.blocks[1].ops.is_empty());
    }

    #[test]
    fn comments_are_whitespace() {
        let mut input = "// leading\n  test.op // trailing\n";
        let op = raw_operation.parse_next(&mut input).expect("should parse");
        assert_eq!(op.op_name, "op");
    }
}
