//! Mutable IR storage.
//!
//! Operations, values, blocks and regions live in `PrimaryMap` arenas inside
//! [`IrContext`] and are addressed by the entity refs in [`crate::refs`].
//! Operand, result and block-argument lists are `EntityList`s backed by
//! shared pools. Every value keeps the list of operand slots that read it,
//! kept current by each mutation below.

use std::collections::BTreeMap;

use cranelift_entity::{EntityList, ListPool, PrimaryMap, SecondaryMap};
use smallvec::SmallVec;

use crate::Symbol;
use crate::location::Location;
use crate::refs::*;
use crate::types::*;

/// Operand slot `operand_index` of `user` reads the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: OpRef,
    pub operand_index: u32,
}

pub struct OperationData {
    pub location: Location,
    pub dialect: Symbol,
    pub name: Symbol,
    pub operands: EntityList<ValueRef>,
    pub results: EntityList<TypeRef>,
    pub attributes: BTreeMap<Symbol, Attribute>,
    pub regions: SmallVec<[RegionRef; 4]>,
    /// `None` while the op is detached.
    pub parent_block: Option<BlockRef>,
}

pub struct ValueData {
    pub def: ValueDef,
    pub ty: TypeRef,
}

#[derive(Clone, Debug)]
pub struct BlockArgData {
    pub ty: TypeRef,
}

pub struct BlockData {
    pub location: Location,
    pub args: Vec<BlockArgData>,
    pub ops: SmallVec<[OpRef; 4]>,
    pub parent_region: Option<RegionRef>,
}

pub struct RegionData {
    pub location: Location,
    pub blocks: SmallVec<[BlockRef; 4]>,
    pub parent_op: Option<OpRef>,
}

/// Owner of every IR entity of a compilation.
///
/// Entities are never freed. [`IrContext::remove_op`] only unlinks an
/// operation from the use lists and marks it removed.
#[derive(Default)]
pub struct IrContext {
    ops: PrimaryMap<OpRef, OperationData>,
    values: PrimaryMap<ValueRef, ValueData>,
    blocks: PrimaryMap<BlockRef, BlockData>,
    regions: PrimaryMap<RegionRef, RegionData>,

    uses: SecondaryMap<ValueRef, SmallVec<[Use; 2]>>,
    result_values: SecondaryMap<OpRef, EntityList<ValueRef>>,
    block_arg_values: SecondaryMap<BlockRef, EntityList<ValueRef>>,
    removed: SecondaryMap<OpRef, bool>,

    value_pool: ListPool<ValueRef>,
    type_pool: ListPool<TypeRef>,

    pub types: TypeInterner,
    pub paths: PathInterner,
}

impl IrContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero-width location at the start of `path`.
    pub fn location(&mut self, path: &str) -> Location {
        let path = self.paths.intern(path.to_owned());
        Location::new(path, crate::Span::default())
    }

    fn new_value(&mut self, def: ValueDef, ty: TypeRef) -> ValueRef {
        self.values.push(ValueData { def, ty })
    }

    /// Register `data` as a detached operation.
    ///
    /// Records a use for every operand, allocates one value per result type
    /// and claims the listed regions.
    ///
    /// # Panics
    ///
    /// Panics if `data` already names a parent block or one of its regions
    /// is owned by another operation.
    pub fn create_op(&mut self, data: OperationData) -> OpRef {
        assert!(
            data.parent_block.is_none(),
            "create_op: new operations start detached; attach them with push_op",
        );

        let op = self.ops.push(data);

        for index in 0..self.ops[op].regions.len() {
            let region = self.ops[op].regions[index];
            let owner = self.regions[region].parent_op.replace(op);
            assert!(
                owner.is_none(),
                "create_op: region {region} is owned by {owner:?}, not free for {op}",
            );
        }

        let operand_count = self.ops[op].operands.len(&self.value_pool);
        for operand_index in 0..operand_count {
            let value = self.op_operands(op)[operand_index];
            self.uses[value].push(Use {
                user: op,
                operand_index: operand_index as u32,
            });
        }

        let types: SmallVec<[TypeRef; 4]> = self.op_result_types(op).into();
        let results: SmallVec<[ValueRef; 4]> = types
            .iter()
            .enumerate()
            .map(|(index, &ty)| self.new_value(ValueDef::OpResult(op, index as u32), ty))
            .collect();
        self.result_values[op] = EntityList::from_slice(&results, &mut self.value_pool);

        op
    }

    pub fn op(&self, op: OpRef) -> &OperationData {
        &self.ops[op]
    }

    pub fn op_operands(&self, op: OpRef) -> &[ValueRef] {
        self.ops[op].operands.as_slice(&self.value_pool)
    }

    pub fn op_result_types(&self, op: OpRef) -> &[TypeRef] {
        self.ops[op].results.as_slice(&self.type_pool)
    }

    /// Result `index` of `op`. Panics when out of range.
    pub fn op_result(&self, op: OpRef, index: u32) -> ValueRef {
        self.op_results(op)[index as usize]
    }

    pub fn op_results(&self, op: OpRef) -> &[ValueRef] {
        self.result_values[op].as_slice(&self.value_pool)
    }

    pub fn op_attr(&self, op: OpRef, key: Symbol) -> Option<&Attribute> {
        self.ops[op].attributes.get(&key)
    }

    /// `dialect.name` of an operation, for diagnostics.
    pub fn op_full_name(&self, op: OpRef) -> String {
        let data = &self.ops[op];
        format!("{}.{}", data.dialect, data.name)
    }

    /// Whether `op` was destroyed by [`IrContext::remove_op`].
    pub fn is_removed(&self, op: OpRef) -> bool {
        self.removed[op]
    }

    /// Destroy a detached operation whose results are dead.
    ///
    /// Its operands stop counting it as a user.
    ///
    /// # Panics
    ///
    /// Panics if `op` still sits in a block (see
    /// [`IrContext::remove_op_from_block`]) or any of its results is used.
    pub fn remove_op(&mut self, op: OpRef) {
        if let Some(block) = self.ops[op].parent_block {
            panic!("remove_op: operation {op} is still attached to block {block}");
        }
        for &result in self.op_results(op) {
            let live = self.uses[result].len();
            assert!(
                live == 0,
                "remove_op: result value {result} of {op} still has {live} use(s)",
            );
        }

        let operands: SmallVec<[ValueRef; 8]> = self.op_operands(op).into();
        for (index, value) in operands.into_iter().enumerate() {
            let slot = Use {
                user: op,
                operand_index: index as u32,
            };
            self.uses[value].retain(|u| *u != slot);
        }
        self.removed[op] = true;
    }

    pub fn value_ty(&self, v: ValueRef) -> TypeRef {
        self.values[v].ty
    }

    pub fn value_def(&self, v: ValueRef) -> ValueDef {
        self.values[v].def
    }

    /// The operation producing `v`, or `None` for block arguments.
    pub fn defining_op(&self, v: ValueRef) -> Option<OpRef> {
        match self.values[v].def {
            ValueDef::OpResult(op, _) => Some(op),
            ValueDef::BlockArg(..) => None,
        }
    }

    /// Register a block, allocating a value for each of its arguments.
    pub fn create_block(&mut self, data: BlockData) -> BlockRef {
        let block = self.blocks.push(data);
        let types: SmallVec<[TypeRef; 4]> =
            self.blocks[block].args.iter().map(|arg| arg.ty).collect();
        let args: SmallVec<[ValueRef; 4]> = types
            .into_iter()
            .enumerate()
            .map(|(index, ty)| self.new_value(ValueDef::BlockArg(block, index as u32), ty))
            .collect();
        self.block_arg_values[block] = EntityList::from_slice(&args, &mut self.value_pool);
        block
    }

    pub fn block(&self, b: BlockRef) -> &BlockData {
        &self.blocks[b]
    }

    /// Argument `index` of `b`. Panics when out of range.
    pub fn block_arg(&self, b: BlockRef, index: u32) -> ValueRef {
        self.block_args(b)[index as usize]
    }

    pub fn block_args(&self, b: BlockRef) -> &[ValueRef] {
        self.block_arg_values[b].as_slice(&self.value_pool)
    }

    /// Append a detached `op` to `block`.
    pub fn push_op(&mut self, block: BlockRef, op: OpRef) {
        let end = self.blocks[block].ops.len();
        self.insert_op_at(block, end, op);
    }

    /// Place a detached `op` right before `before`.
    ///
    /// # Panics
    ///
    /// Panics if `before` is not in `block`.
    pub fn insert_op_before(&mut self, block: BlockRef, before: OpRef, op: OpRef) {
        let Some(index) = self.blocks[block].ops.iter().position(|&o| o == before) else {
            panic!("insert_op_before: {before} is not in block {block}");
        };
        self.insert_op_at(block, index, op);
    }

    /// Place a detached `op` at `index` in `block`.
    ///
    /// # Panics
    ///
    /// Panics if `op` is already attached or `index` is past the end.
    pub fn insert_op_at(&mut self, block: BlockRef, index: usize, op: OpRef) {
        if let Some(current) = self.ops[op].parent_block {
            panic!("insert_op_at: operation {op} is already attached to block {current}");
        }
        self.blocks[block].ops.insert(index, op);
        self.ops[op].parent_block = Some(block);
    }

    /// Detach `op` from `block` without destroying it.
    pub fn remove_op_from_block(&mut self, block: BlockRef, op: OpRef) {
        self.blocks[block].ops.retain(|o| *o != op);
        if self.ops[op].parent_block == Some(block) {
            self.ops[op].parent_block = None;
        }
    }

    /// Register a region and claim its blocks.
    ///
    /// # Panics
    ///
    /// Panics if one of the blocks already belongs to a region.
    pub fn create_region(&mut self, data: RegionData) -> RegionRef {
        let region = self.regions.push(data);
        for index in 0..self.regions[region].blocks.len() {
            let block = self.regions[region].blocks[index];
            let owner = self.blocks[block].parent_region.replace(region);
            assert!(
                owner.is_none(),
                "create_region: block {block} is owned by {owner:?}, not free for {region}",
            );
        }
        region
    }

    pub fn region(&self, r: RegionRef) -> &RegionData {
        &self.regions[r]
    }

    /// Operand slots reading `v`, in registration order.
    pub fn uses(&self, v: ValueRef) -> &[Use] {
        &self.uses[v]
    }

    pub fn has_uses(&self, v: ValueRef) -> bool {
        !self.uses[v].is_empty()
    }

    /// Rewrite every operand slot reading `old` to read `new`.
    pub fn replace_all_uses(&mut self, old: ValueRef, new: ValueRef) {
        if old == new {
            return;
        }
        for slot in std::mem::take(&mut self.uses[old]) {
            let operands = self.ops[slot.user]
                .operands
                .as_mut_slice(&mut self.value_pool);
            let operand = &mut operands[slot.operand_index as usize];
            debug_assert_eq!(*operand, old);
            *operand = new;
            self.uses[new].push(slot);
        }
    }
}

/// Incremental description of an operation, turned into one by
/// [`OperationDataBuilder::create`].
pub struct OperationDataBuilder {
    location: Location,
    dialect: Symbol,
    name: Symbol,
    operands: SmallVec<[ValueRef; 4]>,
    results: SmallVec<[TypeRef; 2]>,
    attributes: BTreeMap<Symbol, Attribute>,
    regions: SmallVec<[RegionRef; 4]>,
}

impl OperationDataBuilder {
    pub fn new(location: Location, dialect: Symbol, name: Symbol) -> Self {
        Self {
            location,
            dialect,
            name,
            operands: SmallVec::new(),
            results: SmallVec::new(),
            attributes: BTreeMap::new(),
            regions: SmallVec::new(),
        }
    }

    pub fn operand(self, v: ValueRef) -> Self {
        self.operands([v])
    }

    pub fn operands(mut self, vs: impl IntoIterator<Item = ValueRef>) -> Self {
        self.operands.extend(vs);
        self
    }

    pub fn result(self, ty: TypeRef) -> Self {
        self.results([ty])
    }

    pub fn results(mut self, tys: impl IntoIterator<Item = TypeRef>) -> Self {
        self.results.extend(tys);
        self
    }

    pub fn attr(mut self, key: impl Into<Symbol>, val: Attribute) -> Self {
        self.attributes.insert(key.into(), val);
        self
    }

    pub fn region(mut self, r: RegionRef) -> Self {
        self.regions.push(r);
        self
    }

    /// Register the operation in `ctx`, detached.
    pub fn create(self, ctx: &mut IrContext) -> OpRef {
        let data = OperationData {
            location: self.location,
            dialect: self.dialect,
            name: self.name,
            operands: EntityList::from_slice(&self.operands, &mut ctx.value_pool),
            results: EntityList::from_slice(&self.results, &mut ctx.type_pool),
            attributes: self.attributes,
            regions: self.regions,
            parent_block: None,
        };
        ctx.create_op(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_type(ctx: &mut IrContext) -> TypeRef {
        ctx.types
            .intern(TypeDataBuilder::new(Symbol::new("core"), Symbol::new("index")).build())
    }

    fn detached_block(ctx: &mut IrContext, location: Location) -> BlockRef {
        ctx.create_block(BlockData {
            location,
            args: vec![],
            ops: SmallVec::new(),
            parent_region: None,
        })
    }

    #[test]
    fn create_op_and_read_back() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test.mlir");
        let index_ty = index_type(&mut ctx);

        let op = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("const"))
            .result(index_ty)
            .attr("value", Attribute::IntBits(42))
            .create(&mut ctx);

        assert_eq!(ctx.op(op).dialect, Symbol::new("arith"));
        assert_eq!(ctx.op_full_name(op), "arith.const");
        assert_eq!(ctx.op_result_types(op), &[index_ty]);
        assert_eq!(
            ctx.op_attr(op, Symbol::new("value")),
            Some(&Attribute::IntBits(42))
        );
        let result = ctx.op_result(op, 0);
        assert_eq!(ctx.value_def(result), ValueDef::OpResult(op, 0));
        assert_eq!(ctx.defining_op(result), Some(op));
    }

    #[test]
    fn use_chain_tracks_operands() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test.mlir");
        let index_ty = index_type(&mut ctx);

        let producer = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("def"))
            .result(index_ty)
            .create(&mut ctx);
        let v = ctx.op_result(producer, 0);
        assert!(!ctx.has_uses(v));

        let user = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("use"))
            .operand(v)
            .operand(v)
            .create(&mut ctx);

        assert_eq!(
            ctx.uses(v),
            &[
                Use {
                    user,
                    operand_index: 0
                },
                Use {
                    user,
                    operand_index: 1
                }
            ]
        );
    }

    #[test]
    fn replace_all_uses_moves_every_use() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test.mlir");
        let index_ty = index_type(&mut ctx);

        let a = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("a"))
            .result(index_ty)
            .create(&mut ctx);
        let b = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("b"))
            .result(index_ty)
            .create(&mut ctx);
        let va = ctx.op_result(a, 0);
        let vb = ctx.op_result(b, 0);
        let user = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("use"))
            .operand(va)
            .create(&mut ctx);

        ctx.replace_all_uses(va, vb);

        assert_eq!(ctx.op_operands(user), &[vb]);
        assert!(!ctx.has_uses(va));
        assert_eq!(ctx.uses(vb).len(), 1);
    }

    #[test]
    fn remove_op_clears_operand_uses() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test.mlir");
        let index_ty = index_type(&mut ctx);
        let block = detached_block(&mut ctx, loc);

        let def = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("def"))
            .result(index_ty)
            .create(&mut ctx);
        let v = ctx.op_result(def, 0);
        let user = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("use"))
            .operand(v)
            .create(&mut ctx);
        ctx.push_op(block, def);
        ctx.push_op(block, user);

        ctx.remove_op_from_block(block, user);
        ctx.remove_op(user);

        assert!(ctx.is_removed(user));
        assert!(!ctx.is_removed(def));
        assert!(!ctx.has_uses(v));
        assert_eq!(ctx.block(block).ops.as_slice(), &[def]);
    }

    #[test]
    #[should_panic(expected = "still has 1 use(s)")]
    fn remove_op_with_live_uses_panics() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test.mlir");
        let index_ty = index_type(&mut ctx);

        let def = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("def"))
            .result(index_ty)
            .create(&mut ctx);
        let v = ctx.op_result(def, 0);
        let _user = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("use"))
            .operand(v)
            .create(&mut ctx);

        ctx.remove_op(def);
    }

    #[test]
    fn insert_op_before_keeps_order() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test.mlir");
        let block = detached_block(&mut ctx, loc);

        let first = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("first"))
            .create(&mut ctx);
        let last = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("last"))
            .create(&mut ctx);
        let middle = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("middle"))
            .create(&mut ctx);
        ctx.push_op(block, first);
        ctx.push_op(block, last);
        ctx.insert_op_before(block, last, middle);

        assert_eq!(ctx.block(block).ops.as_slice(), &[first, middle, last]);
        assert_eq!(ctx.op(middle).parent_block, Some(block));
    }
}
