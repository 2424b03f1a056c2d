//! Dialect definitions: typed wrappers, constructors and type helpers.

pub mod arith;
pub mod core;
pub mod dist;
pub mod func;
pub mod tensor;

#[cfg(test)]
mod tests {
    use crate::ops::{ConversionError, DialectOp};
    use crate::{Attribute, IrContext, Location, Symbol, ValueDef};

    fn setup() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let loc = ctx.location("dialect-test");
        (ctx, loc)
    }

    #[test]
    fn arith_const_round_trip() {
        let (mut ctx, loc) = setup();
        let i32_ty = super::core::i32_type(&mut ctx);

        let op = super::arith::r#const(&mut ctx, loc, i32_ty, Attribute::IntBits(42));

        let op2 =
            super::arith::Const::from_op(&ctx, op.op_ref()).expect("should match arith.const");
        assert_eq!(op, op2);
        assert_eq!(op.value(&ctx), Some(Attribute::IntBits(42)));
        assert_eq!(ctx.value_ty(op.result(&ctx)), i32_ty);
    }

    #[test]
    fn zero_of_float_is_float_zero() {
        let (mut ctx, loc) = setup();
        let f32_ty = super::core::f32_type(&mut ctx);
        let index_ty = super::core::index_type(&mut ctx);

        let f = super::arith::zero(&mut ctx, loc, f32_ty);
        let i = super::arith::zero(&mut ctx, loc, index_ty);

        assert_eq!(f.value(&ctx), Some(Attribute::FloatBits(0.0f64.to_bits())));
        assert_eq!(i.value(&ctx), Some(Attribute::IntBits(0)));
    }

    #[test]
    fn from_op_rejects_other_operation() {
        let (mut ctx, loc) = setup();
        let index_ty = super::core::index_type(&mut ctx);
        let c = super::arith::zero(&mut ctx, loc, index_ty);

        let err = super::dist::LocalShape::from_op(&ctx, c.op_ref()).unwrap_err();
        assert_eq!(
            err,
            ConversionError::WrongOperation {
                expected: "dist.local_shape",
                actual: "arith.const".to_owned(),
            }
        );
    }

    #[test]
    fn dist_accessors() {
        let (mut ctx, loc) = setup();
        let index_ty = super::core::index_type(&mut ctx);
        let i64_ty = super::core::i64_type(&mut ctx);
        let f32_ty = super::core::f32_type(&mut ctx);
        let tensor_ty = super::tensor::ranked_type(&mut ctx, f32_ty, &[4, 4]);

        let shape = super::arith::zero(&mut ctx, loc, index_ty).result(&ctx);
        let local = super::arith::zero(&mut ctx, loc, tensor_ty).result(&ctx);
        let reg = super::dist::register_tensor(&mut ctx, loc, shape, [local], i64_ty);
        assert_eq!(reg.shape(&ctx), Some(shape));
        assert_eq!(ctx.op_operands(reg.op_ref()), &[shape, local]);

        let reg_result = reg.result(&ctx);
        let ls = super::dist::local_shape(&mut ctx, loc, reg_result, index_ty);
        assert_eq!(ls.ptensor(&ctx), Some(reg.result(&ctx)));
        assert_eq!(
            ctx.value_def(ls.result(&ctx)),
            ValueDef::OpResult(ls.op_ref(), 0)
        );

        let ar = super::dist::all_reduce(&mut ctx, loc, local, tensor_ty, Symbol::new("sum"));
        assert_eq!(ar.tensor(&ctx), Some(local));
        assert_eq!(ar.reduction(&ctx), Some(Symbol::new("sum")));
        assert_eq!(ar.result_ty(&ctx), tensor_ty);

        let lo = super::dist::local_offsets(&mut ctx, loc, [shape], [index_ty, index_ty]);
        assert_eq!(lo.results(&ctx).len(), 2);
    }

    #[test]
    fn tensor_shape_queries() {
        let (mut ctx, loc) = setup();
        let f32_ty = super::core::f32_type(&mut ctx);
        let t = super::tensor::ranked_type(&mut ctx, f32_ty, &[2, 3]);

        assert_eq!(super::tensor::shape_of(&ctx, t), Some(vec![2, 3]));
        assert_eq!(super::tensor::element_type(&ctx, t), Some(f32_ty));
        assert_eq!(super::tensor::shape_of(&ctx, f32_ty), None);

        let src = super::arith::zero(&mut ctx, loc, t).result(&ctx);
        let cast = super::tensor::cast(&mut ctx, loc, src, t);
        assert_eq!(cast.input(&ctx), src);
    }

    #[test]
    fn module_and_declaration() {
        let (mut ctx, loc) = setup();
        let module = super::core::module(&mut ctx, loc, Symbol::new("m"));
        assert_eq!(module.name(&ctx), Some(Symbol::new("m")));
        assert!(module.ops(&ctx).is_empty());

        let decl = super::func::declaration(&mut ctx, loc, Symbol::new("printf"));
        let block = module.first_block(&ctx).unwrap();
        ctx.push_op(block, decl.op_ref());

        assert_eq!(module.ops(&ctx), vec![decl.op_ref()]);
        assert_eq!(decl.sym_name(&ctx), Some(Symbol::new("printf")));
        assert_eq!(
            super::func::symbol_of(&ctx, decl.op_ref()),
            Some(Symbol::new("printf"))
        );
        assert!(super::core::Module::new(&ctx, decl.op_ref()).is_none());

        let call = super::func::call(&mut ctx, loc, Symbol::new("printf"), [], []);
        assert_eq!(call.callee(&ctx), Some(Symbol::new("printf")));
        assert!(call.args(&ctx).is_empty());
    }
}
