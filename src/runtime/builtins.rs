use std::rc::Rc;

use crate::bytecode::combinator::{Comb, CombinatorSet, Operand, Section};
use crate::primop::PrimOp;
use crate::runtime::context::EvalContext;
use crate::syntax::{
    reference::Reference,
    term::Term,
    types::{ConstructorDecl, TypeDecl},
};

pub const INT: &str = "Int";
pub const BOOLEAN: &str = "Boolean";
pub const TEXT: &str = "Text";
pub const UNIT: &str = "Unit";

/// Primitive types are opaque to saturation and pattern compilation: they
/// have no constructors.
const PRIMITIVE_TYPES: [&str; 3] = [INT, BOOLEAN, TEXT];

pub fn unit_decl() -> TypeDecl {
    TypeDecl::data(vec![ConstructorDecl::new(UNIT, Vec::new())])
}

/// The unit value, `Unit`.
pub fn unit() -> Term {
    Term::Constructor {
        type_ref: Reference::builtin(UNIT),
        tag: 0,
    }
}

/// Combinator set backing a primitive operation: one combinator taking the
/// operation's arguments and handing them to the foreign table.
pub fn primop_combinators(op: PrimOp) -> CombinatorSet {
    let arity = op.arity();
    let body = Section::Prim {
        op,
        args: (0..arity).map(Operand::Local).collect(),
    };
    CombinatorSet::new(vec![Comb {
        arity,
        frame_size: arity,
        body: Rc::new(body),
    }])
}

/// Context every session starts from: the builtin types numbered first, then
/// one compiled term per primitive operation, in [`PrimOp::ALL`] order.
pub fn base_context() -> EvalContext {
    let mut ctx = EvalContext::new();
    for name in PRIMITIVE_TYPES {
        ctx.register_type(&Reference::builtin(name), TypeDecl::data(Vec::new()));
    }
    ctx.register_type(&Reference::builtin(UNIT), unit_decl());

    for op in PrimOp::ALL {
        let reference = Reference::builtin(op.builtin_name());
        let id = ctx.allocate_term(&reference, Rc::new(Term::Ref(reference.clone())));
        ctx.install(id, primop_combinators(op));
    }
    ctx
}
