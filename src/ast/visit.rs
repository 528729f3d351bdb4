use crate::syntax::{
    reference::Reference,
    term::{MatchCase, Pattern, Term},
    types::{ConstructorDecl, Type, TypeDecl},
};

/// Read-only term visitor.
///
/// Every `visit_*` method has a default that calls the corresponding `walk_*`
/// free function, which recurses into child nodes. Override a method to
/// intercept a node; call `walk_*` from within your override to continue
/// the traversal.
pub trait Visitor<'ast> {
    fn visit_term(&mut self, term: &'ast Term) {
        walk_term(self, term);
    }

    fn visit_case(&mut self, case: &'ast MatchCase) {
        walk_case(self, case);
    }

    fn visit_pattern(&mut self, pattern: &'ast Pattern) {
        walk_pattern(self, pattern);
    }

    fn visit_type(&mut self, ty: &'ast Type) {
        walk_type(self, ty);
    }

    fn visit_decl(&mut self, decl: &'ast TypeDecl) {
        walk_decl(self, decl);
    }

    /// Called for every reference to a term definition.
    fn visit_term_ref(&mut self, _reference: &'ast Reference) {}

    /// Called for every reference to a type: constructors, requests,
    /// handled abilities, and type annotations.
    fn visit_type_ref(&mut self, _reference: &'ast Reference) {}
}

// ---------------------------------------------------------------------------
// walk_* free functions – exhaustive destructuring so that adding a new
// field or variant causes a compile error until this code is updated.
// ---------------------------------------------------------------------------

pub fn walk_term<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, term: &'ast Term) {
    match term {
        Term::Var(_) | Term::Literal(_) => {}
        Term::Ref(reference) => visitor.visit_term_ref(reference),
        Term::Lambda { params: _, body } => visitor.visit_term(body),
        Term::Apply { func, args } => {
            visitor.visit_term(func);
            for arg in args {
                visitor.visit_term(arg);
            }
        }
        Term::Let {
            name: _,
            value,
            body,
        } => {
            visitor.visit_term(value);
            visitor.visit_term(body);
        }
        Term::LetRec { bindings, body } => {
            for (_, value) in bindings {
                visitor.visit_term(value);
            }
            visitor.visit_term(body);
        }
        Term::Constructor { type_ref, tag: _ } | Term::Request { type_ref, tag: _ } => {
            visitor.visit_type_ref(type_ref)
        }
        Term::If {
            condition,
            then_branch,
            else_branch,
        } => {
            visitor.visit_term(condition);
            visitor.visit_term(then_branch);
            visitor.visit_term(else_branch);
        }
        Term::Match { scrutinee, cases } => {
            visitor.visit_term(scrutinee);
            for case in cases {
                visitor.visit_case(case);
            }
        }
        Term::Handle {
            abilities,
            handler,
            body,
        } => {
            for ability in abilities {
                visitor.visit_type_ref(ability);
            }
            visitor.visit_term(handler);
            visitor.visit_term(body);
        }
        Term::Ann { term, ty } => {
            visitor.visit_term(term);
            visitor.visit_type(ty);
        }
    }
}

pub fn walk_case<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, case: &'ast MatchCase) {
    let MatchCase {
        pattern,
        guard,
        body,
    } = case;
    visitor.visit_pattern(pattern);
    if let Some(guard) = guard {
        visitor.visit_term(guard);
    }
    visitor.visit_term(body);
}

pub fn walk_pattern<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, pattern: &'ast Pattern) {
    match pattern {
        Pattern::Wildcard | Pattern::Var(_) | Pattern::Literal(_) => {}
        Pattern::As { name: _, pattern } => visitor.visit_pattern(pattern),
        Pattern::Constructor {
            type_ref,
            tag: _,
            args,
        }
        | Pattern::EffectBind {
            type_ref,
            tag: _,
            args,
            continuation: _,
        } => {
            visitor.visit_type_ref(type_ref);
            for arg in args {
                visitor.visit_pattern(arg);
            }
        }
        Pattern::EffectPure(inner) => visitor.visit_pattern(inner),
    }
}

pub fn walk_type<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, ty: &'ast Type) {
    match ty {
        Type::Ref(reference) => visitor.visit_type_ref(reference),
        Type::Var(_) => {}
        Type::Apply { func, args } => {
            visitor.visit_type(func);
            for arg in args {
                visitor.visit_type(arg);
            }
        }
        Type::Arrow {
            input,
            abilities,
            output,
        } => {
            visitor.visit_type(input);
            for ability in abilities {
                visitor.visit_type(ability);
            }
            visitor.visit_type(output);
        }
    }
}

pub fn walk_decl<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, decl: &'ast TypeDecl) {
    let TypeDecl {
        kind: _,
        params: _,
        constructors,
    } = decl;
    for ConstructorDecl { name: _, fields } in constructors {
        for field in fields {
            visitor.visit_type(field);
        }
    }
}
