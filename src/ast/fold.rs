use crate::syntax::{
    term::{MatchCase, Pattern, Term},
    types::{ConstructorDecl, Type, TypeDecl},
};

/// Term folder (rewriter).
///
/// Every `fold_*` method receives an owned node and returns a (possibly
/// rewritten) owned node. Defaults call the corresponding `fold_*` free
/// function which reconstructs the node after folding its children.
///
/// Binding forms call `enter_scope` before their binders are folded and
/// `exit_scope` once the bound region is done, so scope-aware folders can
/// track shadowing. The value of a `Let` is folded outside its scope; every
/// other bound region (lambda bodies, all letrec bindings, match cases) is
/// folded inside.
pub trait Folder {
    fn fold_term(&mut self, term: Term) -> Term {
        fold_term(self, term)
    }

    fn fold_case(&mut self, case: MatchCase) -> MatchCase {
        fold_case(self, case)
    }

    fn fold_pattern(&mut self, pattern: Pattern) -> Pattern {
        fold_pattern(self, pattern)
    }

    fn fold_type(&mut self, ty: Type) -> Type {
        fold_type(self, ty)
    }

    fn fold_decl(&mut self, decl: TypeDecl) -> TypeDecl {
        fold_decl(self, decl)
    }

    /// A binding occurrence of a local variable.
    fn fold_binder(&mut self, name: String) -> String {
        name
    }

    /// A use occurrence of a local variable.
    fn fold_var(&mut self, name: String) -> Term {
        Term::Var(name)
    }

    fn enter_scope(&mut self) {}

    fn exit_scope(&mut self) {}
}

pub fn fold_term<F: Folder + ?Sized>(folder: &mut F, term: Term) -> Term {
    match term {
        Term::Var(name) => folder.fold_var(name),
        Term::Ref(_) | Term::Literal(_) | Term::Constructor { .. } | Term::Request { .. } => term,
        Term::Lambda { params, body } => {
            folder.enter_scope();
            let params = params.into_iter().map(|p| folder.fold_binder(p)).collect();
            let body = folder.fold_term(*body);
            folder.exit_scope();
            Term::Lambda {
                params,
                body: Box::new(body),
            }
        }
        Term::Apply { func, args } => Term::Apply {
            func: Box::new(folder.fold_term(*func)),
            args: args.into_iter().map(|a| folder.fold_term(a)).collect(),
        },
        Term::Let { name, value, body } => {
            let value = folder.fold_term(*value);
            folder.enter_scope();
            let name = folder.fold_binder(name);
            let body = folder.fold_term(*body);
            folder.exit_scope();
            Term::Let {
                name,
                value: Box::new(value),
                body: Box::new(body),
            }
        }
        Term::LetRec { bindings, body } => {
            folder.enter_scope();
            let names: Vec<String> = bindings
                .iter()
                .map(|(name, _)| folder.fold_binder(name.clone()))
                .collect();
            let bindings = names
                .into_iter()
                .zip(bindings)
                .map(|(name, (_, value))| (name, folder.fold_term(value)))
                .collect();
            let body = folder.fold_term(*body);
            folder.exit_scope();
            Term::LetRec {
                bindings,
                body: Box::new(body),
            }
        }
        Term::If {
            condition,
            then_branch,
            else_branch,
        } => Term::If {
            condition: Box::new(folder.fold_term(*condition)),
            then_branch: Box::new(folder.fold_term(*then_branch)),
            else_branch: Box::new(folder.fold_term(*else_branch)),
        },
        Term::Match { scrutinee, cases } => Term::Match {
            scrutinee: Box::new(folder.fold_term(*scrutinee)),
            cases: cases.into_iter().map(|c| folder.fold_case(c)).collect(),
        },
        Term::Handle {
            abilities,
            handler,
            body,
        } => Term::Handle {
            abilities,
            handler: Box::new(folder.fold_term(*handler)),
            body: Box::new(folder.fold_term(*body)),
        },
        Term::Ann { term, ty } => Term::Ann {
            term: Box::new(folder.fold_term(*term)),
            ty: folder.fold_type(ty),
        },
    }
}

pub fn fold_case<F: Folder + ?Sized>(folder: &mut F, case: MatchCase) -> MatchCase {
    let MatchCase {
        pattern,
        guard,
        body,
    } = case;
    folder.enter_scope();
    let pattern = folder.fold_pattern(pattern);
    let guard = guard.map(|g| folder.fold_term(g));
    let body = folder.fold_term(body);
    folder.exit_scope();
    MatchCase {
        pattern,
        guard,
        body,
    }
}

pub fn fold_pattern<F: Folder + ?Sized>(folder: &mut F, pattern: Pattern) -> Pattern {
    match pattern {
        Pattern::Wildcard | Pattern::Literal(_) => pattern,
        Pattern::Var(name) => Pattern::Var(folder.fold_binder(name)),
        Pattern::As { name, pattern } => Pattern::As {
            name: folder.fold_binder(name),
            pattern: Box::new(folder.fold_pattern(*pattern)),
        },
        Pattern::Constructor {
            type_ref,
            tag,
            args,
        } => Pattern::Constructor {
            type_ref,
            tag,
            args: args.into_iter().map(|a| folder.fold_pattern(a)).collect(),
        },
        Pattern::EffectPure(inner) => Pattern::EffectPure(Box::new(folder.fold_pattern(*inner))),
        Pattern::EffectBind {
            type_ref,
            tag,
            args,
            continuation,
        } => Pattern::EffectBind {
            type_ref,
            tag,
            args: args.into_iter().map(|a| folder.fold_pattern(a)).collect(),
            continuation: folder.fold_binder(continuation),
        },
    }
}

pub fn fold_type<F: Folder + ?Sized>(folder: &mut F, ty: Type) -> Type {
    match ty {
        Type::Ref(_) | Type::Var(_) => ty,
        Type::Apply { func, args } => Type::Apply {
            func: Box::new(folder.fold_type(*func)),
            args: args.into_iter().map(|a| folder.fold_type(a)).collect(),
        },
        Type::Arrow {
            input,
            abilities,
            output,
        } => Type::Arrow {
            input: Box::new(folder.fold_type(*input)),
            abilities: abilities.into_iter().map(|a| folder.fold_type(a)).collect(),
            output: Box::new(folder.fold_type(*output)),
        },
    }
}

pub fn fold_decl<F: Folder + ?Sized>(folder: &mut F, decl: TypeDecl) -> TypeDecl {
    let TypeDecl {
        kind,
        params,
        constructors,
    } = decl;
    TypeDecl {
        kind,
        params,
        constructors: constructors
            .into_iter()
            .map(|ConstructorDecl { name, fields }| ConstructorDecl {
                name,
                fields: fields.into_iter().map(|f| folder.fold_type(f)).collect(),
            })
            .collect(),
    }
}
