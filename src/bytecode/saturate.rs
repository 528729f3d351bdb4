use std::collections::HashMap;

use crate::ast::fold::{self, Folder};
use crate::bytecode::fresh::NameSupply;
use crate::runtime::{context::ConstructorArity, error::LoadError};
use crate::syntax::{reference::Reference, term::Term};

/// Rewrites every constructor and request occurrence so it is applied to
/// exactly its declared number of arguments.
///
/// Under-applied occurrences are eta-expanded: the given arguments are bound
/// first (keeping evaluation order), the missing ones become lambda
/// parameters. Over-applied occurrences apply the saturated value to the
/// remaining arguments.
pub fn saturate(
    arities: &HashMap<Reference, ConstructorArity>,
    term: Term,
) -> Result<Term, LoadError> {
    let mut saturator = Saturator {
        arities,
        names: NameSupply::new("s"),
        error: None,
    };
    let term = saturator.fold_term(term);
    match saturator.error {
        Some(err) => Err(err),
        None => Ok(term),
    }
}

struct Saturator<'a> {
    arities: &'a HashMap<Reference, ConstructorArity>,
    names: NameSupply,
    error: Option<LoadError>,
}

impl Saturator<'_> {
    fn arity(&mut self, type_ref: &Reference, tag: u32) -> Option<usize> {
        let found = match self.arities.get(type_ref) {
            None => Err(LoadError::MissingArity(type_ref.clone())),
            Some(arity) => arity.arity(tag).ok_or_else(|| LoadError::UnknownConstructor {
                type_ref: type_ref.clone(),
                tag,
            }),
        };
        match found {
            Ok(n) => Some(n),
            Err(err) => {
                self.error.get_or_insert(err);
                None
            }
        }
    }

    fn saturated(&mut self, head: Term, args: Vec<Term>, arity: usize) -> Term {
        if args.len() >= arity {
            let mut args = args;
            let extra = args.split_off(arity);
            let applied = Term::apply(head, args);
            return if extra.is_empty() {
                applied
            } else {
                Term::apply(applied, extra)
            };
        }

        let mut bindings = Vec::new();
        let mut full = Vec::with_capacity(arity);
        for arg in args {
            if is_trivial(&arg) {
                full.push(arg);
            } else {
                let name = self.names.fresh();
                full.push(Term::Var(name.clone()));
                bindings.push((name, arg));
            }
        }
        let params = self.names.fresh_n(arity - full.len());
        full.extend(params.iter().cloned().map(Term::Var));

        let expanded = Term::lambda(params, Term::apply(head, full));
        bindings
            .into_iter()
            .rev()
            .fold(expanded, |body, (name, value)| Term::let_in(name, value, body))
    }
}

impl Folder for Saturator<'_> {
    fn fold_term(&mut self, term: Term) -> Term {
        match term {
            Term::Apply { func, args } => match constructor_head(&func) {
                Some((type_ref, tag)) => {
                    let args: Vec<Term> = args.into_iter().map(|a| self.fold_term(a)).collect();
                    match self.arity(&type_ref, tag) {
                        Some(arity) => self.saturated(*func, args, arity),
                        None => Term::Apply { func, args },
                    }
                }
                None => fold::fold_term(self, Term::Apply { func, args }),
            },
            Term::Constructor { .. } | Term::Request { .. } => match constructor_head(&term) {
                Some((type_ref, tag)) => match self.arity(&type_ref, tag) {
                    Some(arity) => self.saturated(term, Vec::new(), arity),
                    None => term,
                },
                None => term,
            },
            other => fold::fold_term(self, other),
        }
    }
}

fn constructor_head(term: &Term) -> Option<(Reference, u32)> {
    match term {
        Term::Constructor { type_ref, tag } | Term::Request { type_ref, tag } => {
            Some((type_ref.clone(), *tag))
        }
        _ => None,
    }
}

fn is_trivial(term: &Term) -> bool {
    matches!(term, Term::Var(_) | Term::Literal(_) | Term::Ref(_))
}
