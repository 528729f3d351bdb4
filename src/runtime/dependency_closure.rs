use std::collections::BTreeSet;

use crate::ast::{decl_dependencies, term_dependencies};
use crate::codebase::CodeLookup;
use crate::runtime::{context::EvalContext, error::LoadError};
use crate::syntax::{
    reference::{LabeledDependency, Reference},
    term::Term,
    types::TypeDecl,
};

/// Types and terms reachable from a definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    pub types: BTreeSet<Reference>,
    pub terms: BTreeSet<Reference>,
}

impl Closure {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.types.len() + self.terms.len()
    }
}

/// Serves definitions the context already holds from its caches and
/// everything else from the store.
pub struct CachedSource<'a> {
    ctx: &'a EvalContext,
    store: &'a dyn CodeLookup,
}

impl<'a> CachedSource<'a> {
    pub fn new(ctx: &'a EvalContext, store: &'a dyn CodeLookup) -> Self {
        Self { ctx, store }
    }
}

impl CodeLookup for CachedSource<'_> {
    fn lookup_term(&self, reference: &Reference) -> Option<Term> {
        let cached = self
            .ctx
            .term_id(reference)
            .and_then(|id| self.ctx.term_ast(id));
        match cached {
            Some(term) => Some((**term).clone()),
            None => self.store.lookup_term(reference),
        }
    }

    fn lookup_type_decl(&self, reference: &Reference) -> Option<TypeDecl> {
        match self.ctx.decl(reference) {
            Some(decl) => Some(decl.clone()),
            None => self.store.lookup_type_decl(reference),
        }
    }
}

/// Everything `term` depends on, transitively.
///
/// `seen` carries the dependencies already visited; they are neither
/// reported again nor revisited, which is what makes cycles terminate.
pub fn term_closure(
    source: &dyn CodeLookup,
    term: &Term,
    seen: &mut BTreeSet<LabeledDependency>,
) -> Result<Closure, LoadError> {
    let mut closure = Closure::default();
    expand(source, term_dependencies(term), seen, &mut closure)?;
    Ok(closure)
}

/// Everything the constructor fields of `decl` depend on, transitively.
pub fn decl_closure(
    source: &dyn CodeLookup,
    decl: &TypeDecl,
    seen: &mut BTreeSet<LabeledDependency>,
) -> Result<Closure, LoadError> {
    let mut closure = Closure::default();
    expand(source, decl_dependencies(decl), seen, &mut closure)?;
    Ok(closure)
}

fn expand(
    source: &dyn CodeLookup,
    deps: BTreeSet<LabeledDependency>,
    seen: &mut BTreeSet<LabeledDependency>,
    closure: &mut Closure,
) -> Result<(), LoadError> {
    let fresh: Vec<LabeledDependency> = deps.into_iter().filter(|dep| !seen.contains(dep)).collect();
    seen.extend(fresh.iter().cloned());

    for dep in fresh {
        match dep {
            LabeledDependency::Term(reference) => {
                closure.terms.insert(reference.clone());
                if reference.is_builtin() {
                    continue;
                }
                let term = source
                    .lookup_term(&reference)
                    .ok_or(LoadError::MissingTerm(reference))?;
                expand(source, term_dependencies(&term), seen, closure)?;
            }
            LabeledDependency::Type(reference) => {
                closure.types.insert(reference.clone());
                if reference.is_builtin() {
                    continue;
                }
                let decl = source
                    .lookup_type_decl(&reference)
                    .ok_or(LoadError::MissingType(reference))?;
                expand(source, decl_dependencies(&decl), seen, closure)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebase::Codebase;
    use crate::syntax::{
        term::{MatchCase, Pattern},
        types::{ConstructorDecl, Type},
    };

    #[test]
    fn mutually_recursive_types_terminate() {
        let mut store = Codebase::new();
        let refs = store.add_type_group(vec![
            (
                "A".to_string(),
                TypeDecl::data(vec![ConstructorDecl::new("A", vec![Type::Var("B".into())])]),
            ),
            (
                "B".to_string(),
                TypeDecl::data(vec![
                    ConstructorDecl::new("B", vec![Type::Var("A".into())]),
                    ConstructorDecl::new("End", vec![]),
                ]),
            ),
        ]);
        let term = Term::match_on(
            Term::int(0),
            vec![MatchCase::new(
                Pattern::Constructor {
                    type_ref: refs[0].clone(),
                    tag: 0,
                    args: vec![Pattern::Wildcard],
                },
                Term::int(1),
            )],
        );

        let closure = term_closure(&store, &term, &mut BTreeSet::new()).unwrap();
        assert_eq!(closure.types, refs.iter().cloned().collect());
        assert!(closure.terms.is_empty());
    }

    #[test]
    fn seen_dependencies_are_skipped() {
        let mut store = Codebase::new();
        let helper = store.add_term(Term::int(3));
        let term = Term::call2("Int.+", Term::Ref(helper.clone()), Term::int(1));

        let mut seen = BTreeSet::new();
        seen.insert(LabeledDependency::Term(helper));
        let closure = term_closure(&store, &term, &mut seen).unwrap();
        assert_eq!(
            closure.terms,
            [Reference::builtin("Int.+")].into_iter().collect()
        );
    }

    #[test]
    fn missing_definition_is_fatal() {
        let store = Codebase::new();
        let ghost = Reference::derived(crate::syntax::reference::Hash([9; 32]));
        let term = Term::Ref(ghost.clone());
        assert_eq!(
            term_closure(&store, &term, &mut BTreeSet::new()),
            Err(LoadError::MissingTerm(ghost))
        );
    }
}
