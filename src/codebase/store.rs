use std::collections::HashMap;

use crate::ast::{substitute, substitute_type_vars};
use crate::codebase::hash::{hash_decl, hash_decl_cycle, hash_term, hash_term_cycle};
use crate::syntax::{
    reference::Reference,
    term::Term,
    types::{Type, TypeDecl},
};

/// Read access to the definitions a runtime loads code from.
///
/// Only derived references are ever looked up; builtins are part of the
/// runtime itself.
pub trait CodeLookup {
    fn lookup_term(&self, reference: &Reference) -> Option<Term>;

    fn lookup_type_decl(&self, reference: &Reference) -> Option<TypeDecl>;
}

/// In-memory definition store keyed by content hash.
#[derive(Debug, Clone, Default)]
pub struct Codebase {
    terms: HashMap<Reference, Term>,
    types: HashMap<Reference, TypeDecl>,
}

impl Codebase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a non-recursive term and returns its reference.
    pub fn add_term(&mut self, term: Term) -> Reference {
        let reference = Reference::derived(hash_term(&term));
        self.terms.insert(reference.clone(), term);
        reference
    }

    /// Adds a group of mutually recursive terms. Members refer to each other
    /// by binding name; those names are replaced with the members' references.
    pub fn add_term_group(&mut self, bindings: Vec<(String, Term)>) -> Vec<Reference> {
        let references = hash_term_cycle(&bindings);
        let map: HashMap<String, Term> = bindings
            .iter()
            .zip(&references)
            .map(|((name, _), reference)| (name.clone(), Term::Ref(reference.clone())))
            .collect();
        for ((_, term), reference) in bindings.into_iter().zip(&references) {
            self.terms
                .insert(reference.clone(), substitute(term, &map));
        }
        references
    }

    /// Adds a declaration that does not refer to itself.
    pub fn add_type(&mut self, decl: TypeDecl) -> Reference {
        let reference = Reference::derived(hash_decl(&decl));
        self.types.insert(reference.clone(), decl);
        reference
    }

    /// Adds a group of mutually recursive declarations. Members refer to each
    /// other (and themselves) through type variables named after them.
    pub fn add_type_group(&mut self, decls: Vec<(String, TypeDecl)>) -> Vec<Reference> {
        let references = hash_decl_cycle(&decls);
        let map: HashMap<String, Type> = decls
            .iter()
            .zip(&references)
            .map(|((name, _), reference)| (name.clone(), Type::Ref(reference.clone())))
            .collect();
        for ((_, decl), reference) in decls.into_iter().zip(&references) {
            self.types
                .insert(reference.clone(), substitute_type_vars(decl, &map, false));
        }
        references
    }

    /// Stores a term under a caller-chosen reference, bypassing hashing.
    pub fn insert_term(&mut self, reference: Reference, term: Term) {
        self.terms.insert(reference, term);
    }

    /// Stores a declaration under a caller-chosen reference, bypassing hashing.
    pub fn insert_type(&mut self, reference: Reference, decl: TypeDecl) {
        self.types.insert(reference, decl);
    }

    pub fn len(&self) -> usize {
        self.terms.len() + self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CodeLookup for Codebase {
    fn lookup_term(&self, reference: &Reference) -> Option<Term> {
        self.terms.get(reference).cloned()
    }

    fn lookup_type_decl(&self, reference: &Reference) -> Option<TypeDecl> {
        self.types.get(reference).cloned()
    }
}
