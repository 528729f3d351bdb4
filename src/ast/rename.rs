use std::collections::{HashMap, HashSet};

use crate::ast::fold::{self, Folder};
use crate::syntax::{
    term::Term,
    types::{Type, TypeDecl},
};

/// Renames every local binder to a positional name (`v0`, `v1`, ...) in
/// binding order. Free variables keep their names.
///
/// Two terms that differ only in the names of their local variables
/// canonicalize to the same term, which is what content hashing relies on.
struct Canonicalizer {
    scopes: Vec<HashMap<String, String>>,
    next: usize,
}

impl Folder for Canonicalizer {
    fn fold_binder(&mut self, name: String) -> String {
        let fresh = format!("v{}", self.next);
        self.next += 1;
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, fresh.clone());
        }
        fresh
    }

    fn fold_var(&mut self, name: String) -> Term {
        let renamed = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).cloned());
        Term::Var(renamed.unwrap_or(name))
    }

    fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn exit_scope(&mut self) {
        self.scopes.pop();
    }
}

pub fn canonicalize(term: Term) -> Term {
    let mut canonicalizer = Canonicalizer {
        scopes: vec![HashMap::new()],
        next: 0,
    };
    canonicalizer.fold_term(term)
}

/// Renames type parameters of a declaration positionally (`t0`, `t1`, ...).
pub fn canonicalize_decl(decl: TypeDecl) -> TypeDecl {
    let map: HashMap<String, Type> = decl
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| (p.clone(), Type::Var(format!("t{}", i))))
        .collect();
    let params = (0..decl.params.len()).map(|i| format!("t{}", i)).collect();
    let mut renamed = substitute_type_vars(decl, &map, true);
    renamed.params = params;
    renamed
}

/// Replaces free occurrences of variables with the given terms.
///
/// Replacement terms must be closed; binders shadowing a name stop the
/// substitution inside their scope.
struct Substituter<'a> {
    map: &'a HashMap<String, Term>,
    bound: Vec<HashSet<String>>,
}

impl Folder for Substituter<'_> {
    fn fold_binder(&mut self, name: String) -> String {
        if let Some(scope) = self.bound.last_mut() {
            scope.insert(name.clone());
        }
        name
    }

    fn fold_var(&mut self, name: String) -> Term {
        if self.bound.iter().any(|scope| scope.contains(&name)) {
            return Term::Var(name);
        }
        match self.map.get(&name) {
            Some(replacement) => replacement.clone(),
            None => Term::Var(name),
        }
    }

    fn enter_scope(&mut self) {
        self.bound.push(HashSet::new());
    }

    fn exit_scope(&mut self) {
        self.bound.pop();
    }
}

pub fn substitute(term: Term, map: &HashMap<String, Term>) -> Term {
    if map.is_empty() {
        return term;
    }
    let mut substituter = Substituter {
        map,
        bound: Vec::new(),
    };
    substituter.fold_term(term)
}

struct TypeVarSubstituter<'a> {
    map: &'a HashMap<String, Type>,
    params: HashSet<String>,
}

impl Folder for TypeVarSubstituter<'_> {
    fn fold_type(&mut self, ty: Type) -> Type {
        match ty {
            Type::Var(name) if !self.params.contains(&name) => match self.map.get(&name) {
                Some(replacement) => replacement.clone(),
                None => Type::Var(name),
            },
            other => fold::fold_type(self, other),
        }
    }
}

/// Replaces type variables in constructor fields. Declaration parameters
/// shadow the map unless `include_params` is set.
pub fn substitute_type_vars(
    decl: TypeDecl,
    map: &HashMap<String, Type>,
    include_params: bool,
) -> TypeDecl {
    let params = if include_params {
        HashSet::new()
    } else {
        decl.params.iter().cloned().collect()
    };
    let mut substituter = TypeVarSubstituter { map, params };
    substituter.fold_decl(decl)
}
