//! Structural content hashing of terms and declarations.
//!
//! A definition is hashed by canonicalizing its local binders, encoding the
//! result with `serde_json`, and digesting the bytes with SHA-256. Two
//! definitions with the same hash are the same definition as far as the
//! runtime is concerned.

use std::collections::HashMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ast::{canonicalize, canonicalize_decl, substitute, substitute_type_vars};
use crate::syntax::{
    reference::{Hash, Reference},
    term::Term,
    types::{Type, TypeDecl},
};

const TERM_TAG: &[u8] = b"cairn.term.1";
const DECL_TAG: &[u8] = b"cairn.decl.1";
const TERM_CYCLE_TAG: &[u8] = b"cairn.term-cycle.1";
const DECL_CYCLE_TAG: &[u8] = b"cairn.decl-cycle.1";

/// Placeholder for a cycle member while its position is still unknown.
const CYCLE_MEMBER: &str = "%cycle";

pub fn hash_bytes(tag: &[u8], bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(bytes);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    Hash(out)
}

fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    // Surface nodes have no non-string map keys or non-finite floats, so
    // encoding cannot fail.
    serde_json::to_vec(value).expect("surface nodes always encode")
}

pub fn hash_term(term: &Term) -> Hash {
    hash_bytes(TERM_TAG, &encode(&canonicalize(term.clone())))
}

pub fn hash_decl(decl: &TypeDecl) -> Hash {
    hash_bytes(DECL_TAG, &encode(&canonicalize_decl(decl.clone())))
}

/// References for a group of mutually recursive term bindings.
///
/// Members refer to each other through free variables named after the
/// bindings. The result is independent of binding order, except when two
/// members are identical up to the names of their siblings; those are
/// ordered as given.
pub fn hash_term_cycle(bindings: &[(String, Term)]) -> Vec<Reference> {
    let placeholder: HashMap<String, Term> = bindings
        .iter()
        .map(|(name, _)| (name.clone(), Term::Var(CYCLE_MEMBER.to_string())))
        .collect();
    let keys: Vec<Hash> = bindings
        .iter()
        .map(|(_, term)| hash_term(&substitute(term.clone(), &placeholder)))
        .collect();
    let positions = cycle_positions(&keys);

    let numbered: HashMap<String, Term> = bindings
        .iter()
        .zip(&positions)
        .map(|((name, _), pos)| (name.clone(), Term::Var(format!("{}{}", CYCLE_MEMBER, pos))))
        .collect();
    let mut members: Vec<(u64, Term)> = bindings
        .iter()
        .zip(&positions)
        .map(|((_, term), pos)| (*pos, canonicalize(substitute(term.clone(), &numbered))))
        .collect();
    members.sort_by_key(|(pos, _)| *pos);
    let members: Vec<Term> = members.into_iter().map(|(_, term)| term).collect();

    let hash = hash_bytes(TERM_CYCLE_TAG, &encode(&members));
    cycle_references(hash, &positions)
}

/// References for a group of mutually recursive declarations. Members refer
/// to each other through type variables named after the group members.
pub fn hash_decl_cycle(decls: &[(String, TypeDecl)]) -> Vec<Reference> {
    let placeholder: HashMap<String, Type> = decls
        .iter()
        .map(|(name, _)| (name.clone(), Type::Var(CYCLE_MEMBER.to_string())))
        .collect();
    let keys: Vec<Hash> = decls
        .iter()
        .map(|(_, decl)| hash_decl(&substitute_type_vars(decl.clone(), &placeholder, false)))
        .collect();
    let positions = cycle_positions(&keys);

    let numbered: HashMap<String, Type> = decls
        .iter()
        .zip(&positions)
        .map(|((name, _), pos)| (name.clone(), Type::Var(format!("{}{}", CYCLE_MEMBER, pos))))
        .collect();
    let mut members: Vec<(u64, TypeDecl)> = decls
        .iter()
        .zip(&positions)
        .map(|((_, decl), pos)| {
            let decl = substitute_type_vars(decl.clone(), &numbered, false);
            (*pos, canonicalize_decl(decl))
        })
        .collect();
    members.sort_by_key(|(pos, _)| *pos);
    let members: Vec<TypeDecl> = members.into_iter().map(|(_, decl)| decl).collect();

    let hash = hash_bytes(DECL_CYCLE_TAG, &encode(&members));
    cycle_references(hash, &positions)
}

/// Position of every member once the group is sorted by member key.
fn cycle_positions(keys: &[Hash]) -> Vec<u64> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by_key(|&i| (keys[i], i));
    let mut positions = vec![0u64; keys.len()];
    for (pos, &member) in order.iter().enumerate() {
        positions[member] = pos as u64;
    }
    positions
}

fn cycle_references(hash: Hash, positions: &[u64]) -> Vec<Reference> {
    let size = positions.len() as u64;
    positions
        .iter()
        .map(|&index| Reference::Derived { hash, index, size })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn even_odd() -> Vec<(String, Term)> {
        let even = Term::lambda(
            ["n"],
            Term::if_then_else(
                Term::call2("Int.==", Term::var("n"), Term::int(0)),
                Term::boolean(true),
                Term::apply(Term::var("odd"), [Term::call2("Int.-", Term::var("n"), Term::int(1))]),
            ),
        );
        let odd = Term::lambda(
            ["n"],
            Term::if_then_else(
                Term::call2("Int.==", Term::var("n"), Term::int(0)),
                Term::boolean(false),
                Term::apply(Term::var("even"), [Term::call2("Int.-", Term::var("n"), Term::int(1))]),
            ),
        );
        vec![("even".to_string(), even), ("odd".to_string(), odd)]
    }

    #[test]
    fn term_hash_ignores_binder_names() {
        let a = Term::lambda(["x"], Term::var("x"));
        let b = Term::lambda(["y"], Term::var("y"));
        assert_eq!(hash_term(&a), hash_term(&b));
        assert_ne!(hash_term(&a), hash_term(&Term::int(1)));
    }

    #[test]
    fn cycle_hash_is_independent_of_binding_order() {
        let forward = even_odd();
        let mut backward = even_odd();
        backward.reverse();

        let refs_forward = hash_term_cycle(&forward);
        let refs_backward = hash_term_cycle(&backward);

        assert_eq!(refs_forward[0], refs_backward[1]);
        assert_eq!(refs_forward[1], refs_backward[0]);
        assert_ne!(refs_forward[0], refs_forward[1]);
    }

    #[test]
    fn cycle_hash_ignores_member_names() {
        let renamed: Vec<(String, Term)> = even_odd()
            .into_iter()
            .map(|(name, term)| {
                let map: HashMap<String, Term> = [
                    ("even".to_string(), Term::var("isEven")),
                    ("odd".to_string(), Term::var("isOdd")),
                ]
                .into_iter()
                .collect();
                (format!("is_{}", name), substitute(term, &map))
            })
            .collect();
        let renamed: Vec<(String, Term)> = renamed
            .into_iter()
            .map(|(name, term)| {
                let name = if name == "is_even" { "isEven" } else { "isOdd" };
                (name.to_string(), term)
            })
            .collect();

        assert_eq!(hash_term_cycle(&even_odd()), hash_term_cycle(&renamed));
    }
}
