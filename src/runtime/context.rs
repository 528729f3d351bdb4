use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    rc::Rc,
};

use crate::bytecode::combinator::CombinatorSet;
use crate::runtime::{
    error::{LoadError, Namespace},
    numbering::{RefNumbering, Word},
};
use crate::syntax::{
    reference::Reference,
    term::Term,
    types::{DeclKind, TypeDecl},
};

/// Argument counts of a type's constructors, as saturation needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructorArity {
    /// Data type with a single constructor of `fields` arguments.
    Record { fields: usize },
    /// Data type with any other number of constructors.
    Sum(Vec<usize>),
    /// Ability declaration; one entry per operation.
    Ability(Vec<usize>),
}

impl ConstructorArity {
    pub fn of(decl: &TypeDecl) -> Self {
        let counts: Vec<usize> = decl.constructors.iter().map(|c| c.fields.len()).collect();
        match decl.kind {
            DeclKind::Ability => ConstructorArity::Ability(counts),
            DeclKind::Data if counts.len() == 1 => ConstructorArity::Record { fields: counts[0] },
            DeclKind::Data => ConstructorArity::Sum(counts),
        }
    }

    pub fn arity(&self, tag: u32) -> Option<usize> {
        match self {
            ConstructorArity::Record { fields } => (tag == 0).then_some(*fields),
            ConstructorArity::Sum(counts) | ConstructorArity::Ability(counts) => {
                counts.get(tag as usize).copied()
            }
        }
    }

    pub fn is_ability(&self) -> bool {
        matches!(self, ConstructorArity::Ability(_))
    }
}

/// Everything a runtime session has loaded and compiled so far.
///
/// The context only ever grows. Ids handed out by the numbering tables stay
/// valid for the session, and every id with combinators also has an AST and
/// a backreference.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalContext {
    pub(crate) terms: RefNumbering,
    pub(crate) types: RefNumbering,
    pub(crate) combinators: HashMap<Word, Rc<CombinatorSet>>,
    pub(crate) term_asts: HashMap<Word, Rc<Term>>,
    pub(crate) comb_refs: BTreeMap<Word, Reference>,
    pub(crate) arities: HashMap<Reference, ConstructorArity>,
    pub(crate) decls: HashMap<Reference, TypeDecl>,
    pub(crate) intermediate: BTreeSet<Word>,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalContext {
    /// An empty context. Sessions start from [`crate::runtime::builtins::base_context`].
    pub fn new() -> Self {
        Self {
            terms: RefNumbering::new(Namespace::Term),
            types: RefNumbering::new(Namespace::Type),
            combinators: HashMap::new(),
            term_asts: HashMap::new(),
            comb_refs: BTreeMap::new(),
            arities: HashMap::new(),
            decls: HashMap::new(),
            intermediate: BTreeSet::new(),
        }
    }

    pub fn terms(&self) -> &RefNumbering {
        &self.terms
    }

    pub fn types(&self) -> &RefNumbering {
        &self.types
    }

    pub fn term_id(&self, reference: &Reference) -> Option<Word> {
        self.terms.get(reference)
    }

    pub fn type_id(&self, reference: &Reference) -> Option<Word> {
        self.types.get(reference)
    }

    pub fn combinators(&self) -> &HashMap<Word, Rc<CombinatorSet>> {
        &self.combinators
    }

    pub fn combinator_set(&self, id: Word) -> Option<&Rc<CombinatorSet>> {
        self.combinators.get(&id)
    }

    pub fn is_compiled(&self, id: Word) -> bool {
        self.combinators.contains_key(&id)
    }

    pub fn term_ast(&self, id: Word) -> Option<&Rc<Term>> {
        self.term_asts.get(&id)
    }

    pub fn backrefs(&self) -> &BTreeMap<Word, Reference> {
        &self.comb_refs
    }

    pub fn arities(&self) -> &HashMap<Reference, ConstructorArity> {
        &self.arities
    }

    pub fn arity_of(&self, type_ref: &Reference) -> Result<&ConstructorArity, LoadError> {
        self.arities
            .get(type_ref)
            .ok_or_else(|| LoadError::MissingArity(type_ref.clone()))
    }

    /// Argument count of one constructor or operation.
    pub fn constructor_arity(&self, type_ref: &Reference, tag: u32) -> Result<usize, LoadError> {
        self.arity_of(type_ref)?
            .arity(tag)
            .ok_or_else(|| LoadError::UnknownConstructor {
                type_ref: type_ref.clone(),
                tag,
            })
    }

    pub fn decl(&self, type_ref: &Reference) -> Option<&TypeDecl> {
        self.decls.get(type_ref)
    }

    /// Whether `id` was synthesized by the runtime rather than loaded from
    /// the store.
    pub fn is_intermediate(&self, id: Word) -> bool {
        self.intermediate.contains(&id)
    }

    /// Records a type's declaration and numbering. Returns the type id.
    pub(crate) fn register_type(&mut self, reference: &Reference, decl: TypeDecl) -> Word {
        let id = self.types.allocate(reference);
        self.arities
            .insert(reference.clone(), ConstructorArity::of(&decl));
        self.decls.insert(reference.clone(), decl);
        id
    }

    /// Allocates a term id and remembers its AST. Compilation happens later.
    pub(crate) fn allocate_term(&mut self, reference: &Reference, term: Rc<Term>) -> Word {
        let id = self.terms.allocate(reference);
        self.term_asts.insert(id, term);
        self.comb_refs.insert(id, reference.clone());
        id
    }

    pub(crate) fn install(&mut self, id: Word, set: CombinatorSet) {
        self.combinators.insert(id, Rc::new(set));
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            terms: self.terms.len(),
            types: self.types.len(),
        }
    }

    /// Undoes everything recorded since `checkpoint`.
    ///
    /// Loading only ever adds entries keyed by fresh ids and fresh type
    /// references, so dropping those restores the earlier context exactly.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        for (_, reference) in self.types.truncate(checkpoint.types) {
            self.arities.remove(&reference);
            self.decls.remove(&reference);
        }
        for (id, _) in self.terms.truncate(checkpoint.terms) {
            self.combinators.remove(&id);
            self.term_asts.remove(&id);
            self.comb_refs.remove(&id);
            self.intermediate.remove(&id);
        }
    }
}

/// Arena sizes of an [`EvalContext`] at the start of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    terms: usize,
    types: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::types::{ConstructorDecl, Type};

    fn ctor(fields: usize) -> ConstructorDecl {
        ConstructorDecl::new("C", vec![Type::builtin("Int"); fields])
    }

    #[test]
    fn arity_shapes_follow_declaration_kind() {
        assert_eq!(
            ConstructorArity::of(&TypeDecl::data(vec![ctor(2)])),
            ConstructorArity::Record { fields: 2 }
        );
        assert_eq!(
            ConstructorArity::of(&TypeDecl::data(vec![ctor(0), ctor(1)])),
            ConstructorArity::Sum(vec![0, 1])
        );
        assert_eq!(
            ConstructorArity::of(&TypeDecl::ability(vec![ctor(1)])),
            ConstructorArity::Ability(vec![1])
        );
    }

    #[test]
    fn constructor_arity_reports_missing_types_and_tags() {
        let mut ctx = EvalContext::new();
        let nat = Reference::builtin("Nat");
        assert_eq!(
            ctx.constructor_arity(&nat, 0),
            Err(LoadError::MissingArity(nat.clone()))
        );

        ctx.register_type(&nat, TypeDecl::data(vec![ctor(0), ctor(1)]));
        assert_eq!(ctx.constructor_arity(&nat, 1), Ok(1));
        assert_eq!(
            ctx.constructor_arity(&nat, 2),
            Err(LoadError::UnknownConstructor {
                type_ref: nat,
                tag: 2,
            })
        );
    }

    #[test]
    fn rollback_forgets_everything_after_the_checkpoint() {
        let mut ctx = EvalContext::new();
        let nat = Reference::builtin("Nat");
        ctx.register_type(&nat, TypeDecl::data(vec![ctor(0), ctor(1)]));
        let kept = Reference::builtin("kept");
        ctx.allocate_term(&kept, Rc::new(Term::int(1)));
        let before = ctx.clone();

        let checkpoint = ctx.checkpoint();
        let pair = Reference::builtin("Pair");
        ctx.register_type(&pair, TypeDecl::data(vec![ctor(2)]));
        let added = Reference::builtin("added");
        let id = ctx.allocate_term(&added, Rc::new(Term::int(2)));
        ctx.intermediate.insert(id);
        ctx.install(id, CombinatorSet::new(Vec::new()));
        ctx.rollback(checkpoint);

        assert_eq!(ctx, before);
        assert_eq!(ctx.term_id(&added), None);
        assert_eq!(ctx.type_id(&pair), None);
        assert_eq!(ctx.terms().next_id(), id);
    }
}
