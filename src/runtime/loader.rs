//! Extends an evaluation context with a dependency closure.
//!
//! Loading runs in three phases: register every new type (with its
//! constructor arities), allocate every new term, then compile the new terms.
//! The phases are states of [`Batch`], so a term can only be compiled once
//! the whole batch's types are in place.

use std::{marker::PhantomData, rc::Rc};

use tracing::{debug, info};

use crate::bytecode::pipeline;
use crate::codebase::CodeLookup;
use crate::runtime::{
    context::EvalContext,
    dependency_closure::Closure,
    error::{LoadError, Namespace},
    numbering::Word,
};
use crate::syntax::{reference::Reference, term::Term};

pub struct Discovered;
pub struct TypesLoaded;
pub struct TermsAllocated;

/// A closure on its way into the context.
pub struct Batch<Phase> {
    types: Vec<Reference>,
    terms: Vec<Reference>,
    allocated: Vec<(Word, Rc<Term>)>,
    loaded_types: usize,
    _phase: PhantomData<Phase>,
}

impl<Phase> Batch<Phase> {
    fn advance<Next>(self) -> Batch<Next> {
        Batch {
            types: self.types,
            terms: self.terms,
            allocated: self.allocated,
            loaded_types: self.loaded_types,
            _phase: PhantomData,
        }
    }
}

impl Batch<Discovered> {
    pub fn new(closure: Closure) -> Self {
        Batch {
            types: closure.types.into_iter().collect(),
            terms: closure.terms.into_iter().collect(),
            allocated: Vec::new(),
            loaded_types: 0,
            _phase: PhantomData,
        }
    }

    /// Registers every type the context lacks. Nothing is compiled.
    pub fn load_types(
        mut self,
        ctx: &mut EvalContext,
        store: &dyn CodeLookup,
    ) -> Result<Batch<TypesLoaded>, LoadError> {
        for reference in &self.types {
            if ctx.arities.contains_key(reference) && ctx.types.contains(reference) {
                continue;
            }
            if reference.is_builtin() {
                return Err(LoadError::UnknownReference {
                    namespace: Namespace::Type,
                    reference: reference.clone(),
                });
            }
            let decl = store
                .lookup_type_decl(reference)
                .ok_or_else(|| LoadError::MissingType(reference.clone()))?;
            let id = ctx.register_type(reference, decl);
            debug!(id, reference = %reference, "allocated type");
            self.loaded_types += 1;
        }
        Ok(self.advance())
    }
}

impl Batch<TypesLoaded> {
    /// Allocates ids for every term the context lacks, without compiling.
    pub fn allocate_terms(
        mut self,
        ctx: &mut EvalContext,
        store: &dyn CodeLookup,
    ) -> Result<Batch<TermsAllocated>, LoadError> {
        for reference in &self.terms {
            if ctx.terms.contains(reference) {
                continue;
            }
            if reference.is_builtin() {
                return Err(LoadError::UnknownReference {
                    namespace: Namespace::Term,
                    reference: reference.clone(),
                });
            }
            let term = store
                .lookup_term(reference)
                .ok_or_else(|| LoadError::MissingTerm(reference.clone()))?;
            let term = Rc::new(term);
            let id = ctx.allocate_term(reference, term.clone());
            debug!(id, reference = %reference, "allocated term");
            self.allocated.push((id, term));
        }
        Ok(self.advance())
    }
}

impl Batch<TermsAllocated> {
    /// Compiles every term allocated by this batch. Returns their ids.
    pub fn compile(self, ctx: &mut EvalContext) -> Result<Vec<Word>, LoadError> {
        for (id, term) in &self.allocated {
            pipeline::compile(ctx, *id, term)?;
        }
        info!(
            types = self.loaded_types,
            terms = self.allocated.len(),
            "loaded dependencies"
        );
        Ok(self.allocated.into_iter().map(|(id, _)| id).collect())
    }
}

/// Runs all three phases. Returns the ids of the newly compiled terms.
pub fn load(
    ctx: &mut EvalContext,
    store: &dyn CodeLookup,
    closure: Closure,
) -> Result<Vec<Word>, LoadError> {
    Batch::new(closure)
        .load_types(ctx, store)?
        .allocate_terms(ctx, store)?
        .compile(ctx)
}
