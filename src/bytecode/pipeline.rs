use std::{collections::HashMap, rc::Rc};

use tracing::debug;

use crate::ast::substitute;
use crate::bytecode::{
    anf::normalize, combinator::CombinatorSet, emit::emit, lambda_lift::lambda_lift,
    pattern_split::split_patterns, saturate::saturate,
};
use crate::codebase::hash::{hash_term, hash_term_cycle};
use crate::runtime::{context::EvalContext, error::LoadError, numbering::Word};
use crate::syntax::{reference::Reference, term::Term};

/// Runs the stages on one term without touching the context.
///
/// Every type the term constructs or matches on must already have an arity
/// entry, and every reference it mentions an id.
pub fn compile_combinators(
    ctx: &EvalContext,
    id: Word,
    term: &Term,
) -> Result<CombinatorSet, LoadError> {
    let saturated = saturate(ctx.arities(), term.clone())?;
    let core = split_patterns(ctx.arities(), &saturated)?;
    let lifted = lambda_lift(core)?;
    let normal = normalize(lifted)?;
    emit(ctx.terms(), ctx.types(), id, normal)
}

/// Compiles `term` and installs the result under `id`.
pub fn compile(ctx: &mut EvalContext, id: Word, term: &Term) -> Result<(), LoadError> {
    let set = compile_combinators(ctx, id, term)?;
    debug!(id, combinators = set.len(), "compiled term");
    ctx.install(id, set);
    Ok(())
}

/// Gives an evaluation request an identity and compiles it, returning the
/// id to run.
///
/// The identity is the content hash of the term, so repeating a request
/// reuses the compiled code. A top-level `letrec` is split into its members,
/// hashed as one cycle, and the body becomes the entry point.
pub fn compile_request(ctx: &mut EvalContext, term: Term) -> Result<Word, LoadError> {
    let (members, entry) = match term {
        Term::LetRec { bindings, body } => {
            let references = hash_term_cycle(&bindings);
            let map: HashMap<String, Term> = bindings
                .iter()
                .zip(&references)
                .map(|((name, _), reference)| (name.clone(), Term::Ref(reference.clone())))
                .collect();
            let members: Vec<(Reference, Term)> = references
                .into_iter()
                .zip(bindings)
                .map(|(reference, (_, value))| (reference, substitute(value, &map)))
                .collect();
            (members, substitute(*body, &map))
        }
        other => (Vec::new(), other),
    };
    let entry_ref = Reference::derived(hash_term(&entry));

    let mut fresh = Vec::new();
    for (reference, term) in members.into_iter().chain([(entry_ref.clone(), entry)]) {
        if ctx.term_id(&reference).is_some() {
            continue;
        }
        let term = Rc::new(term);
        let id = ctx.allocate_term(&reference, term.clone());
        ctx.intermediate.insert(id);
        fresh.push((id, term));
    }
    for (id, term) in &fresh {
        compile(ctx, *id, term)?;
    }

    let entry = ctx.terms.id(&entry_ref)?;
    debug!(entry, reference = %entry_ref, compiled = fresh.len(), "request ready");
    Ok(entry)
}
