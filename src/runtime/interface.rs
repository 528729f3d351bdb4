use std::{
    any::Any,
    cell::OnceCell,
    collections::BTreeSet,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
};

use tracing::{debug, info, warn};

use crate::bytecode::pipeline;
use crate::codebase::CodeLookup;
use crate::primop::ForeignTable;
use crate::runtime::{
    builtins::{base_context, UNIT},
    config::RuntimeConfig,
    context::EvalContext,
    decompile::decompile,
    dependency_closure::{term_closure, CachedSource},
    error::{EvalError, Fault, LoadError},
    loader,
    numbering::Word,
    value::Value,
    vm::Machine,
};
use crate::syntax::{print_env::PrintEnv, term::Term, types::Type};

/// A runtime session: the evaluation context plus the machine settings every
/// request runs with.
///
/// The context only grows. Each request loads whatever the term needs that
/// is not loaded yet, so repeated requests reuse earlier compilations.
pub struct Runtime {
    ctx: EvalContext,
    config: RuntimeConfig,
    foreign: ForeignTable,
}

impl Runtime {
    /// Starts a session on the base context, configured from the environment.
    pub fn start() -> Self {
        Self::with_config(RuntimeConfig::from_env())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let ctx = base_context();
        info!(
            terms = ctx.terms().len(),
            types = ctx.types().len(),
            "runtime started"
        );
        Self {
            ctx,
            config,
            foreign: ForeignTable::builtin(),
        }
    }

    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Type a program's `main` must have: `Unit -> Unit`.
    pub fn main_type() -> Type {
        Type::arrow(Type::builtin(UNIT), Type::builtin(UNIT))
    }

    /// Programs run in-process with no sandbox.
    pub fn needs_containment(&self) -> bool {
        false
    }

    /// Evaluates `term`, loading and compiling its dependencies from `store`
    /// first.
    ///
    /// A fatal error while loading rolls the context back to where the
    /// request started. Faults raised while running are reported with their payload
    /// decompiled and named through `print_env`.
    pub fn evaluate(
        &mut self,
        store: &dyn CodeLookup,
        print_env: &PrintEnv,
        term: &Term,
    ) -> Result<Term, EvalError> {
        let checkpoint = self.ctx.checkpoint();
        let entry = match prepare(&mut self.ctx, store, term) {
            Ok(entry) => entry,
            Err(err) => {
                self.ctx.rollback(checkpoint);
                return Err(err.into());
            }
        };
        self.run(entry, print_env)
    }

    pub fn terminate(self) {
        info!(
            terms = self.ctx.terms().len(),
            types = self.ctx.types().len(),
            compiled = self.ctx.combinators().len(),
            "runtime terminated"
        );
    }

    fn run(&self, entry: Word, print_env: &PrintEnv) -> Result<Term, EvalError> {
        let cell = OnceCell::new();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut machine = Machine::new(
                self.ctx.combinators(),
                &self.foreign,
                self.ctx.backrefs(),
                &self.config,
            );
            let result = machine.run(entry, |value| {
                let _ = cell.set(value);
            });
            debug!(entry, steps = machine.steps(), "machine stopped");
            result
        }));

        match outcome {
            Err(payload) => {
                let message = panic_message(payload);
                warn!(entry, message = %message, "evaluation panicked");
                Err(EvalError::Host(message))
            }
            Ok(Err(fault)) => Err(self.report(fault, print_env)),
            Ok(Ok(())) => {
                let value = cell.into_inner().ok_or(EvalError::Unresolved)?;
                decompile(&self.ctx, &value).ok_or_else(|| EvalError::Undecompilable(value.to_string()))
            }
        }
    }

    fn report(&self, fault: Fault, print_env: &PrintEnv) -> EvalError {
        let payload = match &fault {
            Fault::Bug(value) => Some(("bug", value.clone())),
            Fault::UnhandledRequest { ability, tag, args } => Some((
                "unhandled request",
                Value::Request {
                    ability: *ability,
                    tag: *tag,
                    args: Rc::from(args.as_slice()),
                    continuation: Rc::from(Vec::new()),
                },
            )),
            _ => None,
        };
        let Some((label, value)) = payload else {
            debug!(fault = %fault, "evaluation faulted");
            return EvalError::Fault {
                message: fault.to_string(),
                value: None,
            };
        };

        let term = decompile(&self.ctx, &value);
        let shown = match &term {
            Some(term) => term.display_with(&self.names(print_env)),
            None => value.to_string(),
        };
        debug!(fault = label, value = %shown, "evaluation faulted");
        EvalError::Fault {
            message: format!("{}: {}", label, shown),
            value: term,
        }
    }

    /// `print_env` extended with the constructor names of every loaded
    /// declaration.
    fn names(&self, print_env: &PrintEnv) -> PrintEnv {
        let mut env = print_env.clone();
        for (reference, decl) in &self.ctx.decls {
            for (tag, ctor) in decl.constructors.iter().enumerate() {
                env = env.or_constructor(reference, tag as u32, &ctor.name);
            }
        }
        env
    }
}

/// Loads everything `term` needs into `ctx` and compiles the request itself.
fn prepare(ctx: &mut EvalContext, store: &dyn CodeLookup, term: &Term) -> Result<Word, LoadError> {
    let closure = {
        let source = CachedSource::new(ctx, store);
        term_closure(&source, term, &mut BTreeSet::new())?
    };
    debug!(dependencies = closure.len(), "resolved dependency closure");
    loader::load(ctx, store, closure)?;
    pipeline::compile_request(ctx, term.clone())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
