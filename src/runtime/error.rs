use std::fmt;

use thiserror::Error;

use crate::runtime::{numbering::Word, value::Value};
use crate::syntax::{reference::Reference, term::Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Term,
    Type,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Term => write!(f, "term"),
            Namespace::Type => write!(f, "type"),
        }
    }
}

/// Internal-consistency failures while loading or compiling code.
///
/// These mean the store is incomplete or the runtime has a defect. They end
/// the current operation and are never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("unknown {namespace} reference: {reference}")]
    UnknownReference {
        namespace: Namespace,
        reference: Reference,
    },
    #[error("unknown {namespace} id: {id}")]
    UnknownId { namespace: Namespace, id: Word },
    #[error("term definition missing from the store: {0}")]
    MissingTerm(Reference),
    #[error("type declaration missing from the store: {0}")]
    MissingType(Reference),
    #[error("no constructor arity registered for type {0}")]
    MissingArity(Reference),
    #[error("type {type_ref} has no constructor {tag}")]
    UnknownConstructor { type_ref: Reference, tag: u32 },
    #[error("malformed term: {0}")]
    Malformed(String),
}

/// Failures raised while the machine runs a program.
#[derive(Debug, Clone, Error)]
pub enum Fault {
    #[error("pattern match failure")]
    MatchFailure,
    #[error("bug: {0}")]
    Bug(Value),
    #[error("unhandled request: ability {ability} operation {tag}")]
    UnhandledRequest {
        ability: Word,
        tag: u32,
        args: Vec<Value>,
    },
    #[error("stack overflow: more than {0} frames")]
    StackOverflow(usize),
    #[error("{0}")]
    Runtime(String),
}

/// Outcome of a failed evaluation request.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// The program faulted. `value` holds the decompiled payload, when there
    /// is one and it could be decompiled.
    #[error("{message}")]
    Fault {
        message: String,
        value: Option<Term>,
    },
    /// A panic escaped the machine.
    #[error("host failure during evaluation: {0}")]
    Host(String),
    /// The machine stopped without delivering a result.
    #[error("evaluation finished without a result")]
    Unresolved,
    #[error("result cannot be decompiled: {0}")]
    Undecompilable(String),
    #[error(transparent)]
    Fatal(#[from] LoadError),
}
