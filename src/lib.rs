//! Incremental loader and evaluation runtime for a content-addressed
//! functional language with algebraic effects.
//!
//! A [`Runtime`] owns one [`EvalContext`]. Each call to
//! [`Runtime::evaluate`] pulls the transitive dependencies of a term out of a
//! [`CodeLookup`] store, compiles whatever is new into combinators, and runs
//! the term on the abstract machine.

pub mod ast;
pub mod bytecode;
pub mod codebase;
pub mod primop;
pub mod runtime;
pub mod syntax;

pub use codebase::{CodeLookup, Codebase};
pub use runtime::{EvalContext, EvalError, LoadError, Runtime, RuntimeConfig};
pub use syntax::{PrintEnv, Reference, Term};
