//! Evaluation context, incremental loading, and the abstract machine.
//!
//! # No-Cycle Invariant
//! Runtime values are immutable and acyclic. Heap-backed `Value` variants
//! share payloads through `Rc`, so a cycle would leak under reference
//! counting. Closures capture values, and no captured value may reference
//! the closure capturing it. Recursion goes through combinator ids, never
//! through captured values.

pub mod builtins;
pub mod config;
pub mod context;
pub mod decompile;
pub mod dependency_closure;
pub mod error;
pub mod interface;
pub mod loader;
pub mod numbering;
pub mod value;
pub mod vm;


pub use config::RuntimeConfig;
pub use context::{ConstructorArity, EvalContext};
pub use error::{EvalError, Fault, LoadError, Namespace};
pub use interface::Runtime;
pub use numbering::{RefNumbering, Word};
pub use value::Value;
