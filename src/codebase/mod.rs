//! Definition store consulted by the runtime, plus the content hashing that
//! assigns derived references.

pub mod hash;
pub mod store;

pub use hash::{hash_decl, hash_decl_cycle, hash_term, hash_term_cycle};
pub use store::{CodeLookup, Codebase};
