//! Surface model handed to the runtime: terms, patterns, types, and the
//! references that name definitions.

pub mod display;
pub mod print_env;
pub mod reference;
pub mod term;
pub mod types;

pub use print_env::PrintEnv;
pub use reference::{Hash, LabeledDependency, Reference};
pub use term::{Literal, MatchCase, Pattern, Term};
pub use types::{ConstructorDecl, DeclKind, Type, TypeDecl};
