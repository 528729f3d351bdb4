pub mod dependencies;
pub mod fold;
pub mod rename;
pub mod visit;

pub use dependencies::{decl_dependencies, term_dependencies};
pub use fold::{Folder, fold_case, fold_decl, fold_pattern, fold_term, fold_type};
pub use rename::{canonicalize, canonicalize_decl, substitute, substitute_type_vars};
pub use visit::{Visitor, walk_case, walk_decl, walk_pattern, walk_term, walk_type};
