use std::collections::BTreeSet;

use crate::ast::visit::Visitor;
use crate::syntax::{
    reference::{LabeledDependency, Reference},
    term::Term,
    types::TypeDecl,
};

/// Collects the references a term or declaration mentions.
#[derive(Default)]
struct DependencyCollector {
    deps: BTreeSet<LabeledDependency>,
}

impl<'ast> Visitor<'ast> for DependencyCollector {
    fn visit_term_ref(&mut self, reference: &'ast Reference) {
        self.deps.insert(LabeledDependency::Term(reference.clone()));
    }

    fn visit_type_ref(&mut self, reference: &'ast Reference) {
        self.deps.insert(LabeledDependency::Type(reference.clone()));
    }
}

/// Immediate labeled dependencies of a term.
pub fn term_dependencies(term: &Term) -> BTreeSet<LabeledDependency> {
    let mut collector = DependencyCollector::default();
    collector.visit_term(term);
    collector.deps
}

/// Types mentioned by the constructor fields of a declaration.
pub fn decl_dependencies(decl: &TypeDecl) -> BTreeSet<LabeledDependency> {
    let mut collector = DependencyCollector::default();
    collector.visit_decl(decl);
    collector.deps
}
