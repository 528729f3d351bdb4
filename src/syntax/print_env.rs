use std::collections::HashMap;

use crate::syntax::reference::Reference;

/// Display names for references, used when rendering terms and faults.
///
/// Anything without a registered name falls back to its reference text;
/// builtins fall back to their builtin name.
#[derive(Debug, Clone, Default)]
pub struct PrintEnv {
    terms: HashMap<Reference, String>,
    types: HashMap<Reference, String>,
    constructors: HashMap<(Reference, u32), String>,
}

impl PrintEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_term(mut self, reference: Reference, name: impl Into<String>) -> Self {
        self.terms.insert(reference, name.into());
        self
    }

    pub fn with_type(mut self, reference: Reference, name: impl Into<String>) -> Self {
        self.types.insert(reference, name.into());
        self
    }

    pub fn with_constructor(
        mut self,
        reference: Reference,
        tag: u32,
        name: impl Into<String>,
    ) -> Self {
        self.constructors.insert((reference, tag), name.into());
        self
    }

    /// Names a constructor unless a name is already registered for it.
    pub fn or_constructor(mut self, reference: &Reference, tag: u32, name: &str) -> Self {
        self.constructors
            .entry((reference.clone(), tag))
            .or_insert_with(|| name.to_string());
        self
    }

    pub fn term_name(&self, reference: &Reference) -> String {
        self.terms
            .get(reference)
            .cloned()
            .unwrap_or_else(|| fallback_name(reference))
    }

    pub fn type_name(&self, reference: &Reference) -> String {
        self.types
            .get(reference)
            .cloned()
            .unwrap_or_else(|| fallback_name(reference))
    }

    pub fn constructor_name(&self, reference: &Reference, tag: u32) -> String {
        match self.constructors.get(&(reference.clone(), tag)) {
            Some(name) => name.clone(),
            None => format!("{}#{}", self.type_name(reference), tag),
        }
    }
}

fn fallback_name(reference: &Reference) -> String {
    match reference {
        Reference::Builtin(name) => name.clone(),
        derived => derived.to_string(),
    }
}
