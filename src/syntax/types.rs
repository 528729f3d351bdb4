use serde::{Deserialize, Serialize};

use crate::syntax::reference::Reference;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Ref(Reference),
    Var(String),
    Apply {
        func: Box<Type>,
        args: Vec<Type>,
    },
    /// `input ->{abilities} output`
    Arrow {
        input: Box<Type>,
        abilities: Vec<Type>,
        output: Box<Type>,
    },
}

impl Type {
    pub fn builtin(name: &str) -> Self {
        Type::Ref(Reference::builtin(name))
    }

    pub fn arrow(input: Type, output: Type) -> Self {
        Type::Arrow {
            input: Box::new(input),
            abilities: Vec::new(),
            output: Box::new(output),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Data,
    Ability,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstructorDecl {
    pub name: String,
    pub fields: Vec<Type>,
}

/// A data or ability declaration. Constructors (or operations) are numbered
/// by their position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDecl {
    pub kind: DeclKind,
    pub params: Vec<String>,
    pub constructors: Vec<ConstructorDecl>,
}

impl TypeDecl {
    pub fn data(constructors: Vec<ConstructorDecl>) -> Self {
        Self {
            kind: DeclKind::Data,
            params: Vec::new(),
            constructors,
        }
    }

    pub fn ability(operations: Vec<ConstructorDecl>) -> Self {
        Self {
            kind: DeclKind::Ability,
            params: Vec::new(),
            constructors: operations,
        }
    }

    pub fn with_params<S: Into<String>>(mut self, params: impl IntoIterator<Item = S>) -> Self {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn constructor_name(&self, tag: u32) -> Option<&str> {
        self.constructors
            .get(tag as usize)
            .map(|ctor| ctor.name.as_str())
    }
}

impl ConstructorDecl {
    pub fn new(name: impl Into<String>, fields: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}
