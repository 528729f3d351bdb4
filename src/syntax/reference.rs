use std::fmt;

use serde::{Deserialize, Serialize};

/// SHA-256 digest identifying a definition by content.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// First eight hex digits, used when printing references.
    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.short())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Stable identity of a term or type definition.
///
/// Builtins are named and pre-seeded into every runtime session. Derived
/// references come from content hashing; definitions hashed together as one
/// mutually recursive cycle share a hash and are told apart by `index`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Reference {
    Builtin(String),
    Derived { hash: Hash, index: u64, size: u64 },
}

impl Reference {
    pub fn builtin(name: impl Into<String>) -> Self {
        Reference::Builtin(name.into())
    }

    /// Reference to a definition that forms a cycle of its own.
    pub fn derived(hash: Hash) -> Self {
        Reference::Derived {
            hash,
            index: 0,
            size: 1,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Reference::Builtin(_))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Builtin(name) => write!(f, "##{}", name),
            Reference::Derived {
                hash,
                index: _,
                size: 1,
            } => write!(f, "#{}", hash.short()),
            Reference::Derived { hash, index, size } => {
                write!(f, "#{}.{}c{}", hash.short(), index, size)
            }
        }
    }
}

/// A dependency tagged with the namespace it lives in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabeledDependency {
    Type(Reference),
    Term(Reference),
}

impl LabeledDependency {
    pub fn reference(&self) -> &Reference {
        match self {
            LabeledDependency::Type(r) | LabeledDependency::Term(r) => r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_builtin_and_derived_references() {
        let hash = Hash([0xab; 32]);
        assert_eq!(Reference::builtin("Int.+").to_string(), "##Int.+");
        assert_eq!(Reference::derived(hash).to_string(), "#abababab");
        let cycle = Reference::Derived {
            hash,
            index: 1,
            size: 2,
        };
        assert_eq!(cycle.to_string(), "#abababab.1c2");
    }
}
