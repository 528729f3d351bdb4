use std::collections::HashMap;

use crate::runtime::error::{LoadError, Namespace};
use crate::syntax::reference::Reference;

/// Dense session-local identity of a definition.
pub type Word = u64;

/// Bidirectional numbering of references within one namespace.
///
/// Ids index an append-only arena, so the next free id is always the arena
/// length. Only a failed load ever shortens it, and ids it hands back were
/// never seen outside that load.
#[derive(Debug, Clone, PartialEq)]
pub struct RefNumbering {
    namespace: Namespace,
    refs: Vec<Reference>,
    ids: HashMap<Reference, Word>,
}

impl RefNumbering {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            refs: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Returns the id of `reference`, reserving the next free one first if
    /// the reference has not been seen.
    pub fn allocate(&mut self, reference: &Reference) -> Word {
        if let Some(&id) = self.ids.get(reference) {
            return id;
        }
        let id = self.refs.len() as Word;
        self.refs.push(reference.clone());
        self.ids.insert(reference.clone(), id);
        id
    }

    pub fn get(&self, reference: &Reference) -> Option<Word> {
        self.ids.get(reference).copied()
    }

    pub fn id(&self, reference: &Reference) -> Result<Word, LoadError> {
        self.get(reference).ok_or_else(|| LoadError::UnknownReference {
            namespace: self.namespace,
            reference: reference.clone(),
        })
    }

    pub fn reference(&self, id: Word) -> Result<&Reference, LoadError> {
        self.refs.get(id as usize).ok_or(LoadError::UnknownId {
            namespace: self.namespace,
            id,
        })
    }

    pub fn contains(&self, reference: &Reference) -> bool {
        self.ids.contains_key(reference)
    }

    pub fn next_id(&self) -> Word {
        self.refs.len() as Word
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Word, &Reference)> {
        self.refs.iter().enumerate().map(|(i, r)| (i as Word, r))
    }

    /// Forgets every id from `len` on and returns the dropped entries.
    pub(crate) fn truncate(&mut self, len: usize) -> Vec<(Word, Reference)> {
        let start = len.min(self.refs.len());
        let dropped: Vec<(Word, Reference)> = self
            .refs
            .drain(start..)
            .enumerate()
            .map(|(i, reference)| ((start + i) as Word, reference))
            .collect();
        for (_, reference) in &dropped {
            self.ids.remove(reference);
        }
        dropped
    }
}
