use tracing::trace;

use crate::bytecode::combinator::{CombRef, Section};

use super::Machine;

impl Machine<'_> {
    /// Names a combinator by the reference that owns it, falling back to
    /// its numeric address.
    pub(super) fn describe(&self, comb: CombRef) -> String {
        match self.backrefs.get(&comb.id) {
            Some(reference) if comb.index == 0 => reference.to_string(),
            Some(reference) => format!("{}.{}", reference, comb.index),
            None => comb.to_string(),
        }
    }

    pub(super) fn trace_section(&self, comb: CombRef, code: &Section) {
        trace!(
            step = self.steps,
            depth = self.stack.len(),
            comb = %self.describe(comb),
            section = section_name(code),
            "eval"
        );
    }
}

fn section_name(section: &Section) -> &'static str {
    match section {
        Section::Return(_) => "return",
        Section::Let { .. } => "let",
        Section::Call { .. } => "call",
        Section::Prim { .. } => "prim",
        Section::Construct { .. } => "construct",
        Section::Request { .. } => "request",
        Section::Closure { .. } => "closure",
        Section::Match { .. } => "match",
        Section::Handle { .. } => "handle",
        Section::MatchFail => "match-fail",
    }
}
