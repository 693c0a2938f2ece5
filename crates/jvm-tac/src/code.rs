//! The resolved method body this crate's analyses consume: a pc-indexed
//! instruction array, an exception handler table, and enough bookkeeping to
//! look up "the next instruction after pc" without re-decoding anything.
//!
//! Modeled on the shape of a parsed `Code` attribute: instructions, exception
//! table, and optional line numbers, the same bundle a bytecode reader's
//! resolved method body carries.

use std::fmt;

use ahash::AHashMap;

use crate::inst::Instruction;
use crate::pc::Pc;
use crate::types::ClassName;

/// One entry of the `exception_table`. `start`/`end` describe a half-open
/// `[start, end)` range of protected pcs; `handler` is the pc of the first
/// instruction of the handler, and `catch_type: None` means "catches
/// everything" (used for `finally` blocks).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExceptionHandler {
    pub start: Pc,
    pub end: Pc,
    pub handler: Pc,
    pub catch_type: Option<ClassName>,
}

impl ExceptionHandler {
    #[must_use]
    pub fn covers(&self, pc: Pc) -> bool {
        self.start <= pc && pc < self.end
    }
}

/// One entry of a `LineNumberTable` attribute: the source line active from
/// `start_pc` until the next entry's `start_pc` (or the end of the method).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LineNumberEntry {
    pub start_pc: Pc,
    pub line: u32,
}

/// Optional debug information mapping pcs to source lines. Entries are
/// assumed sorted by `start_pc`, the order the class-file attribute stores
/// them in; nothing in this crate requires them, but a caller rendering
/// diagnostics against the original source wants them threaded through
/// unchanged from `Code` to `TACode`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LineNumberTable(pub Vec<LineNumberEntry>);

impl LineNumberTable {
    /// The source line active at `pc`: the last entry whose `start_pc` is at
    /// or before `pc`, or `None` if `pc` precedes every entry.
    #[must_use]
    pub fn line_at(&self, pc: Pc) -> Option<u32> {
        self.0.iter().rev().find(|e| e.start_pc <= pc).map(|e| e.line)
    }
}

/// A resolved method body: the instruction stream plus everything needed to
/// reason about its control flow (exception handlers) without touching the
/// original class file.
///
/// Instructions are stored sorted by `pc`; [`Code::next_pc`] and
/// [`Code::instruction_at`] both rely on that ordering.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Code {
    instructions: Vec<Instruction>,
    #[serde(skip)]
    index_by_pc: AHashMap<Pc, usize>,
    pub exception_handlers: Vec<ExceptionHandler>,
    pub max_locals: u16,
    pub max_stack: u16,
    pub line_numbers: Option<LineNumberTable>,
}

impl Code {
    /// Builds a `Code` from a pc-sorted instruction list. Panics if the list
    /// isn't sorted or contains a duplicate pc — those are decoding-layer
    /// bugs, not conditions this crate is meant to recover from. No line
    /// numbers by default; attach them with [`Code::with_line_numbers`].
    #[must_use]
    pub fn new(instructions: Vec<Instruction>, exception_handlers: Vec<ExceptionHandler>, max_locals: u16, max_stack: u16) -> Self {
        let mut index_by_pc = AHashMap::with_capacity_and_hasher(instructions.len(), ahash::RandomState::new());
        let mut prev = None;
        for (i, inst) in instructions.iter().enumerate() {
            if let Some(p) = prev {
                assert!(inst.pc > p, "instructions must be strictly increasing by pc");
            }
            prev = Some(inst.pc);
            index_by_pc.insert(inst.pc, i);
        }
        Self { instructions, index_by_pc, exception_handlers, max_locals, max_stack, line_numbers: None }
    }

    /// Attaches a line-number table, as the reader would when the `Code`
    /// attribute's `LineNumberTable` sub-attribute is present.
    #[must_use]
    pub fn with_line_numbers(mut self, line_numbers: LineNumberTable) -> Self {
        self.line_numbers = Some(line_numbers);
        self
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    #[must_use]
    pub fn instruction_at(&self, pc: Pc) -> Option<&Instruction> {
        self.index_by_pc.get(&pc).map(|&i| &self.instructions[i])
    }

    #[must_use]
    pub fn entry_point(&self) -> Option<Pc> {
        self.instructions.first().map(|i| i.pc)
    }

    /// The pc of the instruction immediately following `pc`'s instruction in
    /// the byte stream, or `None` if `pc` is the last instruction.
    #[must_use]
    pub fn next_pc(&self, pc: Pc) -> Option<Pc> {
        let idx = *self.index_by_pc.get(&pc)?;
        self.instructions.get(idx + 1).map(|i| i.pc)
    }

    /// All handlers whose protected range covers `pc`, in table order (the
    /// order a real JVM tries handlers in — first match wins).
    pub fn handlers_covering(&self, pc: Pc) -> impl Iterator<Item = &ExceptionHandler> {
        self.exception_handlers.iter().filter(move |h| h.covers(pc))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in &self.instructions {
            writeln!(f, "{}: {:?}", inst.pc, inst.kind)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::InstructionKind;

    fn inst(pc: u32, kind: InstructionKind) -> Instruction {
        Instruction { pc: Pc(pc), kind }
    }

    #[test]
    fn next_pc_walks_the_sorted_list() {
        let code = Code::new(
            vec![inst(0, InstructionKind::Nop), inst(1, InstructionKind::Nop), inst(4, InstructionKind::Return(None))],
            vec![],
            0,
            0,
        );
        assert_eq!(code.next_pc(Pc(0)), Some(Pc(1)));
        assert_eq!(code.next_pc(Pc(1)), Some(Pc(4)));
        assert_eq!(code.next_pc(Pc(4)), None);
    }

    #[test]
    fn handler_covers_half_open_range() {
        let handler = ExceptionHandler { start: Pc(0), end: Pc(10), handler: Pc(20), catch_type: None };
        assert!(handler.covers(Pc(0)));
        assert!(handler.covers(Pc(9)));
        assert!(!handler.covers(Pc(10)));
    }

    #[test]
    #[should_panic(expected = "strictly increasing")]
    fn rejects_unsorted_instructions() {
        let _ = Code::new(vec![inst(4, InstructionKind::Nop), inst(0, InstructionKind::Nop)], vec![], 0, 0);
    }

    #[test]
    fn line_number_table_finds_the_covering_entry() {
        let table = LineNumberTable(vec![LineNumberEntry { start_pc: Pc(0), line: 10 }, LineNumberEntry { start_pc: Pc(4), line: 11 }]);
        assert_eq!(table.line_at(Pc(0)), Some(10));
        assert_eq!(table.line_at(Pc(3)), Some(10));
        assert_eq!(table.line_at(Pc(4)), Some(11));
        assert_eq!(table.line_at(Pc(100)), Some(11));
    }

    #[test]
    fn code_carries_an_attached_line_number_table() {
        let code = Code::new(vec![inst(0, InstructionKind::Nop)], vec![], 0, 0)
            .with_line_numbers(LineNumberTable(vec![LineNumberEntry { start_pc: Pc(0), line: 42 }]));
        assert_eq!(code.line_numbers.as_ref().and_then(|t| t.line_at(Pc(0))), Some(42));
    }
}
