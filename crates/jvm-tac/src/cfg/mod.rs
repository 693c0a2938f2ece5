//! Control-flow graph over basic blocks, built from a [`Code`]'s instruction
//! structure restricted to a caller-supplied reachable-pc set — typically
//! the interpreter's own `evaluated` set, so blocks never span instructions
//! the abstract interpretation proved unreachable.
//!
//! Blocks and edges are addressed by `Pc`, never by owning reference —
//! arena plus integer indices throughout, matching the rest of this crate.

pub mod control_dependence;
pub mod dominators;

use ahash::{AHashMap, AHashSet};

use crate::code::Code;
use crate::error::{Error, MethodId};
use crate::pc::{BbId, Pc};

/// A maximal run of instructions with one entry and one exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub id: BbId,
    pub start: Pc,
    pub end: Pc,
    pub is_start_of_subroutine: bool,
    /// Handler entry blocks receive one implicit operand: the caught
    /// throwable.
    pub is_handler_entry: bool,
}

impl BasicBlock {
    #[must_use]
    pub fn contains(&self, pc: Pc) -> bool {
        self.start <= pc && pc <= self.end
    }
}

/// The control-flow graph: basic blocks plus pc-level and block-level
/// successor/predecessor edges.
#[derive(Debug, Clone)]
pub struct Cfg {
    blocks: Vec<BasicBlock>,
    block_of_pc: AHashMap<Pc, BbId>,
    successors: AHashMap<Pc, Vec<Pc>>,
    predecessors: AHashMap<Pc, Vec<Pc>>,
    pub entry: Pc,
}

impl Cfg {
    /// Builds a CFG restricted to `reachable` pcs (pass every instruction's
    /// pc for the BR-based CFG, or the interpreter's `evaluatedInstructions`
    /// for the AI-based one).
    pub fn build(code: &Code, reachable: &AHashSet<Pc>, hierarchy: &dyn crate::hierarchy::ClassHierarchy, config: &crate::config::Configuration) -> Result<Self, Error> {
        let entry = code.entry_point().ok_or_else(|| Error::CFGInconsistency {
            method: placeholder_method(),
            reason: "code has no instructions".to_string(),
        })?;

        let mut successors: AHashMap<Pc, Vec<Pc>> = AHashMap::default();
        let mut predecessors: AHashMap<Pc, Vec<Pc>> = AHashMap::default();
        let mut subroutine_starts: AHashSet<Pc> = AHashSet::default();
        let mut handler_entries: AHashSet<Pc> = AHashSet::default();

        for &pc in reachable {
            let Some(inst) = code.instruction_at(pc) else {
                return Err(Error::CFGInconsistency {
                    method: placeholder_method(),
                    reason: format!("{pc} is reachable but has no instruction"),
                });
            };
            let mut succs: Vec<Pc> = inst.regular_successors(code.next_pc(pc)).into_iter().filter(|s| reachable.contains(s)).collect();

            if matches!(inst.kind, crate::inst::InstructionKind::Jsr { target }  if reachable.contains(&target)) {
                if let crate::inst::InstructionKind::Jsr { target } = inst.kind {
                    subroutine_starts.insert(target);
                }
            }

            if inst.may_raise_vm_exception() || inst.is_athrow() || (config.throw_all_potential_exceptions && inst.may_raise_vm_exception()) {
                for handler in code.handlers_covering(pc) {
                    let applies = match &handler.catch_type {
                        None => true,
                        Some(ty) => hierarchy.is_known(ty) || config.throw_all_potential_exceptions,
                    };
                    if applies && reachable.contains(&handler.handler) {
                        handler_entries.insert(handler.handler);
                        succs.push(handler.handler);
                    }
                }
            }

            succs.sort_unstable();
            succs.dedup();
            for &s in &succs {
                predecessors.entry(s).or_default().push(pc);
            }
            successors.insert(pc, succs);
        }

        for preds in predecessors.values_mut() {
            preds.sort_unstable();
            preds.dedup();
        }

        let blocks = partition_into_blocks(code, reachable, &successors, &predecessors, &subroutine_starts, &handler_entries);
        let mut block_of_pc = AHashMap::default();
        for block in &blocks {
            let mut pc = block.start;
            loop {
                block_of_pc.insert(pc, block.id);
                if pc == block.end {
                    break;
                }
                pc = code.next_pc(pc).expect("block end reached without terminator");
            }
        }

        Ok(Self { blocks, block_of_pc, successors, predecessors, entry })
    }

    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    #[must_use]
    pub fn block_of(&self, pc: Pc) -> Option<&BasicBlock> {
        self.block_of_pc.get(&pc).map(|id| &self.blocks[id.0 as usize])
    }

    #[must_use]
    pub fn successors_of(&self, pc: Pc) -> &[Pc] {
        self.successors.get(&pc).map_or(&[], |v| v.as_slice())
    }

    #[must_use]
    pub fn predecessors_of(&self, pc: Pc) -> &[Pc] {
        self.predecessors.get(&pc).map_or(&[], |v| v.as_slice())
    }

    #[must_use]
    pub fn pcs(&self) -> impl Iterator<Item = Pc> + '_ {
        self.block_of_pc.keys().copied()
    }

    /// Checks that every evaluated pc has a containing basic block and
    /// that predecessor/successor edges agree in both directions; used both
    /// by tests and, when `Configuration::check_invariants` is set, by the
    /// interpreter itself before handing the CFG off to the lifter.
    pub fn check_invariants(&self, evaluated: &AHashSet<Pc>) -> Result<(), Error> {
        for &pc in evaluated {
            let Some(block) = self.block_of(pc) else {
                return Err(Error::CFGInconsistency { method: placeholder_method(), reason: format!("{pc} has no basic block") });
            };
            if !block.contains(pc) {
                return Err(Error::CFGInconsistency { method: placeholder_method(), reason: format!("{pc} falls outside its own block's range") });
            }
        }
        for &pc in evaluated {
            for &succ in self.successors_of(pc) {
                if !self.predecessors_of(succ).contains(&pc) {
                    return Err(Error::CFGInconsistency {
                        method: placeholder_method(),
                        reason: format!("{pc} -> {succ} missing from predecessors"),
                    });
                }
            }
            for &pred in self.predecessors_of(pc) {
                if !self.successors_of(pred).contains(&pc) {
                    return Err(Error::CFGInconsistency {
                        method: placeholder_method(),
                        reason: format!("{pred} -> {pc} missing from successors"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Most CFG-level errors don't yet have the surrounding method identity
/// threaded through at this layer; callers (the interpreter, the batch
/// driver) re-tag errors with the real `MethodId` as they propagate. This
/// placeholder keeps `Cfg::build`'s signature free of a method parameter it
/// otherwise wouldn't need.
fn placeholder_method() -> MethodId {
    MethodId { class: "<unknown>".into(), name: "<unknown>".to_string(), descriptor: crate::types::MethodDescriptor { parameters: vec![], return_type: None } }
}

fn partition_into_blocks(
    code: &Code,
    reachable: &AHashSet<Pc>,
    successors: &AHashMap<Pc, Vec<Pc>>,
    predecessors: &AHashMap<Pc, Vec<Pc>>,
    subroutine_starts: &AHashSet<Pc>,
    handler_entries: &AHashSet<Pc>,
) -> Vec<BasicBlock> {
    let mut sorted: Vec<Pc> = reachable.iter().copied().collect();
    sorted.sort_unstable();

    let mut block_starts: AHashSet<Pc> = AHashSet::default();
    if let Some(&first) = sorted.first() {
        block_starts.insert(first);
    }
    for &pc in &sorted {
        let succs = successors.get(&pc).map_or(0, Vec::len);
        let preds = predecessors.get(&pc).map_or(0, Vec::len);
        if preds != 1 {
            block_starts.insert(pc);
        }
        if succs != 1 {
            if let Some(next) = code.next_pc(pc) {
                if reachable.contains(&next) {
                    block_starts.insert(next);
                }
            }
        } else if let [only] = successors[&pc].as_slice() {
            if code.next_pc(pc) != Some(*only) {
                block_starts.insert(*only);
            }
        }
    }
    for &pc in subroutine_starts {
        block_starts.insert(pc);
    }
    for &pc in handler_entries {
        block_starts.insert(pc);
    }

    let mut starts: Vec<Pc> = block_starts.into_iter().collect();
    starts.sort_unstable();

    let mut blocks = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let mut end = start;
        loop {
            let at_terminator = code.instruction_at(end).is_some_and(super::inst::Instruction::is_block_terminator);
            let next_in_reachable = code.next_pc(end).filter(|n| reachable.contains(n));
            match next_in_reachable {
                Some(next) if !at_terminator && !starts.contains(&next) => end = next,
                _ => break,
            }
        }
        blocks.push(BasicBlock {
            id: BbId(i as u32),
            start,
            end,
            is_start_of_subroutine: subroutine_starts.contains(&start),
            is_handler_entry: handler_entries.contains(&start),
        });
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::StaticHierarchy;
    use crate::inst::{Instruction, InstructionKind};

    fn straight_line_code() -> Code {
        Code::new(
            vec![
                Instruction { pc: Pc(0), kind: InstructionKind::Load { ty: crate::types::ComputationalType::Int, slot: 0 } },
                Instruction { pc: Pc(1), kind: InstructionKind::Return(Some(crate::types::ComputationalType::Int)) },
            ],
            vec![],
            1,
            1,
        )
    }

    #[test]
    fn single_block_for_a_straight_line_method() {
        let code = straight_line_code();
        let reachable: AHashSet<Pc> = [Pc(0), Pc(1)].into_iter().collect();
        let cfg = Cfg::build(&code, &reachable, &StaticHierarchy::new(), &crate::config::Configuration::default()).unwrap();
        assert_eq!(cfg.blocks().len(), 1);
        assert_eq!(cfg.blocks()[0].start, Pc(0));
        assert_eq!(cfg.blocks()[0].end, Pc(1));
        cfg.check_invariants(&reachable).unwrap();
    }

    #[test]
    fn conditional_branch_creates_two_successor_blocks() {
        let code = Code::new(
            vec![
                Instruction {
                    pc: Pc(0),
                    kind: InstructionKind::If { op: crate::inst::CondOp::Eq, arity: crate::inst::CondArity::CompareToZero, target: Pc(4) },
                },
                Instruction { pc: Pc(1), kind: InstructionKind::Return(None) },
                Instruction { pc: Pc(4), kind: InstructionKind::Return(None) },
            ],
            vec![],
            0,
            1,
        );
        let reachable: AHashSet<Pc> = [Pc(0), Pc(1), Pc(4)].into_iter().collect();
        let cfg = Cfg::build(&code, &reachable, &StaticHierarchy::new(), &crate::config::Configuration::default()).unwrap();
        assert_eq!(cfg.successors_of(Pc(0)).len(), 2);
        cfg.check_invariants(&reachable).unwrap();
    }
}
