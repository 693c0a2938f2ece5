//! The "live variables" oracle the interpreter's state optionally carries
//! (§4.3) and that `Configuration::identify_dead_variables` turns on: a
//! backward dataflow fixpoint over local-variable slots, independent of the
//! operand stack — a JVM `StackMapTable` only needs to track which locals
//! are live at a merge point, since the stack's shape is already pinned down
//! by the bytecode itself. A `Store`/`iinc` whose written slot isn't live
//! immediately afterward is a dead local write.
//!
//! Built as a standalone backward worklist fixpoint over the same CFG the
//! interpreter already produced, the way `interp`'s own forward fixpoint
//! walks pcs via a `VecDeque` worklist deduplicated by a pending set.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};

use crate::cfg::Cfg;
use crate::code::Code;
use crate::inst::InstructionKind;
use crate::pc::Pc;
use crate::types::Category;

fn used_slots(code: &Code, pc: Pc) -> AHashSet<u16> {
    let mut used = AHashSet::default();
    if let Some(inst) = code.instruction_at(pc) {
        match &inst.kind {
            InstructionKind::Load { ty, slot } => {
                used.insert(*slot);
                if ty.category() == Category::Two {
                    used.insert(*slot + 1);
                }
            }
            InstructionKind::Ret { slot } | InstructionKind::IInc { slot, .. } => {
                used.insert(*slot);
            }
            _ => {}
        }
    }
    used
}

fn defined_slots(code: &Code, pc: Pc) -> AHashSet<u16> {
    let mut defined = AHashSet::default();
    if let Some(inst) = code.instruction_at(pc) {
        match &inst.kind {
            InstructionKind::Store { ty, slot } => {
                defined.insert(*slot);
                if ty.category() == Category::Two {
                    defined.insert(*slot + 1);
                }
            }
            InstructionKind::IInc { slot, .. } => {
                defined.insert(*slot);
            }
            _ => {}
        }
    }
    defined
}

/// `live_out(pc)`: the local slots that may be read on some path after `pc`,
/// before being overwritten. Frozen once built; the interpreter computes one
/// per method when `identify_dead_variables` is set.
#[derive(Debug, Clone, Default)]
pub struct LiveVariables {
    live_out: AHashMap<Pc, AHashSet<u16>>,
}

impl LiveVariables {
    /// Runs the backward fixpoint over every evaluated pc, using the same
    /// CFG edges (including exceptional ones) the forward abstract
    /// interpretation already settled on.
    #[must_use]
    pub fn build(code: &Code, cfg: &Cfg, evaluated: &AHashSet<Pc>) -> Self {
        let mut live_out: AHashMap<Pc, AHashSet<u16>> = AHashMap::default();
        let mut live_in: AHashMap<Pc, AHashSet<u16>> = AHashMap::default();
        for &pc in evaluated {
            live_out.insert(pc, AHashSet::default());
            live_in.insert(pc, AHashSet::default());
        }

        let mut worklist: VecDeque<Pc> = evaluated.iter().copied().collect();
        let mut pending: AHashSet<Pc> = evaluated.iter().copied().collect();

        while let Some(pc) = worklist.pop_front() {
            pending.remove(&pc);

            let mut out: AHashSet<u16> = AHashSet::default();
            for &succ in cfg.successors_of(pc) {
                if let Some(succ_in) = live_in.get(&succ) {
                    out.extend(succ_in.iter().copied());
                }
            }

            let defined = defined_slots(code, pc);
            let mut new_in: AHashSet<u16> = out.iter().copied().filter(|s| !defined.contains(s)).collect();
            new_in.extend(used_slots(code, pc));

            let out_changed = live_out.get(&pc) != Some(&out);
            let in_changed = live_in.get(&pc) != Some(&new_in);
            live_out.insert(pc, out);
            live_in.insert(pc, new_in);

            if out_changed || in_changed {
                for &pred in cfg.predecessors_of(pc) {
                    if evaluated.contains(&pred) && pending.insert(pred) {
                        worklist.push_back(pred);
                    }
                }
            }
        }

        Self { live_out }
    }

    #[must_use]
    pub fn is_live_out(&self, pc: Pc, slot: u16) -> bool {
        self.live_out.get(&pc).is_some_and(|s| s.contains(&slot))
    }

    /// pcs of local-writing instructions (`Store`/`iinc`) whose written slot
    /// is dead immediately afterward on every path — the dead-variable
    /// identification `Configuration::identify_dead_variables` asks for.
    #[must_use]
    pub fn dead_stores(&self, code: &Code, evaluated: &AHashSet<Pc>) -> Vec<Pc> {
        let mut dead: Vec<Pc> = evaluated
            .iter()
            .copied()
            .filter(|&pc| {
                let defined = defined_slots(code, pc);
                !defined.is_empty() && defined.iter().all(|&slot| !self.is_live_out(pc, slot))
            })
            .collect();
        dead.sort_unstable();
        dead
    }
}
