//! The Abstract Interpreter: a worklist fixpoint over a method's instruction
//! array that produces, per evaluated pc, the operand stack and locals
//! table the domain computed there.
//!
//! The def/use origin shadow is threaded through the same worklist rather
//! than implemented as a wrapper domain: its update rules (fresh origin on
//! push, propagate on load/checkcast/stack-shuffle, copy on store, union on
//! join) are structural and domain-independent, so recomputing them via a
//! second interpretation pass — or via a decorator that every concrete
//! `Domain` impl would have to thread through `apply` — would just be
//! duplicated bookkeeping. [`crate::defuse`] is the derived, frozen view
//! over the tables this module produces (`usedBy` queries and the
//! self-consistency checks), matching the "frozen on AI completion"
//! lifecycle.

use std::collections::VecDeque;
use std::time::Instant;

use ahash::{AHashMap, AHashSet};
use indexmap::IndexSet;

use crate::cancellation::CancellationToken;
use crate::cfg::Cfg;
use crate::code::Code;
use crate::config::Configuration;
use crate::domain::value::{DomainValue, Join};
use crate::domain::Domain;
use crate::error::{Error, MethodId, Result};
use crate::hierarchy::ClassHierarchy;
use crate::inst::{Instruction, InstructionKind, StackOp, StackShape};
use crate::liveness::LiveVariables;
use crate::pc::{Origin, Pc};
use crate::types::{Category, ComputationalType, MethodDescriptor};

/// A value's recorded origins at one stack/local position: a small
/// unordered set, backed here by an insertion-ordered set so iteration
/// stays deterministic (interpretation idempotence depends on it).
pub type OriginSet = IndexSet<Origin>;

/// The caller-supplied shape of the method being interpreted: its
/// descriptor (for parameter origins) and whether it's static (no receiver).
#[derive(Debug, Clone, Copy)]
pub struct MethodShape<'a> {
    pub descriptor: &'a MethodDescriptor,
    pub is_static: bool,
}

/// The frozen artifact of a completed (or budget-truncated) interpretation.
#[derive(Debug, Clone)]
pub struct AIResult<V> {
    pub operands: AHashMap<Pc, Vec<V>>,
    pub locals: AHashMap<Pc, Vec<V>>,
    pub operand_origins: AHashMap<Pc, Vec<OriginSet>>,
    pub local_origins: AHashMap<Pc, Vec<Option<OriginSet>>>,
    pub evaluated: AHashSet<Pc>,
    pub cfg: Cfg,
    /// The live-variables oracle, present exactly when
    /// `Configuration::identify_dead_variables` was set for this run —
    /// computing it is only worth the extra backward fixpoint when a caller
    /// actually asked for dead-local identification.
    pub live_variables: Option<LiveVariables>,
}

impl<V> AIResult<V> {
    #[must_use]
    pub fn operand_origin(&self, pc: Pc, k: usize) -> Option<&OriginSet> {
        self.operand_origins.get(&pc).and_then(|v| v.get(k))
    }

    #[must_use]
    pub fn local_origin(&self, pc: Pc, slot: usize) -> Option<&OriginSet> {
        self.local_origins.get(&pc).and_then(|v| v.get(slot)).and_then(Option::as_ref)
    }

    /// pcs of local-variable writes (`istore`/`iinc` and friends) that are
    /// dead on every path, per the `live_variables` oracle — `None` unless
    /// `Configuration::identify_dead_variables` was set for this run.
    #[must_use]
    pub fn dead_local_stores(&self, code: &Code) -> Option<Vec<Pc>> {
        self.live_variables.as_ref().map(|lv| lv.dead_stores(code, &self.evaluated))
    }
}

/// Why an interpretation stopped before reaching a true fixpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incomplete {
    /// The caller's [`CancellationToken`] was observed set.
    Cancelled,
    /// `Configuration::max_evaluation_time` elapsed.
    WallClockDeadline,
    /// `Configuration::max_evaluation_factor * codeSize` worklist steps were
    /// exhausted.
    StepBudgetExhausted,
}

/// An interpretation run: the `AIResult`, plus whether it reached a true
/// fixpoint or was cut short by the configured budget/deadline — a
/// recoverable "interpretation incomplete" result.
#[derive(Debug, Clone)]
pub struct Interpretation<V> {
    pub result: AIResult<V>,
    pub complete: bool,
    pub incomplete_reason: Option<Incomplete>,
}

impl<V> Interpretation<V> {
    /// Demands a complete fixpoint, turning an incomplete run into the
    /// matching `Error` variant for callers that can't tolerate a partial
    /// result (as opposed to callers happy to lift a best-effort TAC from
    /// it). The variant chosen reflects why the run actually stopped, not a
    /// caller-supplied guess.
    pub fn require_complete(self, method: &MethodId) -> Result<AIResult<V>> {
        match self.incomplete_reason {
            None => Ok(self.result),
            Some(Incomplete::StepBudgetExhausted) => Err(Error::InterpretationBudgetExhausted { method: method.clone() }),
            Some(Incomplete::Cancelled | Incomplete::WallClockDeadline) => Err(Error::InterpretationTimeout { method: method.clone() }),
        }
    }
}

/// Drives the worklist fixpoint for one method over a concrete domain `D`.
pub struct Interpreter<'a, D: Domain> {
    pub domain: &'a D,
    pub code: &'a Code,
    pub hierarchy: &'a dyn ClassHierarchy,
    pub config: &'a Configuration,
}

/// Wraps a slice of domain values so [`crate::inst::Instruction::pop_count`]
/// can consult stack-shape-dependent depths. Shared with [`crate::defuse`]
/// and [`crate::tac`], which need the identical pop/push-count computation
/// over the same frozen `AIResult` tables.
pub(crate) struct LiveStack<'s, V>(pub &'s [V]);

impl<V: DomainValue> StackShape for LiveStack<'_, V> {
    fn category_at(&self, depth: usize) -> Category {
        self.0[depth].computational_type().category()
    }
}

/// One instruction's effect: the state to install at a successor pc.
struct Transition<V> {
    successor: Pc,
    operands: Vec<V>,
    locals: Vec<V>,
    operand_origins: Vec<OriginSet>,
    local_origins: Vec<Option<OriginSet>>,
}

impl<'a, D: Domain> Interpreter<'a, D>
where
    D::Value: DomainValue,
{
    #[must_use]
    pub fn new(domain: &'a D, code: &'a Code, hierarchy: &'a dyn ClassHierarchy, config: &'a Configuration) -> Self {
        Self { domain, code, hierarchy, config }
    }

    /// Runs the fixpoint to completion or until the configured budget/time
    /// cap is hit. Fatal contract violations (an unknown opcode shape, a
    /// `ret` outside any subroutine) are returned as `Err`; everything else
    /// comes back as a (possibly incomplete) [`Interpretation`].
    pub fn run(&self, method: &MethodId, shape: &MethodShape<'_>, cancellation: Option<&CancellationToken>) -> Result<Interpretation<D::Value>> {
        let Some(entry) = self.code.entry_point() else {
            return Err(Error::CFGInconsistency { method: method.clone(), reason: "method has no instructions".to_string() });
        };

        let (subroutine_returns, subroutine_of) = discover_subroutines(self.code);

        let mut state = RunState::<D::Value>::default();
        let (locals0, local_origins0) = initial_locals(self.domain, shape.descriptor, shape.is_static, self.code.max_locals);
        state.operands.insert(entry, Vec::new());
        state.operand_origins.insert(entry, Vec::new());
        state.locals.insert(entry, locals0);
        state.local_origins.insert(entry, local_origins0);

        let mut worklist: VecDeque<Pc> = VecDeque::new();
        let mut pending: AHashSet<Pc> = AHashSet::default();
        worklist.push_back(entry);
        pending.insert(entry);

        let max_steps = (self.config.max_evaluation_factor as usize) * self.code.len().max(1);
        let deadline = Instant::now() + self.config.max_evaluation_time;
        let mut steps = 0usize;
        let mut incomplete_reason: Option<Incomplete> = None;

        while let Some(pc) = worklist.pop_front() {
            pending.remove(&pc);

            if let Some(token) = cancellation {
                if token.is_cancelled() {
                    incomplete_reason = Some(Incomplete::Cancelled);
                    break;
                }
            }
            if Instant::now() >= deadline {
                incomplete_reason = Some(Incomplete::WallClockDeadline);
                break;
            }
            steps += 1;
            if steps > max_steps {
                incomplete_reason = Some(Incomplete::StepBudgetExhausted);
                break;
            }

            state.evaluated.insert(pc);
            let Some(inst) = self.code.instruction_at(pc) else {
                return Err(Error::BytecodeProcessingFailure { method: method.clone(), pc, reason: "evaluated pc has no instruction".to_string() });
            };

            let transitions = self.step(method, pc, inst, &state, &subroutine_returns, &subroutine_of)?;
            for t in transitions {
                let successor = t.successor;
                if merge(&mut state, self.domain, t) && pending.insert(successor) {
                    worklist.push_back(successor);
                }
            }
        }

        let cfg = Cfg::build(self.code, &state.evaluated, self.hierarchy, self.config).map_err(|_| Error::CFGInconsistency {
            method: method.clone(),
            reason: "failed to build CFG over evaluated instructions".to_string(),
        })?;
        if self.config.check_invariants {
            cfg.check_invariants(&state.evaluated)
                .map_err(|e| Error::CFGInconsistency { method: method.clone(), reason: e.to_string() })?;
        }

        let live_variables = self.config.identify_dead_variables.then(|| LiveVariables::build(self.code, &cfg, &state.evaluated));

        Ok(Interpretation {
            result: AIResult {
                operands: state.operands,
                locals: state.locals,
                operand_origins: state.operand_origins,
                local_origins: state.local_origins,
                evaluated: state.evaluated,
                cfg,
                live_variables,
            },
            complete: incomplete_reason.is_none(),
            incomplete_reason,
        })
    }

    #[allow(clippy::too_many_lines)]
    fn step(
        &self,
        method: &MethodId,
        pc: Pc,
        inst: &Instruction,
        state: &RunState<D::Value>,
        subroutine_returns: &AHashMap<Pc, Vec<Pc>>,
        subroutine_of: &AHashMap<Pc, Option<Pc>>,
    ) -> Result<Vec<Transition<D::Value>>> {
        let operands = state.operands.get(&pc).expect("evaluated pc has operand state");
        let locals = state.locals.get(&pc).expect("evaluated pc has locals state");
        let operand_origins = state.operand_origins.get(&pc).expect("evaluated pc has operand-origin state");
        let local_origins = state.local_origins.get(&pc).expect("evaluated pc has local-origin state");

        let next_pc = self.code.next_pc(pc);
        let mut out = Vec::new();

        match &inst.kind {
            InstructionKind::Stack(op) => {
                let shape = LiveStack(operands);
                let pop_n = inst.pop_count(&shape);
                let push_n = inst.push_count(&shape);
                let (new_ops, new_origins) = apply_stack_shuffle(*op, operands, operand_origins, pop_n, push_n);
                if let Some(next) = next_pc {
                    out.push(Transition {
                        successor: next,
                        operands: new_ops,
                        locals: locals.clone(),
                        operand_origins: new_origins,
                        local_origins: local_origins.clone(),
                    });
                }
            }
            InstructionKind::Load { slot, .. } => {
                let slot = *slot as usize;
                let mut new_ops = operands.clone();
                new_ops.insert(0, locals[slot].clone());
                let mut new_origins = operand_origins.clone();
                new_origins.insert(0, local_origins[slot].clone().unwrap_or_default());
                if let Some(next) = next_pc {
                    out.push(Transition { successor: next, operands: new_ops, locals: locals.clone(), operand_origins: new_origins, local_origins: local_origins.clone() });
                }
            }
            InstructionKind::Store { ty, slot } => {
                let slot = *slot as usize;
                let mut new_ops = operands.clone();
                let popped = new_ops.remove(0);
                let mut new_origins = operand_origins.clone();
                let popped_origin = new_origins.remove(0);
                let mut new_locals = locals.clone();
                let mut new_local_origins = local_origins.clone();
                new_locals[slot] = popped;
                new_local_origins[slot] = Some(popped_origin);
                if ty.category() == Category::Two {
                    new_locals[slot + 1] = self.domain.illegal_value();
                    new_local_origins[slot + 1] = None;
                }
                if let Some(next) = next_pc {
                    out.push(Transition { successor: next, operands: new_ops, locals: new_locals, operand_origins: new_origins, local_origins: new_local_origins });
                }
            }
            InstructionKind::IInc { slot, .. } => {
                let slot = *slot as usize;
                let result = self.domain.apply(inst, &[], locals);
                let mut new_locals = locals.clone();
                let mut new_local_origins = local_origins.clone();
                new_locals[slot] = result.pushed.into_iter().next().ok_or_else(|| Error::BytecodeProcessingFailure {
                    method: method.clone(),
                    pc,
                    reason: "iinc transfer function produced no value".to_string(),
                })?;
                new_local_origins[slot] = Some(OriginSet::from_iter([Origin::of_pc(pc)]));
                if let Some(next) = next_pc {
                    out.push(Transition { successor: next, operands: operands.clone(), locals: new_locals, operand_origins: operand_origins.clone(), local_origins: new_local_origins });
                }
            }
            InstructionKind::CheckCast(ty) => {
                let mut new_ops = operands.clone();
                new_ops[0] = self.domain.refine_reference(&new_ops[0], Some(ty));
                if let Some(next) = next_pc {
                    out.push(Transition { successor: next, operands: new_ops, locals: locals.clone(), operand_origins: operand_origins.clone(), local_origins: local_origins.clone() });
                }
            }
            InstructionKind::Jsr { target } => {
                let mut new_ops = operands.clone();
                let return_pc = next_pc.ok_or_else(|| Error::SubroutineNotSupported { method: method.clone(), pc, reason: "jsr has no return pc".to_string() })?;
                new_ops.insert(0, self.domain.return_address(return_pc));
                let mut new_origins = operand_origins.clone();
                new_origins.insert(0, OriginSet::from_iter([Origin::of_pc(pc)]));
                out.push(Transition { successor: *target, operands: new_ops, locals: locals.clone(), operand_origins: new_origins, local_origins: local_origins.clone() });
            }
            InstructionKind::Ret { .. } => {
                let owner = subroutine_of.get(&pc).copied().flatten().ok_or_else(|| Error::SubroutineNotSupported {
                    method: method.clone(),
                    pc,
                    reason: "ret outside any subroutine".to_string(),
                })?;
                for &return_pc in subroutine_returns.get(&owner).into_iter().flatten() {
                    out.push(Transition {
                        successor: return_pc,
                        operands: operands.clone(),
                        locals: locals.clone(),
                        operand_origins: operand_origins.clone(),
                        local_origins: local_origins.clone(),
                    });
                }
            }
            InstructionKind::AThrow => {
                let thrown = operands[0].clone();
                out.extend(self.exceptional_transitions(pc, inst, locals, local_origins, Some(thrown), true));
            }
            InstructionKind::Return(_) => {}
            InstructionKind::If { arity, .. } => {
                let pop_n = match arity {
                    crate::inst::CondArity::CompareToZero => 1,
                    crate::inst::CondArity::CompareToOperand => 2,
                };
                let popped: Vec<_> = operands[..pop_n].to_vec();
                let new_ops = operands[pop_n..].to_vec();
                let new_origins = operand_origins[pop_n..].to_vec();
                let _ = self.domain.apply(inst, &popped, locals);
                for succ in inst.regular_successors(next_pc) {
                    out.push(Transition { successor: succ, operands: new_ops.clone(), locals: locals.clone(), operand_origins: new_origins.clone(), local_origins: local_origins.clone() });
                }
                out.extend(self.exceptional_transitions(pc, inst, locals, local_origins, None, false));
            }
            InstructionKind::TableSwitch { .. } | InstructionKind::LookupSwitch { .. } => {
                let new_ops = operands[1..].to_vec();
                let new_origins = operand_origins[1..].to_vec();
                for succ in inst.regular_successors(next_pc) {
                    out.push(Transition { successor: succ, operands: new_ops.clone(), locals: locals.clone(), operand_origins: new_origins.clone(), local_origins: local_origins.clone() });
                }
            }
            _ => {
                let shape = LiveStack(operands);
                let pop_n = inst.pop_count(&shape);
                let push_n = inst.push_count(&shape);
                let popped: Vec<_> = operands[..pop_n].to_vec();
                let result = self.domain.apply(inst, &popped, locals);
                let mut new_ops = operands[pop_n..].to_vec();
                let mut new_origins = operand_origins[pop_n..].to_vec();
                debug_assert_eq!(result.pushed.len(), push_n);
                for v in result.pushed.into_iter().rev() {
                    new_ops.insert(0, v);
                    new_origins.insert(0, OriginSet::from_iter([Origin::of_pc(pc)]));
                }
                // `raises` means the domain has proven this instruction, in
                // this incoming state, always throws: there is no normal
                // completion to fall through from. An instruction the domain
                // merely cannot rule out throwing (handled below via
                // `classify_exceptions`/`throw_all_potential_exceptions`)
                // reports `raises: false` and keeps its regular edges.
                if !result.raises {
                    for succ in inst.regular_successors(next_pc) {
                        out.push(Transition { successor: succ, operands: new_ops.clone(), locals: locals.clone(), operand_origins: new_origins.clone(), local_origins: local_origins.clone() });
                    }
                }
                out.extend(self.exceptional_transitions(pc, inst, locals, local_origins, None, result.raises));
            }
        }

        Ok(out)
    }

    /// Exceptional-edge fan-out for `pc`, shared by `athrow` (where the
    /// thrown value is already on the stack) and every other
    /// potentially-raising instruction (where the domain manufactures a
    /// synthetic VM-level exception value).
    fn exceptional_transitions(
        &self,
        pc: Pc,
        inst: &Instruction,
        locals: &[D::Value],
        local_origins: &[Option<OriginSet>],
        explicit_throw: Option<D::Value>,
        domain_says_raises: bool,
    ) -> Vec<Transition<D::Value>> {
        let mut out = Vec::new();
        let is_monitor = matches!(inst.kind, InstructionKind::MonitorEnter | InstructionKind::MonitorExit);
        if is_monitor && self.config.ignore_synchronization {
            return out;
        }

        let should_consider = explicit_throw.is_some() || domain_says_raises || (self.config.throw_all_potential_exceptions && inst.may_raise_vm_exception());
        if !should_consider {
            return out;
        }

        let classification = self.domain.classify_exceptions(inst, self.config.throw_all_potential_exceptions);

        for handler in self.code.handlers_covering(pc) {
            // An explicit `athrow`'s concrete exception type isn't visible
            // through the `Domain` capability set (it's opaque `V`), so any
            // covering handler is conservatively considered reachable; a
            // VM-raised exception is narrowed against the domain's own
            // classification of what `inst` can throw.
            let applies = if explicit_throw.is_some() {
                true
            } else {
                match &handler.catch_type {
                    None => true,
                    Some(ty) => classification.possible_exceptions.iter().any(|e| self.hierarchy.is_subtype_of(e, ty)) || self.config.throw_all_potential_exceptions,
                }
            };
            if !applies {
                continue;
            }
            let thrown = explicit_throw.clone().unwrap_or_else(|| self.domain.exception_value(handler.catch_type.as_ref(), Origin::vm_level(pc)));
            out.push(Transition {
                successor: handler.handler,
                operands: vec![thrown],
                locals: locals.to_vec(),
                operand_origins: vec![OriginSet::from_iter([Origin::of_pc(handler.handler)])],
                local_origins: local_origins.to_vec(),
            });
        }
        out
    }
}

#[derive(Default)]
struct RunState<V> {
    operands: AHashMap<Pc, Vec<V>>,
    locals: AHashMap<Pc, Vec<V>>,
    operand_origins: AHashMap<Pc, Vec<OriginSet>>,
    local_origins: AHashMap<Pc, Vec<Option<OriginSet>>>,
    evaluated: AHashSet<Pc>,
}

/// Writes `t` into `state`, joining against any existing state at
/// `t.successor`: write-if-absent, else join pairwise and report whether
/// anything changed. Returns whether the successor needs (re-)scheduling.
fn merge<D: Domain>(state: &mut RunState<D::Value>, domain: &D, t: Transition<D::Value>) -> bool
where
    D::Value: DomainValue,
{
    let Transition { successor, operands, locals, operand_origins, local_origins } = t;

    if !state.operands.contains_key(&successor) {
        state.operands.insert(successor, operands);
        state.locals.insert(successor, locals);
        state.operand_origins.insert(successor, operand_origins);
        state.local_origins.insert(successor, local_origins);
        return true;
    }

    let mut changed = false;

    let existing_ops = state.operands.get(&successor).expect("checked above");
    let mut joined_ops = Vec::with_capacity(existing_ops.len());
    for (existing, incoming) in existing_ops.iter().zip(operands.iter()) {
        match domain.join(existing, incoming) {
            Join::NoUpdate => joined_ops.push(existing.clone()),
            Join::StructuralUpdate(v) => {
                changed = true;
                joined_ops.push(v);
            }
            Join::MetaUpdate(v) => joined_ops.push(v),
        }
    }

    let existing_locals = state.locals.get(&successor).expect("checked above");
    let mut joined_locals = Vec::with_capacity(existing_locals.len());
    for (existing, incoming) in existing_locals.iter().zip(locals.iter()) {
        match domain.join(existing, incoming) {
            Join::NoUpdate => joined_locals.push(existing.clone()),
            Join::StructuralUpdate(v) => {
                changed = true;
                joined_locals.push(v);
            }
            Join::MetaUpdate(v) => joined_locals.push(v),
        }
    }

    let existing_op_origins = state.operand_origins.get(&successor).expect("checked above");
    let mut joined_op_origins = Vec::with_capacity(existing_op_origins.len());
    for (existing, incoming) in existing_op_origins.iter().zip(operand_origins.iter()) {
        let mut merged = existing.clone();
        let before = merged.len();
        merged.extend(incoming.iter().copied());
        if merged.len() != before {
            changed = true;
        }
        joined_op_origins.push(merged);
    }

    let existing_local_origins = state.local_origins.get(&successor).expect("checked above");
    let mut joined_local_origins = Vec::with_capacity(existing_local_origins.len());
    for (existing, incoming) in existing_local_origins.iter().zip(local_origins.iter()) {
        let merged = match (existing, incoming) {
            (None, None) => None,
            (Some(e), None) => Some(e.clone()),
            (None, Some(i)) => {
                changed = true;
                Some(i.clone())
            }
            (Some(e), Some(i)) => {
                let mut merged = e.clone();
                let before = merged.len();
                merged.extend(i.iter().copied());
                if merged.len() != before {
                    changed = true;
                }
                Some(merged)
            }
        };
        joined_local_origins.push(merged);
    }

    state.operands.insert(successor, joined_ops);
    state.locals.insert(successor, joined_locals);
    state.operand_origins.insert(successor, joined_op_origins);
    state.local_origins.insert(successor, joined_local_origins);

    changed
}

fn apply_stack_shuffle<V: Clone>(op: StackOp, operands: &[V], origins: &[OriginSet], pop_n: usize, push_n: usize) -> (Vec<V>, Vec<OriginSet>) {
    let below = &operands[pop_n..];
    let below_origins = &origins[pop_n..];
    let popped = &operands[..pop_n];
    let popped_origins = &origins[..pop_n];

    let produced: Vec<V> = match op {
        StackOp::Pop | StackOp::Pop2 => Vec::new(),
        StackOp::Swap => vec![popped[0].clone(), popped[1].clone()],
        StackOp::Dup => vec![popped[0].clone(), popped[0].clone()],
        StackOp::DupX1 => vec![popped[0].clone(), popped[1].clone(), popped[0].clone()],
        StackOp::DupX2 => vec![popped[0].clone(), popped[1].clone(), popped[2].clone(), popped[0].clone()],
        StackOp::Dup2 if pop_n == 1 => vec![popped[0].clone(), popped[0].clone()],
        StackOp::Dup2 => vec![popped[0].clone(), popped[1].clone(), popped[0].clone(), popped[1].clone()],
        StackOp::Dup2X1 if pop_n == 2 => vec![popped[0].clone(), popped[1].clone(), popped[0].clone()],
        StackOp::Dup2X1 => vec![popped[0].clone(), popped[1].clone(), popped[2].clone(), popped[0].clone(), popped[1].clone()],
        StackOp::Dup2X2 if pop_n == 2 => vec![popped[0].clone(), popped[1].clone(), popped[0].clone()],
        StackOp::Dup2X2 if pop_n == 3 => vec![popped[0].clone(), popped[1].clone(), popped[2].clone(), popped[0].clone()],
        StackOp::Dup2X2 => vec![popped[0].clone(), popped[1].clone(), popped[2].clone(), popped[3].clone(), popped[0].clone(), popped[1].clone()],
    };
    let produced_origins: Vec<OriginSet> = match op {
        StackOp::Pop | StackOp::Pop2 => Vec::new(),
        StackOp::Swap => vec![popped_origins[0].clone(), popped_origins[1].clone()],
        StackOp::Dup => vec![popped_origins[0].clone(), popped_origins[0].clone()],
        StackOp::DupX1 => vec![popped_origins[0].clone(), popped_origins[1].clone(), popped_origins[0].clone()],
        StackOp::DupX2 => vec![popped_origins[0].clone(), popped_origins[1].clone(), popped_origins[2].clone(), popped_origins[0].clone()],
        StackOp::Dup2 if pop_n == 1 => vec![popped_origins[0].clone(), popped_origins[0].clone()],
        StackOp::Dup2 => vec![popped_origins[0].clone(), popped_origins[1].clone(), popped_origins[0].clone(), popped_origins[1].clone()],
        StackOp::Dup2X1 if pop_n == 2 => vec![popped_origins[0].clone(), popped_origins[1].clone(), popped_origins[0].clone()],
        StackOp::Dup2X1 => vec![popped_origins[0].clone(), popped_origins[1].clone(), popped_origins[2].clone(), popped_origins[0].clone(), popped_origins[1].clone()],
        StackOp::Dup2X2 if pop_n == 2 => vec![popped_origins[0].clone(), popped_origins[1].clone(), popped_origins[0].clone()],
        StackOp::Dup2X2 if pop_n == 3 => vec![popped_origins[0].clone(), popped_origins[1].clone(), popped_origins[2].clone(), popped_origins[0].clone()],
        StackOp::Dup2X2 => vec![popped_origins[0].clone(), popped_origins[1].clone(), popped_origins[2].clone(), popped_origins[3].clone(), popped_origins[0].clone(), popped_origins[1].clone()],
    };
    debug_assert_eq!(produced.len(), push_n);

    let mut new_ops = produced;
    new_ops.extend(below.iter().cloned());
    let mut new_origins = produced_origins;
    new_origins.extend(below_origins.iter().cloned());
    (new_ops, new_origins)
}

fn initial_locals<D: Domain>(domain: &D, descriptor: &MethodDescriptor, is_static: bool, max_locals: u16) -> (Vec<D::Value>, Vec<Option<OriginSet>>)
where
    D::Value: DomainValue,
{
    let mut locals = vec![domain.illegal_value(); max_locals as usize];
    let mut origins: Vec<Option<OriginSet>> = vec![None; max_locals as usize];
    let mut slot = 0usize;

    if !is_static {
        locals[slot] = domain.initial_parameter(Origin::receiver(), ComputationalType::Reference);
        origins[slot] = Some(OriginSet::from_iter([Origin::receiver()]));
        slot += 1;
    }

    let first_param_origin: i32 = if is_static { -1 } else { -2 };
    let mut consumed_before = 0i32;
    for param_ty in &descriptor.parameters {
        let ct = param_ty.computational_type();
        let origin = Origin::parameter(first_param_origin, consumed_before);
        if slot < locals.len() {
            locals[slot] = domain.initial_parameter(origin, ct);
            origins[slot] = Some(OriginSet::from_iter([origin]));
        }
        let width = i32::from(ct.operand_size());
        consumed_before += width;
        slot += width as usize;
    }

    (locals, origins)
}

/// Assigns each textual pc the entry pc of the innermost subroutine it
/// belongs to (`None` for top-level code reachable without ever passing
/// through a `jsr`), and records, for each subroutine entry, every pc
/// immediately following a `jsr` that targets it. `ret`'s successors are
/// exactly the latter set for the `ret`'s own subroutine — the textbook
/// (non-nested-nesting-nuance) resolution: successors are the pcs following
/// every `jsr` whose return address reaches this `ret`.
fn discover_subroutines(code: &Code) -> (AHashMap<Pc, Vec<Pc>>, AHashMap<Pc, Option<Pc>>) {
    let mut returns: AHashMap<Pc, Vec<Pc>> = AHashMap::default();
    let mut owner: AHashMap<Pc, Option<Pc>> = AHashMap::default();

    let Some(entry) = code.entry_point() else {
        return (returns, owner);
    };

    let mut queue: VecDeque<(Pc, Option<Pc>)> = VecDeque::new();
    queue.push_back((entry, None));

    while let Some((pc, scope)) = queue.pop_front() {
        if owner.contains_key(&pc) {
            continue;
        }
        let Some(inst) = code.instruction_at(pc) else {
            owner.insert(pc, scope);
            continue;
        };
        owner.insert(pc, scope);

        match &inst.kind {
            InstructionKind::Jsr { target } => {
                if let Some(next) = code.next_pc(pc) {
                    returns.entry(*target).or_default().push(next);
                    queue.push_back((next, scope));
                }
                if !owner.contains_key(target) {
                    queue.push_back((*target, Some(*target)));
                }
            }
            InstructionKind::Ret { .. } => {}
            _ => {
                for succ in inst.regular_successors(code.next_pc(pc)) {
                    queue.push_back((succ, scope));
                }
            }
        }
    }

    for v in returns.values_mut() {
        v.sort_unstable();
        v.dedup();
    }
    (returns, owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ConstDomain;

    fn method() -> MethodId {
        MethodId { class: "Example".into(), name: "id".to_string(), descriptor: MethodDescriptor { parameters: vec![crate::types::FieldType::Int], return_type: Some(crate::types::FieldType::Int) } }
    }

    fn id_method_code() -> Code {
        use crate::inst::{Instruction as I, InstructionKind as K};
        Code::new(
            vec![
                I { pc: Pc(0), kind: K::Load { ty: ComputationalType::Int, slot: 0 } },
                I { pc: Pc(1), kind: K::Return(Some(ComputationalType::Int)) },
            ],
            vec![],
            1,
            1,
        )
    }

    #[test]
    fn trivial_identity_method_evaluates_both_instructions() {
        let code = id_method_code();
        let domain = ConstDomain::default();
        let hierarchy = crate::hierarchy::StaticHierarchy::new();
        let config = Configuration::default();
        let interp = Interpreter::new(&domain, &code, &hierarchy, &config);
        let descriptor = MethodDescriptor { parameters: vec![crate::types::FieldType::Int], return_type: Some(crate::types::FieldType::Int) };
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let interpretation = interp.run(&method(), &shape, None).unwrap();
        assert!(interpretation.complete);
        assert_eq!(interpretation.result.evaluated.len(), 2);
        assert_eq!(interpretation.result.operand_origin(Pc(1), 0).unwrap(), &OriginSet::from_iter([Origin(-1)]));
    }

    #[test]
    fn division_by_zero_leaves_ireturn_unevaluated_when_throwing_all() {
        use crate::inst::{ArithOp, Instruction as I, InstructionKind as K};
        use crate::types::ComputationalType as CT;
        let code = Code::new(
            vec![
                I { pc: Pc(0), kind: K::Const(crate::inst::ConstOperand::Int(1)) },
                I { pc: Pc(1), kind: K::Const(crate::inst::ConstOperand::Int(0)) },
                I { pc: Pc(2), kind: K::Binary { ty: CT::Int, op: ArithOp::Div } },
                I { pc: Pc(3), kind: K::Return(Some(CT::Int)) },
            ],
            vec![crate::code::ExceptionHandler { start: Pc(0), end: Pc(4), handler: Pc(10), catch_type: None }, ],
            0,
            2,
        );
        let domain = ConstDomain::default();
        let hierarchy = crate::hierarchy::StaticHierarchy::new();
        let config = Configuration { throw_all_potential_exceptions: true, ..Configuration::default() };
        let interp = Interpreter::new(&domain, &code, &hierarchy, &config);
        let descriptor = MethodDescriptor { parameters: vec![], return_type: Some(CT::Int) };
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let method = MethodId { class: "Example".into(), name: "dz".to_string(), descriptor: descriptor.clone() };
        let interpretation = interp.run(&method, &shape, None).unwrap();
        assert!(interpretation.result.evaluated.contains(&Pc(0)));
        assert!(interpretation.result.evaluated.contains(&Pc(1)));
        assert!(interpretation.result.evaluated.contains(&Pc(2)));
        assert!(!interpretation.result.evaluated.contains(&Pc(3)));
        assert!(interpretation.result.evaluated.contains(&Pc(10)));
    }
}
