//! The Def/Use Recorder's public query surface: a frozen, derived view over
//! the origin tables [`crate::interp`] produces while it runs its own
//! fixpoint.
//!
//! `usedBy` is built in one pass over the frozen [`AIResult`] rather than
//! accumulated incrementally during interpretation — the origin tables are
//! already final once the interpreter returns, so a second incremental
//! bookkeeping pass would just duplicate work the interpreter already did.
//! This matches the "frozen on AI completion" lifecycle: origin tables are
//! immutable once the interpreter returns.

use ahash::AHashMap;
use indexmap::IndexSet;

use crate::code::Code;
use crate::domain::value::DomainValue;
use crate::error::{Error, MethodId, Result};
use crate::inst::{InstructionKind, StackShape};
use crate::interp::AIResult;
use crate::pc::{Origin, Pc};
use crate::types::Category;

/// Reverse index from a value's origin to every pc whose transfer function
/// genuinely consumes a value carrying that origin — the public `usedBy`
/// query.
pub type UsedBy = AHashMap<Origin, IndexSet<Pc>>;

/// The frozen def/use view derived from one [`AIResult`].
#[derive(Debug, Clone, Default)]
pub struct DefUse {
    used_by: UsedBy,
}

struct Shape<'s, V>(&'s [V]);

impl<V: DomainValue> StackShape for Shape<'_, V> {
    fn category_at(&self, depth: usize) -> Category {
        self.0[depth].computational_type().category()
    }
}

impl DefUse {
    /// Which pcs consume a value originating at `origin`, if any.
    #[must_use]
    pub fn used_by(&self, origin: Origin) -> Option<&IndexSet<Pc>> {
        self.used_by.get(&origin)
    }

    #[must_use]
    pub fn is_def_site(&self, pc: Pc) -> bool {
        self.used_by.contains_key(&Origin::of_pc(pc))
    }

    /// Builds the `usedBy` index from `result`'s frozen origin tables.
    ///
    /// An instruction's popped operands register a
    /// use against their origins unless the instruction is stack-management
    /// (`dup*`/`pop*`/`swap`) or a plain local store — both only move a
    /// value, they never consume it for a derived result. `iinc` is the one
    /// local-touching instruction that genuinely computes from the prior
    /// local value (it lifts to `Assignment(local, Add(local, const))`), so
    /// its local read is registered the same way a popped operand would be;
    /// `iload`/`ret` only forward or branch on a value and are not
    /// registered, matching their collapse-to-`Nop` treatment in the lifter.
    #[must_use]
    pub fn build<V: DomainValue>(code: &Code, result: &AIResult<V>) -> Self {
        let mut used_by: UsedBy = AHashMap::default();

        let mut pcs: Vec<Pc> = result.evaluated.iter().copied().collect();
        pcs.sort_unstable();

        for pc in pcs {
            let Some(inst) = code.instruction_at(pc) else { continue };
            let Some(operands) = result.operands.get(&pc) else { continue };
            let Some(operand_origins) = result.operand_origins.get(&pc) else { continue };

            let is_excluded_consumer = inst.is_stack_management() || matches!(inst.kind, InstructionKind::Store { .. });
            if !is_excluded_consumer {
                let shape = Shape(operands.as_slice());
                let pop_n = inst.pop_count(&shape);
                for origins in operand_origins.iter().take(pop_n) {
                    for &origin in origins {
                        used_by.entry(origin).or_default().insert(pc);
                    }
                }
            }

            if let InstructionKind::IInc { slot, .. } = &inst.kind {
                if let Some(local_origins) = result.local_origins.get(&pc).and_then(|v| v.get(*slot as usize)).and_then(Option::as_ref) {
                    for &origin in local_origins {
                        used_by.entry(origin).or_default().insert(pc);
                    }
                }
            }
        }

        Self { used_by }
    }

    /// Every recorded use is justified by a popped-operand origin, a
    /// local-read origin, or the handler pc of the dominating handler entry.
    pub fn check_uses_are_justified<V: DomainValue>(&self, method: &MethodId, code: &Code, result: &AIResult<V>) -> Result<()> {
        for (&origin, users) in &self.used_by {
            for &u in users {
                let Some(operand_origins) = result.operand_origins.get(&u) else {
                    return Err(inconsistent(method, u, "used-by entry references an unevaluated pc"));
                };
                let in_operands = operand_origins.iter().any(|s| s.contains(&origin));
                let in_locals = result
                    .local_origins
                    .get(&u)
                    .is_some_and(|slots| slots.iter().any(|slot| slot.as_ref().is_some_and(|s| s.contains(&origin))));
                let is_handler_pc = origin.as_pc().is_some_and(|p| code.handlers_covering(u).any(|h| h.handler == p));
                if !(in_operands || in_locals || is_handler_pc) {
                    return Err(inconsistent(method, u, format!("no justification found for recorded use of origin {origin}")));
                }
            }
        }
        Ok(())
    }

    /// Every non-excluded popped operand is reflected in `usedBy`.
    pub fn check_operands_are_registered<V: DomainValue>(&self, method: &MethodId, code: &Code, result: &AIResult<V>) -> Result<()> {
        let mut pcs: Vec<Pc> = result.evaluated.iter().copied().collect();
        pcs.sort_unstable();
        for pc in pcs {
            let Some(inst) = code.instruction_at(pc) else { continue };
            if inst.is_stack_management() || matches!(inst.kind, InstructionKind::Store { .. }) {
                continue;
            }
            let Some(operands) = result.operands.get(&pc) else { continue };
            let Some(operand_origins) = result.operand_origins.get(&pc) else { continue };
            let shape = Shape(operands.as_slice());
            let pop_n = inst.pop_count(&shape);
            for origins in operand_origins.iter().take(pop_n) {
                for &origin in origins {
                    if !self.used_by.get(&origin).is_some_and(|s| s.contains(&pc)) {
                        return Err(inconsistent(method, pc, format!("popped origin {origin} missing from usedBy")));
                    }
                }
            }
        }
        Ok(())
    }

    /// A domain value's self-reported origin (if any) must be among
    /// the recorded origins at its position, or point at a handler pc.
    pub fn check_domain_origins_agree<V: DomainValue>(&self, method: &MethodId, code: &Code, result: &AIResult<V>) -> Result<()> {
        for (&pc, operands) in &result.operands {
            let Some(operand_origins) = result.operand_origins.get(&pc) else { continue };
            for (k, value) in operands.iter().enumerate() {
                let Some(reported) = value.origin() else { continue };
                let recorded = operand_origins.get(k).is_some_and(|s| s.contains(&reported));
                let at_handler = reported.as_pc().is_some_and(|p| code.handlers_covering(pc).any(|h| h.handler == p));
                if !recorded && !at_handler {
                    return Err(inconsistent(method, pc, format!("domain-reported origin {reported} absent from operandOrigin({pc}, {k})")));
                }
            }
        }
        Ok(())
    }
}

fn inconsistent(method: &MethodId, pc: Pc, reason: impl Into<String>) -> Error {
    Error::InconsistentDefUse { method: method.clone(), pc, reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::error::MethodId;
    use crate::hierarchy::StaticHierarchy;
    use crate::inst::{Instruction as I, InstructionKind as K};
    use crate::interp::{Interpreter, MethodShape};
    use crate::testutil::ConstDomain;
    use crate::types::{ComputationalType as CT, MethodDescriptor};

    fn id_method() -> (MethodId, Code, MethodDescriptor) {
        let descriptor = MethodDescriptor { parameters: vec![crate::types::FieldType::Int], return_type: Some(crate::types::FieldType::Int) };
        let code = Code::new(vec![I { pc: Pc(0), kind: K::Load { ty: CT::Int, slot: 0 } }, I { pc: Pc(1), kind: K::Return(Some(CT::Int)) }], vec![], 1, 1);
        let method = MethodId { class: "Example".into(), name: "id".to_string(), descriptor: descriptor.clone() };
        (method, code, descriptor)
    }

    #[test]
    fn return_value_registers_as_a_use_of_the_parameter_origin() {
        let (method, code, descriptor) = id_method();
        let domain = ConstDomain;
        let hierarchy = StaticHierarchy::new();
        let config = Configuration::default();
        let interp = Interpreter::new(&domain, &code, &hierarchy, &config);
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let interpretation = interp.run(&method, &shape, None).unwrap();
        let result = interpretation.require_complete(&method).unwrap();

        let defuse = DefUse::build(&code, &result);
        let users = defuse.used_by(Origin(-1)).expect("parameter origin is used");
        assert!(users.contains(&Pc(1)));
        assert!(defuse.check_uses_are_justified(&method, &code, &result).is_ok());
        assert!(defuse.check_operands_are_registered(&method, &code, &result).is_ok());
        assert!(defuse.check_domain_origins_agree(&method, &code, &result).is_ok());
    }

    #[test]
    fn load_instruction_itself_is_not_registered_as_a_consumer() {
        let (method, code, descriptor) = id_method();
        let domain = ConstDomain;
        let hierarchy = StaticHierarchy::new();
        let config = Configuration::default();
        let interp = Interpreter::new(&domain, &code, &hierarchy, &config);
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let interpretation = interp.run(&method, &shape, None).unwrap();
        let result = interpretation.require_complete(&method).unwrap();

        let defuse = DefUse::build(&code, &result);
        let users = defuse.used_by(Origin(-1)).expect("parameter origin is used");
        assert!(!users.contains(&Pc(0)), "iload propagates, it does not consume");
    }
}
