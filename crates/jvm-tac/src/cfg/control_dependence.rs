//! Control dependence, derived from the post-dominator tree via the
//! standard post-dominance-frontier construction.
//!
//! Construction takes an explicit `deadline` rather than a duration so a
//! caller running many methods can build one deadline for a whole batch
//! step and pass it straight through, instead of each call re-deriving "now
//! + budget" and drifting.

use std::time::Instant;

use ahash::AHashMap;

use super::dominators::{post_dominance_frontiers, Dominators};
use super::Cfg;
use crate::error::{Error, MethodId};
use crate::pc::Pc;

/// `pc -> { controlling pcs }`: the set of branch pcs whose outcome
/// determines whether `pc` executes.
#[derive(Debug, Clone, Default)]
pub struct ControlDependence {
    controlled_by: AHashMap<Pc, Vec<Pc>>,
}

impl ControlDependence {
    /// Builds control dependence for every pc in `cfg`, checking `deadline`
    /// periodically; exceeding it yields `Error::ControlDependenceTimeout`.
    /// A timeout here never invalidates the AI result or the TAC lift —
    /// both can proceed without control dependence.
    pub fn build(cfg: &Cfg, post_doms: &Dominators, method: &MethodId, deadline: Instant) -> Result<Self, Error> {
        let frontiers = post_dominance_frontiers(cfg, post_doms);
        let mut controlled_by: AHashMap<Pc, Vec<Pc>> = AHashMap::default();

        for (i, (&branch, targets)) in frontiers.iter().enumerate() {
            if i % 64 == 0 && Instant::now() >= deadline {
                return Err(Error::ControlDependenceTimeout { method: method.clone() });
            }
            for &pc in targets {
                controlled_by.entry(pc).or_default().push(branch);
            }
        }
        for v in controlled_by.values_mut() {
            v.sort_unstable();
            v.dedup();
        }
        Ok(Self { controlled_by })
    }

    /// Lazily enumerates the pcs `pc` is control-dependent on, as a plain
    /// iterator rather than a visitor callback.
    pub fn controlling_pcs_of(&self, pc: Pc) -> impl Iterator<Item = Pc> + '_ {
        self.controlled_by.get(&pc).into_iter().flatten().copied()
    }

    #[must_use]
    pub fn is_control_dependent_on(&self, pc: Pc, candidate: Pc) -> bool {
        self.controlled_by.get(&pc).is_some_and(|v| v.contains(&candidate))
    }
}
