//! Dominator (and, by running the same algorithm over the reversed graph,
//! post-dominator) trees over a [`super::Cfg`], wrapping
//! `petgraph::algo::dominators` behind a pc-indexed query surface rather
//! than exposing `petgraph`'s own node-index type to callers.

use ahash::AHashMap;
use petgraph::algo::dominators::{self, Dominators as PetgraphDominators};
use petgraph::graphmap::DiGraphMap;

use super::Cfg;
use crate::pc::Pc;

/// A dominator tree (or, when built via [`Dominators::post_dominators`], a
/// post-dominator tree) keyed by pc.
#[derive(Debug, Clone)]
pub struct Dominators {
    inner: PetgraphDominators<Pc>,
    root: Pc,
}

impl Dominators {
    /// Builds the dominator tree of `cfg` rooted at its entry pc.
    #[must_use]
    pub fn for_cfg(cfg: &Cfg) -> Self {
        let graph = build_graph(cfg, false);
        Self { inner: dominators::simple_fast(&graph, cfg.entry), root: cfg.entry }
    }

    /// Builds the post-dominator tree: the dominator tree of the reversed
    /// CFG rooted at a synthetic exit that every terminator block is wired
    /// to.
    #[must_use]
    pub fn post_dominators_for_cfg(cfg: &Cfg) -> Self {
        let mut graph = build_graph(cfg, true);
        let exit = synthetic_exit();
        for pc in cfg.pcs() {
            if cfg.successors_of(pc).is_empty() {
                graph.add_edge(pc, exit, ());
            }
        }
        Self { inner: dominators::simple_fast(&graph, exit), root: exit }
    }

    #[must_use]
    pub fn root(&self) -> Pc {
        self.root
    }

    /// The immediate dominator of `pc`, or `None` for the root or for an
    /// unreachable pc.
    #[must_use]
    pub fn immediate_dominator(&self, pc: Pc) -> Option<Pc> {
        self.inner.immediate_dominator(pc)
    }

    /// Whether `a` dominates `b` (reflexive: every pc dominates itself).
    #[must_use]
    pub fn dominates(&self, a: Pc, b: Pc) -> bool {
        if a == b {
            return true;
        }
        self.inner.dominators(b).is_some_and(|mut chain| chain.any(|d| d == a))
    }

    /// All strict dominators of `pc`, nearest first, as a lazy iterator —
    /// per the design notes' "replace visitor callbacks with iterators".
    pub fn strict_dominators_of(&self, pc: Pc) -> impl Iterator<Item = Pc> + '_ {
        self.inner.dominators(pc).into_iter().flatten().filter(move |&d| d != pc)
    }
}

/// Pc used as the synthetic post-dominator-tree root. Never a real byte
/// offset (the JVM caps method code at 65535 bytes), so it cannot collide.
#[must_use]
fn synthetic_exit() -> Pc {
    Pc(u32::MAX)
}

fn build_graph(cfg: &Cfg, reversed: bool) -> DiGraphMap<Pc, ()> {
    let mut graph = DiGraphMap::new();
    for pc in cfg.pcs() {
        graph.add_node(pc);
        for &succ in cfg.successors_of(pc) {
            if reversed {
                graph.add_edge(succ, pc, ());
            } else {
                graph.add_edge(pc, succ, ());
            }
        }
    }
    graph
}

/// A merged table exposing both trees, the shape
/// [`super::control_dependence`] builds its own control-dependence queries
/// on top of.
#[derive(Debug, Clone)]
pub struct DominatorTrees {
    pub dominators: Dominators,
    pub post_dominators: Dominators,
}

impl DominatorTrees {
    #[must_use]
    pub fn for_cfg(cfg: &Cfg) -> Self {
        Self { dominators: Dominators::for_cfg(cfg), post_dominators: Dominators::post_dominators_for_cfg(cfg) }
    }
}

/// Builds a pc -> post-dominator-frontier lookup, used by
/// [`super::control_dependence`] without needing repeated tree walks.
#[must_use]
pub fn post_dominance_frontiers(cfg: &Cfg, post_doms: &Dominators) -> AHashMap<Pc, Vec<Pc>> {
    let mut frontiers: AHashMap<Pc, Vec<Pc>> = AHashMap::default();
    for pc in cfg.pcs() {
        if cfg.predecessors_of(pc).len() < 2 {
            continue;
        }
        for &pred in cfg.predecessors_of(pc) {
            let mut runner = pred;
            while runner != post_doms.root() && Some(runner) != post_doms.immediate_dominator(pc) {
                frontiers.entry(runner).or_default().push(pc);
                match post_doms.immediate_dominator(runner) {
                    Some(next) if next != runner => runner = next,
                    _ => break,
                }
            }
        }
    }
    for v in frontiers.values_mut() {
        v.sort_unstable();
        v.dedup();
    }
    frontiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::hierarchy::StaticHierarchy;
    use crate::inst::{CondArity, CondOp, Instruction, InstructionKind};

    fn diamond_cfg() -> Cfg {
        let code = crate::code::Code::new(
            vec![
                Instruction {
                    pc: Pc(0),
                    kind: InstructionKind::If { op: CondOp::Eq, arity: CondArity::CompareToZero, target: Pc(4) },
                },
                Instruction { pc: Pc(1), kind: InstructionKind::Goto { target: Pc(6) } },
                Instruction { pc: Pc(4), kind: InstructionKind::Goto { target: Pc(6) } },
                Instruction { pc: Pc(6), kind: InstructionKind::Return(None) },
            ],
            vec![],
            0,
            1,
        );
        let reachable = [Pc(0), Pc(1), Pc(4), Pc(6)].into_iter().collect();
        Cfg::build(&code, &reachable, &StaticHierarchy::new(), &Configuration::default()).unwrap()
    }

    #[test]
    fn entry_dominates_every_reachable_pc() {
        let cfg = diamond_cfg();
        let doms = Dominators::for_cfg(&cfg);
        for pc in [Pc(1), Pc(4), Pc(6)] {
            assert!(doms.dominates(Pc(0), pc));
        }
    }

    #[test]
    fn merge_point_is_not_dominated_by_either_branch() {
        let cfg = diamond_cfg();
        let doms = Dominators::for_cfg(&cfg);
        assert!(!doms.dominates(Pc(1), Pc(6)));
        assert!(!doms.dominates(Pc(4), Pc(6)));
    }
}
