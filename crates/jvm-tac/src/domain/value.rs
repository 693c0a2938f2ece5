//! The per-value capability a concrete abstract domain's representation must
//! offer the core: its computational type, and (optionally) a self-reported
//! origin the def/use recorder cross-checks against its own bookkeeping.

use crate::pc::Origin;
use crate::types::ComputationalType;

/// The representation a concrete abstract domain uses for one JVM runtime
/// value. Domains are free to carry arbitrary analysis-specific payload
/// (constant propagation lattices, points-to sets, …) as long as they can
/// answer these two questions.
pub trait DomainValue: Clone + std::fmt::Debug {
    fn computational_type(&self) -> ComputationalType;

    /// If this domain tracks where a value came from independently of the
    /// def/use recorder, it may report it here; [`crate::defuse`] cross-checks
    /// that every domain-recorded origin also appears in `operandOrigin`.
    /// Domains that don't track provenance return `None` and are exempt
    /// from that cross-check.
    fn origin(&self) -> Option<Origin> {
        None
    }
}

/// The result of joining two values observed at the same stack/local
/// position from different control-flow predecessors.
#[derive(Debug, Clone)]
pub enum Join<V> {
    /// The incoming value already subsumes the existing one; nothing
    /// changes, the successor does not need to be re-scheduled.
    NoUpdate,
    /// The join produced a strictly more general value and the successor
    /// must be re-evaluated with it.
    StructuralUpdate(V),
    /// The stored value changed in a way that doesn't affect any future
    /// transfer-function outcome (e.g. provenance-only bookkeeping some
    /// domains fold into the value itself) — written back, but the
    /// successor is not re-scheduled.
    MetaUpdate(V),
}

impl<V> Join<V> {
    #[must_use]
    pub fn requires_reschedule(&self) -> bool {
        matches!(self, Self::StructuralUpdate(_))
    }

    #[must_use]
    pub fn into_value(self, previous: V) -> V {
        match self {
            Self::NoUpdate => previous,
            Self::StructuralUpdate(v) | Self::MetaUpdate(v) => v,
        }
    }
}
