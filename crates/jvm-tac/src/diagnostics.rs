//! The per-method outcome the batch driver reports: success, skipped
//! (abstract/native), or failure with a structured error (kind + pc context
//! + root-cause). Successes carry a few aggregate counters — identical-origin
//! value count, evaluation time, dominator time — useful for triage without
//! re-deriving them from the lifted TAC.
//!
//! This module owns only the *shape* of that report; [`crate::batch`] is
//! what actually produces one per method.

use std::time::Duration;

use crate::error::{Error, MethodId};

/// Why a method was skipped rather than analysed. A skipped method never
/// reaches the interpreter at all, so this isn't one of [`Error`]'s
/// variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Abstract,
    Native,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abstract => write!(f, "abstract"),
            Self::Native => write!(f, "native"),
        }
    }
}

/// Aggregate counters attached to a successful analysis. None of these
/// influence the analysis itself; they exist so a caller can triage which
/// methods are expensive without re-deriving the numbers from the `TACode`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    /// Number of distinct `(pc, stack-or-local position)` origin sets
    /// recorded whose cardinality is exactly one — the common case, and a
    /// rough proxy for how close this method's def/use graph is to already
    /// being single-assignment before the lifter does any work.
    pub identical_origin_value_count: usize,
    /// Wall-clock time spent in the abstract-interpretation fixpoint.
    pub evaluation_time: Duration,
    /// Wall-clock time spent building the dominator tree, if it was built
    /// (the lifter itself never needs it; callers that also want control
    /// dependence pay this separately).
    pub dominator_time: Option<Duration>,
    /// How many obsolete-use-site entries the lifter pruned from a dead
    /// conditional branch's popped operands before returning the frozen TAC
    /// (see `DESIGN.md` for the pruning decision).
    pub obsolete_use_sites_enqueued: usize,
}

/// The outcome of analysing one method. `T` is whatever payload a
/// successful run carries — typically
/// [`crate::tac::TACode`], or `crate::result::AIResult` for a caller driving
/// only the interpreter.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Success { method: MethodId, stats: Stats, value: T },
    Skipped { method: MethodId, reason: SkipReason },
    Failed { method: MethodId, error: Error },
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn method(&self) -> &MethodId {
        match self {
            Self::Success { method, .. } | Self::Skipped { method, .. } | Self::Failed { method, .. } => method,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn as_success(&self) -> Option<(&T, &Stats)> {
        match self {
            Self::Success { value, stats, .. } => Some((value, stats)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_error(&self) -> Option<&Error> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MethodDescriptor;

    fn method() -> MethodId {
        MethodId { class: "Example".into(), name: "run".to_string(), descriptor: MethodDescriptor { parameters: vec![], return_type: None } }
    }

    #[test]
    fn success_reports_its_own_stats() {
        let outcome: Outcome<u32> = Outcome::Success { method: method(), stats: Stats { identical_origin_value_count: 3, ..Stats::default() }, value: 42 };
        let (value, stats) = outcome.as_success().unwrap();
        assert_eq!(*value, 42);
        assert_eq!(stats.identical_origin_value_count, 3);
        assert!(outcome.is_success());
    }

    #[test]
    fn skipped_is_not_a_success_and_has_no_error() {
        let outcome: Outcome<u32> = Outcome::Skipped { method: method(), reason: SkipReason::Native };
        assert!(!outcome.is_success());
        assert!(outcome.as_error().is_none());
    }

    #[test]
    fn failed_exposes_its_error() {
        let outcome: Outcome<u32> = Outcome::Failed { method: method(), error: Error::InterpretationTimeout { method: method() } };
        assert!(matches!(outcome.as_error(), Some(Error::InterpretationTimeout { .. })));
    }
}
