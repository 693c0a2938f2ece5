//! Analysis configuration. A single validated value, built once and shared
//! by reference across a batch: a plain struct, constructed once and never
//! mutated through a global, rather than scattering flags as function
//! parameters or thread locals.

use std::time::Duration;

use crate::error::{Error, Result};

/// Tunable knobs for interpretation and lifting.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// If true, every instruction capable of raising a VM-level exception
    /// (array access, field access, invocations, …) is treated as if it
    /// could throw, regardless of whether the class hierarchy can prove it
    /// can't. Produces a more conservative, less precise CFG.
    pub throw_all_potential_exceptions: bool,
    /// If true, `monitorenter`/`monitorexit` are treated as no-ops for
    /// control-flow purposes (they never throw in this mode).
    pub ignore_synchronization: bool,
    /// If true, the def/use recorder additionally identifies locals that are
    /// written but never read on any path.
    pub identify_dead_variables: bool,
    /// Upper bound on worklist steps, expressed as a multiple of the
    /// method's instruction count. Exceeding it yields
    /// `Error::InterpretationBudgetExhausted`.
    pub max_evaluation_factor: u32,
    /// Wall-clock budget for a single method's interpretation.
    pub max_evaluation_time: Duration,
    /// When set, the interpreter and lifter run their internal
    /// self-consistency checks and return
    /// `Error::InconsistentDefUse`/`Error::CFGInconsistency` on violation,
    /// instead of trusting their own bookkeeping. Expensive; meant for tests
    /// and CI, not production batch runs.
    pub check_invariants: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            throw_all_potential_exceptions: false,
            ignore_synchronization: false,
            identify_dead_variables: false,
            max_evaluation_factor: 100,
            max_evaluation_time: Duration::from_secs(10),
            check_invariants: false,
        }
    }
}

impl Configuration {
    /// Validates the configuration, rejecting combinations that can never
    /// terminate in a useful state (a zero evaluation factor would reject
    /// every method immediately).
    pub fn validate(self) -> Result<Self> {
        if self.max_evaluation_factor == 0 {
            return Err(Error::InvalidConfiguration { reason: "max_evaluation_factor must be at least 1".to_string() });
        }
        if self.max_evaluation_time.is_zero() {
            return Err(Error::InvalidConfiguration { reason: "max_evaluation_time must be non-zero".to_string() });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_validates() {
        assert!(Configuration::default().validate().is_ok());
    }

    #[test]
    fn zero_evaluation_factor_is_rejected() {
        let cfg = Configuration { max_evaluation_factor: 0, ..Configuration::default() };
        assert!(cfg.validate().is_err());
    }
}
