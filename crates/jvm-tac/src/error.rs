//! The crate's error taxonomy. One `thiserror` enum
//! variant per failure kind; every variant that originates mid-analysis
//! carries the method identity and, where applicable, the pc the failure
//! was detected at, so a caller can report something actionable without
//! this crate building its own backtrace facility.

use std::fmt;

use crate::pc::Pc;

/// Identifies the method an error (or a diagnostic) is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct MethodId {
    pub class: crate::types::ClassName,
    pub name: String,
    pub descriptor: crate::types::MethodDescriptor,
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{:?}", self.class, self.name, self.descriptor.parameters)
    }
}

/// The crate's error taxonomy. Every variant is total: this crate never
/// panics on malformed-but-recoverable input, it returns one of these.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("{method}: bytecode processing failed at {pc}: {reason}")]
    BytecodeProcessingFailure { method: MethodId, pc: Pc, reason: String },

    #[error("{method}: interpretation exceeded its wall-clock budget")]
    InterpretationTimeout { method: MethodId },

    #[error("{method}: interpretation exceeded its evaluation-step budget")]
    InterpretationBudgetExhausted { method: MethodId },

    #[error("{method}: def/use tables are inconsistent at {pc}: {reason}")]
    InconsistentDefUse { method: MethodId, pc: Pc, reason: String },

    #[error("{method}: CFG is inconsistent: {reason}")]
    CFGInconsistency { method: MethodId, reason: String },

    #[error("{method}: control-dependence computation exceeded its deadline")]
    ControlDependenceTimeout { method: MethodId },

    #[error("{method}: subroutine at {pc} is not supported: {reason}")]
    SubroutineNotSupported { method: MethodId, pc: Pc, reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

impl Error {
    /// The method this error pertains to, if any (`InvalidConfiguration` is
    /// not about a specific method).
    #[must_use]
    pub const fn method(&self) -> Option<&MethodId> {
        match self {
            Self::BytecodeProcessingFailure { method, .. }
            | Self::InterpretationTimeout { method }
            | Self::InterpretationBudgetExhausted { method }
            | Self::InconsistentDefUse { method, .. }
            | Self::CFGInconsistency { method, .. }
            | Self::ControlDependenceTimeout { method }
            | Self::SubroutineNotSupported { method, .. } => Some(method),
            Self::InvalidConfiguration { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassName, MethodDescriptor};

    fn method() -> MethodId {
        MethodId { class: ClassName::from("Example"), name: "run".to_string(), descriptor: MethodDescriptor { parameters: vec![], return_type: None } }
    }

    #[test]
    fn method_accessor_covers_every_method_scoped_variant() {
        let err = Error::InterpretationTimeout { method: method() };
        assert_eq!(err.method(), Some(&method()));
    }

    #[test]
    fn invalid_configuration_has_no_method() {
        let err = Error::InvalidConfiguration { reason: "x".to_string() };
        assert_eq!(err.method(), None);
    }
}
