//! The external interface surface: the two materialised values a caller
//! actually holds onto, [`AIResult`] and [`TACode`], plus the entrypoint
//! that runs both stages end-to-end over one method.
//!
//! Both types are defined where they are produced — `AIResult` by
//! [`crate::interp`] (it is built incrementally as the fixpoint runs),
//! `TACode` by [`crate::tac`] (it is built in one pass once `AIResult` is
//! frozen) — this module only re-exports them under one name each, and
//! wires the two stages together.

pub use crate::interp::AIResult;
pub use crate::tac::{DVar, Expr, LiftReport, Parameters, Statement, TACode, UVar};

use crate::cancellation::CancellationToken;
use crate::config::Configuration;
use crate::defuse::DefUse;
use crate::domain::value::DomainValue;
use crate::domain::Domain;
use crate::error::{MethodId, Result};
use crate::hierarchy::ClassHierarchy;
use crate::interp::{Interpreter, MethodShape};

/// Runs the interpreter to completion (or budget exhaustion) and, if it
/// reached a true fixpoint, lifts the result to TAC. Soft failures
/// (`InterpretationTimeout`/`InterpretationBudgetExhausted`) are surfaced as
/// `Err` here; a caller wanting the best-effort TAC from an incomplete run
/// should drive [`Interpreter`] and [`crate::tac::lift`] directly instead of
/// going through this convenience entrypoint.
pub fn interpret_and_lift<D: Domain>(
    method: &MethodId,
    domain: &D,
    code: &crate::code::Code,
    shape: &MethodShape<'_>,
    hierarchy: &dyn ClassHierarchy,
    config: &Configuration,
    cancellation: Option<&CancellationToken>,
) -> Result<TACode<D::Value>>
where
    D::Value: DomainValue,
{
    let interpreter = Interpreter::new(domain, code, hierarchy, config);
    let interpretation = interpreter.run(method, shape, cancellation)?;
    let ai_result = interpretation.require_complete(method)?;
    let defuse = DefUse::build(code, &ai_result);
    if config.check_invariants {
        defuse.check_uses_are_justified(method, code, &ai_result)?;
        defuse.check_operands_are_registered(method, code, &ai_result)?;
        defuse.check_domain_origins_agree(method, code, &ai_result)?;
    }
    crate::tac::lift(method, code, shape, &ai_result, &defuse, config).map(|report| report.code)
}
