//! Drives many methods' interpretation and lift concurrently: methods of a
//! project may be analysed in parallel by a fork-join worker pool, since each
//! method's `AIResult` and `TACode` are independent values with no shared
//! mutable state. `rayon`'s work-stealing pool is that scheduler; every
//! per-method computation only ever reads `domain`/`hierarchy`/`config` and
//! writes into its own stack frame, so handing the slice to `par_iter` is
//! the whole implementation.
//!
//! Results aggregate into two logical streams, one for successes and one
//! for failures, realised here as a single
//! `par_iter().map(..).collect::<Vec<Outcome<_>>>()` — rayon's parallel
//! collect *is* the concurrent queue, partitioned into the two streams by
//! [`BatchReport::partition`] once the pool has drained.

use std::time::Instant;

use rayon::prelude::*;

use crate::cancellation::CancellationToken;
use crate::cfg::dominators::Dominators;
use crate::code::Code;
use crate::config::Configuration;
use crate::defuse::DefUse;
use crate::diagnostics::{Outcome, SkipReason, Stats};
use crate::domain::value::DomainValue;
use crate::domain::Domain;
use crate::error::MethodId;
use crate::hierarchy::ClassHierarchy;
use crate::interp::{Interpreter, MethodShape};
use crate::tac::{self, TACode};

/// One method queued for batch analysis. Borrowed, not owned: `code` and
/// `shape` live as long as the caller's resolved class file, since
/// instruction arrays and the class hierarchy are shared, read-only state —
/// nothing here is cloned per task.
pub struct MethodTask<'a> {
    pub method: MethodId,
    pub code: &'a Code,
    pub shape: MethodShape<'a>,
    /// Set when the reader already knows this method has no body to
    /// analyse (`abstract`/`native`); such methods never reach the
    /// interpreter.
    pub skip: Option<SkipReason>,
}

/// The two result streams a batch run produces, already split so a caller
/// doesn't need to `match` every [`Outcome`] itself.
#[derive(Debug, Default)]
pub struct BatchReport<T> {
    pub successes: Vec<(MethodId, Stats, T)>,
    pub skipped: Vec<(MethodId, SkipReason)>,
    pub failures: Vec<(MethodId, crate::error::Error)>,
}

impl<T> BatchReport<T> {
    fn partition(outcomes: Vec<Outcome<T>>) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Success { method, stats, value } => report.successes.push((method, stats, value)),
                Outcome::Skipped { method, reason } => report.skipped.push((method, reason)),
                Outcome::Failed { method, error } => report.failures.push((method, error)),
            }
        }
        report
    }
}

/// Runs interpretation + lift for every task in `tasks`, concurrently.
///
/// `domain`, `hierarchy`, and `config` are shared read-only across the whole
/// batch; `cancellation`, if given, is polled by every in-flight method and
/// is expected to be the *same* token shared across the batch, so
/// cancelling it once stops every method still running, not just one.
pub fn run_batch<D>(tasks: &[MethodTask<'_>], domain: &D, hierarchy: &(dyn ClassHierarchy + Sync), config: &Configuration, cancellation: Option<&CancellationToken>) -> BatchReport<TACode<D::Value>>
where
    D: Domain + Sync,
    D::Value: DomainValue + Send,
{
    let outcomes: Vec<Outcome<TACode<D::Value>>> = tasks.par_iter().map(|task| analyse_one(task, domain, hierarchy, config, cancellation)).collect();
    BatchReport::partition(outcomes)
}

/// Interprets and lifts a single task, producing the [`Outcome`] the batch
/// driver's partitioning step expects. Exposed independently of
/// [`run_batch`] so a caller analysing exactly one method (no pool warm-up
/// needed) can skip straight to it.
pub fn analyse_one<D>(task: &MethodTask<'_>, domain: &D, hierarchy: &(dyn ClassHierarchy + Sync), config: &Configuration, cancellation: Option<&CancellationToken>) -> Outcome<TACode<D::Value>>
where
    D: Domain,
    D::Value: DomainValue,
{
    if let Some(reason) = task.skip {
        return Outcome::Skipped { method: task.method.clone(), reason };
    }

    let interpreter = Interpreter::new(domain, task.code, hierarchy, config);
    let started = Instant::now();
    let interpretation = match interpreter.run(&task.method, &task.shape, cancellation) {
        Ok(i) => i,
        Err(error) => return Outcome::Failed { method: task.method.clone(), error },
    };
    let evaluation_time = started.elapsed();

    let ai_result = match interpretation.require_complete(&task.method) {
        Ok(r) => r,
        Err(error) => return Outcome::Failed { method: task.method.clone(), error },
    };

    let defuse = DefUse::build(task.code, &ai_result);
    if config.check_invariants {
        if let Err(error) = defuse
            .check_uses_are_justified(&task.method, task.code, &ai_result)
            .and_then(|()| defuse.check_operands_are_registered(&task.method, task.code, &ai_result))
            .and_then(|()| defuse.check_domain_origins_agree(&task.method, task.code, &ai_result))
        {
            return Outcome::Failed { method: task.method.clone(), error };
        }
    }

    let identical_origin_value_count = ai_result.operand_origins.values().flatten().filter(|origins| origins.len() == 1).count();

    let dominator_started = Instant::now();
    let _dominators = Dominators::for_cfg(&ai_result.cfg);
    let dominator_time = Some(dominator_started.elapsed());

    match tac::lift(&task.method, task.code, &task.shape, &ai_result, &defuse, config) {
        Ok(report) => Outcome::Success {
            method: task.method.clone(),
            stats: Stats { identical_origin_value_count, evaluation_time, dominator_time, obsolete_use_sites_enqueued: report.obsolete_use_sites_pruned },
            value: report.code,
        },
        Err(error) => Outcome::Failed { method: task.method.clone(), error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::StaticHierarchy;
    use crate::inst::{Instruction as I, InstructionKind as K};
    use crate::pc::Pc;
    use crate::testutil::ConstDomain;
    use crate::types::{ComputationalType as CT, FieldType, MethodDescriptor};

    fn id_code() -> Code {
        Code::new(vec![I { pc: Pc(0), kind: K::Load { ty: CT::Int, slot: 0 } }, I { pc: Pc(1), kind: K::Return(Some(CT::Int)) }], vec![], 1, 1)
    }

    #[test]
    fn batch_of_two_methods_yields_two_successes() {
        let code = id_code();
        let descriptor = MethodDescriptor { parameters: vec![FieldType::Int], return_type: Some(FieldType::Int) };
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let domain = ConstDomain::default();
        let hierarchy = StaticHierarchy::new();
        let config = Configuration::default();

        let method_a = MethodId { class: "Example".into(), name: "a".to_string(), descriptor: descriptor.clone() };
        let method_b = MethodId { class: "Example".into(), name: "b".to_string(), descriptor: descriptor.clone() };
        let tasks = vec![
            MethodTask { method: method_a, code: &code, shape, skip: None },
            MethodTask { method: method_b, code: &code, shape, skip: None },
        ];

        let report = run_batch(&tasks, &domain, &hierarchy, &config, None);
        assert_eq!(report.successes.len(), 2);
        assert!(report.failures.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn skipped_method_never_reaches_the_interpreter() {
        let code = id_code();
        let descriptor = MethodDescriptor { parameters: vec![FieldType::Int], return_type: Some(FieldType::Int) };
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let domain = ConstDomain::default();
        let hierarchy = StaticHierarchy::new();
        let config = Configuration::default();
        let method = MethodId { class: "Example".into(), name: "native_thing".to_string(), descriptor: descriptor.clone() };

        let task = MethodTask { method, code: &code, shape, skip: Some(SkipReason::Native) };
        let outcome = analyse_one(&task, &domain, &hierarchy, &config, None);
        assert!(matches!(outcome, Outcome::Skipped { reason: SkipReason::Native, .. }));
    }
}
