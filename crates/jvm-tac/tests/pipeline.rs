//! End-to-end exercises of the three-stage pipeline (interpret, record
//! def/use, lift to TAC) driven entirely through the crate's public API,
//! mirroring the scenarios a caller wiring up a concrete domain would hit
//! first.

use jvm_tac::code::{Code, ExceptionHandler};
use jvm_tac::config::Configuration;
use jvm_tac::defuse::DefUse;
use jvm_tac::error::MethodId;
use jvm_tac::hierarchy::StaticHierarchy;
use jvm_tac::inst::{ArithOp, CondArity, CondOp, ConstOperand, Instruction as I, InstructionKind as K};
use jvm_tac::interp::{Interpreter, MethodShape};
use jvm_tac::tac::{self, Expr, Statement};
use jvm_tac::testutil::ConstDomain;
use jvm_tac::types::{ComputationalType as CT, FieldType, MethodDescriptor};
use jvm_tac::{Origin, Pc, StmtIndex};

fn run_pipeline(code: &Code, descriptor: &MethodDescriptor, is_static: bool) -> (MethodId, jvm_tac::interp::AIResult<jvm_tac::testutil::Val>, DefUse) {
    let method = MethodId { class: "Example".into(), name: "m".to_string(), descriptor: descriptor.clone() };
    let domain = ConstDomain;
    let hierarchy = StaticHierarchy::new();
    let config = Configuration::default();
    let interp = Interpreter::new(&domain, code, &hierarchy, &config);
    let shape = MethodShape { descriptor, is_static };
    let interpretation = interp.run(&method, &shape, None).unwrap();
    let result = interpretation.require_complete(&method).unwrap();
    let defuse = DefUse::build(code, &result);
    (method, result, defuse)
}

#[test]
fn identity_method_round_trips_its_single_parameter() {
    let descriptor = MethodDescriptor { parameters: vec![FieldType::Int], return_type: Some(FieldType::Int) };
    let code = Code::new(vec![I { pc: Pc(0), kind: K::Load { ty: CT::Int, slot: 0 } }, I { pc: Pc(1), kind: K::Return(Some(CT::Int)) }], vec![], 1, 1);
    let (method, result, defuse) = run_pipeline(&code, &descriptor, true);
    assert!(defuse.check_uses_are_justified(&method, &code, &result).is_ok());
    assert!(defuse.check_operands_are_registered(&method, &code, &result).is_ok());
    assert!(defuse.check_domain_origins_agree(&method, &code, &result).is_ok());

    let shape = MethodShape { descriptor: &descriptor, is_static: true };
    let report = tac::lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();

    assert_eq!(report.code.statements.len(), 1);
    match &report.code.statements[0] {
        Statement::Return(Some(Expr::Var(uvar))) => assert!(uvar.def_sites.contains(&Origin(-1))),
        other => panic!("expected Return(Var), got {other:?}"),
    }
}

#[test]
fn division_by_zero_halts_before_the_return() {
    let descriptor = MethodDescriptor { parameters: vec![], return_type: Some(FieldType::Int) };
    let code = Code::new(
        vec![
            I { pc: Pc(0), kind: K::Const(ConstOperand::Int(1)) },
            I { pc: Pc(1), kind: K::Const(ConstOperand::Int(0)) },
            I { pc: Pc(2), kind: K::Binary { ty: CT::Int, op: ArithOp::Div } },
            I { pc: Pc(3), kind: K::Return(Some(CT::Int)) },
        ],
        vec![],
        0,
        2,
    );
    let (method, result, defuse) = run_pipeline(&code, &descriptor, true);
    assert!(!result.evaluated.contains(&Pc(3)), "the division by zero must not let control reach the return");

    let shape = MethodShape { descriptor: &descriptor, is_static: true };
    let report = tac::lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();
    assert!(report.code.statements.iter().any(|s| matches!(s, Statement::FailingExpr { .. })));
    assert!(!report.code.statements.iter().any(|s| matches!(s, Statement::Return(_))));
}

#[test]
fn caught_exception_is_consumed_directly_by_its_own_rethrow() {
    let descriptor = MethodDescriptor { parameters: vec![], return_type: None };
    let code = Code::new(
        vec![I { pc: Pc(0), kind: K::Const(ConstOperand::Int(1)) }, I { pc: Pc(1), kind: K::AThrow }, I { pc: Pc(4), kind: K::AThrow }],
        vec![ExceptionHandler { start: Pc(0), end: Pc(4), handler: Pc(4), catch_type: None }],
        0,
        1,
    );
    let (method, result, defuse) = run_pipeline(&code, &descriptor, true);
    let shape = MethodShape { descriptor: &descriptor, is_static: true };
    let report = tac::lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();

    let caught_index = report.code.statements.iter().position(|s| matches!(s, Statement::CaughtException { .. })).expect("handler entry synthesizes a caught-exception statement");
    match &report.code.statements[caught_index] {
        Statement::CaughtException { lhs } => assert_eq!(lhs.use_sites.len(), 1, "the caught value's only consumer is its own rethrow"),
        other => panic!("expected CaughtException, got {other:?}"),
    }
}

#[test]
fn degenerate_conditional_collapses_and_prunes_its_dead_operand() {
    let descriptor = MethodDescriptor { parameters: vec![], return_type: None };
    let code = Code::new(
        vec![
            I { pc: Pc(0), kind: K::Const(ConstOperand::Int(1)) },
            I { pc: Pc(1), kind: K::If { op: CondOp::Eq, arity: CondArity::CompareToZero, target: Pc(2) } },
            I { pc: Pc(2), kind: K::Return(None) },
        ],
        vec![],
        0,
        1,
    );
    let (method, result, defuse) = run_pipeline(&code, &descriptor, true);
    let shape = MethodShape { descriptor: &descriptor, is_static: true };
    let report = tac::lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();

    assert_eq!(report.obsolete_use_sites_pruned, 1);
    assert!(!report.code.statements.iter().any(|s| matches!(s, Statement::If { .. })), "both arms land on the same pc so this must lift to Goto");
}

#[test]
fn wide_long_parameter_is_not_double_counted() {
    let descriptor = MethodDescriptor { parameters: vec![FieldType::Long], return_type: Some(FieldType::Long) };
    let code = Code::new(vec![I { pc: Pc(0), kind: K::Load { ty: CT::Long, slot: 0 } }, I { pc: Pc(1), kind: K::Return(Some(CT::Long)) }], vec![], 2, 2);
    let (method, result, defuse) = run_pipeline(&code, &descriptor, true);
    let shape = MethodShape { descriptor: &descriptor, is_static: true };
    let report = tac::lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();

    assert_eq!(report.code.parameters.entries.len(), 1, "the category-two parameter occupies two locals but is one value");
    assert_eq!(report.code.parameters.entries[0].origin, Origin(-1));
}

#[test]
fn tableswitch_targets_remap_from_pcs_to_statement_indices() {
    let descriptor = MethodDescriptor { parameters: vec![FieldType::Int], return_type: None };
    let code = Code::new(
        vec![
            I { pc: Pc(0), kind: K::Load { ty: CT::Int, slot: 0 } },
            I { pc: Pc(1), kind: K::TableSwitch { default: Pc(10), low: 0, targets: vec![Pc(4), Pc(7)] } },
            I { pc: Pc(4), kind: K::Return(None) },
            I { pc: Pc(7), kind: K::Return(None) },
            I { pc: Pc(10), kind: K::Return(None) },
        ],
        vec![],
        1,
        1,
    );
    let (method, result, defuse) = run_pipeline(&code, &descriptor, true);
    let shape = MethodShape { descriptor: &descriptor, is_static: true };
    let report = tac::lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();

    match report.code.statements.iter().find(|s| matches!(s, Statement::TableSwitch { .. })).expect("lifts to a TableSwitch statement") {
        Statement::TableSwitch { targets, default, .. } => {
            for idx in targets.iter().chain(std::iter::once(default)) {
                assert!(idx.as_usize() < report.code.statements.len());
            }
        }
        other => panic!("expected TableSwitch, got {other:?}"),
    }
}

#[test]
fn batch_runs_several_methods_independently() {
    use jvm_tac::batch::{run_batch, MethodTask};

    let descriptor = MethodDescriptor { parameters: vec![FieldType::Int], return_type: Some(FieldType::Int) };
    let identity = Code::new(vec![I { pc: Pc(0), kind: K::Load { ty: CT::Int, slot: 0 } }, I { pc: Pc(1), kind: K::Return(Some(CT::Int)) }], vec![], 1, 1);
    let abstract_method = Code::new(vec![], vec![], 0, 0);

    let m1 = MethodId { class: "Example".into(), name: "id".to_string(), descriptor: descriptor.clone() };
    let m2 = MethodId { class: "Example".into(), name: "skipped".to_string(), descriptor: descriptor.clone() };
    let shape = MethodShape { descriptor: &descriptor, is_static: true };

    let tasks = vec![
        MethodTask { method: m1, code: &identity, shape, skip: None },
        MethodTask { method: m2, code: &abstract_method, shape, skip: Some(jvm_tac::diagnostics::SkipReason::Abstract) },
    ];

    let domain = ConstDomain;
    let hierarchy = StaticHierarchy::new();
    let config = Configuration::default();
    let report = run_batch(&tasks, &domain, &hierarchy, &config, None);

    assert_eq!(report.successes.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.failures.is_empty());
}
