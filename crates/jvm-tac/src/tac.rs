//! The TAC/SSA Lifter: rewrites a frozen [`AIResult`] plus its [`DefUse`]
//! index into three-address code.
//!
//! The lifter makes one forward pass over the evaluated pcs in pc order,
//! emitting one statement per pc that does genuine work (everything that
//! only forwards or rearranges a value — `nop`, the `dup*`/`pop*`/`swap`
//! family, `iload`/`istore` and friends — collapses into the block's shared
//! `Nop`, per the lifter's collapse rule). A second pass then rewrites
//! every forward-looking reference — jump targets, def/use origin sets — from
//! bytecode pcs into statement indices, since a pc can be referenced before
//! its own statement has been emitted (a loop's back edge, or a value used
//! before the defining pc in program order across a merge).
//!
//! This crate does not attempt minimal SSA (phi placement, renaming to a
//! single static assignment per variable): every computed value gets its own
//! [`DVar`], and a use that could have originated at more than one pc — the
//! ordinary case at a CFG merge — carries the full set of candidate origins
//! on its [`UVar`], "nearly SSA" per [`crate::lib`]'s module doc rather than
//! textbook SSA.

use ahash::{AHashMap, AHashSet};
use indexmap::IndexSet;

use crate::cfg::Cfg;
use crate::code::{Code, LineNumberTable};
use crate::config::Configuration;
use crate::defuse::DefUse;
use crate::domain::value::DomainValue;
use crate::error::{Error, MethodId, Result};
use crate::inst::{ArithOp, CompareOp, CondArity, CondOp, ConstOperand, Instruction, InstructionKind, NarrowInt, StackOp};
use crate::interp::{AIResult, LiveStack, MethodShape, OriginSet};
use crate::pc::{Origin, Pc, StmtIndex};
use crate::types::{CallSiteRef, ClassName, ComputationalType, FieldRef, MethodDescriptor, MethodRef, PrimitiveArrayType};

/// A variable with exactly one possible defining statement — the common case,
/// and the only case in a method with no merge points upstream of the use.
#[derive(Debug, Clone)]
pub struct DVar<V> {
    /// The statement that defines this variable. Assigned once, at the
    /// moment the defining statement is pushed, so unlike [`UVar::def_sites`]
    /// this field never needs the lifter's final remap pass.
    pub origin: StmtIndex,
    pub value: V,
    pub use_sites: IndexSet<StmtIndex>,
}

/// A variable whose value could have come from more than one statement —
/// every read reaching a CFG merge point, or a read of a value the domain
/// itself can't pin to a single origin.
#[derive(Debug, Clone)]
pub struct UVar<V> {
    pub value: V,
    pub def_sites: IndexSet<Origin>,
}

/// A TAC expression, recursively built from popped-operand reads
/// ([`Expr::Var`]) and literal operands (`iinc`'s constant addend, for
/// instance, is never itself backed by a def site).
#[derive(Debug, Clone)]
pub enum Expr<V> {
    IntConst(i32),
    LongConst(i64),
    FloatConst(f32),
    DoubleConst(f64),
    StringConst(String),
    ClassConst(ClassName),
    MethodTypeConst(MethodDescriptor),
    MethodHandleConst(u16),
    NullExpr,
    Var(UVar<V>),
    Binary { ty: ComputationalType, op: ArithOp, lhs: Box<Expr<V>>, rhs: Box<Expr<V>> },
    Prefix { ty: ComputationalType, operand: Box<Expr<V>> },
    Convert { from: ComputationalType, to: ComputationalType, operand: Box<Expr<V>> },
    NarrowInt { op: NarrowInt, operand: Box<Expr<V>> },
    InstanceOf { ty: ClassName, operand: Box<Expr<V>> },
    Compare { op: CompareOp, lhs: Box<Expr<V>>, rhs: Box<Expr<V>> },
    New(ClassName),
    NewArray { element: PrimitiveArrayType, length: Box<Expr<V>> },
    ANewArray { element: ClassName, length: Box<Expr<V>> },
    MultiANewArray { element: ClassName, dimensions: Vec<Expr<V>> },
    ArrayLoad { ty: ComputationalType, array: Box<Expr<V>>, index: Box<Expr<V>> },
    ArrayLength { array: Box<Expr<V>> },
    GetField { field: FieldRef, receiver: Box<Expr<V>> },
    GetStatic { field: FieldRef },
    InvokeDynamic { call_site: CallSiteRef, args: Vec<Expr<V>> },
    Call { kind: CallKind, method: MethodRef, receiver: Option<Box<Expr<V>>>, args: Vec<Expr<V>> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CallKind {
    Static,
    Virtual,
    NonVirtual,
    Interface,
}

impl<V: DomainValue> Expr<V> {
    /// The computational type this expression evaluates to, where one
    /// exists — `None` for a void call.
    #[must_use]
    pub fn computational_type(&self) -> Option<ComputationalType> {
        match self {
            Self::IntConst(_) | Self::NarrowInt { .. } | Self::InstanceOf { .. } | Self::Compare { .. } | Self::ArrayLength { .. } => {
                Some(ComputationalType::Int)
            }
            Self::LongConst(_) => Some(ComputationalType::Long),
            Self::FloatConst(_) => Some(ComputationalType::Float),
            Self::DoubleConst(_) => Some(ComputationalType::Double),
            Self::StringConst(_) | Self::ClassConst(_) | Self::MethodTypeConst(_) | Self::MethodHandleConst(_) | Self::NullExpr | Self::New(_) | Self::NewArray { .. } | Self::ANewArray { .. } | Self::MultiANewArray { .. } => {
                Some(ComputationalType::Reference)
            }
            Self::Var(v) => Some(v.value.computational_type()),
            Self::Binary { ty, .. } | Self::Prefix { ty, .. } | Self::ArrayLoad { ty, .. } => Some(*ty),
            Self::Convert { to, .. } => Some(*to),
            Self::GetField { field, .. } | Self::GetStatic { field } => Some(field.field_type.computational_type()),
            Self::InvokeDynamic { call_site, .. } => call_site.descriptor.return_type.as_ref().map(crate::types::FieldType::computational_type),
            Self::Call { method, .. } => method.descriptor.return_type.as_ref().map(crate::types::FieldType::computational_type),
        }
    }
}

/// One TAC statement. Indices (`StmtIndex`) in every field are final — the
/// lifter's remap pass has already run by the time a caller sees a
/// [`TACode`].
#[derive(Debug, Clone)]
pub enum Statement<V> {
    Nop,
    Assignment { lhs: DVar<V>, expr: Expr<V> },
    ExprStmt { expr: Expr<V> },
    /// An expression whose evaluation the interpreter proved never completes
    /// normally at this pc (the classic division-by-zero scenario): no
    /// `DVar` is minted since there is no value to hold.
    FailingExpr { expr: Expr<V> },
    /// The implicit throwable a handler block receives on entry, synthesized
    /// ahead of the handler's first real instruction.
    CaughtException { lhs: DVar<V> },
    If { op: CondOp, lhs: Expr<V>, rhs: Expr<V>, target: StmtIndex },
    Goto { target: StmtIndex },
    TableSwitch { key: Expr<V>, low: i32, targets: Vec<StmtIndex>, default: StmtIndex },
    LookupSwitch { key: Expr<V>, pairs: Vec<(i32, StmtIndex)>, default: StmtIndex },
    JumpToSubroutine { target: StmtIndex },
    /// `ret`'s successors are whatever the interpreter's subroutine-aware
    /// worklist actually reached from here; empty when the CFG (built from
    /// raw `regular_successors`, which doesn't model `jsr`/`ret` linking) has
    /// no recorded edge for this pc.
    Ret { slot: u16, successors: Vec<StmtIndex> },
    Return(Option<Expr<V>>),
    Throw { expr: Expr<V> },
    ArrayStore { ty: ComputationalType, array: Expr<V>, index: Expr<V>, value: Expr<V> },
    PutField { field: FieldRef, receiver: Expr<V>, value: Expr<V> },
    PutStatic { field: FieldRef, value: Expr<V> },
    MonitorEnter(Expr<V>),
    MonitorExit(Expr<V>),
    /// `checkcast` never mints a new `DVar` — the checked value keeps the
    /// origin it already had, exactly like `iload`'s propagate rule — but
    /// the runtime assertion is still a real statement since it can throw.
    Checkcast { ty: ClassName, value: Expr<V> },
}

/// One declared parameter (or the receiver), carrying the normalized TAC
/// origin (`-1, -2, -3, …` regardless of category, unlike the AI-level
/// numbering's slot-width skip).
#[derive(Debug, Clone)]
pub struct Parameter<V> {
    pub origin: Origin,
    pub value: V,
    pub use_sites: IndexSet<StmtIndex>,
}

#[derive(Debug, Clone, Default)]
pub struct Parameters<V> {
    pub entries: Vec<Parameter<V>>,
}

/// The CFG, reindexed from pcs to statement indices.
#[derive(Debug, Clone, Default)]
pub struct IndexCfg {
    pub successors: AHashMap<StmtIndex, Vec<StmtIndex>>,
    pub predecessors: AHashMap<StmtIndex, Vec<StmtIndex>>,
    pub entry: StmtIndex,
}

#[derive(Debug, Clone)]
pub struct IndexHandler {
    pub start: StmtIndex,
    pub end: StmtIndex,
    pub handler: StmtIndex,
    pub catch_type: Option<ClassName>,
}

/// The lifted method body: a method's three-address code, ready for
/// pretty-printing or further optimisation passes.
#[derive(Debug, Clone)]
pub struct TACode<V> {
    pub parameters: Parameters<V>,
    pub statements: Vec<Statement<V>>,
    pub cfg: IndexCfg,
    pub handlers: Vec<IndexHandler>,
    /// Carried through from [`Code::line_numbers`] unchanged — the table is
    /// still pc-indexed (line numbers are a source-code concern, keyed to
    /// the original bytecode offsets, not to the collapsed statement
    /// indices this lift pass produces).
    pub line_numbers: Option<LineNumberTable>,
}

impl<V> TACode<V> {
    /// Every `DVar` with no recorded use site — dead in the SSA sense
    /// (nothing downstream reads the value it defines), computed on demand
    /// from the finished statement list. This is independent of
    /// `Configuration::identify_dead_variables`, which drives a separate,
    /// liveness-based identification of dead *local slots* for stack-map
    /// table minimisation — see [`crate::interp::AIResult::dead_local_stores`]
    /// and [`crate::liveness::LiveVariables`].
    #[must_use]
    pub fn dead_variables(&self) -> Vec<StmtIndex> {
        self.statements
            .iter()
            .filter_map(|stmt| match stmt {
                Statement::Assignment { lhs, .. } | Statement::CaughtException { lhs } if lhs.use_sites.is_empty() => Some(lhs.origin),
                _ => None,
            })
            .collect()
    }
}

/// Returned by [`lift`]; `obsolete_use_sites_pruned` feeds
/// [`crate::diagnostics::Stats`].
#[derive(Debug, Clone)]
pub struct LiftReport<V> {
    pub code: TACode<V>,
    pub obsolete_use_sites_pruned: usize,
}

struct Shape<'s, V>(&'s [V]);

impl<V: DomainValue> crate::inst::StackShape for Shape<'_, V> {
    fn category_at(&self, depth: usize) -> crate::types::Category {
        self.0[depth].computational_type().category()
    }
}

/// Lifts one method's frozen interpretation to TAC.
pub fn lift<V: DomainValue>(
    method: &MethodId,
    code: &Code,
    shape: &MethodShape<'_>,
    result: &AIResult<V>,
    defuse: &DefUse,
    _config: &Configuration,
) -> Result<LiftReport<V>> {
    let mut pcs: Vec<Pc> = result.evaluated.iter().copied().collect();
    pcs.sort_unstable();

    let param_map = build_parameter_origin_map(shape);
    let obsolete = find_obsolete_use_sites(code, result, &pcs);

    let mut statements: Vec<Statement<V>> = Vec::with_capacity(pcs.len());
    let mut pc_to_index: AHashMap<Pc, StmtIndex> = AHashMap::default();
    let mut last_index: Option<StmtIndex> = None;
    // Collapsible pcs seen before any real statement has been emitted (only
    // possible at the very start of a method, or of an unreachable prefix):
    // there is no prior index to collapse into yet, so resolve them forward
    // to whichever real statement ends up being emitted next.
    let mut pending: Vec<Pc> = Vec::new();
    // A handler-entry pc hosts two translations at once: the synthetic
    // `CaughtException` def-site and whatever the handler's own first
    // bytecode instruction lifts to. `pc_to_index` keeps the latter (so
    // jump-target remap keeps working); this side table remembers the
    // former so origin remap and handler-range remap can still reach it.
    let mut added_handler_stmts: AHashMap<Pc, StmtIndex> = AHashMap::default();

    for &pc in &pcs {
        let inst = code.instruction_at(pc).ok_or_else(|| bytecode_failure(method, pc, "evaluated pc has no instruction"))?;
        let handler_entry = result.cfg.block_of(pc).is_some_and(|b| b.is_handler_entry && b.start == pc);
        // A collapsible pc only needs its own anchor statement when it's an
        // actual merge/jump target: something other than straight-line fall
        // from the pc just emitted reaches it. A method's entry pc is
        // structurally "start of block" too, but nothing branches to it, so
        // it collapses like any other interior instruction (scenario 1).
        let is_jump_target = !handler_entry && !result.cfg.predecessors_of(pc).is_empty();

        if handler_entry {
            let value = result.operands.get(&pc).and_then(|ops| ops.first()).cloned().ok_or_else(|| bytecode_failure(method, pc, "handler entry has no implicit operand"))?;
            let origin = Origin::of_pc(pc);
            let use_sites = raw_use_sites(origin, defuse, &obsolete);
            let new_index = StmtIndex(statements.len() as u32);
            for p in pending.drain(..) {
                pc_to_index.insert(p, new_index);
            }
            statements.push(Statement::CaughtException { lhs: DVar { origin: new_index, value, use_sites } });
            added_handler_stmts.insert(pc, new_index);
            last_index = Some(new_index);
        }

        let operands = result.operands.get(&pc).cloned().unwrap_or_default();
        let operand_origins = result.operand_origins.get(&pc).cloned().unwrap_or_default();
        let locals = result.locals.get(&pc).cloned().unwrap_or_default();
        let local_origins = result.local_origins.get(&pc).cloned().unwrap_or_default();

        let collapses = matches!(inst.kind, InstructionKind::Nop | InstructionKind::Stack(_) | InstructionKind::Load { .. } | InstructionKind::Store { .. });
        if collapses {
            if is_jump_target {
                let new_index = StmtIndex(statements.len() as u32);
                for p in pending.drain(..) {
                    pc_to_index.insert(p, new_index);
                }
                statements.push(Statement::Nop);
                last_index = Some(new_index);
                pc_to_index.insert(pc, new_index);
            } else if let Some(li) = last_index {
                pc_to_index.insert(pc, li);
            } else {
                pending.push(pc);
            }
            continue;
        }

        let new_index = StmtIndex(statements.len() as u32);
        for p in pending.drain(..) {
            pc_to_index.insert(p, new_index);
        }
        let emitted = emit_statement(method, code, inst, pc, &operands, &operand_origins, &locals, &local_origins, result, defuse, &obsolete, &param_map)?;
        statements.push(emitted);
        pc_to_index.insert(pc, new_index);
        last_index = Some(new_index);
    }

    if let Some(&stray) = pending.first() {
        return Err(bytecode_failure(method, stray, "method ends in stack-management instructions with no anchoring statement"));
    }

    for stmt in &mut statements {
        remap_statement(stmt, &pc_to_index, &added_handler_stmts);
    }

    let parameters = build_parameters(method, code, shape, result, defuse, &obsolete, &param_map, &pc_to_index)?;
    let cfg = build_index_cfg(&result.cfg, &pc_to_index);
    let handlers = build_index_handlers(code, &pc_to_index, &added_handler_stmts, statements.len());

    let line_numbers = code.line_numbers.clone();
    Ok(LiftReport { code: TACode { parameters, statements, cfg, handlers, line_numbers }, obsolete_use_sites_pruned: obsolete.len() })
}

fn bytecode_failure(method: &MethodId, pc: Pc, reason: impl Into<String>) -> Error {
    Error::BytecodeProcessingFailure { method: method.clone(), pc, reason: reason.into() }
}

/// Maps each declared parameter's AI-level origin (slot-width-skipping) to
/// its TAC-level origin (consecutive regardless of category). The receiver,
/// when present, is already `-1` on both sides and never needs an entry.
fn build_parameter_origin_map(shape: &MethodShape<'_>) -> AHashMap<Origin, Origin> {
    let mut map = AHashMap::default();
    let first_param_origin: i32 = if shape.is_static { -1 } else { -2 };
    let mut consumed_before = 0i32;
    for (i, param_ty) in shape.descriptor.parameters.iter().enumerate() {
        let ai_origin = Origin::parameter(first_param_origin, consumed_before);
        let tac_origin = Origin(first_param_origin - i as i32);
        map.insert(ai_origin, tac_origin);
        consumed_before += i32::from(param_ty.operand_size());
    }
    map
}

fn normalize_origin(origin: Origin, param_map: &AHashMap<Origin, Origin>) -> Origin {
    param_map.get(&origin).copied().unwrap_or(origin)
}

/// A degenerate conditional (both branches coincide) collapses to an
/// unconditional `Goto`; the popped condition operand(s) are
/// no longer used anywhere, so their origins' `usedBy` entries for this pc
/// are obsolete and must not be carried into the lifted `UVar`/`DVar` use
/// sites.
fn find_obsolete_use_sites<V: DomainValue>(code: &Code, result: &AIResult<V>, pcs: &[Pc]) -> AHashSet<(Origin, Pc)> {
    let mut obsolete = AHashSet::default();
    for &pc in pcs {
        let Some(inst) = code.instruction_at(pc) else { continue };
        if !matches!(inst.kind, InstructionKind::If { .. }) {
            continue;
        }
        if result.cfg.successors_of(pc).len() > 1 {
            continue;
        }
        let Some(operands) = result.operands.get(&pc) else { continue };
        let Some(operand_origins) = result.operand_origins.get(&pc) else { continue };
        let shape = Shape(operands.as_slice());
        let pop_n = inst.pop_count(&shape);
        for origins in operand_origins.iter().take(pop_n) {
            for &origin in origins {
                obsolete.insert((origin, pc));
            }
        }
    }
    obsolete
}

fn raw_use_sites(origin: Origin, defuse: &DefUse, obsolete: &AHashSet<(Origin, Pc)>) -> IndexSet<StmtIndex> {
    defuse
        .used_by(origin)
        .map(|users| users.iter().filter(|&&pc| !obsolete.contains(&(origin, pc))).map(|&pc| StmtIndex(pc.0)).collect())
        .unwrap_or_default()
}

fn to_var_expr<V: DomainValue>(value: &V, origins: &OriginSet, param_map: &AHashMap<Origin, Origin>) -> Expr<V> {
    let def_sites = origins.iter().map(|&o| normalize_origin(o, param_map)).collect();
    Expr::Var(UVar { value: value.clone(), def_sites })
}

#[allow(clippy::too_many_arguments)]
fn emit_statement<V: DomainValue>(
    method: &MethodId,
    code: &Code,
    inst: &Instruction,
    pc: Pc,
    operands: &[V],
    operand_origins: &[OriginSet],
    locals: &[V],
    local_origins: &[Option<OriginSet>],
    result: &AIResult<V>,
    defuse: &DefUse,
    obsolete: &AHashSet<(Origin, Pc)>,
    param_map: &AHashMap<Origin, Origin>,
) -> Result<Statement<V>> {
    let shape = Shape(operands);
    let pop_n = inst.pop_count(&shape);
    let pop = |k: usize| to_var_expr(&operands[k], &operand_origins[k], param_map);

    let regular = inst.regular_successors(code.next_pc(pc));
    let always_raises = !regular.is_empty() && regular.iter().all(|s| !result.cfg.successors_of(pc).contains(s));

    let def = |pushed: V| -> DVar<V> {
        let origin = Origin::of_pc(pc);
        DVar { origin: StmtIndex(pc.0), value: pushed, use_sites: raw_use_sites(origin, defuse, obsolete) }
    };
    let as_value = |expr: Expr<V>, pushed: Option<V>| -> Statement<V> {
        if always_raises {
            Statement::FailingExpr { expr }
        } else if let Some(pushed) = pushed {
            Statement::Assignment { lhs: def(pushed), expr }
        } else {
            Statement::ExprStmt { expr }
        }
    };
    let pushed_value = || -> Option<V> { result.operands.get(&code.next_pc(pc).unwrap_or(pc)).and_then(|v| v.first()).cloned() };

    let stmt = match &inst.kind {
        InstructionKind::Const(c) => as_value(const_expr(c), pushed_value()),
        InstructionKind::IInc { slot, delta } => {
            let prior = local_origins.get(*slot as usize).cloned().flatten().unwrap_or_default();
            let lhs_expr = to_var_expr(&locals[*slot as usize], &prior, param_map);
            let expr = Expr::Binary { ty: ComputationalType::Int, op: ArithOp::Add, lhs: Box::new(lhs_expr), rhs: Box::new(Expr::IntConst(*delta)) };
            Statement::Assignment { lhs: def_at_local(pc, defuse, obsolete, locals, *slot), expr }
        }
        InstructionKind::Binary { ty, op } => {
            let expr = Expr::Binary { ty: *ty, op: *op, lhs: Box::new(pop(1)), rhs: Box::new(pop(0)) };
            as_value(expr, pushed_value())
        }
        InstructionKind::Neg { ty } => as_value(Expr::Prefix { ty: *ty, operand: Box::new(pop(0)) }, pushed_value()),
        InstructionKind::Convert { from, to } => as_value(Expr::Convert { from: *from, to: *to, operand: Box::new(pop(0)) }, pushed_value()),
        InstructionKind::NarrowInt(op) => as_value(Expr::NarrowInt { op: *op, operand: Box::new(pop(0)) }, pushed_value()),
        InstructionKind::Compare(op) => {
            let expr = Expr::Compare { op: *op, lhs: Box::new(pop(1)), rhs: Box::new(pop(0)) };
            as_value(expr, pushed_value())
        }
        InstructionKind::InstanceOf(ty) => as_value(Expr::InstanceOf { ty: ty.clone(), operand: Box::new(pop(0)) }, pushed_value()),
        InstructionKind::ArrayLength => as_value(Expr::ArrayLength { array: Box::new(pop(0)) }, pushed_value()),
        InstructionKind::ArrayLoad { ty } => {
            let expr = Expr::ArrayLoad { ty: *ty, array: Box::new(pop(1)), index: Box::new(pop(0)) };
            as_value(expr, pushed_value())
        }
        InstructionKind::ArrayStore { ty } => Statement::ArrayStore { ty: *ty, array: pop(2), index: pop(1), value: pop(0) },
        InstructionKind::GetField(field) => as_value(Expr::GetField { field: field.clone(), receiver: Box::new(pop(0)) }, pushed_value()),
        InstructionKind::GetStatic(field) => as_value(Expr::GetStatic { field: field.clone() }, pushed_value()),
        InstructionKind::PutField(field) => Statement::PutField { field: field.clone(), receiver: pop(1), value: pop(0) },
        InstructionKind::PutStatic(field) => Statement::PutStatic { field: field.clone(), value: pop(0) },
        InstructionKind::New(name) => as_value(Expr::New(name.clone()), pushed_value()),
        InstructionKind::NewArray(ty) => as_value(Expr::NewArray { element: *ty, length: Box::new(pop(0)) }, pushed_value()),
        InstructionKind::ANewArray(name) => as_value(Expr::ANewArray { element: name.clone(), length: Box::new(pop(0)) }, pushed_value()),
        InstructionKind::MultiANewArray { element, dimensions } => {
            let dims = (0..*dimensions as usize).rev().map(&pop).collect();
            as_value(Expr::MultiANewArray { element: element.clone(), dimensions: dims }, pushed_value())
        }
        InstructionKind::CheckCast(ty) => Statement::Checkcast { ty: ty.clone(), value: pop(0) },
        InstructionKind::MonitorEnter => Statement::MonitorEnter(pop(0)),
        InstructionKind::MonitorExit => Statement::MonitorExit(pop(0)),
        InstructionKind::AThrow => Statement::Throw { expr: pop(0) },
        InstructionKind::Return(ty) => Statement::Return(ty.map(|_| pop(0))),
        InstructionKind::If { op, arity, target } => {
            if result.cfg.successors_of(pc).len() <= 1 {
                let only = result.cfg.successors_of(pc).first().copied().unwrap_or(*target);
                Statement::Goto { target: StmtIndex(only.0) }
            } else {
                let lhs = pop(pop_n - 1);
                let rhs = match arity {
                    CondArity::CompareToOperand => pop(0),
                    CondArity::CompareToZero => match operands[0].computational_type() {
                        ComputationalType::Reference => Expr::NullExpr,
                        _ => Expr::IntConst(0),
                    },
                };
                Statement::If { op: *op, lhs, rhs, target: StmtIndex(target.0) }
            }
        }
        InstructionKind::Goto { target } => Statement::Goto { target: StmtIndex(target.0) },
        InstructionKind::Jsr { target } => Statement::JumpToSubroutine { target: StmtIndex(target.0) },
        InstructionKind::Ret { slot } => {
            let successors = result.cfg.successors_of(pc).iter().map(|s| StmtIndex(s.0)).collect();
            Statement::Ret { slot: *slot, successors }
        }
        InstructionKind::TableSwitch { default, low, targets } => {
            let targets = targets.iter().map(|t| StmtIndex(t.0)).collect();
            Statement::TableSwitch { key: pop(0), low: *low, targets, default: StmtIndex(default.0) }
        }
        InstructionKind::LookupSwitch { default, pairs } => {
            let pairs = pairs.iter().map(|(k, t)| (*k, StmtIndex(t.0))).collect();
            Statement::LookupSwitch { key: pop(0), pairs, default: StmtIndex(default.0) }
        }
        InstructionKind::InvokeStatic(m) => invoke(CallKind::Static, m, operands, operand_origins, false, param_map, &as_value, pushed_value()),
        InstructionKind::InvokeVirtual(m) => invoke(CallKind::Virtual, m, operands, operand_origins, true, param_map, &as_value, pushed_value()),
        InstructionKind::InvokeSpecial(m) => invoke(CallKind::NonVirtual, m, operands, operand_origins, true, param_map, &as_value, pushed_value()),
        InstructionKind::InvokeInterface { method, .. } => invoke(CallKind::Interface, method, operands, operand_origins, true, param_map, &as_value, pushed_value()),
        InstructionKind::InvokeDynamic(call_site) => {
            let param_count = call_site.descriptor.parameter_count();
            let args = (0..param_count).rev().map(&pop).collect();
            as_value(Expr::InvokeDynamic { call_site: call_site.clone(), args }, pushed_value())
        }
        InstructionKind::Nop | InstructionKind::Stack(_) | InstructionKind::Load { .. } | InstructionKind::Store { .. } => {
            return Err(bytecode_failure(method, pc, "collapsible instruction reached emit_statement"));
        }
    };
    Ok(stmt)
}

#[allow(clippy::too_many_arguments)]
fn invoke<V: DomainValue>(
    kind: CallKind,
    method: &MethodRef,
    operands: &[V],
    operand_origins: &[OriginSet],
    has_receiver: bool,
    param_map: &AHashMap<Origin, Origin>,
    as_value: &dyn Fn(Expr<V>, Option<V>) -> Statement<V>,
    pushed: Option<V>,
) -> Statement<V> {
    let param_count = method.descriptor.parameter_count();
    let args: Vec<Expr<V>> = (0..param_count).rev().map(|i| to_var_expr(&operands[i], &operand_origins[i], param_map)).collect();
    let receiver = has_receiver.then(|| Box::new(to_var_expr(&operands[param_count], &operand_origins[param_count], param_map)));
    as_value(Expr::Call { kind, method: method.clone(), receiver, args }, pushed)
}

fn def_at_local<V: Clone>(pc: Pc, defuse: &DefUse, obsolete: &AHashSet<(Origin, Pc)>, locals: &[V], slot: u16) -> DVar<V> {
    let origin = Origin::of_pc(pc);
    DVar { origin: StmtIndex(pc.0), value: locals[slot as usize].clone(), use_sites: raw_use_sites(origin, defuse, obsolete) }
}

fn const_expr<V>(c: &ConstOperand) -> Expr<V> {
    match c {
        ConstOperand::Int(v) => Expr::IntConst(*v),
        ConstOperand::Long(v) => Expr::LongConst(*v),
        ConstOperand::Float(v) => Expr::FloatConst(*v),
        ConstOperand::Double(v) => Expr::DoubleConst(*v),
        ConstOperand::String(s) => Expr::StringConst(s.clone()),
        ConstOperand::Class(name) => Expr::ClassConst(name.clone()),
        ConstOperand::MethodType(d) => Expr::MethodTypeConst(d.clone()),
        ConstOperand::MethodHandle(idx) => Expr::MethodHandleConst(*idx),
        ConstOperand::Null => Expr::NullExpr,
    }
}

fn remap_target(raw: StmtIndex, pc_to_index: &AHashMap<Pc, StmtIndex>) -> StmtIndex {
    pc_to_index.get(&Pc(raw.0)).copied().unwrap_or(raw)
}

/// A plain (non-VM-level, non-handler) pc origin remaps to whichever
/// statement a handler-entry CaughtException shadows — so a read of the
/// caught throwable traces to the synthetic def site, not past it to the
/// handler's own first bytecode instruction sharing that pc.
fn remap_origin(origin: Origin, pc_to_index: &AHashMap<Pc, StmtIndex>, added_handler_stmts: &AHashMap<Pc, StmtIndex>) -> Origin {
    if origin.is_vm_level() {
        let causing = origin.pc_of_vm_level().expect("checked is_vm_level above");
        let remapped = added_handler_stmts.get(&causing).copied().unwrap_or_else(|| remap_target(StmtIndex(causing.0), pc_to_index));
        Origin::vm_level(Pc(remapped.0))
    } else if origin.is_pc() {
        let pc = Pc(origin.0 as u32);
        let remapped = added_handler_stmts.get(&pc).copied().unwrap_or_else(|| remap_target(StmtIndex(pc.0), pc_to_index));
        Origin(remapped.0 as i32)
    } else {
        origin
    }
}

/// A caught throwable that's consumed by the very bytecode instruction
/// sharing its handler-entry pc (an immediate `astore`, say) remaps to a
/// self-reference: the `CaughtException` and its only use both land on the
/// same collapsed statement index. Bumping that one use site by one step
/// points it at the first statement after the def, matching §4.6/§9.3.
fn remap_dvar<V>(dvar: &mut DVar<V>, pc_to_index: &AHashMap<Pc, StmtIndex>) {
    dvar.use_sites = dvar
        .use_sites
        .iter()
        .map(|&si| {
            let remapped = remap_target(si, pc_to_index);
            if remapped == dvar.origin {
                StmtIndex(remapped.0 + 1)
            } else {
                remapped
            }
        })
        .collect();
}

fn remap_uvar<V>(uvar: &mut UVar<V>, pc_to_index: &AHashMap<Pc, StmtIndex>, added_handler_stmts: &AHashMap<Pc, StmtIndex>) {
    uvar.def_sites = uvar.def_sites.iter().map(|&o| remap_origin(o, pc_to_index, added_handler_stmts)).collect();
}

fn remap_expr<V>(expr: &mut Expr<V>, pc_to_index: &AHashMap<Pc, StmtIndex>, added_handler_stmts: &AHashMap<Pc, StmtIndex>) {
    match expr {
        Expr::Var(uvar) => remap_uvar(uvar, pc_to_index, added_handler_stmts),
        Expr::Binary { lhs, rhs, .. } | Expr::Compare { lhs, rhs, .. } => {
            remap_expr(lhs, pc_to_index, added_handler_stmts);
            remap_expr(rhs, pc_to_index, added_handler_stmts);
        }
        Expr::Prefix { operand, .. }
        | Expr::Convert { operand, .. }
        | Expr::NarrowInt { operand, .. }
        | Expr::InstanceOf { operand, .. }
        | Expr::ArrayLength { array: operand }
        | Expr::NewArray { length: operand, .. }
        | Expr::ANewArray { length: operand, .. } => remap_expr(operand, pc_to_index, added_handler_stmts),
        Expr::ArrayLoad { array, index, .. } => {
            remap_expr(array, pc_to_index, added_handler_stmts);
            remap_expr(index, pc_to_index, added_handler_stmts);
        }
        Expr::GetField { receiver, .. } => remap_expr(receiver, pc_to_index, added_handler_stmts),
        Expr::MultiANewArray { dimensions, .. } => dimensions.iter_mut().for_each(|d| remap_expr(d, pc_to_index, added_handler_stmts)),
        Expr::InvokeDynamic { args, .. } => args.iter_mut().for_each(|a| remap_expr(a, pc_to_index, added_handler_stmts)),
        Expr::Call { receiver, args, .. } => {
            if let Some(r) = receiver {
                remap_expr(r, pc_to_index, added_handler_stmts);
            }
            args.iter_mut().for_each(|a| remap_expr(a, pc_to_index, added_handler_stmts));
        }
        Expr::IntConst(_)
        | Expr::LongConst(_)
        | Expr::FloatConst(_)
        | Expr::DoubleConst(_)
        | Expr::StringConst(_)
        | Expr::ClassConst(_)
        | Expr::MethodTypeConst(_)
        | Expr::MethodHandleConst(_)
        | Expr::NullExpr
        | Expr::New(_)
        | Expr::GetStatic { .. } => {}
    }
}

fn remap_statement<V>(stmt: &mut Statement<V>, pc_to_index: &AHashMap<Pc, StmtIndex>, added_handler_stmts: &AHashMap<Pc, StmtIndex>) {
    match stmt {
        Statement::Nop => {}
        Statement::Assignment { lhs, expr } => {
            remap_dvar(lhs, pc_to_index);
            remap_expr(expr, pc_to_index, added_handler_stmts);
        }
        Statement::ExprStmt { expr } | Statement::FailingExpr { expr } => remap_expr(expr, pc_to_index, added_handler_stmts),
        Statement::CaughtException { lhs } => remap_dvar(lhs, pc_to_index),
        Statement::If { lhs, rhs, target, .. } => {
            remap_expr(lhs, pc_to_index, added_handler_stmts);
            remap_expr(rhs, pc_to_index, added_handler_stmts);
            *target = remap_target(*target, pc_to_index);
        }
        Statement::Goto { target } | Statement::JumpToSubroutine { target } => *target = remap_target(*target, pc_to_index),
        Statement::TableSwitch { key, targets, default, .. } => {
            remap_expr(key, pc_to_index, added_handler_stmts);
            targets.iter_mut().for_each(|t| *t = remap_target(*t, pc_to_index));
            *default = remap_target(*default, pc_to_index);
        }
        Statement::LookupSwitch { key, pairs, default, .. } => {
            remap_expr(key, pc_to_index, added_handler_stmts);
            pairs.iter_mut().for_each(|(_, t)| *t = remap_target(*t, pc_to_index));
            *default = remap_target(*default, pc_to_index);
        }
        Statement::Ret { successors, .. } => successors.iter_mut().for_each(|s| *s = remap_target(*s, pc_to_index)),
        Statement::Return(expr) => {
            if let Some(e) = expr {
                remap_expr(e, pc_to_index, added_handler_stmts);
            }
        }
        Statement::Throw { expr } | Statement::MonitorEnter(expr) | Statement::MonitorExit(expr) | Statement::Checkcast { value: expr, .. } => remap_expr(expr, pc_to_index, added_handler_stmts),
        Statement::ArrayStore { array, index, value, .. } => {
            remap_expr(array, pc_to_index, added_handler_stmts);
            remap_expr(index, pc_to_index, added_handler_stmts);
            remap_expr(value, pc_to_index, added_handler_stmts);
        }
        Statement::PutField { receiver, value, .. } => {
            remap_expr(receiver, pc_to_index, added_handler_stmts);
            remap_expr(value, pc_to_index, added_handler_stmts);
        }
        Statement::PutStatic { value, .. } => remap_expr(value, pc_to_index, added_handler_stmts),
    }
}

fn build_parameters<V: DomainValue>(
    method: &MethodId,
    code: &Code,
    shape: &MethodShape<'_>,
    result: &AIResult<V>,
    defuse: &DefUse,
    obsolete: &AHashSet<(Origin, Pc)>,
    param_map: &AHashMap<Origin, Origin>,
    pc_to_index: &AHashMap<Pc, StmtIndex>,
) -> Result<Parameters<V>> {
    let entry = code.entry_point().ok_or_else(|| bytecode_failure(method, Pc(0), "method has no instructions"))?;
    let locals_at_entry = result.locals.get(&entry).ok_or_else(|| bytecode_failure(method, entry, "entry pc was never evaluated"))?;
    let remap_use_sites = |sites: IndexSet<StmtIndex>| -> IndexSet<StmtIndex> { sites.iter().map(|&si| remap_target(si, pc_to_index)).collect() };

    let mut entries = Vec::new();
    let mut slot = 0usize;
    if !shape.is_static {
        let origin = Origin::receiver();
        entries.push(Parameter { origin, value: locals_at_entry[0].clone(), use_sites: remap_use_sites(raw_use_sites(origin, defuse, obsolete)) });
        slot = 1;
    }
    let first_param_origin: i32 = if shape.is_static { -1 } else { -2 };
    let mut consumed_before = 0i32;
    for param_ty in &shape.descriptor.parameters {
        let ai_origin = Origin::parameter(first_param_origin, consumed_before);
        let tac_origin = normalize_origin(ai_origin, param_map);
        let value = locals_at_entry.get(slot).cloned().ok_or_else(|| bytecode_failure(method, entry, "locals table shorter than descriptor"))?;
        entries.push(Parameter { origin: tac_origin, value, use_sites: remap_use_sites(raw_use_sites(ai_origin, defuse, obsolete)) });
        consumed_before += i32::from(param_ty.operand_size());
        slot += param_ty.operand_size() as usize;
    }

    Ok(Parameters { entries })
}

fn build_index_cfg(cfg: &Cfg, pc_to_index: &AHashMap<Pc, StmtIndex>) -> IndexCfg {
    let mut successors: AHashMap<StmtIndex, Vec<StmtIndex>> = AHashMap::default();
    let mut predecessors: AHashMap<StmtIndex, Vec<StmtIndex>> = AHashMap::default();
    for &pc in pc_to_index.keys() {
        let Some(&from) = pc_to_index.get(&pc) else { continue };
        for &succ in cfg.successors_of(pc) {
            let Some(&to) = pc_to_index.get(&succ) else { continue };
            if from == to {
                continue;
            }
            let outs = successors.entry(from).or_default();
            if !outs.contains(&to) {
                outs.push(to);
            }
            let ins = predecessors.entry(to).or_default();
            if !ins.contains(&from) {
                ins.push(from);
            }
        }
    }
    let entry = pc_to_index.get(&cfg.entry).copied().unwrap_or(StmtIndex(0));
    IndexCfg { successors, predecessors, entry }
}

fn build_index_handlers(code: &Code, pc_to_index: &AHashMap<Pc, StmtIndex>, added_handler_stmts: &AHashMap<Pc, StmtIndex>, total: usize) -> Vec<IndexHandler> {
    code.exception_handlers
        .iter()
        .filter_map(|h| {
            // The handler's pc hosts the synthetic `CaughtException` first,
            // when one was added; that, not the instruction translated at
            // the same pc, is where the handler block actually begins.
            let handler = added_handler_stmts.get(&h.handler).copied().or_else(|| pc_to_index.get(&h.handler).copied())?;
            let start = pc_to_index.get(&h.start).copied().unwrap_or(StmtIndex(0));
            let end = pc_to_index.get(&h.end).copied().unwrap_or(StmtIndex(total as u32));
            Some(IndexHandler { start, end, handler, catch_type: h.catch_type.clone() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Code, ExceptionHandler};
    use crate::config::Configuration;
    use crate::defuse::DefUse;
    use crate::error::MethodId;
    use crate::hierarchy::StaticHierarchy;
    use crate::inst::{CondArity, CondOp, Instruction as I, InstructionKind as K};
    use crate::interp::{Interpreter, MethodShape};
    use crate::testutil::ConstDomain;
    use crate::types::{ComputationalType as CT, FieldType, MethodDescriptor};

    fn run(code: &Code, descriptor: &MethodDescriptor, is_static: bool) -> (MethodId, AIResult<crate::testutil::Val>, DefUse) {
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
    fn identity_method_lifts_to_a_single_return_statement() {
        let descriptor = MethodDescriptor { parameters: vec![FieldType::Int], return_type: Some(FieldType::Int) };
        let code = Code::new(vec![I { pc: Pc(0), kind: K::Load { ty: CT::Int, slot: 0 } }, I { pc: Pc(1), kind: K::Return(Some(CT::Int)) }], vec![], 1, 1);
        let (method, result, defuse) = run(&code, &descriptor, true);
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let report = lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();

        assert_eq!(report.code.statements.len(), 1);
        match &report.code.statements[0] {
            Statement::Return(Some(Expr::Var(uvar))) => assert!(uvar.def_sites.contains(&Origin(-1))),
            other => panic!("expected Return(Var), got {other:?}"),
        }
        assert_eq!(report.code.parameters.entries.len(), 1);
        assert_eq!(report.code.parameters.entries[0].origin, Origin(-1));
    }

    #[test]
    fn division_by_zero_lifts_to_a_failing_expr_with_no_trailing_return() {
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
        let (method, result, defuse) = run(&code, &descriptor, true);
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let report = lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();

        assert!(!result.evaluated.contains(&Pc(3)));
        let has_failing = report.code.statements.iter().any(|s| matches!(s, Statement::FailingExpr { .. }));
        assert!(has_failing, "division by zero should lift to a FailingExpr, not an Assignment");
        assert!(!report.code.statements.iter().any(|s| matches!(s, Statement::Return(_))));
    }

    #[test]
    fn degenerate_conditional_collapses_to_goto_and_prunes_its_operand_uses() {
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
        let (method, result, defuse) = run(&code, &descriptor, true);
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let report = lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();

        assert_eq!(report.obsolete_use_sites_pruned, 1);
        let has_if = report.code.statements.iter().any(|s| matches!(s, Statement::If { .. }));
        assert!(!has_if, "both branches land on the same pc, so this must lift to Goto");
        let const_def = report.code.statements.iter().find_map(|s| match s {
            Statement::Assignment { lhs, .. } => Some(lhs),
            _ => None,
        });
        assert!(const_def.is_some_and(|d| d.use_sites.is_empty()), "the pruned conditional must not remain in the constant's use sites");
    }

    #[test]
    fn wide_parameter_gets_a_single_normalized_origin() {
        let descriptor = MethodDescriptor { parameters: vec![FieldType::Long], return_type: Some(FieldType::Long) };
        let code = Code::new(vec![I { pc: Pc(0), kind: K::Load { ty: CT::Long, slot: 0 } }, I { pc: Pc(1), kind: K::Return(Some(CT::Long)) }], vec![], 2, 2);
        let (method, result, defuse) = run(&code, &descriptor, true);
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let report = lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();

        assert_eq!(report.code.parameters.entries.len(), 1);
        assert_eq!(report.code.parameters.entries[0].origin, Origin(-1));
    }

    #[test]
    fn caught_exception_block_synthesizes_a_leading_statement() {
        let descriptor = MethodDescriptor { parameters: vec![], return_type: None };
        let code = Code::new(
            vec![
                I { pc: Pc(0), kind: K::New("java/lang/Object".into()) },
                I { pc: Pc(1), kind: K::AThrow },
                I { pc: Pc(4), kind: K::Store { ty: CT::Reference, slot: 0 } },
                I { pc: Pc(5), kind: K::Return(None) },
            ],
            vec![ExceptionHandler { start: Pc(0), end: Pc(4), handler: Pc(4), catch_type: None }],
            1,
            1,
        );
        let (method, result, defuse) = run(&code, &descriptor, true);
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let report = lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();

        assert!(report.code.statements.iter().any(|s| matches!(s, Statement::CaughtException { .. })));
    }

    #[test]
    fn rethrown_caught_exception_is_consumed_directly_by_the_handlers_throw() {
        // try { throw new X(); } catch (Throwable t) { throw t; }
        let descriptor = MethodDescriptor { parameters: vec![], return_type: None };
        let code = Code::new(
            vec![
                I { pc: Pc(0), kind: K::Const(ConstOperand::Int(1)) },
                I { pc: Pc(1), kind: K::AThrow },
                I { pc: Pc(4), kind: K::AThrow },
            ],
            vec![ExceptionHandler { start: Pc(0), end: Pc(4), handler: Pc(4), catch_type: None }],
            0,
            1,
        );
        let (method, result, defuse) = run(&code, &descriptor, true);
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let report = lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();

        let caught_index = report
            .code
            .statements
            .iter()
            .position(|s| matches!(s, Statement::CaughtException { .. }))
            .expect("handler entry must synthesize a CaughtException");
        let throw_index = report
            .code
            .statements
            .iter()
            .enumerate()
            .find_map(|(i, s)| (i > caught_index && matches!(s, Statement::Throw { .. })).then_some(i))
            .expect("the handler's rethrow must lift to a Throw statement after the CaughtException");

        match &report.code.statements[caught_index] {
            Statement::CaughtException { lhs } => assert!(lhs.use_sites.contains(&StmtIndex(throw_index as u32)), "the caught value's only use site must be its own rethrow"),
            other => panic!("expected CaughtException, got {other:?}"),
        }
        match &report.code.statements[throw_index] {
            Statement::Throw { expr: Expr::Var(uvar) } => assert!(uvar.def_sites.contains(&Origin(caught_index as i32)), "the rethrow must read straight from the CaughtException statement"),
            other => panic!("expected Throw(Var), got {other:?}"),
        }
    }

    #[test]
    fn tableswitch_remaps_every_case_and_the_default_to_statement_indices() {
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
        let (method, result, defuse) = run(&code, &descriptor, true);
        let shape = MethodShape { descriptor: &descriptor, is_static: true };
        let report = lift(&method, &code, &shape, &result, &defuse, &Configuration::default()).unwrap();

        let switch_stmt = report.code.statements.iter().find(|s| matches!(s, Statement::TableSwitch { .. })).expect("tableswitch must lift to a TableSwitch statement");
        match switch_stmt {
            Statement::TableSwitch { key: Expr::Var(key), low, targets, default } => {
                assert_eq!(*low, 0);
                assert_eq!(targets.len(), 2);
                for idx in targets.iter().chain(std::iter::once(default)) {
                    assert!((idx.as_usize()) < report.code.statements.len(), "remapped target must be a valid statement index, not a raw pc");
                }
                assert!(key.def_sites.contains(&Origin(-1)), "the switch key must trace back through the collapsed ILOAD to the method's only parameter");
            }
            other => panic!("expected TableSwitch(Var), got {other:?}"),
        }
    }
}
