//! The Abstract Domain Interface: the capability set the
//! interpreter core requires from a concrete abstract domain.
//!
//! Modeled as a trait bounded by an associated `Value: DomainValue`, rather
//! than a trait object — the interpreter is generic over `D: Domain` and
//! monomorphises per concrete domain, per the design notes' "prefer
//! monomorphisation for hot paths".

pub mod value;

use crate::error::MethodId;
use crate::inst::Instruction;
use crate::pc::Pc;
use crate::types::ComputationalType;
use value::{DomainValue, Join};

/// Which VM-level exceptions an instruction may raise, as class names the
/// caller's [`crate::hierarchy::ClassHierarchy`] can resolve handlers
/// against. Empty means "none, under this domain's analysis" — a domain
/// that cannot prove an instruction safe should conservatively return its
/// full exception set rather than omit it.
#[derive(Debug, Clone, Default)]
pub struct ExceptionClassification {
    pub possible_exceptions: Vec<crate::types::ClassName>,
}

/// The capability set the interpreter core requires. `V` is the concrete
/// domain-value representation; everything else is a pure function of
/// `(instruction, incoming values)`.
pub trait Domain {
    type Value: DomainValue;

    /// The initial value for parameter origin `origin` (non-positive, per
    /// the crate's origin encoding) with computational type `ty`.
    fn initial_parameter(&self, origin: crate::pc::Origin, ty: ComputationalType) -> Self::Value;

    /// The distinguished value occupying the second slot of a category-2
    /// local, and any other "no value here" position.
    fn illegal_value(&self) -> Self::Value;

    /// A value representing a thrown exception of (approximately) type
    /// `exception_type`, produced at `origin` (the `athrow` pc, or the
    /// VM-level-encoded pc of the raising instruction).
    fn exception_value(&self, exception_type: Option<&crate::types::ClassName>, origin: crate::pc::Origin) -> Self::Value;

    fn int_constant(&self, v: i32) -> Self::Value;
    fn long_constant(&self, v: i64) -> Self::Value;
    fn float_constant(&self, v: f32) -> Self::Value;
    fn double_constant(&self, v: f64) -> Self::Value;

    /// The value `jsr` pushes onto the entering subroutine's stack: a
    /// `returnAddress`-typed value naming `return_pc` (the pc immediately
    /// following the `jsr`). The interpreter resolves `ret`'s successors
    /// itself from the subroutine structure; this factory only needs to
    /// produce something of the right computational type.
    fn return_address(&self, return_pc: Pc) -> Self::Value;

    /// Joins two values observed at the same `(pc, stack-or-local
    /// position)` from different predecessors.
    fn join(&self, a: &Self::Value, b: &Self::Value) -> Join<Self::Value>;

    /// The transfer function: given the instruction and its popped operand
    /// values (top-of-stack first) plus the relevant local slots, produce
    /// the value(s) pushed. The interpreter handles distributing pushed
    /// values and locals across successor pcs; the domain only computes
    /// results.
    fn apply(&self, inst: &Instruction, popped: &[Self::Value], locals: &[Self::Value]) -> TransferResult<Self::Value>;

    /// Which VM exceptions `inst` may raise under this domain's analysis.
    fn classify_exceptions(&self, inst: &Instruction, throw_all: bool) -> ExceptionClassification;

    /// Optional narrowing of a reference value after a successful
    /// `checkcast` or a null check; the default is "no refinement".
    fn refine_reference(&self, value: &Self::Value, _narrowed_to: Option<&crate::types::ClassName>) -> Self::Value {
        value.clone()
    }
}

/// The result of applying a domain's transfer function to one instruction:
/// the values it pushes (for non-void results) plus whether it definitely,
/// possibly, or never raises.
#[derive(Debug, Clone)]
pub struct TransferResult<V> {
    pub pushed: Vec<V>,
    pub raises: bool,
}

impl<V> TransferResult<V> {
    #[must_use]
    pub fn pure(pushed: Vec<V>) -> Self {
        Self { pushed, raises: false }
    }

    #[must_use]
    pub fn throwing(pushed: Vec<V>) -> Self {
        Self { pushed, raises: true }
    }
}

/// Wraps a domain-level failure the core cannot itself diagnose (e.g. a
/// transfer function given operands it cannot classify) into the crate's
/// error taxonomy.
#[must_use]
pub fn bytecode_failure(method: &MethodId, pc: Pc, reason: impl Into<String>) -> crate::error::Error {
    crate::error::Error::BytecodeProcessingFailure { method: method.clone(), pc, reason: reason.into() }
}
