//! A minimal concrete [`Domain`] used by this crate's own tests (and
//! available to downstream integration tests) to exercise the interpreter,
//! def/use recorder, and lifter without pulling in a real points-to or
//! constant-propagation analysis. It tracks int constants precisely enough
//! to reproduce the classic division-by-zero scenario and otherwise just
//! tracks computational type.

use crate::domain::value::{DomainValue, Join};
use crate::domain::{Domain, ExceptionClassification, TransferResult};
use crate::inst::{ArithOp, ConstOperand, Instruction, InstructionKind};
use crate::pc::{Origin, Pc};
use crate::types::{ClassName, ComputationalType};

/// The test domain's value representation: just enough shape to exercise
/// every instruction family, plus exact `int` constants so arithmetic
/// scenarios (division by zero, `iinc`) produce observable results.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Int(Option<i32>),
    Long,
    Float,
    Double,
    Ref,
    RetAddr(Pc),
    Illegal,
}

impl Val {
    #[must_use]
    pub const fn of_type(ty: ComputationalType) -> Self {
        match ty {
            ComputationalType::Int => Self::Int(None),
            ComputationalType::Long => Self::Long,
            ComputationalType::Float => Self::Float,
            ComputationalType::Double => Self::Double,
            ComputationalType::Reference => Self::Ref,
            ComputationalType::ReturnAddress => Self::RetAddr(Pc(0)),
        }
    }
}

impl DomainValue for Val {
    fn computational_type(&self) -> ComputationalType {
        match self {
            Self::Int(_) | Self::Illegal => ComputationalType::Int,
            Self::Long => ComputationalType::Long,
            Self::Float => ComputationalType::Float,
            Self::Double => ComputationalType::Double,
            Self::Ref => ComputationalType::Reference,
            Self::RetAddr(_) => ComputationalType::ReturnAddress,
        }
    }
}

fn val_from_const(c: &ConstOperand) -> Val {
    match c {
        ConstOperand::Int(v) => Val::Int(Some(*v)),
        ConstOperand::Long(_) => Val::Long,
        ConstOperand::Float(_) => Val::Float,
        ConstOperand::Double(_) => Val::Double,
        ConstOperand::String(_) | ConstOperand::Class(_) | ConstOperand::MethodType(_) | ConstOperand::MethodHandle(_) | ConstOperand::Null => Val::Ref,
    }
}

fn apply_int_binary(op: ArithOp, a: i32, b: i32) -> Option<i32> {
    Some(match op {
        ArithOp::Add => a.wrapping_add(b),
        ArithOp::Sub => a.wrapping_sub(b),
        ArithOp::Mul => a.wrapping_mul(b),
        ArithOp::Div => a.checked_div(b)?,
        ArithOp::Rem => a.checked_rem(b)?,
        ArithOp::And => a & b,
        ArithOp::Or => a | b,
        ArithOp::Xor => a ^ b,
        ArithOp::Shl => a.wrapping_shl(b as u32),
        ArithOp::Shr => a.wrapping_shr(b as u32),
        ArithOp::UShr => ((a as u32).wrapping_shr(b as u32)) as i32,
    })
}

/// A domain with no lattice depth beyond "is it the same value" — `join`
/// widens immediately to the incoming value on any disagreement. Adequate
/// for the straight-line and single-merge-point methods this crate's own
/// tests build; not meant to guarantee termination on adversarial inputs
/// with long-running loops over disagreeing constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstDomain;

impl Domain for ConstDomain {
    type Value = Val;

    fn initial_parameter(&self, _origin: Origin, ty: ComputationalType) -> Self::Value {
        Val::of_type(ty)
    }

    fn illegal_value(&self) -> Self::Value {
        Val::Illegal
    }

    fn exception_value(&self, _exception_type: Option<&ClassName>, _origin: Origin) -> Self::Value {
        Val::Ref
    }

    fn int_constant(&self, v: i32) -> Self::Value {
        Val::Int(Some(v))
    }

    fn long_constant(&self, _v: i64) -> Self::Value {
        Val::Long
    }

    fn float_constant(&self, _v: f32) -> Self::Value {
        Val::Float
    }

    fn double_constant(&self, _v: f64) -> Self::Value {
        Val::Double
    }

    fn return_address(&self, return_pc: Pc) -> Self::Value {
        Val::RetAddr(return_pc)
    }

    fn join(&self, a: &Self::Value, b: &Self::Value) -> Join<Self::Value> {
        if a == b {
            Join::NoUpdate
        } else {
            Join::StructuralUpdate(b.clone())
        }
    }

    fn apply(&self, inst: &Instruction, popped: &[Self::Value], locals: &[Self::Value]) -> TransferResult<Self::Value> {
        match &inst.kind {
            InstructionKind::Const(c) => TransferResult::pure(vec![val_from_const(c)]),
            InstructionKind::Binary { ty, op } => match (popped.first(), popped.get(1)) {
                (Some(Val::Int(Some(b))), Some(Val::Int(Some(a)))) if *ty == ComputationalType::Int => match apply_int_binary(*op, *a, *b) {
                    Some(v) => TransferResult::pure(vec![Val::Int(Some(v))]),
                    None => TransferResult::throwing(vec![Val::Int(None)]),
                },
                _ => TransferResult::pure(vec![Val::of_type(*ty)]),
            },
            InstructionKind::Neg { ty } | InstructionKind::Convert { to: ty, .. } => TransferResult::pure(vec![Val::of_type(*ty)]),
            InstructionKind::NarrowInt(_) => TransferResult::pure(vec![Val::Int(None)]),
            InstructionKind::Compare(_) => TransferResult::pure(vec![Val::Int(None)]),
            InstructionKind::IInc { slot, delta } => {
                let cur = locals.get(*slot as usize).and_then(|v| if let Val::Int(x) = v { *x } else { None });
                TransferResult::pure(vec![Val::Int(cur.and_then(|c| c.checked_add(*delta)))])
            }
            InstructionKind::GetField(f) | InstructionKind::GetStatic(f) => TransferResult::pure(vec![Val::of_type(f.field_type.computational_type())]),
            InstructionKind::New(_) | InstructionKind::NewArray(_) | InstructionKind::ANewArray(_) | InstructionKind::MultiANewArray { .. } => {
                TransferResult::throwing(vec![Val::Ref])
            }
            InstructionKind::ArrayLoad { ty } => TransferResult::pure(vec![Val::of_type(*ty)]),
            InstructionKind::ArrayLength => TransferResult::pure(vec![Val::Int(None)]),
            InstructionKind::InstanceOf(_) => TransferResult::pure(vec![Val::Int(None)]),
            InstructionKind::InvokeStatic(m) | InstructionKind::InvokeVirtual(m) | InstructionKind::InvokeSpecial(m) => {
                let pushed = m.descriptor.return_type.as_ref().map(|t| Val::of_type(t.computational_type())).into_iter().collect();
                TransferResult::throwing(pushed)
            }
            InstructionKind::InvokeInterface { method, .. } => {
                let pushed = method.descriptor.return_type.as_ref().map(|t| Val::of_type(t.computational_type())).into_iter().collect();
                TransferResult::throwing(pushed)
            }
            InstructionKind::InvokeDynamic(call_site) => {
                let pushed = call_site.descriptor.return_type.as_ref().map(|t| Val::of_type(t.computational_type())).into_iter().collect();
                TransferResult::pure(pushed)
            }
            _ => TransferResult::pure(Vec::new()),
        }
    }

    fn classify_exceptions(&self, inst: &Instruction, _throw_all: bool) -> ExceptionClassification {
        if inst.may_raise_vm_exception() {
            ExceptionClassification { possible_exceptions: vec![ClassName::from("java/lang/RuntimeException")] }
        } else {
            ExceptionClassification::default()
        }
    }
}
