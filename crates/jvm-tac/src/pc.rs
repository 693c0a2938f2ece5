//! Index types used throughout the crate: bytecode offsets, value origins,
//! basic-block ids, and TAC statement indices.
//!
//! Keeping these as distinct newtypes (rather than passing `u32`/`i32` around)
//! is what lets the interpreter, the def/use recorder, and the lifter all
//! agree on what a bare integer means at a call site.

use std::fmt;

/// A byte offset into a method's instruction array.
///
/// `Pc` values are only ever compared and used as map keys; arithmetic on them
/// (e.g. "next instruction") is the job of [`crate::inst::Code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Pc(pub u32);

impl Pc {
    #[must_use]
    pub const fn new(offset: u32) -> Self {
        Self(offset)
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Pc {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl fmt::Display for Pc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pc={}", self.0)
    }
}

/// The origin of a value: where it was produced.
///
/// - `origin >= 0` — the `pc` of the defining instruction.
/// - `origin == -1` — the receiver of an instance method.
/// - `-2, -3, …` — declared parameters in descriptor order (AI-level numbering
///   is slot-aware: a category-2 parameter consumes two consecutive origin
///   numbers, only the first of which is ever attached to a value).
/// - Origins at or below [`VM_LEVEL_BASE`] denote a VM-level value: a
///   synthetic exception raised by the abstract interpreter itself (as
///   opposed to an explicit `athrow`) at the encoded `pc`.
///
/// See [`is_vm_level_value`] / [`pc_of_vm_level_value`] / [`vm_level_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Origin(pub i32);

/// Every origin at or below this value is a VM-level synthetic origin; the
/// encoded pc is `VM_LEVEL_BASE - origin`. Chosen far below any realistic
/// parameter count (the JVM caps a method's parameter words at 255) so there
/// is no possibility of collision with parameter origins.
pub const VM_LEVEL_BASE: i32 = i32::MIN / 2;

/// The origin of the receiver in an instance method.
pub const RECEIVER_ORIGIN: Origin = Origin(-1);

impl Origin {
    #[must_use]
    pub const fn of_pc(pc: Pc) -> Self {
        Self(pc.0 as i32)
    }

    #[must_use]
    pub const fn receiver() -> Self {
        RECEIVER_ORIGIN
    }

    /// The AI-level origin of the `index`-th declared parameter (0-based, in
    /// descriptor order), given the origin of the first parameter (which is
    /// `-2` for instance methods, `-1` for static methods). `index` here
    /// counts only the preceding parameters' consumed origin slots, i.e. the
    /// caller is expected to have already advanced past wide predecessors.
    #[must_use]
    pub const fn parameter(first_param_origin: i32, consumed_before: i32) -> Self {
        Self(first_param_origin - consumed_before)
    }

    #[must_use]
    pub const fn is_pc(self) -> bool {
        self.0 >= 0 && !self.is_vm_level()
    }

    #[must_use]
    pub const fn is_vm_level(self) -> bool {
        self.0 <= VM_LEVEL_BASE
    }

    #[must_use]
    pub const fn is_parameter(self) -> bool {
        self.0 <= -2 && self.0 > VM_LEVEL_BASE
    }

    #[must_use]
    pub fn as_pc(self) -> Option<Pc> {
        self.is_pc().then_some(Pc(self.0 as u32))
    }

    #[must_use]
    pub const fn vm_level(causing_pc: Pc) -> Self {
        Self(VM_LEVEL_BASE - causing_pc.0 as i32)
    }

    #[must_use]
    pub const fn pc_of_vm_level(self) -> Option<Pc> {
        if self.is_vm_level() {
            Some(Pc((VM_LEVEL_BASE - self.0) as u32))
        } else {
            None
        }
    }
}

/// Free-function form of [`Origin::is_vm_level`], for call sites that only
/// have the raw origin and don't want to import the type.
#[must_use]
pub const fn is_vm_level_value(origin: Origin) -> bool {
    origin.is_vm_level()
}

/// Free-function form of [`Origin::pc_of_vm_level`].
///
/// # Panics
/// Panics if `origin` is not a VM-level origin; callers should check with
/// [`is_vm_level_value`] first.
#[must_use]
pub fn pc_of_vm_level_value(origin: Origin) -> Pc {
    origin.pc_of_vm_level().expect("origin is not VM-level")
}

#[must_use]
pub const fn vm_level_value(causing_pc: Pc) -> Origin {
    Origin::vm_level(causing_pc)
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_vm_level() {
            write!(f, "vm@{}", self.pc_of_vm_level().unwrap())
        } else if *self == RECEIVER_ORIGIN {
            write!(f, "this")
        } else if self.0 < 0 {
            write!(f, "param{}", -self.0 - 2)
        } else {
            write!(f, "pc={}", self.0)
        }
    }
}

/// Identifier of a basic block in a [`crate::cfg::Cfg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct BbId(pub u32);

impl fmt::Display for BbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Index of a statement in a lifted [`crate::tac::TACode`]. Distinct from
/// `Pc` so that the lifter's remap pass (which rewrites every `Pc` target
/// into a `StmtIndex`) cannot be accidentally short-circuited by the type
/// checker treating the two as interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct StmtIndex(pub u32);

impl StmtIndex {
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StmtIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vm_level_roundtrip() {
        for raw in [0u32, 1, 42, 10_000] {
            let pc = Pc(raw);
            let origin = vm_level_value(pc);
            assert!(is_vm_level_value(origin));
            assert_eq!(pc_of_vm_level_value(origin), pc);
        }
    }

    #[test]
    fn parameter_and_receiver_are_not_vm_level() {
        assert!(!RECEIVER_ORIGIN.is_vm_level());
        assert!(!RECEIVER_ORIGIN.is_parameter());
        assert!(Origin(-2).is_parameter());
        assert!(!Origin(-2).is_vm_level());
    }

    #[test]
    fn non_negative_origin_is_pc() {
        assert!(Origin(0).is_pc());
        assert!(Origin(100).is_pc());
        assert!(!Origin(-1).is_pc());
    }
}
