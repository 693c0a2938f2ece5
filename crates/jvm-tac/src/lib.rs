//! Abstract interpretation, def/use recording, and TAC/SSA lifting for JVM
//! bytecode method bodies.
//!
//! The pipeline runs in three stages, each the subject of one module:
//!
//! 1. [`interp`] — a worklist abstract interpreter generic over a caller's
//!    [`domain::Domain`], producing the operand-stack/locals table at every
//!    reachable pc plus the def/use origin shadow described in [`pc::Origin`].
//! 2. [`defuse`] — a frozen query surface (`usedBy`, dead-variable detection)
//!    derived from the interpreter's origin tables.
//! 3. [`tac`] — lifts the frozen interpretation into three-address code in
//!    (nearly) SSA form.
//!
//! [`batch`] drives all three across many methods in parallel;
//! [`diagnostics`] is the per-method outcome type that reports back.

pub mod batch;
pub mod cancellation;
pub mod cfg;
pub mod code;
pub mod config;
pub mod defuse;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod hierarchy;
pub mod inst;
pub mod interp;
pub mod liveness;
pub mod pc;
pub mod result;
pub mod tac;
pub mod types;

pub mod testutil;

pub use cancellation::CancellationToken;
pub use config::Configuration;
pub use error::{Error, MethodId, Result};
pub use pc::{BbId, Origin, Pc, StmtIndex};
