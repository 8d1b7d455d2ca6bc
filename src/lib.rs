//! Lifts a typed low-level IR module back into compilable C source.
//!
//! The crate is organized leaves-first, matching the five components of
//! the reconstruction engine:
//!
//! - [`types`] — the C type model (component A).
//! - [`expr`] — the expression tree (component B).
//! - [`program`] — the Program Context, owner of every function, struct,
//!   and global (component C).
//! - [`lift`] — the instruction lifter, the only mutator during lifting
//!   (component D).
//! - [`write`] — the pretty-printer that renders a lifted [`program::ProgramCtx`]
//!   to C text (component E).
//!
//! [`ir`] defines the read-only input contract an external IR loader must
//! satisfy; [`error`] collects the structured error kinds the engine can
//! fail with. The `ir2c` binary wires a JSON-encoded module through
//! [`lift::lift_module`] and [`write::write_program`] end to end.

pub mod error;
pub mod expr;
pub mod ir;
pub mod lift;
pub mod program;
pub mod types;
pub mod write;

pub use error::{LiftError, Result};
pub use ir::IrModule;
pub use program::ProgramCtx;

/// Lifts `module` into a fresh [`ProgramCtx`], ready for [`write::write_program`].
pub fn lift(module: &IrModule) -> Result<ProgramCtx> {
  let mut ctx = ProgramCtx::new();
  lift::lift_module(&mut ctx, module)?;
  Ok(ctx)
}
