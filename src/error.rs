//! Structured errors produced while lifting an IR module into C.
//!
//! Every error is fatal to the current program: there is no recovery, retry,
//! or backoff, and no partial output is ever written (see [`crate::write`]).

use std::fmt;
use crate::ir::IrOpcode;

/// Errors that can occur while lifting a module or rendering its output.
///
/// Each variant carries enough context to render the offending instruction
/// or type verbatim next to the kind, as required by the error reporting
/// policy: "the lifter surfaces errors with the offending instruction
/// rendered verbatim next to the kind".
#[derive(Debug)]
pub enum LiftError {
  /// An opcode with no lowering rule, or a comparison predicate this engine
  /// does not support (`FCMP_ORD`, `FCMP_UNO`, or an unrecognized predicate).
  UnsupportedInstruction {
    /// The opcode that triggered the error.
    opcode: IrOpcode,
    /// A rendering of the instruction that failed to lift.
    rendered: String,
  },
  /// A source type has no C translation (vectors, tokens, and similar are
  /// not modeled by the [`crate::types`] type model).
  UnsupportedType {
    /// A rendering of the offending IR type.
    rendered: String,
  },
  /// An operand had no registered expression and no literal could be
  /// synthesized for it.
  MissingOperand {
    /// The instruction whose operand was missing.
    rendered: String,
    /// Index of the missing operand.
    operand_index: usize,
  },
  /// A `llvm.dbg.declare` call referred to metadata this engine could not
  /// interpret (missing local-variable descriptor, wrong metadata kind).
  IllFormedMetadata {
    /// Description of what went wrong while decoding the metadata.
    detail: String,
  },
  /// Reading the input module or writing the output failed.
  Io(std::io::Error),
}

impl fmt::Display for LiftError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::UnsupportedInstruction { opcode, rendered } =>
        write!(f, "unsupported instruction ({opcode:?}): {rendered}"),
      Self::UnsupportedType { rendered } =>
        write!(f, "unsupported type: {rendered}"),
      Self::MissingOperand { rendered, operand_index } =>
        write!(f, "missing operand {operand_index} of: {rendered}"),
      Self::IllFormedMetadata { detail } =>
        write!(f, "ill-formed debug metadata: {detail}"),
      Self::Io(e) => write!(f, "i/o error: {e}"),
    }
  }
}

impl std::error::Error for LiftError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<std::io::Error> for LiftError {
  fn from(e: std::io::Error) -> Self { Self::Io(e) }
}

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, LiftError>;
