//! `llvm.dbg.declare` refinement (spec.md §4.4.4).
//!
//! A local's declarator is first synthesized from its `alloca`'s IR type
//! alone, which is often less precise than what the frontend actually
//! wrote (an `unsigned` spelling, a `const` qualifier, or a debugger-only
//! `void*` collapse all get lost in the IR's own type system). When a
//! `dbg.declare` call names that local, this pass walks its debug-type
//! tree and patches the already-created `Value` node's name and type in
//! place — the one place outside the Writer's `init` flag where a node
//! is mutated after its initial creation (spec.md §3, "Lifecycle").

use crate::error::{LiftError, Result};
use crate::expr::Expr;
use crate::ir::{IrDebugType, IrDebugVar, IrDwarfTag, IrOperand};
use crate::types::{Type, TypeKind};

use super::Lifter;

/// Mirrors `Block::isVoidType`: walks a chain of derived/composite debug
/// types down to their base, returning true the moment a link's base is
/// absent. A `Basic` type is never void — it is the chain's terminal,
/// non-erased case.
fn is_void_type(ty: &IrDebugType) -> bool {
  match ty {
    IrDebugType::Derived { base, .. } | IrDebugType::Composite { base } =>
      base.as_deref().is_none_or(is_void_type),
    IrDebugType::Basic { .. } => false,
  }
}

/// `(is_const, is_unsigned, is_void_pointee)` read directly off the
/// *top* of `var`'s debug-type descriptor — unlike [`is_void_type`], this
/// does not recurse past the first node, matching `Block::setMetadataInfo`
/// casting `localVar->getType()` to each kind in turn rather than walking.
fn classify(ty: &IrDebugType) -> (bool, bool, bool) {
  match ty {
    IrDebugType::Basic { name } => (false, name.starts_with("unsigned"), false),
    IrDebugType::Derived { tag, .. } => (matches!(tag, IrDwarfTag::ConstType), false, is_void_type(ty)),
    IrDebugType::Composite { .. } => (false, false, is_void_type(ty)),
  }
}

/// `var[0-9]+` or `ConstGlobalVar_.+`: names the engine itself synthesized,
/// which a debug name must not clobber (spec.md §4.4.4).
fn is_synthesized_name(name: &str) -> bool {
  if let Some(rest) = name.strip_prefix("ConstGlobalVar_") { return !rest.is_empty(); }
  name.strip_prefix("var").is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

impl Lifter<'_> {
  /// Refines the `Value` node `value` points at using the debug-variable
  /// descriptor `var`, from a `dbg.declare` intrinsic call.
  pub fn apply_dbg_declare(&mut self, value: &IrOperand, var: &IrDebugVar) -> Result<()> {
    let IrOperand::Value(id) = value else {
      return Err(LiftError::IllFormedMetadata { detail: "dbg.declare value operand is not a local value".to_string() });
    };
    let target = *self.func.value_map.get(id).ok_or_else(|| LiftError::IllFormedMetadata {
      detail: format!("dbg.declare refers to unknown local {id}"),
    })?;
    // An `alloca`'s own value map entry is the `RefExpr` wrapping its
    // declared slot (spec.md §4.4, "Alloca"), so `dbg.declare` on a
    // stack-allocated local must unwrap one level to reach the `Value`
    // node the debug info actually refines.
    let unwrapped = match self.func.get(target) {
      Expr::RefExpr { inner, .. } => *inner,
      _ => target,
    };
    let Expr::Value(node) = self.func.get(unwrapped) else {
      return Err(LiftError::IllFormedMetadata { detail: "dbg.declare target is not a plain local".to_string() });
    };

    if !is_synthesized_name(&var.name) {
      *node.name.borrow_mut() = crate::program::ProgramCtx::sanitize_name(&var.name);
    }

    let (is_const, is_unsigned, is_void_pointee) = classify(&var.ty);
    let mut ty = node.ty.borrow_mut();
    ty.is_const = ty.is_const || is_const;
    match &mut ty.kind {
      TypeKind::Int(i) if is_unsigned => i.unsigned = true,
      TypeKind::Pointer(p) if is_void_pointee => p.pointee = Box::new(Type::void()),
      _ => {}
    }
    Ok(())
  }
}
