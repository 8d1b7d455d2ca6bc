//! Inline-assembly constraint-string parsing.
//!
//! LLVM's inline-asm constraint string is a comma-separated list of
//! tokens: a `=`-prefixed entry is an output, a `~`-prefixed entry is a
//! clobber, and a bare entry is an input. A `{name}` token pins an
//! explicit machine register rather than leaving allocation to the
//! compiler; this engine only recognizes the `{ri<N>}`/`{rx<N>}`
//! spellings used for the x86-64 general-purpose registers and maps them
//! to their canonical GCC-asm register names, passing anything else
//! through unchanged.

use std::cell::RefCell;

use crate::error::Result;
use crate::expr::{Expr, ExprId, ValueNode};
use crate::ir::IrOperand;
use crate::types::{Type, TypeKind};

use super::Lifter;

const GP_REGISTERS: [&str; 16] = [
  "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi",
  "r8", "r9", "r10", "r11", "r12", "r13", "r14", "r15",
];

/// The x86-64 general-purpose register spellings a `~{...}` clobber token
/// is allowed to name, across the widths LLVM emits them at
/// (`original_source/Block.cpp::getAsmUsedRegString`'s `REGS` table).
const CLOBBER_ALLOW_LIST: [&str; 22] = [
  "rax", "eax", "ax", "al", "rbx", "ebx", "bx", "bl", "rcx", "ecx", "cx", "cl",
  "rdx", "edx", "dx", "dl", "rsi", "esi", "si", "rdi", "edi", "di",
];

#[derive(Debug, Clone, Default)]
pub struct ParsedConstraints {
  pub outputs: Vec<String>,
  pub inputs: Vec<String>,
  pub clobbers: Vec<String>,
}

/// Maps a `{ri<N>}`/`{rx<N>}` explicit-register constraint to its
/// conventional GCC-asm letter; any other bare constraint (`r`, `=r`'s
/// stripped form, a single letter) passes through unchanged.
fn map_register_token(tok: &str) -> String {
  let Some(inner) = tok.strip_prefix('{').and_then(|t| t.strip_suffix('}')) else { return tok.to_string() };
  let rest = inner.strip_prefix("ri").or_else(|| inner.strip_prefix("rx"));
  if let Some(n) = rest.and_then(|r| r.parse::<usize>().ok()) {
    if let Some(name) = GP_REGISTERS.get(n) { return format!("{{{name}}}"); }
  }
  tok.to_string()
}

/// Splits a constraint string into its output/input/clobber token lists.
/// Every returned token already carries the quote characters GCC-asm
/// syntax requires (`"=r"`, `"r"`, `"%rax"`) so the writer can print them
/// verbatim; clobbers are additionally filtered against
/// [`CLOBBER_ALLOW_LIST`], matching the source tool's behavior of only
/// ever emitting clobbers it recognizes.
#[must_use] pub fn parse_constraints(constraints: &str) -> ParsedConstraints {
  let mut parsed = ParsedConstraints::default();
  for raw in constraints.split(',') {
    let raw = raw.trim();
    if raw.is_empty() { continue; }
    if let Some(rest) = raw.strip_prefix('=') {
      parsed.outputs.push(format!("\"={}\"", map_register_token(rest)));
    } else if let Some(rest) = raw.strip_prefix('~') {
      let reg = rest.strip_prefix('{').and_then(|t| t.strip_suffix('}')).unwrap_or(rest);
      if CLOBBER_ALLOW_LIST.contains(&reg) { parsed.clobbers.push(format!("\"%{reg}\"")); }
    } else {
      parsed.inputs.push(format!("\"{}\"", map_register_token(raw)));
    }
  }
  parsed
}

impl Lifter<'_> {
  /// Builds the `AsmExpr` for one inline-asm call site. Returns the asm
  /// node's handle and, if the asm produces a result, the fresh output
  /// variable's handle so the caller can bind it in `value_map`.
  pub fn lower_inline_asm(
    &mut self,
    template: &str,
    constraints: &str,
    args: &[IrOperand],
    result_ty: &Type,
  ) -> Result<(ExprId, Option<ExprId>)> {
    let parsed = parse_constraints(constraints);
    let clobbers = parsed.clobbers.join(", ");

    // A single-result asm call binds its one output eagerly to a fresh
    // local, and the call's value maps straight to that local. A
    // multi-output asm (`result_ty` a struct of the output values) leaves
    // every output slot unbound (`None`) — each is filled in later, when a
    // `Store` of the matching `extractvalue` rebinds it in place (spec.md
    // §4.4, Store case iii; §4.4.3).
    let mut outputs = Vec::new();
    let mut dest = None;
    match &result_ty.kind {
      TypeKind::Void => {}
      TypeKind::Struct(_) => {
        for constraint in &parsed.outputs {
          outputs.push((constraint.clone(), None));
        }
      }
      _ => {
        let name = self.func.fresh_local_name();
        let id = self.func.alloc(Expr::Value(ValueNode::new(name, result_ty.clone())));
        // A GCC-asm output operand must already name a declared lvalue, so
        // the fresh local needs its own declaration statement ahead of the
        // `AsmExpr` statement rather than being declared inline there.
        let decl = self.func.alloc(Expr::StackAlloc(id));
        self.pending_statements.push(decl);
        let constraint = parsed.outputs.first().cloned().unwrap_or_else(|| "\"=r\"".to_string());
        outputs.push((constraint, Some(id)));
        dest = Some(id);
      }
    }

    let mut inputs = Vec::new();
    for (i, arg) in args.iter().enumerate() {
      let expr = self.operand_to_expr(arg)?;
      let constraint = parsed.inputs.get(i).cloned().unwrap_or_else(|| "\"r\"".to_string());
      inputs.push((constraint, expr));
    }

    let asm = self.func.alloc(Expr::AsmExpr {
      template: template.to_string(),
      outputs: RefCell::new(outputs),
      inputs,
      clobbers,
    });
    // Multi-output asm has no single scalar result; bind the call's value
    // to the `AsmExpr` node itself so a later `extractvalue` can recognize
    // its aggregate as asm-sourced (spec.md §4.4.3).
    Ok((asm, dest.or(matches!(result_ty.kind, TypeKind::Struct(_)).then_some(asm))))
  }
}
