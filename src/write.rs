//! The Writer: a single-pass visitor over a lifted [`ProgramCtx`] that
//! renders it to C source text (spec.md §4.5).
//!
//! Grounded in `original_source/writer/ExprWriter.cpp` and
//! `original_source/Program.cpp::print`/`saveFile`: this module reproduces
//! their visitor-per-node-kind structure and their top-level emission
//! order (prologue, declarations, structs, globals, definitions), but
//! writes into an in-memory `String` rather than an `ostream`/`ofstream`
//! pair — the CLI binary is the one place an actual `io::Write` sink is
//! touched, so only it needs to handle an I/O error.

use std::cell::RefCell;

use crate::expr::{accept, BinOp, CallTarget, Expr, ExprId, ExprVisitor, StructElementNode, ValueNode};
use crate::ir::BlockId;
use crate::program::{Func, FuncBlock, GlobalDef, ProgramCtx, StructDef};
use crate::types::Type;

/// Renders every function, struct, and global `ctx` owns into one
/// translation unit (spec.md §6, "Output format": prologue, function
/// declarations, structs in dependency order, globals, function
/// definitions).
#[must_use]
pub fn write_program(ctx: &ProgramCtx) -> String {
  let mut out = String::new();
  write_prologue(ctx, &mut out);
  for f in ctx.funcs.iter().filter(|f| f.is_declaration) {
    out.push_str(&render_signature(f));
    out.push_str(";\n");
  }
  if ctx.funcs.iter().any(|f| f.is_declaration) { out.push('\n'); }
  write_structs(ctx, &mut out);
  for g in &ctx.globals {
    write_global(g, &mut out);
  }
  out.push('\n');
  for f in ctx.funcs.iter().filter(|f| !f.is_declaration) {
    out.push_str(&write_function_def(ctx, f));
  }
  out
}

fn write_prologue(ctx: &ProgramCtx, out: &mut String) {
  if !ctx.emit_includes { return; }
  let f = &ctx.features;
  let mut any = false;
  if f.has_vararg { out.push_str("#include <stdarg.h>\n"); any = true; }
  if f.has_string { out.push_str("#include <string.h>\n"); any = true; }
  if f.has_stdlib { out.push_str("#include <stdlib.h>\n"); any = true; }
  if f.has_stdio { out.push_str("#include <stdio.h>\n"); any = true; }
  if f.has_pthread { out.push_str("#include <pthread.h>\n"); any = true; }
  if any { out.push('\n'); }
}

/// A field type's struct dependency, if any — unwrapping array elements so
/// an array-of-struct field still forces that struct's definition earlier
/// (spec.md §4.5, "Structs").
fn struct_dependency(ty: &Type) -> Option<&str> {
  match &ty.kind {
    crate::types::TypeKind::Struct(name) => Some(name),
    crate::types::TypeKind::Array(a) => struct_dependency(&a.element),
    _ => None,
  }
}

fn write_structs(ctx: &ProgramCtx, out: &mut String) {
  let mut printed = std::collections::HashSet::new();
  for def in &ctx.structs {
    write_struct_recursive(ctx, def, &mut printed, out);
  }
}

fn write_struct_recursive<'a>(
  ctx: &'a ProgramCtx,
  def: &'a StructDef,
  printed: &mut std::collections::HashSet<&'a str>,
  out: &mut String,
) {
  if printed.contains(def.name.as_str()) { return; }
  for field_ty in &def.fields {
    if let Some(dep_name) = struct_dependency(field_ty) {
      if dep_name != def.name {
        if let Some(dep) = ctx.find_struct(dep_name) {
          write_struct_recursive(ctx, dep, printed, out);
        }
      }
    }
  }
  write_struct_def(def, out);
  printed.insert(def.name.as_str());
}

fn write_struct_def(def: &StructDef, out: &mut String) {
  out.push_str("struct ");
  out.push_str(&def.name);
  out.push_str(" {\n");
  for (ty, name) in def.fields.iter().zip(def.field_names.iter()) {
    out.push_str("    ");
    out.push_str(&ty.surround_name(name));
    out.push_str(";\n");
  }
  out.push_str("};\n\n");
}

fn write_global(g: &GlobalDef, out: &mut String) {
  if g.is_extern {
    out.push_str("extern ");
    out.push_str(&g.ty.surround_name(&g.name));
    out.push_str(";\n");
  } else {
    out.push_str(&g.ty.surround_name(&g.name));
    out.push_str(" = ");
    out.push_str(g.init_text.as_deref().unwrap_or("0"));
    out.push_str(";\n");
  }
}

fn render_named_params(params: &[(String, Type)], is_vararg: bool) -> String {
  let mut parts: Vec<String> = params.iter().map(|(n, t)| t.surround_name(n)).collect();
  if is_vararg { parts.push("...".to_string()); }
  if parts.is_empty() { "void".to_string() } else { parts.join(", ") }
}

fn render_signature(f: &Func) -> String {
  let (ret_prefix, ret_suffix) = f.ret_ty.declarator_parts();
  let params = render_named_params(&f.params, f.is_vararg);
  let storage = if f.is_static { "static " } else { "" };
  format!("{storage}{ret_prefix}{}({params}){ret_suffix}", f.name)
}

fn write_function_def(ctx: &ProgramCtx, f: &Func) -> String {
  let mut writer = Writer { ctx, func: f, out: String::new() };
  let mut any_printed = false;
  for block in &f.blocks {
    if block.do_inline { continue; }
    if any_printed {
      writer.out.push_str(&writer.block_label(block.id));
      writer.out.push_str(":\n");
    }
    any_printed = true;
    let stmts = block.statements.clone();
    writer.write_statements(&stmts);
  }
  let mut text = render_signature(f);
  text.push_str(" {\n");
  text.push_str(&writer.out);
  text.push_str("}\n\n");
  text
}

fn is_zero_literal(expr: &Expr) -> bool {
  matches!(expr, Expr::Value(v) if v.is_literal && v.name() == "0")
}

/// The single-pass expression visitor; one instance per function body,
/// holding the output buffer and read-only access to the function's
/// expression table and the owning program (for struct field names and
/// the `no_func_casts` toggle).
struct Writer<'a> {
  ctx: &'a ProgramCtx,
  func: &'a Func,
  out: String,
}

impl Writer<'_> {
  fn block_label(&self, id: BlockId) -> String {
    self.func.blocks.iter().find(|b| b.id == id)
      .and_then(|b| b.label.clone())
      .unwrap_or_else(|| id.to_string())
  }

  fn find_block(&self, id: BlockId) -> Option<&FuncBlock> {
    self.func.blocks.iter().find(|b| b.id == id)
  }

  fn visit_expr(&mut self, id: ExprId) {
    accept(&self.func.exprs, id, self);
  }

  /// Wraps `id` in parentheses iff its node is not "simple" (spec.md §4.2,
  /// §4.5, "Parenthesization rule").
  fn parens_if_not_simple(&mut self, id: ExprId) {
    let simple = self.func.get(id).is_simple();
    if !simple { self.out.push('('); }
    self.visit_expr(id);
    if !simple { self.out.push(')'); }
  }

  /// Like [`Self::parens_if_not_simple`], for the base operand of a
  /// `.`/`->`/`[]` access specifically: `is_simple` marks `RefExpr`/
  /// `DerefExpr` as parenthesization-free, which is fine wherever they
  /// appear as an ordinary operand, but a postfix access immediately
  /// following a bare `&`/`*` binds to that operator's whole operand
  /// chain rather than stopping at it (`&p->f` parses as `&(p->f)`, not
  /// `(&p)->f`). A base this shape is always parenthesized regardless of
  /// `is_simple` so the field access binds to the right thing.
  fn postfix_base(&mut self, id: ExprId) {
    let needs_parens = matches!(self.func.get(id), Expr::RefExpr { .. } | Expr::DerefExpr { .. })
      || !self.func.get(id).is_simple();
    if needs_parens { self.out.push('('); }
    self.visit_expr(id);
    if needs_parens { self.out.push(')'); }
  }

  /// Each statement gets a trailing `;` except the two control constructs
  /// that already end in their own closing brace, and inline assembly,
  /// which ends in its own `);` (spec.md §4.5, "Blocks"; the original
  /// tool's `Block::print` adds the declaration-statement `;` itself and
  /// otherwise leaves termination to each node's own rendering — this
  /// Writer always terminates the remainder so the output stays legal C
  /// regardless of statement kind).
  ///
  /// A statement that assigns a fresh named temporary for the first time
  /// (every `bind_result`-produced SSA value) gets its declarator printed
  /// ahead of the assignment instead of a bare `name = ...` (spec.md
  /// §4.5, "First declaration"; the original tool instead pushes the
  /// `Value` as its own preceding statement — folding it into the
  /// assignment here avoids a second statement per SSA value while
  /// producing the same declared-then-assigned text).
  fn write_statements(&mut self, stmts: &[ExprId]) {
    for &id in stmts {
      self.out.push_str("    ");

      let fresh_decl = if let Expr::AssignExpr { left, right } = self.func.get(id) {
        if let Expr::Value(node) = self.func.get(*left) {
          if !node.is_literal && !node.init.get() {
            node.init.set(true);
            Some((node.ty().surround_name(&node.name()), *right))
          } else {
            None
          }
        } else {
          None
        }
      } else {
        None
      };

      if let Some((decl, right)) = fresh_decl {
        self.out.push_str(&decl);
        self.out.push_str(" = ");
        self.visit_expr(right);
        self.out.push_str(";\n");
        continue;
      }

      let needs_semi = !matches!(
        self.func.get(id),
        Expr::IfExpr { .. } | Expr::SwitchExpr { .. } | Expr::AsmExpr { .. }
      );
      self.visit_expr(id);
      if needs_semi { self.out.push_str(";\n"); } else { self.out.push('\n'); }
    }
  }

  /// Either inlines `block`'s statements in place (when its `do_inline`
  /// flag is set) or emits a `goto` to its label (spec.md §4.5, "Blocks").
  fn goto_or_inline(&mut self, id: BlockId) {
    let Some(block) = self.find_block(id) else {
      self.out.push_str(&format!("goto {id};\n"));
      return;
    };
    if block.do_inline {
      let label = self.block_label(id);
      self.out.push_str(&format!("{{ // {label}\n"));
      let stmts = block.statements.clone();
      self.write_statements(&stmts);
      self.out.push_str("}\n");
    } else {
      let label = self.block_label(id);
      self.out.push_str(&format!("goto {label};\n"));
    }
  }

  fn write_call_args(&mut self, params: &[ExprId], is_va_func: bool) {
    for (i, &p) in params.iter().enumerate() {
      if i > 0 { self.out.push_str(", "); }
      if is_va_func && i == 0 {
        self.out.push_str("(void*)(");
        self.visit_expr(p);
        self.out.push(')');
      } else {
        self.visit_expr(p);
      }
    }
  }
}

impl ExprVisitor for Writer<'_> {
  fn visit_value(&mut self, n: &ValueNode) {
    self.out.push_str(&n.name());
  }

  fn visit_global_value(&mut self, n: &crate::expr::GlobalValueNode) {
    self.out.push_str(&n.name);
  }

  fn visit_stack_alloc(&mut self, value: ExprId) {
    let Expr::Value(node) = self.func.get(value) else { return };
    self.out.push_str(&node.ty().surround_name(&node.name()));
    node.init.set(true);
  }

  fn visit_struct_element(&mut self, n: &StructElementNode) {
    self.postfix_base(n.base);
    let base_ty = self.func.type_of(n.base);
    self.out.push_str(if base_ty.is_pointer() { "->" } else { "." });
    let field_name = self.ctx.find_struct(&n.struct_name)
      .and_then(|s| s.field_names.get(n.field_index as usize))
      .cloned()
      .unwrap_or_else(|| format!("structVar{}", n.field_index));
    self.out.push_str(&field_name);
  }

  fn visit_array_element(&mut self, base: ExprId, index: ExprId, _ty: &Type) {
    self.postfix_base(base);
    self.out.push('[');
    self.visit_expr(index);
    self.out.push(']');
  }

  fn visit_extract_value(&mut self, indices: &[ExprId]) {
    if let Some(&last) = indices.last() { self.visit_expr(last); }
  }

  fn visit_ref(&mut self, inner: ExprId, _ty: &Type) {
    self.out.push('&');
    self.parens_if_not_simple(inner);
  }

  fn visit_deref(&mut self, inner: ExprId, _ty: &Type) {
    self.out.push('*');
    self.parens_if_not_simple(inner);
  }

  fn visit_cast(&mut self, inner: ExprId, target: &Type) {
    self.out.push('(');
    self.out.push_str(target.surround_name("").trim_end());
    self.out.push(')');
    self.parens_if_not_simple(inner);
  }

  fn visit_binary(&mut self, op: BinOp, left: ExprId, right: ExprId, _ty: &Type) {
    if op == BinOp::Lshr {
      // Unsigned-cast special case (spec.md §4.4, "Shift"): `LShr`'s left
      // operand is printed cast to its type's unsigned form unless it's
      // already unsigned.
      let left_ty = self.func.type_of(left);
      match left_ty.as_int() {
        Some(i) if !i.unsigned => self.out.push_str(&format!("(unsigned {})(", i.spelling())),
        _ => self.out.push('('),
      }
      self.visit_expr(left);
      self.out.push_str(") >> (");
      self.visit_expr(right);
      self.out.push(')');
      return;
    }
    self.parens_if_not_simple(left);
    self.out.push(' ');
    self.out.push_str(op.symbol());
    self.out.push(' ');
    self.parens_if_not_simple(right);
  }

  fn visit_cmp(&mut self, left: ExprId, right: ExprId, op: crate::expr::CmpOp, _is_unsigned: bool) {
    self.parens_if_not_simple(left);
    self.out.push(' ');
    self.out.push_str(op.symbol());
    self.out.push(' ');
    self.parens_if_not_simple(right);
  }

  fn visit_assign(&mut self, left: ExprId, right: ExprId) {
    self.parens_if_not_simple(left);
    self.out.push_str(" = ");
    self.parens_if_not_simple(right);
  }

  fn visit_select(&mut self, cond: ExprId, then_val: ExprId, else_val: ExprId, _ty: &Type) {
    self.parens_if_not_simple(cond);
    self.out.push_str(" ? ");
    self.parens_if_not_simple(then_val);
    self.out.push_str(" : ");
    self.parens_if_not_simple(else_val);
  }

  fn visit_if(&mut self, cmp: Option<ExprId>, true_block: BlockId, false_block: Option<BlockId>) {
    match cmp {
      Some(c) => {
        self.out.push_str("if (");
        self.visit_expr(c);
        self.out.push_str(") {\n");
        self.goto_or_inline(true_block);
        self.out.push_str("    } else {\n");
        self.goto_or_inline(false_block.unwrap_or(true_block));
        self.out.push_str("    }\n");
      }
      None => self.goto_or_inline(true_block),
    }
  }

  fn visit_switch(&mut self, discriminant: ExprId, default_block: Option<BlockId>, cases: &[(i64, BlockId)]) {
    self.out.push_str("switch (");
    self.visit_expr(discriminant);
    self.out.push_str(") {\n");
    for (label, block) in cases {
      self.out.push_str(&format!("    case {label}: "));
      self.goto_or_inline(*block);
    }
    if let Some(def) = default_block {
      self.out.push_str("    default:\n");
      self.goto_or_inline(def);
    }
    self.out.push_str("}\n");
  }

  fn visit_ret(&mut self, value: Option<ExprId>) {
    self.out.push_str("return");
    if let Some(v) = value {
      self.out.push(' ');
      self.visit_expr(v);
    }
  }

  fn visit_call(&mut self, callee: &CallTarget, params: &[ExprId], _ret_ty: &Type, _is_func_pointer: bool) {
    match callee {
      CallTarget::Indirect(target) => {
        self.out.push('(');
        let mut call = *target;
        if self.ctx.no_func_casts {
          while let Expr::CastExpr { inner, .. } = self.func.get(call) { call = *inner; }
        }
        self.visit_expr(call);
        self.out.push(')');
        self.out.push('(');
        self.write_call_args(params, false);
        self.out.push(')');
      }
      CallTarget::Named(name) => {
        let is_va = name == "va_start" || name == "va_end";
        self.out.push_str(name);
        self.out.push('(');
        self.write_call_args(params, is_va);
        self.out.push(')');
      }
    }
  }

  fn visit_asm(
    &mut self,
    template: &str,
    outputs: &RefCell<Vec<(String, Option<ExprId>)>>,
    inputs: &[(String, ExprId)],
    clobbers: &str,
  ) {
    self.out.push_str(&format!("__asm__(\"{template}\"\n"));
    self.out.push_str("        : ");
    let bound: Vec<(String, Option<ExprId>)> = outputs.borrow().clone();
    let mut first = true;
    for (constraint, expr) in &bound {
      let Some(e) = expr else { break };
      if !first { self.out.push_str(", "); }
      first = false;
      self.out.push_str(constraint);
      self.out.push_str(" (");
      self.visit_expr(*e);
      self.out.push(')');
    }
    self.out.push_str("\n        : ");
    let mut first = true;
    for (constraint, expr) in inputs {
      if !first { self.out.push_str(", "); }
      first = false;
      self.out.push_str(constraint);
      self.out.push_str(" (");
      self.visit_expr(*expr);
      self.out.push(')');
    }
    self.out.push_str("\n        : ");
    self.out.push_str(clobbers);
    self.out.push_str("\n    );");
  }

  fn visit_gep(&mut self, args: &[ExprId], _ty: &Type) {
    if let Some(&last) = args.last() { self.visit_expr(last); }
  }

  fn visit_pointer_shift(&mut self, ptr_type: &Type, pointer: ExprId, shift: ExprId) {
    if is_zero_literal(self.func.get(shift)) {
      self.visit_expr(pointer);
      return;
    }
    self.out.push_str("*(((");
    self.out.push_str(ptr_type.surround_name("").trim_end());
    self.out.push_str(")(");
    self.visit_expr(pointer);
    self.out.push_str(")) + ");
    self.parens_if_not_simple(shift);
    self.out.push(')');
  }
}
