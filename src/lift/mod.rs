//! The Instruction Lifter: walks an [`IrFunction`]'s basic blocks and
//! turns each SSA instruction into an [`Expr`] tree plus, for most
//! opcodes, a statement assigning that tree's value to a freshly named
//! local (spec.md §4.4).
//!
//! Control flow is *not* structurally recovered here — a conditional
//! branch lowers to an [`Expr::IfExpr`] naming its two target blocks, and
//! a block prints as either a `goto`'d label or an inlined fallthrough
//! depending on its `do_inline` flag (an external CFG pass's input, read
//! only by [`crate::write`]). Reconstructing `for`/`while` loop syntax is
//! out of scope (spec.md §9, "block-inlining policy").

pub mod asm;
pub mod debuginfo;
pub mod gep;

use crate::error::{LiftError, Result};
use crate::expr::{BinOp, CallTarget, CmpOp, Expr, ExprId, ValueNode};
use crate::ir::{
  IrBlock, IrCallee, IrConstant, IrFunction, IrGlobal, IrInstKind, IrInstruction, IrIntValue,
  IrModule, IrOpcode, IrOperand, IrPredicate, ValueId,
};
use crate::program::{Func, FuncBlock, GlobalDef, ProgramCtx};
use crate::types::{lower_ir_type, Type, TypeKind};

/// Per-function lifting state: the `Func` under construction plus shared
/// read access to the program being assembled and the source module (for
/// struct/global lookups that span functions).
pub struct Lifter<'m> {
  pub ctx: &'m mut ProgramCtx,
  pub module: &'m IrModule,
  pub func: Func,
  /// An `extractvalue` whose aggregate is an `AsmExpr`'s multi-output
  /// tuple has no expression of its own (spec.md §4.4.3); this remembers
  /// which `(AsmExpr, output index)` it named so a later `Store` can
  /// rebind that output slot in place (spec.md §4.4, Store case iii).
  asm_extract_pending: std::collections::HashMap<ValueId, (ExprId, usize)>,
  /// Values of a dropped `llvm.stacksave`/`llvm.stackrestore` call (spec.md
  /// §4.4.1): storing one of these is itself silently dropped rather than
  /// failing with a missing-operand error (spec.md §4.4, Store case ii).
  dropped_values: std::collections::HashSet<ValueId>,
  /// Bare declaration statements (spec.md §4.4: a `StackAlloc` node with
  /// no initializer) an instruction needs emitted just ahead of its own
  /// statement — used by single-output inline asm to declare the fresh
  /// output local before the `AsmExpr` statement references it, since a
  /// GCC-asm output operand must already name a declared lvalue.
  pending_statements: Vec<ExprId>,
}

/// Lifts every global and function in `module` into `ctx`.
pub fn lift_module(ctx: &mut ProgramCtx, module: &IrModule) -> Result<()> {
  ctx.seed_from_module(module);
  for global in &module.globals {
    lift_global(ctx, global)?;
  }
  for function in &module.functions {
    let func = lift_function(ctx, module, function)?;
    ctx.funcs.push(func);
  }
  Ok(())
}

/// Intrinsic stems (the part of an `llvm.NAME[.suffix]` call after
/// `llvm.`) that have a same-named C standard-library or compiler-builtin
/// counterpart and so lower to a plain call to that name rather than
/// having their dots replaced (spec.md §4.4.1, `original_source/Block.cpp`'s
/// `C_FUNCTIONS` set).
const C_FUNCTIONS: &[&str] = &[
  "memcpy", "memmove", "memset", "sqrt", "powi", "sin", "cos", "pow", "exp", "exp2",
  "log", "log10", "log2", "fma", "fabs", "minnum", "maxnum", "minimum", "maximum",
  "copysign", "floor", "ceil", "trunc", "rint", "nearbyint", "round", "va_start", "va_end",
];

/// Extracts the stem of an `llvm.NAME` or `llvm.NAME.suffix` intrinsic
/// name — the part matched by `llvm\.(\w+)(\..+)?` in the source tool.
fn intrinsic_stem(name: &str) -> Option<&str> {
  let rest = name.strip_prefix("llvm.")?;
  Some(rest.split('.').next().unwrap_or(rest))
}

/// Resolves a direct callee name per spec.md §4.4.1: an `llvm.*` name
/// whose stem is a recognized C/builtin function becomes a plain call to
/// that stem; any other `llvm.*` name has every `.` replaced by `_`;
/// anything else passes through unchanged.
fn resolve_callee_name(name: &str) -> String {
  if !name.starts_with("llvm.") { return name.to_string(); }
  match intrinsic_stem(name) {
    Some(stem) if C_FUNCTIONS.contains(&stem) => stem.to_string(),
    _ => name.replace('.', "_"),
  }
}

/// Builds the bare, argument-less `AsmExpr` used for `unreachable`,
/// `fence`, and the `llvm.trap`/`llvm.debugtrap` intrinsics (spec.md
/// §4.4, §4.4.1). `template` is the raw instruction mnemonic, unquoted —
/// [`crate::write`] is the only place that adds the surrounding `"..."`.
fn bare_asm(template: &str) -> Expr {
  Expr::AsmExpr {
    template: template.to_string(),
    outputs: std::cell::RefCell::new(Vec::new()),
    inputs: Vec::new(),
    clobbers: String::new(),
  }
}

fn render_constant(c: &IrConstant) -> Result<String> {
  match c {
    IrConstant::Null(_) => Ok("0".to_string()),
    IrConstant::Int { value, .. } => Ok(match value {
      IrIntValue::Small(v) => v.to_string(),
      IrIntValue::Big(v) => v.to_string(),
    }),
    IrConstant::Float(f) => Ok(format!("{f}")),
    IrConstant::DataArray(items) => {
      let parts = items.iter().map(render_constant).collect::<Result<Vec<_>>>()?;
      Ok(format!("{{ {} }}", parts.join(", ")))
    }
    IrConstant::Expr(_) => Err(LiftError::UnsupportedType {
      rendered: "constant-expression global initializer".to_string(),
    }),
  }
}

fn lift_global(ctx: &mut ProgramCtx, global: &IrGlobal) -> Result<()> {
  let ty = lower_ir_type(&global.ty, false);
  let init_text = global.initializer.as_ref().map(render_constant).transpose()?;
  ctx.globals.push(GlobalDef {
    name: ProgramCtx::sanitize_name(&global.name),
    ty,
    is_extern: global.initializer.is_none() && !global.linkage.is_private(),
    init_text,
  });
  Ok(())
}

fn lift_function(ctx: &mut ProgramCtx, module: &IrModule, f: &IrFunction) -> Result<Func> {
  let ret_ty = lower_ir_type(&f.ret, false);
  let mut func = Func::new(
    f.name.clone(), ret_ty, f.is_vararg, f.linkage.is_internal(), f.is_declaration, ctx.local_counter_start(),
  );

  for p in &f.params {
    let ty = lower_ir_type(&p.ty, false);
    let name = p.name.clone().unwrap_or_else(|| format!("arg{}", p.id.0));
    let name = ProgramCtx::sanitize_name(&name);
    let id = func.alloc(Expr::Value(ValueNode::new(name.clone(), ty.clone())));
    func.value_map.insert(p.id, id);
    func.params.push((name, ty));
    func.param_exprs.push(id);
  }
  if f.is_vararg { ctx.ensure_va_list_tag(); }

  let mut lifter = Lifter {
    ctx,
    module,
    func,
    asm_extract_pending: std::collections::HashMap::new(),
    dropped_values: std::collections::HashSet::new(),
    pending_statements: Vec::new(),
  };
  if !f.is_declaration {
    for block in &f.blocks {
      lifter.lift_block(block)?;
    }
  }
  Ok(lifter.func)
}

fn map_binop(op: &IrOpcode) -> BinOp {
  match op {
    IrOpcode::Add | IrOpcode::FAdd => BinOp::Add,
    IrOpcode::Sub | IrOpcode::FSub => BinOp::Sub,
    IrOpcode::Mul | IrOpcode::FMul => BinOp::Mul,
    IrOpcode::UDiv | IrOpcode::SDiv | IrOpcode::FDiv => BinOp::Div,
    IrOpcode::URem | IrOpcode::SRem | IrOpcode::FRem => BinOp::Rem,
    IrOpcode::And => BinOp::And,
    IrOpcode::Or => BinOp::Or,
    IrOpcode::Xor => BinOp::Xor,
    IrOpcode::Shl => BinOp::Shl,
    IrOpcode::AShr => BinOp::Ashr,
    IrOpcode::LShr => BinOp::Lshr,
    other => unreachable!("map_binop called on non-arithmetic opcode {other:?}"),
  }
}

/// Collapses `icmp`/`fcmp`'s sixteen-odd predicates onto the six C
/// comparison operators plus an unsigned flag (spec.md §4.4, recovered
/// detail in SPEC_FULL.md §4.4: "the six ordered/unordered float
/// predicate families collapse onto the same six C operators as the
/// integer predicates"). `FCMP_ORD`/`FCMP_UNO`/unrecognized predicates
/// have no C lowering and are rejected.
fn map_predicate(p: &IrPredicate) -> Result<(CmpOp, bool)> {
  use IrPredicate::{
    Bad, FloatFalse, FloatOeq, FloatOge, FloatOgt, FloatOle, FloatOlt, FloatOne, FloatOrd,
    FloatTrue, FloatUeq, FloatUge, FloatUgt, FloatUle, FloatUlt, FloatUne, FloatUno, IntEq,
    IntNe, IntSge, IntSgt, IntSle, IntSlt, IntUge, IntUgt, IntUle, IntUlt,
  };
  Ok(match p {
    IntEq | FloatOeq | FloatUeq => (CmpOp::Eq, false),
    IntNe | FloatOne | FloatUne => (CmpOp::Ne, false),
    IntUlt => (CmpOp::Lt, true),
    IntUle => (CmpOp::Le, true),
    IntUgt => (CmpOp::Gt, true),
    IntUge => (CmpOp::Ge, true),
    IntSlt | FloatOlt | FloatUlt => (CmpOp::Lt, false),
    IntSle | FloatOle | FloatUle => (CmpOp::Le, false),
    IntSgt | FloatOgt | FloatUgt => (CmpOp::Gt, false),
    IntSge | FloatOge | FloatUge => (CmpOp::Ge, false),
    FloatFalse | FloatTrue | FloatOrd | FloatUno | Bad =>
      return Err(LiftError::UnsupportedInstruction {
        opcode: IrOpcode::FCmp,
        rendered: format!("predicate {p:?}"),
      }),
  })
}

impl Lifter<'_> {
  fn lift_block(&mut self, block: &IrBlock) -> Result<()> {
    let mut statements = Vec::new();
    for inst in &block.instructions {
      let stmt = self.lift_instruction(inst)?;
      statements.append(&mut self.pending_statements);
      if let Some(stmt) = stmt {
        statements.push(stmt);
      }
    }
    self.func.blocks.push(FuncBlock {
      id: block.id,
      label: block.name.clone(),
      statements,
      do_inline: block.do_inline,
    });
    Ok(())
  }

  /// Resolves an operand to an expression, recursively lifting a nested
  /// `ConstantExpr` through the same per-opcode dispatch used for
  /// ordinary instructions — "constant-expression mode" (spec.md §4.4,
  /// confirmed against `Block::createConstantValue` in
  /// `original_source/Block.cpp`). A constant expression has no stable
  /// value identity to cache under, so it is simply re-lifted at each
  /// use site rather than memoized.
  pub fn operand_to_expr(&mut self, op: &IrOperand) -> Result<ExprId> {
    match op {
      IrOperand::Value(id) => self.func.value_map.get(id).copied().ok_or_else(|| LiftError::MissingOperand {
        rendered: format!("{id}"),
        operand_index: 0,
      }),
      IrOperand::Global(name) => {
        // Globals are always referenced by address (spec.md §4.3): wrap the
        // bare `GlobalValue` in a `RefExpr` rather than baking `&` into the
        // name, so the Writer's ordinary `&`/parenthesization logic applies.
        let sanitized = ProgramCtx::sanitize_name(name);
        let ty = self.ctx.globals.iter().find(|g| g.name == sanitized).map_or_else(Type::void, |g| g.ty.clone());
        let value = self.func.alloc(Expr::GlobalValue(crate::expr::GlobalValueNode {
          name: sanitized,
          ty: ty.clone(),
          init_text: String::new(),
        }));
        Ok(self.func.alloc(Expr::RefExpr { inner: value, ty: Type::pointer(ty) }))
      }
      IrOperand::Func(name) => Ok(self.func.alloc(Expr::GlobalValue(crate::expr::GlobalValueNode {
        name: name.clone(),
        ty: Type::void(),
        init_text: String::new(),
      }))),
      IrOperand::Const(c) => self.const_to_expr(c),
    }
  }

  fn const_to_expr(&mut self, c: &IrConstant) -> Result<ExprId> {
    match c {
      IrConstant::Null(ty) => Ok(self.func.alloc(Expr::Value(ValueNode::literal("0".to_string(), lower_ir_type(ty, false))))),
      IrConstant::Int { width, value } => {
        let text = match value { IrIntValue::Small(v) => v.to_string(), IrIntValue::Big(v) => v.to_string() };
        Ok(self.func.alloc(Expr::Value(ValueNode::literal(text, Type::int(*width, false)))))
      }
      IrConstant::Float(f) => {
        let ty = Type { kind: TypeKind::Float(crate::types::FloatKind::Double), is_const: false };
        Ok(self.func.alloc(Expr::Value(ValueNode::literal(format!("{f}"), ty))))
      }
      IrConstant::DataArray(_) => Err(LiftError::UnsupportedType {
        rendered: "constant aggregate literal".to_string(),
      }),
      IrConstant::Expr(inst) => {
        self.lift_instruction(inst)?.ok_or_else(|| LiftError::MissingOperand {
          rendered: inst.render(),
          operand_index: 0,
        })?;
        self.func.value_map.get(&inst.id).copied().ok_or_else(|| LiftError::MissingOperand {
          rendered: inst.render(),
          operand_index: 0,
        })
      }
    }
  }

  /// Creates the fresh local that most instructions bind their computed
  /// value to, and returns the `AssignExpr` statement for it.
  fn bind_result(&mut self, id: ValueId, ty: Type, rhs: ExprId) -> ExprId {
    let name = self.func.fresh_local_name();
    let dest = self.func.alloc(Expr::Value(ValueNode::new(name, ty)));
    let assign = self.func.alloc(Expr::AssignExpr { left: dest, right: rhs });
    self.func.value_map.insert(id, dest);
    assign
  }

  /// Lowers a `store`, applying the three special cases spec.md §4.4 calls
  /// out ahead of the general "deref-target = value" rule.
  fn lift_store(&mut self, value_op: &IrOperand, ptr_op: &IrOperand) -> Result<Option<ExprId>> {
    // (i) storing a function handle: the RHS is the bare `&funcname` text,
    // not a dereferenced/typed value.
    if let IrOperand::Func(name) = value_op {
      let value_expr = self.func.alloc(Expr::Value(ValueNode::literal(format!("&{name}"), Type::void())));
      let ptr_expr = self.operand_to_expr(ptr_op)?;
      let deref = self.func.alloc(Expr::DerefExpr { inner: ptr_expr, ty: Type::void() });
      return Ok(Some(self.func.alloc(Expr::AssignExpr { left: deref, right: value_expr })));
    }
    if let IrOperand::Value(id) = value_op {
      // (ii) storing a dropped `llvm.stacksave`/`llvm.stackrestore` result:
      // the whole store disappears.
      if self.dropped_values.contains(id) { return Ok(None); }
      // (iii) storing an `extractvalue` of a multi-output asm: rebind that
      // output slot to the store's target in place of an assignment.
      if let Some(&(asm_id, idx)) = self.asm_extract_pending.get(id) {
        let ptr_expr = self.operand_to_expr(ptr_op)?;
        let ty = self.func.type_of(ptr_expr).as_pointer().map_or_else(Type::void, |p| (*p.pointee).clone());
        let deref = self.func.alloc(Expr::DerefExpr { inner: ptr_expr, ty });
        let Expr::AsmExpr { outputs, .. } = self.func.get(asm_id) else {
          return Err(LiftError::IllFormedMetadata { detail: "asm output rebind target is not an AsmExpr".to_string() });
        };
        if let Some(slot) = outputs.borrow_mut().get_mut(idx) { slot.1 = Some(deref); }
        return Ok(None);
      }
    }
    let value_expr = self.operand_to_expr(value_op)?;
    let ptr_expr = self.operand_to_expr(ptr_op)?;
    let value_ty = self.func.type_of(value_expr);
    let deref = self.func.alloc(Expr::DerefExpr { inner: ptr_expr, ty: value_ty });
    Ok(Some(self.func.alloc(Expr::AssignExpr { left: deref, right: value_expr })))
  }

  fn note_include_for_call(&mut self, name: &str) {
    match name {
      "memcpy" | "memmove" | "memset" => self.ctx.features.has_string = true,
      "malloc" | "free" | "calloc" | "realloc" | "exit" => self.ctx.features.has_stdlib = true,
      n if n.starts_with("pthread_") => self.ctx.features.has_pthread = true,
      n if ["printf", "fprintf", "sprintf", "snprintf", "scanf", "fscanf", "sscanf"].contains(&n) =>
        self.ctx.features.has_stdio = true,
      _ => {}
    }
  }

  fn lift_call(&mut self, inst: &IrInstruction, callee: &IrCallee, args: &[IrOperand]) -> Result<Option<ExprId>> {
    let ty = lower_ir_type(&inst.ty, false);
    match callee {
      IrCallee::InlineAsm { template, constraints } => {
        let (asm, dest) = self.lower_inline_asm(template, constraints, args, &ty)?;
        if let Some(d) = dest { self.func.value_map.insert(inst.id, d); }
        Ok(Some(asm))
      }
      IrCallee::Direct(name) => {
        if name == "llvm.stacksave" || name == "llvm.stackrestore" {
          self.ctx.features.stack_ignored = true;
          self.dropped_values.insert(inst.id);
          return Ok(None);
        }
        if name == "llvm.trap" || name == "llvm.debugtrap" {
          return Ok(Some(self.func.alloc(bare_asm("int3"))));
        }
        let name = resolve_callee_name(name);
        self.note_include_for_call(&name);
        let mut params = args.iter().map(|a| self.operand_to_expr(a)).collect::<Result<Vec<_>>>()?;
        if name == "va_start" {
          if let Some(&last) = self.func.param_exprs.last() { params.push(last); }
        }
        let rhs = self.func.alloc(Expr::CallExpr {
          callee: CallTarget::Named(name),
          params,
          ret_ty: ty.clone(),
          is_func_pointer: false,
        });
        if matches!(ty.kind, TypeKind::Void) { Ok(Some(rhs)) } else { Ok(Some(self.bind_result(inst.id, ty, rhs))) }
      }
      IrCallee::Indirect(op) => {
        let target = self.operand_to_expr(op)?;
        let params = args.iter().map(|a| self.operand_to_expr(a)).collect::<Result<Vec<_>>>()?;
        let rhs = self.func.alloc(Expr::CallExpr {
          callee: CallTarget::Indirect(target),
          params,
          ret_ty: ty.clone(),
          is_func_pointer: true,
        });
        if matches!(ty.kind, TypeKind::Void) { Ok(Some(rhs)) } else { Ok(Some(self.bind_result(inst.id, ty, rhs))) }
      }
    }
  }

  fn lift_extract_value(&mut self, inst: &IrInstruction, indices: &[u32]) -> Result<Option<ExprId>> {
    let mut base = self.operand_to_expr(&inst.operands[0])?;
    if matches!(self.func.get(base), Expr::AsmExpr { .. }) {
      // No node is emitted for an `extractvalue` of a multi-output asm's
      // aggregate; the consumer (`Store`) binds the named slot directly
      // (spec.md §4.4.3).
      let idx = indices.first().copied().unwrap_or(0) as usize;
      self.asm_extract_pending.insert(inst.id, (base, idx));
      return Ok(None);
    }
    let mut cur_ty = self.func.type_of(base);
    let mut chain = Vec::new();
    for &idx in indices {
      match cur_ty.kind.clone() {
        TypeKind::Struct(key) => {
          let name = self.ctx.resolve_struct(self.module, &key)
            .ok_or_else(|| LiftError::UnsupportedType { rendered: format!("unknown struct {key}") })?;
          let field_ty = self.ctx
            .find_struct(&name)
            .and_then(|s| s.fields.get(idx as usize))
            .cloned()
            .ok_or_else(|| LiftError::UnsupportedType { rendered: format!("struct {name} field {idx}") })?;
          base = self.func.alloc(Expr::StructElement(crate::expr::StructElementNode {
            struct_name: name,
            base,
            field_index: i64::from(idx),
            array_index: 0,
            ty: field_ty.clone(),
          }));
          cur_ty = field_ty;
        }
        TypeKind::Array(a) => {
          let elem_ty = *a.element;
          let idx_lit = self.func.alloc(Expr::Value(ValueNode::literal(idx.to_string(), Type::int(32, false))));
          base = self.func.alloc(Expr::ArrayElement { base, index: idx_lit, ty: elem_ty.clone() });
          cur_ty = elem_ty;
        }
        other => return Err(LiftError::UnsupportedType { rendered: format!("{other:?}") }),
      }
      chain.push(base);
    }
    let _ = cur_ty;
    // Expression-only (spec.md §8 invariant #2).
    let rhs = self.func.alloc(Expr::ExtractValueExpr { indices: chain });
    self.func.value_map.insert(inst.id, rhs);
    Ok(None)
  }

  fn lift_instruction(&mut self, inst: &IrInstruction) -> Result<Option<ExprId>> {
    match &inst.opcode {
      IrOpcode::Add | IrOpcode::FAdd | IrOpcode::Sub | IrOpcode::FSub | IrOpcode::Mul | IrOpcode::FMul
      | IrOpcode::UDiv | IrOpcode::SDiv | IrOpcode::FDiv | IrOpcode::URem | IrOpcode::SRem | IrOpcode::FRem
      | IrOpcode::And | IrOpcode::Or | IrOpcode::Xor | IrOpcode::Shl | IrOpcode::LShr | IrOpcode::AShr => {
        let op = map_binop(&inst.opcode);
        let left = self.operand_to_expr(&inst.operands[0])?;
        let right = self.operand_to_expr(&inst.operands[1])?;
        let ty = lower_ir_type(&inst.ty, false);
        let rhs = self.func.alloc(Expr::Binary { op, left, right, ty: ty.clone() });
        Ok(Some(self.bind_result(inst.id, ty, rhs)))
      }

      IrOpcode::Alloca => {
        // The alloca's own SSA result is a pointer to the slot, but the
        // `Value` node it declares is typed as the slot itself (spec.md
        // §4.4, "Alloca"); every later use of the alloca as an operand
        // must therefore take its address explicitly.
        let ty = lower_ir_type(&inst.ty, false);
        let pointee = match &ty.kind { TypeKind::Pointer(p) => (*p.pointee).clone(), _ => ty };
        let name = self.func.fresh_local_name();
        let value = self.func.alloc(Expr::Value(ValueNode::new(name, pointee.clone())));
        let stmt = self.func.alloc(Expr::StackAlloc(value));
        let reference = self.func.alloc(Expr::RefExpr { inner: value, ty: Type::pointer(pointee) });
        self.func.value_map.insert(inst.id, reference);
        Ok(Some(stmt))
      }

      IrOpcode::Load => {
        // Expression-only (spec.md §4.4, "Load: result is DerefExpr(operand).
        // No statement emitted"): bind the value directly so later uses
        // re-evaluate the dereference in place instead of through a named
        // temporary.
        let ptr = self.operand_to_expr(&inst.operands[0])?;
        let ty = lower_ir_type(&inst.ty, false);
        let rhs = self.func.alloc(Expr::DerefExpr { inner: ptr, ty });
        self.func.value_map.insert(inst.id, rhs);
        Ok(None)
      }

      IrOpcode::Store => self.lift_store(&inst.operands[0], &inst.operands[1]),

      IrOpcode::ICmp | IrOpcode::FCmp => {
        let IrInstKind::Cmp { predicate } = &inst.kind else {
          return Err(LiftError::IllFormedMetadata { detail: "comparison instruction missing predicate".to_string() });
        };
        let (op, is_unsigned) = map_predicate(predicate)?;
        let left = self.operand_to_expr(&inst.operands[0])?;
        let right = self.operand_to_expr(&inst.operands[1])?;
        let rhs = self.func.alloc(Expr::CmpExpr { left, right, op, is_unsigned });
        Ok(Some(self.bind_result(inst.id, Type::int(32, false), rhs)))
      }

      IrOpcode::Br => {
        let IrInstKind::Br { cond, then_block, else_block } = &inst.kind else {
          return Err(LiftError::IllFormedMetadata { detail: "branch instruction missing targets".to_string() });
        };
        let cmp = cond.as_ref().map(|c| self.operand_to_expr(c)).transpose()?;
        Ok(Some(self.func.alloc(Expr::IfExpr { cmp, true_block: *then_block, false_block: *else_block })))
      }

      IrOpcode::Ret => {
        let value = if inst.operands.is_empty() { None } else { Some(self.operand_to_expr(&inst.operands[0])?) };
        Ok(Some(self.func.alloc(Expr::RetExpr { value })))
      }

      IrOpcode::Switch => {
        let IrInstKind::Switch { default, cases } = &inst.kind else {
          return Err(LiftError::IllFormedMetadata { detail: "switch instruction missing cases".to_string() });
        };
        let discriminant = self.operand_to_expr(&inst.operands[0])?;
        Ok(Some(self.func.alloc(Expr::SwitchExpr { discriminant, default_block: *default, cases: cases.clone() })))
      }

      IrOpcode::Unreachable => Ok(Some(self.func.alloc(bare_asm("int3")))),

      IrOpcode::Fence => Ok(Some(self.func.alloc(bare_asm("fence")))),

      IrOpcode::Call => match &inst.kind {
        IrInstKind::Call { callee, args } => self.lift_call(inst, callee, args),
        IrInstKind::DbgDeclare { value, var } => {
          self.apply_dbg_declare(value, var)?;
          Ok(None)
        }
        _ => Err(LiftError::IllFormedMetadata { detail: "call instruction has no call payload".to_string() }),
      },

      IrOpcode::SExt | IrOpcode::ZExt | IrOpcode::Trunc | IrOpcode::FPToSI | IrOpcode::SIToFP
      | IrOpcode::FPToUI | IrOpcode::UIToFP | IrOpcode::FPTrunc | IrOpcode::FPExt | IrOpcode::PtrToInt
      | IrOpcode::IntToPtr | IrOpcode::BitCast => {
        let IrInstKind::Cast { dest_ty } = &inst.kind else {
          return Err(LiftError::IllFormedMetadata { detail: "cast instruction missing destination type".to_string() });
        };
        let inner = self.operand_to_expr(&inst.operands[0])?;
        let target = lower_ir_type(dest_ty, false);
        // Expression-only (spec.md §8 invariant #2): no statement, the cast
        // is re-emitted at each use site.
        let rhs = self.func.alloc(Expr::CastExpr { inner, target });
        self.func.value_map.insert(inst.id, rhs);
        Ok(None)
      }

      IrOpcode::Select => {
        let cond = self.operand_to_expr(&inst.operands[0])?;
        let then_val = self.operand_to_expr(&inst.operands[1])?;
        let else_val = self.operand_to_expr(&inst.operands[2])?;
        let ty = lower_ir_type(&inst.ty, false);
        // Expression-only (spec.md §8 invariant #2).
        let rhs = self.func.alloc(Expr::SelectExpr { cond, then_val, else_val, ty });
        self.func.value_map.insert(inst.id, rhs);
        Ok(None)
      }

      IrOpcode::GetElementPtr => {
        let IrInstKind::Gep { indices } = &inst.kind else {
          return Err(LiftError::IllFormedMetadata { detail: "getelementptr instruction missing indices".to_string() });
        };
        let base = self.operand_to_expr(&inst.operands[0])?;
        let base_ty = self.func.type_of(base);
        let (gep, _ty) = self.lower_gep(&base_ty, base, indices)?;
        // Expression-only (spec.md §4.4.2): the GEP chain is inlined at
        // every use site rather than bound to a pointer temporary first.
        // The bound value is the `GepExpr`'s own last-added argument
        // (spec.md §4.4.2 step 5, "the printed form of GepExpr is its
        // last-added argument"), not the wrapping node itself, so a later
        // deref sees the same simple/compound shape the argument has on
        // its own.
        let Expr::GepExpr { args, .. } = self.func.get(gep) else { unreachable!("lower_gep always returns a GepExpr") };
        let resolved = *args.last().expect("GEP always has at least one argument");
        self.func.value_map.insert(inst.id, resolved);
        Ok(None)
      }

      IrOpcode::ExtractValue => {
        let IrInstKind::ExtractValue { indices } = &inst.kind else {
          return Err(LiftError::IllFormedMetadata { detail: "extractvalue instruction missing indices".to_string() });
        };
        self.lift_extract_value(inst, indices)
      }

      IrOpcode::Other(_) => Err(LiftError::UnsupportedInstruction { opcode: inst.opcode.clone(), rendered: inst.render() }),
    }
  }
}
