//! The expression tree: a tagged variant of node kinds, each carrying its
//! own typed children.
//!
//! Nodes live in a single per-function append-only table (see
//! [`crate::program::Func::exprs`]) and are referenced afterwards only by
//! the [`ExprId`] handle returned at allocation time — "weak" references
//! in the sense that no node owns another; the table is the only real
//! owner (spec.md §3, "Ownership and lifetimes"; design note "No cyclic
//! ownership"). Using a handle instead of a borrowed reference sidesteps
//! the self-referential-lifetime problem an arena of *references* would
//! have while keeping the same "stable identity, monotonic allocation"
//! shape the spec describes.

use std::cell::{Cell, RefCell};
use crate::ir::BlockId;
use crate::types::Type;

/// A handle into a function's expression table. Stable for the lifetime
/// of the owning [`crate::program::Func`]; never reused or invalidated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

impl std::fmt::Display for ExprId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "e{}", self.0) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp { Add, Sub, Mul, Div, Rem, And, Or, Xor, Shl, Ashr, Lshr }

impl BinOp {
  #[must_use] pub fn symbol(self) -> &'static str {
    match self {
      BinOp::Add => "+", BinOp::Sub => "-", BinOp::Mul => "*", BinOp::Div => "/",
      BinOp::Rem => "%", BinOp::And => "&", BinOp::Or => "|", BinOp::Xor => "^",
      BinOp::Shl => "<<", BinOp::Ashr => ">>", BinOp::Lshr => ">>",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp { Eq, Ne, Lt, Le, Gt, Ge }

impl CmpOp {
  #[must_use] pub fn symbol(self) -> &'static str {
    match self {
      CmpOp::Eq => "==", CmpOp::Ne => "!=", CmpOp::Lt => "<",
      CmpOp::Le => "<=", CmpOp::Gt => ">", CmpOp::Ge => ">=",
    }
  }
}

/// A local variable, one per SSA result that has its own C declarator
/// (`alloca` results and the fresh values bound to non-void calls).
#[derive(Debug)]
pub struct ValueNode {
  pub name: RefCell<String>,
  pub ty: RefCell<Type>,
  /// Whether this value's declarator has already been emitted; toggled by
  /// the Writer the first time the value is printed (spec.md §4.5,
  /// "First declaration").
  pub init: Cell<bool>,
  /// A bare literal (an immediate constant's printed text) rather than a
  /// declared local — the Writer never emits a declaration line for one
  /// of these, only its `name` text verbatim.
  pub is_literal: bool,
}

impl ValueNode {
  #[must_use] pub fn new(name: String, ty: Type) -> Self {
    Self { name: RefCell::new(name), ty: RefCell::new(ty), init: Cell::new(false), is_literal: false }
  }

  /// A literal leaf: its `name` is the already-rendered constant text
  /// (`"42"`, `"0"`, ...), never a declared identifier.
  #[must_use] pub fn literal(text: String, ty: Type) -> Self {
    Self { name: RefCell::new(text), ty: RefCell::new(ty), init: Cell::new(true), is_literal: true }
  }

  #[must_use] pub fn name(&self) -> String { self.name.borrow().clone() }
  #[must_use] pub fn ty(&self) -> Type { self.ty.borrow().clone() }
}

#[derive(Debug, Clone)]
pub struct GlobalValueNode {
  pub name: String,
  pub ty: Type,
  pub init_text: String,
}

#[derive(Debug, Clone)]
pub struct StructElementNode {
  pub struct_name: String,
  pub base: ExprId,
  pub field_index: i64,
  pub array_index: i64,
  pub ty: Type,
}

/// The callee of a [`Expr::CallExpr`]: a direct name, or a value computed
/// through a function pointer.
#[derive(Debug, Clone)]
pub enum CallTarget {
  Named(String),
  Indirect(ExprId),
}

/// The ~30-kind tagged expression variant. Every kind carries its own
/// result type (via [`Expr::type_of`]) and children (as [`ExprId`]
/// handles into the owning function's expression table).
#[derive(Debug)]
pub enum Expr {
  Value(ValueNode),
  GlobalValue(GlobalValueNode),
  StackAlloc(ExprId),
  StructElement(StructElementNode),
  ArrayElement { base: ExprId, index: ExprId, ty: Type },
  /// Walking an aggregate's indices from `extractvalue`; the preceding
  /// chain is reachable through the last node's own `base` pointer, so
  /// only the last element needs printing (spec.md §4.4.3).
  ExtractValueExpr { indices: Vec<ExprId> },
  RefExpr { inner: ExprId, ty: Type },
  DerefExpr { inner: ExprId, ty: Type },
  CastExpr { inner: ExprId, target: Type },
  Binary { op: BinOp, left: ExprId, right: ExprId, ty: Type },
  CmpExpr { left: ExprId, right: ExprId, op: CmpOp, is_unsigned: bool },
  AssignExpr { left: ExprId, right: ExprId },
  SelectExpr { cond: ExprId, then_val: ExprId, else_val: ExprId, ty: Type },
  IfExpr { cmp: Option<ExprId>, true_block: BlockId, false_block: Option<BlockId> },
  SwitchExpr { discriminant: ExprId, default_block: Option<BlockId>, cases: Vec<(i64, BlockId)> },
  RetExpr { value: Option<ExprId> },
  CallExpr { callee: CallTarget, params: Vec<ExprId>, ret_ty: Type, is_func_pointer: bool },
  AsmExpr {
    template: String,
    outputs: RefCell<Vec<(String, Option<ExprId>)>>,
    inputs: Vec<(String, ExprId)>,
    clobbers: String,
  },
  /// The printed form is `args.last()` (an `ArrayElement`/`StructElement`
  /// chain); earlier args exist only for type tracking during lifting
  /// (spec.md §4.4.2, step 5).
  GepExpr { args: Vec<ExprId>, ty: Type },
  PointerShift { ptr_type: Type, pointer: ExprId, shift: ExprId },
}

impl Expr {
  /// The result type of this node, per spec.md §3's "each carrying result
  /// type and child expression references". `exprs` is the owning
  /// function's table, needed to resolve children whose type must be
  /// looked up rather than stored directly.
  #[must_use] pub fn type_of(&self, exprs: &[Expr]) -> Type {
    match self {
      Expr::Value(v) => v.ty(),
      Expr::GlobalValue(g) => g.ty.clone(),
      Expr::StackAlloc(v) => exprs[v.0 as usize].type_of(exprs),
      Expr::StructElement(s) => s.ty.clone(),
      Expr::ArrayElement { ty, .. }
      | Expr::Binary { ty, .. }
      | Expr::SelectExpr { ty, .. }
      | Expr::GepExpr { ty, .. } => ty.clone(),
      Expr::ExtractValueExpr { indices } =>
        indices.last().map_or_else(Type::void, |id| exprs[id.0 as usize].type_of(exprs)),
      Expr::RefExpr { ty, .. } | Expr::DerefExpr { ty, .. } => ty.clone(),
      Expr::CastExpr { target, .. } => target.clone(),
      Expr::CmpExpr { .. } => Type::int(32, false),
      Expr::AssignExpr { left, .. } => exprs[left.0 as usize].type_of(exprs),
      Expr::IfExpr { .. } | Expr::SwitchExpr { .. } | Expr::RetExpr { .. } => Type::void(),
      Expr::CallExpr { ret_ty, .. } => ret_ty.clone(),
      Expr::AsmExpr { .. } => Type::void(),
      Expr::PointerShift { ptr_type, .. } => ptr_type.clone(),
    }
  }

  /// True iff the Writer may omit parentheses around this node when it
  /// appears as a child of another expression (spec.md §4.2, §4.5).
  #[must_use] pub fn is_simple(&self) -> bool {
    matches!(
      self,
      Expr::Value(_) | Expr::GlobalValue(_) | Expr::RefExpr { .. }
        | Expr::DerefExpr { .. } | Expr::StructElement(_) | Expr::ArrayElement { .. }
    )
  }
}

/// One method per node kind, matching the original tool's `ExprVisitor`
/// one for one. Default bodies are empty so implementors only override
/// the kinds they care about; the Writer overrides all of them.
#[allow(unused_variables)]
pub trait ExprVisitor {
  fn visit_value(&mut self, n: &ValueNode) {}
  fn visit_global_value(&mut self, n: &GlobalValueNode) {}
  fn visit_stack_alloc(&mut self, value: ExprId) {}
  fn visit_struct_element(&mut self, n: &StructElementNode) {}
  fn visit_array_element(&mut self, base: ExprId, index: ExprId, ty: &Type) {}
  fn visit_extract_value(&mut self, indices: &[ExprId]) {}
  fn visit_ref(&mut self, inner: ExprId, ty: &Type) {}
  fn visit_deref(&mut self, inner: ExprId, ty: &Type) {}
  fn visit_cast(&mut self, inner: ExprId, target: &Type) {}
  fn visit_binary(&mut self, op: BinOp, left: ExprId, right: ExprId, ty: &Type) {}
  fn visit_cmp(&mut self, left: ExprId, right: ExprId, op: CmpOp, is_unsigned: bool) {}
  fn visit_assign(&mut self, left: ExprId, right: ExprId) {}
  fn visit_select(&mut self, cond: ExprId, then_val: ExprId, else_val: ExprId, ty: &Type) {}
  fn visit_if(&mut self, cmp: Option<ExprId>, true_block: BlockId, false_block: Option<BlockId>) {}
  fn visit_switch(&mut self, discriminant: ExprId, default_block: Option<BlockId>, cases: &[(i64, BlockId)]) {}
  fn visit_ret(&mut self, value: Option<ExprId>) {}
  fn visit_call(&mut self, callee: &CallTarget, params: &[ExprId], ret_ty: &Type, is_func_pointer: bool) {}
  fn visit_asm(
    &mut self,
    template: &str,
    outputs: &RefCell<Vec<(String, Option<ExprId>)>>,
    inputs: &[(String, ExprId)],
    clobbers: &str,
  ) {}
  fn visit_gep(&mut self, args: &[ExprId], ty: &Type) {}
  fn visit_pointer_shift(&mut self, ptr_type: &Type, pointer: ExprId, shift: ExprId) {}
}

/// Dispatches `expr` (looked up by `id` in `exprs`) to the matching
/// visitor method — the sum-type equivalent of the original tool's
/// `accept(ExprVisitor&)` double dispatch.
pub fn accept<V: ExprVisitor>(exprs: &[Expr], id: ExprId, v: &mut V) {
  match &exprs[id.0 as usize] {
    Expr::Value(n) => v.visit_value(n),
    Expr::GlobalValue(n) => v.visit_global_value(n),
    Expr::StackAlloc(val) => v.visit_stack_alloc(*val),
    Expr::StructElement(n) => v.visit_struct_element(n),
    Expr::ArrayElement { base, index, ty } => v.visit_array_element(*base, *index, ty),
    Expr::ExtractValueExpr { indices } => v.visit_extract_value(indices),
    Expr::RefExpr { inner, ty } => v.visit_ref(*inner, ty),
    Expr::DerefExpr { inner, ty } => v.visit_deref(*inner, ty),
    Expr::CastExpr { inner, target } => v.visit_cast(*inner, target),
    Expr::Binary { op, left, right, ty } => v.visit_binary(*op, *left, *right, ty),
    Expr::CmpExpr { left, right, op, is_unsigned } => v.visit_cmp(*left, *right, *op, *is_unsigned),
    Expr::AssignExpr { left, right } => v.visit_assign(*left, *right),
    Expr::SelectExpr { cond, then_val, else_val, ty } => v.visit_select(*cond, *then_val, *else_val, ty),
    Expr::IfExpr { cmp, true_block, false_block } => v.visit_if(*cmp, *true_block, *false_block),
    Expr::SwitchExpr { discriminant, default_block, cases } =>
      v.visit_switch(*discriminant, *default_block, cases),
    Expr::RetExpr { value } => v.visit_ret(*value),
    Expr::CallExpr { callee, params, ret_ty, is_func_pointer } =>
      v.visit_call(callee, params, ret_ty, *is_func_pointer),
    Expr::AsmExpr { template, outputs, inputs, clobbers } =>
      v.visit_asm(template, outputs, inputs, clobbers),
    Expr::GepExpr { args, ty } => v.visit_gep(args, ty),
    Expr::PointerShift { ptr_type, pointer, shift } => v.visit_pointer_shift(ptr_type, *pointer, *shift),
  }
}
