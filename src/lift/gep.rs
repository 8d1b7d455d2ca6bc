//! `getelementptr` lowering.
//!
//! A GEP's index list walks a chain of array/struct accesses starting
//! from a base pointer; this module rebuilds that chain as nested
//! [`ArrayElement`]/[`StructElement`] nodes and wraps the final access in
//! a [`RefExpr`] (GEP always yields a pointer, never the pointee value
//! itself).
//!
//! The "advance by 2" rule (spec.md, recovered from
//! `original_source/Block.cpp::parseGepInstruction`): when the base is a
//! pointer to a struct and more than two indices are present, the first
//! two indices are consumed together — the first as the usual
//! pointer-offset step, the second as that struct's field selector —
//! before the general per-index loop resumes on the field's type. With
//! exactly two indices only the first is consumed generically, and the
//! second is handled by the general loop like any other struct access.

use crate::error::{LiftError, Result};
use crate::expr::Expr;
use crate::ir::IrOperand;
use crate::types::{Type, TypeKind};

use super::Lifter;

/// Reads a GEP index operand as a compile-time integer; every LLVM GEP
/// index is a constant or an SSA value, but struct field selectors must
/// always be `i32` constants.
fn const_index(op: &IrOperand) -> Result<i64> {
  match op {
    IrOperand::Const(crate::ir::IrConstant::Int { value, .. }) => Ok(match value {
      crate::ir::IrIntValue::Small(v) => *v,
      crate::ir::IrIntValue::Big(v) => i64::try_from(*v).unwrap_or(i64::MAX),
    }),
    other => Err(LiftError::MissingOperand { rendered: format!("{other:?}"), operand_index: 0 }),
  }
}

impl Lifter<'_> {
  /// Lowers a `getelementptr`'s index list against `base_ty` (the type of
  /// the pointer `base_expr` already evaluates to). Returns the resulting
  /// pointer expression and its type.
  pub fn lower_gep(
    &mut self,
    base_ty: &Type,
    base_expr: crate::expr::ExprId,
    indices: &[IrOperand],
  ) -> Result<(crate::expr::ExprId, Type)> {
    let mut indices = indices.iter();
    let pointee_ty = match &base_ty.kind {
      TypeKind::Pointer(p) => (*p.pointee).clone(),
      _ => return Err(LiftError::UnsupportedType { rendered: format!("{base_ty:?}") }),
    };

    let idx0 = indices.next().ok_or_else(|| LiftError::MissingOperand {
      rendered: "getelementptr with no indices".to_string(),
      operand_index: 0,
    })?;
    let remaining = indices.clone().count();

    let mut args = Vec::new();
    let (mut cur_expr, mut cur_ty);

    if remaining >= 1 && matches!(&pointee_ty.kind, TypeKind::Struct(_)) {
      // advance-by-2: idx0 is the pointer-offset step (almost always the
      // constant 0), idx1 the field selector. Matches the base pointer
      // operand straight into the `StructElement`, with idx0 stashed in
      // `array_index` rather than an intervening `ArrayElement` node — an
      // extra indexing step here would double-print the address-of a
      // stack-allocated base already carries (`&var0` reused as the GEP's
      // own base operand).
      let ptr_offset = const_index(idx0).unwrap_or(0);

      let idx1 = indices.next().ok_or_else(|| LiftError::MissingOperand {
        rendered: "struct getelementptr missing field index".to_string(),
        operand_index: 1,
      })?;
      let field_index = const_index(idx1)?;
      let TypeKind::Struct(key) = &pointee_ty.kind else { unreachable!() };
      let key = key.clone();
      let struct_name = self.ctx.resolve_struct(self.module, &key).ok_or_else(|| LiftError::UnsupportedType {
        rendered: format!("unknown struct {key}"),
      })?;
      let struct_def = self.ctx.find_struct(&struct_name).ok_or_else(|| LiftError::UnsupportedType {
        rendered: format!("unknown struct {struct_name}"),
      })?;
      let field_ty = struct_def.fields.get(field_index as usize).cloned().ok_or_else(|| LiftError::UnsupportedType {
        rendered: format!("struct {struct_name} has no field {field_index}"),
      })?;
      cur_expr = self.func.alloc(Expr::StructElement(crate::expr::StructElementNode {
        struct_name: struct_name.clone(),
        base: base_expr,
        field_index,
        array_index: ptr_offset,
        ty: field_ty.clone(),
      }));
      cur_ty = field_ty;
      args.push(cur_expr);
    } else {
      let idx0_expr = self.operand_to_expr(idx0)?;
      cur_expr = self.func.alloc(Expr::ArrayElement { base: base_expr, index: idx0_expr, ty: pointee_ty.clone() });
      cur_ty = pointee_ty;
      args.push(cur_expr);
    }

    for idx in indices {
      match &cur_ty.kind.clone() {
        TypeKind::Struct(key) => {
          let field_index = const_index(idx)?;
          let struct_name = self.ctx.resolve_struct(self.module, key).ok_or_else(|| LiftError::UnsupportedType {
            rendered: format!("unknown struct {key}"),
          })?;
          let struct_def = self.ctx.find_struct(&struct_name).ok_or_else(|| LiftError::UnsupportedType {
            rendered: format!("unknown struct {struct_name}"),
          })?;
          let field_ty = struct_def.fields.get(field_index as usize).cloned().ok_or_else(|| LiftError::UnsupportedType {
            rendered: format!("struct {struct_name} has no field {field_index}"),
          })?;
          cur_expr = self.func.alloc(Expr::StructElement(crate::expr::StructElementNode {
            struct_name: struct_name.clone(),
            base: cur_expr,
            field_index,
            array_index: 0,
            ty: field_ty.clone(),
          }));
          cur_ty = field_ty;
        }
        TypeKind::Array(a) => {
          let idx_expr = self.operand_to_expr(idx)?;
          let elem_ty = (*a.element).clone();
          cur_expr = self.func.alloc(Expr::ArrayElement { base: cur_expr, index: idx_expr, ty: elem_ty.clone() });
          cur_ty = elem_ty;
        }
        TypeKind::Pointer(p) => {
          let idx_expr = self.operand_to_expr(idx)?;
          let elem_ty = (*p.pointee).clone();
          cur_expr = self.func.alloc(Expr::ArrayElement { base: cur_expr, index: idx_expr, ty: elem_ty.clone() });
          cur_ty = elem_ty;
        }
        other => return Err(LiftError::UnsupportedType { rendered: format!("{other:?}") }),
      }
      args.push(cur_expr);
    }

    let result_ty = Type::pointer(cur_ty);
    let reference = self.func.alloc(Expr::RefExpr { inner: cur_expr, ty: result_ty.clone() });
    args.push(reference);

    let gep = self.func.alloc(Expr::GepExpr { args, ty: result_ty.clone() });
    Ok((gep, result_ty))
  }
}
