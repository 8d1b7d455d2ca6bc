//! The C type model: one-to-one mapping from IR types to C declarators.
//!
//! A [`Type`] never prints itself in one shot. It prints in two parts, a
//! *prefix* and a *suffix*, and [`Type::surround_name`] is the only
//! operation allowed to glue them around a declared name — this is what
//! lets a function-pointer field or an array-of-pointers print correctly
//! without a second pass over the text.

use crate::ir::{IrFloatKind, IrType};

/// A scalar or aggregate C type, with its `const` qualifier tracked
/// alongside it (every variant carries one, per the source spec).
#[derive(Clone, Debug, PartialEq)]
pub struct Type {
  pub kind: TypeKind,
  pub is_const: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeKind {
  Void,
  Int(IntType),
  Float(FloatKind),
  Pointer(PointerType),
  Array(ArrayType),
  /// A reference to a struct defined elsewhere (in the Program Context).
  Struct(String),
  Function(FunctionType),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntType {
  pub width: u32,
  pub unsigned: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FloatKind { Float, Double, LongDouble }

/// Collapses every pointer shape C needs distinct declarator syntax for:
/// plain multi-level pointers (`levels` stars), pointer-to-array
/// (`is_array_pointer`, with `array_sizes` holding the trailing `[N]...`),
/// and pointer-to-function (`is_func_pointer`, with `func_params` holding
/// the already-rendered parameter list).
///
/// Invariant: `is_array_pointer ⇒ array_sizes != "" && levels >= 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerType {
  pub pointee: Box<Type>,
  pub levels: u32,
  pub array_sizes: String,
  pub is_array_pointer: bool,
  pub is_func_pointer: bool,
  pub func_params: String,
}

/// An array type. `pointer_attrs` is populated only when the element is a
/// function pointer or a pointer-to-array, the two shapes that need a
/// parenthesized `(*name[N])` declarator group instead of the default
/// `elem name[N]` one.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayType {
  pub element: Box<Type>,
  pub size: u64,
  pub is_pointer_array: bool,
  pub pointer_attrs: Option<Box<PointerType>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionType {
  pub ret: Box<Type>,
  pub params: Vec<Type>,
  pub is_vararg: bool,
}

impl Type {
  #[must_use] pub fn void() -> Self { Self { kind: TypeKind::Void, is_const: false } }

  #[must_use] pub fn int(width: u32, unsigned: bool) -> Self {
    Self { kind: TypeKind::Int(IntType { width, unsigned }), is_const: false }
  }

  /// A plain single-level pointer to `pointee` (neither a function- nor
  /// an array-pointer; use [`func_pointer_type`] for the former).
  #[must_use] pub fn pointer(pointee: Type) -> Self {
    Self {
      kind: TypeKind::Pointer(PointerType {
        pointee: Box::new(pointee),
        levels: 1,
        array_sizes: String::new(),
        is_array_pointer: false,
        is_func_pointer: false,
        func_params: String::new(),
      }),
      is_const: false,
    }
  }

  #[must_use] pub fn is_pointer(&self) -> bool { matches!(self.kind, TypeKind::Pointer(_)) }
  #[must_use] pub fn is_array(&self) -> bool { matches!(self.kind, TypeKind::Array(_)) }

  #[must_use] pub fn as_int(&self) -> Option<&IntType> {
    if let TypeKind::Int(i) = &self.kind { Some(i) } else { None }
  }

  #[must_use] pub fn as_pointer(&self) -> Option<&PointerType> {
    if let TypeKind::Pointer(p) = &self.kind { Some(p) } else { None }
  }

  #[must_use] pub fn as_array(&self) -> Option<&ArrayType> {
    if let TypeKind::Array(a) = &self.kind { Some(a) } else { None }
  }

  /// The unsigned counterpart of an integer type, used by the `LShr`
  /// writer rule (spec.md §4.4, "Shift"): `LShr`'s left operand is printed
  /// cast to the unsigned form of its type unless it is already unsigned.
  #[must_use] pub fn to_unsigned(&self) -> Type {
    match &self.kind {
      TypeKind::Int(i) => Type::int(i.width, true),
      _ => self.clone(),
    }
  }

  /// Splits the declarator into the text that precedes the name and the
  /// text that follows it. Concatenating `prefix + name + suffix` always
  /// yields a legal C declarator.
  #[must_use] pub fn declarator_parts(&self) -> (String, String) {
    let konst = if self.is_const { "const " } else { "" };
    match &self.kind {
      TypeKind::Void => (format!("{konst}void "), String::new()),
      TypeKind::Int(i) => {
        let unsigned = if i.unsigned { "unsigned " } else { "" };
        (format!("{konst}{unsigned}{} ", i.spelling()), String::new())
      }
      TypeKind::Float(f) => (format!("{konst}{} ", f.spelling()), String::new()),
      TypeKind::Struct(name) => (format!("{konst}struct {name} "), String::new()),
      TypeKind::Function(f) => {
        let params = render_params(&f.params, f.is_vararg);
        let (ret_prefix, ret_suffix) = f.ret.declarator_parts();
        (format!("{ret_prefix}"), format!("{ret_suffix}({params})"))
      }
      TypeKind::Pointer(p) => p.declarator_parts(self.is_const),
      TypeKind::Array(a) => a.declarator_parts(self.is_const),
    }
  }

  /// Produces a complete, legal C declarator for `name` of this type. The
  /// writer calls this once per first declaration of a `Value` (spec.md
  /// §4.5, "First declaration").
  #[must_use] pub fn surround_name(&self, name: &str) -> String {
    let (prefix, suffix) = self.declarator_parts();
    format!("{prefix}{name}{suffix}")
  }
}

impl IntType {
  #[must_use] pub fn spelling(&self) -> &'static str {
    let base = match self.width {
      1 => "bool",
      8 => "char",
      16 => "short",
      32 => "int",
      64 => "long long",
      128 => "__int128",
      _ => "int",
    };
    // `unsigned` is rendered by the caller prefixing "unsigned "; kept
    // separate so `spelling()` stays a pure lookup.
    base
  }
}

impl FloatKind {
  #[must_use] pub fn spelling(self) -> &'static str {
    match self {
      FloatKind::Float => "float",
      FloatKind::Double => "double",
      FloatKind::LongDouble => "long double",
    }
  }
}

impl PointerType {
  fn declarator_parts(&self, is_const: bool) -> (String, String) {
    let konst = if is_const { "const " } else { "" };
    let stars = "*".repeat(self.levels as usize);
    if self.is_func_pointer {
      let (ret_prefix, _) = self.pointee.declarator_parts();
      (format!("{konst}{ret_prefix}({stars}"), format!(")({})", self.func_params))
    } else if self.is_array_pointer {
      let (elem_prefix, _) = self.pointee.declarator_parts();
      (format!("{konst}{elem_prefix}({stars}"), format!("){}", self.array_sizes))
    } else {
      let (elem_prefix, elem_suffix) = self.pointee.declarator_parts();
      (format!("{konst}{elem_prefix}{stars}"), elem_suffix)
    }
  }
}

impl ArrayType {
  fn declarator_parts(&self, is_const: bool) -> (String, String) {
    let konst = if is_const { "const " } else { "" };
    if self.is_pointer_array {
      if let Some(attrs) = &self.pointer_attrs {
        let stars = "*".repeat(attrs.levels as usize);
        let (elem_prefix, _) = attrs.pointee.declarator_parts();
        if attrs.is_func_pointer {
          return (format!("{konst}{elem_prefix}({stars}"), format!(")[{}]({})", self.size, attrs.func_params));
        }
        if attrs.is_array_pointer {
          return (format!("{konst}{elem_prefix}({stars}"), format!(")[{}]{}", self.size, attrs.array_sizes));
        }
      }
    }
    let (elem_prefix, elem_suffix) = self.element.declarator_parts();
    (format!("{konst}{elem_prefix}"), format!("[{}]{elem_suffix}", self.size))
  }
}

pub(crate) fn render_params(params: &[Type], is_vararg: bool) -> String {
  let mut parts: Vec<String> = params.iter().map(|p| p.surround_name("")).collect();
  if is_vararg { parts.push("...".to_string()); }
  if parts.is_empty() { "void".to_string() } else { parts.join(", ") }
}

/// Translates a source IR type into its C counterpart.
///
/// Pure apart from never interning struct references itself: an unnamed
/// struct encountered here is printed by name only, and it is the caller's
/// (the lifter's) job to have already registered that name with the
/// Program Context (spec.md §4.1, §4.4.2).
#[must_use]
pub fn lower_ir_type(ir: &IrType, prefer_void_ptr: bool) -> Type {
  match ir {
    IrType::Void => Type::void(),
    IrType::Int { width, unsigned } => Type::int(*width, *unsigned),
    IrType::Float { kind } => {
      let kind = match kind {
        IrFloatKind::Float => FloatKind::Float,
        IrFloatKind::Double => FloatKind::Double,
        IrFloatKind::LongDouble => FloatKind::LongDouble,
      };
      Type { kind: TypeKind::Float(kind), is_const: false }
    }
    IrType::Struct { name } =>
      Type { kind: TypeKind::Struct(crate::program::ProgramCtx::strip_struct_prefix(name)), is_const: false },
    IrType::Pointer { pointee } => {
      let pointee_ty = if prefer_void_ptr { Type::void() } else { lower_ir_type(pointee, false) };
      Type::pointer(pointee_ty)
    }
    IrType::Array { element, size } => {
      let element_ty = lower_ir_type(element, false);
      Type {
        kind: TypeKind::Array(ArrayType {
          element: Box::new(element_ty),
          size: *size,
          is_pointer_array: false,
          pointer_attrs: None,
        }),
        is_const: false,
      }
    }
    IrType::Function { ret, params, is_vararg } => Type {
      kind: TypeKind::Function(FunctionType {
        ret: Box::new(lower_ir_type(ret, false)),
        params: params.iter().map(|p| lower_ir_type(p, false)).collect(),
        is_vararg: *is_vararg,
      }),
      is_const: false,
    },
  }
}

/// Collapses a pointer-to-function IR shape into a single [`PointerType`]
/// whose printed form surrounds a name as `ret_type (*NAME)(params)`
/// (spec.md §4.1).
#[must_use]
pub fn func_pointer_type(ret: Type, params: &[Type], is_vararg: bool) -> Type {
  let func_params = render_params(params, is_vararg);
  Type {
    kind: TypeKind::Pointer(PointerType {
      pointee: Box::new(ret),
      levels: 1,
      array_sizes: String::new(),
      is_array_pointer: false,
      is_func_pointer: true,
      func_params,
    }),
    is_const: false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_int_declarator() {
    let t = Type::int(32, false);
    assert_eq!(t.surround_name("x"), "int x");
  }

  #[test]
  fn unsigned_char() {
    let t = Type::int(8, true);
    // `spelling()` doesn't carry unsigned; the declarator must add it.
    let (prefix, _) = t.declarator_parts();
    assert_eq!(prefix, "unsigned char ");
  }

  #[test]
  fn pointer_to_int() {
    let t = Type {
      kind: TypeKind::Pointer(PointerType {
        pointee: Box::new(Type::int(32, false)),
        levels: 1,
        array_sizes: String::new(),
        is_array_pointer: false,
        is_func_pointer: false,
        func_params: String::new(),
      }),
      is_const: false,
    };
    assert_eq!(t.surround_name("p"), "int *p");
  }

  #[test]
  fn array_of_int() {
    let t = Type {
      kind: TypeKind::Array(ArrayType {
        element: Box::new(Type::int(32, false)),
        size: 4,
        is_pointer_array: false,
        pointer_attrs: None,
      }),
      is_const: false,
    };
    assert_eq!(t.surround_name("a"), "int a[4]");
  }

  #[test]
  fn function_pointer() {
    let t = func_pointer_type(Type::int(32, false), &[Type::int(32, false)], false);
    assert_eq!(t.surround_name("f"), "int (*f)(int)");
  }

  #[test]
  fn pointer_to_array() {
    let t = Type {
      kind: TypeKind::Pointer(PointerType {
        pointee: Box::new(Type::int(32, false)),
        levels: 1,
        array_sizes: "[4]".to_string(),
        is_array_pointer: true,
        is_func_pointer: false,
        func_params: String::new(),
      }),
      is_const: false,
    };
    assert_eq!(t.surround_name("p"), "int (*p)[4]");
  }

  #[test]
  fn nested_arrays() {
    let inner = Type {
      kind: TypeKind::Array(ArrayType { element: Box::new(Type::int(32, false)), size: 3, is_pointer_array: false, pointer_attrs: None }),
      is_const: false,
    };
    let outer = Type {
      kind: TypeKind::Array(ArrayType { element: Box::new(inner), size: 2, is_pointer_array: false, pointer_attrs: None }),
      is_const: false,
    };
    assert_eq!(outer.surround_name("a"), "int a[2][3]");
  }
}
