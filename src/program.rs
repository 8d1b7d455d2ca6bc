//! The Program Context: exclusive owner of every `Func`, `Struct`, and
//! `GlobalValue` the engine builds, and the single place name synthesis
//! happens (spec.md §3, "Ownership and lifetimes").
//!
//! Each [`Func`] owns its own append-only table of [`Expr`] nodes,
//! indexed by [`ExprId`]; the `ProgramCtx` owns the `Func`s themselves
//! (plus structs and globals), anchoring the whole tree's lifetime at one
//! place: the `ProgramCtx` a caller keeps alive for as long as it wants to
//! read the lifted module back.

use std::collections::HashMap;
use hashbrown::HashSet;

use crate::expr::{Expr, ExprId};
use crate::ir::{IrModule, ValueId};
use crate::types::Type;

/// A struct definition, keyed by the name the Writer prints it under.
/// Unnamed IR structs are assigned a synthesized `anonStruct<N>` name the
/// first time they're encountered (spec.md §4.1).
#[derive(Clone, Debug)]
pub struct StructDef {
  pub name: String,
  pub fields: Vec<Type>,
  /// Per-field display name, parallel to `fields`. LLVM struct types carry
  /// no field names at all, so every field gets a synthesized
  /// `structVar<N>` the first time its owning struct is registered
  /// (spec.md §4.3, "Fresh struct field for unnamed members"), except the
  /// four canonical `__va_list_tag` fields, which keep their fixed names.
  pub field_names: Vec<String>,
  /// True for a struct synthesized by the engine itself rather than named
  /// in the source IR (currently only `__va_list_tag`, spec.md §4.4.2
  /// "variadic intrinsics").
  pub is_synthetic: bool,
}

#[derive(Clone, Debug)]
pub struct GlobalDef {
  pub name: String,
  pub ty: Type,
  pub is_extern: bool,
  pub init_text: Option<String>,
}

/// One lifted function: its parameter list, basic blocks (as rendered
/// statement lists, built by [`crate::lift`]), and the table owning every
/// `Expr` reachable from them.
pub struct Func {
  pub name: String,
  pub ret_ty: Type,
  pub params: Vec<(String, Type)>,
  pub is_vararg: bool,
  pub is_static: bool,
  /// True for a declaration-only function (no body lifted); the Writer
  /// prints these as a bare prototype instead of a definition (spec.md
  /// §6, "Output format": "function declarations ... function definitions").
  pub is_declaration: bool,
  pub exprs: Vec<Expr>,
  /// Maps a source value id to the expression that computed it, so later
  /// instructions referring back to it reuse the same node instead of
  /// re-lifting (spec.md §4.4, "Caches for identity").
  pub value_map: HashMap<ValueId, ExprId>,
  /// Blocks in layout order, each already rendered to a flat statement
  /// list by the lifter; `None` name means the block prints as a bare
  /// `bb<N>:` label.
  pub blocks: Vec<FuncBlock>,
  /// Each formal parameter's `Value` node, in declaration order — kept
  /// around so `va_start` lowering can pass the last one as its implicit
  /// trailing argument (spec.md §4.4.1).
  pub param_exprs: Vec<ExprId>,
  next_local: u32,
}

impl Func {
  #[must_use] pub fn new(
    name: String, ret_ty: Type, is_vararg: bool, is_static: bool, is_declaration: bool, next_local: u32,
  ) -> Self {
    Self {
      name,
      ret_ty,
      params: Vec::new(),
      is_vararg,
      is_static,
      is_declaration,
      exprs: Vec::new(),
      value_map: HashMap::new(),
      blocks: Vec::new(),
      param_exprs: Vec::new(),
      next_local,
    }
  }

  /// Appends a node to this function's expression table and returns a
  /// stable handle to it.
  pub fn alloc(&mut self, expr: Expr) -> ExprId {
    let id = ExprId(u32::try_from(self.exprs.len()).expect("function has more than u32::MAX expressions"));
    self.exprs.push(expr);
    id
  }

  #[must_use] pub fn get(&self, id: ExprId) -> &Expr { &self.exprs[id.0 as usize] }

  #[must_use] pub fn type_of(&self, id: ExprId) -> Type { self.get(id).type_of(&self.exprs) }

  /// Synthesizes the next `var<N>` name for a fresh local that has no
  /// name in the source IR (spec.md §4.1, "Name synthesis").
  pub fn fresh_local_name(&mut self) -> String {
    let n = self.next_local;
    self.next_local += 1;
    format!("var{n}")
  }
}

pub struct FuncBlock {
  pub id: crate::ir::BlockId,
  pub label: Option<String>,
  pub statements: Vec<ExprId>,
  /// Mirrors [`crate::ir::IrBlock::do_inline`]: when set, this block has a
  /// single predecessor and the Writer inlines its statements at that
  /// predecessor's `IfExpr`/`SwitchExpr` instead of printing it as its own
  /// labeled section (spec.md §4.5, "Blocks").
  pub do_inline: bool,
}

/// Synthesizes `structVar<N>`/`anonStruct<N>` names, independently per
/// kind, matching the source tool's two separate counters.
#[derive(Default)]
struct NameCounters {
  struct_var: u32,
  anon_struct: u32,
}

/// Feature flags toggled on while lifting, read back by the Writer to
/// decide which `#include`s the generated file needs (spec.md §4.6,
/// "Include detection").
#[derive(Default, Debug, Clone, Copy)]
pub struct Features {
  /// An `alloca` whose result is never read by name, only by address —
  /// the engine still allocates storage for it but never gave it a
  /// printable declarator (spec.md's "stack-ignored" edge case).
  pub stack_ignored: bool,
  pub has_vararg: bool,
  pub has_stdlib: bool,
  pub has_string: bool,
  pub has_stdio: bool,
  pub has_pthread: bool,
}

/// Owns every `Func`, `StructDef`, and `GlobalDef` produced while lifting
/// one [`IrModule`], plus the name-synthesis counters and feature flags
/// that span the whole module.
pub struct ProgramCtx {
  pub funcs: Vec<Func>,
  pub structs: Vec<StructDef>,
  pub globals: Vec<GlobalDef>,
  pub features: Features,
  /// Global CLI toggle for whether `#include` lines are emitted at all
  /// (spec.md §4.5/§6, the `includes` flag on `Program`).
  pub emit_includes: bool,
  /// CLI toggle suppressing explicit function-pointer casts on call sites
  /// (spec.md §4.5/§6, the `noFuncCasts` flag on `Program`).
  pub no_func_casts: bool,
  struct_names: HashSet<String>,
  counters: NameCounters,
  /// Maps an unnamed IR struct type's loader-supplied key to the
  /// `anonStruct<N>` display name assigned the first time it was seen
  /// (spec.md §4.4.2, "Unnamed struct types encountered during GEP are
  /// registered and assigned an anonStruct<N> name on first sighting").
  unnamed_structs: HashMap<String, String>,
  /// The lowest `var<N>` index guaranteed not to collide with a global
  /// already named `var<N>` (spec.md:92). Every `Func`'s local counter
  /// starts here instead of `0` so `fresh_local_name` never mints a name
  /// a global already holds.
  reserved_local_start: u32,
}

impl ProgramCtx {
  #[must_use] pub fn new() -> Self {
    Self {
      funcs: Vec::new(),
      structs: Vec::new(),
      globals: Vec::new(),
      features: Features::default(),
      emit_includes: true,
      no_func_casts: false,
      struct_names: HashSet::new(),
      counters: NameCounters::default(),
      unnamed_structs: HashMap::new(),
      reserved_local_start: 0,
    }
  }

  /// The starting value a newly-lifted `Func`'s local counter should use
  /// (spec.md:92, "Global-var names already matching `var[0-9]+` are
  /// excluded from the per-Func counter's reuse set").
  #[must_use] pub fn local_counter_start(&self) -> u32 { self.reserved_local_start }

  /// Synthesizes a fresh temporary name for a struct literal's backing
  /// variable (spec.md §4.1: `structVar<N>`).
  pub fn fresh_struct_var_name(&mut self) -> String {
    let n = self.counters.struct_var;
    self.counters.struct_var += 1;
    format!("structVar{n}")
  }

  /// Synthesizes a fresh name for an unnamed struct type, the first time
  /// it is encountered (spec.md §4.1: `anonStruct<N>`).
  pub fn fresh_anon_struct_name(&mut self) -> String {
    let n = self.counters.anon_struct;
    self.counters.anon_struct += 1;
    format!("anonStruct{n}")
  }

  /// Registers a struct definition under its final name, returning `false`
  /// without inserting if that name is already taken (the caller is
  /// expected to have made the name unique beforehand).
  pub fn register_struct(&mut self, def: StructDef) -> bool {
    if !self.struct_names.insert(def.name.clone()) { return false; }
    self.structs.push(def);
    true
  }

  #[must_use] pub fn find_struct(&self, name: &str) -> Option<&StructDef> {
    self.structs.iter().find(|s| s.name == name)
  }

  /// C rejects identifiers with `.` in them, which LLVM freely generates
  /// for promoted locals and internal globals; every synthesized or
  /// copied-through name is passed through this before being assigned to
  /// an expression node (spec.md §4.1, "Name synthesis").
  #[must_use] pub fn sanitize_name(name: &str) -> String { name.replace('.', "_") }

  /// LLVM's identified-struct types carry their tag under a `struct.`-
  /// prefixed type name (`%struct.S`); the struct's actual source-level
  /// name is everything after that prefix. Applied once, at the one place
  /// a raw IR struct key turns into a display name, so every later lookup
  /// by that key (registration, GEP/`extractvalue` struct resolution)
  /// already agrees on the stripped form.
  #[must_use] pub fn strip_struct_prefix(name: &str) -> String {
    name.strip_prefix("struct.").map_or_else(|| name.to_string(), str::to_string)
  }

  /// The global-variable naming rule used when a global is lowered from a
  /// pure constant expression rather than copied straight from a source
  /// IR global: the source tool's `ConstGlobalVar` prefix, applied on top
  /// of the usual `.`→`_` sanitization (spec.md §4.4.2's
  /// "constant-expression mode" note on globals).
  #[must_use] pub fn const_global_var_name(&self, base: &str) -> String {
    format!("ConstGlobalVar_{}", Self::sanitize_name(base))
  }

  /// Ensures the synthetic `__va_list_tag` struct backing `va_list` exists
  /// in this program, registering it on first use (spec.md §4.4.2,
  /// "variadic intrinsics").
  pub fn ensure_va_list_tag(&mut self) {
    if self.find_struct("__va_list_tag").is_some() {
      self.features.has_vararg = true;
      return;
    }
    let byte_ptr = crate::types::lower_ir_type(
      &crate::ir::IrType::Pointer { pointee: Box::new(crate::ir::IrType::Int { width: 8, unsigned: true }) },
      false,
    );
    self.register_struct(StructDef {
      name: "__va_list_tag".to_string(),
      fields: vec![Type::int(32, true), Type::int(32, true), byte_ptr.clone(), byte_ptr],
      field_names: vec![
        "gp_offset".to_string(), "fp_offset".to_string(),
        "overflow_arg_area".to_string(), "reg_save_area".to_string(),
      ],
      is_synthetic: true,
    });
    self.features.has_vararg = true;
  }

  /// Populates struct shells from the module's identified types; functions
  /// and globals are added afterwards by [`crate::lift`] as each is
  /// lifted, since lifting a function is what discovers its unnamed
  /// structs and its feature-flag contributions.
  pub fn seed_from_module(&mut self, module: &IrModule) {
    for s in &module.structs {
      if !s.has_name { continue; }
      let name = Self::strip_struct_prefix(&s.name.clone().unwrap_or_default());
      if self.struct_names.contains(&name) { continue; }
      let fields: Vec<Type> = s.elements.iter().map(|t| crate::types::lower_ir_type(t, false)).collect();
      let field_names = fields.iter().map(|_| self.fresh_struct_var_name()).collect();
      self.register_struct(StructDef { name, fields, field_names, is_synthetic: false });
    }
    for g in &module.globals {
      if let Some(n) = Self::var_index(&Self::sanitize_name(&g.name)) {
        self.reserved_local_start = self.reserved_local_start.max(n + 1);
      }
    }
  }

  /// Parses a name of the exact shape `var<N>` (digits only, no leading
  /// zero beyond a bare `0`) back to its index, the inverse of
  /// [`Func::fresh_local_name`]'s synthesis.
  fn var_index(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("var")?;
    if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) { return None; }
    digits.parse().ok()
  }

  /// Resolves a `Struct { name }` type's key to the struct's registered
  /// display name, lazily registering an unnamed IR struct type (assigning
  /// it a fresh `anonStruct<N>`) the first time it is encountered — the
  /// sighting is always driven by a GEP or `extractvalue` walking through
  /// it (spec.md §4.4.2, §4.4.3).
  pub fn resolve_struct(&mut self, module: &IrModule, key: &str) -> Option<String> {
    if self.find_struct(key).is_some() { return Some(key.to_string()); }
    if let Some(display) = self.unnamed_structs.get(key) { return Some(display.clone()); }
    let ir_struct = module.find_struct(key)?;
    let fields: Vec<Type> = ir_struct.elements.iter().map(|t| crate::types::lower_ir_type(t, false)).collect();
    let display = self.fresh_anon_struct_name();
    let field_names = fields.iter().map(|_| self.fresh_struct_var_name()).collect();
    self.register_struct(StructDef { name: display.clone(), fields, field_names, is_synthetic: false });
    self.unnamed_structs.insert(key.to_string(), display.clone());
    Some(display)
  }
}

impl Default for ProgramCtx {
  fn default() -> Self { Self::new() }
}
