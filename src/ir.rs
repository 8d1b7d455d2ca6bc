//! The read-only IR input contract.
//!
//! This module is *not* the subject of this crate: building a module that
//! satisfies it is the job of an external IR loader (an LLVM bitcode or
//! textual-IR parser, for instance). These types exist so the engine has a
//! concrete, structured input to consume, and so the CLI binary can
//! exercise the engine end to end by deserializing a module from JSON
//! instead of embedding a full LLVM frontend.
//!
//! Every type here is read-only from the engine's point of view: the
//! [`crate::lift`] pass never mutates an `Ir*` value, only the
//! [`crate::program::ProgramCtx`] and [`crate::expr`] trees it builds from
//! them.

use serde::{Deserialize, Serialize};

/// Identifies a value (an instruction result or function argument) within
/// a single function. Stable across the lifetime of the function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

impl std::fmt::Display for ValueId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "%{}", self.0) }
}

/// Identifies a basic block within a single function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl std::fmt::Display for BlockId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "bb{}", self.0) }
}

/// A source IR type, as the loader built it. See [`crate::types`] for the
/// translation of these into C declarators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IrType {
  Void,
  Int { width: u32, unsigned: bool },
  Float { kind: IrFloatKind },
  Pointer { pointee: Box<IrType> },
  Array { element: Box<IrType>, size: u64 },
  /// A reference to an identified or unnamed struct; the definition lives
  /// in [`IrModule::structs`], keyed by this name for named structs, or is
  /// resolved by the lifter for unnamed ones via [`IrModule::find_struct`].
  Struct { name: String },
  Function { ret: Box<IrType>, params: Vec<IrType>, is_vararg: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrFloatKind { Float, Double, LongDouble }

/// An ordered, possibly-anonymous aggregate type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IrStruct {
  /// Whether the source IR gave this struct a real name, as opposed to the
  /// loader assigning it a synthetic lookup key for an anonymous literal
  /// struct type. Either way `name` is the key every `IrType::Struct`
  /// reference resolves against.
  pub has_name: bool,
  pub name: Option<String>,
  pub elements: Vec<IrType>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrLinkage { External, Internal, Private, Other }

impl IrLinkage {
  #[must_use] pub fn is_private(self) -> bool { matches!(self, Self::Private) }
  #[must_use] pub fn is_internal(self) -> bool { matches!(self, Self::Internal | Self::Private) }
}

/// A compile-time constant value, as the loader represents it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum IrConstant {
  Null(IrType),
  /// `width <= 64`: `value` is the sign-extended decimal value. `width >
  /// 64`: `value` holds the raw unsigned bit pattern; the lifter renders
  /// it as an unsigned big-integer decimal (spec: "big-integer decimal
  /// otherwise").
  Int { width: u32, value: IrIntValue },
  Float(f64),
  /// `ConstantDataArray`-style aggregate initializer.
  DataArray(Vec<IrConstant>),
  /// A constant expression: an instruction evaluated at lift time rather
  /// than emitted into a block's statement list ("constant-expression
  /// mode" in spec.md §4.4).
  Expr(Box<IrInstruction>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum IrIntValue { Small(i64), Big(u128) }

/// An operand reference: what an instruction's inputs point at.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum IrOperand {
  /// A previously-lifted value within the same function (instruction
  /// result or parameter).
  Value(ValueId),
  /// A reference to a global variable, by name.
  Global(String),
  /// A reference to a function, by name (callee or function-pointer
  /// source).
  Func(String),
  /// A literal constant.
  Const(IrConstant),
}

/// `icmp`/`fcmp` predicates. `Ord`/`Uno`/`Bad` have no C lowering and are
/// rejected by the lifter (spec.md's open question on FCMP ORD/UNO).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrPredicate {
  IntEq, IntNe, IntUgt, IntUge, IntUlt, IntUle, IntSgt, IntSge, IntSlt, IntSle,
  FloatFalse, FloatTrue,
  FloatOeq, FloatOgt, FloatOge, FloatOlt, FloatOle, FloatOne,
  FloatUeq, FloatUgt, FloatUge, FloatUlt, FloatUle, FloatUne,
  FloatOrd, FloatUno,
  Bad,
}

/// The callee of a `call` instruction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum IrCallee {
  /// A direct call to a named function (may be an `llvm.*` intrinsic).
  Direct(String),
  /// An indirect call through a function-pointer value.
  Indirect(IrOperand),
  /// A call to inline assembly.
  InlineAsm { template: String, constraints: String },
}

/// The Dwarf tag of a derived debug type, so far as this engine cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrDwarfTag { ConstType, Other }

/// A local variable's debug-info descriptor, as referenced by
/// `llvm.dbg.declare`'s second metadata argument.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IrDebugVar {
  pub name: String,
  pub ty: IrDebugType,
}

/// The debug type tree, reduced to what §4.4.4 needs: recognizing
/// `DW_TAG_const_type`, walking to a composite/derived type's ultimate
/// base to detect a "void" debug type, and reading a basic type's name to
/// detect an `unsigned` spelling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum IrDebugType {
  Basic { name: String },
  Derived { tag: IrDwarfTag, base: Option<Box<IrDebugType>> },
  Composite { base: Option<Box<IrDebugType>> },
}

/// The opcode of an instruction. `Other` carries the unrecognized opcode's
/// name so [`crate::error::LiftError`] can name it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrOpcode {
  Add, FAdd, Sub, FSub, Mul, FMul,
  UDiv, SDiv, FDiv, URem, SRem, FRem,
  And, Or, Xor, Shl, LShr, AShr,
  Alloca, Load, Store,
  ICmp, FCmp,
  Br, Ret, Switch, Unreachable, Fence,
  Call,
  SExt, ZExt, Trunc, FPToSI, SIToFP, FPToUI, UIToFP, FPTrunc, FPExt, PtrToInt, IntToPtr, BitCast,
  Select, GetElementPtr, ExtractValue,
  Other(String),
}

/// Opcode-specific payload that does not fit in `operands`/`ty` alone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum IrInstKind {
  Plain,
  Cmp { predicate: IrPredicate },
  Switch { default: Option<BlockId>, cases: Vec<(i64, BlockId)> },
  Call { callee: IrCallee, args: Vec<IrOperand> },
  Cast { dest_ty: IrType },
  Gep { indices: Vec<IrOperand> },
  ExtractValue { indices: Vec<u32> },
  /// `llvm.dbg.declare(value, var-descriptor, ...)`.
  DbgDeclare { value: IrOperand, var: IrDebugVar },
  /// An unconditional branch's single target, or a conditional branch's
  /// `(cond, true, false)` triple.
  Br { cond: Option<IrOperand>, then_block: BlockId, else_block: Option<BlockId> },
}

/// A single SSA instruction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IrInstruction {
  pub id: ValueId,
  pub opcode: IrOpcode,
  pub ty: IrType,
  pub operands: Vec<IrOperand>,
  pub kind: IrInstKind,
}

impl IrInstruction {
  /// A one-line rendering used in error messages; not meant to be a
  /// faithful disassembly, only enough to identify the instruction.
  #[must_use] pub fn render(&self) -> String {
    format!("{} = {:?} {:?}", self.id, self.opcode, self.operands)
  }
}

/// A basic block: an ordered instruction list plus the block-inlining
/// signal produced by an external CFG pass (spec.md §9, "Open question:
/// block-inlining policy"). Defaults to `false` when a hand-built module
/// omits it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IrBlock {
  pub id: BlockId,
  pub name: Option<String>,
  pub instructions: Vec<IrInstruction>,
  #[serde(default)]
  pub do_inline: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IrParam {
  pub id: ValueId,
  pub name: Option<String>,
  pub ty: IrType,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IrFunction {
  pub name: String,
  pub params: Vec<IrParam>,
  pub ret: IrType,
  pub is_vararg: bool,
  pub is_declaration: bool,
  pub linkage: IrLinkage,
  pub blocks: Vec<IrBlock>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IrGlobal {
  pub name: String,
  /// The pointee type of the global (its value type, not its pointer type).
  pub ty: IrType,
  pub linkage: IrLinkage,
  pub initializer: Option<IrConstant>,
}

/// A complete IR module, as an external loader would build it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IrModule {
  pub structs: Vec<IrStruct>,
  pub globals: Vec<IrGlobal>,
  pub functions: Vec<IrFunction>,
}

impl IrModule {
  /// Looks up a struct type by its lookup key, named or not — `has_name`
  /// only controls whether the Writer prints the struct under that name or
  /// synthesizes an `anonStruct<N>` in its place.
  #[must_use] pub fn find_struct(&self, name: &str) -> Option<&IrStruct> {
    self.structs.iter().find(|s| s.name.as_deref() == Some(name))
  }
}
