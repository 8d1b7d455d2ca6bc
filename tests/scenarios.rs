//! End-to-end scenarios: build an `IrModule` directly (no textual-IR
//! parser in this crate) and check the C the engine reconstructs from it.

use ir2c::ir::{
  IrBlock, IrCallee, IrConstant, IrDwarfTag, IrDebugType, IrDebugVar, IrFunction, IrInstKind,
  IrInstruction, IrIntValue, IrLinkage, IrModule, IrOpcode, IrOperand, IrParam,
  IrStruct, IrType, ValueId,
};
use ir2c::write::write_program;

fn i32_ty() -> IrType { IrType::Int { width: 32, unsigned: false } }

fn const_i32(v: i64) -> IrOperand {
  IrOperand::Const(IrConstant::Int { width: 32, value: IrIntValue::Small(v) })
}

fn one_block_fn(name: &str, ret: IrType, params: Vec<IrParam>, instructions: Vec<IrInstruction>) -> IrFunction {
  IrFunction {
    name: name.to_string(),
    params,
    ret,
    is_vararg: false,
    is_declaration: false,
    linkage: IrLinkage::External,
    blocks: vec![IrBlock { id: ir2c::ir::BlockId(0), name: None, instructions, do_inline: false }],
  }
}

/// S1 — constant addition: `%r = add i32 1, 2; ret i32 %r`.
#[test]
fn constant_addition() {
  let add = IrInstruction {
    id: ValueId(0),
    opcode: IrOpcode::Add,
    ty: i32_ty(),
    operands: vec![const_i32(1), const_i32(2)],
    kind: IrInstKind::Plain,
  };
  let ret = IrInstruction {
    id: ValueId(1),
    opcode: IrOpcode::Ret,
    ty: i32_ty(),
    operands: vec![IrOperand::Value(ValueId(0))],
    kind: IrInstKind::Plain,
  };
  let module = IrModule {
    structs: vec![],
    globals: vec![],
    functions: vec![one_block_fn("add_two", i32_ty(), vec![], vec![add, ret])],
  };

  let ctx = ir2c::lift(&module).expect("lift");
  let rendered = write_program(&ctx);
  assert!(rendered.contains("int var0 = 1 + 2;"), "rendered:\n{rendered}");
  assert!(rendered.contains("return var0;"), "rendered:\n{rendered}");
}

/// S2 — pointer load/store: `%p = alloca i32; store i32 7, i32* %p;
/// %v = load i32, i32* %p; ret i32 %v`.
#[test]
fn pointer_load_store() {
  let alloca = IrInstruction {
    id: ValueId(0),
    opcode: IrOpcode::Alloca,
    ty: i32_ty(),
    operands: vec![],
    kind: IrInstKind::Plain,
  };
  let store = IrInstruction {
    id: ValueId(1),
    opcode: IrOpcode::Store,
    ty: IrType::Void,
    operands: vec![const_i32(7), IrOperand::Value(ValueId(0))],
    kind: IrInstKind::Plain,
  };
  let load = IrInstruction {
    id: ValueId(2),
    opcode: IrOpcode::Load,
    ty: i32_ty(),
    operands: vec![IrOperand::Value(ValueId(0))],
    kind: IrInstKind::Plain,
  };
  let ret = IrInstruction {
    id: ValueId(3),
    opcode: IrOpcode::Ret,
    ty: i32_ty(),
    operands: vec![IrOperand::Value(ValueId(2))],
    kind: IrInstKind::Plain,
  };
  let module = IrModule {
    structs: vec![],
    globals: vec![],
    functions: vec![one_block_fn("roundtrip", i32_ty(), vec![], vec![alloca, store, load, ret])],
  };

  let ctx = ir2c::lift(&module).expect("lift");
  let rendered = write_program(&ctx);
  assert!(rendered.contains("int var0;"), "rendered:\n{rendered}");
  assert!(rendered.contains("*&var0 = 7;"), "rendered:\n{rendered}");
  // Load is expression-only (spec.md §4.4): it must not allocate a second
  // named local, and its dereference is re-emitted directly at the return.
  assert!(!rendered.contains("var1"), "load bound to an unnecessary temporary:\n{rendered}");
  assert!(rendered.contains("return *&var0;"), "rendered:\n{rendered}");
}

/// S3 — struct field: a two-field struct, an alloca, a GEP to field 1,
/// and a store through it. The rendered declarator must be valid C —
/// in particular it must never contain an adjacent `&&` token, which is
/// exactly the bug a correct "advance by 2" GEP lowering avoids.
#[test]
fn struct_field_store() {
  let struct_ty = IrType::Struct { name: "struct.S".to_string() };
  let alloca = IrInstruction {
    id: ValueId(0),
    opcode: IrOpcode::Alloca,
    ty: struct_ty.clone(),
    operands: vec![],
    kind: IrInstKind::Plain,
  };
  let gep = IrInstruction {
    id: ValueId(1),
    opcode: IrOpcode::GetElementPtr,
    ty: i32_ty(),
    operands: vec![IrOperand::Value(ValueId(0))],
    kind: IrInstKind::Gep { indices: vec![const_i32(0), const_i32(1)] },
  };
  let store = IrInstruction {
    id: ValueId(2),
    opcode: IrOpcode::Store,
    ty: IrType::Void,
    operands: vec![const_i32(5), IrOperand::Value(ValueId(1))],
    kind: IrInstKind::Plain,
  };
  let ret = IrInstruction {
    id: ValueId(3),
    opcode: IrOpcode::Ret,
    ty: IrType::Void,
    operands: vec![],
    kind: IrInstKind::Plain,
  };
  let module = IrModule {
    structs: vec![IrStruct { has_name: true, name: Some("struct.S".to_string()), elements: vec![i32_ty(), i32_ty()] }],
    globals: vec![],
    functions: vec![one_block_fn("set_field", IrType::Void, vec![], vec![alloca, gep, store, ret])],
  };

  let ctx = ir2c::lift(&module).expect("lift");
  let rendered = write_program(&ctx);
  assert!(rendered.contains("struct S"), "rendered:\n{rendered}");
  assert!(rendered.contains("structVar0"), "rendered:\n{rendered}");
  assert!(rendered.contains("(&var0)->structVar1 = 5;"), "GEP must be inlined at the store site:\n{rendered}");
  // GetElementPtr is expression-only (spec.md §4.4.2): no pointer temporary
  // should exist between the alloca's own `var0` and the store.
  assert!(!rendered.contains("var1"), "GEP bound to an unnecessary pointer temporary:\n{rendered}");
  assert!(!rendered.contains("&&"), "struct GEP produced an invalid double-& token:\n{rendered}");
}

/// S4 — a three-case switch with a default, rendered as `switch` over
/// `goto`s into its (auto-derived) block labels, preserving case order.
#[test]
fn switch_with_default() {
  let sw = IrInstruction {
    id: ValueId(1),
    opcode: IrOpcode::Switch,
    ty: IrType::Void,
    operands: vec![IrOperand::Value(ValueId(0))],
    kind: IrInstKind::Switch {
      default: Some(ir2c::ir::BlockId(3)),
      cases: vec![(0, ir2c::ir::BlockId(1)), (1, ir2c::ir::BlockId(2))],
    },
  };
  let param = IrParam { id: ValueId(0), name: Some("x".to_string()), ty: i32_ty() };
  let entry = IrBlock { id: ir2c::ir::BlockId(0), name: None, instructions: vec![sw], do_inline: false };
  let ret1 = IrInstruction { id: ValueId(2), opcode: IrOpcode::Ret, ty: i32_ty(), operands: vec![const_i32(1)], kind: IrInstKind::Plain };
  let ret2 = IrInstruction { id: ValueId(3), opcode: IrOpcode::Ret, ty: i32_ty(), operands: vec![const_i32(2)], kind: IrInstKind::Plain };
  let ret3 = IrInstruction { id: ValueId(4), opcode: IrOpcode::Ret, ty: i32_ty(), operands: vec![const_i32(3)], kind: IrInstKind::Plain };
  let bb1 = IrBlock { id: ir2c::ir::BlockId(1), name: None, instructions: vec![ret1], do_inline: false };
  let bb2 = IrBlock { id: ir2c::ir::BlockId(2), name: None, instructions: vec![ret2], do_inline: false };
  let bb3 = IrBlock { id: ir2c::ir::BlockId(3), name: None, instructions: vec![ret3], do_inline: false };
  let module = IrModule {
    structs: vec![],
    globals: vec![],
    functions: vec![IrFunction {
      name: "dispatch".to_string(),
      params: vec![param],
      ret: i32_ty(),
      is_vararg: false,
      is_declaration: false,
      linkage: IrLinkage::External,
      blocks: vec![entry, bb1, bb2, bb3],
    }],
  };

  let ctx = ir2c::lift(&module).expect("lift");
  let rendered = write_program(&ctx);
  assert!(rendered.contains("switch (x)"), "rendered:\n{rendered}");
  assert!(rendered.contains("case 0:"), "rendered:\n{rendered}");
  assert!(rendered.contains("case 1:"), "rendered:\n{rendered}");
  assert!(rendered.contains("default:"), "rendered:\n{rendered}");
  let case0_pos = rendered.find("case 0:").unwrap();
  let case1_pos = rendered.find("case 1:").unwrap();
  let default_pos = rendered.find("default:").unwrap();
  assert!(case0_pos < case1_pos && case1_pos < default_pos, "case order not preserved:\n{rendered}");
}

/// S5 — inline asm with a clobber: a single-output asm call whose output
/// local must be declared ahead of the `__asm__` statement (a GCC-asm
/// output operand names an already-declared lvalue, never a declaration).
#[test]
fn inline_asm_with_clobber() {
  let asm_call = IrInstruction {
    id: ValueId(0),
    opcode: IrOpcode::Call,
    ty: i32_ty(),
    operands: vec![const_i32(9)],
    kind: IrInstKind::Call {
      callee: IrCallee::InlineAsm { template: "mov $1, $0".to_string(), constraints: "=r,r,~{rax}".to_string() },
      args: vec![const_i32(9)],
    },
  };
  let ret = IrInstruction {
    id: ValueId(1),
    opcode: IrOpcode::Ret,
    ty: i32_ty(),
    operands: vec![IrOperand::Value(ValueId(0))],
    kind: IrInstKind::Plain,
  };
  let module = IrModule {
    structs: vec![],
    globals: vec![],
    functions: vec![one_block_fn("run_asm", i32_ty(), vec![], vec![asm_call, ret])],
  };

  let ctx = ir2c::lift(&module).expect("lift");
  let rendered = write_program(&ctx);
  assert!(rendered.contains("int var0;"), "output local not declared ahead of the asm statement:\n{rendered}");
  let decl_pos = rendered.find("int var0;").expect("declaration present");
  let asm_pos = rendered.find("__asm__(").expect("asm statement present");
  assert!(decl_pos < asm_pos, "declaration must precede the asm statement:\n{rendered}");
  assert!(rendered.contains("\"=r\" (var0)"), "rendered:\n{rendered}");
  assert!(rendered.contains("\"r\""), "rendered:\n{rendered}");
  assert!(rendered.contains("\"%rax\""), "rendered:\n{rendered}");
  assert!(rendered.contains("return var0;"), "rendered:\n{rendered}");
}

/// S6 — debug name recovery: a `dbg.declare` naming an alloca `count`
/// with debug type `unsigned int` recovers that declarator in place of
/// the engine's own synthesized `int var0`.
#[test]
fn debug_name_recovery() {
  let alloca = IrInstruction {
    id: ValueId(0),
    opcode: IrOpcode::Alloca,
    ty: i32_ty(),
    operands: vec![],
    kind: IrInstKind::Plain,
  };
  let dbg_declare = IrInstruction {
    id: ValueId(1),
    opcode: IrOpcode::Call,
    ty: IrType::Void,
    operands: vec![],
    kind: IrInstKind::DbgDeclare {
      value: IrOperand::Value(ValueId(0)),
      var: IrDebugVar { name: "count".to_string(), ty: IrDebugType::Basic { name: "unsigned int".to_string() } },
    },
  };
  let store = IrInstruction {
    id: ValueId(2),
    opcode: IrOpcode::Store,
    ty: IrType::Void,
    operands: vec![const_i32(0), IrOperand::Value(ValueId(0))],
    kind: IrInstKind::Plain,
  };
  let ret = IrInstruction { id: ValueId(3), opcode: IrOpcode::Ret, ty: IrType::Void, operands: vec![], kind: IrInstKind::Plain };
  let module = IrModule {
    structs: vec![],
    globals: vec![],
    functions: vec![one_block_fn("with_debug_name", IrType::Void, vec![], vec![alloca, dbg_declare, store, ret])],
  };

  let ctx = ir2c::lift(&module).expect("lift");
  let rendered = write_program(&ctx);
  assert!(rendered.contains("unsigned int count;"), "rendered:\n{rendered}");
  assert!(!rendered.contains("var0"), "synthesized name should have been replaced:\n{rendered}");
}

/// Dwarf const-qualified debug types also get recovered, independent of
/// [`debug_name_recovery`]'s unsigned/basic-type path.
#[test]
fn debug_const_qualifier_recovery() {
  let alloca = IrInstruction { id: ValueId(0), opcode: IrOpcode::Alloca, ty: i32_ty(), operands: vec![], kind: IrInstKind::Plain };
  let dbg_declare = IrInstruction {
    id: ValueId(1),
    opcode: IrOpcode::Call,
    ty: IrType::Void,
    operands: vec![],
    kind: IrInstKind::DbgDeclare {
      value: IrOperand::Value(ValueId(0)),
      var: IrDebugVar {
        name: "limit".to_string(),
        ty: IrDebugType::Derived { tag: IrDwarfTag::ConstType, base: Some(Box::new(IrDebugType::Basic { name: "int".to_string() })) },
      },
    },
  };
  let ret = IrInstruction { id: ValueId(2), opcode: IrOpcode::Ret, ty: IrType::Void, operands: vec![], kind: IrInstKind::Plain };
  let module = IrModule {
    structs: vec![],
    globals: vec![],
    functions: vec![one_block_fn("with_const", IrType::Void, vec![], vec![alloca, dbg_declare, ret])],
  };

  let ctx = ir2c::lift(&module).expect("lift");
  let rendered = write_program(&ctx);
  assert!(rendered.contains("const") && rendered.contains("limit"), "rendered:\n{rendered}");
}
