//! x86-64 System V assembly generation via text emission.
//!
//! Mirrors the IR generator's per-function isolation: each [`IrFunction`]
//! gets its own [`Locals`] stack-slot allocation, so offsets never leak
//! between functions.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::CompileError;
use crate::intrinsics;
use crate::ir::{IRVar, Instruction, Label};
use crate::ir_gen::IrFunction;
use crate::token::SourceLocation;

const ARG_REGISTERS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];

/// Assigns one 8-byte stack slot per distinct [`IRVar`] referenced by a
/// function's instructions, at `-8k(%rbp)`. The total frame size is
/// rounded up to a 16-byte boundary to keep `call` sites aligned.
struct Locals {
    offsets: HashMap<IRVar, i64>,
    frame_size: i64,
}

impl Locals {
    fn collect(f: &IrFunction) -> Locals {
        let mut offsets = HashMap::new();
        let mut next_slot: i64 = 1;
        // Every parameter gets a slot up front, even ones the body never
        // reads, since generate_function always unpacks all of them from
        // argument registers before running the body's instructions.
        for param in &f.params {
            assign_slot(&IRVar(param.clone()), &mut offsets, &mut next_slot);
        }
        for instr in &f.instructions {
            match instr {
                Instruction::LoadIntConst { dest, .. } | Instruction::LoadBoolConst { dest, .. } => {
                    assign_slot(dest, &mut offsets, &mut next_slot);
                }
                Instruction::Copy { source, dest, .. } => {
                    assign_slot(source, &mut offsets, &mut next_slot);
                    assign_slot(dest, &mut offsets, &mut next_slot);
                }
                Instruction::Call { args, dest, .. } => {
                    for a in args {
                        assign_slot(a, &mut offsets, &mut next_slot);
                    }
                    assign_slot(dest, &mut offsets, &mut next_slot);
                }
                Instruction::CondJump { cond, .. } => {
                    assign_slot(cond, &mut offsets, &mut next_slot);
                }
                Instruction::Jump { .. } | Instruction::Label { .. } => {}
            }
        }
        let slot_count = next_slot - 1;
        let frame_size = round_up_16(slot_count * 8);
        Locals {
            offsets,
            frame_size,
        }
    }

    fn offset(&self, var: &IRVar) -> i64 {
        *self
            .offsets
            .get(var)
            .unwrap_or_else(|| panic!("internal error: no stack slot assigned for {var}"))
    }
}

fn round_up_16(n: i64) -> i64 {
    ((n + 15) / 16) * 16
}

fn assign_slot(var: &IRVar, offsets: &mut HashMap<IRVar, i64>, next_slot: &mut i64) {
    if !offsets.contains_key(var) {
        offsets.insert(var.clone(), -8 * *next_slot);
        *next_slot += 1;
    }
}

/// Generates the full assembly text for a compiled program: the extern
/// declarations for the runtime helpers, then one label per function.
pub fn generate_program(functions: &[IrFunction]) -> Result<String, CompileError> {
    let mut out = String::new();
    let _ = writeln!(out, "    .extern print_int");
    let _ = writeln!(out, "    .extern print_bool");
    let _ = writeln!(out, "    .extern read_int");
    let _ = writeln!(out, "    .global main");
    let _ = writeln!(out, "    .text");
    for f in functions {
        generate_function(f, &mut out)?;
    }
    Ok(out)
}

fn generate_function(f: &IrFunction, out: &mut String) -> Result<(), CompileError> {
    if f.params.len() > ARG_REGISTERS.len() {
        return Err(CompileError::lowering(
            SourceLocation::synthetic(),
            format!(
                "function '{}' has {} parameters; more than {} is not supported",
                f.name,
                f.params.len(),
                ARG_REGISTERS.len()
            ),
        ));
    }
    let locals = Locals::collect(f);

    let _ = writeln!(out, "{}:", f.name);
    let _ = writeln!(out, "    pushq %rbp");
    let _ = writeln!(out, "    movq %rsp, %rbp");
    if locals.frame_size > 0 {
        let _ = writeln!(out, "    subq ${}, %rsp", locals.frame_size);
    }

    for (i, param) in f.params.iter().enumerate() {
        let offset = locals.offset(&IRVar(param.clone()));
        let _ = writeln!(out, "    movq {}, {offset}(%rbp)", ARG_REGISTERS[i]);
    }

    for instr in &f.instructions {
        generate_instruction(instr, &locals, out)?;
    }

    if f.name == "main" {
        let _ = writeln!(out, "    movq $0, %rax");
    } else {
        let return_offset = locals.offset(&IRVar("return_slot".to_string()));
        let _ = writeln!(out, "    movq {return_offset}(%rbp), %rax");
    }
    let _ = writeln!(out, "    leave");
    let _ = writeln!(out, "    ret");
    Ok(())
}

fn generate_instruction(
    instr: &Instruction,
    locals: &Locals,
    out: &mut String,
) -> Result<(), CompileError> {
    match instr {
        Instruction::LoadIntConst { value, dest, .. } => {
            let _ = writeln!(out, "    movq ${value}, {}(%rbp)", locals.offset(dest));
        }
        Instruction::LoadBoolConst { value, dest, .. } => {
            let v = if *value { 1 } else { 0 };
            let _ = writeln!(out, "    movq ${v}, {}(%rbp)", locals.offset(dest));
        }
        Instruction::Copy { source, dest, .. } => {
            if source == dest {
                return Ok(());
            }
            let _ = writeln!(out, "    movq {}(%rbp), %rax", locals.offset(source));
            let _ = writeln!(out, "    movq %rax, {}(%rbp)", locals.offset(dest));
        }
        Instruction::Call {
            fun, args, dest, ..
        } => {
            generate_call(fun, args, dest, locals, out)?;
        }
        Instruction::Jump { label, .. } => {
            let _ = writeln!(out, "    jmp {}", label_name(label));
        }
        Instruction::CondJump {
            cond,
            then_label,
            else_label,
            ..
        } => {
            let _ = writeln!(out, "    cmpq $0, {}(%rbp)", locals.offset(cond));
            let _ = writeln!(out, "    jne {}", label_name(then_label));
            let _ = writeln!(out, "    jmp {}", label_name(else_label));
        }
        Instruction::Label { label, .. } => {
            let _ = writeln!(out, "{}:", label_name(label));
        }
    }
    Ok(())
}

fn generate_call(
    fun: &IRVar,
    args: &[IRVar],
    dest: &IRVar,
    locals: &Locals,
    out: &mut String,
) -> Result<(), CompileError> {
    let name = fun.0.as_str();
    if intrinsics::is_intrinsic(name) {
        let arg_offsets: Vec<i64> = args.iter().map(|a| locals.offset(a)).collect();
        let dest_offset = locals.offset(dest);
        let emitted = intrinsics::emit(name, &arg_offsets, dest_offset, out);
        debug_assert!(emitted, "is_intrinsic and emit disagree for '{name}'");
        return Ok(());
    }
    if args.len() > ARG_REGISTERS.len() {
        return Err(CompileError::lowering(
            SourceLocation::synthetic(),
            format!(
                "call to '{name}' has {} arguments; more than {} is not supported",
                args.len(),
                ARG_REGISTERS.len()
            ),
        ));
    }
    for (i, arg) in args.iter().enumerate() {
        let _ = writeln!(out, "    movq {}(%rbp), {}", locals.offset(arg), ARG_REGISTERS[i]);
    }
    let _ = writeln!(out, "    movq $0, %rax");
    let _ = writeln!(out, "    callq {name}");
    let _ = writeln!(out, "    movq %rax, {}(%rbp)", locals.offset(dest));
    Ok(())
}

fn label_name(label: &Label) -> &str {
    &label.0
}
