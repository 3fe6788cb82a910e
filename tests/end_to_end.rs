//! End-to-end scenarios compiled down to assembly text. Running the
//! emitted assembly would require an external assembler/linker and the
//! hand-written runtime providing `print_int`/`print_bool`/`read_int`,
//! neither of which this crate implements, so these scenarios assert on
//! the generated instruction sequences instead of executing them.

use tinyc::{compile_to_assembly, CompileError};

fn compile(src: &str) -> String {
    compile_to_assembly(src).expect("expected successful compilation")
}

fn compile_err(src: &str) -> CompileError {
    compile_to_assembly(src).expect_err("expected compilation to fail")
}

#[test]
fn arithmetic_precedence_prints_seven() {
    // print_int(1 + 2 * 3); => 7
    let asm = compile("print_int(1 + 2 * 3);");
    assert!(asm.contains("$1"));
    assert!(asm.contains("$2"));
    assert!(asm.contains("$3"));
    assert!(asm.contains("addq"));
    assert!(asm.contains("imulq"));
    assert!(asm.contains("callq print_int"));
}

#[test]
fn while_loop_counts_down_from_five() {
    // var x = 5; while x > 0 do { print_int(x); x = x - 1; } => 5\n4\n3\n2\n1
    let asm = compile("var x = 5; while x > 0 do { print_int(x); x = x - 1; }");
    assert!(asm.contains("$5"));
    assert!(asm.contains("cmpq $0"));
    assert!(asm.contains("jne"));
    assert!(asm.contains("callq print_int"));
    assert!(asm.contains("subq") || asm.contains("movq"));
}

#[test]
fn if_then_else_prints_true() {
    // if 3 < 5 then print_bool(true) else print_bool(false); => true
    let asm = compile("if 3 < 5 then print_bool(true) else print_bool(false);");
    assert!(asm.contains("$3"));
    assert!(asm.contains("$5"));
    assert!(asm.contains("setl"));
    assert!(asm.contains("jne"));
    assert!(asm.contains("callq print_bool"));
}

#[test]
fn recursive_factorial_prints_one_hundred_twenty() {
    let src = "fun fact(n: Int): Int { \
        if n <= 1 then return 1; \
        return n * fact(n - 1); \
    } print_int(fact(5));";
    let asm = compile(src);
    assert!(asm.contains("fact:"));
    assert!(asm.contains("callq fact"));
    assert!(asm.contains("callq print_int"));
}

#[test]
fn division_and_modulo_print_three_and_one() {
    // var a = 10; var b = 3; print_int(a / b); print_int(a % b); => 3\n1
    let asm = compile("var a = 10; var b = 3; print_int(a / b); print_int(a % b);");
    assert!(asm.contains("idivq"));
    assert!(asm.matches("callq print_int").count() >= 2);
}

#[test]
fn short_circuit_or_elides_right_block() {
    // true or { print_bool(false); false } must print nothing, since the
    // right operand is only reachable when the left is false. The IR
    // encodes that as a conditional jump around the right operand's
    // instructions rather than executing them unconditionally.
    let asm = compile("true or { print_bool(false); false }");
    assert!(asm.contains("cmpq $0"));
    assert!(asm.contains("jne"));
}

#[test]
fn var_declared_bool_assigned_int_is_a_type_error() {
    assert!(matches!(
        compile_err("var x: Bool = 5"),
        CompileError::Type(_, _)
    ));
}

#[test]
fn missing_semicolon_between_block_statements_is_a_parse_error() {
    assert!(matches!(compile_err("{ a b }"), CompileError::Parse(_, _)));
}

#[test]
fn break_outside_loop_is_a_type_error() {
    assert!(matches!(compile_err("break"), CompileError::Type(_, _)));
}

#[test]
fn wrong_arity_call_is_a_type_error() {
    assert!(matches!(
        compile_err("fun f(a: Int): Int { a } f(1, 2)"),
        CompileError::Type(_, _)
    ));
}

#[test]
fn var_declaration_as_operand_is_a_parse_error() {
    assert!(matches!(
        compile_err("1 + var x = 5"),
        CompileError::Parse(_, _)
    ));
}
