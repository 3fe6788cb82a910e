//! The fixed catalog of operators implemented as inline x86-64
//! instruction sequences rather than real `callq`s. The operator set is
//! closed (the language has no user-defined operators), so this is a
//! `match` over a fixed list of names rather than a runtime table.

use std::fmt::Write as _;

/// Emits the instruction sequence for `name` applied to the stack-slot
/// offsets in `args`, storing the result at `dest`. Returns `false` (and
/// emits nothing) when `name` is not one of the built-in intrinsics, in
/// which case the caller should fall back to a genuine `callq`.
pub fn emit(name: &str, args: &[i64], dest: i64, out: &mut String) -> bool {
    match (name, args) {
        ("+", [a, b]) => binary_arith(*a, *b, dest, "addq", out),
        ("-", [a, b]) => binary_arith(*a, *b, dest, "subq", out),
        ("*", [a, b]) => binary_arith(*a, *b, dest, "imulq", out),
        ("/", [a, b]) => div_mod(*a, *b, dest, false, out),
        ("%", [a, b]) => div_mod(*a, *b, dest, true, out),
        ("-", [a]) => {
            let _ = writeln!(out, "    movq {a}(%rbp), %rax");
            let _ = writeln!(out, "    negq %rax");
            let _ = writeln!(out, "    movq %rax, {dest}(%rbp)");
            true
        }
        ("not", [a]) => {
            let _ = writeln!(out, "    movq {a}(%rbp), %rax");
            let _ = writeln!(out, "    xorq $1, %rax");
            let _ = writeln!(out, "    movq %rax, {dest}(%rbp)");
            true
        }
        ("<", [a, b]) => compare(*a, *b, dest, "setl", out),
        ("<=", [a, b]) => compare(*a, *b, dest, "setle", out),
        (">", [a, b]) => compare(*a, *b, dest, "setg", out),
        (">=", [a, b]) => compare(*a, *b, dest, "setge", out),
        ("==", [a, b]) => compare(*a, *b, dest, "sete", out),
        ("!=", [a, b]) => compare(*a, *b, dest, "setne", out),
        _ => false,
    }
}

fn binary_arith(a: i64, b: i64, dest: i64, op: &str, out: &mut String) -> bool {
    let _ = writeln!(out, "    movq {a}(%rbp), %rax");
    let _ = writeln!(out, "    {op} {b}(%rbp), %rax");
    let _ = writeln!(out, "    movq %rax, {dest}(%rbp)");
    true
}

fn div_mod(a: i64, b: i64, dest: i64, want_remainder: bool, out: &mut String) -> bool {
    let _ = writeln!(out, "    movq {a}(%rbp), %rax");
    let _ = writeln!(out, "    cqto");
    let _ = writeln!(out, "    idivq {b}(%rbp)");
    let result_reg = if want_remainder { "%rdx" } else { "%rax" };
    let _ = writeln!(out, "    movq {result_reg}, {dest}(%rbp)");
    true
}

fn compare(a: i64, b: i64, dest: i64, set_op: &str, out: &mut String) -> bool {
    let _ = writeln!(out, "    movq {a}(%rbp), %rax");
    let _ = writeln!(out, "    cmpq {b}(%rbp), %rax");
    let _ = writeln!(out, "    {set_op} %al");
    let _ = writeln!(out, "    movzbq %al, %rax");
    let _ = writeln!(out, "    movq %rax, {dest}(%rbp)");
    true
}

/// Whether `name` is a known intrinsic, independent of arity -- used by
/// the code generator to decide between emitting inline instructions and
/// emitting a `callq`.
pub fn is_intrinsic(name: &str) -> bool {
    matches!(
        name,
        "+" | "-" | "*" | "/" | "%" | "not" | "<" | "<=" | ">" | ">=" | "==" | "!="
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_emits_addq() {
        let mut out = String::new();
        assert!(emit("+", &[-8, -16], -24, &mut out));
        assert!(out.contains("addq"));
    }

    #[test]
    fn test_division_uses_cqto_and_idiv() {
        let mut out = String::new();
        assert!(emit("/", &[-8, -16], -24, &mut out));
        assert!(out.contains("cqto"));
        assert!(out.contains("idivq"));
        assert!(out.contains("%rax, -24(%rbp)"));
    }

    #[test]
    fn test_modulo_reads_remainder_register() {
        let mut out = String::new();
        assert!(emit("%", &[-8, -16], -24, &mut out));
        assert!(out.contains("%rdx, -24(%rbp)"));
    }

    #[test]
    fn test_comparison_uses_setcc_then_movzbq() {
        let mut out = String::new();
        assert!(emit("<", &[-8, -16], -24, &mut out));
        assert!(out.contains("setl"));
        assert!(out.contains("movzbq"));
    }

    #[test]
    fn test_unknown_name_is_not_an_intrinsic() {
        let mut out = String::new();
        assert!(!emit("user_function", &[-8], -16, &mut out));
        assert!(out.is_empty());
        assert!(!is_intrinsic("user_function"));
    }
}
