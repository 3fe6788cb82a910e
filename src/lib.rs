//! `tinyc`: a whole-program compiler for a small, statically-typed,
//! expression-oriented language.
//!
//! The pipeline is source text -> tokens -> AST -> typed AST -> per-function
//! IR -> x86-64 assembly text. Turning that assembly text into a running
//! executable is left to an external assembler/linker, invoked by
//! [`compile_file`].

pub mod assemble;
pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod intrinsics;
pub mod ir;
pub mod ir_gen;
pub mod parser;
pub mod token;
pub mod typechecker;
pub mod types;

use std::path::Path;

pub use config::CompilerConfig;
pub use error::CompileError;

/// Runs every stage up to and including assembly generation, returning
/// the emitted assembly text. Does not touch the filesystem or invoke an
/// external assembler.
pub fn compile_to_assembly(source: &str) -> Result<String, CompileError> {
    let tokens = token::tokenize(source)?;
    let mut module = parser::parse(tokens)?;
    typechecker::check_module(&mut module)?;
    let functions = ir_gen::lower_module(&module);
    codegen::generate_program(&functions)
}

/// Compiles `source_path` to an executable at `output_path` using
/// `config` to control the external assembler/linker invocation.
pub fn compile_file(
    source_path: &Path,
    output_path: &Path,
    config: &CompilerConfig,
) -> Result<(), CompileError> {
    let source = std::fs::read_to_string(source_path).map_err(|e| {
        CompileError::lowering(
            token::SourceLocation::synthetic(),
            format!("failed to read {}: {e}", source_path.display()),
        )
    })?;
    let assembly = compile_to_assembly(&source)?;
    let asm_path = output_path.with_extension("s");
    assemble::assemble_and_link(&assembly, &asm_path, output_path, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple_expression_to_assembly() {
        let asm = compile_to_assembly("1 + 2 * 3").unwrap();
        assert!(asm.contains(".extern print_int"));
        assert!(asm.contains("main:"));
    }

    #[test]
    fn test_lexical_error_propagates() {
        let err = compile_to_assembly("1 @ 2").unwrap_err();
        assert!(matches!(err, CompileError::Lex(_, _)));
    }

    #[test]
    fn test_type_error_propagates() {
        let err = compile_to_assembly("1 + true").unwrap_err();
        assert!(matches!(err, CompileError::Type(_, _)));
    }

    #[test]
    fn test_parse_error_propagates() {
        let err = compile_to_assembly("(1 +").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_, _)));
    }

    #[test]
    fn test_independent_compilations_do_not_share_state() {
        let handles: Vec<_> = (0..4)
            .map(|i| std::thread::spawn(move || compile_to_assembly(&format!("{i} + 1")).unwrap()))
            .collect();
        let outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for (i, asm) in outputs.iter().enumerate() {
            assert!(asm.contains(&format!("${i}")));
        }
    }
}
