//! Thin wrapper around invoking an external assembler/linker on the
//! generated assembly text. The assembler/linker itself, and the
//! hand-written runtime providing `print_int`/`print_bool`/`read_int`,
//! are external collaborators this crate does not implement.

use std::path::Path;
use std::process::Command;

use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::token::SourceLocation;

/// Writes `assembly` to `asm_path` and invokes `config.assembler()` on it
/// to produce `output_path`. Deletes the intermediate `.s` file unless
/// `config.keep_asm()` is set.
pub fn assemble_and_link(
    assembly: &str,
    asm_path: &Path,
    output_path: &Path,
    config: &CompilerConfig,
) -> Result<(), CompileError> {
    std::fs::write(asm_path, assembly).map_err(|e| {
        CompileError::lowering(
            SourceLocation::synthetic(),
            format!("failed to write {}: {e}", asm_path.display()),
        )
    })?;

    let mut cmd = Command::new(config.assembler());
    cmd.arg(asm_path).arg("-o").arg(output_path);
    for arg in config.extra_link_args() {
        cmd.arg(arg);
    }

    let status = cmd.status().map_err(|e| {
        CompileError::lowering(
            SourceLocation::synthetic(),
            format!("failed to run '{}': {e}", config.assembler()),
        )
    })?;

    if !config.keep_asm() {
        let _ = std::fs::remove_file(asm_path);
    }

    if !status.success() {
        return Err(CompileError::lowering(
            SourceLocation::synthetic(),
            format!("assembler/linker exited with status {status}"),
        ));
    }
    Ok(())
}
