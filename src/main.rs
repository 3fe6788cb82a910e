//! tinyc CLI
//!
//! Command-line interface for compiling source files to executables.

use clap::Parser as ClapParser;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "tinyc")]
#[command(about = "tinyc compiler - compile source files to executables", long_about = None)]
struct Cli {
    /// Input source file
    input: PathBuf,

    /// Output executable path
    #[arg(short, long)]
    output: PathBuf,

    /// Keep the intermediate assembly file (.s)
    #[arg(long)]
    keep_asm: bool,

    /// Path to the external assembler/linker driver
    #[arg(long, default_value = "cc")]
    assembler: String,
}

fn main() {
    let cli = Cli::parse();

    let config = tinyc::CompilerConfig::new()
        .with_assembler(cli.assembler)
        .with_keep_asm(cli.keep_asm);

    match tinyc::compile_file(&cli.input, &cli.output, &config) {
        Ok(_) => {
            println!(
                "Compiled {} -> {}",
                cli.input.display(),
                cli.output.display()
            );
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
