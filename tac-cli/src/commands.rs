//! CLI command implementations.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use tac_cli::{CompileResult, Diagnostic, DiagnosticKind, Service};
use tac_common::Executable;
use tac_vm::{VmConfig, VM};

fn read_source(path: &Path) -> Result<String, i32> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("error: cannot read '{}': {e}", path.display());
        1
    })
}

/// Syntax errors are input errors; everything the verifier rejects is a
/// verification failure.
fn exit_code(diagnostic: &Diagnostic) -> i32 {
    match diagnostic.kind {
        DiagnosticKind::SyntaxError => 1,
        DiagnosticKind::DeclarationError | DiagnosticKind::TypeError => 2,
    }
}

/// Parse and verify a program file, keeping the artifact in `service`.
fn compile(service: &mut Service, path: &Path) -> Result<(usize, Arc<Executable>), i32> {
    let text = read_source(path)?;
    match service.compile(&text) {
        CompileResult::Compiled { handle, functions } => {
            let exe = service.executable(&handle).map_err(|e| {
                eprintln!("error: {e}");
                1
            })?;
            Ok((functions, exe))
        }
        CompileResult::Rejected(diagnostic) => {
            eprintln!("error: {diagnostic}");
            Err(exit_code(&diagnostic))
        }
        CompileResult::Collision { handle } => {
            eprintln!("error: handle {handle} already names a different program");
            Err(1)
        }
    }
}

/// Parse and verify a program.
pub fn check(path: &Path) -> Result<(), i32> {
    let (functions, _) = compile(&mut Service::new(), path)?;
    println!("OK: {} ({functions} functions)", path.display());
    Ok(())
}

/// Verify and run a program, streaming input and output.
pub fn run(
    path: &Path,
    input: Option<&Path>,
    config: VmConfig,
) -> Result<(), i32> {
    let (_, exe) = compile(&mut Service::new(), path)?;

    let stdout = io::stdout();
    match input {
        Some(input) => {
            let file = File::open(input).map_err(|e| {
                eprintln!("error: cannot read '{}': {e}", input.display());
                1
            })?;
            execute(&exe, BufReader::new(file), stdout.lock(), config)
        }
        None => execute(&exe, io::stdin().lock(), stdout.lock(), config),
    }
}

fn execute<R: BufRead, W: Write>(
    exe: &Executable,
    input: R,
    output: W,
    config: VmConfig,
) -> Result<(), i32> {
    let mut vm = VM::new(exe, input, output, config);
    vm.run().map_err(|e| {
        eprintln!("runtime error: {e}");
        3
    })
}

/// Print a program in canonical form.
pub fn fmt(path: &Path) -> Result<(), i32> {
    let text = read_source(path)?;
    let program = tac_assembler::assemble(&text).map_err(|e| {
        eprintln!("error: {}", Diagnostic::from(&e));
        1
    })?;
    print!("{}", tac_assembler::disassemble(&program));
    Ok(())
}
