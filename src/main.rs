use pixelbasic::{prepare, tokenize, Executor};
use std::env;
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut path = None;
    let mut show_trace = false;

    for arg in env::args().skip(1) {
        if arg == "--trace" {
            show_trace = true;
        } else {
            path = Some(arg);
        }
    }

    let path = match path {
        Some(path) => path,
        None => {
            println!("Usage: pixelbasic [--trace] <program.bas>");
            return ExitCode::FAILURE;
        }
    };

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(e) => {
            println!("Cannot read {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let tokens = match tokenize(&source) {
        Ok(tokens) => tokens,
        Err(e) => {
            println!("Tokenizer error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let program = match prepare(tokens) {
        Ok(program) => program,
        Err(e) => {
            println!("Prepare error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut executor = Executor::new();
    match executor.run(&program) {
        Ok(()) => {
            println!("Program completed: {} statements executed", executor.cycles());
        }
        Err(e) => {
            println!("Runtime error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if show_trace {
        println!("Trace (statement token indices):");
        for index in executor.trace() {
            let token = &program.tokens()[*index];
            println!("  {:4}  line {:3}  {:?}", index, token.line, token.kind);
        }
    }

    ExitCode::SUCCESS
}
