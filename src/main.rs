use std::fs;
use std::process::ExitCode;

use clap::Parser;
use inkwell::context::Context;

mod cli;

fn main() -> ExitCode {
    let args = cli::Args::parse();

    let source = match fs::read_to_string(&args.input_file) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("error: cannot read {}: {error}", args.input_file.display());
            return ExitCode::FAILURE;
        }
    };

    let (program, parse_errors) = manit::parse(&source);
    for error in &parse_errors {
        eprintln!("parse error: {error}");
    }

    if args.mode == cli::Mode::Parse {
        if let Err(error) = program.pretty_print() {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
        return if parse_errors.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let context = Context::create();
    let (module, codegen_errors) = manit::compile(&context, &program);
    for error in &codegen_errors {
        eprintln!("codegen error: {error}");
    }

    // The module is printed even when lowering or verification reported
    // errors, so the IR can be inspected.
    print!("{}", module.print_to_string());

    if parse_errors.is_empty() && codegen_errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
