//! Smile language core CLI.
//!
//! In the style of the reference `main.rs`: a thin wrapper that reads a
//! source path from `argv`, hands it to the library, and reports the
//! three-valued [`smile::vm::EvalResult`] to the user. The bootstrap
//! precompiler, REPL, and bytecode-image format are out of scope, so
//! this binary only drives the built-in parser+compiler path — there
//! is no `.omgb`-equivalent image to load from disk.

use std::env;
use std::fs;
use std::process::ExitCode;

use smile::vm::EvalResult;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn usage() -> String {
    format!(
        r#"Smile language core v{0}

Usage:
 smile <script.sm>
 smile --dump-tree <script.sm>

Arguments:
 <script.sm>
 Path to a Smile source file to parse, compile, and run.

Options:
 -h, --help
 Show this help message and exit.
 -v, --version
 Show version.
 --dump-tree
 Print the parsed s-expression tree instead of running it (useful
 for inspecting the parser/custom-syntax engine without running a
 REPL round-trip)."#,
        VERSION
    )
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("{}", usage());
        return ExitCode::FAILURE;
    }

    if args[1] == "-h" || args[1] == "--help" {
        println!("{}", usage());
        return ExitCode::SUCCESS;
    }

    if args[1] == "-v" || args[1] == "--version" {
        println!("smile-{}-{}: v{}", env::consts::OS, env::consts::ARCH, VERSION);
        return ExitCode::SUCCESS;
    }

    if args[1] == "--dump-tree" {
        let Some(path) = args.get(2) else {
            eprintln!("--dump-tree requires a script path");
            return ExitCode::FAILURE;
        };
        return run_dump_tree(path);
    }

    run_script(&args[1])
}

fn run_dump_tree(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to read {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };
    let output = smile::parser::parse(&source, path);
    for d in &output.diagnostics {
        eprintln!("{}", smile::format_diagnostic(path, d));
    }
    println!("{}", output.tree);
    if output.diagnostics.iter().any(|d| d.is_fatal()) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_script(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to read {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let (unit, diagnostics) = match smile::compile_source(&source, path) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    for d in &diagnostics {
        eprintln!("{}", smile::format_diagnostic(path, d));
    }

    match smile::eval_run(&unit) {
        EvalResult::Value(_) => ExitCode::SUCCESS,
        EvalResult::Break(pc) => {
            eprintln!("breakpoint hit at pc {}", pc);
            ExitCode::FAILURE
        }
        EvalResult::Exception(e) => {
            eprintln!("{}", smile::format_uncaught_exception(&e));
            ExitCode::FAILURE
        }
    }
}



