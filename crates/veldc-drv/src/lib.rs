//! veldc-drv - The `veldc` compiler driver.
//!
//! Orchestrates the front-end pipeline for one source file:
//!
//! ```text
//! bytes ──lex──▶ tokens ──parse──▶ AST ──typecheck──▶ TypedProgram
//! ```
//!
//! With `--verbose`, the token stream and the AST are dumped to stdout
//! between stages. Every front-end failure is a single
//! `filename:lineno: message` line on stderr.

use veldc_lex::{tokenize, Token};
use veldc_par::{dump_ast, parse};
use veldc_sem::{typecheck_program, TypedProgram};
use veldc_util::{CompileError, CompileResult, Location};

/// What one invocation of `veldc` should do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Dump tokens and the AST while compiling.
    pub verbose: bool,
    /// Path of the source file, as given on the command line.
    pub filename: String,
}

impl Config {
    /// Parses `[--verbose] FILENAME` from the arguments after the
    /// program name. `None` means the usage was wrong.
    pub fn from_args(args: &[String]) -> Option<Config> {
        match args {
            [flag, filename] if flag == "--verbose" => Some(Config {
                verbose: true,
                filename: filename.clone(),
            }),
            [filename] => Some(Config {
                verbose: false,
                filename: filename.clone(),
            }),
            _ => None,
        }
    }
}

/// Prints one token per line, used by `--verbose`.
pub fn print_tokens(tokens: &[Token]) {
    println!("===== tokens =====");
    for token in tokens {
        println!("line {}: {}", token.location.lineno, token);
    }
}

/// Runs the whole front end on one file.
pub fn compile_file(config: &Config) -> CompileResult<TypedProgram> {
    let bytes = std::fs::read(&config.filename).map_err(|error| {
        CompileError::new(
            Location::new(config.filename.as_str(), 0),
            format!("cannot open file: {error}"),
        )
    })?;

    let tokens = tokenize(config.filename.as_str(), bytes)?;
    if config.verbose {
        print_tokens(&tokens);
    }

    let ast = parse(&tokens)?;
    if config.verbose {
        println!("===== AST =====");
        print!("{}", dump_ast(&ast));
    }

    typecheck_program(&ast)
}
