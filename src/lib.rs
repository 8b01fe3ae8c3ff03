//! Rox: a scanner, parser, resolver and tree‑walking interpreter for Lox.
//!
//! The pipeline, leaves first:
//!
//! ```text
//! source ─ scan ─▶ tokens ─ parse ─▶ statements ─ resolve ─▶ distances ─ interpret ─▶ output
//! ```
//!
//! Each phase returns its [`Diagnostics`](error::Diagnostics) instead of
//! aborting, so the caller decides whether to continue and which exit code
//! to use.
//!
//! ```rust
//! use rox::interpreter::Interpreter;
//!
//! let mut interpreter = Interpreter::with_output(Vec::new());
//! let diagnostics = rox::run(&mut interpreter, "print 1 + 2 * 3;");
//!
//! assert!(diagnostics.is_empty());
//! assert_eq!(interpreter.output(), b"7\n");
//! ```

pub mod ast;
pub mod class;
pub mod environment;
pub mod error;
pub mod function;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use std::collections::HashSet;
use std::io::Write;

use log::info;

use error::Diagnostics;
use interpreter::Interpreter;
use resolver::Resolver;

pub use interpreter::interpret;
pub use parser::parse;
pub use resolver::resolve;
pub use scanner::scan;

/// Run `source` through every phase on `interpreter`.
///
/// Scan and parse diagnostics are collected together; if any exist the
/// program is neither resolved nor executed.  Resolution diagnostics likewise
/// prevent execution.  The resolver is told which globals `interpreter`
/// already holds.
pub fn run<'a, W: Write>(interpreter: &mut Interpreter<'a, W>, source: &'a str) -> Diagnostics {
    let (tokens, mut diagnostics) = scan(source);

    let (statements, parse_diagnostics) = parse(&tokens);
    diagnostics.extend(parse_diagnostics);

    if diagnostics.has_errors() {
        info!("Static errors found; skipping resolution");
        return diagnostics;
    }

    // Globals from earlier runs (and natives) are visible to this one.
    let known: HashSet<String> = interpreter
        .globals()
        .borrow()
        .names()
        .map(str::to_owned)
        .collect();

    let (locals, resolve_diagnostics) = Resolver::with_globals(known).resolve(&statements);

    if resolve_diagnostics.has_errors() {
        info!("Resolution errors found; skipping execution");
        return resolve_diagnostics;
    }

    interpreter.interpret(&statements, locals)
}
