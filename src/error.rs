//! Centralised error hierarchy for the **Rox interpreter**.
//!
//! Every phase (scanner, parser, resolver, runtime) converts its failure modes
//! into one of the variants defined here.  Phases never abort the process and
//! never set global flags: they hand a [`Diagnostics`] accumulator back to the
//! caller, which decides what to print and which exit code to use.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;

use log::info;
use thiserror::Error;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Static error found by the parser or the resolver.  `location` is
    /// either empty, ` at end` or ` at '<lexeme>'`.
    #[error("[line {line}] Error{location}: {message}")]
    Static {
        message: String,
        location: String,
        line: usize,
    },

    /// Fatal evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for **parser** and **resolver** errors.
    pub fn at<L: Into<String>, S: Into<String>>(line: usize, location: L, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Static error: line={}, msg={}", line, message);

        LoxError::Static {
            message,
            location: location.into(),
            line,
        }
    }

    /// Is this a fatal runtime error (as opposed to a static diagnostic)?
    pub fn is_runtime(&self) -> bool {
        matches!(self, LoxError::Runtime(_))
    }

    /// The bare message, without the `[line N]` decoration.
    pub fn message(&self) -> String {
        match self {
            LoxError::Lex { message, .. } | LoxError::Static { message, .. } => message.clone(),
            LoxError::Runtime(e) => e.message.clone(),
        }
    }
}

/// A fatal error raised while evaluating the program.  It unwinds the whole
/// interpreter stack and is never caught by the language itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}\n[line {line}]")]
pub struct RuntimeError {
    /// Line of the token that caused the failure.
    pub line: usize,

    pub message: String,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        RuntimeError { line, message }
    }
}

/// Ordered accumulator of diagnostics produced by one or more phases.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LoxError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a parse or resolution error at `line`.  `location` follows
    /// the ` at '<lexeme>'` / ` at end` convention and may be empty.
    pub fn report_at(&mut self, line: usize, location: &str, message: &str) {
        self.errors.push(LoxError::at(line, location, message));
    }

    /// Record the runtime error that terminated a run.
    pub fn report_runtime(&mut self, error: RuntimeError) {
        self.errors.push(LoxError::Runtime(error));
    }

    pub fn push(&mut self, error: LoxError) {
        self.errors.push(error);
    }

    /// Append every diagnostic of `other`, keeping order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_runtime_error(&self) -> bool {
        self.errors.iter().any(LoxError::is_runtime)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LoxError> {
        self.errors.iter()
    }

    /// Process exit code for a driver: 0 clean, 70 runtime failure,
    /// 65 static (scan/parse/resolve) failure.
    pub fn exit_code(&self) -> i32 {
        if self.errors.is_empty() {
            0
        } else if self.has_runtime_error() {
            70
        } else {
            65
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = LoxError;
    type IntoIter = std::vec::IntoIter<LoxError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'d> IntoIterator for &'d Diagnostics {
    type Item = &'d LoxError;
    type IntoIter = std::slice::Iter<'d, LoxError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{}", error)?;
        }

        Ok(())
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
