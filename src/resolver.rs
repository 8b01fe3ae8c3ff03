//! Static resolver pass for the **Rox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<&str,bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, reading a local in its own initializer when
//!    nothing outside it has that name, invalid `return`,
//!    misplaced `this`/`super`, self‑inheritance).
//! 3. Record, for *each* variable occurrence, whether it’s a local (and at what depth)
//!    or a global, so the interpreter never falls back to dynamic lookup that would see
//!    a later shadowing local.
//!
//! Errors never stop the walk: every problem in the program is reported in one pass.

use std::collections::{HashMap, HashSet};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::Diagnostics;
use crate::token::Token;
use log::{debug, info};

/// Distance table: variable‑use node → number of scopes between the use
/// and its declaration.  Absent means global.
pub type Locals = HashMap<ExprId, usize>;

/// Resolve a program.  Convenience wrapper around [`Resolver::resolve`].
pub fn resolve(statements: &[Stmt<'_>]) -> (Locals, Diagnostics) {
    Resolver::new().resolve(statements)
}

/// What kind of function body are we in?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// What kind of class body are we in?  Used to validate `this` / `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances (locals vs. globals).
pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    globals: HashSet<String>,
    current_function: FunctionType,
    current_class: ClassType,
    locals: Locals,
    diagnostics: Diagnostics,
}

impl<'a> Default for Resolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        Self::with_globals(HashSet::new())
    }

    /// A resolver that already knows some global names, e.g. those defined
    /// by earlier REPL lines.
    pub fn with_globals(globals: HashSet<String>) -> Self {
        info!("Resolver instantiated with {} known global(s)", globals.len());

        Resolver {
            scopes: Vec::new(),
            globals,
            current_function: FunctionType::None,
            current_class: ClassType::None,
            locals: Locals::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(mut self, statements: &[Stmt<'a>]) -> (Locals, Diagnostics) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements);

        info!(
            "Resolved {} local reference(s) with {} error(s)",
            self.locals.len(),
            self.diagnostics.len()
        );

        (self.locals, self.diagnostics)
    }

    fn resolve_stmts(&mut self, statements: &[Stmt<'a>]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt<'a>) {
        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                debug!("Resolving class '{}'", name.lexeme);

                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);
                self.define(name);

                if let Some(superclass) = superclass {
                    if superclass.name.lexeme == name.lexeme {
                        self.error(&superclass.name, "A class can't inherit from itself.");
                        self.current_class = enclosing_class;
                        return;
                    }

                    self.current_class = ClassType::Subclass;
                    self.resolve_local(superclass.id, &superclass.name);

                    // Scope holding `super`, wrapped around the methods.
                    self.begin_scope();
                    self.mark_defined("super");
                }

                self.begin_scope();
                self.mark_defined("this");

                for method in methods {
                    let kind = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };

                    self.resolve_function(method, kind);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }

            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // the name is visible *inside* its own body, for recursion
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print { value: expr, .. } => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr<'a>) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable(var) => {
                let in_own_initializer: bool = self
                    .scopes
                    .last()
                    .is_some_and(|scope| scope.get(var.name.lexeme) == Some(&false));

                if in_own_initializer {
                    self.resolve_shadowed(var.id, &var.name);
                } else {
                    self.resolve_local(var.id, &var.name);
                }
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => match self.current_class {
                ClassType::None => {
                    self.error(keyword, "Can't use 'super' outside of a class.");
                }
                ClassType::Class => {
                    self.error(keyword, "Can't use 'super' in a class with no superclass.");
                }
                ClassType::Subclass => {
                    self.resolve_local(*id, keyword);
                }
            },
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.
    fn resolve_function(&mut self, function: &FunctionDecl<'a>, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&function.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Redeclaring a global is allowed; globals are only remembered so that
    /// a shadowing initializer can still read them.
    fn declare(&mut self, name: &Token<'a>) {
        let duplicate: bool = match self.scopes.last_mut() {
            Some(scope) => scope.insert(name.lexeme, false).is_some(),
            None => {
                self.globals.insert(name.lexeme.to_owned());
                false
            }
        };

        if duplicate {
            self.error(name, "Already a variable with this name in this scope.");
        }
    }

    fn define(&mut self, name: &Token<'a>) {
        self.mark_defined(name.lexeme);
    }

    fn mark_defined(&mut self, name: &'a str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, true);
        }
    }

    fn error(&mut self, token: &Token<'a>, message: &str) {
        debug!("Resolution error at line {}: {}", token.line, message);

        self.diagnostics
            .report_at(token.line, &token.location(), message);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as either:
    ///  - a local at depth `d`, or
    ///  - a global if not found in *any* scope (left out of the table).
    fn resolve_local(&mut self, id: ExprId, name: &Token<'a>) {
        // innermost → outermost
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }

    /// `name` is read inside the initializer of a local of the same name.
    /// The read refers to the shadowed binding: an enclosing local, or a
    /// global already declared.  Without one it is an error.
    fn resolve_shadowed(&mut self, id: ExprId, name: &Token<'a>) {
        let outer: Option<usize> = self
            .scopes
            .iter()
            .rev()
            .enumerate()
            .skip(1)
            .find(|(_, scope)| scope.contains_key(name.lexeme))
            .map(|(depth, _)| depth);

        match outer {
            Some(depth) => {
                debug!("Resolved shadowed '{}' at depth {}", name.lexeme, depth);
                self.locals.insert(id, depth);
            }
            None if self.globals.contains(name.lexeme) => {
                debug!("Resolved shadowed '{}' as global", name.lexeme);
            }
            None => {
                self.error(name, "Can't read local variable in its own initializer.");
            }
        }
    }
}
