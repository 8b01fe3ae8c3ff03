//! Tree‑walking evaluator.
//!
//! Statements execute for effect in program order; expressions evaluate to
//! [`Value`]s against the current [`Environment`].  Variable accesses use the
//! distances computed by the [`resolver`](crate::resolver) to jump straight to
//! the owning scope; names without a recorded distance are globals.
//!
//! Two ways out of a statement exist and they never mix:
//! * `return` travels up as [`StmtOutcome::Returned`] until the call that
//!   started the function body picks it up;
//! * a [`RuntimeError`] unwinds everything up to [`Interpreter::interpret`].

use std::cell::RefCell;
use std::io::{self, Stdout, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt, Variable};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::{self, Env, Environment};
use crate::error::{Diagnostics, RuntimeError};
use crate::function::{self, LoxFunction};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::{Callable, Value};

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// How a statement finished, when it did not fail.
#[derive(Debug)]
pub enum StmtOutcome<'a> {
    Normal,
    Returned(Value<'a>),
}

/// Run a resolved program on a fresh interpreter printing to stdout.
pub fn interpret<'a>(statements: &[Stmt<'a>], locals: Locals) -> Diagnostics {
    Interpreter::new().interpret(statements, locals)
}

/// Nested calls allowed before "Stack overflow." is raised.
pub const MAX_CALL_DEPTH: usize = 1000;

pub struct Interpreter<'a, W: Write = Stdout> {
    globals: Env<'a>,
    environment: Env<'a>,
    locals: Locals,
    out: W,
    call_depth: usize,
    max_call_depth: usize,
}

impl<'a> Interpreter<'a, Stdout> {
    /// An interpreter whose `print` writes to standard output.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl<'a> Default for Interpreter<'a, Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, W: Write> Interpreter<'a, W> {
    /// An interpreter whose `print` writes to `out`.  Defines the native
    /// functions in the global scope.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals: Env<'a> = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");
        globals.borrow_mut().define(
            "clock",
            Value::Callable(Callable::Native(Rc::new(function::clock()))),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: Locals::new(),
            out,
            call_depth: 0,
            max_call_depth: MAX_CALL_DEPTH,
        }
    }

    /// Overrides how deeply calls may nest.
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn globals(&self) -> &Env<'a> {
        &self.globals
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Interprets a resolved program.  Stops at the first runtime error,
    /// which is returned as the only diagnostic; output produced before it
    /// stays written.
    pub fn interpret(&mut self, statements: &[Stmt<'a>], locals: Locals) -> Diagnostics {
        info!("Interpreting {} statement(s)", statements.len());

        // Earlier tables stay: closures from previous runs still need them.
        self.locals.extend(locals);

        let mut diagnostics: Diagnostics = Diagnostics::new();

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                debug!("Runtime error: {}", e.message);
                diagnostics.report_runtime(e);
                break;
            }
        }

        self.environment = Rc::clone(&self.globals);
        self.call_depth = 0;

        if diagnostics.is_empty() {
            info!("Interpretation completed successfully");
        }

        diagnostics
    }

    // ───────────────────────────── statements ──────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt<'a>) -> IResult<StmtOutcome<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print { keyword, value } => {
                let value: Value<'a> = self.evaluate(value)?;
                debug!("Printing {} value: {}", value.kind(), value);

                writeln!(self.out, "{}", value).map_err(|e| {
                    RuntimeError::new(keyword.line, format!("Failed to write output: {}", e))
                })?;
            }

            Stmt::Var { name, initializer } => {
                let value: Value<'a> = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let scope: Env<'a> = Environment::nested(&self.environment);
                return self.execute_block(statements, scope);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let StmtOutcome::Returned(value) = self.execute(body)? {
                        return Ok(StmtOutcome::Returned(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment.borrow_mut().define(
                    declaration.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
            }

            Stmt::Return { value, .. } => {
                let value: Value<'a> = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);
                return Ok(StmtOutcome::Returned(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.define_class(name, superclass.as_ref(), methods)?,
        }

        Ok(StmtOutcome::Normal)
    }

    /// Run `statements` inside `environment`, restoring the current
    /// environment afterwards whatever the outcome.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt<'a>],
        environment: Env<'a>,
    ) -> IResult<StmtOutcome<'a>> {
        let previous: Env<'a> = std::mem::replace(&mut self.environment, environment);

        let result = self.execute_all(statements);

        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt<'a>]) -> IResult<StmtOutcome<'a>> {
        for stmt in statements {
            if let StmtOutcome::Returned(value) = self.execute(stmt)? {
                return Ok(StmtOutcome::Returned(value));
            }
        }

        Ok(StmtOutcome::Normal)
    }

    fn define_class(
        &mut self,
        name: &Token<'a>,
        superclass: Option<&Variable<'a>>,
        methods: &[Rc<FunctionDecl<'a>>],
    ) -> IResult<()> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass: Option<Rc<LoxClass<'a>>> = match superclass {
            Some(var) => match self.look_up_variable(var.id, &var.name)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(RuntimeError::new(
                        var.name.line,
                        "Superclass must be a class.",
                    ))
                }
            },
            None => None,
        };

        // Bound first so methods can refer to the class by name.
        self.environment.borrow_mut().define(name.lexeme, Value::Nil);

        let method_env: Env<'a> = match &superclass {
            Some(superclass) => {
                let scope: Env<'a> = Environment::nested(&self.environment);
                scope
                    .borrow_mut()
                    .define("super", Value::Class(Rc::clone(superclass)));
                scope
            }
            None => Rc::clone(&self.environment),
        };

        let methods = methods
            .iter()
            .map(|method| {
                let function = LoxFunction::new(
                    Rc::clone(method),
                    Rc::clone(&method_env),
                    method.name.lexeme == "init",
                );
                (method.name.lexeme.to_string(), Rc::new(function))
            })
            .collect();

        let class = LoxClass::new(name.lexeme, superclass, methods);

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))
    }

    // ───────────────────────────── expressions ─────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr<'a>) -> IResult<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value<'a> = self.evaluate(left)?;

                let decided: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if decided {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable(var) => self.look_up_variable(var.id, &var.name),

            Expr::Assign { id, name, value } => {
                let value: Value<'a> = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                debug!("Assigned {} to '{}'", value, name.lexeme);
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value<'a> = self.evaluate(callee)?;

                let mut args: Vec<Value<'a>> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call(callee, paren, args)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(RuntimeError::new(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::new(name.line, "Only instances have fields."));
                };

                let value: Value<'a> = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    /// Evaluates a unary expression.
    fn evaluate_unary(&mut self, operator: &Token<'a>, right: &Expr<'a>) -> IResult<Value<'a>> {
        let right: Value<'a> = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::new(operator.line, "Operand must be a number.")),
            },
            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
            _ => Err(RuntimeError::new(
                operator.line,
                format!("Invalid unary operator '{}'.", operator.lexeme),
            )),
        }
    }

    /// Evaluates a binary expression.  Both operands are evaluated, left
    /// first, before any type check.
    fn evaluate_binary(
        &mut self,
        left: &Expr<'a>,
        operator: &Token<'a>,
        right: &Expr<'a>,
    ) -> IResult<Value<'a>> {
        let left: Value<'a> = self.evaluate(left)?;
        let right: Value<'a> = self.evaluate(right)?;

        debug!(
            "Binary '{}' on {} and {}",
            operator.lexeme,
            left.kind(),
            right.kind()
        );

        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(RuntimeError::new(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a * b))
            }

            // IEEE‑754: division by zero yields an infinity or NaN.
            TokenType::SLASH => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => Err(RuntimeError::new(
                operator.line,
                format!("Invalid binary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &Token<'a>,
        method: &Token<'a>,
    ) -> IResult<Value<'a>> {
        let distance: usize = self
            .locals
            .get(&id)
            .copied()
            .ok_or_else(|| RuntimeError::new(keyword.line, "Undefined variable 'super'."))?;

        let Value::Class(superclass) = environment::get_at(&self.environment, distance, keyword)?
        else {
            return Err(RuntimeError::new(keyword.line, "Superclass must be a class."));
        };

        // `this` lives in the scope just inside the one holding `super`.
        let this_token: Token<'static> =
            Token::new(TokenType::THIS, "this", keyword.line, keyword.offset);
        let Value::Instance(instance) = environment::get_at(
            &self.environment,
            distance.saturating_sub(1),
            &this_token,
        )?
        else {
            return Err(RuntimeError::new(keyword.line, "Only instances have properties."));
        };

        let found: Rc<LoxFunction<'a>> = superclass.find_method(method.lexeme).ok_or_else(|| {
            RuntimeError::new(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
        })?;

        Ok(Value::Callable(Callable::Function(Rc::new(
            found.bind(instance),
        ))))
    }

    fn look_up_variable(&self, id: ExprId, name: &Token<'a>) -> IResult<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    // ──────────────────────────────── calls ────────────────────────────────

    /// Invokes a callable (native function, declared function or class).
    fn call(
        &mut self,
        callee: Value<'a>,
        paren: &Token<'a>,
        args: Vec<Value<'a>>,
    ) -> IResult<Value<'a>> {
        let arity: usize = match &callee {
            Value::Callable(callable) => callable.arity(),
            Value::Class(class) => class.arity(),
            _ => {
                return Err(RuntimeError::new(
                    paren.line,
                    "Can only call functions and classes.",
                ))
            }
        };

        if args.len() != arity {
            return Err(RuntimeError::new(
                paren.line,
                format!("Expected {} arguments but got {}.", arity, args.len()),
            ));
        }

        if self.call_depth >= self.max_call_depth {
            debug!("Call depth limit {} reached", self.max_call_depth);
            return Err(RuntimeError::new(paren.line, "Stack overflow."));
        }

        self.call_depth += 1;
        let result: IResult<Value<'a>> = self.invoke(callee, paren, args);
        self.call_depth -= 1;

        result
    }

    fn invoke(
        &mut self,
        callee: Value<'a>,
        paren: &Token<'a>,
        args: Vec<Value<'a>>,
    ) -> IResult<Value<'a>> {
        match callee {
            Value::Callable(Callable::Native(native)) => {
                debug!("Calling native function '{}'", native.name);
                (native.func)(&args).map_err(|message| RuntimeError::new(paren.line, message))
            }

            Value::Callable(Callable::Function(function)) => self.call_function(&function, args),

            Value::Class(class) => {
                debug!("Instantiating class '{}'", class.name);

                let instance = Rc::new(RefCell::new(LoxInstance::new(Rc::clone(&class))));

                if let Some(init) = class.find_method("init") {
                    self.call_function(&init.bind(Rc::clone(&instance)), args)?;
                }

                Ok(Value::Instance(instance))
            }

            _ => Err(RuntimeError::new(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Runs a declared function body in a fresh scope chained to its
    /// closure.  Falling off the end yields `nil`; initializers yield `this`.
    pub fn call_function(
        &mut self,
        function: &LoxFunction<'a>,
        args: Vec<Value<'a>>,
    ) -> IResult<Value<'a>> {
        debug!("Calling function '{}'", function.name());

        let scope: Env<'a> = Environment::nested(&function.closure);
        {
            let mut scope = scope.borrow_mut();
            for (param, arg) in function.declaration.params.iter().zip(args) {
                scope.define(param.lexeme, arg);
            }
        }

        let outcome: StmtOutcome<'a> = self.execute_block(&function.declaration.body, scope)?;

        if function.is_initializer {
            return Ok(function.bound_this().unwrap_or(Value::Nil));
        }

        Ok(match outcome {
            StmtOutcome::Returned(value) => value,
            StmtOutcome::Normal => Value::Nil,
        })
    }
}

/// Both operands as numbers, or "Operands must be numbers."
fn number_operands(operator: &Token<'_>, left: &Value<'_>, right: &Value<'_>) -> IResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(operator.line, "Operands must be numbers.")),
    }
}
