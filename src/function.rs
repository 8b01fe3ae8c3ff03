//! Callable runtime values: host-provided natives and functions declared in
//! Lox source.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::Utc;
use log::debug;

use crate::ast::FunctionDecl;
use crate::class::LoxInstance;
use crate::environment::{Env, Environment};
use crate::value::Value;

/// A function implemented by the host.
pub struct NativeFunction<'a> {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value<'a>]) -> Result<Value<'a>, String>,
}

impl<'a> fmt::Debug for NativeFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}/{}>", self.name, self.arity)
    }
}

/// `clock()`: seconds since the Unix epoch, with millisecond precision.
pub fn clock<'a>() -> NativeFunction<'a> {
    NativeFunction {
        name: "clock",
        arity: 0,
        func: |_args| {
            let millis: i64 = Utc::now().timestamp_millis();
            debug!("Native function 'clock' returned {} ms", millis);
            Ok(Value::Number(millis as f64 / 1000.0))
        },
    }
}

/// A function or method declared in source, together with the environment
/// it closes over.
pub struct LoxFunction<'a> {
    pub declaration: Rc<FunctionDecl<'a>>,
    pub closure: Env<'a>,
    /// `init` methods always hand back `this`.
    pub is_initializer: bool,
}

impl<'a> LoxFunction<'a> {
    pub fn new(declaration: Rc<FunctionDecl<'a>>, closure: Env<'a>, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &'a str {
        self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this method whose closure binds `this` to `instance`.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance<'a>>>) -> LoxFunction<'a> {
        debug!("Binding method '{}'", self.name());

        let environment: Env<'a> = Environment::nested(&self.closure);
        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        LoxFunction::new(
            Rc::clone(&self.declaration),
            environment,
            self.is_initializer,
        )
    }

    /// The instance bound as `this` in the closure, for initializers.
    pub fn bound_this(&self) -> Option<Value<'a>> {
        self.closure.borrow().get_local("this")
    }
}

impl<'a> fmt::Debug for LoxFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}/{}>", self.name(), self.arity())
    }
}
