use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

/// Shared handle to an environment.  Blocks, calls and closures all hold
/// one; an environment lives as long as its longest holder.
pub type Env<'a> = Rc<RefCell<Environment<'a>>>;

/// One lexical scope: name → value bindings plus the enclosing scope.
#[derive(Debug, Default)]
pub struct Environment<'a> {
    values: HashMap<String, Value<'a>>,
    enclosing: Option<Env<'a>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Env<'a>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap a fresh scope nested in `enclosing` into a shared handle.
    pub fn nested(enclosing: &Env<'a>) -> Env<'a> {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(enclosing))))
    }

    /// Names bound in this very scope.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ + use<'_, 'a> {
        self.values.keys().map(String::as_str)
    }

    /// Bind `name` in this scope, shadowing or redefining any previous value.
    pub fn define(&mut self, name: &str, value: Value<'a>) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up along the whole chain.
    pub fn get(&self, name: &Token<'_>) -> Result<Value<'a>, RuntimeError> {
        if let Some(value) = self.values.get(name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Overwrite an existing binding somewhere along the chain.
    pub fn assign(&mut self, name: &Token<'_>, value: Value<'a>) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// Value bound to `name` in this very scope, if any.
    pub fn get_local(&self, name: &str) -> Option<Value<'a>> {
        self.values.get(name).cloned()
    }
}

/// Walk `distance` links up from `env`.
pub fn ancestor<'a>(env: &Env<'a>, distance: usize) -> Option<Env<'a>> {
    let mut current: Env<'a> = Rc::clone(env);

    for _ in 0..distance {
        let next: Env<'a> = current.borrow().enclosing.clone()?;
        current = next;
    }

    Some(current)
}

/// Read `name` from exactly `distance` scopes up, as computed by the resolver.
pub fn get_at<'a>(env: &Env<'a>, distance: usize, name: &Token<'_>) -> Result<Value<'a>, RuntimeError> {
    debug!("get_at: '{}' at distance {}", name.lexeme, distance);

    let scope: Env<'a> = ancestor(env, distance).ok_or_else(|| undefined(name))?;
    let value: Option<Value<'a>> = scope.borrow().get_local(name.lexeme);

    value.ok_or_else(|| undefined(name))
}

/// Write `name` exactly `distance` scopes up, as computed by the resolver.
pub fn assign_at<'a>(
    env: &Env<'a>,
    distance: usize,
    name: &Token<'_>,
    value: Value<'a>,
) -> Result<(), RuntimeError> {
    debug!("assign_at: '{}' at distance {}", name.lexeme, distance);

    let scope: Env<'a> = ancestor(env, distance).ok_or_else(|| undefined(name))?;
    scope.borrow_mut().define(name.lexeme, value);

    Ok(())
}

fn undefined(name: &Token<'_>) -> RuntimeError {
    RuntimeError::new(
        name.line,
        format!("Undefined variable '{}'.", name.lexeme),
    )
}
