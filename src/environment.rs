use crate::interpreter::{RuntimeError, Value};
use crate::scanner::Token;
use crate::types::{create_shared, Shared};
use std::collections::HashMap;

/// One frame of name→value bindings. Frames chain through `enclosing`;
/// closures hold an `Rc` to their frame, so a chain can outlive the block
/// that created it.
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Shared<Environment>>,
}

impl Environment {
    pub fn new(enclosing: Option<Shared<Environment>>) -> Shared<Environment> {
        create_shared(Environment {
            values: HashMap::default(),
            enclosing,
        })
    }

    /// Unconditional insert in this frame, shadowing any ancestor binding.
    pub fn define(&mut self, name: String, val: Value) {
        self.values.insert(name, val);
    }

    /// Rebinds an existing variable in the nearest frame that holds it.
    pub fn assign(&mut self, name: &Token, val: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(name.lexeme.as_str()) {
            *slot = val;
            Ok(())
        } else if let Some(enclosing) = self.enclosing.as_ref() {
            enclosing.borrow_mut().assign(name, val)
        } else {
            RuntimeError::new(
                name.clone(),
                &format!("Undefined variable '{}'.", name.lexeme),
            )
        }
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(val) = self.values.get(name.lexeme.as_str()) {
            Ok(val.clone())
        } else if let Some(enclosing) = self.enclosing.as_ref() {
            enclosing.borrow().get(name)
        } else {
            RuntimeError::new(
                name.clone(),
                &format!("Undefined variable '{}'.", name.lexeme),
            )
        }
    }
}
