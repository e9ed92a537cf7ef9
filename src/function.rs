use crate::environment::Environment;
use crate::expr::Stmt;
use crate::interpreter::{Interpreter, RuntimeError, Value};
use crate::scanner::{Literal, Token};
use crate::types::Shared;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Callable {
    fn arity(&self) -> usize;
    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError>;
    fn name(&self) -> String;
    fn describe(&self) -> String {
        format!("<fn {}>", self.name())
    }
}

impl Display for dyn Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

pub struct Clock;

impl Callable for Clock {
    fn arity(&self) -> usize {
        0
    }

    fn call(&self, _: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
        let since_the_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards");
        Ok(Value::Primitive(Literal::Number(
            since_the_epoch.as_secs_f64(),
        )))
    }

    fn name(&self) -> String {
        "clock".to_string()
    }

    fn describe(&self) -> String {
        "<native fn>".to_string()
    }
}

pub struct LoxFunction {
    name: Token,
    params: Vec<Token>,
    body: Vec<Stmt>,
    closure: Shared<Environment>,
}

impl LoxFunction {
    pub fn new(
        name: &Token,
        params: &[Token],
        body: &[Stmt],
        closure: Shared<Environment>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.clone(),
            params: params.to_vec(),
            body: body.to_vec(),
            closure,
        })
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.params.len()
    }

    /// Parameters bind in a fresh child of the closure environment, never
    /// the caller's. The caller's environment is restored even when the
    /// body errors out.
    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
        let environment = Environment::new(Some(self.closure.clone()));
        {
            let mut frame = environment.borrow_mut();
            for (param, arg) in self.params.iter().zip(args) {
                frame.define(param.lexeme.to_string(), arg.clone());
            }
        }
        let old_env = std::mem::replace(&mut interpreter.environment, environment);
        let res = interpreter.interpret_stmts(&self.body);
        interpreter.environment = old_env;
        Ok(match res? {
            Some(val) => val,
            None => Value::Primitive(Literal::NIL),
        })
    }

    fn name(&self) -> String {
        self.name.lexeme.to_string()
    }
}
