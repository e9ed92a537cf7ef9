use crate::environment::Environment;
use crate::expr::{Expr, Stmt};
use crate::function::{Callable, Clock, LoxFunction};
use crate::scanner::{Literal, Token, TokenType};
use crate::types::Shared;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::Arc;

/// Runtime value domain: nil, booleans, numbers, and strings ride in
/// `Literal`; callables are shared so closures compare by identity.
#[derive(Clone)]
pub enum Value {
    Primitive(Literal),
    Function(Rc<dyn Callable>),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive(l) => write!(f, "{}", l),
            Self::Function(func) => write!(f, "{}", func),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

#[derive(Debug)]
pub struct RuntimeError {
    token: Token,
    msg: String,
}

impl RuntimeError {
    pub fn new<T>(token: Token, msg: &str) -> Result<T, Self> {
        Err(Self {
            token,
            msg: msg.to_string(),
        })
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n[line {}]", self.msg, self.token.line)
    }
}

impl Error for RuntimeError {}

pub struct Interpreter {
    pub environment: Shared<Environment>,
    pub globals: Shared<Environment>,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Builds an interpreter whose `print` statements write to `output`.
    /// The globals frame is seeded with the native functions.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        let env = Environment::new(None);
        let clock = Clock;
        env.borrow_mut()
            .define(clock.name(), Value::Function(Rc::new(clock)));
        Self {
            environment: env.clone(),
            globals: env,
            output,
        }
    }

    /// Executes a program. The first runtime error aborts execution and is
    /// handed to the caller for reporting.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for statement in statements {
            if self.interpret_stmt(statement)?.is_some() {
                // A stray top-level return ends the program.
                break;
            }
        }
        Ok(())
    }

    pub fn visit(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        let res = match expr {
            Expr::LiteralNode(literal) => Value::Primitive(literal.clone()),
            Expr::Grouping(expr) => self.visit(expr)?,
            Expr::Unary { operator, right } => {
                let right_val = self.visit(right)?;
                match (&operator.token_type, right_val) {
                    (TokenType::MINUS, Value::Primitive(Literal::Number(num))) => {
                        Value::Primitive(Literal::Number(-num))
                    }
                    (TokenType::MINUS, _) => {
                        RuntimeError::new(operator.clone(), "Operand must be a number.")?
                    }
                    (TokenType::BANG, right_val) => {
                        Value::Primitive(Literal::Boolean(!is_truthy(&right_val)))
                    }
                    _ => RuntimeError::new(operator.clone(), "Invalid unary operator.")?,
                }
            }
            Expr::Binary {
                left,
                right,
                operator,
            } => {
                let token_type = &operator.token_type;
                let left = self.visit(left)?;
                let right = self.visit(right)?;
                match [left, right] {
                    lr if *token_type == TokenType::EqualEqual
                        || *token_type == TokenType::BangEqual =>
                    {
                        let res = match token_type {
                            TokenType::EqualEqual => is_equal(lr),
                            _ => !is_equal(lr),
                        };
                        Value::Primitive(Literal::Boolean(res))
                    }
                    [Value::Primitive(Literal::Number(left_val)), Value::Primitive(Literal::Number(right_val))] =>
                    {
                        let res = match token_type {
                            TokenType::MINUS => Literal::Number(left_val - right_val),
                            TokenType::SLASH => Literal::Number(left_val / right_val),
                            TokenType::STAR => Literal::Number(left_val * right_val),
                            TokenType::PLUS => Literal::Number(left_val + right_val),
                            TokenType::GREATER => Literal::Boolean(left_val > right_val),
                            TokenType::GreaterEqual => Literal::Boolean(left_val >= right_val),
                            TokenType::LESS => Literal::Boolean(left_val < right_val),
                            TokenType::LessEqual => Literal::Boolean(left_val <= right_val),
                            _ => RuntimeError::new(operator.clone(), "Invalid binary operator.")?,
                        };
                        Value::Primitive(res)
                    }
                    [Value::Primitive(Literal::String(sl)), Value::Primitive(Literal::String(sr))]
                        if *token_type == TokenType::PLUS =>
                    {
                        Value::Primitive(Literal::String(Arc::new(sl.to_string() + &sr)))
                    }
                    _ => match token_type {
                        TokenType::PLUS => RuntimeError::new(
                            operator.clone(),
                            "Operands must be two numbers or two strings.",
                        )?,
                        TokenType::MINUS
                        | TokenType::SLASH
                        | TokenType::STAR
                        | TokenType::GREATER
                        | TokenType::GreaterEqual
                        | TokenType::LESS
                        | TokenType::LessEqual => {
                            RuntimeError::new(operator.clone(), "Operands must be numbers.")?
                        }
                        _ => RuntimeError::new(operator.clone(), "Invalid binary operator.")?,
                    },
                }
            }
            Expr::Variable { name } => self.environment.borrow().get(name)?,
            Expr::Assign { name, value } => {
                let val = self.visit(value)?;
                self.environment.borrow_mut().assign(name, val.clone())?;
                val
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let val = self.visit(left)?;
                match operator.token_type {
                    TokenType::AND => {
                        if is_truthy(&val) {
                            self.visit(right)?
                        } else {
                            val
                        }
                    }
                    TokenType::OR => {
                        if is_truthy(&val) {
                            val
                        } else {
                            self.visit(right)?
                        }
                    }
                    _ => RuntimeError::new(operator.clone(), "Invalid logical operator.")?,
                }
            }
            Expr::Call {
                callee,
                args,
                paren,
            } => {
                let callee = self.visit(callee)?;
                let mut arguments = vec![];
                for arg in args {
                    arguments.push(self.visit(arg)?);
                }
                let func = if let Value::Function(func) = callee {
                    func
                } else {
                    RuntimeError::new(paren.clone(), "Can only call functions and classes.")?
                };
                if func.arity() != arguments.len() {
                    RuntimeError::new(
                        paren.clone(),
                        &format!(
                            "Expected {} arguments but got {}.",
                            func.arity(),
                            arguments.len()
                        ),
                    )?
                }
                func.call(self, &arguments)?
            }
        };
        Ok(res)
    }

    /// Runs statements in order; `Ok(Some(..))` is a `return` travelling up
    /// to the enclosing call.
    pub fn interpret_stmts(&mut self, statements: &[Stmt]) -> Result<Option<Value>, RuntimeError> {
        for statement in statements {
            let res = self.interpret_stmt(statement)?;
            if res.is_some() {
                return Ok(res);
            }
        }
        Ok(None)
    }

    pub fn interpret_stmt(&mut self, statement: &Stmt) -> Result<Option<Value>, RuntimeError> {
        match statement {
            Stmt::Expression(expr) => {
                let _ = self.visit(expr)?;
            }
            Stmt::Print(expr) => {
                let val = self.visit(expr)?;
                writeln!(self.output, "{}", val).expect("cannot write program output");
            }
            Stmt::Var { name, initializer } => {
                let value = if let Some(init) = initializer {
                    self.visit(init)?
                } else {
                    Value::Primitive(Literal::NIL)
                };
                self.environment
                    .borrow_mut()
                    .define(name.lexeme.to_string(), value);
            }
            Stmt::Block { statements } => {
                return self.execute_block(statements, self.environment.clone());
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let val = self.visit(condition)?;
                if is_truthy(&val) {
                    return self.interpret_stmt(then_branch);
                } else if let Some(else_statement) = else_branch {
                    return self.interpret_stmt(else_statement);
                }
            }
            Stmt::While { condition, body } => loop {
                let val = self.visit(condition)?;
                if !is_truthy(&val) {
                    break;
                }
                let res = self.interpret_stmt(body)?;
                if res.is_some() {
                    return Ok(res);
                }
            },
            Stmt::Function { name, params, body } => {
                // The closure is the environment in effect at declaration.
                let func = LoxFunction::new(name, params, body, self.environment.clone());
                self.environment
                    .borrow_mut()
                    .define(func.name(), Value::Function(func));
            }
            Stmt::Return { keyword: _, value } => {
                let val = if let Some(expr) = value {
                    self.visit(expr)?
                } else {
                    Value::Primitive(Literal::NIL)
                };
                return Ok(Some(val));
            }
        }
        Ok(None)
    }

    /// Runs `statements` in a fresh child of `previous`, restoring
    /// `previous` on every exit path, error and return included.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        previous: Shared<Environment>,
    ) -> Result<Option<Value>, RuntimeError> {
        let env = Environment::new(Some(previous.clone()));
        self.environment = env;
        let res = self.interpret_stmts(statements);
        self.environment = previous;
        res
    }
}

fn is_truthy(val: &Value) -> bool {
    match val {
        Value::Primitive(l) => !matches!(l, Literal::NIL | Literal::Boolean(false)),
        _ => true,
    }
}

fn is_equal([left_val, right_val]: [Value; 2]) -> bool {
    match [left_val, right_val] {
        [Value::Primitive(l), Value::Primitive(r)] => match [l, r] {
            [Literal::Number(l), Literal::Number(r)] => l == r,
            [Literal::Boolean(l), Literal::Boolean(r)] => l == r,
            [Literal::String(l), Literal::String(r)] => l == r,
            [Literal::NIL, Literal::NIL] => true,
            _ => false,
        },
        [Value::Function(l), Value::Function(r)] => Rc::ptr_eq(&l, &r),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;
    use crate::types::{create_shared, SharedSink};

    fn run(src: &str) -> Result<String, RuntimeError> {
        let mut scanner = Scanner::new(src);
        assert!(scanner.scan_tokens().is_empty(), "scan errors in test input");
        let (stmts, errors) = Parser::new(scanner.tokens).parse();
        assert!(errors.is_empty(), "parse errors in test input: {:?}", errors);
        let buf = create_shared(Vec::new());
        let mut interp = Interpreter::with_output(Box::new(SharedSink(buf.clone())));
        interp.interpret(&stmts)?;
        let out = String::from_utf8(buf.borrow().clone()).expect("program output is utf-8");
        Ok(out)
    }

    fn run_ok(src: &str) -> String {
        run(src).expect("unexpected runtime error")
    }

    fn run_err(src: &str) -> (String, RuntimeError) {
        let mut scanner = Scanner::new(src);
        assert!(scanner.scan_tokens().is_empty());
        let (stmts, errors) = Parser::new(scanner.tokens).parse();
        assert!(errors.is_empty());
        let buf = create_shared(Vec::new());
        let mut interp = Interpreter::with_output(Box::new(SharedSink(buf.clone())));
        let err = interp.interpret(&stmts).expect_err("expected a runtime error");
        let out = String::from_utf8(buf.borrow().clone()).expect("program output is utf-8");
        (out, err)
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run_ok("print 1 + 2;"), "3\n");
        assert_eq!(run_ok("print 2 * 3 + 4;"), "10\n");
        assert_eq!(run_ok("print 7 / 2;"), "3.5\n");
        assert_eq!(run_ok("print -(1 + 2);"), "-3\n");
    }

    #[test]
    fn integral_numbers_print_without_a_fraction() {
        assert_eq!(run_ok("print 3.0;"), "3\n");
        assert_eq!(run_ok("print 2.5;"), "2.5\n");
    }

    #[test]
    fn division_by_zero_is_infinity() {
        assert_eq!(run_ok("print 1/0;"), "inf\n");
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(
            run_ok("var a = \"hi\"; var b = \" there\"; print a + b;"),
            "hi there\n"
        );
    }

    #[test]
    fn comparisons() {
        assert_eq!(run_ok("print 1 < 2; print 2 <= 2; print 3 > 4; print 4 >= 4;"),
            "true\ntrue\nfalse\ntrue\n");
    }

    #[test]
    fn equality_is_total() {
        assert_eq!(
            run_ok("print \"a\" == \"a\"; print 1 == \"1\"; print nil == nil;"),
            "true\nfalse\ntrue\n"
        );
        assert_eq!(run_ok("print nil == false;"), "false\n");
        assert_eq!(run_ok("print 1 != 2;"), "true\n");
    }

    #[test]
    fn truthiness_spares_only_nil_and_false() {
        assert_eq!(run_ok("if (0) print \"yes\"; else print \"no\";"), "yes\n");
        assert_eq!(run_ok("if (\"\") print \"yes\"; else print \"no\";"), "yes\n");
        assert_eq!(run_ok("if (nil) print \"yes\"; else print \"no\";"), "no\n");
        assert_eq!(run_ok("print !nil; print !false; print !0;"), "true\ntrue\nfalse\n");
    }

    #[test]
    fn bang_never_type_errors() {
        assert_eq!(run_ok("print !clock;"), "false\n");
    }

    #[test]
    fn logical_operators_return_the_operand() {
        assert_eq!(run_ok("print (1 < 2) and \"yes\";"), "yes\n");
        assert_eq!(run_ok("print nil or \"fallback\";"), "fallback\n");
        assert_eq!(run_ok("print false and 1;"), "false\n");
        assert_eq!(run_ok("print 7 or 1;"), "7\n");
    }

    #[test]
    fn logical_operators_short_circuit() {
        let src = r#"
            var called = false;
            fun touch() { called = true; return true; }
            print true or touch();
            print false and touch();
            print called;
        "#;
        assert_eq!(run_ok(src), "true\nfalse\nfalse\n");
    }

    #[test]
    fn assignment_evaluates_to_the_assigned_value() {
        assert_eq!(run_ok("var a = 1; print a = 2; print a;"), "2\n2\n");
    }

    #[test]
    fn blocks_shadow_and_restore() {
        assert_eq!(
            run_ok("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
        assert_eq!(run_ok("var a = 1; { a = 2; } print a;"), "2\n");
    }

    #[test]
    fn while_loops() {
        assert_eq!(
            run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn for_loop_accumulates() {
        assert_eq!(
            run_ok("var x = 0; for (var i = 0; i < 3; i = i + 1) x = x + i; print x;"),
            "3\n"
        );
    }

    #[test]
    fn for_loop_matches_its_while_desugaring() {
        let with_for = "var x = 0; for (var i = 0; i < 5; i = i + 1) { x = x + i; print x; }";
        let with_while =
            "var x = 0; { var i = 0; while (i < 5) { { x = x + i; print x; } i = i + 1; } }";
        assert_eq!(run_ok(with_for), run_ok(with_while));
    }

    #[test]
    fn for_initializer_scope_does_not_leak() {
        let (_, err) = run_err("for (var i = 0; i < 1; i = i + 1) print i;\nprint i;");
        assert_eq!(format!("{}", err), "Undefined variable 'i'.\n[line 2]");
    }

    #[test]
    fn functions_return_values() {
        let src = r#"
            fun max(x, y) {
                if (x > y) {
                    return x;
                }
                return y;
            }
            print max(10, 20);
        "#;
        assert_eq!(run_ok(src), "20\n");
    }

    #[test]
    fn implicit_return_is_nil() {
        assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn return_unwinds_any_depth_of_blocks() {
        let src = r#"
            fun f() {
                while (true) {
                    {
                        return 1;
                    }
                }
            }
            print f();
        "#;
        assert_eq!(run_ok(src), "1\n");
    }

    #[test]
    fn return_stops_the_rest_of_the_body() {
        let src = r#"
            fun f() {
                return 1;
                print 666;
            }
            print f();
        "#;
        assert_eq!(run_ok(src), "1\n");
    }

    #[test]
    fn closures_capture_the_declaring_environment() {
        let src = r#"
            fun makeCounter() {
                var n = 0;
                fun c() {
                    n = n + 1;
                    return n;
                }
                return c;
            }
            var c = makeCounter();
            print c();
            print c();
            print c();
        "#;
        assert_eq!(run_ok(src), "1\n2\n3\n");
    }

    #[test]
    fn closures_see_later_writes_to_captured_variables() {
        let src = r#"
            var x = 1;
            fun show() { print x; }
            x = 2;
            show();
        "#;
        assert_eq!(run_ok(src), "2\n");
    }

    #[test]
    fn two_counters_are_independent() {
        let src = r#"
            fun makeCounter() {
                var n = 0;
                fun c() { n = n + 1; return n; }
                return c;
            }
            var a = makeCounter();
            var b = makeCounter();
            print a();
            print a();
            print b();
        "#;
        assert_eq!(run_ok(src), "1\n2\n1\n");
    }

    #[test]
    fn functions_print_by_name_natives_anonymously() {
        assert_eq!(run_ok("fun f() {} print f;"), "<fn f>\n");
        assert_eq!(run_ok("print clock;"), "<native fn>\n");
    }

    #[test]
    fn clock_returns_seconds() {
        assert_eq!(run_ok("print clock() > 0;"), "true\n");
    }

    #[test]
    fn negating_a_string_is_a_runtime_error() {
        let (_, err) = run_err("print -\"x\";");
        assert_eq!(format!("{}", err), "Operand must be a number.\n[line 1]");
    }

    #[test]
    fn comparing_mixed_operands_is_a_runtime_error() {
        let (_, err) = run_err("print 1 < \"2\";");
        assert_eq!(format!("{}", err), "Operands must be numbers.\n[line 1]");
    }

    #[test]
    fn adding_mixed_operands_is_a_runtime_error() {
        let (_, err) = run_err("print 1 + \"a\";");
        assert_eq!(
            format!("{}", err),
            "Operands must be two numbers or two strings.\n[line 1]"
        );
    }

    #[test]
    fn calling_a_non_callable_is_a_runtime_error() {
        let (_, err) = run_err("\"not a function\"();");
        assert_eq!(
            format!("{}", err),
            "Can only call functions and classes.\n[line 1]"
        );
    }

    #[test]
    fn arity_mismatch_is_a_runtime_error() {
        let (_, err) = run_err("fun f(a) {}\nf(1, 2);");
        assert_eq!(
            format!("{}", err),
            "Expected 1 arguments but got 2.\n[line 2]"
        );
    }

    #[test]
    fn undefined_variable_read_is_a_runtime_error() {
        let (_, err) = run_err("print ghost;");
        assert_eq!(format!("{}", err), "Undefined variable 'ghost'.\n[line 1]");
    }

    #[test]
    fn undefined_variable_assignment_is_a_runtime_error() {
        let (_, err) = run_err("ghost = 1;");
        assert_eq!(format!("{}", err), "Undefined variable 'ghost'.\n[line 1]");
    }

    #[test]
    fn runtime_error_halts_execution_mid_program() {
        let (out, err) = run_err("print 1; print -\"x\"; print 2;");
        assert_eq!(out, "1\n");
        assert_eq!(format!("{}", err), "Operand must be a number.\n[line 1]");
    }

    #[test]
    fn var_without_initializer_is_nil() {
        assert_eq!(run_ok("var a; print a;"), "nil\n");
    }

    #[test]
    fn operands_evaluate_left_to_right() {
        let src = r#"
            var log = "";
            fun mark(label, value) {
                log = log + label;
                return value;
            }
            var sum = mark("a", 1) + mark("b", 2);
            print log;
            print sum;
        "#;
        assert_eq!(run_ok(src), "ab\n3\n");
    }

    #[test]
    fn arguments_evaluate_left_to_right() {
        let src = r#"
            var log = "";
            fun mark(label) { log = log + label; return label; }
            fun three(a, b, c) { return log; }
            print three(mark("1"), mark("2"), mark("3"));
        "#;
        assert_eq!(run_ok(src), "123\n");
    }

    #[test]
    fn clock_is_registered_in_the_globals() {
        let interp = Interpreter::with_output(Box::new(io::sink()));
        let name = Token {
            token_type: TokenType::IDENTIFIER,
            lexeme: Arc::new("clock".to_owned()),
            line: 1,
        };
        let val = interp.globals.borrow().get(&name).unwrap();
        assert_eq!(format!("{}", val), "<native fn>");
    }

    #[test]
    fn globals_persist_across_interpret_calls() {
        // The REPL reuses one interpreter; state must survive between runs.
        let buf = create_shared(Vec::new());
        let mut interp = Interpreter::with_output(Box::new(SharedSink(buf.clone())));
        for src in ["var a = 1;", "fun bump() { a = a + 1; }", "bump();", "print a;"] {
            let mut scanner = Scanner::new(src);
            assert!(scanner.scan_tokens().is_empty());
            let (stmts, errors) = Parser::new(scanner.tokens).parse();
            assert!(errors.is_empty());
            interp.interpret(&stmts).expect("runtime error");
        }
        assert_eq!(String::from_utf8(buf.borrow().clone()).unwrap(), "2\n");
    }
}
