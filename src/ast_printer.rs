use crate::expr::{Expr, Stmt};
use crate::scanner::Literal;

/// Renders an expression back to Lox source. Every compound expression is
/// parenthesized, so the output makes operator binding visible and
/// re-parses to a tree with identical semantics.
#[allow(dead_code)]
pub fn print_ast(expr: &Expr) -> String {
    match expr {
        Expr::Binary {
            left,
            operator,
            right,
        }
        | Expr::Logical {
            left,
            operator,
            right,
        } => {
            format!("({} {} {})", print_ast(left), operator, print_ast(right))
        }
        Expr::Grouping(inner) => format!("({})", print_ast(inner)),
        Expr::LiteralNode(Literal::String(s)) => format!("\"{}\"", s),
        Expr::LiteralNode(val) => format!("{}", val),
        Expr::Unary { operator, right } => format!("({}{})", operator, print_ast(right)),
        Expr::Variable { name } => name.lexeme.to_string(),
        Expr::Assign { name, value } => format!("({} = {})", name.lexeme, print_ast(value)),
        Expr::Call { callee, args, .. } => {
            let args = args.iter().map(print_ast).collect::<Vec<_>>().join(", ");
            format!("{}({})", print_ast(callee), args)
        }
    }
}

#[allow(dead_code)]
pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expression(expr) => format!("{};", print_ast(expr)),
        Stmt::Print(expr) => format!("print {};", print_ast(expr)),
        Stmt::Var {
            name,
            initializer: Some(init),
        } => format!("var {} = {};", name.lexeme, print_ast(init)),
        Stmt::Var {
            name,
            initializer: None,
        } => format!("var {};", name.lexeme),
        Stmt::Block { statements } => print_body(statements),
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut out = format!("if ({}) {}", print_ast(condition), print_stmt(then_branch));
            if let Some(else_branch) = else_branch {
                out.push_str(&format!(" else {}", print_stmt(else_branch)));
            }
            out
        }
        Stmt::While { condition, body } => {
            format!("while ({}) {}", print_ast(condition), print_stmt(body))
        }
        Stmt::Function { name, params, body } => {
            let params = params
                .iter()
                .map(|p| p.lexeme.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("fun {}({}) {}", name.lexeme, params, print_body(body))
        }
        Stmt::Return {
            value: Some(value), ..
        } => format!("return {};", print_ast(value)),
        Stmt::Return { value: None, .. } => "return;".to_string(),
    }
}

#[allow(dead_code)]
fn print_body(statements: &[Stmt]) -> String {
    if statements.is_empty() {
        "{ }".to_string()
    } else {
        let inner = statements
            .iter()
            .map(print_stmt)
            .collect::<Vec<_>>()
            .join(" ");
        format!("{{ {} }}", inner)
    }
}
