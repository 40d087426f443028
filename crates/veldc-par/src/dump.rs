//! Human-readable AST dump, used by `veldc --verbose`.

use std::fmt::Write;

use crate::ast::{
    AstExpression, AstExpressionKind, AstSignature, AstStatement, AstStatementKind, AstToplevel,
    AstToplevelKind, AstType, BinaryOp, Constant,
};

/// Renders the AST as an indented tree, one node per line.
pub fn dump_ast(toplevels: &[AstToplevel]) -> String {
    let mut out = String::new();
    for toplevel in toplevels {
        match &toplevel.kind {
            AstToplevelKind::DeclareFunction(signature) => {
                line(&mut out, 0, &format!("declare {}", signature_str(signature)));
            }
            AstToplevelKind::DefineFunction { signature, body } => {
                line(&mut out, 0, &format!("def {}", signature_str(signature)));
                dump_body(&mut out, 1, body);
            }
            AstToplevelKind::DefineStruct { name, fields } => {
                line(&mut out, 0, &format!("struct {name}"));
                for (field_name, ty) in fields {
                    line(&mut out, 1, &format!("{}: {}", field_name, type_str(ty)));
                }
            }
        }
    }
    out
}

fn line(out: &mut String, depth: usize, text: &str) {
    let _ = writeln!(out, "{}{}", "  ".repeat(depth), text);
}

fn type_str(ty: &AstType) -> String {
    format!("{}{}", ty.name, "*".repeat(ty.pointer_depth as usize))
}

fn signature_str(signature: &AstSignature) -> String {
    let mut args: Vec<String> = signature
        .args
        .iter()
        .map(|(name, ty)| format!("{}: {}", name, type_str(ty)))
        .collect();
    if signature.takes_varargs {
        args.push("...".to_string());
    }
    format!(
        "{}({}) -> {}",
        signature.name,
        args.join(", "),
        type_str(&signature.return_type)
    )
}

fn dump_body(out: &mut String, depth: usize, body: &[AstStatement]) {
    for statement in body {
        dump_statement(out, depth, statement);
    }
}

fn dump_statement(out: &mut String, depth: usize, statement: &AstStatement) {
    match &statement.kind {
        AstStatementKind::ExpressionStatement(expr) => {
            line(out, depth, "expression statement");
            dump_expression(out, depth + 1, expr);
        }
        AstStatementKind::ReturnValue(expr) => {
            line(out, depth, "return");
            dump_expression(out, depth + 1, expr);
        }
        AstStatementKind::ReturnWithoutValue => line(out, depth, "return"),
        AstStatementKind::DeclareLocalVar {
            name,
            ty,
            initial_value,
        } => {
            line(out, depth, &format!("declare {}: {}", name, type_str(ty)));
            if let Some(value) = initial_value {
                dump_expression(out, depth + 1, value);
            }
        }
        AstStatementKind::Assign { target, value } => {
            line(out, depth, "assign");
            dump_expression(out, depth + 1, target);
            dump_expression(out, depth + 1, value);
        }
        AstStatementKind::If {
            if_and_elifs,
            else_body,
        } => {
            for (i, branch) in if_and_elifs.iter().enumerate() {
                line(out, depth, if i == 0 { "if" } else { "elif" });
                dump_expression(out, depth + 1, &branch.condition);
                line(out, depth, "then");
                dump_body(out, depth + 1, &branch.body);
            }
            if !else_body.is_empty() {
                line(out, depth, "else");
                dump_body(out, depth + 1, else_body);
            }
        }
        AstStatementKind::While { condition, body } => {
            line(out, depth, "while");
            dump_expression(out, depth + 1, condition);
            line(out, depth, "do");
            dump_body(out, depth + 1, body);
        }
        AstStatementKind::For {
            init,
            condition,
            increment,
            body,
        } => {
            line(out, depth, "for init");
            dump_statement(out, depth + 1, init);
            line(out, depth, "for condition");
            dump_expression(out, depth + 1, condition);
            line(out, depth, "for increment");
            dump_statement(out, depth + 1, increment);
            line(out, depth, "for body");
            dump_body(out, depth + 1, body);
        }
        AstStatementKind::Break => line(out, depth, "break"),
        AstStatementKind::Continue => line(out, depth, "continue"),
    }
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
    }
}

fn constant_str(constant: &Constant) -> String {
    match constant {
        Constant::Null => "NULL".to_string(),
        Constant::Bool(true) => "True".to_string(),
        Constant::Bool(false) => "False".to_string(),
        Constant::Integer { value, .. } => value.to_string(),
        Constant::Str(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
    }
}

fn dump_expression(out: &mut String, depth: usize, expr: &AstExpression) {
    match &expr.kind {
        AstExpressionKind::Constant(constant) => {
            line(out, depth, &format!("constant {}", constant_str(constant)));
        }
        AstExpressionKind::GetVariable(name) => {
            line(out, depth, &format!("get variable '{name}'"));
        }
        AstExpressionKind::FunctionCall { name, args } => {
            line(out, depth, &format!("call {name}"));
            for arg in args {
                dump_expression(out, depth + 1, arg);
            }
        }
        AstExpressionKind::BraceInit {
            struct_name,
            fields,
        } => {
            line(out, depth, &format!("new {struct_name}"));
            for (field_name, value) in fields {
                line(out, depth + 1, &format!("field {field_name}"));
                dump_expression(out, depth + 2, value);
            }
        }
        AstExpressionKind::GetField { obj, field_name } => {
            line(out, depth, &format!("get field '{field_name}'"));
            dump_expression(out, depth + 1, obj);
        }
        AstExpressionKind::DerefAndGetField { obj, field_name } => {
            line(out, depth, &format!("dereference and get field '{field_name}'"));
            dump_expression(out, depth + 1, obj);
        }
        AstExpressionKind::Indexing { ptr, index } => {
            line(out, depth, "index");
            dump_expression(out, depth + 1, ptr);
            dump_expression(out, depth + 1, index);
        }
        AstExpressionKind::As { obj, target } => {
            line(out, depth, &format!("cast to {}", type_str(target)));
            dump_expression(out, depth + 1, obj);
        }
        AstExpressionKind::AddressOf(operand) => {
            line(out, depth, "address of");
            dump_expression(out, depth + 1, operand);
        }
        AstExpressionKind::Dereference(operand) => {
            line(out, depth, "dereference");
            dump_expression(out, depth + 1, operand);
        }
        AstExpressionKind::Not(operand) => {
            line(out, depth, "not");
            dump_expression(out, depth + 1, operand);
        }
        AstExpressionKind::And(lhs, rhs) => {
            line(out, depth, "and");
            dump_expression(out, depth + 1, lhs);
            dump_expression(out, depth + 1, rhs);
        }
        AstExpressionKind::Or(lhs, rhs) => {
            line(out, depth, "or");
            dump_expression(out, depth + 1, lhs);
            dump_expression(out, depth + 1, rhs);
        }
        AstExpressionKind::Binary { op, lhs, rhs } => {
            line(out, depth, &format!("binary {}", binary_op_str(*op)));
            dump_expression(out, depth + 1, lhs);
            dump_expression(out, depth + 1, rhs);
        }
        AstExpressionKind::PreIncrement(operand) => {
            line(out, depth, "pre-increment");
            dump_expression(out, depth + 1, operand);
        }
        AstExpressionKind::PreDecrement(operand) => {
            line(out, depth, "pre-decrement");
            dump_expression(out, depth + 1, operand);
        }
        AstExpressionKind::PostIncrement(operand) => {
            line(out, depth, "post-increment");
            dump_expression(out, depth + 1, operand);
        }
        AstExpressionKind::PostDecrement(operand) => {
            line(out, depth, "post-decrement");
            dump_expression(out, depth + 1, operand);
        }
    }
}
