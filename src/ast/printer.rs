use crate::ast::*;

pub fn to_sexp(program: &Program) -> String {
    let mut buf = String::new();
    for statement in &program.statements {
        sexp_statement(&mut buf, statement);
        buf.push('\n');
    }
    buf
}

pub fn to_json(program: &Program) -> serde_json::Result<String> {
    serde_json::to_string_pretty(program)
}

fn sexp_statement(buf: &mut String, statement: &Statement) {
    match &statement.kind {
        StmtKind::Label { name } => {
            buf.push('@');
            buf.push_str(name);
        }
        StmtKind::If {
            condition,
            true_label,
            false_label,
        } => {
            buf.push_str("(if ");
            sexp_expr(buf, condition);
            buf.push_str(" @");
            buf.push_str(true_label);
            if let Some(label) = false_label {
                buf.push_str(" @");
                buf.push_str(label);
            }
            buf.push(')');
        }
        StmtKind::Goto { label } => {
            buf.push_str("(goto @");
            buf.push_str(label);
            buf.push(')');
        }
        StmtKind::Print { expr } => {
            buf.push_str("(print ");
            sexp_expr(buf, expr);
            buf.push(')');
        }
        StmtKind::Assign { target, value } => {
            buf.push_str("(= ");
            sexp_expr(buf, target);
            buf.push(' ');
            sexp_expr(buf, value);
            buf.push(')');
        }
        StmtKind::Expression { expr } => sexp_expr(buf, expr),
    }
}

fn sexp_expr(buf: &mut String, expr: &Expr) {
    match expr {
        Expr::Int(n) => buf.push_str(&n.to_string()),
        Expr::Float(n) => buf.push_str(&format!("{n:?}")),
        Expr::Str(s) => buf.push_str(&format!("{s:?}")),
        Expr::Bool(b) => buf.push_str(&b.to_string()),
        Expr::Null => buf.push_str("null"),
        Expr::Variable(name) => buf.push_str(name),
        Expr::SystemFunc(name) => {
            buf.push('$');
            buf.push_str(name);
        }
        Expr::ServiceRoot => buf.push_str(SERVICE_ROOT),
        // Chains print infix so the flat operand list stays visible.
        Expr::OpsChain(chain) => {
            buf.push('(');
            for (i, operand) in chain.operands.iter().enumerate() {
                if i > 0 {
                    buf.push(' ');
                    if let Some(op) = chain.operators.get(i - 1) {
                        buf.push_str(&op.text);
                        buf.push(' ');
                    }
                }
                sexp_expr(buf, operand);
            }
            buf.push(')');
        }
        Expr::Field(field) => {
            buf.push_str("(. ");
            sexp_expr(buf, &field.root);
            buf.push(' ');
            buf.push_str(&field.name);
            buf.push(')');
        }
        Expr::Index(index) => {
            buf.push_str("([] ");
            sexp_expr(buf, &index.root);
            buf.push(' ');
            sexp_expr(buf, &index.key);
            buf.push(')');
        }
        Expr::Invoke(invoke) => {
            buf.push_str("(call ");
            sexp_expr(buf, &invoke.root);
            for arg in &invoke.args {
                buf.push(' ');
                sexp_expr(buf, arg);
            }
            buf.push(')');
        }
        Expr::Not(operand) => {
            buf.push_str("(not ");
            sexp_expr(buf, operand);
            buf.push(')');
        }
        Expr::Neg(operand) => {
            buf.push_str("(- ");
            sexp_expr(buf, operand);
            buf.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn statement(kind: StmtKind) -> Statement {
        Statement {
            kind,
            position: Position {
                file: Arc::from("main.slang"),
                line: 1,
                column: 1,
            },
        }
    }

    fn op(text: &str) -> Token {
        Token::new(
            text,
            Position {
                file: Arc::from("main.slang"),
                line: 1,
                column: 3,
            },
            text.len(),
        )
    }

    #[test]
    fn sexp_assignment_with_chain() {
        let program = Program {
            statements: vec![statement(StmtKind::Assign {
                target: Expr::Variable("n".into()),
                value: Expr::OpsChain(OpsChain {
                    operands: vec![Expr::Variable("n".into()), Expr::Int(1)],
                    operators: vec![op("+")],
                }),
            })],
        };
        assert_eq!(to_sexp(&program), "(= n (n + 1))\n");
    }

    #[test]
    fn sexp_labels_and_jumps() {
        let program = Program {
            statements: vec![
                statement(StmtKind::Label { name: "a".into() }),
                statement(StmtKind::If {
                    condition: Expr::Bool(true),
                    true_label: "a".into(),
                    false_label: Some("b".into()),
                }),
                statement(StmtKind::Goto { label: "a".into() }),
            ],
        };
        assert_eq!(to_sexp(&program), "@a\n(if true @a @b)\n(goto @a)\n");
    }

    #[test]
    fn sexp_literals() {
        let program = Program {
            statements: vec![statement(StmtKind::Print {
                expr: Expr::Invoke(Invoke {
                    root: Box::new(Expr::SystemFunc("pause".into())),
                    args: vec![Expr::Float(0.5), Expr::Str("a\"b".into()), Expr::Null],
                }),
            })],
        };
        assert_eq!(to_sexp(&program), "(print (call $pause 0.5 \"a\\\"b\" null))\n");
    }

    #[test]
    fn json_is_tagged() {
        let program = Program {
            statements: vec![statement(StmtKind::Print {
                expr: Expr::Field(FieldAccess {
                    root: Box::new(Expr::ServiceRoot),
                    name: "echo".into(),
                }),
            })],
        };
        let json = to_json(&program).expect("serializable");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        let first = &value["statements"][0];
        assert_eq!(first["type"], "print");
        assert_eq!(first["expr"]["type"], "field");
        assert_eq!(first["expr"]["value"]["name"], "echo");
        assert_eq!(first["position"]["line"], 1);
    }
}
