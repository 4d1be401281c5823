//! C99 code generator
//!
//! Emits a self-contained translation unit: standard headers, forward
//! declarations of every function in source order, then the function
//! bodies. Every binary operator is fully parenthesized so the emitted
//! code keeps source semantics regardless of C precedence. Booleans are
//! `0`/`1` in expressions and `bool` in declarations; `print(x)` becomes
//! `printf("%d\n", x)`.

use crate::ast::{Expr, ExprKind, Function, Program, Stmt, UnaryOp};
use crate::config::CompilerConfig;

struct CGen<'a> {
    out: String,
    indent_level: usize,
    config: &'a CompilerConfig,
}

impl<'a> CGen<'a> {
    fn new(config: &'a CompilerConfig) -> Self {
        CGen {
            out: String::with_capacity(1024),
            indent_level: 0,
            config,
        }
    }

    /// The one place output is appended.
    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn indent(&mut self) {
        for _ in 0..self.indent_level {
            self.push("    ");
        }
    }

    fn expression(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::IntLiteral(value) => self.push(&value.to_string()),
            ExprKind::BoolLiteral(value) => self.push(if *value { "1" } else { "0" }),
            ExprKind::Var(name) => self.push(name),
            ExprKind::Binary { op, left, right } => {
                self.push("(");
                self.expression(left);
                self.push(" ");
                self.push(op.symbol());
                self.push(" ");
                self.expression(right);
                self.push(")");
            }
            ExprKind::Unary { op, operand } => {
                let UnaryOp::Not = *op;
                self.push("!(");
                self.expression(operand);
                self.push(")");
            }
            ExprKind::Call { name, args } => {
                if name == "print" {
                    self.push("printf(\"%d\\n\", ");
                    if let Some(arg) = args.first() {
                        self.expression(arg);
                    }
                    self.push(")");
                    return;
                }

                self.push(name);
                self.push("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expression(arg);
                }
                self.push(")");
            }
        }
    }

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, ty, init } => {
                self.indent();
                self.push(&ty.to_string());
                self.push(" ");
                self.push(name);
                self.push(" = ");
                self.expression(init);
                self.push(";\n");
            }
            Stmt::Assign { name, expr } => {
                self.indent();
                self.push(name);
                self.push(" = ");
                self.expression(expr);
                self.push(";\n");
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                self.indent();
                self.push("if (");
                self.expression(condition);
                self.push(") ");
                self.statement(then_block);
                if let Some(else_block) = else_block {
                    self.indent();
                    self.push("else ");
                    self.statement(else_block);
                }
            }
            Stmt::While { condition, body } => {
                self.indent();
                self.push("while (");
                self.expression(condition);
                self.push(") ");
                self.statement(body);
            }
            Stmt::Return(expr) => {
                self.indent();
                self.push("return");
                if let Some(expr) = expr {
                    self.push(" ");
                    self.expression(expr);
                }
                self.push(";\n");
            }
            Stmt::Expr(expr) => {
                self.indent();
                self.expression(expr);
                self.push(";\n");
            }
            Stmt::Block(statements) => {
                self.push("{\n");
                self.indent_level += 1;
                for stmt in statements {
                    self.statement(stmt);
                }
                self.indent_level -= 1;
                self.indent();
                self.push("}\n");
            }
        }
    }

    fn signature(&mut self, func: &Function) {
        self.push(&func.return_type.to_string());
        self.push(" ");
        self.push(&func.name);
        self.push("(");
        if func.params.is_empty() {
            self.push("void");
        } else {
            for (i, param) in func.params.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.push(&param.ty.to_string());
                self.push(" ");
                self.push(&param.name);
            }
        }
        self.push(")");
    }

    fn function(&mut self, func: &Function) {
        self.signature(func);
        self.push(" ");
        self.statement(&func.body);
        self.push("\n");
    }

    fn program(&mut self, program: &Program) {
        if self.config.emit_comments {
            self.push("/* Generated by the CoreTiny compiler */\n\n");
        }

        self.push("#include <stdio.h>\n");
        self.push("#include <stdbool.h>\n\n");

        // Forward declarations, parameter names omitted
        for func in &program.functions {
            self.push(&func.return_type.to_string());
            self.push(" ");
            self.push(&func.name);
            self.push("(");
            if func.params.is_empty() {
                self.push("void");
            } else {
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push(&param.ty.to_string());
                }
            }
            self.push(");\n");
        }
        self.push("\n");

        for func in &program.functions {
            self.function(func);
        }
    }
}

/// Emit `program` as a C99 translation unit.
pub fn generate(program: &Program, config: &CompilerConfig) -> String {
    let mut generator = CGen::new(config);
    generator.program(program);
    generator.out
}
