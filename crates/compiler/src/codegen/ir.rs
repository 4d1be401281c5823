//! SSA-like IR generator
//!
//! Emits a human-readable intermediate representation: explicit
//! temporaries, labels for control flow, and function definitions with
//! an `entry:` block. Every expression lowers to the index of the
//! temporary holding its value; the result temporary is issued before
//! the operands are lowered, so an expression's result index is always
//! lower than its operands'. Temporary and label counters are
//! per-function.
//!
//! Variables live in named slots: declarations emit `alloca i32` once,
//! reads are `load %name`, writes are `store i32 %tN, %name`.
//! Parameters arrive as `%name.param` and are copied into a local slot
//! in the prologue so the body can use the uniform load/store pattern.

use crate::ast::{BinaryOp, Expr, ExprKind, Function, Program, Stmt, Type, UnaryOp};
use crate::config::CompilerConfig;

struct IrGen<'a> {
    out: String,
    indent_level: usize,
    temp_counter: usize,
    label_counter: usize,
    config: &'a CompilerConfig,
}

fn type_name(ty: Type) -> &'static str {
    match ty {
        Type::Int => "i32",
        Type::Bool => "i1",
        Type::Void => "void",
    }
}

impl<'a> IrGen<'a> {
    fn new(config: &'a CompilerConfig) -> Self {
        IrGen {
            out: String::with_capacity(1024),
            indent_level: 0,
            temp_counter: 0,
            label_counter: 0,
            config,
        }
    }

    /// The one place output is appended.
    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn indent(&mut self) {
        for _ in 0..self.indent_level {
            self.push("  ");
        }
    }

    fn next_temp(&mut self) -> usize {
        let t = self.temp_counter;
        self.temp_counter += 1;
        t
    }

    fn next_label(&mut self) -> usize {
        let l = self.label_counter;
        self.label_counter += 1;
        l
    }

    /// Lower an expression; returns the temporary holding its value.
    fn expression(&mut self, expr: &Expr) -> usize {
        let result = self.next_temp();

        match &expr.kind {
            ExprKind::IntLiteral(value) => {
                self.indent();
                self.push(&format!("%t{result} = const i32 {value}\n"));
            }
            ExprKind::BoolLiteral(value) => {
                self.indent();
                let bit = if *value { 1 } else { 0 };
                self.push(&format!("%t{result} = const i1 {bit}\n"));
            }
            ExprKind::Var(name) => {
                self.indent();
                self.push(&format!("%t{result} = load %{name}\n"));
            }
            ExprKind::Binary { op, left, right } => {
                let lhs = self.expression(left);
                let rhs = self.expression(right);
                self.indent();
                let instr = match op {
                    BinaryOp::Add => "add i32",
                    BinaryOp::Sub => "sub i32",
                    BinaryOp::Mul => "mul i32",
                    BinaryOp::Div => "div i32",
                    BinaryOp::Mod => "mod i32",
                    BinaryOp::Eq => "icmp eq i32",
                    BinaryOp::Ne => "icmp ne i32",
                    BinaryOp::Lt => "icmp lt i32",
                    BinaryOp::Le => "icmp le i32",
                    BinaryOp::Gt => "icmp gt i32",
                    BinaryOp::Ge => "icmp ge i32",
                    BinaryOp::And => "and i1",
                    BinaryOp::Or => "or i1",
                };
                self.push(&format!("%t{result} = {instr} %t{lhs}, %t{rhs}\n"));
            }
            ExprKind::Unary { op, operand } => {
                let UnaryOp::Not = *op;
                let value = self.expression(operand);
                self.indent();
                self.push(&format!("%t{result} = xor i1 %t{value}, 1\n"));
            }
            ExprKind::Call { name, args } => {
                if name == "print" {
                    if let Some(arg) = args.first() {
                        let arg_temp = self.expression(arg);
                        self.indent();
                        self.push(&format!("call void @print(i32 %t{arg_temp})\n"));
                    }
                    return result;
                }

                // Arguments are evaluated left to right before the call
                let arg_temps: Vec<usize> = args.iter().map(|arg| self.expression(arg)).collect();

                self.indent();
                self.push(&format!("%t{result} = call i32 @{name}("));
                for (i, arg_temp) in arg_temps.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push(&format!("i32 %t{arg_temp}"));
                }
                self.push(")\n");
            }
        }

        result
    }

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, init, .. } => {
                self.indent();
                self.push(&format!("%{name} = alloca i32\n"));
                let init_temp = self.expression(init);
                self.indent();
                self.push(&format!("store i32 %t{init_temp}, %{name}\n"));
            }
            Stmt::Assign { name, expr } => {
                let expr_temp = self.expression(expr);
                self.indent();
                self.push(&format!("store i32 %t{expr_temp}, %{name}\n"));
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                let cond_temp = self.expression(condition);

                let then_label = self.next_label();
                let else_label = self.next_label();
                let end_label = self.next_label();

                self.indent();
                let false_target = if else_block.is_some() { else_label } else { end_label };
                self.push(&format!(
                    "br i1 %t{cond_temp}, label %L{then_label}, label %L{false_target}\n"
                ));

                self.push("\n");
                self.push(&format!("L{then_label}:\n"));
                self.indent_level += 1;
                self.statement(then_block);
                self.indent_level -= 1;
                self.indent();
                self.push(&format!("br label %L{end_label}\n"));

                if let Some(else_block) = else_block {
                    self.push("\n");
                    self.push(&format!("L{else_label}:\n"));
                    self.indent_level += 1;
                    self.statement(else_block);
                    self.indent_level -= 1;
                    self.indent();
                    self.push(&format!("br label %L{end_label}\n"));
                }

                self.push("\n");
                self.push(&format!("L{end_label}:\n"));
            }
            Stmt::While { condition, body } => {
                let cond_label = self.next_label();
                let body_label = self.next_label();
                let end_label = self.next_label();

                self.indent();
                self.push(&format!("br label %L{cond_label}\n"));

                self.push("\n");
                self.push(&format!("L{cond_label}:\n"));
                self.indent_level += 1;
                let cond_temp = self.expression(condition);
                self.indent();
                self.push(&format!(
                    "br i1 %t{cond_temp}, label %L{body_label}, label %L{end_label}\n"
                ));
                self.indent_level -= 1;

                self.push("\n");
                self.push(&format!("L{body_label}:\n"));
                self.indent_level += 1;
                self.statement(body);
                self.indent();
                self.push(&format!("br label %L{cond_label}\n"));
                self.indent_level -= 1;

                self.push("\n");
                self.push(&format!("L{end_label}:\n"));
            }
            Stmt::Return(expr) => match expr {
                Some(expr) => {
                    let expr_temp = self.expression(expr);
                    self.indent();
                    self.push(&format!("ret i32 %t{expr_temp}\n"));
                }
                None => {
                    self.indent();
                    self.push("ret void\n");
                }
            },
            Stmt::Expr(expr) => {
                self.expression(expr);
            }
            Stmt::Block(statements) => {
                for stmt in statements {
                    self.statement(stmt);
                }
            }
        }
    }

    fn function(&mut self, func: &Function) {
        // Fresh temporaries and labels for every function
        self.temp_counter = 0;
        self.label_counter = 0;

        self.push(&format!(
            "define {} @{}(",
            type_name(func.return_type),
            func.name
        ));
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push(&format!("{} %{}.param", type_name(param.ty), param.name));
        }
        self.push(") {\n");
        self.push("entry:\n");

        self.indent_level += 1;

        // Prologue: copy incoming parameters into local slots
        for param in &func.params {
            self.indent();
            self.push(&format!("%{} = alloca i32\n", param.name));
            self.indent();
            self.push(&format!("store i32 %{}.param, %{}\n", param.name, param.name));
        }

        self.statement(&func.body);

        self.indent_level -= 1;
        self.push("}\n\n");
    }

    fn program(&mut self, program: &Program) {
        if self.config.emit_comments {
            self.push("; Generated by the CoreTiny compiler\n");
            self.push("; Target: CoreTiny IR\n\n");
        }

        self.push("declare void @print(i32)\n\n");

        for func in &program.functions {
            self.function(func);
        }
    }
}

/// Emit `program` as textual IR.
pub fn generate(program: &Program, config: &CompilerConfig) -> String {
    let mut generator = IrGen::new(config);
    generator.program(program);
    generator.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::tests::typed_program;

    fn emit(source: &str) -> String {
        let program = typed_program(source);
        generate(&program, &CompilerConfig::new())
    }

    #[test]
    fn test_module_header() {
        let code = emit("func main() : int { return 0; }");
        assert!(code.starts_with("declare void @print(i32)\n\n"));
        assert!(code.contains("define i32 @main() {\nentry:\n"));
    }

    #[test]
    fn test_return_constant() {
        let code = emit("func main() : int { return 0; }");
        assert!(code.contains("  %t0 = const i32 0\n"));
        assert!(code.contains("  ret i32 %t0\n"));
    }

    #[test]
    fn test_parameter_prologue() {
        let code = emit("func id(x: int) : int { return x; } func main() : int { return id(1); }");
        assert!(code.contains("define i32 @id(i32 %x.param) {"));
        assert!(code.contains("  %x = alloca i32\n"));
        assert!(code.contains("  store i32 %x.param, %x\n"));
        assert!(code.contains("= load %x\n"));
    }

    #[test]
    fn test_result_temp_issued_before_operands() {
        // 1 + 2: the addition owns %t0, the operands %t1 and %t2.
        let code = emit("func main() : int { return 1 + 2; }");
        assert!(code.contains("%t1 = const i32 1"));
        assert!(code.contains("%t2 = const i32 2"));
        assert!(code.contains("%t0 = add i32 %t1, %t2"));
    }

    #[test]
    fn test_counters_reset_per_function() {
        let code = emit(
            "func a() : int { return 1 + 2; } \
             func main() : int { return a(); }",
        );
        // Both functions start numbering at %t0.
        let occurrences = code.matches("%t0 = ").count();
        assert_eq!(occurrences, 2);
    }

    #[test]
    fn test_while_lowering() {
        let code = emit(
            "func main() : int { var n = 3; while (n > 0) { n = n - 1; } return n; }",
        );
        assert!(code.contains("br label %L0\n"));
        assert!(code.contains("\nL0:\n"));
        assert!(code.contains("br i1 %t"));
        assert!(code.contains(", label %L1, label %L2\n"));
        assert!(code.contains("\nL1:\n"));
        // The body jumps back to the condition block.
        assert!(code.contains("  br label %L0\n"));
        assert!(code.contains("\nL2:\n"));
    }

    #[test]
    fn test_if_without_else_branches_to_end() {
        let code = emit("func main() : int { if (true) { print(1); } return 0; }");
        // Labels L0 (then), L1 (unused else), L2 (end)
        assert!(code.contains(", label %L0, label %L2\n"));
        assert!(code.contains("\nL0:\n"));
        assert!(!code.contains("\nL1:\n"));
        assert!(code.contains("\nL2:\n"));
    }

    #[test]
    fn test_if_else_lowering() {
        let code = emit(
            "func main() : int { if (true) { return 1; } else { return 2; } }",
        );
        assert!(code.contains(", label %L0, label %L1\n"));
        assert!(code.contains("\nL0:\n"));
        assert!(code.contains("\nL1:\n"));
        assert!(code.contains("\nL2:\n"));
        assert!(code.contains("br label %L2\n"));
    }

    #[test]
    fn test_comparisons_and_logic() {
        let code = emit(
            "func main() : int { var a = 1 < 2; var b = 1 == 1; var c = a && b; var d = !c; return 0; }",
        );
        assert!(code.contains("icmp lt i32"));
        assert!(code.contains("icmp eq i32"));
        assert!(code.contains("and i1"));
        assert!(code.contains("xor i1"));
        assert!(code.contains(", 1\n"));
    }

    #[test]
    fn test_print_call_has_no_result() {
        let code = emit("func main() : int { print(42); return 0; }");
        assert!(code.contains("call void @print(i32 %t"));
        assert!(!code.contains("= call void @print"));
    }

    #[test]
    fn test_call_arguments_left_to_right() {
        let code = emit(
            "func add(a: int, b: int) : int { return a + b; } \
             func main() : int { return add(1, 2); }",
        );
        assert!(code.contains("%t0 = call i32 @add(i32 %t1, i32 %t2)"));
        let one = code.find("%t1 = const i32 1").unwrap();
        let two = code.find("%t2 = const i32 2").unwrap();
        assert!(one < two);
    }

    #[test]
    fn test_bool_function_signature() {
        let code = emit(
            "func flag() : bool { return true; } func main() : int { return 0; }",
        );
        assert!(code.contains("define i1 @flag() {"));
        assert!(code.contains("%t0 = const i1 1"));
    }

    #[test]
    fn test_comment_header_opt_in() {
        let program = typed_program("func main() : int { return 0; }");
        let commented = generate(&program, &CompilerConfig::new().with_comments(true));
        assert!(commented.starts_with("; Generated by the CoreTiny compiler\n"));
    }
}
