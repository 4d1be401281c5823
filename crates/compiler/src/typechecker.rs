//! Type checker for CoreTiny
//!
//! Two passes over the program so mutually recursive functions work:
//! first every function signature is registered in the global scope,
//! then each body is checked with its parameters in a fresh child scope.
//! Checking annotates every expression's `ty` field in place; checking a
//! typed tree again is a no-op on the types.
//!
//! Type rules:
//! - `+ - * / %`: int × int → int
//! - `< <= > >=`: int × int → bool
//! - `== !=`: T × T → bool (both sides the same type)
//! - `&& ||`: bool × bool → bool
//! - `!`: bool → bool
//! - variables must be declared before use; calls must match the
//!   callee's arity and parameter types
//!
//! Errors are single-message-wins: the first failing rule produces the
//! message and unwinds.

use std::collections::HashMap;

use crate::ast::{Expr, ExprKind, Function, Program, Stmt, Type, UnaryOp};

#[derive(Debug, Clone)]
enum SymbolKind {
    Variable,
    Function { params: Vec<Type> },
}

#[derive(Debug, Clone)]
struct Symbol {
    ty: Type,
    kind: SymbolKind,
}

impl Symbol {
    fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }
}

/// Lexical scopes as a vector of maps with explicit push/pop; lookup
/// walks from the innermost scope outward.
struct SymbolTable {
    scopes: Vec<HashMap<String, Symbol>>,
}

impl SymbolTable {
    fn new() -> Self {
        SymbolTable {
            scopes: vec![HashMap::new()],
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Install a symbol in the innermost scope. `false` if the name is
    /// already taken there; shadowing an outer scope is fine.
    fn add(&mut self, name: &str, symbol: Symbol) -> bool {
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        if scope.contains_key(name) {
            return false;
        }
        scope.insert(name.to_string(), symbol);
        true
    }
}

struct TypeChecker {
    symbols: SymbolTable,
    current_return_type: Type,
}

impl TypeChecker {
    fn new() -> Self {
        TypeChecker {
            symbols: SymbolTable::new(),
            current_return_type: Type::Void,
        }
    }

    fn check_expression(&mut self, expr: &mut Expr) -> Result<(), String> {
        match &mut expr.kind {
            ExprKind::IntLiteral(_) => {
                expr.ty = Type::Int;
                Ok(())
            }
            ExprKind::BoolLiteral(_) => {
                expr.ty = Type::Bool;
                Ok(())
            }
            ExprKind::Var(name) => {
                let symbol = self
                    .symbols
                    .lookup(name)
                    .ok_or_else(|| format!("Undefined variable '{name}'"))?;
                if symbol.is_function() {
                    return Err(format!("'{name}' is a function, not a variable"));
                }
                expr.ty = symbol.ty;
                Ok(())
            }
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                self.check_expression(left)?;
                self.check_expression(right)?;

                if op.is_arithmetic() {
                    if left.ty != Type::Int {
                        return Err(format!("Arithmetic operator requires int, got {}", left.ty));
                    }
                    if right.ty != Type::Int {
                        return Err(format!("Arithmetic operator requires int, got {}", right.ty));
                    }
                    expr.ty = Type::Int;
                } else if op.is_comparison() {
                    if left.ty != Type::Int {
                        return Err(format!("Comparison requires int, got {}", left.ty));
                    }
                    if right.ty != Type::Int {
                        return Err(format!("Comparison requires int, got {}", right.ty));
                    }
                    expr.ty = Type::Bool;
                } else if op.is_equality() {
                    if left.ty != right.ty {
                        return Err(format!(
                            "Equality comparison requires same types, got {} and {}",
                            left.ty, right.ty
                        ));
                    }
                    expr.ty = Type::Bool;
                } else {
                    if left.ty != Type::Bool {
                        return Err(format!("Logical operator requires bool, got {}", left.ty));
                    }
                    if right.ty != Type::Bool {
                        return Err(format!("Logical operator requires bool, got {}", right.ty));
                    }
                    expr.ty = Type::Bool;
                }
                Ok(())
            }
            ExprKind::Unary { op, operand } => {
                let UnaryOp::Not = *op;
                self.check_expression(operand)?;
                if operand.ty != Type::Bool {
                    return Err(format!("Logical NOT requires bool, got {}", operand.ty));
                }
                expr.ty = Type::Bool;
                Ok(())
            }
            ExprKind::Call { name, args } => {
                let symbol = self
                    .symbols
                    .lookup(name)
                    .ok_or_else(|| format!("Undefined function '{name}'"))?;
                let SymbolKind::Function { params } = &symbol.kind else {
                    return Err(format!("'{name}' is not a function"));
                };
                let return_type = symbol.ty;
                let params = params.clone();
                let name = name.clone();

                if args.len() != params.len() {
                    return Err(format!(
                        "Function '{}' expects {} arguments, got {}",
                        name,
                        params.len(),
                        args.len()
                    ));
                }

                for (i, (arg, param_ty)) in args.iter_mut().zip(params.iter()).enumerate() {
                    self.check_expression(arg)?;
                    if arg.ty != *param_ty {
                        return Err(format!(
                            "Function '{}' parameter {} expects {}, got {}",
                            name,
                            i + 1,
                            param_ty,
                            arg.ty
                        ));
                    }
                }

                expr.ty = return_type;
                Ok(())
            }
        }
    }

    fn check_statement(&mut self, stmt: &mut Stmt) -> Result<(), String> {
        match stmt {
            Stmt::VarDecl { name, ty, init } => {
                self.check_expression(init)?;
                // Adopt the initializer's type as the declared type.
                *ty = init.ty;
                if !self.symbols.add(
                    name,
                    Symbol {
                        ty: *ty,
                        kind: SymbolKind::Variable,
                    },
                ) {
                    return Err(format!("Variable '{name}' already declared"));
                }
                Ok(())
            }
            Stmt::Assign { name, expr } => {
                let symbol = self
                    .symbols
                    .lookup(name)
                    .ok_or_else(|| format!("Undefined variable '{name}'"))?;
                if symbol.is_function() {
                    return Err(format!("Cannot assign to function '{name}'"));
                }
                let bound_ty = symbol.ty;

                self.check_expression(expr)?;
                if expr.ty != bound_ty {
                    return Err(format!(
                        "Cannot assign {} to variable of type {}",
                        expr.ty, bound_ty
                    ));
                }
                Ok(())
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                self.check_expression(condition)?;
                if condition.ty != Type::Bool {
                    return Err(format!("If condition must be bool, got {}", condition.ty));
                }
                self.check_statement(then_block)?;
                if let Some(else_block) = else_block {
                    self.check_statement(else_block)?;
                }
                Ok(())
            }
            Stmt::While { condition, body } => {
                self.check_expression(condition)?;
                if condition.ty != Type::Bool {
                    return Err(format!("While condition must be bool, got {}", condition.ty));
                }
                self.check_statement(body)
            }
            Stmt::Return(expr) => match expr {
                Some(expr) => {
                    self.check_expression(expr)?;
                    if expr.ty != self.current_return_type {
                        return Err(format!(
                            "Return type mismatch: expected {}, got {}",
                            self.current_return_type, expr.ty
                        ));
                    }
                    Ok(())
                }
                None => {
                    if self.current_return_type != Type::Void {
                        return Err(format!(
                            "Function must return {}",
                            self.current_return_type
                        ));
                    }
                    Ok(())
                }
            },
            Stmt::Expr(expr) => self.check_expression(expr),
            Stmt::Block(statements) => {
                self.symbols.push_scope();
                let result = statements
                    .iter_mut()
                    .try_for_each(|stmt| self.check_statement(stmt));
                self.symbols.pop_scope();
                result
            }
        }
    }

    fn register_signature(&mut self, func: &Function) -> Result<(), String> {
        let params = func.params.iter().map(|p| p.ty).collect();
        if !self.symbols.add(
            &func.name,
            Symbol {
                ty: func.return_type,
                kind: SymbolKind::Function { params },
            },
        ) {
            return Err(format!("Duplicate function '{}'", func.name));
        }
        Ok(())
    }

    fn check_function_body(&mut self, func: &mut Function) -> Result<(), String> {
        self.symbols.push_scope();
        for param in &func.params {
            if !self.symbols.add(
                &param.name,
                Symbol {
                    ty: param.ty,
                    kind: SymbolKind::Variable,
                },
            ) {
                self.symbols.pop_scope();
                return Err(format!("Duplicate parameter '{}'", param.name));
            }
        }

        self.current_return_type = func.return_type;
        let result = self.check_statement(&mut func.body);
        self.symbols.pop_scope();
        result
    }
}

/// Check `program`, annotating every expression's type in place.
pub fn check_program(program: &mut Program) -> Result<(), String> {
    let mut checker = TypeChecker::new();

    // Built-in print(int) -> void
    checker.symbols.add(
        "print",
        Symbol {
            ty: Type::Void,
            kind: SymbolKind::Function {
                params: vec![Type::Int],
            },
        },
    );

    // First pass: register all signatures so mutual recursion works.
    for func in &program.functions {
        checker.register_signature(func)?;
    }

    // Second pass: check each body.
    for func in &mut program.functions {
        checker.check_function_body(func)?;
    }

    Ok(())
}
