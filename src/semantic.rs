//! Scope and type analysis.
//!
//! The analyzer walks the whole program and collects every diagnostic it
//! finds; it never halts early, and the driver still lowers and executes a
//! program that produced diagnostics. Types are the plain names carried by
//! the AST (`int`, `float`, `string`, `bool`, `void`, or a user identifier).

use std::collections::HashMap;

use crate::ast::{BinOp, Expr, FunctionDecl, LitKind, Program, Stmt};

#[derive(Debug, Clone)]
pub struct SemanticError {
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Analysis {
    pub errors: Vec<SemanticError>,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

pub fn analyze(program: &Program) -> Analysis {
    let mut analyzer = Analyzer::new();
    analyzer.program(program);
    Analysis {
        errors: analyzer.errors,
    }
}

#[derive(Debug, Clone)]
struct Symbol {
    ty: String,
    is_function: bool,
}

/// Builtins callable without a declaration; all store an int status.
const BUILTIN_FNS: &[&str] = &[
    "screen",
    "clearScreen",
    "drawPixel",
    "drawRect",
    "drawLine",
    "drawCircle",
    "display",
    "quit",
    "isKeyDown",
    "updateInput",
];

struct Analyzer {
    /// Scope stack, innermost last; index 0 is the global root.
    scopes: Vec<HashMap<String, Symbol>>,
    errors: Vec<SemanticError>,
    current_ret: String,
}

impl Analyzer {
    fn new() -> Self {
        let mut global = HashMap::new();
        for name in BUILTIN_FNS {
            global.insert(
                name.to_string(),
                Symbol {
                    ty: "int".to_string(),
                    is_function: true,
                },
            );
        }
        Analyzer {
            scopes: vec![global],
            errors: Vec::new(),
            current_ret: "void".to_string(),
        }
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(SemanticError {
            message: msg.into(),
        });
    }

    fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn declare(&mut self, name: &str, symbol: Symbol) {
        let already = self
            .scopes
            .last()
            .map(|scope| scope.contains_key(name))
            .unwrap_or(false);
        if already {
            self.error(format!(
                "Symbol '{}' already declared in current scope",
                name
            ));
        } else if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), symbol);
        }
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    // -------------------------------------------------------------------------
    // Program and statements
    // -------------------------------------------------------------------------

    fn program(&mut self, program: &Program) {
        // First pass: register every function so forward references resolve
        for func in &program.functions {
            self.declare(
                &func.name,
                Symbol {
                    ty: func.return_type.clone(),
                    is_function: true,
                },
            );
        }
        for func in &program.functions {
            self.function(func);
        }
    }

    fn function(&mut self, func: &FunctionDecl) {
        self.current_ret = func.return_type.clone();
        self.enter_scope();
        for (ty, name) in &func.params {
            self.declare(
                name,
                Symbol {
                    ty: ty.clone(),
                    is_function: false,
                },
            );
        }
        self.stmt(&func.body);
        self.exit_scope();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => {
                self.enter_scope();
                for s in stmts {
                    self.stmt(s);
                }
                self.exit_scope();
            }
            Stmt::Return(expr) => {
                if let Some(e) = expr {
                    let ty = self.expr(e);
                    if !is_compatible(&ty, &self.current_ret) {
                        self.error(format!(
                            "Return type mismatch: expected {}, got {}",
                            self.current_ret, ty
                        ));
                    }
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(cond);
                self.stmt(then_branch);
                if let Some(e) = else_branch {
                    self.stmt(e);
                }
            }
            Stmt::While { cond, body } => {
                self.expr(cond);
                self.stmt(body);
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                // One scope spans init, condition, step, and body
                self.enter_scope();
                if let Some(i) = init {
                    self.stmt(i);
                }
                if let Some(c) = cond {
                    self.expr(c);
                }
                if let Some(s) = step {
                    self.expr(s);
                }
                self.stmt(body);
                self.exit_scope();
            }
            Stmt::VarDecl { name, ty, init } => {
                if let Some(e) = init {
                    let init_ty = self.expr(e);
                    if !is_compatible(&init_ty, ty) {
                        self.error(format!(
                            "Variable initialization type mismatch: expected {}, got {}",
                            ty, init_ty
                        ));
                    }
                }
                self.declare(
                    name,
                    Symbol {
                        ty: ty.clone(),
                        is_function: false,
                    },
                );
            }
            Stmt::Print(expr) | Stmt::Expr(expr) => {
                self.expr(expr);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(kind, _) => match kind {
                LitKind::Int => "int".to_string(),
                LitKind::Float => "float".to_string(),
                LitKind::Str => "string".to_string(),
                LitKind::Bool => "bool".to_string(),
            },
            Expr::Ident(name) => match self.lookup(name) {
                Some(symbol) => symbol.ty.clone(),
                None => {
                    self.error(format!("Undefined identifier: {}", name));
                    "void".to_string()
                }
            },
            Expr::Binary(op, left, right) => {
                let lt = self.expr(left);
                let rt = self.expr(right);
                match op {
                    BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                        common_type(&lt, &rt)
                    }
                    // Comparison and logical results are int 0/1
                    BinOp::Eq
                    | BinOp::Ne
                    | BinOp::Lt
                    | BinOp::Gt
                    | BinOp::Le
                    | BinOp::Ge
                    | BinOp::And
                    | BinOp::Or => "int".to_string(),
                    BinOp::Comma => rt,
                }
            }
            Expr::Unary(_, operand) => self.expr(operand),
            Expr::Assign(name, value) => {
                let target_ty = match self.lookup(name) {
                    Some(symbol) => symbol.ty.clone(),
                    None => {
                        self.error(format!("Undefined variable: {}", name));
                        return "void".to_string();
                    }
                };
                let value_ty = self.expr(value);
                if !is_compatible(&value_ty, &target_ty) {
                    self.error(format!(
                        "Assignment type mismatch: '{}' expects {}, got {}",
                        name, target_ty, value_ty
                    ));
                }
                target_ty
            }
            Expr::Call(name, args) => {
                let ret = match self.lookup(name) {
                    Some(symbol) if symbol.is_function => Some(symbol.ty.clone()),
                    Some(_) => {
                        self.error(format!("'{}' is not a function", name));
                        None
                    }
                    None => {
                        self.error(format!("Undefined function: {}", name));
                        None
                    }
                };
                // Arity and argument types are not checked
                for arg in args {
                    self.expr(arg);
                }
                ret.unwrap_or_else(|| "void".to_string())
            }
            Expr::Index(base, index) => {
                let base_ty = self.expr(base);
                self.expr(index);
                base_ty
            }
            Expr::Input(_) | Expr::KeyPressed(_) => "string".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Type relations
// ---------------------------------------------------------------------------

fn is_compatible(from: &str, to: &str) -> bool {
    if from == to {
        return true;
    }
    let pair = |a: &str, b: &str| (from == a || from == b) && (to == a || to == b);
    pair("int", "float") || pair("int", "string") || pair("int", "bool")
}

fn common_type(left: &str, right: &str) -> String {
    if left == right {
        return left.to_string();
    }
    if left == "float" || right == "float" {
        return "float".to_string();
    }
    left.to_string()
}
