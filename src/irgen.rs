//! AST → IR lowering. Pure: no validation, no diagnostics.
//!
//! Temporaries are numbered per function from zero; labels per program with
//! prefix `L`. Statements emit instructions; expressions emit the
//! instructions producing their value and return the `IrValue` holding it.

use std::collections::HashMap;

use crate::ast::{BinOp, Expr, FunctionDecl, LitKind, Program, Stmt, UnOp};
use crate::ir::{Instruction, IrFunction, IrProgram, IrValue, Opcode};

pub fn generate(program: &Program) -> IrProgram {
    let mut gen = IrGenerator::new();
    let mut out = IrProgram::default();
    for func in &program.functions {
        out.functions.push(gen.lower_function(func));
    }
    out
}

struct IrGenerator {
    temp_counter: u32,
    label_counter: u32,
    symbols: HashMap<String, IrValue>,
    code: Vec<Instruction>,
}

impl IrGenerator {
    fn new() -> Self {
        IrGenerator {
            temp_counter: 0,
            label_counter: 0,
            symbols: HashMap::new(),
            code: Vec::new(),
        }
    }

    fn lower_function(&mut self, func: &FunctionDecl) -> IrFunction {
        self.temp_counter = 0;
        self.symbols.clear();
        for (_ty, name) in &func.params {
            self.symbols
                .insert(name.clone(), IrValue::Local(name.clone()));
        }

        self.stmt(&func.body);

        IrFunction {
            name: func.name.clone(),
            return_type: func.return_type.clone(),
            params: func.params.clone(),
            instructions: std::mem::take(&mut self.code),
        }
    }

    // -------------------------------------------------------------------------
    // Emission helpers
    // -------------------------------------------------------------------------

    fn emit(&mut self, instr: Instruction) {
        self.code.push(instr);
    }

    fn emit_op(&mut self, opcode: Opcode, operands: Vec<IrValue>, result: Option<IrValue>) {
        self.emit(Instruction {
            opcode,
            operands,
            result,
            label: None,
            prompt: None,
        });
    }

    fn emit_label(&mut self, name: String) {
        let mut instr = Instruction::new(Opcode::Label);
        instr.label = Some(name);
        self.emit(instr);
    }

    fn emit_jump(&mut self, opcode: Opcode, cond: Option<IrValue>, target: String) {
        let mut instr = Instruction::new(opcode);
        if let Some(c) = cond {
            instr.operands.push(c);
        }
        instr.label = Some(target);
        self.emit(instr);
    }

    fn new_temp(&mut self) -> IrValue {
        let temp = IrValue::Temp(self.temp_counter);
        self.temp_counter += 1;
        temp
    }

    fn new_label(&mut self) -> String {
        let label = format!("L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    /// Looks up a name in the function's symbol table; unknown names default
    /// to fresh locals.
    fn variable(&mut self, name: &str) -> IrValue {
        self.symbols
            .entry(name.to_string())
            .or_insert_with(|| IrValue::Local(name.to_string()))
            .clone()
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.stmt(s);
                }
            }
            Stmt::Return(Some(expr)) => {
                let value = self.expr(expr);
                self.emit_op(Opcode::Ret, vec![value], None);
            }
            Stmt::Return(None) => {
                self.emit_op(Opcode::Ret, Vec::new(), None);
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let c = self.expr(cond);
                let then_label = self.new_label();
                let else_label = self.new_label();
                let end_label = self.new_label();

                self.emit_jump(Opcode::Jz, Some(c), else_label.clone());
                self.emit_label(then_label);
                self.stmt(then_branch);
                self.emit_jump(Opcode::Jmp, None, end_label.clone());
                self.emit_label(else_label);
                if let Some(e) = else_branch {
                    self.stmt(e);
                }
                self.emit_label(end_label);
            }
            Stmt::While { cond, body } => {
                let loop_label = self.new_label();
                let end_label = self.new_label();

                self.emit_label(loop_label.clone());
                let c = self.expr(cond);
                self.emit_jump(Opcode::Jz, Some(c), end_label.clone());
                self.stmt(body);
                self.emit_jump(Opcode::Jmp, None, loop_label);
                self.emit_label(end_label);
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(i) = init {
                    self.stmt(i);
                }
                let loop_label = self.new_label();
                let end_label = self.new_label();

                self.emit_label(loop_label.clone());
                if let Some(c) = cond {
                    let value = self.expr(c);
                    self.emit_jump(Opcode::Jz, Some(value), end_label.clone());
                }
                self.stmt(body);
                if let Some(s) = step {
                    // Side effects only; the value is discarded
                    self.expr(s);
                }
                self.emit_jump(Opcode::Jmp, None, loop_label);
                self.emit_label(end_label);
            }
            Stmt::VarDecl { name, init, .. } => {
                let var = IrValue::Local(name.clone());
                self.symbols.insert(name.clone(), var.clone());
                if let Some(expr) = init {
                    let value = self.expr(expr);
                    self.emit_op(Opcode::Store, vec![value], Some(var));
                }
            }
            Stmt::Print(expr) => {
                let value = self.expr(expr);
                self.emit_op(Opcode::Print, vec![value], None);
            }
            Stmt::Expr(expr) => {
                self.expr(expr);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn expr(&mut self, expr: &Expr) -> IrValue {
        match expr {
            Expr::Literal(kind, text) => {
                let opcode = match kind {
                    // true/false already carry "1"/"0"
                    LitKind::Int | LitKind::Bool => Opcode::LoadInt,
                    LitKind::Float => Opcode::LoadFloat,
                    LitKind::Str => Opcode::LoadString,
                };
                let result = self.new_temp();
                self.emit_op(
                    opcode,
                    vec![IrValue::Constant(text.clone())],
                    Some(result.clone()),
                );
                result
            }
            Expr::Ident(name) => self.variable(name),
            Expr::Binary(op, left, right) => {
                let l = self.expr(left);
                let r = self.expr(right);
                let result = self.new_temp();
                // `||` and `,` both concatenate; the front end reuses `||`
                // for value concatenation
                let opcode = match op {
                    BinOp::Or | BinOp::Comma => Opcode::Concat,
                    other => bin_opcode(*other),
                };
                self.emit_op(opcode, vec![l, r], Some(result.clone()));
                result
            }
            Expr::Unary(op, operand) => {
                let value = self.expr(operand);
                let result = self.new_temp();
                let opcode = match op {
                    UnOp::Neg => Opcode::Neg,
                    UnOp::Not => Opcode::Not,
                };
                self.emit_op(opcode, vec![value], Some(result.clone()));
                result
            }
            Expr::Assign(name, value) => {
                let v = self.expr(value);
                let var = self.variable(name);
                self.emit_op(Opcode::Store, vec![v], Some(var.clone()));
                var
            }
            Expr::Index(base, index) => {
                let b = self.expr(base);
                let i = self.expr(index);
                let result = self.new_temp();
                self.emit_op(Opcode::Load, vec![b, i], Some(result.clone()));
                result
            }
            Expr::Input(prompt) => {
                let result = self.new_temp();
                let mut instr = Instruction::new(Opcode::Input);
                // Only a string-literal prompt is carried; anything else is dropped
                if let Some(p) = prompt {
                    if let Expr::Literal(LitKind::Str, text) = p.as_ref() {
                        instr.prompt = Some(text.clone());
                    }
                }
                instr.result = Some(result.clone());
                self.emit(instr);
                result
            }
            Expr::KeyPressed(_) => {
                let result = self.new_temp();
                let mut instr = Instruction::new(Opcode::KeyPressed);
                instr.result = Some(result.clone());
                self.emit(instr);
                result
            }
            Expr::Call(name, args) => self.call(name, args),
        }
    }

    fn call(&mut self, name: &str, args: &[Expr]) -> IrValue {
        let result = self.new_temp();

        let graphics_op = match name {
            "screen" => Some(Opcode::Screen),
            "clearScreen" => Some(Opcode::ClearScreen),
            "drawPixel" => Some(Opcode::DrawPixel),
            "drawRect" => Some(Opcode::DrawRect),
            "drawLine" => Some(Opcode::DrawLine),
            "drawCircle" => Some(Opcode::DrawCircle),
            _ => None,
        };
        if let Some(opcode) = graphics_op {
            let mut instr = Instruction::new(opcode);
            for arg in args {
                let value = self.expr(arg);
                instr.operands.push(value);
            }
            instr.result = Some(result.clone());
            self.emit(instr);
            return result;
        }

        match name {
            "display" => {
                let mut instr = Instruction::new(Opcode::Present);
                instr.result = Some(result.clone());
                self.emit(instr);
            }
            "quit" | "updateInput" => {
                let mut instr = Instruction::new(Opcode::Call);
                instr.label = Some(name.to_string());
                instr.result = Some(result.clone());
                self.emit(instr);
            }
            "isKeyDown" => {
                let mut instr = Instruction::new(Opcode::Call);
                instr.label = Some(name.to_string());
                if let Some(key) = args.first() {
                    let value = self.expr(key);
                    instr.operands.push(value);
                }
                instr.result = Some(result.clone());
                self.emit(instr);
            }
            _ => {
                let mut instr = Instruction::new(Opcode::Call);
                instr.label = Some(name.to_string());
                for arg in args {
                    let value = self.expr(arg);
                    instr.operands.push(value);
                }
                instr.result = Some(result.clone());
                self.emit(instr);
            }
        }
        result
    }
}

fn bin_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Mod => Opcode::Mod,
        BinOp::Eq => Opcode::Eq,
        BinOp::Ne => Opcode::Ne,
        BinOp::Lt => Opcode::Lt,
        BinOp::Gt => Opcode::Gt,
        BinOp::Le => Opcode::Le,
        BinOp::Ge => Opcode::Ge,
        BinOp::And => Opcode::And,
        BinOp::Or => Opcode::Or,
        BinOp::Comma => Opcode::Concat,
    }
}
