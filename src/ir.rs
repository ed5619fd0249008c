//! The flat labeled intermediate representation.
//!
//! A program is a list of functions; a function is a list of three-address
//! instructions in issue order. Jump targets are symbolic labels resolved by
//! the interpreter in a single pre-pass.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Concat,
    // Logical
    And,
    Or,
    Not,
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    // Control flow
    Jmp,
    Jz,
    Jnz,
    Call,
    Ret,
    Label,
    Nop,
    // Memory
    Load,
    Store,
    LoadGlobal,
    StoreGlobal,
    // Literals
    LoadInt,
    LoadFloat,
    LoadString,
    // I/O and builtins
    Print,
    Input,
    KeyPressed,
    Screen,
    DrawPixel,
    DrawRect,
    DrawLine,
    DrawCircle,
    ClearScreen,
    Present,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Neg => "NEG",
            Opcode::Concat => "CONCAT",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Eq => "EQ",
            Opcode::Ne => "NE",
            Opcode::Lt => "LT",
            Opcode::Gt => "GT",
            Opcode::Le => "LE",
            Opcode::Ge => "GE",
            Opcode::Jmp => "JMP",
            Opcode::Jz => "JZ",
            Opcode::Jnz => "JNZ",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Label => "LABEL",
            Opcode::Nop => "NOP",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::LoadGlobal => "LOAD_GLOBAL",
            Opcode::StoreGlobal => "STORE_GLOBAL",
            Opcode::LoadInt => "LOAD_INT",
            Opcode::LoadFloat => "LOAD_FLOAT",
            Opcode::LoadString => "LOAD_STRING",
            Opcode::Print => "PRINT",
            Opcode::Input => "INPUT",
            Opcode::KeyPressed => "KEY_PRESSED",
            Opcode::Screen => "SCREEN",
            Opcode::DrawPixel => "DRAW_PIXEL",
            Opcode::DrawRect => "DRAW_RECT",
            Opcode::DrawLine => "DRAW_LINE",
            Opcode::DrawCircle => "DRAW_CIRCLE",
            Opcode::ClearScreen => "CLEAR_SCREEN",
            Opcode::Present => "PRESENT",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// An operand or result slot. The `Display` rendering doubles as the
/// interpreter's storage key, so every variant prints a distinct prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrValue {
    Temp(u32),
    Local(String),
    Global(String),
    Constant(String),
    Label(String),
}

impl fmt::Display for IrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrValue::Temp(id) => write!(f, "t{}", id),
            IrValue::Local(name) => write!(f, "l_{}", name),
            IrValue::Global(name) => write!(f, "g_{}", name),
            IrValue::Constant(text) => f.write_str(text),
            IrValue::Label(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<IrValue>,
    pub result: Option<IrValue>,
    /// Jump target, `LABEL` name, or `CALL` callee.
    pub label: Option<String>,
    /// Prompt text carried by `INPUT`.
    pub prompt: Option<String>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            operands: Vec::new(),
            result: None,
            label: None,
            prompt: None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opcode == Opcode::Label {
            return write!(f, "LABEL {}:", self.label.as_deref().unwrap_or(""));
        }

        write!(f, "{}", self.opcode)?;
        let mut first = true;
        // CALL renders its callee ahead of the operands; jumps their target last
        if self.opcode == Opcode::Call {
            if let Some(callee) = &self.label {
                write!(f, " {}", callee)?;
                first = false;
            }
        }
        for op in &self.operands {
            if first {
                write!(f, " {}", op)?;
                first = false;
            } else {
                write!(f, ", {}", op)?;
            }
        }
        if matches!(self.opcode, Opcode::Jmp | Opcode::Jz | Opcode::Jnz) {
            if let Some(target) = &self.label {
                if first {
                    write!(f, " {}", target)?;
                } else {
                    write!(f, ", {}", target)?;
                }
            }
        }
        if let Some(result) = &self.result {
            write!(f, " -> {}", result)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub name: String,
    pub return_type: String,
    pub params: Vec<(String, String)>,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IrProgram {
    pub functions: Vec<IrFunction>,
}

impl fmt::Display for IrProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for func in &self.functions {
            let params: Vec<String> = func
                .params
                .iter()
                .map(|(ty, name)| format!("{} {}", ty, name))
                .collect();
            writeln!(
                f,
                "function {}({}) -> {}",
                func.name,
                params.join(", "),
                func.return_type
            )?;
            for (i, instr) in func.instructions.iter().enumerate() {
                writeln!(f, "  {:4}: {}", i, instr)?;
            }
        }
        Ok(())
    }
}
