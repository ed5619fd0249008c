//! The IR interpreter.
//!
//! Executes the function named `main` over a flat slot map keyed by the
//! printed form of each `IrValue` (temps, locals, and globals coexist under
//! distinct prefixes). The interpreter owns every effect it performs: the
//! output writer, the line reader, the single-key source, and the optional
//! graphics surface, so all of them can be replaced in tests.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::ir::{Instruction, IrFunction, IrProgram, IrValue, Opcode};
use crate::services::graphics::{Key, SoftwareSurface, Surface};
use crate::services::term::{KeySource, TerminalKeys};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{0}")]
    Error(String),
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        RuntimeError::Error(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f64),
    Str(String),
    Bool(bool),
}

/// A read of a never-written slot yields this.
impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
        }
    }
}

/// Builds a surface from `(width, height, title)` at the first `SCREEN`.
pub type SurfaceFactory = Box<dyn FnMut(i32, i32, &str) -> Result<Box<dyn Surface>, String>>;

pub struct Interpreter {
    slots: HashMap<String, Value>,
    graphics: Option<Box<dyn Surface>>,
    open_surface: SurfaceFactory,
    keys: Box<dyn KeySource>,
    out: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_io(Box::new(io::stdout()), Box::new(io::stdin().lock()))
    }

    pub fn with_io(out: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        Interpreter {
            slots: HashMap::new(),
            graphics: None,
            open_surface: Box::new(|w, h, title| {
                Ok(Box::new(SoftwareSurface::new(w, h, title)) as Box<dyn Surface>)
            }),
            keys: Box::new(TerminalKeys),
            out,
            input,
        }
    }

    pub fn set_surface_factory(&mut self, factory: SurfaceFactory) {
        self.open_surface = factory;
    }

    pub fn set_key_source(&mut self, keys: Box<dyn KeySource>) {
        self.keys = keys;
    }

    /// Executes `main` and returns the process exit code. A program without
    /// `main` executes nothing.
    pub fn run(&mut self, program: &IrProgram) -> Result<i32, RuntimeError> {
        match program.functions.iter().find(|f| f.name == "main") {
            Some(main) => self.exec(main),
            None => Ok(0),
        }
    }

    fn exec(&mut self, func: &IrFunction) -> Result<i32, RuntimeError> {
        // One pre-pass resolves every label to its instruction index
        let mut labels: HashMap<&str, usize> = HashMap::new();
        for (i, instr) in func.instructions.iter().enumerate() {
            if instr.opcode == Opcode::Label {
                if let Some(name) = &instr.label {
                    labels.insert(name.as_str(), i);
                }
            }
        }

        let mut ip = 0usize;
        while ip < func.instructions.len() {
            let instr = &func.instructions[ip];
            match instr.opcode {
                Opcode::LoadInt => {
                    let text = constant_text(instr)?;
                    let v: i32 = text.parse().map_err(|_| {
                        RuntimeError::Error(format!("Invalid integer literal '{}'", text))
                    })?;
                    self.store_result(instr, Value::Int(v));
                }
                Opcode::LoadFloat => {
                    let text = constant_text(instr)?;
                    let v: f64 = text.parse().map_err(|_| {
                        RuntimeError::Error(format!("Invalid float literal '{}'", text))
                    })?;
                    self.store_result(instr, Value::Float(v));
                }
                Opcode::LoadString => {
                    let text = constant_text(instr)?;
                    self.store_result(instr, Value::Str(text.to_string()));
                }

                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                    let a = to_int(&self.operand(instr, 0)?)?;
                    let b = to_int(&self.operand(instr, 1)?)?;
                    let result = match instr.opcode {
                        Opcode::Add => a.wrapping_add(b),
                        Opcode::Sub => a.wrapping_sub(b),
                        Opcode::Mul => a.wrapping_mul(b),
                        Opcode::Div | Opcode::Mod => {
                            if b == 0 {
                                return Err(RuntimeError::Error("Division by zero".to_string()));
                            }
                            if instr.opcode == Opcode::Div {
                                a.wrapping_div(b)
                            } else {
                                a.wrapping_rem(b)
                            }
                        }
                        _ => unreachable!(),
                    };
                    self.store_result(instr, Value::Int(result));
                }
                Opcode::Neg => {
                    let v = to_int(&self.operand(instr, 0)?)?;
                    self.store_result(instr, Value::Int(v.wrapping_neg()));
                }
                Opcode::Not => {
                    let v = to_int(&self.operand(instr, 0)?)?;
                    self.store_result(instr, Value::Int((v == 0) as i32));
                }
                Opcode::And => {
                    let a = to_int(&self.operand(instr, 0)?)?;
                    let b = to_int(&self.operand(instr, 1)?)?;
                    self.store_result(instr, Value::Int((a != 0 && b != 0) as i32));
                }
                Opcode::Or => {
                    let a = to_int(&self.operand(instr, 0)?)?;
                    let b = to_int(&self.operand(instr, 1)?)?;
                    self.store_result(instr, Value::Int((a != 0 || b != 0) as i32));
                }
                Opcode::Concat => {
                    let a = self.operand(instr, 0)?;
                    let b = self.operand(instr, 1)?;
                    self.store_result(instr, Value::Str(format!("{}{}", a, b)));
                }

                Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Gt | Opcode::Le | Opcode::Ge => {
                    let a = self.operand(instr, 0)?;
                    let b = self.operand(instr, 1)?;
                    let result = compare(instr.opcode, &a, &b)?;
                    self.store_result(instr, Value::Int(result));
                }

                Opcode::Jmp => {
                    ip = target(&labels, instr)?;
                    continue;
                }
                Opcode::Jz => {
                    let cond = self.operand(instr, 0)?;
                    let Value::Int(c) = cond else {
                        return Err(RuntimeError::Error(
                            "JZ condition must be an integer".to_string(),
                        ));
                    };
                    if c == 0 {
                        ip = target(&labels, instr)?;
                        continue;
                    }
                }
                Opcode::Jnz => {
                    let cond = self.operand(instr, 0)?;
                    let Value::Int(c) = cond else {
                        return Err(RuntimeError::Error(
                            "JNZ condition must be an integer".to_string(),
                        ));
                    };
                    if c != 0 {
                        ip = target(&labels, instr)?;
                        continue;
                    }
                }
                Opcode::Ret => {
                    return Ok(0);
                }

                Opcode::Store | Opcode::StoreGlobal | Opcode::LoadGlobal => {
                    let v = self.operand(instr, 0)?;
                    self.store_result(instr, v);
                }
                // Indexed loads have no storage behind them; the result slot
                // stays unwritten
                Opcode::Load => {}

                Opcode::Print => {
                    let v = self.operand(instr, 0)?;
                    write!(self.out, "{}", v)?;
                    self.out.flush()?;
                }
                Opcode::Input => {
                    if let Some(prompt) = &instr.prompt {
                        write!(self.out, "{}", prompt)?;
                        self.out.flush()?;
                    }
                    let mut line = String::new();
                    self.input.read_line(&mut line)?;
                    if line.ends_with('\n') {
                        line.pop();
                    }
                    if line.ends_with('\r') {
                        line.pop();
                    }
                    self.store_result(instr, Value::Str(line));
                }
                Opcode::KeyPressed => {
                    let key = self.keys.read_key()?;
                    self.store_result(instr, Value::Str(key.to_string()));
                }

                Opcode::Screen => {
                    if instr.operands.len() >= 3 {
                        let w = to_int_lenient(&self.operand(instr, 0)?);
                        let h = to_int_lenient(&self.operand(instr, 1)?);
                        let title = to_str_lenient(&self.operand(instr, 2)?);
                        // Re-screening replaces the previous surface
                        self.graphics = None;
                        match (self.open_surface)(w, h, &title) {
                            Ok(surface) => {
                                self.graphics = Some(surface);
                                write!(self.out, "\x1b[2J\x1b[1;1H")?;
                                writeln!(
                                    self.out,
                                    "Graphics window created: {}x{} - {}",
                                    w, h, title
                                )?;
                            }
                            Err(e) => {
                                eprintln!("Failed to create graphics window: {}", e);
                            }
                        }
                    }
                    self.store_result(instr, Value::Int(1));
                }
                Opcode::DrawPixel => {
                    if self.graphics.is_some() && instr.operands.len() >= 5 {
                        let v = self.int_args(instr, 5)?;
                        if let Some(g) = self.graphics.as_mut() {
                            g.draw_pixel(v[0], v[1], v[2], v[3], v[4]);
                        }
                        self.store_result(instr, Value::Int(1));
                    }
                }
                Opcode::DrawRect => {
                    if self.graphics.is_some() && instr.operands.len() >= 8 {
                        let v = self.int_args(instr, 8)?;
                        if let Some(g) = self.graphics.as_mut() {
                            g.draw_rect(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7] != 0);
                        }
                        self.store_result(instr, Value::Int(1));
                    }
                }
                Opcode::DrawLine => {
                    if self.graphics.is_some() && instr.operands.len() >= 7 {
                        let v = self.int_args(instr, 7)?;
                        if let Some(g) = self.graphics.as_mut() {
                            g.draw_line(v[0], v[1], v[2], v[3], v[4], v[5], v[6]);
                        }
                        self.store_result(instr, Value::Int(1));
                    }
                }
                Opcode::DrawCircle => {
                    if self.graphics.is_some() && instr.operands.len() >= 7 {
                        let v = self.int_args(instr, 7)?;
                        if let Some(g) = self.graphics.as_mut() {
                            g.draw_circle(v[0], v[1], v[2], v[3], v[4], v[5], v[6] != 0);
                        }
                        self.store_result(instr, Value::Int(1));
                    }
                }
                Opcode::ClearScreen => {
                    if self.graphics.is_some() && instr.operands.len() >= 3 {
                        let v = self.int_args(instr, 3)?;
                        if let Some(g) = self.graphics.as_mut() {
                            g.clear(v[0], v[1], v[2]);
                        }
                        self.store_result(instr, Value::Int(1));
                    }
                }
                Opcode::Present => {
                    let mut closed = false;
                    if let Some(g) = self.graphics.as_mut() {
                        g.handle_events();
                        g.present();
                        closed = g.should_close();
                    }
                    if closed {
                        self.graphics = None;
                        return Ok(0);
                    }
                    self.store_result(instr, Value::Int(1));
                }

                Opcode::Call => match instr.label.as_deref() {
                    Some("quit") => {
                        if let Some(g) = self.graphics.as_mut() {
                            g.handle_events();
                        }
                        self.graphics = None;
                        return Ok(0);
                    }
                    Some("isKeyDown") => {
                        let mut result = 0;
                        if self.graphics.is_some() && !instr.operands.is_empty() {
                            let name = to_str_lenient(&self.operand(instr, 0)?);
                            if let (Some(key), Some(g)) =
                                (Key::from_name(&name), self.graphics.as_ref())
                            {
                                if g.is_key_pressed(key) {
                                    result = 1;
                                }
                            }
                            if result == 1 {
                                writeln!(self.out, "Key detected: {}", name)?;
                            }
                        }
                        self.store_result(instr, Value::Int(result));
                    }
                    Some("updateInput") => {
                        if let Some(g) = self.graphics.as_mut() {
                            g.handle_events();
                        }
                        self.store_result(instr, Value::Int(1));
                    }
                    // No dispatch for user functions; the result slot stays
                    // unwritten and later reads see the default
                    _ => {}
                },

                Opcode::Label | Opcode::Nop => {}
            }

            ip += 1;
        }

        Ok(0)
    }

    // -------------------------------------------------------------------------
    // Slot access
    // -------------------------------------------------------------------------

    fn fetch(&self, value: &IrValue) -> Value {
        self.slots
            .get(&value.to_string())
            .cloned()
            .unwrap_or_default()
    }

    fn operand(&self, instr: &Instruction, index: usize) -> Result<Value, RuntimeError> {
        let operand = instr.operands.get(index).ok_or_else(|| {
            RuntimeError::Error(format!("{} missing operand {}", instr.opcode, index))
        })?;
        Ok(self.fetch(operand))
    }

    fn store_result(&mut self, instr: &Instruction, value: Value) {
        if let Some(result) = &instr.result {
            self.slots.insert(result.to_string(), value);
        }
    }

    /// First `n` operands through the lenient graphics coercion.
    fn int_args(&self, instr: &Instruction, n: usize) -> Result<Vec<i32>, RuntimeError> {
        (0..n)
            .map(|i| Ok(to_int_lenient(&self.operand(instr, i)?)))
            .collect()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Coercions
// ---------------------------------------------------------------------------

/// Arithmetic coercion: int passes, float truncates, string parses with a
/// `stoi`-style prefix scan, anything else raises.
fn to_int(value: &Value) -> Result<i32, RuntimeError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(f) => Ok(*f as i32),
        Value::Str(s) => parse_int_prefix(s)
            .ok_or_else(|| RuntimeError::Error(format!("Cannot convert '{}' to int", s))),
        Value::Bool(_) => Err(RuntimeError::Error("Cannot convert to int".to_string())),
    }
}

/// Graphics operand coercion: never raises, defaults to 0.
fn to_int_lenient(value: &Value) -> i32 {
    match value {
        Value::Int(i) => *i,
        Value::Float(f) => *f as i32,
        Value::Str(s) => parse_int_prefix(s).unwrap_or(0),
        Value::Bool(_) => 0,
    }
}

/// Longest leading integer prefix after optional whitespace and sign, the
/// way `stoi` scans: `"12abc"` is 12, `"abc"` is no integer at all. Fails
/// when no digit is found or the prefix overflows i32.
fn parse_int_prefix(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse::<i32>().ok()
}

fn to_str_lenient(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => (*f as i32).to_string(),
        Value::Bool(_) => String::new(),
    }
}

/// Comparison with numeric promotion: either side float compares as f64,
/// int/int and string/string compare natively, anything else raises.
fn compare(opcode: Opcode, a: &Value, b: &Value) -> Result<i32, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(ord(opcode, x, y)),
        (Value::Int(x), Value::Float(y)) => {
            let xf = *x as f64;
            Ok(ord(opcode, &xf, y))
        }
        (Value::Float(x), Value::Int(y)) => {
            let yf = *y as f64;
            Ok(ord(opcode, x, &yf))
        }
        (Value::Float(x), Value::Float(y)) => Ok(ord(opcode, x, y)),
        (Value::Str(x), Value::Str(y)) => Ok(ord(opcode, x, y)),
        _ => Err(RuntimeError::Error(format!(
            "Invalid types for {}",
            opcode.mnemonic()
        ))),
    }
}

fn ord<T: PartialOrd>(opcode: Opcode, x: &T, y: &T) -> i32 {
    let result = match opcode {
        Opcode::Eq => x == y,
        Opcode::Ne => x != y,
        Opcode::Lt => x < y,
        Opcode::Gt => x > y,
        Opcode::Le => x <= y,
        Opcode::Ge => x >= y,
        _ => false,
    };
    result as i32
}

fn constant_text(instr: &Instruction) -> Result<&str, RuntimeError> {
    match instr.operands.first() {
        Some(IrValue::Constant(text)) => Ok(text),
        _ => Err(RuntimeError::Error(format!(
            "{} expects a constant operand",
            instr.opcode
        ))),
    }
}

fn target(labels: &HashMap<&str, usize>, instr: &Instruction) -> Result<usize, RuntimeError> {
    let name = instr
        .label
        .as_deref()
        .ok_or_else(|| RuntimeError::Error("Jump without a target".to_string()))?;
    labels
        .get(name)
        .copied()
        .ok_or_else(|| RuntimeError::Error(format!("Unknown label: {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_coercion_truncates_floats() {
        assert_eq!(to_int(&Value::Float(3.9)).unwrap(), 3);
        assert_eq!(to_int(&Value::Float(-2.7)).unwrap(), -2);
    }

    #[test]
    fn int_coercion_parses_strings() {
        assert_eq!(to_int(&Value::Str("42".to_string())).unwrap(), 42);
        assert!(to_int(&Value::Str("forty".to_string())).is_err());
    }

    #[test]
    fn int_coercion_takes_the_leading_prefix() {
        assert_eq!(to_int(&Value::Str("12abc".to_string())).unwrap(), 12);
        assert_eq!(to_int(&Value::Str("-7x".to_string())).unwrap(), -7);
        assert_eq!(to_int(&Value::Str("  3.5".to_string())).unwrap(), 3);
        assert!(to_int(&Value::Str("x12".to_string())).is_err());
    }

    #[test]
    fn int_coercion_rejects_bools() {
        assert!(to_int(&Value::Bool(true)).is_err());
    }

    #[test]
    fn lenient_coercion_never_fails() {
        assert_eq!(to_int_lenient(&Value::Str("oops".to_string())), 0);
        assert_eq!(to_int_lenient(&Value::Str("12abc".to_string())), 12);
        assert_eq!(to_int_lenient(&Value::Bool(true)), 0);
        assert_eq!(to_int_lenient(&Value::Float(9.7)), 9);
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Int(14).to_string(), "14");
        assert_eq!(Value::Float(3.5).to_string(), "3.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Str("hi".to_string()).to_string(), "hi");
    }

    #[test]
    fn comparison_promotes_to_float() {
        assert_eq!(compare(Opcode::Lt, &Value::Int(1), &Value::Float(1.5)).unwrap(), 1);
        assert_eq!(compare(Opcode::Ge, &Value::Float(2.0), &Value::Int(2)).unwrap(), 1);
    }

    #[test]
    fn comparison_rejects_mixed_string_and_int() {
        assert!(compare(Opcode::Eq, &Value::Str("1".to_string()), &Value::Int(1)).is_err());
    }

    #[test]
    fn string_comparison_is_lexicographic() {
        let a = Value::Str("apple".to_string());
        let b = Value::Str("banana".to_string());
        assert_eq!(compare(Opcode::Lt, &a, &b).unwrap(), 1);
        assert_eq!(compare(Opcode::Gt, &a, &b).unwrap(), 0);
    }
}
