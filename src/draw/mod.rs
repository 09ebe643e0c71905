//! Embedded PostScript-like drawing interpreter (§4.7).
//!
//! A draw procedure is a flat token stream operating on a small operand
//! stack (bounded at [`MAX_STACK`]) and a fixed bank of numbered variables
//! (bounded at [`MAX_VARIABLES`]). Named-procedure calls recurse through the
//! same interpreter instance, bounded at [`MAX_RECURSION_DEPTH`] so a
//! self-calling procedure can't blow the native stack. Control flow
//! (`if`/`ifelse`/`repeat`/`loop`/`exit`) does NOT recurse the host
//! language at all: each nested block is pushed as an [`ExecFrame`] onto an
//! explicit stack that `run_inner`'s single loop drains, bounded at
//! [`MAX_CONTROL_DEPTH`]. Drawing operators (`fill`, `stroke`, `moveto`,
//! ...) don't touch the backend directly — they push an [`OverdrawRecord`]
//! that the caller flushes once a stave's whole composition pass is done, so
//! later items can still be drawn underneath earlier ones when a movement
//! asks for it.
//!
//! Every operator is checked against a static per-operator stack-requirement
//! table before it runs: wrong arity is `ERR149`, wrong operand type is
//! `ERR150`.

use crate::domain::errors::EngraveError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MAX_STACK: usize = 100;
pub const MAX_VARIABLES: usize = 20;
pub const MAX_RECURSION_DEPTH: u32 = 20;
/// Bound on nested `if`/`ifelse`/`repeat`/`loop` blocks within one procedure
/// body, enforced on the explicit [`ExecFrame`] stack rather than the native
/// call stack.
pub const MAX_CONTROL_DEPTH: usize = 64;

/// Coordinates and widths pushed by draw operators are plain point units;
/// the backend wire format (§4.8) wants millipoint units, so path and
/// line-width state is scaled by this factor at the point it is recorded.
const MILLI_PER_UNIT: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
    /// A variable-bank index, the operand `def` and the `storeN`/`loadN`
    /// family dereference.
    VarName(usize),
    /// A procedure body pushed as a value, the operand `if`/`ifelse`/
    /// `repeat`/`loop` consume.
    Code(Vec<Token>),
}

fn type_error(expected: &str, found: &Value) -> EngraveError {
    EngraveError::Message(format!("ERR150: expected {expected}, found {found:?} on the draw stack"))
}

impl Value {
    fn as_num(&self) -> Result<f64, EngraveError> {
        match self {
            Value::Num(n) => Ok(*n),
            other => Err(type_error("number", other)),
        }
    }

    fn as_text(&self) -> Result<String, EngraveError> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            other => Err(type_error("text", other)),
        }
    }

    fn as_bool_value(&self) -> Result<bool, EngraveError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(type_error("bool", other)),
        }
    }

    fn as_varname_value(&self) -> Result<usize, EngraveError> {
        match self {
            Value::VarName(i) => Ok(*i),
            other => Err(type_error("varname", other)),
        }
    }

    fn into_code(self) -> Result<Vec<Token>, EngraveError> {
        match self {
            Value::Code(c) => Ok(c),
            other => Err(type_error("code", &other)),
        }
    }

    fn slot(&self) -> StackSlot {
        match self {
            Value::Num(_) => StackSlot::Number,
            Value::Str(_) => StackSlot::Text,
            Value::Bool(_) => StackSlot::Any,
            Value::VarName(_) => StackSlot::VarName,
            Value::Code(_) => StackSlot::Code,
        }
    }
}

/// One nibble-worth of required operand type in the stack-requirement
/// table (§4.7): `Any` accepts every value, the rest demand an exact tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackSlot {
    Any,
    Number,
    Text,
    Code,
    VarName,
}

impl StackSlot {
    fn accepts(self, value: &Value) -> bool {
        matches!(self, StackSlot::Any) || self == value.slot()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Token {
    Push(Value),
    Op(String),
}

/// A deferred drawing operation, recorded rather than issued immediately so
/// a stave's fills/strokes can be reordered relative to items drawn after
/// the procedure that requested them (§4.7 "overdraw record").
#[derive(Debug, Clone, PartialEq)]
pub enum OverdrawRecord {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    CurveTo(f64, f64, f64, f64, f64, f64),
    Fill,
    Stroke { width: f64 },
    SetGray(f64),
    SetColor(f64, f64, f64),
    SetDash(f64, f64),
    Show { text: String, x: f64, y: f64 },
}

/// Read-only engraving context a draw procedure's environmental accessors
/// (`accleft`, `headleft`, ... `gapy`) pull from. The interpreter borrows
/// this rather than owning it — it describes the note/symbol the draw
/// procedure is attached to and the page/stave it is being laid out on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DrawContext {
    pub accleft: f64,
    pub headleft: f64,
    pub headright: f64,
    pub headtop: f64,
    pub headbottom: f64,
    pub linetop: f64,
    pub linebottom: f64,
    pub stembottom: f64,
    pub stemtop: f64,
    pub stavesize: f64,
    pub stavespace: f64,
    pub stavestart: f64,
    pub leftbarx: f64,
    pub linelength: f64,
    pub pagelength: f64,
    pub pagenumber: f64,
    pub barnumber: f64,
    pub systemdepth: f64,
    pub originx: f64,
    pub originy: f64,
    pub topleft: f64,
    pub magnification: f64,
    pub fontsize: f64,
    pub gaptype: f64,
    pub gapx: f64,
    pub gapy: f64,
}

/// One block of the explicit control-flow stack `run_inner` drains
/// iteratively — the mechanism that keeps `if`/`ifelse`/`repeat`/`loop` off
/// the native call stack (§9).
#[derive(Debug, Clone)]
enum ExecFrame {
    Tokens { body: Vec<Token>, pos: usize },
    Repeat { body: Vec<Token>, pos: usize, remaining: u32 },
    Loop { body: Vec<Token>, pos: usize },
}

impl ExecFrame {
    fn body(&self) -> &[Token] {
        match self {
            ExecFrame::Tokens { body, .. } => body,
            ExecFrame::Repeat { body, .. } => body,
            ExecFrame::Loop { body, .. } => body,
        }
    }

    fn pos(&self) -> usize {
        match self {
            ExecFrame::Tokens { pos, .. } => *pos,
            ExecFrame::Repeat { pos, .. } => *pos,
            ExecFrame::Loop { pos, .. } => *pos,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.pos() >= self.body().len()
    }

    fn current_token(&self) -> Token {
        self.body()[self.pos()].clone()
    }

    fn advance(&mut self) {
        match self {
            ExecFrame::Tokens { pos, .. } => *pos += 1,
            ExecFrame::Repeat { pos, .. } => *pos += 1,
            ExecFrame::Loop { pos, .. } => *pos += 1,
        }
    }

    fn is_loop_like(&self) -> bool {
        matches!(self, ExecFrame::Repeat { .. } | ExecFrame::Loop { .. })
    }

    /// Called once a frame runs off the end of its body. `repeat` and
    /// `loop` resume from position zero (one fewer time, or forever);
    /// everything else simply pops.
    fn on_exhausted(self) -> Option<ExecFrame> {
        match self {
            ExecFrame::Tokens { .. } => None,
            ExecFrame::Repeat { body, remaining, .. } if remaining > 1 => {
                Some(ExecFrame::Repeat { body, pos: 0, remaining: remaining - 1 })
            }
            ExecFrame::Repeat { .. } => None,
            ExecFrame::Loop { body, .. } => Some(ExecFrame::Loop { body, pos: 0 }),
        }
    }
}

/// Per-operator arity and operand-type requirements, checked before the
/// operator runs (§4.7, Testable Property 8). `storeN`/`loadN` vary by
/// suffix and are checked separately in [`Interpreter::check_stack`].
static STACK_TABLE: &[(&str, &[StackSlot])] = &[
    ("add", &[StackSlot::Number, StackSlot::Number]),
    ("sub", &[StackSlot::Number, StackSlot::Number]),
    ("mul", &[StackSlot::Number, StackSlot::Number]),
    ("div", &[StackSlot::Number, StackSlot::Number]),
    ("neg", &[StackSlot::Number]),
    ("sqrt", &[StackSlot::Number]),
    ("sin", &[StackSlot::Number]),
    ("cos", &[StackSlot::Number]),
    ("lt", &[StackSlot::Number, StackSlot::Number]),
    ("le", &[StackSlot::Number, StackSlot::Number]),
    ("eq", &[StackSlot::Number, StackSlot::Number]),
    ("ne", &[StackSlot::Number, StackSlot::Number]),
    ("ge", &[StackSlot::Number, StackSlot::Number]),
    ("gt", &[StackSlot::Number, StackSlot::Number]),
    ("and", &[StackSlot::Any, StackSlot::Any]),
    ("or", &[StackSlot::Any, StackSlot::Any]),
    ("not", &[StackSlot::Any]),
    ("dup", &[StackSlot::Any]),
    ("pop", &[StackSlot::Any]),
    ("exch", &[StackSlot::Any, StackSlot::Any]),
    ("copy", &[StackSlot::Number]),
    ("roll", &[StackSlot::Number, StackSlot::Number]),
    ("if", &[StackSlot::Any, StackSlot::Code]),
    ("ifelse", &[StackSlot::Any, StackSlot::Code, StackSlot::Code]),
    ("repeat", &[StackSlot::Number, StackSlot::Code]),
    ("loop", &[StackSlot::Code]),
    ("exit", &[]),
    ("def", &[StackSlot::VarName, StackSlot::Any]),
    ("moveto", &[StackSlot::Number, StackSlot::Number]),
    ("lineto", &[StackSlot::Number, StackSlot::Number]),
    ("rmoveto", &[StackSlot::Number, StackSlot::Number]),
    ("rlineto", &[StackSlot::Number, StackSlot::Number]),
    (
        "curveto",
        &[
            StackSlot::Number,
            StackSlot::Number,
            StackSlot::Number,
            StackSlot::Number,
            StackSlot::Number,
            StackSlot::Number,
        ],
    ),
    (
        "rcurveto",
        &[
            StackSlot::Number,
            StackSlot::Number,
            StackSlot::Number,
            StackSlot::Number,
            StackSlot::Number,
            StackSlot::Number,
        ],
    ),
    ("translate", &[StackSlot::Number, StackSlot::Number]),
    ("setcolor", &[StackSlot::Number, StackSlot::Number, StackSlot::Number]),
    ("setcolour", &[StackSlot::Number, StackSlot::Number, StackSlot::Number]),
    ("setgray", &[StackSlot::Number]),
    ("setdash", &[StackSlot::Number, StackSlot::Number]),
    ("setlinewidth", &[StackSlot::Number]),
    ("currentcolor", &[]),
    ("currentgray", &[]),
    ("currentdash", &[]),
    ("currentlinewidth", &[]),
    ("currentpoint", &[]),
    ("fill", &[]),
    ("fillretain", &[]),
    ("stroke", &[]),
    ("show", &[StackSlot::Text]),
    ("stringwidth", &[StackSlot::Text]),
    ("cvs", &[StackSlot::Number]),
    ("accleft", &[]),
    ("headleft", &[]),
    ("headright", &[]),
    ("headtop", &[]),
    ("headbottom", &[]),
    ("linetop", &[]),
    ("linebottom", &[]),
    ("stembottom", &[]),
    ("stemtop", &[]),
    ("stavesize", &[]),
    ("stavespace", &[]),
    ("stavestart", &[]),
    ("leftbarx", &[]),
    ("linelength", &[]),
    ("pagelength", &[]),
    ("pagenumber", &[]),
    ("barnumber", &[]),
    ("systemdepth", &[]),
    ("originx", &[]),
    ("originy", &[]),
    ("topleft", &[]),
    ("magnification", &[]),
    ("fontsize", &[]),
    ("gaptype", &[]),
    ("gapx", &[]),
    ("gapy", &[]),
];

pub struct Interpreter<'a> {
    stack: Vec<Value>,
    variables: Vec<Value>,
    procedures: &'a HashMap<String, Vec<Token>>,
    overdraw: Vec<OverdrawRecord>,
    path_open: bool,
    current_x: f64,
    current_y: f64,
    origin_x: f64,
    origin_y: f64,
    line_width: f64,
    gray: f64,
    color: (f64, f64, f64),
    dash: (f64, f64),
    context: DrawContext,
    depth: u32,
}

impl<'a> Interpreter<'a> {
    pub fn new(procedures: &'a HashMap<String, Vec<Token>>) -> Self {
        Self::with_context(procedures, DrawContext::default())
    }

    pub fn with_context(procedures: &'a HashMap<String, Vec<Token>>, context: DrawContext) -> Self {
        Self {
            stack: Vec::new(),
            variables: (0..MAX_VARIABLES).map(|_| Value::Num(0.0)).collect(),
            procedures,
            overdraw: Vec::new(),
            path_open: false,
            current_x: 0.0,
            current_y: 0.0,
            origin_x: 0.0,
            origin_y: 0.0,
            line_width: 0.0,
            gray: 0.0,
            color: (0.0, 0.0, 0.0),
            dash: (0.0, 0.0),
            context,
            depth: 0,
        }
    }

    pub fn overdraw_records(&self) -> &[OverdrawRecord] {
        &self.overdraw
    }

    pub fn run(&mut self, program: &[Token]) -> Result<(), EngraveError> {
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(EngraveError::DrawStackOverflow);
        }
        self.depth += 1;
        let result = self.run_inner(program);
        self.depth -= 1;
        result
    }

    /// Drains an explicit frame stack rather than recursing the host
    /// language for `if`/`ifelse`/`repeat`/`loop` (§9). A named-procedure
    /// call is still a host call into [`Interpreter::run`], bounded
    /// separately by [`MAX_RECURSION_DEPTH`].
    fn run_inner(&mut self, program: &[Token]) -> Result<(), EngraveError> {
        let mut frames: Vec<ExecFrame> = vec![ExecFrame::Tokens { body: program.to_vec(), pos: 0 }];

        while let Some(frame) = frames.last() {
            if frame.is_exhausted() {
                let finished = frames.pop().unwrap();
                if let Some(resumed) = finished.on_exhausted() {
                    frames.push(resumed);
                }
                continue;
            }

            let tok = frame.current_token();
            frames.last_mut().unwrap().advance();

            match tok {
                Token::Push(v) => self.push(v)?,
                Token::Op(op) => {
                    self.check_stack(&op)?;
                    match op.as_str() {
                        "if" => {
                            let code = self.pop()?.into_code()?;
                            let cond = self.pop()?.as_bool_value()?;
                            if cond {
                                Self::push_frame(&mut frames, ExecFrame::Tokens { body: code, pos: 0 })?;
                            }
                        }
                        "ifelse" => {
                            let else_code = self.pop()?.into_code()?;
                            let then_code = self.pop()?.into_code()?;
                            let cond = self.pop()?.as_bool_value()?;
                            let body = if cond { then_code } else { else_code };
                            Self::push_frame(&mut frames, ExecFrame::Tokens { body, pos: 0 })?;
                        }
                        "repeat" => {
                            let code = self.pop()?.into_code()?;
                            let n = self.pop_num()?;
                            if n > 0.0 {
                                Self::push_frame(
                                    &mut frames,
                                    ExecFrame::Repeat { body: code, pos: 0, remaining: n as u32 },
                                )?;
                            }
                        }
                        "loop" => {
                            let code = self.pop()?.into_code()?;
                            Self::push_frame(&mut frames, ExecFrame::Loop { body: code, pos: 0 })?;
                        }
                        "exit" => {
                            if !frames.iter().any(ExecFrame::is_loop_like) {
                                return Err(EngraveError::Message(
                                    "'exit' used outside a repeat/loop block".into(),
                                ));
                            }
                            while let Some(f) = frames.pop() {
                                if f.is_loop_like() {
                                    break;
                                }
                            }
                        }
                        other => self.exec_op(other)?,
                    }
                }
            }
        }
        Ok(())
    }

    fn push_frame(frames: &mut Vec<ExecFrame>, frame: ExecFrame) -> Result<(), EngraveError> {
        if frames.len() >= MAX_CONTROL_DEPTH {
            return Err(EngraveError::DrawStackOverflow);
        }
        frames.push(frame);
        Ok(())
    }

    fn push(&mut self, value: Value) -> Result<(), EngraveError> {
        if self.stack.len() >= MAX_STACK {
            return Err(EngraveError::Message("draw operand stack overflow".into()));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, EngraveError> {
        self.stack
            .pop()
            .ok_or_else(|| EngraveError::Message("ERR149: draw stack underflow".into()))
    }

    fn pop_num(&mut self) -> Result<f64, EngraveError> {
        self.pop()?.as_num()
    }

    /// Verify `op`'s operand count and types against [`STACK_TABLE`]
    /// (Testable Property 8): `ERR149` for too few operands, `ERR150` for a
    /// type mismatch, a stack dump included in both.
    fn check_stack(&self, op: &str) -> Result<(), EngraveError> {
        let slots: &[StackSlot] = if op.starts_with("store") {
            &[StackSlot::Any]
        } else if op.starts_with("load") {
            &[]
        } else {
            match STACK_TABLE.iter().find(|(name, _)| *name == op) {
                Some((_, slots)) => slots,
                None => return Ok(()), // a named-procedure call or unknown op; exec_op reports unknown ops
            }
        };

        if self.stack.len() < slots.len() {
            return Err(EngraveError::Message(format!(
                "ERR149: '{op}' needs {} operand(s), stack has {}: {:?}",
                slots.len(),
                self.stack.len(),
                self.stack
            )));
        }
        let start = self.stack.len() - slots.len();
        for (slot, value) in slots.iter().zip(&self.stack[start..]) {
            if !slot.accepts(value) {
                return Err(EngraveError::Message(format!(
                    "ERR150: '{op}' expected {slot:?}, found {value:?}: {:?}",
                    self.stack
                )));
            }
        }
        Ok(())
    }

    fn exec_op(&mut self, op: &str) -> Result<(), EngraveError> {
        match op {
            "add" => self.binary(|a, b| a + b),
            "sub" => self.binary(|a, b| a - b),
            "mul" => self.binary(|a, b| a * b),
            "div" => {
                let b = self.pop_num()?;
                let a = self.pop_num()?;
                if b == 0.0 {
                    return Err(EngraveError::Message("division by zero in draw procedure".into()));
                }
                self.push(Value::Num(a / b))
            }
            "neg" => {
                let a = self.pop_num()?;
                self.push(Value::Num(-a))
            }
            "sqrt" => {
                let a = self.pop_num()?;
                if a < 0.0 {
                    return Err(EngraveError::Message("sqrt of a negative number in draw procedure".into()));
                }
                self.push(Value::Num(a.sqrt()))
            }
            "sin" => {
                let a = self.pop_num()?;
                self.push(Value::Num(a.to_radians().sin()))
            }
            "cos" => {
                let a = self.pop_num()?;
                self.push(Value::Num(a.to_radians().cos()))
            }
            "lt" => self.compare(|a, b| a < b),
            "le" => self.compare(|a, b| a <= b),
            "eq" => self.compare(|a, b| a == b),
            "ne" => self.compare(|a, b| a != b),
            "ge" => self.compare(|a, b| a >= b),
            "gt" => self.compare(|a, b| a > b),
            "and" => self.logical(|a, b| a && b),
            "or" => self.logical(|a, b| a || b),
            "not" => {
                let a = self.pop()?.as_bool_value()?;
                self.push(Value::Bool(!a))
            }
            "dup" => {
                let top = self.pop()?;
                self.push(top.clone())?;
                self.push(top)
            }
            "pop" => {
                self.pop()?;
                Ok(())
            }
            "exch" => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(b)?;
                self.push(a)
            }
            "copy" => {
                let n = self.pop_num()? as usize;
                if n > self.stack.len() {
                    return Err(EngraveError::Message("ERR149: 'copy' count exceeds stack depth".into()));
                }
                let start = self.stack.len() - n;
                let duplicated: Vec<Value> = self.stack[start..].to_vec();
                for v in duplicated {
                    self.push(v)?;
                }
                Ok(())
            }
            "roll" => {
                let j = self.pop_num()? as i64;
                let n = self.pop_num()? as usize;
                if n > self.stack.len() {
                    return Err(EngraveError::Message("ERR149: 'roll' count exceeds stack depth".into()));
                }
                if n > 0 {
                    let start = self.stack.len() - n;
                    let mut window: Vec<Value> = self.stack.split_off(start);
                    let shift = (((j % n as i64) + n as i64) % n as i64) as usize;
                    window.rotate_right(shift);
                    self.stack.extend(window);
                }
                Ok(())
            }
            "def" => {
                let value = self.pop()?;
                let idx = self.pop()?.as_varname_value()?;
                self.variables[idx] = value;
                Ok(())
            }
            _ if op.starts_with("store") => self.store_variable(op),
            _ if op.starts_with("load") => self.load_variable(op),
            "moveto" => {
                let y = self.pop_num()?;
                let x = self.pop_num()?;
                self.move_to(x, y)
            }
            "rmoveto" => {
                let dy = self.pop_num()?;
                let dx = self.pop_num()?;
                self.move_to(self.current_x + dx, self.current_y + dy)
            }
            "lineto" => {
                let y = self.pop_num()?;
                let x = self.pop_num()?;
                self.line_to(x, y)
            }
            "rlineto" => {
                let dy = self.pop_num()?;
                let dx = self.pop_num()?;
                self.line_to(self.current_x + dx, self.current_y + dy)
            }
            "curveto" => {
                let y3 = self.pop_num()?;
                let x3 = self.pop_num()?;
                let y2 = self.pop_num()?;
                let x2 = self.pop_num()?;
                let y1 = self.pop_num()?;
                let x1 = self.pop_num()?;
                self.curve_to(x1, y1, x2, y2, x3, y3)
            }
            "rcurveto" => {
                let dy3 = self.pop_num()?;
                let dx3 = self.pop_num()?;
                let dy2 = self.pop_num()?;
                let dx2 = self.pop_num()?;
                let dy1 = self.pop_num()?;
                let dx1 = self.pop_num()?;
                let (cx, cy) = (self.current_x, self.current_y);
                let (x1, y1) = (cx + dx1, cy + dy1);
                let (x2, y2) = (x1 + dx2, y1 + dy2);
                let (x3, y3) = (x2 + dx3, y2 + dy3);
                self.curve_to(x1, y1, x2, y2, x3, y3)
            }
            "translate" => {
                let ty = self.pop_num()?;
                let tx = self.pop_num()?;
                self.origin_x += tx;
                self.origin_y += ty;
                Ok(())
            }
            "fill" => {
                self.overdraw.push(OverdrawRecord::Fill);
                self.path_open = false;
                Ok(())
            }
            "fillretain" => {
                self.overdraw.push(OverdrawRecord::Fill);
                Ok(())
            }
            "stroke" => {
                self.overdraw.push(OverdrawRecord::Stroke { width: self.line_width });
                self.path_open = false;
                Ok(())
            }
            "setgray" => {
                let g = self.pop_num()?;
                self.gray = g;
                self.overdraw.push(OverdrawRecord::SetGray(g));
                Ok(())
            }
            "setcolor" | "setcolour" => {
                let b = self.pop_num()?;
                let g = self.pop_num()?;
                let r = self.pop_num()?;
                self.color = (r, g, b);
                self.overdraw.push(OverdrawRecord::SetColor(r, g, b));
                Ok(())
            }
            "setdash" => {
                let off = self.pop_num()?;
                let on = self.pop_num()?;
                self.dash = (on, off);
                self.overdraw.push(OverdrawRecord::SetDash(on * MILLI_PER_UNIT, off * MILLI_PER_UNIT));
                Ok(())
            }
            "setlinewidth" => {
                let w = self.pop_num()?;
                self.line_width = w * MILLI_PER_UNIT;
                Ok(())
            }
            "currentcolor" => {
                let (r, g, b) = self.color;
                self.push(Value::Num(r))?;
                self.push(Value::Num(g))?;
                self.push(Value::Num(b))
            }
            "currentgray" => self.push(Value::Num(self.gray)),
            "currentdash" => {
                let (on, off) = self.dash;
                self.push(Value::Num(on))?;
                self.push(Value::Num(off))
            }
            "currentlinewidth" => self.push(Value::Num(self.line_width)),
            "currentpoint" => {
                self.push(Value::Num(self.current_x))?;
                self.push(Value::Num(self.current_y))
            }
            "show" => {
                let text = self.pop()?.as_text()?;
                self.overdraw.push(OverdrawRecord::Show {
                    text,
                    x: (self.current_x + self.origin_x) * MILLI_PER_UNIT,
                    y: (self.current_y + self.origin_y) * MILLI_PER_UNIT,
                });
                Ok(())
            }
            "stringwidth" => {
                let text = self.pop()?.as_text()?;
                let size = if self.context.fontsize > 0.0 { self.context.fontsize } else { 1.0 };
                self.push(Value::Num(text.chars().count() as f64 * size))
            }
            "cvs" => {
                let n = self.pop_num()?;
                self.push(Value::Str(format!("{n}")))
            }
            "accleft" => self.push(Value::Num(self.context.accleft)),
            "headleft" => self.push(Value::Num(self.context.headleft)),
            "headright" => self.push(Value::Num(self.context.headright)),
            "headtop" => self.push(Value::Num(self.context.headtop)),
            "headbottom" => self.push(Value::Num(self.context.headbottom)),
            "linetop" => self.push(Value::Num(self.context.linetop)),
            "linebottom" => self.push(Value::Num(self.context.linebottom)),
            "stembottom" => self.push(Value::Num(self.context.stembottom)),
            "stemtop" => self.push(Value::Num(self.context.stemtop)),
            "stavesize" => self.push(Value::Num(self.context.stavesize)),
            "stavespace" => self.push(Value::Num(self.context.stavespace)),
            "stavestart" => self.push(Value::Num(self.context.stavestart)),
            "leftbarx" => self.push(Value::Num(self.context.leftbarx)),
            "linelength" => self.push(Value::Num(self.context.linelength)),
            "pagelength" => self.push(Value::Num(self.context.pagelength)),
            "pagenumber" => self.push(Value::Num(self.context.pagenumber)),
            "barnumber" => self.push(Value::Num(self.context.barnumber)),
            "systemdepth" => self.push(Value::Num(self.context.systemdepth)),
            "originx" => self.push(Value::Num(self.context.originx)),
            "originy" => self.push(Value::Num(self.context.originy)),
            "topleft" => self.push(Value::Num(self.context.topleft)),
            "magnification" => self.push(Value::Num(self.context.magnification)),
            "fontsize" => self.push(Value::Num(self.context.fontsize)),
            "gaptype" => self.push(Value::Num(self.context.gaptype)),
            "gapx" => self.push(Value::Num(self.context.gapx)),
            "gapy" => self.push(Value::Num(self.context.gapy)),
            _ if self.procedures.contains_key(op) => {
                let body = self.procedures.get(op).unwrap().clone();
                self.run(&body)
            }
            other => Err(EngraveError::Message(format!("unknown draw operator '{other}'"))),
        }
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<(), EngraveError> {
        self.current_x = x;
        self.current_y = y;
        self.path_open = true;
        self.overdraw.push(OverdrawRecord::MoveTo(
            (x + self.origin_x) * MILLI_PER_UNIT,
            (y + self.origin_y) * MILLI_PER_UNIT,
        ));
        Ok(())
    }

    fn line_to(&mut self, x: f64, y: f64) -> Result<(), EngraveError> {
        if !self.path_open {
            return Err(EngraveError::CorruptDrawProcedure);
        }
        self.current_x = x;
        self.current_y = y;
        self.overdraw.push(OverdrawRecord::LineTo(
            (x + self.origin_x) * MILLI_PER_UNIT,
            (y + self.origin_y) * MILLI_PER_UNIT,
        ));
        Ok(())
    }

    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> Result<(), EngraveError> {
        if !self.path_open {
            return Err(EngraveError::CorruptDrawProcedure);
        }
        self.current_x = x3;
        self.current_y = y3;
        let (ox, oy) = (self.origin_x, self.origin_y);
        self.overdraw.push(OverdrawRecord::CurveTo(
            (x1 + ox) * MILLI_PER_UNIT,
            (y1 + oy) * MILLI_PER_UNIT,
            (x2 + ox) * MILLI_PER_UNIT,
            (y2 + oy) * MILLI_PER_UNIT,
            (x3 + ox) * MILLI_PER_UNIT,
            (y3 + oy) * MILLI_PER_UNIT,
        ));
        Ok(())
    }

    fn binary(&mut self, f: impl Fn(f64, f64) -> f64) -> Result<(), EngraveError> {
        let b = self.pop_num()?;
        let a = self.pop_num()?;
        self.push(Value::Num(f(a, b)))
    }

    fn compare(&mut self, f: impl Fn(f64, f64) -> bool) -> Result<(), EngraveError> {
        let b = self.pop_num()?;
        let a = self.pop_num()?;
        self.push(Value::Bool(f(a, b)))
    }

    fn logical(&mut self, f: impl Fn(bool, bool) -> bool) -> Result<(), EngraveError> {
        let b = self.pop()?.as_bool_value()?;
        let a = self.pop()?.as_bool_value()?;
        self.push(Value::Bool(f(a, b)))
    }

    fn variable_index(op: &str, prefix: &str) -> Result<usize, EngraveError> {
        op[prefix.len()..]
            .parse::<usize>()
            .ok()
            .filter(|&i| i < MAX_VARIABLES)
            .ok_or_else(|| EngraveError::Message(format!("'{op}' is not a valid variable reference")))
    }

    fn store_variable(&mut self, op: &str) -> Result<(), EngraveError> {
        let index = Self::variable_index(op, "store")?;
        let value = self.pop()?;
        self.variables[index] = value;
        Ok(())
    }

    fn load_variable(&mut self, op: &str) -> Result<(), EngraveError> {
        let index = Self::variable_index(op, "load")?;
        self.push(self.variables[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_procedures() -> HashMap<String, Vec<Token>> {
        HashMap::new()
    }

    #[test]
    fn arithmetic_ops_operate_on_the_stack() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        interp
            .run(&[
                Token::Push(Value::Num(2.0)),
                Token::Push(Value::Num(3.0)),
                Token::Op("add".into()),
            ])
            .unwrap();
        assert_eq!(interp.pop().unwrap(), Value::Num(5.0));
    }

    #[test]
    fn lineto_without_moveto_is_a_corrupt_procedure_error() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        let result = interp.run(&[
            Token::Push(Value::Num(0.0)),
            Token::Push(Value::Num(0.0)),
            Token::Op("lineto".into()),
        ]);
        assert!(matches!(result, Err(EngraveError::CorruptDrawProcedure)));
    }

    #[test]
    fn fill_after_a_path_records_an_overdraw_entry() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        interp
            .run(&[
                Token::Push(Value::Num(1.0)),
                Token::Push(Value::Num(1.0)),
                Token::Op("moveto".into()),
                Token::Op("fill".into()),
            ])
            .unwrap();
        assert_eq!(interp.overdraw_records().len(), 2);
        assert_eq!(interp.overdraw_records()[1], OverdrawRecord::Fill);
    }

    #[test]
    fn store_and_load_round_trip_a_variable() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        interp
            .run(&[
                Token::Push(Value::Num(42.0)),
                Token::Op("store3".into()),
                Token::Op("load3".into()),
            ])
            .unwrap();
        assert_eq!(interp.pop().unwrap(), Value::Num(42.0));
    }

    #[test]
    fn recursive_procedure_past_the_depth_limit_overflows() {
        let mut procs = HashMap::new();
        procs.insert("recur".to_string(), vec![Token::Op("recur".into())]);
        let mut interp = Interpreter::new(&procs);
        let result = interp.run(&[Token::Op("recur".into())]);
        assert!(matches!(result, Err(EngraveError::DrawStackOverflow)));
    }

    #[test]
    fn scenario_s4_line_draw_procedure_executes_with_an_empty_stack() {
        // draw line { 0 0 moveto 10 0 rlineto 0.5 setlinewidth stroke }
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        interp
            .run(&[
                Token::Push(Value::Num(0.0)),
                Token::Push(Value::Num(0.0)),
                Token::Op("moveto".into()),
                Token::Push(Value::Num(10.0)),
                Token::Push(Value::Num(0.0)),
                Token::Op("rlineto".into()),
                Token::Push(Value::Num(0.5)),
                Token::Op("setlinewidth".into()),
                Token::Op("stroke".into()),
            ])
            .unwrap();
        assert!(interp.stack.is_empty());
        assert_eq!(
            interp.overdraw_records(),
            &[
                OverdrawRecord::MoveTo(0.0, 0.0),
                OverdrawRecord::LineTo(10_000.0, 0.0),
                OverdrawRecord::Stroke { width: 500.0 },
            ]
        );
    }

    #[test]
    fn comparison_and_logical_ops_produce_bools() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        interp
            .run(&[
                Token::Push(Value::Num(3.0)),
                Token::Push(Value::Num(5.0)),
                Token::Op("lt".into()),
                Token::Push(Value::Bool(true)),
                Token::Op("and".into()),
            ])
            .unwrap();
        assert_eq!(interp.pop().unwrap(), Value::Bool(true));
    }

    #[test]
    fn if_runs_its_block_only_when_the_condition_is_true() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        interp
            .run(&[
                Token::Push(Value::Bool(false)),
                Token::Push(Value::Code(vec![Token::Push(Value::Num(1.0))])),
                Token::Op("if".into()),
            ])
            .unwrap();
        assert!(interp.stack.is_empty());
    }

    #[test]
    fn ifelse_picks_the_matching_branch() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        interp
            .run(&[
                Token::Push(Value::Bool(false)),
                Token::Push(Value::Code(vec![Token::Push(Value::Num(1.0))])),
                Token::Push(Value::Code(vec![Token::Push(Value::Num(2.0))])),
                Token::Op("ifelse".into()),
            ])
            .unwrap();
        assert_eq!(interp.pop().unwrap(), Value::Num(2.0));
    }

    #[test]
    fn repeat_runs_its_block_a_fixed_number_of_times_without_host_recursion() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        interp
            .run(&[
                Token::Push(Value::Num(0.0)),
                Token::Op("store0".into()),
                Token::Push(Value::Num(4.0)),
                Token::Push(Value::Code(vec![
                    Token::Op("load0".into()),
                    Token::Push(Value::Num(1.0)),
                    Token::Op("add".into()),
                    Token::Op("store0".into()),
                ])),
                Token::Op("repeat".into()),
                Token::Op("load0".into()),
            ])
            .unwrap();
        assert_eq!(interp.pop().unwrap(), Value::Num(4.0));
    }

    #[test]
    fn loop_runs_until_exit_without_host_recursion() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        interp
            .run(&[
                Token::Push(Value::Num(0.0)),
                Token::Op("store0".into()),
                Token::Push(Value::Code(vec![
                    Token::Op("load0".into()),
                    Token::Push(Value::Num(1.0)),
                    Token::Op("add".into()),
                    Token::Op("dup".into()),
                    Token::Op("store0".into()),
                    Token::Push(Value::Num(3.0)),
                    Token::Op("ge".into()),
                    Token::Push(Value::Code(vec![Token::Op("exit".into())])),
                    Token::Op("if".into()),
                ])),
                Token::Op("loop".into()),
                Token::Op("load0".into()),
            ])
            .unwrap();
        assert_eq!(interp.pop().unwrap(), Value::Num(3.0));
    }

    #[test]
    fn copy_and_roll_rearrange_the_stack() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        interp
            .run(&[
                Token::Push(Value::Num(1.0)),
                Token::Push(Value::Num(2.0)),
                Token::Push(Value::Num(3.0)),
                Token::Push(Value::Num(2.0)),
                Token::Op("copy".into()),
            ])
            .unwrap();
        assert_eq!(
            interp.stack,
            vec![Value::Num(1.0), Value::Num(2.0), Value::Num(3.0), Value::Num(2.0), Value::Num(3.0)]
        );

        let mut interp = Interpreter::new(&procs);
        interp
            .run(&[
                Token::Push(Value::Num(1.0)),
                Token::Push(Value::Num(2.0)),
                Token::Push(Value::Num(3.0)),
                Token::Push(Value::Num(3.0)),
                Token::Push(Value::Num(1.0)),
                Token::Op("roll".into()),
            ])
            .unwrap();
        assert_eq!(interp.stack, vec![Value::Num(3.0), Value::Num(1.0), Value::Num(2.0)]);
    }

    #[test]
    fn environmental_accessor_reads_the_draw_context() {
        let procs = no_procedures();
        let context = DrawContext { barnumber: 7.0, ..Default::default() };
        let mut interp = Interpreter::with_context(&procs, context);
        interp.run(&[Token::Op("barnumber".into())]).unwrap();
        assert_eq!(interp.pop().unwrap(), Value::Num(7.0));
    }

    #[test]
    fn stack_requirement_mismatch_reports_err149_for_missing_operands() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        let result = interp.run(&[Token::Push(Value::Num(1.0)), Token::Op("add".into())]);
        match result {
            Err(EngraveError::Message(msg)) => assert!(msg.starts_with("ERR149")),
            other => panic!("expected an ERR149 message, got {other:?}"),
        }
    }

    #[test]
    fn stack_requirement_mismatch_reports_err150_for_wrong_operand_type() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        let result = interp.run(&[
            Token::Push(Value::Str("not a number".into())),
            Token::Push(Value::Num(1.0)),
            Token::Op("add".into()),
        ]);
        match result {
            Err(EngraveError::Message(msg)) => assert!(msg.starts_with("ERR150")),
            other => panic!("expected an ERR150 message, got {other:?}"),
        }
    }

    #[test]
    fn exit_outside_a_loop_is_an_error() {
        let procs = no_procedures();
        let mut interp = Interpreter::new(&procs);
        let result = interp.run(&[Token::Op("exit".into())]);
        assert!(result.is_err());
    }
}
