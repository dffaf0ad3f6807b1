//! Evaluation of numeric expressions with units, e.g. `0.1_mm`, `2*pi/3`,
//! `_d>1?_d:1_m`.
//!
//! ```text
//! condition    = logicsum ["?" logicsum ":" logicsum]
//! logicsum     = logicproduct {"||" logicproduct}
//! logicproduct = equality {"&&" equality}
//! equality     = comparison ["==" | "!=" comparison]
//! comparison   = expression ["<" | "<=" | ">" | ">=" expression]
//! expression   = ["+" | "-"] term {"+" | "-" term}
//! term         = factor0 {"*" | "/" | "%" factor0}
//! factor0      = ["!"] factor1
//! factor1      = factor2 {"_" factor2}
//! factor2      = number | function | constant | variable | "(" condition ")"
//! function     = name "(" condition {"," condition} ")"
//! variable     = "_" name
//! ```
//!
//! Every number is a double in SI base units. `_` multiplies by a unit, so
//! `1_mm` is `1e-3`. Expressions are compiled into a flat instruction list which
//! is run on a value stack; a [`Context`] keeps compiled programs around so that
//! repeated evaluation of the same text does not parse it again.

use std::collections::HashMap;

use crate::table;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
  #[error("unbalanced parentheses at position {0}")]
  BadParenthesis(usize),
  #[error("no number, name or expression at position {0}")]
  Scan(usize),
  #[error("unknown constant or unit `{0}`")]
  UnknownName(String),
  #[error("undefined variable `_{0}`")]
  UndefinedVariable(String),
  #[error("unknown function `{0}`")]
  UnknownFunction(String),
  #[error("function `{name}` takes {expected} argument(s), got {got}")]
  Arity { name: &'static str, expected: usize, got: usize },
  #[error("argument outside the domain of `{0}`")]
  Domain(&'static str),
  #[error("division by zero")]
  DivisionByZero,
  #[error("unexpected trailing input `{0}`")]
  Trailing(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// ----- Instructions ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Binary { Add, Sub, Mul, Div, Rem, Lt, Le, Gt, Ge, Eq, Ne, And, Or }

#[derive(Debug, Clone, Copy, PartialEq)]
enum Unary { Neg, Not }

#[derive(Debug, Clone, Copy, PartialEq)]
enum Function {
  Sin, Cos, Tan, Asin, Acos, Atan, Atan2, Sinh, Cosh, Tanh,
  Floor, Ceil, Round, Abs, Exp, Log, Log10, Pow, Sqrt, Gamma, Min, Max,
  Rad, Deg,
  DegC2K, K2DegC, DegF2K, K2DegF, DegK2K, K2DegK, DegF2DegC, DegC2DegF,
}

impl Function {
  fn lookup(name: &str) -> Option<Self> {
    use Function::*;
    Some(match name {
      "sin"   => Sin,   "cos"   => Cos,   "tan"   => Tan,
      "asin"  => Asin,  "acos"  => Acos,  "atan"  => Atan,  "atan2" => Atan2,
      "sinh"  => Sinh,  "cosh"  => Cosh,  "tanh"  => Tanh,
      "floor" => Floor, "ceil"  => Ceil,  "round" => Round, "abs"   => Abs,
      "exp"   => Exp,   "log"   => Log,   "log10" => Log10,
      "pow"   => Pow,   "sqrt"  => Sqrt,  "gamma" => Gamma,
      "min"   => Min,   "max"   => Max,   "rad"   => Rad,   "deg"   => Deg,
      "degC2K"    => DegC2K,    "K2degC"    => K2DegC,
      "degF2K"    => DegF2K,    "K2degF"    => K2DegF,
      "degK2K"    => DegK2K,    "K2degK"    => K2DegK,
      "degF2degC" => DegF2DegC, "degC2degF" => DegC2DegF,
      _ => return None,
    })
  }

  fn name(self) -> &'static str {
    use Function::*;
    match self {
      Sin => "sin", Cos => "cos", Tan => "tan", Asin => "asin", Acos => "acos",
      Atan => "atan", Atan2 => "atan2", Sinh => "sinh", Cosh => "cosh", Tanh => "tanh",
      Floor => "floor", Ceil => "ceil", Round => "round", Abs => "abs", Exp => "exp",
      Log => "log", Log10 => "log10", Pow => "pow", Sqrt => "sqrt", Gamma => "gamma",
      Min => "min", Max => "max", Rad => "rad", Deg => "deg",
      DegC2K => "degC2K", K2DegC => "K2degC", DegF2K => "degF2K", K2DegF => "K2degF",
      DegK2K => "degK2K", K2DegK => "K2degK", DegF2DegC => "degF2degC", DegC2DegF => "degC2degF",
    }
  }

  fn arity(self) -> usize {
    use Function::*;
    match self { Atan2 | Pow | Min | Max => 2, _ => 1 }
  }

  fn apply(self, a: &[f64]) -> Result<f64> {
    use Function::*;
    let x = a[0];
    let domain = |ok: bool, v: f64| if ok { Ok(v) } else { Err(Error::Domain(self.name())) };
    match self {
      Sin   => Ok(x.sin()),
      Cos   => Ok(x.cos()),
      Tan   => Ok(x.tan()),
      Asin  => domain((-1.0..=1.0).contains(&x), x.asin()),
      Acos  => domain((-1.0..=1.0).contains(&x), x.acos()),
      Atan  => Ok(x.atan()),
      Atan2 => Ok(x.atan2(a[1])),
      Sinh  => Ok(x.sinh()),
      Cosh  => Ok(x.cosh()),
      Tanh  => Ok(x.tanh()),
      Floor => Ok(x.floor()),
      Ceil  => Ok(x.ceil()),
      Round => Ok((x + 0.5).floor()),
      Abs   => Ok(x.abs()),
      Exp   => Ok(x.exp()),
      Log   => domain(x > 0.0, x.ln()),
      Log10 => domain(x > 0.0, x.log10()),
      Pow   => { let v = x.powf(a[1]); domain(!v.is_nan(), v) }
      Sqrt  => domain(x >= 0.0, x.sqrt()),
      Gamma => { let v = gamma(x); domain(v.is_finite(), v) }
      Min   => Ok(x.min(a[1])),
      Max   => Ok(x.max(a[1])),
      Rad   => Ok(x.to_radians()),
      Deg   => Ok(x.to_degrees()),
      DegC2K    => Ok(x + 273.15),
      K2DegC    => Ok(x - 273.15),
      DegF2K    => Ok(5.0 / 9.0 * (x - 32.0) + 273.15),
      K2DegF    => Ok((x - 273.15) * 9.0 / 5.0 + 32.0),
      DegK2K    => Ok(x),
      K2DegK    => Ok(x),
      DegF2DegC => Ok(5.0 / 9.0 * (x - 32.0)),
      DegC2DegF => Ok(9.0 / 5.0 * x + 32.0),
    }
  }
}

/// Gamma function, Lanczos approximation (g = 7)
fn gamma(x: f64) -> f64 {
  const G: f64 = 7.0;
  const C: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_13,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
  ];
  use std::f64::consts::PI;
  if x <= 0.0 && x.fract() == 0.0 { return f64::NAN }
  if x < 0.5 {
    PI / ((PI * x).sin() * gamma(1.0 - x))
  } else {
    let x = x - 1.0;
    let t = x + G + 0.5;
    let sum = C.iter().enumerate().skip(1)
      .fold(C[0], |acc, (i, c)| acc + c / (x + i as f64));
    (2.0 * PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * sum
  }
}

#[derive(Debug, Clone, PartialEq)]
enum Instr {
  Push(f64),
  Load(String),
  Unary(Unary),
  Binary(Binary),
  Call(Function),
  /// Pop the condition, continue at the target if it is zero
  JumpIfZero(usize),
  Jump(usize),
}

/// A compiled expression
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
  code: Vec<Instr>,
}

impl Program {

  pub fn compile(text: &str) -> Result<Self> {
    let mut parser = Parser { text: text.trim(), pos: 0, code: vec![] };
    parser.condition(0)?;
    if parser.pos < parser.text.len() {
      let rest = &parser.text[parser.pos..];
      return Err(if rest.starts_with(')') { Error::BadParenthesis(parser.pos) }
                 else                     { Error::Trailing(rest.trim().to_string()) })
    }
    Ok(Self { code: parser.code })
  }

  /// Run the program, looking up variables in `variables`
  pub fn run(&self, variables: &HashMap<String, f64>) -> Result<f64> {
    let mut stack: Vec<f64> = Vec::with_capacity(8);
    let mut pc = 0;
    while let Some(instr) = self.code.get(pc) {
      pc += 1;
      match instr {
        Instr::Push(v) => stack.push(*v),
        Instr::Load(name) => {
          let v = variables.get(name).ok_or_else(|| Error::UndefinedVariable(name.clone()))?;
          stack.push(*v);
        }
        Instr::Unary(op) => {
          let a = pop(&mut stack);
          stack.push(match op {
            Unary::Neg => -a,
            Unary::Not => truth(a == 0.0),
          });
        }
        Instr::Binary(op) => {
          let b = pop(&mut stack);
          let a = pop(&mut stack);
          stack.push(binary(*op, a, b)?);
        }
        Instr::Call(f) => {
          let at = stack.len().saturating_sub(f.arity());
          let v = f.apply(&stack[at..])?;
          stack.truncate(at);
          stack.push(v);
        }
        Instr::JumpIfZero(target) => if pop(&mut stack) == 0.0 { pc = *target },
        Instr::Jump(target) => pc = *target,
      }
    }
    Ok(pop(&mut stack))
  }
}

// The compiler only emits balanced code, so an empty stack cannot occur.
fn pop(stack: &mut Vec<f64>) -> f64 { stack.pop().unwrap_or(0.0) }

fn truth(b: bool) -> f64 { if b { 1.0 } else { 0.0 } }

fn binary(op: Binary, a: f64, b: f64) -> Result<f64> {
  use Binary::*;
  Ok(match op {
    Add => a + b,
    Sub => a - b,
    Mul => a * b,
    Div => { if b == 0.0 { return Err(Error::DivisionByZero) } a / b }
    Rem => {
      let (a, b) = ((a + 0.5).floor() as i64, (b + 0.5).floor() as i64);
      if b == 0 { return Err(Error::DivisionByZero) }
      (a % b) as f64
    }
    Lt => truth(a <  b),
    Le => truth(a <= b),
    Gt => truth(a >  b),
    Ge => truth(a >= b),
    Eq => truth(a == b),
    Ne => truth(a != b),
    And => truth(a != 0.0 && b != 0.0),
    Or  => truth(a != 0.0 || b != 0.0),
  })
}

// ----- Parser ---------------------------------------------------------------

struct Parser<'a> {
  text: &'a str,
  pos: usize,
  code: Vec<Instr>,
}

impl<'a> Parser<'a> {

  fn peek(&self) -> Option<u8> { self.text.as_bytes().get(self.pos).copied() }

  fn eat(&mut self, token: &str) -> bool {
    if self.text[self.pos..].starts_with(token) {
      self.pos += token.len();
      true
    } else { false }
  }

  fn emit(&mut self, instr: Instr) -> usize {
    self.code.push(instr);
    self.code.len() - 1
  }

  fn condition(&mut self, level: usize) -> Result<()> {
    self.logicsum(level)?;
    if self.eat("?") {
      let jump_else = self.emit(Instr::JumpIfZero(0));
      self.logicsum(level)?;
      if !self.eat(":") { return Err(Error::Scan(self.pos)) }
      let jump_end = self.emit(Instr::Jump(0));
      self.code[jump_else] = Instr::JumpIfZero(self.code.len());
      self.logicsum(level)?;
      self.code[jump_end] = Instr::Jump(self.code.len());
    }
    Ok(())
  }

  fn logicsum(&mut self, level: usize) -> Result<()> {
    self.logicproduct(level)?;
    while self.eat("||") {
      self.logicproduct(level)?;
      self.emit(Instr::Binary(Binary::Or));
    }
    Ok(())
  }

  fn logicproduct(&mut self, level: usize) -> Result<()> {
    self.equality(level)?;
    while self.eat("&&") {
      self.equality(level)?;
      self.emit(Instr::Binary(Binary::And));
    }
    Ok(())
  }

  fn equality(&mut self, level: usize) -> Result<()> {
    self.comparison(level)?;
    let op = if self.eat("==") { Binary::Eq }
        else if self.eat("!=") { Binary::Ne }
        else { return Ok(()) };
    self.comparison(level)?;
    self.emit(Instr::Binary(op));
    Ok(())
  }

  fn comparison(&mut self, level: usize) -> Result<()> {
    self.expression(level)?;
    let op = if self.eat("<=") { Binary::Le }
        else if self.eat(">=") { Binary::Ge }
        else if self.eat("<" ) { Binary::Lt }
        else if self.eat(">" ) { Binary::Gt }
        else { return Ok(()) };
    self.expression(level)?;
    self.emit(Instr::Binary(op));
    Ok(())
  }

  fn expression(&mut self, level: usize) -> Result<()> {
    if self.eat("-") {
      self.term(level)?;
      self.emit(Instr::Unary(Unary::Neg));
    } else {
      self.eat("+");
      self.term(level)?;
    }
    loop {
      let op = match self.peek() {
        Some(b'+') => Binary::Add,
        Some(b'-') => Binary::Sub,
        Some(b')') if level == 0 => return Err(Error::BadParenthesis(self.pos)),
        _ => return Ok(()),
      };
      self.pos += 1;
      self.term(level)?;
      self.emit(Instr::Binary(op));
    }
  }

  fn term(&mut self, level: usize) -> Result<()> {
    self.factor0(level)?;
    loop {
      let op = match self.peek() {
        Some(b'*') => Binary::Mul,
        Some(b'/') => Binary::Div,
        Some(b'%') => Binary::Rem,
        _ => return Ok(()),
      };
      self.pos += 1;
      self.factor0(level)?;
      self.emit(Instr::Binary(op));
    }
  }

  fn factor0(&mut self, level: usize) -> Result<()> {
    // `!=` belongs to equality
    if self.peek() == Some(b'!') && !self.text[self.pos..].starts_with("!=") {
      self.pos += 1;
      self.factor1(level)?;
      self.emit(Instr::Unary(Unary::Not));
      Ok(())
    } else {
      self.factor1(level)
    }
  }

  fn factor1(&mut self, level: usize) -> Result<()> {
    self.factor2(level)?;
    while self.eat("_") {
      self.factor2(level)?;
      self.emit(Instr::Binary(Binary::Mul));
    }
    Ok(())
  }

  fn factor2(&mut self, level: usize) -> Result<()> {
    match self.peek() {
      Some(b'(') => {
        self.pos += 1;
        self.condition(level + 1)?;
        if !self.eat(")") { return Err(Error::BadParenthesis(self.pos)) }
      }
      Some(c) if c.is_ascii_digit() || c == b'.' => {
        let value = self.number()?;
        self.emit(Instr::Push(value));
      }
      Some(b'_') => {
        self.pos += 1;
        let name = self.name();
        if name.is_empty() { return Err(Error::Scan(self.pos)) }
        self.emit(Instr::Load(name.to_string()));
      }
      Some(c) if c.is_ascii_alphabetic() => {
        let name = self.name();
        if self.peek() == Some(b'(') {
          self.function(name, level)?;
        } else {
          let value = table::lookup(name).ok_or_else(|| Error::UnknownName(name.to_string()))?;
          self.emit(Instr::Push(value));
        }
      }
      _ => return Err(Error::Scan(self.pos)),
    }
    Ok(())
  }

  fn name(&mut self) -> &'a str {
    let text: &'a str = self.text;
    let start = self.pos;
    let len = text[start..].bytes().take_while(u8::is_ascii_alphanumeric).count();
    self.pos += len;
    &text[start..start + len]
  }

  fn number(&mut self) -> Result<f64> {
    let bytes = self.text.as_bytes();
    let start = self.pos;
    let digits = |mut i: usize| { while i < bytes.len() && bytes[i].is_ascii_digit() { i += 1 } i };
    let mut end = digits(start);
    if bytes.get(end) == Some(&b'.') { end = digits(end + 1) }
    // An exponent needs at least one digit, otherwise `e` starts a name
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
      let mut i = end + 1;
      if matches!(bytes.get(i), Some(b'+' | b'-')) { i += 1 }
      if bytes.get(i).map_or(false, u8::is_ascii_digit) { end = digits(i) }
    }
    self.pos = end;
    self.text[start..end].parse().map_err(|_| Error::Scan(start))
  }

  fn function(&mut self, name: &str, level: usize) -> Result<()> {
    let f = Function::lookup(name).ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
    self.pos += 1; // '('
    let mut got = 0;
    if !self.eat(")") {
      loop {
        self.condition(level + 1)?;
        got += 1;
        if self.eat(",") { continue }
        if self.eat(")") { break }
        return Err(Error::BadParenthesis(self.pos))
      }
    }
    if got != f.arity() {
      return Err(Error::Arity { name: f.name(), expected: f.arity(), got })
    }
    self.emit(Instr::Call(f));
    Ok(())
  }
}

// ----- Context --------------------------------------------------------------

/// Variables and a cache of compiled programs, keyed by their source text
#[derive(Debug, Default)]
pub struct Context {
  variables: HashMap<String, f64>,
  programs: HashMap<String, Program>,
}

impl Context {
  pub fn new() -> Self { Self::default() }

  /// Define or overwrite the variable which expressions refer to as `_name`
  pub fn set(&mut self, name: &str, value: f64) -> &mut Self {
    self.variables.insert(name.to_string(), value);
    self
  }

  pub fn get(&self, name: &str) -> Option<f64> { self.variables.get(name).copied() }

  pub fn str2double(&mut self, text: &str) -> Result<f64> {
    if !self.programs.contains_key(text) {
      self.programs.insert(text.to_string(), Program::compile(text)?);
    }
    match self.programs.get(text) {
      Some(program) => program.run(&self.variables),
      None => Program::compile(text)?.run(&self.variables),
    }
  }

  pub fn cached_programs(&self) -> usize { self.programs.len() }
}

/// Evaluate an expression which uses no variables
pub fn str2double(text: &str) -> Result<f64> {
  Program::compile(text)?.run(&HashMap::new())
}

/// Evaluate an expression and truncate the result towards zero
pub fn str2long(text: &str) -> Result<i64> {
  str2double(text).map(|v| v as i64)
}
