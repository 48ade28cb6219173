//! A small Yul interpreter for running generated functions in tests.
//!
//! Supports the subset of Yul and of the EVM builtins the generators emit. Every function
//! definition found anywhere in the code is callable by name.

use alloy_primitives::{U256, keccak256};
use sable_data_structures::map::FxHashMap;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    Number(U256),
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Assign,
    Arrow,
}

fn tokenize(code: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = code.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        let single = match c {
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(token);
            chars.next();
        } else if c.is_whitespace() {
            chars.next();
        } else if c == ':' || c == '-' {
            chars.next();
            let next = chars.next().map(|(_, c)| c);
            tokens.push(match (c, next) {
                (':', Some('=')) => Token::Assign,
                ('-', Some('>')) => Token::Arrow,
                _ => panic!("unexpected character at {start}"),
            });
        } else {
            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.')) {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            assert!(end > start, "unexpected character {c:?} at {start}");
            let word = &code[start..end];
            if c.is_ascii_digit() {
                tokens.push(Token::Number(word.parse().expect("invalid number")));
            } else {
                tokens.push(Token::Ident(word.to_string()));
            }
        }
    }
    tokens
}

#[derive(Clone, Debug)]
enum Expr {
    Literal(U256),
    Var(String),
    Call(String, Vec<Expr>),
}

#[derive(Clone, Debug)]
enum Stmt {
    Block(Vec<Stmt>),
    Let(Vec<String>, Option<Expr>),
    Assign(Vec<String>, Expr),
    If(Expr, Vec<Stmt>),
    Switch(Expr, Vec<(Option<U256>, Vec<Stmt>)>),
    For(Vec<Stmt>, Expr, Vec<Stmt>, Vec<Stmt>),
    Expr(Expr),
}

#[derive(Debug)]
struct Function {
    params: Vec<String>,
    returns: Vec<String>,
    body: Vec<Stmt>,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    functions: FxHashMap<String, Rc<Function>>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(ident)) if ident == keyword)
    }

    fn next(&mut self) -> Token {
        let token = self.tokens.get(self.pos).cloned().expect("unexpected end of input");
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) {
        let token = self.next();
        assert_eq!(token, expected, "at token {}", self.pos - 1);
    }

    fn ident(&mut self) -> String {
        match self.next() {
            Token::Ident(ident) => ident,
            token => panic!("expected identifier, found {token:?}"),
        }
    }

    fn idents(&mut self) -> Vec<String> {
        let mut idents = vec![self.ident()];
        while self.peek() == Some(&Token::Comma) {
            self.next();
            idents.push(self.ident());
        }
        idents
    }

    fn function(&mut self) {
        assert_eq!(self.ident(), "function");
        let name = self.ident();
        self.expect(Token::LParen);
        let params = if self.peek() == Some(&Token::RParen) { Vec::new() } else { self.idents() };
        self.expect(Token::RParen);
        let returns = if self.peek() == Some(&Token::Arrow) {
            self.next();
            self.idents()
        } else {
            Vec::new()
        };
        let body = self.block();
        let function = Rc::new(Function { params, returns, body });
        let previous = self.functions.insert(name.clone(), function);
        assert!(previous.is_none(), "function {name} defined twice");
    }

    fn block(&mut self) -> Vec<Stmt> {
        self.expect(Token::LBrace);
        let mut stmts = Vec::new();
        while self.peek() != Some(&Token::RBrace) {
            if let Some(stmt) = self.stmt() {
                stmts.push(stmt);
            }
        }
        self.next();
        stmts
    }

    fn stmt(&mut self) -> Option<Stmt> {
        if self.peek() == Some(&Token::LBrace) {
            return Some(Stmt::Block(self.block()));
        }
        let Some(Token::Ident(keyword)) = self.peek().cloned() else {
            panic!("unexpected token {:?}", self.peek());
        };
        Some(match keyword.as_str() {
            "function" => {
                self.function();
                return None;
            }
            "let" => {
                self.next();
                let names = self.idents();
                let value = (self.peek() == Some(&Token::Assign)).then(|| {
                    self.next();
                    self.expr()
                });
                Stmt::Let(names, value)
            }
            "if" => {
                self.next();
                let cond = self.expr();
                Stmt::If(cond, self.block())
            }
            "switch" => {
                self.next();
                let value = self.expr();
                let mut cases = Vec::new();
                loop {
                    if self.peek_keyword("case") {
                        self.next();
                        let Token::Number(n) = self.next() else { panic!("expected case literal") };
                        cases.push((Some(n), self.block()));
                    } else if self.peek_keyword("default") {
                        self.next();
                        cases.push((None, self.block()));
                    } else {
                        break;
                    }
                }
                Stmt::Switch(value, cases)
            }
            "for" => {
                self.next();
                let init = self.block();
                let cond = self.expr();
                let post = self.block();
                Stmt::For(init, cond, post, self.block())
            }
            _ if matches!(self.tokens.get(self.pos + 1), Some(Token::Assign | Token::Comma)) => {
                let names = self.idents();
                self.expect(Token::Assign);
                Stmt::Assign(names, self.expr())
            }
            _ => Stmt::Expr(self.expr()),
        })
    }

    fn expr(&mut self) -> Expr {
        match self.next() {
            Token::Number(n) => Expr::Literal(n),
            Token::Ident(name) if self.peek() == Some(&Token::LParen) => {
                self.next();
                let mut args = Vec::new();
                while self.peek() != Some(&Token::RParen) {
                    args.push(self.expr());
                    if self.peek() == Some(&Token::Comma) {
                        self.next();
                    }
                }
                self.next();
                Expr::Call(name, args)
            }
            Token::Ident(name) => Expr::Var(name),
            token => panic!("unexpected token {token:?}"),
        }
    }
}

/// Execution stopped early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Halt {
    Revert,
    Invalid,
}

type Frame = FxHashMap<String, U256>;

/// EVM state and the functions of a piece of Yul code.
pub(super) struct Interpreter {
    functions: FxHashMap<String, Rc<Function>>,
    pub(super) memory: Vec<u8>,
    pub(super) storage: FxHashMap<U256, U256>,
    pub(super) calldata: Vec<u8>,
}

impl Interpreter {
    /// Parses a sequence of function definitions.
    pub(super) fn new(code: &str) -> Self {
        let mut parser = Parser { tokens: tokenize(code), pos: 0, functions: FxHashMap::default() };
        while parser.peek().is_some() {
            parser.function();
        }
        Self {
            functions: parser.functions,
            memory: Vec::new(),
            storage: FxHashMap::default(),
            calldata: Vec::new(),
        }
    }

    pub(super) fn call(&mut self, name: &str, args: &[U256]) -> Result<Vec<U256>, Halt> {
        let function = self.functions.get(name).cloned().unwrap_or_else(|| panic!("no {name}"));
        assert_eq!(function.params.len(), args.len(), "arguments of {name}");
        let mut frame: Frame = function.params.iter().cloned().zip(args.iter().copied()).collect();
        for ret in &function.returns {
            frame.insert(ret.clone(), U256::ZERO);
        }
        self.exec_block(&mut frame, &function.body)?;
        Ok(function.returns.iter().map(|ret| frame[ret]).collect())
    }

    /// Calls a function returning a single value.
    pub(super) fn call1(&mut self, name: &str, args: &[U256]) -> Result<U256, Halt> {
        let values = self.call(name, args)?;
        assert_eq!(values.len(), 1, "{name} returns {} values", values.len());
        Ok(values[0])
    }

    pub(super) fn mload(&mut self, offset: usize) -> U256 {
        self.expand(offset, 32);
        U256::from_be_slice(&self.memory[offset..offset + 32])
    }

    pub(super) fn mstore(&mut self, offset: usize, value: U256) {
        self.expand(offset, 32);
        self.memory[offset..offset + 32].copy_from_slice(&value.to_be_bytes::<32>());
    }

    pub(super) fn write_memory(&mut self, offset: usize, bytes: &[u8]) {
        self.expand(offset, bytes.len());
        self.memory[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn expand(&mut self, offset: usize, len: usize) {
        let end = (offset + len).div_ceil(32) * 32;
        if self.memory.len() < end {
            self.memory.resize(end, 0);
        }
    }

    fn exec_block(&mut self, frame: &mut Frame, stmts: &[Stmt]) -> Result<(), Halt> {
        for stmt in stmts {
            self.exec(frame, stmt)?;
        }
        Ok(())
    }

    fn exec(&mut self, frame: &mut Frame, stmt: &Stmt) -> Result<(), Halt> {
        match stmt {
            Stmt::Block(stmts) => self.exec_block(frame, stmts)?,
            Stmt::Let(names, None) => {
                for name in names {
                    frame.insert(name.clone(), U256::ZERO);
                }
            }
            Stmt::Let(names, Some(expr)) | Stmt::Assign(names, expr) => {
                let values = self.eval(frame, expr)?;
                assert_eq!(names.len(), values.len(), "assignment to {names:?}");
                for (name, value) in names.iter().zip(values) {
                    frame.insert(name.clone(), value);
                }
            }
            Stmt::If(cond, body) => {
                if !self.eval1(frame, cond)?.is_zero() {
                    self.exec_block(frame, body)?;
                }
            }
            Stmt::Switch(value, cases) => {
                let value = self.eval1(frame, value)?;
                let case = cases
                    .iter()
                    .find(|(literal, _)| *literal == Some(value))
                    .or_else(|| cases.iter().find(|(literal, _)| literal.is_none()));
                if let Some((_, body)) = case {
                    self.exec_block(frame, body)?;
                }
            }
            Stmt::For(init, cond, post, body) => {
                self.exec_block(frame, init)?;
                while !self.eval1(frame, cond)?.is_zero() {
                    self.exec_block(frame, body)?;
                    self.exec_block(frame, post)?;
                }
            }
            Stmt::Expr(expr) => {
                let values = self.eval(frame, expr)?;
                assert!(values.is_empty(), "discarded values of {expr:?}");
            }
        }
        Ok(())
    }

    fn eval1(&mut self, frame: &mut Frame, expr: &Expr) -> Result<U256, Halt> {
        let values = self.eval(frame, expr)?;
        assert_eq!(values.len(), 1, "{expr:?} is not a single value");
        Ok(values[0])
    }

    fn eval(&mut self, frame: &mut Frame, expr: &Expr) -> Result<Vec<U256>, Halt> {
        let (name, args) = match expr {
            Expr::Literal(value) => return Ok(vec![*value]),
            Expr::Var(name) => {
                return Ok(vec![*frame.get(name).unwrap_or_else(|| panic!("undefined {name}"))]);
            }
            Expr::Call(name, args) => (name, args),
        };
        // Arguments are evaluated right to left.
        let mut values = Vec::with_capacity(args.len());
        for arg in args.iter().rev() {
            values.push(self.eval1(frame, arg)?);
        }
        values.reverse();
        if self.functions.contains_key(name.as_str()) {
            return self.call(name, &values);
        }
        self.builtin(name, &values)
    }

    fn builtin(&mut self, name: &str, args: &[U256]) -> Result<Vec<U256>, Halt> {
        let arg = |i: usize| args[i];
        let bool = |b: bool| U256::from(b as u8);
        let value = match name {
            "add" => arg(0).wrapping_add(arg(1)),
            "sub" => arg(0).wrapping_sub(arg(1)),
            "mul" => arg(0).wrapping_mul(arg(1)),
            "div" => arg(0).checked_div(arg(1)).unwrap_or_default(),
            "mod" => arg(0).checked_rem(arg(1)).unwrap_or_default(),
            "sdiv" => sdiv(arg(0), arg(1)),
            "exp" => arg(0).wrapping_pow(arg(1)),
            "not" => !arg(0),
            "lt" => bool(arg(0) < arg(1)),
            "gt" => bool(arg(0) > arg(1)),
            "slt" => bool((arg(0) ^ SIGN_BIT) < (arg(1) ^ SIGN_BIT)),
            "sgt" => bool((arg(0) ^ SIGN_BIT) > (arg(1) ^ SIGN_BIT)),
            "eq" => bool(arg(0) == arg(1)),
            "iszero" => bool(arg(0).is_zero()),
            "and" => arg(0) & arg(1),
            "or" => arg(0) | arg(1),
            "xor" => arg(0) ^ arg(1),
            "byte" => match usize::try_from(arg(0)) {
                Ok(n) if n < 32 => U256::from(arg(1).byte(31 - n)),
                _ => U256::ZERO,
            },
            "shl" => shift(arg(0)).map_or(U256::ZERO, |s| arg(1) << s),
            "shr" => shift(arg(0)).map_or(U256::ZERO, |s| arg(1) >> s),
            "sar" => sar(arg(0), arg(1)),
            "signextend" => signextend(arg(0), arg(1)),
            "keccak256" => {
                let (offset, len) = (arg(0).to::<usize>(), arg(1).to::<usize>());
                self.expand(offset, len);
                U256::from_be_bytes(keccak256(&self.memory[offset..offset + len]).0)
            }
            "mload" => self.mload(arg(0).to()),
            "sload" => self.storage.get(&arg(0)).copied().unwrap_or_default(),
            "calldataload" => {
                let offset = arg(0).to::<usize>();
                let mut word = [0u8; 32];
                for (i, byte) in word.iter_mut().enumerate() {
                    *byte = self.calldata.get(offset + i).copied().unwrap_or(0);
                }
                U256::from_be_bytes(word)
            }
            "mstore" | "mstore8" | "sstore" | "calldatacopy" | "pop" => {
                self.effect(name, args);
                return Ok(Vec::new());
            }
            "revert" => return Err(Halt::Revert),
            "invalid" => return Err(Halt::Invalid),
            _ => panic!("unknown builtin {name}"),
        };
        Ok(vec![value])
    }

    fn effect(&mut self, name: &str, args: &[U256]) {
        match name {
            "mstore" => self.mstore(args[0].to(), args[1]),
            "mstore8" => self.write_memory(args[0].to(), &[args[1].byte(0)]),
            "sstore" => {
                self.storage.insert(args[0], args[1]);
            }
            "calldatacopy" => {
                let (dst, src, len) = (args[0].to::<usize>(), args[1].to::<usize>(), args[2].to::<usize>());
                let bytes: Vec<u8> =
                    (0..len).map(|i| self.calldata.get(src + i).copied().unwrap_or(0)).collect();
                self.write_memory(dst, &bytes);
            }
            _ => {}
        }
    }
}

const SIGN_BIT: U256 = U256::from_limbs([0, 0, 0, 1 << 63]);

fn shift(amount: U256) -> Option<usize> {
    usize::try_from(amount).ok().filter(|&s| s < 256)
}

fn is_negative(value: U256) -> bool {
    value.bit(255)
}

fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::ZERO;
    }
    let abs = |v: U256| if is_negative(v) { v.wrapping_neg() } else { v };
    let quotient = abs(a) / abs(b);
    if is_negative(a) != is_negative(b) { quotient.wrapping_neg() } else { quotient }
}

fn sar(amount: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    match shift(amount) {
        Some(s) if negative => (value >> s) | !(U256::MAX >> s),
        Some(s) => value >> s,
        None if negative => U256::MAX,
        None => U256::ZERO,
    }
}

fn signextend(byte: U256, value: U256) -> U256 {
    match usize::try_from(byte) {
        Ok(b) if b < 31 => {
            let bit = b * 8 + 7;
            let mask = (U256::from(1) << (bit + 1)) - U256::from(1);
            if value.bit(bit) { value | !mask } else { value & mask }
        }
        _ => value,
    }
}

mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let code = "
            function f(a, b) -> r, s {
                let t := add(a, b)
                switch t
                case 3 { r := 1 }
                default { r := 2 }
                for { let i := 0 } lt(i, 4) { i := add(i, 1) } { s := add(s, i) }
            }
            function neg() -> r { r := sar(4, not(0x0f)) }
        ";
        let mut interp = Interpreter::new(code);
        let values = interp.call("f", &[U256::from(1), U256::from(2)]);
        assert_eq!(values, Ok(vec![U256::from(1), U256::from(6)]));
        assert_eq!(interp.call1("neg", &[]), Ok(U256::MAX));
        assert_eq!(signextend(U256::ZERO, U256::from(0xff)), U256::MAX);
        assert_eq!(sdiv(U256::MAX, U256::from(1)), U256::MAX);
    }
}
