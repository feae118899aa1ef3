//! The instruction set a strategy speaks to the interpreter.

use std::fmt;

use regex::Regex;

use crate::tags::{Terminal, Value};

/// Something to match at the cursor.
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    /// A regex anchored at the cursor. Build with [`Pattern::regex`].
    Regex(Regex),
}

impl Pattern {
    pub fn literal(text: impl Into<String>) -> Self {
        Pattern::Literal(text.into())
    }

    /// Compiles `source` so that it only matches at the start of the input.
    pub fn regex(source: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{})", source)).map(Pattern::Regex)
    }

    /// Number of chars the matcher needs buffered ahead of the cursor.
    ///
    /// `None` means "as much as the match window allows".
    pub(crate) fn lookahead(&self) -> Option<usize> {
        match self {
            Pattern::Literal(text) => Some(text.chars().count()),
            Pattern::Regex(_) => None,
        }
    }

    /// Returns the prefix of `text` this pattern matches, if any.
    pub fn match_prefix<'t>(&self, text: &'t str) -> Option<&'t str> {
        match self {
            Pattern::Literal(literal) => text.starts_with(literal.as_str()).then(|| &text[..literal.len()]),
            Pattern::Regex(re) => re.find(text).filter(|m| m.start() == 0).map(|m| m.as_str()),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(text) => write!(f, "{:?}", text),
            Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl From<&str> for Pattern {
    fn from(text: &str) -> Self {
        Pattern::literal(text)
    }
}

/// Matched text together with the char offsets it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRange {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl TokenRange {
    pub fn new(text: impl Into<String>, start: usize) -> Self {
        let text = text.into();
        let end = start + text.chars().count();
        Self { text, start, end }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// One step of a strategy.
///
/// `Unknown` carries verbs the interpreter does not implement; dispatching it
/// fails the run with [`Error::UnknownInstruction`](crate::Error).
#[derive(Debug, Clone)]
pub enum Instruction {
    Advance(Terminal),
    Match(Pattern),
    Branch,
    Accept,
    Reject,
    Write(String),
    BindAttribute { key: String, value: Value },
    GetState,
    Unknown(String),
}

impl Instruction {
    pub fn verb(&self) -> &str {
        match self {
            Instruction::Advance(_) => "advance",
            Instruction::Match(_) => "match",
            Instruction::Branch => "branch",
            Instruction::Accept => "accept",
            Instruction::Reject => "reject",
            Instruction::Write(_) => "write",
            Instruction::BindAttribute { .. } => "bindAttribute",
            Instruction::GetState => "getState",
            Instruction::Unknown(verb) => verb,
        }
    }
}

impl From<Terminal> for Instruction {
    fn from(terminal: Terminal) -> Self {
        Instruction::Advance(terminal)
    }
}
