//! The lexical checkpoint level.
//!
//! A [`Tokenizer`] runs the same branch/accept/reject protocol as the
//! syntactic interpreter, over a smaller payload: the last token produced,
//! the text matched so far in the current attempt, and the lexical contexts.

use crate::checkpoint::{Checkpoint, FrameId, Stack, Status};
use crate::config::ParseConfig;
use crate::spans::{Span, SpanStack};
use crate::Error;

/// Which checkpoint level a view belongs to.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Production {
    Token,
    Node,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub node_type: String,
    pub text: String,
}

impl Token {
    pub const BOF: &'static str = "BOF";

    pub fn new(node_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            text: text.into(),
        }
    }

    /// Marker token standing before the first real token.
    pub fn bof() -> Self {
        Self::new(Self::BOF, "")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalState {
    pub last_token: Token,
    /// Text matched by the current attempt.
    pub matched: String,
    pub spans: SpanStack,
}

impl LexicalState {
    pub fn new(initial_span: &str) -> Self {
        Self {
            last_token: Token::bof(),
            matched: String::new(),
            spans: SpanStack::new(initial_span),
        }
    }
}

impl Checkpoint for LexicalState {
    fn fork(&self) -> Self {
        self.clone()
    }

    fn merge(&mut self, child: Self) {
        self.last_token = child.last_token;
        self.matched = child.matched;
        self.spans = child.spans;
    }
}

/// Snapshot of a lexical frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalView {
    pub id: FrameId,
    pub production: Production,
    pub depth: usize,
    pub parent: Option<FrameId>,
    pub status: Status,
    pub last_token: Token,
    pub lexical_context: String,
}

/// Drives a stack of [`LexicalState`] frames.
///
/// This is a standalone driver for lexical-level strategies. The
/// [`Interpreter`](crate::Interpreter) keeps its own syntactic frames and never
/// creates one.
#[derive(Debug)]
pub struct Tokenizer {
    stack: Stack<LexicalState>,
    frame: FrameId,
}

impl Tokenizer {
    pub fn new(config: &ParseConfig) -> Self {
        Self {
            stack: Stack::new(LexicalState::new(config.initial_span)),
            frame: FrameId::ROOT,
        }
    }

    #[inline]
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    #[inline]
    pub fn state(&self) -> &LexicalState {
        self.stack.current()
    }

    pub fn branch(&mut self) -> Result<LexicalView, Error> {
        self.frame = self.stack.branch(self.frame)?;
        Ok(self.view())
    }

    pub fn accept(&mut self) -> Result<LexicalView, Error> {
        self.frame = self.stack.accept(self.frame)?;
        Ok(self.view())
    }

    pub fn reject(&mut self) -> Result<LexicalView, Error> {
        self.frame = self.stack.reject(self.frame)?;
        Ok(self.view())
    }

    pub fn push_lexical_context(&mut self, name: impl Into<String>) {
        self.stack.current_mut().spans.push(Span::new(name));
    }

    pub fn pop_lexical_context(&mut self) -> Result<String, Error> {
        self.stack.current_mut().spans.pop().map(|span| span.name)
    }

    /// Records a produced token in the current attempt.
    pub fn record(&mut self, token: Token) {
        let state = self.stack.current_mut();
        state.matched.push_str(&token.text);
        state.last_token = token;
    }

    pub fn view(&self) -> LexicalView {
        let state = self.stack.current();
        LexicalView {
            id: self.frame,
            production: Production::Token,
            depth: self.stack.depth_of(self.frame).unwrap_or_default(),
            parent: self.stack.parent(self.frame),
            status: self.stack.status(self.frame).unwrap_or(Status::Suspended),
            last_token: state.last_token.clone(),
            lexical_context: state.spans.lexical_context().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(&ParseConfig::DEFAULT)
    }

    #[test]
    fn test_starts_at_bof() {
        let view = tokenizer().view();
        assert_eq!(view.last_token, Token::bof());
        assert_eq!(view.lexical_context, "Bare");
        assert_eq!(view.status, Status::Suspended);
        assert_eq!(view.production, Production::Token);
        assert_eq!(view.depth, 0);
    }

    #[test]
    fn test_accept_carries_match() {
        let mut tok = tokenizer();
        let view = tok.branch().unwrap();
        assert_eq!(view.status, Status::Active);
        assert_eq!(view.parent, Some(FrameId::ROOT));

        tok.record(Token::new("Identifier", "foo"));
        tok.record(Token::new("Punctuator", "("));
        tok.push_lexical_context("Args");

        let view = tok.accept().unwrap();
        assert_eq!(view.id, FrameId::ROOT);
        assert_eq!(view.last_token, Token::new("Punctuator", "("));
        assert_eq!(view.lexical_context, "Args");
        assert_eq!(tok.state().matched, "foo(");
    }

    #[test]
    fn test_reject_forgets_match() {
        let mut tok = tokenizer();
        tok.record(Token::new("Identifier", "a"));
        tok.branch().unwrap();
        tok.record(Token::new("Identifier", "b"));
        tok.push_lexical_context("String");

        let view = tok.reject().unwrap();
        assert_eq!(view.last_token, Token::new("Identifier", "a"));
        assert_eq!(view.lexical_context, "Bare");
        assert_eq!(tok.state().matched, "a");
    }

    #[test]
    fn test_pop_lexical_context() {
        let mut tok = tokenizer();
        tok.push_lexical_context("String");
        assert_eq!(tok.pop_lexical_context(), Ok("String".to_owned()));
        assert_eq!(tok.pop_lexical_context(), Err(Error::SpanUnderflow));
    }

    #[test]
    fn test_root_is_protected() {
        let mut tok = tokenizer();
        assert_eq!(tok.accept().unwrap_err(), Error::AcceptedRoot);
        assert_eq!(tok.reject().unwrap_err(), Error::RejectedRoot);
    }
}
