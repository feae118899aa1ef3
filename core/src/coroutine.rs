//! Strategies as coroutines.
//!
//! A strategy is an `async` routine that talks to the interpreter through a
//! [`Co`] handle. Each [`Co::call`] parks one [`Instruction`] in a shared
//! slot and suspends; the interpreter notices the parked instruction the next
//! time it polls the strategy, dispatches it, and stores the answer before
//! polling again.
//!
//! ```ignore
//! let strategy = |co: Co<Emitted>, _ctx| async move {
//!     co.advance(Terminal::open("Root")).await;
//!     if co.match_pattern("a").await.is_some() {
//!         co.advance(Terminal::literal("a")).await;
//!     }
//!     co.advance(Terminal::Close).await;
//! };
//! ```
//!
//! A strategy that awaits anything other than its `Co` (say, a channel) makes
//! the interpreter itself pending until that future wakes it.

use core::future::{poll_fn, Future};
use core::pin::Pin;
use core::task::{Context as TaskContext, Poll};
use std::cell::RefCell;
use std::rc::Rc;

use crate::context::Context;
use crate::instruction::{Instruction, Pattern, TokenRange};
use crate::tags::{Terminal, Value};
use crate::view::StateView;

/// Answer to one instruction.
#[derive(Debug, Clone)]
pub enum Resume<O> {
    /// Builder output for `advance`, `write` and `bindAttribute`.
    Output(O),
    Tokens(TokenRange),
    NoMatch,
    State(StateView),
}

impl<O> Resume<O> {
    pub fn into_output(self) -> Option<O> {
        match self {
            Resume::Output(output) => Some(output),
            _ => None,
        }
    }

    pub fn into_tokens(self) -> Option<TokenRange> {
        match self {
            Resume::Tokens(range) => Some(range),
            _ => None,
        }
    }

    pub fn into_state(self) -> Option<StateView> {
        match self {
            Resume::State(view) => Some(view),
            _ => None,
        }
    }
}

struct Exchange<O> {
    instruction: Option<Instruction>,
    resume: Option<Resume<O>>,
}

/// The strategy's side of the exchange.
pub struct Co<O> {
    exchange: Rc<RefCell<Exchange<O>>>,
}

impl<O> Co<O> {
    /// Issues one instruction and waits for the interpreter's answer.
    pub async fn call(&self, instruction: Instruction) -> Resume<O> {
        self.exchange.borrow_mut().instruction = Some(instruction);
        Suspend {
            exchange: &self.exchange,
            parked: false,
        }
        .await
    }

    pub async fn advance(&self, terminal: impl Into<Terminal>) -> Option<O> {
        self.call(Instruction::Advance(terminal.into())).await.into_output()
    }

    /// Non-consuming match at the cursor.
    pub async fn match_pattern(&self, pattern: impl Into<Pattern>) -> Option<TokenRange> {
        self.call(Instruction::Match(pattern.into())).await.into_tokens()
    }

    pub async fn branch(&self) -> Option<StateView> {
        self.call(Instruction::Branch).await.into_state()
    }

    pub async fn accept(&self) -> Option<StateView> {
        self.call(Instruction::Accept).await.into_state()
    }

    pub async fn reject(&self) -> Option<StateView> {
        self.call(Instruction::Reject).await.into_state()
    }

    pub async fn write(&self, text: impl Into<String>) -> Option<O> {
        self.call(Instruction::Write(text.into())).await.into_output()
    }

    pub async fn bind_attribute(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<O> {
        self.call(Instruction::BindAttribute {
            key: key.into(),
            value: value.into(),
        })
        .await
        .into_output()
    }

    pub async fn get_state(&self) -> Option<StateView> {
        self.call(Instruction::GetState).await.into_state()
    }
}

struct Suspend<'a, O> {
    exchange: &'a RefCell<Exchange<O>>,
    parked: bool,
}

impl<O> Future for Suspend<'_, O> {
    type Output = Resume<O>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Resume<O>> {
        if !self.parked {
            self.parked = true;
            return Poll::Pending;
        }
        match self.exchange.borrow_mut().resume.take() {
            Some(resume) => Poll::Ready(resume),
            None => Poll::Pending,
        }
    }
}

pub type LocalBoxFuture<'s> = Pin<Box<dyn Future<Output = ()> + 's>>;

/// What the interpreter gets out of one poll of the strategy.
#[derive(Debug)]
pub enum Step {
    Yielded(Instruction),
    Complete,
}

/// The interpreter's side of the exchange.
pub struct Coroutine<'s, O> {
    future: LocalBoxFuture<'s>,
    exchange: Rc<RefCell<Exchange<O>>>,
    complete: bool,
}

impl<'s, O: 's> Coroutine<'s, O> {
    pub fn new<G, F, Fut>(strategy: F, ctx: &'s Context<G>) -> Self
    where
        F: FnOnce(Co<O>, &'s Context<G>) -> Fut,
        Fut: Future<Output = ()> + 's,
    {
        let exchange = Rc::new(RefCell::new(Exchange {
            instruction: None,
            resume: None,
        }));
        let co = Co {
            exchange: Rc::clone(&exchange),
        };
        Self {
            future: Box::pin(strategy(co, ctx)),
            exchange,
            complete: false,
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn poll_step(&mut self, cx: &mut TaskContext<'_>) -> Poll<Step> {
        if self.complete {
            return Poll::Ready(Step::Complete);
        }
        match self.future.as_mut().poll(cx) {
            Poll::Ready(()) => {
                self.complete = true;
                Poll::Ready(Step::Complete)
            }
            Poll::Pending => match self.exchange.borrow_mut().instruction.take() {
                Some(instruction) => Poll::Ready(Step::Yielded(instruction)),
                None => Poll::Pending,
            },
        }
    }

    /// Waits for the next instruction, or for the strategy to finish.
    pub async fn next(&mut self) -> Step {
        poll_fn(|cx| self.poll_step(cx)).await
    }

    /// Answers the instruction most recently yielded.
    pub fn resume(&mut self, value: Resume<O>) {
        self.exchange.borrow_mut().resume = Some(value);
    }
}

/// A strategy that issues `instructions` in order and ignores the answers.
pub fn script<'s, G: 's, O: 's>(
    instructions: Vec<Instruction>,
) -> impl FnOnce(Co<O>, &'s Context<G>) -> LocalBoxFuture<'s> {
    move |co, _ctx| {
        Box::pin(async move {
            for instruction in instructions {
                co.call(instruction).await;
            }
        })
    }
}
