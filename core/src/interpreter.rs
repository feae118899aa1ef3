//! The instruction interpreter.
//!
//! [`Interpreter`] drives one strategy to completion. Each step pulls the next
//! instruction from the strategy, applies it to the current frame and to the
//! tree builder, and resumes the strategy with the result:
//!
//! ```text
//! strategy --instruction--> dispatch --+--> cursor / spans / balanced
//!    ^                                 +--> tree builder
//!    +-------------- Resume -----------+
//! ```
//!
//! Frames are pushed by `branch` and retired by `accept` or `reject`. The
//! builder branches, accepts and rejects in lockstep, so the frame on top of
//! the stack always describes the builder's current snapshot.

use core::future::Future;
use core::pin::pin;
use core::task::{Context as TaskContext, Poll, Waker};

use tracing::{debug, trace};

use crate::checkpoint::{Checkpoint, FrameId, Stack, Status};
use crate::context::{Context, Grammar};
use crate::coroutine::{Co, Coroutine, Resume, Step};
use crate::instruction::{Instruction, Pattern, TokenRange};
use crate::source::{Cursor, Source};
use crate::spans::{update_spans, Balanced, Phase, SpanStack};
use crate::tags::Terminal;
use crate::tree::{NodeShape, Path, TreeBuilder};
use crate::view::StateView;
use crate::Error;

/// Payload of a syntactic frame.
#[derive(Debug)]
pub struct Frame {
    pub cursor: Cursor,
    pub spans: SpanStack,
    pub balanced: Balanced,
    /// Language of the innermost node that declared one.
    pub language: Option<String>,
}

impl Checkpoint for Frame {
    fn fork(&self) -> Self {
        Frame {
            cursor: self.cursor.branch(),
            spans: self.spans.clone(),
            balanced: self.balanced.clone(),
            language: self.language.clone(),
        }
    }

    fn merge(&mut self, child: Self) {
        self.cursor.accept(child.cursor);
        self.spans = child.spans;
        self.balanced = child.balanced;
        self.language = child.language;
    }

    fn discard(self) {
        self.cursor.reject();
    }
}

/// Runs a strategy against a source, building through `B`.
pub struct Interpreter<'s, G, B: TreeBuilder> {
    ctx: &'s Context<G>,
    builder: B,
    frames: Stack<Frame>,
    frame: FrameId,
    co: Coroutine<'s, B::Output>,
    executed: usize,
}

impl<'s, G, B> Interpreter<'s, G, B>
where
    G: Grammar,
    B: TreeBuilder,
    B::Output: 's,
{
    pub fn new<F, Fut>(ctx: &'s Context<G>, source: Source, builder: B, strategy: F) -> Self
    where
        F: FnOnce(Co<B::Output>, &'s Context<G>) -> Fut,
        Fut: Future<Output = ()> + 's,
    {
        let root = Frame {
            cursor: source.into_cursor(),
            spans: SpanStack::new(ctx.config().initial_span),
            balanced: Balanced::new(),
            language: None,
        };
        Self {
            ctx,
            builder,
            frames: Stack::new(root),
            frame: FrameId::ROOT,
            co: Coroutine::new(strategy, ctx),
            executed: 0,
        }
    }

    #[inline]
    pub fn builder(&self) -> &B {
        &self.builder
    }

    #[inline]
    pub fn instructions_executed(&self) -> usize {
        self.executed
    }

    /// Runs the strategy to completion and returns the builder.
    pub async fn run(mut self) -> Result<B, Error> {
        let ctx = self.ctx;
        let grammar = ctx.grammar().name();
        debug!(grammar, "starting run");
        self.frames.current().cursor.prime().await;

        while let Step::Yielded(instruction) = self.co.next().await {
            self.step(instruction).await?;
        }

        debug!(grammar, instructions = self.executed, "strategy complete");
        Ok(self.builder)
    }

    /// Runs to completion without an executor.
    ///
    /// Fails with [`Error::Stalled`] if the source or the strategy is ever
    /// pending.
    pub fn run_blocking(self) -> Result<B, Error> {
        let mut cx = TaskContext::from_waker(Waker::noop());
        match pin!(self.run()).poll(&mut cx) {
            Poll::Ready(result) => result,
            Poll::Pending => Err(Error::Stalled),
        }
    }

    async fn step(&mut self, instruction: Instruction) -> Result<(), Error> {
        self.executed += 1;
        let limit = self.ctx.config().max_instructions;
        if self.executed > limit {
            return Err(Error::InstructionLimitExceeded {
                executed: self.executed,
                limit,
            });
        }

        trace!(
            verb = instruction.verb(),
            frame = self.frame.index(),
            offset = self.frames.current().cursor.offset(),
            "instruction"
        );
        let resume = self.dispatch(instruction).await?;
        self.co.resume(resume);
        Ok(())
    }

    async fn dispatch(&mut self, instruction: Instruction) -> Result<Resume<B::Output>, Error> {
        match instruction {
            Instruction::Advance(terminal) => self.advance(terminal).await.map(Resume::Output),
            Instruction::Match(pattern) => Ok(match self.guarded_match(&pattern).await {
                Some(range) => Resume::Tokens(range),
                None => Resume::NoMatch,
            }),
            Instruction::Branch => self.branch().map(Resume::State),
            Instruction::Accept => self.accept().map(Resume::State),
            Instruction::Reject => self.reject().map(Resume::State),
            Instruction::Write(text) => self.builder.write(&text).map(Resume::Output),
            Instruction::BindAttribute { key, value } => {
                self.builder.bind_attribute(&key, &value).map(Resume::Output)
            }
            Instruction::GetState => Ok(Resume::State(self.view())),
            Instruction::Unknown(verb) => Err(Error::UnknownInstruction { verb }),
        }
    }

    async fn advance(&mut self, terminal: Terminal) -> Result<B::Output, Error> {
        match &terminal {
            Terminal::Open(tag) => {
                let output = self.builder.advance(&terminal)?;
                let frame = self.frames.current_mut();
                if tag.node_type.is_some() {
                    update_spans(&mut frame.spans, &mut frame.balanced, tag, Phase::Open)?;
                }
                if let Some(language) = &tag.language {
                    frame.language = Some(language.clone());
                }
                Ok(output)
            }
            Terminal::Close => {
                let closing = self.builder.node().map(|node| node.tag().clone());
                let output = self.builder.advance(&terminal)?;

                if !self.builder.path().is_empty() {
                    if let Some(tag) = closing.filter(|tag| tag.node_type.is_some()) {
                        let frame = self.frames.current_mut();
                        update_spans(&mut frame.spans, &mut frame.balanced, &tag, Phase::Close)?;
                    }
                } else {
                    self.finalize().await?;
                }
                Ok(output)
            }
            Terminal::Literal(text) => {
                let Some(range) = self.guarded_match(&Pattern::literal(text.as_str())).await else {
                    return Err(Error::LiteralFailed {
                        literal: text.clone(),
                    });
                };
                self.frames.current_mut().cursor.advance(range.len()).await?;
                self.builder.advance(&terminal)
            }
            Terminal::Gap => {
                let cursor = &mut self.frames.current_mut().cursor;
                cursor.prime().await;
                if cursor.value().is_some() || cursor.done() {
                    return Err(Error::GapFailed);
                }
                if cursor.holding() {
                    cursor.unshift()?;
                } else {
                    cursor.advance(1).await?;
                }
                self.builder.advance(&terminal)
            }
            Terminal::Shift => {
                self.frames.current_mut().cursor.shift()?;
                self.builder.advance(&terminal)
            }
            Terminal::Doctype(_) | Terminal::Reference(_) | Terminal::Null => self.builder.advance(&terminal),
        }
    }

    /// Checks that closing the outermost node left nothing behind.
    async fn finalize(&mut self) -> Result<(), Error> {
        let frame = self.frames.current();
        frame.cursor.prime().await;
        if !frame.cursor.done() {
            return Err(Error::InputNotConsumed);
        }
        if !frame.balanced.is_empty() {
            return Err(Error::UnbalancedAtEnd {
                remaining: frame.balanced.len(),
            });
        }
        debug!(offset = frame.cursor.offset(), "document closed");
        Ok(())
    }

    /// Matches `pattern` at the cursor without consuming input.
    ///
    /// Inside a guarded span the searched text ends just before the first
    /// occurrence of the guard past the first char.
    async fn guarded_match(&self, pattern: &Pattern) -> Option<TokenRange> {
        let window = pattern.lookahead().unwrap_or(self.ctx.config().match_window);
        let frame = self.frames.current();
        let text = frame.cursor.peek_text(window).await;

        let searched = match frame.spans.guard().filter(|guard| !guard.is_empty()) {
            Some(guard) => {
                let first = text.chars().next().map_or(0, char::len_utf8);
                match text[first..].find(guard) {
                    Some(idx) => &text[..first + idx],
                    None => text.as_str(),
                }
            }
            None => text.as_str(),
        };

        pattern
            .match_prefix(searched)
            .map(|matched| TokenRange::new(matched, frame.cursor.offset()))
    }

    fn branch(&mut self) -> Result<StateView, Error> {
        let depth = self.frames.depth() + 1;
        let limit = self.ctx.config().max_branch_depth;
        if depth > limit {
            return Err(Error::BranchLimitExceeded { depth, limit });
        }

        let had_node = self.builder.node().is_some();
        self.builder.branch()?;
        self.frame = self.frames.branch(self.frame)?;
        if !had_node {
            self.frames.current_mut().language = None;
        }

        debug!(frame = self.frame.index(), depth, "branch");
        Ok(self.view())
    }

    fn accept(&mut self) -> Result<StateView, Error> {
        if self.frame == FrameId::ROOT {
            return Err(Error::AcceptedRoot);
        }
        let accepted = self.frame;
        self.builder.accept()?;
        self.frame = self.frames.accept(accepted)?;

        debug!(frame = accepted.index(), parent = self.frame.index(), "accept");
        Ok(self.view())
    }

    fn reject(&mut self) -> Result<StateView, Error> {
        if self.frame == FrameId::ROOT {
            return Err(Error::RejectedRoot);
        }
        let rejected = self.frame;
        let rejected_path = self.builder.path();
        self.builder.reject()?;
        self.frame = self.frames.reject(rejected)?;

        debug!(frame = rejected.index(), parent = self.frame.index(), "reject");
        self.repair(&rejected_path)?;
        Ok(self.view())
    }

    /// Backfills a property the rejected branch was about to bind.
    ///
    /// When a branch opened a node under a reference and was then rejected,
    /// the parent node would otherwise never learn that the property exists.
    /// It is bound to null instead, so every node built from one grammar
    /// production has the same property names.
    fn repair(&mut self, rejected: &Path) -> Result<(), Error> {
        let path = self.builder.path();
        if path.is_empty() || rejected.depth() <= path.depth() {
            return Ok(());
        }
        let depth = path.depth();

        let did_shift = self.builder.node().is_some()
            && rejected.at(depth).map(|segment| segment.id) != path.at(depth).map(|segment| segment.id);
        if did_shift {
            return Ok(());
        }

        let after_reference = matches!(self.builder.last_result(), Some(Terminal::Reference(_)));
        let offset = if after_reference { 0 } else { 1 };
        let Some(reference) = rejected
            .at((depth + offset).min(rejected.depth()))
            .and_then(|segment| segment.reference.clone())
        else {
            return Ok(());
        };

        let Some(low_node) = self.builder.node().or_else(|| self.builder.parent_node()) else {
            return Ok(());
        };
        let bound = low_node.has_property(&reference.name);
        let exempt = low_node.tag().flags.exempt_from_repair();
        let pending = matches!(
            self.builder.last_result(),
            Some(Terminal::Reference(last)) if last.name == reference.name
        );
        if bound || pending {
            return Ok(());
        }
        if exempt {
            debug!(property = %reference, "repair skipped inside trivia");
            return Ok(());
        }

        debug!(property = %reference, "repairing rejected branch");
        self.builder.advance(&Terminal::Reference(reference))?;
        self.builder.advance(&Terminal::Null)?;
        Ok(())
    }

    /// Snapshot of the current frame.
    pub fn view(&self) -> StateView {
        let frame = self.frames.current();
        let path = self.builder.path();
        StateView {
            id: self.frame,
            status: self.frames.status(self.frame).unwrap_or(Status::Suspended),
            depth: self.frames.depth_of(self.frame).unwrap_or_default(),
            parent: self.frames.parent(self.frame),
            lexical_context: frame.spans.lexical_context().to_owned(),
            spans: frame.spans.names().map(str::to_owned).collect(),
            balanced: frame.balanced.len(),
            offset: frame.cursor.offset(),
            holding: frame.cursor.holding(),
            done: frame.cursor.done(),
            language: frame.language.clone(),
            node_type: self.builder.node().and_then(|node| node.tag().node_type.clone()),
            path_depth: (!path.is_empty()).then(|| path.depth()),
            last_result: self.builder.last_result().cloned(),
        }
    }
}
