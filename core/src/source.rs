//! Forkable cursors over possibly-streamed input.
//!
//! All cursors forked from one [`Source`] share a single append-only buffer of
//! [`Unit`]s. A fork only records its own offset and hold state, so branching
//! is cheap and a fork never observes another fork's reads. When the buffer
//! runs dry, the cursor pulls the next [`Chunk`] from the source's [`Feed`],
//! which may be pending for streamed input.
//!
//! # Example
//!
//! ```ignore
//! let mut cursor = Source::from_text("ab").into_cursor();
//! cursor.prime().await;
//!
//! let mut fork = cursor.branch();
//! fork.advance(1).await?;
//! assert_eq!(cursor.value(), Some('a'));
//!
//! cursor.accept(fork);
//! assert_eq!(cursor.value(), Some('b'));
//! ```

use core::fmt;
use core::future::poll_fn;
use core::task::{Context, Poll};
use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

/// One unit of input.
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Char(char),
    /// Embedded content the text does not spell out, consumed by a gap tag.
    Gap,
}

/// A batch of units delivered by a [`Feed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    units: Vec<Unit>,
}

impl Chunk {
    pub fn from_units(units: Vec<Unit>) -> Self {
        Self { units }
    }

    /// A chunk holding a single gap.
    pub fn gap() -> Self {
        Self {
            units: vec![Unit::Gap],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Self {
            units: text.chars().map(Unit::Char).collect(),
        }
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

/// Errors raised by cursor operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Tried to move past the end of exhausted input.
    #[error("cannot advance {requested} units from offset {offset}: input ends at {len}")]
    PastEnd {
        offset: usize,
        requested: usize,
        len: usize,
    },

    /// A synchronous advance needed input that has not been buffered yet.
    #[error("advance needs input that has not arrived yet")]
    NeedsInput,

    #[error("cursor is already holding a unit")]
    AlreadyHolding,

    #[error("cursor is not holding a unit")]
    NotHolding,
}

/// Supplier of input chunks for a streamed [`Source`].
///
/// `Poll::Ready(None)` marks the end of input.
pub trait Feed {
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Chunk>>;
}

struct Buffer {
    units: Vec<Unit>,
    /// `None` once the feed has reported the end of input.
    feed: Option<Box<dyn Feed>>,
}

impl Buffer {
    #[inline]
    fn exhausted(&self) -> bool {
        self.feed.is_none()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("buffered", &self.units.len())
            .field("exhausted", &self.exhausted())
            .finish()
    }
}

/// Raw input, before any cursor has been taken over it.
#[derive(Debug)]
pub struct Source {
    buffer: Buffer,
}

impl Source {
    /// Fully buffered text.
    pub fn from_text(text: &str) -> Self {
        Self::from_units(Chunk::from(text).units)
    }

    /// Fully buffered units, possibly containing gaps.
    pub fn from_units(units: Vec<Unit>) -> Self {
        Self {
            buffer: Buffer { units, feed: None },
        }
    }

    /// Input pulled from `feed` as the cursor needs it.
    pub fn from_feed(feed: impl Feed + 'static) -> Self {
        Self {
            buffer: Buffer {
                units: Vec::new(),
                feed: Some(Box::new(feed)),
            },
        }
    }

    /// Input pulled from any chunk stream.
    #[cfg(feature = "futures")]
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: futures_core::Stream<Item = Chunk> + 'static,
    {
        Self::from_feed(stream_impl::StreamFeed(Box::pin(stream)))
    }

    /// Input received over a tokio channel. Dropping every sender ends input.
    #[cfg(feature = "tokio")]
    pub fn from_receiver(rx: ::tokio::sync::mpsc::Receiver<Chunk>) -> Self {
        Self::from_feed(tokio_impl::ReceiverFeed(rx))
    }

    /// The root cursor, positioned before the first unit.
    pub fn into_cursor(self) -> Cursor {
        Cursor {
            buffer: Rc::new(RefCell::new(self.buffer)),
            offset: 0,
            holding: false,
        }
    }
}

/// A position over a shared input buffer.
///
/// `value()` and `done()` only reflect units already buffered; call
/// [`Cursor::prime`] (or any async advance, which primes as a side effect)
/// before relying on them with streamed input.
#[derive(Debug)]
pub struct Cursor {
    buffer: Rc<RefCell<Buffer>>,
    offset: usize,
    holding: bool,
}

impl Cursor {
    /// Number of units consumed so far.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether a shifted unit is being held.
    #[inline]
    pub fn holding(&self) -> bool {
        self.holding
    }

    /// The char under the cursor, or `None` at a gap, while holding, or at
    /// the end of buffered input.
    pub fn value(&self) -> Option<char> {
        if self.holding {
            return None;
        }
        match self.buffer.borrow().units.get(self.offset) {
            Some(Unit::Char(c)) => Some(*c),
            _ => None,
        }
    }

    /// Whether the unit under the cursor is a gap.
    pub fn at_gap(&self) -> bool {
        !self.holding && matches!(self.buffer.borrow().units.get(self.offset), Some(Unit::Gap))
    }

    /// True once every unit has been consumed and nothing is held.
    pub fn done(&self) -> bool {
        let buffer = self.buffer.borrow();
        !self.holding && buffer.exhausted() && self.offset >= buffer.units.len()
    }

    fn poll_fill(&self, cx: &mut Context<'_>, upto: usize) -> Poll<()> {
        let mut guard = self.buffer.borrow_mut();
        let buffer = &mut *guard;
        while buffer.units.len() < upto {
            let Some(feed) = buffer.feed.as_mut() else {
                break;
            };
            match feed.poll_chunk(cx) {
                Poll::Ready(Some(chunk)) => buffer.units.extend(chunk.units),
                Poll::Ready(None) => buffer.feed = None,
                Poll::Pending => return Poll::Pending,
            }
        }
        Poll::Ready(())
    }

    /// Waits until `upto` units are buffered or the input ends.
    pub async fn fill(&self, upto: usize) {
        poll_fn(|cx| self.poll_fill(cx, upto)).await
    }

    /// Buffers the unit under the cursor so `value()` and `done()` are exact.
    pub async fn prime(&self) {
        self.fill(self.offset + 1).await
    }

    /// Consumes `n` units, waiting for streamed input when necessary.
    pub async fn advance(&mut self, n: usize) -> Result<(), SourceError> {
        self.fill(self.offset + n + 1).await;
        self.try_advance(n)
    }

    /// Consumes `n` already-buffered units.
    pub fn try_advance(&mut self, n: usize) -> Result<(), SourceError> {
        let buffer = self.buffer.borrow();
        let len = buffer.units.len();
        if self.offset + n > len {
            return Err(if buffer.exhausted() {
                SourceError::PastEnd {
                    offset: self.offset,
                    requested: n,
                    len,
                }
            } else {
                SourceError::NeedsInput
            });
        }
        drop(buffer);
        self.offset += n;
        Ok(())
    }

    /// Up to `n` chars from the cursor, stopping early at a gap.
    ///
    /// Empty while holding.
    pub async fn peek_text(&self, n: usize) -> String {
        self.fill(self.offset + n).await;
        if self.holding {
            return String::new();
        }
        let buffer = self.buffer.borrow();
        buffer
            .units
            .iter()
            .skip(self.offset)
            .take(n)
            .map_while(|unit| match unit {
                Unit::Char(c) => Some(*c),
                Unit::Gap => None,
            })
            .collect()
    }

    /// Holds one unit on behalf of a shifted node.
    pub fn shift(&mut self) -> Result<(), SourceError> {
        if self.holding {
            return Err(SourceError::AlreadyHolding);
        }
        self.holding = true;
        Ok(())
    }

    /// Releases the held unit.
    pub fn unshift(&mut self) -> Result<(), SourceError> {
        if !self.holding {
            return Err(SourceError::NotHolding);
        }
        self.holding = false;
        Ok(())
    }

    /// An independent cursor at the same position.
    pub fn branch(&self) -> Cursor {
        Cursor {
            buffer: Rc::clone(&self.buffer),
            offset: self.offset,
            holding: self.holding,
        }
    }

    /// Adopts the position of a fork taken from this cursor.
    pub fn accept(&mut self, child: Cursor) {
        debug_assert!(Rc::ptr_eq(&self.buffer, &child.buffer));
        self.offset = child.offset;
        self.holding = child.holding;
    }

    /// Discards this cursor.
    pub fn reject(self) {}
}

#[cfg(feature = "futures")]
mod stream_impl {
    use super::*;
    use core::pin::Pin;
    use futures_core::Stream;

    pub(super) struct StreamFeed<S>(pub(super) Pin<Box<S>>);

    impl<S: Stream<Item = Chunk>> Feed for StreamFeed<S> {
        fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Chunk>> {
            self.0.as_mut().poll_next(cx)
        }
    }
}

#[cfg(feature = "tokio")]
mod tokio_impl {
    use super::*;
    use ::tokio::sync::mpsc;

    pub(super) struct ReceiverFeed(pub(super) mpsc::Receiver<Chunk>);

    impl Feed for ReceiverFeed {
        fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Chunk>> {
            self.0.poll_recv(cx)
        }
    }
}
