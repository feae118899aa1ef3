//! Core error types for trellis.
//!
//! Every failure the interpreter can hit is fatal to the current run. Grammars
//! that want to recover from a failed attempt wrap it in `branch` and issue
//! `reject`, rather than letting one of these errors escape.

use thiserror::Error;

use crate::source::SourceError;
use crate::tree::BuildError;

/// Core trellis error type.
///
/// Variants fall into four groups:
///
/// - protocol violations by the strategy (`NotOnTop`, `AcceptedRoot`,
///   `RejectedRoot`, `SpanUnderflow`, `UnexpectedCloser`)
/// - match failures (`LiteralFailed`, `GapFailed`)
/// - incompleteness at finalization (`InputNotConsumed`, `UnbalancedAtEnd`)
/// - unknown instructions and resource limits
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A frame operation targeted a frame that is not on top of the stack.
    #[error("cannot {op} a state that is not on top")]
    NotOnTop {
        /// The operation that was attempted.
        op: &'static str,
    },

    #[error("accepted the root state")]
    AcceptedRoot,

    #[error("rejected the root state")]
    RejectedRoot,

    /// A lexical context pop would have emptied the span stack.
    #[error("no lexical context to pop")]
    SpanUnderflow,

    /// A balancer node was opened with no balanced construct in flight.
    #[error("balancer `{node_type}` has no open balanced construct")]
    UnexpectedCloser { node_type: String },

    #[error("failed to advance literal {literal:?}")]
    LiteralFailed { literal: String },

    #[error("failed to advance gap")]
    GapFailed,

    /// The outermost node closed before the input was exhausted.
    #[error("parser failed to consume input")]
    InputNotConsumed,

    /// The outermost node closed with balanced constructs still open.
    #[error("parser did not match all balanced nodes: {remaining} still open")]
    UnbalancedAtEnd { remaining: usize },

    #[error("unexpected call of {{verb: {verb}}}")]
    UnknownInstruction { verb: String },

    /// Branch nesting exceeded [`ParseConfig::max_branch_depth`](crate::ParseConfig).
    #[error("branch limit exceeded: depth {depth} > limit {limit}")]
    BranchLimitExceeded { depth: usize, limit: usize },

    /// More instructions were executed than [`ParseConfig::max_instructions`](crate::ParseConfig).
    #[error("instruction limit exceeded: executed {executed} > limit {limit}")]
    InstructionLimitExceeded { executed: usize, limit: usize },

    /// A blocking run hit an operation that could not complete synchronously.
    #[error("interpreter stalled waiting on a pending source or strategy")]
    Stalled,

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Source(#[from] SourceError),
}
