pub mod checkpoint;
pub mod config;
pub mod context;
pub mod coroutine;
mod error;
pub mod instruction;
pub mod interpreter;
pub mod lexical;
pub mod print;
pub mod source;
pub mod spans;
pub mod tags;
pub mod tree;
mod view;

pub use checkpoint::{Checkpoint, FrameId, Stack, Status};
pub use config::ParseConfig;
pub use context::{Context, Grammar};
pub use coroutine::{script, Co, Coroutine, LocalBoxFuture, Resume, Step};
pub use error::Error;
pub use instruction::{Instruction, Pattern, TokenRange};
pub use interpreter::{Frame, Interpreter};
pub use lexical::{LexicalState, LexicalView, Production, Token, Tokenizer};
pub use print::{Printer, ToTokens, TreePrinter};
pub use source::{Chunk, Cursor, Feed, Source, SourceError, Unit};
pub use spans::{Balanced, BalancedEntry, Span, SpanStack};
pub use tags::{Attributes, DoctypeTag, NodeFlags, OpenTag, Reference, Terminal, Value};
pub use tree::{BuildError, Child, CstBuilder, Document, Emitted, Node, NodeShape, Path, PathId, PathSegment, Property, TreeBuilder};
pub use view::StateView;
