//! Tree building.
//!
//! The interpreter never constructs nodes itself. It forwards every terminal
//! to a [`TreeBuilder`], which branches, accepts and rejects in lockstep with
//! the interpreter's frames, and reads back the builder's path and open node
//! when it needs to update spans or repair a rejected branch.
//!
//! [`CstBuilder`] is the reference builder. Nodes are untyped: an [`OpenTag`],
//! the literal and reference children in source order, and the properties
//! bound through those references.
//!
//! ```text
//! <Root>                  path: [Root]
//!   "a"
//!   name:                 path: [Root, name:]      (pending)
//!     <Ident>             path: [Root, name:Ident]
//!       "x"
//!     </>                 path: [Root]             (Root.name = Ident)
//! </>                     path: []
//! ```

use std::fmt;

use thiserror::Error;

use crate::checkpoint::{Checkpoint, FrameId, Stack};
use crate::print::{Printer, ToTokens, TreePrinter};
use crate::tags::{Attributes, OpenTag, Reference, Terminal, Value};

/// Errors raised by [`CstBuilder`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("doctype must come before the root node")]
    DoctypeAfterRoot,

    #[error("the root node is already closed")]
    RootClosed,

    /// A non-root node was opened without a reference to bind it to.
    #[error("cannot open `{node_type}` without a pending reference")]
    MissingReference { node_type: String },

    #[error("property `{name}` is already bound")]
    PropertyBound { name: String },

    #[error("{terminal} needs an open node")]
    NoOpenNode { terminal: &'static str },

    #[error("{terminal} needs a pending reference")]
    NoPendingReference { terminal: &'static str },

    #[error("shift needs a bound property on the open node")]
    NothingToShift,

    #[error("a shifted node is already held")]
    AlreadyShifted,

    #[error("document is incomplete: {open} nodes still open")]
    Incomplete { open: usize },
}

/// Identity of a path segment. Never reused within one builder.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub id: PathId,
    /// The reference this segment is bound through. `None` for the root.
    pub reference: Option<Reference>,
}

/// Snapshot of the builder's position, root first.
///
/// A pending reference counts as a segment of its own, one deeper than the
/// node it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    /// True outside the document: before the root opens or after it closes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Depth of the innermost segment; the root is at depth 0.
    #[inline]
    pub fn depth(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    #[inline]
    pub fn at(&self, depth: usize) -> Option<&PathSegment> {
        self.segments.get(depth)
    }

    #[inline]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

/// What the interpreter may ask of an open node.
pub trait NodeShape {
    fn tag(&self) -> &OpenTag;
    fn has_property(&self, name: &str) -> bool;
}

/// Receiver of the terminal stream.
///
/// `branch`, `accept` and `reject` are always called in lockstep with the
/// interpreter's own frames, so an implementation only ever has to track one
/// chain of snapshots.
pub trait TreeBuilder {
    /// Value handed back to the strategy.
    type Output: Clone + fmt::Debug;
    type Node: NodeShape;

    fn advance(&mut self, terminal: &Terminal) -> Result<Self::Output, crate::Error>;
    fn write(&mut self, text: &str) -> Result<Self::Output, crate::Error>;
    fn bind_attribute(&mut self, key: &str, value: &Value) -> Result<Self::Output, crate::Error>;

    fn branch(&mut self) -> Result<(), crate::Error>;
    fn accept(&mut self) -> Result<(), crate::Error>;
    fn reject(&mut self) -> Result<(), crate::Error>;

    fn path(&self) -> Path;
    /// The open node, or `None` while a reference is pending.
    fn node(&self) -> Option<&Self::Node>;
    /// The node enclosing the innermost path segment.
    fn parent_node(&self) -> Option<&Self::Node>;
    /// The last terminal applied.
    fn last_result(&self) -> Option<&Terminal>;
}

/// Child of a node in source order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Literal(String),
    Reference(Reference),
}

/// Value bound to a property.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Node(Node),
    Null,
    Gap,
    /// Values bound through an array reference, in binding order.
    List(Vec<Property>),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub tag: OpenTag,
    pub children: Vec<Child>,
    /// Bound properties in first-binding order.
    pub properties: Vec<(String, Property)>,
}

impl Node {
    pub fn new(tag: OpenTag) -> Self {
        Self {
            tag,
            children: Vec::new(),
            properties: Vec::new(),
        }
    }

    #[inline]
    pub fn node_type(&self) -> Option<&str> {
        self.tag.node_type.as_deref()
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// Concatenated literal children of this node and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        let mut seen = Vec::<(&str, usize)>::new();
        for child in &self.children {
            match child {
                Child::Literal(text) => out.push_str(text),
                Child::Reference(reference) => {
                    if let Some(Property::Node(node)) = self.resolve(reference, &mut seen) {
                        node.collect_text(out);
                    }
                }
            }
        }
    }

    /// Value behind the next occurrence of `reference` in child order.
    fn resolve<'n>(&'n self, reference: &'n Reference, seen: &mut Vec<(&'n str, usize)>) -> Option<&'n Property> {
        let property = self.property(&reference.name)?;
        if !reference.is_array {
            return Some(property);
        }
        let idx = match seen.iter_mut().find(|(name, _)| *name == reference.name) {
            Some((_, count)) => {
                *count += 1;
                *count - 1
            }
            None => {
                seen.push((&reference.name, 1));
                0
            }
        };
        match property {
            Property::List(items) => items.get(idx),
            other => Some(other),
        }
    }

    fn check_bindable(&self, reference: &Reference) -> Result<(), BuildError> {
        match self.property(&reference.name) {
            None => Ok(()),
            Some(Property::List(_)) if reference.is_array => Ok(()),
            Some(_) => Err(BuildError::PropertyBound {
                name: reference.name.clone(),
            }),
        }
    }

    fn bind(&mut self, reference: &Reference, value: Property) -> Result<Bound, BuildError> {
        self.check_bindable(reference)?;
        if reference.is_array {
            if let Some(Property::List(items)) = self.property_mut(&reference.name) {
                items.push(value);
                return Ok(Bound::Appended);
            }
            self.properties.push((reference.name.clone(), Property::List(vec![value])));
        } else {
            self.properties.push((reference.name.clone(), value));
        }
        Ok(Bound::Created)
    }

    /// Takes back the value of a [`Node::bind`] that returned `bound`.
    fn revert_bind(&mut self, reference: &Reference, bound: Bound) -> Option<Property> {
        match bound {
            Bound::Appended => match self.property_mut(&reference.name)? {
                Property::List(items) => items.pop(),
                _ => None,
            },
            Bound::Created => {
                let idx = self.properties.iter().rposition(|(n, _)| *n == reference.name)?;
                match self.properties.remove(idx).1 {
                    Property::List(mut items) if reference.is_array => items.pop(),
                    value => Some(value),
                }
            }
        }
    }

    /// Removes the most recent value bound through `reference`.
    fn unbind(&mut self, reference: &Reference) -> Option<(Property, Unbound)> {
        if reference.is_array {
            match self.property_mut(&reference.name)? {
                Property::List(items) => items.pop().map(|value| (value, Unbound::Popped)),
                _ => None,
            }
        } else {
            let idx = self.properties.iter().position(|(n, _)| *n == reference.name)?;
            Some((self.properties.remove(idx).1, Unbound::Removed(idx)))
        }
    }

    fn revert_unbind(&mut self, reference: &Reference, value: Property, unbound: Unbound) {
        match unbound {
            Unbound::Removed(idx) => {
                let idx = idx.min(self.properties.len());
                self.properties.insert(idx, (reference.name.clone(), value));
            }
            Unbound::Popped => {
                if let Some(Property::List(items)) = self.property_mut(&reference.name) {
                    items.push(value);
                }
            }
        }
    }
}

/// How [`Node::bind`] changed the property list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    /// A new `(name, value)` entry was pushed.
    Created,
    /// The value was pushed onto an existing list.
    Appended,
}

/// How [`Node::unbind`] changed the property list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unbound {
    Removed(usize),
    Popped,
}

impl NodeShape for Node {
    fn tag(&self) -> &OpenTag {
        &self.tag
    }

    fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }
}

/// A finished tree.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Doctype attributes, if a doctype was seen.
    pub doctype: Option<Attributes>,
    pub root: Node,
    /// Everything passed to `write`, concatenated.
    pub written: String,
}

/// Value returned to the strategy by [`CstBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emitted {
    Tag(Terminal),
    Written(String),
    Attribute { key: String, value: Value },
}

#[derive(Debug, Clone)]
struct Segment {
    id: PathId,
    reference: Option<Reference>,
    /// `None` while the reference is pending.
    node: Option<Node>,
    /// The property most recently bound on `node`, for `shift`.
    last_bound: Option<Reference>,
}

#[derive(Debug, Default)]
struct BuildState {
    doctype: Option<Attributes>,
    segments: Vec<Segment>,
    root: Option<Node>,
    /// Value taken out of its property by `shift`, waiting for a gap.
    held: Option<Property>,
    last: Option<Terminal>,
    written: String,
}

/// Inverse of one mutation of a [`BuildState`].
#[derive(Debug)]
enum Undo {
    Last(Option<Terminal>),
    Doctype(Option<Attributes>),
    OpenRoot,
    OpenPending,
    Close {
        id: PathId,
        reference: Option<Reference>,
        last_bound: Option<Reference>,
        bound: Option<Bound>,
        parent_last_bound: Option<Reference>,
    },
    Literal,
    Reference,
    Bind {
        id: PathId,
        reference: Reference,
        bound: Bound,
        parent_last_bound: Option<Reference>,
        took_held: bool,
    },
    Shift {
        reference: Reference,
        unbound: Unbound,
    },
    Write(usize),
    Attribute {
        key: String,
        previous: Option<Value>,
    },
}

/// Mutations made while a frame was on top, oldest first.
///
/// Forking starts an empty journal. Rejecting replays the journal backwards
/// over the shared state, so a branch costs what it changed rather than the
/// size of the tree built so far.
#[derive(Debug, Default)]
struct Journal {
    entries: Vec<Undo>,
}

impl Checkpoint for Journal {
    fn fork(&self) -> Self {
        Journal::default()
    }

    fn merge(&mut self, child: Self) {
        self.entries.extend(child.entries);
    }
}

impl BuildState {
    fn open_segment(&mut self, terminal: &'static str) -> Result<&mut Segment, BuildError> {
        match self.segments.last_mut() {
            Some(segment) if segment.node.is_some() => Ok(segment),
            _ => Err(BuildError::NoOpenNode { terminal }),
        }
    }

    fn open_node(&mut self, terminal: &'static str) -> Result<&mut Node, BuildError> {
        self.open_segment(terminal)?
            .node
            .as_mut()
            .ok_or(BuildError::NoOpenNode { terminal })
    }

    fn has_pending(&self) -> bool {
        self.segments.last().is_some_and(|s| s.node.is_none())
    }

    /// Binds `value` into the open node through `reference`.
    ///
    /// Returns how the property list changed and the node's previous
    /// `last_bound`.
    fn bind_open(
        &mut self,
        reference: &Reference,
        value: Property,
        terminal: &'static str,
    ) -> Result<(Bound, Option<Reference>), BuildError> {
        let parent = self.open_segment(terminal)?;
        let bound = parent
            .node
            .as_mut()
            .ok_or(BuildError::NoOpenNode { terminal })?
            .bind(reference, value)?;
        let previous = parent.last_bound.replace(reference.clone());
        Ok((bound, previous))
    }

    /// Takes back a value bound by [`BuildState::bind_open`].
    fn unbind_open(
        &mut self,
        reference: &Reference,
        bound: Bound,
        previous: Option<Reference>,
    ) -> Result<Property, BuildError> {
        let parent = self.open_segment("reject")?;
        let value = parent
            .node
            .as_mut()
            .and_then(|node| node.revert_bind(reference, bound))
            .ok_or(BuildError::NoPendingReference { terminal: "reject" })?;
        parent.last_bound = previous;
        Ok(value)
    }

    fn revert(&mut self, undo: Undo) -> Result<(), BuildError> {
        match undo {
            Undo::Last(previous) => self.last = previous,
            Undo::Doctype(previous) => self.doctype = previous,
            Undo::OpenRoot => {
                self.segments.pop();
            }
            Undo::OpenPending => {
                self.open_segment("reject")?.node = None;
            }
            Undo::Close {
                id,
                reference,
                last_bound,
                bound,
                parent_last_bound,
            } => {
                let node = match (&reference, bound) {
                    (Some(reference), Some(bound)) => match self.unbind_open(reference, bound, parent_last_bound)? {
                        Property::Node(node) => node,
                        _ => return Err(BuildError::NoOpenNode { terminal: "reject" }),
                    },
                    _ => self.root.take().ok_or(BuildError::NoOpenNode { terminal: "reject" })?,
                };
                self.segments.push(Segment {
                    id,
                    reference,
                    node: Some(node),
                    last_bound,
                });
            }
            Undo::Literal => {
                self.open_node("reject")?.children.pop();
            }
            Undo::Reference => {
                self.segments.pop();
                self.open_node("reject")?.children.pop();
            }
            Undo::Bind {
                id,
                reference,
                bound,
                parent_last_bound,
                took_held,
            } => {
                let value = self.unbind_open(&reference, bound, parent_last_bound)?;
                if took_held {
                    self.held = Some(value);
                }
                self.segments.push(Segment {
                    id,
                    reference: Some(reference),
                    node: None,
                    last_bound: None,
                });
            }
            Undo::Shift { reference, unbound } => {
                self.segments.pop();
                let value = self.held.take().ok_or(BuildError::NothingToShift)?;
                let segment = self.open_segment("reject")?;
                if let Some(node) = segment.node.as_mut() {
                    node.revert_unbind(&reference, value, unbound);
                }
                segment.last_bound = Some(reference);
            }
            Undo::Write(len) => self.written.truncate(len),
            Undo::Attribute { key, previous } => {
                let attributes = &mut self.open_node("reject")?.tag.attributes;
                match previous {
                    Some(value) => attributes.insert(key, value),
                    None => attributes.remove(&key),
                };
            }
        }
        Ok(())
    }
}

/// Reference [`TreeBuilder`] producing a [`Document`].
///
/// The tree under construction is a single state. Frames only carry a
/// [`Journal`] of what they changed.
#[derive(Debug)]
pub struct CstBuilder {
    state: BuildState,
    journal: Stack<Journal>,
    frame: FrameId,
    next_id: usize,
}

impl Default for CstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CstBuilder {
    pub fn new() -> Self {
        Self {
            state: BuildState::default(),
            journal: Stack::new(Journal::default()),
            frame: FrameId::ROOT,
            next_id: 0,
        }
    }

    fn fresh_id(&mut self) -> PathId {
        let id = PathId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Logs `undo` unless nothing could ever be rejected.
    fn record(&mut self, undo: Undo) {
        if self.journal.depth() > 0 {
            self.journal.current_mut().entries.push(undo);
        }
    }

    /// Text passed to `write` so far.
    pub fn written(&self) -> &str {
        &self.state.written
    }

    /// The closed root node, if any.
    pub fn root(&self) -> Option<&Node> {
        self.state.root.as_ref()
    }

    /// Consumes the builder. The root must have been opened and closed.
    pub fn finish(self) -> Result<Document, crate::Error> {
        let state = self.state;
        if !state.segments.is_empty() {
            return Err(BuildError::Incomplete {
                open: state.segments.len(),
            }
            .into());
        }
        let root = state.root.ok_or(BuildError::Incomplete { open: 0 })?;
        Ok(Document {
            doctype: state.doctype,
            root,
            written: state.written,
        })
    }

    fn doctype(&mut self, attributes: &Attributes) -> Result<(), BuildError> {
        if self.state.root.is_some() || !self.state.segments.is_empty() {
            return Err(BuildError::DoctypeAfterRoot);
        }
        let previous = self.state.doctype.replace(attributes.clone());
        self.record(Undo::Doctype(previous));
        Ok(())
    }

    fn open(&mut self, tag: &OpenTag) -> Result<(), BuildError> {
        if self.state.segments.is_empty() {
            if self.state.root.is_some() {
                return Err(BuildError::RootClosed);
            }
            let id = self.fresh_id();
            self.state.segments.push(Segment {
                id,
                reference: None,
                node: Some(Node::new(tag.clone())),
                last_bound: None,
            });
            self.record(Undo::OpenRoot);
            return Ok(());
        }

        match self.state.segments.last_mut() {
            Some(segment) if segment.node.is_none() => {
                segment.node = Some(Node::new(tag.clone()));
                self.record(Undo::OpenPending);
                Ok(())
            }
            _ => Err(BuildError::MissingReference {
                node_type: tag.node_type.clone().unwrap_or_default(),
            }),
        }
    }

    fn close(&mut self) -> Result<(), BuildError> {
        let state = &mut self.state;
        state.open_segment("close")?;
        let Some(segment) = state.segments.pop() else {
            return Err(BuildError::NoOpenNode { terminal: "close" });
        };
        let Some(node) = segment.node else {
            return Err(BuildError::NoOpenNode { terminal: "close" });
        };

        if state.segments.is_empty() {
            state.root = Some(node);
            self.record(Undo::Close {
                id: segment.id,
                reference: None,
                last_bound: segment.last_bound,
                bound: None,
                parent_last_bound: None,
            });
            return Ok(());
        }
        let reference = segment.reference.ok_or(BuildError::NoPendingReference { terminal: "close" })?;
        let (bound, parent_last_bound) = state.bind_open(&reference, Property::Node(node), "close")?;
        self.record(Undo::Close {
            id: segment.id,
            reference: Some(reference),
            last_bound: segment.last_bound,
            bound: Some(bound),
            parent_last_bound,
        });
        Ok(())
    }

    fn literal(&mut self, text: &str) -> Result<(), BuildError> {
        let node = self.state.open_node("literal")?;
        node.children.push(Child::Literal(text.to_owned()));
        self.record(Undo::Literal);
        Ok(())
    }

    fn reference(&mut self, reference: &Reference) -> Result<(), BuildError> {
        let id = self.fresh_id();
        let state = &mut self.state;
        let node = state.open_node("reference")?;
        node.check_bindable(reference)?;
        node.children.push(Child::Reference(reference.clone()));
        state.segments.push(Segment {
            id,
            reference: Some(reference.clone()),
            node: None,
            last_bound: None,
        });
        self.record(Undo::Reference);
        Ok(())
    }

    fn bind_pending(&mut self, terminal: &'static str) -> Result<(), BuildError> {
        let state = &mut self.state;
        if !state.has_pending() {
            return Err(BuildError::NoPendingReference { terminal });
        }
        let held = match terminal {
            "gap" => state.held.take(),
            _ => None,
        };
        let took_held = held.is_some();
        let value = match terminal {
            "gap" => held.unwrap_or(Property::Gap),
            _ => Property::Null,
        };
        let Some(segment) = state.segments.pop() else {
            return Err(BuildError::NoPendingReference { terminal });
        };
        let reference = segment.reference.ok_or(BuildError::NoPendingReference { terminal })?;
        let (bound, parent_last_bound) = state.bind_open(&reference, value, terminal)?;
        self.record(Undo::Bind {
            id: segment.id,
            reference,
            bound,
            parent_last_bound,
            took_held,
        });
        Ok(())
    }

    fn shift(&mut self) -> Result<(), BuildError> {
        let id = self.fresh_id();
        let state = &mut self.state;
        if state.held.is_some() {
            return Err(BuildError::AlreadyShifted);
        }
        let segment = state.open_segment("shift")?;
        let reference = segment.last_bound.take().ok_or(BuildError::NothingToShift)?;
        let (held, unbound) = segment
            .node
            .as_mut()
            .and_then(|node| node.unbind(&reference))
            .ok_or(BuildError::NothingToShift)?;

        state.held = Some(held);
        state.segments.push(Segment {
            id,
            reference: Some(reference.clone()),
            node: None,
            last_bound: None,
        });
        self.record(Undo::Shift { reference, unbound });
        Ok(())
    }

    fn write_text(&mut self, text: &str) {
        let len = self.state.written.len();
        self.state.written.push_str(text);
        self.record(Undo::Write(len));
    }

    fn attribute(&mut self, key: &str, value: &Value) -> Result<(), BuildError> {
        let node = self.state.open_node("bindAttribute")?;
        let previous = node.tag.attributes.insert(key.to_owned(), value.clone());
        self.record(Undo::Attribute {
            key: key.to_owned(),
            previous,
        });
        Ok(())
    }
}

impl TreeBuilder for CstBuilder {
    type Output = Emitted;
    type Node = Node;

    fn advance(&mut self, terminal: &Terminal) -> Result<Emitted, crate::Error> {
        match terminal {
            Terminal::Doctype(tag) => self.doctype(&tag.attributes)?,
            Terminal::Open(tag) => self.open(tag)?,
            Terminal::Close => self.close()?,
            Terminal::Literal(text) => self.literal(text)?,
            Terminal::Reference(reference) => self.reference(reference)?,
            Terminal::Null => self.bind_pending("null")?,
            Terminal::Gap => self.bind_pending("gap")?,
            Terminal::Shift => self.shift()?,
        }
        let previous = self.state.last.replace(terminal.clone());
        self.record(Undo::Last(previous));
        Ok(Emitted::Tag(terminal.clone()))
    }

    fn write(&mut self, text: &str) -> Result<Emitted, crate::Error> {
        self.write_text(text);
        Ok(Emitted::Written(text.to_owned()))
    }

    fn bind_attribute(&mut self, key: &str, value: &Value) -> Result<Emitted, crate::Error> {
        self.attribute(key, value)?;
        Ok(Emitted::Attribute {
            key: key.to_owned(),
            value: value.clone(),
        })
    }

    fn branch(&mut self) -> Result<(), crate::Error> {
        self.frame = self.journal.branch(self.frame)?;
        Ok(())
    }

    fn accept(&mut self) -> Result<(), crate::Error> {
        self.frame = self.journal.accept(self.frame)?;
        if self.frame == FrameId::ROOT {
            self.journal.current_mut().entries.clear();
        }
        Ok(())
    }

    fn reject(&mut self) -> Result<(), crate::Error> {
        let rejected = self.frame;
        let entries = std::mem::take(&mut self.journal.current_mut().entries);
        self.frame = self.journal.reject(rejected)?;
        for undo in entries.into_iter().rev() {
            self.state.revert(undo)?;
        }
        Ok(())
    }

    fn path(&self) -> Path {
        Path {
            segments: self
                .state
                .segments
                .iter()
                .map(|s| PathSegment {
                    id: s.id,
                    reference: s.reference.clone(),
                })
                .collect(),
        }
    }

    fn node(&self) -> Option<&Node> {
        self.state.segments.last().and_then(|s| s.node.as_ref())
    }

    fn parent_node(&self) -> Option<&Node> {
        self.state.segments.iter().rev().nth(1).and_then(|s| s.node.as_ref())
    }

    fn last_result(&self) -> Option<&Terminal> {
        self.state.last.as_ref()
    }
}

impl ToTokens for Node {
    type Printer = TreePrinter;

    fn write(&self, p: &mut TreePrinter) {
        p.word(self.node_type().unwrap_or("#"));
        if self.children.is_empty() {
            p.word(" {}");
            return;
        }

        p.open_block(" {");
        let mut seen = Vec::new();
        for child in &self.children {
            p.newline();
            match child {
                Child::Literal(text) => p.word(&format!("{:?}", text)),
                Child::Reference(reference) => {
                    p.word(&format!("{}: ", reference));
                    match self.resolve(reference, &mut seen) {
                        Some(property) => p.write(property),
                        None => p.word("<unbound>"),
                    }
                }
            }
        }
        p.close_block("}");
    }
}

impl ToTokens for Property {
    type Printer = TreePrinter;

    fn write(&self, p: &mut TreePrinter) {
        match self {
            Property::Node(node) => p.write(node),
            Property::Null => p.word("null"),
            Property::Gap => p.word("<//>"),
            Property::List(items) => {
                p.char('[');
                p.write_separated_inline(items, ",");
                p.char(']');
            }
        }
    }
}

impl ToTokens for Document {
    type Printer = TreePrinter;

    fn write(&self, p: &mut TreePrinter) {
        if self.doctype.is_some() {
            p.word("<!doctype>");
            p.newline();
        }
        p.write(&self.root);
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_formatted())
    }
}
