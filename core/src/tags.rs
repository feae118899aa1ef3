//! Terminal tags carried by `advance` instructions.
//!
//! A strategy never hands the interpreter raw text to consume. It names the
//! syntax unit it expects next as a [`Terminal`], and the interpreter decides
//! from the terminal's kind what to do with the cursor and the frame before
//! forwarding the tag to the tree builder.

use std::collections::BTreeMap;
use std::fmt;

/// Attribute value on an open or doctype tag.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    String(String),
}

impl Value {
    /// Truthiness used by flag-like attributes such as `balancer`.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Bool(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{:?}", s),
        }
    }
}

pub type Attributes = BTreeMap<String, Value>;

/// Structural flags on a node.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodeFlags {
    /// The node is a token: its children are literals only.
    pub token: bool,
    /// The node is trivia (whitespace, comments). Exempt from repair.
    pub trivia: bool,
    /// The node is an escape sequence. Exempt from repair.
    pub escape: bool,
}

impl NodeFlags {
    pub const TOKEN: Self = Self {
        token: true,
        trivia: false,
        escape: false,
    };

    pub const TRIVIA: Self = Self {
        token: false,
        trivia: true,
        escape: false,
    };

    pub const ESCAPE: Self = Self {
        token: true,
        trivia: false,
        escape: true,
    };

    /// Whether rejected branches inside this node skip property backfill.
    #[inline]
    pub fn exempt_from_repair(&self) -> bool {
        self.trivia || self.escape
    }
}

/// A named slot on a node that a child node (or null) is bound to.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub name: String,
    pub is_array: bool,
}

impl Reference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_array: false,
        }
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_array: true,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array {
            write!(f, "{}[]", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// The tag that opens a node.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenTag {
    /// Structural type. Untyped opens never touch the span stack.
    pub node_type: Option<String>,
    pub flags: NodeFlags,
    /// Language the node's contents are written in, if resolved.
    pub language: Option<String>,
    pub attributes: Attributes,
}

impl OpenTag {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: Some(node_type.into()),
            ..Self::default()
        }
    }

    /// A node with no structural type.
    pub fn fragment() -> Self {
        Self::default()
    }

    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctypeTag {
    pub version: u32,
    pub attributes: Attributes,
}

/// The syntax unit named by an `advance` instruction.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Doctype(DoctypeTag),
    Open(OpenTag),
    Close,
    Literal(String),
    /// Placeholder for embedded content the source does not spell out.
    Gap,
    /// Re-parents the most recently bound node under a new node.
    Shift,
    Reference(Reference),
    Null,
}

impl Terminal {
    pub fn doctype() -> Self {
        Terminal::Doctype(DoctypeTag::default())
    }

    pub fn open(node_type: impl Into<String>) -> Self {
        Terminal::Open(OpenTag::new(node_type))
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Terminal::Literal(text.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Terminal::Reference(Reference::new(name))
    }

    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Terminal::Doctype(_) => "DoctypeTag",
            Terminal::Open(_) => "OpenNodeTag",
            Terminal::Close => "CloseNodeTag",
            Terminal::Literal(_) => "Literal",
            Terminal::Gap => "Gap",
            Terminal::Shift => "Shift",
            Terminal::Reference(_) => "Reference",
            Terminal::Null => "Null",
        }
    }
}

impl From<OpenTag> for Terminal {
    fn from(tag: OpenTag) -> Self {
        Terminal::Open(tag)
    }
}

impl From<Reference> for Terminal {
    fn from(reference: Reference) -> Self {
        Terminal::Reference(reference)
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::Doctype(tag) => write!(f, "<!{}>", tag.version),
            Terminal::Open(tag) => write!(f, "<{}>", tag.node_type.as_deref().unwrap_or("")),
            Terminal::Close => f.write_str("</>"),
            Terminal::Literal(text) => write!(f, "{:?}", text),
            Terminal::Gap => f.write_str("<//>"),
            Terminal::Shift => f.write_str("^^^"),
            Terminal::Reference(r) => write!(f, "{}:", r),
            Terminal::Null => f.write_str("null"),
        }
    }
}
