//! Lexical context tracking.
//!
//! Every frame carries a [`SpanStack`] naming the lexical region the cursor is
//! in, and a [`Balanced`] set of constructs whose closer has not been seen yet.
//! Both are driven by attributes on open tags:
//!
//! | Attribute | Type | Effect on open | Effect on close |
//! |-----------|------|----------------|-----------------|
//! | `balancer` | bool | pops the innermost balanced construct (and its span) | — |
//! | `balanced` | string | pushes a balanced construct closed by the value | — |
//! | `balancedSpan` | string | with `balanced`, pushes a span guarded by the closer | — |
//! | `span` | string | pushes a span | pops it |

use crate::Error;
use crate::tags::{OpenTag, Value};

pub const SPAN: &str = "span";
pub const BALANCED: &str = "balanced";
pub const BALANCED_SPAN: &str = "balancedSpan";
pub const BALANCER: &str = "balancer";

/// A named lexical context.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub name: String,
    /// Text that no match inside this span may run past.
    pub guard: Option<String>,
}

impl Span {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guard: None,
        }
    }

    pub fn guarded(name: impl Into<String>, guard: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guard: Some(guard.into()),
        }
    }
}

/// Nested lexical contexts, innermost last. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanStack {
    base: Span,
    inner: Vec<Span>,
}

impl SpanStack {
    pub fn new(initial: &str) -> Self {
        Self {
            base: Span::new(initial),
            inner: Vec::new(),
        }
    }

    #[inline]
    pub fn current(&self) -> &Span {
        self.inner.last().unwrap_or(&self.base)
    }

    /// Name of the innermost context.
    #[inline]
    pub fn lexical_context(&self) -> &str {
        &self.current().name
    }

    #[inline]
    pub fn guard(&self) -> Option<&str> {
        self.current().guard.as_deref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len() + 1
    }

    /// Always false; kept for API symmetry with other collections.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn push(&mut self, span: Span) {
        self.inner.push(span);
    }

    /// Pops the innermost context. The initial context cannot be popped.
    pub fn pop(&mut self) -> Result<Span, Error> {
        self.inner.pop().ok_or(Error::SpanUnderflow)
    }

    /// Context names, outermost first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        core::iter::once(&self.base)
            .chain(self.inner.iter())
            .map(|span| span.name.as_str())
    }
}

/// An open construct waiting for its closer.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancedEntry {
    pub node_type: String,
    pub closer: String,
    /// Whether opening it pushed a guarded span.
    pub pushed_span: bool,
}

/// Constructs opened during matching and not yet closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balanced {
    open: Vec<BalancedEntry>,
}

impl Balanced {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    #[inline]
    pub fn innermost(&self) -> Option<&BalancedEntry> {
        self.open.last()
    }

    pub fn push(&mut self, entry: BalancedEntry) {
        self.open.push(entry);
    }

    pub fn pop(&mut self) -> Option<BalancedEntry> {
        self.open.pop()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Open,
    Close,
}

/// Applies a node's span attributes for the given phase.
pub fn update_spans(
    spans: &mut SpanStack,
    balanced: &mut Balanced,
    tag: &OpenTag,
    phase: Phase,
) -> Result<(), Error> {
    let span_name = tag.attribute(SPAN).and_then(Value::as_str);

    match phase {
        Phase::Open => {
            let node_type = tag.node_type.clone().unwrap_or_default();

            if tag.attribute(BALANCER).is_some_and(Value::is_truthy) {
                let entry = balanced
                    .pop()
                    .ok_or_else(|| Error::UnexpectedCloser {
                        node_type: node_type.clone(),
                    })?;
                if entry.pushed_span {
                    spans.pop()?;
                }
            }

            if let Some(closer) = tag.attribute(BALANCED).and_then(Value::as_str) {
                let balanced_span = tag.attribute(BALANCED_SPAN).and_then(Value::as_str);
                balanced.push(BalancedEntry {
                    node_type,
                    closer: closer.to_owned(),
                    pushed_span: balanced_span.is_some(),
                });
                if let Some(name) = balanced_span {
                    spans.push(Span::guarded(name, closer));
                }
            }

            if let Some(name) = span_name {
                let guard = spans.guard().map(str::to_owned);
                spans.push(Span {
                    name: name.to_owned(),
                    guard,
                });
            }
        }
        Phase::Close => {
            if span_name.is_some() {
                spans.pop()?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opener() -> OpenTag {
        OpenTag::new("Punctuator")
            .with_attribute(BALANCED, "]")
            .with_attribute(BALANCED_SPAN, "Bracketed")
    }

    fn closer() -> OpenTag {
        OpenTag::new("Punctuator").with_attribute(BALANCER, true)
    }

    #[test]
    fn test_span_stack_never_empties() {
        let mut spans = SpanStack::new("Bare");
        assert_eq!(spans.pop(), Err(Error::SpanUnderflow));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans.lexical_context(), "Bare");
    }

    #[test]
    fn test_push_and_pop() {
        let mut spans = SpanStack::new("Bare");
        spans.push(Span::new("String"));
        assert_eq!(spans.lexical_context(), "String");
        assert_eq!(spans.names().collect::<Vec<_>>(), ["Bare", "String"]);

        assert_eq!(spans.pop(), Ok(Span::new("String")));
        assert_eq!(spans.lexical_context(), "Bare");
    }

    #[test]
    fn test_balanced_pair() {
        let mut spans = SpanStack::new("Bare");
        let mut balanced = Balanced::new();

        update_spans(&mut spans, &mut balanced, &opener(), Phase::Open).unwrap();
        assert_eq!(balanced.len(), 1);
        assert_eq!(spans.lexical_context(), "Bracketed");
        assert_eq!(spans.guard(), Some("]"));

        // Closing the opener node does not end the construct.
        update_spans(&mut spans, &mut balanced, &opener(), Phase::Close).unwrap();
        assert_eq!(balanced.len(), 1);

        update_spans(&mut spans, &mut balanced, &closer(), Phase::Open).unwrap();
        assert!(balanced.is_empty());
        assert_eq!(spans.lexical_context(), "Bare");
    }

    #[test]
    fn test_balancer_without_opener() {
        let mut spans = SpanStack::new("Bare");
        let mut balanced = Balanced::new();

        let err = update_spans(&mut spans, &mut balanced, &closer(), Phase::Open).unwrap_err();
        assert_eq!(
            err,
            Error::UnexpectedCloser {
                node_type: "Punctuator".into()
            }
        );
    }

    #[test]
    fn test_plain_span_inherits_guard() {
        let mut spans = SpanStack::new("Bare");
        let mut balanced = Balanced::new();
        let string = OpenTag::new("String").with_attribute(SPAN, "Text");

        update_spans(&mut spans, &mut balanced, &opener(), Phase::Open).unwrap();
        update_spans(&mut spans, &mut balanced, &string, Phase::Open).unwrap();
        assert_eq!(spans.lexical_context(), "Text");
        assert_eq!(spans.guard(), Some("]"));

        update_spans(&mut spans, &mut balanced, &string, Phase::Close).unwrap();
        assert_eq!(spans.lexical_context(), "Bracketed");
    }

    #[test]
    fn test_unattributed_tag_is_a_no_op() {
        let mut spans = SpanStack::new("Bare");
        let mut balanced = Balanced::new();
        let tag = OpenTag::new("Identifier");

        update_spans(&mut spans, &mut balanced, &tag, Phase::Open).unwrap();
        update_spans(&mut spans, &mut balanced, &tag, Phase::Close).unwrap();
        assert_eq!(spans, SpanStack::new("Bare"));
        assert!(balanced.is_empty());
    }
}
