//! A bracketed list language.
//!
//! ```text
//! [a, [b, c], "str ing", 42]
//! ```
//!
//! Values are tried in order as lists, strings, numbers and atoms. A number
//! that runs straight into a letter (`7up`) is rolled back and re-read as an
//! atom.

use std::future::Future;
use std::pin::Pin;

use trellis::{Co, Context, Emitted, Grammar, NodeFlags, OpenTag, Pattern, Reference, Terminal};

pub struct Lists {
    whitespace: Pattern,
    string_content: Pattern,
    number: Pattern,
    word_char: Pattern,
    atom: Pattern,
}

impl Lists {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            whitespace: Pattern::regex(r"\s+")?,
            string_content: Pattern::regex(r#"[^"]+"#)?,
            number: Pattern::regex("[0-9]+")?,
            word_char: Pattern::regex("[A-Za-z_]")?,
            atom: Pattern::regex("[A-Za-z0-9_]+")?,
        })
    }
}

impl Grammar for Lists {
    fn name(&self) -> &str {
        "lists"
    }
}

type BoxedMatch<'a> = Pin<Box<dyn Future<Output = bool> + 'a>>;

/// Entry strategy: one value surrounded by optional whitespace.
pub async fn document(co: Co<Emitted>, ctx: &Context<Lists>) {
    let grammar = ctx.grammar();

    co.advance(OpenTag::new("Document").with_language("lists")).await;
    trivia(&co, grammar).await;
    if value(&co, grammar, Reference::new("value")).await {
        trivia(&co, grammar).await;
    }
    co.advance(Terminal::Close).await;
}

async fn trivia(co: &Co<Emitted>, grammar: &Lists) {
    let Some(space) = co.match_pattern(grammar.whitespace.clone()).await else {
        return;
    };
    co.advance(Reference::array("trivia")).await;
    co.advance(OpenTag::new("Whitespace").with_flags(NodeFlags::TRIVIA)).await;
    co.advance(Terminal::literal(space.text)).await;
    co.advance(Terminal::Close).await;
}

async fn punctuator(co: &Co<Emitted>, property: Reference, tag: OpenTag, text: &str) -> bool {
    if co.match_pattern(text).await.is_none() {
        return false;
    }
    co.advance(property).await;
    co.advance(tag.with_flags(NodeFlags::TOKEN)).await;
    co.advance(Terminal::literal(text)).await;
    co.advance(Terminal::Close).await;
    true
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    List,
    String,
    Number,
    Atom,
}

impl Kind {
    const ALL: [Kind; 4] = [Kind::List, Kind::String, Kind::Number, Kind::Atom];

    fn node_type(self) -> &'static str {
        match self {
            Kind::List => "List",
            Kind::String => "String",
            Kind::Number => "Number",
            Kind::Atom => "Atom",
        }
    }
}

/// Binds the first alternative that parses to `property`, or null if none do.
fn value<'a>(co: &'a Co<Emitted>, grammar: &'a Lists, property: Reference) -> BoxedMatch<'a> {
    Box::pin(async move {
        co.advance(property).await;
        for kind in Kind::ALL {
            co.branch().await;
            co.advance(OpenTag::new(kind.node_type())).await;
            let matched = match kind {
                Kind::List => list(co, grammar).await,
                Kind::String => string(co, grammar).await,
                Kind::Number => number(co, grammar).await,
                Kind::Atom => atom(co, grammar).await,
            };
            if matched {
                co.advance(Terminal::Close).await;
                co.accept().await;
                return true;
            }
            co.reject().await;
        }
        co.advance(Terminal::Null).await;
        false
    })
}

async fn list(co: &Co<Emitted>, grammar: &Lists) -> bool {
    let open = OpenTag::new("Punctuator")
        .with_attribute("balanced", "]")
        .with_attribute("balancedSpan", "List");
    if !punctuator(co, Reference::new("openToken"), open, "[").await {
        return false;
    }
    trivia(co, grammar).await;

    while co.match_pattern("]").await.is_none() {
        if !value(co, grammar, Reference::array("items")).await {
            return false;
        }
        trivia(co, grammar).await;
        if !punctuator(co, Reference::array("separators"), OpenTag::new("Punctuator"), ",").await {
            break;
        }
        trivia(co, grammar).await;
    }

    let close = OpenTag::new("Punctuator").with_attribute("balancer", true);
    punctuator(co, Reference::new("closeToken"), close, "]").await
}

async fn string(co: &Co<Emitted>, grammar: &Lists) -> bool {
    let open = OpenTag::new("Punctuator")
        .with_attribute("balanced", "\"")
        .with_attribute("balancedSpan", "String");
    if !punctuator(co, Reference::new("openToken"), open, "\"").await {
        return false;
    }

    if let Some(content) = co.match_pattern(grammar.string_content.clone()).await {
        co.advance(Reference::new("content")).await;
        co.advance(OpenTag::new("StringContent").with_flags(NodeFlags::TOKEN)).await;
        co.advance(Terminal::literal(content.text)).await;
        co.advance(Terminal::Close).await;
    }

    let close = OpenTag::new("Punctuator").with_attribute("balancer", true);
    punctuator(co, Reference::new("closeToken"), close, "\"").await
}

async fn number(co: &Co<Emitted>, grammar: &Lists) -> bool {
    let Some(digits) = co.match_pattern(grammar.number.clone()).await else {
        return false;
    };
    co.advance(Terminal::literal(digits.text)).await;
    co.match_pattern(grammar.word_char.clone()).await.is_none()
}

async fn atom(co: &Co<Emitted>, grammar: &Lists) -> bool {
    let Some(word) = co.match_pattern(grammar.atom.clone()).await else {
        return false;
    };
    co.advance(Terminal::literal(word.text)).await;
    true
}
