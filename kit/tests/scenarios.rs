//! End-to-end runs of small strategies through the interpreter.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use trellis::{
    Co, Context, CstBuilder, Emitted, Error, Grammar, Interpreter, OpenTag, Property, Reference,
    Source, StateView, Terminal, ToTokens, Unit,
};

struct Fixture;

impl Grammar for Fixture {
    fn name(&self) -> &str {
        "fixture"
    }
}

fn run<'s, F, Fut>(ctx: &'s Context<Fixture>, source: Source, strategy: F) -> Result<CstBuilder, Error>
where
    F: FnOnce(Co<Emitted>, &'s Context<Fixture>) -> Fut,
    Fut: Future<Output = ()> + 's,
{
    Interpreter::new(ctx, source, CstBuilder::new(), strategy).run_blocking()
}

type Views = Rc<RefCell<Vec<StateView>>>;

fn views() -> Views {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn test_failed_alternative_is_rolled_back() {
    let ctx = Context::new(Fixture);
    let seen = views();
    let log = Rc::clone(&seen);

    let builder = run(&ctx, Source::from_text("ab"), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        if co.match_pattern("a").await.is_some() {
            co.advance(Terminal::literal("a")).await;
        }

        co.branch().await;
        assert!(co.match_pattern("c").await.is_none());
        if let Some(view) = co.reject().await {
            log.borrow_mut().push(view);
        }

        if co.match_pattern("b").await.is_some() {
            co.advance(Terminal::literal("b")).await;
        }
        co.advance(Terminal::Close).await;
    })
    .unwrap();

    let seen = seen.borrow();
    assert_eq!(seen[0].offset, 1);
    assert_eq!(seen[0].depth, 0);
    // Nothing was bound inside the branch, so nothing was repaired.
    assert_eq!(seen[0].last_result, Some(Terminal::literal("a")));

    let doc = builder.finish().unwrap();
    assert!(doc.root.properties.is_empty());
    insta::assert_snapshot!(doc.to_string_formatted(), @r#"
    Root {
      "a"
      "b"
    }
    "#);
}

#[test]
fn test_close_with_unconsumed_input() {
    let ctx = Context::new(Fixture);
    let err = run(&ctx, Source::from_text("ab"), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        co.advance(Terminal::literal("a")).await;
        co.advance(Terminal::Close).await;
    })
    .unwrap_err();

    assert_eq!(err, Error::InputNotConsumed);
    assert_eq!(err.to_string(), "parser failed to consume input");
}

#[test]
fn test_rejected_reference_is_backfilled() {
    let ctx = Context::new(Fixture);
    let seen = views();
    let log = Rc::clone(&seen);

    let builder = run(&ctx, Source::from_text(""), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        co.branch().await;
        co.advance(Terminal::reference("name")).await;
        co.advance(Terminal::open("Ident")).await;
        if let Some(view) = co.reject().await {
            log.borrow_mut().push(view);
        }
        co.advance(Terminal::Close).await;
    })
    .unwrap();

    // The repair ran before the parent's view was taken.
    assert_eq!(seen.borrow()[0].last_result, Some(Terminal::Null));

    let doc = builder.finish().unwrap();
    assert_eq!(doc.root.property("name"), Some(&Property::Null));
    insta::assert_snapshot!(doc.to_string_formatted(), @r"
    Root {
      name: null
    }
    ");
}

#[test]
fn test_array_reference_is_backfilled_once() {
    let ctx = Context::new(Fixture);
    let builder = run(&ctx, Source::from_text("x"), |co, _| async move {
        co.advance(Terminal::open("List")).await;
        co.branch().await;
        co.advance(Reference::array("items")).await;
        co.advance(Terminal::open("Item")).await;
        co.reject().await;

        co.branch().await;
        co.advance(Reference::array("items")).await;
        co.advance(Terminal::open("Item")).await;
        co.reject().await;

        co.advance(Terminal::literal("x")).await;
        co.advance(Terminal::Close).await;
    })
    .unwrap();

    let doc = builder.finish().unwrap();
    assert_eq!(doc.root.property("items"), Some(&Property::List(vec![Property::Null])));
}

#[test]
fn test_repair_skips_trivia() {
    let ctx = Context::new(Fixture);
    let builder = run(&ctx, Source::from_text(" "), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        co.advance(Terminal::reference("space")).await;
        co.advance(OpenTag::new("Space").with_flags(trellis::NodeFlags::TRIVIA)).await;
        co.branch().await;
        co.advance(Terminal::reference("comment")).await;
        co.advance(Terminal::open("Comment")).await;
        co.reject().await;
        co.advance(Terminal::literal(" ")).await;
        co.advance(Terminal::Close).await;
        co.advance(Terminal::Close).await;
    })
    .unwrap();

    let doc = builder.finish().unwrap();
    let Some(Property::Node(space)) = doc.root.property("space") else {
        panic!("space should be bound");
    };
    assert!(space.property("comment").is_none());
}

#[test]
fn test_repair_skips_escapes() {
    let ctx = Context::new(Fixture);
    let seen = views();
    let log = Rc::clone(&seen);
    let escape = OpenTag::new("Escape").with_flags(trellis::NodeFlags::ESCAPE);
    let tag = escape.clone();

    let builder = run(&ctx, Source::from_text("\\n"), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        co.advance(Terminal::reference("escape")).await;
        co.advance(tag).await;
        co.branch().await;
        co.advance(Terminal::reference("code")).await;
        co.advance(Terminal::open("Code")).await;
        log.borrow_mut().extend(co.reject().await);
        co.advance(Terminal::literal("\\n")).await;
        co.advance(Terminal::Close).await;
        co.advance(Terminal::Close).await;
    })
    .unwrap();

    assert_eq!(seen.borrow()[0].last_result, Some(Terminal::Open(escape)));
    let doc = builder.finish().unwrap();
    let Some(Property::Node(node)) = doc.root.property("escape") else {
        panic!("escape should be bound");
    };
    assert!(node.properties.is_empty());
}

#[test]
fn test_pending_reference_is_not_backfilled() {
    let ctx = Context::new(Fixture);
    let seen = views();
    let log = Rc::clone(&seen);

    let builder = run(&ctx, Source::from_text(""), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        co.advance(Terminal::reference("a")).await;
        co.branch().await;
        co.advance(Terminal::open("X")).await;
        co.advance(Terminal::reference("b")).await;
        co.advance(Terminal::open("Y")).await;
        log.borrow_mut().extend(co.reject().await);

        co.advance(Terminal::open("Z")).await;
        co.advance(Terminal::Close).await;
        co.advance(Terminal::Close).await;
    })
    .unwrap();

    let seen = seen.borrow();
    assert_eq!(seen[0].last_result, Some(Terminal::reference("a")));
    assert_eq!(seen[0].path_depth, Some(1));
    assert_eq!(seen[0].node_type, None);

    let doc = builder.finish().unwrap();
    assert!(matches!(doc.root.property("a"), Some(Property::Node(z)) if z.node_type() == Some("Z")));
    assert_eq!(doc.root.properties.len(), 1);
}

#[test]
fn test_repair_skips_after_shift() {
    let ctx = Context::new(Fixture);
    let seen = views();
    let log = Rc::clone(&seen);

    let builder = run(&ctx, Source::from_text("a+b"), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        co.advance(Terminal::reference("expr")).await;
        co.advance(Terminal::open("Ident")).await;
        co.advance(Terminal::literal("a")).await;

        co.branch().await;
        co.advance(Terminal::Close).await;
        co.advance(Terminal::Shift).await;
        co.advance(Terminal::open("Binary")).await;
        co.advance(Terminal::reference("left")).await;
        co.advance(Terminal::Gap).await;
        co.advance(Terminal::reference("right")).await;
        co.advance(Terminal::open("Ident")).await;
        log.borrow_mut().extend(co.reject().await);

        co.advance(Terminal::Close).await;
        co.advance(Terminal::literal("+b")).await;
        co.advance(Terminal::Close).await;
    })
    .unwrap();

    let seen = seen.borrow();
    assert_eq!(seen[0].last_result, Some(Terminal::literal("a")));
    assert!(!seen[0].holding);
    assert_eq!(seen[0].node_type.as_deref(), Some("Ident"));

    let doc = builder.finish().unwrap();
    let Some(Property::Node(ident)) = doc.root.property("expr") else {
        panic!("expr should be bound");
    };
    assert_eq!(ident.node_type(), Some("Ident"));
    assert!(ident.properties.is_empty());
    insta::assert_snapshot!(doc.to_string_formatted(), @r#"
    Root {
      expr: Ident {
        "a"
      }
      "+b"
    }
    "#);
}

#[test]
fn test_accept_adopts_child_position() {
    let ctx = Context::new(Fixture);
    let seen = views();
    let log = Rc::clone(&seen);

    run(&ctx, Source::from_text("abc"), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        co.branch().await;
        co.advance(Terminal::literal("ab")).await;
        let child = co.get_state().await;
        let parent = co.accept().await;
        log.borrow_mut().extend(child.into_iter().chain(parent));
    })
    .unwrap();

    let seen = seen.borrow();
    let (child, parent) = (&seen[0], &seen[1]);
    assert_eq!(child.depth, 1);
    assert_eq!(parent.depth, 0);
    assert_eq!(parent.offset, child.offset);
    assert_eq!(parent.holding, child.holding);
    assert_eq!(parent.offset, 2);
}

#[test]
fn test_reject_restores_everything() {
    let ctx = Context::new(Fixture);
    let seen = views();
    let log = Rc::clone(&seen);

    run(&ctx, Source::from_text("[ab"), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        let before = co.get_state().await;
        co.branch().await;
        co.advance(Terminal::reference("open")).await;
        co.advance(
            OpenTag::new("Punctuator")
                .with_attribute("balanced", "]")
                .with_attribute("balancedSpan", "Bracketed"),
        )
        .await;
        co.advance(Terminal::literal("[")).await;
        co.advance(Terminal::Close).await;
        let inside = co.get_state().await;
        let after = co.reject().await;
        log.borrow_mut().extend(before.into_iter().chain(inside).chain(after));
    })
    .unwrap();

    let seen = seen.borrow();
    let (before, inside, after) = (&seen[0], &seen[1], &seen[2]);
    assert_eq!(inside.lexical_context, "Bracketed");
    assert_eq!(inside.balanced, 1);
    assert_eq!(inside.offset, 1);
    assert_eq!(before, after);
}

#[test]
fn test_views_are_idempotent() {
    let ctx = Context::new(Fixture);
    let seen = views();
    let log = Rc::clone(&seen);

    run(&ctx, Source::from_text("a"), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        co.branch().await;
        let first = co.get_state().await;
        let second = co.get_state().await;
        log.borrow_mut().extend(first.into_iter().chain(second));
    })
    .unwrap();

    let seen = seen.borrow();
    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[0].status, trellis::Status::Active);
    assert_eq!(seen[0].node_type.as_deref(), Some("Root"));
    assert_eq!(seen[0].path_depth, Some(0));
}

#[test]
fn test_balanced_construct_must_close() {
    let ctx = Context::new(Fixture);
    let opener = || {
        OpenTag::new("Punctuator")
            .with_attribute("balanced", ")")
            .with_attribute("balancedSpan", "Parens")
    };

    let err = run(&ctx, Source::from_text("("), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        co.advance(Terminal::reference("open")).await;
        co.advance(opener()).await;
        co.advance(Terminal::literal("(")).await;
        co.advance(Terminal::Close).await;
        co.advance(Terminal::Close).await;
    })
    .unwrap_err();
    assert_eq!(err, Error::UnbalancedAtEnd { remaining: 1 });

    let builder = run(&ctx, Source::from_text("()"), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        co.advance(Terminal::reference("open")).await;
        co.advance(opener()).await;
        co.advance(Terminal::literal("(")).await;
        co.advance(Terminal::Close).await;
        co.advance(Terminal::reference("close")).await;
        co.advance(OpenTag::new("Punctuator").with_attribute("balancer", true)).await;
        co.advance(Terminal::literal(")")).await;
        co.advance(Terminal::Close).await;
        co.advance(Terminal::Close).await;
    })
    .unwrap();
    assert_eq!(builder.finish().unwrap().root.text(), "()");
}

#[test]
fn test_shift_wraps_previous_node() {
    let ctx = Context::new(Fixture);
    let builder = run(&ctx, Source::from_text("a+b"), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        co.advance(Terminal::reference("expr")).await;
        co.advance(Terminal::open("Ident")).await;
        co.advance(Terminal::literal("a")).await;
        co.advance(Terminal::Close).await;

        co.advance(Terminal::Shift).await;
        let held = co.get_state().await;
        assert!(held.is_some_and(|view| view.holding && view.path_depth == Some(1)));

        co.advance(Terminal::open("Binary")).await;
        co.advance(Terminal::reference("left")).await;
        co.advance(Terminal::Gap).await;
        co.advance(Terminal::literal("+")).await;
        co.advance(Terminal::reference("right")).await;
        co.advance(Terminal::open("Ident")).await;
        co.advance(Terminal::literal("b")).await;
        co.advance(Terminal::Close).await;
        co.advance(Terminal::Close).await;
        co.advance(Terminal::Close).await;
    })
    .unwrap();

    insta::assert_snapshot!(builder.finish().unwrap().to_string_formatted(), @r#"
    Root {
      expr: Binary {
        left: Ident {
          "a"
        }
        "+"
        right: Ident {
          "b"
        }
      }
    }
    "#);
}

#[test]
fn test_gap_consumes_embedded_unit() {
    let ctx = Context::new(Fixture);
    let units = vec![Unit::Char('x'), Unit::Gap];
    let builder = run(&ctx, Source::from_units(units), |co, _| async move {
        co.advance(Terminal::open("Root")).await;
        assert!(co.match_pattern("x").await.is_some());
        co.advance(Terminal::literal("x")).await;
        co.advance(Terminal::reference("embedded")).await;
        co.advance(Terminal::Gap).await;
        co.advance(Terminal::Close).await;
    })
    .unwrap();

    let doc = builder.finish().unwrap();
    assert_eq!(doc.root.property("embedded"), Some(&Property::Gap));
}

#[test]
fn test_language_follows_open_node() {
    let ctx = Context::new(Fixture);
    let seen = views();
    let log = Rc::clone(&seen);

    run(&ctx, Source::from_text(""), |co, _| async move {
        let fresh = co.branch().await;
        co.reject().await;
        co.advance(OpenTag::new("Root").with_language("json")).await;
        let inherited = co.branch().await;
        log.borrow_mut().extend(fresh.into_iter().chain(inherited));
    })
    .unwrap();

    let seen = seen.borrow();
    assert_eq!(seen[0].language, None);
    assert_eq!(seen[1].language.as_deref(), Some("json"));
}

#[test]
fn test_write_and_attributes_reach_builder() {
    let ctx = Context::new(Fixture);
    let builder = run(&ctx, Source::from_text(""), |co, _| async move {
        co.advance(Terminal::doctype()).await;
        co.advance(Terminal::open("Root")).await;
        let written = co.write("hello").await;
        assert_eq!(written, Some(Emitted::Written("hello".into())));
        co.bind_attribute("checked", true).await;
        co.advance(Terminal::Close).await;
    })
    .unwrap();

    let doc = builder.finish().unwrap();
    assert_eq!(doc.written, "hello");
    assert_eq!(doc.root.tag.attribute("checked"), Some(&trellis::Value::Bool(true)));
    assert!(doc.doctype.is_some());
}
